use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

mod cli;
mod config;

use cli::Cli;
use cli::commands::{Commands, QueueCommands, TemplateCommands};
use config::Config;

use trapwise::backend::{AnthropicBackend, AnthropicConfig};
use trapwise::domain::{GenerationRequest, ReviewStatus, StyleVariant};
use trapwise::generate::{ContentGenerator, RetryConfig, RetryOrchestrator};
use trapwise::storage::ContentStore;
use trapwise::template::TemplateStore;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("trapwise")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("trapwise.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn open_store(config: &Config) -> Result<Arc<ContentStore>> {
    let store = ContentStore::open(&config.storage.db_path)
        .with_context(|| format!("Failed to open store at {}", config.storage.db_path.display()))?;
    Ok(Arc::new(store))
}

fn build_generator(config: &Config, store: Arc<ContentStore>) -> Result<ContentGenerator> {
    let backend = AnthropicBackend::new(AnthropicConfig {
        model: config.llm.model.clone(),
        max_tokens: config.llm.max_tokens,
        timeout: Duration::from_millis(config.llm.timeout_ms),
    })
    .context("Failed to initialize Anthropic backend")?;

    let retry = RetryConfig {
        min_retries: config.retry.min_retries,
        max_retries: config.retry.max_retries,
        retry_delay: Duration::from_millis(config.retry.retry_delay_ms),
        backend_timeout: Duration::from_millis(config.llm.timeout_ms),
    };

    Ok(ContentGenerator::new(
        Arc::new(TemplateStore::new()),
        Arc::new(backend),
        RetryOrchestrator::with_sink(retry, store),
    ))
}

fn parse_variant(s: &str) -> Result<StyleVariant> {
    s.parse().map_err(|e| eyre!("{e}"))
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Generate {
            id,
            text,
            file,
            variant,
        } => handle_generate(id, text.as_deref(), file.as_deref(), variant, config).await,
        Commands::Batch { file } => handle_batch(file, config).await,
        Commands::Show { id, variant } => handle_show(id, variant, config),
        Commands::List => handle_list(config),
        Commands::Delete { id, variant } => handle_delete(id, variant, config),
        Commands::Queue { command } => handle_queue_command(command, config),
        Commands::Template { command } => handle_template_command(command),
    }
}

async fn handle_generate(
    id: &str,
    text: Option<&str>,
    file: Option<&Path>,
    variant: &str,
    config: &Config,
) -> Result<()> {
    let source_text = match (text, file) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read source text from {}", path.display()))?,
        (None, None) => return Err(eyre!("Provide source text via --text or --file")),
    };
    let variant = parse_variant(variant)?;

    let store = open_store(config)?;
    let generator = build_generator(config, store.clone())?;
    let request = GenerationRequest::new(id, source_text).with_variant(variant);

    println!("{} {}", "Generating:".cyan(), id);
    let result = generator.generate(&request).await?;

    if result.success {
        let content = result
            .content
            .ok_or_else(|| eyre!("successful result carried no content"))?;
        store.save(&content)?;
        println!(
            "{} {} ({} attempt(s), {} trap(s))",
            "Saved:".green(),
            id,
            result.retry_count,
            content.traps.len()
        );
    } else {
        println!(
            "{} {} - {}",
            "Failed:".red(),
            id,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

async fn handle_batch(file: &Path, config: &Config) -> Result<()> {
    let json = fs::read_to_string(file)
        .with_context(|| format!("Failed to read batch file {}", file.display()))?;
    let requests: Vec<GenerationRequest> =
        serde_json::from_str(&json).context("Failed to parse batch file")?;

    let store = open_store(config)?;
    let generator = build_generator(config, store.clone())?;

    println!("{} {} request(s)", "Batch:".cyan(), requests.len());

    // Sequential on purpose: one request in flight keeps backend pressure
    // predictable and lets a failure queue for review without stalling the rest.
    let mut succeeded = 0usize;
    for request in &requests {
        // A single request's hard error must not sink the rest of the batch.
        match run_batch_entry(&generator, &store, request).await {
            Ok(()) => {
                succeeded += 1;
                println!("  {} {}", "ok".green(), request.knowledge_point_id);
            }
            Err(reason) => {
                println!("  {} {} - {reason}", "fail".red(), request.knowledge_point_id);
            }
        }
    }
    println!(
        "{} {}/{} succeeded",
        "Done:".cyan(),
        succeeded,
        requests.len()
    );
    Ok(())
}

/// Generate and persist one batch entry; any failure comes back as the
/// reason string printed next to the entry.
async fn run_batch_entry(
    generator: &ContentGenerator,
    store: &ContentStore,
    request: &GenerationRequest,
) -> std::result::Result<(), String> {
    let result = generator
        .generate(request)
        .await
        .map_err(|e| e.to_string())?;
    if !result.success {
        return Err(result.error.unwrap_or_else(|| "unknown error".to_string()));
    }
    let content = result
        .content
        .ok_or_else(|| "successful result carried no content".to_string())?;
    store.save(&content).map_err(|e| e.to_string())?;
    Ok(())
}

fn handle_show(id: &str, variant: &str, config: &Config) -> Result<()> {
    let variant = parse_variant(variant)?;
    let store = open_store(config)?;
    match store.get(id, variant)? {
        Some(content) => {
            println!("{}", serde_json::to_string_pretty(&content)?);
        }
        None => {
            println!("{} no content for {id} ({variant})", "Not found:".yellow());
        }
    }
    Ok(())
}

fn handle_list(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let all = store.list()?;
    if all.is_empty() {
        println!("{}", "No stored content".yellow());
        return Ok(());
    }
    for content in all {
        println!(
            "{} {} [{}] v{} - {}",
            "*".cyan(),
            content.knowledge_point_id,
            content.style_variant,
            content.version.trim_start_matches('v'),
            content.summary
        );
    }
    Ok(())
}

fn handle_delete(id: &str, variant: &str, config: &Config) -> Result<()> {
    let variant = parse_variant(variant)?;
    let store = open_store(config)?;
    if store.delete(id, variant) {
        println!("{} {id} ({variant})", "Deleted:".green());
    } else {
        println!("{} nothing stored for {id} ({variant})", "Not found:".yellow());
    }
    Ok(())
}

fn handle_queue_command(command: &QueueCommands, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    match command {
        QueueCommands::List { status } => {
            let status = status
                .as_deref()
                .map(str::parse::<ReviewStatus>)
                .transpose()
                .map_err(|e| eyre!("{e}"))?;
            let items = store.queue_list(status)?;
            if items.is_empty() {
                println!("{}", "Review queue is empty".yellow());
                return Ok(());
            }
            for item in items {
                println!(
                    "{} #{} {} [{}] {} - {} failed attempt(s)",
                    "*".cyan(),
                    item.id.unwrap_or_default(),
                    item.knowledge_point_id,
                    item.style_variant,
                    item.status,
                    item.attempts.len()
                );
            }
        }
        QueueCommands::Approve { id, notes } => {
            if store.review(*id, ReviewStatus::Approved, notes.as_deref())? {
                println!("{} #{id}", "Approved:".green());
            } else {
                println!("{} no queue item #{id}", "Not found:".yellow());
            }
        }
        QueueCommands::Reject { id, notes } => {
            if store.review(*id, ReviewStatus::Rejected, notes.as_deref())? {
                println!("{} #{id}", "Rejected:".red());
            } else {
                println!("{} no queue item #{id}", "Not found:".yellow());
            }
        }
    }
    Ok(())
}

fn handle_template_command(command: &TemplateCommands) -> Result<()> {
    let templates = TemplateStore::new();
    match command {
        TemplateCommands::List => {
            let active = templates.active_version();
            for version in templates.versions() {
                if Some(&version) == active.as_ref() {
                    println!("{} {} {}", "*".cyan(), version, "(active)".green());
                } else {
                    println!("{} {}", "*".cyan(), version);
                }
            }
        }
        TemplateCommands::Activate { version } => {
            if templates.set_active(version) {
                println!("{} {version}", "Activated:".green());
                println!(
                    "{}",
                    "Note: template state is in-memory; activation applies to this process only"
                        .yellow()
                );
            } else {
                println!("{} no template {version}", "Not found:".yellow());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
