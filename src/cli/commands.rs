//! CLI command definitions using clap.
//!
//! Subcommands cover the pipeline surface:
//! - generate/batch: produce commentary for knowledge points
//! - show/list/delete: inspect stored content
//! - queue: review-queue disposition
//! - template: prompt template management

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Trapwise - quality-gated expert commentary generator for exam prep
#[derive(Parser, Debug)]
#[command(name = "trapwise")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate commentary for a single knowledge point
    Generate {
        /// Knowledge point ID
        id: String,

        /// Source text inline
        #[arg(short, long, conflicts_with = "file")]
        text: Option<String>,

        /// Read source text from a file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Style variant (default, compact, mobile, video_script)
        #[arg(long, default_value = "default")]
        variant: String,
    },

    /// Generate commentary for a batch of requests from a JSON file
    Batch {
        /// JSON array of {knowledge_point_id, source_text, style_variant?}
        file: PathBuf,
    },

    /// Show stored commentary for a knowledge point
    Show {
        /// Knowledge point ID
        id: String,

        /// Style variant
        #[arg(long, default_value = "default")]
        variant: String,
    },

    /// List all stored commentary
    List,

    /// Delete stored commentary for a knowledge point
    Delete {
        /// Knowledge point ID
        id: String,

        /// Style variant
        #[arg(long, default_value = "default")]
        variant: String,
    },

    /// Review queue operations
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },

    /// Prompt template operations
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
}

/// Review queue subcommands
#[derive(Subcommand, Debug)]
pub enum QueueCommands {
    /// List queue items
    List {
        /// Filter by status (pending, approved, rejected, regenerated)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Approve a queue item
    Approve {
        /// Queue item ID
        id: i64,

        /// Reviewer notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Reject a queue item
    Reject {
        /// Queue item ID
        id: i64,

        /// Reviewer notes
        #[arg(short, long)]
        notes: Option<String>,
    },
}

/// Prompt template subcommands
#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    /// List registered template versions
    List,

    /// Activate a template version for this invocation only (templates are
    /// in-memory state; generation always starts from the built-in registry)
    Activate {
        /// Template version, e.g. v1.0
        version: String,
    },
}
