//! Persistence layer.

pub mod store;

pub use store::ContentStore;
