// src/lib.rs
pub mod api;
pub mod classify;
pub mod cli;
pub mod config;
pub mod engine;
pub mod output;
pub mod session;
pub mod store;
pub mod types;
pub mod utils;

pub use api::{ExportJobClient, PageFetcher, RapidDnsClient, Transport};
pub use cli::Args;
pub use engine::{HarvestEngine, HarvestOptions, HarvestOutcome, StopReason};
pub use session::Session;
pub use store::{ExtractOptions, FindingStore};
pub use types::{Config, ExportJob, ExportStatus, HarvestError, HarvestReport, QueryMode, Record};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
