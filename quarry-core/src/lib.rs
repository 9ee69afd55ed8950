//! # Quarry Core
//!
//! Core library for the Quarry research pipeline.
//! Provides the research engine, the text-model gateway, search backend
//! chains, chart rendering, configuration, and error types.

pub mod brain;
pub mod config;
pub mod error;
pub mod providers;
pub mod research;
pub mod search;

// Re-export commonly used types at the crate root.
pub use brain::{LlmProvider, MockLlmProvider, ModelGateway};
pub use config::QuarryConfig;
pub use error::{QuarryError, Result};
pub use research::{
    Evidence, Plan, Query, RelevancyVerdict, Report, ReportKind, RequestState, ResearchCallback,
    ResearchEngine, ResearchPhase,
};
pub use search::{SearchExecutor, SearchResult};
