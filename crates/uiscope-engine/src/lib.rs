pub mod backend;
pub mod cache;
pub mod config;
pub mod describe;
pub mod diff;
pub mod driver;
pub mod pipeline;
pub mod snapshot;
pub mod synthesis;

pub use uiscope_common::protocol;
pub use uiscope_common::selectors;

pub use pipeline::{AnalysisError, Analyzer, BackendFactory};
