pub mod loader;
pub mod schema;

pub use loader::{ConfigError, ConfigLoader};
pub use schema::{
    BrowserConfig, CacheConfig, ModelConfig, PipelineConfig, ServerConfig, UiscopeConfig,
};
