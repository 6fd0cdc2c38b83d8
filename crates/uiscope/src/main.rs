mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uiscope_engine::backend::Backend;
use uiscope_engine::cache::{MemoryCache, ResultCache};
use uiscope_engine::config::{ConfigLoader, UiscopeConfig};
use uiscope_engine::protocol::AnalyzeResponse;
use uiscope_engine::synthesis::Synthesizer;
use uiscope_engine::{Analyzer, BackendFactory};
use uiscope_h::HeadlessBackend;

use crate::server::AppState;

#[derive(Parser)]
#[command(name = "uiscope", version, about = "Annotate what every interactive element on a page does")]
struct Args {
    /// Config file (defaults to ./uiscope.yaml, then ~/.uiscope/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Serve the analysis API over HTTP
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Analyze one page and print the annotations as JSON
    Analyze {
        url: String,
        /// Launch browser in visible mode (not headless)
        #[arg(long)]
        visible: bool,
        /// Skip the before/after element captures
        #[arg(long)]
        no_screenshots: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `analyze` output on stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None => ConfigLoader::load_default().await?,
    };

    match args.mode {
        Mode::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let cache = config
                .cache
                .enabled
                .then(|| Arc::new(MemoryCache::new(&config.cache)) as Arc<dyn ResultCache>);
            let state = Arc::new(AppState {
                analyzer: build_analyzer(&config),
                cache,
            });
            server::serve(state, &config.server.host, config.server.port).await
        }
        Mode::Analyze {
            url,
            visible,
            no_screenshots,
        } => {
            config.browser.visible |= visible;
            if no_screenshots {
                config.pipeline.capture_screenshots = false;
            }
            let annotations = build_analyzer(&config).analyze(&url).await?;
            let output = serde_json::to_string_pretty(&AnalyzeResponse { annotations })?;
            println!("{}", output);
            Ok(())
        }
    }
}

fn build_analyzer(config: &UiscopeConfig) -> Analyzer {
    let browser = config.browser.clone();
    let backends: Arc<dyn BackendFactory> = Arc::new(move || -> Box<dyn Backend> {
        Box::new(HeadlessBackend::with_options(browser.clone()))
    });
    Analyzer::new(
        config.pipeline.clone(),
        Synthesizer::from_config(&config.model),
        backends,
    )
}
