//! Binary entry point: loads configuration, assembles the provider
//! cascade and agents, and runs the HTTP front.

use clap::Parser;
use iter_research::agents::{
    GeminiFinalizationAgent, GeminiQueryGenerationAgent, GeminiReflectionAgent, GeminiTextClient,
    RegistrySearchAgent,
};
use iter_research::providers::{
    CustomSearchProvider, GeminiGroundedClient, GroundedProvider, KeylessProvider,
    KnowledgeFallbackProvider, SecondarySearchProvider,
};
use iter_research::{Config, ConfigOverrides, Orchestrator, ProviderRegistry, Server, Strategy};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "iter-research", about = "Iterative, LLM-assisted research orchestrator")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the HTTP listen port.
    #[arg(long)]
    port: Option<u16>,

    /// Override the HTTP listen host.
    #[arg(long)]
    host: Option<String>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    config.apply_overrides(&ConfigOverrides {
        server_port: cli.port,
        server_host: cli.host,
        log_level: cli.log_level,
        profile: None,
    });

    init_tracing(&config);

    if let Err(err) = config.validate() {
        error!(%err, "invalid configuration");
        return ExitCode::FAILURE;
    }

    let config = Arc::new(config);
    let orchestrator = Arc::new(build_orchestrator(&config));
    let server = Server::new(Arc::clone(&config), orchestrator);

    if let Err(err) = server.run().await {
        error!(%err, "server exited with error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn build_orchestrator(config: &Config) -> Orchestrator {
    let llm_api_key = config.providers.llm_api_key.clone().unwrap_or_default();
    let text_client = Arc::new(GeminiTextClient::new(llm_api_key.clone()));

    let grounded_client = Arc::new(GeminiGroundedClient::new(llm_api_key.clone()));
    let grounded_provider = Arc::new(GroundedProvider::new(grounded_client, config.providers.llm_api_key.is_some()));

    let custom_search = Arc::new(CustomSearchProvider::new(
        config.providers.custom_search_api_key.clone(),
        config.providers.custom_search_engine_id.clone(),
    ));
    let secondary_search = Arc::new(SecondarySearchProvider::new(
        config.providers.secondary_search_api_key.clone(),
        config.providers.secondary_search_engine.clone(),
    ));
    let keyless = Arc::new(KeylessProvider::default());
    let fallback = Arc::new(KnowledgeFallbackProvider::with_default_entries());

    let registry = Arc::new(ProviderRegistry::new(
        vec![grounded_provider, custom_search, secondary_search, keyless],
        fallback,
        Strategy::Sequential,
    ));

    let search_agent = Arc::new(RegistrySearchAgent::new(registry, Arc::clone(&text_client), 10));
    let query_agent = Arc::new(GeminiQueryGenerationAgent::new(Arc::clone(&text_client)));
    let reflection_agent = Arc::new(GeminiReflectionAgent::new(Arc::clone(&text_client)));
    let finalization_agent = Arc::new(GeminiFinalizationAgent::new(text_client));

    Orchestrator::new(query_agent, search_agent, reflection_agent, finalization_agent, config.research.clone())
}
