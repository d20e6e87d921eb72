use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use authcache::prelude::*;

/// How often expired entries are swept from the in-memory cache
const MEMORY_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// authcache - OAuth2 callback server with cached provider tokens
#[derive(Parser)]
#[command(name = "authcache")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (skips the XDG and /etc search path)
    #[arg(short, long, global = true, env = "AUTHCACHE_CONFIG_FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve every configured binding (default)
    Serve,
    /// Validate configuration and bindings, including cache connectivity
    Check,
    /// Print a login URL for a binding with a fresh state value
    LoginUrl {
        /// Binding name
        binding: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);

        if let Some(source) = e.source() {
            eprintln!("\n{} {}", "Caused by:".yellow(), source);
        }

        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    init_tracing(&config)?;

    let registry = build_registry(&config).await?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            Server::new(config).serve(registry.into_router()).await?;
        }
        Commands::Check => {
            for name in registry.names() {
                if let Some(binding) = registry.binding(name) {
                    println!("{} {} on {}", "ok".green().bold(), name, binding.path());
                }
            }
            println!("{} binding(s) valid", registry.len());
        }
        Commands::LoginUrl { binding } => {
            let binding = registry
                .binding(&binding)
                .ok_or_else(|| Error::UnknownBinding(binding.clone()))?;
            println!("{}", binding.login_url(&generate_state()));
        }
    }

    Ok(())
}

async fn build_registry(config: &Config) -> anyhow::Result<BindingRegistry> {
    let sessions = Arc::new(CookieSessionStore::new(&config.session)?);

    let cache: Arc<dyn TokenCache> = match &config.redis {
        Some(redis) => Arc::new(RedisTokenCache::connect(redis).await?),
        None => {
            tracing::warn!("No [redis] section configured; tokens are cached in memory");
            let memory = Arc::new(MemoryTokenCache::new());
            spawn_memory_purge(memory.clone());
            memory
        }
    };

    if config.bindings.is_empty() {
        tracing::warn!("No provider bindings configured");
    }

    let registry = RegistryBuilder::new(sessions, cache)
        .with_provider_timeout(config.service.oauth_timeout())
        .register_all(&config.bindings)?
        .build()
        .await?;

    Ok(registry)
}

fn spawn_memory_purge(cache: Arc<MemoryTokenCache>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MEMORY_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = cache.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "Purged expired tokens");
            }
        }
    });
}
