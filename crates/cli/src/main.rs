use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use play_engine_core::market::OptionQuote;
use play_engine_core::traits::MarketDataProvider;
use play_engine_core::ConfigLoader;
use play_engine_gtd::PolicyRegistry;
use play_engine_manager::{LivenessMonitor, LogOnlyRecovery, PlayMonitor};
use play_engine_store::{check_and_fix_all_plays, PlayFolder, PlayStore};

#[derive(Parser)]
#[command(name = "play-engine")]
#[command(about = "Options play lifecycle and dynamic exit engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitoring service
    Run {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
    /// Check every play document and repair what can be repaired
    Repair {
        /// Store root (defaults to the configured one)
        #[arg(short, long)]
        root: Option<PathBuf>,
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
    /// List plays per lifecycle folder
    List {
        /// Store root (defaults to the configured one)
        #[arg(short, long)]
        root: Option<PathBuf>,
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
    /// Print every policy's parameter schema as JSON
    Schema,
}

/// Placeholder market-data collaborator for deployments that haven't wired
/// a vendor yet: every lookup reports "no data", so price-aware policies
/// are skipped while date-based rules and the expiration backstop still run.
struct UnconfiguredMarketData;

#[async_trait::async_trait]
impl MarketDataProvider for UnconfiguredMarketData {
    async fn stock_price(&self, _symbol: &str) -> Result<Option<Decimal>> {
        Ok(None)
    }
    async fn option_quote(&self, _contract_symbol: &str) -> Result<Option<OptionQuote>> {
        Ok(None)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => run(&config).await,
        Commands::Repair { root, config } => repair(root, &config),
        Commands::List { root, config } => list(root, &config),
        Commands::Schema => {
            let registry = PolicyRegistry::with_builtins();
            println!("{}", serde_json::to_string_pretty(&registry.schemas())?);
            Ok(())
        }
    }
}

async fn run(config_path: &str) -> Result<()> {
    let config = ConfigLoader::load_from(config_path)?;
    // The one failure that is allowed to be process-fatal.
    let store = PlayStore::open(&config.store.root)?;

    // Sweep the store once before monitoring so corrupt leftovers from a
    // crash are repaired up front.
    let fixed = check_and_fix_all_plays(&store)?;
    if fixed > 0 {
        tracing::info!(fixed, "Repaired play documents at startup");
    }

    let registry = PolicyRegistry::with_builtins();
    let liveness_settings = config.liveness.clone();
    let monitor = PlayMonitor::new(
        store,
        Arc::new(UnconfiguredMarketData),
        None,
        registry,
        config,
    );

    let liveness = LivenessMonitor::new(
        monitor.heartbeat(),
        liveness_settings,
        Arc::new(LogOnlyRecovery),
    );
    let _liveness_task = liveness.spawn();

    monitor.run().await
}

fn open_store(root: Option<PathBuf>, config_path: &str) -> Result<PlayStore> {
    let root = match root {
        Some(root) => root,
        None => ConfigLoader::load_from(config_path)?.store.root,
    };
    Ok(PlayStore::open(root)?)
}

fn repair(root: Option<PathBuf>, config_path: &str) -> Result<()> {
    let store = open_store(root, config_path)?;
    // Completion is exit 0 even when there was nothing to fix; only an
    // unrecoverable I/O error propagates into a non-zero exit.
    let fixed = check_and_fix_all_plays(&store)?;
    println!("{fixed} play document(s) repaired");
    Ok(())
}

fn list(root: Option<PathBuf>, config_path: &str) -> Result<()> {
    let store = open_store(root, config_path)?;
    for folder in PlayFolder::ALL {
        let names = store.list(folder)?;
        println!("{folder} ({})", names.len());
        for name in names {
            match store.load(folder, &name) {
                Ok(play) => println!(
                    "  {name}  {} {}{} exp {}{}",
                    play.symbol,
                    play.strike_price,
                    play.trade_type,
                    play.contract_expiration_date,
                    if play.integrity { "" } else { "  [REPAIRED]" }
                ),
                Err(e) => println!("  {name}  <unreadable: {e}>"),
            }
        }
    }
    Ok(())
}
