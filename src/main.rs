use std::sync::Arc;

use clap::{Parser, Subcommand};
use chainscope::{
    analysis::{StateAnalyzer, DEFAULT_HISTORY_INTERVALS},
    chains::FanoutClient,
    config::Settings,
    models::{ChainConfig, ChainFamily, ChainRegistry, ChainScopeError, SnapshotCache},
    verification::{address_format_description, validate_address},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "chainscope")]
#[clap(about = "Query blockchain RPC endpoints with automatic failover", long_about = None)]
struct Cli {
    /// Settings file (defaults to config/default and config/local)
    #[clap(long, global = true)]
    config: Option<String>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered chains
    Chains,

    /// Print the latest block number (slot on Solana)
    BlockNumber {
        /// Chain id (ethereum, starknet, solana, ...)
        #[clap(short, long)]
        chain: Option<String>,
    },

    /// Fetch a block by number
    Block {
        #[clap(short, long)]
        chain: Option<String>,

        #[clap(short, long)]
        number: u64,
    },

    /// Send an arbitrary JSON-RPC method, translated for the chain family
    Call {
        #[clap(short, long)]
        chain: Option<String>,

        #[clap(short, long)]
        method: String,

        /// JSON array of parameters
        #[clap(short, long, default_value = "[]")]
        params: String,
    },

    /// Summarise the most recent blocks
    Metrics {
        #[clap(short, long)]
        chain: Option<String>,
    },

    /// Compare a contract's balance and class hash across blocks
    State {
        #[clap(short, long)]
        chain: Option<String>,

        #[clap(short, long)]
        address: String,

        /// Comma-separated block numbers (defaults to evenly spaced recent blocks)
        #[clap(short, long, value_delimiter = ',')]
        blocks: Vec<u64>,

        /// Number of recent blocks to sample when --blocks is not given
        #[clap(short, long, default_value_t = DEFAULT_HISTORY_INTERVALS)]
        intervals: u64,
    },

    /// Validate an address for a chain family
    Validate {
        /// evm, starknet, solana, cosmos or substrate
        #[clap(short, long)]
        family: String,

        #[clap(short, long)]
        address: String,
    },
}

fn select_chain<'a>(
    registry: &'a ChainRegistry,
    requested: Option<&str>,
    default_chain: &str,
) -> anyhow::Result<&'a ChainConfig> {
    let id = requested.unwrap_or(default_chain);
    registry
        .get(id)
        .ok_or_else(|| ChainScopeError::ChainNotSupported(id.to_string()).into())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::new().unwrap_or_else(|e| {
            eprintln!("Using default settings: {}", e);
            Settings::default()
        }),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.app.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = settings.validate() {
        error!("Invalid settings: {}", e);
        return Err(anyhow::anyhow!(e));
    }

    let registry = settings.registry();
    let default_chain = settings.app.default_chain.as_str();

    match cli.command {
        Commands::Chains => {
            for chain in registry.chains() {
                println!(
                    "{:<10} {:<16} {:<9} {:<5} {} endpoint(s)",
                    chain.id,
                    chain.name,
                    chain.family.as_str(),
                    chain.native_currency,
                    chain.rpcs.len()
                );
            }
        }

        Commands::BlockNumber { chain } => {
            let chain = select_chain(&registry, chain.as_deref(), default_chain)?;
            let client = FanoutClient::from_settings(&settings.rpc)?;
            let number = client.latest_block_number(chain).await?;
            info!("Latest block on {}: {}", chain.id, number);
            println!("{}", number);
        }

        Commands::Block { chain, number } => {
            let chain = select_chain(&registry, chain.as_deref(), default_chain)?;
            let client = FanoutClient::from_settings(&settings.rpc)?;
            let block = client.get_block(chain, number).await?;
            println!("{}", serde_json::to_string_pretty(&block)?);
        }

        Commands::Call { chain, method, params } => {
            let chain = select_chain(&registry, chain.as_deref(), default_chain)?;
            let params: serde_json::Value = serde_json::from_str(&params)
                .map_err(|e| anyhow::anyhow!("Invalid params JSON: {}", e))?;
            let client = FanoutClient::from_settings(&settings.rpc)?;
            let result = client.call(chain, &method, params).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Metrics { chain } => {
            let chain = select_chain(&registry, chain.as_deref(), default_chain)?;
            let client = FanoutClient::from_settings(&settings.rpc)?;
            let data = client.dashboard_metrics(chain).await;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }

        Commands::State {
            chain,
            address,
            blocks,
            intervals,
        } => {
            let chain = select_chain(&registry, chain.as_deref(), default_chain)?;
            validate_address(&address, chain.family)?;

            let client = Arc::new(FanoutClient::from_settings(&settings.rpc)?);
            let cache = SnapshotCache::new(settings.cache.snapshot_max_age());
            let analyzer = StateAnalyzer::new(client, cache);

            let analysis = if blocks.is_empty() {
                analyzer.analyze_recent(chain, address.trim(), intervals).await?
            } else {
                analyzer
                    .analyze_contract_state(chain, address.trim(), &blocks)
                    .await?
            };
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }

        Commands::Validate { family, address } => {
            let family = ChainFamily::from_str(&family)
                .ok_or_else(|| anyhow::anyhow!("Unsupported chain type: {}", family))?;

            match validate_address(&address, family) {
                Ok(()) => println!("✅ Valid {} address", family),
                Err(e) => {
                    println!("❌ {}", e);
                    println!("{}", address_format_description(family));
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
