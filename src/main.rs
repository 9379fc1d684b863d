//! Token Mention Alert Bot
//!
//! Watches Telegram chatter and on-chain swap logs for token mentions,
//! enriches them through market-data providers, and posts alerts.

use clap::{Parser, Subcommand};
use mentionbot::{
    broadcast::{BroadcastJob, SendMessageHandler, TelegramSender, TokenDetectionHandler},
    config::Config,
    detection::{
        logs::LogPoller, pair::RpcPairInfo, telegram::UpdatePoller, DetectionJob, Exchange,
        ExchangeRouter, LogListener, SwapConsumer, TelegramDetectionPipeline, UniLikeV2,
    },
    events::{EventBus, EventKind},
    providers::{
        birdeye::BirdeyeClient, chainbase::ChainbaseClient, gecko_terminal::GeckoTerminalClient,
        gmgn::GmgnClient, goplus::GoplusClient, ProviderSet, RawTokenData,
    },
    queue::{JobQueue, JobStore, Worker},
    storage::Database,
    types::Chain,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mentionbot")]
#[command(about = "Token mention detection and alert bot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot
    Run,
    /// Show queue counts
    Stats,
    /// Fetch and print aggregated data for one token
    Inspect {
        /// Token contract address
        address: String,
        /// Numeric chain id
        #[arg(long, default_value = "56")]
        chain_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config).or_else(|_| Config::load_default())?;

    match cli.command {
        Commands::Run => run_bot(config).await,
        Commands::Stats => show_stats(config).await,
        Commands::Inspect { address, chain_id } => inspect_token(config, &address, &chain_id).await,
    }
}

fn provider_set(config: &Config) -> ProviderSet {
    ProviderSet {
        birdeye: Arc::new(BirdeyeClient::new(
            config.providers.birdeye_api_key.clone().unwrap_or_default(),
        )),
        gmgn: Arc::new(GmgnClient::new()),
        chainbase: Arc::new(ChainbaseClient::new(
            config.providers.chainbase_api_keys.clone(),
        )),
        goplus: Arc::new(GoplusClient::new()),
        gecko_terminal: Arc::new(GeckoTerminalClient::new()),
    }
}

async fn run_bot(config: Config) -> anyhow::Result<()> {
    tracing::info!("starting mention bot");

    let db = Arc::new(Database::connect(&config.database.path).await?);
    let store = JobStore::new(db.pool().clone());
    store.init().await?;

    let settings = config.queue_settings();
    let detection_queue = Arc::new(JobQueue::<DetectionJob>::new(
        store.clone(),
        settings.clone(),
    ));
    let broadcast_queue = Arc::new(JobQueue::<BroadcastJob>::new(
        store.clone(),
        settings.clone(),
    ));

    // Orphans from a previous crash are swept before workers start
    let stale_timeout = Duration::from_millis(settings.stale_timeout_ms);
    detection_queue.clean_stale_jobs(stale_timeout).await?;
    broadcast_queue.clean_stale_jobs(stale_timeout).await?;

    let sender = match &config.telegram.bot_token {
        Some(token) => TelegramSender::new(token.clone()),
        None => {
            tracing::warn!("no telegram bot token configured, alerts will only be logged");
            TelegramSender::disabled()
        }
    };

    let detection_worker = Arc::new(Worker::new(
        store.clone(),
        settings.clone(),
        Arc::new(TokenDetectionHandler::new(
            db.clone(),
            provider_set(&config),
            broadcast_queue.clone(),
            config.telegram.alert_channel_id.clone(),
        )),
    ));
    let broadcast_worker = Arc::new(Worker::new(
        store.clone(),
        settings.clone(),
        Arc::new(SendMessageHandler::new(Arc::new(sender), db.clone())),
    ));
    detection_worker.start();
    broadcast_worker.start();

    // Periodic stale sweep while the bot is up
    {
        let detection_queue = detection_queue.clone();
        let broadcast_queue = broadcast_queue.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(stale_timeout);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = detection_queue.clean_stale_jobs(stale_timeout).await {
                    tracing::error!(error = %e, "stale sweep failed");
                }
                if let Err(e) = broadcast_queue.clean_stale_jobs(stale_timeout).await {
                    tracing::error!(error = %e, "stale sweep failed");
                }
            }
        });
    }

    // Telegram mention source
    if let Some(token) = config.telegram.bot_token.clone() {
        let pipeline = TelegramDetectionPipeline::new(detection_queue.clone());
        let (update_tx, update_rx) = tokio::sync::mpsc::channel(100);
        tokio::spawn(async move {
            UpdatePoller::new(token).run(update_tx).await;
        });
        tokio::spawn(async move {
            pipeline.run(update_rx).await;
        });
    }

    // On-chain swap source
    let endpoints = Arc::new(config.endpoint_pool());
    let chains: Vec<Chain> = config
        .chains
        .keys()
        .filter_map(|id| Chain::from_id_str(id))
        .collect();
    if !chains.is_empty() {
        let bus = Arc::new(EventBus::new());
        bus.on(EventKind::Swap, Arc::new(SwapConsumer));

        let uni_v2 = UniLikeV2::new(Arc::new(RpcPairInfo::new(endpoints.clone())));
        let swap_topic = uni_v2.swap_topic();
        let exchanges: Vec<Arc<dyn Exchange>> = vec![Arc::new(uni_v2)];
        let listener = LogListener::new(ExchangeRouter::new(exchanges), bus);

        let poller = LogPoller::new(endpoints, chains, swap_topic, Duration::from_secs(5));
        let (log_tx, log_rx) = tokio::sync::mpsc::channel(100);
        tokio::spawn(async move {
            poller.run(log_tx).await;
        });
        tokio::spawn(async move {
            listener.run(log_rx).await;
        });
    }

    tracing::info!("bot initialized, waiting for mentions");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    detection_worker.stop();
    broadcast_worker.stop();

    Ok(())
}

async fn show_stats(config: Config) -> anyhow::Result<()> {
    let db = Database::connect(&config.database.path).await?;
    let store = JobStore::new(db.pool().clone());
    store.init().await?;

    let settings = config.queue_settings();
    let detection_queue = JobQueue::<DetectionJob>::new(store.clone(), settings.clone());
    let broadcast_queue = JobQueue::<BroadcastJob>::new(store, settings);

    println!("\n📋 Queue Stats\n");
    for (name, counts) in [
        (detection_queue.name(), detection_queue.counts().await?),
        (broadcast_queue.name(), broadcast_queue.counts().await?),
    ] {
        println!("{}:", name);
        println!("  waiting:   {}", counts.waiting);
        println!("  active:    {}", counts.active);
        println!("  delayed:   {}", counts.delayed);
        println!("  completed: {}", counts.completed);
        println!("  failed:    {}", counts.failed);
    }

    Ok(())
}

async fn inspect_token(config: Config, address: &str, chain_id: &str) -> anyhow::Result<()> {
    let chain = Chain::from_id_str(chain_id)
        .ok_or_else(|| anyhow::anyhow!("unknown chain id: {}", chain_id))?;

    let providers = provider_set(&config);
    let raw = RawTokenData::new(address, chain, &providers);
    raw.collect().await;

    println!("\n🔎 {} on {}\n", address, chain);
    println!("Name:       {}", raw.token_name().await.unwrap_or_else(|| "?".to_string()));
    println!("Symbol:     {}", raw.symbol().await.unwrap_or_else(|| "?".to_string()));
    match raw.price().await {
        Some(price) => println!("Price:      ${}", price),
        None => println!("Price:      ?"),
    }
    match raw.market_cap().await {
        Some(mcap) => println!("Market cap: ${:.0}", mcap),
        None => println!("Market cap: ?"),
    }
    match raw.liquidity().await {
        Some(liquidity) => println!("Liquidity:  ${:.0}", liquidity),
        None => println!("Liquidity:  ?"),
    }
    if let Some(holders) = raw.top_holders().await {
        println!("\nTop holders:");
        for holder in holders {
            println!("  {} {:.2}%", holder.address, holder.percentage * 100.0);
        }
    }
    if let Some(security) = raw.security().await {
        println!("\nSecurity:");
        println!("  renounced: {:?}", security.renounced);
        println!("  lp burned: {:?}", security.lp_burned);
        println!("  honeypot:  {:?}", security.honeypot);
    }

    Ok(())
}
