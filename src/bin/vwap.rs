//! CLI entrypoint: streams Coinbase matches and prints a sliding-window VWAP
//! line per trade on stdout.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use coinbase_vwap::{
    config::Config,
    engine::VwapEngine,
    market_data::{channel_pair, WsClient},
    utils::init_logging,
};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "vwap", author, version, about = "Sliding-window VWAP over the Coinbase matches feed", long_about = None)]
struct Args {
    /// Path to a configuration file (TOML); CLI flags override its values
    #[arg(short, long, env = "VWAP_CONFIG")]
    config: Option<PathBuf>,

    /// Coinbase Websockets API endpoint URL
    #[arg(long, env = "COINBASE_WS_URL")]
    coinbase_ws_url: Option<String>,

    /// Comma separated list of product_id pairs, e.g. BTC-USD,BTC-GBP,ETH-BTC
    #[arg(long, value_delimiter = ',')]
    trading_pairs: Option<Vec<String>>,

    /// No. of data points included in the sliding window
    #[arg(long)]
    window: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,

    /// Print the default configuration to stdout and exit
    #[arg(long)]
    print_default_config: bool,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            | Some(path) => Config::from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            | None => Config::default(),
        };
        if let Some(url) = self.coinbase_ws_url {
            config.feed.url = url;
        }
        if let Some(pairs) = self.trading_pairs {
            config.feed.trading_pairs = pairs.into_iter().map(|p| p.trim().to_string()).collect();
        }
        if let Some(window) = self.window {
            config.vwap.window_size = window;
        }
        if let Some(level) = self.log_level {
            config.app.log_level = level;
        }
        if self.metrics_addr.is_some() {
            config.metrics.listen_addr = self.metrics_addr;
        }
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        println!("{}", Config::default_toml()?);
        return Ok(());
    }

    let config = args.into_config()?;
    init_logging(&config.app.log_level);
    coinbase_vwap::metrics::init(config.metrics.listen_addr)
        .map_err(|e| anyhow::anyhow!("metrics init: {}", e))?;

    run(config).await
}

async fn run(config: Config) -> Result<()> {
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Shutting down...");
                cancel.cancel();
            }
        });
    }

    let (mut feed, transport) = channel_pair(config.feed.channel_capacity);

    let mut engine = VwapEngine::new(config.vwap.window_size, &config.feed.trading_pairs, tokio::io::stdout())?
        .with_filter(config.message_filter());
    let engine_cancel = cancel.clone();
    let engine_handle = tokio::spawn(async move { engine.run(engine_cancel, &mut feed).await });

    let client = WsClient::new(&config.feed.url)?
        .with_retries(config.feed.max_retries, Duration::from_millis(config.feed.retry_delay_ms));
    let transport_res = client.run(transport, cancel.clone()).await;

    // Once the transport is done the engine cannot receive anything else.
    cancel.cancel();
    let engine_res = engine_handle.await.context("engine task panicked")?;

    transport_res.context("websocket transport failed")?;
    match engine_res {
        | Ok(()) => Ok(()),
        // The feed closing after our own shutdown is expected.
        | Err(coinbase_vwap::Error::Transport(_)) if cancel.is_cancelled() => Ok(()),
        | Err(e) => Err(e).context("VWAP engine failed"),
    }
}
