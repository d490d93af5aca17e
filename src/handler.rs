use std::error::Error;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use jsonrpsee::server::ServerHandle;
use log::{debug, info, warn};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tokio_util::sync::CancellationToken;

use crate::api::ApiHandler;
use crate::config::ServerConfig;
use crate::feeds::{FeedFetcher, FeedProcessor, ProcessorHandle, Whitelist};
use crate::rib::{LocalRib, Speaker};
use crate::route::RouteEncoder;
use crate::stats::StatsAggregator;

pub type ServeError = Box<dyn Error + Send + Sync>;

/// Upper bound on waiting for the API server to report it has stopped
const API_STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// Running daemon: speaker session, one processor per feed, and the status API
pub struct Server {
    stats: Arc<StatsAggregator>,
    processors: Vec<ProcessorHandle>,
    api: ServerHandle,
    api_addr: SocketAddr,
    shutdown: CancellationToken,
}

impl Server {
    /// Start the speaker session & peers, then the API and feed processors.
    ///   Session or peer setup failures are returned before anything is spawned
    pub async fn start(config: &ServerConfig, speaker: Arc<dyn Speaker>) -> Result<Self, ServeError> {
        speaker.start_session(config.local_as, config.router_id).await?;
        for neighbor in &config.neighbors {
            speaker
                .add_peer(neighbor.peer_address, neighbor.peer_as)
                .await?;
        }

        let whitelist = Arc::new(Whitelist::new(&config.whitelist));
        debug!("Loaded {} whitelist entries", whitelist.len());
        let encoder = RouteEncoder::new(config.router_id);
        let stats = Arc::new(StatsAggregator::new());

        let (api, api_addr) = ApiHandler::new(speaker.clone(), config.router_id, stats.clone())
            .serve_rpc_api(config.api_listen)
            .await?;

        let shutdown = CancellationToken::new();
        let mut processors: Vec<ProcessorHandle> = Vec::with_capacity(config.feeds.len());
        for source in &config.feeds {
            let fetcher = FeedFetcher::new(&source.url, config.fetch_timeout, whitelist.clone())?;
            let processor = FeedProcessor::new(
                source.clone(),
                fetcher,
                encoder.clone(),
                speaker.clone(),
                stats.clone(),
            );
            processors.push(processor.start(shutdown.child_token()));
        }
        info!("Started {} feed processors", processors.len());

        Ok(Self {
            stats,
            processors,
            api,
            api_addr,
            shutdown,
        })
    }

    pub fn api_addr(&self) -> SocketAddr {
        self.api_addr
    }

    pub fn stats(&self) -> Arc<StatsAggregator> {
        self.stats.clone()
    }

    pub fn processors(&self) -> &[ProcessorHandle] {
        &self.processors
    }

    /// Stop every processor (waiting for in-flight cycles) and the API
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        futures::future::join_all(self.processors.into_iter().map(ProcessorHandle::join)).await;
        if let Err(err) = self.api.stop() {
            warn!("Error stopping API server: {}", err);
            return;
        }
        if tokio::time::timeout(API_STOP_TIMEOUT, self.api.stopped())
            .await
            .is_err()
        {
            warn!(
                "API server did not stop within {}, exiting anyway",
                humantime::format_duration(API_STOP_TIMEOUT)
            );
        }
    }
}

/// Block (off the async runtime) until SIGINT or SIGTERM arrives
async fn wait_for_signal() -> io::Result<i32> {
    let mut signals = Signals::new(&[SIGINT, SIGTERM])?;
    tokio::task::spawn_blocking(move || signals.forever().next())
        .await
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "Signal iterator closed"))
}

/// Run the daemon with an in-memory speaker until signalled to stop
pub async fn serve(config: ServerConfig) -> Result<(), ServeError> {
    let speaker: Arc<dyn Speaker> = Arc::new(LocalRib::new());
    let server = Server::start(&config, speaker).await?;

    let signal = wait_for_signal().await?;
    info!("Received signal {}, shutting down...", signal);
    server.shutdown().await;
    info!("Blackhole announcer stopped");
    Ok(())
}
