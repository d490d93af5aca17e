use std::error;
use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::fetcher::{FeedFetcher, FetchError};
use crate::config::FeedSource;
use crate::rib::{Speaker, SpeakerError};
use crate::route::{EncodeError, RouteEncoder};
use crate::stats::{CycleRecord, StatsAggregator};

#[derive(Debug, PartialEq)]
pub enum AnnounceError {
    Encode(EncodeError),
    Speaker(SpeakerError),
}

impl fmt::Display for AnnounceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AnnounceError::Encode(err) => write!(f, "{}", err),
            AnnounceError::Speaker(err) => write!(f, "{}", err),
        }
    }
}

impl error::Error for AnnounceError {}

impl From<EncodeError> for AnnounceError {
    fn from(err: EncodeError) -> Self {
        AnnounceError::Encode(err)
    }
}

impl From<SpeakerError> for AnnounceError {
    fn from(err: SpeakerError) -> Self {
        AnnounceError::Speaker(err)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProcessorState {
    Running,
    Stopped,
}

impl fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let word = match self {
            ProcessorState::Running => "Running",
            ProcessorState::Stopped => "Stopped",
        };
        write!(f, "{}", word)
    }
}

/// Periodically fetches one feed and announces every prefix it lists
pub struct FeedProcessor {
    source: Arc<FeedSource>,
    fetcher: FeedFetcher,
    encoder: RouteEncoder,
    speaker: Arc<dyn Speaker>,
    stats: Arc<StatsAggregator>,
}

/// Handle to a started processor task
pub struct ProcessorHandle {
    url: String,
    stop: CancellationToken,
    state: watch::Receiver<ProcessorState>,
    task: JoinHandle<()>,
}

impl ProcessorHandle {
    pub fn state(&self) -> ProcessorState {
        *self.state.borrow()
    }

    /// Request a stop, observed once any in-flight cycle completes
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Wait for the processor task to exit
    pub async fn join(self) {
        if let Err(err) = self.task.await {
            warn!("[Feed {}] Processor task failed: {}", self.url, err);
        }
    }
}

impl FeedProcessor {
    pub fn new(
        source: Arc<FeedSource>,
        fetcher: FeedFetcher,
        encoder: RouteEncoder,
        speaker: Arc<dyn Speaker>,
        stats: Arc<StatsAggregator>,
    ) -> Self {
        Self {
            source,
            fetcher,
            encoder,
            speaker,
            stats,
        }
    }

    /// Spawn the processor, running a cycle every refresh interval until `stop` is cancelled
    pub fn start(self, stop: CancellationToken) -> ProcessorHandle {
        let (state_tx, state_rx) = watch::channel(ProcessorState::Running);
        let url = self.source.url.clone();
        let task_stop = stop.clone();
        let task = tokio::spawn(async move {
            self.run(task_stop).await;
            let _ = state_tx.send(ProcessorState::Stopped);
        });
        ProcessorHandle {
            url,
            stop,
            state: state_rx,
            task,
        }
    }

    async fn run(self, stop: CancellationToken) {
        let period = self.source.refresh_interval;
        info!(
            "[Feed {}] Starting feed processor with interval {}",
            self.source.url,
            humantime::format_duration(period)
        );
        // First cycle runs one interval after start
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(err) = self.run_cycle().await {
                        warn!("[Feed {}] Error fetching IP list: {}", self.source.url, err);
                    }
                }
            }
        }
        info!("[Feed {}] Stopping feed processor", self.source.url);
    }

    /// Fetch the feed and announce each prefix, recording how many succeeded.
    ///   A failed fetch leaves the stats untouched
    pub async fn run_cycle(&self) -> Result<CycleRecord, FetchError> {
        let prefixes = self.fetcher.fetch().await?;
        debug!(
            "[Feed {}] Announcing {} prefixes",
            self.source.url,
            prefixes.len()
        );

        let mut success = 0usize;
        for prefix in &prefixes {
            match self.announce(prefix).await {
                Ok(()) => success += 1,
                Err(err) => warn!(
                    "[Feed {}] Failed to announce {}: {}",
                    self.source.url, prefix, err
                ),
            }
        }

        let record = self.stats.record_cycle(&self.source.url, success).await;
        info!(
            "[Feed {}] Results: New={}, Previous={}",
            self.source.url, record.current, record.previous
        );
        info!("[Global] Total active routes: {}", record.total);
        Ok(record)
    }

    async fn announce(&self, prefix: &str) -> Result<(), AnnounceError> {
        let path = self
            .encoder
            .encode(prefix, Some(self.source.community.as_str()))?;
        self.speaker.announce_path(path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::feeds::fetcher::tests::{serve_feed, stall_feed};
    use crate::feeds::Whitelist;
    use crate::rib::{Family, LocalRib, Path};

    const ROUTER_ID: &str = "192.0.2.1";

    async fn started_rib() -> Arc<LocalRib> {
        let rib = LocalRib::new();
        rib.start_session(65000, ROUTER_ID.parse().unwrap())
            .await
            .unwrap();
        Arc::new(rib)
    }

    fn processor(
        url: &str,
        community: &str,
        interval: Duration,
        speaker: Arc<dyn Speaker>,
        stats: Arc<StatsAggregator>,
    ) -> FeedProcessor {
        let source = Arc::new(FeedSource::new(url, community, interval));
        let fetcher =
            FeedFetcher::new(url, Duration::from_secs(2), Arc::new(Whitelist::default())).unwrap();
        FeedProcessor::new(
            source,
            fetcher,
            RouteEncoder::new(ROUTER_ID.parse().unwrap()),
            speaker,
            stats,
        )
    }

    /// Accepts every path except the ones for `reject`
    struct PickySpeaker {
        inner: LocalRib,
        reject: IpAddr,
    }

    #[async_trait]
    impl Speaker for PickySpeaker {
        async fn start_session(&self, asn: u32, router_id: IpAddr) -> Result<(), SpeakerError> {
            self.inner.start_session(asn, router_id).await
        }
        async fn add_peer(&self, address: IpAddr, asn: u32) -> Result<(), SpeakerError> {
            self.inner.add_peer(address, asn).await
        }
        async fn announce_path(&self, path: Path) -> Result<(), SpeakerError> {
            let route = RouteEncoder::decode(&path);
            if route.prefix.starts_with(&format!("{}/", self.reject)) {
                return Err(SpeakerError::Rejected(String::from("Policy")));
            }
            self.inner.announce_path(path).await
        }
        async fn list_paths(&self, family: Family) -> Result<Vec<Path>, SpeakerError> {
            self.inner.list_paths(family).await
        }
    }

    #[tokio::test]
    async fn test_run_cycle() {
        let url = serve_feed("200 OK", "1.2.3.4\n5.6.7.0/24\n# comment\n\n1.2.3.4\n2001:db8::1").await;
        let rib = started_rib().await;
        let stats = Arc::new(StatsAggregator::new());
        let processor = processor(
            &url,
            "65535:666",
            Duration::from_secs(60),
            rib.clone(),
            stats.clone(),
        );

        let record = processor.run_cycle().await.unwrap();
        assert_eq!(record.current, 3);
        assert_eq!(record.previous, 0);
        assert_eq!(stats.feed_count(&url).await, 3);
        assert_eq!(rib.len().await, 3);
        assert_eq!(rib.list_paths(Family::ipv6_unicast()).await.unwrap().len(), 1);

        // Full re-announcement is idempotent on the speaker
        let record = processor.run_cycle().await.unwrap();
        assert_eq!(record.previous, 3);
        assert_eq!(record.total, 3);
        assert_eq!(rib.len().await, 3);
    }

    #[tokio::test]
    async fn test_bad_community_announces_nothing() {
        let url = serve_feed("200 OK", "1.2.3.4\n5.6.7.0/24\n").await;
        let rib = started_rib().await;
        let stats = Arc::new(StatsAggregator::new());
        stats.record_cycle(&url, 2).await;
        let processor = processor(&url, "65000", Duration::from_secs(60), rib.clone(), stats.clone());

        let record = processor.run_cycle().await.unwrap();
        assert_eq!(record.current, 0);
        assert_eq!(record.previous, 2);
        assert_eq!(stats.total().await, 0);
        assert_eq!(rib.len().await, 0);
    }

    #[tokio::test]
    async fn test_rejected_prefix_does_not_abort_cycle() {
        let url = serve_feed("200 OK", "1.2.3.4\n5.6.7.8\n9.9.9.9\n").await;
        let speaker = PickySpeaker {
            inner: LocalRib::new(),
            reject: "5.6.7.8".parse().unwrap(),
        };
        speaker
            .start_session(65000, ROUTER_ID.parse().unwrap())
            .await
            .unwrap();
        let speaker = Arc::new(speaker);
        let stats = Arc::new(StatsAggregator::new());
        let processor = processor(&url, "", Duration::from_secs(60), speaker.clone(), stats.clone());

        let record = processor.run_cycle().await.unwrap();
        assert_eq!(record.current, 2);
        assert_eq!(speaker.inner.len().await, 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_cycle() {
        let url = serve_feed("500 Internal Server Error", "").await;
        let rib = started_rib().await;
        let stats = Arc::new(StatsAggregator::new());
        stats.record_cycle(&url, 4).await;
        let processor = processor(&url, "", Duration::from_secs(60), rib, stats.clone());

        assert!(matches!(
            processor.run_cycle().await,
            Err(FetchError::Status(500))
        ));
        assert_eq!(stats.feed_count(&url).await, 4);
        assert_eq!(stats.total().await, 4);
    }

    #[tokio::test]
    async fn test_hung_fetch_skips_cycle() {
        let url = stall_feed().await;
        let rib = started_rib().await;
        let stats = Arc::new(StatsAggregator::new());
        stats.record_cycle(&url, 4).await;
        stats.record_cycle("http://other-feed", 1).await;
        let fetcher =
            FeedFetcher::new(&url, Duration::from_millis(300), Arc::new(Whitelist::default()))
                .unwrap();
        let processor = FeedProcessor::new(
            Arc::new(FeedSource::new(&url, "65535:666", Duration::from_secs(60))),
            fetcher,
            RouteEncoder::new(ROUTER_ID.parse().unwrap()),
            rib.clone(),
            stats.clone(),
        );

        let result = tokio::time::timeout(Duration::from_secs(5), processor.run_cycle())
            .await
            .unwrap();
        assert!(matches!(result, Err(FetchError::Transport(_))));
        assert_eq!(stats.feed_count(&url).await, 4);
        assert_eq!(stats.total().await, 5);
        assert_eq!(rib.len().await, 0);
    }

    #[tokio::test]
    async fn test_processor_runs_on_interval() {
        let url = serve_feed("200 OK", "1.2.3.4\n5.6.7.0/24\n").await;
        let rib = started_rib().await;
        let stats = Arc::new(StatsAggregator::new());
        let processor = processor(
            &url,
            "65535:666",
            Duration::from_millis(50),
            rib.clone(),
            stats.clone(),
        );

        let handle = processor.start(CancellationToken::new());
        assert_eq!(handle.state(), ProcessorState::Running);
        let mut waited = Duration::from_millis(0);
        while stats.total().await < 2 && waited < Duration::from_secs(5) {
            tokio::time::sleep(Duration::from_millis(20)).await;
            waited += Duration::from_millis(20);
        }
        assert_eq!(stats.total().await, 2);
        assert_eq!(rib.len().await, 2);

        handle.stop();
        tokio::time::timeout(Duration::from_secs(5), handle.join())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stop_before_first_tick() {
        let url = serve_feed("200 OK", "1.2.3.4\n").await;
        let rib = started_rib().await;
        let stats = Arc::new(StatsAggregator::new());
        let processor = processor(
            &url,
            "",
            Duration::from_secs(3600),
            rib.clone(),
            stats.clone(),
        );

        let token = CancellationToken::new();
        let handle = processor.start(token.child_token());
        token.cancel();
        let mut state = handle.state.clone();
        tokio::time::timeout(Duration::from_secs(5), async {
            while *state.borrow() != ProcessorState::Stopped {
                if state.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(handle.state(), ProcessorState::Stopped);
        handle.join().await;
        assert!(stats.snapshot().await.feeds.is_empty());
        assert_eq!(rib.len().await, 0);
    }
}
