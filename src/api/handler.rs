use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use jsonrpsee::core::{Error as RpcError, RpcResult};
use jsonrpsee::server::{ServerBuilder, ServerHandle};
use log::{debug, info};

use super::rpc::ApiServer;
use crate::rib::{Family, Speaker};
use crate::route::{Route, RouteEncoder};
use crate::stats::{FeedStats, StatsAggregator};

/// Serves route & feed status from the speaker and stats aggregator
#[derive(Clone)]
pub struct ApiHandler {
    speaker: Arc<dyn Speaker>,
    router_id: IpAddr,
    stats: Arc<StatsAggregator>,
}

impl ApiHandler {
    pub fn new(speaker: Arc<dyn Speaker>, router_id: IpAddr, stats: Arc<StatsAggregator>) -> Self {
        Self {
            speaker,
            router_id,
            stats,
        }
    }

    /// Decoded active routes across the unicast families
    async fn active_routes(&self) -> RpcResult<Vec<Route>> {
        let mut total = 0usize;
        let mut routes: Vec<Route> = vec![];
        for family in Family::unicast() {
            let paths = self
                .speaker
                .list_paths(family)
                .await
                .map_err(|err| RpcError::Custom(err.to_string()))?;
            total += paths.len();
            routes.extend(
                paths
                    .iter()
                    .filter(|path| !path.is_withdraw)
                    .map(RouteEncoder::decode),
            );
        }
        info!(
            "BGP Route Stats: Total={}, Active={}, Withdrawn={}",
            total,
            routes.len(),
            total - routes.len()
        );
        Ok(routes)
    }

    async fn prefixes_where<F>(&self, keep: F) -> RpcResult<Vec<String>>
    where
        F: Fn(&Route) -> bool,
    {
        Ok(self
            .active_routes()
            .await?
            .into_iter()
            .filter(|route| keep(route))
            .map(|route| route.prefix)
            .collect())
    }

    /// Start the JSON-RPC server, returning its handle and bound address
    pub async fn serve_rpc_api(
        self,
        socket: SocketAddr,
    ) -> Result<(ServerHandle, SocketAddr), io::Error> {
        let to_io = |err: RpcError| io::Error::new(io::ErrorKind::Other, err.to_string());
        let server = ServerBuilder::default()
            .build(socket)
            .await
            .map_err(to_io)?;
        let addr = server.local_addr().map_err(to_io)?;
        info!("Starting JSON-RPC server on {}...", addr);
        let handle = server.start(self.into_rpc()).map_err(to_io)?;
        Ok((handle, addr))
    }
}

#[async_trait::async_trait]
impl ApiServer for ApiHandler {
    async fn show_routes_inbound(&self) -> RpcResult<Vec<String>> {
        let router_id = self.router_id;
        self.prefixes_where(|route| !route.is_outbound(router_id))
            .await
    }

    async fn show_routes_outbound(&self) -> RpcResult<Vec<String>> {
        let router_id = self.router_id;
        self.prefixes_where(|route| route.is_outbound(router_id))
            .await
    }

    async fn show_routes(&self) -> RpcResult<Vec<Route>> {
        self.active_routes().await
    }

    async fn show_feed_stats(&self) -> RpcResult<FeedStats> {
        let stats = self.stats.snapshot().await;
        debug!("Feed stats: {} routes over {} feeds", stats.total, stats.feeds.len());
        Ok(stats)
    }
}
