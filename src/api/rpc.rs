use jsonrpsee::{core::RpcResult, proc_macros::rpc};

use crate::route::Route;
use crate::stats::FeedStats;

#[rpc(client, server)]
pub trait Api {
    /// Prefixes learned from peers (next-hop is not our router ID)
    #[method(name = "show_routes_inbound")]
    async fn show_routes_inbound(&self) -> RpcResult<Vec<String>>;
    /// Prefixes we originate (next-hop is our router ID)
    #[method(name = "show_routes_outbound")]
    async fn show_routes_outbound(&self) -> RpcResult<Vec<String>>;
    #[method(name = "show_routes")]
    async fn show_routes(&self) -> RpcResult<Vec<Route>>;
    #[method(name = "show_feed_stats")]
    async fn show_feed_stats(&self) -> RpcResult<FeedStats>;
}
