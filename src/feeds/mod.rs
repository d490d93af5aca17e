//! Feed polling pipeline: fetch, normalize, filter and announce.

mod fetcher;
mod normalize;
mod processor;
mod whitelist;

pub use fetcher::{FeedFetcher, FetchError};
pub use normalize::{normalize_prefix, parse_feed};
pub use processor::{AnnounceError, FeedProcessor, ProcessorHandle, ProcessorState};
pub use whitelist::Whitelist;

#[cfg(test)]
pub(crate) use fetcher::tests::serve_feed;
