mod handler;
pub mod rpc;

pub use handler::ApiHandler;
pub use rpc::{ApiClient, ApiServer};
