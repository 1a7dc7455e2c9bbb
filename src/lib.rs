//! Hive blockchain broadcast client library.

pub mod blockchain;
pub mod config;
pub mod error;
pub mod observability;
pub mod resilience;
pub mod rpc;

pub use blockchain::HiveClient;
pub use config::schema::ClientConfig;
pub use error::{ClientError, ClientResult};
