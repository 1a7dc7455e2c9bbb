//! JSON-RPC subsystem.
//!
//! # Data Flow
//! ```text
//! RpcClient::call(api, method, params, strictness)
//!     → methods.rs (allow-list + param shape)
//!     → envelope.rs (JSON-RPC 2.0 request)
//!     → transport.rs (nodes in order, retries per node)
//!     → RpcOutcome → Strictness decides error vs. empty result
//! ```

pub mod client;
pub mod envelope;
pub mod methods;
pub mod mock;
pub mod node;
pub mod transport;

pub use client::{RpcClient, Strictness};
pub use envelope::{RpcErrorObject, RpcOutcome, RpcRequest};
pub use mock::MockTransport;
pub use node::{Node, NodeList};
pub use transport::{HttpTransport, Transport};
