//! Hive blockchain subsystem.
//!
//! # Data Flow
//! ```text
//! HiveClient (client.rs)
//!     → operations.rs (build + validate operations)
//!     → transaction.rs Broadcaster:
//!         authority.rs (one role, one key from wallet.rs)
//!         tapos.rs (fresh reference block)
//!         rpc: get_transaction_hex
//!         signature.rs + ecc.rs (canonical recoverable signature)
//!         rpc: verify_authority (optional), broadcast_transaction[_synchronous]
//! ```
//!
//! # Security Constraints
//! - Private keys only from environment variables or code, never config files
//! - Never log private keys
//! - Every network call has a deadline (see `resilience`)

pub mod authority;
pub mod client;
pub mod ecc;
pub mod operations;
pub mod signature;
pub mod tapos;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use authority::AuthorityRole;
pub use client::HiveClient;
pub use operations::{Amount, Asset, Operation};
pub use signature::CompactSignature;
pub use transaction::{Broadcaster, Transaction};
pub use types::{BroadcastOptions, BroadcastReceipt, ChainId, RefBlock};
pub use wallet::{KeyRing, PrivateKey};
