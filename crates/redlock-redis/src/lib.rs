//! Redlock Redis - Redis storage node
//!
//! Realizes the two node primitives against a single Redis master:
//! - Acquire: `SET key value NX PX ttl_ms`
//! - Release: Lua compare-and-delete, executed atomically server-side

mod error;
mod node;

pub use error::RedisNodeError;
pub use node::{RedisNode, UNLOCK_SCRIPT};
