//! Redlock Implementation
//!
//! This module provides:
//! - Lock value and per-node reports
//! - Bounded retry with jitter
//! - Quorum lock manager (acquire/release)

mod manager;
mod model;
mod retry;

pub use manager::*;
pub use model::*;
pub use retry::*;
