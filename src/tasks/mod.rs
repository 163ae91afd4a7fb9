//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside a cache.
//!
//! # Tasks
//! - Expiration sweeper: removes expired entries at the configured interval

mod sweeper;

pub use sweeper::{Sweep, Sweeper};
