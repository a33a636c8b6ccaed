//! Cache and aggregate the messages of a chained-BFT consensus engine.
//!
//! # Status
//!
//! `chainmaker-consensus` is **ALPHA** software and is not yet recommended for production use.
//! Developers should expect breaking changes and occasional instability.

pub mod chainedbft;
pub mod types;
