//! Core types, tokenizer, and configuration for wordfleet.
//!
//! This crate provides the pieces shared by the scanning agent and the
//! counting service:
//!
//! - [`WordCount`] and its additive [`merge`](WordCount::merge)
//! - The memory-mapped tokenizer ([`count_file`], [`tokenize`])
//! - Error types ([`ConfigError`], [`CountError`])
//! - Configuration structures ([`Config`], [`ScanConfig`], [`ServiceConfig`])
//! - `FxHashMap` aliases used for word tables
//!
//! # Example
//!
//! ```
//! use wf_core::{WordCount, tokenize};
//!
//! let mut total = WordCount::new();
//! total.merge(&tokenize(b"the fox"));
//! total.merge(&tokenize(b"the dog"));
//! assert_eq!(total.get("the"), 2);
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod count;
pub mod error;
pub mod hash;
pub mod tokenize;

pub use config::{
    Config, DEFAULT_CACHE_CAPACITY, DEFAULT_PORT, ScanConfig, ServiceConfig, default_parallelism,
};
pub use count::WordCount;
pub use error::{ConfigError, CountError};
pub use hash::{FxBuildHasher, FxHashMap, fx_hash_map_with_capacity};
pub use tokenize::{count_file, tokenize, words};
