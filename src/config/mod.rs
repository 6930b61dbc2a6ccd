//! Configuration module for Tidecrawl
//!
//! Handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use tidecrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawl mode: {:?}", config.crawl.mode);
//! ```

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{
    CacheConfig, Config, CrawlConfig, CrawlMode, LoginConfig, LoginType, PlatformConfig,
    ProxyConfig,
};
