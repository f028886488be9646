//! # mememori-http
//!
//! REST adapter implementing the `ChatBackend` port with `reqwest`.
//!
//! ## Overview
//!
//! - `HttpBackend` owns one pooled `reqwest::Client` and the configured base URL
//! - Wire models for the responses that do not map one-to-one onto domain entities
//! - Mapping of transport failures and non-2xx statuses onto `DomainError`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mememori_common::ClientConfig;
//! use mememori_http::HttpBackend;
//!
//! let config = ClientConfig::from_env()?;
//! let backend = HttpBackend::new(&config.backend)?;
//! let thread = backend.find_thread_by_item(&item_id).await?;
//! ```

mod backend;
pub mod client;
pub mod error;
pub mod models;

pub use client::HttpBackend;
