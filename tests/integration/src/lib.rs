//! Integration test utilities for the chat core
//!
//! `backend` is an in-process server for the REST routes and the realtime relay;
//! `helpers` starts it and opens chat sessions against it.

pub mod backend;
pub mod fixtures;

pub use backend::{router, BackendState};
pub use fixtures::*;
pub use helpers::*;
