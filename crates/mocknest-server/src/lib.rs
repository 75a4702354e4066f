//! Mocknest execution engine: serves user-defined mock APIs over HTTP.
//!
//! A request like `GET /{project-slug}/some/path` is resolved to a project,
//! then to a mock (exact path first, `{name}` templates second), then to one
//! of the mock's configured responses via condition matching and weighted
//! random selection. Executions are recorded to an append-only request log
//! off the response path.

pub mod condition;
pub mod config;
pub mod matcher;
pub mod metrics;
pub mod model;
pub mod request_log;
pub mod resolver;
pub mod selector;
pub mod server;
pub mod store;
