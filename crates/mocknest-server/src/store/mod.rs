//! Read-side data store contracts consumed by the execution engine.
//!
//! The engine never owns persistence: it performs independent point lookups
//! against whatever backend implements [`MockStore`] and appends request
//! logs through the same trait. `InMemoryStore` is both the standalone
//! backend (seeded from the config file) and the test double.

mod memory;

pub use memory::InMemoryStore;

use crate::model::{Mock, Project, RequestLog, ResponseDef};
use async_trait::async_trait;

/// Error raised by a storage backend. Surfaces as `INTERNAL_ERROR` at the
/// execution handler; never shown to callers in detail.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Collaborator contract for project/mock/response lookups and the
/// append-only request log.
#[async_trait]
pub trait MockStore: Send + Sync {
    /// Look up a project by its public slug.
    async fn project_by_slug(&self, slug: &str) -> Result<Option<Project>, StoreError>;

    /// Zero-or-one active mock with the exact path and uppercase method.
    async fn find_exact_mock(
        &self,
        project_id: &str,
        path: &str,
        method: &str,
    ) -> Result<Option<Mock>, StoreError>;

    /// All active mocks for the project and method, for template scanning.
    async fn mocks_for_project(
        &self,
        project_id: &str,
        method: &str,
    ) -> Result<Vec<Mock>, StoreError>;

    /// All responses configured for a mock, in stored order.
    async fn responses_for_mock(&self, mock_id: &str) -> Result<Vec<ResponseDef>, StoreError>;

    /// Append one request log row. Attempted exactly once per request.
    async fn insert_log(&self, log: RequestLog) -> Result<(), StoreError>;
}
