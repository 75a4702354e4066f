//! In-memory implementation of the mock store.
//!
//! Backs the standalone server (seeded from the config file) and the test
//! suite. Single-instance only; reads are point lookups over RwLock'd
//! vectors, which is plenty for fixture-sized data sets.

use super::{MockStore, StoreError};
use crate::model::{Mock, Project, RequestLog, ResponseDef};
use async_trait::async_trait;
use parking_lot::RwLock;

#[derive(Default)]
struct Inner {
    projects: Vec<Project>,
    mocks: Vec<Mock>,
    responses: Vec<ResponseDef>,
    logs: Vec<RequestLog>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_project(&self, project: Project) {
        self.inner.write().projects.push(project);
    }

    pub fn insert_mock(&self, mock: Mock) {
        self.inner.write().mocks.push(mock);
    }

    pub fn insert_response(&self, response: ResponseDef) {
        self.inner.write().responses.push(response);
    }

    /// Snapshot of the request log, oldest first.
    pub fn logs(&self) -> Vec<RequestLog> {
        self.inner.read().logs.clone()
    }
}

#[async_trait]
impl MockStore for InMemoryStore {
    async fn project_by_slug(&self, slug: &str) -> Result<Option<Project>, StoreError> {
        let inner = self.inner.read();
        Ok(inner.projects.iter().find(|p| p.slug == slug).cloned())
    }

    async fn find_exact_mock(
        &self,
        project_id: &str,
        path: &str,
        method: &str,
    ) -> Result<Option<Mock>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .mocks
            .iter()
            .find(|m| {
                m.is_active && m.project_id == project_id && m.path == path && m.method == method
            })
            .cloned())
    }

    async fn mocks_for_project(
        &self,
        project_id: &str,
        method: &str,
    ) -> Result<Vec<Mock>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .mocks
            .iter()
            .filter(|m| m.is_active && m.project_id == project_id && m.method == method)
            .cloned()
            .collect())
    }

    async fn responses_for_mock(&self, mock_id: &str) -> Result<Vec<ResponseDef>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .responses
            .iter()
            .filter(|r| r.mock_id == mock_id)
            .cloned()
            .collect())
    }

    async fn insert_log(&self, log: RequestLog) -> Result<(), StoreError> {
        self.inner.write().logs.push(log);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResponseType;

    fn project(id: &str, slug: &str) -> Project {
        Project {
            id: id.to_string(),
            slug: slug.to_string(),
            user_id: Some("u1".to_string()),
            organization_id: None,
        }
    }

    fn mock(id: &str, project_id: &str, path: &str, method: &str, is_active: bool) -> Mock {
        Mock {
            id: id.to_string(),
            project_id: project_id.to_string(),
            path: path.to_string(),
            method: method.to_string(),
            is_active,
            response_type: ResponseType::Json,
            response_delay_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_project_lookup_by_slug() {
        let store = InMemoryStore::new();
        store.insert_project(project("p1", "acme"));

        let found = store.project_by_slug("acme").await.unwrap();
        assert_eq!(found.unwrap().id, "p1");
        assert!(store.project_by_slug("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exact_mock_ignores_inactive() {
        let store = InMemoryStore::new();
        store.insert_mock(mock("m1", "p1", "/hello", "GET", false));

        let found = store.find_exact_mock("p1", "/hello", "GET").await.unwrap();
        assert!(found.is_none());

        store.insert_mock(mock("m2", "p1", "/hello", "GET", true));
        let found = store.find_exact_mock("p1", "/hello", "GET").await.unwrap();
        assert_eq!(found.unwrap().id, "m2");
    }

    #[tokio::test]
    async fn test_mocks_for_project_filters_method_and_active() {
        let store = InMemoryStore::new();
        store.insert_mock(mock("m1", "p1", "/a", "GET", true));
        store.insert_mock(mock("m2", "p1", "/b", "POST", true));
        store.insert_mock(mock("m3", "p1", "/c", "GET", false));
        store.insert_mock(mock("m4", "p2", "/d", "GET", true));

        let mocks = store.mocks_for_project("p1", "GET").await.unwrap();
        assert_eq!(mocks.len(), 1);
        assert_eq!(mocks[0].id, "m1");
    }

    #[tokio::test]
    async fn test_log_append_only() {
        let store = InMemoryStore::new();
        let log = RequestLog {
            project_id: Some("p1".to_string()),
            mock_id: None,
            method: "GET".to_string(),
            path: "/missing".to_string(),
            headers: "{}".to_string(),
            body: None,
            query: "{}".to_string(),
            response_status: 404,
            elapsed_ms: 3,
            client_ip: "127.0.0.1".to_string(),
            user_agent: None,
            timestamp: chrono::Utc::now(),
        };
        store.insert_log(log.clone()).await.unwrap();
        store.insert_log(log).await.unwrap();
        assert_eq!(store.logs().len(), 2);
    }
}
