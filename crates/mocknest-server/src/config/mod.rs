//! Server configuration, loaded from a YAML file.
//!
//! Besides listener and operational settings, the file carries project
//! seed definitions that populate the in-memory store at startup. Seed
//! ids are optional; stable ids are derived from slug, method, and path
//! when omitted.

use crate::model::{
    default_status_code, default_true, default_weight, deserialize_status_code, normalize_path,
    Mock, Project, ResponseDef, ResponseType, SUPPORTED_METHODS,
};
use crate::store::InMemoryStore;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub request_log: RequestLogConfig,
    #[serde(default)]
    pub projects: Vec<ProjectSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLogConfig {
    /// Bounded queue between the handler and the log consumer task.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// A project definition as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSeed {
    #[serde(default)]
    pub id: Option<String>,
    pub slug: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub mocks: Vec<MockSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockSeed {
    #[serde(default)]
    pub id: Option<String>,
    pub path: String,
    pub method: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub response_type: ResponseType,
    #[serde(default)]
    pub response_delay_ms: u64,
    #[serde(default)]
    pub responses: Vec<ResponseSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSeed {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(
        default = "default_status_code",
        deserialize_with = "deserialize_status_code"
    )]
    pub status_code: u16,
    /// JSON-encoded header map, matching the at-rest representation.
    #[serde(default)]
    pub headers: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "default_weight")]
    pub weight: u64,
    /// JSON-encoded condition list, matching the at-rest representation.
    #[serde(default)]
    pub conditions: Option<String>,
}

impl Config {
    /// Load configuration from a YAML file and validate it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config =
            serde_yaml::from_str(&contents).context("Failed to parse config file as YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen_slugs = HashSet::new();
        for project in &self.projects {
            if project.slug.is_empty() {
                bail!("Project slug must not be empty");
            }
            if !project
                .slug
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                bail!(
                    "Project slug '{}' contains characters outside [a-zA-Z0-9_-]",
                    project.slug
                );
            }
            if !seen_slugs.insert(project.slug.as_str()) {
                bail!("Duplicate project slug: '{}'", project.slug);
            }

            for mock in &project.mocks {
                let method = mock.method.to_ascii_uppercase();
                if !SUPPORTED_METHODS.contains(&method.as_str()) {
                    bail!(
                        "Mock '{}' in project '{}' uses unsupported method '{}'",
                        mock.path,
                        project.slug,
                        mock.method
                    );
                }
                let defaults = mock.responses.iter().filter(|r| r.is_default).count();
                if defaults > 1 {
                    bail!(
                        "Mock '{}' in project '{}' declares {} default responses, at most one is allowed",
                        mock.path,
                        project.slug,
                        defaults
                    );
                }
            }
        }
        Ok(())
    }

    /// Materialize the seed definitions into a populated store.
    pub fn seed_store(&self) -> InMemoryStore {
        let store = InMemoryStore::new();
        for project in &self.projects {
            let project_id = project.id.clone().unwrap_or_else(|| project.slug.clone());
            store.insert_project(Project {
                id: project_id.clone(),
                slug: project.slug.clone(),
                user_id: project.user_id.clone(),
                organization_id: project.organization_id.clone(),
            });

            for mock in &project.mocks {
                let path = normalize_path(&mock.path);
                let method = mock.method.to_ascii_uppercase();
                let mock_id = mock
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("{project_id}:{method}:{path}"));
                store.insert_mock(Mock {
                    id: mock_id.clone(),
                    project_id: project_id.clone(),
                    path,
                    method,
                    is_active: mock.is_active,
                    response_type: mock.response_type,
                    response_delay_ms: mock.response_delay_ms,
                });

                for (index, response) in mock.responses.iter().enumerate() {
                    let response_id = response
                        .id
                        .clone()
                        .unwrap_or_else(|| format!("{mock_id}#{index}"));
                    store.insert_response(ResponseDef {
                        id: response_id,
                        mock_id: mock_id.clone(),
                        status_code: response.status_code,
                        headers: response.headers.clone(),
                        body: response.body.clone(),
                        is_default: response.is_default,
                        weight: response.weight,
                        conditions: response.conditions.clone(),
                    });
                }
            }
        }
        store
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_queue_capacity() -> usize {
    1024
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockStore;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
listen:
  port: 9000
projects:
  - slug: acme
    mocks:
      - path: /hello
        method: get
        responses:
          - statusCode: 200
            body: '{"message":"hi"}'
      - path: users/{id}
        method: GET
        responseType: text
        responses:
          - body: found
"#;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_sample_config() {
        let file = write_config(SAMPLE);
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.listen.port, 9000);
        assert_eq!(config.listen.host, "0.0.0.0");
        assert_eq!(config.metrics.port, 9090);
        assert_eq!(config.request_log.queue_capacity, 1024);
        assert_eq!(config.projects.len(), 1);
        assert_eq!(config.projects[0].mocks.len(), 2);
    }

    #[tokio::test]
    async fn test_seed_store_derives_ids_and_normalizes() {
        let file = write_config(SAMPLE);
        let config = Config::from_file(file.path()).unwrap();
        let store = config.seed_store();

        let project = store.project_by_slug("acme").await.unwrap().unwrap();
        assert_eq!(project.id, "acme");

        let mock = store
            .find_exact_mock("acme", "/hello", "GET")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mock.id, "acme:GET:/hello");

        let template = store
            .find_exact_mock("acme", "/users/{id}", "GET")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(template.response_type, ResponseType::Text);

        let responses = store.responses_for_mock(&mock.id).await.unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].id, "acme:GET:/hello#0");
        assert_eq!(responses[0].status_code, 200);
    }

    #[test]
    fn test_validate_rejects_bad_slug() {
        let config = Config {
            projects: vec![ProjectSeed {
                id: None,
                slug: "bad slug!".to_string(),
                user_id: None,
                organization_id: None,
                mocks: vec![],
            }],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_slug() {
        let seed = ProjectSeed {
            id: None,
            slug: "acme".to_string(),
            user_id: None,
            organization_id: None,
            mocks: vec![],
        };
        let config = Config {
            projects: vec![seed.clone(), seed],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unsupported_method() {
        let file = write_config(
            r#"
projects:
  - slug: acme
    mocks:
      - path: /hello
        method: TRACE
"#,
        );
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_multiple_defaults() {
        let file = write_config(
            r#"
projects:
  - slug: acme
    mocks:
      - path: /hello
        method: GET
        responses:
          - body: a
            isDefault: true
          - body: b
            isDefault: true
"#,
        );
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(Config::from_file("/nonexistent/config.yaml").is_err());
    }
}
