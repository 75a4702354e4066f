//! Mock resolution: find the single best-matching mock for a request.
//!
//! Two-phase strategy: an exact path+method match always wins, then
//! template candidates are tried in order of decreasing raw path length —
//! a deliberate specificity proxy that avoids a routing trie while giving
//! longer templates priority on ties. Only active mocks are considered.

use crate::matcher::match_path;
use crate::model::Mock;
use crate::store::{MockStore, StoreError};
use std::collections::HashMap;

/// A resolved mock plus the path parameters extracted while matching.
/// Exact matches carry an empty parameter map.
#[derive(Debug, Clone)]
pub struct ResolvedMock {
    pub mock: Mock,
    pub path_params: HashMap<String, String>,
}

/// Resolve the mock for `path` + `method` within a project, or `None`.
pub async fn resolve_mock(
    store: &dyn MockStore,
    project_id: &str,
    path: &str,
    method: &str,
) -> Result<Option<ResolvedMock>, StoreError> {
    let method = method.to_ascii_uppercase();

    if let Some(mock) = store.find_exact_mock(project_id, path, &method).await? {
        return Ok(Some(ResolvedMock {
            mock,
            path_params: HashMap::new(),
        }));
    }

    let mut templates: Vec<Mock> = store
        .mocks_for_project(project_id, &method)
        .await?
        .into_iter()
        .filter(Mock::is_template)
        .collect();
    templates.sort_by(|a, b| b.path.len().cmp(&a.path.len()));

    for mock in templates {
        let result = match_path(&mock.path, path);
        if result.is_match {
            return Ok(Some(ResolvedMock {
                mock,
                path_params: result.params,
            }));
        }
    }

    Ok(None)
}
