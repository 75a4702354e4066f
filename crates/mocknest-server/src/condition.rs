//! Single-condition evaluation against a captured request.
//!
//! Total function: malformed regex values, missing fields, type mismatches,
//! and unknown types/operators all degrade to "does not match". Nothing in
//! here returns an error or panics on well-formed inputs.

use crate::model::{Condition, ConditionOperator, ConditionType, MockRequest};
use regex::Regex;
use std::collections::HashMap;

/// Evaluate one condition against the request and the path parameters
/// extracted by the path matcher.
pub fn evaluate(
    condition: &Condition,
    request: &MockRequest,
    path_params: &HashMap<String, String>,
) -> bool {
    let actual = match condition.kind {
        ConditionType::Header => lookup_header(&request.headers, &condition.field),
        ConditionType::Query => request.query.get(&condition.field).cloned(),
        ConditionType::Body => lookup_body_field(request.body.as_deref(), &condition.field),
        ConditionType::Path => path_params.get(&condition.field).cloned(),
        ConditionType::Unknown => None,
    };

    let Some(actual) = actual else {
        return false;
    };

    match condition.operator {
        ConditionOperator::Equals => actual == condition.value,
        ConditionOperator::Contains => actual.contains(&condition.value),
        ConditionOperator::Regex => Regex::new(&condition.value)
            .map(|re| re.is_match(&actual))
            .unwrap_or(false),
        ConditionOperator::Unknown => false,
    }
}

/// Header names are compared case-insensitively.
fn lookup_header(headers: &HashMap<String, String>, field: &str) -> Option<String> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(field))
        .map(|(_, v)| v.clone())
}

/// Body conditions are only defined when the body parses as a JSON object.
/// A null value counts as absent; non-string values use their JSON form.
fn lookup_body_field(body: Option<&str>, field: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(body?).ok()?;
    let object = parsed.as_object()?;
    match object.get(field)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Parse a query string into a map, URL-decoding both keys and values.
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let decoded_key = urlencoding::decode(key).unwrap_or_default().into_owned();
            let decoded_value = urlencoding::decode(value).unwrap_or_default().into_owned();
            Some((decoded_key, decoded_value))
        })
        .collect()
}
