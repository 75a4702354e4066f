//! Path-template matching and parameter extraction.
//!
//! A template like `/users/{id}/posts/{postId}` is compiled to an anchored
//! regex where every `{name}` placeholder matches one non-slash segment and
//! every other character is literal. The whole path must be consumed, so a
//! differing segment count never partially matches.

use regex::Regex;
use std::collections::HashMap;

/// Result of matching an actual path against a template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathMatch {
    pub is_match: bool,
    /// Placeholder name -> captured segment, in declaration order.
    pub params: HashMap<String, String>,
}

impl PathMatch {
    fn no_match() -> Self {
        PathMatch::default()
    }
}

/// Match `actual` against `template`, extracting named parameters.
///
/// Pure function: no I/O, referentially transparent. A template whose
/// generated pattern fails to compile degrades to no-match.
pub fn match_path(template: &str, actual: &str) -> PathMatch {
    let (pattern, names) = compile_template(template);

    let Ok(regex) = Regex::new(&pattern) else {
        return PathMatch::no_match();
    };
    let Some(captures) = regex.captures(actual) else {
        return PathMatch::no_match();
    };

    let params = names
        .iter()
        .enumerate()
        .filter_map(|(i, name)| {
            captures
                .get(i + 1)
                .map(|m| (name.clone(), m.as_str().to_string()))
        })
        .collect();

    PathMatch {
        is_match: true,
        params,
    }
}

/// Build the anchored pattern and the ordered placeholder names.
///
/// Literal chunks are regex-escaped so dots and other metacharacters in the
/// template match themselves. An unclosed `{` is treated literally.
fn compile_template(template: &str) -> (String, Vec<String>) {
    let mut pattern = String::from("^");
    let mut names = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let (literal, after) = rest.split_at(open);
        pattern.push_str(&regex::escape(literal));
        match after[1..].find('}') {
            Some(close) => {
                names.push(after[1..1 + close].to_string());
                pattern.push_str("([^/]+)");
                rest = &after[close + 2..];
            }
            None => {
                pattern.push_str(&regex::escape(after));
                rest = "";
            }
        }
    }
    pattern.push_str(&regex::escape(rest));
    pattern.push('$');

    (pattern, names)
}
