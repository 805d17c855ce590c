//! Recover a task hierarchy from free-form model output.
//!
//! Models are asked for a bare JSON array but do not always comply. The
//! parser accepts, in order of preference:
//!
//! 1. the answer as-is;
//! 2. the body of a ```` ```json ```` fence;
//! 3. the outermost `[...]` (or `{...}`) slice of the answer;
//! 4. a truncated array, cut back to its last complete group.
//!
//! The decoded value may be an array of groups, an object with a `groups`
//! array, or a single group object. Field names are matched loosely
//! (`group`/`name`/`title`, `items`/`tasks`, `task`/`item`/`name`,
//! `time_estimation_AI`/`time_estimation`/`estimate`). Estimates are clamped
//! to the realistic range; items with a blank task or no usable estimate are
//! dropped, and so are groups left without items.

use crate::error::ChunkError;
use crate::model::{parse_estimate, Group, Item, ESTIMATE_MAX, ESTIMATE_MIN};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

static RE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*\n?(.*?)```").unwrap());

/// How far back the truncation repair searches for a closing brace.
const MAX_REPAIR_ATTEMPTS: usize = 64;

const GROUP_NAME_KEYS: &[&str] = &["group", "name", "title", "group_name"];
const GROUP_ITEMS_KEYS: &[&str] = &["items", "tasks"];
const TASK_KEYS: &[&str] = &["task", "item", "name", "title"];
const ESTIMATE_KEYS: &[&str] = &[
    "time_estimation_AI",
    "time_estimation_ai",
    "time_estimation",
    "estimate",
    "time_estimate",
];

/// Name given to a group the model left untitled.
const UNTITLED_GROUP: &str = "General";

/// Parse one chunk's answer into groups.
pub fn parse_groups(chunk: usize, content: &str) -> Result<Vec<Group>, ChunkError> {
    let value = recover_json(content).ok_or_else(|| ChunkError::Unparseable {
        chunk,
        detail: describe_unparseable(content),
    })?;

    let groups: Vec<Group> = group_values(&value)
        .into_iter()
        .filter_map(to_group)
        .collect();

    if groups.is_empty() {
        return Err(ChunkError::NoGroups { chunk });
    }
    Ok(groups)
}

/// Merge per-chunk groups in chunk order.
///
/// Groups whose names are equal ignoring case and surrounding whitespace are
/// combined; the first spelling and first position win, items keep their
/// arrival order.
pub fn merge_groups<I>(chunks: I) -> Vec<Group>
where
    I: IntoIterator<Item = Vec<Group>>,
{
    let mut merged: Vec<Group> = Vec::new();
    for group in chunks.into_iter().flatten() {
        let key = group.name.trim().to_lowercase();
        match merged
            .iter_mut()
            .find(|g| g.name.trim().to_lowercase() == key)
        {
            Some(existing) => existing.items.extend(group.items),
            None => merged.push(group),
        }
    }
    merged
}

fn recover_json(content: &str) -> Option<Value> {
    let trimmed = content.trim();
    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return Some(v);
    }

    let fenced = RE_FENCE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim());
    if let Some(body) = fenced {
        if let Ok(v) = serde_json::from_str::<Value>(body) {
            debug!("Recovered JSON from code fence");
            return Some(v);
        }
    }

    let body = fenced.unwrap_or(trimmed);
    for (open, close) in [('[', ']'), ('{', '}')] {
        if let Some(slice) = outermost(body, open, close) {
            if let Ok(v) = serde_json::from_str::<Value>(slice) {
                debug!("Recovered JSON from outermost {open}{close} slice");
                return Some(v);
            }
        }
    }

    repair_truncated_array(body)
}

fn outermost(s: &str, open: char, close: char) -> Option<&str> {
    let start = s.find(open)?;
    let end = s.rfind(close)?;
    (end > start).then(|| &s[start..=end])
}

/// Cut a truncated array back to its last complete element and close it.
fn repair_truncated_array(s: &str) -> Option<Value> {
    let start = s.find('[')?;
    let body = &s[start..];
    let closings: Vec<usize> = body.match_indices('}').map(|(i, _)| i).collect();
    for &pos in closings.iter().rev().take(MAX_REPAIR_ATTEMPTS) {
        let candidate = format!("{}]", &body[..=pos]);
        if let Ok(v @ Value::Array(_)) = serde_json::from_str::<Value>(&candidate) {
            debug!("Recovered truncated JSON array ({} of {} bytes)", pos + 1, body.len());
            return Some(v);
        }
    }
    None
}

fn group_values(value: &Value) -> Vec<&Map<String, Value>> {
    match value {
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        Value::Object(obj) => match obj.get("groups").and_then(Value::as_array) {
            Some(groups) => groups.iter().filter_map(Value::as_object).collect(),
            None => vec![obj],
        },
        _ => Vec::new(),
    }
}

fn first_str<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

fn to_group(obj: &Map<String, Value>) -> Option<Group> {
    let name = first_str(obj, GROUP_NAME_KEYS).unwrap_or(UNTITLED_GROUP);
    let raw_items = GROUP_ITEMS_KEYS
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_array))?;

    let items: Vec<Item> = raw_items.iter().filter_map(to_item).collect();
    if items.is_empty() {
        debug!("Dropping group '{}' with no usable items", name);
        return None;
    }
    Some(Group::new(name, items))
}

fn to_item(value: &Value) -> Option<Item> {
    let obj = value.as_object()?;
    let task = first_str(obj, TASK_KEYS)?;
    let Some(estimate) = ESTIMATE_KEYS
        .iter()
        .find_map(|k| obj.get(*k).and_then(parse_estimate))
    else {
        debug!("Dropping task '{}' without a usable estimate", task);
        return None;
    };
    Some(Item::new(task, estimate.clamp(ESTIMATE_MIN, ESTIMATE_MAX)))
}

fn describe_unparseable(content: &str) -> String {
    let preview: String = content.trim().chars().take(80).collect();
    if preview.is_empty() {
        "empty response".to_string()
    } else {
        format!("no JSON found in response starting with {preview:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_array() {
        let groups = parse_groups(
            1,
            r#"[{"group":"Authentication","items":[{"task":"Add login form","time_estimation_AI":0.5}]}]"#,
        )
        .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "Authentication");
        assert_eq!(groups[0].items[0].estimate, 0.5);
    }

    #[test]
    fn strips_fences_and_chatter() {
        let content = "Sure! Here is the board:\n```json\n[{\"group\":\"Billing\",\"items\":[{\"task\":\"Invoices\",\"time_estimation\":\"2\"}]}]\n```\nLet me know.";
        let groups = parse_groups(1, content).unwrap();
        assert_eq!(groups[0].name, "Billing");
        assert_eq!(groups[0].items[0].estimate, 2.0);
    }

    #[test]
    fn accepts_groups_object_and_single_group() {
        let wrapped = r#"{"groups":[{"name":"Admin","tasks":[{"name":"Audit log","time_estimation_AI":"1"}]}]}"#;
        let g = parse_groups(1, wrapped).unwrap();
        assert_eq!(g[0].name, "Admin");
        assert_eq!(g[0].items[0].task, "Audit log");
        assert_eq!(g[0].items[0].estimate, 1.0);

        let single = r#"{"group":"Search","items":[{"item":"Index docs","estimate":"1.5 days"}]}"#;
        let g = parse_groups(1, single).unwrap();
        assert_eq!(g[0].items[0].estimate, 1.5);
    }

    #[test]
    fn clamps_estimates_and_drops_blanks() {
        let content = r#"[{"group":"Ops","items":[
            {"task":"Deploy","time_estimation_AI":10},
            {"task":"Monitor","time_estimation_AI":0.01},
            {"task":"  ","time_estimation_AI":1},
            {"task":"Backups"},
            {"task":"Alerts","time_estimation_AI":"soon"}
        ]},{"group":"Empty","items":[]},{"group":"Vague","items":["Just a string"]}]"#;
        let g = parse_groups(1, content).unwrap();
        assert_eq!(g.len(), 1);
        assert_eq!(g[0].items.len(), 2);
        assert_eq!(g[0].items[0].estimate, ESTIMATE_MAX);
        assert_eq!(g[0].items[1].estimate, ESTIMATE_MIN);
    }

    #[test]
    fn repairs_truncated_output() {
        let content = r#"[{"group":"A","items":[{"task":"One","time_estimation_AI":1}]},{"group":"B","items":[{"task":"Tw"#;
        let g = parse_groups(1, content).unwrap();
        assert_eq!(g.len(), 1);
        assert_eq!(g[0].name, "A");
    }

    #[test]
    fn prose_is_unparseable() {
        let err = parse_groups(3, "I cannot help with that.").unwrap_err();
        assert!(matches!(err, ChunkError::Unparseable { chunk: 3, .. }));
        let err = parse_groups(4, "").unwrap_err();
        assert!(err.to_string().contains("empty response"));
    }

    #[test]
    fn valid_json_without_groups() {
        let err = parse_groups(2, r#"{"status":"ok"}"#).unwrap_err();
        assert!(matches!(err, ChunkError::NoGroups { chunk: 2 }));
    }

    #[test]
    fn merge_is_case_insensitive_and_ordered() {
        let merged = merge_groups(vec![
            vec![
                Group::new("Auth", vec![Item::new("Login", 1.0)]),
                Group::new("Billing", vec![Item::new("Invoices", 2.0)]),
            ],
            vec![
                Group::new("auth ", vec![Item::new("Logout", 0.5)]),
                Group::new("Reports", vec![Item::new("Export", 1.0)]),
            ],
        ]);
        let names: Vec<_> = merged.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["Auth", "Billing", "Reports"]);
        let tasks: Vec<_> = merged[0].items.iter().map(|i| i.task.as_str()).collect();
        assert_eq!(tasks, ["Login", "Logout"]);
    }
}
