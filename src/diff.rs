use serde_json::{Map, Value};

/// Tydom bodies are arrays of objects identified by `id` (devices,
/// endpoints) or `name` (data entries). Such elements are matched by that
/// key so a reordered array does not show up as a change.
fn element_key(index: usize, element: &Value) -> String {
    if let Some(id) = element.get("id") {
        match id {
            Value::String(s) => return format!("[id={s}]"),
            Value::Number(n) => return format!("[id={n}]"),
            _ => {}
        }
    }
    if let Some(name) = element.get("name").and_then(|v| v.as_str()) {
        return format!("[name={name}]");
    }
    format!("[{index}]")
}

fn keyed(arr: &[Value]) -> Vec<(String, &Value)> {
    arr.iter()
        .enumerate()
        .map(|(i, v)| (element_key(i, v), v))
        .collect()
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else if segment.starts_with('[') {
        format!("{prefix}{segment}")
    } else {
        format!("{prefix}.{segment}")
    }
}

pub(crate) fn diff_json(
    previous: &Value,
    current: &Value,
    path_prefix: &str,
    changes: &mut Vec<(String, Value, Value)>,
) {
    match (previous, current) {
        (Value::Object(prev_map), Value::Object(curr_map)) => {
            for (key, curr_val) in curr_map {
                let path = join(path_prefix, key);
                match prev_map.get(key) {
                    Some(prev_val) => diff_json(prev_val, curr_val, &path, changes),
                    None => diff_added(curr_val, &path, changes),
                }
            }
        }
        (Value::Array(prev_arr), Value::Array(curr_arr)) => {
            let prev_keyed = keyed(prev_arr);
            for (key, curr_val) in keyed(curr_arr) {
                let path = join(path_prefix, &key);
                match prev_keyed.iter().find(|(k, _)| *k == key) {
                    Some((_, prev_val)) => diff_json(prev_val, curr_val, &path, changes),
                    None => diff_added(curr_val, &path, changes),
                }
            }
        }
        (prev, curr) if prev != curr => {
            changes.push((path_prefix.to_string(), prev.clone(), curr.clone()));
        }
        _ => {}
    }
}

fn diff_added(value: &Value, path: &str, changes: &mut Vec<(String, Value, Value)>) {
    match value {
        Value::Object(_) => diff_json(&Value::Object(Map::new()), value, path, changes),
        Value::Array(_) => diff_json(&Value::Array(Vec::new()), value, path, changes),
        _ => changes.push((path.to_string(), Value::Null, value.clone())),
    }
}
