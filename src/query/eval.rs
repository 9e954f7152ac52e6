use ordered_float::OrderedFloat;
use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::queryable::Record;
use super::types::{CmpOp, MAX_IN_SET, MAX_PATH_DEPTH, Predicate};

pub fn eval_predicate<R: Record + ?Sized>(row: &R, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::True => true,
        Predicate::And(ps) => ps.iter().all(|p| eval_predicate(row, p)),
        Predicate::Or(ps) => ps.iter().any(|p| eval_predicate(row, p)),
        Predicate::Not(p) => !eval_predicate(row, p),
        Predicate::Exists { path, exists } => {
            row.field(path).is_some_and(|v| !v.is_null()) == *exists
        }
        Predicate::In { path, values } => row.field(path).is_some_and(|v| is_in_set(v, values)),
        Predicate::Nin { path, values } => !row.field(path).is_some_and(|v| is_in_set(v, values)),
        Predicate::Cmp { path, op, value } => {
            let Some(v) = row.field(path) else { return false };
            let ord = compare_values(v, value);
            match op {
                CmpOp::Eq => values_equal(v, value),
                CmpOp::Gt => ord == Ordering::Greater,
                CmpOp::Gte => ord != Ordering::Less,
                CmpOp::Lt => ord == Ordering::Less,
                CmpOp::Lte => ord != Ordering::Greater,
            }
        }
        Predicate::Contains { path, needle, case_insensitive } => {
            let Some(v) = row.field(path) else { return false };
            let hay = value_text(v);
            if *case_insensitive {
                hay.to_lowercase().contains(&needle.to_lowercase())
            } else {
                hay.contains(needle.as_str())
            }
        }
    }
}

/// String form used for keys and text matching: strings unquoted, everything else as JSON.
#[must_use]
pub fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => OrderedFloat(x) == OrderedFloat(y),
        _ => a == b,
    }
}

fn is_in_set(v: &Value, set: &[Value]) -> bool {
    set.iter().take(MAX_IN_SET).any(|x| values_equal(v, x))
}

/// Resolves a dotted path inside a JSON object.
pub(crate) fn get_path<'a>(doc: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if path.is_empty() || path.len() > 1024 {
        return None;
    }
    let mut parts = path.split('.');
    let mut cur = doc.get(parts.next()?)?;
    for (depth, part) in parts.enumerate() {
        if depth + 1 >= MAX_PATH_DEPTH {
            return None;
        }
        cur = cur.as_object()?.get(part)?;
    }
    Some(cur)
}

/// Total order over JSON values: numbers numerically, then by type rank.
#[must_use]
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return OrderedFloat(x).cmp(&OrderedFloat(y));
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                let o = compare_values(l, r);
                if o != Ordering::Equal {
                    return o;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

const fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn dotted_paths_reach_nested_fields() {
        let r = row(json!({"author": {"name": "Ada"}}));
        assert_eq!(get_path(&r, "author.name"), Some(&json!("Ada")));
        assert_eq!(get_path(&r, "author.age"), None);
        assert_eq!(get_path(&r, "author.name.first"), None);
    }

    #[test]
    fn numbers_compare_across_representations() {
        let r = row(json!({"n": 3}));
        assert!(eval_predicate(&r, &Predicate::eq("n", json!(3.0))));
        assert!(eval_predicate(&r, &Predicate::Cmp { path: "n".into(), op: CmpOp::Gte, value: json!(2.5) }));
        assert!(eval_predicate(&r, &Predicate::In { path: "n".into(), values: vec![json!(1), json!(3)] }));
    }

    #[test]
    fn contains_is_optionally_case_insensitive() {
        let r = row(json!({"title": "Hello World"}));
        let p = |ci| Predicate::Contains { path: "title".into(), needle: "WORLD".into(), case_insensitive: ci };
        assert!(eval_predicate(&r, &p(true)));
        assert!(!eval_predicate(&r, &p(false)));
    }

    #[test]
    fn missing_fields_fail_comparisons_but_pass_nin() {
        let r = row(json!({}));
        assert!(!eval_predicate(&r, &Predicate::eq("x", json!(1))));
        assert!(eval_predicate(&r, &Predicate::Nin { path: "x".into(), values: vec![json!(1)] }));
        assert!(eval_predicate(&r, &Predicate::Exists { path: "x".into(), exists: false }));
    }
}
