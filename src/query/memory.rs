//! In-process [`Queryable`] over JSON rows.
//!
//! Raw ordering expressions understood here:
//! - `POSITION(<path> IN '<k1>', '<k2>', ...)`: rank by position of the field's text in the
//!   list, unlisted rows last (quotes inside keys are doubled);
//! - `<path> [asc|desc], ...`: a plain column list.

use crate::errors::PageError;
use crate::sort::{Direction, RawExpr, Sort, SortKey, SortMap, SortValue};
use crate::utils::num::u64_to_usize_saturating;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;

use super::eval::{compare_values, eval_predicate, value_text};
use super::queryable::{Queryable, Record};
use super::types::Predicate;

type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
enum OrderTerm {
    Path { path: String, direction: Direction },
    Rank { path: String, keys: Vec<String>, direction: Direction },
}

#[derive(Debug, Clone, Default)]
struct QueryPlan {
    predicates: Vec<Predicate>,
    order: Vec<OrderTerm>,
    offset: u64,
    limit: Option<u64>,
}

/// Shared, mutable row storage plus a query plan. Clones share the rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryCollection {
    rows: Arc<RwLock<Vec<Row>>>,
    plan: QueryPlan,
}

impl MemoryCollection {
    #[must_use]
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows: Arc::new(RwLock::new(rows)), plan: QueryPlan::default() }
    }

    /// Builds a collection from JSON values; non-object values are skipped.
    #[must_use]
    pub fn from_values(values: Vec<Value>) -> Self {
        Self::new(
            values
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(m) => Some(m),
                    _ => None,
                })
                .collect(),
        )
    }

    pub fn insert(&self, row: Row) {
        self.rows.write().push(row);
    }

    /// Removes every row whose `path` equals `value`. Returns the number removed.
    pub fn remove_where(&self, path: &str, value: &Value) -> usize {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|r| r.field(path) != Some(value));
        before - rows.len()
    }

    /// Applies `update` to every row whose `path` equals `value`.
    pub fn update_where(&self, path: &str, value: &Value, update: impl Fn(&mut Row)) -> usize {
        let mut n = 0;
        for row in self.rows.write().iter_mut().filter(|r| r.field(path) == Some(value)) {
            update(row);
            n += 1;
        }
        n
    }

    /// Number of stored rows, ignoring the query plan.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    fn matching(&self) -> Vec<Row> {
        self.rows
            .read()
            .iter()
            .filter(|r| self.plan.predicates.iter().all(|p| eval_predicate(*r, p)))
            .cloned()
            .collect()
    }
}

impl Queryable for MemoryCollection {
    type Row = Row;

    fn filter(mut self, predicate: Predicate) -> Self {
        if predicate != Predicate::True {
            self.plan.predicates.push(predicate);
        }
        self
    }

    fn order(mut self, sort: &Sort) -> Result<Self, PageError> {
        self.plan.order = match sort {
            Sort::Raw(raw) => parse_raw(raw.as_str(), Direction::Asc)?,
            Sort::Map(map) => flatten(map, "")?,
        };
        Ok(self)
    }

    fn offset(mut self, offset: u64) -> Self {
        self.plan.offset = offset;
        self
    }

    fn limit(mut self, limit: Option<u64>) -> Self {
        self.plan.limit = limit;
        self
    }

    fn count(&self) -> Result<u64, PageError> {
        let n = self
            .rows
            .read()
            .iter()
            .filter(|r| self.plan.predicates.iter().all(|p| eval_predicate(*r, p)))
            .count();
        Ok(crate::utils::num::usize_to_u64(n))
    }

    fn fetch(&self) -> Result<Vec<Row>, PageError> {
        let mut rows = self.matching();
        if !self.plan.order.is_empty() {
            rows.sort_by(|a, b| compare_rows(a, b, &self.plan.order));
        }
        let skip = u64_to_usize_saturating(self.plan.offset);
        let take = self.plan.limit.map_or(usize::MAX, u64_to_usize_saturating);
        Ok(rows.into_iter().skip(skip).take(take).collect())
    }

    fn ranking_expression(&self, column: &str, keys: &[Value]) -> RawExpr {
        let list = keys
            .iter()
            .map(|k| format!("'{}'", value_text(k).replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(", ");
        RawExpr::new(format!("POSITION({column} IN {list})"))
    }
}

fn compare_rows(a: &Row, b: &Row, order: &[OrderTerm]) -> Ordering {
    for term in order {
        let (ord, direction) = match term {
            OrderTerm::Path { path, direction } => {
                let ord = match (a.field(path), b.field(path)) {
                    (Some(x), Some(y)) => compare_values(x, y),
                    (Some(_), None) => Ordering::Greater,
                    (None, Some(_)) => Ordering::Less,
                    (None, None) => Ordering::Equal,
                };
                (ord, *direction)
            }
            OrderTerm::Rank { path, keys, direction } => {
                (rank(a, path, keys).cmp(&rank(b, path, keys)), *direction)
            }
        };
        if ord != Ordering::Equal {
            return if direction == Direction::Asc { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

fn rank(row: &Row, path: &str, keys: &[String]) -> usize {
    row.field(path)
        .map(value_text)
        .and_then(|text| keys.iter().position(|k| *k == text))
        .unwrap_or(usize::MAX)
}

fn flatten(map: &SortMap, prefix: &str) -> Result<Vec<OrderTerm>, PageError> {
    let mut out = Vec::new();
    for (key, value) in map.iter() {
        match (key, value) {
            (SortKey::Column(name), SortValue::Direction(d)) => {
                out.push(OrderTerm::Path { path: format!("{prefix}{name}"), direction: *d });
            }
            (SortKey::Column(name), SortValue::Nested(nested)) => {
                out.extend(flatten(nested, &format!("{prefix}{name}."))?);
            }
            (SortKey::Raw(raw), SortValue::Direction(d)) => out.extend(parse_raw(raw.as_str(), *d)?),
            (SortKey::Raw(raw), SortValue::Nested(_)) => {
                return Err(PageError::Storage(format!(
                    "order expression {} cannot take a nested sort",
                    raw.as_str()
                )));
            }
        }
    }
    Ok(out)
}

fn parse_raw(text: &str, direction: Direction) -> Result<Vec<OrderTerm>, PageError> {
    let text = text.trim();
    let unsupported = || PageError::Storage(format!("unsupported order expression: {text}"));

    if text.get(..9).is_some_and(|p| p.eq_ignore_ascii_case("POSITION(")) && text.ends_with(')') {
        let inner = &text[9..text.len() - 1];
        let split = inner.to_ascii_uppercase().find(" IN ").ok_or_else(unsupported)?;
        let path = inner[..split].trim();
        if !is_path(path) {
            return Err(unsupported());
        }
        let keys = parse_quoted_list(&inner[split + 4..]).ok_or_else(unsupported)?;
        return Ok(vec![OrderTerm::Rank { path: path.to_string(), keys, direction }]);
    }

    let mut out = Vec::new();
    for term in text.split(',') {
        let mut parts = term.split_whitespace();
        let path = parts.next().filter(|p| is_path(p)).ok_or_else(unsupported)?;
        let own = match parts.next() {
            Some(d) => Direction::parse(d).map_err(|_| unsupported())?,
            None => Direction::Asc,
        };
        if parts.next().is_some() {
            return Err(unsupported());
        }
        let direction = if direction == Direction::Desc {
            match own {
                Direction::Asc => Direction::Desc,
                Direction::Desc => Direction::Asc,
            }
        } else {
            own
        };
        out.push(OrderTerm::Path { path: path.to_string(), direction });
    }
    Ok(out)
}

fn is_path(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Parses `'a', 'b''c'` into `["a", "b'c"]`. An empty input is an empty list.
fn parse_quoted_list(s: &str) -> Option<Vec<String>> {
    let mut out = Vec::new();
    let mut chars = s.trim().chars().peekable();
    while chars.peek().is_some() {
        if chars.next()? != '\'' {
            return None;
        }
        let mut item = String::new();
        loop {
            match chars.next()? {
                '\'' if chars.peek() == Some(&'\'') => {
                    chars.next();
                    item.push('\'');
                }
                '\'' => break,
                c => item.push(c),
            }
        }
        out.push(item);
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            None => break,
            Some(',') => {
                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
            }
            Some(_) => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn posts() -> MemoryCollection {
        MemoryCollection::from_values(vec![
            json!({"id": 1, "title": "b", "author": {"name": "zed"}}),
            json!({"id": 2, "title": "a", "author": {"name": "amy"}}),
            json!({"id": 3, "title": "c", "author": {"name": "bob"}}),
        ])
    }

    fn ids(rows: &[Row]) -> Vec<i64> {
        rows.iter().filter_map(|r| r["id"].as_i64()).collect()
    }

    #[test]
    fn ranking_expression_orders_by_listed_position() {
        let c = posts();
        let expr = c.ranking_expression("id", &[json!(3), json!(1)]);
        assert_eq!(expr.as_str(), "POSITION(id IN '3', '1')");
        let rows = c.order(&Sort::Raw(expr)).unwrap().fetch().unwrap();
        assert_eq!(ids(&rows), vec![3, 1, 2]);
    }

    #[test]
    fn quoted_keys_survive_parsing() {
        assert_eq!(parse_quoted_list("'it''s', 'x'"), Some(vec!["it's".to_string(), "x".to_string()]));
        assert_eq!(parse_quoted_list(""), Some(vec![]));
        assert_eq!(parse_quoted_list("'open"), None);
    }

    #[test]
    fn nested_sort_uses_dotted_path() {
        let sort = Sort::from_arg(&json!({"author": {"name": "desc"}}).into()).unwrap();
        let rows = posts().order(&sort).unwrap().fetch().unwrap();
        assert_eq!(ids(&rows), vec![1, 3, 2]);
    }

    #[test]
    fn raw_column_list_and_paging() {
        let rows = posts().order(&Sort::raw("title DESC")).unwrap().offset(1).limit(Some(1)).fetch().unwrap();
        assert_eq!(ids(&rows), vec![1]);
    }

    #[test]
    fn unknown_raw_expression_is_a_storage_error() {
        assert!(matches!(posts().order(&Sort::raw("LOWER(title)")), Err(PageError::Storage(_))));
    }

    #[test]
    fn count_ignores_paging() {
        let q = posts().filter(Predicate::Cmp { path: "id".into(), op: crate::query::CmpOp::Gt, value: json!(1) });
        assert_eq!(q.clone().limit(Some(1)).count().unwrap(), 2);
        assert_eq!(q.limit(Some(1)).fetch().unwrap().len(), 1);
    }
}
