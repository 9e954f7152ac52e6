#![allow(dead_code)]

use pagewise::query::{FilterKind, FilterRegistry, Predicate};
use pagewise::{CollectionQuery, CursorCodec, MemoryCollection, PaginationConfig};
use serde_json::{Map, Value, json};

pub fn codec() -> CursorCodec {
    CursorCodec::in_memory(PaginationConfig::default())
}

pub fn obj(v: Value) -> Map<String, Value> {
    v.as_object().cloned().unwrap_or_default()
}

pub fn post(id: i64, earnings: i64, title: &str, drafted_on: &str) -> Map<String, Value> {
    obj(json!({"id": id, "earnings": earnings, "title": title, "drafted_on": drafted_on}))
}

/// Two posts: `test1` drafted before `test2`.
pub fn blog_posts() -> MemoryCollection {
    MemoryCollection::new(vec![post(1, 1, "test1", "2024-03-01"), post(2, 2, "test2", "2024-03-02")])
}

pub fn registry() -> FilterRegistry {
    FilterRegistry::new()
        .register("title", FilterKind::attribute("title"))
        .register("earnings", FilterKind::attribute("earnings"))
        .register(
            "author",
            FilterKind::custom(|args| {
                Ok(args.get("value").cloned().map(|name| Predicate::eq("author.name", name)))
            }),
        )
}

pub fn query_over(collection: MemoryCollection) -> CollectionQuery<MemoryCollection> {
    CollectionQuery::new(collection, "id", codec()).with_filters(registry())
}

pub fn ids(rows: &[Map<String, Value>]) -> Vec<i64> {
    rows.iter().filter_map(|r| r.get("id").and_then(Value::as_i64)).collect()
}

pub fn titles(rows: &[Map<String, Value>]) -> Vec<String> {
    rows.iter().filter_map(|r| r.get("title").and_then(Value::as_str).map(str::to_string)).collect()
}
