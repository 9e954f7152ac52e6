mod common;

use common::{blog_posts, ids, obj, post, query_over, titles};
use pagewise::{CallParams, PageError, PerPage, RawExpr, SortArg};
use serde_json::json;

fn filters(v: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    obj(v)
}

#[test]
fn test_attribute_filter_limits_rows() {
    let q = query_over(blog_posts());
    let page = q.call(CallParams { filters: filters(json!({"title": "test2"})), ..Default::default() }).unwrap();
    assert_eq!(titles(&page.rows), vec!["test2"]);
    assert_eq!(page.paginator.total_items, 1);
}

#[test]
fn test_custom_filter_reaches_nested_fields() {
    let posts = blog_posts();
    posts.update_where("id", &json!(1), |row| {
        row.insert("author".into(), json!({"name": "Foo"}));
    });
    let q = query_over(posts);
    let page = q
        .call(CallParams { filters: filters(json!({"author": {"value": "Foo"}})), ..Default::default() })
        .unwrap();
    assert_eq!(titles(&page.rows), vec!["test1"]);
}

#[test]
fn test_unknown_filter_is_rejected() {
    let q = query_over(blog_posts());
    let err = q
        .call(CallParams { filters: filters(json!({"invalid": {"value": "123"}})), ..Default::default() })
        .unwrap_err();
    assert!(matches!(err, PageError::InvalidFilter(ref m) if m.contains("invalid")));
}

#[test]
fn test_search_matches_substrings() {
    let q = query_over(blog_posts());
    let page = q.call(CallParams { search: Some(obj(json!({"title": "2"}))), ..Default::default() }).unwrap();
    assert_eq!(ids(&page.rows), vec![2]);
}

#[test]
fn test_search_ors_columns_ignoring_case() {
    let q = query_over(blog_posts());
    let search = obj(json!({"title": "TEST1", "drafted_on": "03-02"}));
    let page = q
        .call(CallParams { search: Some(search), sort: Some("id".into()), ..Default::default() })
        .unwrap();
    assert_eq!(ids(&page.rows), vec![1, 2]);
    assert_eq!(page.paginator.total_items, 2);

    let page = q.call(CallParams { search: Some(obj(json!({"title": "TeSt2"}))), ..Default::default() }).unwrap();
    assert_eq!(ids(&page.rows), vec![2]);
}

#[test]
fn test_every_sort_form_orders_rows() {
    let q = query_over(blog_posts());
    let cases: Vec<(SortArg, Vec<i64>)> = vec![
        ("drafted_on DESC".into(), vec![2, 1]),
        ("drafted_on".into(), vec![1, 2]),
        (json!({"drafted_on": "desc"}).into(), vec![2, 1]),
        (RawExpr::new("drafted_on DESC").into(), vec![2, 1]),
    ];
    for (sort, expected) in cases {
        let page = q.call(CallParams { sort: Some(sort.clone()), ..Default::default() }).unwrap();
        assert_eq!(ids(&page.rows), expected, "sort {sort:?}");
    }
}

#[test]
fn test_default_sort_applies_until_overridden() {
    let q = query_over(blog_posts()).with_default_sort("drafted_on desc");
    let page = q.call(CallParams::default()).unwrap();
    assert_eq!(ids(&page.rows), vec![2, 1]);

    let page = q.call(CallParams { sort: Some("title asc".into()), ..Default::default() }).unwrap();
    assert_eq!(ids(&page.rows), vec![1, 2]);
}

#[test]
fn test_sort_gets_key_tie_breaker() {
    let q = query_over(blog_posts());
    let page = q.call(CallParams { sort: Some(json!({"drafted_on": "desc"}).into()), ..Default::default() }).unwrap();
    let visible = page.paginator.sort.visible();
    assert!(visible.contains_column("id"));
    assert_eq!(visible.to_json(), json!({"drafted_on": "desc", "id": "asc"}));
}

#[test]
fn test_single_row_pages_chain_through_cursors() {
    let q = query_over(blog_posts());
    let first = q.call(CallParams { per_page: Some(PerPage::Count(1)), ..Default::default() }).unwrap();
    assert_eq!(ids(&first.rows), vec![1]);
    let next = first.paginator.next_page_cursor(q.codec()).unwrap().expect("second page");

    let second = q.call(CallParams { cursor: Some(next), ..Default::default() }).unwrap();
    assert_eq!(ids(&second.rows), vec![2]);
    assert!(second.paginator.next_page_cursor(q.codec()).unwrap().is_none());
    assert!(second.paginator.previous_page_cursor(q.codec()).unwrap().is_some());
}

#[test]
fn test_cursor_keeps_custom_sort() {
    let q = query_over(blog_posts());
    let first = q
        .call(CallParams { per_page: Some(PerPage::Count(1)), sort: Some("title DESC".into()), ..Default::default() })
        .unwrap();
    assert_eq!(ids(&first.rows), vec![2]);
    let next = first.paginator.next_page_cursor(q.codec()).unwrap().unwrap();
    let second = q.call(CallParams { cursor: Some(next), ..Default::default() }).unwrap();
    assert_eq!(ids(&second.rows), vec![1]);
}

#[test]
fn test_new_sort_on_cursor_restarts_at_first_item() {
    let q = query_over(blog_posts());
    let first = q
        .call(CallParams { per_page: Some(PerPage::Count(1)), sort: Some("title DESC".into()), ..Default::default() })
        .unwrap();
    let next = first.paginator.next_page_cursor(q.codec()).unwrap().unwrap();

    let resorted =
        q.call(CallParams { cursor: Some(next.clone()), sort: Some("title ASC".into()), ..Default::default() }).unwrap();
    assert_eq!(resorted.paginator.item_range(), 1..=1);

    let same = q.call(CallParams { cursor: Some(next), sort: Some("title DESC".into()), ..Default::default() }).unwrap();
    assert_eq!(same.paginator.item_range(), 2..=2);
}

#[test]
fn test_cursor_past_removed_rows_yields_nothing() {
    let posts = blog_posts();
    let q = query_over(posts.clone());
    let first = q.call(CallParams { per_page: Some(PerPage::Count(1)), ..Default::default() }).unwrap();
    let next = first.paginator.next_page_cursor(q.codec()).unwrap().unwrap();
    assert_eq!(posts.remove_where("id", &json!(2)), 1);

    let page = q.call(CallParams { cursor: Some(next), ..Default::default() }).unwrap();
    assert!(page.rows.is_empty());
    assert_eq!(page.paginator.total_items, 1);
}

#[test]
fn test_search_on_cursor_replaces_cursor_search() {
    let q = query_over(blog_posts());
    let first = q
        .call(CallParams { per_page: Some(PerPage::Count(1)), search: Some(obj(json!({"title": "2"}))), ..Default::default() })
        .unwrap();
    assert_eq!(first.paginator.total_items, 1);
    let current = first.paginator.current_page_cursor(q.codec()).unwrap().unwrap();

    let page = q
        .call(CallParams { cursor: Some(current), search: Some(obj(json!({"title": "test"}))), ..Default::default() })
        .unwrap();
    assert_eq!(page.paginator.total_items, 2);
}

#[test]
fn test_metadata_hides_raw_sort_and_reports_range() {
    let posts = blog_posts();
    posts.insert(post(3, 3, "test3", "2024-03-03"));
    let q = query_over(posts);
    let page = q
        .call(CallParams {
            per_page: Some(PerPage::Count(2)),
            sort: Some(RawExpr::new("drafted_on desc").into()),
            ..Default::default()
        })
        .unwrap();
    let meta = q.metadata(&page).unwrap();
    assert_eq!((meta.first_item, meta.last_item, meta.total_items), (1, 2, 3));
    assert_eq!(meta.sort, json!({}));
    assert!(meta.next_page_cursor.is_some());
    assert!(meta.previous_page_cursor.is_none());
    assert!(meta.current_page_snapshot_cursor.is_some());
}

#[test]
fn test_bad_cursor_is_a_parse_error() {
    let q = query_over(blog_posts());
    let err = q.call(CallParams { cursor: Some("not-a-cursor".into()), ..Default::default() }).unwrap_err();
    assert!(matches!(err, PageError::CursorParse(_)));
}
