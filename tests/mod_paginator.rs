mod common;

use common::{codec, obj};
use pagewise::paginator::builder::PageParams;
use pagewise::{Direction, PaginationConfig, Paginator, PaginatorBuilder, PerPage, Sort, SortMap};
use serde_json::json;

fn page(total: u64, per_page: PerPage, offset: u64) -> Paginator {
    Paginator { total_items: total, per_page, offset, ..Paginator::default() }
}

#[test]
fn test_middle_page_of_ten() {
    let p = page(10, PerPage::Count(2), 2);
    assert_eq!(p.item_range(), 3..=4);
    assert!(p.has_more_pages());
    assert_eq!(p.next_page().map(|n| n.offset), Some(4));
    assert_eq!(p.previous_page().map(|n| n.offset), Some(0));
    assert_eq!(p.first_page().map(|n| n.offset), Some(0));
    assert_eq!(p.last_page().map(|n| n.offset), Some(8));
}

#[test]
fn test_last_page_has_no_forward_cursors() {
    let codec = codec();
    let p = page(10, PerPage::Count(2), 8);
    assert_eq!(p.item_range(), 9..=10);
    assert!(p.next_page_cursor(&codec).unwrap().is_none());
    assert!(p.last_page_cursor(&codec).unwrap().is_none());
    assert!(p.previous_page_cursor(&codec).unwrap().is_some());
}

#[test]
fn test_all_rows_on_one_page() {
    let codec = codec();
    let p = page(7, PerPage::All, 0);
    assert_eq!(p.item_range(), 1..=7);
    assert_eq!(p.limit(), None);
    assert!(p.next_page_cursor(&codec).unwrap().is_none());
    assert!(p.previous_page_cursor(&codec).unwrap().is_none());
    assert!(p.current_page_cursor(&codec).unwrap().is_some());
}

#[test]
fn test_zero_per_page_is_metadata_only() {
    let codec = codec();
    let p = page(7, PerPage::Count(0), 0);
    assert_eq!(p.item_range(), 0..=0);
    assert!(p.current_page_cursor(&codec).unwrap().is_none());
    assert!(p.next_page_cursor(&codec).unwrap().is_none());
    let recordset = codec.parse(&p.recordset_cursor(&codec).unwrap()).unwrap();
    assert_eq!((recordset.offset, recordset.per_page), (0, PerPage::All));
}

#[test]
fn test_per_page_wire_forms() {
    assert_eq!(PerPage::from_json(&json!(5)), Some(PerPage::Count(5)));
    assert_eq!(PerPage::from_json(&json!("12")), Some(PerPage::Count(12)));
    assert_eq!(PerPage::from_json(&json!("ALL")), Some(PerPage::All));
    assert_eq!(PerPage::from_json(&json!(-3)), None);
    assert_eq!(PerPage::All.to_json(), json!("all"));
    assert_eq!(PerPage::Count(3).to_string(), "3");
}

#[test]
fn test_builder_per_page_overrides_cursor() {
    let codec = codec();
    let resumed = Paginator {
        query: obj(json!({"filters": {"title": "x"}})),
        sort: Sort::Map(SortMap::new().with("id", Direction::Asc)),
        total_items: 30,
        per_page: PerPage::Count(3),
        offset: 6,
        metadata: None,
    };
    let token = codec.create(&resumed).unwrap();

    let p = PaginatorBuilder::default()
        .set_cursor(&codec, &token, None, None)
        .unwrap()
        .set_params(PageParams { per_page: Some(PerPage::Count(5)), ..Default::default() })
        .build();
    assert_eq!(p.per_page, PerPage::Count(5));
    assert_eq!(p.offset, 6);
    assert_eq!(p.query, resumed.query);
}

#[test]
fn test_builder_cursor_with_new_filters_restarts() {
    let codec = codec();
    let token = codec.create(&page(30, PerPage::Count(3), 6)).unwrap();
    let p = PaginatorBuilder::default()
        .set_cursor(&codec, &token, None, None)
        .unwrap()
        .set_params(PageParams { query: Some(obj(json!({"filters": {"title": "y"}}))), ..Default::default() })
        .build();
    assert_eq!(p.offset, 0);
    assert_eq!(p.query, obj(json!({"filters": {"title": "y"}})));
}

#[test]
fn test_builder_filter_change_outlives_an_earlier_offset() {
    let codec = codec();
    let token = codec.create(&page(30, PerPage::Count(3), 6)).unwrap();
    let p = PaginatorBuilder::default()
        .set_cursor(&codec, &token, None, None)
        .unwrap()
        .set_params(PageParams {
            query: Some(obj(json!({"filters": {"title": "y"}}))),
            offset: Some(9),
            ..Default::default()
        })
        .set_params(PageParams { per_page: Some(PerPage::Count(5)), ..Default::default() })
        .build();
    assert_eq!((p.offset, p.per_page), (0, PerPage::Count(5)));

    let p = PaginatorBuilder::default()
        .set_cursor(&codec, &token, None, None)
        .unwrap()
        .set_params(PageParams { offset: Some(9), ..Default::default() })
        .set_params(PageParams { per_page: Some(PerPage::Count(5)), ..Default::default() })
        .build();
    assert_eq!(p.offset, 9);
}

#[test]
fn test_builder_defaults_come_from_config() {
    let config = PaginationConfig { default_per_page: 50, default_sort: "title desc, id".into(), ..Default::default() };
    let p = PaginatorBuilder::from_config(&config).unwrap().build();
    assert_eq!(p.per_page, PerPage::Count(50));
    assert_eq!(p.sort, Sort::Map(SortMap::new().with("title", Direction::Desc).with("id", Direction::Asc)));

    let bad = PaginationConfig { default_sort: "title sideways".into(), ..Default::default() };
    assert!(PaginatorBuilder::from_config(&bad).is_err());
}

#[test]
fn test_builder_rejects_bad_cursor() {
    let codec = codec();
    assert!(PaginatorBuilder::default().set_cursor(&codec, "", None, None).is_err());
}
