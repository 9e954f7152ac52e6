use pagewise::{CursorCodec, PaginationConfig, Paginator, PerPage, Sort};
use proptest::prelude::*;

fn arb_per_page() -> impl Strategy<Value = PerPage> {
    prop_oneof![4 => (1u64..50).prop_map(PerPage::Count), 1 => Just(PerPage::All), 1 => Just(PerPage::Count(0))]
}

fn arb_paginator() -> impl Strategy<Value = Paginator> {
    (0u64..500, arb_per_page(), 0u64..500, "[a-z]{1,8}", any::<bool>()).prop_map(
        |(total, per_page, offset, column, desc)| {
            let offset = if total == 0 { 0 } else { offset % total };
            let sort = format!("{column} {}", if desc { "desc" } else { "asc" });
            Paginator {
                sort: Sort::from_arg(&sort.into()).unwrap_or_default(),
                total_items: total,
                per_page,
                offset,
                ..Paginator::default()
            }
        },
    )
}

proptest! {
    #[test]
    fn prop_cursor_round_trip(p in arb_paginator()) {
        let codec = CursorCodec::in_memory(PaginationConfig::default());
        let back = codec.parse(&codec.create(&p).unwrap()).unwrap();
        prop_assert_eq!(back, p);
    }

    #[test]
    fn prop_item_range_covers_exactly_the_page(p in arb_paginator()) {
        let range = p.item_range();
        let remaining = p.total_items - p.offset;
        match p.per_page {
            PerPage::Count(0) => prop_assert_eq!(range, 0..=0),
            _ if remaining == 0 => prop_assert!(range.is_empty()),
            per_page => {
                let width = per_page.count().map_or(remaining, |n| n.min(remaining));
                prop_assert_eq!(*range.start(), p.offset + 1);
                prop_assert_eq!(range.end() - range.start() + 1, width);
                prop_assert!(*range.end() <= p.total_items);
            }
        }
    }

    #[test]
    fn prop_neighbour_pages_exist_exactly_when_reachable(p in arb_paginator()) {
        let next = p.next_page();
        match p.per_page {
            PerPage::Count(n) if n > 0 => prop_assert_eq!(next.is_some(), p.offset + n < p.total_items),
            _ => prop_assert!(next.is_none()),
        }
        prop_assert_eq!(p.previous_page().is_some(), p.offset > 0);
        prop_assert_eq!(p.first_page().is_some(), p.offset > 0);
        if let (Some(prev), false) = (p.previous_page(), p.per_page.is_zero()) {
            prop_assert!(prev.offset < p.offset);
        }
    }

    #[test]
    fn prop_last_page_is_aligned(p in arb_paginator()) {
        if let (Some(last), PerPage::Count(n)) = (p.last_page(), p.per_page) {
            prop_assert_eq!(last.offset % n, 0);
            prop_assert!(last.offset < p.total_items);
            prop_assert!(last.offset >= p.offset);
        }
    }
}
