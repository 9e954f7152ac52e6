use crate::cursor::CursorCodec;
use crate::errors::PageError;
use crate::paginator::Paginator;
use serde::Serialize;
use serde_json::Value;

/// Paging block attached to a collection response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionResultMetadata {
    pub first_item: u64,
    pub last_item: u64,
    pub total_items: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_page_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_page_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_page_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recordset_cursor: Option<String>,
    /// A cursor that keeps yielding exactly the rows of the current page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page_snapshot_cursor: Option<String>,
    /// Caller-visible sort; raw ordering expressions are never exposed.
    pub sort: Value,
}

impl CollectionResultMetadata {
    /// # Errors
    /// Fails if any of the cursors cannot be created.
    pub fn from_paginator(
        paginator: &Paginator,
        codec: &CursorCodec,
        current_page_snapshot_cursor: Option<String>,
    ) -> Result<Self, PageError> {
        let range = paginator.item_range();
        Ok(Self {
            first_item: *range.start(),
            last_item: *range.end(),
            total_items: paginator.total_items,
            next_page_cursor: paginator.next_page_cursor(codec)?,
            previous_page_cursor: paginator.previous_page_cursor(codec)?,
            first_page_cursor: paginator.first_page_cursor(codec)?,
            last_page_cursor: paginator.last_page_cursor(codec)?,
            current_page_cursor: paginator.current_page_cursor(codec)?,
            recordset_cursor: Some(paginator.recordset_cursor(codec)?),
            current_page_snapshot_cursor,
            sort: paginator.sort.visible().to_json(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaginationConfig;
    use crate::paginator::PerPage;
    use crate::sort::Sort;
    use serde_json::json;

    #[test]
    fn first_page_omits_backward_cursors() {
        let codec = CursorCodec::in_memory(PaginationConfig::default());
        let p = Paginator { total_items: 5, per_page: PerPage::Count(2), sort: Sort::raw("id desc"), ..Paginator::default() };
        let meta = CollectionResultMetadata::from_paginator(&p, &codec, None).unwrap();
        assert_eq!((meta.first_item, meta.last_item, meta.total_items), (1, 2, 5));
        let json = serde_json::to_value(&meta).unwrap();
        assert!(json.get("previous_page_cursor").is_none());
        assert!(json.get("next_page_cursor").is_some());
        assert_eq!(json["sort"], json!({}));
    }
}
