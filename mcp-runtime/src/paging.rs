use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_PAGE_LIMIT: u64 = 500;

/// Locally paged view of an upstream collection that is not paged server-side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagedResult {
    pub items: Vec<Value>,
    pub paging: Paging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub next_offset: Option<usize>,
}

/// Slice `[offset, offset + limit)` out of `raw`.
///
/// `raw` may be a bare array or an `{"items": [...]}` wrapper; any other
/// shape is treated as an empty collection.
pub fn page(raw: Value, limit: usize, offset: usize) -> PagedResult {
    let items = match raw {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    let total = items.len();
    let end = offset.saturating_add(limit);
    let next_offset = (end < total).then_some(end);
    let items = items.into_iter().skip(offset).take(limit).collect();

    PagedResult {
        items,
        paging: Paging {
            total,
            limit,
            offset,
            next_offset,
        },
    }
}
