//! Page/limit to skip/limit conversion

use crate::store::FindOptions;

/// Build find options for a 1-based `page` of `limit` rows
///
/// Both values are needed for paging; if either is absent the query is not
/// limited. Page 0 is treated as the first page.
pub fn pagination_options(limit: Option<u64>, page: Option<u64>) -> FindOptions {
    match (limit, page) {
        (Some(limit), Some(page)) => FindOptions {
            skip: Some(page.saturating_sub(1).saturating_mul(limit)),
            limit: Some(limit),
        },
        _ => FindOptions::default(),
    }
}
