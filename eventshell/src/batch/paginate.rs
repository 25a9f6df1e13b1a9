//! Cursor-driven pagination.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;

/// One page of a paginated read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Continuation cursor; absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Value>,
}

impl<T> Page<T> {
    /// Creates a final page.
    #[must_use]
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            cursor: None,
        }
    }

    /// Creates a page followed by more pages.
    #[must_use]
    pub fn more(items: Vec<T>, cursor: Value) -> Self {
        Self {
            items,
            cursor: Some(cursor),
        }
    }

    /// Returns true if another page follows.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }
}

/// Fetches every page and concatenates their items in arrival order.
///
/// `fetch_page` is called with `None` first, then with the cursor of the
/// previous page, until a page arrives without a cursor. Items are not
/// deduplicated.
pub async fn fetch_all<T, E, F, Fut>(mut fetch_page: F) -> Result<Vec<T>, E>
where
    F: FnMut(Option<Value>) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    let mut items = Vec::new();
    let mut cursor = None;
    let mut pages = 0usize;

    loop {
        let page = fetch_page(cursor.take()).await?;
        pages += 1;

        tracing::debug!(
            page = pages,
            items = page.items.len(),
            has_more = page.has_more(),
            "Fetched page"
        );

        items.extend(page.items);

        match page.cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(items)
}
