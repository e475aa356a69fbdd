use crate::collection::Collection;
use serde_json::{json, Value};
use std::ops::Deref;

/// One page of results with the unpaged total
///
/// Dereferences to the page's [`Collection`].
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    items: Collection,
    total: u64,
    per_page: u64,
    current_page: u64,
    last_page: u64,
}

impl Page {
    /// `last_page` is `total / per_page`, rounded down
    pub fn new(items: Collection, total: u64, per_page: u64, current_page: u64) -> Self {
        let per_page = per_page.max(1);
        Self {
            items,
            total,
            per_page,
            current_page,
            last_page: total / per_page,
        }
    }

    pub fn items(&self) -> &Collection {
        &self.items
    }

    pub fn into_items(self) -> Collection {
        self.items
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    pub fn last_page(&self) -> u64 {
        self.last_page
    }

    pub fn to_json(&self) -> Value {
        json!({
            "items": self.items.to_json(),
            "total": self.total,
            "per_page": self.per_page,
            "current_page": self.current_page,
            "last_page": self.last_page,
        })
    }
}

impl Deref for Page {
    type Target = Collection;

    fn deref(&self) -> &Collection {
        &self.items
    }
}
