use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::ops::Range;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: usize = 20;

/// A resolved page request: `page` is 1-based and always within
/// `1..=num_pages`, and `num_pages` is never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageWindow {
    pub page: usize,
    pub per_page: usize,
    pub num_pages: usize,
}

impl PageWindow {
    /// Non-positive `per_page` falls back to `default_per_page`; `page` is
    /// clamped once the page count is known.
    pub fn resolve(
        total: usize,
        page: Option<i64>,
        per_page: Option<i64>,
        default_per_page: usize,
    ) -> Self {
        let default_per_page = if default_per_page == 0 {
            DEFAULT_PER_PAGE
        } else {
            default_per_page
        };
        let per_page = per_page
            .filter(|value| *value > 0)
            .and_then(|value| usize::try_from(value).ok())
            .unwrap_or(default_per_page);
        let num_pages = total.div_ceil(per_page).max(1);
        let requested = page.unwrap_or(DEFAULT_PAGE).max(1);
        let page = usize::try_from(requested)
            .unwrap_or(num_pages)
            .min(num_pages);
        Self {
            page,
            per_page,
            num_pages,
        }
    }

    pub fn range(&self, total: usize) -> Range<usize> {
        let start = (self.page - 1).saturating_mul(self.per_page).min(total);
        let end = start.saturating_add(self.per_page).min(total);
        start..end
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.range(items.len())]
    }
}

/// Keeps the first occurrence of every value, in input order.
pub fn dedupe_preserving_order<I, T>(values: I) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    T: Eq + Hash + Clone,
{
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    for value in values {
        if seen.insert(value.clone()) {
            ordered.push(value);
        }
    }
    ordered
}

/// Projects `items` onto the order of `ids`. Items whose key is not in `ids`
/// and ids with no item are dropped; the survivors keep the `ids` order.
pub fn reorder_by_ids<T, F>(ids: &[String], items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut by_id: HashMap<String, T> = items
        .into_iter()
        .map(|item| (key(&item).to_string(), item))
        .collect();

    let mut ordered = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(item) = by_id.remove(id) {
            ordered.push(item);
        }
    }
    ordered
}
