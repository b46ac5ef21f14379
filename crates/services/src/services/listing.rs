//! Search, category filter, sort and pagination over in-memory listings.
//!
//! Every stage is a pure function of its inputs; the views recompute the
//! whole pipeline whenever the query changes.

use std::{cmp::Ordering, collections::HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use utils::text::{collate, contains_folded, fold};
use uuid::Uuid;

use super::category_tree::CategoryForest;

/// Anything shown in a searchable list: posts, practices, services.
pub trait Listing {
    fn title(&self) -> &str;

    /// Texts matched by the search box. Includes the title.
    fn search_fields(&self) -> Vec<&str>;

    fn published_at(&self) -> Option<DateTime<Utc>>;

    /// Leaf category, if the item is categorised.
    fn category_id(&self) -> Option<Uuid>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display, Default)]
pub enum SortKey {
    #[default]
    #[serde(rename = "newest")]
    #[strum(serialize = "newest")]
    Newest,
    #[serde(rename = "oldest")]
    #[strum(serialize = "oldest")]
    Oldest,
    #[serde(rename = "a-z")]
    #[strum(serialize = "a-z")]
    TitleAsc,
    #[serde(rename = "z-a")]
    #[strum(serialize = "z-a")]
    TitleDesc,
    /// Stand-in for a view-count ordering; sorts like [`SortKey::Newest`].
    #[serde(rename = "most-read")]
    #[strum(serialize = "most-read")]
    MostRead,
}

/// How a category selection matches an item's leaf category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryMatch {
    /// The leaf itself must be selected.
    Exact,
    /// The leaf or any of its ancestors must be selected.
    Hierarchical,
}

/// Keeps items whose searchable text contains `query`, ignoring case and
/// accents. A blank query keeps everything in order.
pub fn filter_by_text<'a, T, I>(items: I, query: &str) -> Vec<&'a T>
where
    T: Listing + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let needle = fold(query.trim());
    if needle.is_empty() {
        return items.into_iter().collect();
    }
    items
        .into_iter()
        .filter(|item| {
            item.search_fields()
                .iter()
                .any(|field| contains_folded(field, &needle))
        })
        .collect()
}

/// Keeps items whose leaf category is in `selected`. An empty selection
/// keeps everything.
pub fn filter_by_categories<'a, T: Listing>(
    items: Vec<&'a T>,
    selected: &HashSet<Uuid>,
) -> Vec<&'a T> {
    if selected.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| item.category_id().is_some_and(|id| selected.contains(&id)))
        .collect()
}

/// Expands `selected` per `mode` and applies [`filter_by_categories`].
pub fn filter_by_selection<'a, T: Listing>(
    items: Vec<&'a T>,
    selected: &[Uuid],
    forest: &CategoryForest,
    mode: CategoryMatch,
) -> Vec<&'a T> {
    let selection: HashSet<Uuid> = match mode {
        CategoryMatch::Exact => selected.iter().copied().collect(),
        CategoryMatch::Hierarchical => forest.expand_selection(selected),
    };
    filter_by_categories(items, &selection)
}

/// Stable sort by `key`. Undated items go last for the newest-first orders
/// and first for oldest-first.
pub fn sort_listings<T: Listing>(items: &mut [&T], key: SortKey) {
    match key {
        SortKey::Newest | SortKey::MostRead => {
            items.sort_by(|a, b| compare_dates(b.published_at(), a.published_at()))
        }
        SortKey::Oldest => items.sort_by(|a, b| compare_dates(a.published_at(), b.published_at())),
        SortKey::TitleAsc => items.sort_by(|a, b| collate(a.title(), b.title())),
        SortKey::TitleDesc => items.sort_by(|a, b| collate(b.title(), a.title())),
    }
}

/// `None` orders before every date.
fn compare_dates(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    a.cmp(&b)
}

/// "Load more" cursor: how many results of the current query are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct Pagination {
    pub page_size: usize,
    pub shown: usize,
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            page_size,
            shown: page_size,
        }
    }

    /// Shows `shown` results, rounded up to at least one page.
    pub fn showing(page_size: usize, shown: usize) -> Self {
        let mut pagination = Self::new(page_size);
        pagination.shown = shown.max(pagination.page_size);
        pagination
    }

    pub fn load_more(&mut self) {
        self.shown = self.shown.saturating_add(self.page_size);
    }

    pub fn reset(&mut self) {
        self.shown = self.page_size;
    }

    pub fn apply<'a, T>(&self, mut items: Vec<&'a T>) -> ListPage<'a, T> {
        let total = items.len();
        items.truncate(self.shown);
        ListPage {
            shown: items.len(),
            has_more: total > self.shown,
            total,
            items,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListPage<'a, T> {
    pub items: Vec<&'a T>,
    pub total: usize,
    pub shown: usize,
    pub has_more: bool,
}

/// One evaluation of the list pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct ListQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub categories: Vec<Uuid>,
    #[serde(default)]
    pub sort: SortKey,
}

impl ListQuery {
    pub fn new(search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            ..Default::default()
        }
    }

    pub fn with_categories(mut self, categories: Vec<Uuid>) -> Self {
        self.categories = categories;
        self
    }

    pub fn sorted_by(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    /// Text filter, then category filter, then sort.
    pub fn apply<'a, T: Listing>(
        &self,
        items: &'a [T],
        forest: &CategoryForest,
        mode: CategoryMatch,
    ) -> Vec<&'a T> {
        let matched = filter_by_text(items, &self.search);
        let mut selected = filter_by_selection(matched, &self.categories, forest, mode);
        sort_listings(&mut selected, self.sort);
        selected
    }

    pub fn page<'a, T: Listing>(
        &self,
        items: &'a [T],
        forest: &CategoryForest,
        mode: CategoryMatch,
        pagination: Pagination,
    ) -> ListPage<'a, T> {
        pagination.apply(self.apply(items, forest, mode))
    }
}
