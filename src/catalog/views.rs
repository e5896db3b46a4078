use serde::Serialize;

use super::filter::{filter_companions, sort_companions, SortKey};
use super::pagination::Paginator;
use crate::db::models::CompanionRecord;

pub const DEFAULT_NEWEST_COUNT: usize = 4;

/// The bounded main gallery view.
#[derive(Debug, Serialize)]
pub struct CatalogView<'a> {
    pub items: Vec<&'a CompanionRecord>,
    pub total_matches: usize,
    pub shown: usize,
    pub page_size: usize,
    pub has_more: bool,
    /// Set when nothing matched; the view renders an empty state, not an error.
    pub no_results: bool,
    /// Key of the query this view was built for. Clients echo it back with
    /// `shown` so the counter survives only while the inputs stay the same.
    pub query_key: String,
}

/// Filters, sorts and truncates `records` according to the paginator's query
/// and counter.
pub fn main_view<'a>(records: &'a [CompanionRecord], paginator: &Paginator) -> CatalogView<'a> {
    let query = paginator.query();
    let mut matches = filter_companions(records, query);
    sort_companions(&mut matches, query.sort);

    let total_matches = matches.len();
    matches.truncate(paginator.shown());

    CatalogView {
        shown: matches.len(),
        items: matches,
        total_matches,
        page_size: paginator.page_size(),
        has_more: paginator.has_more(total_matches),
        no_results: total_matches == 0,
        query_key: query.key(),
    }
}

/// Featured companions, untruncated, in input order.
pub fn featured_view(records: &[CompanionRecord]) -> Vec<&CompanionRecord> {
    records.iter().filter(|record| record.companion.featured).collect()
}

/// The `count` most recently created companions.
pub fn newest_view(records: &[CompanionRecord], count: usize) -> Vec<&CompanionRecord> {
    let mut all: Vec<&CompanionRecord> = records.iter().collect();
    sort_companions(&mut all, SortKey::Newest);
    all.truncate(count);
    all
}
