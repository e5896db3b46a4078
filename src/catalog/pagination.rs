use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use super::filter::CatalogQuery;

pub const DEFAULT_PAGE_SIZE: usize = 9;
pub const DEFAULT_SHOW_MORE_DELAY: Duration = Duration::from_millis(500);
/// Upper bound for a counter echoed back by a client.
pub const MAX_SHOWN: usize = 10_000;

/// Running "items shown so far" counter for the main gallery view.
///
/// The counter starts at one page, resets to one page whenever the query
/// changes and only grows through [`Paginator::show_more`].
#[derive(Debug, Clone)]
pub struct Paginator {
    page_size: usize,
    shown: usize,
    delay: Duration,
    query: CatalogQuery,
}

impl Paginator {
    pub fn new(page_size: usize, delay: Duration) -> Self {
        let page_size = page_size.max(1);
        Self {
            page_size,
            shown: page_size,
            delay,
            query: CatalogQuery::default(),
        }
    }

    /// Rebuilds a paginator from the counter and query key the client echoed
    /// back. The counter only carries over when `echoed_key` is the key of
    /// `query`; a missing or different key means the inputs changed and the
    /// counter starts again at one page.
    pub fn resume(
        page_size: usize,
        shown: usize,
        echoed_key: Option<&str>,
        query: CatalogQuery,
    ) -> Self {
        let mut paginator = Self::new(page_size, Duration::ZERO);
        if echoed_key == Some(query.key().as_str()) {
            paginator.shown = shown.min(MAX_SHOWN).max(paginator.page_size);
        }
        paginator.query = query;
        paginator
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn shown(&self) -> usize {
        self.shown
    }

    pub fn query(&self) -> &CatalogQuery {
        &self.query
    }

    pub fn reset(&mut self) {
        self.shown = self.page_size;
    }

    /// Replaces the query. Returns `true` (and resets the counter) when any
    /// filter or sort input actually changed.
    pub fn set_query(&mut self, query: CatalogQuery) -> bool {
        if query == self.query {
            return false;
        }
        self.query = query;
        self.reset();
        true
    }

    pub fn has_more(&self, total_matches: usize) -> bool {
        self.shown < total_matches
    }

    /// Grows the counter by one page, clamped to `total_matches`. Never shrinks it.
    pub fn show_more_now(&mut self, total_matches: usize) -> usize {
        let next = self.shown.saturating_add(self.page_size).min(total_matches);
        if next > self.shown {
            self.shown = next;
        }
        self.shown
    }

    /// Same as [`Paginator::show_more_now`] after the loading delay.
    pub async fn show_more(&mut self, total_matches: usize) -> usize {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        let shown = self.show_more_now(total_matches);
        debug!(shown, total_matches, "Showing more companions.");
        shown
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_SHOW_MORE_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::filter::{SortKey, ThemeFilter};
    use crate::db::enums::CompanionTheme;

    #[test]
    fn starts_at_one_page() {
        let paginator = Paginator::new(9, Duration::ZERO);
        assert_eq!(paginator.shown(), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn show_more_steps_by_page_and_clamps() {
        let mut paginator = Paginator::new(9, Duration::from_millis(800));
        assert_eq!(paginator.show_more(30).await, 18);
        assert_eq!(paginator.show_more(30).await, 27);
        assert_eq!(paginator.show_more(30).await, 30);
        assert_eq!(paginator.show_more(30).await, 30);
        assert!(!paginator.has_more(30));
    }

    #[tokio::test(start_paused = true)]
    async fn show_more_waits_for_the_delay() {
        let mut paginator = Paginator::new(9, Duration::from_millis(800));
        let started = tokio::time::Instant::now();
        paginator.show_more(30).await;
        assert!(started.elapsed() >= Duration::from_millis(800));
    }

    #[test]
    fn changing_any_input_resets_to_one_page() {
        let mut paginator = Paginator::new(9, Duration::ZERO);
        paginator.show_more_now(30);
        paginator.show_more_now(30);
        assert_eq!(paginator.shown(), 27);

        let changes = [
            CatalogQuery { text: "guru".to_string(), ..Default::default() },
            CatalogQuery { theme: ThemeFilter::Only(CompanionTheme::Casual), ..Default::default() },
            CatalogQuery { tag_ids: ["t1".to_string()].into_iter().collect(), ..Default::default() },
            CatalogQuery { sort: SortKey::Rating, ..Default::default() },
        ];
        for query in changes {
            paginator.show_more_now(30);
            assert!(paginator.shown() > 9);
            assert!(paginator.set_query(query));
            assert_eq!(paginator.shown(), 9);
            paginator.set_query(CatalogQuery::default());
        }
    }

    #[test]
    fn same_query_does_not_reset() {
        let mut paginator = Paginator::new(9, Duration::ZERO);
        paginator.show_more_now(30);
        assert!(!paginator.set_query(CatalogQuery::default()));
        assert_eq!(paginator.shown(), 18);
    }

    #[test]
    fn few_matches_never_shrink_the_counter() {
        let mut paginator = Paginator::new(9, Duration::ZERO);
        assert_eq!(paginator.show_more_now(4), 9);
    }

    #[test]
    fn resume_keeps_at_least_one_page() {
        let key = CatalogQuery::default().key();
        let paginator = Paginator::resume(9, 0, Some(&key), CatalogQuery::default());
        assert_eq!(paginator.shown(), 9);
        let paginator = Paginator::resume(9, 18, Some(&key), CatalogQuery::default());
        assert_eq!(paginator.shown(), 18);
    }

    #[test]
    fn resume_with_another_query_key_starts_over() {
        let previous = CatalogQuery { text: "guru".to_string(), ..Default::default() }.key();
        let paginator = Paginator::resume(9, 27, Some(&previous), CatalogQuery::default());
        assert_eq!(paginator.shown(), 9);
        let paginator = Paginator::resume(9, 27, None, CatalogQuery::default());
        assert_eq!(paginator.shown(), 9);
    }

    #[test]
    fn huge_counters_are_clamped() {
        let key = CatalogQuery::default().key();
        let mut paginator = Paginator::resume(9, usize::MAX, Some(&key), CatalogQuery::default());
        assert_eq!(paginator.shown(), MAX_SHOWN);
        assert_eq!(paginator.show_more_now(usize::MAX), MAX_SHOWN + 9);

        let mut paginator = Paginator::new(usize::MAX, Duration::ZERO);
        assert_eq!(paginator.show_more_now(usize::MAX), usize::MAX);
    }
}
