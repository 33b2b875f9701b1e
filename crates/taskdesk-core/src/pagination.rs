use taskdesk_shared::ListQuery;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Search text plus page position, and the server count they produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    search_term: String,
    page_index: usize,
    page_size: usize,
    total_count: usize,
}

impl Default for PageState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PageState {
    pub fn new(page_size: usize) -> Self {
        Self {
            search_term: String::new(),
            page_index: 0,
            page_size: page_size.max(1),
            total_count: 0,
        }
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn offset(&self) -> usize {
        self.page_index.saturating_mul(self.page_size)
    }

    pub fn total_pages(&self) -> usize {
        self.total_count.div_ceil(self.page_size)
    }

    pub fn has_next(&self) -> bool {
        self.page_index + 1 < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page_index > 0
    }

    /// Returns false when the term is unchanged. A new term always lands on
    /// the first page.
    pub fn set_search_term(&mut self, term: &str) -> bool {
        if self.search_term == term {
            return false;
        }
        self.search_term = term.to_string();
        self.page_index = 0;
        true
    }

    pub fn set_page_index(&mut self, page_index: usize) {
        self.page_index = page_index;
    }

    pub fn set_total_count(&mut self, total_count: usize) {
        self.total_count = total_count;
    }

    pub fn query(&self) -> ListQuery {
        ListQuery::new(self.page_index, self.page_size, &self.search_term)
    }

    /// One-based inclusive bounds of the rows on this page, `None` when
    /// nothing matched.
    pub fn showing_range(&self) -> Option<(usize, usize)> {
        if self.total_count == 0 || self.offset() >= self.total_count {
            return None;
        }
        let first = self.offset() + 1;
        let last = (self.offset() + self.page_size).min(self.total_count);
        Some((first, last))
    }

    pub fn summary(&self) -> Option<String> {
        self.showing_range().map(|(first, last)| {
            format!(
                "Showing {first} to {last} of {} tasks",
                self.total_count
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(page_index: usize, total: usize) -> PageState {
        let mut state = PageState::new(10);
        state.set_page_index(page_index);
        state.set_total_count(total);
        state
    }

    #[test]
    fn query_offset_follows_page_index() {
        let query = state(2, 40).query();
        assert_eq!(query.skip, 20);
        assert_eq!(query.limit, 10);
        assert_eq!(query.search, None);
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(state(0, 25).total_pages(), 3);
        assert_eq!(state(0, 30).total_pages(), 3);
        assert_eq!(state(0, 0).total_pages(), 0);
        assert_eq!(state(0, 1).total_pages(), 1);
    }

    #[test]
    fn next_is_offered_only_before_last_page() {
        let offered: Vec<usize> = (0..5).filter(|idx| state(*idx, 25).has_next()).collect();
        assert_eq!(offered, vec![0, 1]);
        assert!(!state(0, 0).has_next());
    }

    #[test]
    fn previous_is_offered_after_first_page() {
        assert!(!state(0, 25).has_previous());
        assert!(state(1, 25).has_previous());
    }

    #[test]
    fn new_search_term_resets_to_first_page() {
        let mut page = state(3, 80);
        assert!(page.set_search_term("invoice"));
        assert_eq!(page.page_index(), 0);
        assert_eq!(page.query().search.as_deref(), Some("invoice"));

        page.set_page_index(2);
        assert!(!page.set_search_term("invoice"));
        assert_eq!(page.page_index(), 2);
    }

    #[test]
    fn summary_clamps_last_row_to_total() {
        assert_eq!(
            state(2, 25).summary().as_deref(),
            Some("Showing 21 to 25 of 25 tasks")
        );
        assert_eq!(state(0, 0).summary(), None);
    }

    #[test]
    fn zero_page_size_is_coerced() {
        assert_eq!(PageState::new(0).page_size(), 1);
    }
}
