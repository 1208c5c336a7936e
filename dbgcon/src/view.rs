//! Filter/View Engine
//!
//! The visible part of the history is always derived from the `HistoryStore`
//! and the current `Filter`. Matching runs on the raw message text, never on
//! rendered lines, so narrowing and widening the filter loses nothing.

use crate::history::HistoryStore;
use crate::record::Record;

/// Case-insensitive substring filter. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    text: String,
    needle: String,
}

impl Filter {
    pub fn new(text: &str) -> Filter {
        Filter {
            text: text.to_string(),
            needle: text.to_lowercase(),
        }
    }

    /// The filter text as typed by the user.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.matches_text(record.raw_text())
    }

    pub fn matches_text(&self, raw_text: &str) -> bool {
        self.needle.is_empty() || raw_text.to_lowercase().contains(&self.needle)
    }
}

/// Records of `history` matching `filter`, in arrival order.
pub fn recompute<'a>(history: &'a HistoryStore, filter: &Filter) -> Vec<&'a Record> {
    history.iter().filter(|r| filter.matches(r)).collect()
}

/// Materialized visible subsequence, kept as indices into the `HistoryStore`.
#[derive(Debug, Default)]
pub struct View {
    visible: Vec<usize>,
}

impl View {
    pub fn new() -> View {
        View::default()
    }

    /// Recomputes the view from scratch. Used whenever the filter changes.
    pub fn rebuild(&mut self, history: &HistoryStore, filter: &Filter) {
        self.visible.clear();
        self.visible.extend(
            history
                .iter()
                .enumerate()
                .filter(|(_, r)| filter.matches(r))
                .map(|(i, _)| i),
        );
    }

    /// Decides whether a freshly appended record is visible, adding it if so.
    pub fn admit(&mut self, index: usize, record: &Record, filter: &Filter) -> bool {
        if !filter.matches(record) {
            return false;
        }
        debug_assert!(self.visible.last().map_or(true, |&last| last < index));
        self.visible.push(index);
        true
    }

    pub fn clear(&mut self) {
        self.visible.clear();
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Indices into the history of the visible records.
    pub fn indices(&self) -> &[usize] {
        &self.visible
    }

    /// Resolves the view against `history`.
    pub fn records<'a>(&self, history: &'a HistoryStore) -> Vec<&'a Record> {
        self.visible
            .iter()
            .filter_map(|&i| history.get(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use chrono::Local;

    fn store_of(texts: &[&str]) -> HistoryStore {
        let mut store = HistoryStore::new();
        for t in texts {
            store.append(classify(t, Local::now()));
        }
        store
    }

    fn texts<'a>(records: &[&'a Record]) -> Vec<&'a str> {
        records.iter().map(|r| r.raw_text()).collect()
    }

    #[test]
    fn empty_filter_matches_everything() {
        let store = store_of(&["a", "", "B"]);
        assert_eq!(texts(&recompute(&store, &Filter::default())), vec!["a", "", "B"]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let store = store_of(&["Disk FULL", "network ok", "full stop"]);
        let f = Filter::new("fUlL");
        assert_eq!(texts(&recompute(&store, &f)), vec!["Disk FULL", "full stop"]);
        assert_eq!(f.text(), "fUlL");
    }

    #[test]
    fn matches_raw_text_not_rendered_line() {
        let store = store_of(&["plain message"]);
        // Brackets and timestamp digits are part of the rendered line only.
        assert!(recompute(&store, &Filter::new("[")).is_empty());
        assert!(recompute(&store, &Filter::new(":")).is_empty());
    }

    #[test]
    fn recompute_is_idempotent() {
        let store = store_of(&["one", "two", "three", "twenty"]);
        let f = Filter::new("tw");
        assert_eq!(recompute(&store, &f), recompute(&store, &f));
    }

    #[test]
    fn widening_recovers_history() {
        let store = store_of(&["apple", "banana", "apple pie"]);
        let mut view = View::new();

        view.rebuild(&store, &Filter::new("apple"));
        assert_eq!(texts(&view.records(&store)), vec!["apple", "apple pie"]);

        view.rebuild(&store, &Filter::new("apple pie"));
        assert_eq!(texts(&view.records(&store)), vec!["apple pie"]);

        view.rebuild(&store, &Filter::new(""));
        assert_eq!(texts(&view.records(&store)), vec!["apple", "banana", "apple pie"]);
    }

    #[test]
    fn admit_agrees_with_recompute() {
        let mut store = HistoryStore::new();
        let mut view = View::new();
        let f = Filter::new("err");
        for t in ["boot", "Error 1", "tick", "error 2", "ERR 3"] {
            let rec = classify(t, Local::now());
            let visible = f.matches(&rec);
            let idx = store.append(rec);
            let admitted = view.admit(idx, &store.snapshot()[idx], &f);
            assert_eq!(admitted, visible);
        }
        assert_eq!(view.records(&store), recompute(&store, &f));
        assert_eq!(view.indices(), &[1, 3, 4]);
    }
}
