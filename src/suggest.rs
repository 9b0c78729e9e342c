//! Prefix completions from a static dictionary.
//!
//! Entries carry a minimum match length so one-letter queries do not spray
//! the whole dictionary. Matching is against the folded form; the original
//! spelling is what gets emitted.

use crate::query::fold;

#[derive(Debug)]
struct SuggestEntry {
    text: String,
    folded: String,
    min_len: usize,
}

/// An ordered suggestion dictionary: `(text, min_match_length)` pairs.
#[derive(Debug, Default)]
pub struct SuggestionDictionary {
    entries: Vec<SuggestEntry>,
}

impl SuggestionDictionary {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, usize)>,
    {
        let entries = entries
            .into_iter()
            .map(|(text, min_len)| {
                let folded = fold(&text);
                SuggestEntry { text, folded, min_len }
            })
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dictionary entries the folded `target` is an eligible prefix of, in
    /// dictionary order.
    pub(crate) fn matches<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let target_len = target.chars().count();
        self.entries
            .iter()
            .filter(move |e| e.min_len <= target_len && e.folded.starts_with(target))
            .map(|e| e.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict(entries: &[(&str, usize)]) -> SuggestionDictionary {
        SuggestionDictionary::new(entries.iter().map(|(s, m)| (s.to_string(), *m)))
    }

    #[test]
    fn test_prefix_match() {
        let d = dict(&[("cafe", 3), ("castle", 3)]);
        let hits: Vec<&str> = d.matches("caf").collect();
        assert_eq!(hits, vec!["cafe"]);
    }

    #[test]
    fn test_min_length_gate() {
        let d = dict(&[("cafe", 3)]);
        assert_eq!(d.matches("ca").count(), 0, "below min match length");
        assert_eq!(d.matches("caf").count(), 1);
    }

    #[test]
    fn test_match_against_folded_form() {
        let d = dict(&[("Café", 3)]);
        let hits: Vec<&str> = d.matches("caf").collect();
        assert_eq!(hits, vec!["Café"], "original spelling is emitted");
    }

    #[test]
    fn test_multi_word_entries() {
        let d = dict(&[("bus station", 4), ("bus stop", 4)]);
        let hits: Vec<&str> = d.matches("bus st").collect();
        assert_eq!(hits, vec!["bus station", "bus stop"]);
    }

    #[test]
    fn test_exact_entry_matches_itself() {
        let d = dict(&[("cafe", 3)]);
        assert_eq!(d.matches("cafe").count(), 1);
        assert_eq!(d.matches("cafes").count(), 0, "target longer than entry");
    }
}
