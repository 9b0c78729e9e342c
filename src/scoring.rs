//! Keyword scoring for best-name selection.
//!
//! Every name variant of a promoted feature is scored against the query under
//! a three-tier language priority: the user's preferred language, then the
//! international name and English, then the raw unlocalized name. Lower
//! penalty wins; [`WORST_PENALTY`] marks a name the user cannot read.

use crate::models::{lang_index, LangCode};
use crate::query::{fold, is_delimiter, QueryTokens};

/// Sentinel for an unusable name.
pub(crate) const WORST_PENALTY: u32 = u32::MAX;

const TIER_WEIGHT: u32 = 100;
const MISSED_TOKEN_WEIGHT: u32 = 10;
const MISSED_PREFIX_WEIGHT: u32 = 5;
const MAX_VERBOSITY: u32 = 4;

pub(crate) struct KeywordScorer {
    tiers: [Vec<LangCode>; 3],
    tokens: Vec<String>,
    prefix: String,
}

impl KeywordScorer {
    pub(crate) fn new(preferred: LangCode, query: &QueryTokens) -> Self {
        let tiers = [
            vec![preferred],
            vec![lang_index("int_name").unwrap(), lang_index("en").unwrap()],
            vec![lang_index("default").unwrap()],
        ];
        Self { tiers, tokens: query.tokens.clone(), prefix: query.prefix.clone() }
    }

    /// Penalty for presenting `name` in `lang`. Lower is better.
    pub(crate) fn score(&self, lang: LangCode, name: &str) -> u32 {
        let Some(tier) = self.tiers.iter().position(|t| t.contains(&lang)) else {
            return WORST_PENALTY;
        };

        let folded = fold(name);
        let name_tokens: Vec<&str> =
            folded.split(is_delimiter).filter(|t| !t.is_empty()).collect();

        let matched =
            self.tokens.iter().filter(|t| name_tokens.contains(&t.as_str())).count();
        let missed = (self.tokens.len() - matched) as u32;

        let prefix_missed = !self.prefix.is_empty()
            && !name_tokens.iter().any(|t| t.starts_with(self.prefix.as_str()));

        let verbosity =
            (name_tokens.len().saturating_sub(self.tokens.len()) as u32).min(MAX_VERBOSITY);

        tier as u32 * TIER_WEIGHT
            + missed * MISSED_TOKEN_WEIGHT
            + u32::from(prefix_missed) * MISSED_PREFIX_WEIGHT
            + verbosity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::normalize_query;

    fn scorer(preferred: &str, query: &str) -> KeywordScorer {
        KeywordScorer::new(lang_index(preferred).unwrap(), &normalize_query(query))
    }

    fn lang(code: &str) -> LangCode {
        lang_index(code).unwrap()
    }

    #[test]
    fn test_preferred_language_beats_english() {
        let s = scorer("ru", "krasnaya ");
        let ru = s.score(lang("ru"), "Krasnaya Ploshchad");
        let en = s.score(lang("en"), "Red Square");
        let default = s.score(lang("default"), "Plaza Roja");
        assert!(ru < en, "ru={ru} en={en}");
        assert!(en < default, "en={en} default={default}");
    }

    #[test]
    fn test_english_preferred_demotes_others() {
        let s = scorer("en", "red square ");
        let en = s.score(lang("en"), "Red Square");
        let ru = s.score(lang("ru"), "Krasnaya Ploshchad");
        assert!(en < ru);
        assert_eq!(ru, WORST_PENALTY, "ru is outside every tier when en is preferred");
    }

    #[test]
    fn test_matching_tokens_lower_penalty() {
        let s = scorer("en", "red square ");
        let full = s.score(lang("en"), "Red Square");
        let partial = s.score(lang("en"), "Red Gate");
        let none = s.score(lang("en"), "Blue Bridge");
        assert!(full < partial);
        assert!(partial < none);
    }

    #[test]
    fn test_prefix_match_preferred() {
        let s = scorer("en", "red squ");
        let hit = s.score(lang("en"), "Red Square");
        let miss = s.score(lang("en"), "Red Gate");
        assert!(hit < miss);
    }

    #[test]
    fn test_folding_applied_to_names() {
        let s = scorer("en", "champs elysees ");
        assert_eq!(s.score(lang("en"), "Champs-Élysées"), 0);
    }

    #[test]
    fn test_verbose_name_penalized() {
        let s = scorer("en", "station ");
        let short = s.score(lang("en"), "Station");
        let long = s.score(lang("en"), "Station of the Old Eastern Railway Company");
        assert!(short < long);
    }

    #[test]
    fn test_empty_name_scores_but_poorly() {
        let s = scorer("en", "red square ");
        let empty = s.score(lang("en"), "");
        let real = s.score(lang("en"), "Red Square");
        assert!(empty > real);
        assert!(empty < WORST_PENALTY);
    }
}
