//! Per-tile multilingual name trie and the token matcher over it.
//!
//! Root edges are keyed by a single byte: values below
//! [`CATEGORIES_LANG`](crate::models::CATEGORIES_LANG) select a per-language
//! sub-trie of folded name tokens, the `CATEGORIES_LANG` byte selects the
//! categories subtree keyed by feature-type labels. Inner edges chain byte
//! sequences (path-compressed); values carry the feature offset plus the rank
//! and point needed to form a lightweight hit without touching the feature
//! record.

use std::collections::{BTreeMap, HashMap, HashSet};

use tokio_util::sync::CancellationToken;

use crate::geometry::Point;
use crate::interface::{FeatureOffset, GazetteerError, Result};
use crate::models::{LangCode, CATEGORIES_LANG};

/// Payload stored at a trie node for one indexed name token.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TrieValue {
    pub offset: FeatureOffset,
    pub rank: u8,
    pub point: Point,
}

#[derive(Debug, Default)]
struct TrieNode {
    edges: Vec<TrieEdge>,
    values: Vec<TrieValue>,
}

#[derive(Debug)]
struct TrieEdge {
    label: Vec<u8>,
    node: TrieNode,
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

impl TrieNode {
    fn insert(&mut self, key: &[u8], value: TrieValue) {
        if key.is_empty() {
            self.values.push(value);
            return;
        }
        for edge in &mut self.edges {
            let common = common_prefix_len(&edge.label, key);
            if common == 0 {
                continue;
            }
            if common < edge.label.len() {
                // Split the edge at the divergence point.
                let tail = edge.label.split_off(common);
                let old = std::mem::take(&mut edge.node);
                edge.node.edges.push(TrieEdge { label: tail, node: old });
            }
            return edge.node.insert(&key[common..], value);
        }
        let mut node = TrieNode::default();
        node.values.push(value);
        self.edges.push(TrieEdge { label: key.to_vec(), node });
    }

    /// Values of tokens ending exactly at `key`. A key ending mid-edge is
    /// treated as end-of-edge: no complete token terminates there.
    fn exact_values(&self, key: &[u8]) -> &[TrieValue] {
        if key.is_empty() {
            return &self.values;
        }
        for edge in &self.edges {
            let common = common_prefix_len(&edge.label, key);
            if common == 0 {
                continue;
            }
            if common == edge.label.len() {
                return edge.node.exact_values(&key[common..]);
            }
            // Key ends or diverges inside the edge label.
            return &[];
        }
        &[]
    }

    /// Collect every value in the subtree rooted at `prefix`.
    fn collect_prefix(&self, prefix: &[u8], out: &mut Vec<TrieValue>) {
        if prefix.is_empty() {
            return self.collect_subtree(out);
        }
        for edge in &self.edges {
            let common = common_prefix_len(&edge.label, prefix);
            if common == 0 {
                continue;
            }
            if common == prefix.len() {
                // Prefix ends on or inside this edge; everything below it
                // matches.
                return edge.node.collect_subtree(out);
            }
            if common == edge.label.len() {
                return edge.node.collect_prefix(&prefix[common..], out);
            }
            return;
        }
    }

    fn collect_subtree(&self, out: &mut Vec<TrieValue>) {
        out.extend_from_slice(&self.values);
        for edge in &self.edges {
            edge.node.collect_subtree(out);
        }
    }
}

/// A tile's search trie: one-byte root labels over compressed sub-tries.
#[derive(Debug, Default)]
pub(crate) struct NameTrie {
    roots: BTreeMap<u8, TrieNode>,
}

impl NameTrie {
    /// Index a folded name token under a language root.
    pub(crate) fn insert_name(&mut self, lang: LangCode, token: &str, value: TrieValue) {
        debug_assert!(lang < CATEGORIES_LANG);
        self.roots.entry(lang).or_default().insert(token.as_bytes(), value);
    }

    /// Index a feature under its type label in the categories subtree.
    pub(crate) fn insert_category(&mut self, type_label: &str, value: TrieValue) {
        self.roots.entry(CATEGORIES_LANG).or_default().insert(type_label.as_bytes(), value);
    }
}

/// One alternative a token may match: its own bytes in the language sub-trie,
/// or an expanded category label in the categories subtree.
#[derive(Debug, Clone)]
pub(crate) enum TokenLabel {
    Name(Vec<u8>),
    Category(Vec<u8>),
}

/// Admission filter applied to every offset the trie walk reaches. World
/// tiles carry no offset list and admit everything; either way cancellation
/// is polled on each decision.
pub(crate) struct FeaturesFilter<'a> {
    offsets: Option<&'a [FeatureOffset]>,
    cancel: &'a CancellationToken,
}

impl<'a> FeaturesFilter<'a> {
    pub(crate) fn new(offsets: Option<&'a [FeatureOffset]>, cancel: &'a CancellationToken) -> Self {
        Self { offsets, cancel }
    }

    fn admit(&self, offset: FeatureOffset) -> Result<bool> {
        if self.cancel.is_cancelled() {
            return Err(GazetteerError::Canceled);
        }
        Ok(match self.offsets {
            None => true,
            Some(offsets) => offsets.binary_search(&offset).is_ok(),
        })
    }
}

fn intersect(
    mut acc: HashMap<FeatureOffset, TrieValue>,
    hits: HashMap<FeatureOffset, TrieValue>,
) -> HashMap<FeatureOffset, TrieValue> {
    acc.retain(|offset, _| hits.contains_key(offset));
    acc
}

/// Walk one tile's trie: for every allowed language, intersect the hit sets
/// of all tokens (and the prefix), filter the surviving offsets, and emit
/// `(language, value)` pairs. Duplicate emissions across languages are
/// expected; the candidate queues deduplicate.
pub(crate) fn match_features<F>(
    trie: &NameTrie,
    token_alts: &[Vec<TokenLabel>],
    prefix: Option<&[u8]>,
    langs: &HashSet<LangCode>,
    filter: &FeaturesFilter<'_>,
    mut emit: F,
) -> Result<()>
where
    F: FnMut(LangCode, TrieValue),
{
    let categories_root = trie.roots.get(&CATEGORIES_LANG);

    for (&label, lang_root) in &trie.roots {
        if label >= CATEGORIES_LANG || !langs.contains(&label) {
            continue;
        }

        let mut matched: Option<HashMap<FeatureOffset, TrieValue>> = None;

        for alts in token_alts {
            let mut hits = HashMap::new();
            for alt in alts {
                let values: &[TrieValue] = match alt {
                    TokenLabel::Name(bytes) => lang_root.exact_values(bytes),
                    TokenLabel::Category(bytes) => match categories_root {
                        Some(root) => root.exact_values(bytes),
                        None => &[],
                    },
                };
                for v in values {
                    hits.insert(v.offset, *v);
                }
            }
            matched = Some(match matched {
                None => hits,
                Some(acc) => intersect(acc, hits),
            });
            if matched.as_ref().is_some_and(|m| m.is_empty()) {
                break;
            }
        }

        if let Some(prefix) = prefix {
            if !matched.as_ref().is_some_and(|m| m.is_empty()) {
                let mut collected = Vec::new();
                lang_root.collect_prefix(prefix, &mut collected);
                if let Some(root) = categories_root {
                    root.collect_prefix(prefix, &mut collected);
                }
                let mut hits = HashMap::new();
                for v in collected {
                    hits.insert(v.offset, v);
                }
                matched = Some(match matched {
                    None => hits,
                    Some(acc) => intersect(acc, hits),
                });
            }
        }

        let Some(matched) = matched else { continue };

        // Deterministic emission order within a language.
        let mut values: Vec<TrieValue> = matched.into_values().collect();
        values.sort_unstable_by_key(|v| v.offset);

        for value in values {
            if filter.admit(value.offset)? {
                emit(label, value);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(offset: FeatureOffset) -> TrieValue {
        TrieValue { offset, rank: 0, point: Point::new(0.0, 0.0) }
    }

    fn build_trie(entries: &[(LangCode, &str, FeatureOffset)]) -> NameTrie {
        let mut trie = NameTrie::default();
        for (lang, token, offset) in entries {
            trie.insert_name(*lang, token, value(*offset));
        }
        trie
    }

    fn offsets_matching(
        trie: &NameTrie,
        token_alts: &[Vec<TokenLabel>],
        prefix: Option<&[u8]>,
    ) -> Vec<FeatureOffset> {
        let langs: HashSet<LangCode> = [1].into_iter().collect();
        let cancel = CancellationToken::new();
        let filter = FeaturesFilter::new(None, &cancel);
        let mut out = Vec::new();
        match_features(trie, token_alts, prefix, &langs, &filter, |_, v| out.push(v.offset))
            .unwrap();
        out.sort_unstable();
        out.dedup();
        out
    }

    fn name(token: &str) -> Vec<TokenLabel> {
        vec![TokenLabel::Name(token.as_bytes().to_vec())]
    }

    // ── radix node behavior ──────────────────────────────────────

    #[test]
    fn test_edge_split_on_shared_prefix() {
        let trie = build_trie(&[(1, "care", 1), (1, "cafe", 2), (1, "cat", 3)]);
        let root = trie.roots.get(&1).unwrap();
        assert_eq!(root.exact_values(b"cafe")[0].offset, 2);
        assert_eq!(root.exact_values(b"care")[0].offset, 1);
        assert_eq!(root.exact_values(b"cat")[0].offset, 3);
        assert!(root.exact_values(b"ca").is_empty(), "mid-edge key has no values");
        assert!(root.exact_values(b"cap").is_empty());
    }

    #[test]
    fn test_prefix_collects_subtree() {
        let trie = build_trie(&[(1, "care", 1), (1, "cafe", 2), (1, "dog", 3)]);
        let root = trie.roots.get(&1).unwrap();
        let mut out = Vec::new();
        root.collect_prefix(b"ca", &mut out);
        let mut offsets: Vec<_> = out.iter().map(|v| v.offset).collect();
        offsets.sort_unstable();
        assert_eq!(offsets, vec![1, 2]);
    }

    #[test]
    fn test_prefix_ending_mid_edge() {
        let trie = build_trie(&[(1, "square", 7)]);
        let root = trie.roots.get(&1).unwrap();
        let mut out = Vec::new();
        root.collect_prefix(b"squ", &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].offset, 7);
    }

    // ── matcher ──────────────────────────────────────────────────

    #[test]
    fn test_all_tokens_must_match() {
        let trie = build_trie(&[(1, "red", 1), (1, "square", 1), (1, "red", 2)]);
        assert_eq!(offsets_matching(&trie, &[name("red"), name("square")], None), vec![1]);
        assert_eq!(offsets_matching(&trie, &[name("red")], None), vec![1, 2]);
        assert_eq!(offsets_matching(&trie, &[name("blue")], None), Vec::<u32>::new());
    }

    #[test]
    fn test_prefix_intersects_tokens() {
        let trie = build_trie(&[(1, "red", 1), (1, "square", 1), (1, "red", 2), (1, "star", 2)]);
        assert_eq!(offsets_matching(&trie, &[name("red")], Some(b"squ")), vec![1]);
        assert_eq!(offsets_matching(&trie, &[name("red")], Some(b"s")), vec![1, 2]);
    }

    #[test]
    fn test_category_alternative_matches() {
        let mut trie = build_trie(&[(1, "mamma", 5), (1, "mia", 5)]);
        trie.insert_category("restaurant", value(5));

        // "pizza" itself is nowhere in the names, but expands to the
        // restaurant category label.
        let alts = vec![
            vec![
                TokenLabel::Name(b"pizza".to_vec()),
                TokenLabel::Category(b"restaurant".to_vec()),
            ],
            name("mamma"),
        ];
        assert_eq!(offsets_matching(&trie, &alts, None), vec![5]);
    }

    #[test]
    fn test_language_not_allowed_is_skipped() {
        let trie = build_trie(&[(3, "moskva", 9)]);
        assert_eq!(offsets_matching(&trie, &[name("moskva")], None), Vec::<u32>::new());
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        let trie = build_trie(&[(1, "red", 1)]);
        assert_eq!(offsets_matching(&trie, &[], None), Vec::<u32>::new());
    }

    // ── filter ───────────────────────────────────────────────────

    #[test]
    fn test_filter_restricts_to_offsets() {
        let trie = build_trie(&[(1, "red", 1), (1, "red", 2), (1, "red", 3)]);
        let langs: HashSet<LangCode> = [1].into_iter().collect();
        let cancel = CancellationToken::new();
        let visible = [2u32, 3];
        let filter = FeaturesFilter::new(Some(&visible), &cancel);
        let mut out = Vec::new();
        match_features(&trie, &[name("red")], None, &langs, &filter, |_, v| {
            out.push(v.offset)
        })
        .unwrap();
        assert_eq!(out, vec![2, 3]);
    }

    #[test]
    fn test_always_true_filter_still_polls_cancel() {
        let trie = build_trie(&[(1, "red", 1)]);
        let langs: HashSet<LangCode> = [1].into_iter().collect();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let filter = FeaturesFilter::new(None, &cancel);
        let res = match_features(&trie, &[name("red")], None, &langs, &filter, |_, _| {});
        assert!(matches!(res, Err(GazetteerError::Canceled)));
    }
}
