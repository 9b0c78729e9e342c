//! The search engine controller.
//!
//! Owns the viewport offset cache and wires the full pipeline: normalize →
//! coordinate fast path → suggestions → trie feature search → promote →
//! rank → emit. One search runs at a time (`&mut self`); the caller may
//! cancel from any thread through a [`CancellationToken`] clone, and the
//! pipeline polls it between stages, on every filter admission, and between
//! result emissions.
//!
//! The offset cache is rebuilt lazily on the first search after the viewport
//! changes or the tile set's generation moves (tiles added or removed).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::candidate::{Candidate, CandidateQueues};
use crate::geometry::{cover_cells, scale_level, Point, Rect};
use crate::interface::{
    FeatureKey, FeatureOffset, GazetteerError, Result, ResultSink, SearchOptions, SearchResult,
    TileId, SCALE_BIAS, VIEWPORT_SCALE,
};
use crate::latlon::match_lat_lon;
use crate::models::{lang_index, lang_name, FeatureType, LangCode, TileType};
use crate::query::{fold, normalize_query, QueryTokens};
use crate::ranking::rank_and_fuse;
use crate::scoring::{KeywordScorer, WORST_PENALTY};
use crate::suggest::SuggestionDictionary;
use crate::tiles::{Tile, TileSet};
use crate::trie::{match_features, FeaturesFilter, TokenLabel};

/// Category-keyword expansion: folded token → feature types it implies
/// ("pizza" → restaurant). Consulted for every complete query token.
#[derive(Debug, Default)]
pub struct CategoryMap {
    map: HashMap<String, Vec<FeatureType>>,
}

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, keyword: &str, feature_type: FeatureType) {
        self.map.entry(fold(keyword)).or_default().push(feature_type);
    }

    fn expand(&self, token: &str) -> &[FeatureType] {
        self.map.get(token).map_or(&[], Vec::as_slice)
    }
}

/// Per-tile sorted feature offsets visible in the current extended viewport.
/// `None` entries are tiles the filter never consults (world tiles, tiles
/// outside the extended viewport, dead slots).
#[derive(Debug, Default)]
struct OffsetCache {
    per_tile: Vec<Option<Vec<FeatureOffset>>>,
    valid: bool,
    generation: u64,
}

/// The ranked feature search engine over a shared tile set.
pub struct SearchEngine {
    tiles: Arc<TileSet>,
    categories: CategoryMap,
    suggestions: SuggestionDictionary,
    options: SearchOptions,
    preferred_lang: LangCode,
    position: Option<Point>,
    viewport: Option<Rect>,
    viewport_extended: Option<Rect>,
    cache: OffsetCache,
}

impl SearchEngine {
    pub fn new(
        tiles: Arc<TileSet>,
        categories: CategoryMap,
        suggestions: SuggestionDictionary,
    ) -> Self {
        Self::with_options(tiles, categories, suggestions, SearchOptions::default())
            .expect("default options are valid")
    }

    pub fn with_options(
        tiles: Arc<TileSet>,
        categories: CategoryMap,
        suggestions: SuggestionDictionary,
        options: SearchOptions,
    ) -> Result<Self> {
        let preferred_lang = lang_index(&options.preferred_language)
            .ok_or_else(|| GazetteerError::UnknownLanguage(options.preferred_language.clone()))?;
        Ok(Self {
            tiles,
            categories,
            suggestions,
            options,
            preferred_lang,
            position: None,
            viewport: None,
            viewport_extended: None,
            cache: OffsetCache::default(),
        })
    }

    /// Set the visible viewport. No-op when the rectangle is unchanged and
    /// the offset cache is still valid; otherwise the cache is rebuilt on
    /// the next search.
    pub fn set_viewport(&mut self, rect: Rect) {
        if self.viewport == Some(rect) && self.cache.valid {
            return;
        }
        self.viewport = Some(rect);
        self.viewport_extended = Some(rect.scaled(VIEWPORT_SCALE));
        self.cache.valid = false;
    }

    pub fn set_preferred_language(&mut self, code: &str) -> Result<()> {
        self.preferred_lang =
            lang_index(code).ok_or_else(|| GazetteerError::UnknownLanguage(code.to_string()))?;
        self.options.preferred_language = code.to_string();
        Ok(())
    }

    /// Set or clear the user anchor point for distance ranking.
    pub fn set_position(&mut self, position: Option<Point>) {
        self.position = position;
    }

    /// Drop the viewport offset cache; it rebuilds on the next search.
    pub fn clear_cache(&mut self) {
        self.cache = OffsetCache::default();
    }

    /// Run the full pipeline and emit ranked results into `sink`.
    pub fn search(&mut self, query: &str, sink: &mut dyn ResultSink) -> Result<()> {
        self.search_with_cancel(query, sink, CancellationToken::new())
    }

    /// Like [`search`](Self::search), with a caller-held cancel token. On
    /// cancellation the call returns `Ok` with whatever results were already
    /// emitted.
    pub fn search_with_cancel(
        &mut self,
        query: &str,
        sink: &mut dyn ResultSink,
        cancel: CancellationToken,
    ) -> Result<()> {
        match self.run_search(query, sink, &cancel) {
            Err(GazetteerError::Canceled) => Ok(()),
            other => other,
        }
    }

    fn run_search(
        &mut self,
        raw: &str,
        sink: &mut dyn ResultSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let query = normalize_query(raw);
        let scorer = KeywordScorer::new(self.preferred_lang, &query);

        if let Some(coord) = match_lat_lon(raw) {
            sink.add_result(SearchResult::Coordinate { lat: coord.lat, lon: coord.lon });
        }

        check_cancel(cancel)?;
        self.suggest_strings(&query, sink);

        check_cancel(cancel)?;
        self.refresh_offsets_if_needed();
        let queues = self.search_features(&query, cancel)?;

        check_cancel(cancel)?;
        self.flush_results(queues, &scorer, sink, cancel)
    }

    fn refresh_offsets_if_needed(&mut self) {
        if self.cache.valid && self.cache.generation == self.tiles.generation() {
            return;
        }
        self.update_viewport_offsets();
    }

    fn update_viewport_offsets(&mut self) {
        let generation = self.tiles.generation();
        let mut per_tile: Vec<Option<Vec<FeatureOffset>>> = vec![None; self.tiles.slot_count()];

        if let (Some(viewport), Some(extended)) = (self.viewport, self.viewport_extended) {
            let view_scale = scale_level(&viewport) as i32;
            let mut cached = 0usize;

            for info in self.tiles.tiles() {
                // World tiles are searched without filtering.
                if info.tile_type == TileType::World {
                    continue;
                }
                if !extended.intersects(&info.limit_rect) {
                    continue;
                }
                let Some(tile) = self.tiles.lock(info.id) else {
                    log::debug!("tile {} unavailable during offset cache fill", info.id);
                    continue;
                };

                let (lo, hi) = tile.scale_range();
                let scale = (view_scale + SCALE_BIAS).clamp(lo as i32, hi as i32) as u8;

                let mut offsets = Vec::new();
                for interval in cover_cells(&viewport, tile.last_scale()) {
                    tile.cell_index().for_each_in_interval(&interval, scale, |o| offsets.push(o));
                }
                offsets.sort_unstable();
                offsets.dedup();
                cached += offsets.len();
                per_tile[info.id] = Some(offsets);
            }

            log::debug!(
                "viewport offset cache rebuilt: {} slots, {} offsets",
                per_tile.len(),
                cached
            );
        }

        self.cache = OffsetCache { per_tile, valid: true, generation };
    }

    fn suggest_strings(&self, query: &QueryTokens, sink: &mut dyn ResultSink) {
        let target = if query.tokens.is_empty() && !query.prefix.is_empty() {
            query.prefix.clone()
        } else if query.tokens.len() == 1 {
            let mut t = query.tokens[0].clone();
            if !query.prefix.is_empty() {
                t.push(' ');
                t.push_str(&query.prefix);
            }
            t
        } else {
            return;
        };

        for text in self.suggestions.matches(&target) {
            sink.add_result(SearchResult::Suggestion { text: text.to_string() });
        }
    }

    fn search_features(
        &self,
        query: &QueryTokens,
        cancel: &CancellationToken,
    ) -> Result<CandidateQueues> {
        let capacity = 2 * self.options.results_needed;
        let viewport_center = self.viewport.map_or(Point::new(0.0, 0.0), |v| v.center());
        let mut queues = CandidateQueues::new(capacity, viewport_center, self.position);

        if query.is_empty() {
            return Ok(queues);
        }
        let Some(extended) = self.viewport_extended else {
            return Ok(queues);
        };

        let token_alts: Vec<Vec<TokenLabel>> = query
            .tokens
            .iter()
            .map(|token| {
                let mut alts = vec![TokenLabel::Name(token.as_bytes().to_vec())];
                for feature_type in self.categories.expand(token) {
                    alts.push(TokenLabel::Category(feature_type.name().as_bytes().to_vec()));
                }
                alts
            })
            .collect();
        let prefix = (!query.prefix.is_empty()).then(|| query.prefix.as_bytes());

        let langs: HashSet<LangCode> = [
            Some(self.preferred_lang),
            lang_index("int_name"),
            lang_index("en"),
            lang_index("default"),
        ]
        .into_iter()
        .flatten()
        .collect();

        for info in self.tiles.tiles() {
            check_cancel(cancel)?;
            if info.tile_type != TileType::World && !extended.intersects(&info.limit_rect) {
                continue;
            }
            let Some(tile) = self.tiles.lock(info.id) else {
                log::debug!("tile {} unavailable, skipping", info.id);
                continue;
            };

            let offsets: Option<&[FeatureOffset]> = match info.tile_type {
                TileType::World => None,
                TileType::Country => Some(
                    self.cache
                        .per_tile
                        .get(info.id)
                        .and_then(|entry| entry.as_deref())
                        .unwrap_or(&[]),
                ),
            };
            let filter = FeaturesFilter::new(offsets, cancel);

            match_features(tile.trie(), &token_alts, prefix, &langs, &filter, |lang, value| {
                queues.push_hit(
                    FeatureKey::new(value.offset, info.id),
                    value.rank,
                    value.point,
                    lang,
                );
            })?;
        }

        Ok(queues)
    }

    fn flush_results(
        &self,
        queues: CandidateQueues,
        scorer: &KeywordScorer,
        sink: &mut dyn ResultSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let hits = queues.drain_unique();

        // One lease per tile for the whole promotion pass.
        let mut leases: HashMap<TileId, Option<Arc<Tile>>> = HashMap::new();
        let mut candidates = Vec::with_capacity(hits.len());

        for hit in hits {
            let lease = leases
                .entry(hit.key.tile)
                .or_insert_with(|| self.tiles.lock(hit.key.tile));
            let Some(tile) = lease else {
                log::error!("no tile found for promoted hit {:?}", hit.key);
                continue;
            };
            let Some(feature) = tile.feature(hit.key.offset) else {
                log::error!("feature record missing for {:?}", hit.key);
                continue;
            };
            log::debug!(
                "promoting {:?} matched via {}",
                hit.key,
                lang_name(hit.lang).unwrap_or("?")
            );

            let country = match tile.tile_type() {
                TileType::World => String::new(),
                TileType::Country => tile.country_name().to_string(),
            };

            let mut penalty = WORST_PENALTY;
            let mut name = String::new();
            for (lang, variant) in feature.names() {
                let p = scorer.score(*lang, variant);
                if p < penalty {
                    penalty = p;
                    name = variant.clone();
                }
            }

            candidates.push(Candidate {
                key: hit.key,
                rank: hit.rank,
                name,
                penalty,
                country,
                point: hit.point,
                types: feature.types().to_vec(),
                geometry: feature.geometry(),
                viewport_distance: hit.viewport_distance,
                user_distance: hit.user_distance,
            });
        }

        for candidate in rank_and_fuse(candidates).into_iter().take(self.options.results_needed) {
            if cancel.is_cancelled() {
                break;
            }
            log::debug!(
                "emit {:?} name={:?} penalty={}",
                candidate.key,
                candidate.name,
                candidate.penalty
            );
            sink.add_result(candidate.into_result());
        }

        Ok(())
    }
}

fn check_cancel(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(GazetteerError::Canceled)
    } else {
        Ok(())
    }
}
