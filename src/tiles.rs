//! The tile set: self-contained map regions, each with a feature store, a
//! geometric cell index, and a multilingual name trie.
//!
//! Tiles are produced once by [`TileBuilder`] and then only read. A lease on
//! a tile is an `Arc` clone handed out by [`TileSet::lock`]; it stays valid
//! even if the tile is removed from the set mid-search. Adding or removing a
//! tile bumps the set's generation counter, which invalidates any viewport
//! offset cache built against an older generation.

use std::ops::Range;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::geometry::{cell_of, Rect, MAX_SCALE};
use crate::interface::{FeatureOffset, GazetteerError, Result, TileId};
use crate::models::{Feature, TileInfo, TileType};
use crate::query::{fold, is_delimiter};
use crate::trie::{NameTrie, TrieValue};

/// Geometric index: features by grid cell at the tile's last scale, each
/// gated by the feature's minimum visible scale.
#[derive(Debug, Default)]
pub(crate) struct CellIndex {
    entries: Vec<CellEntry>,
}

#[derive(Debug)]
struct CellEntry {
    cell: u64,
    offset: FeatureOffset,
    min_scale: u8,
}

impl CellIndex {
    fn build(features: &[Feature], last_scale: u8) -> Self {
        let mut entries: Vec<CellEntry> = features
            .iter()
            .enumerate()
            .map(|(offset, f)| CellEntry {
                cell: cell_of(f.point(), last_scale),
                offset: offset as FeatureOffset,
                min_scale: f.min_scale(),
            })
            .collect();
        entries.sort_unstable_by_key(|e| e.cell);
        Self { entries }
    }

    /// Emit offsets of features inside the half-open cell interval that are
    /// visible at `scale`.
    pub(crate) fn for_each_in_interval<F>(&self, interval: &Range<u64>, scale: u8, mut f: F)
    where
        F: FnMut(FeatureOffset),
    {
        let start = self.entries.partition_point(|e| e.cell < interval.start);
        for entry in &self.entries[start..] {
            if entry.cell >= interval.end {
                break;
            }
            if entry.min_scale <= scale {
                f(entry.offset);
            }
        }
    }
}

/// A packaged map region: read-only after construction.
#[derive(Debug)]
pub struct Tile {
    tile_type: TileType,
    country_name: String,
    limit_rect: Rect,
    scale_range: (u8, u8),
    features: Vec<Feature>,
    cell_index: CellIndex,
    trie: NameTrie,
}

impl Tile {
    pub fn tile_type(&self) -> TileType {
        self.tile_type
    }

    pub fn country_name(&self) -> &str {
        &self.country_name
    }

    pub fn limit_rect(&self) -> Rect {
        self.limit_rect
    }

    /// Inclusive range of scales this tile is indexed for.
    pub fn scale_range(&self) -> (u8, u8) {
        self.scale_range
    }

    pub(crate) fn last_scale(&self) -> u8 {
        self.scale_range.1
    }

    /// The feature record at `offset`, if the offset is valid.
    pub fn feature(&self, offset: FeatureOffset) -> Option<&Feature> {
        self.features.get(offset as usize)
    }

    pub(crate) fn trie(&self) -> &NameTrie {
        &self.trie
    }

    pub(crate) fn cell_index(&self) -> &CellIndex {
        &self.cell_index
    }
}

/// Builds an in-memory [`Tile`] from features: folds and tokenizes every
/// name into the per-language tries, registers feature types in the
/// categories subtree, and lays out the cell index.
pub struct TileBuilder {
    tile_type: TileType,
    country_name: String,
    limit_rect: Option<Rect>,
    scale_range: (u8, u8),
    features: Vec<Feature>,
}

impl TileBuilder {
    pub fn new(tile_type: TileType, country_name: &str) -> Self {
        Self {
            tile_type,
            country_name: country_name.to_string(),
            limit_rect: None,
            scale_range: (0, MAX_SCALE),
            features: Vec::new(),
        }
    }

    pub fn scale_range(mut self, lo: u8, hi: u8) -> Self {
        self.scale_range = (lo, hi);
        self
    }

    /// Override the limit rect. Without this, country tiles use the bounding
    /// box of their features and world tiles cover the whole world.
    pub fn limit_rect(mut self, rect: Rect) -> Self {
        self.limit_rect = Some(rect);
        self
    }

    pub fn feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    pub fn build(self) -> Result<Tile> {
        let (lo, hi) = self.scale_range;
        if lo > hi || hi > MAX_SCALE {
            return Err(GazetteerError::InvalidTile(format!("bad scale range {lo}..={hi}")));
        }

        let limit_rect = match (self.limit_rect, self.tile_type) {
            (Some(rect), _) => rect,
            (None, TileType::World) => Rect::world(),
            (None, TileType::Country) => {
                bounding_rect(&self.features).ok_or_else(|| {
                    GazetteerError::InvalidTile(
                        "country tile needs features or an explicit limit rect".to_string(),
                    )
                })?
            }
        };

        let mut trie = NameTrie::default();
        for (offset, feature) in self.features.iter().enumerate() {
            let value = TrieValue {
                offset: offset as FeatureOffset,
                rank: feature.rank(),
                point: feature.point(),
            };
            for (lang, name) in feature.names() {
                for token in fold(name).split(is_delimiter).filter(|t| !t.is_empty()) {
                    trie.insert_name(*lang, token, value);
                }
            }
            for t in feature.types() {
                trie.insert_category(t.name(), value);
            }
        }

        let cell_index = CellIndex::build(&self.features, hi);

        Ok(Tile {
            tile_type: self.tile_type,
            country_name: self.country_name,
            limit_rect,
            scale_range: self.scale_range,
            features: self.features,
            cell_index,
            trie,
        })
    }
}

fn bounding_rect(features: &[Feature]) -> Option<Rect> {
    let first = features.first()?.point();
    let mut rect = Rect::new(first.x, first.y, first.x, first.y);
    for f in &features[1..] {
        let p = f.point();
        rect.min_x = rect.min_x.min(p.x);
        rect.min_y = rect.min_y.min(p.y);
        rect.max_x = rect.max_x.max(p.x);
        rect.max_y = rect.max_y.max(p.y);
    }
    Some(rect)
}

#[derive(Default)]
struct TileSetInner {
    tiles: Vec<Option<Arc<Tile>>>,
    generation: u64,
}

/// The current collection of tiles, shareable across threads. Tile ids are
/// dense vector slots; removing a tile leaves a hole so ids stay stable.
#[derive(Default)]
pub struct TileSet {
    inner: RwLock<TileSetInner>,
}

impl TileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tile and return its id. Bumps the generation.
    pub fn add_tile(&self, tile: Tile) -> TileId {
        let mut inner = self.inner.write();
        inner.tiles.push(Some(Arc::new(tile)));
        inner.generation += 1;
        inner.tiles.len() - 1
    }

    /// Drop a tile from the set. Bumps the generation when the id was live.
    pub fn remove_tile(&self, id: TileId) -> bool {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        match inner.tiles.get_mut(id) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                inner.generation += 1;
                true
            }
            _ => false,
        }
    }

    /// Descriptors of all live tiles.
    pub fn tiles(&self) -> Vec<TileInfo> {
        let inner = self.inner.read();
        inner
            .tiles
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| {
                slot.as_ref().map(|tile| TileInfo {
                    id,
                    limit_rect: tile.limit_rect(),
                    tile_type: tile.tile_type(),
                })
            })
            .collect()
    }

    /// Number of id slots, live or not. Offset caches size to this.
    pub fn slot_count(&self) -> usize {
        self.inner.read().tiles.len()
    }

    /// Lease a tile for reading. `None` when the id is stale.
    pub fn lock(&self, id: TileId) -> Option<Arc<Tile>> {
        self.inner.read().tiles.get(id)?.clone()
    }

    /// Monotonic counter bumped on every add/remove.
    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn point_feature(x: f64, y: f64, name: &str) -> Feature {
        Feature::new(Point::new(x, y), 50).with_name("en", name).unwrap()
    }

    #[test]
    fn test_builder_bounding_rect_default() {
        let tile = TileBuilder::new(TileType::Country, "Testland")
            .feature(point_feature(1.0, 2.0, "a"))
            .feature(point_feature(5.0, -3.0, "b"))
            .build()
            .unwrap();
        let r = tile.limit_rect();
        assert_eq!((r.min_x, r.min_y, r.max_x, r.max_y), (1.0, -3.0, 5.0, 2.0));
    }

    #[test]
    fn test_builder_world_default_rect() {
        let tile = TileBuilder::new(TileType::World, "").build().unwrap();
        assert_eq!(tile.limit_rect(), Rect::world());
    }

    #[test]
    fn test_builder_rejects_bad_scale_range() {
        let err = TileBuilder::new(TileType::World, "").scale_range(9, 3).build();
        assert!(matches!(err, Err(GazetteerError::InvalidTile(_))));
    }

    #[test]
    fn test_builder_rejects_empty_country_tile() {
        let err = TileBuilder::new(TileType::Country, "Nowhere").build();
        assert!(matches!(err, Err(GazetteerError::InvalidTile(_))));
    }

    #[test]
    fn test_cell_index_interval_and_scale() {
        let features = vec![
            point_feature(-10.0, -10.0, "a"),
            point_feature(10.0, 10.0, "b").with_min_scale(9),
        ];
        let index = CellIndex::build(&features, 6);

        let cell_a = cell_of(Point::new(-10.0, -10.0), 6);
        let mut hits = Vec::new();
        index.for_each_in_interval(&(cell_a..cell_a + 1), 5, |o| hits.push(o));
        assert_eq!(hits, vec![0]);

        // Feature b only appears once the query scale reaches its min scale.
        let cell_b = cell_of(Point::new(10.0, 10.0), 6);
        let mut hits = Vec::new();
        index.for_each_in_interval(&(cell_b..cell_b + 1), 5, |o| hits.push(o));
        assert!(hits.is_empty());
        index.for_each_in_interval(&(cell_b..cell_b + 1), 9, |o| hits.push(o));
        assert_eq!(hits, vec![1]);
    }

    #[test]
    fn test_tile_set_generation_and_leases() {
        let set = TileSet::new();
        assert_eq!(set.generation(), 0);

        let tile = TileBuilder::new(TileType::Country, "Testland")
            .feature(point_feature(0.0, 0.0, "a"))
            .build()
            .unwrap();
        let id = set.add_tile(tile);
        assert_eq!(set.generation(), 1);
        assert_eq!(set.tiles().len(), 1);

        let lease = set.lock(id).unwrap();
        assert!(set.remove_tile(id));
        assert_eq!(set.generation(), 2);
        assert!(set.lock(id).is_none());
        assert!(set.tiles().is_empty());
        // Existing lease outlives removal.
        assert_eq!(lease.country_name(), "Testland");

        assert!(!set.remove_tile(id), "double removal is a no-op");
        assert_eq!(set.generation(), 2);
    }

    #[test]
    fn test_feature_lookup_by_offset() {
        let tile = TileBuilder::new(TileType::Country, "Testland")
            .feature(point_feature(0.0, 0.0, "first"))
            .feature(point_feature(1.0, 1.0, "second"))
            .build()
            .unwrap();
        assert_eq!(tile.feature(1).unwrap().names()[0].1, "second");
        assert!(tile.feature(7).is_none());
    }
}
