//! Core data model: features, multilingual names, feature types, and tile
//! metadata.
//!
//! Feature names carry dense one-byte language codes resolved through a fixed
//! registry; the registry deliberately stops well below [`CATEGORIES_LANG`],
//! which tags the category subtree in the per-tile name tries.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::geometry::{Point, Rect};
use crate::interface::{GazetteerError, Result, TileId};

/// Dense language index used in name tries and feature name lists.
pub type LangCode = u8;

/// Trie root label selecting the categories subtree. All real language codes
/// are numerically below this.
pub const CATEGORIES_LANG: u8 = 128;

/// Registered language codes, indexed by their `LangCode`. "default" holds
/// the raw unlocalized name; "int_name" is the international transliteration.
static LANG_CODES: &[&str] = &[
    "default", "en", "int_name", "ru", "de", "fr", "es", "it", "pt", "nl", "pl", "sv", "cs", "el",
    "tr", "uk", "ar", "he", "ja", "ko", "zh", "th", "vi",
];

static LANG_INDEX: Lazy<HashMap<&'static str, LangCode>> = Lazy::new(|| {
    LANG_CODES
        .iter()
        .enumerate()
        .map(|(i, code)| (*code, i as LangCode))
        .collect()
});

/// Resolve a short language code ("en", "ru", "default", ...) to its dense
/// index.
pub fn lang_index(code: &str) -> Option<LangCode> {
    LANG_INDEX.get(code).copied()
}

/// The code string for a dense language index.
pub fn lang_name(lang: LangCode) -> Option<&'static str> {
    LANG_CODES.get(lang as usize).copied()
}

/// Feature classification. Also the vocabulary of the per-tile category
/// subtree: `name()` is the label stored there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureType {
    City,
    Town,
    Village,
    Street,
    Building,
    Park,
    Restaurant,
    Cafe,
    Bar,
    Hotel,
    Shop,
    Museum,
    Railway,
    River,
    Peak,
    Airport,
}

impl FeatureType {
    /// Label used in category tries and category-keyword expansion.
    pub fn name(&self) -> &'static str {
        match self {
            FeatureType::City => "city",
            FeatureType::Town => "town",
            FeatureType::Village => "village",
            FeatureType::Street => "street",
            FeatureType::Building => "building",
            FeatureType::Park => "park",
            FeatureType::Restaurant => "restaurant",
            FeatureType::Cafe => "cafe",
            FeatureType::Bar => "bar",
            FeatureType::Hotel => "hotel",
            FeatureType::Shop => "shop",
            FeatureType::Museum => "museum",
            FeatureType::Railway => "railway",
            FeatureType::River => "river",
            FeatureType::Peak => "peak",
            FeatureType::Airport => "airport",
        }
    }

    /// Linear features (roads, rails, rivers) are often split into several
    /// named fragments per tile; the ranker collapses those.
    pub fn is_linear(&self) -> bool {
        matches!(self, FeatureType::Street | FeatureType::Railway | FeatureType::River)
    }
}

/// Geometry summary carried through to results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    Point,
    Line,
}

/// A single geographic entity: a representative point, a build-time
/// popularity rank, names in any number of languages, and a type set.
#[derive(Debug, Clone)]
pub struct Feature {
    point: Point,
    rank: u8,
    min_scale: u8,
    geometry: Geometry,
    names: Vec<(LangCode, String)>,
    types: Vec<FeatureType>,
}

impl Feature {
    pub fn new(point: Point, rank: u8) -> Self {
        Self {
            point,
            rank,
            min_scale: 0,
            geometry: Geometry::Point,
            names: Vec::new(),
            types: Vec::new(),
        }
    }

    /// Attach a name in the given language code.
    pub fn with_name(mut self, lang: &str, name: &str) -> Result<Self> {
        let code =
            lang_index(lang).ok_or_else(|| GazetteerError::UnknownLanguage(lang.to_string()))?;
        self.names.push((code, name.to_string()));
        Ok(self)
    }

    pub fn with_type(mut self, t: FeatureType) -> Self {
        self.types.push(t);
        self
    }

    /// Mark the feature as linear geometry.
    pub fn linear(mut self) -> Self {
        self.geometry = Geometry::Line;
        self
    }

    /// Minimum scale at which the feature is drawn (and hence indexed).
    pub fn with_min_scale(mut self, scale: u8) -> Self {
        self.min_scale = scale;
        self
    }

    pub fn point(&self) -> Point {
        self.point
    }

    pub fn rank(&self) -> u8 {
        self.rank
    }

    pub fn min_scale(&self) -> u8 {
        self.min_scale
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn names(&self) -> &[(LangCode, String)] {
        &self.names
    }

    pub fn types(&self) -> &[FeatureType] {
        &self.types
    }
}

/// Tile classification: the world tile is always searched without viewport
/// filtering; country tiles are filtered through the offset cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileType {
    World,
    Country,
}

/// Lightweight tile descriptor returned by the tile set.
#[derive(Debug, Clone)]
pub struct TileInfo {
    pub id: TileId,
    pub limit_rect: Rect,
    pub tile_type: TileType,
}
