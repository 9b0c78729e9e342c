//! Public interface: result types, the result sink, engine options, errors,
//! and the tunable constants of the search pipeline.
//!
//! This file is the source of truth for everything a host application sees.

use thiserror::Error;

use crate::geometry::Point;
use crate::models::{FeatureType, Geometry};

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Hard cap on query tokens; anything beyond is discarded.
pub const MAX_TOKENS: usize = 31;

/// The search viewport is extended by this factor around its center before
/// geometric filtering.
pub const VIEWPORT_SCALE: f64 = 3.0;

/// Added to the viewport scale level before clamping into a tile's supported
/// range, so features indexed for closer zooms still match.
pub const SCALE_BIAS: i32 = 7;

/// Language used when the host never sets one.
pub const DEFAULT_LANGUAGE: &str = "en";

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTIFIERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Dense index of a tile within the current tile set.
pub type TileId = usize;

/// Index of a feature record inside its tile.
pub type FeatureOffset = u32;

/// Globally unique feature identifier: offset within a tile, plus the tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureKey {
    pub offset: FeatureOffset,
    pub tile: TileId,
}

impl FeatureKey {
    pub const fn new(offset: FeatureOffset, tile: TileId) -> Self {
        Self { offset, tile }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// A single ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResult {
    /// A geographic feature matched through the tile tries.
    Feature {
        key: FeatureKey,
        name: String,
        country: String,
        point: Point,
        types: Vec<FeatureType>,
        geometry: Geometry,
    },
    /// A coordinate literal recognized inline in the query.
    Coordinate { lat: f64, lon: f64 },
    /// A completion offered for a short query.
    Suggestion { text: String },
}

impl SearchResult {
    /// True for [`SearchResult::Feature`]; coordinate and suggestion results
    /// are synthetic and bypass the feature pipeline.
    pub fn is_feature(&self) -> bool {
        matches!(self, SearchResult::Feature { .. })
    }
}

/// Receives results as the pipeline emits them, in final ranked order.
pub trait ResultSink {
    fn add_result(&mut self, result: SearchResult);
}

impl ResultSink for Vec<SearchResult> {
    fn add_result(&mut self, result: SearchResult) {
        self.push(result);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Engine configuration. `results_needed` bounds emitted feature results;
/// each internal candidate queue holds twice that many entries.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub preferred_language: String,
    pub results_needed: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { preferred_language: DEFAULT_LANGUAGE.to_string(), results_needed: 10 }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors surfaced by the engine and the in-memory tile builders.
#[derive(Debug, Error)]
pub enum GazetteerError {
    /// The cancel token was set. Internal control flow: `search` swallows
    /// this and returns whatever was already emitted.
    #[error("search canceled")]
    Canceled,

    /// A language code not present in the registry.
    #[error("unknown language code: {0}")]
    UnknownLanguage(String),

    /// A tile was built with an unusable configuration.
    #[error("invalid tile: {0}")]
    InvalidTile(String),
}

pub type Result<T, E = GazetteerError> = std::result::Result<T, E>;
