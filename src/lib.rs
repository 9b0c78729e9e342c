//! # Gazetteer
//!
//! Viewport-aware ranked search over pre-built map tiles.
//!
//! Given a free-form query and a viewport rectangle, the engine walks the
//! per-language name tries of every relevant tile, filters hits through a
//! cached set of geometrically visible feature offsets, and fuses three
//! orthogonal orderings (feature rank, viewport-center distance, user
//! distance) into one ranked result list. Coordinate literals and prefix
//! suggestions are recognized inline.
//!
//! ```
//! use std::sync::Arc;
//! use gazetteer::{
//!     CategoryMap, Feature, Point, Rect, SearchEngine, SuggestionDictionary, TileBuilder,
//!     TileSet, TileType,
//! };
//!
//! # fn main() -> Result<(), gazetteer::GazetteerError> {
//! let tiles = Arc::new(TileSet::new());
//! tiles.add_tile(
//!     TileBuilder::new(TileType::Country, "Testland")
//!         .feature(Feature::new(Point::new(1.0, 2.0), 150).with_name("en", "Old Harbor")?)
//!         .build()?,
//! );
//!
//! let mut engine =
//!     SearchEngine::new(tiles, CategoryMap::new(), SuggestionDictionary::default());
//! engine.set_viewport(Rect::new(0.0, 0.0, 4.0, 4.0));
//!
//! let mut results: Vec<gazetteer::SearchResult> = Vec::new();
//! engine.search("harbor ", &mut results)?;
//! assert!(results[0].is_feature());
//! # Ok(())
//! # }
//! ```

pub(crate) mod candidate;
pub mod geometry;
pub mod interface;
pub mod latlon;
pub mod models;
pub mod query;
pub(crate) mod ranking;
pub(crate) mod scoring;
mod store;
pub mod suggest;
pub mod tiles;
mod trie;

pub use geometry::{Point, Rect};
pub use interface::*;
pub use latlon::{match_lat_lon, LatLon};
pub use models::{Feature, FeatureType, Geometry, TileInfo, TileType};
pub use query::{normalize_query, QueryTokens};
pub use store::{CategoryMap, SearchEngine};
pub use suggest::SuggestionDictionary;
pub use tiles::{Tile, TileBuilder, TileSet};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
