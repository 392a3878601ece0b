//! Line styling: rules, filters, sprite atlas and resolution.
//!
//! A style sheet is an ordered list of [`StyleRule`]s. Each feature is drawn
//! with the symbol of the first rule whose filter matches its attributes.
//! Symbols that need texture sampling own a sprite in the shared [`LineAtlas`].

pub mod atlas;
pub mod filter;
pub mod parser;
pub mod resolver;
pub mod resources;
pub mod types;

pub use atlas::{rasterize_dash, AtlasBuilder, LineAtlas, UvRect};
pub use filter::{CompareOp, FilterExpr};
pub use parser::{parse_features, parse_features_str, parse_style, parse_style_str, StyleError};
pub use resolver::{resolve, ResolvedSymbol, StyleResolver};
pub use resources::{prefetch, FileResourceLoader, NoResources, ResourceCache, ResourceLoader};
pub use types::{parse_color_string, Color, Feature, Properties, StyleRule, Symbol};
