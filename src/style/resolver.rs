//! First-match style resolution.

use crate::style::atlas::{LineAtlas, UvRect};
use crate::style::types::{Properties, StyleRule, Symbol};

/// Symbol chosen for a feature plus its atlas rectangle.
///
/// `tex_coord == None` renders the line solid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedSymbol<'a> {
    pub symbol: &'a Symbol,
    pub tex_coord: Option<UvRect>,
}

impl<'a> ResolvedSymbol<'a> {
    pub fn solid(symbol: &'a Symbol) -> Self {
        Self {
            symbol,
            tex_coord: None,
        }
    }
}

/// Pick the first rule whose filter matches `properties`.
///
/// The atlas must have been built from `rules` in the same order; its UV
/// sequence is indexed by counting the sprite-owning rules walked so far.
pub fn resolve<'a>(
    properties: &Properties,
    rules: &'a [StyleRule],
    atlas: &LineAtlas,
) -> Option<ResolvedSymbol<'a>> {
    let mut owned = 0usize;
    for (i, rule) in rules.iter().enumerate() {
        let has_sprite = atlas.has_sprite(i);
        if has_sprite {
            owned += 1;
        }
        if rule.filter.evaluate(properties) {
            let tex_coord = if has_sprite {
                atlas.tex_coords().get(owned - 1).copied()
            } else {
                None
            };
            return Some(ResolvedSymbol {
                symbol: &rule.symbol,
                tex_coord,
            });
        }
    }
    None
}

/// Stateful resolver bound to one rule set and its atlas.
#[derive(Debug, Clone, Copy)]
pub struct StyleResolver<'a> {
    rules: &'a [StyleRule],
    atlas: &'a LineAtlas,
}

impl<'a> StyleResolver<'a> {
    pub fn new(rules: &'a [StyleRule], atlas: &'a LineAtlas) -> Self {
        Self { rules, atlas }
    }

    pub fn resolve(&self, properties: &Properties) -> Option<ResolvedSymbol<'a>> {
        resolve(properties, self.rules, self.atlas)
    }
}
