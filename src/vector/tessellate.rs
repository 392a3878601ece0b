//! Line ribbon tessellation.
//!
//! Each distinct point of a line emits two vertices (corner +1 and -1) that are
//! shared by the segments meeting there, so a line of `n` points yields `2n`
//! vertices and `6(n - 1)` indices. Interior vertices are pushed out along the
//! bisector of the adjacent segment normals.

use glam::Vec2;

use crate::config::LayerOptions;
use crate::style::resolver::ResolvedSymbol;
use crate::vector::data::LineArrays;
use crate::vector::line_types::{LineNormal, LinePosition, LineStyle};

/// Consecutive points closer than this are merged.
pub const MIN_SEGMENT_LENGTH: f32 = 1e-6;

/// Accumulates ribbons for many lines into one set of arrays.
#[derive(Debug, Clone)]
pub struct LineTessellator {
    blur: f32,
    miter_limit: f32,
    arrays: LineArrays,
}

impl LineTessellator {
    pub fn new(blur: f32, miter_limit: f32) -> Self {
        Self {
            blur,
            miter_limit: miter_limit.max(1.0),
            arrays: LineArrays::default(),
        }
    }

    pub fn from_options(options: &LayerOptions) -> Self {
        Self::new(options.blur, options.miter_limit)
    }

    pub fn reset(&mut self) {
        self.arrays.clear();
    }

    /// Append one line. Returns the number of vertices emitted.
    pub fn add_line(&mut self, points: &[Vec2], resolved: &ResolvedSymbol<'_>) -> usize {
        if let Some(bad) = points.iter().find(|p| !p.is_finite()) {
            log::warn!("skipping line with non-finite point {bad}");
            return 0;
        }
        let path = dedup_points(points);
        if path.len() < 2 {
            log::debug!("skipping line with {} distinct points", path.len());
            return 0;
        }

        let symbol = resolved.symbol;
        let half = symbol.line_width * 0.5 + self.blur;
        let style = LineStyle {
            texcoord: resolved.tex_coord.map(|uv| uv.to_array()).unwrap_or([0.0; 4]),
            opacity: symbol.line_opacity,
            linewidth: symbol.line_width,
            color: symbol.line_color.rgba(),
        };

        let base = self.arrays.vertex_array.len() as u32;
        let mut linesofar = 0.0f32;
        for i in 0..path.len() {
            if i > 0 {
                linesofar += path[i].distance(path[i - 1]);
            }
            let (unit, extrude) = self.join_normal(&path, i);
            for corner in [1.0f32, -1.0] {
                self.arrays.vertex_array.push(LinePosition {
                    pos: path[i].to_array(),
                });
                self.arrays.normal_array.push(LineNormal {
                    corner,
                    linenormal: unit.to_array(),
                    normal: (extrude * half * corner).to_array(),
                    linesofar,
                });
                self.arrays.style_array.push(style);
            }
        }

        for seg in 0..path.len() as u32 - 1 {
            let a = base + seg * 2;
            // a, a+1 at the segment start; a+2, a+3 at its end
            self.arrays
                .element_array
                .extend_from_slice(&[a, a + 1, a + 2, a + 1, a + 3, a + 2]);
        }

        path.len() * 2
    }

    /// Accumulated arrays. Stable until the next `add_line` or `reset`.
    pub fn arrays(&self) -> &LineArrays {
        &self.arrays
    }

    /// Unit normal and extrusion direction (unit length times the miter factor).
    fn join_normal(&self, path: &[Vec2], i: usize) -> (Vec2, Vec2) {
        let last = path.len() - 1;
        let normal_of = |a: Vec2, b: Vec2| (b - a).normalize().perp();
        if i == 0 {
            let n = normal_of(path[0], path[1]);
            return (n, n);
        }
        if i == last {
            let n = normal_of(path[last - 1], path[last]);
            return (n, n);
        }
        let prev = normal_of(path[i - 1], path[i]);
        let next = normal_of(path[i], path[i + 1]);
        let bisector = (prev + next).normalize_or_zero();
        if bisector == Vec2::ZERO {
            // Full reversal
            return (prev, prev);
        }
        let cos_half = bisector.dot(next);
        let scale = if cos_half > 1.0 / self.miter_limit {
            1.0 / cos_half
        } else {
            self.miter_limit
        };
        (bisector, bisector * scale)
    }
}

impl Default for LineTessellator {
    fn default() -> Self {
        Self::from_options(&LayerOptions::default())
    }
}

fn dedup_points(points: &[Vec2]) -> Vec<Vec2> {
    let mut path: Vec<Vec2> = Vec::with_capacity(points.len());
    for &p in points {
        match path.last() {
            Some(prev) if prev.distance(p) < MIN_SEGMENT_LENGTH => {}
            _ => path.push(p),
        }
    }
    path
}
