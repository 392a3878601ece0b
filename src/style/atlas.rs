//! Dash-pattern sprite atlas.
//!
//! Every symbol that needs texture sampling gets a small sprite (a rasterized
//! dash pattern or a loaded pattern image). Sprites are packed into one bitmap
//! with `guillotiere` and addressed by normalized UV rectangles.

use std::collections::HashMap;

use guillotiere::{size2, AtlasAllocator};
use image::{Rgba, RgbaImage};

use crate::config::LayerOptions;
use crate::error::{RenderError, RenderResult};
use crate::style::resources::ResourceCache;
use crate::style::types::Symbol;

/// Normalized rectangle inside the atlas bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UvRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl UvRect {
    pub fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.w, self.h]
    }
}

/// Packed atlas: composed bitmap plus per-owner UV rectangles.
#[derive(Debug, Clone, PartialEq)]
pub struct LineAtlas {
    image: RgbaImage,
    tex_coords: Vec<UvRect>,
    owners: Vec<bool>,
    sprite_count: usize,
}

impl LineAtlas {
    pub fn empty() -> Self {
        Self {
            image: RgbaImage::new(0, 0),
            tex_coords: Vec::new(),
            owners: Vec::new(),
            sprite_count: 0,
        }
    }

    /// Composed bitmap, cropped to the used extent.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// UV rectangles of owning symbols, in input order.
    pub fn tex_coords(&self) -> &[UvRect] {
        &self.tex_coords
    }

    /// Whether input symbol `index` owns an atlas entry.
    pub fn has_sprite(&self, index: usize) -> bool {
        self.owners.get(index).copied().unwrap_or(false)
    }

    /// Number of distinct packed sprites.
    pub fn sprite_count(&self) -> usize {
        self.sprite_count
    }

    pub fn is_empty(&self) -> bool {
        self.tex_coords.is_empty()
    }
}

impl Default for LineAtlas {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SpriteKey {
    Dash {
        pattern: Vec<u32>,
        color: [u8; 4],
        height: u32,
    },
    File(String),
}

/// Packs symbol sprites into a bounded atlas.
#[derive(Debug, Clone, Copy)]
pub struct AtlasBuilder {
    max_size: u32,
    padding: u32,
}

impl AtlasBuilder {
    pub fn new(max_size: u32, padding: u32) -> Self {
        Self { max_size, padding }
    }

    pub fn from_options(options: &LayerOptions) -> Self {
        Self::new(options.max_atlas_size, options.atlas_padding)
    }

    /// Build the atlas for `symbols`.
    ///
    /// Identical input yields an identical atlas. Fails with
    /// [`RenderError::AtlasFull`] when the sprites do not fit.
    pub fn build<'a, I>(&self, symbols: I, resources: &ResourceCache) -> RenderResult<LineAtlas>
    where
        I: IntoIterator<Item = &'a Symbol>,
    {
        let mut sprites: Vec<RgbaImage> = Vec::new();
        let mut by_key: HashMap<SpriteKey, usize> = HashMap::new();
        // Sprite index per owning symbol, in input order
        let mut slots: Vec<usize> = Vec::new();
        let mut owners: Vec<bool> = Vec::new();

        for symbol in symbols {
            let Some((key, sprite)) = sprite_for(symbol, resources, self.max_size)? else {
                owners.push(false);
                continue;
            };
            owners.push(true);
            let index = *by_key.entry(key).or_insert_with(|| {
                sprites.push(sprite);
                sprites.len() - 1
            });
            slots.push(index);
        }

        if sprites.is_empty() {
            return Ok(LineAtlas {
                owners,
                ..LineAtlas::empty()
            });
        }

        let positions = self.pack(&sprites)?;
        let width = sprites
            .iter()
            .zip(&positions)
            .map(|(s, (x, _))| x + s.width())
            .max()
            .unwrap_or(0);
        let height = sprites
            .iter()
            .zip(&positions)
            .map(|(s, (_, y))| y + s.height())
            .max()
            .unwrap_or(0);

        let mut image = RgbaImage::new(width, height);
        for (sprite, &(x, y)) in sprites.iter().zip(&positions) {
            image::imageops::replace(&mut image, sprite, i64::from(x), i64::from(y));
        }

        let rects: Vec<UvRect> = sprites
            .iter()
            .zip(&positions)
            .map(|(s, &(x, y))| UvRect {
                x: x as f32 / width as f32,
                y: y as f32 / height as f32,
                w: s.width() as f32 / width as f32,
                h: s.height() as f32 / height as f32,
            })
            .collect();

        log::debug!(
            "packed {} sprites for {} symbols into {}x{} atlas",
            sprites.len(),
            slots.len(),
            width,
            height
        );

        Ok(LineAtlas {
            image,
            tex_coords: slots.iter().map(|&i| rects[i]).collect(),
            owners,
            sprite_count: sprites.len(),
        })
    }

    fn pack(&self, sprites: &[RgbaImage]) -> RenderResult<Vec<(u32, u32)>> {
        let side = self.max_size as i32;
        let mut allocator = AtlasAllocator::new(size2(side, side));
        let mut positions = Vec::with_capacity(sprites.len());
        for sprite in sprites {
            let full = || RenderError::AtlasFull {
                width: sprite.width(),
                height: sprite.height(),
                max_size: self.max_size,
            };
            if sprite.width() > self.max_size || sprite.height() > self.max_size {
                return Err(full());
            }
            // Trailing gutter, clamped so a sprite filling the atlas still fits
            let w = (sprite.width() + self.padding).min(self.max_size);
            let h = (sprite.height() + self.padding).min(self.max_size);
            let alloc = allocator
                .allocate(size2(w as i32, h as i32))
                .ok_or_else(full)?;
            positions.push((alloc.rectangle.min.x as u32, alloc.rectangle.min.y as u32));
        }
        Ok(positions)
    }
}

/// Sprite identity and bitmap for a symbol, or `None` for solid lines.
///
/// Dash sprites larger than `max_size` fail before any bitmap is allocated.
fn sprite_for(
    symbol: &Symbol,
    resources: &ResourceCache,
    max_size: u32,
) -> RenderResult<Option<(SpriteKey, RgbaImage)>> {
    if let Some(url) = symbol.line_pattern_file.as_deref() {
        // A pattern file that failed to load renders solid, not dashed.
        return Ok(resources
            .get(url)
            .map(|image| (SpriteKey::File(url.to_string()), image.clone())));
    }
    let Some(pattern) = symbol.dash_pattern() else {
        return Ok(None);
    };

    let width = f64::from(pattern.iter().sum::<f32>()).ceil();
    let height = f64::from(symbol.line_width).ceil().max(1.0);
    if width > f64::from(max_size) || height > f64::from(max_size) {
        return Err(RenderError::AtlasFull {
            width: width.min(f64::from(u32::MAX)) as u32,
            height: height.min(f64::from(u32::MAX)) as u32,
            max_size,
        });
    }
    let height = height as u32;

    let color = symbol.line_color.to_rgba8(symbol.line_opacity);
    let Some(sprite) = rasterize_dash(&pattern, color, height) else {
        return Ok(None);
    };
    let key = SpriteKey::Dash {
        pattern: pattern.iter().map(|d| d.to_bits()).collect(),
        color,
        height,
    };
    Ok(Some((key, sprite)))
}

/// Rasterize alternating dash/gap lengths into a `ceil(sum) x height` sprite.
///
/// Alpha is scaled by how much of each pixel column the dashes cover, so
/// sub-pixel dashes stay visible.
pub fn rasterize_dash(pattern: &[f32], color: [u8; 4], height: u32) -> Option<RgbaImage> {
    let total: f32 = pattern.iter().sum();
    let width = total.ceil() as u32;
    if width == 0 || height == 0 {
        return None;
    }

    let mut coverage = vec![0.0f32; width as usize];
    let mut acc = 0.0f32;
    for (i, len) in pattern.iter().enumerate() {
        let (start, end) = (acc, acc + len);
        acc = end;
        if i % 2 != 0 || *len <= 0.0 {
            continue;
        }
        let first = start.floor() as usize;
        let last = (end.ceil() as usize).min(coverage.len());
        for (x, cov) in coverage.iter_mut().enumerate().take(last).skip(first) {
            let px = x as f32;
            *cov += (end.min(px + 1.0) - start.max(px)).max(0.0);
        }
    }

    let mut sprite = RgbaImage::new(width, height);
    for (x, cov) in coverage.iter().enumerate() {
        if *cov <= 0.0 {
            continue;
        }
        let alpha = (f32::from(color[3]) * cov.min(1.0)).round() as u8;
        let pixel = Rgba([color[0], color[1], color[2], alpha]);
        for y in 0..height {
            sprite.put_pixel(x as u32, y, pixel);
        }
    }
    Some(sprite)
}
