//! External sprite resources referenced by symbols.
//!
//! A symbol may name a `linePatternFile`. Before the atlas is rebuilt every such
//! URL is fetched once through a [`ResourceLoader`] into a [`ResourceCache`];
//! failures are logged and leave the symbol without a sprite.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::error::{RenderError, RenderResult};
use crate::style::types::{StyleRule, Symbol};

/// Source of external sprite images.
pub trait ResourceLoader {
    /// URLs the symbol needs before its sprite can be built.
    fn external_resources(&self, symbol: &Symbol) -> Vec<String> {
        symbol.line_pattern_file.iter().cloned().collect()
    }

    /// Fetch one resource as an RGBA bitmap.
    fn load(&self, url: &str) -> RenderResult<RgbaImage>;
}

/// Loader that never resolves anything. Pattern files fall back to solid lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResources;

impl ResourceLoader for NoResources {
    fn external_resources(&self, _symbol: &Symbol) -> Vec<String> {
        Vec::new()
    }

    fn load(&self, url: &str) -> RenderResult<RgbaImage> {
        Err(RenderError::resource(format!("no loader for {url}")))
    }
}

/// Loads image files relative to a base directory.
#[derive(Debug, Clone)]
pub struct FileResourceLoader {
    base_dir: PathBuf,
}

impl FileResourceLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

impl ResourceLoader for FileResourceLoader {
    fn load(&self, url: &str) -> RenderResult<RgbaImage> {
        let path = self.resolve(url);
        let img = image::open(&path)
            .map_err(|e| RenderError::resource(format!("failed to load {}: {e}", path.display())))?;
        Ok(img.to_rgba8())
    }
}

/// Images fetched for the current rule set, keyed by URL.
#[derive(Debug, Default, Clone)]
pub struct ResourceCache {
    images: HashMap<String, RgbaImage>,
    failed: Vec<String>,
}

impl ResourceCache {
    pub fn get(&self, url: &str) -> Option<&RgbaImage> {
        self.images.get(url)
    }

    pub fn insert(&mut self, url: impl Into<String>, image: RgbaImage) {
        self.images.insert(url.into(), image);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// URLs whose fetch failed during the last prefetch.
    pub fn failed(&self) -> &[String] {
        &self.failed
    }
}

/// Fetch every external resource named by `rules` once.
pub fn prefetch(rules: &[StyleRule], loader: &dyn ResourceLoader) -> ResourceCache {
    let mut cache = ResourceCache::default();
    for rule in rules {
        for url in loader.external_resources(&rule.symbol) {
            if cache.images.contains_key(&url) || cache.failed.contains(&url) {
                continue;
            }
            match loader.load(&url) {
                Ok(image) if image.width() > 0 && image.height() > 0 => {
                    log::debug!("loaded pattern {url} ({}x{})", image.width(), image.height());
                    cache.images.insert(url, image);
                }
                Ok(_) => {
                    log::warn!("pattern {url} is empty, rendering solid");
                    cache.failed.push(url);
                }
                Err(e) => {
                    log::warn!("{e}, rendering solid");
                    cache.failed.push(url);
                }
            }
        }
    }
    cache
}
