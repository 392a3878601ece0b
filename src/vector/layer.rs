//! Line layer orchestration: invalidation state and the per-frame draw.
//!
//! [`LineLayerRenderer`] owns the rules, features, atlas and uploaded buffers
//! of one layer. Change notifications only raise the [`Invalidation`] level;
//! the work happens at the start of the next [`LineLayerRenderer::draw`].

use glam::Mat4;
use image::RgbaImage;

use crate::config::LayerOptions;
use crate::error::RenderResult;
use crate::style::atlas::{AtlasBuilder, LineAtlas};
use crate::style::resolver::StyleResolver;
use crate::style::resources::{prefetch, NoResources, ResourceCache, ResourceLoader};
use crate::style::types::{Feature, StyleRule};
use crate::vector::backend::LineBackend;
use crate::vector::buffers::{BufferManager, LineBuffers};
use crate::vector::line_types::LineUniform;
use crate::vector::tessellate::LineTessellator;

/// Pending work, ordered so a higher level implies every lower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Invalidation {
    Clean = 0,
    /// Features changed: re-resolve, re-tessellate, re-upload.
    Geometry = 1,
    /// Rebuild the atlas, then everything in `Geometry`.
    Sprites = 2,
    /// Re-fetch resources, then everything in `Sprites`.
    Style = 3,
}

/// Per-frame camera input from the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    /// Map units to clip space.
    pub matrix: Mat4,
    /// Map units per pixel.
    pub scale: f32,
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            matrix: Mat4::IDENTITY,
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawStats {
    pub element_count: u32,
    pub vertex_count: u32,
    pub features_drawn: usize,
    pub features_skipped: usize,
    /// This draw rebuilt geometry before drawing.
    pub rebuilt: bool,
    /// Generation of the buffers drawn, `None` when nothing is uploaded.
    pub generation: Option<u64>,
}

/// Receives the composed atlas after each rebuild when `debug_atlas` is set.
pub type AtlasInspector = Box<dyn FnMut(&RgbaImage)>;

pub struct LineLayerRenderer<B: LineBackend> {
    backend: B,
    options: LayerOptions,
    rules: Vec<StyleRule>,
    features: Vec<Feature>,
    loader: Box<dyn ResourceLoader>,
    resources: ResourceCache,
    atlas: LineAtlas,
    tessellator: LineTessellator,
    buffer_manager: BufferManager,
    buffers: Option<LineBuffers<B::Handles>>,
    texture_loaded: bool,
    state: Invalidation,
    inspector: Option<AtlasInspector>,
    features_drawn: usize,
    features_skipped: usize,
}

impl<B: LineBackend> LineLayerRenderer<B> {
    pub fn new(backend: B, options: LayerOptions) -> RenderResult<Self> {
        options.validate()?;
        Ok(Self {
            backend,
            tessellator: LineTessellator::from_options(&options),
            options,
            rules: Vec::new(),
            features: Vec::new(),
            loader: Box::new(NoResources),
            resources: ResourceCache::default(),
            atlas: LineAtlas::empty(),
            buffer_manager: BufferManager::new(),
            buffers: None,
            texture_loaded: false,
            state: Invalidation::Style,
            inspector: None,
            features_drawn: 0,
            features_skipped: 0,
        })
    }

    pub fn with_loader(mut self, loader: Box<dyn ResourceLoader>) -> Self {
        self.loader = loader;
        self.invalidate(Invalidation::Style);
        self
    }

    pub fn options(&self) -> &LayerOptions {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn state(&self) -> Invalidation {
        self.state
    }

    pub fn atlas(&self) -> &LineAtlas {
        &self.atlas
    }

    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn buffers(&self) -> Option<&LineBuffers<B::Handles>> {
        self.buffers.as_ref()
    }

    fn invalidate(&mut self, level: Invalidation) {
        self.state = self.state.max(level);
    }

    /// The host's style changed; rebuild everything on the next draw.
    pub fn on_style_changed(&mut self) {
        self.invalidate(Invalidation::Style);
    }

    pub fn set_style(&mut self, rules: Vec<StyleRule>) {
        self.rules = rules;
        self.on_style_changed();
    }

    pub fn set_features(&mut self, features: Vec<Feature>) {
        self.features = features;
        self.invalidate(Invalidation::Geometry);
    }

    pub fn set_atlas_inspector(&mut self, inspector: impl FnMut(&RgbaImage) + 'static) {
        self.inspector = Some(Box::new(inspector));
    }

    /// Drop every cached resource; the next draw starts from scratch.
    pub fn on_remove(&mut self) {
        self.resources = ResourceCache::default();
        self.atlas = LineAtlas::empty();
        self.tessellator.reset();
        self.buffers = None;
        if self.texture_loaded {
            self.backend.release();
            self.texture_loaded = false;
        }
        self.state = Invalidation::Style;
    }

    /// Bring caches up to date and issue the frame's draw call.
    pub fn draw(&mut self, frame: &FrameParams) -> RenderResult<DrawStats> {
        let rebuilt = self.state > Invalidation::Clean;

        if self.state >= Invalidation::Style {
            self.resources = prefetch(&self.rules, self.loader.as_ref());
            self.state = Invalidation::Sprites;
        }
        if self.state >= Invalidation::Sprites {
            self.rebuild_sprites()?;
            self.state = Invalidation::Geometry;
        }
        if self.state >= Invalidation::Geometry {
            self.rebuild_geometry()?;
            self.state = Invalidation::Clean;
        }

        let (atlas_w, atlas_h) = self.atlas.size();
        let uniform = LineUniform {
            matrix: frame.matrix.to_cols_array_2d(),
            spritesize: [atlas_w as f32, atlas_h as f32],
            scale: frame.scale,
            blur: self.options.blur,
        };
        self.backend.draw(self.buffers.as_ref(), &uniform)?;

        Ok(DrawStats {
            element_count: self.buffers.as_ref().map_or(0, |b| b.element_count),
            vertex_count: self.buffers.as_ref().map_or(0, |b| b.vertex_count),
            features_drawn: self.features_drawn,
            features_skipped: self.features_skipped,
            rebuilt,
            generation: self.buffers.as_ref().map(|b| b.generation),
        })
    }

    fn rebuild_sprites(&mut self) -> RenderResult<()> {
        let builder = AtlasBuilder::from_options(&self.options);
        self.atlas = builder.build(self.rules.iter().map(|r| &r.symbol), &self.resources)?;

        if !self.atlas.is_empty() {
            if self.texture_loaded {
                self.backend.update_texture(self.atlas.image())?;
            } else {
                self.backend.load_texture(self.atlas.image())?;
                self.texture_loaded = true;
            }
        }
        if self.options.debug_atlas {
            if let Some(inspector) = self.inspector.as_mut() {
                inspector(self.atlas.image());
            }
        }
        let (w, h) = self.atlas.size();
        log::info!(
            "atlas rebuilt: {} sprites for {} rules ({}x{})",
            self.atlas.sprite_count(),
            self.rules.len(),
            w,
            h
        );
        Ok(())
    }

    fn rebuild_geometry(&mut self) -> RenderResult<()> {
        self.tessellator.reset();
        let resolver = StyleResolver::new(&self.rules, &self.atlas);
        let mut drawn = 0;
        let mut skipped = 0;
        for (i, feature) in self.features.iter().enumerate() {
            let Some(resolved) = resolver.resolve(&feature.properties) else {
                log::debug!("feature {i} matches no rule, skipping");
                skipped += 1;
                continue;
            };
            if self.tessellator.add_line(&feature.points, &resolved) > 0 {
                drawn += 1;
            } else {
                skipped += 1;
            }
        }
        self.features_drawn = drawn;
        self.features_skipped = skipped;

        self.buffers = None;
        self.buffers = self
            .buffer_manager
            .upload(&mut self.backend, self.tessellator.arrays())?;
        log::info!(
            "tessellated {} of {} features: {} vertices, {} indices",
            drawn,
            self.features.len(),
            self.tessellator.arrays().vertex_count(),
            self.tessellator.arrays().element_count()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::filter::FilterExpr;
    use crate::style::types::Symbol;
    use crate::vector::data::LineArrays;
    use glam::Vec2;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        uploads: usize,
        loads: usize,
        updates: usize,
        draws: usize,
    }

    impl LineBackend for Recorder {
        type Handles = usize;

        fn upload(&mut self, arrays: &LineArrays, _indices: &[u16]) -> RenderResult<usize> {
            self.uploads += 1;
            Ok(arrays.vertex_count())
        }

        fn load_texture(&mut self, _image: &RgbaImage) -> RenderResult<()> {
            self.loads += 1;
            Ok(())
        }

        fn update_texture(&mut self, _image: &RgbaImage) -> RenderResult<()> {
            self.updates += 1;
            Ok(())
        }

        fn draw(
            &mut self,
            _buffers: Option<&LineBuffers<usize>>,
            _uniform: &LineUniform,
        ) -> RenderResult<()> {
            self.draws += 1;
            Ok(())
        }
    }

    fn layer(options: LayerOptions) -> LineLayerRenderer<Recorder> {
        let mut layer = LineLayerRenderer::new(Recorder::default(), options).unwrap();
        layer.set_style(vec![StyleRule::new(
            FilterExpr::default(),
            Symbol::dashed(4.0, &[10.0, 5.0]),
        )]);
        layer.set_features(vec![Feature::default().with_property("type", "road")]);
        layer
    }

    #[test]
    fn test_invalidation_takes_max() {
        let mut l = layer(LayerOptions::default());
        l.draw(&FrameParams::default()).unwrap();
        assert_eq!(l.state(), Invalidation::Clean);
        l.on_style_changed();
        l.set_features(Vec::new());
        assert_eq!(l.state(), Invalidation::Style);
    }

    #[test]
    fn test_geometry_change_keeps_atlas() {
        let mut l = layer(LayerOptions::default());
        l.draw(&FrameParams::default()).unwrap();
        l.set_features(vec![Feature::new(vec![Vec2::ZERO, Vec2::X], Default::default())]);
        let stats = l.draw(&FrameParams::default()).unwrap();
        assert!(stats.rebuilt);
        assert_eq!(stats.features_drawn, 1);
        assert_eq!(l.backend().loads, 1);
        assert_eq!(l.backend().updates, 0);
    }

    #[test]
    fn test_inspector_requires_debug_flag() {
        let seen = Rc::new(RefCell::new(0));

        let mut quiet = layer(LayerOptions::default());
        let counter = seen.clone();
        quiet.set_atlas_inspector(move |_| *counter.borrow_mut() += 1);
        quiet.draw(&FrameParams::default()).unwrap();
        assert_eq!(*seen.borrow(), 0);

        let mut debug = layer(LayerOptions::default().with_debug_atlas(true));
        let counter = seen.clone();
        debug.set_atlas_inspector(move |image| {
            assert_eq!(image.dimensions(), (15, 4));
            *counter.borrow_mut() += 1;
        });
        debug.draw(&FrameParams::default()).unwrap();
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn test_on_remove_resets() {
        let mut l = layer(LayerOptions::default());
        l.set_features(vec![Feature::new(vec![Vec2::ZERO, Vec2::X], Default::default())]);
        l.draw(&FrameParams::default()).unwrap();
        assert!(l.buffers().is_some());
        l.on_remove();
        assert!(l.buffers().is_none());
        assert!(l.atlas().is_empty());
        assert_eq!(l.state(), Invalidation::Style);
        l.draw(&FrameParams::default()).unwrap();
        assert_eq!(l.backend().loads, 2);
    }
}
