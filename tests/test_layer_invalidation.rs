// tests/test_layer_invalidation.rs
// Rebuild scheduling of the line layer against a recording backend

use std::collections::HashMap;

use bigline::style::{parse_features_str, parse_style_str, ResourceLoader};
use bigline::vector::{LineArrays, LineBackend, LineBuffers, LineUniform};
use bigline::{Feature, FrameParams, LayerOptions, LineLayerRenderer, RenderError, RenderResult};
use glam::Vec2;
use image::{Rgba, RgbaImage};

#[derive(Default)]
struct RecordingBackend {
    uploads: Vec<(usize, usize)>,
    texture_loads: usize,
    texture_updates: usize,
    draws: Vec<Option<u64>>,
    last_uniform: Option<LineUniform>,
}

impl LineBackend for RecordingBackend {
    type Handles = (usize, usize);

    fn upload(&mut self, arrays: &LineArrays, indices: &[u16]) -> RenderResult<Self::Handles> {
        let handles = (arrays.vertex_count(), indices.len());
        self.uploads.push(handles);
        Ok(handles)
    }

    fn load_texture(&mut self, _image: &RgbaImage) -> RenderResult<()> {
        self.texture_loads += 1;
        Ok(())
    }

    fn update_texture(&mut self, _image: &RgbaImage) -> RenderResult<()> {
        self.texture_updates += 1;
        Ok(())
    }

    fn draw(
        &mut self,
        buffers: Option<&LineBuffers<Self::Handles>>,
        uniform: &LineUniform,
    ) -> RenderResult<()> {
        self.draws.push(buffers.map(|b| b.generation));
        self.last_uniform = Some(*uniform);
        Ok(())
    }
}

const STYLE: &str = r#"[
    { "filter": ["==", "type", "road"], "symbol": { "lineWidth": 8, "lineDasharray": [10, 5] } },
    { "filter": ["==", "type", "rail"], "symbol": { "lineWidth": 2 } }
]"#;

const FEATURES: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        { "type": "Feature", "properties": { "type": "road" },
          "geometry": { "type": "LineString", "coordinates": [[0, 0], [10, 0], [10, 10]] } },
        { "type": "Feature", "properties": { "type": "rail" },
          "geometry": { "type": "LineString", "coordinates": [[0, 5], [20, 5]] } },
        { "type": "Feature", "properties": { "type": "river" },
          "geometry": { "type": "LineString", "coordinates": [[0, 9], [20, 9]] } }
    ]
}"#;

fn layer() -> LineLayerRenderer<RecordingBackend> {
    let mut layer =
        LineLayerRenderer::new(RecordingBackend::default(), LayerOptions::default()).unwrap();
    layer.set_style(parse_style_str(STYLE).unwrap());
    layer.set_features(parse_features_str(FEATURES).unwrap());
    layer
}

#[test]
fn style_change_rebuilds_once_then_reuses_buffers() {
    let mut layer = layer();
    let frame = FrameParams::default();

    let first = layer.draw(&frame).unwrap();
    assert!(first.rebuilt);

    layer.on_style_changed();
    let second = layer.draw(&frame).unwrap();
    assert!(second.rebuilt);
    assert_ne!(second.generation, first.generation);

    let third = layer.draw(&frame).unwrap();
    assert!(!third.rebuilt);
    assert_eq!(third.generation, second.generation);

    let backend = layer.backend();
    assert_eq!(backend.uploads.len(), 2);
    assert_eq!(backend.draws, vec![first.generation, second.generation, second.generation]);
}

#[test]
fn texture_is_loaded_once_then_updated() {
    let mut layer = layer();
    let frame = FrameParams::default();
    layer.draw(&frame).unwrap();
    layer.on_style_changed();
    layer.draw(&frame).unwrap();
    layer.on_style_changed();
    layer.draw(&frame).unwrap();

    assert_eq!(layer.backend().texture_loads, 1);
    assert_eq!(layer.backend().texture_updates, 2);
}

#[test]
fn unmatched_features_are_skipped_not_errors() {
    let mut layer = layer();
    let stats = layer.draw(&FrameParams::default()).unwrap();
    assert_eq!(stats.features_drawn, 2);
    assert_eq!(stats.features_skipped, 1);
    // road: 3 points, rail: 2 points
    assert_eq!(stats.vertex_count, 10);
    assert_eq!(stats.element_count, 18);
}

#[test]
fn uniforms_follow_frame_and_options() {
    let mut layer = LineLayerRenderer::new(
        RecordingBackend::default(),
        LayerOptions::default().with_blur(0.5),
    )
    .unwrap();
    layer.set_style(parse_style_str(STYLE).unwrap());
    layer.set_features(parse_features_str(FEATURES).unwrap());

    let frame = FrameParams {
        matrix: glam::Mat4::from_scale(glam::Vec3::splat(2.0)),
        scale: 0.25,
    };
    layer.draw(&frame).unwrap();
    let uniform = layer.backend().last_uniform.unwrap();
    assert_eq!(uniform.scale, 0.25);
    assert_eq!(uniform.blur, 0.5);
    assert_eq!(uniform.matrix[0][0], 2.0);
    assert_eq!(uniform.spritesize, [15.0, 8.0]);
}

#[test]
fn atlas_overflow_surfaces_to_host() {
    let options = LayerOptions {
        max_atlas_size: 8,
        ..LayerOptions::default()
    };
    let mut layer = LineLayerRenderer::new(RecordingBackend::default(), options).unwrap();
    layer.set_style(parse_style_str(STYLE).unwrap());
    layer.set_features(parse_features_str(FEATURES).unwrap());
    let frame = FrameParams::default();

    let err = layer.draw(&frame).unwrap_err();
    assert!(matches!(err, RenderError::AtlasFull { .. }));
    // Retried on the next draw, with the same outcome
    let err = layer.draw(&frame).unwrap_err();
    assert!(matches!(err, RenderError::AtlasFull { .. }));
    assert!(layer.backend().draws.is_empty());
    assert!(layer.backend().uploads.is_empty());

    layer.set_style(
        parse_style_str(r#"[{ "symbol": { "lineWidth": 2, "lineDasharray": [3, 2] } }]"#).unwrap(),
    );
    let stats = layer.draw(&frame).unwrap();
    assert!(stats.rebuilt);
    assert!(stats.generation.is_some());
    assert_eq!(stats.features_drawn, 3);
    assert_eq!(layer.backend().draws, vec![stats.generation]);
}

fn long_line(points: usize) -> Feature {
    let points = (0..points).map(|i| Vec2::new(i as f32, 0.0)).collect();
    Feature::new(points, Default::default()).with_property("type", "rail")
}

#[test]
fn index_overflow_surfaces_then_recovers_with_smaller_features() {
    let mut layer = layer();
    let frame = FrameParams::default();
    // Two vertices per point: 40_000 points exceed the 16-bit index range
    layer.set_features(vec![long_line(40_000)]);

    let err = layer.draw(&frame).unwrap_err();
    assert!(matches!(err, RenderError::IndexOverflow { vertex_count: 80_000, .. }));
    let err = layer.draw(&frame).unwrap_err();
    assert!(matches!(err, RenderError::IndexOverflow { .. }));
    assert!(layer.backend().draws.is_empty());
    assert!(layer.backend().uploads.is_empty());

    layer.set_features(vec![long_line(1_000)]);
    let stats = layer.draw(&frame).unwrap();
    assert!(stats.rebuilt);
    assert!(stats.generation.is_some());
    assert_eq!(stats.vertex_count, 2_000);
    assert_eq!(layer.backend().uploads.len(), 1);
}

struct MemoryLoader(HashMap<String, RgbaImage>);

impl ResourceLoader for MemoryLoader {
    fn load(&self, url: &str) -> RenderResult<RgbaImage> {
        self.0
            .get(url)
            .cloned()
            .ok_or_else(|| RenderError::resource(format!("{url} not found")))
    }
}

#[test]
fn pattern_files_are_prefetched_and_missing_ones_fall_back() {
    let style = r#"[
        { "filter": ["==", "type", "road"], "symbol": { "lineWidth": 4, "linePatternFile": "arrow.png" } },
        { "filter": ["==", "type", "rail"], "symbol": { "lineWidth": 4, "linePatternFile": "gone.png" } }
    ]"#;
    let mut images = HashMap::new();
    images.insert("arrow.png".to_string(), RgbaImage::from_pixel(5, 3, Rgba([9, 9, 9, 255])));

    let mut layer = LineLayerRenderer::new(RecordingBackend::default(), LayerOptions::default())
        .unwrap()
        .with_loader(Box::new(MemoryLoader(images)));
    layer.set_style(parse_style_str(style).unwrap());
    layer.set_features(parse_features_str(FEATURES).unwrap());

    let stats = layer.draw(&FrameParams::default()).unwrap();
    assert_eq!(stats.features_drawn, 2);
    assert!(layer.atlas().has_sprite(0));
    assert!(!layer.atlas().has_sprite(1));
    assert_eq!(layer.atlas().size(), (5, 3));
}
