// tests/test_gpu_render.rs
// Offscreen smoke test; skipped when no adapter is available

use bigline::cli::fit_bounds;
use bigline::gpu::GpuContext;
use bigline::style::{parse_features_str, parse_style_str};
use bigline::{LayerOptions, LineLayerRenderer, WgpuLineBackend};

fn create_context() -> Option<GpuContext> {
    match GpuContext::new_headless() {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            eprintln!("skipping GPU test: {e}");
            None
        }
    }
}

#[test]
fn renders_solid_and_dashed_lines() {
    let Some(ctx) = create_context() else {
        return;
    };
    let (width, height) = (64, 64);
    let backend = WgpuLineBackend::new(ctx, width, height, Some([1.0, 1.0, 1.0, 1.0])).unwrap();
    let mut layer = LineLayerRenderer::new(backend, LayerOptions::default()).unwrap();
    layer.set_style(
        parse_style_str(
            r##"[
                { "filter": ["==", "kind", "solid"], "symbol": { "lineWidth": 8, "lineColor": "#ff0000" } },
                { "filter": ["==", "kind", "dashed"], "symbol": { "lineWidth": 4, "lineColor": "#0000ff", "lineDasharray": [6, 6] } }
            ]"##,
        )
        .unwrap(),
    );
    let features = parse_features_str(
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"kind": "solid"},
             "geometry": {"type": "LineString", "coordinates": [[0, 0], [100, 0]]}},
            {"type": "Feature", "properties": {"kind": "dashed"},
             "geometry": {"type": "LineString", "coordinates": [[0, -40], [100, -40]]}}
        ]}"#,
    )
    .unwrap();
    let frame = fit_bounds(&features, width, height).unwrap();
    layer.set_features(features);

    let stats = layer.draw(&frame).unwrap();
    assert_eq!(stats.features_drawn, 2);
    assert_eq!(stats.element_count, 12);

    let image = layer.backend().read_pixels().unwrap();
    assert_eq!(image.dimensions(), (width, height));

    // Background stays clear in the corner
    assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255, 255]);
    // Some pixel is red and some pixel is blue
    let pixels: Vec<[u8; 4]> = image.pixels().map(|p| p.0).collect();
    assert!(pixels.iter().any(|p| p[0] > 200 && p[1] < 60 && p[2] < 60));
    assert!(pixels.iter().any(|p| p[2] > 200 && p[0] < 60 && p[1] < 60));
}

#[test]
fn empty_layer_only_clears() {
    let Some(ctx) = create_context() else {
        return;
    };
    let backend = WgpuLineBackend::new(ctx, 16, 8, Some([0.0, 0.0, 0.0, 1.0])).unwrap();
    let mut layer = LineLayerRenderer::new(backend, LayerOptions::default()).unwrap();
    let stats = layer.draw(&Default::default()).unwrap();
    assert_eq!(stats.generation, None);

    let image = layer.backend().read_pixels().unwrap();
    assert!(image.pixels().all(|p| p.0 == [0, 0, 0, 255]));
}
