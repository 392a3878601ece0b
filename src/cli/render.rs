// src/cli/render.rs
// Headless render of a style sheet plus feature collection to PNG

use std::env;

use anyhow::Context;
use glam::{Mat4, Vec2};

use crate::cli::args::{RenderArgs, USAGE};
use crate::config::LayerOptions;
use crate::gpu::GpuContext;
use crate::style::parser::{parse_features, parse_style};
use crate::style::resources::FileResourceLoader;
use crate::style::types::Feature;
use crate::vector::{FrameParams, LineLayerRenderer, WgpuLineBackend};

/// Fraction of the viewport left empty around the data bounds.
const FIT_MARGIN: f32 = 0.05;

/// Orthographic frame that fits `features` into a `width x height` viewport.
///
/// Returns `None` when there are no finite points.
pub fn fit_bounds(features: &[Feature], width: u32, height: u32) -> Option<FrameParams> {
    let mut min = Vec2::splat(f32::INFINITY);
    let mut max = Vec2::splat(f32::NEG_INFINITY);
    for p in features.iter().flat_map(|f| f.points.iter()).filter(|p| p.is_finite()) {
        min = min.min(*p);
        max = max.max(*p);
    }
    if !min.is_finite() || !max.is_finite() {
        return None;
    }

    let (w, h) = (width as f32, height as f32);
    let extent = (max - min).max(Vec2::splat(1e-6));
    // Map units per pixel, uniform on both axes
    let scale = (extent.x / w).max(extent.y / h) * (1.0 + 2.0 * FIT_MARGIN);
    let center = (min + max) * 0.5;
    let half = Vec2::new(w, h) * 0.5 * scale;
    let matrix = Mat4::orthographic_rh(
        center.x - half.x,
        center.x + half.x,
        center.y - half.y,
        center.y + half.y,
        -1.0,
        1.0,
    );
    Some(FrameParams { matrix, scale })
}

pub fn run_render_cli() -> anyhow::Result<()> {
    let all_args: Vec<String> = env::args().skip(1).collect();
    let args = RenderArgs::parse(&all_args).with_context(|| USAGE.to_string())?;

    let options = match &args.options {
        Some(path) => LayerOptions::from_path(path)
            .with_context(|| format!("loading options {}", path.display()))?,
        None => LayerOptions::default(),
    };
    let rules = parse_style(&args.style)
        .with_context(|| format!("loading style {}", args.style.display()))?;
    let features = parse_features(&args.features)
        .with_context(|| format!("loading features {}", args.features.display()))?;
    log::info!("{} rules, {} features", rules.len(), features.len());

    let frame = fit_bounds(&features, args.width, args.height).unwrap_or_default();
    let base_dir = args
        .style
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_default();

    let ctx = GpuContext::new_headless()?;
    let clear = options.clear_color.or(Some([1.0, 1.0, 1.0, 1.0]));
    let backend = WgpuLineBackend::new(ctx, args.width, args.height, clear)?;
    let mut layer = LineLayerRenderer::new(backend, options)?
        .with_loader(Box::new(FileResourceLoader::new(base_dir)));
    layer.set_style(rules);
    layer.set_features(features);

    let stats = layer.draw(&frame)?;
    log::info!(
        "drew {} features ({} skipped): {} vertices, {} indices",
        stats.features_drawn,
        stats.features_skipped,
        stats.vertex_count,
        stats.element_count
    );

    let image = layer.backend().read_pixels()?;
    image
        .save(&args.out)
        .with_context(|| format!("writing {}", args.out.display()))?;
    log::info!("wrote {}", args.out.display());
    Ok(())
}
