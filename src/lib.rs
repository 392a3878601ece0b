//! Batched GPU rendering of large styled line collections.
//!
//! Features are matched against ordered style rules, dash patterns are packed
//! into one shared sprite atlas, and every line is tessellated into a single
//! set of vertex/index buffers drawn with one indexed call.
//!
//! ```no_run
//! use bigline::{FrameParams, LayerOptions, LineLayerRenderer, WgpuLineBackend};
//! use bigline::gpu::GpuContext;
//!
//! # fn main() -> bigline::RenderResult<()> {
//! let ctx = GpuContext::new_headless()?;
//! let backend = WgpuLineBackend::new(ctx, 256, 256, Some([1.0, 1.0, 1.0, 1.0]))?;
//! let mut layer = LineLayerRenderer::new(backend, LayerOptions::default())?;
//! layer.set_style(bigline::style::parse_style_str(r#"[{"symbol": {"lineWidth": 4}}]"#)?);
//! layer.draw(&FrameParams::default())?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod gpu;
pub mod style;
pub mod vector;

pub use config::{ConfigError, LayerOptions};
pub use error::{RenderError, RenderResult};
pub use style::{
    AtlasBuilder, Color, Feature, FilterExpr, LineAtlas, ResolvedSymbol, StyleRule, Symbol, UvRect,
};
pub use vector::{
    DrawStats, FrameParams, Invalidation, LineArrays, LineBackend, LineLayerRenderer,
    LineTessellator, WgpuLineBackend,
};
