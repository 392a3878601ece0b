//! Batched line geometry: tessellation, upload and the layer orchestrator.

pub mod backend;
pub mod buffers;
pub mod data;
pub mod layer;
pub mod line_pipeline;
pub mod line_types;
pub mod tessellate;

// Re-export main types for convenience
pub use backend::{LineBackend, WgpuLineBackend, WgpuLineHandles};
pub use buffers::{BufferManager, LineBuffers};
pub use data::{validate_arrays, LineArrays, MAX_VERTICES};
pub use layer::{AtlasInspector, DrawStats, FrameParams, Invalidation, LineLayerRenderer};
pub use line_types::{LineNormal, LinePosition, LineStyle, LineUniform};
pub use tessellate::LineTessellator;
