//! Upload of tessellated arrays into GPU buffers.

use crate::error::RenderResult;
use crate::vector::backend::LineBackend;
use crate::vector::data::{validate_arrays, LineArrays};

/// Uploaded geometry: backend handles plus counts.
///
/// `generation` increases with every upload, so two handles with the same
/// generation refer to the same buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct LineBuffers<H> {
    pub handles: H,
    pub element_count: u32,
    pub vertex_count: u32,
    pub generation: u64,
}

/// Validates arrays and hands them to the backend in upload layout.
#[derive(Debug, Default)]
pub struct BufferManager {
    generation: u64,
}

impl BufferManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation of the most recent upload, 0 before the first.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Upload `arrays`. Empty arrays upload nothing and return `None`.
    ///
    /// Fails with `RenderError::IndexOverflow` before touching the backend
    /// when the vertex count exceeds the 16-bit index range.
    pub fn upload<B: LineBackend>(
        &mut self,
        backend: &mut B,
        arrays: &LineArrays,
    ) -> RenderResult<Option<LineBuffers<B::Handles>>> {
        validate_arrays(arrays)?;
        if arrays.is_empty() {
            return Ok(None);
        }
        let indices = arrays.indices_u16()?;
        let handles = backend.upload(arrays, &indices)?;
        self.generation += 1;
        log::debug!(
            "uploaded {} vertices, {} indices (generation {})",
            arrays.vertex_count(),
            indices.len(),
            self.generation
        );
        Ok(Some(LineBuffers {
            handles,
            element_count: indices.len() as u32,
            vertex_count: arrays.vertex_count() as u32,
            generation: self.generation,
        }))
    }
}
