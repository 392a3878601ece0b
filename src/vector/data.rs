//! Tessellation output and its CPU-side validation.

use crate::error::{RenderError, RenderResult};
use crate::vector::line_types::{LineNormal, LinePosition, LineStyle};

/// Largest vertex count addressable by 16-bit indices.
pub const MAX_VERTICES: usize = u16::MAX as usize + 1;

/// Four parallel arrays describing all accumulated lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineArrays {
    pub vertex_array: Vec<LinePosition>,
    pub normal_array: Vec<LineNormal>,
    pub style_array: Vec<LineStyle>,
    pub element_array: Vec<u32>,
}

impl LineArrays {
    pub fn vertex_count(&self) -> usize {
        self.vertex_array.len()
    }

    pub fn element_count(&self) -> usize {
        self.element_array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.element_array.is_empty()
    }

    pub fn clear(&mut self) {
        self.vertex_array.clear();
        self.normal_array.clear();
        self.style_array.clear();
        self.element_array.clear();
    }

    /// Indices narrowed to the 16-bit upload format.
    pub fn indices_u16(&self) -> RenderResult<Vec<u16>> {
        validate_arrays(self)?;
        Ok(self.element_array.iter().map(|&i| i as u16).collect())
    }
}

/// Check every upload invariant before any GPU call.
pub fn validate_arrays(arrays: &LineArrays) -> RenderResult<()> {
    let vertex_count = arrays.vertex_array.len();
    if arrays.normal_array.len() != vertex_count || arrays.style_array.len() != vertex_count {
        return Err(RenderError::upload(format!(
            "vertex arrays disagree: {} positions, {} normals, {} styles",
            vertex_count,
            arrays.normal_array.len(),
            arrays.style_array.len()
        )));
    }
    if vertex_count > MAX_VERTICES {
        return Err(RenderError::IndexOverflow {
            vertex_count,
            limit: MAX_VERTICES,
        });
    }
    if arrays.element_array.len() % 3 != 0 {
        return Err(RenderError::upload(format!(
            "index count {} is not divisible by 3 (not triangles)",
            arrays.element_array.len()
        )));
    }
    if let Some((pos, index)) = arrays
        .element_array
        .iter()
        .enumerate()
        .find(|(_, &i)| i as usize >= vertex_count)
    {
        return Err(RenderError::upload(format!(
            "index {} at position {} exceeds vertex count {}",
            index, pos, vertex_count
        )));
    }
    Ok(())
}
