// src/vector/line_types.rs
// GPU records for batched line rendering
// RELEVANT FILES: shaders/bigline.wgsl, vector/line_pipeline.rs

use bytemuck::{Pod, Zeroable};

/// Vertex buffer 0: centerline position in map units.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct LinePosition {
    /// `a_pos`
    pub pos: [f32; 2],
}

/// Vertex buffer 1: ribbon geometry.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct LineNormal {
    /// `a_corner`: +1 on the left edge, -1 on the right.
    pub corner: f32,
    /// `a_linenormal`: unit normal at this vertex.
    pub linenormal: [f32; 2],
    /// `a_normal`: signed extrusion in pixels.
    pub normal: [f32; 2],
    /// `a_linesofar`: distance from the line start in map units.
    pub linesofar: f32,
}

/// Vertex buffer 2: per-vertex style.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct LineStyle {
    /// `a_texcoord`: atlas rect (x, y, w, h), all zero for solid lines.
    pub texcoord: [f32; 4],
    /// `a_opacity`
    pub opacity: f32,
    /// `a_linewidth` in pixels.
    pub linewidth: f32,
    /// `a_color`: straight-alpha RGBA.
    pub color: [f32; 4],
}

/// GPU uniform block for line rendering parameters.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LineUniform {
    /// `u_matrix`: map units to clip space.
    pub matrix: [[f32; 4]; 4],
    /// `u_spritesize`: atlas size in pixels.
    pub spritesize: [f32; 2],
    /// `u_scale`: map units per pixel.
    pub scale: f32,
    /// `u_blur`: antialiasing radius in pixels.
    pub blur: f32,
}

impl Default for LineUniform {
    fn default() -> Self {
        Self {
            matrix: glam::Mat4::IDENTITY.to_cols_array_2d(),
            spritesize: [0.0, 0.0],
            scale: 1.0,
            blur: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn test_record_sizes() {
        assert_eq!(mem::size_of::<LinePosition>(), 8);
        assert_eq!(mem::size_of::<LineNormal>(), 24);
        assert_eq!(mem::size_of::<LineStyle>(), 40);
        assert_eq!(mem::size_of::<LineUniform>(), 80);
    }
}
