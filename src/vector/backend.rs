//! Graphics backend seam for the line layer.
//!
//! [`LineBackend`] is the narrow surface the layer needs from a graphics API:
//! buffer upload, atlas texture load/update and the indexed draw. The wgpu
//! implementation renders into an offscreen target that can be read back.

use image::RgbaImage;
use wgpu::util::DeviceExt;

use crate::error::{RenderError, RenderResult};
use crate::gpu::{self, GpuContext, TARGET_FORMAT};
use crate::vector::buffers::LineBuffers;
use crate::vector::data::LineArrays;
use crate::vector::line_pipeline;
use crate::vector::line_types::LineUniform;

pub trait LineBackend {
    /// Backend-owned buffer handles for one upload.
    type Handles;

    /// Create the three vertex buffers and the 16-bit index buffer.
    fn upload(&mut self, arrays: &LineArrays, indices: &[u16]) -> RenderResult<Self::Handles>;

    /// Create the atlas texture. Called once per layer lifetime.
    fn load_texture(&mut self, image: &RgbaImage) -> RenderResult<()>;

    /// Replace the atlas texture contents after a rebuild.
    fn update_texture(&mut self, image: &RgbaImage) -> RenderResult<()>;

    /// One indexed draw over `buffers`; `None` only clears.
    fn draw(
        &mut self,
        buffers: Option<&LineBuffers<Self::Handles>>,
        uniform: &LineUniform,
    ) -> RenderResult<()>;

    /// Drop texture resources when the layer is removed.
    fn release(&mut self) {}
}

/// GPU buffers of one upload.
#[derive(Debug)]
pub struct WgpuLineHandles {
    pub position: wgpu::Buffer,
    pub normal: wgpu::Buffer,
    pub style: wgpu::Buffer,
    pub index: wgpu::Buffer,
}

struct AtlasTexture {
    texture: wgpu::Texture,
    size: (u32, u32),
}

/// wgpu implementation drawing into an offscreen RGBA8 target.
pub struct WgpuLineBackend {
    ctx: GpuContext,
    width: u32,
    height: u32,
    clear_color: Option<wgpu::Color>,
    target: wgpu::Texture,
    target_view: wgpu::TextureView,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    placeholder: wgpu::Texture,
    atlas: Option<AtlasTexture>,
}

impl WgpuLineBackend {
    pub fn new(
        ctx: GpuContext,
        width: u32,
        height: u32,
        clear_color: Option<[f32; 4]>,
    ) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::device(format!(
                "invalid target size {width}x{height}"
            )));
        }
        let device = &ctx.device;
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("bigline.wgsl"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(include_str!(
                "../shaders/bigline.wgsl"
            ))),
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("vf.Vector.BigLine.Uniform"),
            contents: bytemuck::bytes_of(&LineUniform::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = line_pipeline::create_bind_group_layout(device);
        let pipeline_layout = line_pipeline::create_pipeline_layout(device, &bind_group_layout);
        let pipeline = line_pipeline::create_render_pipeline(
            device,
            &shader,
            &pipeline_layout,
            TARGET_FORMAT,
        );
        let sampler = line_pipeline::create_atlas_sampler(device);

        // Bound until the first atlas is loaded
        let placeholder = create_atlas_texture(device, 1, 1);
        write_texture(&ctx.queue, &placeholder, &[0, 0, 0, 0], 1, 1);
        let bind_group = line_pipeline::create_bind_group(
            device,
            &bind_group_layout,
            &uniform_buffer,
            &placeholder.create_view(&wgpu::TextureViewDescriptor::default()),
            &sampler,
        );

        let (target, target_view) = gpu::create_offscreen_target(device, width, height);
        let clear_color = clear_color.map(|[r, g, b, a]| wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        });

        Ok(Self {
            ctx,
            width,
            height,
            clear_color,
            target,
            target_view,
            pipeline,
            bind_group_layout,
            bind_group,
            uniform_buffer,
            sampler,
            placeholder,
            atlas: None,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Copy the offscreen target back to the CPU.
    pub fn read_pixels(&self) -> RenderResult<RgbaImage> {
        let data = gpu::read_texture_rgba(
            &self.ctx.device,
            &self.ctx.queue,
            &self.target,
            self.width,
            self.height,
        )?;
        RgbaImage::from_raw(self.width, self.height, data)
            .ok_or_else(|| RenderError::render("readback size mismatch"))
    }

    fn rebind(&mut self) {
        let texture = self
            .atlas
            .as_ref()
            .map(|a| &a.texture)
            .unwrap_or(&self.placeholder);
        self.bind_group = line_pipeline::create_bind_group(
            &self.ctx.device,
            &self.bind_group_layout,
            &self.uniform_buffer,
            &texture.create_view(&wgpu::TextureViewDescriptor::default()),
            &self.sampler,
        );
    }
}

impl LineBackend for WgpuLineBackend {
    type Handles = WgpuLineHandles;

    fn upload(&mut self, arrays: &LineArrays, indices: &[u16]) -> RenderResult<WgpuLineHandles> {
        let device = &self.ctx.device;
        let vertex = |label: &'static str, contents: &[u8]| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::VERTEX,
            })
        };
        let position = vertex(
            "vf.Vector.BigLine.Position",
            bytemuck::cast_slice(&arrays.vertex_array),
        );
        let normal = vertex(
            "vf.Vector.BigLine.Normal",
            bytemuck::cast_slice(&arrays.normal_array),
        );
        let style = vertex(
            "vf.Vector.BigLine.Style",
            bytemuck::cast_slice(&arrays.style_array),
        );

        // Index buffer size must be 4-byte aligned
        let mut index_data: Vec<u16> = indices.to_vec();
        if index_data.len() % 2 == 1 {
            index_data.push(0);
        }
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("vf.Vector.BigLine.Index"),
            contents: bytemuck::cast_slice(&index_data),
            usage: wgpu::BufferUsages::INDEX,
        });

        Ok(WgpuLineHandles {
            position,
            normal,
            style,
            index,
        })
    }

    fn load_texture(&mut self, image: &RgbaImage) -> RenderResult<()> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(RenderError::upload("cannot load an empty atlas texture"));
        }
        let texture = create_atlas_texture(&self.ctx.device, width, height);
        write_texture(&self.ctx.queue, &texture, image.as_raw(), width, height);
        self.atlas = Some(AtlasTexture {
            texture,
            size: (width, height),
        });
        self.rebind();
        Ok(())
    }

    fn update_texture(&mut self, image: &RgbaImage) -> RenderResult<()> {
        let (width, height) = image.dimensions();
        match &self.atlas {
            Some(atlas) if atlas.size == (width, height) => {
                write_texture(&self.ctx.queue, &atlas.texture, image.as_raw(), width, height);
                Ok(())
            }
            _ => {
                log::debug!("atlas resized to {width}x{height}, recreating texture");
                self.load_texture(image)
            }
        }
    }

    fn draw(
        &mut self,
        buffers: Option<&LineBuffers<WgpuLineHandles>>,
        uniform: &LineUniform,
    ) -> RenderResult<()> {
        self.ctx
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniform));

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("vf.Vector.BigLine.Encoder"),
            });
        {
            let load = match self.clear_color {
                Some(color) => wgpu::LoadOp::Clear(color),
                None => wgpu::LoadOp::Load,
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("vf.Vector.BigLine.Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            if let Some(buffers) = buffers.filter(|b| b.element_count > 0) {
                let handles = &buffers.handles;
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &self.bind_group, &[]);
                pass.set_vertex_buffer(0, handles.position.slice(..));
                pass.set_vertex_buffer(1, handles.normal.slice(..));
                pass.set_vertex_buffer(2, handles.style.slice(..));
                pass.set_index_buffer(handles.index.slice(..), wgpu::IndexFormat::Uint16);
                pass.draw_indexed(0..buffers.element_count, 0, 0..1);
            }
        }
        self.ctx.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn release(&mut self) {
        if self.atlas.take().is_some() {
            self.rebind();
        }
    }
}

fn create_atlas_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("vf.Vector.BigLine.Atlas"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn write_texture(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    data: &[u8],
    width: u32,
    height: u32,
) {
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}
