//! GPU rendering: context, per-screen compositor, shared shader programs
//!
//! Everything here runs on the render thread. The logic thread reaches the
//! GPU only through [`RenderDispatcher::run_sync`].

mod context;
mod screen_renderer;

pub use context::{render_channel, RenderContext, RenderDispatcher, RenderJobQueue, RenderTarget};
pub use screen_renderer::{RendererState, ScreenRenderer};

/// Texture format of every off-screen target in the engine.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Vertex format for surface meshes.
///
/// `position` is clip space; `surface_pos` is the surface-local coordinate
/// the soft-edge ramp runs on; `tex_coord`/`mask_coord` are homogeneous
/// 3-component coordinates divided per fragment for perspective-correct
/// sampling.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SurfaceVertex {
    pub position: [f32; 2],
    pub surface_pos: [f32; 2],
    pub tex_coord: [f32; 3],
    pub mask_coord: [f32; 3],
}

impl SurfaceVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<SurfaceVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 28,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    };
}

/// Vertex format for composition layer quads.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LayerVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl LayerVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<LayerVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    pub fn new(position: [f32; 2], uv: [f32; 2]) -> Self {
        Self { position, uv }
    }
}

/// Unit quad (two triangles over `[0,1]²`).
///
/// Positions are fed through the layer transform into a y-down pixel space,
/// so the identity uv mapping shows the texture upright.
pub fn unit_quad() -> [LayerVertex; 6] {
    [
        LayerVertex::new([0.0, 0.0], [0.0, 0.0]),
        LayerVertex::new([1.0, 0.0], [1.0, 0.0]),
        LayerVertex::new([1.0, 1.0], [1.0, 1.0]),
        LayerVertex::new([0.0, 0.0], [0.0, 0.0]),
        LayerVertex::new([1.0, 1.0], [1.0, 1.0]),
        LayerVertex::new([0.0, 1.0], [0.0, 1.0]),
    ]
}
