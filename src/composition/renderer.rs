//! Layer compositor
//!
//! Immediate-mode renderer for [`MediaComposition`]s: clears the target,
//! then draws each layer's quad in stack order with its own transform and
//! alpha. One uniform write and submit per layer keeps the single uniform
//! buffer coherent, the same way the rest of the engine submits per draw.

use std::collections::HashMap;

use glam::{Mat3, Vec2};

use crate::error::RenderError;
use crate::media::{MediaId, MediaRegistry, MediaSource};
use crate::render::{self, LayerVertex, RenderContext, TARGET_FORMAT};

use super::{CompositionLayer, MediaComposition};

const LAYER_SHADER: &str = include_str!("../render/shaders/layer.wgsl");

/// Shader parameters for one layer draw.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct LayerUniforms {
    /// Columns of the 3x3 unit-quad-to-clip transform, padded to vec4.
    col0: [f32; 4],
    col1: [f32; 4],
    col2: [f32; 4],
    /// x = alpha
    properties: [f32; 4],
}

impl LayerUniforms {
    fn new(transform: Mat3, alpha: f32) -> Self {
        let col = |c: glam::Vec3| [c.x, c.y, c.z, 0.0];
        Self {
            col0: col(transform.x_axis),
            col1: col(transform.y_axis),
            col2: col(transform.z_axis),
            properties: [alpha, 0.0, 0.0, 0.0],
        }
    }
}

/// Shared pipeline and buffers for rendering compositions. One instance
/// serves every composition in the project.
pub struct LayerCompositor {
    pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    uniform_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    quad_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
}

impl LayerCompositor {
    pub fn new(ctx: &RenderContext) -> Result<Self, RenderError> {
        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("layer"),
                source: wgpu::ShaderSource::Wgsl(LAYER_SHADER.into()),
            });

        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Layer Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let texture_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Layer Texture Layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                    ],
                });

        let uniform_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Layer Uniform Layout"),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    }],
                });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Layer Pipeline Layout"),
                bind_group_layouts: &[&texture_layout, &uniform_layout],
                push_constant_ranges: &[],
            });

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Layer Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: "vs_main",
                    buffers: &[LayerVertex::LAYOUT],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: "fs_main",
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TARGET_FORMAT,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            });

        if let Some(error) = pollster::block_on(ctx.device.pop_error_scope()) {
            return Err(RenderError::ShaderCompilation {
                label: "layer",
                message: error.to_string(),
            });
        }

        let quad = render::unit_quad();
        let quad_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Layer Quad Buffer"),
            size: std::mem::size_of_val(&quad) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        ctx.queue
            .write_buffer(&quad_buffer, 0, bytemuck::cast_slice(&quad));

        let uniform_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Layer Uniform Buffer"),
            size: std::mem::size_of::<LayerUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            pipeline,
            texture_layout,
            uniform_layout,
            sampler,
            quad_buffer,
            uniform_buffer,
        })
    }

    /// Render a composition into its target if anything changed since the
    /// last frame. Render thread only.
    pub fn render(
        &self,
        ctx: &RenderContext,
        composition: &MediaComposition,
        registry: &MediaRegistry,
    ) {
        if composition.target_view().is_none() {
            composition.allocate_target(ctx);
        }

        // Snapshot the layer stack, and find out whether any source texture
        // changed underneath an unchanged stack.
        let (layers, dirty_sources) = {
            let mut state = composition.lock_state();
            let mut dirty = false;
            let mut current: HashMap<MediaId, u64> = HashMap::new();
            for id in state.layers.iter().filter_map(|l| l.media) {
                if let Some(media) = registry.resolve(id) {
                    let version = media.texture_version();
                    if state.seen_versions.get(&id) != Some(&version) {
                        dirty = true;
                    }
                    current.insert(id, version);
                }
            }
            state.seen_versions = current;
            (state.layers.clone(), dirty)
        };

        if !composition.needs_repaint() && !dirty_sources {
            return;
        }

        let Some(target_view) = composition.target_view() else {
            return;
        };
        let resolution = composition.resolution();

        // Clear pass first, submitted on its own so per-layer uniform
        // writes interleave correctly with their draws.
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Composition Clear Encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Composition Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));

        for layer in &layers {
            // Unresolved media: the layer silently contributes nothing.
            let Some(media_view) = layer
                .media
                .and_then(|id| registry.resolve(id))
                .and_then(|m| m.texture())
            else {
                continue;
            };

            let transform = layer_transform(layer, resolution);
            let uniforms = LayerUniforms::new(transform, layer.alpha.clamp(0.0, 1.0));
            ctx.queue
                .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

            let texture_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Layer Texture Bind Group"),
                layout: &self.texture_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&media_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            });
            let uniform_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Layer Uniform Bind Group"),
                layout: &self.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                }],
            });

            let mut encoder = ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Layer Encoder"),
                });
            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Layer Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &target_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &texture_bind_group, &[]);
                pass.set_bind_group(1, &uniform_bind_group, &[]);
                pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
                pass.draw(0..6, 0..1);
            }
            ctx.queue.submit(std::iter::once(encoder.finish()));
        }

        composition.clear_repaint();
        composition.bump_texture_version();
    }
}

/// Transform taking the unit quad to this layer's rotated rectangle in clip
/// space.
///
/// Pixel-space model: scale to the layer size, translate to the layer
/// position, then rotate about the layer's own center; a y-down ortho maps
/// composition pixels to clip space.
fn layer_transform(layer: &CompositionLayer, resolution: (u32, u32)) -> Mat3 {
    let center = layer.position + layer.size * 0.5;
    let model = Mat3::from_translation(center)
        * Mat3::from_angle(layer.rotation.to_radians())
        * Mat3::from_translation(-center)
        * Mat3::from_translation(layer.position)
        * Mat3::from_scale(layer.size);

    let (width, height) = (resolution.0.max(1) as f32, resolution.1.max(1) as f32);
    let ortho = Mat3::from_translation(Vec2::new(-1.0, 1.0))
        * Mat3::from_scale(Vec2::new(2.0 / width, -2.0 / height));

    ortho * model
}
