//! Per-screen compositor
//!
//! Owns the screen's off-screen target and the shader programs shared by its
//! surfaces, and walks the surface collection in z-order once per frame.
//! Runs entirely on the render thread; the only contact with the logic
//! thread is the per-surface mesh lock, held just long enough to copy the
//! buffers out.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RenderError;
use crate::media::{self, MediaRegistry, MediaSource};
use crate::screen::Screen;

use super::{RenderContext, RenderTarget, SurfaceVertex, TARGET_FORMAT};

const SURFACE_SHADER: &str = include_str!("shaders/surface.wgsl");
const TEST_PATTERN_SHADER: &str = include_str!("shaders/test_pattern.wgsl");
const FALLBACK_SHADER: &str = include_str!("shaders/fallback.wgsl");

/// Lifecycle of a screen renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RendererState {
    #[default]
    Uninitialized,
    Active,
    Closing,
}

/// Per-surface shader parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct SurfaceUniforms {
    /// top, right, bottom, left
    border_soft: [f32; 4],
    invert_mask: u32,
    _pad: [u32; 3],
}

/// GPU-side buffers for one surface, keyed by surface id.
struct SurfaceGpu {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    vertex_capacity: u64,
    index_capacity: u64,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    mesh_version: u64,
}

struct DrawCall {
    surface_id: u32,
    texture_bind_group: wgpu::BindGroup,
    index_count: u32,
    use_test_pattern: bool,
}

/// Renders one screen's surfaces into its off-screen target.
pub struct ScreenRenderer {
    state: RendererState,
    target: Option<RenderTarget>,
    main_pipeline: Option<wgpu::RenderPipeline>,
    test_pipeline: Option<wgpu::RenderPipeline>,
    texture_layout: Option<wgpu::BindGroupLayout>,
    uniform_layout: Option<wgpu::BindGroupLayout>,
    sampler: Option<wgpu::Sampler>,
    _white_texture: Option<wgpu::Texture>,
    white_view: Option<Arc<wgpu::TextureView>>,
    surface_gpu: HashMap<u32, SurfaceGpu>,
}

impl Default for ScreenRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenRenderer {
    pub fn new() -> Self {
        Self {
            state: RendererState::Uninitialized,
            target: None,
            main_pipeline: None,
            test_pipeline: None,
            texture_layout: None,
            uniform_layout: None,
            sampler: None,
            _white_texture: None,
            white_view: None,
            surface_gpu: HashMap::new(),
        }
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    /// The screen's rendered texture, for output sinks and previews.
    pub fn target_view(&self) -> Option<Arc<wgpu::TextureView>> {
        self.target.as_ref().map(|t| t.view.clone())
    }

    /// The whole target, for sinks that need the texture itself (shared
    /// texture export, network senders, readback).
    pub fn target(&self) -> Option<&RenderTarget> {
        self.target.as_ref()
    }

    /// Allocate the target and compile the shared shader programs.
    ///
    /// A shader that fails validation is replaced by a solid-magenta
    /// fallback pipeline and the error is returned; the renderer still
    /// becomes `Active` so the screen keeps producing frames.
    pub fn initialize(&mut self, ctx: &RenderContext, screen: &Screen) -> Result<(), RenderError> {
        self.target = Some(ctx.create_target(&screen.name, screen.width, screen.height));

        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Surface Sampler"),
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
                    label: Some("Surface Texture Layout"),
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
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 2,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                    ],
                });

        let uniform_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Surface Uniform Layout"),
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
                label: Some("Surface Pipeline Layout"),
                bind_group_layouts: &[&texture_layout, &uniform_layout],
                push_constant_ranges: &[],
            });

        // Opaque-white mask fallback so the fragment shader never needs a
        // "has mask" branch.
        let white_texture =
            media::upload_rgba_texture(ctx, "White Mask Fallback", 1, 1, &[255, 255, 255, 255]);
        self.white_view = Some(Arc::new(
            white_texture.create_view(&wgpu::TextureViewDescriptor::default()),
        ));
        self._white_texture = Some(white_texture);

        let mut first_error = None;

        self.main_pipeline =
            match create_pipeline(ctx, &pipeline_layout, SURFACE_SHADER, "surface") {
                Ok(pipeline) => Some(pipeline),
                Err(e) => {
                    log::error!("{e}");
                    first_error.get_or_insert(e);
                    Some(create_pipeline(ctx, &pipeline_layout, FALLBACK_SHADER, "fallback")?)
                }
            };

        self.test_pipeline =
            match create_pipeline(ctx, &pipeline_layout, TEST_PATTERN_SHADER, "test pattern") {
                Ok(pipeline) => Some(pipeline),
                Err(e) => {
                    log::error!("{e}");
                    first_error.get_or_insert(e);
                    Some(create_pipeline(ctx, &pipeline_layout, FALLBACK_SHADER, "fallback")?)
                }
            };

        self.texture_layout = Some(texture_layout);
        self.uniform_layout = Some(uniform_layout);
        self.sampler = Some(sampler);
        self.state = RendererState::Active;
        log::info!("Screen renderer for '{}' is active", screen.name);

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Release the shader programs. The target is disposed separately via
    /// [`Self::release_target`].
    pub fn close(&mut self) {
        self.state = RendererState::Closing;
        self.main_pipeline = None;
        self.test_pipeline = None;
        self.texture_layout = None;
        self.uniform_layout = None;
        self.sampler = None;
        self.surface_gpu.clear();
    }

    pub fn release_target(&mut self) {
        self.target = None;
    }

    /// Draw every enabled surface of `screen` into the target, in collection
    /// order.
    pub fn render(&mut self, ctx: &RenderContext, screen: &Screen, registry: &MediaRegistry) {
        if self.state != RendererState::Active {
            return;
        }

        // Track screen resolution changes.
        let needs_realloc = match &self.target {
            Some(t) => t.width != screen.width || t.height != screen.height,
            None => true,
        };
        if needs_realloc {
            self.target = Some(ctx.create_target(&screen.name, screen.width, screen.height));
        }

        // Drop GPU state of surfaces that no longer exist.
        self.surface_gpu
            .retain(|id, _| screen.surfaces.iter().any(|s| s.id == *id));

        let draw_calls = self.prepare_surfaces(ctx, screen, registry);

        let (Some(target), Some(main_pipeline), Some(test_pipeline)) =
            (&self.target, &self.main_pipeline, &self.test_pipeline)
        else {
            return;
        };

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Screen Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Screen Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_viewport(0.0, 0.0, target.width as f32, target.height as f32, 0.0, 1.0);

            for call in &draw_calls {
                let Some(gpu) = self.surface_gpu.get(&call.surface_id) else {
                    continue;
                };
                pass.set_pipeline(if call.use_test_pattern {
                    test_pipeline
                } else {
                    main_pipeline
                });
                pass.set_bind_group(0, &call.texture_bind_group, &[]);
                pass.set_bind_group(1, &gpu.uniform_bind_group, &[]);
                pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
                pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..call.index_count, 0, 0..1);
            }
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Upload meshes and uniforms and resolve textures for every drawable
    /// surface. Returns the draw list in z-order.
    fn prepare_surfaces(
        &mut self,
        ctx: &RenderContext,
        screen: &Screen,
        registry: &MediaRegistry,
    ) -> Vec<DrawCall> {
        let (Some(texture_layout), Some(uniform_layout), Some(sampler), Some(white_view)) = (
            self.texture_layout.as_ref(),
            self.uniform_layout.as_ref(),
            self.sampler.as_ref(),
            self.white_view.as_ref(),
        ) else {
            return Vec::new();
        };

        let mut draw_calls = Vec::new();

        for surface in &screen.surfaces {
            if !surface.enabled {
                continue;
            }

            let media_view = surface
                .media()
                .and_then(|id| registry.resolve(id))
                .and_then(|m| m.texture());
            // Unresolved media draws nothing, unless the surface is showing
            // its test pattern.
            if media_view.is_none() && !surface.show_test_pattern() {
                continue;
            }

            let mask_view = surface
                .mask()
                .and_then(|id| registry.resolve(id))
                .and_then(|m| m.texture());

            // Copy the mesh out under its lock; the lock is never held
            // across GPU submission.
            let cached_version = self.surface_gpu.get(&surface.id).map(|g| g.mesh_version);
            let (index_count, staging) = {
                let mesh = surface.lock_mesh();
                let staging = if cached_version != Some(mesh.version) {
                    Some((mesh.vertices.clone(), mesh.indices.clone(), mesh.version))
                } else {
                    None
                };
                (mesh.indices.len() as u32, staging)
            };
            if index_count == 0 {
                continue;
            }

            let gpu = self
                .surface_gpu
                .entry(surface.id)
                .or_insert_with(|| new_surface_gpu(ctx, uniform_layout, surface.id));

            if let Some((vertices, indices, version)) = staging {
                let vertex_bytes: &[u8] = bytemuck::cast_slice(&vertices);
                let index_bytes: &[u8] = bytemuck::cast_slice(&indices);
                if (vertex_bytes.len() as u64) > gpu.vertex_capacity {
                    gpu.vertex_capacity = (vertex_bytes.len() as u64).next_power_of_two();
                    gpu.vertex_buffer = create_mesh_buffer(
                        ctx,
                        "Surface Vertex Buffer",
                        gpu.vertex_capacity,
                        wgpu::BufferUsages::VERTEX,
                    );
                }
                if (index_bytes.len() as u64) > gpu.index_capacity {
                    gpu.index_capacity = (index_bytes.len() as u64).next_power_of_two();
                    gpu.index_buffer = create_mesh_buffer(
                        ctx,
                        "Surface Index Buffer",
                        gpu.index_capacity,
                        wgpu::BufferUsages::INDEX,
                    );
                }
                ctx.queue.write_buffer(&gpu.vertex_buffer, 0, vertex_bytes);
                ctx.queue.write_buffer(&gpu.index_buffer, 0, index_bytes);
                gpu.mesh_version = version;
            }

            let soft = surface.soft_edge();
            let uniforms = SurfaceUniforms {
                border_soft: [soft.top, soft.right, soft.bottom, soft.left],
                invert_mask: surface.invert_mask() as u32,
                _pad: [0; 3],
            };
            ctx.queue
                .write_buffer(&gpu.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

            let mask_ref = mask_view.as_deref().unwrap_or(&**white_view);
            let media_ref = media_view.as_deref().unwrap_or(&**white_view);
            let texture_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Surface Texture Bind Group"),
                layout: texture_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(mask_ref),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(media_ref),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            });

            draw_calls.push(DrawCall {
                surface_id: surface.id,
                texture_bind_group,
                index_count,
                use_test_pattern: surface.show_test_pattern(),
            });
        }

        draw_calls
    }
}

fn create_mesh_buffer(
    ctx: &RenderContext,
    label: &str,
    size: u64,
    usage: wgpu::BufferUsages,
) -> wgpu::Buffer {
    ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: size.max(64),
        usage: usage | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn new_surface_gpu(
    ctx: &RenderContext,
    uniform_layout: &wgpu::BindGroupLayout,
    surface_id: u32,
) -> SurfaceGpu {
    let vertex_capacity = 4 * std::mem::size_of::<SurfaceVertex>() as u64;
    let index_capacity = 6 * std::mem::size_of::<u32>() as u64;
    let vertex_buffer = create_mesh_buffer(
        ctx,
        "Surface Vertex Buffer",
        vertex_capacity,
        wgpu::BufferUsages::VERTEX,
    );
    let index_buffer = create_mesh_buffer(
        ctx,
        "Surface Index Buffer",
        index_capacity,
        wgpu::BufferUsages::INDEX,
    );
    let uniform_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Surface Uniform Buffer"),
        size: std::mem::size_of::<SurfaceUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let uniform_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Surface Uniform Bind Group"),
        layout: uniform_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }],
    });
    log::debug!("Allocated GPU buffers for surface {surface_id}");
    SurfaceGpu {
        vertex_buffer,
        index_buffer,
        vertex_capacity,
        index_capacity,
        uniform_buffer,
        uniform_bind_group,
        mesh_version: 0,
    }
}

/// Compile a shader and build the surface pipeline from it, failing with
/// [`RenderError::ShaderCompilation`] instead of panicking on invalid WGSL.
fn create_pipeline(
    ctx: &RenderContext,
    layout: &wgpu::PipelineLayout,
    source: &str,
    label: &'static str,
) -> Result<wgpu::RenderPipeline, RenderError> {
    ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);

    let module = ctx
        .device
        .create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

    let pipeline = ctx
        .device
        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: "vs_main",
                buffers: &[SurfaceVertex::LAYOUT],
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
            label,
            message: error.to_string(),
        });
    }
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaSource, SolidColorMedia};
    use crate::screen::EdgeValues;
    use std::sync::Arc;

    #[test]
    fn test_surface_uniforms_layout() {
        assert_eq!(std::mem::size_of::<SurfaceUniforms>(), 32);
    }

    #[test]
    fn test_renderer_starts_uninitialized() {
        let renderer = ScreenRenderer::new();
        assert_eq!(renderer.state(), RendererState::Uninitialized);
        assert!(renderer.target_view().is_none());
    }

    #[test]
    fn test_renderer_lifecycle_and_frame() {
        let Ok(ctx) = RenderContext::new() else {
            eprintln!("skipping: no GPU adapter");
            return;
        };

        let mut registry = MediaRegistry::new();
        let media: Arc<SolidColorMedia> =
            Arc::new(SolidColorMedia::new(&ctx, 2, 2, [255, 0, 0, 255]));
        registry.register(&media);

        let mut screen = Screen::new("Test Screen");
        screen.surfaces[0].set_media(Some(media.id()));
        screen.surfaces[0].set_soft_edge(EdgeValues::default());
        screen.maintain(&registry);

        let mut renderer = ScreenRenderer::new();
        renderer.initialize(&ctx, &screen).unwrap();
        assert_eq!(renderer.state(), RendererState::Active);
        assert!(renderer.target_view().is_some());

        renderer.render(&ctx, &screen, &registry);
        // A second frame with an unchanged mesh takes the no-upload path.
        renderer.render(&ctx, &screen, &registry);
        let _ = ctx.device.poll(wgpu::Maintain::Wait);

        renderer.close();
        assert_eq!(renderer.state(), RendererState::Closing);
        renderer.release_target();
        assert!(renderer.target_view().is_none());
    }

    /// Read an RGBA8 target back into CPU memory. Width must keep rows
    /// 256-byte aligned.
    fn read_back(ctx: &RenderContext, target: &RenderTarget) -> Vec<u8> {
        let size = (target.width * target.height * 4) as u64;
        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(target.width * 4),
                    rows_per_image: None,
                },
            },
            wgpu::Extent3d {
                width: target.width,
                height: target.height,
                depth_or_array_layers: 1,
            },
        );
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = crossbeam_channel::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = ctx.device.poll(wgpu::Maintain::Wait);
        rx.recv().unwrap().unwrap();
        let data = slice.get_mapped_range().to_vec();
        buffer.unmap();
        data
    }

    #[test]
    fn test_solid_red_media_fills_surface() {
        let Ok(ctx) = RenderContext::new() else {
            eprintln!("skipping: no GPU adapter");
            return;
        };

        let mut registry = MediaRegistry::new();
        let media: Arc<SolidColorMedia> =
            Arc::new(SolidColorMedia::new(&ctx, 2, 2, [255, 0, 0, 255]));
        registry.register(&media);

        let mut screen = Screen::new("Red Screen");
        // 64 px keeps readback rows 256-byte aligned.
        screen.width = 64;
        screen.height = 64;
        screen.surfaces[0].set_media(Some(media.id()));
        screen.maintain(&registry);

        let mut renderer = ScreenRenderer::new();
        renderer.initialize(&ctx, &screen).unwrap();
        renderer.render(&ctx, &screen, &registry);

        let pixels = read_back(&ctx, renderer.target().unwrap());
        // Unit-square surface, no soft edge, no mask: every pixel is
        // opaque red.
        for pixel in pixels.chunks(4) {
            assert_eq!(pixel, [255, 0, 0, 255]);
        }
    }

    #[test]
    fn test_disabled_surface_stays_black() {
        let Ok(ctx) = RenderContext::new() else {
            eprintln!("skipping: no GPU adapter");
            return;
        };

        let mut registry = MediaRegistry::new();
        let media: Arc<SolidColorMedia> =
            Arc::new(SolidColorMedia::new(&ctx, 2, 2, [255, 0, 0, 255]));
        registry.register(&media);

        let mut screen = Screen::new("Dark Screen");
        screen.width = 64;
        screen.height = 64;
        screen.surfaces[0].set_media(Some(media.id()));
        screen.surfaces[0].enabled = false;
        screen.maintain(&registry);

        let mut renderer = ScreenRenderer::new();
        renderer.initialize(&ctx, &screen).unwrap();
        renderer.render(&ctx, &screen, &registry);

        let pixels = read_back(&ctx, renderer.target().unwrap());
        for pixel in pixels.chunks(4) {
            assert_eq!(pixel, [0, 0, 0, 255]);
        }
    }

    #[test]
    fn test_surface_without_media_is_skipped() {
        let Ok(ctx) = RenderContext::new() else {
            eprintln!("skipping: no GPU adapter");
            return;
        };

        let registry = MediaRegistry::new();
        let mut screen = Screen::new("Empty Screen");
        screen.maintain(&registry);

        let mut renderer = ScreenRenderer::new();
        renderer.initialize(&ctx, &screen).unwrap();
        // No media resolved and no test pattern: nothing to draw, no panic.
        renderer.render(&ctx, &screen, &registry);

        // With the test pattern on, the surface draws without any media.
        screen.surfaces[0].set_show_test_pattern(true);
        renderer.render(&ctx, &screen, &registry);
        let _ = ctx.device.poll(wgpu::Maintain::Wait);
    }
}
