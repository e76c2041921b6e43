//! Media source contract
//!
//! Anything that can hand the renderer a texture and a pixel size is a media
//! source: video players, still images, generated graphics, or a
//! [`crate::composition::MediaComposition`]. Lifetime is managed by whoever
//! owns the source. The engine only holds weak references through the
//! [`MediaRegistry`], so a dropped source simply stops resolving.

mod registry;

pub use registry::MediaRegistry;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RenderError;
use crate::render::RenderContext;

/// Identifier for a media source, stable across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(Uuid);

impl MediaId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MediaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A source of pixels for surfaces and composition layers.
pub trait MediaSource: Send + Sync {
    /// Identifier used by target references.
    fn id(&self) -> MediaId;

    /// Current GPU texture, if one is available this frame.
    fn texture(&self) -> Option<Arc<wgpu::TextureView>>;

    /// Pixel dimensions of the source.
    fn dimensions(&self) -> (u32, u32);

    /// Counter that changes whenever the texture content changes.
    ///
    /// Static sources leave this at 0; compositions bump it on every
    /// re-render so consumers know to repaint.
    fn texture_version(&self) -> u64 {
        0
    }

    /// Media ids this source itself draws from.
    ///
    /// Compositions report their layers' media here so the registry can
    /// detect reference cycles before they happen.
    fn referenced_media(&self) -> Vec<MediaId> {
        Vec::new()
    }
}

/// Upload tightly packed RGBA8 pixels into a new sampleable texture.
pub(crate) fn upload_rgba_texture(
    ctx: &RenderContext,
    label: &str,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> wgpu::Texture {
    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    ctx.queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: None,
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );

    texture
}

/// Single-color media. Used by tests and as a stand-in source.
pub struct SolidColorMedia {
    id: MediaId,
    size: (u32, u32),
    _texture: wgpu::Texture,
    view: Arc<wgpu::TextureView>,
}

impl SolidColorMedia {
    pub fn new(ctx: &RenderContext, width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let pixels: Vec<u8> = rgba
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect();
        let texture = upload_rgba_texture(ctx, "Solid Color Media", width, height, &pixels);
        let view = Arc::new(texture.create_view(&wgpu::TextureViewDescriptor::default()));
        Self {
            id: MediaId::new(),
            size: (width, height),
            _texture: texture,
            view,
        }
    }
}

impl MediaSource for SolidColorMedia {
    fn id(&self) -> MediaId {
        self.id
    }

    fn texture(&self) -> Option<Arc<wgpu::TextureView>> {
        Some(self.view.clone())
    }

    fn dimensions(&self) -> (u32, u32) {
        self.size
    }
}

/// Still image media uploaded once from a decoded image.
pub struct StillImageMedia {
    id: MediaId,
    size: (u32, u32),
    _texture: wgpu::Texture,
    view: Arc<wgpu::TextureView>,
}

impl StillImageMedia {
    /// Upload an already-decoded RGBA image.
    pub fn from_image(ctx: &RenderContext, image: &image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let texture = upload_rgba_texture(ctx, "Still Image Media", width, height, image.as_raw());
        let view = Arc::new(texture.create_view(&wgpu::TextureViewDescriptor::default()));
        Self {
            id: MediaId::new(),
            size: (width, height),
            _texture: texture,
            view,
        }
    }

    /// Decode an image file from disk and upload it.
    pub fn from_file(ctx: &RenderContext, path: &Path) -> Result<Self, RenderError> {
        let image = image::open(path)
            .map_err(|e| RenderError::ResourceNotFound(format!("{}: {e}", path.display())))?
            .to_rgba8();
        log::info!(
            "Loaded image media {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(Self::from_image(ctx, &image))
    }
}

impl MediaSource for StillImageMedia {
    fn id(&self) -> MediaId {
        self.id
    }

    fn texture(&self) -> Option<Arc<wgpu::TextureView>> {
        Some(self.view.clone())
    }

    fn dimensions(&self) -> (u32, u32) {
        self.size
    }
}
