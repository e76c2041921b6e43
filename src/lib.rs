//! Projection Mapping Engine
//!
//! Composites media sources onto warpable quad/bezier surfaces, renders each
//! screen to an off-screen target, and provides an independent layer
//! compositor whose output is itself usable as a media source.
//!
//! The engine is split along two threads of concern: a logic thread that owns
//! parameter mutation (screens, surfaces, layers) and a render thread that
//! owns the GPU context. The only state shared between them is each surface's
//! mesh buffer pair, guarded by a per-surface lock, and GPU target
//! (re)allocation, which is marshalled onto the render thread through
//! [`render::RenderDispatcher`].
//!
//! Typical frame order on the render thread: process pending dispatcher jobs,
//! render compositions (so nested compositions sample last frame's texture),
//! then render screens.

pub mod composition;
pub mod error;
pub mod media;
pub mod project;
pub mod render;
pub mod screen;

// Re-export commonly used types
pub use composition::{CompositionLayer, LayerCompositor, MediaComposition};
pub use error::RenderError;
pub use media::{MediaId, MediaRegistry, MediaSource, SolidColorMedia, StillImageMedia};
pub use project::{CompositionData, ProjectData};
pub use render::{
    render_channel, RenderContext, RenderDispatcher, RenderJobQueue, RenderTarget, RendererState,
    ScreenRenderer,
};
pub use screen::{
    AspectRatio, FillMode, HandleId, HandleRef, OutputType, Screen, ScreenManager, Surface,
};
