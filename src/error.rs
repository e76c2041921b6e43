//! Engine error types

use thiserror::Error;

use crate::media::MediaId;

/// Errors surfaced by the rendering and resolution layers.
///
/// Unresolved media references are deliberately *not* errors: a missing
/// source renders as transparent/empty and the frame goes on.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No usable GPU adapter on this machine.
    #[error("no suitable GPU adapter available")]
    GpuUnavailable,

    /// Device creation failed after an adapter was found.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(String),

    /// A shader failed validation. The renderer installs a solid-color
    /// fallback pipeline so the screen keeps rendering in a visibly broken
    /// state instead of crashing.
    #[error("shader '{label}' failed to compile: {message}")]
    ShaderCompilation { label: &'static str, message: String },

    /// An external resource (image file, project asset) could not be found.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// Assigning this media would make a composition reference itself,
    /// directly or through a chain of nested compositions.
    #[error("composition cycle: assigning media {0} would make the composition reference itself")]
    CompositionCycle(MediaId),

    /// The render thread dropped its job queue.
    #[error("render thread is gone")]
    RenderThreadGone,
}
