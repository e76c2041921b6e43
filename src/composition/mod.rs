//! Layer compositions
//!
//! A [`MediaComposition`] blends an ordered stack of rectangular
//! [`CompositionLayer`]s into its own off-screen target and is itself a
//! [`MediaSource`], so a composition can feed a surface or a layer of
//! another composition. Cycle detection at assignment time keeps that graph
//! acyclic.

mod renderer;

pub use renderer::LayerCompositor;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::media::{MediaId, MediaRegistry, MediaSource};
use crate::render::{RenderContext, RenderDispatcher, RenderTarget};

/// Default output resolution of a new composition.
pub const DEFAULT_RESOLUTION: (u32, u32) = (1920, 1080);

/// A rectangular, alpha-blended, rotatable sprite within a composition.
///
/// Position and size are in composition pixels, rotation in degrees about
/// the layer's own center. No persistent mesh: the quad is rebuilt from
/// these values every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionLayer {
    pub name: String,
    pub media: Option<MediaId>,
    pub position: Vec2,
    pub size: Vec2,
    /// Rotation in degrees.
    pub rotation: f32,
    /// Opacity, 0–1.
    pub alpha: f32,
}

impl Default for CompositionLayer {
    fn default() -> Self {
        Self {
            name: "Layer".to_string(),
            media: None,
            position: Vec2::ZERO,
            size: Vec2::new(DEFAULT_RESOLUTION.0 as f32, DEFAULT_RESOLUTION.1 as f32),
            rotation: 0.0,
            alpha: 1.0,
        }
    }
}

pub(crate) struct CompositionState {
    pub resolution: (u32, u32),
    pub layers: Vec<CompositionLayer>,
    /// Texture versions of layer media as of the last render, to notice
    /// sources that changed underneath us.
    pub seen_versions: HashMap<MediaId, u64>,
}

/// A media-producing container of ordered composition layers.
///
/// Parameter mutation happens on the logic thread through `&self` methods
/// (the state sits behind a lock); the render thread reads a snapshot per
/// frame and owns the target. Constructed into an [`Arc`] so it can be
/// registered as a media source.
pub struct MediaComposition {
    id: MediaId,
    pub name: String,
    state: Mutex<CompositionState>,
    target: Mutex<Option<RenderTarget>>,
    needs_repaint: AtomicBool,
    texture_version: AtomicU64,
}

impl MediaComposition {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::with_id(MediaId::new(), name)
    }

    pub fn with_id(id: MediaId, name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id,
            name: name.into(),
            state: Mutex::new(CompositionState {
                resolution: DEFAULT_RESOLUTION,
                layers: Vec::new(),
                seen_versions: HashMap::new(),
            }),
            target: Mutex::new(None),
            needs_repaint: AtomicBool::new(true),
            texture_version: AtomicU64::new(0),
        })
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, CompositionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_target(&self) -> MutexGuard<'_, Option<RenderTarget>> {
        self.target.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.lock_state().resolution
    }

    /// Change the output resolution. The off-screen target is reallocated
    /// on the render thread before this returns.
    pub fn set_resolution(
        self: &Arc<Self>,
        resolution: (u32, u32),
        dispatcher: &RenderDispatcher,
    ) -> Result<(), RenderError> {
        self.lock_state().resolution = (resolution.0.max(1), resolution.1.max(1));
        self.mark_repaint();
        let comp = Arc::clone(self);
        dispatcher.run_sync(move |ctx| comp.allocate_target(ctx))
    }

    /// (Re)allocate the off-screen target at the current resolution.
    /// Render thread only.
    pub fn allocate_target(&self, ctx: &RenderContext) {
        let (width, height) = self.resolution();
        let target = ctx.create_target(&format!("Composition '{}'", self.name), width, height);
        *self.lock_target() = Some(target);
        self.mark_repaint();
    }

    pub(crate) fn target_view(&self) -> Option<Arc<wgpu::TextureView>> {
        self.lock_target().as_ref().map(|t| t.view.clone())
    }

    /// Drop the off-screen target, e.g. on GPU context teardown.
    pub fn release_target(&self) {
        *self.lock_target() = None;
    }

    pub fn layer_count(&self) -> usize {
        self.lock_state().layers.len()
    }

    /// Snapshot of the layer stack.
    pub fn layers(&self) -> Vec<CompositionLayer> {
        self.lock_state().layers.clone()
    }

    /// Append a layer and return its index.
    pub fn add_layer(&self, layer: CompositionLayer) -> usize {
        let mut state = self.lock_state();
        state.layers.push(layer);
        self.needs_repaint.store(true, Ordering::Release);
        state.layers.len() - 1
    }

    pub fn remove_layer(&self, index: usize) -> Option<CompositionLayer> {
        let mut state = self.lock_state();
        if index < state.layers.len() {
            self.needs_repaint.store(true, Ordering::Release);
            Some(state.layers.remove(index))
        } else {
            None
        }
    }

    /// Edit one layer in place; any change marks the composition for
    /// repaint.
    pub fn edit_layer(&self, index: usize, edit: impl FnOnce(&mut CompositionLayer)) -> bool {
        let mut state = self.lock_state();
        match state.layers.get_mut(index) {
            Some(layer) => {
                edit(layer);
                self.needs_repaint.store(true, Ordering::Release);
                true
            }
            None => false,
        }
    }

    /// Assign a layer's source media, rejecting assignments that would make
    /// this composition reference itself through nested compositions.
    pub fn set_layer_media(
        &self,
        index: usize,
        media: Option<MediaId>,
        registry: &MediaRegistry,
    ) -> Result<(), RenderError> {
        if let Some(candidate) = media {
            registry.check_cycle(self.id, candidate)?;
        }
        let mut state = self.lock_state();
        match state.layers.get_mut(index) {
            Some(layer) => {
                layer.media = media;
                self.needs_repaint.store(true, Ordering::Release);
                Ok(())
            }
            None => Err(RenderError::ResourceNotFound(format!(
                "layer {index} of composition '{}'",
                self.name
            ))),
        }
    }

    pub fn mark_repaint(&self) {
        self.needs_repaint.store(true, Ordering::Release);
    }

    pub fn needs_repaint(&self) -> bool {
        self.needs_repaint.load(Ordering::Acquire)
    }

    pub(crate) fn clear_repaint(&self) {
        self.needs_repaint.store(false, Ordering::Release);
    }

    pub(crate) fn bump_texture_version(&self) {
        self.texture_version.fetch_add(1, Ordering::AcqRel);
    }
}

impl MediaSource for MediaComposition {
    fn id(&self) -> MediaId {
        self.id
    }

    fn texture(&self) -> Option<Arc<wgpu::TextureView>> {
        self.target_view()
    }

    fn dimensions(&self) -> (u32, u32) {
        self.resolution()
    }

    fn texture_version(&self) -> u64 {
        self.texture_version.load(Ordering::Acquire)
    }

    fn referenced_media(&self) -> Vec<MediaId> {
        self.lock_state()
            .layers
            .iter()
            .filter_map(|l| l.media)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_resolution() {
        let comp = MediaComposition::new("Comp");
        assert_eq!(comp.resolution(), (1920, 1080));
        assert!(comp.needs_repaint());
    }

    #[test]
    fn test_layer_edits_mark_repaint() {
        let comp = MediaComposition::new("Comp");
        comp.clear_repaint();

        let index = comp.add_layer(CompositionLayer::default());
        assert!(comp.needs_repaint());

        comp.clear_repaint();
        assert!(comp.edit_layer(index, |l| l.rotation = 45.0));
        assert!(comp.needs_repaint());
        assert_eq!(comp.layers()[index].rotation, 45.0);

        assert!(!comp.edit_layer(99, |_| {}));
    }

    #[test]
    fn test_self_reference_is_rejected() {
        let mut registry = MediaRegistry::new();
        let comp = MediaComposition::new("Comp");
        registry.register(&comp);
        comp.add_layer(CompositionLayer::default());

        let result = comp.set_layer_media(0, Some(comp.id()), &registry);
        assert!(matches!(result, Err(RenderError::CompositionCycle(_))));
    }

    #[test]
    fn test_nested_cycle_is_rejected() {
        let mut registry = MediaRegistry::new();
        let outer = MediaComposition::new("Outer");
        let inner = MediaComposition::new("Inner");
        registry.register(&outer);
        registry.register(&inner);

        outer.add_layer(CompositionLayer::default());
        inner.add_layer(CompositionLayer::default());

        // outer -> inner is fine; inner -> outer closes the loop.
        outer
            .set_layer_media(0, Some(inner.id()), &registry)
            .unwrap();
        let result = inner.set_layer_media(0, Some(outer.id()), &registry);
        assert!(matches!(result, Err(RenderError::CompositionCycle(_))));
    }

    #[test]
    fn test_referenced_media_lists_layers() {
        let registry = MediaRegistry::new();
        let comp = MediaComposition::new("Comp");
        comp.add_layer(CompositionLayer::default());
        let id = MediaId::new();
        comp.set_layer_media(0, Some(id), &registry).unwrap();
        assert_eq!(comp.referenced_media(), vec![id]);
    }
}
