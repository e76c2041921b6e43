//! Screens: named output targets composed of warpable surfaces
//!
//! A screen owns an ordered set of surfaces (collection order is z-order)
//! and describes where its rendered target goes: a physical display, a
//! shared texture, or a network video sender. The actual protocol encoding
//! is an external concern; the engine only exposes the rendered texture.

pub mod geometry;
mod surface;

pub use geometry::{BezierHandles, EdgeValues, QuadCorners, Rect};
pub use surface::{AspectRatio, FillMode, HandleId, Surface, SurfaceMesh};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::media::MediaRegistry;

/// Where a screen's rendered target is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputType {
    #[default]
    Display,
    SharedTexture,
    NetworkVideo,
}

/// A control handle on a specific surface of a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleRef {
    /// Index into the screen's surface collection.
    pub surface: usize,
    pub handle: HandleId,
}

fn default_output_id() -> u32 {
    1
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

fn default_snap_distance() -> f32 {
    0.05
}

/// A named output target holding an ordered set of surfaces.
#[derive(Serialize, Deserialize)]
pub struct Screen {
    pub name: String,
    pub enabled: bool,
    pub output_type: OutputType,
    /// Output identifier in the OS / protocol namespace (display number,
    /// sender slot, ...).
    #[serde(default = "default_output_id")]
    pub output_id: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_snap_distance")]
    snap_distance: f32,
    pub surfaces: Vec<Surface>,
    next_surface_id: u32,
}

impl Screen {
    /// Create a screen with one default full-frame surface.
    ///
    /// Deserialization goes through serde instead and restores exactly the
    /// persisted surfaces.
    pub fn new(name: impl Into<String>) -> Self {
        let mut screen = Self {
            name: name.into(),
            enabled: true,
            output_type: OutputType::default(),
            output_id: default_output_id(),
            width: default_width(),
            height: default_height(),
            snap_distance: default_snap_distance(),
            surfaces: Vec::new(),
            next_surface_id: 1,
        };
        screen.add_surface();
        screen
    }

    /// Append a new default surface and return its index.
    pub fn add_surface(&mut self) -> usize {
        let id = self.next_surface_id;
        self.next_surface_id += 1;
        self.surfaces.push(Surface::new(id, format!("Surface {id}")));
        self.surfaces.len() - 1
    }

    pub fn remove_surface(&mut self, index: usize) -> Option<Surface> {
        if index < self.surfaces.len() {
            Some(self.surfaces.remove(index))
        } else {
            None
        }
    }

    pub fn snap_distance(&self) -> f32 {
        self.snap_distance
    }

    pub fn set_snap_distance(&mut self, distance: f32) {
        self.snap_distance = distance.clamp(0.0, 0.2);
    }

    /// Recompute meshes of surfaces whose parameters changed.
    pub fn maintain(&mut self, registry: &MediaRegistry) {
        for surface in &mut self.surfaces {
            surface.maintain(registry);
        }
    }

    pub fn handle_position(&self, handle: HandleRef) -> Option<Vec2> {
        self.surfaces
            .get(handle.surface)
            .map(|s| s.handle_position(handle.handle))
    }

    /// Nearest control handle within `max_distance` of `pos`, excluding any
    /// handle in `exclude`.
    ///
    /// Corners are always candidates; bezier handles only on surfaces with
    /// bezier enabled. Comparison is strict, so the first handle found at a
    /// given distance wins. Iteration is surface order, then corners, then
    /// bezier handles.
    pub fn closest_handle(
        &self,
        pos: Vec2,
        max_distance: f32,
        exclude: &[HandleRef],
    ) -> Option<HandleRef> {
        let mut result = None;
        let mut closest = max_distance;

        for (surface_index, surface) in self.surfaces.iter().enumerate() {
            let mut candidates: Vec<HandleId> = HandleId::CORNERS.to_vec();
            if surface.bezier_enabled() {
                candidates.extend(HandleId::BEZIER);
            }
            for handle in candidates {
                let handle_ref = HandleRef {
                    surface: surface_index,
                    handle,
                };
                if exclude.contains(&handle_ref) {
                    continue;
                }
                let dist = surface.handle_position(handle).distance(pos);
                if max_distance > 0.0 && dist > max_distance {
                    continue;
                }
                if dist < closest {
                    result = Some(handle_ref);
                    closest = dist;
                }
            }
        }
        result
    }

    /// The handle a dragged handle should snap to, if any is within the
    /// screen's snap distance.
    pub fn snap_handle(&self, pos: Vec2, dragged: HandleRef) -> Option<HandleRef> {
        self.closest_handle(pos, self.snap_distance, &[dragged])
    }

    /// All *other* corner handles at exactly the same position as `handle`,
    /// across every surface. Bezier handles never participate.
    pub fn overlap_handles(&self, handle: HandleRef) -> Vec<HandleRef> {
        let Some(position) = self.handle_position(handle) else {
            return Vec::new();
        };

        let mut result = Vec::new();
        for (surface_index, surface) in self.surfaces.iter().enumerate() {
            for corner in HandleId::CORNERS {
                let candidate = HandleRef {
                    surface: surface_index,
                    handle: corner,
                };
                if candidate == handle {
                    continue;
                }
                if surface.handle_position(corner) == position {
                    result.push(candidate);
                }
            }
        }
        result
    }

    /// Index of the first surface whose region contains `pos`.
    pub fn surface_at(&self, pos: Vec2) -> Option<usize> {
        self.surfaces.iter().position(|s| s.is_point_inside(pos))
    }
}

impl Default for Screen {
    fn default() -> Self {
        Self::new("Screen")
    }
}

/// Ordered collection of screens plus the one currently being edited.
#[derive(Default, Serialize, Deserialize)]
pub struct ScreenManager {
    pub screens: Vec<Screen>,
    pub editing_screen: Option<usize>,
    next_screen_number: u32,
}

impl ScreenManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new screen with one default surface; returns its index.
    pub fn add_screen(&mut self) -> usize {
        self.next_screen_number += 1;
        let screen = Screen::new(format!("Screen {}", self.next_screen_number));
        log::info!("Added screen '{}'", screen.name);
        self.screens.push(screen);
        self.screens.len() - 1
    }

    pub fn remove_screen(&mut self, index: usize) -> Option<Screen> {
        if index >= self.screens.len() {
            return None;
        }
        match self.editing_screen {
            Some(editing) if editing == index => self.editing_screen = None,
            Some(editing) if editing > index => self.editing_screen = Some(editing - 1),
            _ => {}
        }
        Some(self.screens.remove(index))
    }

    pub fn editing_screen(&self) -> Option<&Screen> {
        self.editing_screen.and_then(|i| self.screens.get(i))
    }

    pub fn maintain(&mut self, registry: &MediaRegistry) {
        for screen in &mut self.screens {
            screen.maintain(registry);
        }
    }
}
