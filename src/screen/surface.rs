//! A warpable projection surface
//!
//! A surface maps a rectangular media source onto an arbitrary quad region
//! of its screen, optionally with bezier-curved edges, soft-edge falloff,
//! crop, and a luminance mask. The derived mesh is cached behind a lock: the
//! logic thread writes it on parameter changes, the render thread copies it
//! out once per frame.

use std::sync::{Mutex, MutexGuard};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::media::{MediaId, MediaRegistry, MediaSource};
use crate::render::SurfaceVertex;

use super::geometry::{
    self, BezierHandles, EdgeValues, MeshParams, QuadCorners, Rect, BEZIER_GRID_SIZE,
};

/// How the media fills the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FillMode {
    /// Stretch to the full surface, ignoring aspect.
    #[default]
    Stretch,
    /// Letterbox so the whole media is visible.
    Fit,
    /// Cover the surface, cropping the media.
    Fill,
}

/// Target aspect ratio used by `Fit`/`Fill`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    FourThirds,
    #[default]
    SixteenNinths,
    SixteenTenths,
    Square,
    Custom,
}

impl AspectRatio {
    /// Numeric ratio; `Custom` reads the surface's custom value.
    pub fn value(&self, custom: f32) -> f32 {
        match self {
            AspectRatio::FourThirds => 4.0 / 3.0,
            AspectRatio::SixteenNinths => 16.0 / 9.0,
            AspectRatio::SixteenTenths => 16.0 / 10.0,
            AspectRatio::Square => 1.0,
            AspectRatio::Custom => custom.max(1.0e-4),
        }
    }
}

/// A handle a user can grab: a corner, or a bezier control point on an edge.
///
/// Enumeration order (corners first, then bezier handles in this order) is
/// the tie-break order for [`crate::screen::Screen::closest_handle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleId {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    BezierTopLeft,
    BezierTopRight,
    BezierBottomLeft,
    BezierBottomRight,
    BezierLeftTop,
    BezierLeftBottom,
    BezierRightTop,
    BezierRightBottom,
}

impl HandleId {
    pub const CORNERS: [HandleId; 4] = [
        HandleId::TopLeft,
        HandleId::TopRight,
        HandleId::BottomLeft,
        HandleId::BottomRight,
    ];

    pub const BEZIER: [HandleId; 8] = [
        HandleId::BezierTopLeft,
        HandleId::BezierTopRight,
        HandleId::BezierBottomLeft,
        HandleId::BezierBottomRight,
        HandleId::BezierLeftTop,
        HandleId::BezierLeftBottom,
        HandleId::BezierRightTop,
        HandleId::BezierRightBottom,
    ];

    pub fn is_corner(&self) -> bool {
        matches!(
            self,
            HandleId::TopLeft | HandleId::TopRight | HandleId::BottomLeft | HandleId::BottomRight
        )
    }
}

/// The derived mesh buffers, written by the logic thread and copied out by
/// the render thread. `version` changes on every rewrite so the renderer can
/// skip re-uploading an unchanged mesh.
#[derive(Debug, Default)]
pub struct SurfaceMesh {
    pub vertices: Vec<SurfaceVertex>,
    pub indices: Vec<u32>,
    pub version: u64,
}

fn default_true() -> bool {
    true
}

/// A warpable projection region within a screen.
#[derive(Serialize, Deserialize)]
pub struct Surface {
    pub id: u32,
    pub name: String,
    pub enabled: bool,

    corners: QuadCorners,
    bezier_enabled: bool,
    bezier: BezierHandles,

    media: Option<MediaId>,
    mask: Option<MediaId>,
    invert_mask: bool,
    show_test_pattern: bool,

    fill_mode: FillMode,
    aspect_ratio: AspectRatio,
    custom_ratio: f32,
    consider_crop: bool,

    soft_edge: EdgeValues,
    crop: EdgeValues,

    #[serde(skip, default = "default_true")]
    needs_update: bool,
    #[serde(skip)]
    mesh: Mutex<SurfaceMesh>,
}

impl Surface {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        let corners = QuadCorners::unit();
        Self {
            id,
            name: name.into(),
            enabled: true,
            bezier: BezierHandles::from_corners(&corners),
            corners,
            bezier_enabled: false,
            media: None,
            mask: None,
            invert_mask: false,
            show_test_pattern: false,
            fill_mode: FillMode::default(),
            aspect_ratio: AspectRatio::default(),
            custom_ratio: 16.0 / 9.0,
            consider_crop: false,
            soft_edge: EdgeValues::default(),
            crop: EdgeValues::default(),
            needs_update: true,
            mesh: Mutex::new(SurfaceMesh::default()),
        }
    }

    // --- parameters -------------------------------------------------------

    pub fn corners(&self) -> &QuadCorners {
        &self.corners
    }

    pub fn set_corners(&mut self, corners: QuadCorners) {
        self.corners = corners;
        self.needs_update = true;
    }

    pub fn bezier_enabled(&self) -> bool {
        self.bezier_enabled
    }

    pub fn set_bezier_enabled(&mut self, enabled: bool) {
        if self.bezier_enabled != enabled {
            self.bezier_enabled = enabled;
            self.needs_update = true;
        }
    }

    /// Put the bezier handles back on the straight edges of the current quad.
    pub fn reset_bezier_handles(&mut self) {
        self.bezier = BezierHandles::from_corners(&self.corners);
        self.needs_update = true;
    }

    pub fn media(&self) -> Option<MediaId> {
        self.media
    }

    pub fn set_media(&mut self, media: Option<MediaId>) {
        self.media = media;
        self.needs_update = true;
    }

    pub fn mask(&self) -> Option<MediaId> {
        self.mask
    }

    pub fn set_mask(&mut self, mask: Option<MediaId>) {
        self.mask = mask;
        self.needs_update = true;
    }

    pub fn invert_mask(&self) -> bool {
        self.invert_mask
    }

    pub fn set_invert_mask(&mut self, invert: bool) {
        self.invert_mask = invert;
    }

    pub fn show_test_pattern(&self) -> bool {
        self.show_test_pattern
    }

    pub fn set_show_test_pattern(&mut self, show: bool) {
        self.show_test_pattern = show;
    }

    pub fn fill_mode(&self) -> FillMode {
        self.fill_mode
    }

    pub fn set_fill_mode(&mut self, mode: FillMode) {
        self.fill_mode = mode;
        self.needs_update = true;
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn set_aspect_ratio(&mut self, ratio: AspectRatio) {
        self.aspect_ratio = ratio;
        self.needs_update = true;
    }

    pub fn custom_ratio(&self) -> f32 {
        self.custom_ratio
    }

    pub fn set_custom_ratio(&mut self, ratio: f32) {
        self.custom_ratio = ratio.max(1.0e-4);
        self.needs_update = true;
    }

    pub fn consider_crop(&self) -> bool {
        self.consider_crop
    }

    pub fn set_consider_crop(&mut self, consider: bool) {
        self.consider_crop = consider;
        self.needs_update = true;
    }

    pub fn soft_edge(&self) -> &EdgeValues {
        &self.soft_edge
    }

    pub fn set_soft_edge(&mut self, soft: EdgeValues) {
        self.soft_edge = EdgeValues {
            top: soft.top.clamp(0.0, 1.0),
            right: soft.right.clamp(0.0, 1.0),
            bottom: soft.bottom.clamp(0.0, 1.0),
            left: soft.left.clamp(0.0, 1.0),
        };
    }

    pub fn crop(&self) -> &EdgeValues {
        &self.crop
    }

    pub fn set_crop(&mut self, crop: EdgeValues) {
        self.crop = EdgeValues {
            top: crop.top.clamp(0.0, 1.0),
            right: crop.right.clamp(0.0, 1.0),
            bottom: crop.bottom.clamp(0.0, 1.0),
            left: crop.left.clamp(0.0, 1.0),
        };
        self.needs_update = true;
    }

    // --- handles ----------------------------------------------------------

    pub fn handle_position(&self, id: HandleId) -> Vec2 {
        match id {
            HandleId::TopLeft => self.corners.top_left,
            HandleId::TopRight => self.corners.top_right,
            HandleId::BottomLeft => self.corners.bottom_left,
            HandleId::BottomRight => self.corners.bottom_right,
            HandleId::BezierTopLeft => self.bezier.top_left,
            HandleId::BezierTopRight => self.bezier.top_right,
            HandleId::BezierBottomLeft => self.bezier.bottom_left,
            HandleId::BezierBottomRight => self.bezier.bottom_right,
            HandleId::BezierLeftTop => self.bezier.left_top,
            HandleId::BezierLeftBottom => self.bezier.left_bottom,
            HandleId::BezierRightTop => self.bezier.right_top,
            HandleId::BezierRightBottom => self.bezier.right_bottom,
        }
    }

    pub fn set_handle_position(&mut self, id: HandleId, pos: Vec2) {
        let slot = match id {
            HandleId::TopLeft => &mut self.corners.top_left,
            HandleId::TopRight => &mut self.corners.top_right,
            HandleId::BottomLeft => &mut self.corners.bottom_left,
            HandleId::BottomRight => &mut self.corners.bottom_right,
            HandleId::BezierTopLeft => &mut self.bezier.top_left,
            HandleId::BezierTopRight => &mut self.bezier.top_right,
            HandleId::BezierBottomLeft => &mut self.bezier.bottom_left,
            HandleId::BezierBottomRight => &mut self.bezier.bottom_right,
            HandleId::BezierLeftTop => &mut self.bezier.left_top,
            HandleId::BezierLeftBottom => &mut self.bezier.left_bottom,
            HandleId::BezierRightTop => &mut self.bezier.right_top,
            HandleId::BezierRightBottom => &mut self.bezier.right_bottom,
        };
        if pos.is_finite() {
            *slot = pos;
            self.needs_update = true;
        }
    }

    /// The boundary of the rendered region, as a closed polygon. Bezier
    /// edges are sampled so concave outlines test correctly.
    pub fn boundary_polygon(&self) -> Vec<Vec2> {
        let c = &self.corners;
        if !self.bezier_enabled {
            return vec![c.top_left, c.top_right, c.bottom_right, c.bottom_left];
        }

        let b = &self.bezier;
        let n = BEZIER_GRID_SIZE;
        let mut polygon = Vec::with_capacity(n * 4);
        for i in 0..n {
            let t = i as f32 / n as f32;
            polygon.push(geometry::cubic_bezier(
                c.top_left, b.top_left, b.top_right, c.top_right, t,
            ));
        }
        for i in 0..n {
            let t = 1.0 - i as f32 / n as f32;
            polygon.push(geometry::cubic_bezier(
                c.bottom_right, b.right_bottom, b.right_top, c.top_right, t,
            ));
        }
        for i in 0..n {
            let t = 1.0 - i as f32 / n as f32;
            polygon.push(geometry::cubic_bezier(
                c.bottom_left, b.bottom_left, b.bottom_right, c.bottom_right, t,
            ));
        }
        for i in 0..n {
            let t = i as f32 / n as f32;
            polygon.push(geometry::cubic_bezier(
                c.bottom_left, b.left_bottom, b.left_top, c.top_left, t,
            ));
        }
        polygon
    }

    /// Hit test against the current quad/bezier boundary.
    pub fn is_point_inside(&self, pos: Vec2) -> bool {
        geometry::point_in_polygon(pos, &self.boundary_polygon())
    }

    // --- mesh -------------------------------------------------------------

    /// Recompute the mesh if a geometry parameter changed since last time.
    pub fn maintain(&mut self, registry: &MediaRegistry) {
        if self.needs_update {
            self.needs_update = false;
            self.recompute_mesh(registry);
        }
    }

    /// Rebuild the vertex/index buffers from the current parameters.
    ///
    /// Generation happens outside the lock; the lock is held only for the
    /// buffer swap, so the render thread is never blocked behind geometry
    /// work.
    pub fn recompute_mesh(&self, registry: &MediaRegistry) {
        let target_aspect = self.aspect_ratio.value(self.custom_ratio);

        let media_rect = match self.media.and_then(|id| registry.resolve(id)) {
            Some(media) => geometry::source_rect(
                media.dimensions(),
                self.fill_mode,
                target_aspect,
                &self.crop,
                self.consider_crop,
            ),
            None => geometry::source_rect(
                (1, 1),
                FillMode::Stretch,
                target_aspect,
                &self.crop,
                self.consider_crop,
            ),
        };

        // The mask aligns to the surface independently of the media.
        let mask_rect = match self.mask.and_then(|id| registry.resolve(id)) {
            Some(mask) => geometry::source_rect(
                mask.dimensions(),
                self.fill_mode,
                target_aspect,
                &EdgeValues::default(),
                false,
            ),
            None => Rect::full(),
        };

        let params = MeshParams {
            corners: self.corners,
            bezier: self.bezier_enabled.then_some(&self.bezier),
            media_rect,
            mask_rect,
        };

        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        geometry::generate_mesh(&params, &mut vertices, &mut indices);

        let mut mesh = self.lock_mesh();
        mesh.vertices = vertices;
        mesh.indices = indices;
        mesh.version = mesh.version.wrapping_add(1);
    }

    /// Lock the mesh buffers. Hold the guard only for the duration of a copy.
    pub fn lock_mesh(&self) -> MutexGuard<'_, SurfaceMesh> {
        self.mesh.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new(1, "Surface")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_surface_is_unit_square() {
        let surface = Surface::default();
        assert_eq!(*surface.corners(), QuadCorners::unit());
        assert!(surface.enabled);
        assert!(!surface.bezier_enabled());
    }

    #[test]
    fn test_point_inside_unit_quad() {
        let surface = Surface::default();
        assert!(surface.is_point_inside(Vec2::new(0.5, 0.5)));
        assert!(!surface.is_point_inside(Vec2::new(2.0, 2.0)));
    }

    #[test]
    fn test_point_inside_bezier_boundary() {
        let mut surface = Surface::default();
        surface.set_bezier_enabled(true);
        // Pinch the top edge down past the middle: the center becomes
        // outside (concave boundary).
        surface.set_handle_position(HandleId::BezierTopLeft, Vec2::new(1.0 / 3.0, -0.8));
        surface.set_handle_position(HandleId::BezierTopRight, Vec2::new(2.0 / 3.0, -0.8));
        assert!(!surface.is_point_inside(Vec2::new(0.5, 0.5)));
        assert!(surface.is_point_inside(Vec2::new(0.05, 0.5)));
    }

    #[test]
    fn test_recompute_bumps_version_and_maintain_clears_flag() {
        let registry = MediaRegistry::new();
        let mut surface = Surface::default();

        surface.maintain(&registry);
        let v1 = surface.lock_mesh().version;
        assert!(!surface.lock_mesh().vertices.is_empty());

        // No parameter change: maintain leaves the mesh alone.
        surface.maintain(&registry);
        assert_eq!(surface.lock_mesh().version, v1);

        surface.set_soft_edge(EdgeValues::splat(0.5));
        // Soft edge is a shader uniform, not geometry.
        surface.maintain(&registry);
        assert_eq!(surface.lock_mesh().version, v1);

        surface.set_crop(EdgeValues::splat(0.1));
        surface.maintain(&registry);
        assert!(surface.lock_mesh().version > v1);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let registry = MediaRegistry::new();
        let surface = Surface::default();
        surface.recompute_mesh(&registry);
        let (v1, i1) = {
            let mesh = surface.lock_mesh();
            (mesh.vertices.clone(), mesh.indices.clone())
        };
        surface.recompute_mesh(&registry);
        let mesh = surface.lock_mesh();
        assert_eq!(mesh.vertices, v1);
        assert_eq!(mesh.indices, i1);
    }

    #[test]
    fn test_bezier_flag_switches_mesh_density() {
        let registry = MediaRegistry::new();
        let mut surface = Surface::default();
        surface.maintain(&registry);
        assert_eq!(surface.lock_mesh().vertices.len(), 4);

        surface.set_bezier_enabled(true);
        surface.maintain(&registry);
        assert_eq!(
            surface.lock_mesh().vertices.len(),
            BEZIER_GRID_SIZE * BEZIER_GRID_SIZE * 4
        );
    }

    #[test]
    fn test_reset_bezier_handles_follows_corners() {
        let mut surface = Surface::default();
        let mut corners = *surface.corners();
        corners.top_right = Vec2::new(2.0, 2.0);
        surface.set_corners(corners);
        surface.reset_bezier_handles();
        let expected = BezierHandles::from_corners(surface.corners());
        assert_eq!(surface.handle_position(HandleId::BezierTopLeft), expected.top_left);
        assert_eq!(surface.handle_position(HandleId::BezierRightTop), expected.right_top);
    }

    #[test]
    fn test_serde_skips_mesh_and_marks_dirty() {
        let registry = MediaRegistry::new();
        let mut surface = Surface::default();
        surface.maintain(&registry);

        let json = serde_json::to_string(&surface).unwrap();
        let mut restored: Surface = serde_json::from_str(&json).unwrap();
        assert!(restored.lock_mesh().vertices.is_empty());

        restored.maintain(&registry);
        assert!(!restored.lock_mesh().vertices.is_empty());
    }
}
