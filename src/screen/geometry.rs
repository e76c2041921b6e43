//! Surface geometry: bezier edges, projective texture coordinates, mesh generation
//!
//! Everything in here runs on the logic thread and is a pure function of the
//! surface parameters; the render thread only ever sees finished buffers.
//!
//! Coordinate conventions: surface parameters live in normalized display
//! space with y up (the default surface is the unit square); mesh positions
//! are emitted in clip space (`p * 2 - 1`); texture space has y down.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::render::SurfaceVertex;

/// Cells per side when bezier warping is enabled. A flat quad uses 1.
pub const BEZIER_GRID_SIZE: usize = 16;

/// Four corner points of a surface quad.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadCorners {
    pub top_left: Vec2,
    pub top_right: Vec2,
    pub bottom_left: Vec2,
    pub bottom_right: Vec2,
}

impl QuadCorners {
    /// Unit square, y up.
    pub fn unit() -> Self {
        Self {
            top_left: Vec2::new(0.0, 1.0),
            top_right: Vec2::new(1.0, 1.0),
            bottom_left: Vec2::new(0.0, 0.0),
            bottom_right: Vec2::new(1.0, 0.0),
        }
    }
}

impl Default for QuadCorners {
    fn default() -> Self {
        Self::unit()
    }
}

/// Bezier control handles, two per edge.
///
/// Names follow the edge they sit on: `top_left` is the handle on the top
/// edge nearest the top-left corner, `left_top` the handle on the left edge
/// nearest the top-left corner, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BezierHandles {
    pub top_left: Vec2,
    pub top_right: Vec2,
    pub bottom_left: Vec2,
    pub bottom_right: Vec2,
    pub left_top: Vec2,
    pub left_bottom: Vec2,
    pub right_top: Vec2,
    pub right_bottom: Vec2,
}

impl BezierHandles {
    /// Handles at the 1/3 and 2/3 points of each edge, a curve that starts
    /// out coincident with the straight quad.
    pub fn from_corners(corners: &QuadCorners) -> Self {
        let third = |a: Vec2, b: Vec2| a.lerp(b, 1.0 / 3.0);
        Self {
            top_left: third(corners.top_left, corners.top_right),
            top_right: third(corners.top_right, corners.top_left),
            bottom_left: third(corners.bottom_left, corners.bottom_right),
            bottom_right: third(corners.bottom_right, corners.bottom_left),
            left_top: third(corners.top_left, corners.bottom_left),
            left_bottom: third(corners.bottom_left, corners.top_left),
            right_top: third(corners.top_right, corners.bottom_right),
            right_bottom: third(corners.bottom_right, corners.top_right),
        }
    }
}

/// Per-edge scalar values, used for both soft-edge falloff and crop.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeValues {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl EdgeValues {
    pub fn splat(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

/// Axis-aligned rectangle in texture space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The full texture, `[0,1]²`.
    pub fn full() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Cubic bezier point at parameter `t`.
pub fn cubic_bezier(a: Vec2, b: Vec2, c: Vec2, d: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    a * (u * u * u) + b * (3.0 * u * u * t) + c * (3.0 * u * t * t) + d * (t * t * t)
}

/// Intersection point of segments `p1-p2` and `p3-p4`.
///
/// Returns `None` for parallel, coincident, or degenerate segments, and when
/// the segments do not actually cross. Never divides by zero.
pub fn segment_intersection(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> Option<Vec2> {
    let d1 = p2 - p1;
    let d2 = p4 - p3;
    let denom = d1.x * d2.y - d1.y * d2.x;
    if denom.abs() <= f32::EPSILON {
        return None;
    }
    let delta = p3 - p1;
    let t = (delta.x * d2.y - delta.y * d2.x) / denom;
    let s = (delta.x * d1.y - delta.y * d1.x) / denom;
    if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&s) {
        return None;
    }
    Some(p1 + d1 * t)
}

/// Homogeneous weight per corner of a quad cell, for perspective-correct
/// texture sampling.
///
/// Corners are ordered around the quad so that `corners[i]` is opposite
/// `corners[(i + 2) % 4]`. Weights come from the diagonal intersection:
/// `w = (d + d_opposite) / d_opposite`. Degenerate quads (no diagonal
/// crossing, coincident points) fall back to affine weights of 1.
pub fn projective_weights(corners: [Vec2; 4]) -> [f32; 4] {
    let center = match segment_intersection(corners[0], corners[2], corners[1], corners[3]) {
        Some(c) => c,
        None => return [1.0; 4],
    };
    let distances = corners.map(|c| (c - center).length());
    let mut weights = [1.0f32; 4];
    for i in 0..4 {
        let opposite = distances[(i + 2) % 4];
        if opposite > f32::EPSILON {
            weights[i] = (distances[i] + opposite) / opposite;
        }
    }
    weights
}

/// Point-in-polygon by ray casting. Handles concave outlines.
pub fn point_in_polygon(point: Vec2, polygon: &[Vec2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let pi = polygon[i];
        let pj = polygon[j];
        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// CPU reference for the shader's per-edge linear alpha ramp.
///
/// `(u, v)` is the surface-local coordinate in `[0,1]²`, v up. Each edge
/// attenuates independently with a linear ramp from 0 at the edge to 1 at the
/// falloff-inset line; the four factors multiply.
pub fn soft_edge_alpha(u: f32, v: f32, soft: &EdgeValues) -> f32 {
    fn linear_map(value: f32, min1: f32, max1: f32, min2: f32, max2: f32) -> f32 {
        min2 + (max2 - min2) * (value - min1) / (max1 - min1)
    }

    let mut alpha = 1.0;
    if soft.top > 0.0 && v > 1.0 - soft.top {
        alpha *= linear_map(v, 1.0, 1.0 - soft.top, 0.0, 1.0);
    }
    if soft.right > 0.0 && u > 1.0 - soft.right {
        alpha *= linear_map(u, 1.0, 1.0 - soft.right, 0.0, 1.0);
    }
    if soft.bottom > 0.0 && v < soft.bottom {
        alpha *= linear_map(v, 0.0, soft.bottom, 0.0, 1.0);
    }
    if soft.left > 0.0 && u < soft.left {
        alpha *= linear_map(u, 0.0, soft.left, 0.0, 1.0);
    }
    alpha
}

/// Source sampling rectangle for a media of `media_size` pixels.
///
/// Crop shrinks the rectangle first. Fill mode then adjusts it against the
/// target aspect: `Fill` samples a centered sub-rectangle (media overflows
/// the surface), `Fit` samples a centered super-rectangle (media letterboxes,
/// clamped at the texture edge), `Stretch` leaves it alone. With
/// `consider_crop` the media aspect is taken from the cropped region.
pub fn source_rect(
    media_size: (u32, u32),
    fill_mode: crate::screen::FillMode,
    target_aspect: f32,
    crop: &EdgeValues,
    consider_crop: bool,
) -> Rect {
    let mut rect = Rect::new(
        crop.left.clamp(0.0, 1.0),
        crop.top.clamp(0.0, 1.0),
        (1.0 - crop.left - crop.right).max(1.0e-4),
        (1.0 - crop.top - crop.bottom).max(1.0e-4),
    );

    if fill_mode == crate::screen::FillMode::Stretch {
        return rect;
    }

    let (w, h) = (media_size.0.max(1) as f32, media_size.1.max(1) as f32);
    let media_aspect = if consider_crop {
        (w * rect.width) / (h * rect.height)
    } else {
        w / h
    };
    let target_aspect = target_aspect.max(1.0e-4);
    let scale = media_aspect / target_aspect;

    let center = rect.center();
    match fill_mode {
        crate::screen::FillMode::Stretch => {}
        crate::screen::FillMode::Fill => {
            // Sample less of the wider axis so the media covers the surface.
            if scale > 1.0 {
                rect.width /= scale;
            } else {
                rect.height *= scale;
            }
        }
        crate::screen::FillMode::Fit => {
            // Sample past the narrower axis so the whole media is visible.
            if scale > 1.0 {
                rect.height *= scale;
            } else {
                rect.width /= scale;
            }
        }
    }
    rect.x = center.x - rect.width / 2.0;
    rect.y = center.y - rect.height / 2.0;
    rect
}

/// Everything mesh generation needs, snapshot from a surface.
#[derive(Debug, Clone, Copy)]
pub struct MeshParams<'a> {
    pub corners: QuadCorners,
    pub bezier: Option<&'a BezierHandles>,
    pub media_rect: Rect,
    pub mask_rect: Rect,
}

/// Replace non-finite coordinates so degenerate parameters can never push
/// NaN/Inf into a GPU buffer.
fn finite_or_zero(v: Vec2) -> Vec2 {
    if v.is_finite() {
        v
    } else {
        Vec2::ZERO
    }
}

/// Grid point in normalized display space at `(u, v)`, v up.
fn grid_point(params: &MeshParams, u: f32, v: f32) -> Vec2 {
    let c = &params.corners;
    let bottom = c.bottom_left.lerp(c.bottom_right, u);
    let top = c.top_left.lerp(c.top_right, u);
    let bilinear = bottom.lerp(top, v);

    let point = match params.bezier {
        None => bilinear,
        Some(b) => {
            // Coons patch: cubic edges, interior blended from the edges
            // minus the bilinear corner term.
            let top_edge = cubic_bezier(c.top_left, b.top_left, b.top_right, c.top_right, u);
            let bottom_edge =
                cubic_bezier(c.bottom_left, b.bottom_left, b.bottom_right, c.bottom_right, u);
            let left_edge = cubic_bezier(c.bottom_left, b.left_bottom, b.left_top, c.top_left, v);
            let right_edge =
                cubic_bezier(c.bottom_right, b.right_bottom, b.right_top, c.top_right, v);
            bottom_edge * (1.0 - v) + top_edge * v + left_edge * (1.0 - u) + right_edge * u
                - bilinear
        }
    };
    finite_or_zero(point)
}

fn to_clip(p: Vec2) -> [f32; 2] {
    [p.x * 2.0 - 1.0, p.y * 2.0 - 1.0]
}

/// Map a surface-local `(u, v)` (v up) into a texture-space rectangle
/// (v down).
fn rect_uv(rect: &Rect, u: f32, v: f32) -> Vec2 {
    Vec2::new(rect.x + u * rect.width, rect.y + (1.0 - v) * rect.height)
}

/// Generate the warped, triangulated mesh for one surface.
///
/// Emits one quad cell per grid cell (four vertices and two CCW triangles)
/// with projective texture and mask coordinates computed per cell from the
/// cell's diagonal intersection. Pure function of `params`; output vectors
/// are cleared first.
pub fn generate_mesh(params: &MeshParams, vertices: &mut Vec<SurfaceVertex>, indices: &mut Vec<u32>) {
    vertices.clear();
    indices.clear();

    let n = if params.bezier.is_some() {
        BEZIER_GRID_SIZE
    } else {
        1
    };

    // Sample the (n+1)² grid once; cells share sampled points.
    let step = 1.0 / n as f32;
    let mut grid = Vec::with_capacity((n + 1) * (n + 1));
    for row in 0..=n {
        let v = row as f32 * step;
        for col in 0..=n {
            let u = col as f32 * step;
            grid.push(grid_point(params, u, v));
        }
    }
    let at = |col: usize, row: usize| grid[row * (n + 1) + col];

    vertices.reserve(n * n * 4);
    indices.reserve(n * n * 6);

    for row in 0..n {
        let v0 = row as f32 * step;
        let v1 = (row + 1) as f32 * step;
        for col in 0..n {
            let u0 = col as f32 * step;
            let u1 = (col + 1) as f32 * step;

            // Cell corners counter-clockwise: bottom-left, bottom-right,
            // top-right, top-left.
            let positions = [
                at(col, row),
                at(col + 1, row),
                at(col + 1, row + 1),
                at(col, row + 1),
            ];
            let weights = projective_weights(positions);
            let uvs = [(u0, v0), (u1, v0), (u1, v1), (u0, v1)];

            let base = vertices.len() as u32;
            for i in 0..4 {
                let (u, v) = uvs[i];
                let w = weights[i];
                let tex = rect_uv(&params.media_rect, u, v);
                let mask = rect_uv(&params.mask_rect, u, v);
                vertices.push(SurfaceVertex {
                    position: to_clip(positions[i]),
                    surface_pos: [u, v],
                    tex_coord: [tex.x * w, tex.y * w, w],
                    mask_coord: [mask.x * w, mask.y * w, w],
                });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::FillMode;

    fn unit_params() -> MeshParams<'static> {
        MeshParams {
            corners: QuadCorners::unit(),
            bezier: None,
            media_rect: Rect::full(),
            mask_rect: Rect::full(),
        }
    }

    #[test]
    fn test_segment_intersection_crossing() {
        let p = segment_intersection(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 0.0),
        )
        .unwrap();
        assert!((p - Vec2::new(0.5, 0.5)).length() < 1.0e-6);
    }

    #[test]
    fn test_segment_intersection_parallel_is_none() {
        assert!(segment_intersection(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
        )
        .is_none());
    }

    #[test]
    fn test_segment_intersection_coincident_is_none() {
        assert!(segment_intersection(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
        )
        .is_none());
    }

    #[test]
    fn test_projective_weights_square_are_uniform() {
        let weights = projective_weights([
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ]);
        for w in weights {
            assert!((w - 2.0).abs() < 1.0e-5);
        }
    }

    #[test]
    fn test_projective_weights_degenerate_fall_back_to_affine() {
        let weights = projective_weights([Vec2::ZERO; 4]);
        assert_eq!(weights, [1.0; 4]);
    }

    #[test]
    fn test_soft_edge_zero_is_identity() {
        let soft = EdgeValues::default();
        for &(u, v) in &[(0.0, 0.0), (0.5, 0.5), (1.0, 1.0), (0.01, 0.99)] {
            assert_eq!(soft_edge_alpha(u, v, &soft), 1.0);
        }
    }

    #[test]
    fn test_soft_edge_full_ramps_linearly() {
        let soft = EdgeValues {
            bottom: 1.0,
            ..Default::default()
        };
        assert!(soft_edge_alpha(0.5, 0.0, &soft).abs() < 1.0e-6);
        assert!((soft_edge_alpha(0.5, 0.25, &soft) - 0.25).abs() < 1.0e-6);
        assert!((soft_edge_alpha(0.5, 1.0, &soft) - 1.0).abs() < 1.0e-6);
    }

    #[test]
    fn test_soft_edge_factors_multiply() {
        let soft = EdgeValues::splat(1.0);
        let alpha = soft_edge_alpha(0.5, 0.5, &soft);
        // 0.5 from each of the four edges.
        assert!((alpha - 0.0625).abs() < 1.0e-6);
    }

    #[test]
    fn test_point_in_polygon_unit_square() {
        let square = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        assert!(point_in_polygon(Vec2::new(0.5, 0.5), &square));
        assert!(!point_in_polygon(Vec2::new(2.0, 2.0), &square));
    }

    #[test]
    fn test_flat_quad_is_one_cell() {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        generate_mesh(&unit_params(), &mut vertices, &mut indices);
        assert_eq!(vertices.len(), 4);
        assert_eq!(indices.len(), 6);
    }

    #[test]
    fn test_mesh_is_idempotent() {
        let params = unit_params();
        let mut v1 = Vec::new();
        let mut i1 = Vec::new();
        let mut v2 = Vec::new();
        let mut i2 = Vec::new();
        generate_mesh(&params, &mut v1, &mut i1);
        generate_mesh(&params, &mut v2, &mut i2);
        assert_eq!(v1, v2);
        assert_eq!(i1, i2);
    }

    #[test]
    fn test_winding_is_counter_clockwise() {
        let corners = QuadCorners {
            top_left: Vec2::new(0.1, 0.9),
            top_right: Vec2::new(0.95, 1.0),
            bottom_left: Vec2::new(0.0, 0.05),
            bottom_right: Vec2::new(1.0, 0.0),
        };
        let handles = BezierHandles::from_corners(&corners);
        let params = MeshParams {
            corners,
            bezier: Some(&handles),
            media_rect: Rect::full(),
            mask_rect: Rect::full(),
        };
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        generate_mesh(&params, &mut vertices, &mut indices);

        for tri in indices.chunks(3) {
            let a = Vec2::from(vertices[tri[0] as usize].position);
            let b = Vec2::from(vertices[tri[1] as usize].position);
            let c = Vec2::from(vertices[tri[2] as usize].position);
            let cross = (b - a).perp_dot(c - a);
            assert!(cross > 0.0, "clockwise triangle {tri:?}");
        }
    }

    #[test]
    fn test_bezier_mesh_cell_count() {
        let corners = QuadCorners::unit();
        let handles = BezierHandles::from_corners(&corners);
        let params = MeshParams {
            corners,
            bezier: Some(&handles),
            media_rect: Rect::full(),
            mask_rect: Rect::full(),
        };
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        generate_mesh(&params, &mut vertices, &mut indices);
        let cells = BEZIER_GRID_SIZE * BEZIER_GRID_SIZE;
        assert_eq!(vertices.len(), cells * 4);
        assert_eq!(indices.len(), cells * 6);
    }

    #[test]
    fn test_bezier_handles_bend_the_edge() {
        let corners = QuadCorners::unit();
        let mut handles = BezierHandles::from_corners(&corners);
        handles.top_left.y = 1.4;
        handles.top_right.y = 1.4;
        let params = MeshParams {
            corners,
            bezier: Some(&handles),
            media_rect: Rect::full(),
            mask_rect: Rect::full(),
        };
        // Top edge midpoint bulges above the straight edge.
        let mid = grid_point(&params, 0.5, 1.0);
        assert!(mid.y > 1.05, "top edge did not bend: {mid}");

        // Straight handles keep the edge straight.
        let straight = BezierHandles::from_corners(&corners);
        let flat_params = MeshParams {
            corners,
            bezier: Some(&straight),
            media_rect: Rect::full(),
            mask_rect: Rect::full(),
        };
        let flat_mid = grid_point(&flat_params, 0.5, 1.0);
        assert!((flat_mid.y - 1.0).abs() < 1.0e-5);
    }

    #[test]
    fn test_degenerate_quad_produces_finite_mesh() {
        let params = MeshParams {
            corners: QuadCorners {
                top_left: Vec2::ZERO,
                top_right: Vec2::ZERO,
                bottom_left: Vec2::ZERO,
                bottom_right: Vec2::ZERO,
            },
            bezier: None,
            media_rect: Rect::full(),
            mask_rect: Rect::full(),
        };
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        generate_mesh(&params, &mut vertices, &mut indices);
        for v in &vertices {
            assert!(v.position.iter().all(|c| c.is_finite()));
            assert!(v.tex_coord.iter().all(|c| c.is_finite()));
            assert!(v.mask_coord.iter().all(|c| c.is_finite()));
        }
    }

    #[test]
    fn test_crop_shrinks_source_rect() {
        let crop = EdgeValues {
            top: 0.1,
            right: 0.2,
            bottom: 0.1,
            left: 0.2,
        };
        let rect = source_rect((1920, 1080), FillMode::Stretch, 16.0 / 9.0, &crop, false);
        assert!((rect.x - 0.2).abs() < 1.0e-6);
        assert!((rect.y - 0.1).abs() < 1.0e-6);
        assert!((rect.width - 0.6).abs() < 1.0e-6);
        assert!((rect.height - 0.8).abs() < 1.0e-6);
    }

    #[test]
    fn test_fill_mode_matching_aspect_is_noop() {
        let crop = EdgeValues::default();
        let rect = source_rect((1920, 1080), FillMode::Fill, 16.0 / 9.0, &crop, false);
        assert!((rect.width - 1.0).abs() < 1.0e-5);
        assert!((rect.height - 1.0).abs() < 1.0e-5);
    }

    #[test]
    fn test_fill_crops_wide_media() {
        let crop = EdgeValues::default();
        // 32:9 media on a 16:9 target: sample the center half horizontally.
        let rect = source_rect((3840, 1080), FillMode::Fill, 16.0 / 9.0, &crop, false);
        assert!((rect.width - 0.5).abs() < 1.0e-5);
        assert!((rect.x - 0.25).abs() < 1.0e-5);
        assert!((rect.height - 1.0).abs() < 1.0e-5);
    }

    #[test]
    fn test_fit_letterboxes_wide_media() {
        let crop = EdgeValues::default();
        let rect = source_rect((3840, 1080), FillMode::Fit, 16.0 / 9.0, &crop, false);
        assert!((rect.height - 2.0).abs() < 1.0e-5);
        assert!((rect.y - -0.5).abs() < 1.0e-5);
        assert!((rect.width - 1.0).abs() < 1.0e-5);
    }
}
