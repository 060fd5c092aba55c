//! World-space and grid-space geometry.
//!
//! Boards live on a plane of constant depth (the z axis is depth). Each board
//! maps integer grid coordinates to world positions through a
//! [`GridTransform`], and the inverse mapping lets cell lookups probe a fixed
//! neighbourhood of the spatial index instead of scanning every cell.

use std::ops::{Add, Div, Sub};

/// A 2D grid coordinate, `(column, row)`.
pub type Coord = (i32, i32);

/// A point or offset in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Returns a copy with the depth replaced.
    pub const fn with_z(self, z: f32) -> Self {
        Self::new(self.x, self.y, z)
    }

    /// Distance measured in the board plane, ignoring depth.
    pub fn planar_distance(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Linear interpolation between `self` and `target`, `t` clamped to `0..=1`.
    pub fn lerp(self, target: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self::new(
            self.x + (target.x - self.x) * t,
            self.y + (target.y - self.y) * t,
            self.z + (target.z - self.z) * t,
        )
    }

    /// Average of a set of points, `None` when the set is empty.
    pub fn centroid(points: impl IntoIterator<Item = Self>) -> Option<Self> {
        let mut sum = Self::ZERO;
        let mut count = 0usize;
        for point in points {
            sum = sum + point;
            count += 1;
        }
        (count > 0).then(|| sum / count as f32)
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Div<f32> for Vec3 {
    type Output = Self;

    fn div(self, rhs: f32) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

/// A pointer ray in world space, as produced by the host's camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// A ray looking straight down the depth axis through `(x, y)`.
    pub const fn vertical(x: f32, y: f32) -> Self {
        Self {
            origin: Vec3::new(x, y, -10.0),
            direction: Vec3::new(0.0, 0.0, 1.0),
        }
    }
}

/// The fixed plane pointer rays are projected onto while dragging.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragPlane {
    /// Depth of the plane (it is perpendicular to the z axis).
    pub depth: f32,
}

impl DragPlane {
    /// Intersects `ray` with the plane.
    ///
    /// Rays parallel to the plane fall back to the ray origin flattened onto
    /// the plane, so a degenerate pointer never aborts a drag.
    pub fn project(&self, ray: Ray) -> Vec3 {
        if ray.direction.z.abs() <= f32::EPSILON {
            return ray.origin.with_z(self.depth);
        }
        let distance = (self.depth - ray.origin.z) / ray.direction.z;
        Vec3::new(
            ray.origin.x + ray.direction.x * distance,
            ray.origin.y + ray.direction.y * distance,
            self.depth,
        )
    }
}

/// Maps a board's integer grid onto world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridTransform {
    /// World position of cell `(0, 0)`.
    pub origin: Vec3,
    /// Distance between neighbouring cell centres.
    pub spacing: f32,
}

impl GridTransform {
    pub const fn new(origin: Vec3, spacing: f32) -> Self {
        Self { origin, spacing }
    }

    /// World position of a cell centre.
    pub fn cell_center(&self, (x, y): Coord) -> Vec3 {
        Vec3::new(
            self.origin.x + x as f32 * self.spacing,
            self.origin.y + y as f32 * self.spacing,
            self.origin.z,
        )
    }

    /// Continuous grid position of a world point (depth ignored).
    pub fn to_grid(&self, point: Vec3) -> (f32, f32) {
        (
            (point.x - self.origin.x) / self.spacing,
            (point.y - self.origin.y) / self.spacing,
        )
    }

    /// All grid coordinates whose centres could lie within `radius` of `point`.
    ///
    /// The window is the bounding square of the search circle, so its size
    /// depends only on `radius / spacing`, never on the board size.
    pub fn neighbourhood(&self, point: Vec3, radius: f32) -> impl Iterator<Item = Coord> {
        let (gx, gy) = self.to_grid(point);
        let reach = radius / self.spacing;
        let min_x = (gx - reach).floor() as i32;
        let max_x = (gx + reach).ceil() as i32;
        let min_y = (gy - reach).floor() as i32;
        let max_y = (gy + reach).ceil() as i32;
        (min_y..=max_y).flat_map(move |y| (min_x..=max_x).map(move |x| (x, y)))
    }
}
