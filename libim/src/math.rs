//! Geometric primitives shared by the texture, world and COG modules.
//!
//! Thin newtypes over [`glam`] rather than hand-rolled vector math, matching how the
//! wider example corpus (`game_common`, `nethercore`) leans on `glam` for this.

use glam::{Vec2, Vec3, Vec4};

/// A 2D point, stored as two little-endian `f32`s on disk (texture/UV coordinates,
/// light falloff pairs).
pub type Vector2 = Vec2;

/// A 3D point or direction, stored as three little-endian `f32`s on disk.
pub type Vector3 = Vec3;

/// An RGBA gradient corner color, stored as four `f32` components in `[0, 1]`.
pub type Vector4 = Vec4;

/// Euler rotation in degrees: pitch, yaw, roll, matching the text grammar's
/// `(pitch/yaw/roll)` triples.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rotator {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Rotator {
    pub const ZERO: Self = Self {
        pitch: 0.0,
        yaw: 0.0,
        roll: 0.0,
    };

    pub fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Box3 {
    pub min: Vector3,
    pub max: Vector3,
}

impl Box3 {
    pub fn new(min: Vector3, max: Vector3) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, p: Vector3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

/// A four-corner gradient color as used by sector/world ambient lighting.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GradientColor {
    pub top: Vector4,
    pub mid: Vector4,
    pub bottom_left: Vector4,
    pub bottom_right: Vector4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box3_contains() {
        let b = Box3::new(Vector3::splat(-1.0), Vector3::splat(1.0));
        assert!(b.contains(Vector3::ZERO));
        assert!(!b.contains(Vector3::splat(2.0)));
    }
}
