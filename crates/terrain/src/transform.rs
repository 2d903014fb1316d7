//! Rotation-free world transform for terrain.
//!
//! Height sampling and ray marching assume the grid's X/Z axes stay aligned with
//! the world's horizontal plane, so only translation and (possibly non-uniform)
//! scale are honored. Any rotation on the owning entity is discarded.

use bevy::math::bounding::Aabb3d;
use bevy::math::Affine3A;
use bevy::prelude::*;
use bevy::render::primitives::Aabb;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainTransform {
    pub translation: Vec3,
    pub scale: Vec3,
}

impl Default for TerrainTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TerrainTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn new(translation: Vec3, scale: Vec3) -> Self {
        Self { translation, scale }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            scale: Vec3::ONE,
        }
    }

    /// Decomposes `global` and drops its rotation.
    ///
    /// The flag is `true` when a non-identity rotation was discarded.
    pub fn from_global(global: &GlobalTransform) -> (Self, bool) {
        let (scale, rotation, translation) = global.to_scale_rotation_translation();
        let discarded = !rotation.abs_diff_eq(Quat::IDENTITY, 1e-5)
            && !rotation.abs_diff_eq(-Quat::IDENTITY, 1e-5);
        (Self { translation, scale }, discarded)
    }

    /// Transform of a child placed at `local_translation` in this frame.
    #[inline]
    pub fn child(&self, local_translation: Vec3) -> Self {
        Self {
            translation: self.translation + self.scale * local_translation,
            scale: self.scale,
        }
    }

    #[inline]
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.translation + self.scale * local
    }

    #[inline]
    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        (world - self.translation) / self.scale
    }

    #[inline]
    pub fn inverse_transform_vector(&self, world: Vec3) -> Vec3 {
        world / self.scale
    }

    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, Quat::IDENTITY, self.translation)
    }

    /// World-space corners of `local`, reordered so negative scale still yields min <= max.
    pub fn world_min_max(&self, local: &Aabb) -> (Vec3, Vec3) {
        let a = self.transform_point(local.min().into());
        let b = self.transform_point(local.max().into());
        (a.min(b), a.max(b))
    }

    pub fn world_aabb3d(&self, local: &Aabb) -> Aabb3d {
        let (min, max) = self.world_min_max(local);
        Aabb3d {
            min: min.into(),
            max: max.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_global_discards_rotation() {
        let global = GlobalTransform::from(
            Transform::from_xyz(10.0, 2.0, -4.0)
                .with_rotation(Quat::from_rotation_y(0.7))
                .with_scale(Vec3::new(2.0, 0.5, 2.0)),
        );
        let (t, discarded) = TerrainTransform::from_global(&global);
        assert!(discarded);
        assert!(t.translation.abs_diff_eq(Vec3::new(10.0, 2.0, -4.0), 1e-4));
        assert!(t.scale.abs_diff_eq(Vec3::new(2.0, 0.5, 2.0), 1e-4));
    }

    #[test]
    fn test_from_global_without_rotation() {
        let global = GlobalTransform::from(Transform::from_xyz(1.0, 0.0, 1.0));
        let (t, discarded) = TerrainTransform::from_global(&global);
        assert!(!discarded);
        assert_eq!(t, TerrainTransform::from_translation(Vec3::new(1.0, 0.0, 1.0)));
    }

    #[test]
    fn test_point_roundtrip_and_child() {
        let t = TerrainTransform::new(Vec3::new(5.0, 1.0, 5.0), Vec3::new(2.0, 0.5, 2.0));
        let p = Vec3::new(3.0, 8.0, 1.0);
        let w = t.transform_point(p);
        assert_eq!(w, Vec3::new(11.0, 5.0, 7.0));
        assert!(t.inverse_transform_point(w).abs_diff_eq(p, 1e-5));

        let child = t.child(Vec3::new(4.0, 0.0, 2.0));
        assert_eq!(child.translation, Vec3::new(13.0, 1.0, 9.0));
        assert_eq!(child.transform_point(Vec3::ZERO), t.transform_point(Vec3::new(4.0, 0.0, 2.0)));
    }

    #[test]
    fn test_world_aabb_with_negative_scale() {
        let t = TerrainTransform::new(Vec3::ZERO, Vec3::new(-1.0, 1.0, 1.0));
        let local = Aabb::from_min_max(Vec3::ZERO, Vec3::new(4.0, 2.0, 4.0));
        let (min, max) = t.world_min_max(&local);
        assert_eq!(min, Vec3::new(-4.0, 0.0, 0.0));
        assert_eq!(max, Vec3::new(0.0, 2.0, 4.0));
    }
}
