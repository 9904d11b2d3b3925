//! TRS transform: position, rotation (quaternion), scale.
//!
//! `Transform` is `Copy` and `Default`.  The runtime stores one local and
//! one world `Transform` per scene node; `.affine()` builds the 3×4 world
//! matrix that gets cached next to the node.

use glam::{Affine3A, Quat, Vec3};

/// Position / rotation / scale triple.
///
/// # Example
/// ```rust,ignore
/// use basalt_core::Transform;
/// use glam::Vec3;
///
/// let t = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
/// let m = t.affine(); // 3×4 model matrix
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Translation component.
    pub position: Vec3,
    /// Orientation as a unit quaternion.
    pub rotation: Quat,
    /// Non-uniform scale factor.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// No translation, no rotation, uniform scale 1.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Construct with a position, identity rotation and scale.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Build the 3×4 TRS matrix (`T * R * S`).
    #[inline]
    pub fn affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Rotate by `angle` radians around the given axis.
    pub fn rotate_axis(&mut self, axis: Vec3, angle: f32) {
        self.rotation = Quat::from_axis_angle(axis, angle) * self.rotation;
    }

    /// Forward direction (`−Z` rotated by the quaternion).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    #[test]
    fn identity_matrix() {
        let t = Transform::default();
        let m = Mat4::from(t.affine());
        assert!((m - Mat4::IDENTITY).abs_diff_eq(Mat4::ZERO, 1e-6));
    }

    #[test]
    fn translation_only() {
        let t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        let p = t.affine().transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn rotation_turns_forward() {
        let mut t = Transform::IDENTITY;
        t.rotate_axis(Vec3::Y, std::f32::consts::FRAC_PI_2);
        // Yaw of +90° turns −Z into −X.
        assert!((t.forward() - Vec3::NEG_X).length() < 1e-5);
    }
}
