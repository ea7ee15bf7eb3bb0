//! Scene objects and their generator settings.

use std::f32::consts::PI;

use nalgebra::{Matrix4, Rotation3, Vector3};

use crate::mesh::Mesh;

/// Patch type of an object's surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchType {
    /// Plain polygon faces.
    #[default]
    Polygon,
    /// First spline patch type (unsupported; skipped at read time).
    Spline1,
    /// Second spline patch type (unsupported; skipped at read time).
    Spline2,
    /// Catmull-Clark subdivision surface.
    CatmullClark,
}

impl PatchType {
    /// Decode the file's integer patch type, if known.
    pub fn from_file_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(PatchType::Polygon),
            1 => Some(PatchType::Spline1),
            2 => Some(PatchType::Spline2),
            3 => Some(PatchType::CatmullClark),
            _ => None,
        }
    }
}

/// Mirroring mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MirrorMode {
    /// Mirroring disabled.
    #[default]
    None,
    /// Reflect geometry without joining it to the original.
    Split,
    /// Reflect geometry and stitch open boundary edges to their images.
    Connect,
}

/// The set of reflection axes, plus the local-space flag, decoded from the
/// file's bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MirrorAxes {
    /// Reflect across the YZ plane.
    pub x: bool,
    /// Reflect across the XZ plane.
    pub y: bool,
    /// Reflect across the XY plane.
    pub z: bool,
    /// Mirror in local space instead of parent space.
    pub local: bool,
}

impl MirrorAxes {
    /// Decode the file's axis bitmask (x = 1, y = 2, z = 4, local = 8).
    pub fn from_bits(bits: i32) -> Self {
        Self {
            x: bits & 1 != 0,
            y: bits & 2 != 0,
            z: bits & 4 != 0,
            local: bits & 8 != 0,
        }
    }
}

/// Per-object mirroring configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MirrorSettings {
    /// Mirroring mode.
    pub mode: MirrorMode,
    /// Axes to reflect across.
    pub axes: MirrorAxes,
    /// Maximum stitch distance for connect mode, if limited.
    pub distance: Option<f32>,
}

/// Revolve axis for the lathe generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatheAxis {
    /// Revolve around the X axis.
    X,
    /// Revolve around the Y axis.
    #[default]
    Y,
    /// Revolve around the Z axis.
    Z,
}

impl LatheAxis {
    /// Decode the file's integer axis value, if known.
    pub fn from_file_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(LatheAxis::X),
            1 => Some(LatheAxis::Y),
            2 => Some(LatheAxis::Z),
            _ => None,
        }
    }
}

/// Per-object lathe (rotational sweep) configuration.
///
/// The only revolve the format produces is the double-sided kind, so the
/// mode reduces to enabled or not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatheSettings {
    /// Whether the revolve is enabled.
    pub enabled: bool,
    /// The revolve axis.
    pub axis: LatheAxis,
    /// Number of ring segments.
    pub segments: usize,
}

impl Default for LatheSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            axis: LatheAxis::Y,
            segments: 12,
        }
    }
}

/// An object in the scene: transform, generator settings, and (usually)
/// a mesh.
#[derive(Debug, Clone)]
pub struct SceneObject {
    /// Object name.
    pub name: String,
    /// Parent object name, resolved from the file's depth markers.
    pub parent: Option<String>,
    /// Local translation.
    pub translation: Vector3<f32>,
    /// Local rotation in radians (stored Y/X/Z Euler angles).
    pub rotation: Vector3<f32>,
    /// Local non-uniform scale.
    pub scale: Vector3<f32>,
    /// Smoothing angle in radians; `None` disables normal smoothing.
    pub smooth_angle: Option<f32>,
    /// Whether the object is visible in the modeler.
    pub visible: bool,
    /// Patch type.
    pub patch_type: PatchType,
    /// Subdivision pass count for Catmull-Clark objects.
    pub patch_segments: usize,
    /// Mirroring configuration, if the file declares any mirror key.
    pub mirror: Option<MirrorSettings>,
    /// Lathe configuration, if the file declares any lathe key.
    pub lathe: Option<LatheSettings>,
    /// Whether any face corner carries a non-opaque vertex color.
    pub has_alpha_vertex_color: bool,
    /// The object's mesh, if it has geometry.
    pub mesh: Option<Mesh>,
}

impl SceneObject {
    /// Create an object with the format's defaults: visible, polygon
    /// patch type, unit scale, smoothing over the full angle range.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            parent: None,
            translation: Vector3::zeros(),
            rotation: Vector3::zeros(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            smooth_angle: Some(PI),
            visible: true,
            patch_type: PatchType::Polygon,
            patch_segments: 0,
            mirror: None,
            lathe: None,
            has_alpha_vertex_color: false,
            mesh: None,
        }
    }

    /// The object's local transform: translation, then Y/X/Z rotation,
    /// applied over the non-uniform scale.
    pub fn local_transform(&self) -> Matrix4<f32> {
        let rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), self.rotation.y)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), self.rotation.x)
            * Rotation3::from_axis_angle(&Vector3::z_axis(), self.rotation.z);

        Matrix4::new_translation(&self.translation)
            * rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }

    /// Cosine threshold below which neighboring face normals stop
    /// contributing to a smoothed vertex normal.
    ///
    /// The cutoff sits 10% past the smoothing angle (clamped to a half
    /// turn), giving the weight curve room to fall off.
    pub fn smooth_falloff(&self) -> Option<f32> {
        self.smooth_angle.map(|angle| (angle * 1.1).min(PI).cos())
    }

    /// Get the mirror settings, creating defaults on first access.
    pub fn mirror_settings_mut(&mut self) -> &mut MirrorSettings {
        self.mirror.get_or_insert_with(MirrorSettings::default)
    }

    /// Get the lathe settings, creating defaults on first access.
    pub fn lathe_settings_mut(&mut self) -> &mut LatheSettings {
        self.lathe.get_or_insert_with(LatheSettings::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_mirror_axes_bitmask() {
        let axes = MirrorAxes::from_bits(1 | 4 | 8);
        assert!(axes.x && !axes.y && axes.z && axes.local);
    }

    #[test]
    fn test_transform_scales_before_translating() {
        let mut object = SceneObject::new("box");
        object.translation = Vector3::new(10.0, 0.0, 0.0);
        object.scale = Vector3::new(2.0, 1.0, 1.0);

        let p = object
            .local_transform()
            .transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((p - Point3::new(12.0, 0.0, 0.0)).norm() < 1e-5);
    }

    #[test]
    fn test_transform_rotation_order_yaw_first_outermost() {
        // 90° yaw maps +X to -Z after the inner rotations.
        let mut object = SceneObject::new("rot");
        object.rotation = Vector3::new(0.0, PI / 2.0, 0.0);

        let p = object
            .local_transform()
            .transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((p - Point3::new(0.0, 0.0, -1.0)).norm() < 1e-5);
    }

    #[test]
    fn test_smooth_falloff_clamps_at_half_turn() {
        let mut object = SceneObject::new("smooth");
        object.smooth_angle = Some(PI);
        let falloff = object.smooth_falloff().unwrap();
        assert!((falloff - (-1.0)).abs() < 1e-6);

        object.smooth_angle = None;
        assert!(object.smooth_falloff().is_none());
    }
}
