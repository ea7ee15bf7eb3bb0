//! Scene materials.

use nalgebra::{Vector3, Vector4};

/// A material parsed from the scene file.
///
/// The file stores a base color plus scalar factors; the derived
/// diffuse/emissive/specular values are computed once at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Material name.
    pub name: String,
    /// Diffuse color (base color scaled by the diffuse factor).
    pub diffuse: Vector3<f32>,
    /// Emissive color (base color scaled by the emissive factor).
    pub emissive: Vector3<f32>,
    /// Specular color (the specular factor on all components).
    pub specular: Vector3<f32>,
    /// Specular exponent.
    pub specular_power: f32,
    /// Opacity from the base color's alpha.
    pub alpha: f32,
    /// Whether faces using this material honor per-corner vertex colors.
    pub vertex_color_enabled: bool,
    /// Base texture path, if any.
    pub texture: Option<String>,
    /// Alpha-plane texture path, if any.
    pub alpha_texture: Option<String>,
    /// Bump texture path, if any.
    pub bump_texture: Option<String>,
}

impl Material {
    /// Build a material from the file's base color and scalar factors.
    pub fn from_factors(name: String, color: Vector4<f32>, dif: f32, emi: f32, spc: f32, power: f32) -> Self {
        let rgb = color.xyz();
        Self {
            name,
            diffuse: rgb * dif,
            emissive: rgb * emi,
            specular: Vector3::new(spc, spc, spc),
            specular_power: power,
            alpha: color.w,
            vertex_color_enabled: false,
            texture: None,
            alpha_texture: None,
            bump_texture: None,
        }
    }

    /// The shared default material used by faces with no material index:
    /// diffuse gray, zero specular.
    pub fn default_gray() -> Self {
        Self {
            name: "Default".to_string(),
            diffuse: Vector3::new(0.8, 0.8, 0.8),
            emissive: Vector3::zeros(),
            specular: Vector3::zeros(),
            specular_power: 5.0,
            alpha: 1.0,
            vertex_color_enabled: false,
            texture: None,
            alpha_texture: None,
            bump_texture: None,
        }
    }

    /// Whether any texture (base, alpha plane, or bump) is assigned.
    pub fn has_texture(&self) -> bool {
        self.texture.is_some() || self.alpha_texture.is_some() || self.bump_texture.is_some()
    }

    /// Replace a zero specular exponent with a usable value.
    ///
    /// A power of exactly 0 makes the specular term degenerate downstream.
    pub fn normalize_specular_power(&mut self) {
        if self.specular_power.abs() < 1e-5 {
            self.specular_power = 1.0;
        }
    }
}
