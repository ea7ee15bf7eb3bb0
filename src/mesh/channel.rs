//! Per-corner attribute channels.
//!
//! Every face corner carries a [`Channel`]: a texture coordinate, an RGBA
//! vertex color, and an optional sparse list of bone weights. Channels are
//! interpolated when generator stages synthesize new corners (edge
//! midpoints and face centroids during subdivision).

use nalgebra::{Vector2, Vector4};

/// An RGBA color with 8-bit components.
///
/// The file format stores colors as a packed 32-bit little-endian integer
/// with red in the low byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba {
    /// Red component.
    pub r: u8,
    /// Green component.
    pub g: u8,
    /// Blue component.
    pub b: u8,
    /// Alpha component (255 = fully opaque).
    pub a: u8,
}

impl Rgba {
    /// Create a color from its components.
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Decode the packed integer representation (R in the low byte).
    pub fn from_packed(value: u32) -> Self {
        Self {
            r: (value & 0xff) as u8,
            g: ((value >> 8) & 0xff) as u8,
            b: ((value >> 16) & 0xff) as u8,
            a: ((value >> 24) & 0xff) as u8,
        }
    }

    /// Convert to a normalized `[0, 1]` vector (r, g, b, a).
    pub fn to_vector4(self) -> Vector4<f32> {
        Vector4::new(
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            f32::from(self.a) / 255.0,
        )
    }

    /// Convert from a normalized vector, clamping each component to `[0, 1]`.
    pub fn from_vector4(v: Vector4<f32>) -> Self {
        let quantize = |x: f32| (x.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self {
            r: quantize(v.x),
            g: quantize(v.y),
            b: quantize(v.z),
            a: quantize(v.w),
        }
    }

    /// Linear interpolation between two colors.
    pub fn lerp(a: Rgba, b: Rgba, t: f32) -> Rgba {
        Rgba::from_vector4(a.to_vector4().lerp(&b.to_vector4(), t))
    }
}

/// A single (bone name, weight) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneWeight {
    /// Name of the bone.
    pub bone: String,
    /// Influence weight.
    pub weight: f32,
}

/// Per-corner vertex attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// 2D texture coordinate.
    pub texcoord: Vector2<f32>,
    /// Vertex color.
    pub color: Rgba,
    /// Sparse bone weights; `None` when the corner carries no skinning data.
    pub weights: Option<Vec<BoneWeight>>,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            texcoord: Vector2::zeros(),
            color: Rgba::default(),
            weights: None,
        }
    }
}

impl Channel {
    /// Accumulate a scaled bone weight into a weight list.
    ///
    /// Weights for the same bone add together, so blending a corner from
    /// several sources that reference one bone yields its summed influence.
    pub fn accumulate_weight(weights: &mut Vec<BoneWeight>, bone: &str, weight: f32) {
        for entry in weights.iter_mut() {
            if entry.bone == bone {
                entry.weight += weight;
                return;
            }
        }
        weights.push(BoneWeight {
            bone: bone.to_string(),
            weight,
        });
    }

    /// The channel value at the midpoint between two corners.
    pub fn midpoint(a: &Channel, b: &Channel) -> Channel {
        let mut out = Channel {
            texcoord: a.texcoord.lerp(&b.texcoord, 0.5),
            color: Rgba::lerp(a.color, b.color, 0.5),
            weights: None,
        };

        if a.weights.is_some() || b.weights.is_some() {
            let mut weights = Vec::new();
            for source in [a, b] {
                if let Some(list) = &source.weights {
                    for bw in list {
                        Self::accumulate_weight(&mut weights, &bw.bone, bw.weight * 0.5);
                    }
                }
            }
            out.weights = Some(weights);
        }

        out
    }

    /// The channel value at the centroid of a set of corners, each corner
    /// contributing with equal weight.
    pub fn blend(corners: &[Channel]) -> Channel {
        let factor = 1.0 / corners.len() as f32;

        let mut texcoord = Vector2::zeros();
        let mut color = Vector4::zeros();
        let mut has_weights = false;
        for corner in corners {
            texcoord += corner.texcoord * factor;
            color += corner.color.to_vector4() * factor;
            has_weights |= corner.weights.is_some();
        }

        let mut out = Channel {
            texcoord,
            color: Rgba::from_vector4(color),
            weights: None,
        };

        if has_weights {
            let mut weights = Vec::new();
            for corner in corners {
                if let Some(list) = &corner.weights {
                    for bw in list {
                        Self::accumulate_weight(&mut weights, &bw.bone, bw.weight * factor);
                    }
                }
            }
            out.weights = Some(weights);
        }

        out
    }
}
