//! Render-geometry assembly.
//!
//! The mesh builder consumes a fully-generated mesh and emits draw-ready
//! batches. Faces with the same material and the same set of optional
//! vertex channels land in the same batch; everything else is split so
//! every batch is homogeneous. Within a batch each triangle corner becomes
//! a vertex entry carrying the position index, a (possibly smoothed)
//! normal, and whichever channel values the batch's signature requires.
//!
//! Vertex entries are plain equality-comparable values; merging exact
//! duplicates is left to the downstream mesh assembly.

use std::collections::HashMap;

use nalgebra::{Point3, Vector2, Vector3};

use crate::error::{MqError, Result};
use crate::mesh::{BoneWeight, Face, Mesh, Rgba};

/// Batch index cap under 16-bit indexing. Stops short of 65,535 because
/// some GPUs reserve it as a strip-restart index; a batch is sealed when
/// the next triangle would push it past this cap.
const MAX_BATCH_INDICES: usize = 65_530;

/// Squared length under which a cross product is considered degenerate.
const DEGENERATE_NORMAL_SQ: f32 = 1e-12;

/// Which optional per-corner channels a batch's vertices carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AttributeSignature {
    /// Texture coordinates are present.
    pub has_texcoord: bool,
    /// Vertex colors are present.
    pub has_vertex_color: bool,
    /// Bone weights are present.
    pub has_bone_weights: bool,
}

impl AttributeSignature {
    /// The signature of a face's attribute flags.
    pub fn from_face(face: &Face) -> Self {
        Self {
            has_texcoord: face.attributes.has_texcoord,
            has_vertex_color: face.attributes.has_vertex_color,
            has_bone_weights: face.attributes.has_bone_weights,
        }
    }

    /// Pack the signature into a comparable key.
    ///
    /// Bone weights contribute 5, overlapping the texcoord bit: skinned
    /// vertices always need a texture-coordinate channel, so the two
    /// cases must share batches.
    pub fn key(&self) -> u32 {
        let mut key = if self.has_texcoord { 1 } else { 0 };
        if self.has_vertex_color {
            key |= 2;
        }
        if self.has_bone_weights {
            key |= 5;
        }
        key
    }

    /// Whether batch vertices carry a texture-coordinate channel.
    pub fn emits_texcoord(&self) -> bool {
        self.has_texcoord || self.has_bone_weights
    }
}

/// One output vertex entry in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchVertex {
    /// Index into the built position buffer.
    pub position_index: usize,
    /// Vertex normal (smoothed when the object enables smoothing).
    pub normal: Vector3<f32>,
    /// Texture coordinate, present per the batch signature.
    pub texcoord: Option<Vector2<f32>>,
    /// Vertex color, present per the batch signature.
    pub color: Option<Rgba>,
    /// Bone weights, present per the batch signature.
    pub weights: Option<Vec<BoneWeight>>,
}

/// A material/attribute-homogeneous draw batch.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Index of the batch's material in the scene material list.
    pub material: Option<usize>,
    /// The optional channels every vertex in this batch carries.
    pub signature: AttributeSignature,
    /// Vertex entries referenced by `indices`.
    pub vertices: Vec<BatchVertex>,
    /// Triangle-list indices into `vertices`.
    pub indices: Vec<u32>,
}

impl Batch {
    fn new(material: Option<usize>, signature: AttributeSignature) -> Self {
        Self {
            material,
            signature,
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }
}

/// The builder's output: the position buffer plus the batches over it.
#[derive(Debug, Clone)]
pub struct BuiltMesh {
    /// Ordered vertex-position buffer.
    pub positions: Vec<Point3<f32>>,
    /// All batches, in creation order.
    pub batches: Vec<Batch>,
}

/// Assembles batched render geometry from a mesh.
///
/// Usage is `begin` → `add_mesh` → `finish`; beginning again before
/// finishing is a usage error.
pub struct MeshBuilder {
    use_sixteen_bit_indices: bool,
    building: Option<BuildState>,
}

struct BuildState {
    positions: Vec<Point3<f32>>,
    batches: Vec<Batch>,
    open_batches: HashMap<(Option<usize>, u32), usize>,
}

impl MeshBuilder {
    /// Create a builder. With `use_sixteen_bit_indices` set, batches are
    /// split whenever their index count reaches the 16-bit safety cap.
    pub fn new(use_sixteen_bit_indices: bool) -> Self {
        Self {
            use_sixteen_bit_indices,
            building: None,
        }
    }

    /// Start a build.
    pub fn begin(&mut self) -> Result<()> {
        if self.building.is_some() {
            return Err(MqError::Consistency(
                "mesh builder begun twice without finishing".to_string(),
            ));
        }
        self.building = Some(BuildState {
            positions: Vec::new(),
            batches: Vec::new(),
            open_batches: HashMap::new(),
        });
        Ok(())
    }

    /// Finish the build and return the batched geometry.
    pub fn finish(&mut self) -> Result<BuiltMesh> {
        let state = self.building.take().ok_or_else(|| {
            MqError::Consistency("mesh builder finished without beginning".to_string())
        })?;
        Ok(BuiltMesh {
            positions: state.positions,
            batches: state.batches,
        })
    }

    /// Triangulate and batch a mesh.
    ///
    /// `smooth_falloff` is the cosine cutoff for normal smoothing; `None`
    /// emits flat face normals.
    pub fn add_mesh(&mut self, mesh: &mut Mesh, smooth_falloff: Option<f32>) -> Result<()> {
        // Face normals and per-vertex adjacency, recorded while
        // triangulating. Vertex normals blend from the original polygon
        // normals, not from the triangulated faces.
        let mut vertex_faces: Vec<Vec<usize>> = vec![Vec::new(); mesh.num_vertices()];
        let mut triangles: Vec<(usize, [usize; 3])> = Vec::with_capacity(mesh.num_faces() * 2);

        for face_index in 0..mesh.num_faces() {
            if mesh.face(face_index).is_lathe_seed() {
                continue;
            }

            let normal = face_normal(mesh, face_index);
            mesh.face_mut(face_index).normal = normal;

            for &vertex in &mesh.face(face_index).vertices {
                vertex_faces[vertex].push(face_index);
            }

            triangles.push((face_index, [0, 1, 2]));
            if mesh.face(face_index).vertices.len() == 4 {
                triangles.push((face_index, [2, 3, 0]));
            }
        }

        let use_sixteen_bit_indices = self.use_sixteen_bit_indices;
        let state = self.building.as_mut().ok_or_else(|| {
            MqError::Consistency("mesh builder used before begin".to_string())
        })?;

        // Append every position; batch entries index from `base`.
        let base = state.positions.len();
        for vertex in 0..mesh.num_vertices() {
            state.positions.push(mesh.position(vertex));
        }

        for (face_index, corners) in triangles {
            let face = mesh.face(face_index);
            let signature = AttributeSignature::from_face(face);
            let material = face.attributes.material;

            // One batch per triangle; splitting happens only between
            // triangles, never across one.
            let batch_index = resolve_batch(state, material, signature, use_sixteen_bit_indices);

            for corner in corners {
                let vertex = face.vertices[corner];
                let normal = smoothed_normal(
                    mesh,
                    face.normal,
                    &vertex_faces[vertex],
                    smooth_falloff,
                );

                let channel = &face.channels[corner];
                let entry = BatchVertex {
                    position_index: base + vertex,
                    normal,
                    texcoord: signature.emits_texcoord().then_some(channel.texcoord),
                    color: signature.has_vertex_color.then_some(channel.color),
                    weights: if signature.has_bone_weights {
                        channel.weights.clone()
                    } else {
                        None
                    },
                };

                let batch = &mut state.batches[batch_index];
                let index = batch.vertices.len() as u32;
                batch.vertices.push(entry);
                batch.indices.push(index);
            }
        }

        Ok(())
    }
}

/// Find the open batch for a (material, signature) key, sealing and
/// replacing it when the next triangle would push it past the 16-bit
/// index cap.
fn resolve_batch(
    state: &mut BuildState,
    material: Option<usize>,
    signature: AttributeSignature,
    use_sixteen_bit_indices: bool,
) -> usize {
    let key = (material, signature.key());

    if let Some(&index) = state.open_batches.get(&key) {
        if use_sixteen_bit_indices && state.batches[index].indices.len() + 3 > MAX_BATCH_INDICES {
            state.open_batches.remove(&key);
        } else {
            return index;
        }
    }

    let index = state.batches.len();
    state.batches.push(Batch::new(material, signature));
    state.open_batches.insert(key, index);
    index
}

/// Compute a face normal as the normalized sum of per-corner cross
/// products. Averaging over the corners keeps non-planar quads honest and
/// lets degenerate (near-zero) edges drop out.
fn face_normal(mesh: &Mesh, face_index: usize) -> Vector3<f32> {
    let vertices = &mesh.face(face_index).vertices;
    let count = vertices.len();

    let mut normal = Vector3::zeros();
    let mut prev = count - 1;
    for i in 0..count {
        let next = if i < count - 1 { i + 1 } else { 0 };
        let p_prev = mesh.position(vertices[prev]).coords;
        let p_cur = mesh.position(vertices[i]).coords;
        let p_next = mesh.position(vertices[next]).coords;

        let cross = (p_next - p_cur).cross(&(p_cur - p_prev));
        if cross.norm_squared() > DEGENERATE_NORMAL_SQ {
            normal += cross.normalize();
        }
        prev = i;
    }

    if normal.norm_squared() > DEGENERATE_NORMAL_SQ {
        normal.normalize()
    } else {
        normal
    }
}

/// Blend the face normals adjacent to a vertex into a smoothed normal.
///
/// Neighbors are admitted when their normal lies within the falloff cone
/// of this face's normal; each admitted neighbor is weighted by the
/// squared, clamped ramp `0.8 + (dot − falloff) / (1 − falloff)`. With no
/// admitted neighbor (or a vanishing sum) the flat face normal wins.
fn smoothed_normal(
    mesh: &Mesh,
    face_normal: Vector3<f32>,
    neighbor_faces: &[usize],
    smooth_falloff: Option<f32>,
) -> Vector3<f32> {
    let Some(falloff) = smooth_falloff else {
        return face_normal;
    };

    let ratio_factor = 1.0 / (1.0 - falloff);
    let mut normal = Vector3::zeros();
    let mut count = 0;

    for &neighbor in neighbor_faces {
        let neighbor_normal = mesh.face(neighbor).normal;
        let dot = face_normal.dot(&neighbor_normal);
        if dot > falloff {
            let t = (0.8 + (dot - falloff) * ratio_factor).clamp(0.0, 1.0);
            normal += neighbor_normal * (t * t);
            count += 1;
        }
    }

    if count == 0 || normal.norm_squared() < 1e-8 {
        return face_normal;
    }

    normal.normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn build(mesh: &mut Mesh, smooth_falloff: Option<f32>, sixteen_bit: bool) -> BuiltMesh {
        let mut builder = MeshBuilder::new(sixteen_bit);
        builder.begin().unwrap();
        builder.add_mesh(mesh, smooth_falloff).unwrap();
        builder.finish().unwrap()
    }

    fn unit_quad() -> Mesh {
        let mut mesh = Mesh::new();
        for p in [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ] {
            mesh.add_position(Point3::new(p[0], p[1], p[2]));
        }
        mesh.add_face(&[0, 1, 2, 3]);
        mesh
    }

    #[test]
    fn test_triangle_emits_one_triangle() {
        let mut mesh = Mesh::new();
        mesh.add_position(Point3::new(0.0, 0.0, 0.0));
        mesh.add_position(Point3::new(1.0, 0.0, 0.0));
        mesh.add_position(Point3::new(0.0, 1.0, 0.0));
        mesh.add_face(&[0, 1, 2]);

        let built = build(&mut mesh, None, true);
        assert_eq!(built.positions.len(), 3);
        assert_eq!(built.batches.len(), 1);
        assert_eq!(built.batches[0].indices.len(), 3);
    }

    #[test]
    fn test_quad_fans_into_two_triangles() {
        let mut mesh = unit_quad();
        let built = build(&mut mesh, None, true);

        let batch = &built.batches[0];
        assert_eq!(batch.indices.len(), 6);
        let refs: Vec<usize> = batch
            .indices
            .iter()
            .map(|&i| batch.vertices[i as usize].position_index)
            .collect();
        assert_eq!(refs, vec![0, 1, 2, 2, 3, 0]);
    }

    #[test]
    fn test_flat_normal_without_smoothing() {
        // The winding convention puts the front face toward -Z for a
        // counter-clockwise quad in the XY plane.
        let mut mesh = unit_quad();
        let built = build(&mut mesh, None, true);

        for vertex in &built.batches[0].vertices {
            assert!((vertex.normal - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-5);
        }
    }

    #[test]
    fn test_degenerate_corner_is_excluded_from_normal() {
        // Two coincident corners produce zero-length cross products; the
        // remaining corners still define the plane normal.
        let mut mesh = Mesh::new();
        mesh.add_position(Point3::new(0.0, 0.0, 0.0));
        mesh.add_position(Point3::new(0.0, 0.0, 0.0));
        mesh.add_position(Point3::new(1.0, 0.0, 0.0));
        mesh.add_position(Point3::new(0.0, 1.0, 0.0));
        mesh.add_face(&[0, 1, 2, 3]);

        let normal = face_normal(&mesh, 0);
        assert!((normal - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-5);
    }

    #[test]
    fn test_coplanar_smoothing_yields_common_normal() {
        // Two coplanar triangles sharing an edge; every dot product is 1,
        // well inside any permissive falloff.
        let mut mesh = Mesh::new();
        mesh.add_position(Point3::new(0.0, 0.0, 0.0));
        mesh.add_position(Point3::new(1.0, 0.0, 0.0));
        mesh.add_position(Point3::new(1.0, 1.0, 0.0));
        mesh.add_position(Point3::new(0.0, 1.0, 0.0));
        mesh.add_face(&[0, 1, 2]);
        mesh.add_face(&[0, 2, 3]);

        let falloff = (59.5_f32.to_radians() * 1.1).min(PI).cos();
        let built = build(&mut mesh, Some(falloff), true);

        for batch in &built.batches {
            for vertex in &batch.vertices {
                assert!((vertex.normal - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-5);
            }
        }
    }

    #[test]
    fn test_sharp_crease_keeps_flat_normals() {
        // Two faces at right angles with a tight smoothing cone: each
        // keeps its own face normal at the shared edge.
        let mut mesh = Mesh::new();
        mesh.add_position(Point3::new(0.0, 0.0, 0.0));
        mesh.add_position(Point3::new(1.0, 0.0, 0.0));
        mesh.add_position(Point3::new(1.0, 1.0, 0.0));
        mesh.add_position(Point3::new(1.0, 0.0, -1.0));
        mesh.add_face(&[0, 1, 2]);
        mesh.add_face(&[1, 0, 3]);

        let falloff = (10.0_f32.to_radians() * 1.1).min(PI).cos();
        let built = build(&mut mesh, Some(falloff), true);

        let batch = &built.batches[0];
        // First triangle's corners keep its -Z face normal.
        for &i in &batch.indices[0..3] {
            assert!(
                (batch.vertices[i as usize].normal - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-5
            );
        }
        // Second triangle's corners keep its own perpendicular normal.
        for &i in &batch.indices[3..6] {
            assert!(batch.vertices[i as usize].normal.z.abs() < 1e-5);
        }
    }

    #[test]
    fn test_batches_split_by_material_and_signature() {
        let mut mesh = unit_quad();
        mesh.add_position(Point3::new(2.0, 0.0, 0.0));
        mesh.add_position(Point3::new(3.0, 0.0, 0.0));
        mesh.add_position(Point3::new(3.0, 1.0, 0.0));
        mesh.add_face(&[4, 5, 6]);

        mesh.face_mut(0).attributes.material = Some(0);
        mesh.face_mut(1).attributes.material = Some(0);
        mesh.face_mut(1).attributes.has_texcoord = true;

        let built = build(&mut mesh, None, true);
        assert_eq!(built.batches.len(), 2);
        assert!(built.batches[1].signature.has_texcoord);
        assert!(built.batches[1].vertices[0].texcoord.is_some());
        assert!(built.batches[0].vertices[0].texcoord.is_none());
    }

    #[test]
    fn test_bone_weights_force_texcoord_channel() {
        let mut mesh = unit_quad();
        mesh.face_mut(0).attributes.has_bone_weights = true;
        mesh.face_mut(0).channels[0].weights = Some(vec![BoneWeight {
            bone: "root".into(),
            weight: 1.0,
        }]);

        let built = build(&mut mesh, None, true);
        let batch = &built.batches[0];

        assert!(batch.signature.emits_texcoord());
        assert!(batch.vertices[0].texcoord.is_some());
        assert!(batch.vertices[0].weights.is_some());

        // The packed key overlaps the texcoord bit on purpose.
        let weighted = AttributeSignature {
            has_bone_weights: true,
            ..AttributeSignature::default()
        };
        assert_eq!(weighted.key(), 5);
        let weighted_and_textured = AttributeSignature {
            has_texcoord: true,
            has_bone_weights: true,
            ..AttributeSignature::default()
        };
        assert_eq!(weighted_and_textured.key(), 5);
    }

    #[test]
    fn test_sixteen_bit_cap_splits_batches() {
        // 21,844 triangles on one key produce 65,532 indices, more than
        // one capped batch can hold.
        let mut mesh = Mesh::new();
        mesh.add_position(Point3::new(0.0, 0.0, 0.0));
        mesh.add_position(Point3::new(1.0, 0.0, 0.0));
        mesh.add_position(Point3::new(0.0, 1.0, 0.0));
        for _ in 0..21_844 {
            mesh.add_face(&[0, 1, 2]);
        }

        let built = build(&mut mesh, None, true);
        assert_eq!(built.batches.len(), 2);
        for batch in &built.batches {
            assert!(batch.indices.len() <= MAX_BATCH_INDICES);
        }
        assert_eq!(built.batches[0].indices.len(), 65_529);
        let total: usize = built.batches.iter().map(|b| b.indices.len()).sum();
        assert_eq!(total, 65_532);
    }

    #[test]
    fn test_without_cap_one_batch_grows() {
        let mut mesh = Mesh::new();
        mesh.add_position(Point3::new(0.0, 0.0, 0.0));
        mesh.add_position(Point3::new(1.0, 0.0, 0.0));
        mesh.add_position(Point3::new(0.0, 1.0, 0.0));
        for _ in 0..21_844 {
            mesh.add_face(&[0, 1, 2]);
        }

        let built = build(&mut mesh, None, false);
        assert_eq!(built.batches.len(), 1);
    }

    #[test]
    fn test_begin_twice_is_an_error() {
        let mut builder = MeshBuilder::new(true);
        builder.begin().unwrap();
        let err = builder.begin().unwrap_err();
        assert!(matches!(err, MqError::Consistency(_)));
    }

    #[test]
    fn test_add_before_begin_is_an_error() {
        let mut builder = MeshBuilder::new(true);
        let mut mesh = unit_quad();
        let err = builder.add_mesh(&mut mesh, None).unwrap_err();
        assert!(matches!(err, MqError::Consistency(_)));
    }

    #[test]
    fn test_vertex_entries_are_equality_comparable() {
        let mut mesh = unit_quad();
        let built = build(&mut mesh, None, true);
        let batch = &built.batches[0];

        // The fan shares corners 0 and 2 between its two triangles; the
        // duplicated entries compare equal, which is what downstream
        // deduplication relies on.
        assert_eq!(batch.vertices[0], batch.vertices[5]);
        assert_eq!(batch.vertices[2], batch.vertices[3]);
    }
}
