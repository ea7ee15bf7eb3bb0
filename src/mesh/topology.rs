//! Face-vertex mesh topology.
//!
//! This module provides the mesh representation produced by the scene
//! reader and consumed by the generator stages: dense, append-only vertex
//! and face arrays with per-corner [`Channel`] attributes, plus edge
//! adjacency that is materialized on demand.
//!
//! # Structure
//!
//! - Vertices and faces live in dense arrays owned by the [`Mesh`]; every
//!   cross-reference (vertex→face, face→vertex, edge→face, …) is a plain
//!   index into those arrays, so the graph contains no ownership cycles.
//! - A face holds 2–4 vertices. Two-vertex faces are degenerate profile
//!   edges that seed the lathe generator; they are never triangulated and
//!   are tracked in a side list filtered at append time.
//! - Edge adjacency is only needed by mirror stitching and subdivision, so
//!   it is not maintained incrementally: [`Mesh::generate_edges`] builds it
//!   from the current face list, deduplicating on the unordered pair of
//!   vertex indices. Any face mutation afterwards invalidates the edge
//!   arrays; callers regenerate before relying on them.

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};

use crate::error::{MqError, Result};

use super::channel::Channel;

/// A vertex in the mesh.
///
/// Vertex indices are dense and stable for the lifetime of a mesh:
/// vertices are appended, never removed.
#[derive(Debug, Clone)]
pub struct Vertex {
    /// Index of this vertex in [`Mesh::vertices`].
    pub index: usize,

    /// The 3D position. Mutable: positions are rewritten during
    /// world-to-local conversion and read back by the generators.
    pub position: Point3<f32>,

    /// Indices of the faces using this vertex.
    pub faces: Vec<usize>,

    /// Indices of the edges touching this vertex.
    /// Populated only after [`Mesh::generate_edges`].
    pub edges: Vec<usize>,
}

/// An undirected edge between two vertices.
///
/// An edge incident to exactly one face is a boundary edge; two faces is
/// an interior edge. More than two occurs only in non-manifold input (and
/// for the doubled faces emitted by the lathe generator).
#[derive(Debug, Clone)]
pub struct Edge {
    /// The two endpoint vertex indices.
    pub vertices: [usize; 2],

    /// Indices of the faces using this edge.
    pub faces: Vec<usize>,
}

impl Edge {
    /// Get the endpoint opposite to `vertex`.
    #[inline]
    pub fn other_side(&self, vertex: usize) -> usize {
        if self.vertices[0] == vertex {
            self.vertices[1]
        } else {
            self.vertices[0]
        }
    }

    /// Whether this edge lies on a boundary (exactly one incident face).
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.faces.len() == 1
    }
}

/// Material and attribute-presence data shared by all corners of a face.
///
/// Generator stages copy these verbatim from a source face onto every face
/// they derive from it.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaceAttributes {
    /// Index of the face's material in the scene material list.
    pub material: Option<usize>,
    /// Whether the face carries texture coordinates.
    pub has_texcoord: bool,
    /// Whether the face carries vertex colors.
    pub has_vertex_color: bool,
    /// Whether any corner of the face carries bone weights.
    pub has_bone_weights: bool,
}

/// A face in the mesh: an ordered ring of 2–4 vertices with one
/// [`Channel`] per corner.
#[derive(Debug, Clone)]
pub struct Face {
    /// Ordered vertex indices (2, 3, or 4 entries).
    pub vertices: Vec<usize>,

    /// Per-corner attributes, parallel to `vertices`.
    pub channels: Vec<Channel>,

    /// Edge indices aligned with `vertices` (edge `i` joins corner `i` to
    /// corner `i+1`). Empty until [`Mesh::generate_edges`] runs.
    pub edges: Vec<usize>,

    /// Material and attribute-presence flags.
    pub attributes: FaceAttributes,

    /// Face normal, computed by the mesh builder.
    pub normal: Vector3<f32>,
}

impl Default for Face {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            channels: Vec::new(),
            edges: Vec::new(),
            attributes: FaceAttributes::default(),
            normal: Vector3::zeros(),
        }
    }
}

impl Face {
    /// Whether this is a degenerate two-vertex lathe seed.
    #[inline]
    pub fn is_lathe_seed(&self) -> bool {
        self.vertices.len() == 2
    }

    /// The corner index following `corner` around the face.
    #[inline]
    pub fn next_corner(&self, corner: usize) -> usize {
        if corner < self.vertices.len() - 1 {
            corner + 1
        } else {
            0
        }
    }

    /// The channel value at the midpoint of the edge leaving `corner`.
    pub fn edge_channel(&self, corner: usize) -> Channel {
        let next = self.next_corner(corner);
        Channel::midpoint(&self.channels[corner], &self.channels[next])
    }

    /// The channel value at the face centroid (equal per-corner weights).
    pub fn center_channel(&self) -> Channel {
        Channel::blend(&self.channels)
    }
}

/// A mesh: dense vertex and face arrays plus on-demand edge adjacency.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    faces: Vec<Face>,
    lathe_faces: Vec<usize>,
    edges: Vec<Edge>,
    edge_map: HashMap<(usize, usize), usize>,
}

impl Mesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with pre-allocated vertex capacity.
    pub fn with_capacity(num_vertices: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(num_vertices),
            ..Self::default()
        }
    }

    // ==================== Accessors ====================

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// All vertices, in index order.
    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// All faces, in index order.
    #[inline]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// All edges. Empty until [`Mesh::generate_edges`] runs.
    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Indices of the two-vertex lathe seed faces.
    #[inline]
    pub fn lathe_faces(&self) -> &[usize] {
        &self.lathe_faces
    }

    /// Get a vertex by index.
    #[inline]
    pub fn vertex(&self, index: usize) -> &Vertex {
        &self.vertices[index]
    }

    /// Get a face by index.
    #[inline]
    pub fn face(&self, index: usize) -> &Face {
        &self.faces[index]
    }

    /// Get a mutable face by index.
    #[inline]
    pub fn face_mut(&mut self, index: usize) -> &mut Face {
        &mut self.faces[index]
    }

    /// Get an edge by index.
    #[inline]
    pub fn edge(&self, index: usize) -> &Edge {
        &self.edges[index]
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, vertex: usize) -> Point3<f32> {
        self.vertices[vertex].position
    }

    /// Set the position of a vertex.
    #[inline]
    pub fn set_position(&mut self, vertex: usize, position: Point3<f32>) {
        self.vertices[vertex].position = position;
    }

    // ==================== Construction ====================

    /// Append a vertex at the given position and return its index.
    pub fn add_position(&mut self, position: Point3<f32>) -> usize {
        let index = self.vertices.len();
        self.vertices.push(Vertex {
            index,
            position,
            faces: Vec::new(),
            edges: Vec::new(),
        });
        index
    }

    /// Append a face over the given vertex indices and return its index.
    ///
    /// Corner channels are default-initialized; two-vertex faces are also
    /// recorded in the lathe seed list.
    pub fn add_face(&mut self, vertices: &[usize]) -> usize {
        debug_assert!(
            (2..=4).contains(&vertices.len()),
            "face must have 2-4 vertices, got {}",
            vertices.len()
        );

        let face_index = self.faces.len();
        self.faces.push(Face {
            vertices: vertices.to_vec(),
            channels: vec![Channel::default(); vertices.len()],
            ..Face::default()
        });

        for &v in vertices {
            self.vertices[v].faces.push(face_index);
        }

        if vertices.len() == 2 {
            self.lathe_faces.push(face_index);
        }

        face_index
    }

    // ==================== Edge information ====================

    /// Build edge adjacency from the current face list.
    ///
    /// Edges are deduplicated on the unordered pair of endpoint indices;
    /// vertex and face edge lists are rebuilt from scratch. A two-vertex
    /// face contributes its single edge twice (once per traversal
    /// direction), so that edge counts two incident face entries and is
    /// not treated as a boundary.
    pub fn generate_edges(&mut self) {
        self.edges.clear();
        self.edge_map.clear();

        for vertex in &mut self.vertices {
            vertex.edges.clear();
        }

        for face_index in 0..self.faces.len() {
            let corner_count = self.faces[face_index].vertices.len();
            let mut face_edges = Vec::with_capacity(corner_count);

            for corner in 0..corner_count {
                let next = if corner < corner_count - 1 { corner + 1 } else { 0 };
                let v0 = self.faces[face_index].vertices[corner];
                let v1 = self.faces[face_index].vertices[next];

                let edge_index = self.intern_edge(v0, v1);
                self.edges[edge_index].faces.push(face_index);
                face_edges.push(edge_index);
            }

            self.faces[face_index].edges = face_edges;
        }
    }

    /// Whether edge information has been generated.
    #[inline]
    pub fn has_edges(&self) -> bool {
        !self.edges.is_empty()
    }

    /// Get (or create) the edge between two vertices.
    fn intern_edge(&mut self, v0: usize, v1: usize) -> usize {
        let key = if v0 < v1 { (v0, v1) } else { (v1, v0) };

        if let Some(&index) = self.edge_map.get(&key) {
            return index;
        }

        let index = self.edges.len();
        self.edges.push(Edge {
            vertices: [v0, v1],
            faces: Vec::new(),
        });
        self.vertices[v0].edges.push(index);
        self.vertices[v1].edges.push(index);
        self.edge_map.insert(key, index);

        index
    }

    /// Find the edge of `face` joining the corners at local indices
    /// `corner0` and `corner1`.
    ///
    /// Failing to find it means the face's edge array is out of step with
    /// its vertex array, which is a construction bug.
    pub fn face_edge_between(&self, face: usize, corner0: usize, corner1: usize) -> Result<usize> {
        let face = &self.faces[face];
        let va = face.vertices[corner0];
        let vb = face.vertices[corner1];

        for &edge_index in &face.edges {
            let ends = self.edges[edge_index].vertices;
            if (ends[0] == va && ends[1] == vb) || (ends[0] == vb && ends[1] == va) {
                return Ok(edge_index);
            }
        }

        Err(MqError::Consistency(format!(
            "edge between corners {corner0} and {corner1} not found on face"
        )))
    }

    /// Find the local corner indices of `edge` on `face`, as the pair
    /// (corner, preceding corner) in face winding order.
    pub fn edge_local_indices(&self, face: usize, edge: usize) -> Result<(usize, usize)> {
        let ends = self.edges[edge].vertices;
        let face = &self.faces[face];

        let mut prev = face.vertices.len() - 1;
        for corner in 0..face.vertices.len() {
            let va = face.vertices[corner];
            let vb = face.vertices[prev];
            if (va == ends[0] && vb == ends[1]) || (va == ends[1] && vb == ends[0]) {
                return Ok((corner, prev));
            }
            prev = corner;
        }

        Err(MqError::Consistency(
            "edge does not belong to the given face".to_string(),
        ))
    }

    // ==================== Geometry queries ====================

    /// The arithmetic mean of a face's corner positions.
    pub fn face_center(&self, face: usize) -> Point3<f32> {
        let face = &self.faces[face];
        let mut sum = Vector3::zeros();
        for &v in &face.vertices {
            sum += self.vertices[v].position.coords;
        }
        Point3::from(sum / face.vertices.len() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_quads() -> Mesh {
        // Two quads sharing the edge (1, 2).
        let mut mesh = Mesh::new();
        for p in [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [2.0, 0.0, 0.0],
            [2.0, 1.0, 0.0],
        ] {
            mesh.add_position(Point3::new(p[0], p[1], p[2]));
        }
        mesh.add_face(&[0, 1, 2, 3]);
        mesh.add_face(&[1, 4, 5, 2]);
        mesh
    }

    #[test]
    fn test_add_face_wires_back_references() {
        let mesh = two_quads();
        assert_eq!(mesh.vertex(1).faces, vec![0, 1]);
        assert_eq!(mesh.vertex(4).faces, vec![1]);
        assert!(mesh.lathe_faces().is_empty());
    }

    #[test]
    fn test_two_vertex_face_is_lathe_seed() {
        let mut mesh = Mesh::new();
        mesh.add_position(Point3::origin());
        mesh.add_position(Point3::new(1.0, 0.0, 0.0));
        let face = mesh.add_face(&[0, 1]);
        assert_eq!(mesh.lathe_faces(), &[face]);
        assert!(mesh.face(face).is_lathe_seed());
    }

    #[test]
    fn test_generate_edges_deduplicates_shared_edge() {
        let mut mesh = two_quads();
        mesh.generate_edges();

        // 4 + 4 edges with one shared: 7 unique.
        assert_eq!(mesh.edges().len(), 7);

        let shared = mesh.face_edge_between(0, 1, 2).unwrap();
        assert_eq!(mesh.edge(shared).faces, vec![0, 1]);
        assert!(!mesh.edge(shared).is_boundary());

        let boundary = mesh.face_edge_between(0, 0, 1).unwrap();
        assert!(mesh.edge(boundary).is_boundary());
    }

    #[test]
    fn test_lathe_seed_edge_counts_twice() {
        let mut mesh = Mesh::new();
        mesh.add_position(Point3::origin());
        mesh.add_position(Point3::new(1.0, 0.0, 0.0));
        mesh.add_face(&[0, 1]);
        mesh.generate_edges();

        // The seed face walks its single edge in both directions.
        assert_eq!(mesh.edges().len(), 1);
        assert_eq!(mesh.edge(0).faces.len(), 2);
        assert!(!mesh.edge(0).is_boundary());
    }

    #[test]
    fn test_edge_local_indices_matches_winding() {
        let mut mesh = two_quads();
        mesh.generate_edges();

        let edge = mesh.face_edge_between(0, 1, 2).unwrap();
        let (corner, prev) = mesh.edge_local_indices(0, edge).unwrap();
        assert_eq!((corner, prev), (2, 1));
    }

    #[test]
    fn test_edge_lookup_on_wrong_face_is_consistency_error() {
        let mut mesh = two_quads();
        mesh.generate_edges();

        // Edge (0, 3) belongs to face 0 only.
        let edge = mesh.face_edge_between(0, 3, 0).unwrap();
        let err = mesh.edge_local_indices(1, edge).unwrap_err();
        assert!(matches!(err, MqError::Consistency(_)));
    }

    #[test]
    fn test_face_center_is_corner_mean() {
        let mesh = two_quads();
        let center = mesh.face_center(0);
        assert!((center - Point3::new(0.5, 0.5, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn test_regeneration_rebuilds_vertex_edge_lists() {
        let mut mesh = two_quads();
        mesh.generate_edges();
        let before = mesh.vertex(1).edges.len();

        mesh.generate_edges();
        assert_eq!(mesh.vertex(1).edges.len(), before);
    }
}
