//! One pass of Catmull-Clark subdivision.
//!
//! Consumes a mesh level and produces a new mesh in which every original
//! n-gon becomes n quads. Positions follow the classic face-point /
//! edge-point / vertex-point rules, with two departures that the source
//! geometry requires:
//!
//! - A boundary edge (exactly one incident face) subdivides at its plain
//!   midpoint, and a vertex touching any boundary edge keeps its original
//!   position (a crease).
//! - A vertex whose incident-face count differs from its incident-edge
//!   count sits on a doubled-face seam (mirrored or lathed geometry); the
//!   interior rule's edge weight is rescaled by the face/edge ratio so the
//!   doubled neighbors do not pull the vertex off the seam.
//!
//! Per-corner channels are interpolated for every generated face: edge
//! midpoints lerp the two adjacent corners, the face centroid blends all
//! corners equally, and bone weights accumulate additively per bone.

use nalgebra::{Point3, Vector3};

use crate::error::{MqError, Result};
use crate::mesh::Mesh;

/// Pass-scoped memo of the next-level vertex created for each entity.
struct LevelPoints {
    faces: Vec<Option<usize>>,
    edges: Vec<Option<usize>>,
    vertices: Vec<Option<usize>>,
}

impl LevelPoints {
    fn face(&self, index: usize) -> Result<usize> {
        self.faces[index].ok_or_else(|| {
            MqError::Consistency("face point missing during subdivision".to_string())
        })
    }

    fn edge(&self, index: usize) -> Result<usize> {
        self.edges[index].ok_or_else(|| {
            MqError::Consistency("edge point missing during subdivision".to_string())
        })
    }

    fn vertex(&self, index: usize) -> Result<usize> {
        self.vertices[index].ok_or_else(|| {
            MqError::Consistency("vertex point missing during subdivision".to_string())
        })
    }
}

/// Run one Catmull-Clark pass, producing the next mesh level.
///
/// Edge information is regenerated on the input mesh; the returned mesh
/// entirely replaces it.
pub fn subdivide(mesh: &mut Mesh) -> Result<Mesh> {
    mesh.generate_edges();

    let mut target = Mesh::with_capacity(mesh.num_faces() * 4);
    let mut points = LevelPoints {
        faces: vec![None; mesh.num_faces()],
        edges: vec![None; mesh.edges().len()],
        vertices: vec![None; mesh.num_vertices()],
    };

    // Every non-degenerate face contributes its centroid as a new vertex.
    for face_index in 0..mesh.num_faces() {
        if mesh.face(face_index).is_lathe_seed() {
            continue;
        }
        points.faces[face_index] = Some(target.add_position(mesh.face_center(face_index)));
    }

    for face_index in 0..mesh.num_faces() {
        if mesh.face(face_index).is_lathe_seed() {
            continue;
        }

        let face_vertices = mesh.face(face_index).vertices.clone();
        let face_edges = mesh.face(face_index).edges.clone();
        let corner_count = face_vertices.len();

        for &vertex in &face_vertices {
            process_vertex(mesh, &mut target, &mut points, vertex)?;
        }
        for &edge in &face_edges {
            process_edge(mesh, &mut target, &mut points, edge)?;
        }

        // Each corner yields one quad: previous edge point, corner vertex
        // point, next edge point, face point.
        let mut prev_idx = corner_count - 1;
        let mut prev_edge = face_edges[prev_idx];
        for idx in 0..corner_count {
            let edge = face_edges[idx];

            let new_face = target.add_face(&[
                points.edge(prev_edge)?,
                points.vertex(face_vertices[idx])?,
                points.edge(edge)?,
                points.face(face_index)?,
            ]);

            let source = mesh.face(face_index);
            let channels = [
                source.edge_channel(prev_idx),
                source.channels[idx].clone(),
                source.edge_channel(idx),
                source.center_channel(),
            ];

            let mut attributes = source.attributes;
            let face = target.face_mut(new_face);
            face.channels = channels.to_vec();
            attributes.has_bone_weights = face.channels.iter().any(|c| c.weights.is_some());
            face.attributes = attributes;

            prev_edge = edge;
            prev_idx = idx;
        }
    }

    Ok(target)
}

/// Compute (once) the next-level position of an original vertex.
fn process_vertex(
    mesh: &Mesh,
    target: &mut Mesh,
    points: &mut LevelPoints,
    vertex: usize,
) -> Result<()> {
    if points.vertices[vertex].is_some() {
        return Ok(());
    }

    let incident_faces = &mesh.vertex(vertex).faces;
    let incident_edges = &mesh.vertex(vertex).edges;
    let n = incident_faces.len() as f32;

    let mut edge_factor = 1.0 / (n * n);
    // Doubled-face seams have more faces than edges around the vertex;
    // rescale so each geometric neighbor still contributes once.
    if incident_faces.len() != incident_edges.len() {
        edge_factor *= n / incident_edges.len() as f32;
    }

    let mut edge_term = Vector3::zeros();
    let mut on_boundary = false;
    for &edge_index in incident_edges {
        let edge = mesh.edge(edge_index);
        if edge.is_boundary() {
            on_boundary = true;
            break;
        }
        edge_term += mesh.position(edge.other_side(vertex)).coords * edge_factor;
    }

    let new_index = if on_boundary {
        // Crease rule: boundary vertices stay put.
        target.add_position(mesh.position(vertex))
    } else {
        let face_factor = 1.0 / (n * n);
        let mut face_term = Vector3::zeros();
        for &face_index in incident_faces {
            face_term += target.position(points.face(face_index)?).coords * face_factor;
        }

        let position =
            mesh.position(vertex).coords * ((n - 2.0) / n) + edge_term + face_term;
        target.add_position(Point3::from(position))
    };

    points.vertices[vertex] = Some(new_index);
    Ok(())
}

/// Compute (once) the next-level point of an edge.
fn process_edge(
    mesh: &Mesh,
    target: &mut Mesh,
    points: &mut LevelPoints,
    edge_index: usize,
) -> Result<()> {
    if points.edges[edge_index].is_some() {
        return Ok(());
    }

    let edge = mesh.edge(edge_index);
    let p0 = mesh.position(edge.vertices[0]).coords;
    let p1 = mesh.position(edge.vertices[1]).coords;

    let position = if edge.faces.len() >= 2 {
        // Endpoints and every incident face point share one weight.
        let factor = 1.0 / (edge.faces.len() as f32 + 2.0);
        let mut sum = (p0 + p1) * factor;
        for &face_index in &edge.faces {
            sum += target.position(points.face(face_index)?).coords * factor;
        }
        sum
    } else {
        (p0 + p1) * 0.5
    };

    points.edges[edge_index] = Some(target.add_position(Point3::from(position)));
    Ok(())
}
