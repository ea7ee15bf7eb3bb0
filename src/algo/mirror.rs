//! Mesh mirroring.
//!
//! Reflects a mesh across each configured axis in turn, doubling the
//! geometry per axis. Vertices lying on the mirror plane (within a small
//! epsilon) are reused instead of duplicated, which keeps seams welded. In
//! connect mode, open boundary edges are additionally stitched to their
//! mirrored counterparts with bridging quads.

use nalgebra::{Matrix4, Vector3};

use crate::error::{MqError, Result};
use crate::mesh::Mesh;
use crate::scene::{MirrorMode, MirrorSettings};

/// Distance under which a mirrored vertex is considered self-coincident
/// and the original vertex is reused.
const COINCIDENT_EPSILON: f32 = 1e-3;

/// Apply the object's mirroring configuration to its mesh.
///
/// Each configured axis is applied sequentially, reflecting the geometry
/// accumulated so far (two axes quadruple the mesh, three octuple it).
pub fn apply_mirroring(
    mesh: &mut Mesh,
    settings: &MirrorSettings,
    node_transform: &Matrix4<f32>,
) -> Result<()> {
    if settings.mode == MirrorMode::None {
        return Ok(());
    }

    if settings.axes.x {
        mirror_axis(mesh, settings, Vector3::new(-1.0, 1.0, 1.0), node_transform)?;
    }
    if settings.axes.y {
        mirror_axis(mesh, settings, Vector3::new(1.0, -1.0, 1.0), node_transform)?;
    }
    if settings.axes.z {
        mirror_axis(mesh, settings, Vector3::new(1.0, 1.0, -1.0), node_transform)?;
    }

    Ok(())
}

/// Reflect the mesh across one axis.
fn mirror_axis(
    mesh: &mut Mesh,
    settings: &MirrorSettings,
    mirror: Vector3<f32>,
    node_transform: &Matrix4<f32>,
) -> Result<()> {
    let mut reflect = Matrix4::new_nonuniform_scaling(&mirror);

    // Without the local flag the reflection happens in parent space:
    // carry the position out through the node transform, reflect, and
    // bring it back.
    if !settings.axes.local {
        let to_local = node_transform.try_inverse().ok_or_else(|| {
            MqError::Consistency("mirror node transform is not invertible".to_string())
        })?;
        reflect = to_local * reflect * node_transform;
    }

    let num_faces = mesh.num_faces();
    let num_vertices = mesh.num_vertices();

    // Stitching needs edge adjacency of the pre-mirror topology.
    if settings.mode == MirrorMode::Connect {
        mesh.generate_edges();
    }

    // Mirror every vertex, reusing those that land on themselves.
    let mut mirrored = Vec::with_capacity(num_vertices);
    for vertex in 0..num_vertices {
        let original = mesh.position(vertex);
        let reflected = reflect.transform_point(&original);

        if (reflected - original).norm() < COINCIDENT_EPSILON {
            mirrored.push(vertex);
        } else {
            mirrored.push(mesh.add_position(reflected));
        }
    }

    // Mirror every non-degenerate face with reversed winding.
    for face_index in 0..num_faces {
        let source = mesh.face(face_index);
        if source.is_lathe_seed() {
            continue;
        }

        let source_vertices = source.vertices.clone();
        let source_channels = source.channels.clone();
        let attributes = source.attributes;
        let corner_count = source_vertices.len();

        let mut new_vertices = vec![0usize; corner_count];
        let mut org_to_new = vec![0usize; corner_count];
        let mut new_to_org = vec![0usize; corner_count];
        for (org_local, new_local) in (0..corner_count).zip((0..corner_count).rev()) {
            new_vertices[new_local] = mirrored[source_vertices[org_local]];
            new_to_org[new_local] = org_local;
            org_to_new[org_local] = new_local;
        }

        let new_face = mesh.add_face(&new_vertices);
        {
            let face = mesh.face_mut(new_face);
            face.attributes = attributes;
            for corner in 0..corner_count {
                face.channels[corner] = source_channels[new_to_org[corner]].clone();
            }
        }

        if settings.mode == MirrorMode::Connect {
            let source_edges = mesh.face(face_index).edges.clone();
            for edge_index in source_edges {
                if !mesh.edge(edge_index).is_boundary() {
                    continue;
                }

                let (idx0, idx1) = mesh.edge_local_indices(face_index, edge_index)?;

                // An optional distance gate keeps self-coincident regions
                // from growing degenerate bridges.
                if let Some(distance) = settings.distance {
                    let limit = distance * 2.0;

                    let p0 = mesh.position(source_vertices[idx0]);
                    let p1 = mesh.position(new_vertices[org_to_new[idx0]]);
                    if (p1 - p0).norm() >= limit {
                        continue;
                    }

                    let p0 = mesh.position(source_vertices[idx1]);
                    let p1 = mesh.position(new_vertices[org_to_new[idx1]]);
                    if (p1 - p0).norm() >= limit {
                        continue;
                    }
                }

                let bridge = mesh.add_face(&[
                    source_vertices[idx0],
                    source_vertices[idx1],
                    new_vertices[org_to_new[idx1]],
                    new_vertices[org_to_new[idx0]],
                ]);

                let face = mesh.face_mut(bridge);
                face.attributes = attributes;
                face.channels[0] = source_channels[idx0].clone();
                face.channels[1] = source_channels[idx1].clone();
                face.channels[2] = source_channels[idx1].clone();
                face.channels[3] = source_channels[idx0].clone();
            }
        }
    }

    Ok(())
}
