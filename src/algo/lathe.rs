//! Rotational sweep ("lathe") generation.
//!
//! Revolves the mesh's two-vertex seed faces around a configured axis,
//! producing a ring of quads per seed. The revolve works in the object's
//! accumulated transform space: each seed vertex is projected onto the
//! axis to find its revolve center and radius, ring positions are stepped
//! around the axis, and every generated position is mapped back into
//! object-local space before being appended.

use std::collections::HashMap;
use std::f32::consts::TAU;

use nalgebra::{Matrix4, Point3, Vector3};

use crate::error::{MqError, Result};
use crate::mesh::Mesh;
use crate::scene::{LatheAxis, LatheSettings};

/// Apply the object's lathe configuration to its mesh.
pub fn apply_lathe(
    mesh: &mut Mesh,
    settings: &LatheSettings,
    node_transform: &Matrix4<f32>,
) -> Result<()> {
    if !settings.enabled || settings.segments == 0 || mesh.lathe_faces().is_empty() {
        return Ok(());
    }

    let segments = settings.segments;
    let step = TAU / segments as f32;

    let axis: Vector3<f32> = match settings.axis {
        LatheAxis::X => Vector3::x(),
        LatheAxis::Y => Vector3::y(),
        LatheAxis::Z => Vector3::z(),
    };
    let ring = |angle: f32| -> Vector3<f32> {
        match settings.axis {
            LatheAxis::X => Vector3::new(0.0, angle.cos(), angle.sin()),
            LatheAxis::Y => Vector3::new(angle.cos(), 0.0, angle.sin()),
            LatheAxis::Z => Vector3::new(angle.cos(), angle.sin(), 0.0),
        }
    };

    let to_local = node_transform.try_inverse().ok_or_else(|| {
        MqError::Consistency("lathe node transform is not invertible".to_string())
    })?;

    // Generate one ring of vertices per distinct seed vertex.
    let mut ring_start: HashMap<usize, usize> = HashMap::new();
    let seeds = mesh.lathe_faces().to_vec();

    for &face_index in &seeds {
        let seed_vertices = mesh.face(face_index).vertices.clone();
        for vertex in seed_vertices {
            if ring_start.contains_key(&vertex) {
                continue;
            }
            ring_start.insert(vertex, mesh.num_vertices());

            let world = node_transform.transform_point(&mesh.position(vertex));
            let center = world.coords.component_mul(&axis);
            let radius = (world.coords - center).norm();

            let mut angle = 0.0;
            for _ in 0..segments {
                let position = center + ring(angle) * radius;
                mesh.add_position(to_local.transform_point(&Point3::from(position)));
                angle += step;
            }
        }
    }

    // Connect the two rings of each seed pairwise into quads, emitting
    // both winding orders so the surface is double-sided.
    for &face_index in &seeds {
        let seed_vertices = mesh.face(face_index).vertices.clone();
        let attributes = mesh.face(face_index).attributes;

        let base0 = ring_start[&seed_vertices[0]];
        let base1 = ring_start[&seed_vertices[1]];
        let mut idx0 = base0 + segments - 1;
        let mut idx1 = base1 + segments - 1;

        for i in 0..segments {
            let idx2 = base0 + i;
            let idx3 = base1 + i;

            let front = mesh.add_face(&[idx0, idx2, idx3, idx1]);
            mesh.face_mut(front).attributes = attributes;

            let back = mesh.add_face(&[idx0, idx1, idx3, idx2]);
            mesh.face_mut(back).attributes = attributes;

            idx0 = idx2;
            idx1 = idx3;
        }
    }

    Ok(())
}
