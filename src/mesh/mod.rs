//! Core mesh data structures.
//!
//! This module provides the face-vertex topology model built by the scene
//! reader and transformed by the generator stages.
//!
//! # Overview
//!
//! The primary type is [`Mesh`]: dense, append-only arrays of [`Vertex`]
//! and [`Face`] plus edge adjacency that is materialized on demand (only
//! mirror stitching and subdivision need it). Faces carry 2–4 vertices and
//! one [`Channel`] per corner; two-vertex faces are degenerate profile
//! edges consumed by the lathe generator.
//!
//! # Construction
//!
//! ```
//! use metaseq::mesh::Mesh;
//! use nalgebra::Point3;
//!
//! let mut mesh = Mesh::new();
//! let a = mesh.add_position(Point3::new(0.0, 0.0, 0.0));
//! let b = mesh.add_position(Point3::new(1.0, 0.0, 0.0));
//! let c = mesh.add_position(Point3::new(0.5, 1.0, 0.0));
//! mesh.add_face(&[a, b, c]);
//!
//! assert_eq!(mesh.num_vertices(), 3);
//! assert_eq!(mesh.num_faces(), 1);
//! ```

mod channel;
mod topology;

pub use channel::{BoneWeight, Channel, Rgba};
pub use topology::{Edge, Face, FaceAttributes, Mesh, Vertex};
