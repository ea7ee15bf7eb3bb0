//! # Metaseq
//!
//! An importer and conversion pipeline for Metasequoia (`.mqo`) scene
//! files, turning the modeler's chunked text format into renderer-ready
//! triangulated, batched geometry.
//!
//! The conversion is an offline, deterministic pipeline:
//!
//! 1. **Parse** the scene text into materials and objects, each object
//!    carrying a face-vertex mesh ([`io`], [`scene`], [`mesh`])
//! 2. **Generate** procedural geometry per object: mirroring, rotational
//!    sweep ("lathe"), and Catmull-Clark subdivision ([`algo`])
//! 3. **Build** the result into material/attribute-homogeneous draw
//!    batches with computed normals ([`build`])
//!
//! ## Quick Start
//!
//! ```no_run
//! use metaseq::io::{read_scene, ReadOptions};
//! use metaseq::scene::BuildOptions;
//!
//! let mut scene = read_scene("model.mqo", &ReadOptions::default()).unwrap();
//! let geometry = scene.build_geometry(&BuildOptions::default()).unwrap();
//!
//! for object in &geometry {
//!     println!(
//!         "{}: {} positions, {} batches",
//!         object.name,
//!         object.positions.len(),
//!         object.batches.len()
//!     );
//! }
//! ```
//!
//! ## Working with meshes directly
//!
//! The topology model and the generators are usable on their own:
//!
//! ```
//! use metaseq::algo::subdivide;
//! use metaseq::mesh::Mesh;
//! use nalgebra::Point3;
//!
//! let mut mesh = Mesh::new();
//! let corners = [
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let ids: Vec<usize> = corners.iter().map(|&p| mesh.add_position(p)).collect();
//! mesh.add_face(&ids);
//!
//! let next = subdivide(&mut mesh).unwrap();
//! assert_eq!(next.num_faces(), 4);
//! ```
//!
//! ## Errors
//!
//! All failures are fatal and propagate immediately: a malformed document
//! aborts the parse with the offending line number, trial-build files are
//! rejected with a dedicated error, and internal topology violations
//! surface as consistency errors rather than corrupt output. There is no
//! partial-success mode; a failed conversion yields nothing.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod build;
pub mod error;
pub mod io;
pub mod mesh;
pub mod scene;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use metaseq::prelude::*;
/// ```
pub mod prelude {
    pub use crate::build::{AttributeSignature, Batch, BatchVertex, BuiltMesh, MeshBuilder};
    pub use crate::error::{MqError, Result};
    pub use crate::io::{read_scene, read_scene_str, read_scene_with_progress, Progress, ReadOptions};
    pub use crate::mesh::{Channel, Face, Mesh, Rgba, Vertex};
    pub use crate::scene::{BuildOptions, Material, ObjectGeometry, Scene, SceneObject};
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;

    const CUBE_MQO: &str = r#"Metasequoia Document
Format Text Ver 1.0
Scene {
	pos 0 0 1500
	lookat 0 0 0
	head -0.5
	pich 0.5
	ortho 0
	zoom2 5.0
	amb 0.25 0.25 0.25
}
Material 1 {
	"body" col(1.0 1.0 1.0 1.0) dif(0.8) amb(0.6) emi(0.0) spc(0.0) power(5.0)
}
Object "cube" {
	depth 0
	folding 0
	scale 1 1 1
	rotation 0 0 0
	translation 0 0 0
	visible 15
	locking 0
	shading 1
	facet 59.5
	color 0.9 0.9 0.9
	color_type 0
	vertex 8 {
		-1 -1 1
		1 -1 1
		1 -1 -1
		-1 -1 -1
		-1 1 1
		1 1 1
		1 1 -1
		-1 1 -1
	}
	face 6 {
		4 V(0 1 2 3) M(0)
		4 V(4 7 6 5) M(0)
		4 V(0 4 5 1) M(0)
		4 V(1 5 6 2) M(0)
		4 V(2 6 7 3) M(0)
		4 V(3 7 4 0) M(0)
	}
}
Eof
"#;

    #[test]
    fn test_cube_pipeline_end_to_end() {
        let mut scene = read_scene_str(CUBE_MQO, &ReadOptions::default()).unwrap();
        assert_eq!(scene.materials.len(), 1);
        assert_eq!(scene.objects.len(), 1);

        let geometry = scene.build_geometry(&BuildOptions::default()).unwrap();
        assert_eq!(geometry.len(), 1);

        let cube = &geometry[0];
        assert_eq!(cube.name, "cube");
        assert_eq!(cube.positions.len(), 8);
        assert_eq!(cube.batches.len(), 1);

        // 6 quads, 2 triangles each.
        assert_eq!(cube.batches[0].indices.len(), 36);
        assert_eq!(cube.batches[0].material, Some(0));
    }

    #[test]
    fn test_subdivided_cube_pipeline() {
        let subdivided = CUBE_MQO.replace("facet 59.5", "facet 59.5\n\tpatch 3\n\tsegment 2");
        let mut scene = read_scene_str(&subdivided, &ReadOptions::default()).unwrap();

        let geometry = scene.build_geometry(&BuildOptions::default()).unwrap();
        // Two Catmull-Clark passes: 6 quads -> 24 -> 96, two triangles each.
        assert_eq!(geometry[0].batches[0].indices.len(), 96 * 6);
    }
}
