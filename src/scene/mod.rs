//! Scene model and conversion pipeline.
//!
//! A [`Scene`] is the parsed form of a document: the material list plus the
//! object list, each object carrying its transform, generator settings, and
//! mesh. [`Scene::build_geometry`] runs the whole conversion — object-space
//! localization, mirroring, lathe, subdivision, and batching — and returns
//! renderer-ready geometry per object.

mod material;
mod object;

pub use material::Material;
pub use object::{
    LatheAxis, LatheSettings, MirrorAxes, MirrorMode, MirrorSettings, PatchType, SceneObject,
};

use std::collections::HashMap;

use nalgebra::Matrix4;

use crate::algo::{apply_lathe, apply_mirroring, subdivide};
use crate::build::{Batch, MeshBuilder};
use crate::error::{MqError, Result};

/// Options for [`Scene::build_geometry`].
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    /// Split batches so every index fits in 16 bits.
    pub use_sixteen_bit_indices: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            use_sixteen_bit_indices: true,
        }
    }
}

/// Renderer-ready geometry for one object: the shared position buffer plus
/// the material/attribute-homogeneous batches indexing into it.
#[derive(Debug, Clone)]
pub struct ObjectGeometry {
    /// Name of the source object.
    pub name: String,
    /// Ordered vertex-position buffer.
    pub positions: Vec<nalgebra::Point3<f32>>,
    /// Draw batches, each keyed by material and attribute signature.
    pub batches: Vec<Batch>,
}

/// A parsed scene: materials and objects.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// All materials, in file order (plus the shared default material if
    /// any face required it).
    pub materials: Vec<Material>,
    /// All imported objects, in file order.
    pub objects: Vec<SceneObject>,

    default_material: Option<usize>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the shared default material, creating it on first use.
    ///
    /// Faces with a material index of −1 resolve here; the default is
    /// created at most once per scene.
    pub fn default_material_index(&mut self) -> usize {
        match self.default_material {
            Some(index) => index,
            None => {
                let index = self.materials.len();
                self.materials.push(Material::default_gray());
                self.default_material = Some(index);
                index
            }
        }
    }

    /// Run the full conversion pipeline over every object.
    ///
    /// For each object this resolves the absolute transform from the parent
    /// chain, converts the mesh from world to object-local space, applies
    /// mirroring and lathe, runs the configured number of subdivision
    /// passes, and batches the result. Meshes are consumed in the process;
    /// the scene can be built once.
    pub fn build_geometry(&mut self, options: &BuildOptions) -> Result<Vec<ObjectGeometry>> {
        for material in &mut self.materials {
            material.normalize_specular_power();
        }

        let mut absolute_transforms: HashMap<String, Matrix4<f32>> = HashMap::new();
        let mut outputs = Vec::new();

        for object_index in 0..self.objects.len() {
            let local = self.objects[object_index].local_transform();
            let parent_transform = match &self.objects[object_index].parent {
                Some(parent) => *absolute_transforms.get(parent).ok_or_else(|| {
                    MqError::Consistency(format!("parent object `{parent}` not found"))
                })?,
                None => Matrix4::identity(),
            };
            let node_transform = parent_transform * local;
            absolute_transforms.insert(self.objects[object_index].name.clone(), node_transform);

            let Some(mut mesh) = self.objects[object_index].mesh.take() else {
                continue;
            };
            let object = &self.objects[object_index];

            // File positions are world-space; the generators work in
            // object-local space.
            let to_local = node_transform.try_inverse().ok_or_else(|| {
                MqError::Consistency(format!(
                    "object `{}` has a non-invertible transform",
                    object.name
                ))
            })?;
            for vertex in 0..mesh.num_vertices() {
                let position = to_local.transform_point(&mesh.position(vertex));
                mesh.set_position(vertex, position);
            }

            if let Some(mirror) = &object.mirror {
                apply_mirroring(&mut mesh, mirror, &node_transform)?;
            }
            if let Some(lathe) = &object.lathe {
                apply_lathe(&mut mesh, lathe, &node_transform)?;
            }

            if object.patch_type == PatchType::CatmullClark {
                for _ in 0..object.patch_segments {
                    mesh = subdivide(&mut mesh)?;
                }
            }

            let mut builder = MeshBuilder::new(options.use_sixteen_bit_indices);
            builder.begin()?;
            builder.add_mesh(&mut mesh, object.smooth_falloff())?;
            let built = builder.finish()?;

            outputs.push(ObjectGeometry {
                name: object.name.clone(),
                positions: built.positions,
                batches: built.batches,
            });
        }

        Ok(outputs)
    }
}
