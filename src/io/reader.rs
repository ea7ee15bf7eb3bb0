//! Scene document parser.
//!
//! Drives the [`Tokenizer`] through the chunk grammar: the fixed format
//! header, then `Scene`, `Material`, and `Object` chunks (plus a handful of
//! chunks that are recognized only to be skipped). The grammar is closed —
//! any unrecognized chunk or key is a fatal format error carrying the line
//! number, never silently ignored.

use nalgebra::{Point3, Vector2, Vector4};

use crate::error::{MqError, Result};
use crate::mesh::{Mesh, Rgba};
use crate::scene::{LatheAxis, Material, MirrorAxes, MirrorMode, PatchType, Scene, SceneObject};

use super::progress::Progress;
use super::tokenizer::Tokenizer;
use super::ReadOptions;

/// Maximum vertices per face record.
const MAX_FACE_VERTICES: usize = 4;

/// Parser state: the tokenizer plus the scene being built and the name
/// stack that resolves object parents from depth markers.
pub(crate) struct SceneReader<'a> {
    tokenizer: Tokenizer,
    options: &'a ReadOptions,
    progress: &'a Progress,
    scene: Scene,
    name_stack: Vec<Option<String>>,
}

impl<'a> SceneReader<'a> {
    pub(crate) fn new(tokenizer: Tokenizer, options: &'a ReadOptions, progress: &'a Progress) -> Self {
        Self {
            tokenizer,
            options,
            progress,
            scene: Scene::new(),
            name_stack: vec![None],
        }
    }

    /// Parse the whole document.
    pub(crate) fn read(mut self) -> Result<Scene> {
        if !self
            .tokenizer
            .ensure_tokens(&["Metasequoia", "Document", "Format", "Text", "Ver"])
        {
            return Err(MqError::format(
                self.tokenizer.line_number(),
                "not a Metasequoia document",
            ));
        }

        let version = self.expect_token()?;
        if version != "1.0" && version != "1.1" {
            return Err(MqError::format(
                self.tokenizer.line_number(),
                format!("unsupported format version `{version}`"),
            ));
        }

        while let Some(token) = self.tokenizer.next_token() {
            match token.to_lowercase().as_str() {
                "scene" => self.read_scene_chunk()?,
                "trialnoise" => {
                    return Err(MqError::TrialRestriction {
                        line: self.tokenizer.line_number(),
                    })
                }
                "thumbnail" | "includexml" | "backimage" => self.tokenizer.skip_chunk(),
                "material" => self.read_material_chunk()?,
                "object" => self.read_object_chunk()?,
                "eof" => {}
                _ => {
                    return Err(MqError::Format {
                        line: self.tokenizer.line_number(),
                        message: format!("unknown chunk `{token}`"),
                    })
                }
            }

            self.progress.report(self.tokenizer.progress());
        }

        Ok(self.scene)
    }

    /// Consume the `Scene` chunk. All of its fields describe the modeler's
    /// camera and lighting, none of which survive conversion.
    fn read_scene_chunk(&mut self) -> Result<()> {
        self.expect_open_brace()?;

        loop {
            let token = self.expect_token()?;
            match token.to_lowercase().as_str() {
                "pos" | "lookat" | "amb" => {
                    self.tokenizer.read_vector3()?;
                }
                "head" | "pich" | "bank" | "ortho" | "zoom2" => {
                    self.tokenizer.read_single()?;
                }
                "dirlights" => self.tokenizer.skip_chunk(),
                "}" => return Ok(()),
                _ => return Err(self.unknown_token(&token)),
            }
        }
    }

    fn read_material_chunk(&mut self) -> Result<()> {
        let count = self.tokenizer.read_int32()?;
        self.expect_open_brace()?;
        self.scene.materials.reserve(count.max(0) as usize);

        let mut pending: Option<PendingMaterial> = None;

        loop {
            let token = self.expect_token()?;

            // A quoted token starts the next material block.
            if token.starts_with('"') {
                if let Some(done) = pending.take() {
                    self.scene.materials.push(done.finish());
                }
                pending = Some(PendingMaterial::new(token.trim_matches('"').to_string()));
                continue;
            }

            match token.to_lowercase().as_str() {
                // Fields the conversion has no use for.
                "shader" => {
                    self.tokenizer.read_int32()?;
                }
                "amb" => {
                    self.tokenizer.read_single()?;
                }
                "proj_type" => {
                    self.expect_token()?;
                }
                "proj_pos" | "proj_scale" | "proj_angle" => {
                    self.tokenizer.read_vector3()?;
                }
                "}" => {
                    if let Some(done) = pending.take() {
                        self.scene.materials.push(done.finish());
                    }
                    return Ok(());
                }
                key => {
                    let line = self.tokenizer.line_number();
                    let material = pending
                        .as_mut()
                        .ok_or_else(|| MqError::format(line, "material key before material name"))?;
                    match key {
                        "col" => material.color = self.tokenizer.read_vector4()?,
                        "vcol" => {
                            material.vertex_color_enabled = self.tokenizer.read_int32()? == 1
                        }
                        "dif" => material.dif = self.tokenizer.read_single()?,
                        "emi" => material.emi = self.tokenizer.read_single()?,
                        "spc" => material.spc = self.tokenizer.read_single()?,
                        "power" => material.power = self.tokenizer.read_single()?,
                        "tex" => material.texture = Some(self.tokenizer.read_string()?),
                        "aplane" => material.alpha_texture = Some(self.tokenizer.read_string()?),
                        "bump" => material.bump_texture = Some(self.tokenizer.read_string()?),
                        _ => return Err(self.unknown_token(&token)),
                    }
                }
            }
        }
    }

    fn read_object_chunk(&mut self) -> Result<()> {
        let name = self.tokenizer.read_string()?;
        self.expect_open_brace()?;

        let mut object = SceneObject::new(name);

        loop {
            let token = self.expect_token()?;
            match token.to_lowercase().as_str() {
                "color" => {
                    self.tokenizer.read_vector3()?;
                }
                "color_type" => {
                    self.tokenizer.read_int32()?;
                }
                "blob" | "bvertex" => self.tokenizer.skip_chunk(),
                "depth" => {
                    let depth = self.tokenizer.read_int32()?.max(0) as usize + 1;
                    while depth < self.name_stack.len() {
                        self.name_stack.pop();
                    }
                    object.parent = self.name_stack.last().cloned().flatten();
                }
                "face" => self.read_faces(&mut object)?,
                "facet" => {
                    object.smooth_angle = Some(self.tokenizer.read_single()?.to_radians());
                }
                "folding" | "locking" | "patchtri" => {
                    self.expect_token()?;
                }
                "lathe" => {
                    object.lathe_settings_mut().enabled = self.tokenizer.read_int32()? != 0;
                }
                "lathe_axis" => {
                    let value = self.tokenizer.read_int32()?;
                    let axis = LatheAxis::from_file_value(value).ok_or_else(|| {
                        MqError::format(
                            self.tokenizer.line_number(),
                            format!("invalid lathe axis `{value}`"),
                        )
                    })?;
                    object.lathe_settings_mut().axis = axis;
                }
                "lathe_seg" => {
                    object.lathe_settings_mut().segments =
                        self.tokenizer.read_int32()?.max(0) as usize;
                }
                "mirror" => {
                    let value = self.tokenizer.read_int32()?;
                    let mode = match value {
                        0 => MirrorMode::None,
                        1 => MirrorMode::Split,
                        2 => MirrorMode::Connect,
                        _ => {
                            return Err(MqError::format(
                                self.tokenizer.line_number(),
                                format!("invalid mirror mode `{value}`"),
                            ))
                        }
                    };
                    object.mirror_settings_mut().mode = mode;
                }
                "mirror_axis" => {
                    let bits = self.tokenizer.read_int32()?;
                    object.mirror_settings_mut().axes = MirrorAxes::from_bits(bits);
                }
                "mirror_dis" => {
                    object.mirror_settings_mut().distance = Some(self.tokenizer.read_single()?);
                }
                "patch" => {
                    let value = self.tokenizer.read_int32()?;
                    let patch = PatchType::from_file_value(value).ok_or_else(|| {
                        MqError::format(
                            self.tokenizer.line_number(),
                            format!("invalid patch type `{value}`"),
                        )
                    })?;
                    object.patch_type = patch;
                    if patch != PatchType::Polygon && patch != PatchType::CatmullClark {
                        // Spline patches are unsupported; abandon the rest
                        // of the object chunk.
                        self.tokenizer.skip_tokens();
                        break;
                    }
                }
                "rotation" => {
                    object.rotation = self.tokenizer.read_vector3()?.map(f32::to_radians);
                }
                "scale" => {
                    object.scale = self.tokenizer.read_vector3()?;
                }
                "segment" => {
                    object.patch_segments = self.tokenizer.read_int32()?.max(0) as usize;
                }
                "shading" => {
                    if self.tokenizer.read_int32()? == 0 {
                        object.smooth_angle = None;
                    }
                }
                "translation" => {
                    object.translation = self.tokenizer.read_vector3()?;
                }
                "vertex" => self.read_vertices(&mut object)?,
                "visible" => {
                    object.visible = self.tokenizer.read_int32()? != 0;
                    if !object.visible && !self.options.import_invisible_objects {
                        self.tokenizer.skip_tokens();
                        break;
                    }
                }
                "}" => break,
                _ => return Err(self.unknown_token(&token)),
            }
        }

        if object.visible || self.options.import_invisible_objects {
            self.name_stack.push(Some(object.name.clone()));
            self.scene.objects.push(object);
        }

        Ok(())
    }

    /// Read the `vertex` sub-chunk: a count-prefixed flat position list.
    fn read_vertices(&mut self, object: &mut SceneObject) -> Result<()> {
        let count = self.tokenizer.read_int32()?.max(0) as usize;
        self.expect_open_brace()?;

        let mesh = object.mesh.get_or_insert_with(Mesh::new);
        for _ in 0..count {
            let position = self.tokenizer.read_vector3()?;
            mesh.add_position(Point3::from(position));
        }

        self.tokenizer.skip_tokens();
        Ok(())
    }

    /// Read the `face` sub-chunk: count-prefixed per-face records.
    fn read_faces(&mut self, object: &mut SceneObject) -> Result<()> {
        let num_faces = self.tokenizer.read_int32()?.max(0) as usize;
        if num_faces == 0 {
            self.tokenizer.skip_chunk();
            object.mesh = None;
            return Ok(());
        }

        self.expect_open_brace()?;

        let mut indices = [0usize; MAX_FACE_VERTICES];
        let mut texcoords = [Vector2::zeros(); MAX_FACE_VERTICES];
        let mut colors = [Rgba::default(); MAX_FACE_VERTICES];

        let mut material_index: i32 = -1;
        let mut has_uv = false;
        let mut has_vertex_color = false;
        let mut has_alpha_vertex_color = false;

        let first_count = self.tokenizer.read_int32()?.max(0) as usize;
        let mut num_verts = self.validate_face_vertex_count(first_count)?;

        for _ in 0..num_faces {
            let cur_num_verts = num_verts;

            loop {
                let token = self.expect_token()?;
                match token.to_lowercase().as_str() {
                    "v" => {
                        for slot in indices.iter_mut().take(cur_num_verts) {
                            let index = self.tokenizer.read_int32()?;
                            if index < 0 {
                                return Err(MqError::format(
                                    self.tokenizer.line_number(),
                                    format!("negative vertex index `{index}`"),
                                ));
                            }
                            *slot = index as usize;
                        }
                    }
                    "m" => {
                        material_index = self.tokenizer.read_int32()?;
                    }
                    "uv" => {
                        for slot in texcoords.iter_mut().take(cur_num_verts) {
                            *slot = self.tokenizer.read_vector2()?;
                        }
                        has_uv = true;
                    }
                    "col" => {
                        for slot in colors.iter_mut().take(cur_num_verts) {
                            *slot = self.tokenizer.read_color()?;
                            if slot.a != 255 {
                                has_alpha_vertex_color = true;
                            }
                        }
                        has_vertex_color = true;
                    }
                    "}" => break,
                    _ => {
                        // An integer here is the next record's vertex count.
                        match token.parse::<usize>() {
                            Ok(count) => {
                                num_verts = self.validate_face_vertex_count(count)?;
                                break;
                            }
                            Err(_) => return Err(self.unknown_token(&token)),
                        }
                    }
                }
            }

            if cur_num_verts > 1 {
                self.add_face_record(
                    object,
                    &indices[..cur_num_verts],
                    material_index,
                    has_uv.then_some(&texcoords[..cur_num_verts]),
                    has_vertex_color.then_some(&colors[..cur_num_verts]),
                    has_alpha_vertex_color,
                )?;
            }

            material_index = -1;
            has_uv = false;
            has_vertex_color = false;
            has_alpha_vertex_color = false;
        }

        Ok(())
    }

    /// Append one parsed face record to the object's mesh and resolve its
    /// material and attribute-presence flags.
    fn add_face_record(
        &mut self,
        object: &mut SceneObject,
        indices: &[usize],
        material_index: i32,
        texcoords: Option<&[Vector2<f32>]>,
        colors: Option<&[Rgba]>,
        has_alpha_vertex_color: bool,
    ) -> Result<()> {
        let line = self.tokenizer.line_number();

        let resolved_material = if material_index == -1 {
            self.scene.default_material_index()
        } else {
            let index = material_index as usize;
            if material_index < 0 || index >= self.scene.materials.len() {
                return Err(MqError::format(
                    line,
                    format!("material index `{material_index}` out of range"),
                ));
            }
            index
        };
        let material = &self.scene.materials[resolved_material];
        let material_has_texture = material.has_texture();
        let vertex_color_enabled = material.vertex_color_enabled;

        if vertex_color_enabled && has_alpha_vertex_color {
            object.has_alpha_vertex_color = true;
        }

        let mesh = object
            .mesh
            .as_mut()
            .ok_or_else(|| MqError::format(line, "face chunk appears before any vertex chunk"))?;
        for &index in indices {
            if index >= mesh.num_vertices() {
                return Err(MqError::format(
                    line,
                    format!("vertex index `{index}` out of range"),
                ));
            }
        }

        let face_index = mesh.add_face(indices);
        let face = mesh.face_mut(face_index);
        face.attributes.material = Some(resolved_material);

        // Texture coordinates only count when the material actually maps a
        // texture and the record supplied them.
        face.attributes.has_texcoord = material_has_texture && texcoords.is_some();
        if vertex_color_enabled {
            face.attributes.has_vertex_color = colors.is_some();
        }

        for corner in 0..indices.len() {
            if let Some(uvs) = texcoords {
                face.channels[corner].texcoord = uvs[corner];
            }
            if let Some(colors) = colors {
                face.channels[corner].color = colors[corner];
            }
        }

        Ok(())
    }

    fn validate_face_vertex_count(&self, count: usize) -> Result<usize> {
        if count > MAX_FACE_VERTICES {
            return Err(MqError::format(
                self.tokenizer.line_number(),
                format!("face has too many vertices ({count})"),
            ));
        }
        Ok(count)
    }

    // ==================== Helpers ====================

    fn expect_token(&mut self) -> Result<String> {
        self.tokenizer
            .next_token()
            .ok_or_else(|| MqError::format(self.tokenizer.line_number(), "unexpected end of file"))
    }

    fn expect_open_brace(&mut self) -> Result<()> {
        if self.tokenizer.ensure_tokens(&["{"]) {
            Ok(())
        } else {
            Err(MqError::format(
                self.tokenizer.line_number(),
                "expected `{`",
            ))
        }
    }

    fn unknown_token(&self, token: &str) -> MqError {
        MqError::unknown_token(self.tokenizer.line_number(), token)
    }
}

/// Material fields accumulated while its block is being read.
struct PendingMaterial {
    name: String,
    color: Vector4<f32>,
    dif: f32,
    emi: f32,
    spc: f32,
    power: f32,
    vertex_color_enabled: bool,
    texture: Option<String>,
    alpha_texture: Option<String>,
    bump_texture: Option<String>,
}

impl PendingMaterial {
    fn new(name: String) -> Self {
        Self {
            name,
            color: Vector4::new(0.8, 0.8, 0.8, 1.0),
            dif: 0.8,
            emi: 0.0,
            spc: 0.0,
            power: 5.0,
            vertex_color_enabled: false,
            texture: None,
            alpha_texture: None,
            bump_texture: None,
        }
    }

    fn finish(self) -> Material {
        let mut material =
            Material::from_factors(self.name, self.color, self.dif, self.emi, self.spc, self.power);
        material.vertex_color_enabled = self.vertex_color_enabled;
        material.texture = self.texture;
        material.alpha_texture = self.alpha_texture;
        material.bump_texture = self.bump_texture;
        material
    }
}
