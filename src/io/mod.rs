//! Scene file I/O.
//!
//! This module reads the modeler's chunked text format into a [`Scene`].
//! The format is line-oriented text in a configurable encoding (the
//! modeler's native files use Shift_JIS); see [`ReadOptions`].
//!
//! # Usage
//!
//! ```no_run
//! use metaseq::io::{read_scene, ReadOptions};
//!
//! let scene = read_scene("model.mqo", &ReadOptions::default()).unwrap();
//! println!("objects: {}", scene.objects.len());
//! ```

mod progress;
mod reader;
mod tokenizer;

pub use progress::Progress;
pub use tokenizer::Tokenizer;

use std::path::Path;

use crate::error::Result;
use crate::scene::Scene;

use reader::SceneReader;

/// Options controlling how a scene file is read.
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// Text encoding of the file. Defaults to Shift_JIS, the encoding the
    /// modeler writes.
    pub encoding: &'static encoding_rs::Encoding,

    /// Import objects marked invisible. When disabled (the default),
    /// invisible objects are skipped entirely during parsing.
    pub import_invisible_objects: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            encoding: encoding_rs::SHIFT_JIS,
            import_invisible_objects: false,
        }
    }
}

/// Read a scene from a file.
///
/// The whole document is parsed eagerly; any malformed content aborts with
/// an error and no partial scene is returned.
pub fn read_scene<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Scene> {
    read_scene_with_progress(path, options, &Progress::none())
}

/// Read a scene from a file, reporting read progress to the host.
///
/// The callback receives the fraction of the input consumed after each
/// top-level chunk. Informational only; reporting has no effect on the
/// parse.
pub fn read_scene_with_progress<P: AsRef<Path>>(
    path: P,
    options: &ReadOptions,
    progress: &Progress,
) -> Result<Scene> {
    let tokenizer = Tokenizer::from_path(path, options.encoding)?;
    SceneReader::new(tokenizer, options, progress).read()
}

/// Read a scene from already-decoded text.
pub fn read_scene_str(text: &str, options: &ReadOptions) -> Result<Scene> {
    SceneReader::new(Tokenizer::from_text(text), options, &Progress::none()).read()
}
