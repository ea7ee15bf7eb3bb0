//! Procedural mesh generators.
//!
//! The three transforms an object's mesh passes through before batching,
//! in pipeline order:
//!
//! - **Mirroring**: reflect geometry across configured axes, optionally
//!   stitching open boundaries to their images
//! - **Lathe**: revolve two-vertex profile edges into rings of quads
//! - **Subdivision**: one Catmull-Clark pass per configured level
//!
//! Each generator appends to (or, for subdivision, replaces) the mesh it
//! is given; none of them requires edge information to be valid on entry.

mod lathe;
mod mirror;
mod subdivide;

pub use lathe::apply_lathe;
pub use mirror::apply_mirroring;
pub use subdivide::subdivide;
