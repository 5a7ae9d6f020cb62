//! # windfield core
//!
//! Core types for the windfield interpolation and animation engine.
//!
//! This crate provides:
//! - `Vector2`: vector arithmetic in pixel space
//! - `DisplayBounds`: the pixel region being interpolated and animated
//! - `Field`: sparse column-encoded vector field with its sentinels
//! - Error types shared by all windfield crates
//!
//! Map rendering, projections and drawing surfaces are deliberately
//! absent: collaborators supply a projection closure, boolean pixel mask
//! predicates and a render sink, and consume the field and draw buckets
//! this engine produces.

pub mod bounds;
pub mod error;
pub mod field;
pub mod geometry;

pub use bounds::DisplayBounds;
pub use error::{Error, Result};
pub use field::{Column, Field, FieldVector, INVISIBLE, NIL};
pub use geometry::Vector2;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bounds::DisplayBounds;
    pub use crate::error::{Error, Result};
    pub use crate::field::{Column, Field, FieldVector, INVISIBLE, NIL};
    pub use crate::geometry::Vector2;
}
