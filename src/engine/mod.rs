//! Backend-independent rendering logic. Everything here is pure and deterministic; the
//! converters only translate its results into their own drawing primitives.

pub mod csv;
pub mod format;
pub mod geometry;
pub mod layout;
pub mod mining;
pub mod normalize;
pub mod prepare;
pub mod templates;
