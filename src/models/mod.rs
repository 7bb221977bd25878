//! The abstract, backend-independent deck model. Every entity here is created fresh
//! from caller JSON per render call and only ever read by the engine.

pub mod chart;
pub mod colors;
pub mod deck;
pub mod slide;
pub mod table;
pub mod theme;
