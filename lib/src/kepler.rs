//! Conic-section math: orbit segments and the closest-point search
//! between two conics.

pub mod closest;
pub mod orbits;
