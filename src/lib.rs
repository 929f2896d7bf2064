pub mod lowrank;

pub use lowrank::{decompose, reconstruct, Decomposition, LowRankError};
