//! Low-rank image reconstruction by truncated SVD.
//!
//! [`decompose`] factors a matrix once; [`reconstruct`] rebuilds rank-`k`
//! approximations from the factors. Caching, image decoding and rendering
//! sit on top of those two calls and never feed back into them.

pub mod cache;
pub mod config;
pub mod decomposer;
pub mod error;
pub mod image_io;
pub mod matrix_ops;

pub use cache::{content_key, ReconstructionCache};
pub use config::Config;
pub use decomposer::{decompose, reconstruct, Decomposition};
pub use error::{ConfigError, ImageIoError, LowRankError};
pub use matrix_ops::{frobenius_norm, matrix_from_rows, residual_norm, validate};
