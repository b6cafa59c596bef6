//! v1 wire types.
//!
//! Kept separate from the domain models in `src/models/`; conversions live
//! next to each DTO.

pub mod admin;
pub mod cycles;

pub use admin::*;
pub use cycles::*;
