pub mod admin;
pub mod cycles;
pub(crate) mod health;

pub use health::health_check;
