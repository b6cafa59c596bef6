mod cycle;
mod interpretation;

pub use cycle::*;
pub use interpretation::*;
