mod extractors;
mod routes;
mod state;
#[cfg(test)]
pub(crate) mod testing;
pub mod v1;

pub use routes::create_router;
pub use state::AppState;
