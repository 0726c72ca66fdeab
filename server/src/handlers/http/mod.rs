pub mod auth;
pub mod resources;
pub mod routes;
pub mod utils;

pub use routes::{Router, authorize, build_api_router};
