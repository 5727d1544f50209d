pub mod controller;
pub mod routes;
pub mod schema;

pub use routes::color_scheme_routes;
