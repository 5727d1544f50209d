pub mod auth;
pub mod color_scheme;
