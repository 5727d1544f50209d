pub mod color_scheme;
pub mod cookie;
pub mod form;
pub mod mail;
pub mod rate_limit;
pub mod security;
pub mod session;
pub mod time;
