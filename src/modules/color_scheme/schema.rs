use serde::{Deserialize, Serialize};

use crate::services::color_scheme::ColorScheme;

#[derive(Debug, Deserialize)]
pub struct SetColorSchemeRequest {
    pub color_scheme: ColorScheme,
}

#[derive(Debug, Serialize)]
pub struct ColorSchemeResponse {
    pub color_scheme: ColorScheme,
}
