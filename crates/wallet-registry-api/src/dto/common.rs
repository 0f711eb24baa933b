//! Common DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Acknowledgement for mutations without a richer result
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}
