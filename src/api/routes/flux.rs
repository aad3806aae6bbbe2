//! Flux Translation Routes
//!
//! Stateless translation between query models and Flux text.
//!
//! - POST /api/v1/flux/render - Model to text
//! - POST /api/v1/flux/parse - Text to model

use axum::Json;

use crate::api::dto::{ParseRequest, ParseResponse, RenderRequest, RenderResponse};
use crate::flux::{parse, to_text};

/// POST /api/v1/flux/render
pub async fn render(Json(req): Json<RenderRequest>) -> Json<RenderResponse> {
    Json(RenderResponse {
        text: to_text(&req.model),
    })
}

/// POST /api/v1/flux/parse
pub async fn parse_text(Json(req): Json<ParseRequest>) -> Json<ParseResponse> {
    let model = parse(&req.text);
    let complex = model.is_raw();
    Json(ParseResponse { model, complex })
}
