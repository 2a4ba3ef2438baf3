//! Watermark API handler.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::decode;
use crate::error::TilemarkError;
use crate::store::ResultStore;
use crate::watermark::{DEFAULT_FONT_SIZE_PERCENT, WatermarkSpec, parse_hex_color};

use super::super::state::AppState;

/// A numeric form field; the page sends range inputs as strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberParam {
    Number(f64),
    Text(String),
}

impl NumberParam {
    fn value(&self, field: &str) -> Result<f64, TilemarkError> {
        let value = match self {
            NumberParam::Number(n) => *n,
            NumberParam::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                TilemarkError::InvalidRequest(format!("{} must be a number, got '{}'", field, s))
            })?,
        };
        if !value.is_finite() {
            return Err(TilemarkError::InvalidRequest(format!("{} must be finite", field)));
        }
        Ok(value)
    }

    fn integer(&self, field: &str) -> Result<i64, TilemarkError> {
        let value = self.value(field)?;
        if value.fract() != 0.0 || value.abs() > i32::MAX as f64 {
            return Err(TilemarkError::InvalidRequest(format!(
                "{} must be an integer, got {}",
                field, value
            )));
        }
        Ok(value as i64)
    }
}

/// Request body for `POST /api/watermark`.
#[derive(Debug, Clone, Deserialize)]
pub struct WatermarkRequest {
    /// Data-URI encoded image
    pub image: String,
    pub text: String,
    /// 0-100 percent
    pub opacity: NumberParam,
    /// `#RRGGBB`
    pub color: String,
    /// Degrees, counter-clockwise
    pub angle: NumberParam,
    /// Percent of the shorter image side
    #[serde(rename = "fontSize", default)]
    pub font_size: Option<NumberParam>,
}

impl WatermarkRequest {
    /// Validate and convert the form fields.
    pub fn to_spec(&self) -> Result<WatermarkSpec, TilemarkError> {
        let opacity = self.opacity.value("opacity")?;
        if !(0.0..=100.0).contains(&opacity) {
            return Err(TilemarkError::InvalidRequest(format!(
                "opacity must be between 0 and 100, got {}",
                opacity
            )));
        }
        let font_size_percent = match &self.font_size {
            Some(param) => param.value("fontSize")?,
            None => DEFAULT_FONT_SIZE_PERCENT,
        };

        let spec = WatermarkSpec::new(self.text.trim())
            .with_opacity(opacity / 100.0)
            .with_color(parse_hex_color(&self.color)?)
            .with_angle(self.angle.integer("angle")? as i32)
            .with_font_size_percent(font_size_percent);
        spec.validate()?;
        Ok(spec)
    }
}

/// Response body for `POST /api/watermark`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatermarkResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WatermarkResponse {
    fn ok(image_url: String) -> Self {
        Self {
            success: true,
            image_url: Some(image_url),
            error: None,
        }
    }

    fn failed(err: &TilemarkError) -> Self {
        Self {
            success: false,
            image_url: None,
            error: Some(err.user_message()),
        }
    }
}

/// POST /api/watermark - watermark an uploaded image and store the result.
///
/// Processing outcomes answer 200 with a `success` flag. A body that is not
/// a well-formed request keeps axum's 4xx status but gets the same JSON shape.
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WatermarkRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            let reason = rejection.body_text();
            warn!(status = %rejection.status(), reason = %reason, "rejected watermark body");
            let body = WatermarkResponse::failed(&TilemarkError::InvalidRequest(reason));
            return (rejection.status(), Json(body)).into_response();
        }
    };

    // Move CPU-intensive work to blocking thread pool
    let result = tokio::task::spawn_blocking(move || process(&state, &req))
        .await
        .map_err(|e| TilemarkError::Server(format!("Task error: {}", e)))
        .and_then(|r| r);

    let body = match result {
        Ok(name) => WatermarkResponse::ok(ResultStore::url_for(&name)),
        Err(e) => {
            error!(error = %e, "watermark request failed");
            WatermarkResponse::failed(&e)
        }
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Decode, watermark, and store. Returns the stored file name.
fn process(state: &AppState, req: &WatermarkRequest) -> Result<String, TilemarkError> {
    let image = decode::decode_data_uri(&req.image)?;
    let spec = req.to_spec()?;

    let watermarked = state.compositor.apply(&image, &spec)?;
    let name = state.store.save(&watermarked.image)?;

    info!(
        file = %name,
        width = watermarked.image.width(),
        height = watermarked.image.height(),
        drawn = watermarked.drawn,
        font_size = watermarked.font_size,
        "watermark applied"
    );
    Ok(name)
}
