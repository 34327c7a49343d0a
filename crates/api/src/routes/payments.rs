//! Payment initiation and provider webhooks.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Deserializer, Serialize};

use cartage_core::{OrderId, PaymentId, PaymentStatus, ProviderName};

use super::{parse_json, parse_path};
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::services::{InitiatedPayment, PaymentService, WebhookService};
use crate::state::AppState;

/// Payment initiation request body.
#[derive(Debug, Deserialize)]
pub struct InitiateRequest {
    pub order_id: OrderId,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub provider: Option<ProviderName>,
}

/// A missing, null or blank provider falls back to the configured default.
fn blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<ProviderName>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(name) => ProviderName::parse(name)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Provider notification body. Extra fields are kept in the stored payload.
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub provider_ref: String,
    pub status: String,
}

/// Webhook acknowledgement.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub status: PaymentStatus,
}

/// Start a payment for the full amount of an order.
pub async fn initiate<S: Store>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> Result<(StatusCode, Json<InitiatedPayment>)> {
    let request: InitiateRequest = parse_json(&body)?;

    let payment = PaymentService::new(state.store(), state.settings(), state.references())
        .initiate(request.order_id, request.provider)
        .await?;

    Ok((StatusCode::CREATED, Json(payment)))
}

/// Apply a provider notification.
///
/// The raw body is stored verbatim as the payment's last payload.
pub async fn webhook<S: Store>(
    State(state): State<AppState<S>>,
    Path(provider): Path<String>,
    body: Bytes,
) -> Result<Json<WebhookResponse>> {
    let provider: ProviderName = parse_path(&provider)?;
    let request: WebhookRequest = parse_json(&body)?;
    if request.provider_ref.trim().is_empty() {
        return Err(AppError::InvalidPayload(
            "provider_ref cannot be empty".to_owned(),
        ));
    }
    if request.status.trim().is_empty() {
        return Err(AppError::InvalidPayload("status cannot be empty".to_owned()));
    }
    let payload = std::str::from_utf8(&body).map_err(|_| AppError::InvalidJson)?;

    let outcome = WebhookService::new(state.store())
        .apply(&provider, &request.provider_ref, &request.status, payload)
        .await?;

    Ok(Json(WebhookResponse {
        payment_id: outcome.payment_id,
        order_id: outcome.order_id,
        status: outcome.status,
    }))
}
