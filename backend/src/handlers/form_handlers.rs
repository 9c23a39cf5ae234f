use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use crate::error::AppError;
use crate::handlers::form_dtos::{ApplyForm, EnrollForm, FormFields, SubmitResponse};
use crate::models::lead_models::FunnelStage;
use crate::utils::text::new_token;
use crate::AppState;

async fn read_fields(mut multipart: Multipart) -> Result<FormFields, AppError> {
    let mut fields = FormFields::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed form data: {}", e)))?
    {
        let name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(format!("Malformed form field {}: {}", name, e)))?;
        fields.insert(name, value);
    }
    Ok(fields)
}

fn bump_funnel(state: &AppState, stage: FunnelStage) {
    if let Err(e) = state.metrics_repository.increment(stage) {
        error!("Failed to count funnel stage {}: {}", stage.key(), e);
    }
}

pub async fn apply(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let form = ApplyForm::from_fields(&read_fields(multipart).await?)?;
    let page = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let lead = state
        .lead_repository
        .create_lead(form.into_new_lead(new_token(), Utc::now().timestamp(), page))?;
    info!("New lead {} for course {:?}", lead.token, lead.course);
    bump_funnel(&state, FunnelStage::Apply);

    if !state.lead_notifier.notify_lead(&lead).await {
        warn!("Lead {} was not delivered to any chat", lead.token);
    }

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            ok: true,
            id: lead.token,
        }),
    ))
}

pub async fn enroll(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let form = EnrollForm::from_fields(&read_fields(multipart).await?)?;
    let agreement = state
        .lead_repository
        .create_agreement(form.into_new_agreement(new_token(), Utc::now().timestamp()))?;
    info!("New agreement {} for course {:?}", agreement.token, agreement.course);
    bump_funnel(&state, FunnelStage::Enroll);

    if !state.lead_notifier.notify_agreement(&agreement).await {
        warn!("Agreement {} was not delivered to any chat", agreement.token);
    }

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            ok: true,
            id: agreement.token,
        }),
    ))
}
