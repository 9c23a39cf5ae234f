use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use crate::error::AppError;
use crate::handlers::auth_middleware::issue_admin_token;
use crate::models::lead_models::{Agreement, AgreementStatus, Lead, LeadStatus, StatusChange};
use crate::repositories::lead_repository::{AgreementFilter, LeadFilter};
use crate::repositories::whitelist_repository::{RemoveOutcome, WhitelistEntry};
use crate::utils::lead_format::format_ts;
use crate::utils::text::{extract_source, normalize_tags, parse_amount, parse_date};
use crate::AppState;

pub const PAGE_SIZE: usize = 25;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let hash = state
        .config
        .admin_password_hash
        .as_deref()
        .ok_or_else(|| AppError::Unauthorized("Admin login is disabled".to_string()))?;

    match bcrypt::verify(&request.password, hash) {
        Ok(true) => {}
        Ok(false) => {
            warn!("Failed admin login attempt");
            return Err(AppError::Unauthorized("Invalid password".to_string()));
        }
        Err(e) => return Err(AppError::Internal(format!("Password check failed: {}", e))),
    }

    let token = issue_admin_token(&state.config.jwt_secret)
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;
    info!("Admin logged in");
    Ok(Json(json!({ "token": token })))
}

#[derive(Deserialize, Default)]
pub struct LeadListQuery {
    pub q: Option<String>,
    pub course: Option<String>,
    pub status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<usize>,
}

impl LeadListQuery {
    fn filter(&self) -> Result<LeadFilter, AppError> {
        let status = match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(key) => Some(
                LeadStatus::from_key(key).ok_or_else(|| AppError::BadRequest(format!("Unknown status: {}", key)))?,
            ),
            None => None,
        };
        Ok(LeadFilter {
            query: self.q.clone(),
            course: self.course.clone(),
            status,
            date_from: self.from.as_deref().and_then(parse_date),
            date_to: self.to.as_deref().and_then(parse_date),
        })
    }
}

#[derive(Serialize)]
pub struct LeadView {
    #[serde(flatten)]
    pub lead: Lead,
    pub effective_status: LeadStatus,
    pub source: String,
    pub created_display: String,
}

impl LeadView {
    pub fn new(lead: Lead, now: i64) -> Self {
        Self {
            effective_status: lead.effective_status(now),
            source: extract_source(&lead.page),
            created_display: format_ts(lead.created_at),
            lead,
        }
    }
}

#[derive(Serialize)]
pub struct LeadPage {
    pub leads: Vec<LeadView>,
    pub total: usize,
    pub page: usize,
    pub pages: usize,
}

pub fn paginate(leads: Vec<Lead>, page: usize, now: i64) -> LeadPage {
    let total = leads.len();
    let pages = ((total + PAGE_SIZE - 1) / PAGE_SIZE).max(1);
    let page = page.clamp(1, pages);
    let leads = leads
        .into_iter()
        .skip((page - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .map(|lead| LeadView::new(lead, now))
        .collect();
    LeadPage { leads, total, page, pages }
}

pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeadListQuery>,
) -> Result<Json<LeadPage>, AppError> {
    let now = Utc::now().timestamp();
    let leads = state.lead_repository.search_leads(&query.filter()?, now)?;
    Ok(Json(paginate(leads, query.page.unwrap_or(1), now)))
}

#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub token: String,
    pub status: String,
}

pub async fn update_lead_status(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    let change = StatusChange::parse(&request.status)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown status: {}", request.status)))?;
    if !state
        .lead_repository
        .update_status(request.token.trim(), change, Utc::now().timestamp())?
    {
        return Err(AppError::NotFound("Lead not found".to_string()));
    }
    Ok(Json(json!({ "ok": true })))
}

#[derive(Deserialize)]
pub struct MetaUpdateRequest {
    pub token: String,
    pub note: Option<String>,
    pub tags: Option<String>,
    pub next_contact: Option<String>,
}

pub async fn update_lead_meta(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MetaUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    if let Some(next) = request.next_contact.as_deref().map(str::trim) {
        if !next.is_empty() && parse_date(next).is_none() {
            return Err(AppError::BadRequest("next_contact must be YYYY-MM-DD".to_string()));
        }
    }
    let tags = request.tags.as_deref().map(normalize_tags);
    if !state.lead_repository.update_meta(
        request.token.trim(),
        request.note.as_deref(),
        tags.as_deref(),
        request.next_contact.as_deref(),
    )? {
        return Err(AppError::NotFound("Lead not found".to_string()));
    }
    Ok(Json(json!({ "ok": true })))
}

#[derive(Serialize)]
pub struct AgreementView {
    #[serde(flatten)]
    pub agreement: Agreement,
    pub effective_status: AgreementStatus,
    pub created_display: String,
}

pub async fn list_agreements(State(state): State<Arc<AppState>>) -> Result<Json<Vec<AgreementView>>, AppError> {
    let agreements = state
        .lead_repository
        .list_agreements()?
        .into_iter()
        .map(|agreement| AgreementView {
            effective_status: agreement.effective_status(),
            created_display: format_ts(agreement.created_at),
            agreement,
        })
        .collect();
    Ok(Json(agreements))
}

pub async fn update_agreement_status(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    let key = request.status.trim().to_lowercase();
    let status = match key.as_str() {
        "" | "auto" | "reset" => None,
        other => Some(
            AgreementStatus::from_key(other)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown status: {}", other)))?,
        ),
    };
    if !state
        .lead_repository
        .update_agreement_status(request.token.trim(), status)?
    {
        return Err(AppError::NotFound("Agreement not found".to_string()));
    }
    Ok(Json(json!({ "ok": true })))
}

#[derive(Deserialize)]
pub struct AmountUpdateRequest {
    pub token: String,
    #[serde(default)]
    pub amount: String,
}

pub async fn update_agreement_amount(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AmountUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    // Blank clears the amount; anything else has to parse.
    let amount = if request.amount.trim().is_empty() {
        None
    } else {
        Some(
            parse_amount(&request.amount)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid amount: {}", request.amount)))?,
        )
    };
    if !state
        .lead_repository
        .update_agreement_amount(request.token.trim(), amount)?
    {
        return Err(AppError::NotFound("Agreement not found".to_string()));
    }
    Ok(Json(json!({ "ok": true, "amount": amount })))
}

#[derive(Serialize, Debug, PartialEq)]
pub struct Revenue {
    pub total: f64,
    pub average: f64,
    pub paid_count: usize,
}

pub fn revenue(agreements: &[Agreement]) -> Revenue {
    let amounts: Vec<f64> = agreements.iter().filter_map(|a| a.amount).collect();
    let total = amounts.iter().sum::<f64>();
    let average = if amounts.is_empty() { 0.0 } else { total / amounts.len() as f64 };
    Revenue {
        total: (total * 100.0).round() / 100.0,
        average: (average * 100.0).round() / 100.0,
        paid_count: agreements
            .iter()
            .filter(|a| a.effective_status() == AgreementStatus::Paid)
            .count(),
    }
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let now = Utc::now().timestamp();
    let counts = state.lead_repository.status_counts(now)?;
    let statuses: BTreeMap<&str, usize> = LeadStatus::ALL
        .iter()
        .map(|status| (status.key(), counts.get(status).copied().unwrap_or(0)))
        .collect();
    let agreements = state.lead_repository.list_agreements()?;
    Ok(Json(json!({
        "funnel": state.metrics_repository.funnel()?,
        "statuses": statuses,
        "total_leads": counts.values().sum::<usize>(),
        "agreements": agreements.len(),
        "revenue": revenue(&agreements),
    })))
}

pub fn leads_csv(leads: &[Lead], now: i64) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_err = |e: csv::Error| AppError::Internal(format!("CSV export failed: {}", e));
    writer
        .write_record([
            "id", "created", "name", "contact", "course", "telegram", "status", "source", "page", "tags",
            "note", "next_contact",
        ])
        .map_err(csv_err)?;
    for lead in leads {
        let created = format_ts(lead.created_at);
        let source = extract_source(&lead.page);
        let record: [&str; 12] = [
            &lead.token,
            &created,
            &lead.name,
            &lead.contact,
            &lead.course,
            lead.telegram.as_deref().unwrap_or(""),
            lead.effective_status(now).key(),
            &source,
            &lead.page,
            lead.tags.as_deref().unwrap_or(""),
            lead.note.as_deref().unwrap_or(""),
            lead.next_contact.as_deref().unwrap_or(""),
        ];
        writer.write_record(record).map_err(csv_err)?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))
}

fn csv_attachment(filename: &'static str, body: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        body,
    )
}

pub async fn export_leads(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now().timestamp();
    let body = leads_csv(&state.lead_repository.list_leads()?, now)?;
    Ok(csv_attachment("leads.csv", body))
}

#[derive(Deserialize, Default)]
pub struct AgreementExportQuery {
    pub q: Option<String>,
    pub course: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl AgreementExportQuery {
    fn filter(&self) -> AgreementFilter {
        AgreementFilter {
            query: self.q.clone(),
            course: self.course.clone(),
            date_from: self.from.as_deref().and_then(parse_date),
            date_to: self.to.as_deref().and_then(parse_date),
        }
    }
}

pub fn agreements_csv(agreements: &[Agreement]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_err = |e: csv::Error| AppError::Internal(format!("CSV export failed: {}", e));
    writer
        .write_record(["id", "created", "course", "full_name", "phone", "email", "telegram", "amount", "status"])
        .map_err(csv_err)?;
    for agreement in agreements {
        let created = format_ts(agreement.created_at);
        let amount = agreement.amount.map(|a| format!("{:.2}", a)).unwrap_or_default();
        let record: [&str; 9] = [
            &agreement.token,
            &created,
            &agreement.course,
            &agreement.full_name,
            &agreement.phone,
            &agreement.email,
            agreement.telegram.as_deref().unwrap_or(""),
            &amount,
            agreement.effective_status().label(),
        ];
        writer.write_record(record).map_err(csv_err)?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))
}

pub async fn export_agreements(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AgreementExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let agreements = state.lead_repository.search_agreements(&query.filter())?;
    Ok(csv_attachment("agreements.csv", agreements_csv(&agreements)?))
}

pub async fn list_whitelist(State(state): State<Arc<AppState>>) -> Result<Json<Vec<WhitelistEntry>>, AppError> {
    Ok(Json(state.whitelist_repository.list()?))
}

#[derive(Deserialize)]
pub struct WhitelistReplaceRequest {
    pub chat_ids: Vec<i64>,
}

pub async fn replace_whitelist(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WhitelistReplaceRequest>,
) -> Result<Json<Vec<WhitelistEntry>>, AppError> {
    state
        .whitelist_repository
        .replace(&request.chat_ids, Utc::now().timestamp())?;
    info!("Bot whitelist replaced with {} chat ids", request.chat_ids.len());
    Ok(Json(state.whitelist_repository.list()?))
}

#[derive(Deserialize)]
pub struct WhitelistRemoveRequest {
    pub chat_id: i64,
}

pub async fn remove_from_whitelist(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WhitelistRemoveRequest>,
) -> Result<Json<Value>, AppError> {
    match state.whitelist_repository.remove(request.chat_id)? {
        RemoveOutcome::Removed => {
            info!("Removed chat_id={} from the bot whitelist", request.chat_id);
            Ok(Json(json!({ "ok": true })))
        }
        RemoveOutcome::NotListed => Err(AppError::NotFound("Chat id is not whitelisted".to_string())),
        RemoveOutcome::LastEntry => Err(AppError::BadRequest(
            "Cannot remove the last whitelisted chat".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(n: i64) -> Lead {
        Lead {
            id: n as i32,
            token: format!("{:08x}", n),
            created_at: n,
            name: format!("Lead {}", n),
            contact: "+79991234567".to_string(),
            course: "Business".to_string(),
            page: "https://school.example.com/?utm_source=vk_ads".to_string(),
            telegram: None,
            status: None,
            status_updated_at: None,
            note: Some("said \"call me\", later".to_string()),
            tags: None,
            next_contact: None,
        }
    }

    fn agreement(status: Option<&str>, amount: Option<f64>) -> Agreement {
        Agreement {
            id: 1,
            token: "feed0001".to_string(),
            created_at: 0,
            course: "Business".to_string(),
            full_name: "Ivan".to_string(),
            phone: String::new(),
            email: String::new(),
            telegram: None,
            consent: true,
            status: status.map(str::to_string),
            amount,
            agreement: None,
        }
    }

    #[test]
    fn pages_hold_twenty_five_and_clamp() {
        let leads: Vec<Lead> = (0..60).map(lead).collect();
        let page = paginate(leads.clone(), 3, 100);
        assert_eq!(page.total, 60);
        assert_eq!(page.pages, 3);
        assert_eq!(page.leads.len(), 10);

        let clamped = paginate(leads, 99, 100);
        assert_eq!(clamped.page, 3);
        assert_eq!(paginate(Vec::new(), 0, 100).page, 1);
    }

    #[test]
    fn lead_view_reports_source_and_status() {
        let view = LeadView::new(lead(1), 2);
        assert_eq!(view.source, "vk_ads");
        assert_eq!(view.effective_status, LeadStatus::New);
    }

    #[test]
    fn csv_quotes_awkward_fields() {
        let body = String::from_utf8(leads_csv(&[lead(1)], 2).unwrap()).unwrap();
        let mut lines = body.lines();
        assert!(lines.next().unwrap().starts_with("id,created,name"));
        assert!(body.contains("\"said \"\"call me\"\", later\""));
    }

    #[test]
    fn agreements_csv_has_amount_and_status_label() {
        let body = String::from_utf8(agreements_csv(&[agreement(Some("review"), Some(1200.0)), agreement(None, None)]).unwrap()).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], "id,created,course,full_name,phone,email,telegram,amount,status");
        assert!(lines[1].ends_with(",1200.00,Under review"));
        assert!(lines[2].ends_with(",,Signed"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn revenue_sums_amounts_and_counts_paid() {
        let summary = revenue(&[
            agreement(Some("paid"), Some(1000.0)),
            agreement(None, Some(500.5)),
            agreement(Some("canceled"), None),
        ]);
        assert_eq!(summary, Revenue { total: 1500.5, average: 750.25, paid_count: 1 });
    }
}
