use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use crate::models::lead_models::FunnelStage;
use crate::utils::text::tel_link;
use crate::AppState;

static TME_HANDLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"t\.me/([A-Za-z0-9_]{5,32})").expect("valid t.me regex"));

const SITEMAP_PAGES: [(&str, &str); 5] = [
    ("", "1.0"),
    ("courses/fullstack", "0.85"),
    ("courses/data-science", "0.85"),
    ("courses/business", "0.85"),
    ("courses/python-beginners", "0.85"),
];

pub async fn health_check() -> &'static str {
    "OK"
}

/// Configured base URL, or one rebuilt from the Host header. Always ends with `/`.
fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(base) = &state.config.app_base_url {
        return format!("{}/", base);
    }
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{}/", host)
}

pub async fn robots(State(state): State<Arc<AppState>>, headers: HeaderMap) -> impl IntoResponse {
    let body = format!(
        "User-agent: *\nAllow: /\nSitemap: {}sitemap.xml\n",
        base_url(&state, &headers)
    );
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body)
}

pub fn render_sitemap(base_url: &str, lastmod: &str) -> String {
    let entries: Vec<String> = SITEMAP_PAGES
        .iter()
        .map(|(path, priority)| {
            format!(
                "  <url><loc>{}{}</loc><lastmod>{}</lastmod><changefreq>weekly</changefreq><priority>{}</priority></url>",
                base_url, path, lastmod, priority
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}\n</urlset>",
        entries.join("\n")
    )
}

pub async fn sitemap(State(state): State<Arc<AppState>>, headers: HeaderMap) -> impl IntoResponse {
    let lastmod = Local::now().date_naive().format("%Y-%m-%d").to_string();
    let body = render_sitemap(&base_url(&state, &headers), &lastmod);
    ([(header::CONTENT_TYPE, "application/xml")], body)
}

/// Plain 302, the status the old static pages were moved with.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

// Old static course pages moved under /courses/.
pub async fn legacy_fullstack() -> Response {
    found("/courses/fullstack")
}

pub async fn legacy_data_science() -> Response {
    found("/courses/data-science")
}

pub async fn legacy_business() -> Response {
    found("/courses/business")
}

pub async fn legacy_python_beginners() -> Response {
    found("/courses/python-beginners")
}

/// School contacts shown in the page footer.
#[derive(Serialize, Debug, Default, PartialEq)]
pub struct Contacts {
    pub phone: Option<String>,
    pub phone_link: Option<String>,
    pub telegram: Option<String>,
    pub telegram_link: Option<String>,
}

pub fn build_contacts(phone: Option<&str>, telegram: Option<&str>) -> Contacts {
    let mut contacts = Contacts::default();
    if let Some(phone) = phone {
        contacts.phone_link = tel_link(phone);
        contacts.phone = Some(phone.to_string());
    }
    if let Some(raw) = telegram {
        let is_url = raw.starts_with("http://") || raw.starts_with("https://");
        let handle = match TME_HANDLE.captures(raw) {
            Some(caps) if is_url => Some(caps[1].to_string()),
            _ if is_url => None,
            _ => Some(raw.trim_start_matches('@').to_string()).filter(|h| !h.is_empty()),
        };
        match handle {
            Some(handle) => {
                contacts.telegram_link = Some(format!("https://t.me/{}", handle));
                contacts.telegram = Some(format!("@{}", handle));
            }
            // A link we can't read a handle from is shown as-is.
            None => {
                contacts.telegram_link = Some(raw.to_string());
                contacts.telegram = Some(raw.to_string());
            }
        }
    }
    contacts
}

pub async fn contacts(State(state): State<Arc<AppState>>) -> Json<Contacts> {
    Json(build_contacts(
        state.config.contact_phone.as_deref(),
        state.config.contact_telegram.as_deref(),
    ))
}

#[derive(Deserialize)]
pub struct VisitRequest {
    #[serde(default)]
    pub stage: Option<String>,
}

/// Counts a landing-page view. Only the home stage is accepted from the page.
pub async fn record_visit(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VisitRequest>,
) -> StatusCode {
    match request.stage.as_deref() {
        None | Some("") | Some("home") => {}
        Some(_) => return StatusCode::BAD_REQUEST,
    }
    match state.metrics_repository.increment(FunnelStage::Home) {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) => {
            error!("Failed to record visit: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
