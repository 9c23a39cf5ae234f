use gloo_net::http::Request;
use serde_json::json;
use crate::config;

/// Counts a funnel visit. Failures only get logged.
pub async fn record_visit(stage: &str) {
    let url = format!("{}/api/metrics/visit", config::get_backend_url());
    let request = match Request::post(&url).json(&json!({ "stage": stage })) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("Could not build visit request: {}", e);
            return;
        }
    };
    match request.send().await {
        Ok(response) if response.ok() => {}
        Ok(response) => log::warn!("Visit counter answered {}", response.status()),
        Err(e) => log::warn!("Visit counter failed: {}", e),
    }
}
