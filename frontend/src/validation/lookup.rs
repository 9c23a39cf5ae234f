use gloo_net::http::Request;
use serde::Deserialize;
use crate::config;

/// What the lookup endpoint said about a handle.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct LookupResult {
    pub ok: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl LookupResult {
    /// Network errors, non-2xx answers and unreadable bodies all end up here.
    pub fn failed() -> Self {
        Self {
            ok: false,
            reason: Some("error".to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NeutralReason {
    NotConfigured,
    AuthorizationRequired,
    LookupFailed,
    NotConfirmed,
}

impl NeutralReason {
    pub fn message(self) -> &'static str {
        match self {
            NeutralReason::NotConfigured => "Username check is not configured",
            NeutralReason::AuthorizationRequired => "Username check needs authorization",
            NeutralReason::LookupFailed => "Lookup failed, continuing without verification",
            NeutralReason::NotConfirmed => "Could not confirm this username, check the spelling",
        }
    }
}

/// Display state of a handle field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleStatus {
    Idle,
    Pending,
    Valid,
    Invalid,
    Neutral(NeutralReason),
}

impl HandleStatus {
    pub fn from_result(result: &LookupResult) -> Self {
        if result.ok {
            return HandleStatus::Valid;
        }
        let reason = match result.reason.as_deref() {
            Some("not_configured") => NeutralReason::NotConfigured,
            Some("telethon_login_required") => NeutralReason::AuthorizationRequired,
            Some("error") => NeutralReason::LookupFailed,
            _ => NeutralReason::NotConfirmed,
        };
        HandleStatus::Neutral(reason)
    }

    pub fn class(self) -> &'static str {
        match self {
            HandleStatus::Idle => "",
            HandleStatus::Pending => "is-pending",
            HandleStatus::Valid => "is-valid",
            HandleStatus::Invalid => "is-invalid",
            HandleStatus::Neutral(_) => "is-neutral",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            HandleStatus::Idle => "",
            HandleStatus::Pending => "Checking username…",
            HandleStatus::Valid => "Username found",
            HandleStatus::Invalid => "5-32 characters: latin letters, digits and _",
            HandleStatus::Neutral(reason) => reason.message(),
        }
    }
}

pub async fn fetch_lookup(handle: &str) -> LookupResult {
    let url = format!(
        "{}/validate/telegram?username={}",
        config::get_backend_url(),
        urlencoding::encode(handle)
    );
    match Request::get(&url).send().await {
        Ok(response) if response.ok() => match response.json::<LookupResult>().await {
            Ok(result) => result,
            Err(e) => {
                log::warn!("Unreadable lookup response for {}: {}", handle, e);
                LookupResult::failed()
            }
        },
        Ok(response) => {
            log::warn!("Lookup for {} answered {}", handle, response.status());
            LookupResult::failed()
        }
        Err(e) => {
            log::warn!("Lookup for {} failed: {}", handle, e);
            LookupResult::failed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(ok: bool, reason: Option<&str>) -> LookupResult {
        LookupResult {
            ok,
            reason: reason.map(str::to_string),
        }
    }

    #[test]
    fn reasons_map_to_neutral_states() {
        assert_eq!(HandleStatus::from_result(&result(true, None)), HandleStatus::Valid);
        assert_eq!(
            HandleStatus::from_result(&result(false, Some("not_configured"))),
            HandleStatus::Neutral(NeutralReason::NotConfigured)
        );
        assert_eq!(
            HandleStatus::from_result(&result(false, Some("telethon_login_required"))),
            HandleStatus::Neutral(NeutralReason::AuthorizationRequired)
        );
        assert_eq!(
            HandleStatus::from_result(&LookupResult::failed()),
            HandleStatus::Neutral(NeutralReason::LookupFailed)
        );
        for other in [None, Some("not_found"), Some("invalid")] {
            assert_eq!(
                HandleStatus::from_result(&result(false, other)),
                HandleStatus::Neutral(NeutralReason::NotConfirmed)
            );
        }
    }

    #[test]
    fn body_without_reason_parses() {
        let parsed: LookupResult = serde_json::from_str(r#"{"ok": true, "description": "Alice"}"#).unwrap();
        assert_eq!(parsed, result(true, None));
    }
}
