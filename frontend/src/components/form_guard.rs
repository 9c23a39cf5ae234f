//! Client-side checks that run before a form is posted, and the post itself.

use gloo_net::http::Request;
use serde::Deserialize;
use web_sys::{FormData, HtmlFormElement};
use crate::config;
use crate::validation::lookup::HandleStatus;
use crate::validation::phone::is_plausible_phone;

pub const CLOSE_AFTER_SUCCESS_MS: u32 = 1800;
pub const GENERIC_FAILURE: &str = "Could not send the form. Please try again in a minute.";

/// Why a submit was stopped before it reached the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitBlock {
    HandlePending,
    HandleInvalid,
    PhoneImplausible,
    ContactMissing,
    ConsentMissing,
}

impl SubmitBlock {
    pub fn message(self) -> &'static str {
        match self {
            SubmitBlock::HandlePending => "Please wait for the username verification to finish",
            SubmitBlock::HandleInvalid => "Fix the Telegram username or leave it empty",
            SubmitBlock::PhoneImplausible => "Please enter a real phone number",
            SubmitBlock::ContactMissing => "Leave a phone number or an email",
            SubmitBlock::ConsentMissing => "Please accept the agreement terms",
        }
    }
}

fn check_handle(handle: HandleStatus) -> Result<(), SubmitBlock> {
    match handle {
        HandleStatus::Pending => Err(SubmitBlock::HandlePending),
        HandleStatus::Invalid => Err(SubmitBlock::HandleInvalid),
        // Unconfirmed handles still go through; the team checks them by hand.
        _ => Ok(()),
    }
}

pub fn apply_guard(phone: &str, strict_phone: bool, handle: HandleStatus) -> Result<(), SubmitBlock> {
    check_handle(handle)?;
    if !is_plausible_phone(phone, strict_phone) {
        return Err(SubmitBlock::PhoneImplausible);
    }
    Ok(())
}

pub fn enroll_guard(
    phone: &str,
    email: &str,
    consent: bool,
    strict_phone: bool,
    handle: HandleStatus,
) -> Result<(), SubmitBlock> {
    check_handle(handle)?;
    let phone = phone.trim();
    if phone.is_empty() && email.trim().is_empty() {
        return Err(SubmitBlock::ContactMissing);
    }
    if !phone.is_empty() && !is_plausible_phone(phone, strict_phone) {
        return Err(SubmitBlock::PhoneImplausible);
    }
    if !consent {
        return Err(SubmitBlock::ConsentMissing);
    }
    Ok(())
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Posts the form as multipart data to `path` on the backend.
pub async fn post_form(path: &str, form: &HtmlFormElement) -> Result<(), String> {
    let data = FormData::new_with_form(form).map_err(|e| {
        log::error!("Could not read form data: {:?}", e);
        GENERIC_FAILURE.to_string()
    })?;
    let url = format!("{}{}", config::get_backend_url(), path);
    match Request::post(&url).body(data).send().await {
        Ok(response) if response.ok() => Ok(()),
        Ok(response) => {
            let status = response.status();
            match response.json::<ErrorBody>().await {
                Ok(body) if status == 400 => Err(body.error),
                _ => {
                    log::warn!("{} answered {}", path, status);
                    Err(GENERIC_FAILURE.to_string())
                }
            }
        }
        Err(e) => {
            log::warn!("{} failed: {}", path, e);
            Err(GENERIC_FAILURE.to_string())
        }
    }
}
