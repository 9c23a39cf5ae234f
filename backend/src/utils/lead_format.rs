use chrono::{Local, TimeZone};
use crate::api::telegram_bot_api::{InlineKeyboardButton, InlineKeyboardMarkup};
use crate::models::lead_models::{Agreement, Lead, LeadStatus};
use crate::utils::text::{escape_html, format_tags_display, tel_link, whatsapp_link};

const STATUS_ROWS: [&[&str]; 4] = [
    &["new", "contacted", "qualified"],
    &["call_scheduled", "paid", "lost"],
    &["in_progress", "closed", "archived"],
    &["auto"],
];

pub fn format_ts(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%d.%m.%Y %H:%M").to_string(),
        None => "—".to_string(),
    }
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "—"
    } else {
        value
    }
}

pub fn admin_url(app_base_url: Option<&str>, lead: &Lead) -> Option<String> {
    let base = app_base_url?;
    let query = if !lead.contact.trim().is_empty() {
        lead.contact.trim()
    } else {
        lead.name.trim()
    };
    if query.is_empty() {
        return Some(format!("{}/admin?view=leads", base));
    }
    Some(format!("{}/admin?view=leads&q={}", base, urlencoding::encode(query)))
}

/// HTML card for a lead, as sent to the lead chats.
pub fn build_lead_text(lead: &Lead, now: i64) -> String {
    let status = lead.effective_status(now);
    let title = if status == LeadStatus::New {
        "🆕 <b>New application</b>"
    } else {
        "🧾 <b>Application</b>"
    };

    let mut lines = vec![
        title.to_string(),
        format!("🆔 <b>ID:</b> <code>{}</code>", escape_html(&lead.token)),
        format!("{} <b>Status:</b> {}", status.emoji(), status.label()),
        format!("🕒 <b>Time:</b> {}", format_ts(lead.created_at)),
        String::new(),
        "<b>Contact</b>".to_string(),
        format!("👤 {}", escape_html(or_dash(&lead.name))),
        format!("📱 {}", escape_html(or_dash(&lead.contact))),
        format!("🎯 {}", escape_html(or_dash(&lead.course))),
    ];
    if let Some(telegram) = lead.telegram.as_deref().filter(|t| !t.trim().is_empty()) {
        lines.push(format!("💬 {}", escape_html(telegram)));
    }
    lines.push(String::new());
    lines.push("<b>Source</b>".to_string());
    lines.push(format!("🔗 {}", escape_html(or_dash(&lead.page))));

    let tags = lead.tags.as_deref().map(format_tags_display).unwrap_or_default();
    if !tags.is_empty() {
        lines.push(format!("🏷 <b>Tags:</b> {}", escape_html(&tags)));
    }
    if let Some(note) = lead.note.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        lines.push(format!("📝 <b>Note:</b> {}", escape_html(note)));
    }
    if let Some(next) = lead.next_contact.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        lines.push(format!("📅 <b>Next contact:</b> {}", escape_html(next)));
    }

    let mut actions = Vec::new();
    if let Some(link) = tel_link(&lead.contact) {
        actions.push(format!("<a href=\"{}\">📞 Call</a>", link));
    }
    if let Some(link) = whatsapp_link(&lead.contact) {
        actions.push(format!("<a href=\"{}\">💬 WhatsApp</a>", link));
    }
    if !actions.is_empty() {
        lines.push(String::new());
        lines.push("<b>Quick actions</b>".to_string());
        lines.push(actions.join(" | "));
    }
    lines.join("\n")
}

pub fn build_agreement_text(agreement: &Agreement) -> String {
    let mut lines = vec![
        "✅ <b>Course purchase request</b>".to_string(),
        format!("🆔 <b>ID:</b> <code>{}</code>", escape_html(&agreement.token)),
        format!("🎯 <b>Course:</b> {}", escape_html(or_dash(&agreement.course))),
        format!("👤 <b>Full name:</b> {}", escape_html(or_dash(&agreement.full_name))),
        format!("📞 <b>Phone:</b> {}", escape_html(or_dash(&agreement.phone))),
        format!("✉️ <b>Email:</b> {}", escape_html(or_dash(&agreement.email))),
        format!(
            "💬 <b>Telegram:</b> {}",
            escape_html(or_dash(agreement.telegram.as_deref().unwrap_or("")))
        ),
    ];
    if let Some(version) = &agreement.agreement {
        lines.push(format!("📄 <b>Offer:</b> {}", escape_html(version)));
    }
    lines.join("\n")
}

pub fn build_status_keyboard(token: &str, selected: Option<LeadStatus>, admin_url: Option<String>) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = STATUS_ROWS
        .iter()
        .map(|row| {
            row.iter()
                .map(|key| {
                    let (emoji, label, is_selected) = match LeadStatus::from_key(key) {
                        Some(status) => (status.emoji(), status.label(), selected == Some(status)),
                        None => ("🤖", "Auto", false),
                    };
                    let text = if is_selected {
                        format!("{} ✅ {}", emoji, label)
                    } else {
                        format!("{} {}", emoji, label)
                    };
                    InlineKeyboardButton {
                        text,
                        callback_data: Some(format!("lead:{}:{}", token, key)),
                        url: None,
                    }
                })
                .collect()
        })
        .collect();
    if let Some(url) = admin_url {
        rows.push(vec![InlineKeyboardButton {
            text: "🧭 Open in admin".to_string(),
            callback_data: None,
            url: Some(url),
        }]);
    }
    InlineKeyboardMarkup { inline_keyboard: rows }
}

/// `lead:<token>:<status>` → (token, status)
pub fn parse_status_callback(data: &str) -> Option<(&str, &str)> {
    let rest = data.strip_prefix("lead:")?;
    let (token, status) = rest.rsplit_once(':')?;
    if token.is_empty() || status.is_empty() {
        return None;
    }
    Some((token, status))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_lead() -> Lead {
        Lead {
            id: 7,
            token: "beef0042".to_string(),
            created_at: 1_700_000_000,
            name: "<script>Ivan</script>".to_string(),
            contact: "8 999 123 45 67".to_string(),
            course: "Data Science".to_string(),
            page: "https://school.example.com/courses/data-science".to_string(),
            telegram: Some("@ivan_dev".to_string()),
            status: Some("paid".to_string()),
            status_updated_at: None,
            note: Some("call after 6pm".to_string()),
            tags: Some("vip, evening".to_string()),
            next_contact: None,
        }
    }

    #[test]
    fn agreement_card_names_the_accepted_offer() {
        let mut agreement = Agreement {
            id: 1,
            token: "feed0001".to_string(),
            created_at: 1_700_000_000,
            course: "Full-stack".to_string(),
            full_name: "Ivan Petrov".to_string(),
            phone: "+79991234567".to_string(),
            email: String::new(),
            telegram: None,
            consent: true,
            status: None,
            amount: None,
            agreement: Some("offer-2024-09".to_string()),
        };
        let text = build_agreement_text(&agreement);
        assert!(text.contains("📄 <b>Offer:</b> offer-2024-09"));
        assert!(text.contains("✉️ <b>Email:</b> —"));

        agreement.agreement = None;
        assert!(!build_agreement_text(&agreement).contains("Offer"));
    }

    #[test]
    fn lead_card_escapes_user_text_and_links_the_phone() {
        let text = build_lead_text(&sample_lead(), 1_700_000_100);
        assert!(text.contains("&lt;script&gt;Ivan&lt;/script&gt;"));
        assert!(!text.contains("<script>"));
        assert!(text.contains("<code>beef0042</code>"));
        assert!(text.contains("💰 <b>Status:</b> Paid"));
        assert!(text.contains("tel:+79991234567"));
        assert!(text.contains("https://wa.me/79991234567"));
        assert!(text.contains("#vip #evening"));
        assert!(text.contains("📝 <b>Note:</b> call after 6pm"));
        assert!(!text.contains("Next contact"));
    }

    #[test]
    fn keyboard_marks_selected_status_and_adds_admin_link() {
        let keyboard = build_status_keyboard(
            "beef0042",
            Some(LeadStatus::Paid),
            Some("https://school.example.com/admin".to_string()),
        );
        assert_eq!(keyboard.inline_keyboard.len(), 5);
        let paid = &keyboard.inline_keyboard[1][1];
        assert_eq!(paid.text, "💰 ✅ Paid");
        assert_eq!(paid.callback_data.as_deref(), Some("lead:beef0042:paid"));
        let auto = &keyboard.inline_keyboard[3][0];
        assert_eq!(auto.callback_data.as_deref(), Some("lead:beef0042:auto"));
        assert_eq!(keyboard.inline_keyboard[4][0].url.as_deref(), Some("https://school.example.com/admin"));
    }

    #[test]
    fn admin_url_searches_by_contact() {
        let lead = sample_lead();
        assert_eq!(admin_url(None, &lead), None);
        assert_eq!(
            admin_url(Some("https://s.example"), &lead).as_deref(),
            Some("https://s.example/admin?view=leads&q=8%20999%20123%2045%2067")
        );
    }

    #[test]
    fn callback_data_round_trips_through_parser() {
        assert_eq!(parse_status_callback("lead:beef0042:call_scheduled"), Some(("beef0042", "call_scheduled")));
        assert_eq!(parse_status_callback("other:beef:paid"), None);
        assert_eq!(parse_status_callback("lead::paid"), None);
    }
}
