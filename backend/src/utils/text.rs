use chrono::NaiveDate;
use rand::RngCore;
use url::Url;

/// Eight hex characters, used as the public id of leads and agreements.
pub fn new_token() -> String {
    let mut bytes = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Splits on commas, semicolons and newlines, drops `#` and blanks.
/// Falls back to whitespace when nothing else separated the input.
pub fn normalize_tags(raw: &str) -> String {
    let cleaned = raw.replace('#', " ");
    let mut parts: Vec<&str> = cleaned
        .split(|c| c == ',' || c == ';' || c == '\n')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.len() == 1 && parts[0].contains(char::is_whitespace) && !raw.contains([',', ';', '\n']) {
        parts = parts[0].split_whitespace().collect();
    }
    parts.join(", ")
}

pub fn format_tags_display(tags: &str) -> String {
    tags.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(|tag| format!("#{}", tag))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `+` followed by digits; an 11-digit number starting with 8 is read as a +7 number.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    if digits.len() == 11 && digits.starts_with('8') {
        digits.replace_range(0..1, "7");
    }
    Some(format!("+{}", digits))
}

pub fn tel_link(raw: &str) -> Option<String> {
    normalize_phone(raw).map(|phone| format!("tel:{}", phone))
}

pub fn whatsapp_link(raw: &str) -> Option<String> {
    normalize_phone(raw).map(|phone| format!("https://wa.me/{}", phone.trim_start_matches('+')))
}

/// Where a lead came from: an explicit utm/source parameter, a known referrer,
/// the referrer host, or "Direct".
pub fn extract_source(page: &str) -> String {
    if page.trim().is_empty() {
        return "Direct".to_string();
    }
    let parsed = Url::parse(page).ok();
    if let Some(url) = &parsed {
        for key in ["utm_source", "source", "utm"] {
            if let Some((_, value)) = url.query_pairs().find(|(k, v)| k == key && !v.is_empty()) {
                return value.chars().take(48).collect();
            }
        }
    }
    let host = parsed
        .as_ref()
        .and_then(|url| url.host_str().map(str::to_lowercase))
        .unwrap_or_default();
    let lower = page.to_lowercase();
    const KNOWN: [(&str, &str); 8] = [
        ("google", "Google"),
        ("yandex", "Yandex"),
        ("vk.com", "VK"),
        ("vk", "VK"),
        ("t.me", "Telegram"),
        ("telegram", "Telegram"),
        ("youtube", "YouTube"),
        ("instagram", "Instagram"),
    ];
    for (needle, label) in KNOWN {
        if lower.contains(needle) {
            return label.to_string();
        }
    }
    if host.is_empty() {
        "Direct".to_string()
    } else {
        host
    }
}

/// Accepts `1 500,50` style input as well as plain numbers.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect::<String>().replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|amount| amount.is_finite())
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_eight_hex_chars() {
        let token = new_token();
        assert_eq!(token.len(), 8);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<b>Tom & \"Jerry\"</b>"), "&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;/b&gt;");
    }

    #[test]
    fn tags_split_on_separators_or_whitespace() {
        assert_eq!(normalize_tags("#hot; python\n  ,vip"), "hot, python, vip");
        assert_eq!(normalize_tags("hot python"), "hot, python");
        assert_eq!(normalize_tags("  "), "");
        assert_eq!(format_tags_display("hot, vip"), "#hot #vip");
    }

    #[test]
    fn phones_normalize_to_plus_seven() {
        assert_eq!(normalize_phone("8 (999) 123-45-67").as_deref(), Some("+79991234567"));
        assert_eq!(normalize_phone("+44 20 7946 0958").as_deref(), Some("+442079460958"));
        assert_eq!(normalize_phone("call me"), None);
        assert_eq!(whatsapp_link("89991234567").as_deref(), Some("https://wa.me/79991234567"));
        assert_eq!(tel_link("79991234567").as_deref(), Some("tel:+79991234567"));
    }

    #[test]
    fn source_prefers_explicit_parameters() {
        assert_eq!(extract_source(""), "Direct");
        assert_eq!(extract_source("https://site.ru/?utm_source=newsletter"), "newsletter");
        assert_eq!(extract_source("https://www.google.com/search?q=x"), "Google");
        assert_eq!(extract_source("https://partner.example.org/page"), "partner.example.org");
    }

    #[test]
    fn amounts_accept_spaces_and_commas() {
        assert_eq!(parse_amount("1 500,50"), Some(1500.5));
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
    }
}
