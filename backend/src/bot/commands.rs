use std::sync::Arc;
use tracing::error;
use crate::api::telegram_bot_api::InlineKeyboardMarkup;
use crate::error::AppError;
use crate::models::lead_models::{Lead, LeadStatus, StatusChange};
use crate::repositories::lead_repository::LeadRepository;
use crate::repositories::whitelist_repository::WhitelistRepository;
use crate::utils::lead_format::{admin_url, build_lead_text, build_status_keyboard, parse_status_callback};
use crate::utils::text::{escape_html, normalize_tags, parse_date};

const DEFAULT_LEADS: usize = 5;
const MAX_LEADS: usize = 20;
const MAX_FIND_RESULTS: usize = 10;

const HELP_TEXT: &str = "<b>Lead bot</b>\n\n\
• /leads <code>N</code> latest applications (1-20)\n\
• /lead <code>&lt;id&gt;</code> application card\n\
• /find <code>&lt;text&gt;</code> search by name, contact, course or page\n\
• /status <code>&lt;id&gt; &lt;status|auto&gt;</code> change status\n\
• /note <code>&lt;id&gt; &lt;text&gt;</code> set a note\n\
• /tags <code>&lt;id&gt; &lt;tags&gt;</code> set tags\n\
• /next <code>&lt;id&gt; &lt;YYYY-MM-DD|-&gt;</code> next contact date\n\
• /stats status summary";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Help,
    Leads(usize),
    Lead(String),
    Find(String),
    Status { token: String, status: String },
    Note { token: String, text: String },
    Tags { token: String, tags: String },
    Next { token: String, date: String },
    Stats,
    /// Known command with missing arguments; carries the usage line.
    Usage(&'static str),
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], s[idx..].trim()),
        None => (s, ""),
    }
}

/// Parses `/cmd args`, accepting the `/cmd@botname` form. Non-commands give `None`.
pub fn parse_command(text: &str) -> Option<Command> {
    let (head, rest) = split_word(text);
    let name = head.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name).to_lowercase();
    let (first, tail) = split_word(rest);

    let command = match name.as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "leads" => {
            let limit = first.parse::<usize>().unwrap_or(DEFAULT_LEADS);
            Command::Leads(limit.clamp(1, MAX_LEADS))
        }
        "lead" if !first.is_empty() => Command::Lead(first.to_string()),
        "lead" => Command::Usage("Usage: /lead &lt;id&gt;"),
        "find" if !rest.is_empty() => Command::Find(rest.to_string()),
        "find" => Command::Usage("Usage: /find &lt;text&gt;"),
        "status" if !tail.is_empty() => Command::Status {
            token: first.to_string(),
            status: tail.to_string(),
        },
        "status" => Command::Usage("Usage: /status &lt;id&gt; &lt;status&gt;"),
        "note" if !tail.is_empty() => Command::Note {
            token: first.to_string(),
            text: tail.to_string(),
        },
        "note" => Command::Usage("Usage: /note &lt;id&gt; &lt;text&gt;"),
        "tags" if !tail.is_empty() => Command::Tags {
            token: first.to_string(),
            tags: tail.to_string(),
        },
        "tags" => Command::Usage("Usage: /tags &lt;id&gt; &lt;comma separated tags&gt;"),
        "next" if !tail.is_empty() => Command::Next {
            token: first.to_string(),
            date: tail.to_string(),
        },
        "next" => Command::Usage("Usage: /next &lt;id&gt; &lt;YYYY-MM-DD&gt;"),
        "stats" => Command::Stats,
        _ => return None,
    };
    Some(command)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }
}

/// Result of a status button press: the toast text and, when the lead still
/// exists, the refreshed card to put in place of the old one.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackOutcome {
    pub answer: String,
    pub card: Option<Reply>,
}

pub struct LeadBot {
    repository: Arc<LeadRepository>,
    whitelist: Arc<WhitelistRepository>,
    app_base_url: Option<String>,
}

impl LeadBot {
    pub fn new(repository: Arc<LeadRepository>, whitelist: Arc<WhitelistRepository>, app_base_url: Option<String>) -> Self {
        Self {
            repository,
            whitelist,
            app_base_url,
        }
    }

    /// Checked against the stored whitelist on every update, so admin edits apply at once.
    pub fn is_allowed(&self, user_id: i64) -> bool {
        match self.whitelist.contains(user_id) {
            Ok(allowed) => allowed,
            Err(e) => {
                error!("Whitelist lookup failed for user_id={}: {}", user_id, e);
                false
            }
        }
    }

    fn card(&self, lead: &Lead, now: i64) -> Reply {
        let status = lead.effective_status(now);
        Reply {
            text: build_lead_text(lead, now),
            keyboard: Some(build_status_keyboard(
                &lead.token,
                Some(status),
                admin_url(self.app_base_url.as_deref(), lead),
            )),
        }
    }

    pub fn handle_command(&self, command: Command, now: i64) -> Result<Vec<Reply>, AppError> {
        let reply = match command {
            Command::Start | Command::Help => Reply::text(HELP_TEXT),
            Command::Usage(usage) => Reply::text(usage),
            Command::Leads(limit) => {
                let leads = self.repository.list_leads()?;
                if leads.is_empty() {
                    return Ok(vec![Reply::text("No applications yet.")]);
                }
                return Ok(leads.iter().take(limit).map(|lead| self.card(lead, now)).collect());
            }
            Command::Lead(token) => match self.repository.find_by_token(&token)? {
                Some(lead) => self.card(&lead, now),
                None => Reply::text("Application not found."),
            },
            Command::Find(query) => self.find(&query, now)?,
            Command::Status { token, status } => {
                let change = match StatusChange::parse(&status) {
                    Some(change) => change,
                    None => return Ok(vec![Reply::text("Unknown status. Example: /status abcd1234 contacted")]),
                };
                let lead = match self.repository.find_by_token(&token)? {
                    Some(lead) => lead,
                    None => return Ok(vec![Reply::text("Application not found.")]),
                };
                if self.repository.update_status(&lead.token, change, now)? {
                    Reply::text(format!("Status updated: {}", change_label(change)))
                } else {
                    Reply::text("Could not update the status.")
                }
            }
            Command::Note { token, text } => {
                self.update_meta(&token, Some(&text), None, None, "Note updated.")?
            }
            Command::Tags { token, tags } => {
                let tags = normalize_tags(&tags);
                self.update_meta(&token, None, Some(&tags), None, "Tags updated.")?
            }
            Command::Next { token, date } => {
                let date = date.trim();
                if date == "-" {
                    self.update_meta(&token, None, None, Some(""), "Next contact date cleared.")?
                } else if parse_date(date).is_none() {
                    Reply::text("Invalid date. Example: 2026-02-05")
                } else {
                    self.update_meta(&token, None, None, Some(date), "Next contact date updated.")?
                }
            }
            Command::Stats => self.stats(now)?,
        };
        Ok(vec![reply])
    }

    fn update_meta(
        &self,
        token: &str,
        note: Option<&str>,
        tags: Option<&str>,
        next_contact: Option<&str>,
        done: &str,
    ) -> Result<Reply, AppError> {
        let lead = match self.repository.find_by_token(token)? {
            Some(lead) => lead,
            None => return Ok(Reply::text("Application not found.")),
        };
        if self.repository.update_meta(&lead.token, note, tags, next_contact)? {
            Ok(Reply::text(done))
        } else {
            Ok(Reply::text("Could not update the application."))
        }
    }

    fn find(&self, query: &str, now: i64) -> Result<Reply, AppError> {
        let needle = query.trim().to_lowercase();
        let results: Vec<Lead> = self
            .repository
            .list_leads()?
            .into_iter()
            .filter(|lead| {
                [&lead.name, &lead.contact, &lead.course, &lead.page]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .take(MAX_FIND_RESULTS)
            .collect();
        if results.is_empty() {
            return Ok(Reply::text("Nothing found."));
        }
        let mut lines = vec!["🔎 <b>Matching applications</b>".to_string()];
        for lead in &results {
            let status = lead.effective_status(now);
            lines.push(format!(
                "{} <code>{}</code> {} ({}) · {}",
                status.emoji(),
                lead.token,
                escape_html(if lead.name.is_empty() { "—" } else { &lead.name }),
                escape_html(if lead.contact.is_empty() { "—" } else { &lead.contact }),
                status.label()
            ));
        }
        lines.push(String::new());
        lines.push("Open a card: /lead <code>&lt;id&gt;</code>".to_string());
        Ok(Reply::text(lines.join("\n")))
    }

    fn stats(&self, now: i64) -> Result<Reply, AppError> {
        let counts = self.repository.status_counts(now)?;
        let total: usize = counts.values().sum();
        let mut lines = vec![
            "📊 <b>Application statuses</b>".to_string(),
            format!("Total: <b>{}</b>", total),
            String::new(),
        ];
        for status in LeadStatus::ALL {
            lines.push(format!(
                "{} {}: <b>{}</b>",
                status.emoji(),
                status.label(),
                counts.get(&status).copied().unwrap_or(0)
            ));
        }
        Ok(Reply::text(lines.join("\n")))
    }

    pub fn handle_callback(&self, data: &str, now: i64) -> Result<CallbackOutcome, AppError> {
        let (token, status) = match parse_status_callback(data) {
            Some(parts) => parts,
            None => {
                return Ok(CallbackOutcome {
                    answer: "Malformed button data.".to_string(),
                    card: None,
                })
            }
        };
        let change = match StatusChange::parse(status) {
            Some(change) => change,
            None => {
                return Ok(CallbackOutcome {
                    answer: "Unknown status.".to_string(),
                    card: None,
                })
            }
        };
        if !self.repository.update_status(token, change, now)? {
            return Ok(CallbackOutcome {
                answer: "Application not found.".to_string(),
                card: None,
            });
        }
        let card = self
            .repository
            .find_by_token(token)?
            .map(|lead| self.card(&lead, now));
        Ok(CallbackOutcome {
            answer: format!("Status updated: {}", change_label(change)),
            card,
        })
    }
}

fn change_label(change: StatusChange) -> &'static str {
    match change {
        StatusChange::Set(status) => status.label(),
        StatusChange::Auto => "Auto",
    }
}
