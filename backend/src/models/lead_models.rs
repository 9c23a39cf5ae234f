use diesel::prelude::*;
use serde::Serialize;
use crate::schema::{agreements, leads};

const DAY_SECS: i64 = 24 * 60 * 60;

#[derive(Queryable, Selectable, Serialize, Clone, Debug)]
#[diesel(table_name = leads)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Lead {
    pub id: i32,
    pub token: String, // short hex id shown to admins and used in bot commands
    pub created_at: i64, // epoch seconds
    pub name: String,
    pub contact: String, // whatever the visitor typed into the phone field
    pub course: String,
    pub page: String, // referer of the apply form
    pub telegram: Option<String>,
    pub status: Option<String>, // manual status, None means derived from age
    pub status_updated_at: Option<i64>,
    pub note: Option<String>,
    pub tags: Option<String>,
    pub next_contact: Option<String>, // YYYY-MM-DD
}

#[derive(Insertable)]
#[diesel(table_name = leads)]
pub struct NewLead {
    pub token: String,
    pub created_at: i64,
    pub name: String,
    pub contact: String,
    pub course: String,
    pub page: String,
    pub telegram: Option<String>,
}

#[derive(Queryable, Selectable, Serialize, Clone, Debug)]
#[diesel(table_name = agreements)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Agreement {
    pub id: i32,
    pub token: String,
    pub created_at: i64,
    pub course: String,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub telegram: Option<String>,
    pub consent: bool,
    pub status: Option<String>,
    pub amount: Option<f64>,
    pub agreement: Option<String>, // offer version the visitor accepted
}

#[derive(Insertable)]
#[diesel(table_name = agreements)]
pub struct NewAgreement {
    pub token: String,
    pub created_at: i64,
    pub course: String,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub telegram: Option<String>,
    pub consent: bool,
    pub agreement: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    CallScheduled,
    Paid,
    Lost,
    InProgress,
    Closed,
    Archived,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 9] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::CallScheduled,
        LeadStatus::Paid,
        LeadStatus::Lost,
        LeadStatus::InProgress,
        LeadStatus::Closed,
        LeadStatus::Archived,
    ];

    pub fn key(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::CallScheduled => "call_scheduled",
            LeadStatus::Paid => "paid",
            LeadStatus::Lost => "lost",
            LeadStatus::InProgress => "in_progress",
            LeadStatus::Closed => "closed",
            LeadStatus::Archived => "archived",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::Contacted => "Contacted",
            LeadStatus::Qualified => "Qualified",
            LeadStatus::CallScheduled => "Call scheduled",
            LeadStatus::Paid => "Paid",
            LeadStatus::Lost => "Lost",
            LeadStatus::InProgress => "In progress",
            LeadStatus::Closed => "Closed",
            LeadStatus::Archived => "Archived",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            LeadStatus::New => "🆕",
            LeadStatus::Contacted => "📞",
            LeadStatus::Qualified => "✅",
            LeadStatus::CallScheduled => "📅",
            LeadStatus::Paid => "💰",
            LeadStatus::Lost => "❌",
            LeadStatus::InProgress => "⏳",
            LeadStatus::Closed => "📦",
            LeadStatus::Archived => "🗄",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|status| status.key() == key)
    }
}

/// What an admin asked the status to become.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusChange {
    Set(LeadStatus),
    /// Drop the manual status and go back to the age-derived one.
    Auto,
}

impl StatusChange {
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_lowercase();
        match key.as_str() {
            "" | "auto" | "clear" | "reset" => Some(StatusChange::Auto),
            other => LeadStatus::from_key(other).map(StatusChange::Set),
        }
    }
}

impl Lead {
    /// Manual status wins; otherwise a lead is new for a day, in progress for a week,
    /// then archived.
    pub fn effective_status(&self, now: i64) -> LeadStatus {
        if let Some(manual) = self.status.as_deref().and_then(LeadStatus::from_key) {
            return manual;
        }
        let age = now - self.created_at;
        if age <= DAY_SECS {
            LeadStatus::New
        } else if age <= 7 * DAY_SECS {
            LeadStatus::InProgress
        } else {
            LeadStatus::Archived
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementStatus {
    Signed,
    Paid,
    Review,
    Canceled,
}

impl AgreementStatus {
    pub const ALL: [AgreementStatus; 4] = [
        AgreementStatus::Signed,
        AgreementStatus::Paid,
        AgreementStatus::Review,
        AgreementStatus::Canceled,
    ];

    pub fn key(self) -> &'static str {
        match self {
            AgreementStatus::Signed => "signed",
            AgreementStatus::Paid => "paid",
            AgreementStatus::Review => "review",
            AgreementStatus::Canceled => "canceled",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|status| status.key() == key)
    }

    pub fn label(self) -> &'static str {
        match self {
            AgreementStatus::Signed => "Signed",
            AgreementStatus::Paid => "Paid",
            AgreementStatus::Review => "Under review",
            AgreementStatus::Canceled => "Canceled",
        }
    }
}

impl Agreement {
    pub fn effective_status(&self) -> AgreementStatus {
        self.status
            .as_deref()
            .and_then(AgreementStatus::from_key)
            .unwrap_or(AgreementStatus::Signed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunnelStage {
    Home,
    Apply,
    Enroll,
}

impl FunnelStage {
    pub const ALL: [FunnelStage; 3] = [FunnelStage::Home, FunnelStage::Apply, FunnelStage::Enroll];

    pub fn key(self) -> &'static str {
        match self {
            FunnelStage::Home => "home",
            FunnelStage::Apply => "apply",
            FunnelStage::Enroll => "enroll",
        }
    }
}
