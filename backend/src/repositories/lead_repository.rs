use chrono::{Local, NaiveDate, TimeZone};
use diesel::prelude::*;
use std::collections::HashMap;
use crate::{
    error::AppError,
    models::lead_models::{Agreement, AgreementStatus, Lead, LeadStatus, NewAgreement, NewLead, StatusChange},
    schema::{agreements, leads},
    DbPool,
};

/// Admin-side narrowing of the lead list. Empty fields match everything.
#[derive(Debug, Default, Clone)]
pub struct LeadFilter {
    pub query: Option<String>,
    pub course: Option<String>,
    pub status: Option<LeadStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl LeadFilter {
    pub fn matches(&self, lead: &Lead, now: i64) -> bool {
        if let Some(course) = self.course.as_deref().filter(|c| !c.is_empty()) {
            if lead.course != course {
                return false;
            }
        }
        if let Some(status) = self.status {
            if lead.effective_status(now) != status {
                return false;
            }
        }
        if !created_within(lead.created_at, self.date_from, self.date_to) {
            return false;
        }
        if let Some(query) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            return lead_matches_text(lead, query);
        }
        true
    }
}

/// Inclusive on both ends, by local calendar day.
fn created_within(created_at: i64, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
    if from.is_none() && to.is_none() {
        return true;
    }
    let day = match Local.timestamp_opt(created_at, 0).single() {
        Some(dt) => dt.date_naive(),
        None => return false,
    };
    !(from.map_or(false, |from| day < from) || to.map_or(false, |to| day > to))
}

#[derive(Debug, Default, Clone)]
pub struct AgreementFilter {
    pub query: Option<String>,
    pub course: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl AgreementFilter {
    pub fn matches(&self, agreement: &Agreement) -> bool {
        if let Some(course) = self.course.as_deref().filter(|c| !c.is_empty()) {
            if agreement.course != course {
                return false;
            }
        }
        if !created_within(agreement.created_at, self.date_from, self.date_to) {
            return false;
        }
        match self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            Some(query) => {
                let needle = query.to_lowercase();
                [
                    Some(agreement.token.as_str()),
                    Some(agreement.course.as_str()),
                    Some(agreement.full_name.as_str()),
                    Some(agreement.phone.as_str()),
                    Some(agreement.email.as_str()),
                    agreement.telegram.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

/// Case-insensitive substring search over the fields an admin would remember.
pub fn lead_matches_text(lead: &Lead, query: &str) -> bool {
    let needle = query.to_lowercase();
    [
        Some(lead.name.as_str()),
        Some(lead.contact.as_str()),
        Some(lead.course.as_str()),
        Some(lead.page.as_str()),
        Some(lead.token.as_str()),
        lead.telegram.as_deref(),
        lead.note.as_deref(),
        lead.tags.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&needle))
}

pub struct LeadRepository {
    pool: DbPool,
}

impl LeadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn create_lead(&self, new_lead: NewLead) -> Result<Lead, AppError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(leads::table)
            .values(&new_lead)
            .execute(&mut conn)?;
        let lead = leads::table
            .filter(leads::token.eq(&new_lead.token))
            .select(Lead::as_select())
            .first(&mut conn)?;
        Ok(lead)
    }

    // Newest first
    pub fn list_leads(&self) -> Result<Vec<Lead>, AppError> {
        let mut conn = self.pool.get()?;
        let list = leads::table
            .order((leads::created_at.desc(), leads::id.desc()))
            .select(Lead::as_select())
            .load(&mut conn)?;
        Ok(list)
    }

    pub fn search_leads(&self, filter: &LeadFilter, now: i64) -> Result<Vec<Lead>, AppError> {
        Ok(self
            .list_leads()?
            .into_iter()
            .filter(|lead| filter.matches(lead, now))
            .collect())
    }

    /// Exact token first, then a unique partial match (admins type prefixes in chat).
    pub fn find_by_token(&self, token: &str) -> Result<Option<Lead>, AppError> {
        let token = token.trim().to_lowercase();
        if token.is_empty() {
            return Ok(None);
        }
        let mut conn = self.pool.get()?;
        let exact = leads::table
            .filter(leads::token.eq(&token))
            .select(Lead::as_select())
            .first(&mut conn)
            .optional()?;
        if exact.is_some() {
            return Ok(exact);
        }
        // Tokens are hex, so anything else (LIKE wildcards included) cannot be a fragment.
        if !token.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(None);
        }
        let mut candidates = leads::table
            .filter(leads::token.like(format!("%{}%", token)))
            .select(Lead::as_select())
            .limit(2)
            .load(&mut conn)?;
        if candidates.len() == 1 {
            Ok(candidates.pop())
        } else {
            Ok(None)
        }
    }

    /// Returns false when no lead carries the token.
    pub fn update_status(&self, token: &str, change: StatusChange, now: i64) -> Result<bool, AppError> {
        let mut conn = self.pool.get()?;
        let target = leads::table.filter(leads::token.eq(token));
        let updated = match change {
            StatusChange::Set(status) => diesel::update(target)
                .set((
                    leads::status.eq(Some(status.key())),
                    leads::status_updated_at.eq(Some(now)),
                ))
                .execute(&mut conn)?,
            StatusChange::Auto => diesel::update(target)
                .set((
                    leads::status.eq(None::<String>),
                    leads::status_updated_at.eq(None::<i64>),
                ))
                .execute(&mut conn)?,
        };
        Ok(updated > 0)
    }

    /// `Some("")` clears a field, `None` leaves it alone.
    pub fn update_meta(
        &self,
        token: &str,
        note: Option<&str>,
        tags: Option<&str>,
        next_contact: Option<&str>,
    ) -> Result<bool, AppError> {
        let mut conn = self.pool.get()?;
        let exists = leads::table
            .filter(leads::token.eq(token))
            .count()
            .get_result::<i64>(&mut conn)?
            > 0;
        if !exists {
            return Ok(false);
        }
        let as_nullable = |value: &str| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let target = || leads::table.filter(leads::token.eq(token));
            if let Some(note) = note {
                diesel::update(target()).set(leads::note.eq(as_nullable(note))).execute(conn)?;
            }
            if let Some(tags) = tags {
                diesel::update(target()).set(leads::tags.eq(as_nullable(tags))).execute(conn)?;
            }
            if let Some(next) = next_contact {
                diesel::update(target())
                    .set(leads::next_contact.eq(as_nullable(next)))
                    .execute(conn)?;
            }
            Ok(())
        })?;
        Ok(true)
    }

    pub fn status_counts(&self, now: i64) -> Result<HashMap<LeadStatus, usize>, AppError> {
        let mut counts = HashMap::new();
        for lead in self.list_leads()? {
            *counts.entry(lead.effective_status(now)).or_insert(0) += 1;
        }
        Ok(counts)
    }

    pub fn create_agreement(&self, new_agreement: NewAgreement) -> Result<Agreement, AppError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(agreements::table)
            .values(&new_agreement)
            .execute(&mut conn)?;
        let agreement = agreements::table
            .filter(agreements::token.eq(&new_agreement.token))
            .select(Agreement::as_select())
            .first(&mut conn)?;
        Ok(agreement)
    }

    pub fn list_agreements(&self) -> Result<Vec<Agreement>, AppError> {
        let mut conn = self.pool.get()?;
        let list = agreements::table
            .order((agreements::created_at.desc(), agreements::id.desc()))
            .select(Agreement::as_select())
            .load(&mut conn)?;
        Ok(list)
    }

    pub fn search_agreements(&self, filter: &AgreementFilter) -> Result<Vec<Agreement>, AppError> {
        Ok(self
            .list_agreements()?
            .into_iter()
            .filter(|agreement| filter.matches(agreement))
            .collect())
    }

    /// `None` resets to the default (signed).
    pub fn update_agreement_status(&self, token: &str, status: Option<AgreementStatus>) -> Result<bool, AppError> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(agreements::table.filter(agreements::token.eq(token)))
            .set(agreements::status.eq(status.map(|s| s.key())))
            .execute(&mut conn)?;
        Ok(updated > 0)
    }

    pub fn update_agreement_amount(&self, token: &str, amount: Option<f64>) -> Result<bool, AppError> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(agreements::table.filter(agreements::token.eq(token)))
            .set(agreements::amount.eq(amount))
            .execute(&mut conn)?;
        Ok(updated > 0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::init_pool;

    pub(crate) fn memory_pool() -> DbPool {
        init_pool(":memory:", 1).unwrap()
    }

    fn new_lead(token: &str, created_at: i64, name: &str, course: &str) -> NewLead {
        NewLead {
            token: token.to_string(),
            created_at,
            name: name.to_string(),
            contact: "+79991234567".to_string(),
            course: course.to_string(),
            page: "https://school.example.com/".to_string(),
            telegram: None,
        }
    }

    #[test]
    fn leads_come_back_newest_first() {
        let repo = LeadRepository::new(memory_pool());
        repo.create_lead(new_lead("aaaa0001", 100, "Old", "Business")).unwrap();
        repo.create_lead(new_lead("aaaa0002", 200, "New", "Business")).unwrap();
        let names: Vec<String> = repo.list_leads().unwrap().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["New", "Old"]);
    }

    #[test]
    fn token_lookup_accepts_unique_fragments_only() {
        let repo = LeadRepository::new(memory_pool());
        repo.create_lead(new_lead("abcd1111", 1, "A", "x")).unwrap();
        repo.create_lead(new_lead("abcd2222", 2, "B", "x")).unwrap();
        assert_eq!(repo.find_by_token("ABCD1111").unwrap().unwrap().name, "A");
        assert_eq!(repo.find_by_token("2222").unwrap().unwrap().name, "B");
        assert!(repo.find_by_token("abcd").unwrap().is_none());
        assert!(repo.find_by_token("").unwrap().is_none());
    }

    #[test]
    fn token_lookup_treats_like_wildcards_as_text() {
        let repo = LeadRepository::new(memory_pool());
        repo.create_lead(new_lead("abcd1111", 1, "Only", "x")).unwrap();
        for pattern in ["%", "_", "%%", "ab%", "a_cd", "1111 "] {
            let found = repo.find_by_token(pattern).unwrap().map(|lead| lead.name);
            let expected = (pattern == "1111 ").then(|| "Only".to_string());
            assert_eq!(found, expected, "pattern {:?}", pattern);
        }
    }

    #[test]
    fn status_updates_and_resets() {
        let repo = LeadRepository::new(memory_pool());
        repo.create_lead(new_lead("beef0001", 1_000, "A", "x")).unwrap();

        assert!(repo.update_status("beef0001", StatusChange::Set(LeadStatus::Paid), 2_000).unwrap());
        let lead = repo.find_by_token("beef0001").unwrap().unwrap();
        assert_eq!(lead.status.as_deref(), Some("paid"));
        assert_eq!(lead.status_updated_at, Some(2_000));

        assert!(repo.update_status("beef0001", StatusChange::Auto, 3_000).unwrap());
        let lead = repo.find_by_token("beef0001").unwrap().unwrap();
        assert_eq!(lead.status, None);
        assert_eq!(lead.status_updated_at, None);

        assert!(!repo.update_status("missing", StatusChange::Auto, 3_000).unwrap());
    }

    #[test]
    fn meta_update_sets_and_clears_fields() {
        let repo = LeadRepository::new(memory_pool());
        repo.create_lead(new_lead("beef0002", 1, "A", "x")).unwrap();
        assert!(repo.update_meta("beef0002", Some(" call back "), Some("vip"), None).unwrap());
        let lead = repo.find_by_token("beef0002").unwrap().unwrap();
        assert_eq!(lead.note.as_deref(), Some("call back"));
        assert_eq!(lead.tags.as_deref(), Some("vip"));

        assert!(repo.update_meta("beef0002", Some(""), None, Some("2025-01-31")).unwrap());
        let lead = repo.find_by_token("beef0002").unwrap().unwrap();
        assert_eq!(lead.note, None);
        assert_eq!(lead.tags.as_deref(), Some("vip"));
        assert_eq!(lead.next_contact.as_deref(), Some("2025-01-31"));

        assert!(!repo.update_meta("nope", Some("x"), None, None).unwrap());
    }

    #[test]
    fn filter_combines_course_status_and_text() {
        let repo = LeadRepository::new(memory_pool());
        let now = 10 * 86_400;
        repo.create_lead(new_lead("c0000001", now - 100, "Maria", "Business")).unwrap();
        repo.create_lead(new_lead("c0000002", now - 100, "Oleg", "Data Science")).unwrap();
        repo.create_lead(new_lead("c0000003", now - 9 * 86_400, "Marat", "Business")).unwrap();

        let filter = LeadFilter {
            query: Some("mar".to_string()),
            course: Some("Business".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.search_leads(&filter, now).unwrap().len(), 2);

        let filter = LeadFilter {
            status: Some(LeadStatus::New),
            ..filter
        };
        let found = repo.search_leads(&filter, now).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Maria");
    }

    #[test]
    fn agreements_default_to_signed_and_take_amounts() {
        let repo = LeadRepository::new(memory_pool());
        let agreement = repo
            .create_agreement(NewAgreement {
                token: "feed0001".to_string(),
                created_at: 5,
                course: "Full-stack".to_string(),
                full_name: "Ivan Petrov".to_string(),
                phone: "+79991234567".to_string(),
                email: "ivan@example.com".to_string(),
                telegram: None,
                consent: true,
                agreement: Some("offer-2024-09".to_string()),
            })
            .unwrap();
        assert_eq!(agreement.effective_status(), AgreementStatus::Signed);
        assert_eq!(agreement.agreement.as_deref(), Some("offer-2024-09"));

        assert!(repo.update_agreement_status("feed0001", Some(AgreementStatus::Paid)).unwrap());
        assert!(repo.update_agreement_amount("feed0001", Some(1500.5)).unwrap());
        let stored = &repo.list_agreements().unwrap()[0];
        assert_eq!(stored.effective_status(), AgreementStatus::Paid);
        assert_eq!(stored.amount, Some(1500.5));
    }

    #[test]
    fn agreement_filter_matches_course_text_and_day() {
        let repo = LeadRepository::new(memory_pool());
        let day = 20 * 86_400;
        for (token, created_at, course, name) in [
            ("a0000001", day + 43_200, "Full-stack", "Ivan Petrov"),
            ("a0000002", day + 43_200, "Data Science", "Olga Ivanova"),
            ("a0000003", day - 5 * 86_400, "Full-stack", "Petr Ivanov"),
        ] {
            repo.create_agreement(NewAgreement {
                token: token.to_string(),
                created_at,
                course: course.to_string(),
                full_name: name.to_string(),
                phone: String::new(),
                email: format!("{}@example.com", token),
                telegram: None,
                consent: true,
                agreement: None,
            })
            .unwrap();
        }

        let ivan = AgreementFilter {
            query: Some("IVAN".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.search_agreements(&ivan).unwrap().len(), 3);

        let fullstack = AgreementFilter {
            course: Some("Full-stack".to_string()),
            ..ivan
        };
        assert_eq!(repo.search_agreements(&fullstack).unwrap().len(), 2);

        let created = Local.timestamp_opt(day + 43_200, 0).unwrap().date_naive();
        let recent = AgreementFilter {
            date_from: Some(created),
            ..fullstack
        };
        let found = repo.search_agreements(&recent).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].token, "a0000001");
    }
}
