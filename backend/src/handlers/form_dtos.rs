use serde::Serialize;
use std::collections::HashMap;
use crate::error::AppError;
use crate::models::lead_models::{NewAgreement, NewLead};

/// Text fields of a submitted form, keyed by field name. Later duplicates win.
pub type FormFields = HashMap<String, String>;

fn field(fields: &FormFields, name: &str) -> String {
    fields.get(name).map(|v| v.trim().to_string()).unwrap_or_default()
}

fn optional_field(fields: &FormFields, name: &str) -> Option<String> {
    Some(field(fields, name)).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplyForm {
    pub name: String,
    pub phone: String,
    pub course: String,
    pub telegram: Option<String>,
}

impl ApplyForm {
    pub fn from_fields(fields: &FormFields) -> Result<Self, AppError> {
        let form = Self {
            name: field(fields, "name"),
            phone: field(fields, "phone"),
            course: field(fields, "course"),
            telegram: optional_field(fields, "telegram"),
        };
        if form.phone.is_empty() {
            return Err(AppError::BadRequest("Contact phone is required".to_string()));
        }
        Ok(form)
    }

    pub fn into_new_lead(self, token: String, created_at: i64, page: String) -> NewLead {
        NewLead {
            token,
            created_at,
            name: self.name,
            contact: self.phone,
            course: self.course,
            page,
            telegram: self.telegram,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrollForm {
    pub course: String,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub telegram: Option<String>,
    pub agreement: Option<String>,
    pub consent: bool,
}

impl EnrollForm {
    pub fn from_fields(fields: &FormFields) -> Result<Self, AppError> {
        let form = Self {
            course: field(fields, "course"),
            full_name: field(fields, "full_name"),
            phone: field(fields, "phone"),
            email: field(fields, "email"),
            telegram: optional_field(fields, "telegram"),
            agreement: optional_field(fields, "agreement"),
            consent: fields.contains_key("consent"),
        };
        if !form.consent {
            return Err(AppError::BadRequest("Consent to the agreement is required".to_string()));
        }
        if form.phone.is_empty() && form.email.is_empty() {
            return Err(AppError::BadRequest("A phone or email is required".to_string()));
        }
        Ok(form)
    }

    pub fn into_new_agreement(self, token: String, created_at: i64) -> NewAgreement {
        NewAgreement {
            token,
            created_at,
            course: self.course,
            full_name: self.full_name,
            phone: self.phone,
            email: self.email,
            telegram: self.telegram,
            consent: self.consent,
            agreement: self.agreement,
        }
    }
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub ok: bool,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> FormFields {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn apply_trims_and_requires_a_phone() {
        let form = ApplyForm::from_fields(&fields(&[
            ("name", "  Anna "),
            ("phone", " +7 999 123-45-67 "),
            ("course", "Business"),
            ("telegram", "   "),
        ]))
        .unwrap();
        assert_eq!(form.name, "Anna");
        assert_eq!(form.phone, "+7 999 123-45-67");
        assert_eq!(form.telegram, None);

        let err = ApplyForm::from_fields(&fields(&[("name", "Anna"), ("phone", "  ")])).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn enroll_needs_consent() {
        let base = [("full_name", "Ivan Petrov"), ("phone", "+79991234567"), ("course", "Full-stack")];
        assert!(EnrollForm::from_fields(&fields(&base)).is_err());

        let mut with_consent = base.to_vec();
        with_consent.push(("consent", "on"));
        let form = EnrollForm::from_fields(&fields(&with_consent)).unwrap();
        assert!(form.consent);
        assert_eq!(form.into_new_agreement("feed0001".to_string(), 1).full_name, "Ivan Petrov");
    }

    #[test]
    fn enroll_keeps_the_accepted_offer_version() {
        let form = EnrollForm::from_fields(&fields(&[
            ("full_name", "Ivan Petrov"),
            ("email", "ivan@example.com"),
            ("consent", "yes"),
            ("agreement", " offer-2024-09 "),
        ]))
        .unwrap();
        let agreement = form.into_new_agreement("feed0002".to_string(), 1);
        assert_eq!(agreement.agreement.as_deref(), Some("offer-2024-09"));

        let unversioned = EnrollForm::from_fields(&fields(&[("phone", "+79991234567"), ("consent", "yes")])).unwrap();
        assert_eq!(unversioned.into_new_agreement("feed0003".to_string(), 1).agreement, None);
    }
}
