//! Take-part form builder.
//!
//! The form is data, not a type: [`required_fields`] picks the profile fields
//! a user has not filled in yet, [`validators_for`] attaches static rules to
//! each of them, and [`FormSpec`] carries the result to the page and back.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{NaiveDate, Utc};
use regex::Regex;
use serde::Serialize;

use camp_db::queries::ProfileUpdate;
use camp_types::models::User;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 ()\-]{5,18}[0-9]$").expect("valid phone regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    FirstName,
    LastName,
    Email,
    Phone,
    BirthDate,
    City,
}

impl ProfileField {
    /// Fields an application needs, in the order they are asked for.
    pub const APPLICATION: [ProfileField; 5] = [
        ProfileField::FirstName,
        ProfileField::LastName,
        ProfileField::Phone,
        ProfileField::BirthDate,
        ProfileField::City,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ProfileField::FirstName => "first_name",
            ProfileField::LastName => "last_name",
            ProfileField::Email => "email",
            ProfileField::Phone => "phone",
            ProfileField::BirthDate => "birth_date",
            ProfileField::City => "city",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProfileField::FirstName => "Имя",
            ProfileField::LastName => "Фамилия",
            ProfileField::Email => "Электронная почта",
            ProfileField::Phone => "Телефон",
            ProfileField::BirthDate => "Дата рождения",
            ProfileField::City => "Город",
        }
    }

    fn input_type(self) -> &'static str {
        match self {
            ProfileField::Email => "email",
            ProfileField::Phone => "tel",
            ProfileField::BirthDate => "date",
            _ => "text",
        }
    }

    /// Current value on the user, with blanks treated as unset.
    pub fn value(self, user: &User) -> Option<String> {
        let raw = match self {
            ProfileField::FirstName => user.first_name.clone(),
            ProfileField::LastName => user.last_name.clone(),
            ProfileField::Email => Some(user.email.clone()),
            ProfileField::Phone => user.phone.clone(),
            ProfileField::BirthDate => user.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
            ProfileField::City => user.city.clone(),
        };
        raw.filter(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    Required,
    Length { min: usize, max: usize },
    Email,
    Phone,
    /// ISO date that is not in the future.
    PastDate,
}

impl Rule {
    /// Checks a trimmed, non-empty value. Emptiness is handled by the caller.
    pub fn check(&self, value: &str) -> Result<(), String> {
        match self {
            Rule::Required => {
                if value.is_empty() {
                    return Err("Обязательное поле.".into());
                }
            }
            Rule::Length { min, max } => {
                let len = value.chars().count();
                if len < *min || len > *max {
                    return Err(format!("Длина должна быть от {min} до {max} символов."));
                }
            }
            Rule::Email => {
                if !EMAIL_RE.is_match(value) {
                    return Err("Неверный адрес электронной почты.".into());
                }
            }
            Rule::Phone => {
                if !PHONE_RE.is_match(value) {
                    return Err("Неверный номер телефона.".into());
                }
            }
            Rule::PastDate => {
                let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .map_err(|_| "Дата должна быть в формате ГГГГ-ММ-ДД.".to_string())?;
                if date > Utc::now().date_naive() {
                    return Err("Дата не может быть в будущем.".into());
                }
            }
        }
        Ok(())
    }
}

/// Application fields still missing from the user's profile, in
/// [`ProfileField::APPLICATION`] order.
pub fn required_fields(user: &User) -> Vec<ProfileField> {
    ProfileField::APPLICATION
        .into_iter()
        .filter(|f| f.value(user).is_none())
        .collect()
}

pub fn validators_for(field: ProfileField) -> Vec<Rule> {
    match field {
        ProfileField::FirstName | ProfileField::LastName | ProfileField::City => {
            vec![Rule::Required, Rule::Length { min: 1, max: 64 }]
        }
        ProfileField::Email => vec![Rule::Required, Rule::Email],
        ProfileField::Phone => vec![Rule::Required, Rule::Phone],
        ProfileField::BirthDate => vec![Rule::Required, Rule::PastDate],
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    pub field: ProfileField,
    pub name: &'static str,
    pub label: &'static str,
    pub input_type: &'static str,
    pub rules: Vec<Rule>,
}

impl FieldSpec {
    fn new(field: ProfileField) -> Self {
        Self {
            field,
            name: field.name(),
            label: field.label(),
            input_type: field.input_type(),
            rules: validators_for(field),
        }
    }

    fn validate(&self, value: &str) -> Vec<String> {
        if value.is_empty() {
            // Only `Required` has an opinion about a blank value
            return self
                .rules
                .iter()
                .filter(|r| **r == Rule::Required)
                .filter_map(|r| r.check(value).err())
                .collect();
        }
        self.rules.iter().filter_map(|r| r.check(value).err()).collect()
    }
}

/// Form descriptor: a name plus the fields it asks for.
#[derive(Debug, Clone, Serialize)]
pub struct FormSpec {
    pub name: &'static str,
    pub fields: Vec<FieldSpec>,
}

impl FormSpec {
    pub fn new(name: &'static str, fields: &[ProfileField]) -> Self {
        Self {
            name,
            fields: fields.iter().copied().map(FieldSpec::new).collect(),
        }
    }

    /// The take-part form for `user`.
    pub fn for_user(user: &User) -> Self {
        Self::new("take_part", &required_fields(user))
    }

    pub fn unbound(self) -> BoundForm {
        BoundForm {
            name: self.name,
            submitted: false,
            fields: self
                .fields
                .into_iter()
                .map(|spec| BoundField {
                    spec,
                    value: None,
                    errors: Vec::new(),
                })
                .collect(),
        }
    }

    /// Attaches submitted values. Keys that are not form fields are ignored.
    pub fn bind(self, data: &HashMap<String, String>) -> BoundForm {
        BoundForm {
            name: self.name,
            submitted: true,
            fields: self
                .fields
                .into_iter()
                .map(|spec| BoundField {
                    value: data.get(spec.name).map(|v| v.trim().to_string()),
                    spec,
                    errors: Vec::new(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BoundField {
    #[serde(flatten)]
    pub spec: FieldSpec,
    pub value: Option<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoundForm {
    pub name: &'static str,
    pub submitted: bool,
    pub fields: Vec<BoundField>,
}

impl BoundForm {
    /// Runs every rule and records errors on the fields. A form without
    /// fields is always valid.
    pub fn validate(&mut self) -> bool {
        for field in &mut self.fields {
            let value = field.value.as_deref().unwrap_or("");
            field.errors = field.spec.validate(value);
        }
        self.is_valid()
    }

    pub fn is_valid(&self) -> bool {
        self.fields.iter().all(|f| f.errors.is_empty())
    }

    pub fn errors_for(&self, name: &str) -> &[String] {
        self.fields
            .iter()
            .find(|f| f.spec.name == name)
            .map(|f| f.errors.as_slice())
            .unwrap_or(&[])
    }

    /// Profile columns to write from a validated form.
    pub fn profile_update(&self) -> ProfileUpdate {
        let mut update = ProfileUpdate::default();
        for field in &self.fields {
            let Some(value) = field.value.clone().filter(|v| !v.is_empty()) else {
                continue;
            };
            match field.spec.field {
                ProfileField::FirstName => update.first_name = Some(value),
                ProfileField::LastName => update.last_name = Some(value),
                ProfileField::Phone => update.phone = Some(value),
                ProfileField::BirthDate => {
                    update.birth_date = NaiveDate::parse_from_str(&value, "%Y-%m-%d").ok()
                }
                ProfileField::City => update.city = Some(value),
                // Email is the login identifier and never changes here
                ProfileField::Email => {}
            }
        }
        update
    }
}
