use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use super::ProfileError;

pub const USERNAME: &str = "username";
pub const EMAIL: &str = "email";
pub const CREATED_AT: &str = "createdAt";
pub const AGE: &str = "age";
pub const GENDER: &str = "gender";
pub const ACTIVITY_LEVEL: &str = "activity_level";
pub const HEIGHT: &str = "height";
pub const WEIGHT: &str = "weight";
pub const TARGET_WEIGHT: &str = "target_weight";

/// Fields written by the personal-data form.
pub const PERSONAL_FIELDS: [&str; 6] = [AGE, GENDER, ACTIVITY_LEVEL, HEIGHT, WEIGHT, TARGET_WEIGHT];

/// The per-user profile document, sent verbatim as `personal_data` with every advice request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfilePayload(Map<String, Value>);

impl ProfilePayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document written when an account is created.
    pub fn new_account(username: &str, email: &str, created_at: OffsetDateTime) -> Self {
        let mut p = Self::new();
        p.insert(USERNAME, Value::String(username.to_string()));
        p.insert(EMAIL, Value::String(email.to_string()));
        if let Ok(ts) = created_at.format(&Rfc3339) {
            p.insert(CREATED_AT, Value::String(ts));
        }
        p
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn username(&self) -> Option<&str> {
        self.get(USERNAME).and_then(Value::as_str)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }

    /// Label/value rows of the home screen table.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        [
            ("Age", AGE, ""),
            ("Gender", GENDER, ""),
            ("Activity Level", ACTIVITY_LEVEL, ""),
            ("Height", HEIGHT, " cm"),
            ("Weight", WEIGHT, " kg"),
            ("Target Weight", TARGET_WEIGHT, " kg"),
        ]
        .into_iter()
        .map(|(label, key, unit)| {
            let value = match self.get(key) {
                Some(Value::String(s)) => format!("{s}{unit}"),
                Some(Value::Null) | None => String::new(),
                Some(v) => format!("{v}{unit}"),
            };
            (label, value)
        })
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

/// Raw values of the "Update Personal Data" form, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonalDataForm {
    pub age: String,
    pub gender: String,
    pub activity_level: String,
    pub height: String,
    pub weight: String,
    pub target_weight: String,
}

impl PersonalDataForm {
    /// Validates the form and produces the fields to merge into the profile.
    /// Gender and activity level (1 sedentary .. 5 very active) are required;
    /// empty numeric fields are left out.
    pub fn to_payload(&self) -> Result<ProfilePayload, ProfileError> {
        let gender = Gender::parse(&self.gender)
            .ok_or_else(|| ProfileError::Validation("Gender is required".into()))?;
        let activity = self.activity_level.trim();
        if !matches!(activity, "1" | "2" | "3" | "4" | "5") {
            return Err(ProfileError::Validation(
                "Activity level must be between 1 and 5".into(),
            ));
        }

        let mut p = ProfilePayload::new();
        p.insert(GENDER, Value::String(gender.as_str().into()));
        p.insert(ACTIVITY_LEVEL, Value::String(activity.into()));
        if let Some(age) = optional_number(AGE, &self.age, |v| v.fract() == 0.0 && v < 150.0)? {
            p.insert(AGE, Value::Number(Number::from(age as u64)));
        }
        for (key, raw) in [
            (HEIGHT, &self.height),
            (WEIGHT, &self.weight),
            (TARGET_WEIGHT, &self.target_weight),
        ] {
            if let Some(v) = optional_number(key, raw, |v| v < 1000.0)? {
                if let Some(n) = Number::from_f64(v) {
                    p.insert(key, Value::Number(n));
                }
            }
        }
        Ok(p)
    }
}

fn optional_number(
    key: &str,
    raw: &str,
    plausible: impl Fn(f64) -> bool,
) -> Result<Option<f64>, ProfileError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.replace(',', ".").parse::<f64>() {
        Ok(v) if v > 0.0 && plausible(v) => Ok(Some(v)),
        _ => Err(ProfileError::Validation(format!("{key} must be a positive number"))),
    }
}
