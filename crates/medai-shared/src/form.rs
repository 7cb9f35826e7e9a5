//! Diabetes risk form: the 17-field record posted to the risk endpoint.
//!
//! Field names are the wire names. Categorical fields serialize as their
//! display strings and history flags as integers 0/1, matching what the
//! risk service expects.

use crate::error::ScreeningError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A categorical field with a fixed set of wire strings
pub trait Choice: Sized + DeserializeOwned {
    const OPTIONS: &'static [&'static str];
}

macro_rules! choice {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant,)+
        }

        impl Choice for $name {
            const OPTIONS: &'static [&'static str] = &[$($wire),+];
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $wire),)+
                }
            }
        }
    };
}

choice!(Gender { Male => "Male", Female => "Female", Other => "Other" });
choice!(Ethnicity {
    White => "White",
    Hispanic => "Hispanic",
    Asian => "Asian",
    Black => "Black",
    Other => "Other",
});
choice!(EducationLevel {
    HighSchool => "High School",
    Bachelor => "Bachelor",
    Master => "Master",
    Phd => "PhD",
});
choice!(IncomeLevel { Low => "Low", Middle => "Middle", High => "High" });
choice!(SmokingStatus { Never => "Never", Former => "Former", Current => "Current" });
choice!(EmploymentStatus {
    Employed => "Employed",
    Unemployed => "Unemployed",
    Student => "Student",
    Retired => "Retired",
});

/// Serialize a bool as the integer 0/1 the risk service expects.
mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Bool(bool),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Bool(b) => Ok(b),
            Raw::Int(0) => Ok(false),
            Raw::Int(1) => Ok(true),
            Raw::Int(n) => Err(serde::de::Error::custom(format!(
                "history flag must be 0 or 1, got {}",
                n
            ))),
        }
    }
}

/// Every field name on the wire, in form order.
pub const FIELD_NAMES: [&str; 17] = [
    "age",
    "bmi",
    "waist_to_hip_ratio",
    "systolic_bp",
    "physical_activity_minutes_per_week",
    "diet_score",
    "sleep_hours_per_day",
    "screen_time_hours_per_day",
    "gender",
    "ethnicity",
    "education_level",
    "income_level",
    "smoking_status",
    "employment_status",
    "family_history_diabetes",
    "hypertension_history",
    "cardiovascular_history",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiabetesForm {
    // Biometrics
    pub age: f64,
    pub bmi: f64,
    pub waist_to_hip_ratio: f64,
    pub systolic_bp: f64,
    pub physical_activity_minutes_per_week: f64,
    pub diet_score: f64,
    pub sleep_hours_per_day: f64,
    pub screen_time_hours_per_day: f64,

    // Socio-demographics
    pub gender: Gender,
    pub ethnicity: Ethnicity,
    pub education_level: EducationLevel,
    pub income_level: IncomeLevel,
    pub smoking_status: SmokingStatus,
    pub employment_status: EmploymentStatus,

    // Medical history
    #[serde(with = "flag")]
    pub family_history_diabetes: bool,
    #[serde(with = "flag")]
    pub hypertension_history: bool,
    #[serde(with = "flag")]
    pub cardiovascular_history: bool,
}

impl Default for DiabetesForm {
    fn default() -> Self {
        Self {
            age: 45.0,
            bmi: 28.5,
            waist_to_hip_ratio: 0.85,
            systolic_bp: 120.0,
            physical_activity_minutes_per_week: 150.0,
            diet_score: 6.5,
            sleep_hours_per_day: 7.5,
            screen_time_hours_per_day: 3.0,
            gender: Gender::Female,
            ethnicity: Ethnicity::Hispanic,
            education_level: EducationLevel::Bachelor,
            income_level: IncomeLevel::Middle,
            smoking_status: SmokingStatus::Never,
            employment_status: EmploymentStatus::Employed,
            family_history_diabetes: true,
            hypertension_history: false,
            cardiovascular_history: false,
        }
    }
}

fn parse_number(key: &str, value: &str) -> Result<f64, ScreeningError> {
    let n: f64 = value.trim().parse().map_err(|_| {
        ScreeningError::InvalidInput(format!("{} must be a number, got '{}'", key, value))
    })?;
    if !n.is_finite() {
        return Err(ScreeningError::InvalidInput(format!(
            "{} must be finite",
            key
        )));
    }
    Ok(n)
}

fn parse_choice<T: Choice>(key: &str, value: &str) -> Result<T, ScreeningError> {
    let wire = T::OPTIONS
        .iter()
        .find(|opt| opt.eq_ignore_ascii_case(value.trim()))
        .ok_or_else(|| {
            ScreeningError::InvalidInput(format!(
                "{} must be one of: {}",
                key,
                T::OPTIONS.join(", ")
            ))
        })?;
    serde_json::from_value(serde_json::Value::String(wire.to_string()))
        .map_err(|e| ScreeningError::InvalidInput(format!("{}: {}", key, e)))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ScreeningError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ScreeningError::InvalidInput(format!(
            "{} must be 0 or 1, got '{}'",
            key, value
        ))),
    }
}

fn check_range(key: &str, value: f64, min: f64, max: f64) -> Result<(), ScreeningError> {
    if value < min || value > max {
        return Err(ScreeningError::InvalidInput(format!(
            "{} must be between {} and {}, got {}",
            key, min, max, value
        )));
    }
    Ok(())
}

impl DiabetesForm {
    /// Set a field from its wire name and a text value
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<(), ScreeningError> {
        match key {
            "age" => self.age = parse_number(key, value)?,
            "bmi" => self.bmi = parse_number(key, value)?,
            "waist_to_hip_ratio" => self.waist_to_hip_ratio = parse_number(key, value)?,
            "systolic_bp" => self.systolic_bp = parse_number(key, value)?,
            "physical_activity_minutes_per_week" => {
                self.physical_activity_minutes_per_week = parse_number(key, value)?
            }
            "diet_score" => self.diet_score = parse_number(key, value)?,
            "sleep_hours_per_day" => self.sleep_hours_per_day = parse_number(key, value)?,
            "screen_time_hours_per_day" => {
                self.screen_time_hours_per_day = parse_number(key, value)?
            }
            "gender" => self.gender = parse_choice(key, value)?,
            "ethnicity" => self.ethnicity = parse_choice(key, value)?,
            "education_level" => self.education_level = parse_choice(key, value)?,
            "income_level" => self.income_level = parse_choice(key, value)?,
            "smoking_status" => self.smoking_status = parse_choice(key, value)?,
            "employment_status" => self.employment_status = parse_choice(key, value)?,
            "family_history_diabetes" => self.family_history_diabetes = parse_flag(key, value)?,
            "hypertension_history" => self.hypertension_history = parse_flag(key, value)?,
            "cardiovascular_history" => self.cardiovascular_history = parse_flag(key, value)?,
            _ => {
                return Err(ScreeningError::InvalidInput(format!(
                    "unknown field '{}'",
                    key
                )))
            }
        }
        Ok(())
    }

    /// Apply a `key=value` assignment
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<(), ScreeningError> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| {
            ScreeningError::InvalidInput(format!("expected key=value, got '{}'", assignment))
        })?;
        self.set_field(key.trim(), value)
    }

    /// Check biometric values are in a plausible range.
    pub fn validate(&self) -> Result<(), ScreeningError> {
        for (key, value) in [
            ("age", self.age),
            ("bmi", self.bmi),
            ("waist_to_hip_ratio", self.waist_to_hip_ratio),
            ("systolic_bp", self.systolic_bp),
        ] {
            if value <= 0.0 || !value.is_finite() {
                return Err(ScreeningError::InvalidInput(format!(
                    "{} must be positive, got {}",
                    key, value
                )));
            }
        }
        check_range(
            "physical_activity_minutes_per_week",
            self.physical_activity_minutes_per_week,
            0.0,
            10_080.0,
        )?;
        check_range("diet_score", self.diet_score, 0.0, 10.0)?;
        check_range("sleep_hours_per_day", self.sleep_hours_per_day, 0.0, 24.0)?;
        check_range(
            "screen_time_hours_per_day",
            self.screen_time_hours_per_day,
            0.0,
            24.0,
        )?;
        Ok(())
    }
}
