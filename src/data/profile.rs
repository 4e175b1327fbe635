//! Student profiles and the validation layer in front of the ranking core.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::matching::text::collapse_whitespace;
use crate::utils::truncate_chars;

/// Longest free-text value kept from a request, in characters.
const MAX_TEXT_CHARS: usize = 500;
/// Most subjects kept from a request.
const MAX_SUBJECTS: usize = 16;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProfileError {
    #[error("average must be a number between 0 and 100 (got {0})")]
    InvalidAverage(f64),
    #[error("interests must not be empty")]
    EmptyInterests,
    #[error("unrecognized grade '{0}' (expected 9, 10, 11, 12, or graduate)")]
    InvalidGrade(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Nine,
    Ten,
    Eleven,
    #[default]
    Twelve,
    Graduate,
}

impl FromStr for Grade {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = s.trim().to_lowercase();
        let cleaned = cleaned.strip_prefix("grade").unwrap_or(&cleaned).trim();
        match cleaned {
            "9" | "nine" => Ok(Self::Nine),
            "10" | "ten" => Ok(Self::Ten),
            "11" | "eleven" => Ok(Self::Eleven),
            "12" | "twelve" => Ok(Self::Twelve),
            "graduate" | "graduated" | "gap year" => Ok(Self::Graduate),
            _ => Err(ProfileError::InvalidGrade(s.trim().to_string())),
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Nine => "Grade 9",
            Self::Ten => "Grade 10",
            Self::Eleven => "Grade 11",
            Self::Twelve => "Grade 12",
            Self::Graduate => "Graduate",
        })
    }
}

/// A validated student profile, one per ranking request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StudentProfile {
    pub name: String,
    pub grade: Grade,
    /// Overall average, 0-100. A value of 0 means "unknown".
    pub average: f64,
    pub interests: String,
    pub subjects: Vec<String>,
    pub extracurriculars: String,
    pub location: String,
    pub preferences: Vec<String>,
}

impl StudentProfile {
    pub fn has_location(&self) -> bool {
        !self.location.trim().is_empty()
    }

    pub fn has_subjects(&self) -> bool {
        self.subjects.iter().any(|s| !s.trim().is_empty())
    }

    /// Text sent to the embedding provider for this profile.
    pub fn query_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.interests.as_str()];
        if !self.extracurriculars.is_empty() {
            parts.push(&self.extracurriculars);
        }
        parts.extend(self.subjects.iter().map(String::as_str));
        collapse_whitespace(&parts.join(" "))
    }
}

/// Preferences arrive either as a list or as comma-separated text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PreferencesInput {
    List(Vec<String>),
    Text(String),
}

/// Raw profile as submitted by a client.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub grade: Option<String>,
    pub average: f64,
    pub interests: String,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub extracurriculars: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub preferences: Option<PreferencesInput>,
}

/// Collapse whitespace, drop control characters, and cap length.
pub fn sanitize_text(raw: &str) -> String {
    let visible: String = raw
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    truncate_chars(&collapse_whitespace(&visible), MAX_TEXT_CHARS)
}

impl ProfileInput {
    /// Validate and sanitize into a [`StudentProfile`].
    pub fn validate(self) -> Result<StudentProfile, ProfileError> {
        if !self.average.is_finite() || !(0.0..=100.0).contains(&self.average) {
            return Err(ProfileError::InvalidAverage(self.average));
        }

        let interests = sanitize_text(&self.interests);
        if interests.is_empty() {
            return Err(ProfileError::EmptyInterests);
        }

        let grade = match self.grade.as_deref().map(str::trim) {
            None | Some("") => Grade::default(),
            Some(raw) => raw.parse()?,
        };

        let mut subjects: Vec<String> = Vec::new();
        for subject in self.subjects.iter().map(|s| sanitize_text(s)) {
            if subject.is_empty()
                || subjects.iter().any(|s| s.eq_ignore_ascii_case(&subject))
            {
                continue;
            }
            subjects.push(subject);
            if subjects.len() == MAX_SUBJECTS {
                break;
            }
        }

        let preferences = match self.preferences {
            None => Vec::new(),
            Some(PreferencesInput::List(items)) => items,
            Some(PreferencesInput::Text(text)) => {
                text.split(',').map(str::to_string).collect()
            }
        }
        .iter()
        .map(|p| sanitize_text(p))
        .filter(|p| !p.is_empty())
        .collect();

        Ok(StudentProfile {
            name: sanitize_text(&self.name),
            grade,
            average: self.average,
            interests,
            subjects,
            extracurriculars: sanitize_text(&self.extracurriculars),
            location: sanitize_text(&self.location),
            preferences,
        })
    }
}
