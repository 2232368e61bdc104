//! Validated identifiers for learners, courses, sections and units

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Longest identifier accepted anywhere in the engine
pub const MAX_ID_LEN: usize = 128;

static ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._:@-]*$").expect("valid id pattern"));

fn validate(field: &'static str, raw: &str) -> Result<()> {
    if raw.is_empty() {
        return Err(EngineError::validation(field, "must not be empty"));
    }
    if raw.len() > MAX_ID_LEN {
        return Err(EngineError::validation(
            field,
            format!("longer than {} characters", MAX_ID_LEN),
        ));
    }
    if !ID_PATTERN.is_match(raw) {
        return Err(EngineError::validation(
            field,
            format!("'{}' contains unsupported characters", raw),
        ));
    }
    Ok(())
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap a raw identifier
            pub fn parse(raw: impl Into<String>) -> Result<Self> {
                let raw = raw.into();
                validate($field, &raw)?;
                Ok(Self(raw))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = EngineError;

            fn try_from(raw: String) -> Result<Self> {
                Self::parse(raw)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

identifier!(
    /// A learner account, issued by the external identity directory
    LearnerId,
    "learner"
);
identifier!(
    /// A course
    CourseId,
    "course"
);
identifier!(
    /// A curriculum section
    SectionId,
    "section"
);
identifier!(
    /// A unit of progress: a lecture or a synthetic per-section quiz unit
    UnitId,
    "unit"
);
identifier!(
    /// A badge definition
    BadgeId,
    "badge"
);
identifier!(
    /// Learner-stable number printed on every certificate the learner earns
    RegistrationNumber,
    "registration_number"
);

impl UnitId {
    /// Synthetic unit standing in for a section's quiz
    pub fn quiz_for(section: &SectionId) -> Self {
        Self(format!("quiz-{}", section.as_str()))
    }
}
