//! Volunteer ("labour") signup extras.
//!
//! Each event extends the generic volunteer signup with its own questions.
//! [`SignupExtra`] holds those answers: preferred shift length, total amount
//! of work, certificate delivery, diet, lodging and a few free text fields.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Maximum length of a requested email alias.
pub const EMAIL_ALIAS_MAX_LENGTH: usize = 32;

/// Preferred length of work shifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftType {
    /// One long shift.
    Yksipitka,
    /// Several shorter shifts.
    Montalyhytta,
    /// Either is fine.
    Kaikkikay,
}

impl ShiftType {
    pub const ALL: [Self; 3] = [Self::Yksipitka, Self::Montalyhytta, Self::Kaikkikay];

    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Yksipitka => "yksipitka",
            Self::Montalyhytta => "montalyhytta",
            Self::Kaikkikay => "kaikkikay",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Yksipitka => "One long shift",
            Self::Montalyhytta => "Several shorter shifts",
            Self::Kaikkikay => "Either is fine",
        }
    }
}

/// Total amount of work the volunteer wants to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TotalWork {
    #[serde(rename = "8h")]
    EightHours,
    #[serde(rename = "12h")]
    TwelveHours,
    #[serde(rename = "yli12h")]
    OverTwelveHours,
}

impl TotalWork {
    pub const ALL: [Self; 3] = [Self::EightHours, Self::TwelveHours, Self::OverTwelveHours];

    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EightHours => "8h",
            Self::TwelveHours => "12h",
            Self::OverTwelveHours => "yli12h",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::EightHours => "Minimum - 8 hours (1 warm meal)",
            Self::TwelveHours => "12 hours (2 warm meals)",
            Self::OverTwelveHours => "Over 12 hours (2 warm meals)",
        }
    }

    /// Warm meals the volunteer is entitled to.
    #[must_use]
    pub const fn meals(&self) -> u8 {
        match self {
            Self::EightHours => 1,
            Self::TwelveHours | Self::OverTwelveHours => 2,
        }
    }
}

/// Staff shirt size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShirtSize {
    #[default]
    NoShirt,
    Xs,
    S,
    M,
    L,
    Xl,
    Xxl,
    #[serde(rename = "3XL")]
    Xxxl,
    #[serde(rename = "4XL")]
    Xxxxl,
    #[serde(rename = "5XL")]
    Xxxxxl,
    LfXs,
    LfS,
    LfM,
    LfL,
    LfXl,
}

impl ShirtSize {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NoShirt => "No shirt",
            Self::Xs => "XS Unisex",
            Self::S => "S Unisex",
            Self::M => "M Unisex",
            Self::L => "L Unisex",
            Self::Xl => "XL Unisex",
            Self::Xxl => "XXL Unisex",
            Self::Xxxl => "3XL Unisex",
            Self::Xxxxl => "4XL Unisex",
            Self::Xxxxxl => "5XL Unisex",
            Self::LfXs => "XS Ladyfit",
            Self::LfS => "S Ladyfit",
            Self::LfM => "M Ladyfit",
            Self::LfL => "L Ladyfit",
            Self::LfXl => "XL Ladyfit",
        }
    }
}

/// A night of floor lodging offered to volunteers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Night {
    pub id: i32,
    pub name: String,
}

/// Validation problems in a [`SignupExtra`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SignupExtraError {
    #[error("a delivery address is required when a work certificate is requested")]
    MissingCertificateAddress,
    #[error("email alias may only contain lowercase letters a-z, digits 0-9 and dashes")]
    InvalidEmailAlias,
    #[error("email alias must be at most {max} characters")]
    EmailAliasTooLong { max: usize },
}

/// Event-specific volunteer signup answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupExtra {
    pub shift_type: ShiftType,
    pub total_work: TotalWork,
    pub overseer: bool,
    pub want_certificate: bool,
    pub certificate_delivery_address: String,
    pub shirt_size: ShirtSize,
    pub special_diet: BTreeSet<String>,
    pub special_diet_other: String,
    /// IDs of the nights the volunteer needs floor lodging for.
    pub lodging_needs: BTreeSet<i32>,
    pub prior_experience: String,
    pub free_text: String,
    pub shift_wishes: String,
    pub email_alias: String,
}

impl SignupExtra {
    /// Answers for an organizer signup, whose form hides the work questions.
    #[must_use]
    pub fn organizer_defaults() -> Self {
        Self {
            shift_type: ShiftType::Kaikkikay,
            total_work: TotalWork::OverTwelveHours,
            overseer: false,
            want_certificate: false,
            certificate_delivery_address: String::new(),
            shirt_size: ShirtSize::NoShirt,
            special_diet: BTreeSet::new(),
            special_diet_other: String::new(),
            lodging_needs: BTreeSet::new(),
            prior_experience: String::new(),
            free_text: "Entered using the organizer signup form".to_string(),
            shift_wishes: String::new(),
            email_alias: String::new(),
        }
    }

    /// Answers for a programme host signup.
    #[must_use]
    pub fn programme_defaults() -> Self {
        Self {
            free_text: "Entered using the programme host signup form".to_string(),
            total_work: TotalWork::EightHours,
            ..Self::organizer_defaults()
        }
    }

    /// Check cross-field rules.
    ///
    /// # Errors
    ///
    /// Returns every rule that is violated, in field order.
    pub fn validate(&self) -> Result<(), Vec<SignupExtraError>> {
        let mut errors = Vec::new();

        if self.want_certificate && self.certificate_delivery_address.trim().is_empty() {
            errors.push(SignupExtraError::MissingCertificateAddress);
        }

        if let Err(e) = validate_email_alias(&self.email_alias) {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// One line per night stating whether floor lodging is needed.
    #[must_use]
    pub fn formatted_lodging_needs(&self, all_nights: &[Night]) -> String {
        all_nights
            .iter()
            .map(|night| {
                let need = if self.lodging_needs.contains(&night.id) {
                    "Needs floor lodging"
                } else {
                    "No need for floor lodging"
                };
                format!("{}: {need}", night.name)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// An empty alias is allowed; otherwise it must be a lowercase slug.
///
/// # Errors
///
/// Returns a [`SignupExtraError`] when the alias is too long or not a slug.
pub fn validate_email_alias(alias: &str) -> Result<(), SignupExtraError> {
    if alias.len() > EMAIL_ALIAS_MAX_LENGTH {
        return Err(SignupExtraError::EmailAliasTooLong {
            max: EMAIL_ALIAS_MAX_LENGTH,
        });
    }
    if alias
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        Ok(())
    } else {
        Err(SignupExtraError::InvalidEmailAlias)
    }
}

/// Coach departures offered to a volunteer.
///
/// Departures in `banned` are full and only shown to someone who has
/// already picked them.
#[must_use]
pub fn available_coach_departures<'a>(
    current: Option<&str>,
    choices: &[&'a str],
    banned: &[&str],
) -> Vec<&'a str> {
    choices
        .iter()
        .copied()
        .filter(|choice| !banned.contains(choice) || current == Some(*choice))
        .collect()
}
