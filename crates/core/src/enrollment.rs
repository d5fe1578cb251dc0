//! Attendee enrollment settings.
//!
//! An event that uses the enrollment module has one [`EnrollmentEventMeta`].
//! It names the form used to enroll, the period during which enrollment is
//! open and the message shown on top of the form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const DEFAULT_ENROLLMENT_FORM_MESSAGE: &str = "Using this form you can enroll in the event. \
Please note that filling in the form does not guarantee automatic admittance into the event. \
You will be contacted by the event organizer and notified of the decision whether to accept \
your enrollment or not.";

/// Whether `now` falls within a period that has started and not yet ended.
///
/// A period without a start has never opened. A period without an end stays
/// open indefinitely once started.
#[must_use]
pub fn is_within_period(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    let Some(start) = start else {
        return false;
    };
    start <= now && end.is_none_or(|end| now < end)
}

/// Per-event enrollment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentEventMeta {
    /// Key of the enrollment form to use, e.g. `yukicon2016:EnrollmentForm`.
    pub form_key: String,
    pub enrollment_opens: Option<DateTime<Utc>>,
    pub enrollment_closes: Option<DateTime<Utc>>,
    /// Replaces the default form message when not blank.
    #[serde(default)]
    pub override_enrollment_form_message: String,
}

impl EnrollmentEventMeta {
    #[must_use]
    pub fn new(form_key: impl Into<String>) -> Self {
        Self {
            form_key: form_key.into(),
            enrollment_opens: None,
            enrollment_closes: None,
            override_enrollment_form_message: String::new(),
        }
    }

    /// Alias used by listings that show publicly open signups.
    #[must_use]
    pub const fn public_from(&self) -> Option<DateTime<Utc>> {
        self.enrollment_opens
    }

    #[must_use]
    pub const fn public_until(&self) -> Option<DateTime<Utc>> {
        self.enrollment_closes
    }

    #[must_use]
    pub fn is_enrollment_open(&self, now: DateTime<Utc>) -> bool {
        is_within_period(self.enrollment_opens, self.enrollment_closes, now)
    }

    /// Message shown on top of the enrollment form.
    #[must_use]
    pub fn enrollment_form_message(&self) -> &str {
        if self.override_enrollment_form_message.trim().is_empty() {
            DEFAULT_ENROLLMENT_FORM_MESSAGE
        } else {
            &self.override_enrollment_form_message
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 9, 9, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn test_period_without_start_is_closed() {
        assert!(!is_within_period(None, None, noon()));
        assert!(!is_within_period(None, Some(noon() + Duration::days(1)), noon()));
    }

    #[test]
    fn test_open_ended_period() {
        assert!(is_within_period(Some(noon() - Duration::days(1)), None, noon()));
        assert!(is_within_period(Some(noon()), None, noon()));
    }

    #[test]
    fn test_end_is_exclusive() {
        let start = Some(noon() - Duration::hours(1));
        assert!(!is_within_period(start, Some(noon()), noon()));
        assert!(is_within_period(start, Some(noon() + Duration::seconds(1)), noon()));
    }

    #[test]
    fn test_enrollment_open_uses_meta_period() {
        let mut meta = EnrollmentEventMeta::new("tracon2017:EnrollmentForm");
        assert!(!meta.is_enrollment_open(noon()));

        meta.enrollment_opens = Some(noon() - Duration::days(7));
        meta.enrollment_closes = Some(noon() + Duration::days(7));
        assert!(meta.is_enrollment_open(noon()));
        assert_eq!(meta.public_from(), meta.enrollment_opens);
        assert_eq!(meta.public_until(), meta.enrollment_closes);
    }

    #[test]
    fn test_form_message_override() {
        let mut meta = EnrollmentEventMeta::new("x");
        assert!(meta.enrollment_form_message().starts_with("Using this form"));

        meta.override_enrollment_form_message = "   ".to_string();
        assert!(meta.enrollment_form_message().starts_with("Using this form"));

        meta.override_enrollment_form_message = "Cosplay contest signups only.".to_string();
        assert_eq!(meta.enrollment_form_message(), "Cosplay contest signups only.");
    }
}
