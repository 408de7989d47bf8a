//! Profile record, one per chat identity.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

use super::editing::{EditableField, EditingEvent, EditingState};

/// Textual date format used for input and output (`01.02.2003`).
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// User profile as persisted in the profile store.
///
/// Missing JSON fields fall back to defaults and unknown ones are ignored,
/// so records written by older versions still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Persistence key. Never changes after creation.
    #[serde(alias = "username")]
    pub identity: String,
    /// Where outbound messages for this user go.
    pub chat_id: String,
    pub editing_field: EditingState,
    /// Remaining completion requests.
    #[serde(alias = "quote")]
    pub quota: u32,
    /// Number of predictions delivered so far.
    pub predictions: u32,

    pub name: String,
    pub surname: String,
    pub birth_date: Option<NaiveDate>,
    pub bio: String,
    pub work_place: String,
    pub study_place: String,
    pub hobby: String,
}

impl Profile {
    /// A fresh profile for a first-contact identity.
    pub fn new(identity: impl Into<String>, chat_id: impl Into<String>, quota: u32) -> Self {
        Self {
            identity: identity.into(),
            chat_id: chat_id.into(),
            quota,
            ..Default::default()
        }
    }

    /// Store a user-typed value into `field`.
    ///
    /// The birth date is parsed first; on failure the profile is untouched.
    pub fn set_field(&mut self, field: EditableField, text: &str) -> Result<(), ProfileError> {
        match field {
            EditableField::Name => self.name = text.to_string(),
            EditableField::Surname => self.surname = text.to_string(),
            EditableField::BirthDate => self.birth_date = Some(parse_birth_date(text)?),
            EditableField::Bio => self.bio = text.to_string(),
            EditableField::WorkPlace => self.work_place = text.to_string(),
            EditableField::StudyPlace => self.study_place = text.to_string(),
            EditableField::Hobby => self.hobby = text.to_string(),
        }
        Ok(())
    }

    /// Move the editing cursor.
    pub fn apply(&mut self, event: EditingEvent) {
        self.editing_field = self.editing_field.transition(event);
    }

    /// Clear every user-entered field and the cursor. Identity, chat and
    /// counters survive.
    pub fn reset(&mut self) {
        *self = Self {
            identity: std::mem::take(&mut self.identity),
            chat_id: std::mem::take(&mut self.chat_id),
            quota: self.quota,
            predictions: self.predictions,
            ..Default::default()
        };
    }

    /// Record one delivered prediction, spending quota when it is enforced.
    pub fn record_prediction(&mut self, spend_quota: bool) {
        if spend_quota {
            self.quota = self.quota.saturating_sub(1);
        }
        self.predictions = self.predictions.saturating_add(1);
    }
}

/// Parse a birth date typed as exactly `dd.mm.yyyy`.
pub fn parse_birth_date(input: &str) -> Result<NaiveDate, ProfileError> {
    let invalid = || ProfileError::InvalidDate {
        input: input.to_string(),
    };

    // chrono accepts unpadded days and months; the shape check keeps input strict.
    let bytes = input.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            2 | 5 => *b == b'.',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(input, DATE_FORMAT).map_err(|_| invalid())
}

/// Format a date as `dd.mm.yyyy`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
