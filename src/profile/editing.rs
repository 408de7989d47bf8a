//! Editing cursor: which profile field the next free-text message fills.

use serde::{Deserialize, Serialize};

/// A user-editable profile field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditableField {
    Name,
    Surname,
    BirthDate,
    Bio,
    WorkPlace,
    StudyPlace,
    Hobby,
}

/// Prefix used by older records and buttons (`edit_name`).
const LEGACY_TOKEN_PREFIX: &str = "edit_";

impl EditableField {
    /// All editable fields, in keyboard order.
    pub const ALL: [EditableField; 7] = [
        EditableField::Name,
        EditableField::Surname,
        EditableField::BirthDate,
        EditableField::WorkPlace,
        EditableField::StudyPlace,
        EditableField::Hobby,
        EditableField::Bio,
    ];

    /// Wire token, used both as the inline button payload and the persisted cursor.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Surname => "surname",
            Self::BirthDate => "birthdate",
            Self::Bio => "bio",
            Self::WorkPlace => "workplace",
            Self::StudyPlace => "studyplace",
            Self::Hobby => "hobby",
        }
    }

    /// Parse a token. Accepts the legacy `edit_` prefix.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.strip_prefix(LEGACY_TOKEN_PREFIX).unwrap_or(token);
        Self::ALL.into_iter().find(|f| f.token() == token)
    }

    /// What the user is asked to type after selecting this field.
    pub fn input_prompt(&self) -> &'static str {
        match self {
            Self::Name => "Enter your first name:",
            Self::Surname => "Enter your surname:",
            Self::BirthDate => "Enter your date of birth in the format dd.mm.yyyy:",
            Self::Bio => "Tell us your life story:",
            Self::WorkPlace => "Enter your workplace:",
            Self::StudyPlace => "Enter where you study or studied:",
            Self::Hobby => "Describe your hobbies:",
        }
    }

    /// Caption of the inline button that selects this field.
    pub fn button_label(&self) -> &'static str {
        match self {
            Self::Name => "Edit first name",
            Self::Surname => "Edit surname",
            Self::BirthDate => "Edit date of birth",
            Self::Bio => "Edit biography",
            Self::WorkPlace => "Edit workplace",
            Self::StudyPlace => "Edit place of study",
            Self::Hobby => "Edit hobbies",
        }
    }
}

impl std::fmt::Display for EditableField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// Session state of a profile.
///
/// Persisted as the field token, or an empty string when idle. Tokens that
/// are not recognized decode to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EditingState {
    #[default]
    Idle,
    Editing(EditableField),
}

/// Inputs that move the editing cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditingEvent {
    /// An inline button selected a field.
    Select(EditableField),
    /// A valid free-text value was stored.
    Commit,
    /// `/stop`.
    Cancel,
    /// `/reset`.
    Reset,
}

impl EditingState {
    /// Apply an event.
    ///
    /// Selecting a field always enters (or switches) edit mode; every other
    /// event returns to idle.
    pub fn transition(self, event: EditingEvent) -> EditingState {
        use EditingEvent::*;
        use EditingState::*;
        match (self, event) {
            (_, Select(field)) => Editing(field),
            (Editing(_), Commit) | (Idle, Commit) => Idle,
            (_, Cancel) | (_, Reset) => Idle,
        }
    }

    pub fn field(&self) -> Option<EditableField> {
        match self {
            Self::Idle => None,
            Self::Editing(field) => Some(*field),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl From<String> for EditingState {
    fn from(token: String) -> Self {
        EditableField::from_token(&token).map_or(Self::Idle, Self::Editing)
    }
}

impl From<EditingState> for String {
    fn from(state: EditingState) -> Self {
        state.field().map(|f| f.token().to_string()).unwrap_or_default()
    }
}

impl std::fmt::Display for EditingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Editing(field) => write!(f, "editing({field})"),
        }
    }
}
