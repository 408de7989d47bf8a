//! User profile: the record, its editing cursor, and the field table that
//! turns it into a summary or a completion prompt.

pub mod editing;
pub mod fields;
pub mod model;

pub use editing::{EditableField, EditingEvent, EditingState};
pub use fields::{Classification, FieldDescriptor, FieldValue, PROFILE_FIELDS, summarize, to_prompt};
pub use model::{Profile, format_date, parse_birth_date};
