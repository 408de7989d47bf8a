//! Declarative field table driving the profile summary and the completion prompt.
//!
//! Every profile field is listed once, in prompt order, with its
//! classification. Internal fields are declared too so that nothing reaches
//! the user or the completion service by accident.

use chrono::NaiveDate;

use crate::error::ProfileError;

use super::model::{Profile, format_date};

/// How a field participates in summaries and prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Bookkeeping; never shown or sent.
    Internal,
    /// Must be filled before a prompt can be built.
    Required,
    /// Shown and sent only when filled.
    Optional,
}

/// A raw field value, before formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Date(Option<NaiveDate>),
    Count(u32),
}

/// One row of the field table.
pub struct FieldDescriptor {
    /// Name used in the completion prompt.
    pub name: &'static str,
    /// Caption shown to the user.
    pub label: &'static str,
    pub classification: Classification,
    pub accessor: fn(&Profile) -> FieldValue<'_>,
    pub formatter: fn(FieldValue<'_>) -> String,
}

impl FieldDescriptor {
    /// Formatted value; empty means "not filled".
    pub fn render(&self, profile: &Profile) -> String {
        (self.formatter)((self.accessor)(profile))
    }
}

fn format_value(value: FieldValue<'_>) -> String {
    match value {
        FieldValue::Text(text) => text.to_string(),
        FieldValue::Date(date) => date.map(format_date).unwrap_or_default(),
        FieldValue::Count(n) => n.to_string(),
    }
}

/// The field table, in prompt order.
pub static PROFILE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor {
        name: "Identity",
        label: "Identity",
        classification: Classification::Internal,
        accessor: |p| FieldValue::Text(&p.identity),
        formatter: format_value,
    },
    FieldDescriptor {
        name: "ChatId",
        label: "Chat",
        classification: Classification::Internal,
        accessor: |p| FieldValue::Text(&p.chat_id),
        formatter: format_value,
    },
    FieldDescriptor {
        name: "EditingField",
        label: "Editing",
        classification: Classification::Internal,
        accessor: |p| FieldValue::Text(p.editing_field.field().map_or("", |f| f.token())),
        formatter: format_value,
    },
    FieldDescriptor {
        name: "Name",
        label: "First name",
        classification: Classification::Required,
        accessor: |p| FieldValue::Text(&p.name),
        formatter: format_value,
    },
    FieldDescriptor {
        name: "Surname",
        label: "Surname",
        classification: Classification::Optional,
        accessor: |p| FieldValue::Text(&p.surname),
        formatter: format_value,
    },
    FieldDescriptor {
        name: "BirthDate",
        label: "Date of birth",
        classification: Classification::Required,
        accessor: |p| FieldValue::Date(p.birth_date),
        formatter: format_value,
    },
    FieldDescriptor {
        name: "Bio",
        label: "Biography",
        classification: Classification::Optional,
        accessor: |p| FieldValue::Text(&p.bio),
        formatter: format_value,
    },
    FieldDescriptor {
        name: "WorkPlace",
        label: "Workplace",
        classification: Classification::Optional,
        accessor: |p| FieldValue::Text(&p.work_place),
        formatter: format_value,
    },
    FieldDescriptor {
        name: "StudyPlace",
        label: "Place of study",
        classification: Classification::Optional,
        accessor: |p| FieldValue::Text(&p.study_place),
        formatter: format_value,
    },
    FieldDescriptor {
        name: "Hobby",
        label: "Hobbies",
        classification: Classification::Optional,
        accessor: |p| FieldValue::Text(&p.hobby),
        formatter: format_value,
    },
    FieldDescriptor {
        name: "Quota",
        label: "Quota",
        classification: Classification::Internal,
        accessor: |p| FieldValue::Count(p.quota),
        formatter: format_value,
    },
    FieldDescriptor {
        name: "Predictions",
        label: "Predictions",
        classification: Classification::Internal,
        accessor: |p| FieldValue::Count(p.predictions),
        formatter: format_value,
    },
];

/// Human-readable profile, Markdown formatted.
///
/// Empty fields show as `-`; empty required fields are flagged.
pub fn summarize(profile: &Profile) -> String {
    let mut out = String::from("*Your profile*:\n");
    for field in PROFILE_FIELDS {
        if field.classification == Classification::Internal {
            continue;
        }
        let value = field.render(profile);
        if value.is_empty() {
            out.push_str(&format!("{}: -", field.label));
            if field.classification == Classification::Required {
                out.push_str(" _(required)_");
            }
        } else {
            out.push_str(&format!("{}: {}", field.label, value));
        }
        out.push('\n');
    }
    out
}

/// Serialize the profile for the completion service.
///
/// Fails on the first empty required field; no partial prompt is returned.
pub fn to_prompt(profile: &Profile) -> Result<String, ProfileError> {
    let mut out = String::new();
    for field in PROFILE_FIELDS {
        let value = match field.classification {
            Classification::Internal => continue,
            Classification::Required => {
                let value = field.render(profile);
                if value.is_empty() {
                    return Err(ProfileError::MissingRequired { field: field.name });
                }
                value
            }
            Classification::Optional => {
                let value = field.render(profile);
                if value.is_empty() {
                    continue;
                }
                value
            }
        };
        out.push_str(field.name);
        out.push_str(": ");
        out.push_str(&value);
        out.push('\n');
    }
    Ok(out)
}

impl Profile {
    /// See [`summarize`].
    pub fn summary(&self) -> String {
        summarize(self)
    }

    /// See [`to_prompt`].
    pub fn to_prompt(&self) -> Result<String, ProfileError> {
        to_prompt(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_profile() -> Profile {
        let mut p = Profile::new("alice_tg", "100500", 3);
        p.name = "Alice".into();
        p.birth_date = NaiveDate::from_ymd_opt(2003, 2, 1);
        p
    }

    #[test]
    fn field_names_are_unique() {
        for (i, field) in PROFILE_FIELDS.iter().enumerate() {
            assert!(
                PROFILE_FIELDS[i + 1..].iter().all(|d| d.name != field.name),
                "{} is declared twice",
                field.name
            );
        }
    }

    #[test]
    fn prompt_fails_on_first_missing_required() {
        let p = Profile::new("alice_tg", "100500", 3);
        assert_eq!(
            to_prompt(&p),
            Err(ProfileError::MissingRequired { field: "Name" })
        );

        let mut named = p.clone();
        named.name = "Alice".into();
        assert_eq!(
            to_prompt(&named),
            Err(ProfileError::MissingRequired { field: "BirthDate" })
        );
    }

    #[test]
    fn prompt_with_required_only() {
        let prompt = to_prompt(&complete_profile()).unwrap();
        assert_eq!(prompt, "Name: Alice\nBirthDate: 01.02.2003\n");
    }

    #[test]
    fn prompt_includes_filled_optionals_once_and_no_internals() {
        let mut p = complete_profile();
        p.hobby = "chess".into();
        p.work_place = "Observatory".into();
        p.predictions = 9;

        let prompt = to_prompt(&p).unwrap();
        assert_eq!(prompt.matches("Hobby: chess").count(), 1);
        assert_eq!(prompt.matches("WorkPlace: Observatory").count(), 1);
        assert!(!prompt.contains("Surname"));
        assert!(!prompt.contains("alice_tg"));
        assert!(!prompt.contains("100500"));
        assert!(!prompt.contains("Quota"));
        assert!(!prompt.contains("Predictions"));
    }

    #[test]
    fn prompt_preserves_declared_order() {
        let mut p = complete_profile();
        p.hobby = "chess".into();
        p.surname = "Smith".into();
        let prompt = to_prompt(&p).unwrap();
        let lines: Vec<&str> = prompt.lines().collect();
        assert_eq!(
            lines,
            vec!["Name: Alice", "Surname: Smith", "BirthDate: 01.02.2003", "Hobby: chess"]
        );
    }

    #[test]
    fn summary_flags_missing_required_fields() {
        let summary = summarize(&Profile::new("alice_tg", "100500", 3));
        assert!(summary.starts_with("*Your profile*:\n"));
        assert!(summary.contains("First name: - _(required)_"));
        assert!(summary.contains("Date of birth: - _(required)_"));
        assert!(summary.contains("Hobbies: -\n"));
        assert_eq!(summary.matches("_(required)_").count(), 2);
    }

    #[test]
    fn summary_shows_values_and_hides_internals() {
        let summary = summarize(&complete_profile());
        assert!(summary.contains("First name: Alice\n"));
        assert!(summary.contains("Date of birth: 01.02.2003\n"));
        assert!(!summary.contains("_(required)_"));
        assert!(!summary.contains("alice_tg"));
        assert!(!summary.contains("Quota"));
    }
}
