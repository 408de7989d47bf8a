//! User-facing texts.

pub const INTRO: &str = "\
Hello! I am your personal numerologist.

Tell me a little about yourself and I will read what the numbers say about you:
1. /profile - fill in your profile
2. /predictions - get your numerology forecast
3. /payment - check your remaining requests";

pub const HELP: &str = "\
I will help you understand your essence through numbers and more:
1. /profile - fill in your profile
2. /predictions - find out your possible predictions";

pub const UNKNOWN_COMMAND: &str = "Unknown command";

/// The single phrase shown for every internal failure.
pub const GENERIC_FAILURE: &str = "Problems occurred, please try again later";

pub const WRONG_DATE_FORMAT: &str = "Wrong date format, please try again using dd.mm.yyyy";

pub const FILL_REQUIRED: &str =
    "Please fill in the required fields of your /profile before asking for a forecast";

pub const QUOTA_EXHAUSTED: &str =
    "You have run out of requests. Top up your quota in /payment";

pub const QUOTA_INCREASED: &str = "Quota increased";

pub const CANCEL_HINT: &str = "Type /stop to cancel input";

/// Callback acknowledgment after a field was selected.
pub const AWAITING_INPUT: &str = "Awaiting input...";

pub const PROFILE_UPDATED: &str = "Your profile has been updated";

pub const PROFILE_CLEARED: &str = "Your profile data has been cleared";

pub const NOT_EDITING: &str = "You are not editing your profile";

pub const INPUT_CANCELLED: &str = "Input cancelled:";

pub const AWAITING_PREDICTION: &str = "Waiting for the numerology forecast...";

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an experienced numerologist. The user gives you facts about themselves: \
name, date of birth and, optionally, surname, biography, workplace, place of study \
and hobbies. Calculate the core numbers from the name and the date of birth and \
write a warm, personal forecast based on them. Mention how the other facts relate \
to the numbers. Answer in the language of the user's name, use Markdown for \
headings and keep the answer under 3000 characters.";

/// Remaining quota and prediction count.
pub fn payment_message(quota: u32, predictions: u32) -> String {
    format!("*Payment*\n\nRemaining requests: {quota}\nPredictions made: {predictions}")
}

pub fn feedback_message(contact: &str) -> String {
    format!("Questions, ideas or problems? Write to {contact}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_message_shows_counters() {
        let text = payment_message(2, 5);
        assert!(text.contains("Remaining requests: 2"));
        assert!(text.contains("Predictions made: 5"));
    }
}
