//! Inline keyboards attached to bot replies.

use crate::channels::{InlineButton, InlineKeyboard};
use crate::profile::EditableField;

/// Payload of the quota top-up button.
pub const PAY_PAYLOAD: &str = "pay";

/// One button per editable field, one per row.
pub fn profile_keyboard() -> InlineKeyboard {
    InlineKeyboard::single_column(
        EditableField::ALL
            .iter()
            .map(|f| InlineButton::new(f.button_label(), f.token())),
    )
}

pub fn payment_keyboard() -> InlineKeyboard {
    InlineKeyboard::single_column([InlineButton::new("Pay", PAY_PAYLOAD)])
}
