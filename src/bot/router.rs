//! Session router: turns each inbound chat event into replies and profile
//! updates.
//!
//! Events are handled one at a time, in arrival order. The profile store is
//! the only place session state lives; the router keeps nothing between
//! events.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, error, info, warn};

use crate::bot::commands::Command;
use crate::bot::keyboards::{PAY_PAYLOAD, payment_keyboard, profile_keyboard};
use crate::bot::messages;
use crate::channels::{ChatEvent, ChatTransport, OutgoingMessage};
use crate::config::BotConfig;
use crate::error::Result;
use crate::llm::{ChatMessage, LlmProvider};
use crate::profile::{EditableField, EditingEvent, Profile};
use crate::store::ProfileStore;

/// Which handler an event goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The quota top-up button.
    Pay,
    /// A profile keyboard button.
    SelectField(EditableField),
    /// A button payload nobody recognizes.
    UnknownAction,
    Command(Command),
    /// Free text while a field is being edited.
    EditField(EditableField),
    /// Free text outside edit mode.
    PlainText,
}

/// Classify an event against the sender's current profile.
///
/// Commands take precedence over edit mode, so `/stop` and friends work
/// while a field is awaiting input.
pub fn classify(event: &ChatEvent, profile: &Profile) -> Route {
    match event {
        ChatEvent::InlineAction(action) if action.payload == PAY_PAYLOAD => Route::Pay,
        ChatEvent::InlineAction(action) => match EditableField::from_token(&action.payload) {
            Some(field) => Route::SelectField(field),
            None => Route::UnknownAction,
        },
        ChatEvent::Text(message) => {
            if let Some(command) = Command::parse(&message.text) {
                return Route::Command(command);
            }
            match profile.editing_field.field() {
                Some(field) => Route::EditField(field),
                None => Route::PlainText,
            }
        }
    }
}

/// Dispatches chat events to handlers.
pub struct Router {
    config: BotConfig,
    store: Arc<dyn ProfileStore>,
    llm: Arc<dyn LlmProvider>,
    transport: Arc<dyn ChatTransport>,
}

impl Router {
    pub fn new(
        config: BotConfig,
        store: Arc<dyn ProfileStore>,
        llm: Arc<dyn LlmProvider>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            config,
            store,
            llm,
            transport,
        }
    }

    /// Consume the transport's event stream until it ends.
    pub async fn run(&self) -> Result<()> {
        let mut events = self.transport.start().await?;
        info!(channel = self.transport.name(), "Router started");

        while let Some(event) = events.next().await {
            self.route(event).await;
        }

        info!(channel = self.transport.name(), "Event stream closed");
        Ok(())
    }

    /// Handle one event end to end. Failures are logged and reported to the
    /// user with the generic failure message.
    pub async fn route(&self, event: ChatEvent) {
        let chat_id = event.chat_id().to_string();

        let profile = match self.resolve_profile(&event).await {
            Ok(profile) => profile,
            Err(e) => {
                error!(identity = event.sender(), error = %e, "Failed to resolve profile");
                self.reply(&chat_id, OutgoingMessage::plain(messages::GENERIC_FAILURE)).await;
                return;
            }
        };

        let route = classify(&event, &profile);
        debug!(
            identity = %profile.identity,
            state = %profile.editing_field,
            route = ?route,
            "Routing event"
        );

        let result = match (route, &event) {
            (Route::Pay, ChatEvent::InlineAction(action)) => {
                self.handle_pay(&chat_id, profile, &action.ack_token).await
            }
            (Route::SelectField(field), ChatEvent::InlineAction(action)) => {
                self.handle_select_field(&chat_id, profile, field, &action.ack_token).await
            }
            (Route::EditField(field), ChatEvent::Text(message)) => {
                self.handle_edit(&chat_id, profile, field, &message.text).await
            }
            (Route::UnknownAction, _) => {
                warn!(identity = %profile.identity, "Unrecognized inline payload");
                self.reply(&chat_id, OutgoingMessage::plain(messages::CANCEL_HINT)).await;
                Ok(())
            }
            (Route::Command(command), _) => {
                self.handle_command(&chat_id, profile, command).await
            }
            _ => {
                self.reply(&chat_id, OutgoingMessage::plain(messages::HELP)).await;
                Ok(())
            }
        };

        if let Err(e) = result {
            error!(identity = event.sender(), error = %e, "Handler failed");
            self.reply(&chat_id, OutgoingMessage::plain(messages::GENERIC_FAILURE)).await;
        }
    }

    /// Load the sender's profile, creating and persisting it on first contact.
    async fn resolve_profile(&self, event: &ChatEvent) -> Result<Profile> {
        let identity = event.sender();
        if self.store.exists(identity).await? {
            return Ok(self.store.get(identity).await?);
        }

        info!(identity, chat_id = event.chat_id(), "Creating profile for new user");
        let profile = Profile::new(identity, event.chat_id(), self.config.quota.starting_quota);
        self.store.put(identity, &profile).await?;
        Ok(profile)
    }

    async fn persist(&self, profile: &Profile) -> Result<()> {
        self.store.put(&profile.identity, profile).await?;
        Ok(())
    }

    /// Send a message. Returns whether it was delivered; failures are only logged.
    async fn reply(&self, chat_id: &str, message: OutgoingMessage) -> bool {
        match self.transport.send(chat_id, message).await {
            Ok(()) => true,
            Err(e) => {
                error!(chat_id, error = %e, "Failed to send reply");
                false
            }
        }
    }

    async fn acknowledge(&self, ack_token: &str, text: Option<&str>) {
        if let Err(e) = self.transport.acknowledge(ack_token, text).await {
            warn!(error = %e, "Failed to acknowledge inline action");
        }
    }

    // ── Inline actions ──────────────────────────────────────────────

    async fn handle_pay(&self, chat_id: &str, mut profile: Profile, ack_token: &str) -> Result<()> {
        self.acknowledge(ack_token, None).await;

        profile.quota = profile.quota.saturating_add(1);
        self.persist(&profile).await?;
        info!(identity = %profile.identity, quota = profile.quota, "Quota increased");

        self.reply(chat_id, OutgoingMessage::plain(messages::QUOTA_INCREASED)).await;
        self.send_payment_view(chat_id, &profile).await;
        Ok(())
    }

    async fn handle_select_field(
        &self,
        chat_id: &str,
        mut profile: Profile,
        field: EditableField,
        ack_token: &str,
    ) -> Result<()> {
        self.reply(chat_id, OutgoingMessage::plain(messages::CANCEL_HINT)).await;

        profile.apply(EditingEvent::Select(field));
        self.persist(&profile).await?;
        debug!(identity = %profile.identity, %field, "Entered edit mode");

        self.reply(chat_id, OutgoingMessage::plain(field.input_prompt())).await;
        self.acknowledge(ack_token, Some(messages::AWAITING_INPUT)).await;
        Ok(())
    }

    // ── Free text ───────────────────────────────────────────────────

    async fn handle_edit(
        &self,
        chat_id: &str,
        profile: Profile,
        field: EditableField,
        text: &str,
    ) -> Result<()> {
        let mut updated = profile;
        if let Err(e) = updated.set_field(field, text) {
            debug!(identity = %updated.identity, error = %e, "Rejected field input");
            self.reply(chat_id, OutgoingMessage::plain(messages::WRONG_DATE_FORMAT)).await;
            return Ok(());
        }
        updated.apply(EditingEvent::Commit);
        self.persist(&updated).await?;

        self.reply(chat_id, OutgoingMessage::plain(messages::PROFILE_UPDATED)).await;
        self.send_profile_view(chat_id, updated.summary()).await;
        Ok(())
    }

    // ── Commands ────────────────────────────────────────────────────

    async fn handle_command(&self, chat_id: &str, profile: Profile, command: Command) -> Result<()> {
        debug!(identity = %profile.identity, command = command.name(), "Command received");

        match command {
            Command::Start => {
                self.reply(chat_id, OutgoingMessage::plain(messages::INTRO)).await;
            }
            Command::Help => {
                self.reply(chat_id, OutgoingMessage::plain(messages::HELP)).await;
            }
            Command::Feedback => {
                let text = messages::feedback_message(&self.config.feedback_contact);
                self.reply(chat_id, OutgoingMessage::plain(text)).await;
            }
            Command::Payment => self.send_payment_view(chat_id, &profile).await,
            Command::Profile => {
                self.send_profile_view(chat_id, profile.summary()).await;
            }
            Command::Reset => self.handle_reset(chat_id, profile).await?,
            Command::Predictions => self.handle_predictions(chat_id, profile).await?,
            Command::Stop => self.handle_stop(chat_id, profile).await?,
            Command::Unknown(name) => {
                debug!(command = %name, "Unknown command");
                self.reply(chat_id, OutgoingMessage::plain(messages::UNKNOWN_COMMAND)).await;
            }
        }
        Ok(())
    }

    async fn handle_reset(&self, chat_id: &str, mut profile: Profile) -> Result<()> {
        profile.reset();
        self.persist(&profile).await?;
        info!(identity = %profile.identity, "Profile cleared");

        self.reply(chat_id, OutgoingMessage::plain(messages::PROFILE_CLEARED)).await;
        Ok(())
    }

    async fn handle_stop(&self, chat_id: &str, mut profile: Profile) -> Result<()> {
        if profile.editing_field.is_idle() {
            self.reply(chat_id, OutgoingMessage::plain(messages::NOT_EDITING)).await;
            return Ok(());
        }

        profile.apply(EditingEvent::Cancel);
        self.persist(&profile).await?;

        let text = format!("{}\n{}", messages::INPUT_CANCELLED, profile.summary());
        self.send_profile_view(chat_id, text).await;
        Ok(())
    }

    async fn handle_predictions(&self, chat_id: &str, mut profile: Profile) -> Result<()> {
        let enforced = self.config.quota.enforced;
        if enforced && profile.quota == 0 {
            self.reply(chat_id, OutgoingMessage::plain(messages::QUOTA_EXHAUSTED)).await;
            return Ok(());
        }

        let prompt = match profile.to_prompt() {
            Ok(prompt) => prompt,
            Err(e) => {
                debug!(identity = %profile.identity, error = %e, "Profile incomplete");
                self.reply(chat_id, OutgoingMessage::plain(messages::FILL_REQUIRED)).await;
                return Ok(());
            }
        };
        debug!(identity = %profile.identity, prompt = %prompt, "Requesting forecast");

        let request = vec![
            ChatMessage::system(self.config.system_prompt.as_str()),
            ChatMessage::user(prompt),
        ];

        self.reply(chat_id, OutgoingMessage::plain(messages::AWAITING_PREDICTION)).await;
        let answer = self.llm.complete(request).await?;
        debug!(identity = %profile.identity, answer = %answer, "Forecast received");

        if !self.reply(chat_id, OutgoingMessage::markdown(answer)).await {
            // Quota is only spent on a delivered forecast.
            self.reply(chat_id, OutgoingMessage::plain(messages::GENERIC_FAILURE)).await;
            return Ok(());
        }

        profile.record_prediction(enforced);
        self.persist(&profile).await?;
        info!(
            identity = %profile.identity,
            quota = profile.quota,
            predictions = profile.predictions,
            "Forecast delivered"
        );
        Ok(())
    }

    // ── Views ───────────────────────────────────────────────────────

    async fn send_profile_view(&self, chat_id: &str, text: String) {
        let message = OutgoingMessage::markdown(text).with_keyboard(profile_keyboard());
        self.reply(chat_id, message).await;
    }

    async fn send_payment_view(&self, chat_id: &str, profile: &Profile) {
        let text = messages::payment_message(profile.quota, profile.predictions);
        let message = OutgoingMessage::markdown(text).with_keyboard(payment_keyboard());
        self.reply(chat_id, message).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::EditingState;

    fn profile(state: EditingState) -> Profile {
        Profile {
            editing_field: state,
            ..Profile::new("alice", "42", 3)
        }
    }

    fn text(body: &str) -> ChatEvent {
        ChatEvent::text("alice", "42", body)
    }

    fn action(payload: &str) -> ChatEvent {
        ChatEvent::inline_action("alice", "42", payload, "cb")
    }

    #[test]
    fn inline_actions() {
        let idle = profile(EditingState::Idle);
        assert_eq!(classify(&action("pay"), &idle), Route::Pay);
        assert_eq!(
            classify(&action("hobby"), &idle),
            Route::SelectField(EditableField::Hobby)
        );
        assert_eq!(
            classify(&action("edit_birthdate"), &idle),
            Route::SelectField(EditableField::BirthDate)
        );
        assert_eq!(classify(&action("lottery"), &idle), Route::UnknownAction);
    }

    #[test]
    fn free_text_depends_on_cursor() {
        assert_eq!(classify(&text("Alice"), &profile(EditingState::Idle)), Route::PlainText);
        assert_eq!(
            classify(&text("Alice"), &profile(EditingState::Editing(EditableField::Name))),
            Route::EditField(EditableField::Name)
        );
    }

    #[test]
    fn commands_win_over_edit_mode() {
        let editing = profile(EditingState::Editing(EditableField::Bio));
        assert_eq!(classify(&text("/stop"), &editing), Route::Command(Command::Stop));
        assert_eq!(
            classify(&text("/nope"), &editing),
            Route::Command(Command::Unknown("nope".into()))
        );
    }
}
