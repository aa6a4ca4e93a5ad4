//! The client session controller.
//!
//! [`Controller`] owns the session, the conversation model and the persona
//! working copy, and gates every authenticated backend call through
//! [`Controller::authorized_fetch`].
//!
//! # Concurrency
//!
//! All operations take `&self` so a front end can run them concurrently
//! (e.g. render while a reply is pending).  The state mutex is never held
//! across an await.  Each login starts a new *epoch*; responses issued under
//! an earlier epoch are dropped instead of being applied to the current
//! model.  `logout` and `cancel_pending` cancel the session's
//! [`CancellationToken`], which abandons every in-flight authorized call.
//! At most one chat send is outstanding at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::chat::conversation::{ChatMessage, Conversation, Cursor, Update};
use crate::client::Companion;
use crate::error::{Error, Result};
use crate::observability::{
    CHAT_BUSY_REJECTIONS, CHAT_SEND_FAILURES, CHAT_SENDS, SESSION_AUTH_REJECTIONS,
    SESSION_CANCELLED, SESSION_LOGINS, SESSION_LOGOUTS, SESSION_STALE_RESPONSES,
};
use crate::session::{CredentialStore, SessionContext};
use crate::transport::{Request, Response, Transport};
use crate::types::{ChatReply, Credentials, Health, HistoryEntry, Persona, PersonaField};

/// Shown after an account is created.
pub const REGISTER_SUCCEEDED: &str = "Registration successful! Please log in.";
/// Shown for any failed registration, whatever the cause.
pub const REGISTER_FAILED: &str = "Registration failed. Email may already be in use.";
/// Shown for any failed login, whatever the cause.
pub const LOGIN_FAILED: &str = "Login failed. Check your email and password.";
/// Replaces the reply when a message could not be sent.
pub const SEND_FAILED: &str = "Sorry, I couldn't send that message.";
/// Shown when a send is rejected because one is already pending.
pub const SEND_BUSY: &str = "Still waiting for the previous reply.";
/// Shown when the chat history cannot be fetched.
pub const HISTORY_FAILED: &str = "Couldn't load chat history.";
/// Shown when the persona cannot be fetched.
pub const PERSONA_LOAD_FAILED: &str = "Couldn't load persona.";
/// Shown after the persona is stored.
pub const PERSONA_SAVED: &str = "Persona saved!";
/// Shown when the backend refuses or loses a persona update.
pub const PERSONA_SAVE_FAILED: &str = "Failed to save persona.";
/// Shown when the backend rejects the stored token.
pub const SESSION_ENDED: &str = "Your session has ended. Please log in again.";

/// Which screen the front end should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Unauthenticated, login form.
    Login,
    /// Unauthenticated, registration form.
    Register,
    /// Authenticated chat.
    Chat,
}

impl View {
    /// Returns true for the authenticated view.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, View::Chat)
    }
}

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Confirmation of a completed action.
    Info,
    /// A failed action.
    Error,
}

/// A transient, alert-level message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Text to show.
    pub text: String,
}

impl Notice {
    /// Creates an informational notice.
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    /// Creates an error notice.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// How an operation that reached for the backend ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The response was applied to the model.
    Completed,
    /// Nothing to do; no request was made.
    Skipped,
    /// The session ended, was cancelled or was replaced before the response
    /// could be applied.  No data; not a failure.
    Aborted,
}

/// A snapshot of everything a front end draws.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Current screen.
    pub view: View,
    /// Logged-in email.
    pub email: Option<String>,
    /// Displayed companion name.
    pub companion_name: String,
    /// Whether a reply is awaited.
    pub typing: bool,
    /// The settings working copy while the settings form is open.
    pub settings: Option<Persona>,
    /// Conversation changes since the caller's cursor.
    pub update: Update,
    /// Notices queued since the previous frame.
    pub notices: Vec<Notice>,
}

struct State {
    context: SessionContext,
    view: View,
    conversation: Conversation,
    companion_name: String,
    draft: Persona,
    settings_open: bool,
    notices: Vec<Notice>,
    epoch: u64,
    cancel: CancellationToken,
}

impl State {
    fn new() -> Self {
        Self {
            context: SessionContext::fresh(),
            view: View::Login,
            conversation: Conversation::new(),
            companion_name: Persona::default().name,
            draft: Persona::default(),
            settings_open: false,
            notices: Vec::new(),
            epoch: 0,
            cancel: CancellationToken::new(),
        }
    }

    /// Abandons in-flight calls and starts a new epoch with an empty model.
    fn reset_session(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.epoch += 1;
        self.conversation.clear();
        self.companion_name = Persona::default().name;
        self.draft = Persona::default();
        self.settings_open = false;
    }
}

/// Releases the single-flight flag when dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Manages the authentication lifecycle and gates all authenticated
/// operations.
pub struct Controller<T: Transport, S: CredentialStore> {
    client: Companion<T>,
    store: S,
    state: Mutex<State>,
    chat_in_flight: AtomicBool,
}

impl<T: Transport, S: CredentialStore> Controller<T, S> {
    /// Creates a controller with no session.  Call [`Controller::start`] to
    /// pick up stored credentials.
    pub fn new(client: Companion<T>, store: S) -> Self {
        Self {
            client,
            store,
            state: Mutex::new(State::new()),
            chat_in_flight: AtomicBool::new(false),
        }
    }

    /// Restores the stored session, if any, and enters the matching view.
    ///
    /// With a session this loads chat history and the persona.
    pub async fn start(&self) -> View {
        let context = SessionContext::restore(&self.store);
        let authenticated = context.is_authenticated();
        {
            let mut state = self.state();
            state.reset_session();
            state.context = context;
            state.view = if authenticated {
                View::Chat
            } else {
                View::Login
            };
        }
        if authenticated {
            self.enter_chat().await;
        }
        self.view()
    }

    /// Switches between the login and registration forms.
    pub fn toggle_auth_view(&self) -> View {
        let mut state = self.state();
        state.view = match state.view {
            View::Login => View::Register,
            View::Register => View::Login,
            View::Chat => View::Chat,
        };
        state.view
    }

    /// Creates an account.
    ///
    /// On success the user is asked to log in and the login form is shown.
    pub async fn register(&self, email: &str, password: &str) -> Result<()> {
        let credentials = Credentials::new(email.trim(), password);
        match self.client.register(&credentials).await {
            Ok(_) => {
                let mut state = self.state();
                state.notices.push(Notice::info(REGISTER_SUCCEEDED));
                if state.view == View::Register {
                    state.view = View::Login;
                }
                Ok(())
            }
            Err(err) => {
                tracing::debug!(error = %err, "registration failed");
                self.notify(Notice::error(REGISTER_FAILED));
                Err(err)
            }
        }
    }

    /// Logs in, stores the session and loads history and persona.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let credentials = Credentials::new(email.trim(), password);
        let login = match self.client.login(&credentials).await {
            Ok(login) => login,
            Err(err) => {
                tracing::debug!(error = %err, "login failed");
                self.notify(Notice::error(LOGIN_FAILED));
                return Err(err);
            }
        };

        {
            let mut guard = self.state();
            let state = &mut *guard;
            if let Err(err) = state
                .context
                .establish(&self.store, &login.access_token, &login.email)
            {
                tracing::warn!(error = %err, "could not store session");
                state.notices.push(Notice::error(LOGIN_FAILED));
                return Err(err);
            }
            state.reset_session();
            state.view = View::Chat;
        }
        SESSION_LOGINS.click();
        tracing::info!(email = %login.email, "logged in");

        self.enter_chat().await;
        Ok(())
    }

    /// Clears the session and the conversation and returns to the login form.
    ///
    /// In-flight calls are abandoned; their responses are never applied.
    pub fn logout(&self) {
        let mut state = self.state();
        self.end_session(&mut *state);
    }

    fn end_session(&self, state: &mut State) {
        state.context.clear(&self.store);
        state.reset_session();
        state.view = View::Login;
        SESSION_LOGOUTS.click();
    }

    /// Abandons every in-flight call of the current session without logging
    /// out.
    pub fn cancel_pending(&self) {
        let mut state = self.state();
        state.cancel.cancel();
        state.cancel = CancellationToken::new();
        SESSION_CANCELLED.click();
    }

    /// Sends `request` with the session's bearer token.
    ///
    /// Returns `Ok(None)` when the call was not made or its response must be
    /// ignored: there is no session, the backend rejected the token (the
    /// session is then logged out), or the session ended or was cancelled
    /// while the call was in flight.  Every other response is returned
    /// whatever its status.
    pub async fn authorized_fetch(&self, request: Request) -> Result<Option<Response>> {
        Ok(self
            .fetch_in_session(request)
            .await?
            .map(|(response, _)| response))
    }

    /// Like `authorized_fetch`, also returning the epoch the response
    /// belongs to.
    async fn fetch_in_session(&self, request: Request) -> Result<Option<(Response, u64)>> {
        let session = {
            let state = self.state();
            state
                .context
                .token()
                .map(|token| (token.to_string(), state.epoch, state.cancel.clone()))
        };
        let Some((token, epoch, cancel)) = session else {
            tracing::debug!(path = %request.path, "authorized call without a session");
            self.logout();
            return Ok(None);
        };

        let path = request.path.clone();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(path = %path, "authorized call abandoned");
                return Ok(None);
            }
            result = self.client.execute(request.with_bearer(token)) => result,
        };

        let mut state = self.state();
        if state.epoch != epoch || cancel.is_cancelled() {
            SESSION_STALE_RESPONSES.click();
            tracing::debug!(path = %path, "dropping response from an ended session");
            return Ok(None);
        }
        let response = result?;
        if response.is_unauthorized() {
            SESSION_AUTH_REJECTIONS.click();
            tracing::warn!(path = %path, "authorization rejected; logging out");
            self.end_session(&mut *state);
            state.notices.push(Notice::info(SESSION_ENDED));
            return Ok(None);
        }
        Ok(Some((response, epoch)))
    }

    /// Authorized call whose non-success statuses become errors.
    async fn fetch_checked(&self, request: Request) -> Result<Option<(Response, u64)>> {
        let path = request.path.clone();
        match self.fetch_in_session(request).await? {
            Some((response, epoch)) => Ok(Some((response.error_for_status(&path)?, epoch))),
            None => Ok(None),
        }
    }

    /// Authorized call decoding a JSON body.
    async fn fetch_json<R: DeserializeOwned>(&self, request: Request) -> Result<Option<(R, u64)>> {
        match self.fetch_checked(request).await? {
            Some((response, epoch)) => Ok(Some((response.json()?, epoch))),
            None => Ok(None),
        }
    }

    /// Sends a chat message and appends the reply.
    ///
    /// Blank input is skipped without a request.  The user's message is shown
    /// immediately and stays even if the send fails; a failure shows an
    /// error entry in place of the reply.  A send while another is still in
    /// flight is rejected with [`Error::Busy`].
    pub async fn send_message(&self, text: &str) -> Result<Outcome> {
        let message = text.trim();
        if message.is_empty() {
            return Ok(Outcome::Skipped);
        }
        let Some(_in_flight) = InFlight::acquire(&self.chat_in_flight) else {
            CHAT_BUSY_REJECTIONS.click();
            self.notify(Notice::error(SEND_BUSY));
            return Err(Error::busy("a chat message is already in flight"));
        };
        let request = Companion::<T>::chat_request(message)?;

        let epoch = {
            let mut state = self.state();
            state.conversation.push(ChatMessage::user(message));
            state.conversation.set_typing(true);
            state.epoch
        };
        CHAT_SENDS.click();

        match self.fetch_json::<ChatReply>(request).await {
            Ok(Some((reply, epoch))) => {
                let applied = self.apply_in_session(epoch, |state| {
                    state.conversation.set_typing(false);
                    state.conversation.push(ChatMessage::ai(reply.response));
                });
                Ok(applied.map_or(Outcome::Aborted, |_| Outcome::Completed))
            }
            Ok(None) => {
                self.apply_in_session(epoch, |state| state.conversation.set_typing(false));
                Ok(Outcome::Aborted)
            }
            Err(err) => {
                CHAT_SEND_FAILURES.click();
                tracing::debug!(error = %err, "chat send failed");
                self.apply_in_session(epoch, |state| {
                    state.conversation.set_typing(false);
                    state.conversation.push(ChatMessage::ai_error(SEND_FAILED));
                });
                Err(err)
            }
        }
    }

    /// Replaces the conversation with the server-side history, in the order
    /// received.
    pub async fn load_chat_history(&self) -> Result<Outcome> {
        let request = Companion::<T>::history_request();
        match self.fetch_json::<Vec<HistoryEntry>>(request).await {
            Ok(Some((history, epoch))) => {
                let applied = self.apply_in_session(epoch, |state| {
                    state
                        .conversation
                        .replace(history.into_iter().map(ChatMessage::from));
                });
                Ok(applied.map_or(Outcome::Aborted, |_| Outcome::Completed))
            }
            Ok(None) => Ok(Outcome::Aborted),
            Err(err) => {
                tracing::debug!(error = %err, "history load failed");
                self.notify(Notice::error(HISTORY_FAILED));
                Err(err)
            }
        }
    }

    /// Fetches the persona into the settings working copy and the displayed
    /// companion name.
    pub async fn load_persona(&self) -> Result<Outcome> {
        let request = Companion::<T>::persona_request();
        match self.fetch_json::<Persona>(request).await {
            Ok(Some((persona, epoch))) => {
                let applied = self.apply_in_session(epoch, |state| {
                    state.companion_name = persona.name.clone();
                    state.draft = persona;
                });
                Ok(applied.map_or(Outcome::Aborted, |_| Outcome::Completed))
            }
            Ok(None) => Ok(Outcome::Aborted),
            Err(err) => {
                tracing::debug!(error = %err, "persona load failed");
                self.notify(Notice::error(PERSONA_LOAD_FAILED));
                Err(err)
            }
        }
    }

    /// Loads the persona and opens the settings form.
    ///
    /// The form opens even if the load fails, showing the last known values.
    pub async fn open_settings(&self) -> Result<Outcome> {
        let loaded = self.load_persona().await;
        if let Ok(Outcome::Aborted) = loaded {
            return loaded;
        }
        let mut state = self.state();
        if state.view == View::Chat {
            state.settings_open = true;
        }
        loaded
    }

    /// Closes the settings form, discarding unsaved edits.
    pub fn close_settings(&self) {
        self.state().settings_open = false;
    }

    /// Changes one field of the settings working copy.
    pub fn edit_draft(&self, field: PersonaField, value: &str) -> Result<()> {
        let mut state = self.state();
        if !state.settings_open {
            return Err(Error::validation(
                "open the persona settings before editing them",
                Some(field.to_string()),
            ));
        }
        state.draft.set(field, value.trim());
        Ok(())
    }

    /// Saves the settings working copy.
    pub async fn save_draft(&self) -> Result<Outcome> {
        let draft = self.persona_draft();
        self.save_settings(draft).await
    }

    /// Replaces the persona on the backend.
    ///
    /// Success updates the displayed companion name and closes the settings
    /// form.  Invalid personas are rejected without a request.
    pub async fn save_settings(&self, persona: Persona) -> Result<Outcome> {
        if let Err(err) = persona.validate() {
            self.notify(Notice::error(err.to_string()));
            return Err(err);
        }
        let request = Companion::<T>::save_persona_request(&persona)?;
        match self.fetch_checked(request).await {
            Ok(Some((_, epoch))) => {
                let applied = self.apply_in_session(epoch, |state| {
                    state.companion_name = persona.name.clone();
                    state.draft = persona;
                    state.settings_open = false;
                    state.notices.push(Notice::info(PERSONA_SAVED));
                });
                Ok(applied.map_or(Outcome::Aborted, |_| Outcome::Completed))
            }
            Ok(None) => Ok(Outcome::Aborted),
            Err(err) => {
                tracing::debug!(error = %err, "persona save failed");
                self.notify(Notice::error(PERSONA_SAVE_FAILED));
                Err(err)
            }
        }
    }

    /// Queries the backend's health endpoint.  Needs no session.
    pub async fn health(&self) -> Result<Health> {
        self.client.health().await
    }

    /// Returns everything needed to draw the current state and advances
    /// `cursor`.  Queued notices are handed out once.
    pub fn next_frame(&self, cursor: &mut Cursor) -> Frame {
        let mut guard = self.state();
        let state = &mut *guard;
        Frame {
            view: state.view,
            email: state.context.email().map(String::from),
            companion_name: state.companion_name.clone(),
            typing: state.conversation.is_typing(),
            settings: state.settings_open.then(|| state.draft.clone()),
            update: state.conversation.update_since(cursor),
            notices: std::mem::take(&mut state.notices),
        }
    }

    /// Returns the current view.
    pub fn view(&self) -> View {
        self.state().view
    }

    /// Returns true if a session is present.
    pub fn is_authenticated(&self) -> bool {
        self.state().context.is_authenticated()
    }

    /// Returns the logged-in email.
    pub fn email(&self) -> Option<String> {
        self.state().context.email().map(String::from)
    }

    /// Returns the displayed companion name.
    pub fn companion_name(&self) -> String {
        self.state().companion_name.clone()
    }

    /// Returns a copy of the conversation.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state().conversation.messages().to_vec()
    }

    /// Returns true while a reply is awaited.
    pub fn is_typing(&self) -> bool {
        self.state().conversation.is_typing()
    }

    /// Returns true while the settings form is open.
    pub fn settings_open(&self) -> bool {
        self.state().settings_open
    }

    /// Returns a copy of the settings working copy.
    pub fn persona_draft(&self) -> Persona {
        self.state().draft.clone()
    }

    /// Removes and returns the queued notices.
    pub fn drain_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.state().notices)
    }

    /// Returns the backend client.
    pub fn client(&self) -> &Companion<T> {
        &self.client
    }

    /// Returns the credential store.
    pub fn store(&self) -> &S {
        &self.store
    }

    async fn enter_chat(&self) {
        let (history, persona) = futures::join!(self.load_chat_history(), self.load_persona());
        for result in [history, persona] {
            if let Err(err) = result {
                tracing::debug!(error = %err, "initial load failed");
            }
        }
    }

    fn notify(&self, notice: Notice) {
        self.state().notices.push(notice);
    }

    /// Runs `f` only if `epoch` is still the current session.
    fn apply_in_session<R>(&self, epoch: u64, f: impl FnOnce(&mut State) -> R) -> Option<R> {
        let mut state = self.state();
        if state.epoch != epoch {
            SESSION_STALE_RESPONSES.click();
            return None;
        }
        Some(f(&mut *state))
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_flight_is_exclusive_until_dropped() {
        let flag = AtomicBool::new(false);
        let first = InFlight::acquire(&flag);
        assert!(first.is_some());
        assert!(InFlight::acquire(&flag).is_none());
        drop(first);
        assert!(InFlight::acquire(&flag).is_some());
    }

    #[test]
    fn reset_session_starts_a_new_epoch() {
        let mut state = State::new();
        let token = state.cancel.clone();
        state.conversation.push(ChatMessage::user("hello"));
        state.settings_open = true;
        state.draft.name = "Nova".to_string();

        state.reset_session();
        assert_eq!(state.epoch, 1);
        assert!(token.is_cancelled());
        assert!(!state.cancel.is_cancelled());
        assert!(state.conversation.is_empty());
        assert!(!state.settings_open);
        assert_eq!(state.draft, Persona::default());
    }

    #[test]
    fn only_chat_is_authenticated() {
        assert!(View::Chat.is_authenticated());
        assert!(!View::Login.is_authenticated());
        assert!(!View::Register.is_authenticated());
    }
}
