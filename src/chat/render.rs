//! Output rendering for the chat application.
//!
//! The controller keeps the model; this module only draws it.  A [`Screen`]
//! remembers what has already been shown and turns each [`Frame`] into
//! calls on a [`Renderer`].  The default renderer writes plain text with
//! optional ANSI styling.

use std::io::{self, Stdout, Write};

use crate::chat::controller::{Frame, Notice, NoticeLevel, View};
use crate::chat::conversation::{ChatMessage, Cursor};
use crate::types::{Persona, PersonaField, Sender};

/// ANSI escape code for dim text (used for the typing indicator).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for italic text (used for the typing indicator).
const ANSI_ITALIC: &str = "\x1b[3m";

/// ANSI escape code for bold text (used for view headers).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the user's messages).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for informational notices).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for companion replies).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Capturing output in tests
pub trait Renderer: Send {
    /// Called when the screen switches between login, registration and chat.
    fn print_view(&mut self, view: View, email: Option<&str>);

    /// Called when previously drawn messages are no longer valid.
    fn clear_conversation(&mut self);

    /// Print one chat message.
    fn print_message(&mut self, companion: &str, message: &ChatMessage);

    /// Called when a reply starts being awaited.
    fn print_typing(&mut self, companion: &str);

    /// Print the persona settings form.
    fn print_settings(&mut self, persona: &Persona);

    /// Print a transient notice.
    fn print_notice(&mut self, notice: &Notice);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Plain text renderer with optional ANSI styling.
///
/// Writes to stdout by default; any writer can be supplied instead.
pub struct PlainTextRenderer<W: Write + Send = Stdout> {
    out: W,
    use_color: bool,
}

impl PlainTextRenderer<Stdout> {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl Default for PlainTextRenderer<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> PlainTextRenderer<W> {
    /// Creates a renderer over an arbitrary writer.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self { out, use_color }
    }

    /// Consumes the renderer and returns its writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn styled(&self, style: &str, text: &str) -> String {
        if self.use_color {
            format!("{style}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    fn line(&mut self, text: &str) {
        // Output errors are not actionable in a REPL.
        let _ = writeln!(self.out, "{text}");
        let _ = self.out.flush();
    }
}

impl<W: Write + Send> Renderer for PlainTextRenderer<W> {
    fn print_view(&mut self, view: View, email: Option<&str>) {
        let header = match (view, email) {
            (View::Login, _) => "== Log in (/login <email>, /switch to register) ==".to_string(),
            (View::Register, _) => {
                "== Register (/register <email>, /switch to log in) ==".to_string()
            }
            (View::Chat, Some(email)) => format!("== Chatting as {email} (/help for commands) =="),
            (View::Chat, None) => "== Chat (/help for commands) ==".to_string(),
        };
        let header = self.styled(ANSI_BOLD, &header);
        self.line(&header);
    }

    fn clear_conversation(&mut self) {
        let rule = self.styled(ANSI_DIM, "----------------------------------------");
        self.line(&rule);
    }

    fn print_message(&mut self, companion: &str, message: &ChatMessage) {
        let (label, style) = match message.sender {
            Sender::User => ("You", ANSI_CYAN),
            Sender::Ai => (companion, ANSI_GREEN),
            Sender::AiError => (companion, ANSI_RED),
        };
        let label = self.styled(style, &format!("{label}:"));
        let text = if message.sender == Sender::AiError && !self.use_color {
            format!("[error] {}", message.text)
        } else {
            message.text.clone()
        };
        self.line(&format!("{label} {text}"));
    }

    fn print_typing(&mut self, companion: &str) {
        let text = self.styled(
            &format!("{ANSI_DIM}{ANSI_ITALIC}"),
            &format!("{companion} is typing..."),
        );
        self.line(&text);
    }

    fn print_settings(&mut self, persona: &Persona) {
        let title = self.styled(ANSI_BOLD, "Persona settings");
        self.line(&title);
        for field in PersonaField::ALL {
            self.line(&format!(
                "  {:<13} {} (/{field}, max {})",
                format!("{field}:"),
                persona.get(field),
                field.max_len()
            ));
        }
        self.line("  /save to apply, /cancel to discard");
    }

    fn print_notice(&mut self, notice: &Notice) {
        let text = match notice.level {
            NoticeLevel::Info => self.styled(ANSI_YELLOW, &notice.text),
            NoticeLevel::Error => self.styled(ANSI_RED, &notice.text),
        };
        self.line(&format!("* {text}"));
    }

    fn print_error(&mut self, error: &str) {
        let text = self.styled(ANSI_RED, &format!("Error: {error}"));
        self.line(&text);
    }

    fn print_info(&mut self, info: &str) {
        self.line(info);
    }
}

/// Remembers what a renderer has already shown.
#[derive(Debug, Default)]
pub struct Screen {
    cursor: Cursor,
    view: Option<View>,
    typing: bool,
    settings: Option<Persona>,
}

impl Screen {
    /// Creates a screen that has shown nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cursor to pass to `Controller::next_frame`.
    pub fn cursor(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    /// Draws whatever in `frame` has not been shown.  Returns true if
    /// anything was drawn.
    pub fn draw(&mut self, frame: Frame, renderer: &mut dyn Renderer) -> bool {
        let mut drew = false;
        if self.view != Some(frame.view) {
            renderer.print_view(frame.view, frame.email.as_deref());
            self.view = Some(frame.view);
            drew = true;
        }
        if frame.update.reset && (self.showing_chat() || !frame.update.messages.is_empty())
        {
            renderer.clear_conversation();
            drew = true;
        }
        for message in &frame.update.messages {
            renderer.print_message(&frame.companion_name, message);
            drew = true;
        }
        if frame.typing && !self.typing {
            renderer.print_typing(&frame.companion_name);
            drew = true;
        }
        self.typing = frame.typing;
        if frame.settings.is_some() && frame.settings != self.settings {
            if let Some(persona) = &frame.settings {
                renderer.print_settings(persona);
            }
            drew = true;
        }
        self.settings = frame.settings;
        for notice in &frame.notices {
            renderer.print_notice(notice);
            drew = true;
        }
        drew
    }

    fn showing_chat(&self) -> bool {
        self.view == Some(View::Chat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::conversation::Update;

    fn frame(view: View) -> Frame {
        Frame {
            view,
            email: Some("a@b.com".to_string()),
            companion_name: "Alex".to_string(),
            typing: false,
            settings: None,
            update: Update::default(),
            notices: Vec::new(),
        }
    }

    fn render(screen: &mut Screen, frame: Frame) -> String {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        screen.draw(frame, &mut renderer);
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn plain_messages_are_labelled() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        renderer.print_message("Alex", &ChatMessage::user("hi"));
        renderer.print_message("Alex", &ChatMessage::ai("hello"));
        renderer.print_message("Alex", &ChatMessage::ai_error("oops"));
        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out, "You: hi\nAlex: hello\nAlex: [error] oops\n");
    }

    #[test]
    fn color_wraps_labels() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), true);
        renderer.print_message("Alex", &ChatMessage::ai("hello"));
        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(out.starts_with(ANSI_GREEN));
        assert!(out.contains(ANSI_RESET));
    }

    #[test]
    fn screen_draws_view_once() {
        let mut screen = Screen::new();
        let out = render(&mut screen, frame(View::Login));
        assert!(out.contains("Log in"));
        let out = render(&mut screen, frame(View::Login));
        assert!(out.is_empty());
    }

    #[test]
    fn screen_draws_new_messages_and_typing() {
        let mut screen = Screen::new();
        render(&mut screen, frame(View::Chat));

        let mut next = frame(View::Chat);
        next.update.messages.push(ChatMessage::user("hi"));
        next.typing = true;
        let out = render(&mut screen, next);
        assert_eq!(out, "You: hi\nAlex is typing...\n");

        let mut next = frame(View::Chat);
        next.typing = true;
        assert!(render(&mut screen, next).is_empty());
    }

    #[test]
    fn screen_separates_replaced_history() {
        let mut screen = Screen::new();
        render(&mut screen, frame(View::Chat));
        let mut next = frame(View::Chat);
        next.update.reset = true;
        next.update.messages.push(ChatMessage::ai("welcome back"));
        let out = render(&mut screen, next);
        assert!(out.starts_with("----"));
        assert!(out.ends_with("Alex: welcome back\n"));
    }

    #[test]
    fn screen_draws_settings_and_notices() {
        let mut screen = Screen::new();
        let mut next = frame(View::Chat);
        next.settings = Some(Persona::default());
        next.notices.push(Notice::info("Persona saved!"));
        let out = render(&mut screen, next);
        assert!(out.contains("Persona settings"));
        assert!(out.contains("caring and supportive AI companion"));
        assert!(out.ends_with("* Persona saved!\n"));

        let mut next = frame(View::Chat);
        next.settings = Some(Persona::default());
        assert!(render(&mut screen, next).is_empty());
    }
}
