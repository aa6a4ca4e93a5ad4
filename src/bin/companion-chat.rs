//! Interactive terminal client for the companion chat service.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a local backend
//! companion-chat
//!
//! # Talk to another backend
//! companion-chat --api-url https://companion.example.com
//!
//! # Read settings from a file and log requests to stderr
//! companion-chat --config companion.yaml --verbose
//!
//! # Disable colors (useful for piping output)
//! companion-chat --no-color
//! ```
//!
//! # Commands
//!
//! - `/login <email>` / `/register <email>` - Authenticate
//! - `/settings`, `/name`, `/relationship`, `/personality`, `/save` - Edit the persona
//! - `/logout` - Forget the stored session
//! - `/help` - Show available commands
//! - `/quit` - Exit the application
//!
//! Ctrl+C while a reply is pending abandons it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use companion::chat::{
    ChatArgs, ChatCommand, ClientConfig, Controller, Outcome, PlainTextRenderer, Renderer, Screen,
    View, help_text, parse_command,
};
use companion::{FileCredentialStore, HttpTransport, PersonaField};

type ChatController = Controller<HttpTransport, FileCredentialStore>;

/// How often the screen is refreshed while a call is pending.
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

enum Flow {
    Continue,
    Quit,
}

/// Main entry point for the companion-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("companion-chat [OPTIONS]");
    let config = ClientConfig::load(args)?;
    init_tracing(config.verbose);

    let controller = Arc::new(Controller::new(config.client()?, config.credential_store()?));
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut screen = Screen::new();
    let mut rl = DefaultEditor::new()?;

    // Ctrl+C abandons whatever is in flight; the prompt handles its own.
    let interrupt = Arc::clone(&controller);
    ctrlc::set_handler(move || interrupt.cancel_pending())?;

    println!("Companion Chat");
    println!("Type /help for commands, /quit to exit\n");

    while_drawing(&controller, &mut screen, &mut renderer, controller.start()).await;
    draw(&controller, &mut screen, &mut renderer);

    loop {
        let prompt = match controller.view() {
            View::Chat => "You: ",
            View::Login => "login> ",
            View::Register => "register> ",
        };

        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                if let Some(cmd) = parse_command(line) {
                    // Keep passwords out of the history by only recording commands here.
                    let _ = rl.add_history_entry(line);
                    let flow = handle_command(
                        cmd,
                        &controller,
                        &mut screen,
                        &mut renderer,
                        &mut rl,
                    )
                    .await;
                    draw(&controller, &mut screen, &mut renderer);
                    if let Flow::Quit = flow {
                        println!("Goodbye!");
                        break;
                    }
                    continue;
                }

                if controller.view() != View::Chat {
                    renderer.print_info("Log in first: /login <email> or /register <email>");
                    continue;
                }
                let _ = rl.add_history_entry(line);
                let result = while_drawing(
                    &controller,
                    &mut screen,
                    &mut renderer,
                    controller.send_message(line),
                )
                .await;
                if let Ok(Outcome::Aborted) = result {
                    if controller.is_authenticated() {
                        renderer.print_info("Reply abandoned.");
                    }
                }
                draw(&controller, &mut screen, &mut renderer);
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

async fn handle_command(
    cmd: ChatCommand,
    controller: &Arc<ChatController>,
    screen: &mut Screen,
    renderer: &mut PlainTextRenderer,
    rl: &mut DefaultEditor,
) -> Flow {
    match cmd {
        ChatCommand::Quit => return Flow::Quit,
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {}", line);
            }
        }
        ChatCommand::Login(email) => {
            if let Some(current) = controller.email() {
                renderer.print_info(&format!("Already logged in as {current}. /logout first."));
                return Flow::Continue;
            }
            let Some(password) = read_password(rl, renderer) else {
                return Flow::Continue;
            };
            let login = controller.login(&email, &password);
            let _ = while_drawing(controller, screen, renderer, login).await;
        }
        ChatCommand::Register(email) => {
            if controller.is_authenticated() {
                renderer.print_info("Log out before registering another account.");
                return Flow::Continue;
            }
            let Some(password) = read_password(rl, renderer) else {
                return Flow::Continue;
            };
            let register = controller.register(&email, &password);
            let _ = while_drawing(controller, screen, renderer, register).await;
        }
        ChatCommand::Switch => {
            if controller.toggle_auth_view() == View::Chat {
                renderer.print_info("Already logged in.");
            }
        }
        ChatCommand::Logout => {
            if controller.is_authenticated() {
                controller.logout();
                renderer.print_info("Logged out.");
            } else {
                renderer.print_info("Not logged in.");
            }
        }
        ChatCommand::History => {
            if require_chat(controller, renderer) {
                let load = controller.load_chat_history();
                let _ = while_drawing(controller, screen, renderer, load).await;
            }
        }
        ChatCommand::Persona => {
            if require_chat(controller, renderer) {
                let load = controller.load_persona();
                if let Ok(Outcome::Completed) = while_drawing(controller, screen, renderer, load).await
                {
                    let persona = controller.persona_draft();
                    for field in PersonaField::ALL {
                        renderer.print_info(&format!("  {field}: {}", persona.get(field)));
                    }
                }
            }
        }
        ChatCommand::Settings => {
            if require_chat(controller, renderer) {
                let open = controller.open_settings();
                let _ = while_drawing(controller, screen, renderer, open).await;
            }
        }
        ChatCommand::Edit(field, value) => {
            if let Err(err) = controller.edit_draft(field, &value) {
                renderer.print_error(&err.to_string());
            }
        }
        ChatCommand::Save => {
            if !controller.settings_open() {
                renderer.print_info("Nothing to save; open /settings first.");
            } else {
                let save = controller.save_draft();
                let _ = while_drawing(controller, screen, renderer, save).await;
            }
        }
        ChatCommand::Cancel => {
            if controller.settings_open() {
                controller.close_settings();
                renderer.print_info("Settings closed without saving.");
            }
        }
        ChatCommand::WhoAmI => match controller.email() {
            Some(email) => renderer.print_info(&format!(
                "Logged in as {email}, chatting with {}.",
                controller.companion_name()
            )),
            None => renderer.print_info("Not logged in."),
        },
        ChatCommand::Health => {
            let health = controller.health();
            match while_drawing(controller, screen, renderer, health).await {
                Ok(health) => renderer.print_info(&format!(
                    "Backend: {} (AI {})",
                    health.status,
                    if health.is_ready() { "ready" } else { "not ready" }
                )),
                Err(err) => renderer.print_error(&format!("Backend unreachable: {err}")),
            }
        }
        ChatCommand::Invalid(message) => {
            renderer.print_error(&message);
        }
    }
    Flow::Continue
}

fn require_chat(controller: &ChatController, renderer: &mut dyn Renderer) -> bool {
    if controller.view() == View::Chat {
        true
    } else {
        renderer.print_info("Log in first: /login <email>");
        false
    }
}

fn read_password(rl: &mut DefaultEditor, renderer: &mut dyn Renderer) -> Option<String> {
    match rl.readline("Password: ") {
        Ok(password) if !password.is_empty() => Some(password),
        Ok(_) => {
            renderer.print_error("A password is required.");
            None
        }
        Err(_) => None,
    }
}

/// Drives `fut` to completion, redrawing the screen while it is pending.
async fn while_drawing<F: Future>(
    controller: &ChatController,
    screen: &mut Screen,
    renderer: &mut dyn Renderer,
    fut: F,
) -> F::Output {
    tokio::pin!(fut);
    let mut ticker = tokio::time::interval(FRAME_INTERVAL);
    loop {
        tokio::select! {
            output = &mut fut => return output,
            _ = ticker.tick() => draw(controller, screen, renderer),
        }
    }
}

fn draw(controller: &ChatController, screen: &mut Screen, renderer: &mut dyn Renderer) {
    let frame = controller.next_frame(screen.cursor());
    screen.draw(frame, renderer);
}

fn init_tracing(verbose: bool) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if verbose => EnvFilter::new("companion=debug"),
        Err(_) => return,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
