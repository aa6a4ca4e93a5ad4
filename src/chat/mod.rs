//! The interactive companion chat.
//!
//! This module provides everything a front end needs on top of the
//! [`Companion`](crate::Companion) client:
//!
//! - An explicit session lifecycle with single-flight chat sends and
//!   cancellation of in-flight calls
//! - An in-memory conversation model, separate from how it is drawn
//! - ANSI-styled plain text rendering
//! - Slash commands for session control
//!
//! # Architecture
//!
//! - [`controller`]: session lifecycle, authorized calls and the model
//! - [`conversation`]: the ordered messages and the typing indicator
//! - [`render`]: renderers and the frame-diffing [`Screen`]
//! - [`commands`]: slash command parsing
//! - [`config`]: CLI arguments and configuration

pub mod commands;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod render;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ClientConfig, FileConfig};
pub use controller::{Controller, Frame, Notice, NoticeLevel, Outcome, View};
pub use conversation::{ChatMessage, Conversation, Cursor, Update};
pub use render::{PlainTextRenderer, Renderer, Screen};
