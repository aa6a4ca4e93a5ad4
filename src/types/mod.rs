// Public modules
pub mod api_message;
pub mod chat_reply;
pub mod chat_request;
pub mod credentials;
pub mod health;
pub mod history_entry;
pub mod login_response;
pub mod persona;
pub mod sender;

// Re-exports
pub use api_message::ApiMessage;
pub use chat_reply::ChatReply;
pub use chat_request::ChatRequest;
pub use credentials::Credentials;
pub use health::Health;
pub use history_entry::HistoryEntry;
pub use login_response::LoginResponse;
pub use persona::{Persona, PersonaField};
pub use sender::Sender;
