pub mod config;
pub mod error;
pub mod message;
pub mod paths;

pub use config::Config;
pub use error::{Error, Result};
pub use message::{ConversationMessage, MessageMeta};
pub use paths::Paths;
