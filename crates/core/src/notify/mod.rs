//! Notification dispatchers.
//!
//! A `Dispatcher` delivers a `Notification` over one channel: the Telegram
//! Bot API for chat messages or SMTP for the application email.

mod email;
mod message;
mod telegram;
mod types;

pub use email::EmailDispatcher;
pub use message::{application_email, new_lot_message};
pub use telegram::TelegramDispatcher;
pub use types::*;
