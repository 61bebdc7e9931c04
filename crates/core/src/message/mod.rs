//! Message and MessageHandler
mod payload;
pub use payload::Envelope;
pub use payload::PayloadSender;

pub mod types;
pub use types::*;

pub mod handlers;
pub use handlers::HandleMsg;
pub use handlers::MessageHandler;
pub use handlers::MessageHandlerEvent;
