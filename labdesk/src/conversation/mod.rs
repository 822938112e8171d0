//! Conversation thread attached 1:1 to each lab request.
//!
//! Messages are appended, never edited or removed. Read and delivery marks
//! are per user and per message; every change is announced to the request's
//! real-time room.

pub mod service;
pub mod types;

pub use service::{ConversationService, MESSAGES_DELIVERED, MESSAGES_READ, MESSAGE_ADDED};
pub use types::{Conversation, Message, MessageMark};
