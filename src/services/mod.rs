pub mod conversation_service;
pub mod messaging_service;
pub mod unread_tracker;

pub use conversation_service::ConversationService;
pub use messaging_service::MessagingService;
pub use unread_tracker::UnreadTracker;
