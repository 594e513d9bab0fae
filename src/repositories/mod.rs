pub mod memory_store;
pub mod message_repo;
pub mod order_repo;
pub mod user_repo;

pub use memory_store::*;
pub use message_repo::*;
pub use order_repo::*;
pub use user_repo::*;
