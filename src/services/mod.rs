pub mod chat;
pub use chat::{ChatError, ChatService, Exchange};

pub mod chat_store;
pub use chat_store::{ChatStore, StoreError};

pub mod chat_store_impl;
pub use chat_store_impl::SeaOrmChatStore;
