pub mod conversation;
pub mod settings;
pub mod user;
