pub mod prelude;

pub mod conversations;
pub mod messages;
pub mod settings;
pub mod users;
