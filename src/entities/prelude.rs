pub use super::conversations::Entity as Conversations;
pub use super::messages::Entity as Messages;
pub use super::settings::Entity as Settings;
pub use super::users::Entity as Users;
