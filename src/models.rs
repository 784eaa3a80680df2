pub mod messages;
pub mod profiles;
pub mod users;
