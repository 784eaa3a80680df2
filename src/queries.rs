pub mod messages;
pub mod pagination;
pub mod profiles;
pub mod users;
