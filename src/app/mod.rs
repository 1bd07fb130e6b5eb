pub mod auth;
pub mod categories;
pub mod engagement;
pub mod moderation;
pub mod posts;
pub mod users;
