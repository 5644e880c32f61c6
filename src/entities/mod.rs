pub mod client;
pub mod element;
pub mod role;
pub mod store;
pub mod user;
pub mod user_role;
