pub mod analytics;
pub mod auth;
pub mod clients;
pub mod elements;
pub mod health;
pub mod notifications;
pub mod roles;
pub mod stores;
pub mod users;
