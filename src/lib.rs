pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod mail;
pub mod response;
pub mod state;
pub mod store;
pub mod tutorials;
pub mod users;
