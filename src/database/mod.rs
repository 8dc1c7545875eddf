pub mod connection;
pub mod models;
pub mod store;
mod users;
mod web;

pub use store::GameStore;
