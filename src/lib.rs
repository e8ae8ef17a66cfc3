//! Skyscraper Core - Tower Entity Framework and Run Loop

pub mod app;
pub mod core;
pub mod items;
pub mod tower;
