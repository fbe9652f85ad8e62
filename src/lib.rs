pub mod app;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod layout;
pub mod roadmap;
pub mod server;
pub mod util;
