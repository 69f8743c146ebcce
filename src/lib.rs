pub mod accounts;
pub mod app;
pub mod auth;
pub mod config;
pub mod constants;
pub mod context;
pub mod errors;
pub mod http;
pub mod logging;
pub mod managers;
pub mod mcp;
pub mod services;
pub mod stores;
pub mod utils;
