pub mod catalog;
pub mod middleware;
pub mod protocol;
pub mod server;
