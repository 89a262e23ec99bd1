pub mod auth;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod server;

pub use server::{build_router, serve, ServerConfig};
