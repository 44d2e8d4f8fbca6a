//! Web UI module

pub mod handlers;
pub mod server;
pub mod websocket;

pub use server::{AppState, WebStreamServer};
pub use websocket::WsSubscriber;
