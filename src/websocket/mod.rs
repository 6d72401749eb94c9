//! WebSocket endpoint authenticated at handshake time.
//!
//! The handshake carries its credential as query parameters and is checked by
//! a named provider; the open connection then runs unauthenticated ping/pong.

pub mod handler;
pub mod messages;

pub use handler::ws_handler;
pub use messages::WsMessage;
