//! Network transports carrying the game protocol

pub mod websocket;

pub use websocket::{game_routes, handle_socket};
