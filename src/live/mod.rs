// src/live/mod.rs

//! Real-time layer: presence and head-to-head quiz challenges over WebSocket.

pub mod hub;
pub mod protocol;
