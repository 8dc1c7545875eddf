//! # King Says Bot
//!
//! A party-game bot: players gather in a session through Telegram or a web
//! page, and "king says" commands are sent to everyone with placeholders
//! replaced by the names of fairly drawn players.
//!
//! ## Features
//! - Sessions with one-session-per-player membership and automatic cleanup
//! - Gendered placeholder matching over configurable dictionaries
//! - Idle-weighted player draws so nobody sits out for long
//! - Suggested command queue and secret player numbers
//! - Web players with a bounded message backlog
//! - Persistent storage with SQLite

/// Bot command handlers and message delivery
pub mod bot;
/// Configuration management and environment variables
pub mod config;
/// Database models, connections, and the session store
pub mod database;
/// Placeholder matching, fair draws and broadcasting
pub mod game;
/// HTTP endpoints: health checks and the web player API
pub mod services;
/// Logging, markup and input validation helpers
pub mod utils;
