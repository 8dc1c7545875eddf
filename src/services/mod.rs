/// Liveness and readiness endpoints
pub mod health;
/// HTTP API for web players
pub mod web;
