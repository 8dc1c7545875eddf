use tracing::{debug, error, info, warn};

/// Logs command start with consistent format
pub fn log_command_start(command: &str, user: &str, user_id: i64, chat_id: i64, details: Option<&str>) {
    match details {
        Some(d) => info!(
            "CMD_START: {} by {}({}) in chat {} - {}",
            command, user, user_id, chat_id, d
        ),
        None => info!(
            "CMD_START: {} by {}({}) in chat {}",
            command, user, user_id, chat_id
        ),
    }
}

/// Logs command completion with consistent format
pub fn log_command_success(command: &str, user_id: i64, chat_id: i64, details: Option<&str>) {
    match details {
        Some(d) => info!("CMD_SUCCESS: {} by {} in chat {} - {}", command, user_id, chat_id, d),
        None => info!("CMD_SUCCESS: {} by {} in chat {}", command, user_id, chat_id),
    }
}

/// Logs command errors with consistent format
pub fn log_command_error(command: &str, user_id: i64, chat_id: i64, error: &str) {
    error!("CMD_ERROR: {} by {} in chat {} - {}", command, user_id, chat_id, error);
}

/// Logs validation errors with consistent format
pub fn log_validation_error(source: &str, field: &str, value: &str, error: &str) {
    warn!(
        "VALIDATION_ERROR: {} - {} field '{}' invalid: {}",
        source, field, value, error
    );
}

/// Logs database operations with consistent format
pub fn log_database_operation(operation: &str, table: &str, details: Option<&str>) {
    match details {
        Some(d) => debug!("DB_OP: {} on {} - {}", operation, table, d),
        None => debug!("DB_OP: {} on {}", operation, table),
    }
}

/// Logs session lifecycle changes (created, joined, left, deleted)
pub fn log_session_event(event: &str, session_id: i64, details: Option<&str>) {
    match details {
        Some(d) => info!("SESSION: {} {} - {}", event, session_id, d),
        None => info!("SESSION: {} {}", event, session_id),
    }
}

/// Logs failed best-effort deliveries
pub fn log_delivery_failure(target: &str, error: &str) {
    warn!("DELIVERY_FAILED: {} - {}", target, error);
}

/// Logs system events with consistent format
pub fn log_system_event(event: &str, details: Option<&str>) {
    match details {
        Some(d) => info!("SYSTEM: {} - {}", event, d),
        None => info!("SYSTEM: {}", event),
    }
}
