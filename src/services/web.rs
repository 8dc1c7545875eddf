use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tracing::info;

use crate::database::models::MessagePoll;
use crate::database::GameStore;
use crate::utils::fatal::FatalSignal;
use crate::utils::logging::log_validation_error;
use crate::utils::validation::{parse_web_gender_code, validate_player_name, validate_session_token};

/// How often a fresh random token is tried before giving up.
const TOKEN_ATTEMPTS: usize = 5;

type WebResult<T> = Result<T, (StatusCode, String)>;

#[derive(Debug, Deserialize)]
pub struct JoinForm {
    #[serde(rename = "gameId", default)]
    pub game_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub gender: String,
}

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    pub token: i64,
    #[serde(default)]
    pub since: i64,
}

#[derive(Debug, Deserialize)]
pub struct LeaveForm {
    pub token: i64,
}

#[derive(Clone)]
pub struct WebState {
    pub store: GameStore,
    pub fatal: FatalSignal,
}

impl WebState {
    /// Storage faults are unrecoverable: escalate, then answer 500.
    fn internal(&self, e: sqlx::Error) -> (StatusCode, String) {
        self.fatal.raise("web", &e.to_string());
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error, try again later".to_string())
    }
}

/// Join, poll and leave endpoints for players without Telegram.
pub struct WebService {
    pub router: Router,
}

impl WebService {
    pub fn new(store: GameStore, fatal: FatalSignal) -> Self {
        let router = Router::new()
            .route("/join", post(join_game))
            .route("/messages", get(poll_messages))
            .route("/leave", post(leave_game))
            .with_state(WebState { store, fatal });

        Self { router }
    }
}

fn bad_request(message: impl Into<String>) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, message.into())
}

async fn join_game(State(state): State<WebState>, Form(form): Form<JoinForm>) -> WebResult<String> {
    let game_id = validate_session_token(&form.game_id)
        .map_err(|_| bad_request("Incorrect game id, reload the page and try again"))?;

    let session_id = state
        .store
        .session_id_from_token(&game_id)
        .await
        .map_err(|e| state.internal(e))?
        .ok_or_else(|| bad_request("Game not found. Did the host delete it?"))?;

    let name = validate_player_name(&form.name).map_err(|e| {
        log_validation_error("web", "name", &form.name, &e.to_string());
        bad_request(e.to_string())
    })?;

    let gender = parse_web_gender_code(&form.gender).map_err(|e| {
        log_validation_error("web", "gender", &form.gender, &e.to_string());
        bad_request(e.to_string())
    })?;

    for _ in 0..TOKEN_ATTEMPTS {
        let token = rand::random::<i64>() & i64::MAX;
        if state
            .store
            .add_web_participant(session_id, token, &name, gender)
            .await
            .map_err(|e| state.internal(e))?
        {
            info!("Web player joined session {}", session_id);
            return Ok(token.to_string());
        }
        if !state.store.session_exists(session_id).await.map_err(|e| state.internal(e))? {
            return Err(bad_request("Game not found. Did the host delete it?"));
        }
    }

    Err(bad_request("Can't add new user, try again"))
}

async fn poll_messages(State(state): State<WebState>, Query(query): Query<PollQuery>) -> WebResult<Json<MessagePoll>> {
    let user_id = state
        .store
        .web_user_id(query.token)
        .await
        .map_err(|e| state.internal(e))?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Unknown player, join the game again".to_string()))?;

    let poll = state
        .store
        .poll_new_messages(user_id, query.since)
        .await
        .map_err(|e| state.internal(e))?;
    Ok(Json(poll))
}

async fn leave_game(State(state): State<WebState>, Form(form): Form<LeaveForm>) -> WebResult<StatusCode> {
    if state.store.remove_web_participant(form.token).await.map_err(|e| state.internal(e))? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Unknown player".to_string()))
    }
}
