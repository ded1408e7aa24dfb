//! Route handlers.

use crate::AppState;
use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use deepsearch_protocol::{ChatRequest, ChatSummary, ChatTranscript};
use log::info;
use rocket::futures::StreamExt;
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::stream::{Event, EventStream};
use rocket::serde::json::Json;
use rocket::{State, catch, delete, get, post};
use serde_json::{Value, json};

#[get("/health")]
pub fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Run a chat turn and stream its events as server-sent events.
#[post("/api/chat", data = "<request>")]
pub fn chat(
    state: &State<AppState>,
    user: AuthenticatedUser,
    request: Json<ChatRequest>,
) -> Result<EventStream![], ApiError> {
    let request = request.into_inner();
    info!(
        "chat request (user_id={}, chat_id={}, messages={})",
        user.user_id,
        request.chat_id.as_deref().unwrap_or("new"),
        request.messages.len()
    );
    let run = state.service.run_stream(&user.user_id, request)?;
    let mut events = run.events;
    Ok(EventStream! {
        while let Some(event) = events.next().await {
            yield Event::json(&event);
        }
    })
}

#[get("/api/chats")]
pub fn list_chats(
    state: &State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<ChatSummary>>, ApiError> {
    Ok(Json(state.service.list_chats(&user.user_id)?))
}

#[get("/api/chats/<chat_id>")]
pub fn get_chat(
    state: &State<AppState>,
    user: AuthenticatedUser,
    chat_id: &str,
) -> Result<Json<ChatTranscript>, ApiError> {
    Ok(Json(state.service.get_chat(&user.user_id, chat_id)?))
}

#[delete("/api/chats/<chat_id>")]
pub fn delete_chat(
    state: &State<AppState>,
    user: AuthenticatedUser,
    chat_id: &str,
) -> Result<Json<Value>, ApiError> {
    state.service.delete_chat(&user.user_id, chat_id)?;
    Ok(Json(json!({ "deleted": true })))
}

/// Render every unhandled status as `{ "error": reason }`.
#[catch(default)]
pub fn json_catcher(status: Status, _request: &Request<'_>) -> (Status, Json<Value>) {
    let message = match status.code {
        401 => "unauthorized".to_string(),
        404 => "not found".to_string(),
        _ => status.reason_lossy().to_lowercase(),
    };
    (status, Json(json!({ "error": message })))
}
