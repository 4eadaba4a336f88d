use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    middleware,
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    routes::admin::require_admin_session,
    services::{game_service, notification_service, quest_service, sse_service, team_service},
    state::SharedState,
};

/// Configure the SSE endpoints.
pub fn router(state: SharedState) -> Router<SharedState> {
    let admin_stream = Router::new()
        .route("/sse/admin/notifications", get(admin_notifications_stream))
        .route_layer(middleware::from_fn_with_state(state, require_admin_session));

    Router::new()
        .route("/sse/game", get(game_stream))
        .route("/sse/general", get(general_stream))
        .route("/sse/quests", get(quests_stream))
        .route("/sse/teams/{id}", get(team_stream))
        .route("/sse/teams/{id}/notification", get(team_notification_stream))
        .merge(admin_stream)
}

/// Stream the shared game clock as `gameState` events.
#[utoipa::path(
    get,
    path = "/sse/game",
    tag = "sse",
    responses((status = 200, description = "Game clock stream", content_type = "text/event-stream", body = String))
)]
pub async fn game_stream(
    State(state): State<SharedState>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let events = game_service::watch_game_state(&state).await?;
    info!("new game clock SSE connection");
    Ok(sse_service::to_sse_stream(
        events,
        state.config().sse_buffer(),
        "game",
    ))
}

/// Stream the general settings singleton as `general` events.
#[utoipa::path(
    get,
    path = "/sse/general",
    tag = "sse",
    responses((status = 200, description = "General settings stream", content_type = "text/event-stream", body = String))
)]
pub async fn general_stream(
    State(state): State<SharedState>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let events = game_service::watch_general_settings(&state).await?;
    info!("new general settings SSE connection");
    Ok(sse_service::to_sse_stream(
        events,
        state.config().sse_buffer(),
        "general",
    ))
}

/// Stream quest snapshots as `quests` events.
#[utoipa::path(
    get,
    path = "/sse/quests",
    tag = "sse",
    responses((status = 200, description = "Quest set stream", content_type = "text/event-stream", body = String))
)]
pub async fn quests_stream(
    State(state): State<SharedState>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let events = quest_service::watch_quests(&state).await?;
    info!("new quest SSE connection");
    Ok(sse_service::to_sse_stream(
        events,
        state.config().sse_buffer(),
        "quests",
    ))
}

/// Stream one team's document as `team` events, with `team_missing` and
/// `team_deleted` sentinels.
#[utoipa::path(
    get,
    path = "/sse/teams/{id}",
    tag = "sse",
    params(("id" = String, Path, description = "Identifier of the team to follow")),
    responses((status = 200, description = "Team document stream", content_type = "text/event-stream", body = String))
)]
pub async fn team_stream(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let events = team_service::watch_team(&state, &id).await?;
    info!(team = %id, "new team SSE connection");
    Ok(sse_service::to_sse_stream(
        events,
        state.config().sse_buffer(),
        "team",
    ))
}

/// Stream one team's active notification as `notification` events, `null`
/// while there is none.
#[utoipa::path(
    get,
    path = "/sse/teams/{id}/notification",
    tag = "sse",
    params(("id" = String, Path, description = "Identifier of the team to follow")),
    responses((status = 200, description = "Team notification stream", content_type = "text/event-stream", body = String))
)]
pub async fn team_notification_stream(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let events = notification_service::watch_team_notification(&state, &id).await?;
    info!(team = %id, "new notification SSE connection");
    Ok(sse_service::to_sse_stream(
        events,
        state.config().sse_buffer(),
        "notification",
    ))
}

/// Stream every team's active notifications as `notifications` events.
#[utoipa::path(
    get,
    path = "/sse/admin/notifications",
    tag = "sse",
    params(("X-Session-Token" = String, Header, description = "Admin session token")),
    responses((status = 200, description = "All active notifications stream", content_type = "text/event-stream", body = String))
)]
pub async fn admin_notifications_stream(
    State(state): State<SharedState>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let events = notification_service::watch_all_notifications(&state).await?;
    info!("new admin notifications SSE connection");
    Ok(sse_service::to_sse_stream(
        events,
        state.config().sse_buffer(),
        "admin_notifications",
    ))
}
