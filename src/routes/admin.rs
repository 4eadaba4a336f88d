use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
};

use crate::{
    dto::{
        admin::{ActionResponse, CreateQuestResponse, ReassignOrdersResponse},
        game::GameStateView,
        notification::{BroadcastNotificationRequest, BroadcastResponse, SendNotificationRequest},
        quest::{CreateQuestRequest, QuestView, UpdateQuestRequest},
        team::TeamView,
    },
    error::AppError,
    services::{game_service, notification_service, order_service, quest_service, team_service},
    state::SharedState,
};

/// Header carrying the opaque session token issued at join or admin claim.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// Admin-only management endpoints for quests, teams, the game clock, and
/// notifications.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/quests", get(list_quests).post(create_quest))
        .route(
            "/admin/quests/{id}",
            put(update_quest).delete(delete_quest),
        )
        .route("/admin/orders/reassign", post(reassign_orders))
        .route("/admin/teams", get(list_teams))
        .route("/admin/teams/{id}", delete(delete_team))
        .route("/admin/game/start", post(start_game))
        .route("/admin/game/stop", post(stop_game))
        .route(
            "/admin/notifications/broadcast",
            post(broadcast_notification),
        )
        .route("/admin/notifications/{team_id}", post(send_notification))
        .route(
            "/admin/notifications/{team_id}/clear",
            post(clear_notification),
        )
        .route_layer(middleware::from_fn_with_state(state, require_admin_session))
}

/// Retrieve every configured quest, including answers.
#[utoipa::path(
    get,
    path = "/admin/quests",
    tag = "admin",
    params(("X-Session-Token" = String, Header, description = "Admin session token")),
    responses((status = 200, description = "List configured quests", body = [QuestView]))
)]
pub async fn list_quests(
    State(state): State<SharedState>,
) -> Result<Json<Vec<QuestView>>, AppError> {
    Ok(Json(quest_service::list_quests(&state).await?))
}

/// Create a quest and reassign every team's order.
#[utoipa::path(
    post,
    path = "/admin/quests",
    tag = "admin",
    params(("X-Session-Token" = String, Header, description = "Admin session token")),
    request_body = CreateQuestRequest,
    responses((status = 201, description = "Quest created", body = CreateQuestResponse))
)]
pub async fn create_quest(
    State(state): State<SharedState>,
    Json(payload): Json<CreateQuestRequest>,
) -> Result<(StatusCode, Json<CreateQuestResponse>), AppError> {
    let (id, outcome) = quest_service::create_quest(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateQuestResponse {
            id,
            teams_updated: outcome.teams_updated,
            budget_exhausted: outcome.budget_exhausted,
        }),
    ))
}

/// Merge new content into an existing quest.
#[utoipa::path(
    put,
    path = "/admin/quests/{id}",
    tag = "admin",
    params(("X-Session-Token" = String, Header, description = "Admin session token"),
    ("id" = String, Path, description = "Identifier of the quest to update")),
    request_body = UpdateQuestRequest,
    responses((status = 200, description = "Quest updated", body = ActionResponse))
)]
pub async fn update_quest(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateQuestRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    quest_service::update_quest(&state, &id, payload).await?;
    Ok(Json(ActionResponse::new("quest updated")))
}

/// Delete a quest and reassign every team's order.
#[utoipa::path(
    delete,
    path = "/admin/quests/{id}",
    tag = "admin",
    params(("X-Session-Token" = String, Header, description = "Admin session token"),
    ("id" = String, Path, description = "Identifier of the quest to delete")),
    responses((status = 200, description = "Quest deleted", body = ReassignOrdersResponse))
)]
pub async fn delete_quest(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ReassignOrdersResponse>, AppError> {
    let outcome = quest_service::delete_quest(&state, &id).await?;
    Ok(Json(ReassignOrdersResponse {
        teams_updated: outcome.teams_updated,
        budget_exhausted: outcome.budget_exhausted,
    }))
}

/// Recompute a fresh unique order for every team.
#[utoipa::path(
    post,
    path = "/admin/orders/reassign",
    tag = "admin",
    params(("X-Session-Token" = String, Header, description = "Admin session token")),
    responses((status = 200, description = "Orders reassigned", body = ReassignOrdersResponse))
)]
pub async fn reassign_orders(
    State(state): State<SharedState>,
) -> Result<Json<ReassignOrdersResponse>, AppError> {
    let outcome = order_service::reassign_all_orders(&state).await?;
    Ok(Json(ReassignOrdersResponse {
        teams_updated: outcome.teams_updated,
        budget_exhausted: outcome.budget_exhausted,
    }))
}

/// Retrieve the full team roster.
#[utoipa::path(
    get,
    path = "/admin/teams",
    tag = "admin",
    params(("X-Session-Token" = String, Header, description = "Admin session token")),
    responses((status = 200, description = "List teams", body = [TeamView]))
)]
pub async fn list_teams(State(state): State<SharedState>) -> Result<Json<Vec<TeamView>>, AppError> {
    Ok(Json(team_service::list_teams(&state).await?))
}

/// Delete a team and invalidate its sessions.
#[utoipa::path(
    delete,
    path = "/admin/teams/{id}",
    tag = "admin",
    params(("X-Session-Token" = String, Header, description = "Admin session token"),
    ("id" = String, Path, description = "Identifier of the team to delete")),
    responses((status = 204, description = "Team deleted"))
)]
pub async fn delete_team(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    team_service::delete_team(&state, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Start the shared game clock.
#[utoipa::path(
    post,
    path = "/admin/game/start",
    tag = "admin",
    params(("X-Session-Token" = String, Header, description = "Admin session token")),
    responses((status = 200, description = "Game started", body = GameStateView))
)]
pub async fn start_game(State(state): State<SharedState>) -> Result<Json<GameStateView>, AppError> {
    Ok(Json(game_service::start_game(&state).await?))
}

/// Stop the shared game clock.
#[utoipa::path(
    post,
    path = "/admin/game/stop",
    tag = "admin",
    params(("X-Session-Token" = String, Header, description = "Admin session token")),
    responses((status = 200, description = "Game stopped", body = GameStateView))
)]
pub async fn stop_game(State(state): State<SharedState>) -> Result<Json<GameStateView>, AppError> {
    Ok(Json(game_service::stop_game(&state).await?))
}

/// Send the same notification to every team.
#[utoipa::path(
    post,
    path = "/admin/notifications/broadcast",
    tag = "admin",
    params(("X-Session-Token" = String, Header, description = "Admin session token")),
    request_body = BroadcastNotificationRequest,
    responses((status = 200, description = "Notification broadcast", body = BroadcastResponse))
)]
pub async fn broadcast_notification(
    State(state): State<SharedState>,
    Json(payload): Json<BroadcastNotificationRequest>,
) -> Result<Json<BroadcastResponse>, AppError> {
    let teams_notified = notification_service::broadcast(&state, &payload.message).await?;
    Ok(Json(BroadcastResponse { teams_notified }))
}

/// Send a notification to one team.
#[utoipa::path(
    post,
    path = "/admin/notifications/{team_id}",
    tag = "admin",
    params(("X-Session-Token" = String, Header, description = "Admin session token"),
    ("team_id" = String, Path, description = "Identifier of the target team")),
    request_body = SendNotificationRequest,
    responses((status = 200, description = "Notification sent", body = ActionResponse))
)]
pub async fn send_notification(
    State(state): State<SharedState>,
    Path(team_id): Path<String>,
    Json(payload): Json<SendNotificationRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    notification_service::send_to_team(&state, &team_id, &payload.message).await?;
    Ok(Json(ActionResponse::new("notification sent")))
}

/// Deactivate a team's notification.
#[utoipa::path(
    post,
    path = "/admin/notifications/{team_id}/clear",
    tag = "admin",
    params(("X-Session-Token" = String, Header, description = "Admin session token"),
    ("team_id" = String, Path, description = "Identifier of the target team")),
    responses((status = 200, description = "Notification cleared", body = ActionResponse))
)]
pub async fn clear_notification(
    State(state): State<SharedState>,
    Path(team_id): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    notification_service::clear(&state, &team_id).await?;
    Ok(Json(ActionResponse::new("notification cleared")))
}

/// Gate a request on a session holding the admin flag.
pub async fn require_admin_session(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(SESSION_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing session token header `X-Session-Token`".into())
        })?;

    if state.sessions().is_admin(&provided) {
        Ok(next.run(req).await)
    } else {
        Err(AppError::Unauthorized(
            "session does not carry the admin flag".into(),
        ))
    }
}
