use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
};

use crate::{
    dto::{
        admin::ActionResponse,
        notification::NotificationAnswerRequest,
        team::{JoinGameRequest, JoinGameResponse, ProgressUpdateRequest, RenameTeamRequest, TeamView},
    },
    error::AppError,
    services::{notification_service, session_service, team_service},
    state::SharedState,
};

/// Team-facing endpoints: joining the hunt and tracking progress.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/teams", post(join_game))
        .route("/teams/{id}/name", put(rename_team))
        .route("/teams/{id}/progress", put(update_progress))
        .route(
            "/teams/{id}/notification/response",
            post(respond_to_notification),
        )
}

/// Join the hunt: create a team with a fresh unique order and open a session.
#[utoipa::path(
    post,
    path = "/teams",
    tag = "team",
    request_body = JoinGameRequest,
    responses(
        (status = 201, description = "Team created", body = JoinGameResponse),
        (status = 400, description = "Invalid team name")
    )
)]
pub async fn join_game(
    State(state): State<SharedState>,
    Json(payload): Json<JoinGameRequest>,
) -> Result<(StatusCode, Json<JoinGameResponse>), AppError> {
    let (team_id, order) = team_service::create_team(&state, &payload.name).await?;
    let session_token = session_service::open_team_session(&state, &team_id);
    Ok((
        StatusCode::CREATED,
        Json(JoinGameResponse {
            team_id,
            session_token,
            order,
        }),
    ))
}

/// Rename a team.
#[utoipa::path(
    put,
    path = "/teams/{id}/name",
    tag = "team",
    params(("id" = String, Path, description = "Identifier of the team")),
    request_body = RenameTeamRequest,
    responses((status = 200, description = "Team renamed", body = ActionResponse))
)]
pub async fn rename_team(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<RenameTeamRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    team_service::rename_team(&state, &id, &payload.name).await?;
    Ok(Json(ActionResponse::new("team renamed")))
}

/// Move a team's progress cursor, marking completion when the cursor reaches
/// the end of its order.
#[utoipa::path(
    put,
    path = "/teams/{id}/progress",
    tag = "team",
    params(("id" = String, Path, description = "Identifier of the team")),
    request_body = ProgressUpdateRequest,
    responses((status = 200, description = "Progress recorded", body = TeamView))
)]
pub async fn update_progress(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<ProgressUpdateRequest>,
) -> Result<Json<TeamView>, AppError> {
    let team = team_service::update_progress(&state, &id, payload.current_quest_index).await?;
    Ok(Json(team))
}

/// Record a team's answer to its active notification.
#[utoipa::path(
    post,
    path = "/teams/{id}/notification/response",
    tag = "team",
    params(("id" = String, Path, description = "Identifier of the team")),
    request_body = NotificationAnswerRequest,
    responses((status = 200, description = "Answer recorded", body = ActionResponse))
)]
pub async fn respond_to_notification(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<NotificationAnswerRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    notification_service::respond(&state, &id, &payload.answer).await?;
    Ok(Json(ActionResponse::new("answer recorded")))
}
