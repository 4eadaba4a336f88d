use axum::{
    Json, Router,
    extract::{Query, State},
    http::HeaderMap,
    routing::{get, post},
};

use crate::{
    dto::session::{AdminSessionResponse, SessionQuery, SessionView},
    error::AppError,
    routes::admin::SESSION_TOKEN_HEADER,
    services::session_service,
    state::SharedState,
};

/// Session endpoints: claiming the admin flag and resolving a stored token.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/session/admin", post(claim_admin))
        .route("/session", get(resolve_session))
}

/// Open a session carrying the admin flag.
#[utoipa::path(
    post,
    path = "/session/admin",
    tag = "session",
    responses((status = 200, description = "Admin session opened", body = AdminSessionResponse))
)]
pub async fn claim_admin(State(state): State<SharedState>) -> Json<AdminSessionResponse> {
    let session_token = session_service::open_admin_session(&state);
    Json(AdminSessionResponse { session_token })
}

/// Resolve the caller's session token, optionally against a deep-linked team.
///
/// A deep link naming a team the session never joined invalidates the
/// session; the client is expected to forget its token on 404.
#[utoipa::path(
    get,
    path = "/session",
    tag = "session",
    params(SessionQuery,
    ("X-Session-Token" = String, Header, description = "Session token to resolve")),
    responses(
        (status = 200, description = "Session binding", body = SessionView),
        (status = 404, description = "Unknown or invalidated session")
    )
)]
pub async fn resolve_session(
    State(state): State<SharedState>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
) -> Result<Json<SessionView>, AppError> {
    let token = headers
        .get(SESSION_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing session token header `X-Session-Token`".into())
        })?;

    let view = session_service::resolve(&state, token, query.team.as_deref()).await?;
    Ok(Json(view))
}
