use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quest Hunt Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::admin::list_quests,
        crate::routes::admin::create_quest,
        crate::routes::admin::update_quest,
        crate::routes::admin::delete_quest,
        crate::routes::admin::reassign_orders,
        crate::routes::admin::list_teams,
        crate::routes::admin::delete_team,
        crate::routes::admin::start_game,
        crate::routes::admin::stop_game,
        crate::routes::admin::broadcast_notification,
        crate::routes::admin::send_notification,
        crate::routes::admin::clear_notification,
        crate::routes::team::join_game,
        crate::routes::team::rename_team,
        crate::routes::team::update_progress,
        crate::routes::team::respond_to_notification,
        crate::routes::session::claim_admin,
        crate::routes::session::resolve_session,
        crate::routes::sse::game_stream,
        crate::routes::sse::general_stream,
        crate::routes::sse::quests_stream,
        crate::routes::sse::team_stream,
        crate::routes::sse::team_notification_stream,
        crate::routes::sse::admin_notifications_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::admin::ActionResponse,
            crate::dto::admin::ReassignOrdersResponse,
            crate::dto::admin::CreateQuestResponse,
            crate::dto::quest::CreateQuestRequest,
            crate::dto::quest::UpdateQuestRequest,
            crate::dto::quest::QuestView,
            crate::dto::team::JoinGameRequest,
            crate::dto::team::JoinGameResponse,
            crate::dto::team::RenameTeamRequest,
            crate::dto::team::ProgressUpdateRequest,
            crate::dto::team::TeamView,
            crate::dto::game::GameStateView,
            crate::dto::notification::SendNotificationRequest,
            crate::dto::notification::BroadcastNotificationRequest,
            crate::dto::notification::BroadcastResponse,
            crate::dto::notification::NotificationAnswerRequest,
            crate::dto::notification::NotificationAnswerView,
            crate::dto::notification::NotificationView,
            crate::dto::session::AdminSessionResponse,
            crate::dto::session::SessionView,
            crate::dao::models::GameStatus,
            crate::dao::models::NotificationResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "admin", description = "Admin management endpoints"),
        (name = "team", description = "Team-facing endpoints"),
        (name = "session", description = "Session bookkeeping endpoints"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
