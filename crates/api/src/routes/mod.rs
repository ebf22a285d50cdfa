use axum::extract::{Path, Query, State};
use axum::{
    Json, Router,
    http::{StatusCode, header::CONTENT_TYPE},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use forum_domain::{
    activity::ActiveThreadsQuery,
    comments::CommentCreate,
    content::ContentItem,
    ports::db::StoreHealth,
    subscriptions::{SOURCE_TYPE_THREAD, Subscription},
    threads::ThreadCreate,
    users::{User, UserUpdate},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use validator::Validate;

use crate::error::{ApiError, map_domain_error};
use crate::{middleware as app_middleware, observability, state::AppState, validation};

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/users", post(create_user))
        .route("/users/:user_id", get(get_user).put(update_user))
        .route("/users/:user_id/active_threads", get(active_threads))
        .route("/users/:user_id/social_stats", get(social_stats))
        .route("/users/:user_id/subscriptions", post(subscribe))
        .route(
            "/:commentable_id/threads",
            get(list_threads)
                .post(create_thread)
                .delete(delete_threads),
        )
        .route("/threads/:thread_id/comments", post(create_comment));

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .nest("/api/v1", api)
        .route_layer(middleware::from_fn(app_middleware::metrics_layer))
        .layer(app_middleware::timeout_layer(
            state.config.request_timeout_ms,
        ))
        .layer(app_middleware::trace_layer())
        .layer(app_middleware::set_request_id_layer())
        .layer(app_middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(
            app_middleware::correlation_id_middleware,
        ))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    environment: String,
    store: StoreStatus,
}

#[derive(Serialize)]
#[serde(untagged)]
enum StoreStatus {
    Up(StoreHealth),
    Down { backend: &'static str, error: String },
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status_code, status, store) = match state.store_probe.probe().await {
        Ok(health) => (StatusCode::OK, "ok", StoreStatus::Up(health)),
        Err(err) => {
            tracing::warn!(error = %err, "document store probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "degraded",
                StoreStatus::Down {
                    backend: state.store_probe.backend(),
                    error: err.to_string(),
                },
            )
        }
    };
    (
        status_code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            environment: state.config.app_env.clone(),
            store,
        }),
    )
}

async fn metrics() -> Result<Response, ApiError> {
    let body = observability::render_metrics().ok_or(ApiError::NotFound)?;
    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

#[derive(Serialize)]
struct UserResponse {
    id: String,
    username: Option<String>,
    default_sort_key: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.external_id,
            username: user.username,
            default_sort_key: user.default_sort_key,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
struct CreateUserRequest {
    #[validate(length(min = 1, max = 255))]
    id: String,
    #[validate(length(min = 1, max = 255))]
    username: Option<String>,
}

async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validation::validate(&payload)?;
    let user = state
        .users
        .create(&payload.id, payload.username)
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.get(&user_id).await.map_err(map_domain_error)?;
    Ok(Json(user.into()))
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255))]
    username: Option<String>,
    default_sort_key: Option<String>,
}

async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    validation::validate(&payload)?;
    let user = state
        .users
        .upsert(
            &user_id,
            UserUpdate {
                username: payload.username,
                default_sort_key: payload.default_sort_key,
            },
        )
        .await
        .map_err(map_domain_error)?;
    Ok(Json(user.into()))
}

/// Paging values arrive as raw strings so that a non-numeric value can be
/// reported as a validation error instead of a generic extractor rejection.
#[derive(Debug, Deserialize)]
struct ActiveThreadsParams {
    course_id: Option<String>,
    page: Option<String>,
    per_page: Option<String>,
}

#[derive(Serialize)]
struct ActiveThreadsResponse {
    collection: Vec<ContentItem>,
    page: usize,
    num_pages: usize,
}

async fn active_threads(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<ActiveThreadsParams>,
) -> Result<Response, ApiError> {
    let query = ActiveThreadsQuery {
        user_id,
        course_id: params.course_id,
        page: parse_integer_param("page", params.page.as_deref())?,
        per_page: parse_integer_param("per_page", params.per_page.as_deref())?,
    };
    let page = state
        .activity
        .active_threads(query)
        .await
        .map_err(map_domain_error)?;
    Ok(match page {
        Some(page) => Json(ActiveThreadsResponse {
            collection: page.threads,
            page: page.page,
            num_pages: page.num_pages,
        })
        .into_response(),
        None => Json(json!({})).into_response(),
    })
}

#[derive(Debug, Deserialize)]
struct SocialStatsParams {
    course_id: Option<String>,
}

async fn social_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<SocialStatsParams>,
) -> Result<Json<Value>, ApiError> {
    let stats = state
        .social_stats
        .social_stats(&user_id, params.course_id.as_deref())
        .await
        .map_err(map_domain_error)?;
    let body = match stats {
        Some(stats) => serde_json::to_value(stats).map_err(|err| {
            tracing::error!(error = %err, "failed to encode social stats");
            ApiError::Internal
        })?,
        None => json!({}),
    };
    Ok(Json(body))
}

#[derive(Debug, Deserialize, Validate)]
struct SubscribeRequest {
    #[validate(length(min = 1))]
    source_type: String,
    #[validate(length(min = 1, max = 255))]
    source_id: String,
}

async fn subscribe(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<Subscription>), ApiError> {
    validation::validate(&payload)?;
    if payload.source_type != SOURCE_TYPE_THREAD {
        return Err(ApiError::Validation(format!(
            "unsupported source_type '{}'",
            payload.source_type
        )));
    }
    let subscription = state
        .subscriptions
        .follow_thread(&user_id, &payload.source_id)
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

#[derive(Debug, Deserialize)]
struct ThreadListParams {
    group_id: Option<String>,
    group_ids: Option<String>,
}

async fn list_threads(
    State(state): State<AppState>,
    Path(commentable_id): Path<String>,
    Query(params): Query<ThreadListParams>,
) -> Result<Json<Vec<ContentItem>>, ApiError> {
    let group_ids = parse_group_ids(params.group_id.as_deref(), params.group_ids.as_deref())?;
    let threads = state
        .threads
        .list_by_commentable(&commentable_id, group_ids)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(threads))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateThreadRequest {
    #[validate(length(min = 1, max = 1024))]
    title: String,
    #[validate(length(min = 1))]
    body: String,
    #[validate(length(min = 1, max = 255))]
    course_id: String,
    #[validate(length(min = 1, max = 255))]
    user_id: String,
    #[serde(default)]
    anonymous: bool,
    #[serde(default)]
    anonymous_to_peers: bool,
    group_id: Option<i64>,
    #[serde(default)]
    auto_subscribe: bool,
}

async fn create_thread(
    State(state): State<AppState>,
    Path(commentable_id): Path<String>,
    Json(payload): Json<CreateThreadRequest>,
) -> Result<(StatusCode, Json<ContentItem>), ApiError> {
    validation::validate(&payload)?;
    let thread = state
        .threads
        .create(ThreadCreate {
            commentable_id,
            author_id: payload.user_id,
            course_id: payload.course_id,
            title: payload.title,
            body: payload.body,
            anonymous: payload.anonymous,
            anonymous_to_peers: payload.anonymous_to_peers,
            group_id: payload.group_id,
            auto_subscribe: payload.auto_subscribe,
        })
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(thread)))
}

#[derive(Serialize)]
struct DeleteThreadsResponse {
    deleted: usize,
}

async fn delete_threads(
    State(state): State<AppState>,
    Path(commentable_id): Path<String>,
) -> Result<Json<DeleteThreadsResponse>, ApiError> {
    let deleted = state
        .threads
        .delete_by_commentable(&commentable_id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(DeleteThreadsResponse { deleted }))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateCommentRequest {
    #[validate(length(min = 1))]
    body: String,
    #[validate(length(min = 1, max = 255))]
    user_id: String,
    parent_id: Option<String>,
    #[serde(default)]
    anonymous: bool,
    #[serde(default)]
    anonymous_to_peers: bool,
}

async fn create_comment(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<ContentItem>), ApiError> {
    validation::validate(&payload)?;
    let comment = state
        .comments
        .create(CommentCreate {
            thread_id,
            parent_id: payload.parent_id,
            author_id: payload.user_id,
            body: payload.body,
            anonymous: payload.anonymous,
            anonymous_to_peers: payload.anonymous_to_peers,
        })
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

fn parse_integer_param(name: &str, raw: Option<&str>) -> Result<Option<i64>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ApiError::Validation(format!("{name} must be an integer"))),
    }
}

fn parse_group_ids(group_id: Option<&str>, group_ids: Option<&str>) -> Result<Vec<i64>, ApiError> {
    let mut parsed = Vec::new();
    if let Some(value) = parse_integer_param("group_id", group_id)? {
        parsed.push(value);
    }
    for raw in group_ids.unwrap_or_default().split(',') {
        if let Some(value) = parse_integer_param("group_ids", Some(raw))? {
            if !parsed.contains(&value) {
                parsed.push(value);
            }
        }
    }
    Ok(parsed)
}
