use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{User, UserRole};
use shared_models::error::AppError;
use shared_models::pagination::{Page, PageQuery};
use shared_utils::extractor::require_role;

use crate::models::{
    CreateCommentRequest, CreateLikeRequest, CreatePostRequest, CreateTagRequest, CreateVideoRequest,
    FeedError, PostListQuery, PostScopedQuery, UpdatePostRequest,
};
use crate::services::{CommentService, LikeService, PostService, TagService, VideoService};

fn map_feed_error(e: FeedError) -> AppError {
    match e {
        FeedError::PostNotFound
        | FeedError::VideoNotFound
        | FeedError::CommentNotFound
        | FeedError::LikeNotFound => AppError::NotFound(e.to_string()),
        FeedError::NotADoctor | FeedError::NotAuthor => AppError::Forbidden(e.to_string()),
        FeedError::NotOwner(msg) => AppError::Forbidden(msg),
        FeedError::AlreadyLiked | FeedError::TagExists(_) => AppError::Conflict(e.to_string()),
        FeedError::ValidationError(msg) => AppError::ValidationError(msg),
        FeedError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// POSTS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_post(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, &[UserRole::Doctor])?;

    let post = PostService::new(&state).create_post(request, &user, auth.token()).await
        .map_err(map_feed_error)?;

    Ok((StatusCode::CREATED, Json(json!(post))))
}

#[axum::debug_handler]
pub async fn list_posts(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<Value>, AppError> {
    let posts = PostService::new(&state).list_posts(&query, auth.token()).await
        .map_err(map_feed_error)?;

    Ok(Json(json!(Page::new(&query.page_query(), posts))))
}

#[axum::debug_handler]
pub async fn get_post(
    State(state): State<Arc<AppConfig>>,
    Path(post_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let post = PostService::new(&state).get_post(post_id, auth.token()).await
        .map_err(map_feed_error)?;

    Ok(Json(json!(post)))
}

#[axum::debug_handler]
pub async fn update_post(
    State(state): State<Arc<AppConfig>>,
    Path(post_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdatePostRequest>,
) -> Result<Json<Value>, AppError> {
    let post = PostService::new(&state).update_post(post_id, request, &user, auth.token()).await
        .map_err(map_feed_error)?;

    Ok(Json(json!(post)))
}

#[axum::debug_handler]
pub async fn delete_post(
    State(state): State<Arc<AppConfig>>,
    Path(post_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, AppError> {
    PostService::new(&state).delete_post(post_id, &user, auth.token()).await
        .map_err(map_feed_error)?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn post_stats(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let stats = PostService::new(&state).post_stats(auth.token()).await
        .map_err(map_feed_error)?;

    Ok(Json(json!(stats)))
}

// ==============================================================================
// VIDEOS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_video(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateVideoRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, &[UserRole::Doctor])?;

    let video = VideoService::new(&state).create_video(request, &user, auth.token()).await
        .map_err(map_feed_error)?;

    Ok((StatusCode::CREATED, Json(json!(video))))
}

#[axum::debug_handler]
pub async fn list_videos(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<PostScopedQuery>,
) -> Result<Json<Value>, AppError> {
    let page = query.page_query();
    let videos = VideoService::new(&state).list_videos(query.post_id, &page, auth.token()).await
        .map_err(map_feed_error)?;

    Ok(Json(json!(Page::new(&page, videos))))
}

#[axum::debug_handler]
pub async fn get_video(
    State(state): State<Arc<AppConfig>>,
    Path(video_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let video = VideoService::new(&state).get_video(video_id, auth.token()).await
        .map_err(map_feed_error)?;

    Ok(Json(json!(video)))
}

// ==============================================================================
// COMMENTS & LIKES
// ==============================================================================

#[axum::debug_handler]
pub async fn list_comments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<PostScopedQuery>,
) -> Result<Json<Value>, AppError> {
    let page = query.page_query();
    let comments = CommentService::new(&state).list_comments(query.post_id, &page, auth.token()).await
        .map_err(map_feed_error)?;

    Ok(Json(json!(Page::new(&page, comments))))
}

#[axum::debug_handler]
pub async fn create_comment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let comment = CommentService::new(&state).create_comment(request, &user, auth.token()).await
        .map_err(map_feed_error)?;

    Ok((StatusCode::CREATED, Json(json!(comment))))
}

#[axum::debug_handler]
pub async fn delete_comment(
    State(state): State<Arc<AppConfig>>,
    Path(comment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, AppError> {
    CommentService::new(&state).delete_comment(comment_id, &user, auth.token()).await
        .map_err(map_feed_error)?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn list_likes(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<PostScopedQuery>,
) -> Result<Json<Value>, AppError> {
    let page: PageQuery = query.page_query();
    let likes = LikeService::new(&state).list_likes(query.post_id, &page, auth.token()).await
        .map_err(map_feed_error)?;

    Ok(Json(json!(likes)))
}

#[axum::debug_handler]
pub async fn like_post(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateLikeRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let like = LikeService::new(&state).like_post(request.post_id, &user, auth.token()).await
        .map_err(map_feed_error)?;

    Ok((StatusCode::CREATED, Json(json!(like))))
}

#[axum::debug_handler]
pub async fn unlike(
    State(state): State<Arc<AppConfig>>,
    Path(like_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, AppError> {
    LikeService::new(&state).unlike(like_id, &user, auth.token()).await
        .map_err(map_feed_error)?;

    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// TAGS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_tags(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let tags = TagService::new(&state).list_tags(auth.token()).await
        .map_err(map_feed_error)?;

    Ok(Json(json!(tags)))
}

#[axum::debug_handler]
pub async fn create_tag(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, &[UserRole::Doctor, UserRole::Admin])?;

    let tag = TagService::new(&state).create_tag(request, auth.token()).await
        .map_err(map_feed_error)?;

    Ok((StatusCode::CREATED, Json(json!(tag))))
}
