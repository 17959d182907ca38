use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn feed_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/posts", post(handlers::create_post).get(handlers::list_posts))
        .route("/posts/stats", get(handlers::post_stats))
        .route(
            "/posts/{post_id}",
            get(handlers::get_post).put(handlers::update_post).delete(handlers::delete_post),
        )

        .route("/videos", post(handlers::create_video).get(handlers::list_videos))
        .route("/videos/{video_id}", get(handlers::get_video))

        .route("/comments", post(handlers::create_comment).get(handlers::list_comments))
        .route("/comments/{comment_id}", delete(handlers::delete_comment))
        .route("/likes", post(handlers::like_post).get(handlers::list_likes))
        .route("/likes/{like_id}", delete(handlers::unlike))

        .route("/tags", get(handlers::list_tags).post(handlers::create_tag))

        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
