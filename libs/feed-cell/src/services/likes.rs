use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{is_conflict, SupabaseClient};
use shared_models::auth::User;
use shared_models::pagination::PageQuery;

use crate::models::{FeedError, Like};
use crate::services::posts::{actor_uuid, PostService};

pub struct LikeService {
    supabase: SupabaseClient,
    posts: PostService,
}

impl LikeService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            posts: PostService::new(config),
        }
    }

    pub async fn list_likes(&self, post_id: Option<Uuid>, page: &PageQuery, auth_token: &str) -> Result<Vec<Like>, FeedError> {
        let Some(post_id) = post_id else {
            return Ok(Vec::new());
        };

        let path = format!("/rest/v1/likes?post_id=eq.{}&order=created_at.asc&{}", post_id, page.to_query());
        self.supabase.select(&path, auth_token).await
            .map_err(|e| FeedError::DatabaseError(e.to_string()))
    }

    /// One like per user and post; the unique index reports duplicates.
    pub async fn like_post(&self, post_id: Uuid, actor: &User, auth_token: &str) -> Result<Like, FeedError> {
        let user_id = actor_uuid(actor)?;
        self.posts.get_post(post_id, auth_token).await?;

        let body = json!({
            "post_id": post_id,
            "user_id": user_id,
            "created_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<Like> = self.supabase
            .write_returning(Method::POST, "/rest/v1/likes", auth_token, body)
            .await
            .map_err(|e| {
                if is_conflict(&e) {
                    FeedError::AlreadyLiked
                } else {
                    FeedError::DatabaseError(e.to_string())
                }
            })?;

        let like = rows.into_iter().next()
            .ok_or_else(|| FeedError::DatabaseError("Insert returned no rows".to_string()))?;
        info!("User {} liked post {}", user_id, post_id);
        Ok(like)
    }

    pub async fn unlike(&self, like_id: Uuid, actor: &User, auth_token: &str) -> Result<(), FeedError> {
        let path = format!("/rest/v1/likes?id=eq.{}", like_id);
        let rows: Vec<Like> = self.supabase.select(&path, auth_token).await
            .map_err(|e| FeedError::DatabaseError(e.to_string()))?;
        let like = rows.into_iter().next().ok_or(FeedError::LikeNotFound)?;

        if like.user_id != actor_uuid(actor)? {
            warn!("User {} tried to remove like {} owned by {}", actor.id, like_id, like.user_id);
            return Err(FeedError::NotOwner("You can only remove your own likes".to_string()));
        }

        self.supabase.delete(&path, auth_token).await
            .map_err(|e| FeedError::DatabaseError(e.to_string()))
    }
}
