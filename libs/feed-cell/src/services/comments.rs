use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;
use shared_models::pagination::PageQuery;

use crate::models::{Comment, CreateCommentRequest, FeedError};
use crate::services::posts::{actor_uuid, PostService};

pub struct CommentService {
    supabase: SupabaseClient,
    posts: PostService,
}

impl CommentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            posts: PostService::new(config),
        }
    }

    /// Comments of one post. Without a post there is nothing to list.
    pub async fn list_comments(&self, post_id: Option<Uuid>, page: &PageQuery, auth_token: &str) -> Result<Vec<Comment>, FeedError> {
        let Some(post_id) = post_id else {
            debug!("Comment listing without post_id; returning nothing");
            return Ok(Vec::new());
        };

        let path = format!(
            "/rest/v1/comments?post_id=eq.{}&order=created_at.asc&{}",
            post_id,
            page.to_query()
        );
        self.supabase.select(&path, auth_token).await
            .map_err(|e| FeedError::DatabaseError(e.to_string()))
    }

    pub async fn create_comment(&self, request: CreateCommentRequest, actor: &User, auth_token: &str) -> Result<Comment, FeedError> {
        let user_id = actor_uuid(actor)?;
        let text = request.comment_text.trim();
        if text.is_empty() {
            return Err(FeedError::ValidationError("Comment text is required".to_string()));
        }

        self.posts.get_post(request.post_id, auth_token).await?;

        if let Some(parent_id) = request.parent_comment_id {
            let parent = self.get_comment(parent_id, auth_token).await?;
            if parent.post_id != request.post_id {
                return Err(FeedError::ValidationError(
                    "Parent comment belongs to a different post".to_string(),
                ));
            }
        }

        let body = json!({
            "post_id": request.post_id,
            "user_id": user_id,
            "comment_text": text,
            "parent_comment_id": request.parent_comment_id,
            "created_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<Comment> = self.supabase
            .write_returning(Method::POST, "/rest/v1/comments", auth_token, body)
            .await
            .map_err(|e| FeedError::DatabaseError(e.to_string()))?;

        let comment = rows.into_iter().next()
            .ok_or_else(|| FeedError::DatabaseError("Insert returned no rows".to_string()))?;
        info!("Comment {} added to post {}", comment.id, comment.post_id);
        Ok(comment)
    }

    pub async fn get_comment(&self, comment_id: Uuid, auth_token: &str) -> Result<Comment, FeedError> {
        let path = format!("/rest/v1/comments?id=eq.{}", comment_id);
        let rows: Vec<Comment> = self.supabase.select(&path, auth_token).await
            .map_err(|e| FeedError::DatabaseError(e.to_string()))?;
        rows.into_iter().next().ok_or(FeedError::CommentNotFound)
    }

    pub async fn delete_comment(&self, comment_id: Uuid, actor: &User, auth_token: &str) -> Result<(), FeedError> {
        let comment = self.get_comment(comment_id, auth_token).await?;
        if comment.user_id != actor_uuid(actor)? && !actor.is_admin() {
            return Err(FeedError::NotOwner("You can only delete your own comments".to_string()));
        }

        let path = format!("/rest/v1/comments?id=eq.{}", comment_id);
        self.supabase.delete(&path, auth_token).await
            .map_err(|e| FeedError::DatabaseError(e.to_string()))
    }
}
