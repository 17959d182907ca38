use reqwest::Method;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;
use shared_models::pagination::PageQuery;

use crate::models::{CreateVideoRequest, FeedError, PostType, Video};
use crate::services::posts::{actor_uuid, PostService};

pub struct VideoService {
    supabase: SupabaseClient,
    posts: PostService,
}

impl VideoService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            posts: PostService::new(config),
        }
    }

    /// Attaches a video to one of the author's own video posts.
    pub async fn create_video(&self, request: CreateVideoRequest, actor: &User, auth_token: &str) -> Result<Video, FeedError> {
        if request.video_file.is_none() && request.video_url.is_none() {
            return Err(FeedError::ValidationError("Either video_file or video_url is required".to_string()));
        }

        let post = self.posts.get_post(request.post_id, auth_token).await?;
        if post.post_type != PostType::Video {
            return Err(FeedError::ValidationError("Post type must be video".to_string()));
        }
        if !post.is_authored_by(actor_uuid(actor)?) {
            return Err(FeedError::NotAuthor);
        }

        let body = json!({
            "post_id": request.post_id,
            "video_file": request.video_file,
            "video_url": request.video_url,
            "thumbnail_url": request.thumbnail_url,
        });

        let rows: Vec<Video> = self.supabase
            .write_returning(Method::POST, "/rest/v1/videos", auth_token, body)
            .await
            .map_err(|e| FeedError::DatabaseError(e.to_string()))?;

        let video = rows.into_iter().next()
            .ok_or_else(|| FeedError::DatabaseError("Insert returned no rows".to_string()))?;
        info!("Video {} attached to post {}", video.id, post.id);
        Ok(video)
    }

    pub async fn get_video(&self, video_id: Uuid, auth_token: &str) -> Result<Video, FeedError> {
        let path = format!("/rest/v1/videos?id=eq.{}", video_id);
        let rows: Vec<Video> = self.supabase.select(&path, auth_token).await
            .map_err(|e| FeedError::DatabaseError(e.to_string()))?;
        rows.into_iter().next().ok_or(FeedError::VideoNotFound)
    }

    pub async fn list_videos(&self, post_id: Option<Uuid>, page: &PageQuery, auth_token: &str) -> Result<Vec<Video>, FeedError> {
        let path = match post_id {
            Some(post_id) => format!("/rest/v1/videos?post_id=eq.{}&{}", post_id, page.to_query()),
            None => format!("/rest/v1/videos?{}", page.to_query()),
        };
        self.supabase.select(&path, auth_token).await
            .map_err(|e| FeedError::DatabaseError(e.to_string()))
    }
}
