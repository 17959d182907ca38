use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use crate::models::{CreatePostRequest, FeedError, Post, PostListQuery, PostStats, UpdatePostRequest};

/// PostgREST embedded aggregate, e.g. `likes(count)` → `[{"count": 3}]`.
#[derive(Debug, Deserialize)]
struct CountRow {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct StatsRow {
    id: Uuid,
    title: String,
    #[serde(default)]
    likes: Vec<CountRow>,
    #[serde(default)]
    comments: Vec<CountRow>,
}

impl From<StatsRow> for PostStats {
    fn from(row: StatsRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            likes_count: row.likes.first().map(|c| c.count).unwrap_or(0),
            comments_count: row.comments.first().map(|c| c.count).unwrap_or(0),
        }
    }
}

pub struct PostService {
    supabase: SupabaseClient,
}

impl PostService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_post(&self, request: CreatePostRequest, author: &User, auth_token: &str) -> Result<Post, FeedError> {
        let doctor_id = actor_uuid(author)?;

        if request.title.trim().is_empty() {
            return Err(FeedError::ValidationError("Title is required".to_string()));
        }

        // The role claim alone is not enough; a doctor profile must exist.
        let path = format!("/rest/v1/doctors?user_id=eq.{}&select=user_id", doctor_id);
        let doctors: Vec<Value> = self.supabase.select(&path, auth_token).await
            .map_err(|e| FeedError::DatabaseError(e.to_string()))?;
        if doctors.is_empty() {
            warn!("User {} tried to post without a doctor profile", doctor_id);
            return Err(FeedError::NotADoctor);
        }

        let now = Utc::now().to_rfc3339();
        let body = json!({
            "doctor_id": doctor_id,
            "title": request.title.trim(),
            "html_content": request.html_content,
            "json_content": request.json_content,
            "content": request.content,
            "post_type": request.post_type,
            "created_at": now,
            "updated_at": now,
        });

        let rows: Vec<Post> = self.supabase
            .write_returning(Method::POST, "/rest/v1/posts", auth_token, body)
            .await
            .map_err(|e| FeedError::DatabaseError(e.to_string()))?;

        let post = rows.into_iter().next()
            .ok_or_else(|| FeedError::DatabaseError("Insert returned no rows".to_string()))?;
        info!("Post {} published by doctor {}", post.id, doctor_id);
        Ok(post)
    }

    pub async fn get_post(&self, post_id: Uuid, auth_token: &str) -> Result<Post, FeedError> {
        let path = format!("/rest/v1/posts?id=eq.{}", post_id);
        let rows: Vec<Post> = self.supabase.select(&path, auth_token).await
            .map_err(|e| FeedError::DatabaseError(e.to_string()))?;
        rows.into_iter().next().ok_or(FeedError::PostNotFound)
    }

    pub async fn list_posts(&self, query: &PostListQuery, auth_token: &str) -> Result<Vec<Post>, FeedError> {
        let mut filters = Vec::new();
        if let Some(doctor_id) = query.doctor_id {
            filters.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(post_type) = query.post_type {
            filters.push(format!("post_type=eq.{}", post_type));
        }
        filters.push("order=created_at.desc".to_string());
        filters.push(query.page_query().to_query());

        let path = format!("/rest/v1/posts?{}", filters.join("&"));
        debug!("Listing posts: {}", path);
        self.supabase.select(&path, auth_token).await
            .map_err(|e| FeedError::DatabaseError(e.to_string()))
    }

    pub async fn update_post(
        &self,
        post_id: Uuid,
        request: UpdatePostRequest,
        actor: &User,
        auth_token: &str,
    ) -> Result<Post, FeedError> {
        let post = self.get_post(post_id, auth_token).await?;
        if !post.is_authored_by(actor_uuid(actor)?) {
            return Err(FeedError::NotAuthor);
        }

        let mut changes = Map::new();
        if let Some(title) = request.title {
            if title.trim().is_empty() {
                return Err(FeedError::ValidationError("Title cannot be empty".to_string()));
            }
            changes.insert("title".to_string(), json!(title.trim()));
        }
        if let Some(html) = request.html_content {
            changes.insert("html_content".to_string(), json!(html));
        }
        if let Some(json_content) = request.json_content {
            changes.insert("json_content".to_string(), json_content);
        }
        if let Some(content) = request.content {
            changes.insert("content".to_string(), json!(content));
        }
        if let Some(post_type) = request.post_type {
            changes.insert("post_type".to_string(), json!(post_type));
        }

        if changes.is_empty() {
            return Ok(post);
        }
        changes.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/posts?id=eq.{}", post_id);
        let rows: Vec<Post> = self.supabase
            .write_returning(Method::PATCH, &path, auth_token, Value::Object(changes))
            .await
            .map_err(|e| FeedError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(FeedError::PostNotFound)
    }

    pub async fn delete_post(&self, post_id: Uuid, actor: &User, auth_token: &str) -> Result<(), FeedError> {
        let post = self.get_post(post_id, auth_token).await?;
        if !post.is_authored_by(actor_uuid(actor)?) {
            return Err(FeedError::NotAuthor);
        }

        let path = format!("/rest/v1/posts?id=eq.{}", post_id);
        self.supabase.delete(&path, auth_token).await
            .map_err(|e| FeedError::DatabaseError(e.to_string()))?;

        info!("Post {} deleted", post_id);
        Ok(())
    }

    /// Like and comment totals for every post.
    pub async fn post_stats(&self, auth_token: &str) -> Result<Vec<PostStats>, FeedError> {
        let path = "/rest/v1/posts?select=id,title,likes(count),comments(count)&order=created_at.desc";
        let rows: Vec<StatsRow> = self.supabase.select(path, auth_token).await
            .map_err(|e| FeedError::DatabaseError(e.to_string()))?;
        Ok(rows.into_iter().map(PostStats::from).collect())
    }
}

pub(crate) fn actor_uuid(actor: &User) -> Result<Uuid, FeedError> {
    Uuid::parse_str(&actor.id)
        .map_err(|_| FeedError::ValidationError("Invalid user ID format".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_row_reads_embedded_counts() {
        let id = Uuid::new_v4();
        let row: StatsRow = serde_json::from_value(json!({
            "id": id,
            "title": "Sleep hygiene",
            "likes": [{ "count": 4 }],
            "comments": [{ "count": 2 }]
        }))
        .unwrap();

        assert_eq!(
            PostStats::from(row),
            PostStats { id, title: "Sleep hygiene".to_string(), likes_count: 4, comments_count: 2 }
        );
    }

    #[test]
    fn missing_aggregates_count_as_zero() {
        let row: StatsRow = serde_json::from_value(json!({ "id": Uuid::new_v4(), "title": "Quiet post" })).unwrap();
        let stats = PostStats::from(row);
        assert_eq!((stats.likes_count, stats.comments_count), (0, 0));
    }
}
