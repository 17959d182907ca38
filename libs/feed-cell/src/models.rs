use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use shared_models::pagination::PageQuery;

// ==============================================================================
// POSTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Article,
    Image,
    Video,
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostType::Article => write!(f, "article"),
            PostType::Image => write!(f, "image"),
            PostType::Video => write!(f, "video"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub title: String,
    pub html_content: Option<String>,
    pub json_content: Option<Value>,
    pub content: Option<String>,
    pub post_type: PostType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.doctor_id == user_id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub html_content: Option<String>,
    pub json_content: Option<Value>,
    pub content: Option<String>,
    pub post_type: PostType,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub html_content: Option<String>,
    pub json_content: Option<Value>,
    pub content: Option<String>,
    pub post_type: Option<PostType>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostListQuery {
    pub doctor_id: Option<Uuid>,
    pub post_type: Option<PostType>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PostListQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery { page: self.page, page_size: self.page_size }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PostStats {
    pub id: Uuid,
    pub title: String,
    pub likes_count: u64,
    pub comments_count: u64,
}

// ==============================================================================
// VIDEOS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: Uuid,
    pub post_id: Uuid,
    pub video_file: Option<String>,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVideoRequest {
    pub post_id: Uuid,
    pub video_file: Option<String>,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

// ==============================================================================
// COMMENTS, LIKES & TAGS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub comment_text: String,
    pub parent_comment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentRequest {
    pub post_id: Uuid,
    pub comment_text: String,
    pub parent_comment_id: Option<Uuid>,
}

/// `?post_id=` filter shared by the comment and like listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostScopedQuery {
    pub post_id: Option<Uuid>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PostScopedQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery { page: self.page, page_size: self.page_size }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Like {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLikeRequest {
    pub post_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Post not found")]
    PostNotFound,

    #[error("Video not found")]
    VideoNotFound,

    #[error("Comment not found")]
    CommentNotFound,

    #[error("Like not found")]
    LikeNotFound,

    #[error("Only doctors can create posts")]
    NotADoctor,

    #[error("Only the author can modify this post")]
    NotAuthor,

    #[error("Not allowed: {0}")]
    NotOwner(String),

    #[error("You have already liked this post")]
    AlreadyLiked,

    #[error("Tag '{0}' already exists")]
    TagExists(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
