use chrono::Utc;
use reqwest::Method;
use serde_json::json;

use shared_config::AppConfig;
use shared_database::supabase::{is_conflict, SupabaseClient};

use crate::models::{CreateTagRequest, FeedError, Tag};

pub struct TagService {
    supabase: SupabaseClient,
}

impl TagService {
    pub fn new(config: &AppConfig) -> Self {
        Self { supabase: SupabaseClient::new(config) }
    }

    pub async fn list_tags(&self, auth_token: &str) -> Result<Vec<Tag>, FeedError> {
        self.supabase.select("/rest/v1/tags?order=name.asc", auth_token).await
            .map_err(|e| FeedError::DatabaseError(e.to_string()))
    }

    pub async fn create_tag(&self, request: CreateTagRequest, auth_token: &str) -> Result<Tag, FeedError> {
        let name = request.name.trim().to_lowercase();
        if name.is_empty() {
            return Err(FeedError::ValidationError("Tag name is required".to_string()));
        }

        let body = json!({ "name": name, "created_at": Utc::now().to_rfc3339() });
        let rows: Vec<Tag> = self.supabase
            .write_returning(Method::POST, "/rest/v1/tags", auth_token, body)
            .await
            .map_err(|e| {
                if is_conflict(&e) {
                    FeedError::TagExists(name.clone())
                } else {
                    FeedError::DatabaseError(e.to_string())
                }
            })?;

        rows.into_iter().next()
            .ok_or_else(|| FeedError::DatabaseError("Insert returned no rows".to_string()))
    }
}
