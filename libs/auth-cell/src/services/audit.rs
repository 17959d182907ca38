use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{AuditQuery, AuthError, UsersAudit};

/// Read-only view over the `users_audit` trail written by database triggers.
pub struct AuditService {
    supabase: SupabaseClient,
}

impl AuditService {
    pub fn new(config: &AppConfig) -> Self {
        Self { supabase: SupabaseClient::new(config) }
    }

    pub async fn list_entries(&self, query: &AuditQuery, auth_token: &str) -> Result<Vec<UsersAudit>, AuthError> {
        let mut filters = Vec::new();
        if let Some(user_id) = query.user_id {
            filters.push(format!("user_id=eq.{}", user_id));
        }
        filters.push("order=changed_at.desc".to_string());
        filters.push(query.page_query().to_query());

        let path = format!("/rest/v1/users_audit?{}", filters.join("&"));
        self.supabase.select(&path, auth_token).await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))
    }
}
