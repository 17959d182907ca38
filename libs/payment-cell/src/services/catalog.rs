use reqwest::Method;
use serde_json::json;
use tracing::info;

use shared_config::AppConfig;
use shared_database::supabase::{is_conflict, SupabaseClient};

use crate::models::{Category, CreateCategoryRequest, CreatePaymentMethodRequest, PaymentError, PaymentMethod};

/// Subscription categories and accepted payment methods.
pub struct CatalogService {
    supabase: SupabaseClient,
}

impl CatalogService {
    pub fn new(config: &AppConfig) -> Self {
        Self { supabase: SupabaseClient::new(config) }
    }

    pub async fn list_categories(&self, auth_token: &str) -> Result<Vec<Category>, PaymentError> {
        self.supabase.select("/rest/v1/categories?order=name.asc", auth_token).await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))
    }

    pub async fn create_category(
        &self,
        request: CreateCategoryRequest,
        auth_token: &str,
    ) -> Result<Category, PaymentError> {
        let name = required_name(&request.name, "Category name")?;
        let body = json!({ "name": name, "description": request.description });

        let rows: Vec<Category> = self.supabase
            .write_returning(Method::POST, "/rest/v1/categories", auth_token, body)
            .await
            .map_err(|e| conflict_or_db(e, format!("Category '{}' already exists", name)))?;

        let category = rows.into_iter().next()
            .ok_or_else(|| PaymentError::DatabaseError("Failed to create category".to_string()))?;
        info!("Category {} created", category.id);
        Ok(category)
    }

    pub async fn list_payment_methods(&self, auth_token: &str) -> Result<Vec<PaymentMethod>, PaymentError> {
        self.supabase.select("/rest/v1/payment_methods?order=method_name.asc", auth_token).await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))
    }

    pub async fn create_payment_method(
        &self,
        request: CreatePaymentMethodRequest,
        auth_token: &str,
    ) -> Result<PaymentMethod, PaymentError> {
        let name = required_name(&request.method_name, "Method name")?;
        let body = json!({ "method_name": name });

        let rows: Vec<PaymentMethod> = self.supabase
            .write_returning(Method::POST, "/rest/v1/payment_methods", auth_token, body)
            .await
            .map_err(|e| conflict_or_db(e, format!("Payment method '{}' already exists", name)))?;

        rows.into_iter().next()
            .ok_or_else(|| PaymentError::DatabaseError("Failed to create payment method".to_string()))
    }
}

fn required_name<'a>(value: &'a str, field: &str) -> Result<&'a str, PaymentError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PaymentError::ValidationError(format!("{} is required", field)));
    }
    Ok(trimmed)
}

fn conflict_or_db(error: anyhow::Error, conflict_message: String) -> PaymentError {
    if is_conflict(&error) {
        PaymentError::Conflict(conflict_message)
    } else {
        PaymentError::DatabaseError(error.to_string())
    }
}
