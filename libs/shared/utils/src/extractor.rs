use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
    body::Body,
};

use shared_models::auth::{User, UserRole};
use shared_models::error::AppError;
use shared_config::AppConfig;

use crate::jwt::validate_token;

pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_value = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    let user = validate_token(token, &config.supabase_jwt_secret)
        .map_err(|e| AppError::Auth(e.to_string()))?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

pub fn extract_user<B>(request: &Request<B>) -> Result<User, AppError> {
    request
        .extensions()
        .get::<User>()
        .cloned()
        .ok_or_else(|| AppError::Auth("User not found in request extensions".to_string()))
}

/// Reject callers whose role is not one of `allowed`.
pub fn require_role(user: &User, allowed: &[UserRole]) -> Result<UserRole, AppError> {
    match user.user_role() {
        Some(role) if allowed.contains(&role) => Ok(role),
        _ => Err(AppError::Forbidden(format!(
            "Requires one of the roles: {}",
            allowed.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestUser;

    #[test]
    fn require_role_accepts_listed_role() {
        let owner = TestUser::clinic_owner("owner@example.com").to_user();
        assert_eq!(
            require_role(&owner, &[UserRole::ClinicOwner, UserRole::Admin]).unwrap(),
            UserRole::ClinicOwner
        );
    }

    #[test]
    fn require_role_rejects_other_roles() {
        let patient = TestUser::patient("p@example.com").to_user();
        assert!(matches!(
            require_role(&patient, &[UserRole::Doctor]),
            Err(AppError::Forbidden(_))
        ));
    }
}
