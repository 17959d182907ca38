use std::sync::Arc;

use assert_matches::assert_matches;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feed_cell::handlers::*;
use feed_cell::models::{CreateCommentRequest, CreateLikeRequest, PostScopedQuery};
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn auth_header(user: &TestUser) -> TypedHeader<Authorization<Bearer>> {
    let token = JwtTestUtils::create_test_token(user, &TestConfig::default().jwt_secret, None);
    TypedHeader(Authorization::bearer(&token).unwrap())
}

async fn mount_post(server: &MockServer, post_id: Uuid) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/posts"))
        .and(query_param("id", format!("eq.{}", post_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::post_response(&post_id.to_string(), &Uuid::new_v4().to_string(), "article")
        ])))
        .mount(server)
        .await;
}

fn comment_row(comment_id: Uuid, post_id: Uuid, user_id: &str) -> serde_json::Value {
    json!({
        "id": comment_id,
        "post_id": post_id,
        "user_id": user_id,
        "comment_text": "Thanks, doctor!",
        "parent_comment_id": null,
        "created_at": "2024-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn comment_list_without_post_id_is_empty() {
    let server = MockServer::start().await;
    let config = Arc::new(TestConfig::default().with_mock_server(&server.uri()));
    let reader = TestUser::patient("reader@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let Json(body) = list_comments(State(config), auth_header(&reader), Query(PostScopedQuery::default()))
        .await
        .unwrap();

    assert_eq!(body["results"], json!([]));
}

#[tokio::test]
async fn comments_are_listed_per_post() {
    let server = MockServer::start().await;
    let config = Arc::new(TestConfig::default().with_mock_server(&server.uri()));
    let reader = TestUser::patient("reader@example.com");
    let post_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/comments"))
        .and(query_param("post_id", format!("eq.{}", post_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            comment_row(Uuid::new_v4(), post_id, &reader.id)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let query = PostScopedQuery { post_id: Some(post_id), ..Default::default() };
    let Json(body) = list_comments(State(config), auth_header(&reader), Query(query)).await.unwrap();

    assert_eq!(body["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn reply_must_stay_on_the_parents_post() {
    let server = MockServer::start().await;
    let config = Arc::new(TestConfig::default().with_mock_server(&server.uri()));
    let user = TestUser::patient("reader@example.com");
    let post_id = Uuid::new_v4();
    let other_post_id = Uuid::new_v4();
    let parent_id = Uuid::new_v4();

    mount_post(&server, post_id).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/comments"))
        .and(query_param("id", format!("eq.{}", parent_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            comment_row(parent_id, other_post_id, &user.id)
        ])))
        .mount(&server)
        .await;

    let result = create_comment(
        State(config),
        auth_header(&user),
        Extension(user.to_user()),
        Json(CreateCommentRequest {
            post_id,
            comment_text: "Me too".to_string(),
            parent_comment_id: Some(parent_id),
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn liking_twice_conflicts() {
    let server = MockServer::start().await;
    let config = Arc::new(TestConfig::default().with_mock_server(&server.uri()));
    let user = TestUser::patient("reader@example.com");
    let post_id = Uuid::new_v4();

    mount_post(&server, post_id).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/likes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "post_id": post_id,
            "user_id": user.id,
            "created_at": "2024-01-01T00:00:00Z"
        }])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/likes"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockSupabaseResponses::error_response("duplicate key value violates unique constraint", "23505"),
        ))
        .mount(&server)
        .await;

    let (status, _) = like_post(
        State(config.clone()),
        auth_header(&user),
        Extension(user.to_user()),
        Json(CreateLikeRequest { post_id }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);

    let again = like_post(
        State(config),
        auth_header(&user),
        Extension(user.to_user()),
        Json(CreateLikeRequest { post_id }),
    )
    .await;
    assert_matches!(again, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn only_the_owner_removes_a_like() {
    let server = MockServer::start().await;
    let config = Arc::new(TestConfig::default().with_mock_server(&server.uri()));
    let owner = TestUser::patient("owner@example.com");
    let other = TestUser::patient("other@example.com");
    let like_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/likes"))
        .and(query_param("id", format!("eq.{}", like_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": like_id,
            "post_id": Uuid::new_v4(),
            "user_id": owner.id,
            "created_at": "2024-01-01T00:00:00Z"
        }])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/likes"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let forbidden = unlike(State(config.clone()), Path(like_id), auth_header(&other), Extension(other.to_user())).await;
    assert_matches!(forbidden, Err(AppError::Forbidden(_)));

    let status = unlike(State(config), Path(like_id), auth_header(&owner), Extension(owner.to_user()))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn like_list_without_post_id_is_empty() {
    let config = Arc::new(TestConfig::default().to_app_config());
    let reader = TestUser::patient("reader@example.com");

    let Json(body) = list_likes(State(config), auth_header(&reader), Query(PostScopedQuery::default()))
        .await
        .unwrap();

    assert_eq!(body, json!([]));
}
