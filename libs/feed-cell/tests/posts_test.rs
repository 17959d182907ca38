use std::sync::Arc;

use assert_matches::assert_matches;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feed_cell::handlers::*;
use feed_cell::models::{CreatePostRequest, CreateVideoRequest, PostListQuery, PostType, UpdatePostRequest};
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn auth_header(user: &TestUser) -> TypedHeader<Authorization<Bearer>> {
    let token = JwtTestUtils::create_test_token(user, &TestConfig::default().jwt_secret, None);
    TypedHeader(Authorization::bearer(&token).unwrap())
}

fn new_post(post_type: PostType) -> CreatePostRequest {
    CreatePostRequest {
        title: "Staying hydrated".to_string(),
        html_content: None,
        json_content: None,
        content: Some("Drink water.".to_string()),
        post_type,
    }
}

async fn mount_post(server: &MockServer, post_id: &str, doctor_id: &str, post_type: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/posts"))
        .and(query_param("id", format!("eq.{}", post_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::post_response(post_id, doctor_id, post_type)
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn doctor_with_profile_publishes_a_post() {
    let server = MockServer::start().await;
    let config = Arc::new(TestConfig::default().with_mock_server(&server.uri()));
    let doctor = TestUser::doctor("doctor@example.com");
    let post_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("user_id", format!("eq.{}", doctor.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "user_id": doctor.id }])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/posts"))
        .and(body_partial_json(json!({ "doctor_id": doctor.id, "post_type": "article" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::post_response(&post_id, &doctor.id, "article")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (status, Json(body)) = create_post(
        State(config),
        auth_header(&doctor),
        Extension(doctor.to_user()),
        Json(new_post(PostType::Article)),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], post_id);
}

#[tokio::test]
async fn patients_cannot_publish_posts() {
    let config = Arc::new(TestConfig::default().to_app_config());
    let patient = TestUser::patient("patient@example.com");

    let result = create_post(
        State(config),
        auth_header(&patient),
        Extension(patient.to_user()),
        Json(new_post(PostType::Article)),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn doctor_role_without_profile_is_refused() {
    let server = MockServer::start().await;
    let config = Arc::new(TestConfig::default().with_mock_server(&server.uri()));
    let doctor = TestUser::doctor("newdoc@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = create_post(
        State(config),
        auth_header(&doctor),
        Extension(doctor.to_user()),
        Json(new_post(PostType::Article)),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(msg)) if msg == "Only doctors can create posts");
}

#[tokio::test]
async fn only_the_author_may_edit_or_delete() {
    let server = MockServer::start().await;
    let config = Arc::new(TestConfig::default().with_mock_server(&server.uri()));
    let author = TestUser::doctor("author@example.com");
    let other = TestUser::doctor("other@example.com");
    let post_id = Uuid::new_v4();

    mount_post(&server, &post_id.to_string(), &author.id, "article").await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/posts"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let update = update_post(
        State(config.clone()),
        Path(post_id),
        auth_header(&other),
        Extension(other.to_user()),
        Json(UpdatePostRequest { title: Some("Hijacked".to_string()), ..Default::default() }),
    )
    .await;
    assert_matches!(update, Err(AppError::Forbidden(_)));

    let removal = delete_post(State(config), Path(post_id), auth_header(&other), Extension(other.to_user())).await;
    assert_matches!(removal, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn author_updates_their_post() {
    let server = MockServer::start().await;
    let config = Arc::new(TestConfig::default().with_mock_server(&server.uri()));
    let author = TestUser::doctor("author@example.com");
    let post_id = Uuid::new_v4();

    mount_post(&server, &post_id.to_string(), &author.id, "article").await;

    let mut updated = MockSupabaseResponses::post_response(&post_id.to_string(), &author.id, "article");
    updated["title"] = json!("Staying hydrated in summer");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/posts"))
        .and(query_param("id", format!("eq.{}", post_id)))
        .and(body_partial_json(json!({ "title": "Staying hydrated in summer" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
        .expect(1)
        .mount(&server)
        .await;

    let Json(body) = update_post(
        State(config),
        Path(post_id),
        auth_header(&author),
        Extension(author.to_user()),
        Json(UpdatePostRequest { title: Some("Staying hydrated in summer".to_string()), ..Default::default() }),
    )
    .await
    .unwrap();

    assert_eq!(body["title"], "Staying hydrated in summer");
}

#[tokio::test]
async fn post_list_is_paginated() {
    let server = MockServer::start().await;
    let config = Arc::new(TestConfig::default().with_mock_server(&server.uri()));
    let reader = TestUser::patient("reader@example.com");
    let doctor_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/posts"))
        .and(query_param("limit", "5"))
        .and(query_param("offset", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::post_response(&Uuid::new_v4().to_string(), &doctor_id, "image")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let query = PostListQuery { page: Some(2), page_size: Some(5), ..Default::default() };
    let Json(body) = list_posts(State(config), auth_header(&reader), Query(query)).await.unwrap();

    assert_eq!(body["page"], 2);
    assert_eq!(body["page_size"], 5);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn stats_report_like_and_comment_counts() {
    let server = MockServer::start().await;
    let config = Arc::new(TestConfig::default().with_mock_server(&server.uri()));
    let reader = TestUser::patient("reader@example.com");
    let post_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/posts"))
        .and(query_param("select", "id,title,likes(count),comments(count)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": post_id,
            "title": "Staying hydrated",
            "likes": [{ "count": 3 }],
            "comments": [{ "count": 1 }]
        }])))
        .mount(&server)
        .await;

    let Json(body) = post_stats(State(config), auth_header(&reader)).await.unwrap();

    assert_eq!(body, json!([{
        "id": post_id,
        "title": "Staying hydrated",
        "likes_count": 3,
        "comments_count": 1
    }]));
}

#[tokio::test]
async fn videos_attach_only_to_own_video_posts() {
    let server = MockServer::start().await;
    let config = Arc::new(TestConfig::default().with_mock_server(&server.uri()));
    let author = TestUser::doctor("author@example.com");
    let article_id = Uuid::new_v4();
    let video_post_id = Uuid::new_v4();

    mount_post(&server, &article_id.to_string(), &author.id, "article").await;
    mount_post(&server, &video_post_id.to_string(), &author.id, "video").await;

    let video_request = |post_id| CreateVideoRequest {
        post_id,
        video_file: None,
        video_url: Some("https://cdn.example.com/v.mp4".to_string()),
        thumbnail_url: None,
    };

    let wrong_type = create_video(
        State(config.clone()),
        auth_header(&author),
        Extension(author.to_user()),
        Json(video_request(article_id)),
    )
    .await;
    assert_matches!(wrong_type, Err(AppError::ValidationError(msg)) if msg == "Post type must be video");

    let stranger = TestUser::doctor("stranger@example.com");
    let not_author = create_video(
        State(config.clone()),
        auth_header(&stranger),
        Extension(stranger.to_user()),
        Json(video_request(video_post_id)),
    )
    .await;
    assert_matches!(not_author, Err(AppError::Forbidden(_)));

    Mock::given(method("POST"))
        .and(path("/rest/v1/videos"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "post_id": video_post_id,
            "video_file": null,
            "video_url": "https://cdn.example.com/v.mp4",
            "thumbnail_url": null
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let (status, _) = create_video(
        State(config),
        auth_header(&author),
        Extension(author.to_user()),
        Json(video_request(video_post_id)),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
}
