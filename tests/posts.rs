mod common;

use axum::http::{Method, StatusCode};
use atelier::domain::user::Role;
use serde_json::json;

use common::{app, MultipartForm, TINY_PNG};

#[tokio::test]
async fn create_post_enters_moderation_queue() {
    let app = app().await;
    let author = app.create_user("submit_author", Role::User).await;
    let category = app.create_category("Submissions", "submissions").await;

    let form = MultipartForm::new()
        .text("title", "new artwork")
        .text("description", "fresh off the tablet")
        .text("category_id", &category.to_string())
        .file("media", "art.png", "image/png", TINY_PNG);
    let response = app
        .send_multipart(Method::POST, "/api/v1/posts", form, Some(&author.token))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let body = response.json();
    assert_eq!(body["status"], "pending");
    assert_eq!(body["title"], "new artwork");
    assert!(body["media_url"].as_str().unwrap().starts_with("/media/"));

    // not public until approved
    let post_id = body["id"].as_str().unwrap().to_string();
    let response = app
        .get(&format!("/api/v1/posts?category_id={}", category), None)
        .await;
    let ids: Vec<String> = response.json()["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect();
    assert!(!ids.contains(&post_id));
}

#[tokio::test]
async fn create_post_requires_auth_and_valid_fields() {
    let app = app().await;
    let author = app.create_user("submit_checks", Role::User).await;
    let category = app.create_category("Submission Checks", "submission-checks").await;

    let form = MultipartForm::new()
        .text("title", "anon artwork")
        .text("category_id", &category.to_string())
        .file("media", "art.png", "image/png", TINY_PNG);
    let response = app
        .send_multipart(Method::POST, "/api/v1/posts", form, None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let form = MultipartForm::new()
        .text("category_id", &category.to_string())
        .file("media", "art.png", "image/png", TINY_PNG);
    let response = app
        .send_multipart(Method::POST, "/api/v1/posts", form, Some(&author.token))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let form = MultipartForm::new()
        .text("title", "no media")
        .text("category_id", &category.to_string());
    let response = app
        .send_multipart(Method::POST, "/api/v1/posts", form, Some(&author.token))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let form = MultipartForm::new()
        .text("title", "bad category")
        .text("category_id", "00000000-0000-0000-0000-000000000000")
        .file("media", "art.png", "image/png", TINY_PNG);
    let response = app
        .send_multipart(Method::POST, "/api/v1/posts", form, Some(&author.token))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let form = MultipartForm::new()
        .text("title", "bad media type")
        .text("category_id", &category.to_string())
        .file("media", "notes.txt", "text/plain", b"not media");
    let response = app
        .send_multipart(Method::POST, "/api/v1/posts", form, Some(&author.token))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn gallery_lists_only_approved() {
    let app = app().await;
    let author = app.create_user("gallery_author", Role::User).await;
    let category = app.create_category("Gallery Only", "gallery-only").await;

    let approved = app
        .create_post(author.id, category, "shown", "approved")
        .await;
    let pending = app
        .create_post(author.id, category, "waiting", "pending")
        .await;
    let rejected = app
        .create_post(author.id, category, "refused", "rejected")
        .await;

    let response = app
        .get(&format!("/api/v1/posts?category_id={}", category), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    let ids: Vec<String> = body["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect();
    assert!(ids.contains(&approved.to_string()));
    assert!(!ids.contains(&pending.to_string()));
    assert!(!ids.contains(&rejected.to_string()));

    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["per_page"], 12);
    assert_eq!(body["pagination"]["pages"], 1);
}

#[tokio::test]
async fn gallery_search_matches_title_and_description() {
    let app = app().await;
    let author = app.create_user("search_author", Role::User).await;
    let category = app.create_category("Searchable", "searchable").await;

    let hit = app
        .create_post(author.id, category, "Xylograph Study", "approved")
        .await;
    app.create_post(author.id, category, "Unrelated", "approved")
        .await;

    let response = app
        .get(
            &format!("/api/v1/posts?category_id={}&q=xylograph", category),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let posts = response.json()["posts"].as_array().unwrap().to_vec();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["id"], hit.to_string());
}

#[tokio::test]
async fn gallery_sorts_by_popularity() {
    let app = app().await;
    let author = app.create_user("popular_author", Role::User).await;
    let fan_a = app.create_user("popular_fan_a", Role::User).await;
    let fan_b = app.create_user("popular_fan_b", Role::User).await;
    let category = app.create_category("Popular", "popular").await;

    let quiet = app
        .create_post(author.id, category, "quiet piece", "approved")
        .await;
    let hot = app
        .create_post(author.id, category, "hot piece", "approved")
        .await;
    app.create_like(fan_a.id, hot).await;
    app.create_like(fan_b.id, hot).await;

    let response = app
        .get(
            &format!(
                "/api/v1/posts?category_id={}&sort_by=popularity&sort_order=desc",
                category
            ),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let posts = response.json()["posts"].as_array().unwrap().to_vec();
    assert_eq!(posts[0]["id"], hot.to_string());
    assert_eq!(posts[0]["likes_count"], 2);
    assert_eq!(posts[1]["id"], quiet.to_string());
}

#[tokio::test]
async fn gallery_paginates() {
    let app = app().await;
    let author = app.create_user("paging_author", Role::User).await;
    let category = app.create_category("Paged", "paged").await;

    for n in 0..3 {
        app.create_post(author.id, category, &format!("piece {}", n), "approved")
            .await;
    }

    let response = app
        .get(
            &format!("/api/v1/posts?category_id={}&per_page=2", category),
            None,
        )
        .await;
    let body = response.json();
    assert_eq!(body["posts"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["pages"], 2);

    let response = app
        .get(
            &format!("/api/v1/posts?category_id={}&per_page=2&page=2", category),
            None,
        )
        .await;
    assert_eq!(response.json()["posts"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn gallery_rejects_bad_query_params() {
    let app = app().await;

    let response = app.get("/api/v1/posts?sort_by=rating", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.get("/api/v1/posts?sort_order=sideways", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.get("/api/v1/posts?page=0", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.get("/api/v1/posts?per_page=101", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    // an absurd page number is a clean 400, not an offset overflow
    let response = app
        .get("/api/v1/posts?page=9223372036854775807", None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn post_detail_visibility() {
    let app = app().await;
    let author = app.create_user("detail_author", Role::User).await;
    let stranger = app.create_user("detail_stranger", Role::User).await;
    let moderator = app.create_user("detail_mod", Role::Moderator).await;
    let category = app.create_category("Details", "details").await;

    let pending = app
        .create_post(author.id, category, "under review", "pending")
        .await;
    let path = format!("/api/v1/posts/{}", pending);

    assert_eq!(app.get(&path, None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.get(&path, Some(&stranger.token)).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.get(&path, Some(&author.token)).await.status,
        StatusCode::OK
    );
    assert_eq!(
        app.get(&path, Some(&moderator.token)).await.status,
        StatusCode::OK
    );

    let approved = app
        .create_post(author.id, category, "on display", "approved")
        .await;
    let response = app.get(&format!("/api/v1/posts/{}", approved), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["is_liked"], false);
}

#[tokio::test]
async fn update_post_is_author_or_moderator_only() {
    let app = app().await;
    let author = app.create_user("edit_author", Role::User).await;
    let stranger = app.create_user("edit_stranger", Role::User).await;
    let moderator = app.create_user("edit_mod", Role::Moderator).await;
    let category = app.create_category("Edits", "edits").await;

    let post = app
        .create_post(author.id, category, "first draft", "approved")
        .await;
    let path = format!("/api/v1/posts/{}", post);

    let response = app
        .put_json(&path, json!({ "title": "second draft" }), Some(&author.token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["title"], "second draft");

    let response = app
        .put_json(&path, json!({ "title": "hijacked" }), Some(&stranger.token))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .put_json(&path, json!({ "title": "cleaned up" }), Some(&moderator.token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn delete_post_removes_it() {
    let app = app().await;
    let author = app.create_user("delete_author", Role::User).await;
    let stranger = app.create_user("delete_stranger", Role::User).await;
    let category = app.create_category("Deletions", "deletions").await;

    let post = app
        .create_post(author.id, category, "short lived", "approved")
        .await;
    let path = format!("/api/v1/posts/{}", post);

    let response = app.delete(&path, Some(&stranger.token)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.delete(&path, Some(&author.token)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.get(&path, Some(&author.token)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
