mod common;

use axum::http::StatusCode;
use atelier::domain::user::Role;
use serde_json::json;

use common::app;

#[tokio::test]
async fn queue_requires_moderator() {
    let app = app().await;
    let user = app.create_user("queue_user", Role::User).await;

    let response = app.get("/api/v1/moderation/posts", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app
        .get("/api/v1/moderation/posts", Some(&user.token))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn queue_lists_pending_posts() {
    let app = app().await;
    let author = app.create_user("queue_author", Role::User).await;
    let moderator = app.create_user("queue_mod", Role::Moderator).await;
    let category = app.create_category("Queue", "queue").await;

    let pending = app
        .create_post(author.id, category, "awaiting review", "pending")
        .await;
    let approved = app
        .create_post(author.id, category, "already reviewed", "approved")
        .await;

    let response = app
        .get("/api/v1/moderation/posts?per_page=100", Some(&moderator.token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let ids: Vec<String> = response.json()["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect();
    assert!(ids.contains(&pending.to_string()));
    assert!(!ids.contains(&approved.to_string()));
}

#[tokio::test]
async fn approve_publishes_the_post() {
    let app = app().await;
    let author = app.create_user("approve_author", Role::User).await;
    let moderator = app.create_user("approve_mod", Role::Moderator).await;
    let category = app.create_category("Approvals", "approvals").await;
    let post = app
        .create_post(author.id, category, "worthy piece", "pending")
        .await;

    let response = app
        .put_json(
            &format!("/api/v1/moderation/posts/{}", post),
            json!({ "status": "approved" }),
            Some(&moderator.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    // now publicly visible
    let response = app.get(&format!("/api/v1/posts/{}", post), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["status"], "approved");

    let response = app
        .get(&format!("/api/v1/posts?category_id={}", category), None)
        .await;
    let ids: Vec<String> = response.json()["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect();
    assert!(ids.contains(&post.to_string()));
}

#[tokio::test]
async fn reject_requires_reason_and_hides_the_post() {
    let app = app().await;
    let author = app.create_user("reject_author", Role::User).await;
    let moderator = app.create_user("reject_mod", Role::Moderator).await;
    let category = app.create_category("Rejections", "rejections").await;
    let post = app
        .create_post(author.id, category, "unfinished piece", "pending")
        .await;
    let decide_path = format!("/api/v1/moderation/posts/{}", post);

    // missing and blank reasons are both refused
    let response = app
        .put_json(&decide_path, json!({ "status": "rejected" }), Some(&moderator.token))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let response = app
        .put_json(
            &decide_path,
            json!({ "status": "rejected", "reason": "  " }),
            Some(&moderator.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .put_json(
            &decide_path,
            json!({ "status": "rejected", "reason": "blurry image" }),
            Some(&moderator.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    // hidden from everyone but the author, who sees the reason
    let detail_path = format!("/api/v1/posts/{}", post);
    assert_eq!(app.get(&detail_path, None).await.status, StatusCode::NOT_FOUND);

    let response = app.get(&detail_path, Some(&author.token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["status"], "rejected");
    assert_eq!(response.json()["reject_reason"], "blurry image");
}

#[tokio::test]
async fn decisions_are_final() {
    let app = app().await;
    let author = app.create_user("final_author", Role::User).await;
    let moderator = app.create_user("final_mod", Role::Moderator).await;
    let category = app.create_category("Finality", "finality").await;
    let post = app
        .create_post(author.id, category, "decided piece", "pending")
        .await;
    let path = format!("/api/v1/moderation/posts/{}", post);

    let response = app
        .put_json(&path, json!({ "status": "approved" }), Some(&moderator.token))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .put_json(
            &path,
            json!({ "status": "rejected", "reason": "changed my mind" }),
            Some(&moderator.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn decide_validates_input() {
    let app = app().await;
    let user = app.create_user("decide_user", Role::User).await;
    let moderator = app.create_user("decide_mod", Role::Moderator).await;
    let author = app.create_user("decide_author", Role::User).await;
    let category = app.create_category("Decisions", "decisions").await;
    let post = app
        .create_post(author.id, category, "undecided piece", "pending")
        .await;
    let path = format!("/api/v1/moderation/posts/{}", post);

    // a decision cannot send a post back to pending
    let response = app
        .put_json(&path, json!({ "status": "pending" }), Some(&moderator.token))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .put_json(&path, json!({ "status": "approved" }), Some(&user.token))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .put_json(
            "/api/v1/moderation/posts/00000000-0000-0000-0000-000000000000",
            json!({ "status": "approved" }),
            Some(&moderator.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn category_management_is_moderator_only() {
    let app = app().await;
    let user = app.create_user("cat_user", Role::User).await;
    let moderator = app.create_user("cat_mod", Role::Moderator).await;

    let response = app
        .post_json(
            "/api/v1/moderation/categories",
            json!({ "name": "Pixel Art" }),
            Some(&user.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .post_json(
            "/api/v1/moderation/categories",
            json!({ "name": "Pixel Art" }),
            Some(&moderator.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let category_id = response.json()["id"].as_str().unwrap().to_string();
    assert_eq!(response.json()["slug"], "pixel-art");

    // duplicate slug
    let response = app
        .post_json(
            "/api/v1/moderation/categories",
            json!({ "name": "Pixel art" }),
            Some(&moderator.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    // publicly listed
    let response = app.get("/api/v1/categories", None).await;
    assert_eq!(response.status, StatusCode::OK);
    let names: Vec<String> = response
        .json()
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect();
    assert!(names.contains(&"Pixel Art".to_string()));

    let response = app
        .put_json(
            &format!("/api/v1/moderation/categories/{}", category_id),
            json!({ "name": "Pixel Works" }),
            Some(&moderator.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["slug"], "pixel-works");

    let response = app
        .delete(
            &format!("/api/v1/moderation/categories/{}", category_id),
            Some(&moderator.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn category_in_use_cannot_be_deleted() {
    let app = app().await;
    let author = app.create_user("cat_inuse_author", Role::User).await;
    let moderator = app.create_user("cat_inuse_mod", Role::Moderator).await;
    let category = app.create_category("Occupied", "occupied").await;
    app.create_post(author.id, category, "occupying piece", "approved")
        .await;

    let response = app
        .delete(
            &format!("/api/v1/moderation/categories/{}", category),
            Some(&moderator.token),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}
