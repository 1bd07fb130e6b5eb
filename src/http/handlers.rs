use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::auth::AuthService;
use crate::app::categories::CategoryService;
use crate::app::engagement::EngagementService;
use crate::app::moderation::{DecisionOutcome, ModerationService};
use crate::app::posts::{PostFilter, PostService, PostSort, SortOrder};
use crate::app::users::{ProfileUpdate, UserService};
use crate::domain::post::{MediaType, Post, PostStatus};
use crate::domain::user::PublicUser;
use crate::http::auth::{AuthUser, MaybeAuthUser, Moderator};
use crate::http::AppError;
use crate::infra::storage;
use crate::AppState;

const MAX_TITLE_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 5000;
const MAX_COMMENT_LEN: usize = 500;
const MAX_PER_PAGE: i64 = 100;
const DEFAULT_PER_PAGE: i64 = 12;
// keeps (page - 1) * per_page far away from i64 overflow
const MAX_PAGE: i64 = 1_000_000;

// ---------------------------------------------------------------------------
// health

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    match state.db.ping().await {
        Ok(()) => Json(json!({ "status": "ok" })),
        Err(err) => {
            tracing::error!(error = %err, "database ping failed");
            Json(json!({ "status": "degraded" }))
        }
    }
}

// ---------------------------------------------------------------------------
// auth

#[derive(Deserialize)]
pub struct SignUpRequest {
    pub username: String,
    pub nickname: Option<String>,
    pub email: String,
    pub password: String,
    pub confirm_password: Option<String>,
}

#[derive(Serialize)]
pub struct SignUpResponse {
    pub id: Uuid,
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(body): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<SignUpResponse>), AppError> {
    validate_username(&body.username)?;
    validate_email(&body.email)?;
    if !(6..=64).contains(&body.password.chars().count()) {
        return Err(AppError::bad_request(
            "password must be between 6 and 64 characters",
        ));
    }
    if let Some(confirm) = &body.confirm_password {
        if *confirm != body.password {
            return Err(AppError::bad_request("passwords do not match"));
        }
    }

    let nickname = match body.nickname {
        Some(nickname) if !nickname.trim().is_empty() => nickname.trim().to_string(),
        _ => body.username.clone(),
    };
    validate_nickname(&nickname)?;

    let service = auth_service(&state);
    let id = service
        .signup(
            body.username,
            nickname,
            body.email.trim().to_lowercase(),
            body.password,
        )
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                AppError::conflict("username or email already taken")
            } else {
                tracing::error!(error = %err, "failed to sign up");
                AppError::internal("failed to sign up")
            }
        })?;

    Ok((StatusCode::CREATED, Json(SignUpResponse { id })))
}

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(body): Json<SignInRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let service = auth_service(&state);
    let issued = service
        .login(&body.email.trim().to_lowercase(), &body.password)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to sign in");
            AppError::internal("failed to sign in")
        })?
        .ok_or_else(|| AppError::unauthorized("invalid email or password"))?;

    Ok(Json(TokenResponse {
        token: issued.token,
        expires_at: issued.expires_at,
    }))
}

// ---------------------------------------------------------------------------
// users

pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<crate::domain::user::User>, AppError> {
    let service = UserService::new(state.db.clone());
    let profile = service
        .get_user(user.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to load profile");
            AppError::internal("failed to load profile")
        })?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    Ok(Json(profile))
}

#[derive(Deserialize, Default)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub description: Option<String>,
    pub vk_link: Option<String>,
    pub telegram_link: Option<String>,
}

pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<crate::domain::user::User>, AppError> {
    if let Some(username) = &body.username {
        if !username.is_empty() {
            validate_username(username)?;
        }
    }
    if let Some(nickname) = &body.nickname {
        if !nickname.is_empty() {
            validate_nickname(nickname)?;
        }
    }

    let service = UserService::new(state.db.clone());
    let update = ProfileUpdate {
        username: body.username,
        nickname: body.nickname,
        description: body.description,
        vk_link: body.vk_link,
        telegram_link: body.telegram_link,
    };
    let profile = service
        .update_profile(user.user_id, update)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                AppError::conflict("username already taken")
            } else {
                tracing::error!(error = %err, "failed to update profile");
                AppError::internal("failed to update profile")
            }
        })?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    Ok(Json(profile))
}

pub async fn update_avatar(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<crate::domain::user::User>, AppError> {
    let mut avatar: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        tracing::error!(error = %err, "failed to read multipart field");
        AppError::bad_request("invalid multipart body")
    })? {
        if field.name() != Some("avatar") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|value| value.to_string())
            .ok_or_else(|| AppError::bad_request("avatar must have a content type"))?;
        let data = field.bytes().await.map_err(|err| {
            tracing::error!(error = %err, "failed to read avatar upload");
            AppError::bad_request("invalid multipart body")
        })?;
        avatar = Some((content_type, data.to_vec()));
    }

    let (content_type, data) =
        avatar.ok_or_else(|| AppError::bad_request("missing avatar field"))?;
    if !storage::is_image(&content_type) {
        return Err(AppError::bad_request("avatar must be an image"));
    }
    if data.len() > state.avatar_max_bytes {
        return Err(AppError::bad_request("avatar is too large"));
    }

    let avatar_path = state
        .storage
        .save("avatars", &content_type, &data)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to store avatar");
            AppError::internal("failed to store avatar")
        })?;

    let service = UserService::new(state.db.clone());
    let (profile, old_avatar) = service
        .update_avatar(user.user_id, &avatar_path)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to update avatar");
            AppError::internal("failed to update avatar")
        })?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    if let Some(old_avatar) = old_avatar {
        if let Err(err) = state.storage.delete(&old_avatar).await {
            tracing::warn!(error = %err, path = %old_avatar, "failed to remove old avatar");
        }
    }

    Ok(Json(profile))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<PublicUser>, AppError> {
    let service = UserService::new(state.db.clone());
    let profile = service
        .get_user(user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to load profile");
            AppError::internal("failed to load profile")
        })?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    Ok(Json(PublicUser::from(profile)))
}

pub async fn list_user_posts(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(query): Query<GalleryQuery>,
) -> Result<Json<PostListResponse>, AppError> {
    let filter = query.into_filter()?;
    let include_hidden = viewer
        .map(|viewer| viewer.user_id == user_id || viewer.role.can_moderate())
        .unwrap_or(false);

    let service = PostService::new(state.db.clone());
    let (posts, total) = service
        .list_by_author(
            user_id,
            viewer.map(|viewer| viewer.user_id),
            include_hidden,
            &filter,
        )
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to list user posts");
            AppError::internal("failed to list posts")
        })?;

    Ok(Json(PostListResponse::new(posts, total, &filter)))
}

pub async fn list_my_likes(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<GalleryQuery>,
) -> Result<Json<PostListResponse>, AppError> {
    let filter = query.into_filter()?;
    let service = PostService::new(state.db.clone());
    let (posts, total) = service
        .list_liked_by(user.user_id, &filter)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to list liked posts");
            AppError::internal("failed to list posts")
        })?;
    Ok(Json(PostListResponse::new(posts, total, &filter)))
}

// ---------------------------------------------------------------------------
// posts

#[derive(Deserialize, Default)]
pub struct GalleryQuery {
    pub category_id: Option<Uuid>,
    pub q: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl GalleryQuery {
    fn into_filter(self) -> Result<PostFilter, AppError> {
        let sort_by = match self.sort_by.as_deref() {
            None | Some("date") => PostSort::Date,
            Some("popularity") => PostSort::Popularity,
            Some(other) => {
                return Err(AppError::bad_request(format!(
                    "unknown sort_by: {}",
                    other
                )))
            }
        };
        let sort_order = match self.sort_order.as_deref() {
            None | Some("desc") => SortOrder::Desc,
            Some("asc") => SortOrder::Asc,
            Some(other) => {
                return Err(AppError::bad_request(format!(
                    "unknown sort_order: {}",
                    other
                )))
            }
        };
        let (page, per_page) = validate_page(self.page, self.per_page)?;

        Ok(PostFilter {
            category_id: self.category_id,
            search: self
                .q
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
            sort_by,
            sort_order,
            page,
            per_page,
        })
    }
}

#[derive(Serialize)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub pages: i64,
}

#[derive(Serialize)]
pub struct PostListResponse {
    pub posts: Vec<Post>,
    pub pagination: Pagination,
}

impl PostListResponse {
    fn new(posts: Vec<Post>, total: i64, filter: &PostFilter) -> Self {
        Self {
            posts,
            pagination: Pagination {
                total,
                page: filter.page,
                per_page: filter.per_page,
                pages: (total + filter.per_page - 1) / filter.per_page,
            },
        }
    }
}

pub async fn list_posts(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(query): Query<GalleryQuery>,
) -> Result<Json<PostListResponse>, AppError> {
    let filter = query.into_filter()?;
    let service = PostService::new(state.db.clone());
    let (posts, total) = service
        .list_public(viewer.map(|viewer| viewer.user_id), &filter)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to list posts");
            AppError::internal("failed to list posts")
        })?;
    Ok(Json(PostListResponse::new(posts, total, &filter)))
}

pub async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut category_id: Option<Uuid> = None;
    let mut media: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        tracing::error!(error = %err, "failed to read multipart field");
        AppError::bad_request("invalid multipart body")
    })? {
        match field.name() {
            Some("title") => title = Some(read_text_field(field).await?),
            Some("description") => description = Some(read_text_field(field).await?),
            Some("category_id") => {
                let raw = read_text_field(field).await?;
                let id = Uuid::parse_str(raw.trim())
                    .map_err(|_| AppError::bad_request("category_id must be a UUID"))?;
                category_id = Some(id);
            }
            Some("media") => {
                let content_type = field
                    .content_type()
                    .map(|value| value.to_string())
                    .ok_or_else(|| AppError::bad_request("media must have a content type"))?;
                let data = field.bytes().await.map_err(|err| {
                    tracing::error!(error = %err, "failed to read media upload");
                    AppError::bad_request("invalid multipart body")
                })?;
                media = Some((content_type, data.to_vec()));
            }
            _ => {}
        }
    }

    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::bad_request("missing title field"))?;
    validate_title(&title)?;
    let description = description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .ok_or_else(|| AppError::bad_request("missing description field"))?;
    validate_description(&description)?;
    let category_id =
        category_id.ok_or_else(|| AppError::bad_request("missing category_id field"))?;
    let (content_type, data) =
        media.ok_or_else(|| AppError::bad_request("missing media field"))?;

    let media_type = if storage::is_image(&content_type) {
        MediaType::Image
    } else if storage::is_video(&content_type) {
        MediaType::Video
    } else {
        return Err(AppError::bad_request("media must be an image or a video"));
    };
    if data.is_empty() {
        return Err(AppError::bad_request("media file is empty"));
    }
    if data.len() > state.upload_max_bytes {
        return Err(AppError::bad_request("media file is too large"));
    }

    let media_path = state
        .storage
        .save("posts", &content_type, &data)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to store media");
            AppError::internal("failed to store media")
        })?;

    let service = PostService::new(state.db.clone());
    let post = service
        .create_post(
            user.user_id,
            category_id,
            title,
            description,
            media_path.clone(),
            media_type,
        )
        .await
        .map_err(|err| {
            if err.to_string().contains("category not found") {
                AppError::bad_request("category not found")
            } else {
                tracing::error!(error = %err, "failed to create post");
                AppError::internal("failed to create post")
            }
        });

    let post = match post {
        Ok(post) => post,
        Err(app_err) => {
            if let Err(err) = state.storage.delete(&media_path).await {
                tracing::warn!(error = %err, path = %media_path, "failed to remove orphaned media");
            }
            return Err(app_err);
        }
    };

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    MaybeAuthUser(viewer): MaybeAuthUser,
) -> Result<Json<Post>, AppError> {
    let service = PostService::new(state.db.clone());
    let post = service
        .get_post(
            post_id,
            viewer.map(|viewer| viewer.user_id),
            viewer.map(|viewer| viewer.role.can_moderate()).unwrap_or(false),
        )
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to load post");
            AppError::internal("failed to load post")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))?;
    Ok(Json(post))
}

#[derive(Deserialize, Default)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    user: AuthUser,
    Json(body): Json<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    if let Some(title) = &body.title {
        if !title.is_empty() {
            validate_title(title)?;
        }
    }
    if let Some(description) = &body.description {
        if !description.is_empty() {
            validate_description(description)?;
        }
    }

    let service = PostService::new(state.db.clone());
    let post = service
        .update_post(
            post_id,
            user.user_id,
            user.role.can_moderate(),
            body.title,
            body.description,
            body.category_id,
        )
        .await
        .map_err(|err| {
            if err.to_string().contains("category not found") {
                AppError::bad_request("category not found")
            } else {
                tracing::error!(error = %err, "failed to update post");
                AppError::internal("failed to update post")
            }
        })?
        .ok_or_else(|| AppError::not_found("post not found"))?;
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    user: AuthUser,
) -> Result<StatusCode, AppError> {
    let service = PostService::new(state.db.clone());
    let media_path = service
        .delete_post(post_id, user.user_id, user.role.can_moderate())
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to delete post");
            AppError::internal("failed to delete post")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    if let Err(err) = state.storage.delete(&media_path).await {
        tracing::warn!(error = %err, path = %media_path, "failed to remove post media");
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// likes and comments

pub async fn like_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    user: AuthUser,
) -> Result<Json<crate::domain::engagement::LikeState>, AppError> {
    let service = EngagementService::new(state.db.clone());
    let likes = service
        .like_post(user.user_id, post_id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to like post");
            AppError::internal("failed to like post")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))?;
    Ok(Json(likes))
}

pub async fn unlike_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    user: AuthUser,
) -> Result<Json<crate::domain::engagement::LikeState>, AppError> {
    let service = EngagementService::new(state.db.clone());
    let likes = service
        .unlike_post(user.user_id, post_id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to unlike post");
            AppError::internal("failed to unlike post")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))?;
    Ok(Json(likes))
}

#[derive(Serialize)]
pub struct CommentListResponse {
    pub comments: Vec<crate::domain::engagement::Comment>,
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<CommentListResponse>, AppError> {
    let service = EngagementService::new(state.db.clone());
    let comments = service
        .list_comments(post_id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to list comments");
            AppError::internal("failed to list comments")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))?;
    Ok(Json(CommentListResponse { comments }))
}

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    user: AuthUser,
    Json(body): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<crate::domain::engagement::Comment>), AppError> {
    let content = body.content.trim().to_string();
    if content.is_empty() {
        return Err(AppError::bad_request("comment must not be empty"));
    }
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::bad_request("comment is too long"));
    }

    let service = EngagementService::new(state.db.clone());
    let comment = service
        .create_comment(user.user_id, post_id, content)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to create comment");
            AppError::internal("failed to create comment")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    user: AuthUser,
) -> Result<StatusCode, AppError> {
    let service = EngagementService::new(state.db.clone());
    let deleted = service
        .delete_comment(comment_id, post_id, user.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to delete comment");
            AppError::internal("failed to delete comment")
        })?;
    if !deleted {
        return Err(AppError::not_found("comment not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// moderation

#[derive(Deserialize, Default)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub async fn list_pending_posts(
    State(state): State<AppState>,
    Moderator(_): Moderator,
    Query(query): Query<PageQuery>,
) -> Result<Json<PostListResponse>, AppError> {
    let (page, per_page) = validate_page(query.page, query.per_page)?;
    let service = ModerationService::new(state.db.clone());
    let (posts, total) = service.list_pending(page, per_page).await.map_err(|err| {
        tracing::error!(error = %err, "failed to list pending posts");
        AppError::internal("failed to list posts")
    })?;

    Ok(Json(PostListResponse {
        posts,
        pagination: Pagination {
            total,
            page,
            per_page,
            pages: (total + per_page - 1) / per_page,
        },
    }))
}

#[derive(Deserialize)]
pub struct DecisionRequest {
    pub status: String,
    pub reason: Option<String>,
}

pub async fn decide_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Moderator(_): Moderator,
    Json(body): Json<DecisionRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let status = match body.status.as_str() {
        "approved" => PostStatus::Approved,
        "rejected" => PostStatus::Rejected,
        other => {
            return Err(AppError::bad_request(format!(
                "status must be approved or rejected, got {}",
                other
            )))
        }
    };

    let reason = match status {
        PostStatus::Rejected => {
            let reason = body
                .reason
                .map(|reason| reason.trim().to_string())
                .filter(|reason| !reason.is_empty())
                .ok_or_else(|| AppError::bad_request("rejection requires a reason"))?;
            Some(reason)
        }
        _ => None,
    };

    let service = ModerationService::new(state.db.clone());
    let outcome = service
        .decide(post_id, status, reason)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to apply moderation decision");
            AppError::internal("failed to apply decision")
        })?;

    match outcome {
        DecisionOutcome::Applied => Ok(Json(json!({ "status": status }))),
        DecisionOutcome::AlreadyDecided => Err(AppError::conflict("post already decided")),
        DecisionOutcome::NotFound => Err(AppError::not_found("post not found")),
    }
}

// ---------------------------------------------------------------------------
// categories

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<crate::domain::category::Category>>, AppError> {
    let service = CategoryService::new(state.db.clone());
    let categories = service.list().await.map_err(|err| {
        tracing::error!(error = %err, "failed to list categories");
        AppError::internal("failed to list categories")
    })?;
    Ok(Json(categories))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<Json<crate::domain::category::Category>, AppError> {
    let service = CategoryService::new(state.db.clone());
    let category = service
        .get(category_id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to load category");
            AppError::internal("failed to load category")
        })?
        .ok_or_else(|| AppError::not_found("category not found"))?;
    Ok(Json(category))
}

#[derive(Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

pub async fn create_category(
    State(state): State<AppState>,
    Moderator(_): Moderator,
    Json(body): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<crate::domain::category::Category>), AppError> {
    let name = validate_category_name(&body.name)?;
    let service = CategoryService::new(state.db.clone());
    let category = service.create(name).await.map_err(|err| {
        if is_unique_violation(&err) {
            AppError::conflict("category already exists")
        } else {
            tracing::error!(error = %err, "failed to create category");
            AppError::internal("failed to create category")
        }
    })?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Moderator(_): Moderator,
    Json(body): Json<CategoryRequest>,
) -> Result<Json<crate::domain::category::Category>, AppError> {
    let name = validate_category_name(&body.name)?;
    let service = CategoryService::new(state.db.clone());
    let category = service
        .update(category_id, name)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                AppError::conflict("category already exists")
            } else {
                tracing::error!(error = %err, "failed to update category");
                AppError::internal("failed to update category")
            }
        })?
        .ok_or_else(|| AppError::not_found("category not found"))?;
    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Moderator(_): Moderator,
) -> Result<StatusCode, AppError> {
    let service = CategoryService::new(state.db.clone());
    let deleted = service.delete(category_id).await.map_err(|err| {
        if is_foreign_key_violation(&err) {
            AppError::conflict("category is still in use")
        } else {
            tracing::error!(error = %err, "failed to delete category");
            AppError::internal("failed to delete category")
        }
    })?;
    if !deleted {
        return Err(AppError::not_found("category not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// helpers

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(state.db.clone(), state.paseto_key, state.token_ttl_hours)
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|_| AppError::bad_request("invalid multipart body"))
}

fn validate_page(page: Option<i64>, per_page: Option<i64>) -> Result<(i64, i64), AppError> {
    let page = page.unwrap_or(1);
    if !(1..=MAX_PAGE).contains(&page) {
        return Err(AppError::bad_request("page is out of range"));
    }
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE);
    if !(1..=MAX_PER_PAGE).contains(&per_page) {
        return Err(AppError::bad_request("per_page must be between 1 and 100"));
    }
    Ok((page, per_page))
}

fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err(AppError::bad_request(
            "username must be between 3 and 50 characters",
        ));
    }
    if !username
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        return Err(AppError::bad_request(
            "username may only contain letters, digits and underscores",
        ));
    }
    Ok(())
}

fn validate_nickname(nickname: &str) -> Result<(), AppError> {
    if !(3..=50).contains(&nickname.chars().count()) {
        return Err(AppError::bad_request(
            "nickname must be between 3 and 50 characters",
        ));
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), AppError> {
    if !(3..=MAX_TITLE_LEN).contains(&title.chars().count()) {
        return Err(AppError::bad_request(
            "title must be between 3 and 100 characters",
        ));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), AppError> {
    if !(3..=MAX_DESCRIPTION_LEN).contains(&description.chars().count()) {
        return Err(AppError::bad_request(
            "description must be between 3 and 5000 characters",
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    let valid = email.len() >= 5
        && email.len() <= 254
        && email.split('@').count() == 2
        && !email.starts_with('@')
        && !email.ends_with('@')
        && email.rsplit('@').next().map(|domain| domain.contains('.')).unwrap_or(false);
    if !valid {
        return Err(AppError::bad_request("invalid email address"));
    }
    Ok(())
}

fn validate_category_name(name: &str) -> Result<String, AppError> {
    let name = name.trim().to_string();
    if !(2..=50).contains(&name.chars().count()) {
        return Err(AppError::bad_request(
            "category name must be between 2 and 50 characters",
        ));
    }
    Ok(name)
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    db_error_code(err).as_deref() == Some("23505")
}

fn is_foreign_key_violation(err: &anyhow::Error) -> bool {
    db_error_code(err).as_deref() == Some("23503")
}

fn db_error_code(err: &anyhow::Error) -> Option<String> {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|err| err.as_database_error())
        .and_then(|db| db.code())
        .map(|code| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::{validate_email, validate_page, validate_username};

    #[test]
    fn username_rules() {
        assert!(validate_username("lena_01").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn email_shape() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("two@@signs.com").is_err());
    }

    #[test]
    fn page_bounds() {
        assert_eq!(validate_page(None, None).unwrap(), (1, 12));
        assert!(validate_page(Some(0), None).is_err());
        assert!(validate_page(None, Some(101)).is_err());
        // huge pages are refused before any offset arithmetic can overflow
        assert!(validate_page(Some(i64::MAX), None).is_err());
        assert!(validate_page(Some(1_000_001), Some(100)).is_err());
    }
}
