use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::JsonRejection,
        Multipart, Path, State,
    },
    http::StatusCode,
    Extension, Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        ListUsersResponse, MessageResponse, MonthlyUser, MonthlyUsersResponse, UpdateUserRequest,
        UploadResponse, UserEnvelope,
    },
    pagination::UserPage,
    repo_types::{User, UserChanges},
    stats::RoleCounts,
};
use crate::{
    auth::{
        guard::CurrentUser,
        handlers::is_valid_email,
        password,
    },
    error::AppError,
    images::services::{upload_profile_image, UploadItem},
    state::AppState,
};

const USER_NOT_FOUND: &str = "User not found";

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(USER_NOT_FOUND))
}

/// Listing with per-role totals. The page itself comes from the paginator.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    Extension(page): Extension<UserPage>,
) -> Result<Json<ListUsersResponse>, AppError> {
    let everyone = state.users.all().await?;
    let role_counts = RoleCounts::tally(&everyone);

    Ok(Json(ListUsersResponse {
        total_users: everyone.len(),
        role_counts,
        users: page.results,
        page: page.page,
        limit: page.limit,
        next: page.next,
        previous: page.previous,
    }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let id = parse_id(&id)?;
    state
        .users
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound(USER_NOT_FOUND))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserEnvelope>, AppError> {
    let id = parse_id(&id)?;
    let Json(payload) = payload?;

    let email = payload.email.map(|e| e.trim().to_lowercase());
    if let Some(email) = &email {
        if !is_valid_email(email) {
            return Err(AppError::Validation("Invalid email".into()));
        }
    }
    let password_hash = payload
        .password
        .as_deref()
        .map(password::hash_new)
        .transpose()?;
    let name = payload.name.map(|n| n.trim().to_string());
    if name.as_deref() == Some("") {
        return Err(AppError::Validation("Name is required".into()));
    }

    let changes = UserChanges {
        name,
        email,
        password_hash,
        role: payload.role,
    };
    let Some(user) = state.users.update(id, changes).await? else {
        return Err(AppError::NotFound(USER_NOT_FOUND));
    };

    info!(user_id = %user.id, "user updated");
    Ok(Json(UserEnvelope {
        message: "User updated successfully",
        data: user,
    }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id)?;
    if !state.users.delete(id).await? {
        return Err(AppError::NotFound(USER_NOT_FOUND));
    }
    info!(user_id = %id, "user deleted");
    Ok(Json(MessageResponse {
        message: "User deleted successfully",
    }))
}

/// Takes the `file` field of a multipart body as the caller's profile image.
#[instrument(skip(state, me, mp), fields(user_id = %me.id))]
pub async fn upload(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut mp = mp?;
    let mut image = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".into());
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        image = Some(UploadItem { body, content_type });
        break;
    }

    let Some(image) = image.filter(|i| !i.body.is_empty()) else {
        warn!("upload without file");
        return Err(AppError::Validation("No file uploaded".into()));
    };

    let record = upload_profile_image(&state, me.id, image).await?;
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "File uploaded successfully",
            data: record,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn by_month(
    State(state): State<AppState>,
    Path(month): Path<String>,
) -> Result<Json<MonthlyUsersResponse>, AppError> {
    let month = month
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| AppError::Validation("Month must be an integer from 1 to 12".into()))?;

    let users = state.users.created_in_month(month).await?;
    Ok(Json(MonthlyUsersResponse {
        data: users.into_iter().map(MonthlyUser::from).collect(),
    }))
}
