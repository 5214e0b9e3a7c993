/// User endpoints
///
/// # Endpoints
///
/// - `GET /api/user` - Caller's own profile
/// - `GET /api/users/search?email=` - Profiles with an exact email match
/// - `POST /api/users/me/groups/reconcile` - Rebuild the caller's group list

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskshare_shared::{auth::middleware::AuthContext, models::user::UserProfile};

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserProfile>,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub message: String,

    /// Group ids now recorded on the caller's user
    pub groups: Vec<String>,
}

/// Caller's own profile
pub async fn current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserResponse>> {
    let user = state.services.users.get_user(&auth.subject).await?;
    Ok(Json(UserResponse { user }))
}

/// Search users by email
///
/// A missing or blank `email` parameter is a `400`; no match is an empty list.
pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<UsersResponse>> {
    let users = state
        .services
        .users
        .search_users_by_email(&query.email)
        .await?;
    Ok(Json(UsersResponse { users }))
}

/// Re-derives the caller's `groups` from group membership
pub async fn reconcile_my_groups(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ReconcileResponse>> {
    let groups = state
        .services
        .membership
        .reconcile_user_groups(&auth.subject)
        .await?;

    Ok(Json(ReconcileResponse {
        message: "Groups reconciled".to_string(),
        groups,
    }))
}
