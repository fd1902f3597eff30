//! Policy administration request handlers.

use axum::Json;
use axum::extract::{Path, State};

use crate::AppState;
use crate::error::AppResult;
use crate::models::{
    GrantRoleRequest, PolicyChangeResponse, PolicyListResponse, PolicyRuleDto, RolesResponse,
};
use crate::services::policies;

/// `GET /api/v1/policies` — list the rules loaded in the engine.
pub async fn list_policies_handler(
    State(state): State<AppState>,
) -> AppResult<Json<PolicyListResponse>> {
    Ok(Json(policies::list_rules(&state).await))
}

/// `POST /api/v1/policies` — add a rule.
pub async fn add_policy_handler(
    State(state): State<AppState>,
    Json(body): Json<PolicyRuleDto>,
) -> AppResult<Json<PolicyChangeResponse>> {
    let changed = policies::add_rule(&state, body).await?;
    Ok(Json(PolicyChangeResponse { changed }))
}

/// `DELETE /api/v1/policies` — remove a rule.
pub async fn remove_policy_handler(
    State(state): State<AppState>,
    Json(body): Json<PolicyRuleDto>,
) -> AppResult<Json<PolicyChangeResponse>> {
    let changed = policies::remove_rule(&state, body).await?;
    Ok(Json(PolicyChangeResponse { changed }))
}

/// `POST /api/v1/users/{userId}/roles` — grant a role to a user.
pub async fn grant_role_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<GrantRoleRequest>,
) -> AppResult<Json<RolesResponse>> {
    let roles = policies::grant_role(&state, &user_id, &body.role).await?;
    Ok(Json(RolesResponse { roles }))
}

/// `DELETE /api/v1/users/{userId}/roles/{role}` — revoke a role from a user.
pub async fn revoke_role_handler(
    State(state): State<AppState>,
    Path((user_id, role)): Path<(String, String)>,
) -> AppResult<Json<RolesResponse>> {
    let roles = policies::revoke_role(&state, &user_id, &role).await?;
    Ok(Json(RolesResponse { roles }))
}
