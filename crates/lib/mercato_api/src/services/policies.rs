//! Policy administration service.
//!
//! All writes go through the shared enforcer so the in-memory model and the
//! stored rules change in the same call; readers holding the read lock never
//! observe a half-applied edit.

use casbin::MgmtApi;
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{PolicyListResponse, PolicyRuleDto};
use mercato_core::auth::queries;
use mercato_core::policy::rule::PolicyRule;

/// Token counts the model expects per rule kind.
const PERMISSION_RULE_FIELDS: usize = 4; // sub, obj, act, scope
const GROUPING_RULE_FIELDS: usize = 2; // member, role

/// List every rule currently loaded in the engine.
pub async fn list_rules(state: &AppState) -> PolicyListResponse {
    let enforcer = state.enforcer.read().await;
    let mut rules = Vec::new();
    for values in enforcer.get_policy() {
        rules.push(PolicyRuleDto {
            ptype: "p".to_string(),
            values,
        });
    }
    for values in enforcer.get_grouping_policy() {
        rules.push(PolicyRuleDto {
            ptype: "g".to_string(),
            values,
        });
    }
    let lines = rules
        .iter()
        .map(|dto| PolicyRule::new(dto.ptype.as_str(), dto.values.clone()).to_policy_line())
        .collect();
    PolicyListResponse { rules, lines }
}

fn validate_rule(dto: &PolicyRuleDto) -> AppResult<()> {
    let expected = match dto.ptype.as_str() {
        "p" => PERMISSION_RULE_FIELDS,
        "g" => GROUPING_RULE_FIELDS,
        other => {
            return Err(AppError::Validation(format!(
                "Unsupported rule type '{other}'"
            )));
        }
    };
    if dto.values.len() != expected {
        return Err(AppError::Validation(format!(
            "Rule type '{}' takes exactly {expected} values",
            dto.ptype
        )));
    }
    if dto.values.iter().any(|v| v.is_empty()) {
        return Err(AppError::Validation("Rule values must be non-empty".into()));
    }
    Ok(())
}

/// Add a rule. Returns false when the rule already existed.
pub async fn add_rule(state: &AppState, dto: PolicyRuleDto) -> AppResult<bool> {
    validate_rule(&dto)?;
    let mut enforcer = state.enforcer.write().await;
    let added = match dto.ptype.as_str() {
        "p" => enforcer.add_policy(dto.values.clone()).await?,
        _ => enforcer.add_grouping_policy(dto.values.clone()).await?,
    };
    if added {
        info!(rule = %PolicyRule::new(dto.ptype.as_str(), dto.values).to_policy_line(), "policy rule added");
    }
    Ok(added)
}

/// Remove a rule. Returns false when no such rule was loaded.
pub async fn remove_rule(state: &AppState, dto: PolicyRuleDto) -> AppResult<bool> {
    validate_rule(&dto)?;
    let mut enforcer = state.enforcer.write().await;
    let removed = match dto.ptype.as_str() {
        "p" => enforcer.remove_policy(dto.values.clone()).await?,
        _ => enforcer.remove_grouping_policy(dto.values.clone()).await?,
    };
    if removed {
        info!(rule = %PolicyRule::new(dto.ptype.as_str(), dto.values).to_policy_line(), "policy rule removed");
    }
    Ok(removed)
}

/// Grant a role to a user: a `user_roles` row plus a `g` link in the engine.
pub async fn grant_role(state: &AppState, user_id: &str, role: &str) -> AppResult<Vec<String>> {
    let role = state
        .catalog
        .assert_allowed(std::slice::from_ref(&role))?
        .remove(0);

    queries::get_user_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No user with id {user_id}")))?;

    queries::grant_role(&state.pool, user_id, &role).await?;
    state
        .enforcer
        .write()
        .await
        .add_grouping_policy(vec![user_id.to_string(), role.clone()])
        .await?;
    info!(user_id, %role, "role granted");

    let roles = queries::get_user_roles(&state.pool, user_id).await?;
    Ok(state.catalog.normalize(&roles))
}

/// Revoke a role from a user, removing both the row and the `g` link.
pub async fn revoke_role(state: &AppState, user_id: &str, role: &str) -> AppResult<Vec<String>> {
    let role = state
        .catalog
        .assert_allowed(std::slice::from_ref(&role))?
        .remove(0);

    queries::revoke_role(&state.pool, user_id, &role).await?;
    state
        .enforcer
        .write()
        .await
        .remove_grouping_policy(vec![user_id.to_string(), role.clone()])
        .await?;
    info!(user_id, %role, "role revoked");

    let roles = queries::get_user_roles(&state.pool, user_id).await?;
    Ok(state.catalog.normalize(&roles))
}
