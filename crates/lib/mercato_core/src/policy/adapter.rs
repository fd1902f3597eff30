//! Persistence adapter for the policy engine.
//!
//! Implements the engine's [`Adapter`] contract on top of
//! [`PolicyRuleStore`]. Pure format conversion: rows in, model entries out,
//! and back. Policy semantics never live here.

use async_trait::async_trait;
use casbin::error::AdapterError;
use casbin::{Adapter, Error as CasbinError, Filter, Model, Result};
use sqlx::PgPool;
use tracing::debug;

use super::rule::PolicyRule;
use super::store::PolicyRuleStore;

/// Engine adapter backed by the `policy_rules` table.
pub struct PolicyAdapter {
    store: PolicyRuleStore,
    is_filtered: bool,
}

impl PolicyAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            store: PolicyRuleStore::new(pool),
            is_filtered: false,
        }
    }
}

fn adapter_err(err: sqlx::Error) -> CasbinError {
    CasbinError::from(AdapterError(Box::new(err)))
}

/// Section key for a rule: the first character of its ptype
/// (`"p"`, `"p2"` → `"p"`; `"g"` → `"g"`).
fn section_of(ptype: &str) -> Option<&str> {
    ptype.get(..1)
}

/// True when the rule survives the load filter: every non-empty filter value
/// must equal the rule value at the same position.
fn matches_filter(values: &[String], filter: &[&str]) -> bool {
    filter
        .iter()
        .enumerate()
        .all(|(i, f)| f.is_empty() || values.get(i).map(String::as_str) == Some(*f))
}

#[async_trait]
impl Adapter for PolicyAdapter {
    async fn load_policy(&mut self, m: &mut dyn Model) -> Result<()> {
        let rules = self.store.all().await.map_err(adapter_err)?;
        debug!(count = rules.len(), "loading policy rules");
        for rule in rules {
            let Some(sec) = section_of(&rule.ptype) else {
                continue;
            };
            m.add_policy(sec, &rule.ptype, rule.values);
        }
        self.is_filtered = false;
        Ok(())
    }

    async fn load_filtered_policy<'a>(&mut self, m: &mut dyn Model, f: Filter<'a>) -> Result<()> {
        let rules = self.store.all().await.map_err(adapter_err)?;
        for rule in rules {
            let Some(sec) = section_of(&rule.ptype) else {
                continue;
            };
            let filter = match sec {
                "p" => &f.p,
                "g" => &f.g,
                _ => continue,
            };
            if !matches_filter(&rule.values, filter) {
                continue;
            }
            m.add_policy(sec, &rule.ptype, rule.values);
        }
        self.is_filtered = true;
        Ok(())
    }

    /// Destructive replace: the stored rule set becomes exactly the model's
    /// current policy sections, atomically.
    async fn save_policy(&mut self, m: &mut dyn Model) -> Result<()> {
        let mut rules = Vec::new();
        for sec in ["p", "g"] {
            if let Some(ast_map) = m.get_model().get(sec) {
                for (ptype, ast) in ast_map {
                    rules.extend(
                        ast.get_policy()
                            .iter()
                            .map(|values| PolicyRule::new(ptype.as_str(), values.clone())),
                    );
                }
            }
        }
        debug!(count = rules.len(), "saving policy rules");
        self.store.replace_all(&rules).await.map_err(adapter_err)
    }

    async fn clear_policy(&mut self) -> Result<()> {
        self.store.clear().await.map_err(adapter_err)
    }

    fn is_filtered(&self) -> bool {
        self.is_filtered
    }

    async fn add_policy(&mut self, _sec: &str, ptype: &str, rule: Vec<String>) -> Result<bool> {
        self.store.add(ptype, rule);
        self.store.flush().await.map_err(adapter_err)?;
        Ok(true)
    }

    async fn add_policies(
        &mut self,
        _sec: &str,
        ptype: &str,
        rules: Vec<Vec<String>>,
    ) -> Result<bool> {
        for rule in rules {
            self.store.add(ptype, rule);
        }
        self.store.flush().await.map_err(adapter_err)?;
        Ok(true)
    }

    async fn remove_policy(&mut self, _sec: &str, ptype: &str, rule: Vec<String>) -> Result<bool> {
        self.store.remove(ptype, &rule).await.map_err(adapter_err)
    }

    async fn remove_policies(
        &mut self,
        _sec: &str,
        ptype: &str,
        rules: Vec<Vec<String>>,
    ) -> Result<bool> {
        let mut all_removed = true;
        for rule in rules {
            all_removed &= self.store.remove(ptype, &rule).await.map_err(adapter_err)?;
        }
        Ok(all_removed)
    }

    async fn remove_filtered_policy(
        &mut self,
        _sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: Vec<String>,
    ) -> Result<bool> {
        self.store
            .remove_filtered(ptype, field_index, &field_values)
            .await
            .map_err(adapter_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_is_first_ptype_character() {
        assert_eq!(section_of("p"), Some("p"));
        assert_eq!(section_of("p2"), Some("p"));
        assert_eq!(section_of("g"), Some("g"));
        assert_eq!(section_of(""), None);
    }

    #[test]
    fn empty_filter_values_are_wildcards() {
        let values: Vec<String> = ["admin", "/x", "GET"].map(String::from).into();
        assert!(matches_filter(&values, &[]));
        assert!(matches_filter(&values, &["", "/x"]));
        assert!(matches_filter(&values, &["admin", "", "GET"]));
        assert!(!matches_filter(&values, &["admin", "/y"]));
        assert!(!matches_filter(&values, &["admin", "/x", "GET", "extra"]));
    }
}
