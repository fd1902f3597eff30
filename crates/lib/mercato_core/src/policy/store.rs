//! Relational storage for policy rules.
//!
//! All matching here is exact per position — absent positions must be NULL in
//! the row. Pattern semantics (wildcards in rule *values*, role inheritance)
//! are the engine's business, not the store's.
//!
//! Errors surface as raw `sqlx::Error`; callers own retry and transaction
//! policy beyond what the batched operations do themselves.

use sqlx::PgPool;

use super::rule::{MAX_RULE_FIELDS, PolicyRule};

const INSERT_RULE: &str =
    "INSERT INTO policy_rules (ptype, v0, v1, v2, v3, v4, v5) VALUES ($1, $2, $3, $4, $5, $6, $7)";

/// CRUD over the `policy_rules` table with a staging buffer for batched
/// inserts.
pub struct PolicyRuleStore {
    pool: PgPool,
    staged: Vec<PolicyRule>,
}

impl PolicyRuleStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            staged: Vec::new(),
        }
    }

    /// Every stored rule, in insertion order.
    pub async fn all(&self) -> Result<Vec<PolicyRule>, sqlx::Error> {
        type Row = (
            String,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
        );
        let rows = sqlx::query_as::<_, Row>(
            "SELECT ptype, v0, v1, v2, v3, v4, v5 FROM policy_rules ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(ptype, v0, v1, v2, v3, v4, v5)| {
                PolicyRule::from_columns(ptype, [v0, v1, v2, v3, v4, v5])
            })
            .collect())
    }

    /// Stage a rule for insertion. Nothing is written until [`flush`].
    ///
    /// Bulk loads stage hundreds of rules and pay for one round of writes,
    /// instead of one commit per rule.
    ///
    /// [`flush`]: Self::flush
    pub fn add(&mut self, ptype: &str, values: Vec<String>) {
        self.staged.push(PolicyRule::new(ptype, values));
    }

    /// Write all staged rules in a single transaction.
    pub async fn flush(&mut self) -> Result<(), sqlx::Error> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for rule in &self.staged {
            insert_rule(&mut tx, rule).await?;
        }
        tx.commit().await?;
        self.staged.clear();
        Ok(())
    }

    /// Delete rows matching ptype and *all six* positions exactly.
    ///
    /// An absent position matches only NULL: removing a 3-value rule never
    /// touches a row with a non-null 4th column.
    pub async fn remove(&self, ptype: &str, values: &[String]) -> Result<bool, sqlx::Error> {
        let rule = PolicyRule::new(ptype, values.to_vec());
        let columns = rule.column_values();
        let result = sqlx::query(
            "DELETE FROM policy_rules WHERE ptype = $1 \
             AND v0 IS NOT DISTINCT FROM $2 \
             AND v1 IS NOT DISTINCT FROM $3 \
             AND v2 IS NOT DISTINCT FROM $4 \
             AND v3 IS NOT DISTINCT FROM $5 \
             AND v4 IS NOT DISTINCT FROM $6 \
             AND v5 IS NOT DISTINCT FROM $7",
        )
        .bind(&rule.ptype)
        .bind(columns[0])
        .bind(columns[1])
        .bind(columns[2])
        .bind(columns[3])
        .bind(columns[4])
        .bind(columns[5])
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete rows matching ptype and a contiguous run of positions starting
    /// at `field_index`. Empty-string values are wildcards and constrain
    /// nothing.
    pub async fn remove_filtered(
        &self,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> Result<bool, sqlx::Error> {
        let mut sql = String::from("DELETE FROM policy_rules WHERE ptype = $1");
        let mut binds: Vec<&str> = Vec::new();
        for (offset, value) in field_values.iter().enumerate() {
            let slot = field_index + offset;
            if slot >= MAX_RULE_FIELDS {
                break;
            }
            if value.is_empty() {
                continue;
            }
            binds.push(value);
            sql.push_str(&format!(" AND v{slot} = ${}", binds.len() + 1));
        }
        let mut query = sqlx::query(&sql).bind(ptype);
        for value in binds {
            query = query.bind(value);
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every stored rule.
    pub async fn clear(&self) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM policy_rules")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Destructive replace: delete everything and reinsert `rules`, in one
    /// transaction. A failure mid-way rolls back to the previous rule set
    /// rather than leaving the table empty.
    pub async fn replace_all(&self, rules: &[PolicyRule]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM policy_rules")
            .execute(&mut *tx)
            .await?;
        for rule in rules {
            insert_rule(&mut tx, rule).await?;
        }
        tx.commit().await
    }
}

async fn insert_rule(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    rule: &PolicyRule,
) -> Result<(), sqlx::Error> {
    let columns = rule.column_values();
    sqlx::query(INSERT_RULE)
        .bind(&rule.ptype)
        .bind(columns[0])
        .bind(columns[1])
        .bind(columns[2])
        .bind(columns[3])
        .bind(columns[4])
        .bind(columns[5])
        .execute(&mut **tx)
        .await?;
    Ok(())
}
