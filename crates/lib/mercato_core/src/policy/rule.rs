//! Policy rule record — ptype plus up to six positional values.

use serde::{Deserialize, Serialize};

/// Number of positional value columns (`v0`..`v5`).
pub const MAX_RULE_FIELDS: usize = 6;

/// One stored policy rule.
///
/// `values` never carries trailing empties: an absent position is simply not
/// present, and maps to SQL NULL in the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub ptype: String,
    pub values: Vec<String>,
}

impl PolicyRule {
    /// Build a rule, truncating to six values and trimming trailing empties.
    pub fn new(ptype: impl Into<String>, values: Vec<String>) -> Self {
        let mut values = values;
        values.truncate(MAX_RULE_FIELDS);
        while values.last().is_some_and(|v| v.is_empty()) {
            values.pop();
        }
        Self {
            ptype: ptype.into(),
            values,
        }
    }

    /// Reconstruct a rule from its row columns, dropping null/empty trailing
    /// values.
    pub fn from_columns(ptype: String, columns: [Option<String>; MAX_RULE_FIELDS]) -> Self {
        let values = columns
            .into_iter()
            .map_while(|column| column.filter(|v| !v.is_empty()))
            .collect();
        Self { ptype, values }
    }

    /// The row columns for this rule, padded with NULLs to six positions.
    pub fn column_values(&self) -> [Option<&str>; MAX_RULE_FIELDS] {
        let mut columns = [None; MAX_RULE_FIELDS];
        for (column, value) in columns.iter_mut().zip(&self.values) {
            *column = Some(value.as_str());
        }
        columns
    }

    /// Render as a policy line, e.g. `p, admin, /api/v1/*, GET`.
    ///
    /// Used for display and for the engine's line-oriented loading.
    pub fn to_policy_line(&self) -> String {
        let mut line = self.ptype.clone();
        for value in self.values.iter().filter(|v| !v.is_empty()) {
            line.push_str(", ");
            line.push_str(value);
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svec(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn new_trims_trailing_empties_and_truncates() {
        let rule = PolicyRule::new("p", svec(&["admin", "/x", "GET", "", ""]));
        assert_eq!(rule.values, svec(&["admin", "/x", "GET"]));

        let rule = PolicyRule::new("p", svec(&["a", "b", "c", "d", "e", "f", "g"]));
        assert_eq!(rule.values.len(), MAX_RULE_FIELDS);
    }

    #[test]
    fn from_columns_stops_at_first_absent_value() {
        let rule = PolicyRule::from_columns(
            "p".into(),
            [
                Some("admin".into()),
                Some("/x".into()),
                None,
                Some("orphan".into()),
                None,
                None,
            ],
        );
        assert_eq!(rule.values, svec(&["admin", "/x"]));
    }

    #[test]
    fn column_values_pads_with_nulls() {
        let rule = PolicyRule::new("p", svec(&["admin", "/x", "GET"]));
        assert_eq!(
            rule.column_values(),
            [Some("admin"), Some("/x"), Some("GET"), None, None, None]
        );
    }

    #[test]
    fn policy_line_renders_ptype_and_values() {
        let rule = PolicyRule::new("p", svec(&["admin", "/api/v1/*", ".*", "*"]));
        assert_eq!(rule.to_policy_line(), "p, admin, /api/v1/*, .*, *");

        let lone = PolicyRule::new("g", vec![]);
        assert_eq!(lone.to_policy_line(), "g");
    }
}
