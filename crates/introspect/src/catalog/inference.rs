//! Ordered predicate -> role table classifying columns.
//!
//! The first rule whose predicate holds decides the role; a column nothing
//! matches is plain text.

use std::sync::OnceLock;

use regex::Regex;

use super::source::{RawColumn, RawForeignKey};
use super::FieldRole;

/// Everything the rules may look at for one column
#[derive(Debug, Clone, Copy)]
pub struct ColumnFacts<'a> {
    pub column: &'a RawColumn,
    pub is_primary_key: bool,
    pub foreign_key: Option<&'a RawForeignKey>,
    pub enum_values: &'a [String],
}

pub struct RoleRule {
    pub name: &'static str,
    pub role: FieldRole,
    pub applies: fn(&ColumnFacts<'_>) -> bool,
}

pub const AUDIT_TIMESTAMP_COLUMNS: &[&str] = &["created_at", "updated_at", "deleted_at"];
pub const AUDIT_USER_COLUMNS: &[&str] = &["created_by", "updated_by", "deleted_by"];

pub const ROLE_RULES: &[RoleRule] = &[
    RoleRule {
        name: "primary-key",
        role: FieldRole::PrimaryKey,
        applies: is_primary_key,
    },
    RoleRule {
        name: "audit-timestamp",
        role: FieldRole::AuditTimestamp,
        applies: is_audit_timestamp,
    },
    RoleRule {
        name: "audit-user",
        role: FieldRole::AuditUser,
        applies: is_audit_user,
    },
    RoleRule {
        name: "foreign-key",
        role: FieldRole::ForeignKeyReference,
        applies: is_foreign_key,
    },
    RoleRule {
        name: "enumerated",
        role: FieldRole::Enumerated,
        applies: is_enumerated,
    },
    RoleRule {
        name: "email-name",
        role: FieldRole::Email,
        applies: is_email_name,
    },
    RoleRule {
        name: "password-name",
        role: FieldRole::Password,
        applies: is_password_name,
    },
    RoleRule {
        name: "url-name",
        role: FieldRole::Url,
        applies: is_url_name,
    },
    RoleRule {
        name: "long-text-name",
        role: FieldRole::LongText,
        applies: is_long_text_name,
    },
    RoleRule {
        name: "boolean-type",
        role: FieldRole::Boolean,
        applies: is_boolean_type,
    },
    RoleRule {
        name: "datetime-type",
        role: FieldRole::DateTime,
        applies: is_datetime_type,
    },
    RoleRule {
        name: "numeric-type",
        role: FieldRole::Numeric,
        applies: is_numeric_type,
    },
    RoleRule {
        name: "text-type",
        role: FieldRole::LongText,
        applies: is_unbounded_text_type,
    },
];

pub fn infer_role(facts: &ColumnFacts<'_>) -> FieldRole {
    ROLE_RULES
        .iter()
        .find(|rule| (rule.applies)(facts))
        .map(|rule| rule.role)
        .unwrap_or(FieldRole::PlainText)
}

fn is_primary_key(facts: &ColumnFacts<'_>) -> bool {
    facts.is_primary_key
}

fn is_audit_timestamp(facts: &ColumnFacts<'_>) -> bool {
    AUDIT_TIMESTAMP_COLUMNS.contains(&facts.column.name.as_str())
}

fn is_audit_user(facts: &ColumnFacts<'_>) -> bool {
    AUDIT_USER_COLUMNS.contains(&facts.column.name.as_str())
}

fn is_foreign_key(facts: &ColumnFacts<'_>) -> bool {
    facts.foreign_key.is_some()
}

fn is_enumerated(facts: &ColumnFacts<'_>) -> bool {
    !facts.enum_values.is_empty()
}

fn is_email_name(facts: &ColumnFacts<'_>) -> bool {
    facts.column.name.to_lowercase().contains("email")
}

fn is_password_name(facts: &ColumnFacts<'_>) -> bool {
    let name = facts.column.name.to_lowercase();
    ["password", "passwd", "hash", "secret"]
        .iter()
        .any(|needle| name.contains(needle))
}

fn is_url_name(facts: &ColumnFacts<'_>) -> bool {
    let name = facts.column.name.to_lowercase();
    ["url", "website", "link", "homepage"]
        .iter()
        .any(|needle| name.contains(needle))
}

fn is_long_text_name(facts: &ColumnFacts<'_>) -> bool {
    let name = facts.column.name.to_lowercase();
    is_character_type(facts.column)
        && ["description", "content", "notes", "bio", "body", "summary"]
            .iter()
            .any(|needle| name.contains(needle))
}

fn is_boolean_type(facts: &ColumnFacts<'_>) -> bool {
    facts.column.udt_name == "bool" || facts.column.data_type == "boolean"
}

fn is_datetime_type(facts: &ColumnFacts<'_>) -> bool {
    let data_type = facts.column.data_type.as_str();
    data_type == "date" || data_type.starts_with("timestamp") || data_type.starts_with("time")
}

fn is_numeric_type(facts: &ColumnFacts<'_>) -> bool {
    matches!(
        facts.column.udt_name.as_str(),
        "int2" | "int4" | "int8" | "float4" | "float8" | "numeric" | "money"
    ) || matches!(
        facts.column.data_type.as_str(),
        "smallint" | "integer" | "bigint" | "real" | "double precision" | "numeric" | "decimal"
    )
}

fn is_unbounded_text_type(facts: &ColumnFacts<'_>) -> bool {
    facts.column.data_type == "text"
}

fn is_character_type(column: &RawColumn) -> bool {
    super::display::is_text_type(&column.data_type, &column.udt_name)
}

/// Literal values of a check constraint restricting one column to a fixed
/// set, in declared order.
///
/// Recognizes both `col IN ('a', 'b')` and the form Postgres renders it as,
/// `(col)::text = ANY ((ARRAY['a'::character varying, ...])::text[])`.
pub fn parse_check_values(definition: &str) -> Option<Vec<String>> {
    static LIST: OnceLock<Regex> = OnceLock::new();
    static LITERAL: OnceLock<Regex> = OnceLock::new();
    // Only the literal list itself: `a IN ('x') AND b <> 'y'` must not pick up `y`
    let list_re = LIST.get_or_init(|| {
        Regex::new(
            r"(?is)(?:\bIN\s*\(((?:\s*'(?:[^']|'')*'(?:::[\w\s]+)?\s*,?)+)\s*\)|=\s*ANY\s*\(+\s*ARRAY\s*\[(.*?)\])",
        )
        .expect("check list pattern compiles")
    });
    let literal_re = LITERAL
        .get_or_init(|| Regex::new(r"'((?:[^']|'')*)'").expect("literal pattern compiles"));

    let captures = list_re.captures(definition)?;
    let list = captures.get(1).or_else(|| captures.get(2))?.as_str();

    let values: Vec<String> = literal_re
        .captures_iter(list)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().replace("''", "'"))
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts<'a>(column: &'a RawColumn) -> ColumnFacts<'a> {
        ColumnFacts {
            column,
            is_primary_key: false,
            foreign_key: None,
            enum_values: &[],
        }
    }

    #[test]
    fn test_primary_key_wins_over_everything() {
        let column = RawColumn::typed("email", "varchar");
        let mut f = facts(&column);
        f.is_primary_key = true;
        assert_eq!(infer_role(&f), FieldRole::PrimaryKey);
    }

    #[test]
    fn test_audit_columns() {
        let created = RawColumn::typed("created_at", "timestamptz");
        assert_eq!(infer_role(&facts(&created)), FieldRole::AuditTimestamp);

        let by = RawColumn::typed("updated_by", "uuid");
        assert_eq!(infer_role(&facts(&by)), FieldRole::AuditUser);
    }

    #[test]
    fn test_audit_user_beats_foreign_key() {
        let column = RawColumn::typed("created_by", "uuid");
        let fk = RawForeignKey {
            constraint_name: "fk".into(),
            column: "created_by".into(),
            foreign_table: "users".into(),
            foreign_column: "id".into(),
        };
        let mut f = facts(&column);
        f.foreign_key = Some(&fk);
        assert_eq!(infer_role(&f), FieldRole::AuditUser);
    }

    #[test]
    fn test_foreign_key_before_name_heuristics() {
        let column = RawColumn::typed("email_template_id", "uuid");
        let fk = RawForeignKey {
            constraint_name: "fk".into(),
            column: "email_template_id".into(),
            foreign_table: "email_templates".into(),
            foreign_column: "id".into(),
        };
        let mut f = facts(&column);
        f.foreign_key = Some(&fk);
        assert_eq!(infer_role(&f), FieldRole::ForeignKeyReference);
    }

    #[test]
    fn test_enumerated_requires_values() {
        let column = RawColumn::enumerated("kind", "widget_kind");
        assert_eq!(infer_role(&facts(&column)), FieldRole::PlainText);

        let values = vec!["A".to_string(), "B".to_string()];
        let mut f = facts(&column);
        f.enum_values = &values;
        assert_eq!(infer_role(&f), FieldRole::Enumerated);
    }

    #[test]
    fn test_name_heuristics() {
        let cases = [
            ("contact_email", "varchar", FieldRole::Email),
            ("password_hash", "varchar", FieldRole::Password),
            ("website", "varchar", FieldRole::Url),
            ("description", "varchar", FieldRole::LongText),
        ];
        for (name, udt, expected) in cases {
            let column = RawColumn::typed(name, udt);
            assert_eq!(infer_role(&facts(&column)), expected, "column {}", name);
        }
    }

    #[test]
    fn test_declared_type_rules() {
        let cases = [
            ("is_active", "bool", FieldRole::Boolean),
            ("published_on", "date", FieldRole::DateTime),
            ("starts_at", "timestamptz", FieldRole::DateTime),
            ("quantity", "int4", FieldRole::Numeric),
            ("price", "numeric", FieldRole::Numeric),
            ("remarks", "text", FieldRole::LongText),
            ("code", "varchar", FieldRole::PlainText),
        ];
        for (name, udt, expected) in cases {
            let column = RawColumn::typed(name, udt);
            assert_eq!(infer_role(&facts(&column)), expected, "column {}", name);
        }
    }

    #[test]
    fn test_parse_check_in_list() {
        assert_eq!(
            parse_check_values("CHECK (status IN ('draft', 'sent', 'it''s'))"),
            Some(vec!["draft".into(), "sent".into(), "it's".into()])
        );
    }

    #[test]
    fn test_parse_check_any_array() {
        let def = "CHECK (((priority)::text = ANY ((ARRAY['low'::character varying, 'high'::character varying])::text[])))";
        assert_eq!(
            parse_check_values(def),
            Some(vec!["low".into(), "high".into()])
        );
    }

    #[test]
    fn test_parse_check_stops_at_end_of_list() {
        assert_eq!(
            parse_check_values("CHECK (kind IN ('a','b') AND kind <> 'c')"),
            Some(vec!["a".into(), "b".into()])
        );
        assert_eq!(
            parse_check_values("CHECK ((kind)::text IN ('x'::text, 'y'::text) OR (note = 'z'))"),
            Some(vec!["x".into(), "y".into()])
        );
    }

    #[test]
    fn test_parse_check_range_is_not_enumeration() {
        assert_eq!(parse_check_values("CHECK ((quantity >= 0))"), None);
    }
}
