//! Query capabilities of a column: how generated list endpoints may filter on it.

use serde::Serialize;

use super::{ColumnDescriptor, FieldRole};

const SENSITIVE_MARKERS: &[&str] = &[
    "password", "secret", "token", "hash", "salt", "private_key", "api_key", "ssn",
    "social_security", "credit_card", "card_number", "cvv", "pin",
];

const SEARCH_MARKERS: &[&str] = &[
    "name", "title", "description", "content", "text", "comment", "note", "summary",
];

const RANGE_MARKERS: &[&str] = &[
    "amount", "price", "cost", "count", "quantity", "size", "weight", "score", "rating", "total",
];

const EXACT_INTEGER_MARKERS: &[&str] = &["id", "type", "status", "level", "code"];

/// Capability flags derived from a column's name and type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueryCapabilities {
    pub searchable: bool,
    pub exact_match: bool,
    pub range: bool,
    pub sensitive: bool,
}

fn is_integer(column: &ColumnDescriptor) -> bool {
    matches!(column.udt_name.as_str(), "int2" | "int4" | "int8")
}

fn is_decimal(column: &ColumnDescriptor) -> bool {
    matches!(column.udt_name.as_str(), "numeric" | "float4" | "float8" | "money")
}

impl ColumnDescriptor {
    /// Holds credentials or personal secrets; never returned in responses
    pub fn is_sensitive(&self) -> bool {
        if self.role == FieldRole::Password {
            return true;
        }
        let name = self.name.to_lowercase();
        SENSITIVE_MARKERS.iter().any(|m| {
            name == *m || name.starts_with(&format!("{}_", m)) || name.ends_with(&format!("_{}", m))
        })
    }

    /// Free-text search applies (`ILIKE`)
    pub fn is_searchable(&self) -> bool {
        if !self.is_text() || self.is_sensitive() || self.is_enumerated() {
            return false;
        }
        let name = self.name.to_lowercase();
        SEARCH_MARKERS.iter().any(|m| name.contains(m))
    }

    /// Equality filter applies
    pub fn is_exact_match(&self) -> bool {
        if self.is_sensitive() || self.role == FieldRole::AuditTimestamp {
            return false;
        }
        if self.role == FieldRole::Boolean
            || self.role == FieldRole::Enumerated
            || self.is_foreign_key()
            || self.udt_name == "uuid"
        {
            return true;
        }
        if self.is_text() {
            return self.max_length.map(|len| len <= 50).unwrap_or(false)
                || self.name.ends_with("_code")
                || self.name == "code";
        }
        if is_integer(self) {
            let name = self.name.to_lowercase();
            return EXACT_INTEGER_MARKERS.iter().any(|m| name.contains(m));
        }
        false
    }

    /// Min/max filters apply
    pub fn is_range(&self) -> bool {
        if self.role == FieldRole::DateTime || self.role == FieldRole::AuditTimestamp {
            return true;
        }
        if is_decimal(self) {
            return true;
        }
        if is_integer(self) && !self.is_primary_key && !self.is_foreign_key() {
            let name = self.name.to_lowercase();
            return RANGE_MARKERS.iter().any(|m| name.contains(m));
        }
        false
    }

    pub fn capabilities(&self) -> QueryCapabilities {
        QueryCapabilities {
            searchable: self.is_searchable(),
            exact_match: self.is_exact_match(),
            range: self.is_range(),
            sensitive: self.is_sensitive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, udt: &str, role: FieldRole) -> ColumnDescriptor {
        let raw = crate::catalog::RawColumn::typed(name, udt);
        ColumnDescriptor {
            name: raw.name,
            data_type: raw.data_type,
            udt_name: raw.udt_name,
            nullable: false,
            default: None,
            max_length: None,
            is_primary_key: false,
            foreign_key: None,
            enum_values: Vec::new(),
            is_unique: false,
            role,
        }
    }

    #[test]
    fn test_sensitive_columns() {
        assert!(column("password_hash", "varchar", FieldRole::Password).is_sensitive());
        assert!(column("api_key", "varchar", FieldRole::PlainText).is_sensitive());
        assert!(!column("spinner", "varchar", FieldRole::PlainText).is_sensitive());
    }

    #[test]
    fn test_searchable_text() {
        assert!(column("title", "varchar", FieldRole::PlainText).is_searchable());
        assert!(!column("reset_token", "varchar", FieldRole::PlainText).is_searchable());
        assert!(!column("quantity", "int4", FieldRole::Numeric).is_searchable());
    }

    #[test]
    fn test_exact_and_range() {
        assert!(column("is_active", "bool", FieldRole::Boolean).is_exact_match());
        assert!(column("status_id", "int4", FieldRole::Numeric).is_exact_match());
        assert!(column("price", "numeric", FieldRole::Numeric).is_range());
        assert!(column("quantity", "int4", FieldRole::Numeric).is_range());
        assert!(column("created_at", "timestamptz", FieldRole::AuditTimestamp).is_range());
        assert!(!column("code", "varchar", FieldRole::PlainText).is_range());
    }
}
