//! Choosing which columns label a referenced row.

use super::source::RawColumn;
use super::ColumnDescriptor;

/// Column names tried in order when labelling a row
pub const DISPLAY_PRIORITY: &[&str] = &[
    "name",
    "title",
    "first_name",
    "username",
    "email",
    "description",
    "label",
    "display_name",
];

const MAX_DISPLAY_COLUMNS: usize = 3;

pub fn is_text_type(data_type: &str, udt_name: &str) -> bool {
    matches!(
        data_type,
        "character varying" | "character" | "text" | "citext"
    ) || matches!(udt_name, "varchar" | "bpchar" | "text" | "citext")
}

/// Pick 1-3 display columns from `(name, is_text)` pairs in declaration order
fn select<'a>(columns: &[(&'a str, bool)], primary_key: &[String]) -> Vec<String> {
    let has = |name: &str| columns.iter().any(|(c, _)| *c == name);
    let mut selected: Vec<String> = Vec::new();

    for candidate in DISPLAY_PRIORITY {
        if selected.len() >= MAX_DISPLAY_COLUMNS {
            break;
        }
        if has(candidate) {
            selected.push(candidate.to_string());
            if *candidate == "first_name" && has("last_name") && selected.len() < MAX_DISPLAY_COLUMNS
            {
                selected.push("last_name".to_string());
            }
        }
    }
    if !selected.is_empty() {
        return selected;
    }

    if let Some((name, _)) = columns
        .iter()
        .find(|(name, is_text)| *is_text && !primary_key.iter().any(|pk| pk == name))
    {
        return vec![name.to_string()];
    }

    primary_key
        .first()
        .cloned()
        .or_else(|| columns.first().map(|(name, _)| name.to_string()))
        .into_iter()
        .collect()
}

pub fn select_display_columns(columns: &[ColumnDescriptor], primary_key: &[String]) -> Vec<String> {
    let pairs: Vec<(&str, bool)> = columns
        .iter()
        .map(|c| (c.name.as_str(), c.is_text()))
        .collect();
    select(&pairs, primary_key)
}

pub fn select_display_columns_raw(columns: &[RawColumn], primary_key: &[String]) -> Vec<String> {
    let pairs: Vec<(&str, bool)> = columns
        .iter()
        .map(|c| (c.name.as_str(), is_text_type(&c.data_type, &c.udt_name)))
        .collect();
    select(&pairs, primary_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(names: &[(&str, &str)]) -> Vec<RawColumn> {
        names.iter().map(|(n, t)| RawColumn::typed(*n, t)).collect()
    }

    #[test]
    fn test_priority_order_and_cap() {
        let columns = raw(&[
            ("id", "uuid"),
            ("email", "varchar"),
            ("title", "varchar"),
            ("name", "varchar"),
            ("label", "varchar"),
        ]);
        assert_eq!(
            select_display_columns_raw(&columns, &["id".into()]),
            vec!["name", "title", "email"]
        );
    }

    #[test]
    fn test_first_name_pairs_with_last_name() {
        let columns = raw(&[
            ("id", "int8"),
            ("last_name", "varchar"),
            ("first_name", "varchar"),
        ]);
        assert_eq!(
            select_display_columns_raw(&columns, &["id".into()]),
            vec!["first_name", "last_name"]
        );
    }

    #[test]
    fn test_falls_back_to_first_text_column_then_pk() {
        let columns = raw(&[("id", "int8"), ("amount", "numeric"), ("code", "varchar")]);
        assert_eq!(
            select_display_columns_raw(&columns, &["id".into()]),
            vec!["code"]
        );

        let columns = raw(&[("id", "int8"), ("amount", "numeric")]);
        assert_eq!(
            select_display_columns_raw(&columns, &["id".into()]),
            vec!["id"]
        );
    }
}
