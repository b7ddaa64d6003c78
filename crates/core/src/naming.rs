//! Identifier case conversions used for module, type and route names.

/// English plural for a lowercase identifier
pub fn pluralize_word(word: &str) -> String {
    if word.ends_with('y')
        && word.len() > 1
        && !matches!(word.chars().rev().nth(1), Some('a' | 'e' | 'i' | 'o' | 'u'))
    {
        format!("{}ies", &word[..word.len() - 1])
    } else if word.ends_with('s')
        || word.ends_with("sh")
        || word.ends_with("ch")
        || word.ends_with('x')
    {
        format!("{}es", word)
    } else {
        format!("{}s", word)
    }
}

/// English singular for a lowercase identifier; inverse of [`pluralize_word`]
/// for the regular forms it produces
pub fn singularize_word(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{}y", stem);
        }
    }
    for suffix in ["sses", "shes", "ches", "xes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with('s') && !word.ends_with("ss") && word.len() > 1 {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// `UserProfile`, `user-profile`, `user profile` -> `user_profile`
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    let mut prev_lower_or_digit = false;
    for c in s.chars() {
        if c == '-' || c == ' ' || c == '_' || c == '/' {
            if !result.is_empty() && !result.ends_with('_') {
                result.push('_');
            }
            prev_lower_or_digit = false;
            continue;
        }
        if c.is_uppercase() && prev_lower_or_digit && !result.ends_with('_') {
            result.push('_');
        }
        prev_lower_or_digit = c.is_lowercase() || c.is_ascii_digit();
        result.extend(c.to_lowercase());
    }
    result.trim_end_matches('_').to_string()
}

pub fn to_pascal_case(s: &str) -> String {
    to_snake_case(s)
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect()
}

pub fn to_camel_case(s: &str) -> String {
    let pascal = to_pascal_case(s);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => pascal,
    }
}

pub fn to_kebab_case(s: &str) -> String {
    to_snake_case(s).replace('_', "-")
}

/// `UPPER_SNAKE_CASE`, used for constants
pub fn to_upper_snake_case(s: &str) -> String {
    to_snake_case(s).to_uppercase()
}

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final", "macro",
    "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Escape a field name that collides with a Rust keyword (`type` -> `r#type`)
pub fn escape_rust_keyword(name: &str) -> String {
    if RUST_KEYWORDS.contains(&name) {
        format!("r#{}", name)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize_and_singularize() {
        assert_eq!(pluralize_word("category"), "categories");
        assert_eq!(pluralize_word("day"), "days");
        assert_eq!(pluralize_word("box"), "boxes");
        assert_eq!(pluralize_word("widget"), "widgets");

        assert_eq!(singularize_word("categories"), "category");
        assert_eq!(singularize_word("boxes"), "box");
        assert_eq!(singularize_word("widgets"), "widget");
        assert_eq!(singularize_word("address"), "address");
    }

    #[test]
    fn test_case_conversions() {
        assert_eq!(to_snake_case("UserProfile"), "user_profile");
        assert_eq!(to_snake_case("user-profile"), "user_profile");
        assert_eq!(to_snake_case("master_data/drugs"), "master_data_drugs");
        assert_eq!(to_pascal_case("purchase_orders"), "PurchaseOrders");
        assert_eq!(to_camel_case("purchase_orders"), "purchaseOrders");
        assert_eq!(to_kebab_case("PurchaseOrders"), "purchase-orders");
        assert_eq!(to_upper_snake_case("widgets_admin"), "WIDGETS_ADMIN");
    }

    #[test]
    fn test_keyword_escaping() {
        assert_eq!(escape_rust_keyword("type"), "r#type");
        assert_eq!(escape_rust_keyword("name"), "name");
    }
}
