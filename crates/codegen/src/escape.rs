//! Literal escaping for generated source.
//!
//! Each function returns a complete literal, delimiters included, so a
//! template never has to know how a value is quoted.

/// Rust `"..."` string literal
pub fn rust_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Literal used as a `format!`-style template: braces are doubled so they
/// print as themselves
pub fn fmt_str(value: &str) -> String {
    rust_str(&value.replace('{', "{{").replace('}', "}}"))
}

/// Rust raw string literal with a fence longer than any `"#...` run in the
/// value; falls back to [`rust_str`] for values a raw string cannot hold
pub fn raw_str(value: &str) -> String {
    if value.contains('\r') {
        return rust_str(value);
    }
    let hashes = if value.contains('"') {
        let chars: Vec<char> = value.chars().collect();
        let longest_run = chars
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == '"')
            .map(|(i, _)| chars[i + 1..].iter().take_while(|c| **c == '#').count())
            .max()
            .unwrap_or(0);
        longest_run + 1
    } else {
        0
    };
    let fence = "#".repeat(hashes);
    format!("r{fence}\"{value}\"{fence}")
}

/// SQL single-quoted string literal
pub fn sql_str(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(literal: &str) -> String {
        match syn::parse_str::<syn::LitStr>(literal) {
            Ok(lit) => lit.value(),
            Err(e) => panic!("{} is not a string literal: {}", literal, e),
        }
    }

    #[test]
    fn test_rust_str_round_trips() {
        let value = "say \"hi\"\n\tpath C:\\tmp `tick` $HOME {x}";
        assert_eq!(decode(&rust_str(value)), value);
    }

    #[test]
    fn test_fmt_str_doubles_braces() {
        assert_eq!(fmt_str("Widget {id} not found"), "\"Widget {{id}} not found\"");
    }

    #[test]
    fn test_raw_str_fence_outgrows_content() {
        assert_eq!(raw_str("plain"), "r\"plain\"");
        assert_eq!(raw_str("a \"quote\""), "r#\"a \"quote\"\"#");

        let tricky = "let s = r#\"x\"#; let t = \"##\";";
        let literal = raw_str(tricky);
        assert!(literal.starts_with("r###\""));
        assert_eq!(decode(&literal), tricky);
    }

    #[test]
    fn test_raw_str_multiline_round_trip() {
        let code = "const url = `${base}/items`;\nconst price = \"$10\";\n";
        assert_eq!(decode(&raw_str(code)), code);
    }

    #[test]
    fn test_sql_str_doubles_quotes() {
        assert_eq!(sql_str("it's"), "'it''s'");
    }
}
