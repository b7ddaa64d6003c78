//! Delimiter balance heuristic for code snippets and generated text.
//!
//! Balanced `()`, `[]` and `{}` outside strings and comments is necessary
//! for well-formed code, never sufficient. Callers treat findings as
//! warnings unless the text has no real parser.

use std::fmt;

/// Lexical conventions used to skip strings and comments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    /// `"..."`, raw strings, char literals, lifetimes, `//` and `/* */`
    Rust,
    /// `"..."`, `'...'`, template literals, `//` and `/* */`
    CLike,
    /// `'...'`, `"..."` identifiers, `--` and `/* */`
    Sql,
}

impl Syntax {
    /// Syntax for a snippet's declared language
    pub fn for_language(language: &str) -> Self {
        match language.to_ascii_lowercase().as_str() {
            "rust" | "rs" => Syntax::Rust,
            "sql" | "postgres" | "postgresql" => Syntax::Sql,
            _ => Syntax::CLike,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Imbalance {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Imbalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

fn closer_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

struct Scanner<'a> {
    chars: &'a [char],
    pos: usize,
    line: usize,
}

impl Scanner<'_> {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek(0) {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) -> bool {
        while let Some(c) = self.advance() {
            if c == '*' && self.peek(0) == Some('/') {
                self.pos += 1;
                return true;
            }
        }
        false
    }

    /// Consume up to and including `quote`; false when the input ends first
    fn skip_quoted(&mut self, quote: char, escapes: bool) -> bool {
        while let Some(c) = self.advance() {
            if escapes && c == '\\' {
                self.advance();
            } else if c == quote {
                return true;
            }
        }
        false
    }

    /// Consume a raw string body terminated by `"` followed by `hashes` `#`s
    fn skip_raw(&mut self, hashes: usize) -> bool {
        while let Some(c) = self.advance() {
            if c == '"' && (0..hashes).all(|i| self.peek(i) == Some('#')) {
                self.pos += hashes;
                return true;
            }
        }
        false
    }

    /// Number of `#` in a raw string opener at the cursor (`r"`, `r#"`, `br##"`)
    fn raw_string_hashes(&self) -> Option<usize> {
        let prev = self.pos.checked_sub(1).and_then(|p| self.chars.get(p)).copied();
        if prev.map(|p| p.is_alphanumeric() || p == '_').unwrap_or(false) && prev != Some('b') {
            return None;
        }
        let mut offset = 1;
        while self.peek(offset) == Some('#') {
            offset += 1;
        }
        (self.peek(offset) == Some('"')).then_some(offset - 1)
    }

    /// Length of a char literal at the cursor, `None` for lifetimes and labels
    fn char_literal_len(&self) -> Option<usize> {
        match self.peek(1)? {
            '\\' => (3..12).find(|&i| self.peek(i) == Some('\'')).map(|i| i + 1),
            '\'' => None,
            _ if self.peek(2) == Some('\'') => Some(3),
            _ => None,
        }
    }
}

/// Report unmatched, mismatched and unclosed delimiters
pub fn check_balance(text: &str, syntax: Syntax) -> Vec<Imbalance> {
    let chars: Vec<char> = text.chars().collect();
    let mut scanner = Scanner {
        chars: &chars,
        pos: 0,
        line: 1,
    };
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut issues = Vec::new();

    while let Some(c) = scanner.peek(0) {
        let next = scanner.peek(1);
        let line = scanner.line;

        match c {
            '/' if next == Some('/') && syntax != Syntax::Sql => {
                scanner.skip_line();
                continue;
            }
            '-' if next == Some('-') && syntax == Syntax::Sql => {
                scanner.skip_line();
                continue;
            }
            '/' if next == Some('*') => {
                scanner.pos += 2;
                if !scanner.skip_block_comment() {
                    issues.push(Imbalance {
                        line,
                        message: "unterminated block comment".to_string(),
                    });
                }
                continue;
            }
            'r' if syntax == Syntax::Rust => {
                if let Some(hashes) = scanner.raw_string_hashes() {
                    scanner.pos += hashes + 2;
                    if !scanner.skip_raw(hashes) {
                        issues.push(Imbalance {
                            line,
                            message: "unterminated raw string".to_string(),
                        });
                    }
                    continue;
                }
            }
            '"' | '\'' | '`' => {
                let quoted = match (c, syntax) {
                    ('"', _) => Some(syntax != Syntax::Sql),
                    ('\'', Syntax::CLike) => Some(true),
                    ('\'', Syntax::Sql) => Some(false),
                    ('`', Syntax::CLike) => Some(true),
                    _ => None,
                };
                if let Some(escapes) = quoted {
                    scanner.pos += 1;
                    if !scanner.skip_quoted(c, escapes) {
                        issues.push(Imbalance {
                            line,
                            message: format!("unterminated string opened with {}", c),
                        });
                    }
                    continue;
                }
                if c == '\'' && syntax == Syntax::Rust {
                    if let Some(len) = scanner.char_literal_len() {
                        scanner.pos += len;
                        continue;
                    }
                }
            }
            '(' | '[' | '{' => stack.push((c, line)),
            ')' | ']' | '}' => match stack.pop() {
                Some((open, _)) if closer_for(open) == c => {}
                Some((open, opened_at)) => issues.push(Imbalance {
                    line,
                    message: format!(
                        "expected `{}` to close `{}` from line {}, found `{}`",
                        closer_for(open),
                        open,
                        opened_at,
                        c
                    ),
                }),
                None => issues.push(Imbalance {
                    line,
                    message: format!("unexpected closing `{}`", c),
                }),
            },
            _ => {}
        }
        scanner.advance();
    }

    for (open, line) in stack {
        issues.push(Imbalance {
            line,
            message: format!("unclosed `{}`", open),
        });
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_rust_with_lifetimes_and_chars() {
        let code = r##"
fn first<'a>(items: &'a [&'a str]) -> Option<&'a str> {
    let brace = '{';
    let raw = r"}}";
    let fenced = r#"quote " inside"#;
    // stray ) in a comment
    items.first().copied()
}
"##;
        assert!(check_balance(code, Syntax::Rust).is_empty());
    }

    #[test]
    fn test_unclosed_brace_is_reported() {
        let issues = check_balance("fn main() {\n    let x = (1, 2);\n", Syntax::Rust);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 1);
        assert!(issues[0].message.contains("unclosed `{`"));
    }

    #[test]
    fn test_mismatch_and_stray_closer() {
        let issues = check_balance("foo(bar]\n}", Syntax::CLike);
        assert_eq!(issues.len(), 2);
        assert!(issues[0].message.contains("expected `)`"));
        assert!(issues[1].message.contains("unexpected closing `}`"));
    }

    #[test]
    fn test_clike_strings_and_template_literals() {
        let code = "const s = 'it\\'s (';\nconst t = `${a} [`;\nfoo({ a: \"}\" });";
        assert!(check_balance(code, Syntax::CLike).is_empty());
    }

    #[test]
    fn test_sql_comments_and_quotes() {
        let sql = "-- ( not counted\nINSERT INTO t (name) VALUES ('it''s (');";
        assert!(check_balance(sql, Syntax::Sql).is_empty());
    }
}
