//! Walking a parsed Rust file for the records of a named binding.
//!
//! [`find_binding`] locates the initializer of a top-level `pub const` or
//! `pub static`; [`match_record`] turns one struct-literal element into a
//! [`Record`] of decoded literal values, or the list of reasons it could not.

use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::visit::Visit;
use syn::{Expr, ExprStruct, Lit, Member, Token, Visibility};

/// Decoded value of one struct field
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    StrList(Vec<String>),
    Bool(bool),
    Int(i64),
    Float(String),
    /// `None`
    Absent,
    /// Last segment of a path expression such as `Category::Backend`
    Variant(String),
    Records(Vec<Record>),
}

impl Literal {
    fn describe(&self) -> &'static str {
        match self {
            Literal::Str(_) => "a string",
            Literal::StrList(_) => "a list of strings",
            Literal::Bool(_) => "a boolean",
            Literal::Int(_) => "an integer",
            Literal::Float(_) => "a float",
            Literal::Absent => "None",
            Literal::Variant(_) => "a path",
            Literal::Records(_) => "a list of struct literals",
        }
    }
}

/// Fields of one struct literal, in source order
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub type_name: String,
    pub line: usize,
    pub fields: Vec<(String, Literal)>,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&Literal> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Value of the `name` field, when it is a string
    pub fn label(&self) -> Option<String> {
        match self.get("name") {
            Some(Literal::Str(name)) => Some(name.clone()),
            _ => None,
        }
    }
}

/// Typed field access that accumulates every problem instead of stopping at the first
pub struct FieldReader<'a> {
    record: &'a Record,
    errors: Vec<String>,
}

impl<'a> FieldReader<'a> {
    pub fn new(record: &'a Record) -> Self {
        Self {
            record,
            errors: Vec::new(),
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn check<T>(&mut self, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.errors.push(message);
                None
            }
        }
    }

    /// Non-empty string field
    pub fn required_str(&mut self, field: &str) -> String {
        match self.record.get(field) {
            Some(Literal::Str(value)) if !value.trim().is_empty() => value.clone(),
            Some(Literal::Str(_)) => {
                self.error(format!("`{}` must not be empty", field));
                String::new()
            }
            Some(other) => {
                self.error(format!("`{}` must be a string, found {}", field, other.describe()));
                String::new()
            }
            None => {
                self.error(format!("missing required field `{}`", field));
                String::new()
            }
        }
    }

    pub fn optional_str(&mut self, field: &str) -> Option<String> {
        match self.record.get(field) {
            Some(Literal::Str(value)) => Some(value.clone()),
            Some(Literal::Absent) | None => None,
            Some(other) => {
                self.error(format!("`{}` must be a string, found {}", field, other.describe()));
                None
            }
        }
    }

    /// String, boolean or number rendered as text
    pub fn optional_scalar(&mut self, field: &str) -> Option<String> {
        match self.record.get(field) {
            Some(Literal::Str(value)) => Some(value.clone()),
            Some(Literal::Bool(value)) => Some(value.to_string()),
            Some(Literal::Int(value)) => Some(value.to_string()),
            Some(Literal::Float(value)) => Some(value.clone()),
            Some(Literal::Absent) | None => None,
            Some(other) => {
                self.error(format!("`{}` must be a scalar, found {}", field, other.describe()));
                None
            }
        }
    }

    /// Enum-like field written either as a string or as a path (`Kind::Boolean`)
    pub fn required_variant(&mut self, field: &str) -> Option<String> {
        match self.record.get(field) {
            Some(Literal::Str(value)) | Some(Literal::Variant(value)) => Some(value.clone()),
            Some(other) => {
                self.error(format!(
                    "`{}` must be a string or enum path, found {}",
                    field,
                    other.describe()
                ));
                None
            }
            None => {
                self.error(format!("missing required field `{}`", field));
                None
            }
        }
    }

    /// List of strings; absent means empty
    pub fn str_list(&mut self, field: &str) -> Vec<String> {
        match self.record.get(field) {
            Some(Literal::StrList(values)) => values.clone(),
            Some(Literal::Records(records)) if records.is_empty() => Vec::new(),
            Some(Literal::Absent) | None => Vec::new(),
            Some(other) => {
                self.error(format!(
                    "`{}` must be a list of strings, found {}",
                    field,
                    other.describe()
                ));
                Vec::new()
            }
        }
    }

    /// Nested struct literals; absent means empty
    pub fn records(&mut self, field: &str) -> Vec<&'a Record> {
        match self.record.get(field) {
            Some(Literal::Records(records)) => records.iter().collect(),
            Some(Literal::StrList(values)) if values.is_empty() => Vec::new(),
            Some(Literal::Absent) | None => Vec::new(),
            Some(other) => {
                self.error(format!(
                    "`{}` must be a list of struct literals, found {}",
                    field,
                    other.describe()
                ));
                Vec::new()
            }
        }
    }

    pub fn finish<T>(self, build: impl FnOnce() -> T) -> Result<T, Vec<String>> {
        if self.errors.is_empty() {
            Ok(build())
        } else {
            Err(self.errors)
        }
    }
}

struct BindingFinder<'n> {
    binding: &'n str,
    found: Option<Expr>,
}

impl<'ast> Visit<'ast> for BindingFinder<'_> {
    fn visit_item_const(&mut self, item: &'ast syn::ItemConst) {
        if self.found.is_none() && item.ident == self.binding && is_public(&item.vis) {
            self.found = Some((*item.expr).clone());
        }
    }

    fn visit_item_static(&mut self, item: &'ast syn::ItemStatic) {
        if self.found.is_none() && item.ident == self.binding && is_public(&item.vis) {
            self.found = Some((*item.expr).clone());
        }
    }

    // Top-level items only
    fn visit_item_fn(&mut self, _: &'ast syn::ItemFn) {}
    fn visit_item_mod(&mut self, _: &'ast syn::ItemMod) {}
    fn visit_item_impl(&mut self, _: &'ast syn::ItemImpl) {}
    fn visit_item_trait(&mut self, _: &'ast syn::ItemTrait) {}
}

fn is_public(vis: &Visibility) -> bool {
    matches!(vis, Visibility::Public(_))
}

/// Initializer of the top-level exported binding named `binding`
pub fn find_binding(file: &syn::File, binding: &str) -> Option<Expr> {
    let mut finder = BindingFinder {
        binding,
        found: None,
    };
    finder.visit_file(file);
    finder.found
}

/// Elements of `&[...]`, `[...]` or `vec![...]`
pub fn array_elements(expr: &Expr) -> Result<Vec<Expr>, String> {
    match expr {
        Expr::Reference(reference) => array_elements(&reference.expr),
        Expr::Group(group) => array_elements(&group.expr),
        Expr::Paren(paren) => array_elements(&paren.expr),
        Expr::Array(array) => Ok(array.elems.iter().cloned().collect()),
        Expr::Macro(mac) if mac.mac.path.is_ident("vec") => mac
            .mac
            .parse_body_with(Punctuated::<Expr, Token![,]>::parse_terminated)
            .map(|elems| elems.into_iter().collect())
            .map_err(|e| format!("malformed vec! body: {}", e)),
        _ => Err("expected an array literal (`&[...]`, `[...]` or `vec![...]`)".to_string()),
    }
}

pub fn line_of(expr: &Expr) -> usize {
    expr.span().start().line
}

/// Read one struct-literal element
pub fn match_record(expr: &Expr) -> Result<Record, Vec<String>> {
    match expr {
        Expr::Struct(literal) => read_struct(literal),
        Expr::Group(group) => match_record(&group.expr),
        Expr::Paren(paren) => match_record(&paren.expr),
        _ => Err(vec!["expected a struct literal".to_string()]),
    }
}

fn read_struct(literal: &ExprStruct) -> Result<Record, Vec<String>> {
    let type_name = literal
        .path
        .segments
        .last()
        .map(|s| s.ident.to_string())
        .unwrap_or_default();
    let mut fields = Vec::with_capacity(literal.fields.len());
    let mut errors = Vec::new();

    for field in &literal.fields {
        let name = match &field.member {
            Member::Named(ident) => ident.to_string(),
            Member::Unnamed(index) => {
                errors.push(format!("unexpected positional field {}", index.index));
                continue;
            }
        };
        match read_literal(&field.expr) {
            Ok(value) => fields.push((name, value)),
            Err(message) => errors.push(format!("field `{}`: {}", name, message)),
        }
    }

    if errors.is_empty() {
        Ok(Record {
            type_name,
            line: literal.span().start().line,
            fields,
        })
    } else {
        Err(errors)
    }
}

fn read_literal(expr: &Expr) -> Result<Literal, String> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Ok(Literal::Str(s.value())),
            Lit::Bool(b) => Ok(Literal::Bool(b.value)),
            Lit::Int(i) => i
                .base10_parse::<i64>()
                .map(Literal::Int)
                .map_err(|e| e.to_string()),
            Lit::Float(f) => Ok(Literal::Float(f.base10_digits().to_string())),
            _ => Err("unsupported literal".to_string()),
        },
        Expr::Reference(reference) => read_literal(&reference.expr),
        Expr::Group(group) => read_literal(&group.expr),
        Expr::Paren(paren) => read_literal(&paren.expr),
        Expr::Array(_) | Expr::Macro(_) => {
            let elements = array_elements(expr)?;
            read_list(&elements)
        }
        Expr::Call(call) => {
            let callee = match call.func.as_ref() {
                Expr::Path(path) => path
                    .path
                    .segments
                    .iter()
                    .map(|s| s.ident.to_string())
                    .collect::<Vec<_>>()
                    .join("::"),
                _ => String::new(),
            };
            match (callee.as_str(), call.args.len()) {
                ("Some" | "String::from", 1) => read_literal(&call.args[0]),
                _ => Err(format!("unsupported call `{}`", callee)),
            }
        }
        Expr::MethodCall(call)
            if call.args.is_empty()
                && matches!(
                    call.method.to_string().as_str(),
                    "to_string" | "to_owned" | "into"
                ) =>
        {
            read_literal(&call.receiver)
        }
        Expr::Path(path) if path.path.is_ident("None") => Ok(Literal::Absent),
        Expr::Path(path) => path
            .path
            .segments
            .last()
            .map(|s| Literal::Variant(s.ident.to_string()))
            .ok_or_else(|| "empty path".to_string()),
        _ => Err("unsupported expression".to_string()),
    }
}

fn read_list(elements: &[Expr]) -> Result<Literal, String> {
    if elements.is_empty() {
        return Ok(Literal::StrList(Vec::new()));
    }

    if elements.iter().all(|e| matches!(strip(e), Expr::Struct(_))) {
        let mut records = Vec::with_capacity(elements.len());
        let mut errors = Vec::new();
        for (index, element) in elements.iter().enumerate() {
            match match_record(element) {
                Ok(record) => records.push(record),
                Err(reasons) => errors.push(format!("element {}: {}", index, reasons.join("; "))),
            }
        }
        return if errors.is_empty() {
            Ok(Literal::Records(records))
        } else {
            Err(errors.join("; "))
        };
    }

    let mut values = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        match read_literal(element)? {
            Literal::Str(value) => values.push(value),
            other => {
                return Err(format!(
                    "element {} must be a string, found {}",
                    index,
                    other.describe()
                ))
            }
        }
    }
    Ok(Literal::StrList(values))
}

fn strip(expr: &Expr) -> &Expr {
    match expr {
        Expr::Group(group) => strip(&group.expr),
        Expr::Paren(paren) => strip(&paren.expr),
        _ => expr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> syn::File {
        syn::parse_file(source).unwrap()
    }

    #[test]
    fn test_find_binding_ignores_private_and_nested() {
        let file = parse(
            r#"
            const COMMANDS: &[u8] = &[];
            mod inner { pub const COMMANDS: &[u8] = &[1]; }
            fn f() { const COMMANDS: &[u8] = &[2]; }
            "#,
        );
        assert!(find_binding(&file, "COMMANDS").is_none());

        let file = parse("pub static COMMANDS: &[Command] = &[];");
        assert!(find_binding(&file, "COMMANDS").is_some());
    }

    #[test]
    fn test_array_forms() {
        for source in [
            "pub const X: &[T] = &[T { a: 1 }, T { a: 2 }];",
            "pub const X: [T; 2] = [T { a: 1 }, T { a: 2 }];",
            "pub static X: Vec<T> = vec![T { a: 1 }, T { a: 2 }];",
        ] {
            let expr = find_binding(&parse(source), "X").unwrap();
            assert_eq!(array_elements(&expr).unwrap().len(), 2, "{}", source);
        }
    }

    #[test]
    fn test_match_record_decodes_literals() {
        let expr: Expr = syn::parse_str(
            r####"Pattern {
                name: "escape",
                category: Category::Backend,
                code: r#"let s = "a\nb";"#,
                tags: &["a", "b"],
                default: Some("api"),
                alias: None,
                count: 3,
                flag: true,
                options: &[Opt { name: "x".to_string() }],
            }"####,
        )
        .unwrap();
        let record = match_record(&expr).unwrap();
        assert_eq!(record.type_name, "Pattern");
        assert_eq!(record.label().as_deref(), Some("escape"));
        assert_eq!(record.get("category"), Some(&Literal::Variant("Backend".into())));
        assert_eq!(
            record.get("code"),
            Some(&Literal::Str("let s = \"a\\nb\";".into()))
        );
        assert_eq!(
            record.get("tags"),
            Some(&Literal::StrList(vec!["a".into(), "b".into()]))
        );
        assert_eq!(record.get("default"), Some(&Literal::Str("api".into())));
        assert_eq!(record.get("alias"), Some(&Literal::Absent));
        assert_eq!(record.get("count"), Some(&Literal::Int(3)));
        assert_eq!(record.get("flag"), Some(&Literal::Bool(true)));
        match record.get("options") {
            Some(Literal::Records(options)) => {
                assert_eq!(options[0].label().as_deref(), Some("x"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_match_record_reports_every_bad_field() {
        let expr: Expr = syn::parse_str(r#"Cmd { name: format!("x"), tags: &["a", 1] }"#).unwrap();
        let errors = match_record(&expr).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("field `name`"));
        assert!(errors[1].contains("field `tags`"));
    }
}
