use std::collections::HashMap;
use std::error::Error as _;
use std::fmt;

use crudforge_core::naming::{
    pluralize_word, to_camel_case, to_kebab_case, to_pascal_case, to_snake_case,
    to_upper_snake_case,
};
use crudforge_core::{ForgeError, ForgeResult};
use serde::Serialize;
use tera::{Context, Tera, Value};

use crate::escape;
use crate::templates;

/// Every template the generator can render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateId {
    Types,
    Schemas,
    Repository,
    Service,
    Events,
    Import,
    Handlers,
    Routes,
    ResourceMod,
    DomainMod,
    LayerMod,
    RoutesMod,
    PermissionsMigration,
    FrontendClient,
    ReferenceTable,
}

impl TemplateId {
    pub const ALL: [TemplateId; 15] = [
        TemplateId::Types,
        TemplateId::Schemas,
        TemplateId::Repository,
        TemplateId::Service,
        TemplateId::Events,
        TemplateId::Import,
        TemplateId::Handlers,
        TemplateId::Routes,
        TemplateId::ResourceMod,
        TemplateId::DomainMod,
        TemplateId::LayerMod,
        TemplateId::RoutesMod,
        TemplateId::PermissionsMigration,
        TemplateId::FrontendClient,
        TemplateId::ReferenceTable,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TemplateId::Types => "types",
            TemplateId::Schemas => "schemas",
            TemplateId::Repository => "repository",
            TemplateId::Service => "service",
            TemplateId::Events => "events",
            TemplateId::Import => "import",
            TemplateId::Handlers => "handlers",
            TemplateId::Routes => "routes",
            TemplateId::ResourceMod => "resource_mod",
            TemplateId::DomainMod => "domain_mod",
            TemplateId::LayerMod => "layer_mod",
            TemplateId::RoutesMod => "routes_mod",
            TemplateId::PermissionsMigration => "permissions_migration",
            TemplateId::FrontendClient => "frontend_client",
            TemplateId::ReferenceTable => "reference_table",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            TemplateId::Types => templates::TYPES_TEMPLATE,
            TemplateId::Schemas => templates::SCHEMAS_TEMPLATE,
            TemplateId::Repository => templates::REPOSITORY_TEMPLATE,
            TemplateId::Service => templates::SERVICE_TEMPLATE,
            TemplateId::Events => templates::EVENTS_TEMPLATE,
            TemplateId::Import => templates::IMPORT_TEMPLATE,
            TemplateId::Handlers => templates::HANDLERS_TEMPLATE,
            TemplateId::Routes => templates::ROUTES_TEMPLATE,
            TemplateId::ResourceMod => templates::RESOURCE_MOD_TEMPLATE,
            TemplateId::DomainMod => templates::DOMAIN_MOD_TEMPLATE,
            TemplateId::LayerMod => templates::LAYER_MOD_TEMPLATE,
            TemplateId::RoutesMod => templates::ROUTES_MOD_TEMPLATE,
            TemplateId::PermissionsMigration => templates::PERMISSIONS_MIGRATION_TEMPLATE,
            TemplateId::FrontendClient => templates::FRONTEND_CLIENT_TEMPLATE,
            TemplateId::ReferenceTable => templates::REFERENCE_TABLE_TEMPLATE,
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tera instance with every template and filter registered.
///
/// Autoescaping is off: output is source code, and literal quoting is done
/// explicitly with the `rust_str`, `fmt_str`, `raw_str` and `sql_str` filters.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    pub fn new() -> ForgeResult<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);

        for id in TemplateId::ALL {
            tera.add_raw_template(id.name(), id.source())
                .map_err(|e| ForgeError::template(describe(&format!("cannot register {}", id), &e)))?;
        }

        tera.register_filter("rust_str", string_filter(escape::rust_str));
        tera.register_filter("fmt_str", string_filter(escape::fmt_str));
        tera.register_filter("raw_str", string_filter(escape::raw_str));
        tera.register_filter("sql_str", string_filter(escape::sql_str));
        tera.register_filter("snake", string_filter(to_snake_case));
        tera.register_filter("pascal", string_filter(to_pascal_case));
        tera.register_filter("camel", string_filter(to_camel_case));
        tera.register_filter("kebab", string_filter(to_kebab_case));
        tera.register_filter("plural", string_filter(pluralize_word));
        tera.register_filter("upper", string_filter(to_upper_snake_case));

        Ok(Self { tera })
    }

    pub fn render<T: Serialize>(&self, id: TemplateId, context: &T) -> ForgeResult<String> {
        let context = Context::from_serialize(context)
            .map_err(|e| ForgeError::template(describe(&format!("bad context for {}", id), &e)))?;
        self.tera
            .render(id.name(), &context)
            .map_err(|e| ForgeError::template(describe(&format!("cannot render {}", id), &e)))
    }
}

/// Tera reports the useful part (missing variable, bad filter argument) in
/// the source chain, so flatten it into the message
fn describe(prefix: &str, error: &tera::Error) -> String {
    let mut message = format!("{}: {}", prefix, error);
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(&format!(": {}", cause));
        source = cause.source();
    }
    message
}

fn string_filter(
    apply: fn(&str) -> String,
) -> impl Fn(&Value, &HashMap<String, Value>) -> tera::Result<Value> + Send + Sync {
    move |value: &Value, _: &HashMap<String, Value>| match value {
        Value::String(s) => Ok(Value::String(apply(s))),
        Value::Number(n) => Ok(Value::String(apply(&n.to_string()))),
        Value::Bool(b) => Ok(Value::String(apply(&b.to_string()))),
        other => Err(tera::Error::msg(format!(
            "expected a string, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_template_registers() {
        assert!(Renderer::new().is_ok());
    }

    #[test]
    fn test_layer_mod_lists_modules() {
        let renderer = Renderer::new().unwrap();
        let out = renderer
            .render(TemplateId::LayerMod, &json!({ "modules": ["core", "stock"] }))
            .unwrap();
        assert_eq!(out, "pub mod core;\npub mod stock;\n");
    }

    #[test]
    fn test_filters_escape_and_rename() {
        let mut tera = Renderer::new().unwrap().tera;
        tera.add_raw_template(
            "filters",
            "{{ a | rust_str }} {{ a | sql_str }} {{ b | pascal }} {{ b | plural }}",
        )
        .unwrap();
        let context = Context::from_serialize(json!({ "a": "it's \"x\"", "b": "stock_item" })).unwrap();
        let out = tera.render("filters", &context).unwrap();
        assert_eq!(out, r#""it's \"x\"" 'it''s "x"' StockItem stock_items"#);
    }

    #[test]
    fn test_missing_variable_is_a_template_error() {
        let renderer = Renderer::new().unwrap();
        let err = renderer
            .render(TemplateId::DomainMod, &json!({}))
            .unwrap_err();
        assert!(matches!(err, ForgeError::Template { .. }));
        assert!(err.to_string().contains("domain_mod"));
    }
}
