//! Canonical model builder.
//!
//! Merges a [`TableSchema`] with the user's options into a serializable
//! [`GenerationContext`] that templates read directly. Everything that needs a
//! decision (Rust types, SQL text, cross-module paths, which optional pieces
//! are emitted) is settled here so templates stay declarative. Building is
//! pure: no catalog access, no filesystem.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crudforge_core::naming::{
    escape_rust_keyword, pluralize_word, singularize_word, to_kebab_case, to_pascal_case,
    to_snake_case, to_upper_snake_case,
};
use crudforge_core::{ForgeError, ForgeResult};
use crudforge_introspect::source::PACKAGE_TIERS;
use crudforge_introspect::{
    ColumnDescriptor, CommandDescriptor, FieldRole, PackageDescriptor, PatternCategory,
    PatternDescriptor, SourceBundle, TableSchema,
};
use serde::Serialize;

use crate::roles::ACTIONS;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageTier {
    #[default]
    Standard,
    Enterprise,
    Full,
}

impl PackageTier {
    pub const ALL: [PackageTier; 3] = [
        PackageTier::Standard,
        PackageTier::Enterprise,
        PackageTier::Full,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageTier::Standard => "standard",
            PackageTier::Enterprise => "enterprise",
            PackageTier::Full => "full",
        }
    }

    /// Bulk import is part of every tier above standard
    pub fn implies_import(&self) -> bool {
        !matches!(self, PackageTier::Standard)
    }
}

impl fmt::Display for PackageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PackageTier::ALL
            .iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown package `{}` (expected standard, enterprise or full)", s))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Backend,
    Frontend,
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "backend" => Ok(Target::Backend),
            "frontend" => Ok(Target::Frontend),
            other => Err(format!("unknown target `{}` (expected backend or frontend)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Flat,
    #[default]
    Domain,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelOptions {
    pub package: PackageTier,
    pub target: Target,
    pub layout: Layout,
    pub with_events: bool,
    pub with_import: bool,
    /// Domain path (`inventory` or `inventory/stock`) for the domain layout
    pub domain: Option<String>,
    /// All routes of the domain, in declaration order
    pub routes: Vec<String>,
    /// Route this context renders; `core` when unset
    pub route: Option<String>,
}

pub const CORE_ROUTE: &str = "core";

/// Query-string parameters every list endpoint owns
const RESERVED_QUERY_PARAMS: &[&str] = &["page", "limit", "search", "sort", "include_deleted"];

const STATUS_BOOLEANS: &[&str] = &[
    "is_active",
    "active",
    "enabled",
    "is_enabled",
    "is_published",
    "is_verified",
];

const SQL_RESERVED: &[&str] = &[
    "all", "and", "any", "array", "as", "asc", "case", "check", "column", "constraint", "create",
    "default", "desc", "distinct", "do", "else", "end", "except", "false", "for", "foreign",
    "from", "grant", "group", "having", "in", "into", "is", "join", "limit", "not", "null",
    "offset", "on", "or", "order", "primary", "references", "select", "table", "then", "to",
    "true", "union", "unique", "user", "using", "when", "where", "with",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceNames {
    /// Table name as stored in the catalog
    pub table: String,
    /// Schema-qualified table reference used in SQL
    pub sql_table: String,
    pub snake: String,
    pub singular: String,
    /// `Widget`
    pub struct_name: String,
    pub upper: String,
    pub kebab: String,
    /// Human label, `Widget`
    pub title: String,
    /// Prefix of every permission name
    pub permission: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldContext {
    pub name: String,
    /// Column reference inside SQL
    pub column: String,
    pub ident: String,
    pub renamed: bool,
    pub label: String,
    pub role: FieldRole,
    /// Non-optional Rust type
    pub base_type: String,
    /// Row type, `Option<_>` for nullable columns
    pub rust_type: String,
    /// Type in the create payload
    pub create_type: String,
    pub nullable: bool,
    pub is_primary_key: bool,
    pub has_default: bool,
    pub default: Option<String>,
    pub in_create: bool,
    pub create_required: bool,
    pub in_update: bool,
    pub in_response: bool,
    pub is_text: bool,
    pub searchable: bool,
    pub exact_match: bool,
    pub range: bool,
    pub sortable: bool,
    pub sensitive: bool,
    pub max_length: Option<i32>,
    pub enum_type: Option<String>,
    pub foreign_table: Option<String>,
    pub foreign_column: Option<String>,
    pub display_columns: Vec<String>,
    /// Validation rules as rendered Rust expressions of the generated `Rule` enum
    pub checks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumVariant {
    pub ident: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumContext {
    pub name: String,
    pub sql_type: String,
    pub variants: Vec<EnumVariant>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DerivedFlags {
    pub has_soft_delete: bool,
    pub has_status_boolean: bool,
    pub has_timestamps: bool,
    pub has_created_at: bool,
    pub has_updated_at: bool,
    pub has_foreign_keys: bool,
    pub has_unique_constraints: bool,
    pub has_enumerations: bool,
}

/// Optional pieces of the generated module, resolved from tier and toggles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Features {
    pub events: bool,
    pub import: bool,
    pub dropdown: bool,
    pub bulk_delete: bool,
    pub uniqueness_checks: bool,
    pub stats: bool,
}

/// Paths the generated files use to reach each other
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModulePaths {
    pub types: String,
    pub schemas: String,
    pub repository: String,
    pub service: String,
    pub handlers: String,
    pub events: String,
    pub import: String,
}

impl ModulePaths {
    fn flat() -> Self {
        Self {
            types: "super::types".into(),
            schemas: "super::schemas".into(),
            repository: "super::repository".into(),
            service: "super::service".into(),
            handlers: "super::handlers".into(),
            events: "super::events".into(),
            import: "super::import".into(),
        }
    }

    fn domain(route: &str) -> Self {
        let module = escape_rust_keyword(route);
        let layer = |dir: &str| format!("super::super::{}::{}", dir, module);
        Self {
            types: layer("types"),
            schemas: layer("schemas"),
            repository: layer("repositories"),
            service: layer("services"),
            handlers: layer("controllers"),
            events: format!("super::super::services::{}_events", route),
            import: format!("super::super::services::{}_import", route),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniqueCheck {
    pub field: String,
    pub ident: String,
    pub function: String,
    pub base_type: String,
    pub create_required: bool,
    pub sql: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SqlStatements {
    pub columns: String,
    pub find_by_id: String,
    pub insert: String,
    pub update: String,
    pub delete: String,
    pub list: String,
    pub count: String,
    pub default_order: String,
    pub live_filter: Option<String>,
    pub dropdown: String,
    pub bulk_delete: String,
    pub stats: String,
}

/// URL paths mounted by the generated router
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoints {
    pub collection: String,
    pub item: String,
    pub dropdown: String,
    pub bulk_delete: String,
    pub import: String,
    pub stats: String,
}

impl Endpoints {
    fn under(base: &str) -> Self {
        Self {
            collection: base.to_string(),
            item: format!("{}/:id", base),
            dropdown: format!("{}/dropdown", base),
            bulk_delete: format!("{}/bulk-delete", base),
            import: format!("{}/import", base),
            stats: format!("{}/stats", base),
        }
    }
}

/// Handler function names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerNames {
    pub list: String,
    pub get: String,
    pub create: String,
    pub update: String,
    pub delete: String,
    pub dropdown: String,
    pub bulk_delete: String,
    pub import: String,
    pub stats: String,
}

impl HandlerNames {
    fn for_resource(resource: &ResourceNames) -> Self {
        let one = &resource.singular;
        let many = &resource.snake;
        Self {
            list: format!("list_{}", many),
            get: format!("get_{}", one),
            create: format!("create_{}", one),
            update: format!("update_{}", one),
            delete: format!("delete_{}", one),
            dropdown: format!("{}_dropdown", one),
            bulk_delete: format!("bulk_delete_{}", many),
            import: format!("import_{}", many),
            stats: format!("{}_stats", one),
        }
    }
}

/// `pub const CREATE: &str = "widgets.create";`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionConst {
    pub ident: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Messages {
    pub invalid: String,
    pub storage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationContext {
    pub schema: String,
    pub resource: ResourceNames,
    pub primary_key: FieldContext,
    pub fields: Vec<FieldContext>,
    pub create_fields: Vec<FieldContext>,
    pub update_fields: Vec<FieldContext>,
    /// Payload fields carrying validation rules
    pub create_checked: Vec<FieldContext>,
    pub update_checked: Vec<FieldContext>,
    pub response_fields: Vec<FieldContext>,
    pub exact_filters: Vec<FieldContext>,
    pub range_filters: Vec<FieldContext>,
    pub search_columns: Vec<String>,
    pub enums: Vec<EnumContext>,
    pub unique_checks: Vec<UniqueCheck>,
    pub composite_unique: Vec<Vec<String>>,
    pub flags: DerivedFlags,
    pub features: Features,
    pub status_field: Option<String>,
    pub label_field: String,
    pub package: PackageTier,
    pub target: Target,
    pub layout: Layout,
    pub domain: Option<String>,
    pub route: String,
    pub routes: Vec<String>,
    /// URL path the router mounts, `/widgets`
    pub api_path: String,
    pub endpoints: Endpoints,
    pub handlers: HandlerNames,
    pub permissions: Vec<PermissionConst>,
    pub paths: ModulePaths,
    pub sql: SqlStatements,
    pub messages: Messages,
}

impl GenerationContext {
    pub fn has_feature_files(&self) -> bool {
        self.features.events || self.features.import
    }
}

/// Build the generation context for one table
pub fn build(schema: &TableSchema, options: &ModelOptions) -> ForgeResult<GenerationContext> {
    let pk_name = match schema.primary_key.as_slice() {
        [single] => single.clone(),
        [] => {
            return Err(ForgeError::validation(
                &schema.name,
                vec!["table has no primary key".to_string()],
            ))
        }
        _ => {
            return Err(ForgeError::validation(
                &schema.name,
                vec![format!(
                    "composite primary key ({}) is not supported",
                    schema.primary_key.join(", ")
                )],
            ))
        }
    };

    let resource = resource_names(schema);
    let enums = collect_enums(schema, &resource);
    let fields: Vec<FieldContext> = schema
        .columns
        .iter()
        .map(|column| field_context(column, &resource, &enums))
        .collect();

    let primary_key = fields
        .iter()
        .find(|f| f.name == pk_name)
        .cloned()
        .ok_or_else(|| ForgeError::not_found("Primary key column", format!("{}.{}", schema.name, pk_name)))?;

    let flags = derive_flags(schema, &enums);
    let status_field = status_field(schema);
    let label_field = schema
        .display_columns()
        .into_iter()
        .next()
        .unwrap_or_else(|| pk_name.clone());

    let features = resolve_features(options, &flags);
    let route = options
        .route
        .clone()
        .unwrap_or_else(|| CORE_ROUTE.to_string());
    let (paths, api_path) = match (options.layout, options.domain.as_deref()) {
        (Layout::Domain, Some(domain)) => (ModulePaths::domain(&route), domain_api_path(domain, &route)),
        (Layout::Domain, None) => (ModulePaths::domain(&route), format!("/{}", resource.kebab)),
        (Layout::Flat, _) => (ModulePaths::flat(), format!("/{}", resource.kebab)),
    };

    let create_fields: Vec<FieldContext> = fields.iter().filter(|f| f.in_create).cloned().collect();
    let update_fields: Vec<FieldContext> = fields.iter().filter(|f| f.in_update).cloned().collect();
    let create_checked = create_fields
        .iter()
        .filter(|f| !f.checks.is_empty())
        .cloned()
        .collect();
    let update_checked = update_fields
        .iter()
        .filter(|f| !f.checks.is_empty())
        .cloned()
        .collect();
    let response_fields = fields.iter().filter(|f| f.in_response).cloned().collect();
    let exact_filters = fields
        .iter()
        .filter(|f| f.exact_match && !RESERVED_QUERY_PARAMS.contains(&f.ident.as_str()))
        .cloned()
        .collect();
    let range_filters = fields.iter().filter(|f| f.range).cloned().collect();
    let search_columns = fields
        .iter()
        .filter(|f| f.searchable)
        .map(|f| f.column.clone())
        .collect();

    let unique_checks = if features.uniqueness_checks {
        unique_checks(schema, &fields, &resource, &primary_key, &flags)
    } else {
        Vec::new()
    };

    let sql = sql_statements(
        &resource,
        &fields,
        &create_fields,
        &update_fields,
        &primary_key,
        &flags,
        status_field.as_deref(),
        &label_field,
    );

    let permissions = ACTIONS
        .iter()
        .map(|action| PermissionConst {
            ident: action.to_uppercase(),
            name: format!("{}.{}", resource.permission, action),
        })
        .collect();
    let endpoints = Endpoints::under(&api_path);
    let handlers = HandlerNames::for_resource(&resource);

    let messages = Messages {
        invalid: format!("{} request is invalid", resource.title),
        storage: format!("{} storage error", resource.title),
    };

    Ok(GenerationContext {
        schema: schema.schema.clone(),
        resource,
        primary_key,
        fields,
        create_fields,
        update_fields,
        create_checked,
        update_checked,
        response_fields,
        exact_filters,
        range_filters,
        search_columns,
        enums,
        unique_checks,
        composite_unique: schema.unique.composite.clone(),
        flags,
        features,
        status_field,
        label_field,
        package: options.package,
        target: options.target,
        layout: options.layout,
        domain: options.domain.clone(),
        route,
        routes: options.routes.clone(),
        api_path,
        endpoints,
        handlers,
        permissions,
        paths,
        sql,
        messages,
    })
}

fn domain_api_path(domain: &str, route: &str) -> String {
    let base: Vec<String> = domain.split('/').map(to_kebab_case).collect();
    if route == CORE_ROUTE {
        format!("/{}", base.join("/"))
    } else {
        format!("/{}/{}", base.join("/"), to_kebab_case(route))
    }
}

fn resource_names(schema: &TableSchema) -> ResourceNames {
    let snake = to_snake_case(&schema.name);
    let singular = singularize_word(&snake);
    let sql_table = if schema.schema == "public" || schema.schema.is_empty() {
        sql_ident(&schema.name)
    } else {
        format!("{}.{}", sql_ident(&schema.schema), sql_ident(&schema.name))
    };
    ResourceNames {
        table: schema.name.clone(),
        sql_table,
        upper: to_upper_snake_case(&snake),
        kebab: to_kebab_case(&snake),
        struct_name: to_pascal_case(&singular),
        title: humanize(&singular),
        permission: snake.clone(),
        singular,
        snake,
    }
}

/// Quote an identifier only when SQL requires it
pub fn sql_ident(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .map(|c| c.is_ascii_lowercase() || c == '_')
        .unwrap_or(false)
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if plain && !SQL_RESERVED.contains(&name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// `unit_price` -> `Unit price`
pub fn humanize(name: &str) -> String {
    let spaced = to_snake_case(name).replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => spaced,
    }
}

/// Rust type for a catalog type, before nullability
pub fn rust_base_type(column: &ColumnDescriptor, enum_type: Option<&str>) -> String {
    if let Some(name) = enum_type {
        return name.to_string();
    }
    let udt = column.udt_name.as_str();
    if let Some(element) = udt.strip_prefix('_') {
        let inner = ColumnDescriptor {
            udt_name: element.to_string(),
            data_type: String::new(),
            ..column.clone()
        };
        return format!("Vec<{}>", rust_base_type(&inner, None));
    }
    match udt {
        "uuid" => "uuid::Uuid",
        "int2" => "i16",
        "int4" => "i32",
        "int8" => "i64",
        "float4" => "f32",
        "float8" => "f64",
        "numeric" => "rust_decimal::Decimal",
        "bool" => "bool",
        "timestamptz" => "chrono::DateTime<chrono::Utc>",
        "timestamp" => "chrono::NaiveDateTime",
        "date" => "chrono::NaiveDate",
        "time" => "chrono::NaiveTime",
        "json" | "jsonb" => "serde_json::Value",
        "bytea" => "Vec<u8>",
        _ => "String",
    }
    .to_string()
}

fn enum_name(column: &ColumnDescriptor, resource: &ResourceNames) -> String {
    if column.data_type == "USER-DEFINED" {
        to_pascal_case(&column.udt_name)
    } else {
        format!("{}{}", resource.struct_name, to_pascal_case(&column.name))
    }
}

fn variant_ident(value: &str, taken: &mut BTreeSet<String>) -> String {
    let mut ident = to_pascal_case(value)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident = format!("V{}", ident);
    }
    if ident == "Self" {
        ident.push('_');
    }
    let mut candidate = ident.clone();
    let mut suffix = 2;
    while !taken.insert(candidate.clone()) {
        candidate = format!("{}{}", ident, suffix);
        suffix += 1;
    }
    candidate
}

fn collect_enums(schema: &TableSchema, resource: &ResourceNames) -> Vec<EnumContext> {
    let mut enums: Vec<EnumContext> = Vec::new();
    for column in schema.columns.iter().filter(|c| c.is_enumerated()) {
        let name = enum_name(column, resource);
        if enums.iter().any(|e| e.name == name) {
            continue;
        }
        let mut taken = BTreeSet::new();
        let variants = column
            .enum_values
            .iter()
            .map(|value| EnumVariant {
                ident: variant_ident(value, &mut taken),
                value: value.clone(),
            })
            .collect();
        enums.push(EnumContext {
            name,
            sql_type: column.udt_name.clone(),
            variants,
        });
    }
    enums
}

fn is_sortable(column: &ColumnDescriptor) -> bool {
    if column.is_sensitive() || column.udt_name.starts_with('_') {
        return false;
    }
    !matches!(column.role, FieldRole::LongText | FieldRole::Password)
        && !matches!(column.udt_name.as_str(), "json" | "jsonb" | "bytea")
}

fn is_copy_filter(base_type: &str) -> bool {
    !matches!(base_type, "String" | "serde_json::Value") && !base_type.starts_with("Vec<")
}

fn checks_for(column: &ColumnDescriptor, required: bool) -> Vec<String> {
    let mut checks = Vec::new();
    if required {
        checks.push("Rule::Required".to_string());
    }
    if let Some(max) = column.max_length.filter(|m| *m > 0) {
        checks.push(format!("Rule::MaxLength({})", max));
    }
    match column.role {
        FieldRole::Email => checks.push("Rule::Email".to_string()),
        FieldRole::Url => checks.push("Rule::Url".to_string()),
        _ => {}
    }
    checks
}

fn field_context(
    column: &ColumnDescriptor,
    resource: &ResourceNames,
    enums: &[EnumContext],
) -> FieldContext {
    let enum_type = if column.is_enumerated() {
        let name = enum_name(column, resource);
        enums.iter().find(|e| e.name == name).map(|e| e.name.clone())
    } else {
        None
    };
    let base_type = rust_base_type(column, enum_type.as_deref());
    let rust_type = if column.nullable {
        format!("Option<{}>", base_type)
    } else {
        base_type.clone()
    };

    let ident = escape_rust_keyword(&to_snake_case(&column.name));
    let managed = column.role.is_managed();
    let in_create = if column.is_primary_key {
        !column.has_default()
    } else {
        !managed
    };
    let create_required = in_create && !column.nullable && !column.has_default();
    let create_type = if create_required {
        base_type.clone()
    } else {
        format!("Option<{}>", base_type)
    };
    let in_update = in_create && !column.is_primary_key;
    let sensitive = column.is_sensitive();
    let is_text = base_type == "String";

    let checks = if is_text && in_create {
        checks_for(column, create_required)
    } else {
        Vec::new()
    };

    let exact_match = !column.is_primary_key
        && !sensitive
        && (column.is_exact_match() || enum_type.is_some() || column.is_foreign_key())
        && !base_type.starts_with("Vec<");
    let range = !sensitive
        && column.name != "deleted_at"
        && column.is_range()
        && is_copy_filter(&base_type);

    let (foreign_table, foreign_column, display_columns) = match &column.foreign_key {
        Some(fk) => (
            Some(fk.table.clone()),
            Some(fk.column.clone()),
            fk.display_columns.clone(),
        ),
        None => (None, None, Vec::new()),
    };

    FieldContext {
        name: column.name.clone(),
        column: sql_ident(&column.name),
        renamed: ident != column.name,
        label: humanize(&column.name),
        role: column.role,
        base_type,
        rust_type,
        create_type,
        nullable: column.nullable,
        is_primary_key: column.is_primary_key,
        has_default: column.has_default(),
        default: column.default.clone(),
        in_create,
        create_required,
        in_update,
        in_response: !sensitive,
        is_text,
        searchable: !sensitive && column.is_searchable(),
        exact_match,
        range,
        sortable: is_sortable(column),
        sensitive,
        max_length: column.max_length,
        enum_type,
        foreign_table,
        foreign_column,
        display_columns,
        checks,
        ident,
    }
}

fn derive_flags(schema: &TableSchema, enums: &[EnumContext]) -> DerivedFlags {
    let has_created_at = schema.has_column("created_at");
    let has_updated_at = schema.has_column("updated_at");
    DerivedFlags {
        has_soft_delete: schema.has_column("deleted_at"),
        has_status_boolean: status_field(schema).is_some(),
        has_timestamps: has_created_at || has_updated_at,
        has_created_at,
        has_updated_at,
        has_foreign_keys: !schema.foreign_keys.is_empty(),
        has_unique_constraints: !schema.unique.is_empty(),
        has_enumerations: !enums.is_empty(),
    }
}

fn status_field(schema: &TableSchema) -> Option<String> {
    schema
        .columns
        .iter()
        .filter(|c| c.role == FieldRole::Boolean)
        .find(|c| STATUS_BOOLEANS.contains(&c.name.as_str()) || c.name.contains("status"))
        .map(|c| c.name.clone())
}

fn resolve_features(options: &ModelOptions, flags: &DerivedFlags) -> Features {
    let enterprise = options.package != PackageTier::Standard;
    let full = options.package == PackageTier::Full;
    Features {
        events: options.with_events,
        import: options.with_import || options.package.implies_import(),
        dropdown: enterprise,
        bulk_delete: enterprise,
        uniqueness_checks: full && flags.has_unique_constraints,
        stats: full,
    }
}

fn unique_checks(
    schema: &TableSchema,
    fields: &[FieldContext],
    resource: &ResourceNames,
    primary_key: &FieldContext,
    flags: &DerivedFlags,
) -> Vec<UniqueCheck> {
    let live = if flags.has_soft_delete {
        " AND deleted_at IS NULL"
    } else {
        ""
    };
    schema
        .unique
        .single_field
        .iter()
        .filter_map(|name| fields.iter().find(|f| &f.name == name))
        .filter(|f| f.in_create && !f.is_primary_key)
        .map(|f| UniqueCheck {
            field: f.name.clone(),
            ident: f.ident.clone(),
            function: format!("exists_by_{}", to_snake_case(&f.name)),
            base_type: f.base_type.clone(),
            create_required: f.create_required,
            sql: format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = $1 AND {} IS DISTINCT FROM $2{})",
                resource.sql_table, f.column, primary_key.column, live
            ),
        })
        .collect()
}

/// Optional payload fields with a column default fall back to it; SQL's
/// `DEFAULT` keyword is not an expression, so the default is inlined
fn insert_value(field: &FieldContext, index: usize) -> String {
    match &field.default {
        Some(default) if !field.create_required => format!("COALESCE(${}, {})", index, default),
        _ => format!("${}", index),
    }
}

#[allow(clippy::too_many_arguments)]
fn sql_statements(
    resource: &ResourceNames,
    fields: &[FieldContext],
    create_fields: &[FieldContext],
    update_fields: &[FieldContext],
    primary_key: &FieldContext,
    flags: &DerivedFlags,
    status_field: Option<&str>,
    label_field: &str,
) -> SqlStatements {
    let table = &resource.sql_table;
    let pk = &primary_key.column;
    let columns = fields
        .iter()
        .map(|f| f.column.clone())
        .collect::<Vec<_>>()
        .join(", ");
    let live = flags.has_soft_delete.then(|| "deleted_at IS NULL".to_string());
    let and_live = live
        .as_ref()
        .map(|l| format!(" AND {}", l))
        .unwrap_or_default();
    let where_live = live
        .as_ref()
        .map(|l| format!(" WHERE {}", l))
        .unwrap_or_default();

    let find_by_id = format!("SELECT {} FROM {} WHERE {} = $1{}", columns, table, pk, and_live);

    let insert = if create_fields.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, columns)
    } else {
        let names = create_fields
            .iter()
            .map(|f| f.column.clone())
            .collect::<Vec<_>>()
            .join(", ");
        let values = create_fields
            .iter()
            .enumerate()
            .map(|(i, f)| insert_value(f, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table, names, values, columns
        )
    };

    let mut assignments: Vec<String> = update_fields
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{} = COALESCE(${}, {})", f.column, i + 2, f.column))
        .collect();
    if flags.has_updated_at {
        assignments.push("updated_at = NOW()".to_string());
    }
    if assignments.is_empty() {
        assignments.push(format!("{} = {}", pk, pk));
    }
    let update = format!(
        "UPDATE {} SET {} WHERE {} = $1{} RETURNING {}",
        table,
        assignments.join(", "),
        pk,
        and_live,
        columns
    );

    let delete = if flags.has_soft_delete {
        format!(
            "UPDATE {} SET deleted_at = NOW() WHERE {} = $1 AND deleted_at IS NULL",
            table, pk
        )
    } else {
        format!("DELETE FROM {} WHERE {} = $1", table, pk)
    };

    let bulk_delete = if flags.has_soft_delete {
        format!(
            "UPDATE {} SET deleted_at = NOW() WHERE {} = ANY($1) AND deleted_at IS NULL",
            table, pk
        )
    } else {
        format!("DELETE FROM {} WHERE {} = ANY($1)", table, pk)
    };

    let default_order = if flags.has_created_at {
        "created_at DESC".to_string()
    } else {
        format!("{} ASC", pk)
    };

    let label = sql_ident(label_field);
    let dropdown = format!(
        "SELECT {} AS value, COALESCE({}::text, '') AS label FROM {}{} ORDER BY label LIMIT 500",
        pk, label, table, where_live
    );

    let mut aggregates = vec!["COUNT(*) AS total".to_string()];
    if let Some(status) = status_field {
        aggregates.push(format!(
            "COUNT(*) FILTER (WHERE {}) AS active",
            sql_ident(status)
        ));
    }
    if flags.has_created_at {
        aggregates.push(
            "COUNT(*) FILTER (WHERE created_at >= NOW() - INTERVAL '30 days') AS recent".to_string(),
        );
    }
    let stats = format!("SELECT {} FROM {}{}", aggregates.join(", "), table, where_live);

    SqlStatements {
        list: format!("SELECT {} FROM {}", columns, table),
        count: format!("SELECT COUNT(*) FROM {}", table),
        columns,
        find_by_id,
        insert,
        update,
        delete,
        default_order,
        live_filter: live,
        dropdown,
        bulk_delete,
        stats,
    }
}

/// A pattern category and how many extracted patterns fill it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryEntry {
    pub name: String,
    pub variant: String,
    pub patterns: usize,
    pub placeholder: bool,
}

/// Everything the reference table template renders
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceModel {
    pub commands: Vec<CommandDescriptor>,
    pub patterns: Vec<PatternDescriptor>,
    pub packages: Vec<PackageDescriptor>,
    pub categories: Vec<CategoryEntry>,
    /// Names of packages filled in with placeholder content
    pub placeholder_packages: Vec<String>,
}

pub fn placeholder_package(tier: &str) -> PackageDescriptor {
    PackageDescriptor {
        name: tier.to_string(),
        description: format!("{} package (no description documented yet)", humanize(tier)),
        features: Vec::new(),
        use_cases: Vec::new(),
        command: format!("crudforge generate <resource> --package {}", tier),
    }
}

/// Build the reference model, filling expected package tiers and pattern
/// categories that no source declared
pub fn build_reference(bundle: &SourceBundle) -> ReferenceModel {
    let mut packages = bundle.packages.clone();
    let mut placeholder_packages = Vec::new();
    for tier in PACKAGE_TIERS {
        if !packages.iter().any(|p| p.name.eq_ignore_ascii_case(tier)) {
            packages.push(placeholder_package(tier));
            placeholder_packages.push(tier.to_string());
        }
    }

    let categories = PatternCategory::ALL
        .iter()
        .map(|category| {
            let count = bundle
                .patterns
                .iter()
                .filter(|p| p.category == *category)
                .count();
            CategoryEntry {
                name: category.as_str().to_string(),
                variant: category.variant().to_string(),
                patterns: count,
                placeholder: count == 0,
            }
        })
        .collect();

    ReferenceModel {
        commands: bundle.commands.clone(),
        patterns: bundle.patterns.clone(),
        packages,
        categories,
        placeholder_packages,
    }
}

/// Tables tried, in order, for a non-core domain route
pub fn route_table_candidates(domain: &str, route: &str) -> Vec<String> {
    let domain_root = to_snake_case(domain.rsplit('/').next().unwrap_or(domain));
    let route = to_snake_case(route);
    let mut candidates = vec![
        format!("{}_{}", domain_root, route),
        route.clone(),
        pluralize_word(&route),
    ];
    candidates.dedup();
    candidates
}
