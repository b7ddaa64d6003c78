//! Tera sources of every generated file.
//!
//! Templates own their whitespace; the formatter only trims and collapses.
//! Values that end up inside literals always go through an escaping filter.

pub const TYPES_TEMPLATE: &str = r#"//! {{ resource.title }} row, payload and query types.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;
{% for e in enums %}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = {{ e.sql_type | rust_str }})]
pub enum {{ e.name }} {
{%- for v in e.variants %}
    #[serde(rename = {{ v.value | rust_str }})]
    #[sqlx(rename = {{ v.value | rust_str }})]
    {{ v.ident }},
{%- endfor %}
}
{% endfor %}
/// Row of `{{ resource.table }}`
#[derive(Debug, Clone, FromRow)]
pub struct {{ resource.struct_name }} {
{%- for f in fields %}
{%- if f.renamed %}
    #[sqlx(rename = {{ f.name | rust_str }})]
{%- endif %}
    pub {{ f.ident }}: {{ f.rust_type }},
{%- endfor %}
}

#[derive(Debug, Clone, Serialize)]
pub struct {{ resource.struct_name }}Response {
{%- for f in response_fields %}
{%- if f.renamed %}
    #[serde(rename = {{ f.name | rust_str }})]
{%- endif %}
    pub {{ f.ident }}: {{ f.rust_type }},
{%- endfor %}
}

impl From<{{ resource.struct_name }}> for {{ resource.struct_name }}Response {
    fn from(row: {{ resource.struct_name }}) -> Self {
        Self {
{%- for f in response_fields %}
            {{ f.ident }}: row.{{ f.ident }},
{%- endfor %}
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Create{{ resource.struct_name }} {
{%- for f in create_fields %}
{%- if f.renamed %}
    #[serde(rename = {{ f.name | rust_str }})]
{%- endif %}
{%- if not f.create_required %}
    #[serde(default)]
{%- endif %}
    pub {{ f.ident }}: {{ f.create_type }},
{%- endfor %}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Update{{ resource.struct_name }} {
{%- for f in update_fields %}
{%- if f.renamed %}
    #[serde(rename = {{ f.name | rust_str }})]
{%- endif %}
    #[serde(default)]
    pub {{ f.ident }}: Option<{{ f.base_type }}>,
{%- endfor %}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct {{ resource.struct_name }}Query {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    /// Column name, prefixed with `-` for descending order
    pub sort: Option<String>,
{%- for f in exact_filters %}
{%- if f.renamed %}
    #[serde(rename = {{ f.name | rust_str }})]
{%- endif %}
    pub {{ f.ident }}: Option<{{ f.base_type }}>,
{%- endfor %}
{%- for f in range_filters %}
    pub {{ f.name | snake }}_min: Option<{{ f.base_type }}>,
    pub {{ f.name | snake }}_max: Option<{{ f.base_type }}>,
{%- endfor %}
{%- if flags.has_soft_delete %}
    pub include_deleted: Option<bool>,
{%- endif %}
}

impl {{ resource.struct_name }}Query {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            data,
            total,
            page,
            limit,
            total_pages,
        }
    }
}
{%- if features.dropdown %}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DropdownOption {
    pub value: {{ primary_key.base_type }},
    pub label: String,
}
{%- endif %}
{%- if features.bulk_delete %}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<{{ primary_key.base_type }}>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: u64,
}
{%- endif %}
{%- if features.stats %}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct {{ resource.struct_name }}Stats {
    pub total: i64,
{%- if status_field %}
    pub active: i64,
{%- endif %}
{%- if flags.has_created_at %}
    pub recent: i64,
{%- endif %}
}
{%- endif %}
"#;

pub const SCHEMAS_TEMPLATE: &str = r#"//! Payload validation for {{ resource.title | lower }} requests.

use serde::Serialize;

use {{ paths.types }}::{Create{{ resource.struct_name }}, Update{{ resource.struct_name }}};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
enum Rule {
    Required,
    MaxLength(usize),
    Email,
    Url,
}

#[allow(dead_code)]
fn check(errors: &mut Vec<FieldError>, field: &str, value: Option<&str>, rules: &[Rule]) {
    let Some(value) = value else {
        return;
    };
    for rule in rules {
        let failure = match rule {
            Rule::Required if value.trim().is_empty() => Some("is required".to_string()),
            Rule::MaxLength(max) if value.chars().count() > *max => {
                Some(format!("must be at most {} characters", max))
            }
            Rule::Email if !value.contains('@') => Some("must be a valid email address".to_string()),
            Rule::Url if !(value.starts_with("http://") || value.starts_with("https://")) => {
                Some("must be an http(s) URL".to_string())
            }
            _ => None,
        };
        if let Some(message) = failure {
            errors.push(FieldError::new(field, message));
        }
    }
}

fn finish(errors: Vec<FieldError>) -> Result<(), Vec<FieldError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn validate_create(input: &Create{{ resource.struct_name }}) -> Result<(), Vec<FieldError>> {
{%- if create_checked %}
    let mut errors = Vec::new();
{%- for f in create_checked %}
    check(
        &mut errors,
        {{ f.name | rust_str }},
        {% if f.create_required %}Some(input.{{ f.ident }}.as_str()){% else %}input.{{ f.ident }}.as_deref(){% endif %},
        &[{{ f.checks | join(sep=", ") }}],
    );
{%- endfor %}
{%- else %}
    let _ = input;
    let errors = Vec::new();
{%- endif %}
    finish(errors)
}

pub fn validate_update(input: &Update{{ resource.struct_name }}) -> Result<(), Vec<FieldError>> {
{%- if update_checked %}
    let mut errors = Vec::new();
{%- for f in update_checked %}
    check(
        &mut errors,
        {{ f.name | rust_str }},
        input.{{ f.ident }}.as_deref(),
        &[{{ f.checks | join(sep=", ") }}],
    );
{%- endfor %}
{%- else %}
    let _ = input;
    let errors = Vec::new();
{%- endif %}
    finish(errors)
}
"#;

pub const REPOSITORY_TEMPLATE: &str = r#"//! SQL access for `{{ resource.table }}`.

use sqlx::{PgPool, Postgres, QueryBuilder};

use {{ paths.types }}::{
    Create{{ resource.struct_name }}, {{ resource.struct_name }}, {{ resource.struct_name }}Query, Update{{ resource.struct_name }},
{%- if features.dropdown %}
    DropdownOption,
{%- endif %}
{%- if features.stats %}
    {{ resource.struct_name }}Stats,
{%- endif %}
};

const FIND_BY_ID: &str = {{ sql.find_by_id | rust_str }};
const INSERT: &str = {{ sql.insert | rust_str }};
const UPDATE: &str = {{ sql.update | rust_str }};
const DELETE: &str = {{ sql.delete | rust_str }};
const SELECT_LIST: &str = {{ sql.list | rust_str }};
const SELECT_COUNT: &str = {{ sql.count | rust_str }};
const DEFAULT_ORDER: &str = {{ sql.default_order | rust_str }};
{%- if features.dropdown %}
const DROPDOWN: &str = {{ sql.dropdown | rust_str }};
{%- endif %}
{%- if features.bulk_delete %}
const BULK_DELETE: &str = {{ sql.bulk_delete | rust_str }};
{%- endif %}
{%- if features.stats %}
const STATS: &str = {{ sql.stats | rust_str }};
{%- endif %}

/// Whitelisted sort keys and the SQL column each maps to
fn sort_column(name: &str) -> Option<&'static str> {
    match name {
{%- for f in fields %}
{%- if f.sortable %}
        {{ f.name | rust_str }} => Some({{ f.column | rust_str }}),
{%- endif %}
{%- endfor %}
        _ => None,
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &{{ resource.struct_name }}Query) {
    builder.push(" WHERE 1 = 1");
{%- if search_columns %}
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        builder.push(" AND (");
{%- for column in search_columns %}
{%- if not loop.first %}
        builder.push(" OR ");
{%- endif %}
        builder
            .push({{ column | rust_str }})
            .push(" ILIKE ")
            .push_bind(pattern.clone());
{%- endfor %}
        builder.push(")");
    }
{%- endif %}
{%- for f in exact_filters %}
    if let Some(value) = &query.{{ f.ident }} {
        builder
            .push(" AND ")
            .push({{ f.column | rust_str }})
            .push(" = ")
            .push_bind(value.clone());
    }
{%- endfor %}
{%- for f in range_filters %}
    if let Some(value) = query.{{ f.name | snake }}_min {
        builder
            .push(" AND ")
            .push({{ f.column | rust_str }})
            .push(" >= ")
            .push_bind(value);
    }
    if let Some(value) = query.{{ f.name | snake }}_max {
        builder
            .push(" AND ")
            .push({{ f.column | rust_str }})
            .push(" <= ")
            .push_bind(value);
    }
{%- endfor %}
{%- if flags.has_soft_delete %}
    if !query.include_deleted.unwrap_or(false) {
        builder.push(" AND deleted_at IS NULL");
    }
{%- endif %}
}

#[derive(Debug, Clone)]
pub struct {{ resource.struct_name }}Repository {
    pool: PgPool,
}

impl {{ resource.struct_name }}Repository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(
        &self,
        id: &{{ primary_key.base_type }},
    ) -> Result<Option<{{ resource.struct_name }}>, sqlx::Error> {
        sqlx::query_as::<_, {{ resource.struct_name }}>(FIND_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// One page of rows plus the total matching the filters
    pub async fn list(
        &self,
        query: &{{ resource.struct_name }}Query,
    ) -> Result<(Vec<{{ resource.struct_name }}>, i64), sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new(SELECT_COUNT);
        push_filters(&mut count, query);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select = QueryBuilder::<Postgres>::new(SELECT_LIST);
        push_filters(&mut select, query);
        select.push(" ORDER BY ");
        let requested = query.sort.as_deref().map(|sort| match sort.strip_prefix('-') {
            Some(name) => (name, true),
            None => (sort, false),
        });
        match requested.and_then(|(name, descending)| sort_column(name).map(|c| (c, descending))) {
            Some((column, descending)) => {
                select
                    .push(column)
                    .push(if descending { " DESC" } else { " ASC" });
            }
            None => {
                select.push(DEFAULT_ORDER);
            }
        }
        select.push(" LIMIT ").push_bind(query.limit());
        select.push(" OFFSET ").push_bind(query.offset());

        let rows = select
            .build_query_as::<{{ resource.struct_name }}>()
            .fetch_all(&self.pool)
            .await?;
        Ok((rows, total))
    }

    pub async fn create(
        &self,
        input: &Create{{ resource.struct_name }},
    ) -> Result<{{ resource.struct_name }}, sqlx::Error> {
        sqlx::query_as::<_, {{ resource.struct_name }}>(INSERT)
{%- for f in create_fields %}
            .bind(&input.{{ f.ident }})
{%- endfor %}
            .fetch_one(&self.pool)
            .await
    }

    /// Absent payload fields keep their stored value
    pub async fn update(
        &self,
        id: &{{ primary_key.base_type }},
        input: &Update{{ resource.struct_name }},
    ) -> Result<Option<{{ resource.struct_name }}>, sqlx::Error> {
        sqlx::query_as::<_, {{ resource.struct_name }}>(UPDATE)
            .bind(id)
{%- for f in update_fields %}
            .bind(&input.{{ f.ident }})
{%- endfor %}
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn delete(&self, id: &{{ primary_key.base_type }}) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(DELETE).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
{%- if features.dropdown %}

    pub async fn dropdown(&self) -> Result<Vec<DropdownOption>, sqlx::Error> {
        sqlx::query_as::<_, DropdownOption>(DROPDOWN)
            .fetch_all(&self.pool)
            .await
    }
{%- endif %}
{%- if features.bulk_delete %}

    pub async fn bulk_delete(&self, ids: &[{{ primary_key.base_type }}]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(BULK_DELETE).bind(ids).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
{%- endif %}
{%- if features.stats %}

    pub async fn stats(&self) -> Result<{{ resource.struct_name }}Stats, sqlx::Error> {
        sqlx::query_as::<_, {{ resource.struct_name }}Stats>(STATS)
            .fetch_one(&self.pool)
            .await
    }
{%- endif %}
{%- for u in unique_checks %}

    /// Whether another row already holds this `{{ u.field }}`
    pub async fn {{ u.function }}(
        &self,
        value: &{{ u.base_type }},
        exclude: Option<&{{ primary_key.base_type }}>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>({{ u.sql | rust_str }})
            .bind(value)
            .bind(exclude)
            .fetch_one(&self.pool)
            .await
    }
{%- endfor %}
}
"#;

pub const SERVICE_TEMPLATE: &str = r#"//! {{ resource.title }} business rules between the HTTP surface and storage.

use sqlx::PgPool;
use thiserror::Error;

use {{ paths.repository }}::{{ resource.struct_name }}Repository;
use {{ paths.schemas }}::{validate_create, validate_update, FieldError};
use {{ paths.types }}::{
    Create{{ resource.struct_name }}, Paginated, {{ resource.struct_name }}Query, {{ resource.struct_name }}Response, Update{{ resource.struct_name }},
{%- if features.dropdown %}
    DropdownOption,
{%- endif %}
{%- if features.stats %}
    {{ resource.struct_name }}Stats,
{%- endif %}
};
{%- if features.events %}
use {{ paths.events }}::{ {{- resource.struct_name }}Event, {{ resource.struct_name }}Events};
{%- endif %}

pub const RESOURCE: &str = {{ resource.title | rust_str }};

#[derive(Debug, Error)]
pub enum {{ resource.struct_name }}Error {
    #[error("{0}")]
    NotFound(String),
    #[error({{ messages.invalid | fmt_str }})]
    Validation(Vec<FieldError>),
    #[error({{ messages.storage | fmt_str }})]
    Database(#[from] sqlx::Error),
}

impl {{ resource.struct_name }}Error {
    fn not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{} {} not found", RESOURCE, id))
    }
{%- if unique_checks %}

    fn duplicate(field: &str) -> Self {
        Self::Validation(vec![FieldError::new(field, "already exists")])
    }
{%- endif %}
}

#[derive(Debug, Clone)]
pub struct {{ resource.struct_name }}Service {
    repository: {{ resource.struct_name }}Repository,
{%- if features.events %}
    events: {{ resource.struct_name }}Events,
{%- endif %}
}

impl {{ resource.struct_name }}Service {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: {{ resource.struct_name }}Repository::new(pool),
{%- if features.events %}
            events: {{ resource.struct_name }}Events::default(),
{%- endif %}
        }
    }
{%- if features.events %}

    pub fn events(&self) -> &{{ resource.struct_name }}Events {
        &self.events
    }
{%- endif %}

    pub async fn get(
        &self,
        id: &{{ primary_key.base_type }},
    ) -> Result<{{ resource.struct_name }}Response, {{ resource.struct_name }}Error> {
        self.repository
            .find_by_id(id)
            .await?
            .map({{ resource.struct_name }}Response::from)
            .ok_or_else(|| {{ resource.struct_name }}Error::not_found(id))
    }

    pub async fn list(
        &self,
        query: &{{ resource.struct_name }}Query,
    ) -> Result<Paginated<{{ resource.struct_name }}Response>, {{ resource.struct_name }}Error> {
        let (rows, total) = self.repository.list(query).await?;
        let data = rows.into_iter().map({{ resource.struct_name }}Response::from).collect();
        Ok(Paginated::new(data, total, query.page(), query.limit()))
    }

    pub async fn create(
        &self,
        input: Create{{ resource.struct_name }},
    ) -> Result<{{ resource.struct_name }}Response, {{ resource.struct_name }}Error> {
        validate_create(&input).map_err({{ resource.struct_name }}Error::Validation)?;
{%- for u in unique_checks %}
{%- if u.create_required %}
        if self.repository.{{ u.function }}(&input.{{ u.ident }}, None).await? {
            return Err({{ resource.struct_name }}Error::duplicate({{ u.field | rust_str }}));
        }
{%- else %}
        if let Some(value) = &input.{{ u.ident }} {
            if self.repository.{{ u.function }}(value, None).await? {
                return Err({{ resource.struct_name }}Error::duplicate({{ u.field | rust_str }}));
            }
        }
{%- endif %}
{%- endfor %}
        let created = {{ resource.struct_name }}Response::from(self.repository.create(&input).await?);
{%- if features.events %}
        self.events.publish({{ resource.struct_name }}Event::Created(created.clone()));
{%- endif %}
        Ok(created)
    }

    pub async fn update(
        &self,
        id: &{{ primary_key.base_type }},
        input: Update{{ resource.struct_name }},
    ) -> Result<{{ resource.struct_name }}Response, {{ resource.struct_name }}Error> {
        validate_update(&input).map_err({{ resource.struct_name }}Error::Validation)?;
{%- for u in unique_checks %}
        if let Some(value) = &input.{{ u.ident }} {
            if self.repository.{{ u.function }}(value, Some(id)).await? {
                return Err({{ resource.struct_name }}Error::duplicate({{ u.field | rust_str }}));
            }
        }
{%- endfor %}
        let updated = self
            .repository
            .update(id, &input)
            .await?
            .map({{ resource.struct_name }}Response::from)
            .ok_or_else(|| {{ resource.struct_name }}Error::not_found(id))?;
{%- if features.events %}
        self.events.publish({{ resource.struct_name }}Event::Updated(updated.clone()));
{%- endif %}
        Ok(updated)
    }

    pub async fn delete(&self, id: &{{ primary_key.base_type }}) -> Result<(), {{ resource.struct_name }}Error> {
        if !self.repository.delete(id).await? {
            return Err({{ resource.struct_name }}Error::not_found(id));
        }
{%- if features.events %}
        self.events.publish({{ resource.struct_name }}Event::Deleted(id.clone()));
{%- endif %}
        Ok(())
    }
{%- if features.dropdown %}

    pub async fn dropdown(&self) -> Result<Vec<DropdownOption>, {{ resource.struct_name }}Error> {
        Ok(self.repository.dropdown().await?)
    }
{%- endif %}
{%- if features.bulk_delete %}

    pub async fn bulk_delete(
        &self,
        ids: &[{{ primary_key.base_type }}],
    ) -> Result<u64, {{ resource.struct_name }}Error> {
        let deleted = self.repository.bulk_delete(ids).await?;
{%- if features.events %}
        if deleted > 0 {
            for id in ids {
                self.events.publish({{ resource.struct_name }}Event::Deleted(id.clone()));
            }
        }
{%- endif %}
        Ok(deleted)
    }
{%- endif %}
{%- if features.stats %}

    pub async fn stats(&self) -> Result<{{ resource.struct_name }}Stats, {{ resource.struct_name }}Error> {
        Ok(self.repository.stats().await?)
    }
{%- endif %}
}
"#;

pub const EVENTS_TEMPLATE: &str = r#"//! Change notifications for {{ resource.title | lower }} records.

use tokio::sync::broadcast;

use {{ paths.types }}::{{ resource.struct_name }}Response;

pub const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub enum {{ resource.struct_name }}Event {
    Created({{ resource.struct_name }}Response),
    Updated({{ resource.struct_name }}Response),
    Deleted({{ primary_key.base_type }}),
}

#[derive(Debug, Clone)]
pub struct {{ resource.struct_name }}Events {
    sender: broadcast::Sender<{{ resource.struct_name }}Event>,
}

impl {{ resource.struct_name }}Events {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<{{ resource.struct_name }}Event> {
        self.sender.subscribe()
    }

    /// Events sent while nobody is subscribed are dropped
    pub fn publish(&self, event: {{ resource.struct_name }}Event) {
        let _ = self.sender.send(event);
    }
}

impl Default for {{ resource.struct_name }}Events {
    fn default() -> Self {
        Self::new(CHANNEL_CAPACITY)
    }
}
"#;

pub const IMPORT_TEMPLATE: &str = r#"//! Bulk import of {{ resource.title | lower }} rows.

use serde::Serialize;

use {{ paths.service }}::{ {{- resource.struct_name }}Error, {{ resource.struct_name }}Service};
use {{ paths.types }}::Create{{ resource.struct_name }};

#[derive(Debug, Clone, Serialize)]
pub struct ImportFailure {
    /// 1-based position in the submitted batch
    pub row: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub total: usize,
    pub created: usize,
    pub failed: Vec<ImportFailure>,
}

/// Create each row on its own; a failing row is reported and the rest continue
pub async fn import_rows(
    service: &{{ resource.struct_name }}Service,
    rows: Vec<Create{{ resource.struct_name }}>,
) -> ImportSummary {
    let mut summary = ImportSummary {
        total: rows.len(),
        ..ImportSummary::default()
    };
    for (index, row) in rows.into_iter().enumerate() {
        let errors = match service.create(row).await {
            Ok(_) => {
                summary.created += 1;
                continue;
            }
            Err({{ resource.struct_name }}Error::Validation(errors)) => errors
                .into_iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect(),
            Err(other) => vec![other.to_string()],
        };
        summary.failed.push(ImportFailure {
            row: index + 1,
            errors,
        });
    }
    summary
}
"#;

pub const HANDLERS_TEMPLATE: &str = r#"//! HTTP handlers for {{ api_path }}.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use {{ paths.service }}::{ {{- resource.struct_name }}Error, {{ resource.struct_name }}Service};
use {{ paths.types }}::{
    Create{{ resource.struct_name }}, Paginated, {{ resource.struct_name }}Query, {{ resource.struct_name }}Response, Update{{ resource.struct_name }},
{%- if features.dropdown %}
    DropdownOption,
{%- endif %}
{%- if features.bulk_delete %}
    BulkDeleteRequest, BulkDeleteResponse,
{%- endif %}
{%- if features.stats %}
    {{ resource.struct_name }}Stats,
{%- endif %}
};
{%- if features.import %}
use {{ paths.import }}::{import_rows, ImportSummary};
{%- endif %}

pub type SharedService = Arc<{{ resource.struct_name }}Service>;

impl IntoResponse for {{ resource.struct_name }}Error {
    fn into_response(self) -> Response {
        match self {
            {{ resource.struct_name }}Error::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            {{ resource.struct_name }}Error::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": {{ messages.invalid | rust_str }}, "fields": errors })),
            )
                .into_response(),
            {{ resource.struct_name }}Error::Database(error) => {
                tracing::error!(%error, {{ messages.storage | fmt_str }});
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

pub async fn {{ handlers.list }}(
    State(service): State<SharedService>,
    Query(query): Query<{{ resource.struct_name }}Query>,
) -> Result<Json<Paginated<{{ resource.struct_name }}Response>>, {{ resource.struct_name }}Error> {
    service.list(&query).await.map(Json)
}

pub async fn {{ handlers.get }}(
    State(service): State<SharedService>,
    Path(id): Path<{{ primary_key.base_type }}>,
) -> Result<Json<{{ resource.struct_name }}Response>, {{ resource.struct_name }}Error> {
    service.get(&id).await.map(Json)
}

pub async fn {{ handlers.create }}(
    State(service): State<SharedService>,
    Json(input): Json<Create{{ resource.struct_name }}>,
) -> Result<(StatusCode, Json<{{ resource.struct_name }}Response>), {{ resource.struct_name }}Error> {
    let created = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn {{ handlers.update }}(
    State(service): State<SharedService>,
    Path(id): Path<{{ primary_key.base_type }}>,
    Json(input): Json<Update{{ resource.struct_name }}>,
) -> Result<Json<{{ resource.struct_name }}Response>, {{ resource.struct_name }}Error> {
    service.update(&id, input).await.map(Json)
}

pub async fn {{ handlers.delete }}(
    State(service): State<SharedService>,
    Path(id): Path<{{ primary_key.base_type }}>,
) -> Result<StatusCode, {{ resource.struct_name }}Error> {
    service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
{%- if features.dropdown %}

pub async fn {{ handlers.dropdown }}(
    State(service): State<SharedService>,
) -> Result<Json<Vec<DropdownOption>>, {{ resource.struct_name }}Error> {
    service.dropdown().await.map(Json)
}
{%- endif %}
{%- if features.bulk_delete %}

pub async fn {{ handlers.bulk_delete }}(
    State(service): State<SharedService>,
    Json(request): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, {{ resource.struct_name }}Error> {
    let deleted = service.bulk_delete(&request.ids).await?;
    Ok(Json(BulkDeleteResponse { deleted }))
}
{%- endif %}
{%- if features.import %}

pub async fn {{ handlers.import }}(
    State(service): State<SharedService>,
    Json(rows): Json<Vec<Create{{ resource.struct_name }}>>,
) -> Json<ImportSummary> {
    Json(import_rows(&service, rows).await)
}
{%- endif %}
{%- if features.stats %}

pub async fn {{ handlers.stats }}(
    State(service): State<SharedService>,
) -> Result<Json<{{ resource.struct_name }}Stats>, {{ resource.struct_name }}Error> {
    service.stats().await.map(Json)
}
{%- endif %}
"#;

pub const ROUTES_TEMPLATE: &str = r#"//! Router and permission names for {{ api_path }}.

use std::sync::Arc;

use axum::routing::get;
{%- if features.bulk_delete or features.import %}
use axum::routing::post;
{%- endif %}
use axum::Router;
use sqlx::PgPool;

use {{ paths.handlers }} as handlers;
use {{ paths.service }}::{{ resource.struct_name }}Service;

/// Permission names checked by the authorization layer
pub mod permissions {
{%- for p in permissions %}
    pub const {{ p.ident }}: &str = {{ p.name | rust_str }};
{%- endfor %}
}

pub fn router(pool: PgPool) -> Router {
    let service = Arc::new({{ resource.struct_name }}Service::new(pool));
    Router::new()
        .route(
            {{ endpoints.collection | rust_str }},
            get(handlers::{{ handlers.list }}).post(handlers::{{ handlers.create }}),
        )
{%- if features.dropdown %}
        .route({{ endpoints.dropdown | rust_str }}, get(handlers::{{ handlers.dropdown }}))
{%- endif %}
{%- if features.bulk_delete %}
        .route({{ endpoints.bulk_delete | rust_str }}, post(handlers::{{ handlers.bulk_delete }}))
{%- endif %}
{%- if features.import %}
        .route({{ endpoints.import | rust_str }}, post(handlers::{{ handlers.import }}))
{%- endif %}
{%- if features.stats %}
        .route({{ endpoints.stats | rust_str }}, get(handlers::{{ handlers.stats }}))
{%- endif %}
        .route(
            {{ endpoints.item | rust_str }},
            get(handlers::{{ handlers.get }})
                .put(handlers::{{ handlers.update }})
                .delete(handlers::{{ handlers.delete }}),
        )
        .with_state(service)
}
"#;

pub const RESOURCE_MOD_TEMPLATE: &str = r#"//! {{ resource.title }} module mounted at {{ api_path }}.
{% if features.events %}
pub mod events;
{%- endif %}
pub mod handlers;
{%- if features.import %}
pub mod import;
{%- endif %}
pub mod repository;
pub mod routes;
pub mod schemas;
pub mod service;
pub mod types;

pub use routes::router;
"#;

pub const DOMAIN_MOD_TEMPLATE: &str = r#"//! {{ domain }} domain.

pub mod controllers;
pub mod repositories;
pub mod routes;
pub mod schemas;
pub mod services;
pub mod types;

pub use routes::router;
"#;

pub const LAYER_MOD_TEMPLATE: &str = r#"{% for module in modules -%}
pub mod {{ module }};
{% endfor -%}
"#;

pub const ROUTES_MOD_TEMPLATE: &str = r#"{% for module in modules -%}
pub mod {{ module }};
{% endfor %}
use axum::Router;
use sqlx::PgPool;

/// Every route of the domain merged into one router
pub fn router(pool: PgPool) -> Router {
    Router::new()
{%- for module in modules %}
        .merge(self::{{ module }}::router(pool.clone()))
{%- endfor %}
}
"#;

pub const PERMISSIONS_MIGRATION_TEMPLATE: &str = r#"-- Migration: add_{{ resource }}_permissions

-- Up migration
{%- for p in permissions %}
INSERT INTO permissions (name, resource, action, description)
VALUES ({{ p.name | sql_str }}, {{ p.resource | sql_str }}, {{ p.action | sql_str }}, {{ p.description | sql_str }})
ON CONFLICT (name) DO NOTHING;
{%- endfor %}
{% for r in roles %}
INSERT INTO roles (name, description)
VALUES ({{ r.name | sql_str }}, {{ r.description | sql_str }})
ON CONFLICT (name) DO NOTHING;
{%- endfor %}
{% for r in roles %}
{%- for permission in r.permissions %}
INSERT INTO role_permissions (role_id, permission_id)
SELECT r.id, p.id
FROM roles r, permissions p
WHERE r.name = {{ r.name | sql_str }} AND p.name = {{ permission | sql_str }}
ON CONFLICT DO NOTHING;
{%- endfor %}
{%- endfor %}

-- Down migration
DELETE FROM role_permissions
WHERE role_id IN (SELECT id FROM roles WHERE name IN ({{ role_list }}))
  AND permission_id IN (SELECT id FROM permissions WHERE name IN ({{ permission_list }}));
DELETE FROM roles WHERE name IN ({{ role_list }});
DELETE FROM permissions WHERE name IN ({{ permission_list }});
"#;

pub const FRONTEND_CLIENT_TEMPLATE: &str = r#"//! Typed client definitions for the {{ resource.title | lower }} API at {{ api_path }}.

use serde::{Deserialize, Serialize};

pub const COLLECTION_PATH: &str = {{ endpoints.collection | rust_str }};
{%- if features.dropdown %}
pub const DROPDOWN_PATH: &str = {{ endpoints.dropdown | rust_str }};
{%- endif %}
{%- if features.bulk_delete %}
pub const BULK_DELETE_PATH: &str = {{ endpoints.bulk_delete | rust_str }};
{%- endif %}
{%- if features.import %}
pub const IMPORT_PATH: &str = {{ endpoints.import | rust_str }};
{%- endif %}
{%- if features.stats %}
pub const STATS_PATH: &str = {{ endpoints.stats | rust_str }};
{%- endif %}

pub fn item_path(id: &{{ primary_key.base_type }}) -> String {
    format!("{}/{}", COLLECTION_PATH, id)
}

pub fn page_path(page: i64, limit: i64) -> String {
    format!("{}?page={}&limit={}", COLLECTION_PATH, page, limit)
}
{% for e in enums %}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum {{ e.name }} {
{%- for v in e.variants %}
    #[serde(rename = {{ v.value | rust_str }})]
    {{ v.ident }},
{%- endfor %}
}
{% endfor %}
#[derive(Debug, Clone, Deserialize)]
pub struct {{ resource.struct_name }} {
{%- for f in response_fields %}
{%- if f.renamed %}
    #[serde(rename = {{ f.name | rust_str }})]
{%- endif %}
    pub {{ f.ident }}: {{ f.rust_type }},
{%- endfor %}
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Create{{ resource.struct_name }}Request {
{%- for f in create_fields %}
{%- if f.renamed %}
    #[serde(rename = {{ f.name | rust_str }})]
{%- endif %}
{%- if not f.create_required %}
    #[serde(skip_serializing_if = "Option::is_none")]
{%- endif %}
    pub {{ f.ident }}: {{ f.create_type }},
{%- endfor %}
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Update{{ resource.struct_name }}Request {
{%- for f in update_fields %}
{%- if f.renamed %}
    #[serde(rename = {{ f.name | rust_str }})]
{%- endif %}
    #[serde(skip_serializing_if = "Option::is_none")]
    pub {{ f.ident }}: Option<{{ f.base_type }}>,
{%- endfor %}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub error: String,
    #[serde(default)]
    pub fields: Vec<ApiFieldError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiFieldError {
    pub field: String,
    pub message: String,
}
"#;

pub const REFERENCE_TABLE_TEMPLATE: &str = r#"//! Reference tables of CLI commands, code patterns and feature packages.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Boolean,
    String,
    Number,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Backend,
    Frontend,
    Database,
    Testing,
    Security,
}

#[derive(Debug, Clone, Copy)]
pub struct CommandOption {
    pub name: &'static str,
    pub alias: Option<&'static str>,
    pub kind: OptionKind,
    pub default: Option<&'static str>,
    pub description: &'static str,
    pub choices: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct CommandInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub options: &'static [CommandOption],
    pub examples: &'static [&'static str],
    pub notes: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct CodePattern {
    pub name: &'static str,
    pub category: Category,
    pub description: &'static str,
    pub code: &'static str,
    pub language: &'static str,
    pub tags: &'static [&'static str],
    pub notes: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct PackageInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub features: &'static [&'static str],
    pub use_cases: &'static [&'static str],
    pub command: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct CategoryInfo {
    pub category: Category,
    pub patterns: usize,
    /// No pattern was declared for this category
    pub placeholder: bool,
}

pub const COMMANDS: &[CommandInfo] = &[
{%- for c in commands %}
    CommandInfo {
        name: {{ c.name | rust_str }},
        description: {{ c.description | rust_str }},
        usage: {{ c.usage | rust_str }},
        options: &[
{%- for o in c.options %}
            CommandOption {
                name: {{ o.name | rust_str }},
                alias: {% if o.alias %}Some({{ o.alias | rust_str }}){% else %}None{% endif %},
                kind: OptionKind::{{ o.kind | pascal }},
                default: {% if o.default %}Some({{ o.default | rust_str }}){% else %}None{% endif %},
                description: {{ o.description | rust_str }},
                choices: &[{% for choice in o.choices %}{{ choice | rust_str }}{% if not loop.last %}, {% endif %}{% endfor %}],
            },
{%- endfor %}
        ],
        examples: &[
{%- for example in c.examples %}
            {{ example | raw_str }},
{%- endfor %}
        ],
        notes: &[
{%- for note in c.notes %}
            {{ note | rust_str }},
{%- endfor %}
        ],
    },
{%- endfor %}
];

pub const PATTERNS: &[CodePattern] = &[
{%- for p in patterns %}
    CodePattern {
        name: {{ p.name | rust_str }},
        category: Category::{{ p.category | pascal }},
        description: {{ p.description | rust_str }},
        code: {{ p.code | raw_str }},
        language: {{ p.language | rust_str }},
        tags: &[{% for tag in p.tags %}{{ tag | rust_str }}{% if not loop.last %}, {% endif %}{% endfor %}],
        notes: &[
{%- for note in p.notes %}
            {{ note | rust_str }},
{%- endfor %}
        ],
    },
{%- endfor %}
];

pub const PACKAGES: &[PackageInfo] = &[
{%- for p in packages %}
{%- if p.name in placeholder_packages %}
    // placeholder: no source declares this tier
{%- endif %}
    PackageInfo {
        name: {{ p.name | rust_str }},
        description: {{ p.description | rust_str }},
        features: &[
{%- for feature in p.features %}
            {{ feature | rust_str }},
{%- endfor %}
        ],
        use_cases: &[
{%- for use_case in p.use_cases %}
            {{ use_case | rust_str }},
{%- endfor %}
        ],
        command: {{ p.command | rust_str }},
    },
{%- endfor %}
];

pub const PATTERN_CATEGORIES: &[CategoryInfo] = &[
{%- for c in categories %}
    CategoryInfo {
        category: Category::{{ c.variant }},
        patterns: {{ c.patterns }},
        placeholder: {{ c.placeholder }},
    },
{%- endfor %}
];
"#;
