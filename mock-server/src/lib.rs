//! In-memory TRS-Filer.
//!
//! Serves the TRS 2.0 read endpoints and the TRS-Filer write endpoints under
//! [`BASE_PATH`]. Every non-2xx response carries a TRS `Error` body. When a
//! token is configured, every API route requires `Authorization: Bearer`.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const BASE_PATH: &str = "/ga4gh/trs/v2";

const DESCRIPTOR_TYPES: [&str; 5] = ["CWL", "WDL", "NFL", "GALAXY", "SMK"];
const PRIMARY_DESCRIPTOR: &str = "PRIMARY_DESCRIPTOR";
const TEST_FILE: &str = "TEST_FILE";
const CONTAINERFILE: &str = "CONTAINERFILE";

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolClass {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checksum {
    pub checksum: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FileWrapper {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Vec<Checksum>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// A file attached to a version, as stored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileRecord {
    pub descriptor_type: Option<String>,
    pub tool_file: ToolFile,
    pub wrapper: FileWrapper,
}

impl FileRecord {
    fn is(&self, file_type: &str) -> bool {
        self.tool_file.file_type.as_deref() == Some(file_type)
    }

    /// Files registered without a type belong to every descriptor type.
    fn matches_type(&self, descriptor_type: &str) -> bool {
        self.descriptor_type
            .as_deref()
            .map_or(true, |t| t.eq_ignore_ascii_case(descriptor_type))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolVersion {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containerfile: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor_type: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included_apps: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_production: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_source: Option<Vec<String>>,
    #[serde(skip)]
    pub files: Vec<FileRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub id: String,
    pub url: String,
    pub organization: String,
    pub toolclass: ToolClass,
    pub versions: Vec<ToolVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checker_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_checker: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToolClassRegister {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilesRegister {
    #[serde(default)]
    pub file_wrapper: Option<FileWrapper>,
    #[serde(default)]
    pub tool_file: Option<ToolFile>,
    #[serde(default, rename = "type")]
    pub descriptor_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToolVersionRegister {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub author: Option<Vec<String>>,
    #[serde(default)]
    pub descriptor_type: Option<Vec<String>>,
    #[serde(default)]
    pub files: Option<Vec<FilesRegister>>,
    #[serde(default)]
    pub images: Option<Vec<Value>>,
    #[serde(default)]
    pub included_apps: Option<Vec<String>>,
    #[serde(default)]
    pub is_production: Option<bool>,
    #[serde(default)]
    pub signed: Option<bool>,
    #[serde(default)]
    pub verified: Option<bool>,
    #[serde(default)]
    pub verified_source: Option<Vec<String>>,
}

impl ToolVersionRegister {
    fn into_version(self, id: String, tool_url: &str) -> ToolVersion {
        let files: Vec<FileRecord> = self
            .files
            .unwrap_or_default()
            .into_iter()
            .map(|f| FileRecord {
                descriptor_type: f.descriptor_type,
                tool_file: f.tool_file.unwrap_or_default(),
                wrapper: f.file_wrapper.unwrap_or_default(),
            })
            .collect();
        let url = format!("{tool_url}/versions/{id}");
        ToolVersion {
            id,
            url,
            name: self.name,
            author: self.author,
            containerfile: Some(files.iter().any(|f| f.is(CONTAINERFILE))),
            descriptor_type: self.descriptor_type,
            images: self.images,
            included_apps: self.included_apps,
            is_production: self.is_production,
            signed: self.signed,
            verified: self.verified,
            verified_source: self.verified_source,
            files,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ToolRegister {
    pub organization: String,
    #[serde(default)]
    pub toolclass: ToolClassRegister,
    #[serde(default)]
    pub versions: Vec<ToolVersionRegister>,
    #[serde(default)]
    pub aliases: Option<Vec<String>>,
    #[serde(default)]
    pub checker_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub has_checker: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Filters for `GET /tools`; every set field must match.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolQuery {
    pub id: Option<String>,
    pub alias: Option<String>,
    pub tool_class: Option<String>,
    pub descriptor_type: Option<String>,
    pub registry: Option<String>,
    pub organization: Option<String>,
    pub name: Option<String>,
    pub toolname: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub checker: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ToolQuery {
    fn matches(&self, tool: &Tool) -> bool {
        fn eq(filter: &Option<String>, value: Option<&str>) -> bool {
            filter.as_deref().map_or(true, |f| Some(f) == value)
        }

        let versions = &tool.versions;
        eq(&self.id, Some(tool.id.as_str()))
            && eq(&self.organization, Some(tool.organization.as_str()))
            && eq(&self.tool_class, Some(tool.toolclass.name.as_str()))
            && eq(&self.name, tool.name.as_deref())
            && eq(&self.toolname, tool.name.as_deref())
            && eq(&self.description, tool.description.as_deref())
            && self.checker.map_or(true, |c| tool.has_checker.unwrap_or(false) == c)
            && self.alias.as_ref().map_or(true, |a| {
                tool.aliases.as_ref().is_some_and(|all| all.contains(a))
            })
            && self.descriptor_type.as_ref().map_or(true, |d| {
                versions.iter().any(|v| {
                    v.descriptor_type
                        .as_ref()
                        .is_some_and(|types| types.iter().any(|t| t.eq_ignore_ascii_case(d)))
                })
            })
            && self.author.as_ref().map_or(true, |a| {
                versions
                    .iter()
                    .any(|v| v.author.as_ref().is_some_and(|all| all.contains(a)))
            })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FilesQuery {
    pub format: Option<String>,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Store {
    pub service_info: Option<Value>,
    pub tool_classes: BTreeMap<String, ToolClass>,
    pub tools: BTreeMap<String, Tool>,
}

impl Default for Store {
    fn default() -> Self {
        let service_info = json!({
            "id": "org.ga4gh.mock-trs",
            "name": "Mock TRS-Filer",
            "type": { "group": "org.ga4gh", "artifact": "trs", "version": "2.0.1" },
            "organization": { "name": "GA4GH", "url": "https://www.ga4gh.org" },
            "version": "0.1.0"
        });
        Self {
            service_info: Some(service_info),
            tool_classes: BTreeMap::new(),
            tools: BTreeMap::new(),
        }
    }
}

impl Store {
    /// Reuse a class matched by id or name, otherwise register a new one.
    fn resolve_class(&mut self, input: ToolClassRegister) -> ToolClass {
        if let Some(existing) = input.id.as_ref().and_then(|id| self.tool_classes.get(id)) {
            return existing.clone();
        }
        if let Some(existing) = input
            .name
            .as_ref()
            .and_then(|name| self.tool_classes.values().find(|c| &c.name == name))
        {
            return existing.clone();
        }
        let class = ToolClass {
            id: input.id.unwrap_or_else(new_id),
            name: input.name.unwrap_or_default(),
            description: input.description,
        };
        self.tool_classes.insert(class.id.clone(), class.clone());
        class
    }

    fn register_tool(&mut self, id: &str, input: ToolRegister, base_url: &str) -> Tool {
        let toolclass = self.resolve_class(input.toolclass);
        let url = format!("{base_url}/tools/{id}");
        let versions = input
            .versions
            .into_iter()
            .map(|v| {
                let version_id = v.id.clone().unwrap_or_else(new_id);
                v.into_version(version_id, &url)
            })
            .collect();
        Tool {
            id: id.to_string(),
            url,
            organization: input.organization,
            toolclass,
            versions,
            aliases: input.aliases,
            checker_url: input.checker_url,
            description: input.description,
            has_checker: input.has_checker,
            name: input.name,
        }
    }

    fn tool(&self, id: &str) -> Result<&Tool, ApiError> {
        self.tools
            .get(id)
            .ok_or_else(|| ApiError::not_found(format!("tool '{id}'")))
    }

    fn tool_mut(&mut self, id: &str) -> Result<&mut Tool, ApiError> {
        self.tools
            .get_mut(id)
            .ok_or_else(|| ApiError::not_found(format!("tool '{id}'")))
    }

    fn version(&self, id: &str, version_id: &str) -> Result<&ToolVersion, ApiError> {
        self.tool(id)?
            .versions
            .iter()
            .find(|v| v.id == version_id)
            .ok_or_else(|| ApiError::not_found(format!("version '{version_id}' of tool '{id}'")))
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: Db,
    pub token: Option<Arc<str>>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found(what: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{what} not found"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.status.as_u16(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn app() -> Router {
    app_with_token(None)
}

/// Router that rejects API requests lacking `Bearer <token>` when `token`
/// is set.
pub fn app_with_token(token: Option<String>) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Store::default())),
        token: token.map(Arc::from),
    };
    let versioned = "/tools/{id}/versions/{version_id}";
    let api = Router::new()
        .route("/service-info", get(get_service_info).post(post_service_info))
        .route("/toolClasses", get(list_tool_classes).post(post_tool_class))
        .route("/toolClasses/{id}", put(put_tool_class).delete(delete_tool_class))
        .route("/tools", get(list_tools).post(post_tool))
        .route("/tools/{id}", get(get_tool).put(put_tool).delete(delete_tool))
        .route("/tools/{id}/versions", get(list_versions).post(post_version))
        .route(versioned, get(get_version).put(put_version).delete(delete_version))
        .route(&format!("{versioned}/containerfile"), get(get_containerfiles))
        .route(&format!("{versioned}/{{type}}/descriptor"), get(get_descriptor))
        .route(
            &format!("{versioned}/{{type}}/descriptor/{{*relative_path}}"),
            get(get_descriptor_by_path),
        )
        .route(&format!("{versioned}/{{type}}/files"), get(get_files))
        .route(&format!("{versioned}/{{type}}/tests"), get(get_tests))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state);

    Router::new().nest(BASE_PATH, api).fallback(fallback)
}

pub async fn run(listener: TcpListener, token: Option<String>) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_token(token)).await
}

async fn require_token(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.token.as_deref() else {
        return next.run(req).await;
    };
    let presented = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if presented == Some(expected) {
        next.run(req).await
    } else {
        tracing::warn!(uri = %req.uri(), "rejected request without valid token");
        ApiError::new(StatusCode::UNAUTHORIZED, "missing or invalid bearer token").into_response()
    }
}

async fn fallback(uri: Uri) -> ApiError {
    ApiError::not_found(format!("route '{}'", uri.path()))
}

fn new_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id.to_ascii_uppercase()
}

fn base_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}{BASE_PATH}")
}

struct DescriptorKind {
    name: String,
    plain: bool,
}

fn descriptor_kind(raw: &str) -> Result<DescriptorKind, ApiError> {
    let upper = raw.to_ascii_uppercase();
    let (plain, name) = match upper.strip_prefix("PLAIN_") {
        Some(name) => (true, name),
        None => (false, upper.as_str()),
    };
    if !DESCRIPTOR_TYPES.contains(&name) {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("unknown descriptor type '{raw}'"),
        ));
    }
    Ok(DescriptorKind {
        name: name.to_string(),
        plain,
    })
}

fn file_response(file: &FileRecord, plain: bool) -> Response {
    if plain {
        let content = file.wrapper.content.clone().unwrap_or_default();
        ([(header::CONTENT_TYPE, "text/plain")], content).into_response()
    } else {
        Json(file.wrapper.clone()).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers: service info and tool classes
// ---------------------------------------------------------------------------

async fn get_service_info(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let db = state.db.read().await;
    db.service_info
        .clone()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("service info"))
}

async fn post_service_info(State(state): State<AppState>, Json(info): Json<Value>) -> StatusCode {
    state.db.write().await.service_info = Some(info);
    tracing::info!("updated service info");
    StatusCode::CREATED
}

async fn list_tool_classes(State(state): State<AppState>) -> Json<Vec<ToolClass>> {
    let db = state.db.read().await;
    Json(db.tool_classes.values().cloned().collect())
}

async fn post_tool_class(
    State(state): State<AppState>,
    Json(input): Json<ToolClassRegister>,
) -> Json<String> {
    put_class(&state, new_id(), input).await
}

async fn put_tool_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ToolClassRegister>,
) -> Json<String> {
    put_class(&state, id, input).await
}

async fn put_class(state: &AppState, id: String, input: ToolClassRegister) -> Json<String> {
    let class = ToolClass {
        id: id.clone(),
        name: input.name.unwrap_or_default(),
        description: input.description,
    };
    state.db.write().await.tool_classes.insert(id.clone(), class);
    tracing::info!(%id, "stored tool class");
    Json(id)
}

async fn delete_tool_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<String>, ApiError> {
    let mut db = state.db.write().await;
    db.tool_classes
        .remove(&id)
        .map(|_| Json(id.clone()))
        .ok_or_else(|| ApiError::not_found(format!("tool class '{id}'")))
}

// ---------------------------------------------------------------------------
// Handlers: tools
// ---------------------------------------------------------------------------

async fn list_tools(
    State(state): State<AppState>,
    Query(query): Query<ToolQuery>,
) -> Json<Vec<Tool>> {
    let db = state.db.read().await;
    let tools = db
        .tools
        .values()
        .filter(|t| query.matches(t))
        .skip(query.offset.unwrap_or(0))
        .take(query.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();
    Json(tools)
}

async fn post_tool(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<ToolRegister>,
) -> Json<String> {
    let id = new_id();
    let mut db = state.db.write().await;
    let tool = db.register_tool(&id, input, &base_url(&headers));
    db.tools.insert(id.clone(), tool);
    tracing::info!(%id, "registered tool");
    Json(id)
}

async fn get_tool(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Tool>, ApiError> {
    let db = state.db.read().await;
    db.tool(&id).cloned().map(Json)
}

async fn put_tool(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<ToolRegister>,
) -> Json<String> {
    let mut db = state.db.write().await;
    let tool = db.register_tool(&id, input, &base_url(&headers));
    db.tools.insert(id.clone(), tool);
    tracing::info!(%id, "stored tool");
    Json(id)
}

async fn delete_tool(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<String>, ApiError> {
    let mut db = state.db.write().await;
    db.tools
        .remove(&id)
        .map(|_| Json(id.clone()))
        .ok_or_else(|| ApiError::not_found(format!("tool '{id}'")))
}

// ---------------------------------------------------------------------------
// Handlers: versions
// ---------------------------------------------------------------------------

async fn list_versions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ToolVersion>>, ApiError> {
    let db = state.db.read().await;
    Ok(Json(db.tool(&id)?.versions.clone()))
}

async fn post_version(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ToolVersionRegister>,
) -> Result<Json<String>, ApiError> {
    let mut db = state.db.write().await;
    let tool = db.tool_mut(&id)?;
    let version_id = new_id();
    let version = input.into_version(version_id.clone(), &tool.url);
    tool.versions.push(version);
    tracing::info!(%id, %version_id, "registered version");
    Ok(Json(version_id))
}

async fn get_version(
    State(state): State<AppState>,
    Path((id, version_id)): Path<(String, String)>,
) -> Result<Json<ToolVersion>, ApiError> {
    let db = state.db.read().await;
    db.version(&id, &version_id).cloned().map(Json)
}

async fn put_version(
    State(state): State<AppState>,
    Path((id, version_id)): Path<(String, String)>,
    Json(input): Json<ToolVersionRegister>,
) -> Result<Json<String>, ApiError> {
    let mut db = state.db.write().await;
    let tool = db.tool_mut(&id)?;
    let version = input.into_version(version_id.clone(), &tool.url);
    match tool.versions.iter_mut().find(|v| v.id == version_id) {
        Some(existing) => *existing = version,
        None => tool.versions.push(version),
    }
    tracing::info!(%id, %version_id, "stored version");
    Ok(Json(version_id))
}

async fn delete_version(
    State(state): State<AppState>,
    Path((id, version_id)): Path<(String, String)>,
) -> Result<Json<String>, ApiError> {
    let mut db = state.db.write().await;
    let tool = db.tool_mut(&id)?;
    let before = tool.versions.len();
    tool.versions.retain(|v| v.id != version_id);
    if tool.versions.len() == before {
        return Err(ApiError::not_found(format!(
            "version '{version_id}' of tool '{id}'"
        )));
    }
    Ok(Json(version_id))
}

// ---------------------------------------------------------------------------
// Handlers: files
// ---------------------------------------------------------------------------

async fn get_containerfiles(
    State(state): State<AppState>,
    Path((id, version_id)): Path<(String, String)>,
) -> Result<Json<Vec<FileWrapper>>, ApiError> {
    let db = state.db.read().await;
    let version = db.version(&id, &version_id)?;
    let files = version
        .files
        .iter()
        .filter(|f| f.is(CONTAINERFILE))
        .map(|f| f.wrapper.clone())
        .collect();
    Ok(Json(files))
}

async fn get_descriptor(
    State(state): State<AppState>,
    Path((id, version_id, kind)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let kind = descriptor_kind(&kind)?;
    let db = state.db.read().await;
    let version = db.version(&id, &version_id)?;
    version
        .files
        .iter()
        .find(|f| f.is(PRIMARY_DESCRIPTOR) && f.matches_type(&kind.name))
        .map(|f| file_response(f, kind.plain))
        .ok_or_else(|| ApiError::not_found(format!("{} descriptor", kind.name)))
}

async fn get_descriptor_by_path(
    State(state): State<AppState>,
    Path((id, version_id, kind, relative_path)): Path<(String, String, String, String)>,
) -> Result<Response, ApiError> {
    let kind = descriptor_kind(&kind)?;
    let db = state.db.read().await;
    let version = db.version(&id, &version_id)?;
    version
        .files
        .iter()
        .find(|f| f.tool_file.path.as_deref() == Some(relative_path.as_str()) && f.matches_type(&kind.name))
        .map(|f| file_response(f, kind.plain))
        .ok_or_else(|| ApiError::not_found(format!("file '{relative_path}'")))
}

async fn get_files(
    State(state): State<AppState>,
    Path((id, version_id, kind)): Path<(String, String, String)>,
    Query(query): Query<FilesQuery>,
) -> Result<Json<Vec<ToolFile>>, ApiError> {
    if query.format.as_deref() == Some("zip") {
        return Err(ApiError::new(
            StatusCode::NOT_IMPLEMENTED,
            "zip archives are not supported",
        ));
    }
    let kind = descriptor_kind(&kind)?;
    let db = state.db.read().await;
    let version = db.version(&id, &version_id)?;
    let files = version
        .files
        .iter()
        .filter(|f| f.matches_type(&kind.name))
        .map(|f| f.tool_file.clone())
        .collect();
    Ok(Json(files))
}

async fn get_tests(
    State(state): State<AppState>,
    Path((id, version_id, kind)): Path<(String, String, String)>,
) -> Result<Json<Vec<FileWrapper>>, ApiError> {
    let kind = descriptor_kind(&kind)?;
    let db = state.db.read().await;
    let version = db.version(&id, &version_id)?;
    let files = version
        .files
        .iter()
        .filter(|f| f.is(TEST_FILE) && f.matches_type(&kind.name))
        .map(|f| f.wrapper.clone())
        .collect();
    Ok(Json(files))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str, class: &str) -> Tool {
        Tool {
            id: "T1".to_string(),
            url: "http://localhost/ga4gh/trs/v2/tools/T1".to_string(),
            organization: "ELIXIR".to_string(),
            toolclass: ToolClass {
                id: "C1".to_string(),
                name: class.to_string(),
                description: None,
            },
            versions: vec![ToolVersionRegister {
                author: Some(vec!["alice".to_string()]),
                descriptor_type: Some(vec!["CWL".to_string()]),
                ..Default::default()
            }
            .into_version("v1".to_string(), "http://localhost/ga4gh/trs/v2/tools/T1")],
            aliases: Some(vec!["bwa-mem".to_string()]),
            checker_url: None,
            description: None,
            has_checker: None,
            name: Some(name.to_string()),
        }
    }

    #[test]
    fn error_body_has_code_and_message() {
        let json = serde_json::to_value(ErrorBody {
            code: 404,
            message: "tool 'x' not found".to_string(),
        })
        .unwrap();
        assert_eq!(json, json!({"code": 404, "message": "tool 'x' not found"}));
    }

    #[test]
    fn tool_serialization_omits_unset_fields_and_files() {
        let json = serde_json::to_value(tool("bwa", "Workflow")).unwrap();
        assert!(json.get("description").is_none());
        assert!(json["versions"][0].get("files").is_none());
        assert_eq!(json["versions"][0]["containerfile"], false);
        assert_eq!(
            json["versions"][0]["url"],
            "http://localhost/ga4gh/trs/v2/tools/T1/versions/v1"
        );
    }

    #[test]
    fn empty_query_matches_everything() {
        assert!(ToolQuery::default().matches(&tool("bwa", "Workflow")));
    }

    #[test]
    fn query_filters_are_additive() {
        let t = tool("bwa", "Workflow");
        let q = ToolQuery {
            name: Some("bwa".to_string()),
            tool_class: Some("Workflow".to_string()),
            descriptor_type: Some("cwl".to_string()),
            author: Some("alice".to_string()),
            alias: Some("bwa-mem".to_string()),
            ..Default::default()
        };
        assert!(q.matches(&t));

        let q = ToolQuery {
            name: Some("bwa".to_string()),
            organization: Some("Other".to_string()),
            ..Default::default()
        };
        assert!(!q.matches(&t));
    }

    #[test]
    fn checker_filter_treats_unset_as_false() {
        let t = tool("bwa", "Workflow");
        let q = ToolQuery {
            checker: Some(false),
            ..Default::default()
        };
        assert!(q.matches(&t));
        let q = ToolQuery {
            checker: Some(true),
            ..Default::default()
        };
        assert!(!q.matches(&t));
    }

    #[test]
    fn descriptor_kind_accepts_plain_prefix() {
        let kind = descriptor_kind("PLAIN_WDL").unwrap();
        assert_eq!(kind.name, "WDL");
        assert!(kind.plain);
        assert!(!descriptor_kind("cwl").unwrap().plain);
        assert!(descriptor_kind("JSON").is_err());
    }

    #[test]
    fn untyped_files_match_every_descriptor_type() {
        let f = FileRecord::default();
        assert!(f.matches_type("CWL"));
        let f = FileRecord {
            descriptor_type: Some("WDL".to_string()),
            ..Default::default()
        };
        assert!(!f.matches_type("CWL"));
    }

    #[test]
    fn resolve_class_reuses_by_id_then_name() {
        let mut store = Store::default();
        let created = store.resolve_class(ToolClassRegister {
            name: Some("Workflow".to_string()),
            ..Default::default()
        });
        let by_name = store.resolve_class(ToolClassRegister {
            name: Some("Workflow".to_string()),
            description: Some("ignored".to_string()),
            ..Default::default()
        });
        assert_eq!(by_name, created);
        let by_id = store.resolve_class(ToolClassRegister {
            id: Some(created.id.clone()),
            ..Default::default()
        });
        assert_eq!(by_id, created);
        assert_eq!(store.tool_classes.len(), 1);
    }

    #[test]
    fn tool_register_requires_organization() {
        let result: Result<ToolRegister, _> = serde_json::from_str(r#"{"versions":[]}"#);
        assert!(result.is_err());
        let input: ToolRegister = serde_json::from_str(r#"{"organization":"o"}"#).unwrap();
        assert!(input.versions.is_empty());
    }

    #[test]
    fn new_ids_are_short_and_distinct() {
        let a = new_id();
        assert_eq!(a.len(), 8);
        assert_ne!(a, new_id());
    }
}
