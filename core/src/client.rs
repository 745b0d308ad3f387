//! TRS client: request dispatch plus one access method per endpoint.
//!
//! # Design
//! Every access method builds a [`Call`] and hands it to [`TrsClient::call`],
//! which splits into `build_request` (resolve path, attach headers) and
//! `parse_response` (status check, validation, decoding) around a single
//! [`Transport::execute`]. Both halves are public, so a host that wants to
//! do its own I/O can skip the transport entirely.
//!
//! A token passed in [`RequestOptions`] replaces the client's stored token
//! for this and every later call, which is why access methods take
//! `&mut self`.

use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::SharedConfig;
use crate::endpoint::{render_path, Endpoint, PathParams, ResponseShape, JSON, TEXT_PLAIN, ZIP};
use crate::error::{TrsError, Violation};
use crate::http::{HttpRequest, HttpResponse};
use crate::response::{decode, RawBody, TrsResponse};
use crate::schema::{self, SchemaVersion};
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    DescriptorTypeWithPlain, FileFormat, FileType, FileWrapper, Service, ServiceRegister, Tool,
    ToolClass, ToolClassRegister, ToolFile, ToolFilter, ToolRegister, ToolVersion,
    ToolVersionRegister,
};
use crate::uri::{encode_segment, resolve, BaseUrl, ResolveOptions, ToolRef};

/// Per-call overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Requested content type; `application/json` when unset.
    pub accept: Option<String>,
    /// Bearer token; persists on the client once supplied.
    pub token: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// One dispatch: endpoint plus everything needed to fill it in.
#[derive(Debug, Clone)]
pub struct Call {
    pub endpoint: Endpoint,
    pub params: PathParams,
    /// Already-encoded query string, without the leading `?`.
    pub query: Option<String>,
    pub body: Option<Value>,
    pub options: RequestOptions,
}

impl Call {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            params: PathParams::new(),
            query: None,
            body: None,
            options: RequestOptions::default(),
        }
    }

    pub fn params(mut self, params: PathParams) -> Self {
        self.params = params;
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = (!query.is_empty()).then_some(query);
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// The `Accept` value this call will send, checked against the endpoint.
    pub fn accept(&self) -> Result<&str, TrsError> {
        let descriptor = self.endpoint.descriptor();
        let requested = self.options.accept.as_deref().unwrap_or(JSON);
        if descriptor.accepts.contains(&requested) {
            Ok(requested)
        } else {
            Err(TrsError::ContentTypeUnavailable {
                requested: requested.to_string(),
                available: descriptor.accepts.iter().map(|s| s.to_string()).collect(),
            })
        }
    }
}

/// Collects construction parameters for a [`TrsClient`].
#[derive(Debug, Clone)]
pub struct TrsClientBuilder<T = UreqTransport> {
    uri: String,
    resolve: ResolveOptions,
    token: Option<String>,
    config: Option<SharedConfig>,
    schema_version: Option<SchemaVersion>,
    transport: T,
}

impl<T> TrsClientBuilder<T> {
    pub fn port(mut self, port: u16) -> Self {
        self.resolve.port = Some(port);
        self
    }

    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.resolve.base_path = Some(base_path.into());
        self
    }

    /// Use `http` for `trs://` URIs.
    pub fn use_http(mut self, use_http: bool) -> Self {
        self.resolve.use_http = use_http;
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Share flags with other clients. Defaults to [`SharedConfig::global`].
    pub fn config(mut self, config: SharedConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Pin the schema family instead of deriving it from the base path.
    pub fn schema_version(mut self, version: SchemaVersion) -> Self {
        self.schema_version = Some(version);
        self
    }

    pub fn transport<U: Transport>(self, transport: U) -> TrsClientBuilder<U> {
        TrsClientBuilder {
            uri: self.uri,
            resolve: self.resolve,
            token: self.token,
            config: self.config,
            schema_version: self.schema_version,
            transport,
        }
    }

    pub fn build(self) -> Result<TrsClient<T>, TrsError>
    where
        T: Transport,
    {
        let base_url = resolve(&self.uri, &self.resolve)?;
        let schema_version = self
            .schema_version
            .unwrap_or_else(|| SchemaVersion::from_base_path(&base_url.base_path));
        tracing::info!(uri = %base_url, ?schema_version, "instantiated TRS client");
        Ok(TrsClient {
            base_url,
            token: self.token,
            config: self.config.unwrap_or_else(SharedConfig::global),
            schema_version,
            transport: self.transport,
        })
    }
}

/// Client for one TRS instance.
#[derive(Debug)]
pub struct TrsClient<T = UreqTransport> {
    base_url: BaseUrl,
    token: Option<String>,
    config: SharedConfig,
    schema_version: SchemaVersion,
    transport: T,
}

impl TrsClient<UreqTransport> {
    /// Client with default port, base path and the global configuration.
    pub fn new(uri: &str) -> Result<Self, TrsError> {
        Self::builder(uri).build()
    }

    pub fn builder(uri: impl Into<String>) -> TrsClientBuilder<UreqTransport> {
        TrsClientBuilder {
            uri: uri.into(),
            resolve: ResolveOptions::default(),
            token: None,
            config: None,
            schema_version: None,
            transport: UreqTransport::new(),
        }
    }
}

impl<T: Transport> TrsClient<T> {
    /// Resolved base URL, e.g. `https://my-trs.app:443/ga4gh/trs/v2`.
    pub fn uri(&self) -> String {
        self.base_url.to_string()
    }

    pub fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    pub fn schema_version(&self) -> SchemaVersion {
        self.schema_version
    }

    // -----------------------------------------------------------------------
    // Dispatcher
    // -----------------------------------------------------------------------

    /// Resolve the URL and headers for `call`. Stores `call.options.token`
    /// on the client when present.
    pub fn build_request(&mut self, call: &Call) -> Result<HttpRequest, TrsError> {
        let descriptor = call.endpoint.descriptor();
        let accept = call.accept()?;
        let path = render_path(descriptor.template, &call.params)?;

        let mut url = self.base_url.join(&path);
        if let Some(query) = &call.query {
            url.push('?');
            url.push_str(query);
        }

        if let Some(token) = &call.options.token {
            self.token = Some(token.clone());
        }

        let mut headers = vec![("Accept".to_string(), accept.to_string())];
        let body = match &call.body {
            Some(value) => {
                headers.push(("Content-Type".to_string(), JSON.to_string()));
                Some(serde_json::to_string(value).map_err(|e| TrsError::Serialization(e.to_string()))?)
            }
            None => None,
        };
        if let Some(token) = &self.token {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        Ok(HttpRequest {
            method: descriptor.method,
            url,
            headers,
            body,
        })
    }

    /// Turn the response to `call` into a result, honouring `no_validate`.
    pub fn parse_response<R: DeserializeOwned>(
        &self,
        call: &Call,
        response: HttpResponse,
    ) -> Result<TrsResponse<R>, TrsError> {
        let endpoint = call.endpoint;
        if !response.is_success() {
            tracing::warn!(endpoint = endpoint.name(), status = response.status, "received error response");
            return Err(TrsError::Api {
                status: response.status,
                body: response.text(),
            });
        }

        let shape = endpoint.descriptor().response;
        if shape == ResponseShape::Empty {
            return decode(Value::Null).map(TrsResponse::Structured);
        }
        if call.accept()? != JSON {
            return Ok(TrsResponse::Raw(RawBody::Bytes(response.body)));
        }

        let validate = !self.config.no_validate();
        let value: Value = match serde_json::from_slice(&response.body) {
            Ok(value) => value,
            Err(e) if validate => {
                return Err(TrsError::Validation {
                    violations: vec![Violation {
                        path: String::new(),
                        message: format!("body is not valid JSON: {e}"),
                    }],
                })
            }
            Err(_) => return Ok(TrsResponse::Raw(RawBody::Bytes(response.body))),
        };
        if !validate {
            return Ok(TrsResponse::Raw(RawBody::Json(value)));
        }

        schema::validate(self.schema_version, shape, &value)?;
        decode(value).map(TrsResponse::Structured)
    }

    /// Build, send and parse one call.
    pub fn call<R: DeserializeOwned>(&mut self, call: Call) -> Result<TrsResponse<R>, TrsError> {
        let result = self.dispatch(&call);
        if let Err(err) = &result {
            self.report(err, &call);
        }
        result
    }

    fn dispatch<R: DeserializeOwned>(&mut self, call: &Call) -> Result<TrsResponse<R>, TrsError> {
        let request = self.build_request(call)?;
        tracing::debug!(endpoint = call.endpoint.name(), method = %request.method, url = %request.url, "connecting");
        let response = self.transport.execute(&request)?;
        let status = response.status;
        let parsed = self.parse_response(call, response)?;
        tracing::info!(endpoint = call.endpoint.name(), status, "request completed");
        Ok(parsed)
    }

    fn report(&self, err: &TrsError, call: &Call) {
        if !self.config.debug() {
            tracing::error!(error = %err, "request failed");
            return;
        }
        let descriptor = call.endpoint.descriptor();
        let url = render_path(descriptor.template, &call.params)
            .map(|path| self.base_url.join(&path))
            .unwrap_or_else(|_| format!("{}{}", self.base_url, descriptor.template));
        tracing::error!(
            endpoint = call.endpoint.name(),
            method = %descriptor.method,
            url = %url,
            error = %err,
            backtrace = %Backtrace::force_capture(),
            "request failed"
        );
    }

    fn call_with_body<B: Serialize, R: DeserializeOwned>(
        &mut self,
        call: Call,
        payload: &B,
    ) -> Result<TrsResponse<R>, TrsError> {
        let body = serde_json::to_value(payload).map_err(|e| TrsError::Serialization(e.to_string()))?;
        self.call(call.body(body))
    }

    // -----------------------------------------------------------------------
    // Service info
    // -----------------------------------------------------------------------

    pub fn get_service_info(&mut self, options: RequestOptions) -> Result<TrsResponse<Service>, TrsError> {
        self.call(Call::new(Endpoint::GetServiceInfo).options(options))
    }

    pub fn post_service_info(
        &mut self,
        payload: &ServiceRegister,
        options: RequestOptions,
    ) -> Result<TrsResponse<()>, TrsError> {
        self.call_with_body(Call::new(Endpoint::PostServiceInfo).options(options), payload)
    }

    // -----------------------------------------------------------------------
    // Tool classes
    // -----------------------------------------------------------------------

    pub fn get_tool_classes(&mut self, options: RequestOptions) -> Result<TrsResponse<Vec<ToolClass>>, TrsError> {
        self.call(Call::new(Endpoint::GetToolClasses).options(options))
    }

    pub fn post_tool_class(
        &mut self,
        payload: &ToolClassRegister,
        options: RequestOptions,
    ) -> Result<TrsResponse<String>, TrsError> {
        self.call_with_body(Call::new(Endpoint::PostToolClass).options(options), payload)
    }

    /// Create or overwrite the tool class with the given `id`.
    pub fn put_tool_class(
        &mut self,
        id: &str,
        payload: &ToolClassRegister,
        options: RequestOptions,
    ) -> Result<TrsResponse<String>, TrsError> {
        let params = PathParams::new().with("id", encode_segment(id));
        self.call_with_body(
            Call::new(Endpoint::PutToolClass).params(params).options(options),
            payload,
        )
    }

    pub fn delete_tool_class(&mut self, id: &str, options: RequestOptions) -> Result<TrsResponse<String>, TrsError> {
        let params = PathParams::new().with("id", encode_segment(id));
        self.call(Call::new(Endpoint::DeleteToolClass).params(params).options(options))
    }

    // -----------------------------------------------------------------------
    // Tools
    // -----------------------------------------------------------------------

    /// List tools matching all set fields of `filter`.
    pub fn get_tools(
        &mut self,
        filter: &ToolFilter,
        options: RequestOptions,
    ) -> Result<TrsResponse<Vec<Tool>>, TrsError> {
        let query = serde_urlencoded::to_string(filter).map_err(|e| TrsError::Serialization(e.to_string()))?;
        self.call(Call::new(Endpoint::GetTools).query(query).options(options))
    }

    pub fn post_tool(&mut self, payload: &ToolRegister, options: RequestOptions) -> Result<TrsResponse<String>, TrsError> {
        self.call_with_body(Call::new(Endpoint::PostTool).options(options), payload)
    }

    /// `id` is a registry-scoped tool id or a TRS URI.
    pub fn get_tool(&mut self, id: &str, options: RequestOptions) -> Result<TrsResponse<Tool>, TrsError> {
        let params = tool_params(id, None)?;
        self.call(Call::new(Endpoint::GetTool).params(params).options(options))
    }

    /// Create or overwrite the tool with the given `id`.
    pub fn put_tool(
        &mut self,
        id: &str,
        payload: &ToolRegister,
        options: RequestOptions,
    ) -> Result<TrsResponse<String>, TrsError> {
        let params = tool_params(id, None)?;
        self.call_with_body(Call::new(Endpoint::PutTool).params(params).options(options), payload)
    }

    pub fn delete_tool(&mut self, id: &str, options: RequestOptions) -> Result<TrsResponse<String>, TrsError> {
        let params = tool_params(id, None)?;
        self.call(Call::new(Endpoint::DeleteTool).params(params).options(options))
    }

    // -----------------------------------------------------------------------
    // Versions
    // -----------------------------------------------------------------------

    pub fn get_versions(&mut self, id: &str, options: RequestOptions) -> Result<TrsResponse<Vec<ToolVersion>>, TrsError> {
        let params = tool_params(id, None)?;
        self.call(Call::new(Endpoint::GetVersions).params(params).options(options))
    }

    pub fn post_version(
        &mut self,
        id: &str,
        payload: &ToolVersionRegister,
        options: RequestOptions,
    ) -> Result<TrsResponse<String>, TrsError> {
        let params = tool_params(id, None)?;
        self.call_with_body(Call::new(Endpoint::PostVersion).params(params).options(options), payload)
    }

    /// `version_id` may be omitted when `id` is a versioned TRS URI.
    pub fn get_version(
        &mut self,
        id: &str,
        version_id: Option<&str>,
        options: RequestOptions,
    ) -> Result<TrsResponse<ToolVersion>, TrsError> {
        let params = tool_params(id, version_id)?;
        self.call(Call::new(Endpoint::GetVersion).params(params).options(options))
    }

    /// Create or overwrite a version with the given id.
    pub fn put_version(
        &mut self,
        id: &str,
        version_id: Option<&str>,
        payload: &ToolVersionRegister,
        options: RequestOptions,
    ) -> Result<TrsResponse<String>, TrsError> {
        let params = tool_params(id, version_id)?;
        self.call_with_body(Call::new(Endpoint::PutVersion).params(params).options(options), payload)
    }

    pub fn delete_version(
        &mut self,
        id: &str,
        version_id: Option<&str>,
        options: RequestOptions,
    ) -> Result<TrsResponse<String>, TrsError> {
        let params = tool_params(id, version_id)?;
        self.call(Call::new(Endpoint::DeleteVersion).params(params).options(options))
    }

    // -----------------------------------------------------------------------
    // Files
    // -----------------------------------------------------------------------

    pub fn get_containerfiles(
        &mut self,
        id: &str,
        version_id: Option<&str>,
        options: RequestOptions,
    ) -> Result<TrsResponse<Vec<FileWrapper>>, TrsError> {
        let params = tool_params(id, version_id)?;
        self.call(Call::new(Endpoint::GetContainerfiles).params(params).options(options))
    }

    /// Primary descriptor of a version. `PLAIN_*` types default to
    /// `Accept: text/plain` and come back as raw bytes.
    pub fn get_descriptor(
        &mut self,
        descriptor_type: DescriptorTypeWithPlain,
        id: &str,
        version_id: Option<&str>,
        options: RequestOptions,
    ) -> Result<TrsResponse<FileWrapper>, TrsError> {
        let params = tool_params(id, version_id)?.with("type", descriptor_type.as_str());
        let options = plain_accept(descriptor_type, options);
        self.call(Call::new(Endpoint::GetDescriptor).params(params).options(options))
    }

    /// Descriptor or associated file at `relative_path`. The path is
    /// percent-encoded unless `is_encoded` is set.
    pub fn get_descriptor_by_path(
        &mut self,
        descriptor_type: DescriptorTypeWithPlain,
        relative_path: &str,
        id: &str,
        version_id: Option<&str>,
        is_encoded: bool,
        options: RequestOptions,
    ) -> Result<TrsResponse<FileWrapper>, TrsError> {
        let relative_path = if is_encoded {
            relative_path.to_string()
        } else {
            encode_segment(relative_path)
        };
        let params = tool_params(id, version_id)?
            .with("type", descriptor_type.as_str())
            .with("relative_path", relative_path);
        let options = plain_accept(descriptor_type, options);
        self.call(Call::new(Endpoint::GetDescriptorByPath).params(params).options(options))
    }

    /// File listing of a version, or a zip archive of all files with
    /// `FileFormat::Zip`.
    pub fn get_files(
        &mut self,
        descriptor_type: DescriptorTypeWithPlain,
        id: &str,
        version_id: Option<&str>,
        format: Option<FileFormat>,
        options: RequestOptions,
    ) -> Result<TrsResponse<Vec<ToolFile>>, TrsError> {
        let params = tool_params(id, version_id)?.with("type", descriptor_type.as_str());
        let mut call = Call::new(Endpoint::GetFiles).params(params).options(options);
        if let Some(FileFormat::Zip) = format {
            call.options.accept = Some(ZIP.to_string());
            call = call.query("format=zip");
        }
        self.call(call)
    }

    pub fn get_tests(
        &mut self,
        descriptor_type: DescriptorTypeWithPlain,
        id: &str,
        version_id: Option<&str>,
        options: RequestOptions,
    ) -> Result<TrsResponse<Vec<FileWrapper>>, TrsError> {
        let params = tool_params(id, version_id)?.with("type", descriptor_type.as_str());
        self.call(Call::new(Endpoint::GetTests).params(params).options(options))
    }

    /// Download every file of a version into `out_dir`.
    ///
    /// Returns the relative paths listed for each [`FileType`]; every file
    /// type is present as a key, possibly with an empty list.
    pub fn retrieve_files(
        &mut self,
        out_dir: impl AsRef<Path>,
        descriptor_type: DescriptorTypeWithPlain,
        id: &str,
        version_id: Option<&str>,
        is_encoded: bool,
        options: RequestOptions,
    ) -> Result<BTreeMap<FileType, Vec<String>>, TrsError> {
        let out_dir = out_dir.as_ref();
        fs::create_dir_all(out_dir)?;

        let options = RequestOptions {
            accept: None,
            token: options.token,
        };
        let files = self
            .get_files(descriptor_type, id, version_id, None, options.clone())?
            .into_typed()?;

        let mut paths_by_type: BTreeMap<FileType, Vec<String>> =
            FileType::ALL.iter().map(|t| (*t, Vec::new())).collect();
        for file in &files {
            if let (Some(file_type), Some(path)) = (file.file_type, &file.path) {
                paths_by_type.entry(file_type).or_default().push(path.clone());
            }
        }

        let mut contents = Vec::with_capacity(files.len());
        for file in &files {
            let path = file.path.as_deref().ok_or_else(|| {
                TrsError::FileInformationUnavailable(format!("no path for file {file:?}"))
            })?;
            if !is_contained(path) {
                return Err(TrsError::FileInformationUnavailable(format!(
                    "path '{path}' escapes the output directory"
                )));
            }
            let wrapper = self.get_descriptor_by_path(
                descriptor_type,
                path,
                id,
                version_id,
                is_encoded,
                options.clone(),
            )?;
            let content = file_content(wrapper).ok_or_else(|| {
                TrsError::FileInformationUnavailable(format!("content unavailable for file at path '{path}'"))
            })?;
            contents.push((path.to_string(), content));
        }

        for (path, content) in contents {
            let target = out_dir.join(&path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, content)?;
            tracing::debug!(path = %target.display(), "wrote file");
        }
        tracing::info!(count = files.len(), out_dir = %out_dir.display(), "retrieved files");
        Ok(paths_by_type)
    }
}

fn tool_params(id: &str, version_id: Option<&str>) -> Result<PathParams, TrsError> {
    let ids = ToolRef::parse(Some(id), version_id)?;
    Ok(PathParams::new()
        .with_opt("id", ids.tool_id)
        .with_opt("version_id", ids.version_id))
}

fn plain_accept(descriptor_type: DescriptorTypeWithPlain, mut options: RequestOptions) -> RequestOptions {
    if descriptor_type.is_plain() && options.accept.is_none() {
        options.accept = Some(TEXT_PLAIN.to_string());
    }
    options
}

/// Relative, free of `..`, and naming at least one entry below the root.
fn is_contained(path: &str) -> bool {
    let path = Path::new(path);
    path.components().any(|c| matches!(c, Component::Normal(_)))
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn file_content(response: TrsResponse<FileWrapper>) -> Option<String> {
    match response {
        TrsResponse::Raw(RawBody::Bytes(bytes)) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        other => other.into_typed().ok().and_then(|w| w.content),
    }
}
