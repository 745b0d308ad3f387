//! Static endpoint table.
//!
//! Each [`Endpoint`] maps to one [`EndpointDescriptor`]: HTTP verb, path
//! template relative to the base URL, the content types the service offers
//! and the expected response shape. Templates use `{id}`, `{version_id}`,
//! `{type}` and `{relative_path}` placeholders.

use std::collections::BTreeMap;

use crate::error::TrsError;
use crate::http::HttpMethod;

pub const JSON: &str = "application/json";
pub const TEXT_PLAIN: &str = "text/plain";
pub const ZIP: &str = "application/zip";

const READ_TYPES: &[&str] = &[JSON, TEXT_PLAIN];
const FILES_TYPES: &[&str] = &[JSON, ZIP];
const WRITE_TYPES: &[&str] = &[JSON];

/// What a successful response body should look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseShape {
    /// Body is ignored.
    Empty,
    /// A JSON string holding a resource identifier.
    Identifier,
    /// A single object of the named schema definition.
    Object(&'static str),
    /// An array of the named schema definition.
    List(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub method: HttpMethod,
    pub template: &'static str,
    pub accepts: &'static [&'static str],
    pub response: ResponseShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    GetServiceInfo,
    PostServiceInfo,
    GetToolClasses,
    PostToolClass,
    PutToolClass,
    DeleteToolClass,
    GetTools,
    PostTool,
    GetTool,
    PutTool,
    DeleteTool,
    GetVersions,
    PostVersion,
    GetVersion,
    PutVersion,
    DeleteVersion,
    GetContainerfiles,
    GetDescriptor,
    GetDescriptorByPath,
    GetFiles,
    GetTests,
}

impl Endpoint {
    pub const ALL: [Endpoint; 21] = [
        Endpoint::GetServiceInfo,
        Endpoint::PostServiceInfo,
        Endpoint::GetToolClasses,
        Endpoint::PostToolClass,
        Endpoint::PutToolClass,
        Endpoint::DeleteToolClass,
        Endpoint::GetTools,
        Endpoint::PostTool,
        Endpoint::GetTool,
        Endpoint::PutTool,
        Endpoint::DeleteTool,
        Endpoint::GetVersions,
        Endpoint::PostVersion,
        Endpoint::GetVersion,
        Endpoint::PutVersion,
        Endpoint::DeleteVersion,
        Endpoint::GetContainerfiles,
        Endpoint::GetDescriptor,
        Endpoint::GetDescriptorByPath,
        Endpoint::GetFiles,
        Endpoint::GetTests,
    ];

    pub fn descriptor(self) -> EndpointDescriptor {
        use HttpMethod::*;
        use ResponseShape::*;

        let (method, template, accepts, response) = match self {
            Endpoint::GetServiceInfo => (Get, "/service-info", READ_TYPES, Object("Service")),
            Endpoint::PostServiceInfo => (Post, "/service-info", WRITE_TYPES, Empty),
            Endpoint::GetToolClasses => (Get, "/toolClasses", READ_TYPES, List("ToolClass")),
            Endpoint::PostToolClass => (Post, "/toolClasses", WRITE_TYPES, Identifier),
            Endpoint::PutToolClass => (Put, "/toolClasses/{id}", WRITE_TYPES, Identifier),
            Endpoint::DeleteToolClass => (Delete, "/toolClasses/{id}", WRITE_TYPES, Identifier),
            Endpoint::GetTools => (Get, "/tools", READ_TYPES, List("Tool")),
            Endpoint::PostTool => (Post, "/tools", WRITE_TYPES, Identifier),
            Endpoint::GetTool => (Get, "/tools/{id}", READ_TYPES, Object("Tool")),
            Endpoint::PutTool => (Put, "/tools/{id}", WRITE_TYPES, Identifier),
            Endpoint::DeleteTool => (Delete, "/tools/{id}", WRITE_TYPES, Identifier),
            Endpoint::GetVersions => (Get, "/tools/{id}/versions", READ_TYPES, List("ToolVersion")),
            Endpoint::PostVersion => (Post, "/tools/{id}/versions", WRITE_TYPES, Identifier),
            Endpoint::GetVersion => (
                Get,
                "/tools/{id}/versions/{version_id}",
                READ_TYPES,
                Object("ToolVersion"),
            ),
            Endpoint::PutVersion => (
                Put,
                "/tools/{id}/versions/{version_id}",
                WRITE_TYPES,
                Identifier,
            ),
            Endpoint::DeleteVersion => (
                Delete,
                "/tools/{id}/versions/{version_id}",
                WRITE_TYPES,
                Identifier,
            ),
            Endpoint::GetContainerfiles => (
                Get,
                "/tools/{id}/versions/{version_id}/containerfile",
                READ_TYPES,
                List("FileWrapper"),
            ),
            Endpoint::GetDescriptor => (
                Get,
                "/tools/{id}/versions/{version_id}/{type}/descriptor",
                READ_TYPES,
                Object("FileWrapper"),
            ),
            Endpoint::GetDescriptorByPath => (
                Get,
                "/tools/{id}/versions/{version_id}/{type}/descriptor/{relative_path}",
                READ_TYPES,
                Object("FileWrapper"),
            ),
            Endpoint::GetFiles => (
                Get,
                "/tools/{id}/versions/{version_id}/{type}/files",
                FILES_TYPES,
                List("ToolFile"),
            ),
            Endpoint::GetTests => (
                Get,
                "/tools/{id}/versions/{version_id}/{type}/tests",
                READ_TYPES,
                List("FileWrapper"),
            ),
        };
        EndpointDescriptor {
            method,
            template,
            accepts,
            response,
        }
    }

    /// Snake-case operation name, used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::GetServiceInfo => "get_service_info",
            Endpoint::PostServiceInfo => "post_service_info",
            Endpoint::GetToolClasses => "get_tool_classes",
            Endpoint::PostToolClass => "post_tool_class",
            Endpoint::PutToolClass => "put_tool_class",
            Endpoint::DeleteToolClass => "delete_tool_class",
            Endpoint::GetTools => "get_tools",
            Endpoint::PostTool => "post_tool",
            Endpoint::GetTool => "get_tool",
            Endpoint::PutTool => "put_tool",
            Endpoint::DeleteTool => "delete_tool",
            Endpoint::GetVersions => "get_versions",
            Endpoint::PostVersion => "post_version",
            Endpoint::GetVersion => "get_version",
            Endpoint::PutVersion => "put_version",
            Endpoint::DeleteVersion => "delete_version",
            Endpoint::GetContainerfiles => "get_containerfiles",
            Endpoint::GetDescriptor => "get_descriptor",
            Endpoint::GetDescriptorByPath => "get_descriptor_by_path",
            Endpoint::GetFiles => "get_files",
            Endpoint::GetTests => "get_tests",
        }
    }
}

/// Values for template placeholders. Values are inserted verbatim, so they
/// must already be percent-encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(BTreeMap<&'static str, String>);

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.0.insert(name, value.into());
        self
    }

    /// Insert only when `value` is present.
    pub fn with_opt(self, name: &'static str, value: Option<String>) -> Self {
        match value {
            Some(v) => self.with(name, v),
            None => self,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// Substitute every `{name}` placeholder in `template`.
pub fn render_path(template: &str, params: &PathParams) -> Result<String, TrsError> {
    let mut out = String::with_capacity(template.len() + 32);
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let end = rest[start..]
            .find('}')
            .map(|i| start + i)
            .ok_or_else(|| TrsError::MissingParameter(rest[start + 1..].to_string()))?;
        let name = &rest[start + 1..end];
        let value = params
            .get(name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| TrsError::MissingParameter(name.to_string()))?;
        out.push_str(&rest[..start]);
        out.push_str(value);
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
