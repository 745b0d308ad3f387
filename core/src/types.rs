//! Domain DTOs for the TRS API.
//!
//! # Design
//! Response models follow TRS 2.0 plus the TRS-Filer extensions. Legacy
//! TRS 1.0 field names (`toolname`, `descriptor`, `dockerfile`, ...) are
//! accepted through serde aliases so validated v1 responses deserialize into
//! the same types. Optional fields are skipped when serializing; the schema
//! validator, not serde, enforces strictness.
//!
//! Payload models (`*Register`) reuse response sub-types where the shapes
//! are identical.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TrsError;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Workflow language of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DescriptorType {
    #[serde(rename = "CWL")]
    Cwl,
    #[serde(rename = "WDL")]
    Wdl,
    #[serde(rename = "NFL")]
    Nfl,
    #[serde(rename = "GALAXY")]
    Galaxy,
    #[serde(rename = "SMK")]
    Smk,
}

impl DescriptorType {
    pub fn as_str(self) -> &'static str {
        match self {
            DescriptorType::Cwl => "CWL",
            DescriptorType::Wdl => "WDL",
            DescriptorType::Nfl => "NFL",
            DescriptorType::Galaxy => "GALAXY",
            DescriptorType::Smk => "SMK",
        }
    }
}

/// Descriptor type as used in URL paths. `Plain` variants ask the server for
/// the bare descriptor instead of a JSON file wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorTypeWithPlain {
    Wrapped(DescriptorType),
    Plain(DescriptorType),
}

impl DescriptorTypeWithPlain {
    pub fn as_str(self) -> &'static str {
        match self {
            DescriptorTypeWithPlain::Wrapped(t) => t.as_str(),
            DescriptorTypeWithPlain::Plain(DescriptorType::Cwl) => "PLAIN_CWL",
            DescriptorTypeWithPlain::Plain(DescriptorType::Wdl) => "PLAIN_WDL",
            DescriptorTypeWithPlain::Plain(DescriptorType::Nfl) => "PLAIN_NFL",
            DescriptorTypeWithPlain::Plain(DescriptorType::Galaxy) => "PLAIN_GALAXY",
            DescriptorTypeWithPlain::Plain(DescriptorType::Smk) => "PLAIN_SMK",
        }
    }

    pub fn is_plain(self) -> bool {
        matches!(self, DescriptorTypeWithPlain::Plain(_))
    }
}

impl From<DescriptorType> for DescriptorTypeWithPlain {
    fn from(t: DescriptorType) -> Self {
        DescriptorTypeWithPlain::Wrapped(t)
    }
}

impl fmt::Display for DescriptorTypeWithPlain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DescriptorTypeWithPlain {
    type Err = TrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        let (plain, name) = match upper.strip_prefix("PLAIN_") {
            Some(rest) => (true, rest),
            None => (false, upper.as_str()),
        };
        let base = match name {
            "CWL" => DescriptorType::Cwl,
            "WDL" => DescriptorType::Wdl,
            "NFL" => DescriptorType::Nfl,
            "GALAXY" => DescriptorType::Galaxy,
            "SMK" => DescriptorType::Smk,
            _ => {
                return Err(TrsError::InvalidResourceIdentifier(format!(
                    "unknown descriptor type '{s}'"
                )))
            }
        };
        Ok(if plain {
            DescriptorTypeWithPlain::Plain(base)
        } else {
            DescriptorTypeWithPlain::Wrapped(base)
        })
    }
}

/// Role of a file within a tool version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileType {
    TestFile,
    PrimaryDescriptor,
    SecondaryDescriptor,
    Containerfile,
    Other,
}

impl FileType {
    pub const ALL: [FileType; 5] = [
        FileType::TestFile,
        FileType::PrimaryDescriptor,
        FileType::SecondaryDescriptor,
        FileType::Containerfile,
        FileType::Other,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageType {
    Docker,
    Singularity,
    Conda,
}

// ---------------------------------------------------------------------------
// Response models
// ---------------------------------------------------------------------------

/// Body of every non-2xx TRS response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    pub checksum: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A file's content or a URL to it, with optional checksums.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWrapper {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Vec<Checksum>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "descriptor",
        alias = "dockerfile",
        alias = "test"
    )]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<FileType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolClass {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Vec<Checksum>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_type: Option<ImageType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolVersion {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "dockerfile")]
    pub containerfile: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor_type: Option<Vec<DescriptorType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included_apps: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_production: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_source: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
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
    pub meta_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "toolname")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceType {
    pub group: String,
    pub artifact: String,
    pub version: String,
}

/// GA4GH service-info record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    pub organization: Organization,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

// ---------------------------------------------------------------------------
// Payload models
// ---------------------------------------------------------------------------

/// Payload for `POST /service-info`; same shape as [`Service`].
pub type ServiceRegister = Service;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolClassRegister {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Tool class reference inside a [`ToolRegister`]; may point at an existing
/// class by `id`.
pub type ToolClassRegisterId = ToolClass;

/// One file attached to a registered version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesRegister {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_wrapper: Option<FileWrapper>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_file: Option<ToolFile>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub descriptor_type: Option<DescriptorType>,
}

/// Payload for `POST`/`PUT` on versions. `id` is only honoured when a
/// version is nested in a [`ToolRegister`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolVersionRegister {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor_type: Option<Vec<DescriptorType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FilesRegister>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageData>>,
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
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRegister {
    pub organization: String,
    pub toolclass: ToolClassRegisterId,
    pub versions: Vec<ToolVersionRegister>,
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

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Filters for `GET /tools`. Filters are additive; unset fields are left out
/// of the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor_type: Option<DescriptorType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checker: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

/// Archive format for `GET .../files`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Zip,
}
