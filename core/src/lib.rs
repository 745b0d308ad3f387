//! Client core for GA4GH Tool Registry Service (TRS) instances, including
//! the TRS-Filer write extensions.
//!
//! # Overview
//! `TrsClient` resolves a hostname URL or `trs://` URI to a base URL once,
//! then exposes one method per TRS endpoint. Requests are plain data
//! (`HttpRequest`) executed by a [`Transport`]; responses are checked
//! against the bundled TRS schemas before being decoded into the typed
//! models in [`types`].
//!
//! # Design
//! - Each call is split into `build_request` and `parse_response` around a
//!   single transport round-trip, so the I/O boundary stays explicit and a
//!   host can run the HTTP exchange itself.
//! - Validation can be switched off process-wide through [`SharedConfig`];
//!   calls then return the raw JSON body.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod response;
pub mod schema;
pub mod transport;
pub mod types;
pub mod uri;

pub use client::{Call, RequestOptions, TrsClient, TrsClientBuilder};
pub use config::{ClientConfig, SharedConfig};
pub use endpoint::Endpoint;
pub use error::{TrsError, Violation};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use response::{RawBody, TrsResponse};
pub use schema::SchemaVersion;
pub use transport::{Transport, UreqTransport};
pub use types::{DescriptorType, DescriptorTypeWithPlain, FileType};
pub use uri::{BaseUrl, ToolRef};
