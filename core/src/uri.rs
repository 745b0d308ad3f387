//! Base URL resolution and TRS resource identifiers.
//!
//! A client is pointed at a TRS instance either with a hostname URL
//! (`https://my-trs.app`) or with a hostname-based TRS URI
//! (`trs://my-trs.app/SOME_TOOL`). Both resolve to a [`BaseUrl`] whose
//! scheme, host, port and base path are all concrete.
//!
//! Hostname URLs default to `ga4gh/trs/v2`; TRS URIs default to the legacy
//! `ga4gh/trs/v1`. Both defaults are kept as-is.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::TrsError;

pub const DEFAULT_BASE_PATH: &str = "ga4gh/trs/v2";
pub const TRS_URI_BASE_PATH: &str = "ga4gh/trs/v1";

const MAX_HOST_LEN: usize = 253;

const DOMAIN_LABEL: &str = r"[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?";
const TRS_ID: &str = r"[a-z0-9\-_~.%#]+";

static HOST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^(?P<scheme>trs|https?)://(?P<host>(?:{DOMAIN_LABEL}\.)+{DOMAIN_LABEL}\.?)(?::(?P<port>[0-9]{{1,5}}))?(?:/\S*)?$"
    ))
    .expect("host pattern is valid")
});

static TOOL_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^(?:trs://(?:{DOMAIN_LABEL}\.)+{DOMAIN_LABEL}\.?/)?(?P<tool_id>{TRS_ID})(?:/versions/(?P<version_id>{TRS_ID}))?$"
    ))
    .expect("tool id pattern is valid")
});

static VERSION_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)^{TRS_ID}$")).expect("version id pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

/// Overrides applied while resolving a URI.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub port: Option<u16>,
    pub base_path: Option<String>,
    /// Use `http` instead of `https` for `trs://` URIs. Ignored for
    /// hostname URLs, whose scheme is kept.
    pub use_http: bool,
}

/// A fully resolved base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    /// Without leading or trailing slashes; may be empty.
    pub base_path: String,
}

impl BaseUrl {
    /// Join an endpoint path (starting with `/`) onto the base URL.
    pub fn join(&self, endpoint_path: &str) -> String {
        format!("{self}{endpoint_path}")
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme.as_str(), self.host, self.port)?;
        if !self.base_path.is_empty() {
            write!(f, "/{}", self.base_path)?;
        }
        Ok(())
    }
}

/// Resolve a hostname URL or TRS URI into a [`BaseUrl`].
pub fn resolve(uri: &str, opts: &ResolveOptions) -> Result<BaseUrl, TrsError> {
    let caps = HOST_RE
        .captures(uri.trim())
        .ok_or_else(|| TrsError::InvalidUri(uri.to_string()))?;

    let host = caps["host"].to_string();
    if host.is_empty() || host.len() > MAX_HOST_LEN {
        return Err(TrsError::InvalidUri(uri.to_string()));
    }

    let embedded_port = match caps.name("port") {
        Some(m) => Some(
            m.as_str()
                .parse::<u16>()
                .ok()
                .filter(|port| *port != 0)
                .ok_or_else(|| TrsError::InvalidUri(uri.to_string()))?,
        ),
        None => None,
    };

    let (scheme, derived_port, derived_path) = match caps["scheme"].to_ascii_lowercase().as_str() {
        "trs" => {
            if embedded_port.is_some() {
                return Err(TrsError::InvalidUri(uri.to_string()));
            }
            let scheme = if opts.use_http { Scheme::Http } else { Scheme::Https };
            (scheme, Scheme::Https.default_port(), TRS_URI_BASE_PATH)
        }
        "http" => (
            Scheme::Http,
            embedded_port.unwrap_or(Scheme::Http.default_port()),
            DEFAULT_BASE_PATH,
        ),
        _ => (
            Scheme::Https,
            embedded_port.unwrap_or(Scheme::Https.default_port()),
            DEFAULT_BASE_PATH,
        ),
    };

    let base_path = opts.base_path.as_deref().unwrap_or(derived_path);
    Ok(BaseUrl {
        scheme,
        host,
        port: opts.port.unwrap_or(derived_port),
        base_path: base_path.trim_matches('/').to_string(),
    })
}

/// Percent-encoded tool and version identifiers, ready for a URL path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolRef {
    pub tool_id: Option<String>,
    pub version_id: Option<String>,
}

impl ToolRef {
    /// Parse a tool id or TRS URI plus an optional explicit version id.
    ///
    /// An explicit `version_id` wins over one embedded in a versioned TRS
    /// URI.
    pub fn parse(tool_id: Option<&str>, version_id: Option<&str>) -> Result<Self, TrsError> {
        if tool_id.is_none() && version_id.is_none() {
            return Err(TrsError::InvalidResourceIdentifier(
                "no TRS URI, tool or version identifier supplied".to_string(),
            ));
        }

        let mut parsed = ToolRef::default();

        if let Some(raw) = tool_id {
            let caps = TOOL_ID_RE.captures(raw).ok_or_else(|| {
                TrsError::InvalidResourceIdentifier(format!("invalid tool identifier '{raw}'"))
            })?;
            parsed.tool_id = Some(caps["tool_id"].to_string());
            parsed.version_id = caps.name("version_id").map(|m| m.as_str().to_string());
        }

        if let Some(raw) = version_id {
            if !VERSION_ID_RE.is_match(raw) {
                return Err(TrsError::InvalidResourceIdentifier(format!(
                    "invalid version identifier '{raw}'"
                )));
            }
            parsed.version_id = Some(raw.to_string());
        }

        parsed.tool_id = parsed.tool_id.map(|id| encode_segment(&id));
        parsed.version_id = parsed.version_id.map(|id| encode_segment(&id));
        Ok(parsed)
    }
}

/// Percent-encode everything except unreserved characters.
pub fn encode_segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
