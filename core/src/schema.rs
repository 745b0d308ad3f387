//! Response validation against the bundled TRS schema documents.
//!
//! # Design
//! `schemas/trs-v2.json` and `schemas/trs-v1.json` share definition names,
//! so an endpoint's [`ResponseShape`] selects the same definition in either
//! family. Validators are compiled on first use and cached per
//! (version, shape).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use jsonschema::error::ValidationErrorKind;
use jsonschema::Validator;
use once_cell::sync::Lazy;
use serde_json::{json, Value};

use crate::endpoint::ResponseShape;
use crate::error::{TrsError, Violation};

static V2_DOCUMENT: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../schemas/trs-v2.json")).expect("trs-v2.json is valid JSON")
});

static V1_DOCUMENT: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../schemas/trs-v1.json")).expect("trs-v1.json is valid JSON")
});

type Cache = HashMap<(SchemaVersion, ResponseShape), Arc<Validator>>;

static VALIDATORS: Lazy<Mutex<Cache>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Endpoint family a response is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaVersion {
    V1,
    V2,
}

impl SchemaVersion {
    /// `.../v1` selects the legacy family; anything else is v2.
    pub fn from_base_path(base_path: &str) -> Self {
        match base_path.trim_end_matches('/').rsplit('/').next() {
            Some(last) if last.eq_ignore_ascii_case("v1") => SchemaVersion::V1,
            _ => SchemaVersion::V2,
        }
    }

    fn document(self) -> &'static Value {
        match self {
            SchemaVersion::V1 => &*V1_DOCUMENT,
            SchemaVersion::V2 => &*V2_DOCUMENT,
        }
    }
}

/// Check `value` against the schema for `shape`.
pub fn validate(version: SchemaVersion, shape: ResponseShape, value: &Value) -> Result<(), TrsError> {
    let Some(validator) = validator_for(version, shape)? else {
        return Ok(());
    };

    let violations: Vec<Violation> = validator.iter_errors(value).map(to_violation).collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(TrsError::Validation { violations })
    }
}

fn to_violation(err: jsonschema::ValidationError<'_>) -> Violation {
    let mut path = err.instance_path().to_string();
    if let ValidationErrorKind::Required { property } = err.kind() {
        let name = property
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| property.to_string());
        path = format!("{path}/{name}");
    }
    Violation {
        path,
        message: err.to_string(),
    }
}

fn validator_for(
    version: SchemaVersion,
    shape: ResponseShape,
) -> Result<Option<Arc<Validator>>, TrsError> {
    let mut cache = VALIDATORS.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(v) = cache.get(&(version, shape)) {
        return Ok(Some(Arc::clone(v)));
    }

    let Some(schema) = schema_for(version, shape)? else {
        return Ok(None);
    };
    let compiled = jsonschema::validator_for(&schema).map_err(|e| schema_error(version, shape, e))?;
    let compiled = Arc::new(compiled);
    cache.insert((version, shape), Arc::clone(&compiled));
    Ok(Some(compiled))
}

fn schema_for(version: SchemaVersion, shape: ResponseShape) -> Result<Option<Value>, TrsError> {
    let doc = version.document();
    let defs = doc.get("$defs").cloned().unwrap_or_else(|| json!({}));

    let item_ref = |name: &str| -> Result<Value, TrsError> {
        if defs.get(name).is_none() {
            return Err(schema_error(version, shape, format!("no definition named '{name}'")));
        }
        Ok(json!({ "$ref": format!("#/$defs/{name}") }))
    };

    let schema = match shape {
        ResponseShape::Empty => return Ok(None),
        ResponseShape::Identifier => json!({ "type": "string" }),
        ResponseShape::Object(name) => {
            let mut s = item_ref(name)?;
            s["$defs"] = defs.clone();
            s
        }
        ResponseShape::List(name) => json!({
            "$defs": defs.clone(),
            "type": "array",
            "items": item_ref(name)?,
        }),
    };
    Ok(Some(schema))
}

fn schema_error(version: SchemaVersion, shape: ResponseShape, detail: impl std::fmt::Display) -> TrsError {
    TrsError::Validation {
        violations: vec![Violation {
            path: String::new(),
            message: format!("no usable {version:?} schema for {shape:?}: {detail}"),
        }],
    }
}
