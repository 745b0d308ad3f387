//! Verify URI resolution and the dispatcher against JSON test vectors stored
//! in `test-vectors/`.
//!
//! Each request vector names an endpoint, its path parameters and options,
//! and the exact request the dispatcher must build. Response vectors feed a
//! simulated response through `parse_response`. Bodies are compared as
//! parsed JSON, not raw strings, to avoid false negatives from field
//! ordering.

use serde_json::Value;
use trs_core::endpoint::PathParams;
use trs_core::uri::{resolve, ResolveOptions};
use trs_core::{
    Call, Endpoint, HttpMethod, HttpResponse, RequestOptions, SharedConfig, TrsClient, TrsError,
    TrsResponse,
};

const BASE_URI: &str = "https://trs.example.org";

fn client() -> TrsClient {
    TrsClient::builder(BASE_URI)
        .config(SharedConfig::default())
        .build()
        .unwrap()
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn endpoint(name: &str) -> Endpoint {
    Endpoint::ALL
        .into_iter()
        .find(|e| e.name() == name)
        .unwrap_or_else(|| panic!("unknown endpoint: {name}"))
}

fn path_params(raw: &Value) -> PathParams {
    let mut params = PathParams::new();
    for key in ["id", "version_id", "type", "relative_path"] {
        if let Some(v) = raw.get(key).and_then(Value::as_str) {
            params = params.with(key, v);
        }
    }
    params
}

/// Build the `Call` a vector case describes.
fn call(case: &Value) -> Call {
    let mut options = RequestOptions::new();
    if let Some(accept) = case["accept"].as_str() {
        options = options.accept(accept);
    }
    if let Some(token) = case["token"].as_str() {
        options = options.token(token);
    }
    let mut call = Call::new(endpoint(case["endpoint"].as_str().unwrap()))
        .params(path_params(&case["params"]))
        .options(options);
    if let Some(query) = case["query"].as_str() {
        call = call.query(query);
    }
    if let Some(body) = case.get("body") {
        call = call.body(body.clone());
    }
    call
}

fn error_name(err: &TrsError) -> &'static str {
    match err {
        TrsError::InvalidUri(_) => "InvalidUri",
        TrsError::InvalidResourceIdentifier(_) => "InvalidResourceIdentifier",
        TrsError::MissingParameter(_) => "MissingParameter",
        TrsError::ContentTypeUnavailable { .. } => "ContentTypeUnavailable",
        TrsError::Api { .. } => "Api",
        TrsError::Validation { .. } => "Validation",
        _ => "Other",
    }
}

// ---------------------------------------------------------------------------
// URI resolution
// ---------------------------------------------------------------------------

#[test]
fn uri_resolution_vectors() {
    let raw = include_str!("../../test-vectors/uri_resolution.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let opts = ResolveOptions {
            port: case["port"].as_u64().map(|p| p as u16),
            base_path: case["base_path"].as_str().map(str::to_string),
            use_http: case["use_http"].as_bool().unwrap_or(false),
        };
        let result = resolve(case["uri"].as_str().unwrap(), &opts);

        if let Some(expected_error) = case["expected_error"].as_str() {
            let err = result.unwrap_err();
            assert_eq!(error_name(&err), expected_error, "{name}");
        } else {
            let url = result.unwrap_or_else(|e| panic!("{name}: {e}"));
            assert_eq!(url.to_string(), case["expected"].as_str().unwrap(), "{name}");
        }
    }
}

// ---------------------------------------------------------------------------
// Request building
// ---------------------------------------------------------------------------

#[test]
fn request_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let mut c = client();
        let result = c.build_request(&call(case));

        if let Some(expected_error) = case["expected_error"].as_str() {
            let err = result.unwrap_err();
            assert_eq!(error_name(&err), expected_error, "{name}");
            continue;
        }

        let req = result.unwrap_or_else(|e| panic!("{name}: {e}"));
        let expected_req = &case["expected_request"];
        assert_eq!(req.method, parse_method(expected_req["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.url, expected_req["url"].as_str().unwrap(), "{name}: url");

        let expected_headers: Vec<(String, String)> = expected_req["headers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| {
                let arr = h.as_array().unwrap();
                (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
            })
            .collect();
        assert_eq!(req.headers, expected_headers, "{name}: headers");

        match expected_req.get("body") {
            Some(expected_body) => {
                let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
                assert_eq!(&body, expected_body, "{name}: body");
            }
            None => assert!(req.body.is_none(), "{name}: body should be None"),
        }
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

#[test]
fn response_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["simulated_response"];
        let response = HttpResponse::new(
            sim["status"].as_u64().unwrap() as u16,
            sim["body"].as_str().unwrap(),
        );
        let result = c.parse_response::<Value>(&call(case), response);

        match case["expected"].as_str().unwrap() {
            "structured" => {
                let parsed = result.unwrap_or_else(|e| panic!("{name}: {e}"));
                assert!(matches!(parsed, TrsResponse::Structured(_)), "{name}");
            }
            "validation_error" => {
                let err = result.unwrap_err();
                let expected: Vec<&str> = case["violation_paths"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|p| p.as_str().unwrap())
                    .collect();
                assert_eq!(err.violation_paths(), expected, "{name}");
            }
            "api_error" => {
                let err = result.unwrap_err();
                let status = case["status"].as_u64().unwrap() as u16;
                assert_eq!(err.status(), Some(status), "{name}");
                assert_eq!(err.error_response().unwrap().code, i64::from(status), "{name}");
            }
            other => panic!("{name}: unknown expectation: {other}"),
        }
    }
}

#[test]
fn response_vectors_without_validation_are_raw() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    c.config().set_no_validate(true);
    for case in vectors["cases"].as_array().unwrap() {
        if case["expected"] != "validation_error" {
            continue;
        }
        let name = case["name"].as_str().unwrap();
        let sim = &case["simulated_response"];
        let response = HttpResponse::new(200, sim["body"].as_str().unwrap());
        let parsed = c.parse_response::<Value>(&call(case), response);
        assert!(matches!(parsed, Ok(TrsResponse::Raw(_))), "{name}");
    }
}
