//! TRS-Filer lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every client
//! access method over real HTTP through the default `ureq` transport.
//! Responses pass through the strict v2 schema, so any drift between the
//! server's DTOs and the client's models shows up here.

use std::net::SocketAddr;

use trs_core::types::{
    FileFormat, FileType, FileWrapper, FilesRegister, ToolClassRegister, ToolClassRegisterId,
    ToolFile, ToolFilter, ToolRegister, ToolVersionRegister,
};
use trs_core::{
    DescriptorType, DescriptorTypeWithPlain, HttpMethod, HttpRequest, RawBody, RequestOptions,
    SharedConfig, Transport, TrsClient, TrsError, TrsResponse, UreqTransport,
};

/// Start the mock server on a random port and return its address.
fn spawn_server(token: Option<&str>) -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();
    let token = token.map(str::to_string);

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, token).await
        })
        .unwrap();
    });
    addr
}

fn client(addr: SocketAddr) -> TrsClient {
    TrsClient::builder(format!("http://{addr}"))
        .config(SharedConfig::default())
        .build()
        .unwrap()
}

fn file(file_type: FileType, path: &str, content: &str) -> FilesRegister {
    FilesRegister {
        file_wrapper: Some(FileWrapper {
            content: Some(content.to_string()),
            ..Default::default()
        }),
        tool_file: Some(ToolFile {
            file_type: Some(file_type),
            path: Some(path.to_string()),
        }),
        descriptor_type: Some(DescriptorType::Cwl),
    }
}

fn tool_payload() -> ToolRegister {
    ToolRegister {
        organization: "ELIXIR".to_string(),
        name: Some("echo".to_string()),
        toolclass: ToolClassRegisterId {
            name: Some("Workflow".to_string()),
            ..Default::default()
        },
        versions: vec![ToolVersionRegister {
            id: Some("v1".to_string()),
            name: Some("first".to_string()),
            author: Some(vec!["alice".to_string()]),
            descriptor_type: Some(vec![DescriptorType::Cwl]),
            files: Some(vec![
                file(FileType::PrimaryDescriptor, "main.cwl", "cwlVersion: v1.0"),
                file(FileType::SecondaryDescriptor, "tools/step.cwl", "class: CommandLineTool"),
                file(FileType::TestFile, "tests/job.json", "{}"),
                file(FileType::Containerfile, "Dockerfile", "FROM alpine"),
            ]),
            ..Default::default()
        }],
        ..Default::default()
    }
}

const CWL: DescriptorTypeWithPlain = DescriptorTypeWithPlain::Wrapped(DescriptorType::Cwl);

#[test]
fn filer_lifecycle() {
    let addr = spawn_server(None);
    let mut c = client(addr);
    let none = RequestOptions::new;

    // Step 1: service info is seeded by the server.
    let info = c.get_service_info(none()).unwrap().structured().unwrap();
    assert_eq!(info.service_type.artifact, "trs");

    // Step 2: tool classes.
    let class_id = c
        .post_tool_class(
            &ToolClassRegister {
                name: Some("Notebook".to_string()),
                description: Some("Jupyter notebooks".to_string()),
            },
            none(),
        )
        .unwrap()
        .structured()
        .unwrap();
    let classes = c.get_tool_classes(none()).unwrap().structured().unwrap();
    assert!(classes.iter().any(|tc| tc.id.as_deref() == Some(class_id.as_str())));

    // Step 3: register a tool with one version.
    let id = c.post_tool(&tool_payload(), none()).unwrap().structured().unwrap();

    let tool = c.get_tool(&id, none()).unwrap().structured().unwrap();
    assert_eq!(tool.organization, "ELIXIR");
    assert_eq!(tool.toolclass.name.as_deref(), Some("Workflow"));
    assert_eq!(tool.versions.len(), 1);
    assert_eq!(tool.versions[0].containerfile, Some(true));

    // The same tool through a TRS URI naming the server host.
    let by_uri = c
        .get_tool(&format!("trs://127.0.0.1/{id}"), none())
        .unwrap()
        .structured()
        .unwrap();
    assert_eq!(by_uri.id, id);

    // Step 4: filters.
    let filter = ToolFilter {
        organization: Some("ELIXIR".to_string()),
        descriptor_type: Some(DescriptorType::Cwl),
        author: Some("alice".to_string()),
        ..Default::default()
    };
    let tools = c.get_tools(&filter, none()).unwrap().structured().unwrap();
    assert_eq!(tools.len(), 1);
    let filter = ToolFilter {
        organization: Some("Nobody".to_string()),
        ..Default::default()
    };
    assert!(c.get_tools(&filter, none()).unwrap().structured().unwrap().is_empty());

    // Step 5: versions.
    let versions = c.get_versions(&id, none()).unwrap().structured().unwrap();
    assert_eq!(versions[0].id, "v1");
    let version = c.get_version(&id, Some("v1"), none()).unwrap().structured().unwrap();
    assert_eq!(version.name.as_deref(), Some("first"));

    // Step 6: files.
    let descriptor = c
        .get_descriptor(CWL, &id, Some("v1"), none())
        .unwrap()
        .structured()
        .unwrap();
    assert_eq!(descriptor.content.as_deref(), Some("cwlVersion: v1.0"));

    let plain = c
        .get_descriptor(
            DescriptorTypeWithPlain::Plain(DescriptorType::Cwl),
            &id,
            Some("v1"),
            none(),
        )
        .unwrap();
    assert_eq!(plain, TrsResponse::Raw(RawBody::Bytes(b"cwlVersion: v1.0".to_vec())));

    let step = c
        .get_descriptor_by_path(CWL, "tools/step.cwl", &id, Some("v1"), false, none())
        .unwrap()
        .structured()
        .unwrap();
    assert_eq!(step.content.as_deref(), Some("class: CommandLineTool"));

    let files = c
        .get_files(CWL, &id, Some("v1"), None, none())
        .unwrap()
        .structured()
        .unwrap();
    assert_eq!(files.len(), 4);

    let tests = c.get_tests(CWL, &id, Some("v1"), none()).unwrap().structured().unwrap();
    assert_eq!(tests[0].content.as_deref(), Some("{}"));

    let containerfiles = c
        .get_containerfiles(&id, Some("v1"), none())
        .unwrap()
        .structured()
        .unwrap();
    assert_eq!(containerfiles[0].content.as_deref(), Some("FROM alpine"));

    // The mock server does not build archives.
    let err = c
        .get_files(CWL, &id, Some("v1"), Some(FileFormat::Zip), none())
        .unwrap_err();
    assert_eq!(err.status(), Some(501));

    // Step 7: download everything.
    let dir = tempfile::tempdir().unwrap();
    let paths = c
        .retrieve_files(dir.path(), CWL, &id, Some("v1"), false, none())
        .unwrap();
    assert_eq!(paths[&FileType::SecondaryDescriptor], vec!["tools/step.cwl"]);
    assert_eq!(paths[&FileType::Other], Vec::<String>::new());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("tools/step.cwl")).unwrap(),
        "class: CommandLineTool"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("Dockerfile")).unwrap(),
        "FROM alpine"
    );

    // Step 8: add, overwrite and delete a version.
    let v2 = c
        .post_version(
            &id,
            &ToolVersionRegister {
                name: Some("second".to_string()),
                ..Default::default()
            },
            none(),
        )
        .unwrap()
        .structured()
        .unwrap();
    let put = c
        .put_version(
            &id,
            Some(&v2),
            &ToolVersionRegister {
                name: Some("second, revised".to_string()),
                ..Default::default()
            },
            none(),
        )
        .unwrap()
        .structured()
        .unwrap();
    assert_eq!(put, v2);
    let revised = c.get_version(&id, Some(&v2), none()).unwrap().structured().unwrap();
    assert_eq!(revised.name.as_deref(), Some("second, revised"));
    c.delete_version(&id, Some(&v2), none()).unwrap();
    assert_eq!(c.get_versions(&id, none()).unwrap().structured().unwrap().len(), 1);

    // Step 9: overwrite the tool under a chosen id, then delete both.
    let chosen = c.put_tool("MY_TOOL", &tool_payload(), none()).unwrap().structured().unwrap();
    assert_eq!(chosen, "MY_TOOL");
    c.delete_tool("MY_TOOL", none()).unwrap();
    c.delete_tool(&id, none()).unwrap();

    let err = c.get_tool(&id, none()).unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.error_response().unwrap().code, 404);

    // Step 10: tool class maintenance and service info update.
    let renamed = c
        .put_tool_class(
            &class_id,
            &ToolClassRegister {
                name: Some("Notebook v2".to_string()),
                description: None,
            },
            none(),
        )
        .unwrap()
        .structured()
        .unwrap();
    assert_eq!(renamed, class_id);
    c.delete_tool_class(&class_id, none()).unwrap();
    assert!(matches!(
        c.delete_tool_class(&class_id, none()),
        Err(TrsError::Api { status: 404, .. })
    ));

    let mut updated = info.clone();
    updated.description = Some("updated".to_string());
    c.post_service_info(&updated, none()).unwrap();
    let info = c.get_service_info(none()).unwrap().structured().unwrap();
    assert_eq!(info.description.as_deref(), Some("updated"));
}

#[test]
fn token_protected_server() {
    let addr = spawn_server(Some("MyT0k3n"));
    let mut c = client(addr);

    let err = c.get_tool_classes(RequestOptions::new()).unwrap_err();
    assert_eq!(err.status(), Some(401));

    c.get_tool_classes(RequestOptions::new().token("MyT0k3n")).unwrap();
    assert_eq!(c.token(), Some("MyT0k3n"));

    // The token supplied on the previous call is reused.
    let classes = c.get_tool_classes(RequestOptions::new()).unwrap();
    assert!(classes.structured().unwrap().is_empty());
}

#[test]
fn no_validate_returns_raw_json_from_live_server() {
    let addr = spawn_server(None);
    let config = SharedConfig::default();
    config.set_no_validate(true);
    let mut c = TrsClient::builder(format!("http://{addr}"))
        .config(config)
        .build()
        .unwrap();

    match c.get_tool_classes(RequestOptions::new()).unwrap() {
        TrsResponse::Raw(RawBody::Json(value)) => assert_eq!(value, serde_json::json!([])),
        other => panic!("expected raw JSON, got {other:?}"),
    }
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let mut c = TrsClient::builder("http://127.0.0.1:9")
        .config(SharedConfig::default())
        .build()
        .unwrap();
    let err = c.get_service_info(RequestOptions::new()).unwrap_err();
    assert!(matches!(err, TrsError::Transport(_)));
}

#[test]
fn custom_agent_reports_status_and_headers_as_data() {
    let addr = spawn_server(None);
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .new_agent();
    let transport = UreqTransport::with_agent(agent);
    let get = |path: &str| HttpRequest {
        method: HttpMethod::Get,
        url: format!("http://{addr}/ga4gh/trs/v2{path}"),
        headers: vec![("Accept".to_string(), "application/json".to_string())],
        body: None,
    };

    let resp = transport.execute(&get("/service-info")).unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("content-type"), Some("application/json"));

    let resp = transport.execute(&get("/tools/NOPE")).unwrap();
    assert_eq!(resp.status, 404);
    assert_eq!(resp.header("Content-Type"), Some("application/json"));

    // The same transport drives a client.
    let mut c = TrsClient::builder(format!("http://{addr}"))
        .config(SharedConfig::default())
        .transport(transport)
        .build()
        .unwrap();
    let err = c.get_tool("NOPE", RequestOptions::new()).unwrap_err();
    assert_eq!(err.status(), Some(404));
}
