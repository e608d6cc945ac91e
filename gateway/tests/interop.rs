use anyhow::Result;
use assert_cmd::cargo::cargo_bin;
use rmcp::{
    ServiceExt,
    model::{CallToolRequestParam, CallToolResult, ReadResourceRequestParam, ResourceContents},
    transport::child_process::{ConfigureCommandExt, TokioChildProcess},
};
use serde_json::json;
use tokio::process::Command;

fn write_config(dir: &tempfile::TempDir) -> Result<std::path::PathBuf> {
    let mock = cargo_bin("mock_backend_server");
    let config = format!(
        r#"
log_path: "{log}"
backends:
  - name: alpha
    transport: stdio
    command: "{mock}"
    env:
      MOCK_SERVER_NAME: alpha
  - name: beta
    transport: stdio
    command: "{mock}"
    env:
      MOCK_SERVER_NAME: beta
"#,
        log = dir.path().join("gateway.log").display(),
        mock = mock.display()
    );
    let path = dir.path().join("voitta.yaml");
    std::fs::write(&path, config)?;
    Ok(path)
}

fn first_text(result: &CallToolResult) -> String {
    result
        .content
        .first()
        .and_then(|item| item.as_text().map(|t| t.text.clone()))
        .unwrap_or_default()
}

#[tokio::test]
async fn gateway_bridges_backend_tools_over_stdio() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config_path = write_config(&dir)?;
    let bin = cargo_bin("voitta-gateway");
    let service = ()
        .serve(TokioChildProcess::new(Command::new(&bin).configure(
            |cmd| {
                cmd.env("CONFIG_PATH", &config_path);
            },
        ))?)
        .await?;

    let tools = service.list_tools(Default::default()).await?.tools;
    let names: Vec<String> = tools
        .iter()
        .map(|tool| tool.name.as_ref().to_string())
        .collect();
    assert!(names.contains(&"get_voitta_tool_info".to_string()));
    assert!(names.contains(&"get_endpoint_info".to_string()));
    // both backends expose the same short names; every registration is listed
    assert_eq!(names.iter().filter(|name| name.as_str() == "greet").count(), 2);

    // plain text results pass through verbatim; the discovery-order tie-break
    // routes duplicate short names to the first backend
    let greet = service
        .call_tool(CallToolRequestParam {
            name: "greet".into(),
            arguments: None,
        })
        .await?;
    assert_eq!(first_text(&greet), "hello from alpha");

    // structured results come back as indented JSON
    let echo = service
        .call_tool(CallToolRequestParam {
            name: "echo".into(),
            arguments: json!({"text": "hi"}).as_object().cloned(),
        })
        .await?;
    let text = first_text(&echo);
    assert!(text.contains("\"echoed\": \"hi\""), "echo text: {text}");
    assert!(text.contains("\"server\": \"alpha\""), "echo text: {text}");

    // failures surface as tool-error text, never protocol errors
    let boom = service
        .call_tool(CallToolRequestParam {
            name: "boom".into(),
            arguments: None,
        })
        .await?;
    assert_eq!(boom.is_error, Some(true));
    assert_eq!(first_text(&boom), "Error calling tool boom: boom");

    let missing = service
        .call_tool(CallToolRequestParam {
            name: "nope".into(),
            arguments: None,
        })
        .await?;
    assert_eq!(missing.is_error, Some(true));
    assert_eq!(missing.content.len(), 1);
    assert_eq!(first_text(&missing), "Tool nope not found");

    // the tool listing resource names every registration by full name
    let listing = service
        .read_resource(ReadResourceRequestParam {
            uri: "voitta://tools".into(),
        })
        .await?;
    let text = match listing.contents.first() {
        Some(ResourceContents::TextResourceContents { text, .. }) => text.clone(),
        _ => String::new(),
    };
    assert!(text.contains("alpha____greet"), "listing: {text}");
    assert!(text.contains("beta____greet"), "listing: {text}");

    Ok(())
}

#[tokio::test]
async fn info_tools_answer_without_backends() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = format!(
        "log_path: \"{}\"\n",
        dir.path().join("gateway.log").display()
    );
    let config_path = dir.path().join("voitta.yaml");
    std::fs::write(&config_path, config)?;

    let bin = cargo_bin("voitta-gateway");
    let service = ()
        .serve(TokioChildProcess::new(Command::new(&bin).configure(
            |cmd| {
                cmd.env("CONFIG_PATH", &config_path);
            },
        ))?)
        .await?;

    let info = service
        .call_tool(CallToolRequestParam {
            name: "get_voitta_tool_info".into(),
            arguments: None,
        })
        .await?;
    assert_eq!(first_text(&info), "no tools registered");

    let endpoints = service
        .call_tool(CallToolRequestParam {
            name: "get_endpoint_info".into(),
            arguments: None,
        })
        .await?;
    assert_eq!(first_text(&endpoints), "no endpoints configured");

    Ok(())
}
