use std::process::{Command, Output};

use anyhow::Result;
use api::{Connections, FileTree, Graph, SaveScriptResponse};
use serde::de;

use super::rest::create_api_server;

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_connections() -> Result<()> {
    let output = run_cli("connections", &[]).await?;
    let connections: Connections = deserialize(&output.stdout)?;
    assert!(connections.contains_key("bob"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_graph() -> Result<()> {
    let output = run_cli("graph", &[]).await?;
    let graph: Graph = deserialize(&output.stdout)?;
    assert_eq!(2, graph.edges.len());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_save_and_download() -> Result<()> {
    let context = create_api_server().await?;
    let file = context.root.path().join("local.doppler");
    std::fs::write(&file, "SKIP 3 BLOCKS")?;

    let output = run_cli(
        "save",
        &["--path", "cli/local.doppler", "--file", &file.display().to_string()],
    )
    .await?;
    let response: SaveScriptResponse = deserialize(&output.stdout)?;
    assert_eq!("cli/local.doppler", response.script_path);

    let output = run_cli("download", &["--path", "cli/local.doppler"]).await?;
    assert_eq!("SKIP 3 BLOCKS\n", String::from_utf8(output.stdout)?);

    let output = run_cli("list-scripts", &[]).await?;
    let tree: FileTree = deserialize(&output.stdout)?;
    assert!(tree
        .children
        .unwrap_or_default()
        .iter()
        .any(|c| c.label == "cli"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_error_response() -> Result<()> {
    let output = run_cli("download", &["--path", "../outside"]).await?;
    let error: api::Error = deserialize(&output.stdout)?;
    assert_eq!("400 Bad Request", error.status);
    Ok(())
}

async fn run_cli(command: &str, extra_args: &[&str]) -> Result<Output> {
    let context = create_api_server().await?;

    let output = Command::new(env!("CARGO_BIN_EXE_doppler-ui-cli"))
        .args(["--target", &context.base_url, command])
        .args(extra_args)
        .output()
        .unwrap();

    if !output.status.success() {
        panic!("{}", String::from_utf8(output.stderr).unwrap());
    }
    Ok(output)
}

fn deserialize<'a, T: de::Deserialize<'a>>(bytes: &'a [u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}
