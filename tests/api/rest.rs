use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    sync::Arc,
    thread::spawn,
    time::Duration,
};

use anyhow::{Context, Result};
use api::{
    routes, Connections, FileTree, Graph, NodeKind, Perspective, ResetResponse, RunScript,
    RunScriptResponse, SaveScript, SaveScriptResponse,
};
use doppler_ui::{
    api::{bind_api_server, ProxyClient},
    config::ServerPaths,
    logs::LogStreams,
    mapper::GraphRequest,
    runner::ScriptRunner,
};
use futures::{FutureExt, StreamExt};
use logger::DopplerLogger;
use once_cell::sync::Lazy;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use settings::Settings;
use tempfile::TempDir;
use test_utils::{
    fixtures::{ALICE_PUBKEY, BOB_PUBKEY, DAVE_PUBKEY, FUNDING_TXID, OTHER_FUNDING_TXID},
    http_client, poll,
    ports::get_available_port,
    TestSettingsBuilder,
};
use tokio::{runtime::Runtime, sync::RwLock};

use crate::mocks::mock_nodes::{fixture_known, fixture_nodes, MockNodes};
use crate::quit_signal;

#[tokio::test(flavor = "multi_thread")]
async fn test_not_found() -> Result<()> {
    let context = create_api_server().await?;
    let response = request(&context, Method::GET, "/nope").send().await?;
    assert_eq!(StatusCode::NOT_FOUND, response.status());
    let error: api::Error = response.json().await?;
    assert_eq!("404 Not Found", error.status);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_connections() -> Result<()> {
    let context = create_api_server().await?;
    let connections: Connections = request(&context, Method::GET, routes::CONNECTIONS)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(3, connections.len());
    assert_eq!(NodeKind::Lnd, connections["alice"].kind);
    assert_eq!("secret", connections["carol"].password);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_graph() -> Result<()> {
    let context = create_api_server().await?;
    let response = request(&context, Method::GET, routes::GRAPH).send().await?;
    assert_eq!(StatusCode::OK, response.status());
    let graph: Graph = response.json().await?;
    assert_fixture_graph(&graph);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_post_graph() -> Result<()> {
    let context = create_api_server().await?;
    let body = GraphRequest {
        nodes: fixture_nodes(),
        known: fixture_known(),
    };
    let graph: Graph = request_with_body(&context, Method::POST, routes::GRAPH, body)?
        .send()
        .await?
        .json()
        .await?;
    assert_fixture_graph(&graph);
    Ok(())
}

fn assert_fixture_graph(graph: &Graph) {
    assert_eq!(3, graph.nodes.len());
    assert_eq!(2, graph.edges.len());

    let alice = graph.node(ALICE_PUBKEY).expect("alice");
    assert_eq!("alice", alice.alias);
    assert_eq!(Some(NodeKind::Lnd), alice.kind);
    assert_eq!(Some(NodeKind::Coreln), graph.node(BOB_PUBKEY).and_then(|n| n.kind));
    let dave = graph.node(DAVE_PUBKEY).expect("dave");
    assert_eq!(None, dave.kind);
    assert_eq!(DAVE_PUBKEY, dave.alias);

    let edge = graph
        .edge(&format!("{FUNDING_TXID}:0"))
        .expect("alice bob channel");
    assert_eq!(ALICE_PUBKEY, edge.source);
    assert_eq!(BOB_PUBKEY, edge.target);
    assert_eq!(1_000_000, edge.capacity);
    assert_eq!(600_000, edge.local_balance);
    assert_eq!(400_000, edge.remote_balance);
    assert!(edge.initiator);
    assert!(edge.active);
    assert_eq!(2, edge.views.len());
    let bob_view = edge.views.iter().find(|v| v.alias == "bob").expect("bob view");
    assert_eq!(NodeKind::Coreln, bob_view.kind);
    assert_eq!(Perspective::Target, bob_view.perspective);

    let edge = graph
        .edge(&format!("{OTHER_FUNDING_TXID}:1"))
        .expect("alice dave channel");
    assert_eq!(DAVE_PUBKEY, edge.target);
    assert_eq!(1, edge.views.len());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_proxy_requires_target() -> Result<()> {
    let context = create_api_server().await?;
    let response = request(&context, Method::GET, routes::PROXY).send().await?;
    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    let error: api::Error = response.json().await?;
    assert!(error.detail.contains("target"));

    let response = request(&context, Method::GET, routes::PROXY)
        .header("target", "ftp://localhost/file")
        .send()
        .await?;
    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_proxy_forwards_request() -> Result<()> {
    let context = create_api_server().await?;
    let target = format!("{}{}", context.base_url, routes::CONNECTIONS);
    let response = request(&context, Method::GET, routes::PROXY)
        .header("target", target)
        .send()
        .await?;
    assert_eq!(StatusCode::OK, response.status());
    let connections: Connections = response.json().await?;
    assert_eq!(MockNodes::default().connections, connections);

    let target = format!("{}{}", context.base_url, routes::GRAPH);
    let body = GraphRequest {
        nodes: fixture_nodes(),
        known: fixture_known(),
    };
    let graph: Graph = request_with_body(&context, Method::POST, routes::PROXY, body)?
        .header("target", target)
        .send()
        .await?
        .json()
        .await?;
    assert_fixture_graph(&graph);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_proxy_unreachable_target() -> Result<()> {
    let context = create_api_server().await?;
    let port = get_available_port()?;
    let response = request(&context, Method::GET, routes::PROXY)
        .header("target", format!("https://127.0.0.1:{port}/v1/getinfo"))
        .send()
        .await?;
    assert_eq!(StatusCode::BAD_GATEWAY, response.status());

    let target = format!("{}/api/missing", context.base_url);
    let response = request(&context, Method::GET, routes::PROXY)
        .header("target", target)
        .send()
        .await?;
    assert_eq!(StatusCode::BAD_GATEWAY, response.status());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_save_and_download_script() -> Result<()> {
    let context = create_api_server().await?;
    let script = "SKIP 10 BLOCKS\nalice OPEN_CHANNEL bob AMT 100000\n";
    let save = SaveScript {
        id: "save".to_string(),
        full_path: "saved/open_channel.doppler".to_string(),
        script: script.to_string(),
    };
    let response: SaveScriptResponse = request_with_body(&context, Method::POST, routes::SAVE, save)?
        .send()
        .await?
        .json()
        .await?;
    assert_eq!("saved/open_channel.doppler", response.script_path);

    let response = request(&context, Method::GET, routes::DOWNLOAD)
        .query(&[("scriptPath", "saved/open_channel.doppler")])
        .send()
        .await?;
    assert_eq!(StatusCode::OK, response.status());
    assert_eq!(script, response.text().await?);

    let tree: FileTree = request(&context, Method::GET, routes::SCRIPTS)
        .send()
        .await?
        .json()
        .await?;
    let saved = tree
        .children
        .unwrap_or_default()
        .into_iter()
        .find(|c| c.label == "saved")
        .expect("saved folder");
    assert!(saved
        .children
        .unwrap_or_default()
        .iter()
        .any(|c| c.label == "open_channel.doppler"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_script_requests_are_validated() -> Result<()> {
    let context = create_api_server().await?;
    let escape = SaveScript {
        id: "save".to_string(),
        full_path: "../escape.doppler".to_string(),
        script: "SKIP 1 BLOCKS".to_string(),
    };
    let response = request_with_body(&context, Method::POST, routes::SAVE, escape)?
        .send()
        .await?;
    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    assert!(!context.root.path().join("escape.doppler").exists());

    let empty = SaveScript {
        id: "save".to_string(),
        full_path: "empty.doppler".to_string(),
        script: String::new(),
    };
    let response = request_with_body(&context, Method::POST, routes::SAVE, empty)?
        .send()
        .await?;
    assert_eq!(StatusCode::BAD_REQUEST, response.status());

    let response = request(&context, Method::GET, routes::DOWNLOAD).send().await?;
    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    let response = request(&context, Method::GET, routes::DOWNLOAD)
        .query(&[("scriptPath", "missing.doppler")])
        .send()
        .await?;
    assert_eq!(StatusCode::NOT_FOUND, response.status());

    let run = RunScript {
        id: "missing".to_string(),
        full_path: "missing.doppler".to_string(),
    };
    let response = request_with_body(&context, Method::POST, routes::RUN, run)?
        .send()
        .await?;
    assert_eq!(StatusCode::NOT_FOUND, response.status());
    let run = RunScript {
        id: "../run".to_string(),
        full_path: "saved.doppler".to_string(),
    };
    let response = request_with_body(&context, Method::POST, routes::RUN, run)?
        .send()
        .await?;
    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_log_requests_are_validated() -> Result<()> {
    let context = create_api_server().await?;
    let response = request(&context, Method::GET, routes::LOGS).send().await?;
    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    let response = request(&context, Method::GET, routes::LOGS)
        .query(&[("id", "../secret")])
        .send()
        .await?;
    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    let response = request(&context, Method::GET, routes::LOGS)
        .query(&[("id", "never_ran")])
        .send()
        .await?;
    assert_eq!(StatusCode::NOT_FOUND, response.status());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_script_and_stream_logs() -> Result<()> {
    let context = create_api_server().await?;
    let save = SaveScript {
        id: "run".to_string(),
        full_path: "run/mine.doppler".to_string(),
        script: "MINE 5 BLOCKS".to_string(),
    };
    request_with_body(&context, Method::POST, routes::SAVE, save)?
        .send()
        .await?
        .error_for_status()?;

    let run = RunScript {
        id: "run_logs".to_string(),
        full_path: "run/mine.doppler".to_string(),
    };
    let response: RunScriptResponse = request_with_body(&context, Method::POST, routes::RUN, run)?
        .send()
        .await?
        .json()
        .await?;
    assert!(response.pid > 0);
    let log_path = context.logs_folder().join("run_logs.log");
    assert_eq!(log_path.display().to_string(), response.log_path);

    poll!(5, log_path.exists());
    let mut stream = request(&context, Method::GET, routes::LOGS)
        .query(&[("id", "run_logs")])
        .send()
        .await?
        .error_for_status()?
        .bytes_stream();
    let mut events = String::new();
    let read = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(chunk) = stream.next().await {
            events.push_str(&String::from_utf8_lossy(&chunk?));
            if events.contains("Child process exited with code 0") {
                break;
            }
        }
        anyhow::Ok(())
    })
    .await;
    assert!(matches!(read, Ok(Ok(()))), "log stream did not finish: {events}");

    assert!(events.contains("data: [INFO] Running"), "{events}");
    assert!(events.contains("data: MINE 5 BLOCKS"), "{events}");
    assert!(events.contains("--ui-config-path"), "{events}");
    assert!(events.contains("--level debug"), "{events}");
    assert!(!events.contains("\u{1b}["));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reset() -> Result<()> {
    let context = create_api_server().await?;
    let info_conf = context.settings.info_conf_path();
    fs::write(&info_conf, "[alice]\nTYPE=lnd\n")?;

    let response: ResetResponse = request(&context, Method::POST, routes::RESET)
        .body("{}")
        .send()
        .await?
        .json()
        .await?;
    assert!(!info_conf.exists());
    let log_path = PathBuf::from(&response.log_path);
    assert!(log_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .starts_with("reset_"));

    poll!(
        5,
        fs::read_to_string(&log_path)
            .map(|log| log.contains("Child process exited with code 0"))
            .unwrap_or_default()
    );
    assert!(fs::read_to_string(&log_path)?.starts_with("network reset\n"));
    Ok(())
}

static API_RUNTIME: Lazy<Runtime> = Lazy::new(|| Runtime::new().unwrap());

pub struct TestContext {
    pub settings: Settings,
    pub base_url: String,
    pub root: TempDir,
}

impl TestContext {
    pub fn logs_folder(&self) -> PathBuf {
        self.root.path().join("logs")
    }
}

static TEST_CONTEXT: Lazy<RwLock<Option<Arc<TestContext>>>> = Lazy::new(|| RwLock::new(None));

const FAKE_DOPPLER: &str = r#"#!/bin/sh
printf '[2024-03-01T10:11:12.123Z \033[32mINFO\033[0m] Running %s\n' "$2"
cat "$2"
echo
echo "$@"
"#;

const FAKE_RESET: &str = "#!/bin/sh\necho network reset\n";

fn executable(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content)?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

/// Lays out the folders doppler shares with the ui and writes the server config pointing at them.
fn create_workspace(root: &Path) -> Result<PathBuf> {
    let ui_config = root.join("ui_config");
    for dir in ["ui_config", "doppler_scripts", "logs", "scripts", "bin"] {
        fs::create_dir_all(root.join(dir))?;
    }
    executable(&root.join("bin").join("doppler"), FAKE_DOPPLER)?;
    executable(&root.join("scripts").join("reset.sh"), FAKE_RESET)?;
    fs::write(
        ui_config.join(settings::SERVER_CONF_FILE),
        format!(
            "[paths]\n\
             logsFolder={root}/logs\n\
             dopplerScriptsFolder={root}/doppler_scripts\n\
             dopplerBinaryPath={root}/bin/doppler\n\
             scriptsFolder={root}/scripts\n\
             currentWorkingDirectory={root}\n",
            root = root.display()
        ),
    )?;
    Ok(ui_config)
}

pub async fn create_api_server() -> Result<Arc<TestContext>> {
    let mut context = TEST_CONTEXT.write().await;
    if context.is_some() {
        drop(context); // release lock
        return Ok(TEST_CONTEXT.read().await.as_ref().unwrap().clone());
    }
    DopplerLogger::init("test", log::LevelFilter::Debug);
    let root = tempfile::tempdir()?;
    let ui_config = create_workspace(root.path())?;
    let rest_api_port = get_available_port().context("no port available")?;
    let rest_api_address = format!("127.0.0.1:{rest_api_port}");
    let settings = TestSettingsBuilder::new()
        .with_ui_config_path(&ui_config)
        .with_rest_api_address(&rest_api_address)
        .with_proxy_timeout(5)
        .build();

    let paths = ServerPaths::load(&settings.server_conf_path())?;
    let runner = Arc::new(ScriptRunner::new(
        paths,
        settings.info_conf_path(),
        Arc::new(LogStreams::new()),
    ));
    let proxy_client = Arc::new(ProxyClient::new(Duration::from_secs(
        settings.proxy_timeout_secs,
    ))?);
    let certs_dir = settings.certs_dir.clone();

    // Run the API with its own runtime in its own thread.
    spawn(move || {
        API_RUNTIME.spawn(async {
            bind_api_server(rest_api_address, certs_dir)
                .await?
                .serve(
                    Arc::new(MockNodes::default()),
                    runner,
                    proxy_client,
                    quit_signal().shared(),
                )
                .await
        })
    });

    let new_context = TestContext {
        base_url: format!("http://{}", settings.rest_api_address),
        settings,
        root,
    };

    poll!(
        3,
        request(&new_context, Method::GET, routes::ROOT)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or_default()
    );

    *context = Some(Arc::new(new_context));
    drop(context); // release lock
    Ok(TEST_CONTEXT.read().await.as_ref().unwrap().clone())
}

fn request(context: &TestContext, method: Method, route: &str) -> RequestBuilder {
    http_client()
        .request(method, format!("{}{}", context.base_url, route))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
}

fn request_with_body<T: Serialize>(
    context: &TestContext,
    method: Method,
    route: &str,
    body: T,
) -> Result<RequestBuilder> {
    Ok(request(context, method, route).body(serde_json::to_string(&body)?))
}
