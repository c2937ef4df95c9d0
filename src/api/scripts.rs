use std::{path::Path, sync::Arc};

use anyhow::anyhow;
use api::{Reset, ResetResponse, RunScript, RunScriptResponse, SaveScript, SaveScriptResponse};
use axum::{
    extract::Query,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use tokio::task::spawn_blocking;

use crate::{runner::ScriptRunner, scripts};

use super::{bad_request, internal_server, not_found, ApiError};

pub(crate) async fn list_scripts(
    Extension(runner): Extension<Arc<ScriptRunner>>,
) -> Result<impl IntoResponse, ApiError> {
    let folder = runner.paths().doppler_scripts_folder.clone();
    let tree = spawn_blocking(move || scripts::directory_tree(&folder))
        .await
        .map_err(internal_server)?
        .map_err(internal_server)?;
    Ok(Json(tree))
}

#[derive(Deserialize)]
pub(crate) struct DownloadQuery {
    #[serde(rename = "scriptPath")]
    script_path: Option<String>,
}

pub(crate) async fn download_script(
    Extension(runner): Extension<Arc<ScriptRunner>>,
    Query(query): Query<DownloadQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let script_path = query
        .script_path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| bad_request(anyhow!("scriptPath parameter is required")))?;
    let folder = runner.paths().doppler_scripts_folder.clone();
    let path = script_path.clone();
    let script = spawn_blocking(move || scripts::read_script(&folder, &path))
        .await
        .map_err(internal_server)?;
    match script {
        Ok(Some(script)) => Ok(([(CONTENT_TYPE, "text/plain; charset=utf-8")], script)),
        Ok(None) => Err(not_found(anyhow!("Script not found: {script_path}"))),
        Err(e) => Err(bad_request(e)),
    }
}

pub(crate) async fn save_script(
    Extension(runner): Extension<Arc<ScriptRunner>>,
    Json(save): Json<SaveScript>,
) -> Result<impl IntoResponse, ApiError> {
    if save.id.is_empty() || save.full_path.is_empty() || save.script.is_empty() {
        return Err(bad_request(anyhow!(
            "Invalid input. An id, fullPath, and script are required."
        )));
    }
    let SaveScript {
        full_path, script, ..
    } = save;
    let folder = runner.paths().doppler_scripts_folder.clone();
    scripts::confine(&folder, &full_path).map_err(bad_request)?;
    let path = full_path.clone();
    spawn_blocking(move || scripts::save_script(&folder, &path, &script))
        .await
        .map_err(internal_server)?
        .map_err(internal_server)?;
    Ok(Json(SaveScriptResponse {
        message: "Script saved".to_string(),
        script_path: full_path,
    }))
}

pub(crate) async fn run_script(
    Extension(runner): Extension<Arc<ScriptRunner>>,
    Json(run): Json<RunScript>,
) -> Result<impl IntoResponse, ApiError> {
    if run.id.is_empty() || run.full_path.is_empty() {
        return Err(bad_request(anyhow!(
            "Invalid input. Both id and fullPath are required."
        )));
    }
    let script = runner.script_path(&run.full_path).map_err(bad_request)?;
    let log = runner.log_path(&run.id).map_err(bad_request)?;
    if !is_file(&script).await {
        return Err(not_found(anyhow!("Script not found: {}", run.full_path)));
    }
    let pid = runner
        .run_script(&script, &log)
        .await
        .map_err(internal_server)?;
    Ok(Json(RunScriptResponse {
        message: "Script execution started in the background".to_string(),
        script_path: script.display().to_string(),
        log_path: log.display().to_string(),
        pid,
    }))
}

pub(crate) async fn reset(
    Extension(runner): Extension<Arc<ScriptRunner>>,
    body: Option<Json<Reset>>,
) -> Result<impl IntoResponse, ApiError> {
    let id = body.and_then(|Json(reset)| reset.id);
    let log = runner.reset_log_path(id.as_deref()).map_err(bad_request)?;
    runner.reset(&log).await.map_err(internal_server)?;
    Ok(Json(ResetResponse {
        message: "Reset script execution started in the background".to_string(),
        log_path: log.display().to_string(),
    }))
}

pub(crate) async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or_default()
}
