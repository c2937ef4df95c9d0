use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileTree {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileTree>>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct SaveScript {
    #[serde(default)]
    pub id: String,
    /// Path relative to the scripts folder.
    #[serde(default, rename = "fullPath")]
    pub full_path: String,
    #[serde(default)]
    pub script: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SaveScriptResponse {
    pub message: String,
    #[serde(rename = "scriptPath")]
    pub script_path: String,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct RunScript {
    /// Run id, also the name of the log file.
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "fullPath")]
    pub full_path: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RunScriptResponse {
    pub message: String,
    #[serde(rename = "scriptPath")]
    pub script_path: String,
    #[serde(rename = "logPath")]
    pub log_path: String,
    pub pid: u32,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct Reset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ResetResponse {
    pub message: String,
    #[serde(rename = "logPath")]
    pub log_path: String,
}
