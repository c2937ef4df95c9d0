/// NO-OP
pub const ROOT: &str = "/";

/// --- Nodes ---
/// Connection details of every lightning node in the doppler ui config.
pub const CONNECTIONS: &str = "/api/connections";
/// Node and channel graph reconciled from all configured nodes (GET) or from posted snapshots (POST).
pub const GRAPH: &str = "/api/graph";
/// Forward a request to the url in the `target` header.
pub const PROXY: &str = "/api/proxy";

/// --- Scripts ---
/// Directory tree of the doppler scripts folder.
pub const SCRIPTS: &str = "/api/scripts";
/// Content of a single script (?scriptPath=).
pub const DOWNLOAD: &str = "/api/download";
/// Save a script into the scripts folder.
pub const SAVE: &str = "/api/save";
/// Run a script with the doppler binary in the background.
pub const RUN: &str = "/api/run";
/// Tear down the running cluster.
pub const RESET: &str = "/api/reset";

/// --- Logs ---
/// Server sent event stream of a run's log file (?id=).
pub const LOGS: &str = "/api/logs";
