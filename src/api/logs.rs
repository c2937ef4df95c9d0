use std::{collections::VecDeque, convert::Infallible, sync::Arc, time::Duration};

use anyhow::anyhow;
use axum::{
    extract::Query,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Sse,
    },
    Extension,
};
use futures::{stream, Stream};
use log::debug;
use serde::Deserialize;
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::{logs::LogTail, runner::ScriptRunner};

use super::{bad_request, not_found, scripts::is_file, ApiError};

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Deserialize)]
pub(crate) struct LogQuery {
    id: Option<String>,
}

pub(crate) async fn stream_logs(
    Extension(runner): Extension<Arc<ScriptRunner>>,
    Query(query): Query<LogQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let id = query
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| bad_request(anyhow!("id parameter is required")))?;
    let path = runner.log_path(&id).map_err(bad_request)?;
    if !is_file(&path).await {
        return Err(not_found(anyhow!("Log file not found: {}", path.display())));
    }
    debug!("Streaming {}", path.display());
    Ok(Sse::new(tail_events(LogTail::new(&path))).keep_alive(KeepAlive::default()))
}

struct TailState {
    tail: LogTail,
    interval: Interval,
    queued: VecDeque<String>,
}

/// An event per line appended to the file, forever. Read failures are sent as events too.
fn tail_events(tail: LogTail) -> impl Stream<Item = Result<Event, Infallible>> {
    let mut poll_interval = interval(POLL_INTERVAL);
    poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let state = TailState {
        tail,
        interval: poll_interval,
        queued: VecDeque::new(),
    };
    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.queued.pop_front() {
                return Some((Ok(Event::default().data(line)), state));
            }
            state.interval.tick().await;
            match state.tail.poll().await {
                Ok(lines) => state.queued.extend(lines),
                Err(e) => state.queued.push_back(format!("Error: {e}")),
            }
        }
    })
}
