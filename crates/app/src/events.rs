use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::response::sse::{Event, KeepAlive};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::{iter, wrappers::BroadcastStream, Stream, StreamExt};
use tracing::debug;

const EVENT_BUFFER: usize = 128;

/// What changed on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageEventKind {
    Loading,
    Refreshed,
    RefreshFailed,
    Mutated,
    ConfirmArmed,
    ConfirmExpired,
}

impl PageEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Refreshed => "refreshed",
            Self::RefreshFailed => "refresh_failed",
            Self::Mutated => "mutated",
            Self::ConfirmArmed => "confirm_armed",
            Self::ConfirmExpired => "confirm_expired",
        }
    }

    /// Whether the browser has to re-render to show this change.
    pub fn needs_reload(self) -> bool {
        !matches!(self, Self::Loading)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageEvent {
    pub ts: DateTime<Utc>,
    pub version: u64,
    pub view: &'static str,
    pub kind: PageEventKind,
}

impl PageEvent {
    pub fn into_sse_event(self) -> Result<Event, serde_json::Error> {
        let data = serde_json::to_string(&self)?;
        Ok(Event::default()
            .event("refresh")
            .id(self.version.to_string())
            .data(data))
    }
}

/// Fan-out of page changes to connected browsers.
///
/// Every published event bumps a version number; a page renders the version
/// it was built from so a late-connecting stream can tell it missed something.
#[derive(Clone)]
pub struct PageHub {
    sender: broadcast::Sender<PageEvent>,
    version: Arc<AtomicU64>,
}

impl Default for PageHub {
    fn default() -> Self {
        Self::new()
    }
}

impl PageHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            sender,
            version: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn publish(&self, view: &'static str, kind: PageEventKind) {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        let event = PageEvent {
            ts: Utc::now(),
            version,
            view,
            kind,
        };
        if self.sender.send(event).is_err() {
            debug!(stage = "page", view, kind = kind.as_str(), "no page subscribers");
        }
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PageEvent> {
        self.sender.subscribe()
    }
}

/// SSE stream of reload-worthy page events.
///
/// When `since` is older than the hub's version a synthetic event is sent
/// first, so the page reloads even if the change happened before it connected.
pub fn page_stream(
    hub: PageHub,
    since: Option<u64>,
) -> impl Stream<Item = Result<Event, serde_json::Error>> + Send + 'static {
    // Subscribe before reading the version so nothing falls in between.
    let receiver = hub.subscribe();
    let current = hub.version();
    let catch_up = since
        .filter(|seen| *seen < current)
        .map(|_| PageEvent {
            ts: Utc::now(),
            version: current,
            view: "page",
            kind: PageEventKind::Refreshed,
        });

    let live = BroadcastStream::new(receiver).filter_map(|result| match result {
        Ok(event) if event.kind.needs_reload() => Some(event.into_sse_event()),
        Ok(_) => None,
        Err(_) => None,
    });

    iter(catch_up.into_iter().map(PageEvent::into_sse_event)).chain(live)
}

pub fn page_keep_alive() -> KeepAlive {
    KeepAlive::new()
        .interval(Duration::from_secs(20))
        .text("heartbeat")
}
