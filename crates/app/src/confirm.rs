use std::{collections::HashMap, sync::Arc, time::Duration};

use org_admin_core::{ConfirmBoard, PressOutcome, RecordId, RowState};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::debug;

use crate::events::{PageEventKind, PageHub};

pub const CONFIRM_WINDOW: Duration = Duration::from_secs(3);

/// Delete confirmation with one cancellable timer per row.
#[derive(Clone)]
pub struct ConfirmTimers {
    inner: Arc<Mutex<Inner>>,
    window: Duration,
    view: &'static str,
    page: PageHub,
}

#[derive(Default)]
struct Inner {
    board: ConfirmBoard,
    timers: HashMap<RecordId, JoinHandle<()>>,
}

impl ConfirmTimers {
    pub fn new(view: &'static str, page: PageHub, window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            window,
            view,
            page,
        }
    }

    /// Registers a press on the row's delete button.
    ///
    /// Arming starts the row's timer, replacing any earlier one; confirming
    /// cancels it.
    pub async fn press(&self, id: RecordId) -> PressOutcome {
        let mut inner = self.inner.lock().await;
        let outcome = inner.board.press(id);
        match outcome {
            PressOutcome::Armed(generation) => {
                let timer = self.spawn_timer(id, generation);
                if let Some(previous) = inner.timers.insert(id, timer) {
                    previous.abort();
                }
                debug!(stage = "confirm", view = self.view, id, generation, "delete armed");
            }
            PressOutcome::Confirmed => {
                if let Some(timer) = inner.timers.remove(&id) {
                    timer.abort();
                }
                debug!(stage = "confirm", view = self.view, id, "delete confirmed");
            }
            PressOutcome::Ignored => {
                debug!(stage = "confirm", view = self.view, id, "delete already in flight");
            }
        }
        outcome
    }

    /// Releases a row once its delete request has settled.
    pub async fn finish(&self, id: RecordId) {
        self.inner.lock().await.board.finish(id);
    }

    pub async fn rows(&self) -> HashMap<RecordId, RowState> {
        self.inner.lock().await.board.rows().collect()
    }

    fn spawn_timer(&self, id: RecordId, generation: u64) -> JoinHandle<()> {
        let inner = self.inner.clone();
        let page = self.page.clone();
        let view = self.view;
        let window = self.window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let mut guard = inner.lock().await;
            if guard.board.expire(id, generation) {
                guard.timers.remove(&id);
                drop(guard);
                debug!(stage = "confirm", view, id, "confirm window elapsed");
                page.publish(view, PageEventKind::ConfirmExpired);
            }
        })
    }
}
