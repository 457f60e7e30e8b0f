//! Department and position views.
//!
//! Each view owns its form state and delete confirmations; the record lists
//! live in the shared [`QueryCache`] under the resource path. Mutations
//! invalidate the cached list and the mounted listener fetches it again.

use std::{collections::HashMap, sync::Arc, time::Duration};

use metrics::counter;
use org_admin_api::{
    ApiError, Departments, DepartmentsApi, Positions, PositionsApi, Resource, ResourceClient,
};
use org_admin_cache::{CacheEvent, QueryCache};
use org_admin_core::{
    Department, DepartmentFields, FormFields, FormMode, FormState, Position, PositionFields,
    PressOutcome, Record, RecordId, RowState, Submission,
};
use thiserror::Error;
use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        Mutex,
    },
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::confirm::{ConfirmTimers, CONFIRM_WINDOW};
use crate::events::{PageEventKind, PageHub};

/// Binds a resource to the form that edits it.
pub trait ViewResource: Resource {
    type Fields: FormFields<Record = Self::Record, Draft = Self::Draft, Patch = Self::Patch>
        + Send
        + Sync
        + 'static;

    /// Cached lists that embed data from this resource and go stale with it.
    const DEPENDENT_KEYS: &'static [&'static str];
}

impl ViewResource for Departments {
    type Fields = DepartmentFields;
    // Positions embed their department's name.
    const DEPENDENT_KEYS: &'static [&'static str] = &[Positions::PATH];
}

impl ViewResource for Positions {
    type Fields = PositionFields;
    const DEPENDENT_KEYS: &'static [&'static str] = &[];
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("record {0} is not in the current list")]
    UnknownRecord(RecordId),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A required field was blank; nothing was sent.
    Ignored,
    Created(RecordId),
    Updated(RecordId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Armed,
    Deleted,
    Ignored,
}

/// Everything needed to render a view.
pub struct ViewSnapshot<R: ViewResource> {
    pub items: Arc<Vec<R::Record>>,
    pub loading: bool,
    pub mode: FormMode,
    pub fields: R::Fields,
    pub submit_label: &'static str,
    pub rows: HashMap<RecordId, RowState>,
}

impl<R: ViewResource> ViewSnapshot<R> {
    pub fn row_state(&self, id: RecordId) -> Option<RowState> {
        self.rows.get(&id).copied()
    }
}

struct ViewState<F> {
    form: FormState<F>,
    pending: usize,
}

pub struct ResourceView<R: ViewResource> {
    api: ResourceClient<R>,
    cache: QueryCache,
    page: PageHub,
    state: Arc<Mutex<ViewState<R::Fields>>>,
    confirms: ConfirmTimers,
}

impl<R: ViewResource> Clone for ResourceView<R> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            cache: self.cache.clone(),
            page: self.page.clone(),
            state: self.state.clone(),
            confirms: self.confirms.clone(),
        }
    }
}

pub type DepartmentView = ResourceView<Departments>;

impl<R: ViewResource> ResourceView<R> {
    pub fn new(api: ResourceClient<R>, cache: QueryCache, page: PageHub) -> Self {
        Self::with_confirm_window(api, cache, page, CONFIRM_WINDOW)
    }

    pub fn with_confirm_window(
        api: ResourceClient<R>,
        cache: QueryCache,
        page: PageHub,
        window: Duration,
    ) -> Self {
        Self {
            confirms: ConfirmTimers::new(R::PATH, page.clone(), window),
            api,
            cache,
            page,
            state: Arc::new(Mutex::new(ViewState {
                form: FormState::new(),
                pending: 0,
            })),
        }
    }

    /// Loads the list now and re-loads it whenever it is invalidated.
    pub fn mount(&self) -> JoinHandle<()> {
        let view = self.clone();
        let mut events = self.cache.subscribe();
        tokio::spawn(async move {
            let _ = view.refresh().await;
            while let Some(key) = next_invalidation(&mut events).await {
                if key.as_deref().map_or(true, |key| key == R::PATH) {
                    let _ = view.refresh().await;
                }
            }
        })
    }

    /// Reads the list through the cache, going to the server when it is stale.
    ///
    /// On failure the previously displayed items stay in place.
    pub async fn refresh(&self) -> Result<Arc<Vec<R::Record>>, ApiError> {
        self.state.lock().await.pending += 1;
        self.page.publish(R::PATH, PageEventKind::Loading);

        let result = self.load().await;

        {
            let mut state = self.state.lock().await;
            state.pending = state.pending.saturating_sub(1);
        }

        let kind = if result.is_ok() {
            PageEventKind::Refreshed
        } else {
            PageEventKind::RefreshFailed
        };
        self.page.publish(R::PATH, kind);
        result
    }

    /// Fetches the list when it is missing or stale, without notifying the page.
    ///
    /// Called on every page render so a list that failed to load is retried
    /// by the next page load.
    pub async fn ensure_loaded(&self) {
        let fresh = self
            .cache
            .status(R::PATH)
            .await
            .is_some_and(|status| !status.stale);
        if !fresh {
            let _ = self.load().await;
        }
    }

    async fn load(&self) -> Result<Arc<Vec<R::Record>>, ApiError> {
        let api = self.api.clone();
        let result = self
            .cache
            .fetch(R::PATH, move || async move { api.list().await })
            .await;

        match &result {
            Ok(items) => {
                counter!("view_refresh_total", "view" => R::PATH, "result" => "ok").increment(1);
                debug!(stage = "view", view = R::PATH, count = items.len(), "list refreshed");
            }
            Err(err) => {
                counter!("view_refresh_total", "view" => R::PATH, "result" => "error").increment(1);
                error!(stage = "view", view = R::PATH, error = %err, "failed to refresh list; keeping previous items");
            }
        }
        result
    }

    /// Items currently displayed; empty before the first successful load.
    pub async fn items(&self) -> Arc<Vec<R::Record>> {
        self.cache.read(R::PATH).await.unwrap_or_default()
    }

    /// Submits the form: create while idle, update while editing.
    ///
    /// Blank required fields make this a no-op. The fields are cleared only
    /// after the server accepts the change.
    pub async fn submit(&self, fields: R::Fields) -> Result<SubmitOutcome, ViewError> {
        let submission = self.state.lock().await.form.submission(fields);
        let Some(submission) = submission else {
            debug!(stage = "view", view = R::PATH, "incomplete form; submit ignored");
            return Ok(SubmitOutcome::Ignored);
        };

        let op_id = Uuid::new_v4();
        let outcome = match submission {
            Submission::Create(draft) => {
                let result = self.api.create(&draft).await;
                let record = self.settle("create", op_id, result)?;
                SubmitOutcome::Created(record.id())
            }
            Submission::Update(id, patch) => {
                let result = self.api.update(id, &patch).await;
                self.settle("update", op_id, result)?;
                SubmitOutcome::Updated(id)
            }
        };

        self.state.lock().await.form.complete();
        self.invalidate().await;
        Ok(outcome)
    }

    /// Loads a displayed row into the form.
    pub async fn begin_edit(&self, id: RecordId) -> Result<(), ViewError> {
        let items = self.items().await;
        let record = items
            .iter()
            .find(|record| record.id() == id)
            .ok_or(ViewError::UnknownRecord(id))?;
        self.state.lock().await.form.begin_edit(record);
        debug!(stage = "view", view = R::PATH, id, "editing");
        Ok(())
    }

    pub async fn cancel(&self) {
        self.state.lock().await.form.cancel();
    }

    /// Handles a press on a row's delete button.
    ///
    /// The first press opens the confirm window; a press inside it deletes.
    pub async fn press_delete(&self, id: RecordId) -> Result<DeleteOutcome, ViewError> {
        match self.confirms.press(id).await {
            PressOutcome::Armed(_) => {
                self.page.publish(R::PATH, PageEventKind::ConfirmArmed);
                Ok(DeleteOutcome::Armed)
            }
            PressOutcome::Ignored => Ok(DeleteOutcome::Ignored),
            PressOutcome::Confirmed => {
                let op_id = Uuid::new_v4();
                let result = self.api.delete(id).await;
                self.confirms.finish(id).await;
                self.settle("delete", op_id, result)?;

                self.state.lock().await.form.forget(id);
                self.invalidate().await;
                Ok(DeleteOutcome::Deleted)
            }
        }
    }

    pub async fn snapshot(&self) -> ViewSnapshot<R> {
        let items = self.items().await;
        let rows = self.confirms.rows().await;
        let state = self.state.lock().await;
        ViewSnapshot {
            items,
            loading: state.pending > 0,
            mode: state.form.mode(),
            fields: state.form.fields().clone(),
            submit_label: state.form.submit_label(),
            rows,
        }
    }

    fn settle<T>(
        &self,
        op: &'static str,
        op_id: Uuid,
        result: Result<T, ApiError>,
    ) -> Result<T, ViewError> {
        match result {
            Ok(value) => {
                counter!("view_mutations_total", "view" => R::PATH, "op" => op, "result" => "ok")
                    .increment(1);
                info!(stage = "view", view = R::PATH, op, %op_id, "mutation accepted");
                Ok(value)
            }
            Err(err) => {
                counter!("view_mutations_total", "view" => R::PATH, "op" => op, "result" => "error")
                    .increment(1);
                error!(stage = "view", view = R::PATH, op, %op_id, error = %err, "mutation failed");
                Err(err.into())
            }
        }
    }

    async fn invalidate(&self) {
        self.cache.invalidate(R::PATH).await;
        for key in R::DEPENDENT_KEYS {
            self.cache.invalidate(key).await;
        }
        self.page.publish(R::PATH, PageEventKind::Mutated);
    }
}

/// Position view: the generic view plus the department selector.
#[derive(Clone)]
pub struct PositionView {
    positions: ResourceView<Positions>,
    departments: DepartmentsApi,
    cache: QueryCache,
    page: PageHub,
}

pub struct PositionSnapshot {
    pub view: ViewSnapshot<Positions>,
    pub departments: Arc<Vec<Department>>,
}

impl PositionSnapshot {
    /// Submitting requires a department to choose from.
    pub fn can_submit(&self) -> bool {
        !self.departments.is_empty()
    }
}

impl PositionView {
    pub fn new(
        positions: PositionsApi,
        departments: DepartmentsApi,
        cache: QueryCache,
        page: PageHub,
    ) -> Self {
        Self::from_view(
            ResourceView::new(positions, cache.clone(), page.clone()),
            departments,
        )
    }

    pub fn from_view(positions: ResourceView<Positions>, departments: DepartmentsApi) -> Self {
        Self {
            cache: positions.cache.clone(),
            page: positions.page.clone(),
            positions,
            departments,
        }
    }

    /// Loads positions and departments, then follows invalidations of either.
    pub fn mount(&self) -> JoinHandle<()> {
        let view = self.clone();
        let mut events = self.cache.subscribe();
        tokio::spawn(async move {
            let _ = view.refresh().await;
            while let Some(key) = next_invalidation(&mut events).await {
                let Some(key) = key else {
                    let _ = view.refresh().await;
                    continue;
                };
                if key == Positions::PATH {
                    let _ = view.positions.refresh().await;
                } else if key == Departments::PATH && view.load_departments().await.is_ok() {
                    view.page.publish(Positions::PATH, PageEventKind::Refreshed);
                }
            }
        })
    }

    pub async fn refresh(&self) -> Result<Arc<Vec<Position>>, ApiError> {
        let (positions, departments) =
            tokio::join!(self.positions.refresh(), self.load_departments());
        if departments.is_err() {
            warn!(stage = "view", view = Positions::PATH, "department selector not refreshed");
        }
        positions
    }

    /// Retries whichever of the two lists is missing or stale.
    pub async fn ensure_loaded(&self) {
        let _ = tokio::join!(self.positions.ensure_loaded(), self.load_departments());
    }

    /// Reads the department list backing the selector through the shared cache.
    pub async fn load_departments(&self) -> Result<Arc<Vec<Department>>, ApiError> {
        let api = self.departments.clone();
        self.cache
            .fetch(Departments::PATH, move || async move { api.list().await })
            .await
            .inspect_err(|err| {
                error!(stage = "view", view = Positions::PATH, error = %err, "failed to load departments");
            })
    }

    pub async fn submit(&self, fields: PositionFields) -> Result<SubmitOutcome, ViewError> {
        self.positions.submit(fields).await
    }

    pub async fn begin_edit(&self, id: RecordId) -> Result<(), ViewError> {
        self.positions.begin_edit(id).await
    }

    pub async fn cancel(&self) {
        self.positions.cancel().await
    }

    pub async fn press_delete(&self, id: RecordId) -> Result<DeleteOutcome, ViewError> {
        self.positions.press_delete(id).await
    }

    pub async fn snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            view: self.positions.snapshot().await,
            departments: self
                .cache
                .read(Departments::PATH)
                .await
                .unwrap_or_default(),
        }
    }
}

/// Waits for the next invalidation.
///
/// `Some(Some(key))` names the invalidated key, `Some(None)` means events were
/// dropped and everything should be reloaded, `None` means the cache is gone.
async fn next_invalidation(events: &mut broadcast::Receiver<CacheEvent>) -> Option<Option<String>> {
    loop {
        match events.recv().await {
            Ok(CacheEvent::Invalidated { key }) => return Some(Some(key)),
            Ok(CacheEvent::Updated { .. }) => continue,
            Err(RecvError::Lagged(skipped)) => {
                warn!(stage = "view", skipped, "cache events lagged; reloading");
                return Some(None);
            }
            Err(RecvError::Closed) => return None,
        }
    }
}
