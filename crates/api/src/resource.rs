use std::marker::PhantomData;

use metrics::counter;
use org_admin_core::{normalize_list, normalize_record, ListShape, Record, RecordId};
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::client::{ApiClient, ApiError};

/// A collection exposed by the API under `/{PATH}` and `/{PATH}/{id}`.
pub trait Resource: Send + Sync + 'static {
    const PATH: &'static str;
    type Record: Record + DeserializeOwned + Send + Sync + 'static;
    type Draft: Serialize + Send + Sync;
    type Patch: Serialize + Send + Sync;
}

/// List/create/update/delete operations for one resource.
pub struct ResourceClient<R> {
    api: ApiClient,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for ResourceClient<R> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> ResourceClient<R> {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            _resource: PhantomData,
        }
    }

    /// Fetches every record in server order.
    ///
    /// Accepts a bare array or `{"data": [...]}`. Any other body, including a
    /// successful response that is not JSON, is logged as anomalous and yields
    /// an empty list rather than an error.
    pub async fn list(&self) -> Result<Vec<R::Record>, ApiError> {
        let shape = match self.api.get_json(R::PATH).await {
            Ok(body) => normalize_list::<R::Record>(body),
            Err(ApiError::Shape(reason)) => ListShape::Unrecognized(reason),
            Err(err) => {
                log_failure::<R>("list", None, &err);
                return Err(err);
            }
        };
        match &shape {
            ListShape::Unrecognized(reason) => {
                counter!("api_shape_anomalies_total", "resource" => R::PATH).increment(1);
                warn!(stage = "api", resource = R::PATH, op = "list", reason = %reason, "unrecognized list response; treating as empty");
            }
            ListShape::Wrapped(items) | ListShape::Bare(items) => {
                debug!(stage = "api", resource = R::PATH, op = "list", count = items.len(), "list fetched");
            }
        }
        Ok(shape.into_items())
    }

    pub async fn create(&self, draft: &R::Draft) -> Result<R::Record, ApiError> {
        let body = self
            .api
            .send_json(Method::POST, R::PATH, draft)
            .await
            .inspect_err(|err| log_failure::<R>("create", None, err))?;
        record_from::<R>("create", None, body)
    }

    pub async fn update(&self, id: RecordId, patch: &R::Patch) -> Result<R::Record, ApiError> {
        let body = self
            .api
            .send_json(Method::PUT, &item_path::<R>(id), patch)
            .await
            .inspect_err(|err| log_failure::<R>("update", Some(id), err))?;
        record_from::<R>("update", Some(id), body)
    }

    pub async fn delete(&self, id: RecordId) -> Result<(), ApiError> {
        self.api
            .delete(&item_path::<R>(id))
            .await
            .inspect_err(|err| log_failure::<R>("delete", Some(id), err))
    }
}

fn item_path<R: Resource>(id: RecordId) -> String {
    format!("{}/{id}", R::PATH)
}

fn record_from<R: Resource>(
    op: &'static str,
    id: Option<RecordId>,
    body: serde_json::Value,
) -> Result<R::Record, ApiError> {
    normalize_record::<R::Record>(body).map_err(|err| {
        counter!("api_shape_anomalies_total", "resource" => R::PATH).increment(1);
        let err = ApiError::Shape(err.to_string());
        log_failure::<R>(op, id, &err);
        err
    })
}

fn log_failure<R: Resource>(op: &'static str, id: Option<RecordId>, err: &ApiError) {
    warn!(
        stage = "api",
        resource = R::PATH,
        op,
        id = ?id,
        kind = err.kind(),
        error = %err,
        "request failed"
    );
}
