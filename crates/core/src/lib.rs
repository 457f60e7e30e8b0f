//! Domain layer for the organization admin: records exchanged with the API,
//! response-shape normalization, and the view state machines.

pub mod confirm;
pub mod form;
pub mod normalizer;
pub mod types;

pub use confirm::{ConfirmBoard, PressOutcome, RowState};
pub use form::{DepartmentFields, FormFields, FormMode, FormState, PositionFields, Submission};
pub use normalizer::{normalize_list, normalize_record, Envelope, ListShape, NormalizerError};
pub use types::{
    Department, DepartmentPatch, DepartmentSummary, NewDepartment, NewPosition, Position,
    PositionPatch, Record, RecordId,
};
