//! Edit-state machine shared by the department and position views.
//!
//! A view is either creating a new record or editing an existing one. The
//! current field values are the draft; they survive failed submissions and are
//! cleared once the server accepts the change or the user cancels.

use crate::types::{
    Department, DepartmentPatch, NewDepartment, NewPosition, Position, PositionPatch, Record,
    RecordId,
};

/// Field set backing one of the admin forms.
pub trait FormFields: Clone + Default {
    type Record: Record;
    type Draft;
    type Patch;

    /// Builds the create payload, or `None` while a required field is blank.
    fn to_draft(&self) -> Option<Self::Draft>;

    /// Builds the update payload, or `None` while a required field is blank.
    fn to_patch(&self) -> Option<Self::Patch>;

    /// Loads an existing record into the form.
    fn from_record(record: &Self::Record) -> Self;

    fn is_complete(&self) -> bool {
        self.to_draft().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Editing(RecordId),
}

/// What a submit should do against the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission<D, P> {
    Create(D),
    Update(RecordId, P),
}

#[derive(Debug, Clone)]
pub struct FormState<F> {
    mode: FormMode,
    fields: F,
}

impl<F: FormFields> Default for FormState<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FormFields> FormState<F> {
    pub fn new() -> Self {
        Self {
            mode: FormMode::Create,
            fields: F::default(),
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn fields(&self) -> &F {
        &self.fields
    }

    /// Stores the submitted values as the draft and decides the request to issue.
    ///
    /// Returns `None` when a required field is blank; the mode is left untouched.
    pub fn submission(&mut self, fields: F) -> Option<Submission<F::Draft, F::Patch>> {
        self.fields = fields;
        match self.mode {
            FormMode::Create => self.fields.to_draft().map(Submission::Create),
            FormMode::Editing(id) => self
                .fields
                .to_patch()
                .map(|patch| Submission::Update(id, patch)),
        }
    }

    /// Switches to editing `record`, replacing the current draft.
    pub fn begin_edit(&mut self, record: &F::Record) {
        self.mode = FormMode::Editing(record.id());
        self.fields = F::from_record(record);
    }

    /// Called once the server accepted the submission.
    pub fn complete(&mut self) {
        self.reset();
    }

    pub fn cancel(&mut self) {
        self.reset();
    }

    /// Leaves editing mode if the record being edited no longer exists.
    pub fn forget(&mut self, id: RecordId) {
        if self.mode == FormMode::Editing(id) {
            self.reset();
        }
    }

    pub fn submit_label(&self) -> &'static str {
        match self.mode {
            FormMode::Create => "Crear",
            FormMode::Editing(_) => "Actualizar",
        }
    }

    fn reset(&mut self) {
        self.mode = FormMode::Create;
        self.fields = F::default();
    }
}

fn required(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Department form: name and subaccount are required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepartmentFields {
    pub name: String,
    pub description: String,
    pub subaccount: String,
}

impl FormFields for DepartmentFields {
    type Record = Department;
    type Draft = NewDepartment;
    type Patch = DepartmentPatch;

    fn to_draft(&self) -> Option<NewDepartment> {
        Some(NewDepartment {
            name: required(&self.name)?,
            description: required(&self.description),
            subaccount: required(&self.subaccount)?,
        })
    }

    fn to_patch(&self) -> Option<DepartmentPatch> {
        // An emptied description is sent as "" so the server clears it.
        Some(DepartmentPatch {
            name: Some(required(&self.name)?),
            description: Some(self.description.trim().to_string()),
            subaccount: Some(required(&self.subaccount)?),
        })
    }

    fn from_record(record: &Department) -> Self {
        Self {
            name: record.name.clone(),
            description: record.description.clone().unwrap_or_default(),
            subaccount: record.subaccount.clone(),
        }
    }
}

/// Position form: name and department are required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionFields {
    pub name: String,
    pub department_id: Option<RecordId>,
}

impl FormFields for PositionFields {
    type Record = Position;
    type Draft = NewPosition;
    type Patch = PositionPatch;

    fn to_draft(&self) -> Option<NewPosition> {
        Some(NewPosition {
            name: required(&self.name)?,
            department_id: self.department_id?,
        })
    }

    fn to_patch(&self) -> Option<PositionPatch> {
        Some(PositionPatch {
            name: Some(required(&self.name)?),
            department_id: Some(self.department_id?),
        })
    }

    fn from_record(record: &Position) -> Self {
        Self {
            name: record.name.clone(),
            department_id: record.department_ref(),
        }
    }
}
