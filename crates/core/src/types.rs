use serde::{Deserialize, Serialize};

/// Server-assigned record identifier.
pub type RecordId = i64;

/// Organizational unit as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: RecordId,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "subcuenta")]
    pub subaccount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Payload for `POST /departamentos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewDepartment {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "subcuenta")]
    pub subaccount: String,
}

/// Partial payload for `PUT /departamentos/{id}`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentPatch {
    #[serde(rename = "nombre", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "descripcion", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "subcuenta", default, skip_serializing_if = "Option::is_none")]
    pub subaccount: Option<String>,
}

/// Department reference embedded in position responses for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentSummary {
    pub id: RecordId,
    #[serde(rename = "nombre")]
    pub name: String,
}

/// Job position as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: RecordId,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "departamento_id", default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<RecordId>,
    #[serde(rename = "departamento", default, skip_serializing_if = "Option::is_none")]
    pub department: Option<DepartmentSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Position {
    /// Identifier of the owning department, from the reference or the embedded summary.
    pub fn department_ref(&self) -> Option<RecordId> {
        self.department_id
            .or_else(|| self.department.as_ref().map(|summary| summary.id))
    }

    /// Name to display for the owning department.
    ///
    /// Prefers the server-embedded summary and falls back to the loaded
    /// department list when the server only sent the reference.
    pub fn department_name<'a>(&'a self, departments: &'a [Department]) -> Option<&'a str> {
        if let Some(summary) = &self.department {
            return Some(summary.name.as_str());
        }
        let id = self.department_id?;
        departments
            .iter()
            .find(|department| department.id == id)
            .map(|department| department.name.as_str())
    }
}

/// Payload for `POST /puestos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPosition {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "departamento_id")]
    pub department_id: RecordId,
}

/// Partial payload for `PUT /puestos/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionPatch {
    #[serde(rename = "nombre", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "departamento_id", default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<RecordId>,
}

/// Records addressable by a server-assigned id.
pub trait Record {
    fn id(&self) -> RecordId;
}

impl Record for Department {
    fn id(&self) -> RecordId {
        self.id
    }
}

impl Record for Position {
    fn id(&self) -> RecordId {
        self.id
    }
}
