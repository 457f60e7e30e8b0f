use org_admin_core::{Department, DepartmentPatch, NewDepartment};

use crate::resource::{Resource, ResourceClient};

/// `/departamentos` collection.
pub struct Departments;

impl Resource for Departments {
    const PATH: &'static str = "departamentos";
    type Record = Department;
    type Draft = NewDepartment;
    type Patch = DepartmentPatch;
}

pub type DepartmentsApi = ResourceClient<Departments>;
