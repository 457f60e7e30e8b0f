use org_admin_core::{NewPosition, Position, PositionPatch};

use crate::resource::{Resource, ResourceClient};

/// `/puestos` collection. Each position references one department.
pub struct Positions;

impl Resource for Positions {
    const PATH: &'static str = "puestos";
    type Record = Position;
    type Draft = NewPosition;
    type Patch = PositionPatch;
}

pub type PositionsApi = ResourceClient<Positions>;
