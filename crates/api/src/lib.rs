pub mod client;
pub mod departments;
pub mod positions;
pub mod resource;

pub use client::{ApiClient, ApiError};
pub use departments::{Departments, DepartmentsApi};
pub use positions::{Positions, PositionsApi};
pub use resource::{Resource, ResourceClient};
