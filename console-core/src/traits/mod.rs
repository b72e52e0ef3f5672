//! Host integration trait definitions

mod permission;
mod router;

pub use permission::{PermissionOracle, StaticPermissions};
pub use router::{ADMIN_PATH_PREFIX, ADMIN_ROUTE_SUFFIX, RouteTable, Router};
