mod query;
mod role;
mod tenant;
mod user;

pub use query::*;
pub use role::Role;
pub use tenant::{TenantId, DEFAULT_TENANT};
pub use user::*;
