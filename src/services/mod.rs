mod error;
mod users;

pub use error::{UserError, UserResult};
pub use users::UserService;
