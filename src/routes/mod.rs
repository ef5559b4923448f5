mod auth;
mod health_check;

pub use auth::{get_current_user, login, refresh, register, revoke_token};
pub use health_check::health_check;
