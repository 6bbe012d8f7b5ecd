//! Token authentication: sign up, log in, log out and the middleware guarding every other route.

mod log_in;
mod log_out;
mod middleware;
mod sign_up;
mod token;

pub use log_in::post_log_in;
pub use log_out::post_log_out;
pub use middleware::auth_guard;
pub use sign_up::post_sign_up;
pub use token::{DEFAULT_TOKEN_DURATION, create_token_table};
