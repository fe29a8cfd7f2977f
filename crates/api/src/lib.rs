pub mod routes;
pub mod server;

pub use routes::{ApiState, router};
pub use server::run_api_server;
