pub mod handlers;
pub mod server;
pub mod state;

pub use server::{build_router, routes, run_server, serve, RouteInfo};
pub use state::{ApiInfo, AppState, SendRequest, SendResponse};
