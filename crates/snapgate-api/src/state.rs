//! Application state shared by all handlers.

use snapgate_core::Config;
use snapgate_services::Gateway;

pub struct AppState {
    pub config: Config,
    pub gateway: Gateway,
}
