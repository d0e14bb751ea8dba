// Route exports
pub mod search;

use actix_web::web;

pub use search::AppState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(search::configure),
    );
}
