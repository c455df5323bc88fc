//! Server construction and adapter wiring.

mod adapters;

pub use adapters::{Adapters, build_adapters};

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use userstream::domain::{Timeouts, UserPageService, UserRecordService};
use userstream::inbound::http::{self, HealthState, HttpState};

/// Build the HTTP state from the shared adapters.
pub fn build_http_state(adapters: &Adapters, timeouts: Timeouts) -> web::Data<HttpState> {
    let records = Arc::new(UserRecordService::new(
        Arc::clone(&adapters.store),
        Arc::clone(&adapters.cache),
        Arc::clone(&adapters.cipher),
        timeouts,
    ));
    let pages = Arc::new(UserPageService::new(
        Arc::clone(&adapters.store),
        Arc::clone(&adapters.cipher),
        timeouts.store,
    ));
    web::Data::new(HttpState::new(records.clone(), records, pages))
}

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(health_state)
        .app_data(http_state)
        .configure(http::configure)
}

/// Construct an Actix HTTP server bound to `bind_addr`.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    bind_addr: SocketAddr,
) -> std::io::Result<Server> {
    let server = HttpServer::new(move || build_app(health_state.clone(), http_state.clone()))
        .bind(bind_addr)?
        .run();
    Ok(server)
}
