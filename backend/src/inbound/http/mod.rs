//! HTTP inbound adapter.
//!
//! Handlers only see the driving ports held in [`state::HttpState`]; domain
//! failures reach clients through the [`actix_web::ResponseError`] mapping in
//! [`error`].

pub mod error;
pub mod health;
pub mod state;
pub mod users;

pub use crate::domain::ApiResult;
pub use health::HealthState;
pub use state::HttpState;

use actix_web::web;

/// Register every route this service exposes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health::ready)
        .service(health::live)
        .configure(users::configure);
}
