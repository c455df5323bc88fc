//! Users API handlers.
//!
//! ```text
//! GET    /users
//! GET    /users/pages?page=1&limit=10
//! GET    /users/pages?cursor=<token>
//! GET    /users/sse?limit=10
//! GET    /users/{id}
//! POST   /users {"id":1,"first_name":"John",...}
//! DELETE /users/{id}
//! ```

use std::sync::Arc;

use actix_web::http::header;
use actix_web::web::{self, Bytes};
use actix_web::{HttpRequest, HttpResponse, delete, get, post};
use futures_util::{StreamExt, stream};
use pagination::{Page, PageCursor, PageEnvelope, PageRequest, PageRequestError};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};
use url::Url;

use crate::domain::{ApiResult, Error, ErrorCode, UserId, UserRecord, page_stream};
use crate::inbound::http::error::redact_if_internal;
use crate::inbound::http::state::HttpState;

/// Page size used when a listing request omits `limit`.
pub const DEFAULT_PAGE_LIMIT: u64 = 10;

const END_EVENT: &[u8] = b"data: END\n\n";

/// Query string for `GET /users/pages`.
///
/// A `cursor` from a previous envelope takes precedence over `page`/`limit`.
#[derive(Debug, Default, Deserialize)]
pub struct PagesQuery {
    /// 1-based page index; defaults to the first page.
    pub page: Option<u64>,
    /// Records per page; defaults to [`DEFAULT_PAGE_LIMIT`].
    pub limit: Option<u64>,
    /// Opaque token taken from a previous envelope's `next` link.
    pub cursor: Option<String>,
}

/// Query string for `GET /users/sse`.
#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    /// Records per emitted event; defaults to [`DEFAULT_PAGE_LIMIT`].
    pub limit: Option<u64>,
}

/// Register every users route under `/users`.
///
/// Fixed segments are registered before `/{id}` so they are not captured as
/// identifiers.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .service(list_users)
            .service(list_user_pages)
            .service(stream_users)
            .service(get_user)
            .service(create_user)
            .service(delete_user),
    );
}

fn parse_user_id(raw: &str) -> ApiResult<UserId> {
    raw.parse::<UserId>().map_err(|err| {
        Error::invalid_request(err.to_string()).with_details(json!({ "field": "id" }))
    })
}

fn map_page_request_error(err: PageRequestError) -> Error {
    let field = match err {
        PageRequestError::ZeroIndex => "page",
        PageRequestError::ZeroLimit | PageRequestError::LimitTooLarge { .. } => "limit",
    };
    Error::invalid_request(err.to_string()).with_details(json!({ "field": field }))
}

fn request_from_query(query: PagesQuery) -> ApiResult<PageRequest> {
    if let Some(token) = query.cursor {
        return PageCursor::from(token).decode().map_err(|err| {
            Error::invalid_request(format!("invalid cursor: {err}"))
                .with_details(json!({ "field": "cursor" }))
        });
    }
    PageRequest::new(
        query.page.unwrap_or(1),
        query.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
    )
    .map_err(map_page_request_error)
}

fn base_url(req: &HttpRequest) -> ApiResult<Url> {
    let info = req.connection_info();
    let raw = format!("{}://{}{}", info.scheme(), info.host(), req.path());
    Url::parse(&raw).map_err(|err| {
        error!(error = %err, url = %raw, "failed to build page link base");
        Error::internal("failed to build page link")
    })
}

/// List every stored user.
#[get("")]
pub async fn list_users(state: web::Data<HttpState>) -> ApiResult<web::Json<Vec<UserRecord>>> {
    let users = state.records.list().await?;
    Ok(web::Json(users))
}

/// Fetch one page of users as a [`PageEnvelope`].
#[get("/pages")]
pub async fn list_user_pages(
    req: HttpRequest,
    state: web::Data<HttpState>,
    query: web::Query<PagesQuery>,
) -> ApiResult<HttpResponse> {
    let request = request_from_query(query.into_inner())?;
    let page = state.pages.next_page(request).await?;
    let envelope = PageEnvelope::from_page(page, &base_url(&req)?).map_err(|err| {
        error!(error = %err, "failed to encode next page cursor");
        Error::internal("failed to encode next page cursor")
    })?;
    Ok(HttpResponse::Ok().json(envelope))
}

fn page_event(result: Result<Page<UserRecord>, Error>) -> Bytes {
    let encoded = match result {
        Ok(page) => serde_json::to_string(page.items())
            .map(|json| format!("data: {json}\n\n"))
            .map_err(|err| Error::internal(format!("failed to encode page: {err}"))),
        Err(err) => Err(err),
    };
    match encoded {
        Ok(event) => Bytes::from(event),
        Err(err) => error_event(&err),
    }
}

fn error_event(err: &Error) -> Bytes {
    if matches!(err.code(), ErrorCode::InternalError) {
        error!(error = %err, "user stream failed");
    }
    let payload = serde_json::to_string(&redact_if_internal(err))
        .unwrap_or_else(|_| r#"{"code":"internal_error","message":"Internal server error"}"#.to_owned());
    Bytes::from(format!("event: error\ndata: {payload}\n\n"))
}

/// Stream every user as server-sent events, one `data:` event per page.
///
/// The stream ends with `data: END` after the terminal page. A failed page
/// is sent as an `error` event and ends the walk.
#[get("/sse")]
pub async fn stream_users(
    state: web::Data<HttpState>,
    query: web::Query<StreamQuery>,
) -> ApiResult<HttpResponse> {
    let first = PageRequest::first(query.limit.unwrap_or(DEFAULT_PAGE_LIMIT))
        .map_err(map_page_request_error)?;
    debug!(limit = first.limit(), "starting user stream");
    let events = page_stream(Arc::clone(&state.pages), first)
        .map(page_event)
        .chain(stream::once(async { Bytes::from_static(END_EVENT) }))
        .map(Ok::<_, actix_web::Error>);
    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(events))
}

/// Fetch one user by id.
#[get("/{id}")]
pub async fn get_user(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<UserRecord>> {
    let id = parse_user_id(&path)?;
    let user = state.records.get(id).await?;
    Ok(web::Json(user))
}

/// Create a user. Answers 201, or 409 when the id already exists.
#[post("")]
pub async fn create_user(
    state: web::Data<HttpState>,
    payload: web::Json<UserRecord>,
) -> ApiResult<HttpResponse> {
    let record = payload.into_inner();
    let id = record.id;
    state.commands.create(record).await?;
    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, format!("/users/{id}")))
        .finish())
}

/// Delete a user. Answers 204 whether or not the user existed.
#[delete("/{id}")]
pub async fn delete_user(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_user_id(&path)?;
    match state.commands.delete(id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(err) if err.code() == ErrorCode::NotFound => {
            debug!(record_id = id.get(), "delete of absent user");
            Ok(HttpResponse::NoContent().finish())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
#[path = "users_tests.rs"]
mod tests;
