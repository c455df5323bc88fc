//! Tests for users API handlers.

use super::*;
use crate::domain::fixtures::plain_record;
use crate::domain::ports::{MockUserPagesQuery, MockUserRecordsCommand, MockUserRecordsQuery};
use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test};
use mockall::predicate::eq;
use rstest::rstest;
use serde_json::Value;

#[derive(Default)]
struct Ports {
    records: MockUserRecordsQuery,
    commands: MockUserRecordsCommand,
    pages: MockUserPagesQuery,
}

impl Ports {
    fn into_state(self) -> HttpState {
        HttpState::new(
            Arc::new(self.records),
            Arc::new(self.commands),
            Arc::new(self.pages),
        )
    }
}

async fn call(ports: Ports, request: actix_test::TestRequest) -> (StatusCode, Bytes) {
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(ports.into_state()))
            .configure(configure),
    )
    .await;
    let response = actix_test::call_service(&app, request.to_request()).await;
    let status = response.status();
    (status, actix_test::read_body(response).await)
}

fn json_body(body: &Bytes) -> Value {
    serde_json::from_slice(body).expect("json body")
}

fn records_page(request: PageRequest, total: i64) -> Page<UserRecord> {
    let offset = i64::try_from(request.offset()).expect("offset fits");
    let fetch = i64::try_from(request.fetch_limit()).expect("limit fits");
    let items = ((offset + 1)..=(offset + fetch).min(total))
        .map(plain_record)
        .collect();
    Page::from_lookahead(request, items)
}

#[actix_rt::test]
async fn list_returns_every_user() {
    let mut ports = Ports::default();
    ports
        .records
        .expect_list()
        .times(1)
        .returning(|| Ok(vec![plain_record(1), plain_record(2)]));

    let (status, body) = call(ports, actix_test::TestRequest::get().uri("/users")).await;
    assert_eq!(status, StatusCode::OK);
    let value = json_body(&body);
    let users = value.as_array().expect("array");
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["email"], "user1@example.com");
}

#[actix_rt::test]
async fn get_returns_decrypted_user() {
    let mut ports = Ports::default();
    ports
        .records
        .expect_get()
        .with(eq(UserId::new(7)))
        .times(1)
        .returning(|id| Ok(plain_record(id.get())));

    let (status, body) = call(ports, actix_test::TestRequest::get().uri("/users/7")).await;
    assert_eq!(status, StatusCode::OK);
    let value = json_body(&body);
    assert_eq!(value["id"], 7);
    assert_eq!(value["first_name"], "First7");
}

#[rstest]
#[case(Error::not_found("user 7 not found"), StatusCode::NOT_FOUND, "not_found")]
#[case(Error::timeout("store timed out"), StatusCode::REQUEST_TIMEOUT, "timeout")]
#[case(
    Error::service_unavailable("store unreachable"),
    StatusCode::SERVICE_UNAVAILABLE,
    "service_unavailable"
)]
#[actix_rt::test]
async fn get_maps_domain_errors(
    #[case] error: Error,
    #[case] expected: StatusCode,
    #[case] code: &str,
) {
    let mut ports = Ports::default();
    ports
        .records
        .expect_get()
        .times(1)
        .returning(move |_| Err(error.clone()));

    let (status, body) = call(ports, actix_test::TestRequest::get().uri("/users/7")).await;
    assert_eq!(status, expected);
    assert_eq!(json_body(&body)["code"], code);
}

#[actix_rt::test]
async fn get_rejects_non_numeric_id() {
    let mut ports = Ports::default();
    ports.records.expect_get().never();

    let (status, body) = call(ports, actix_test::TestRequest::get().uri("/users/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let value = json_body(&body);
    assert_eq!(value["code"], "invalid_request");
    assert_eq!(value["details"]["field"], "id");
}

fn create_payload(id: i64) -> Value {
    json!({
        "id": id,
        "first_name": "John",
        "last_name": "Doe",
        "email": "john@doe.com",
        "created_at": "2024-01-01T00:00:00Z",
        "deleted_at": null,
        "merged_at": null,
        "parent_user_id": null,
    })
}

#[actix_rt::test]
async fn create_answers_created_with_location() {
    let mut ports = Ports::default();
    ports
        .commands
        .expect_create()
        .withf(|record| record.id == UserId::new(1) && record.email == "john@doe.com")
        .times(1)
        .returning(|_| Ok(()));

    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(ports.into_state()))
            .configure(configure),
    )
    .await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/users")
            .set_json(create_payload(1))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok()),
        Some("/users/1")
    );
}

#[actix_rt::test]
async fn create_duplicate_answers_conflict() {
    let mut ports = Ports::default();
    ports
        .commands
        .expect_create()
        .times(1)
        .returning(|_| Err(Error::conflict("user 1 already exists")));

    let (status, body) = call(
        ports,
        actix_test::TestRequest::post()
            .uri("/users")
            .set_json(create_payload(1)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json_body(&body)["code"], "conflict");
}

#[rstest]
#[case(Ok(()))]
#[case(Err(Error::not_found("user 9 not found")))]
#[actix_rt::test]
async fn delete_answers_no_content_whether_or_not_present(#[case] outcome: Result<(), Error>) {
    let mut ports = Ports::default();
    ports
        .commands
        .expect_delete()
        .with(eq(UserId::new(9)))
        .times(1)
        .returning(move |_| outcome.clone());

    let (status, _) = call(ports, actix_test::TestRequest::delete().uri("/users/9")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[actix_rt::test]
async fn delete_surfaces_store_failures() {
    let mut ports = Ports::default();
    ports
        .commands
        .expect_delete()
        .times(1)
        .returning(|_| Err(Error::internal("query failed: relation missing")));

    let (status, body) = call(ports, actix_test::TestRequest::delete().uri("/users/9")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(&body)["message"], "Internal server error");
}

#[actix_rt::test]
async fn pages_return_envelope_with_next_cursor() {
    let mut ports = Ports::default();
    ports
        .pages
        .expect_next_page()
        .withf(|request| request.index() == 1 && request.limit() == 2)
        .times(1)
        .returning(|request| Ok(records_page(request, 5)));

    let (status, body) = call(
        ports,
        actix_test::TestRequest::get().uri("/users/pages?page=1&limit=2"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let value = json_body(&body);
    assert_eq!(value["page"], 1);
    assert_eq!(value["limit"], 2);
    assert_eq!(value["terminal"], false);
    assert_eq!(value["data"].as_array().map(Vec::len), Some(2));

    let next = Url::parse(value["next"].as_str().expect("next link")).expect("url");
    assert_eq!(next.path(), "/users/pages");
    let (key, token) = next.query_pairs().next().expect("cursor pair");
    assert_eq!(key, "cursor");
    let decoded = PageCursor::from(token.into_owned())
        .decode()
        .expect("valid cursor");
    assert_eq!(decoded, PageRequest::new(2, 2).expect("valid request"));
}

#[actix_rt::test]
async fn pages_accept_cursor_and_mark_terminal() {
    let cursor = PageCursor::encode(PageRequest::new(3, 2).expect("valid request"))
        .expect("cursor encodes");
    let mut ports = Ports::default();
    ports
        .pages
        .expect_next_page()
        .withf(|request| request.index() == 3 && request.limit() == 2)
        .times(1)
        .returning(|request| Ok(records_page(request, 5)));

    let uri = format!("/users/pages?cursor={}", cursor.as_str());
    let (status, body) = call(ports, actix_test::TestRequest::get().uri(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    let value = json_body(&body);
    assert_eq!(value["terminal"], true);
    assert!(value.get("next").is_none());
    assert_eq!(value["data"][0]["id"], 5);
}

#[rstest]
#[case("/users/pages?page=0&limit=2", "page")]
#[case("/users/pages?page=1&limit=0", "limit")]
#[case("/users/pages?page=1&limit=100000", "limit")]
#[case("/users/pages?cursor=not-a-cursor", "cursor")]
#[actix_rt::test]
async fn pages_reject_invalid_requests(#[case] uri: &str, #[case] field: &str) {
    let mut ports = Ports::default();
    ports.pages.expect_next_page().never();

    let (status, body) = call(ports, actix_test::TestRequest::get().uri(uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["details"]["field"], field);
}

#[actix_rt::test]
async fn sse_emits_one_event_per_page_then_end() {
    let mut ports = Ports::default();
    ports
        .pages
        .expect_next_page()
        .times(2)
        .returning(|request| Ok(records_page(request, 3)));

    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(ports.into_state()))
            .configure(configure),
    )
    .await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/users/sse?limit=2")
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("text/event-stream")
    );

    let body = actix_test::read_body(response).await;
    let text = std::str::from_utf8(&body).expect("utf-8 body");
    let events: Vec<&str> = text
        .split("\n\n")
        .filter(|event| !event.is_empty())
        .collect();
    assert_eq!(events.len(), 3);
    let first: Vec<Value> =
        serde_json::from_str(events[0].trim_start_matches("data: ")).expect("page json");
    assert_eq!(first.len(), 2);
    let second: Vec<Value> =
        serde_json::from_str(events[1].trim_start_matches("data: ")).expect("page json");
    assert_eq!(second.len(), 1);
    assert_eq!(events[2], "data: END");
}

#[actix_rt::test]
async fn sse_reports_error_event_and_ends() {
    let mut ports = Ports::default();
    ports
        .pages
        .expect_next_page()
        .times(1)
        .returning(|_| Err(Error::internal("store exploded")));

    let (status, body) = call(ports, actix_test::TestRequest::get().uri("/users/sse")).await;
    assert_eq!(status, StatusCode::OK);
    let text = std::str::from_utf8(&body).expect("utf-8 body");
    assert!(text.starts_with("event: error\ndata: "));
    assert!(!text.contains("store exploded"));
    assert!(text.ends_with("data: END\n\n"));
}
