//! Result-set draining against a mock API

use crate::common::{
    comment_record, create_small_window_config, create_test_config, page, record, NoQueryParam,
};
use docket_archiver::crawler::{Fetcher, Paginator};
use docket_archiver::Config;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GE: &str = "filter[lastModifiedDate][ge]";

fn setup(config: &Config) -> (Fetcher, Paginator) {
    (
        Fetcher::from_config(config).unwrap(),
        Paginator::new(&config.pagination),
    )
}

fn ids(records: &[serde_json::Value]) -> Vec<&str> {
    records.iter().map(|r| r["id"].as_str().unwrap()).collect()
}

#[tokio::test]
async fn test_drain_all_walks_every_page() {
    let mock_server = MockServer::start().await;

    let pages = [
        page(vec![record("D-1"), record("D-2")], true),
        page(vec![record("D-3"), record("D-2")], true),
        page(vec![record("D-4")], false),
    ];
    for (index, body) in pages.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path("/documents"))
            .and(query_param("filter[docketId]", "DOCKET-1"))
            .and(query_param("page[number]", (index + 1).to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let config = create_test_config(&mock_server.uri());
    let (mut fetcher, paginator) = setup(&config);
    let params = vec![
        ("filter[docketId]".to_string(), "DOCKET-1".to_string()),
        ("page[size]".to_string(), "250".to_string()),
    ];

    let records = paginator
        .drain_all(&mut fetcher, &format!("{}/documents", mock_server.uri()), &params)
        .await
        .unwrap();

    assert_eq!(ids(&records), vec!["D-1", "D-2", "D-3", "D-4"]);
    assert_eq!(fetcher.requests_sent(), 3);
}

#[tokio::test]
async fn test_drain_all_with_no_results() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], false)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let (mut fetcher, paginator) = setup(&config);

    let records = paginator
        .drain_all(&mut fetcher, &format!("{}/documents", mock_server.uri()), &[])
        .await
        .unwrap();

    assert!(records.is_empty());
}

#[tokio::test]
async fn test_drain_all_stops_without_meta() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "id": "D-1" }] })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let (mut fetcher, paginator) = setup(&config);

    let records = paginator
        .drain_all(&mut fetcher, &format!("{}/documents", mock_server.uri()), &[])
        .await
        .unwrap();

    assert_eq!(ids(&records), vec!["D-1"]);
}

#[tokio::test]
async fn test_short_comment_listing_skips_cursor_mode() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/comments"))
        .and(query_param("filter[commentOnId]", "obj1"))
        .and(query_param("sort", "lastModifiedDate,documentId"))
        .and(query_param("page[size]", "2"))
        .and(NoQueryParam(GE))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![comment_record("C-1", "2021-01-01T00:00:00Z")],
            false,
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_small_window_config(&mock_server.uri(), 2, 2);
    let (mut fetcher, paginator) = setup(&config);

    let records = paginator
        .drain_comments(&mut fetcher, &format!("{}/comments", mock_server.uri()), "obj1")
        .await
        .unwrap();

    assert_eq!(ids(&records), vec!["C-1"]);
}

#[tokio::test]
async fn test_full_window_continues_by_cursor() {
    let mock_server = MockServer::start().await;

    // First batch fills the 4-item window
    Mock::given(method("GET"))
        .and(path("/comments"))
        .and(query_param("page[number]", "1"))
        .and(NoQueryParam(GE))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![
                comment_record("C-1", "2021-01-01T00:00:00Z"),
                comment_record("C-2", "2021-01-02T00:00:00Z"),
            ],
            true,
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/comments"))
        .and(query_param("page[number]", "2"))
        .and(NoQueryParam(GE))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![
                comment_record("C-3", "2021-01-03T00:00:00Z"),
                comment_record("C-4", "2021-01-04T12:30:00Z"),
            ],
            false,
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    // The cursor batch repeats the pivot record
    Mock::given(method("GET"))
        .and(path("/comments"))
        .and(query_param("page[number]", "1"))
        .and(query_param(GE, "2021-01-04 12:30:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![
                comment_record("C-4", "2021-01-04T12:30:00Z"),
                comment_record("C-5", "2021-01-05T00:00:00Z"),
            ],
            false,
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_small_window_config(&mock_server.uri(), 2, 2);
    let (mut fetcher, paginator) = setup(&config);

    let records = paginator
        .drain_comments(&mut fetcher, &format!("{}/comments", mock_server.uri()), "obj1")
        .await
        .unwrap();

    assert_eq!(ids(&records), vec!["C-1", "C-2", "C-3", "C-4", "C-5"]);
    assert_eq!(fetcher.requests_sent(), 3);
}

#[tokio::test]
async fn test_cursor_advances_across_batches() {
    let mock_server = MockServer::start().await;

    // Window of 2: one record per page, two pages per batch
    let batches = [
        (None, vec![("C-1", "2021-01-01T00:00:00Z"), ("C-2", "2021-01-02T00:00:00Z")]),
        (
            Some("2021-01-02 00:00:00"),
            vec![("C-2", "2021-01-02T00:00:00Z"), ("C-3", "2021-01-03T00:00:00Z")],
        ),
        (Some("2021-01-03 00:00:00"), vec![("C-3", "2021-01-03T00:00:00Z")]),
    ];
    for (cursor, records) in batches {
        let count = records.len();
        for (index, (id, modified)) in records.into_iter().enumerate() {
            let has_next = index + 1 < count;
            let mock = Mock::given(method("GET"))
                .and(path("/comments"))
                .and(query_param("page[number]", (index + 1).to_string()));
            let mock = match cursor {
                Some(cursor) => mock.and(query_param(GE, cursor)),
                None => mock.and(NoQueryParam(GE)),
            };
            mock.respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page(vec![comment_record(id, modified)], has_next)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
        }
    }

    let config = create_small_window_config(&mock_server.uri(), 1, 2);
    let (mut fetcher, paginator) = setup(&config);

    let records = paginator
        .drain_comments(&mut fetcher, &format!("{}/comments", mock_server.uri()), "obj1")
        .await
        .unwrap();

    assert_eq!(ids(&records), vec!["C-1", "C-2", "C-3"]);
    assert_eq!(fetcher.requests_sent(), 5);
}

#[tokio::test]
async fn test_cursor_stalls_on_shared_timestamp() {
    let mock_server = MockServer::start().await;

    let same = "2021-06-01T08:00:00Z";
    let first_page = page(vec![comment_record("C-1", same), comment_record("C-2", same)], true);
    let second_page = page(vec![comment_record("C-3", same), comment_record("C-4", same)], false);

    for (number, body) in [("1", &first_page), ("2", &second_page)] {
        Mock::given(method("GET"))
            .and(path("/comments"))
            .and(query_param("page[number]", number))
            .and(NoQueryParam(GE))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    // Every cursor batch returns the same full window
    for (number, body) in [("1", &first_page), ("2", &second_page)] {
        Mock::given(method("GET"))
            .and(path("/comments"))
            .and(query_param("page[number]", number))
            .and(query_param(GE, "2021-06-01 08:00:00"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let config = create_small_window_config(&mock_server.uri(), 2, 2);
    let (mut fetcher, paginator) = setup(&config);

    let records = paginator
        .drain_comments(&mut fetcher, &format!("{}/comments", mock_server.uri()), "obj1")
        .await
        .unwrap();

    assert_eq!(ids(&records), vec!["C-1", "C-2", "C-3", "C-4"]);
    assert_eq!(fetcher.requests_sent(), 4);
}
