use httpmock::prelude::*;
use site_sync::adapters::sheets::{SheetsApiSource, StaticToken};
use site_sync::core::content::{split_photo_bands, ContentAggregator};
use site_sync::domain::ports::ContentSource;
use site_sync::SiteError;
use std::time::Duration;

fn source(server: &MockServer) -> SheetsApiSource {
    SheetsApiSource::new(
        &server.base_url(),
        "sheet-1",
        Box::new(StaticToken("test-token".to_string())),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn metadata() -> serde_json::Value {
    serde_json::json!({
        "sheets": [
            {"properties": {"title": "Recordings", "index": 2}},
            {"properties": {"title": "About", "index": 0}},
            {"properties": {"title": "Photos", "index": 1}}
        ]
    })
}

#[tokio::test]
async fn test_worksheets_are_resolved_by_position() {
    let server = MockServer::start();

    let meta_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v4/spreadsheets/sheet-1")
            .header("authorization", "Bearer test-token");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(metadata());
    });

    let about_mock = server.mock(|when, then| {
        when.method(GET)
            .path_contains("/v4/spreadsheets/sheet-1/values/")
            .path_contains("About")
            .query_param("majorDimension", "ROWS");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({
                "range": "About!A1:A1",
                "values": [["Bio text"]]
            }));
    });

    let recordings_mock = server.mock(|when, then| {
        when.method(GET).path_contains("Recordings");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({
                "values": [["A", 2020], ["B"]]
            }));
    });

    let source = source(&server);
    let about = ContentAggregator::new(&source).about_text().await.unwrap();
    assert_eq!(about, "Bio text");

    // 列尾空白儲存格被 API 省略，回傳前補齊
    let recordings = source.worksheet(2).await.unwrap();
    assert_eq!(recordings, vec![vec!["A", "2020"], vec!["B", ""]]);

    // 工作表標題只查詢一次
    meta_mock.assert_hits(1);
    about_mock.assert();
    recordings_mock.assert();
}

#[tokio::test]
async fn test_missing_worksheet_position_is_unavailable() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v4/spreadsheets/sheet-1");
        then.status(200).json_body(metadata());
    });

    let err = source(&server).worksheet(4).await.unwrap_err();
    match err {
        SiteError::ContentSourceUnavailable { worksheet, message } => {
            assert_eq!(worksheet, 4);
            assert!(message.contains("3 worksheets"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_http_errors_become_unavailable_content() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v4/spreadsheets/sheet-1");
        then.status(403);
    });

    let err = source(&server).worksheet(0).await.unwrap_err();
    assert!(matches!(
        err,
        SiteError::ContentSourceUnavailable { worksheet: 0, .. }
    ));
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn test_empty_about_sheet_is_reported_as_empty() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v4/spreadsheets/sheet-1");
        then.status(200).json_body(metadata());
    });
    server.mock(|when, then| {
        when.method(GET).path_contains("About");
        then.status(200).json_body(serde_json::json!({"range": "About!A1:Z1000"}));
    });

    let source = source(&server);
    let err = ContentAggregator::new(&source).about_text().await.unwrap_err();
    assert_eq!(err.exit_code(), 4);
}

#[tokio::test]
async fn test_slow_backend_times_out_as_unavailable() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v4/spreadsheets/sheet-1");
        then.status(200)
            .json_body(metadata())
            .delay(Duration::from_secs(3));
    });

    let source = SheetsApiSource::new(
        &server.base_url(),
        "sheet-1",
        Box::new(StaticToken("test-token".to_string())),
        Duration::from_secs(1),
    )
    .unwrap();

    let err = source.worksheet(0).await.unwrap_err();
    match &err {
        SiteError::ContentSourceUnavailable { worksheet, message } => {
            assert_eq!(*worksheet, 0);
            assert!(message.contains("timed out"), "message: {}", message);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn test_spreadsheet_is_found_by_title() {
    let server = MockServer::start();

    let drive_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/drive/v3/files")
            .query_param_exists("q")
            .header("authorization", "Bearer test-token");
        then.status(200).json_body(serde_json::json!({
            "files": [{"id": "sheet-1", "name": "Website Content"}]
        }));
    });
    let meta_mock = server.mock(|when, then| {
        when.method(GET).path("/v4/spreadsheets/sheet-1");
        then.status(200).json_body(metadata());
    });
    server.mock(|when, then| {
        when.method(GET).path_contains("Photos");
        then.status(200).json_body(serde_json::json!({
            "values": [["a.jpg", "A"], ["--"], ["b.jpg"], ["--"], ["--"]]
        }));
    });

    let source = SheetsApiSource::by_title(
        &server.base_url(),
        &server.base_url(),
        "Website Content",
        Box::new(StaticToken("test-token".to_string())),
        Duration::from_secs(5),
    )
    .unwrap();

    let rows = source.worksheet(1).await.unwrap();
    let bands = split_photo_bands(&rows).unwrap();
    assert_eq!(bands[0], vec![vec!["a.jpg", "A"]]);
    assert_eq!(bands[1], vec![vec!["b.jpg", ""]]);

    // About 的值沒有 mock，但 id 與工作表標題都已快取
    assert!(source.worksheet(0).await.is_err());
    drive_mock.assert_hits(1);
    meta_mock.assert_hits(1);
}

#[tokio::test]
async fn test_unknown_title_is_unavailable() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/drive/v3/files");
        then.status(200).json_body(serde_json::json!({"files": []}));
    });

    let source = SheetsApiSource::by_title(
        &server.base_url(),
        &server.base_url(),
        "Website Content",
        Box::new(StaticToken("test-token".to_string())),
        Duration::from_secs(5),
    )
    .unwrap();

    let err = source.worksheet(0).await.unwrap_err();
    match err {
        SiteError::ContentSourceUnavailable { message, .. } => {
            assert!(message.contains("Website Content"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
