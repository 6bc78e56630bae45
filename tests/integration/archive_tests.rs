//! End-to-end archive runs against a mock API and file host

use crate::common::{create_test_config, page};
use docket_archiver::crawler::{ArchiveOptions, Coordinator};
use docket_archiver::storage::{CheckpointStore, JsonManifestStore, StorageError};
use docket_archiver::{ArchiveError, ArchiveStage};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DOCKET: &str = "EPA-HQ-OAR-2021-0317";

pub fn options(output: &Path, resume: bool) -> ArchiveOptions {
    ArchiveOptions {
        docket_id: DOCKET.to_string(),
        output_dir: output.to_path_buf(),
        resume,
    }
}

fn document(id: &str, object_id: &str) -> Value {
    json!({ "id": id, "type": "documents", "attributes": { "objectId": object_id } })
}

fn comment_detail(server: &MockServer, id: &str, doc_id: &str, files: &[&str]) -> Value {
    let mut detail = json!({
        "data": {
            "id": id,
            "type": "comments",
            "attributes": {
                "commentOnDocumentId": doc_id,
                "comment": format!("Comment {}", id),
                "title": format!("Comment on {}", doc_id)
            }
        }
    });
    if !files.is_empty() {
        let attachment_id = format!("{}-A", id);
        let formats: Vec<Value> = files
            .iter()
            .map(|file| json!({ "fileUrl": format!("{}/files/{}/{}", server.uri(), id, file) }))
            .collect();
        detail["data"]["relationships"] =
            json!({ "attachments": { "data": [{ "id": attachment_id, "type": "attachments" }] } });
        detail["included"] = json!([{
            "id": attachment_id,
            "type": "attachments",
            "attributes": { "fileFormats": formats }
        }]);
    }
    detail
}

/// Expected API calls for a full run over the two-document docket
#[derive(Clone, Copy)]
pub struct Calls {
    pub docket: u64,
    pub documents: u64,
    pub listings: u64,
    pub details: [u64; 3],
}

pub const FULL_RUN: Calls = Calls {
    docket: 1,
    documents: 1,
    listings: 1,
    details: [1, 1, 1],
};

/// Two documents; C-1 and C-2 on the first, C-3 on the second.
/// C-1 has a PDF and a DOCX variant, C-3 a spreadsheet.
pub async fn mount_docket(server: &MockServer, calls: Calls) {
    Mock::given(method("GET"))
        .and(path(format!("/dockets/{}", DOCKET)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": DOCKET, "type": "dockets", "attributes": { "title": "Test docket" } }
        })))
        .expect(calls.docket)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/documents"))
        .and(query_param("filter[docketId]", DOCKET))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![document("D-1", "obj1"), document("D-2", "obj2")],
            false,
        )))
        .expect(calls.documents)
        .mount(server)
        .await;

    for (object_id, comments) in [("obj1", vec!["C-1", "C-2"]), ("obj2", vec!["C-3"])] {
        let records = comments
            .iter()
            .map(|id| json!({ "id": id, "type": "comments", "attributes": {} }))
            .collect();
        Mock::given(method("GET"))
            .and(path("/comments"))
            .and(query_param("filter[commentOnId]", object_id))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(records, false)))
            .expect(calls.listings)
            .mount(server)
            .await;
    }

    let details = [
        ("C-1", "D-1", vec!["a.pdf", "a.docx"]),
        ("C-2", "D-1", vec![]),
        ("C-3", "D-2", vec!["data.xlsx"]),
    ];
    for ((id, doc_id, files), expected) in details.into_iter().zip(calls.details) {
        Mock::given(method("GET"))
            .and(path(format!("/comments/{}", id)))
            .and(query_param("include", "attachments"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(comment_detail(server, id, doc_id, &files)),
            )
            .expect(expected)
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path_regex(r"^/files/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"file-bytes".to_vec()))
        .mount(server)
        .await;
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

async fn api_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| request.url.path().to_string())
        .filter(|url_path| !url_path.starts_with("/files/"))
        .collect()
}

#[tokio::test]
async fn test_full_archive_run() {
    let mock_server = MockServer::start().await;
    mount_docket(&mock_server, FULL_RUN).await;
    let output = TempDir::new().unwrap();

    let config = create_test_config(&mock_server.uri());
    let mut coordinator = Coordinator::new(&config, options(output.path(), true)).unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.documents, 2);
    assert_eq!(report.comments, 3);
    assert_eq!(report.attachment_files, 3);
    assert_eq!(report.requests_sent, 7);

    assert_eq!(
        api_paths(&mock_server).await,
        vec![
            format!("/dockets/{}", DOCKET),
            "/documents".to_string(),
            "/comments".to_string(),
            "/comments".to_string(),
            "/comments/C-1".to_string(),
            "/comments/C-2".to_string(),
            "/comments/C-3".to_string(),
        ]
    );

    let root = output.path();
    assert_eq!(read_json(&root.join("docket_details.json"))["id"], DOCKET);
    assert_eq!(
        read_json(&root.join("docket_documents.json"))
            .as_array()
            .unwrap()
            .len(),
        2
    );
    assert!(root.join("D-1_obj1_comments.json").exists());
    assert!(root.join("D-2_obj2_comments.json").exists());
    assert_eq!(
        read_json(&root.join("comments").join("D-1_C-1.json"))["id"],
        "C-1"
    );
    assert!(root.join("comments").join("D-1_C-2.json").exists());
    assert!(root.join("comments").join("D-2_C-3.json").exists());
    assert_eq!(
        fs::read(root.join("comments").join("C-1_attachments").join("a.docx")).unwrap(),
        b"file-bytes"
    );
    assert!(!root.join("comments").join("C-2_attachments").exists());

    assert_eq!(
        read_json(&root.join("comment_attachments.json")),
        json!({
            "C-1": ["C-1_attachments/a.pdf", "C-1_attachments/a.docx"],
            "C-2": [],
            "C-3": ["C-3_attachments/data.xlsx"]
        })
    );

    let manifest = JsonManifestStore::new(root).load().unwrap();
    assert_eq!(manifest.docket_id.as_deref(), Some(DOCKET));
    assert!(manifest.docket_completed);
    assert_eq!(manifest.discovered_comments(), vec!["C-1", "C-2", "C-3"]);
    assert_eq!(manifest.pending_stage(), ArchiveStage::Finalize);
    assert_eq!(coordinator.manifest(), &manifest);
}

#[tokio::test]
async fn test_completed_archive_resumes_without_requests() {
    let first_server = MockServer::start().await;
    mount_docket(&first_server, FULL_RUN).await;
    let output = TempDir::new().unwrap();

    let config = create_test_config(&first_server.uri());
    Coordinator::new(&config, options(output.path(), true))
        .unwrap()
        .run()
        .await
        .unwrap();
    let summary_before = fs::read_to_string(output.path().join("comment_attachments.json")).unwrap();
    let detail_before =
        fs::read_to_string(output.path().join("comments").join("D-1_C-1.json")).unwrap();

    // Nothing is mounted: any request would fail the run
    let empty_server = MockServer::start().await;
    let config = create_test_config(&empty_server.uri());
    let report = Coordinator::new(&config, options(output.path(), true))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.requests_sent, 0);
    assert_eq!(report.comments, 3);
    assert_eq!(report.attachment_files, 3);
    assert!(empty_server.received_requests().await.unwrap().is_empty());
    assert_eq!(
        fs::read_to_string(output.path().join("comment_attachments.json")).unwrap(),
        summary_before
    );
    assert_eq!(
        fs::read_to_string(output.path().join("comments").join("D-1_C-1.json")).unwrap(),
        detail_before
    );
}

#[tokio::test]
async fn test_failed_run_checkpoints_and_resumes() {
    let output = TempDir::new().unwrap();

    // C-2 is rejected, so the run stops after discovery and C-1
    let failing_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/comments/C-2"))
        .respond_with(ResponseTemplate::new(400).set_body_string("{\"errors\":[\"rejected\"]}"))
        .expect(1)
        .mount(&failing_server)
        .await;
    mount_docket(
        &failing_server,
        Calls {
            details: [1, 0, 0],
            ..FULL_RUN
        },
    )
    .await;

    let config = create_test_config(&failing_server.uri());
    let result = Coordinator::new(&config, options(output.path(), true))
        .unwrap()
        .run()
        .await;
    assert!(matches!(result, Err(ArchiveError::BadRequest { .. })));

    let manifest = JsonManifestStore::new(output.path()).load().unwrap();
    assert!(manifest.docket_completed);
    assert_eq!(manifest.documents().map(<[_]>::len), Some(2));
    assert_eq!(manifest.comments_for("obj1").map(<[_]>::len), Some(2));
    assert_eq!(manifest.comments_for("obj2").map(<[_]>::len), Some(1));
    assert_eq!(manifest.attachments_for("C-1").map(<[_]>::len), Some(2));
    assert!(manifest.attachments_for("C-2").is_none());
    assert_eq!(manifest.pending_stage(), ArchiveStage::CommentDetail);
    assert!(!output.path().join("comment_attachments.json").exists());

    // The resumed run only fetches the outstanding comments
    let resume_server = MockServer::start().await;
    mount_docket(
        &resume_server,
        Calls {
            docket: 0,
            documents: 0,
            listings: 0,
            details: [0, 1, 1],
        },
    )
    .await;

    let config = create_test_config(&resume_server.uri());
    let report = Coordinator::new(&config, options(output.path(), true))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.requests_sent, 2);
    assert_eq!(report.attachment_files, 3);
    assert_eq!(
        api_paths(&resume_server).await,
        vec!["/comments/C-2".to_string(), "/comments/C-3".to_string()]
    );
}

#[tokio::test]
async fn test_no_resume_fetches_everything_again() {
    let output = TempDir::new().unwrap();

    let first_server = MockServer::start().await;
    mount_docket(&first_server, FULL_RUN).await;
    let config = create_test_config(&first_server.uri());
    Coordinator::new(&config, options(output.path(), true))
        .unwrap()
        .run()
        .await
        .unwrap();

    let second_server = MockServer::start().await;
    mount_docket(&second_server, FULL_RUN).await;
    let config = create_test_config(&second_server.uri());
    let report = Coordinator::new(&config, options(output.path(), false))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.requests_sent, 7);
}

#[tokio::test]
async fn test_manifest_of_another_docket_is_refused() {
    let output = TempDir::new().unwrap();
    let store = JsonManifestStore::new(output.path());
    let mut manifest = store.load().unwrap();
    manifest.bind_docket("OTHER-DOCKET").unwrap();
    store.save(&manifest).unwrap();
    let saved = fs::read_to_string(store.path()).unwrap();

    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());
    let result = Coordinator::new(&config, options(output.path(), true))
        .unwrap()
        .run()
        .await;

    assert!(matches!(
        result,
        Err(ArchiveError::Storage(StorageError::DocketMismatch { .. }))
    ));
    assert_eq!(fs::read_to_string(store.path()).unwrap(), saved);
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_run_sends_nothing_and_checkpoints() {
    let mock_server = MockServer::start().await;
    mount_docket(
        &mock_server,
        Calls {
            docket: 0,
            documents: 0,
            listings: 0,
            details: [0, 0, 0],
        },
    )
    .await;
    let output = TempDir::new().unwrap();

    let config = create_test_config(&mock_server.uri());
    let mut coordinator = Coordinator::new(&config, options(output.path(), true)).unwrap();
    coordinator.cancellation().cancel();

    let result = coordinator.run().await;

    assert!(matches!(result, Err(ArchiveError::Cancelled)));
    assert!(mock_server.received_requests().await.unwrap().is_empty());

    let manifest = JsonManifestStore::new(output.path()).load().unwrap();
    assert_eq!(manifest.docket_id.as_deref(), Some(DOCKET));
    assert_eq!(manifest.pending_stage(), ArchiveStage::DocketDetails);
}

/// Two documents whose comment listings both carry C-1
async fn mount_shared_comment(server: &MockServer, detail_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/dockets/{}", DOCKET)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": DOCKET } })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![document("D-1", "obj1"), document("D-2", "obj2")],
            false,
        )))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![json!({ "id": "C-1", "type": "comments", "attributes": {} })],
            false,
        )))
        .expect(2)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/comments/C-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(comment_detail(server, "C-1", "D-1", &[])),
        )
        .expect(detail_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_shared_comment_refetched_only_without_resume() {
    let fresh_server = MockServer::start().await;
    mount_shared_comment(&fresh_server, 2).await;
    let fresh_output = TempDir::new().unwrap();
    let config = create_test_config(&fresh_server.uri());
    let report = Coordinator::new(&config, options(fresh_output.path(), false))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(report.requests_sent, 6);

    let resume_server = MockServer::start().await;
    mount_shared_comment(&resume_server, 1).await;
    let resume_output = TempDir::new().unwrap();
    let config = create_test_config(&resume_server.uri());
    let report = Coordinator::new(&config, options(resume_output.path(), true))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(report.requests_sent, 5);
}
