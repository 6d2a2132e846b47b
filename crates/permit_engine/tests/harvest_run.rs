use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use permit_core::{DocumentKind, FailedStep, ManifestEntry, ObjectLocators, RunPlan};
use permit_engine::{
    FailureKind, FetchSettings, HarvestConfig, HarvestError, Harvester, ProgressSink,
    PublishError, Publisher, ReqwestFetcher, RunEvent, UploadRequest,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FIXED_TIME: &str = "2026-03-02T15:04:05+00:00";

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(harvest_logging::initialize_for_tests);
}

#[derive(Debug, Clone, PartialEq)]
struct Put {
    key: String,
    content_type: String,
    metadata: Vec<(String, String)>,
}

#[derive(Clone, Copy)]
enum Failing {
    Never,
    Everything,
    ManifestOnly,
}

#[derive(Clone)]
struct FakePublisher {
    puts: Arc<Mutex<Vec<Put>>>,
    failing: Failing,
}

impl FakePublisher {
    fn new(failing: Failing) -> Self {
        Self {
            puts: Arc::new(Mutex::new(Vec::new())),
            failing,
        }
    }

    fn keys(&self) -> Vec<String> {
        self.puts.lock().unwrap().iter().map(|p| p.key.clone()).collect()
    }
}

#[async_trait::async_trait]
impl Publisher for FakePublisher {
    async fn put_file(&self, request: &UploadRequest<'_>) -> Result<ObjectLocators, PublishError> {
        assert!(request.local_path.exists(), "uploading a missing file");
        self.puts.lock().unwrap().push(Put {
            key: request.key.to_string(),
            content_type: request.content_type.to_string(),
            metadata: request.metadata.clone(),
        });
        let fail = match self.failing {
            Failing::Never => false,
            Failing::Everything => true,
            Failing::ManifestOnly => request.key.ends_with("manifest.json"),
        };
        if fail {
            return Err(PublishError::MissingCredentials);
        }
        Ok(ObjectLocators::for_key("test-bucket", "us-east-2", request.key))
    }
}

#[derive(Default)]
struct RecordingSink(Mutex<Vec<RunEvent>>);

impl RecordingSink {
    fn events(&self) -> Vec<RunEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: RunEvent) {
        self.0.lock().unwrap().push(event);
    }
}

fn config(server: &MockServer, dir: &Path) -> HarvestConfig {
    let plan = RunPlan {
        listing_url: format!("{}/forms/", server.uri()),
        prefix: "example-oh/permits/".to_string(),
        jurisdiction: "example-oh".to_string(),
        kind: DocumentKind::default(),
    };
    HarvestConfig::new(plan, dir.to_path_buf()).with_clock(Arc::new(|| FIXED_TIME.to_string()))
}

async fn serve_listing(server: &MockServer, html: &str) {
    Mock::given(method("GET"))
        .and(path("/forms/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html.to_string(), "text/html"))
        .mount(server)
        .await;
}

async fn serve_document(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/pdf"))
        .mount(server)
        .await;
}

const TWO_FORMS: &str = r#"
    <ul>
      <li><a href="/docs/fence.pdf">Fence Permit</a></li>
      <li><a href="/docs/fence.pdf">Fence Permit</a></li>
      <li><a href="/docs/deck.pdf">Deck & Porch Permit</a></li>
      <li><a href="/about.html">About</a></li>
    </ul>"#;

#[tokio::test]
async fn full_run_archives_every_document() {
    init_logging();
    let server = MockServer::start().await;
    serve_listing(&server, TWO_FORMS).await;
    serve_document(&server, "/docs/fence.pdf", vec![1u8; 1024 * 1024]).await;
    serve_document(&server, "/docs/deck.pdf", vec![2u8; 300]).await;

    let temp = TempDir::new().unwrap();
    let publisher = FakePublisher::new(Failing::Never);
    let harvester = Harvester::new(
        config(&server, temp.path()),
        ReqwestFetcher::default(),
        publisher.clone(),
    );
    let sink = RecordingSink::default();

    let report = harvester.run(&sink).await.expect("run ok");

    assert_eq!(report.summary.found, 2);
    assert_eq!(report.summary.downloaded, 2);
    assert_eq!(report.summary.uploaded, 2);
    assert_eq!(report.summary.total_bytes, 1024 * 1024 + 300);
    assert_eq!(report.summary.total_mb, 1.0);
    assert!(report.summary.failures.is_empty());
    assert_eq!(
        report.summary.titles,
        vec!["Fence Permit".to_string(), "Deck & Porch Permit".to_string()]
    );

    assert_eq!(
        publisher.keys(),
        vec![
            "example-oh/permits/fence-permit.pdf".to_string(),
            "example-oh/permits/deck-porch-permit.pdf".to_string(),
            "example-oh/permits/manifest.json".to_string(),
        ]
    );
    let puts = publisher.puts.lock().unwrap().clone();
    assert_eq!(puts[0].content_type, "application/pdf");
    assert_eq!(
        puts[0].metadata,
        vec![
            ("uploaded-date".to_string(), FIXED_TIME.to_string()),
            ("jurisdiction".to_string(), "example-oh".to_string()),
            ("document-type".to_string(), "permit-form".to_string()),
        ]
    );
    assert_eq!(puts[2].content_type, "application/json");
    assert!(puts[2].metadata.is_empty());

    let fence = temp.path().join("fence-permit.pdf");
    assert_eq!(fs::metadata(&fence).unwrap().len(), 1024 * 1024);
    assert!(temp.path().join("deck-porch-permit.pdf").exists());

    let manifest_path = report.manifest_path.clone().expect("manifest written");
    assert_eq!(manifest_path, temp.path().join("manifest.json"));
    let on_disk: Vec<ManifestEntry> =
        serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
    assert_eq!(on_disk.as_slice(), report.manifest.entries());
    assert_eq!(on_disk[0].filename, "fence-permit.pdf");
    assert_eq!(on_disk[0].original_filename, "fence.pdf");
    assert_eq!(on_disk[0].original_url, format!("{}/docs/fence.pdf", server.uri()));
    assert_eq!(on_disk[0].local_path, fence.display().to_string());
    assert_eq!(on_disk[0].downloaded_at, FIXED_TIME);
    assert_eq!(on_disk[1].file_size_mb, 0.0);
    assert_eq!(
        report.manifest_locators.map(|l| l.s3_url),
        Some("s3://test-bucket/example-oh/permits/manifest.json".to_string())
    );
    assert_eq!(report.manifest_error, None);

    let events = sink.events();
    assert!(matches!(events.first(), Some(RunEvent::ListingRequested { .. })));
    assert!(events.contains(&RunEvent::ListingParsed {
        found: 2,
        duplicates: 1
    }));
    assert_eq!(events.last(), Some(&RunEvent::Finished));
}

#[tokio::test]
async fn missing_document_is_skipped() {
    init_logging();
    let server = MockServer::start().await;
    serve_listing(
        &server,
        r#"<a href="/docs/a.pdf">Form A</a>
           <a href="/docs/gone.pdf">Form B</a>
           <a href="/docs/c.pdf">Form C</a>"#,
    )
    .await;
    serve_document(&server, "/docs/a.pdf", b"a".to_vec()).await;
    serve_document(&server, "/docs/c.pdf", b"c".to_vec()).await;
    Mock::given(method("GET"))
        .and(path("/docs/gone.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let publisher = FakePublisher::new(Failing::Never);
    let harvester = Harvester::new(
        config(&server, temp.path()),
        ReqwestFetcher::default(),
        publisher.clone(),
    );
    let sink = RecordingSink::default();

    let report = harvester.run(&sink).await.expect("run ok");

    assert_eq!(report.summary.found, 3);
    assert_eq!(report.summary.downloaded, 2);
    assert_eq!(report.summary.uploaded, 2);
    let filenames: Vec<_> = report
        .manifest
        .entries()
        .iter()
        .map(|e| e.filename.as_str())
        .collect();
    assert_eq!(filenames, vec!["form-a.pdf", "form-c.pdf"]);
    assert_eq!(report.summary.failures.len(), 1);
    assert_eq!(report.summary.failures[0].title, "Form B");
    assert_eq!(report.summary.failures[0].step, FailedStep::Download);
    assert!(!temp.path().join("form-b.pdf").exists());
    assert!(!publisher.keys().iter().any(|k| k.contains("form-b")));
    assert!(sink.events().iter().any(|e| matches!(
        e,
        RunEvent::DocumentFailed {
            index: 1,
            step: FailedStep::Download,
            ..
        }
    )));
}

#[tokio::test]
async fn upload_failure_keeps_local_copy_without_entry() {
    init_logging();
    let server = MockServer::start().await;
    serve_listing(&server, r#"<a href="/docs/fence.pdf">Fence Permit</a>"#).await;
    serve_document(&server, "/docs/fence.pdf", b"%PDF".to_vec()).await;

    let temp = TempDir::new().unwrap();
    let harvester = Harvester::new(
        config(&server, temp.path()),
        ReqwestFetcher::default(),
        FakePublisher::new(Failing::Everything),
    );

    let report = harvester.run(&RecordingSink::default()).await.expect("run ok");

    assert_eq!(report.summary.found, 1);
    assert_eq!(report.summary.downloaded, 1);
    assert_eq!(report.summary.uploaded, 0);
    assert!(report.manifest.is_empty());
    assert_eq!(report.summary.failures[0].step, FailedStep::Upload);
    assert_eq!(report.summary.failures[0].reason, "missing storage credentials");
    assert_eq!(fs::read(temp.path().join("fence-permit.pdf")).unwrap(), b"%PDF");

    let manifest_path = report.manifest_path.expect("manifest still written locally");
    assert_eq!(fs::read_to_string(manifest_path).unwrap(), "[]");
    assert!(report.manifest_locators.is_none());
    assert!(report.manifest_error.is_some());
}

#[tokio::test]
async fn listing_timeout_stops_the_run() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forms/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(300))
                .set_body_raw("<a href=\"/docs/a.pdf\">A</a>", "text/html"),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let listing = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::listing()
    };
    let publisher = FakePublisher::new(Failing::Never);
    let harvester = Harvester::new(
        config(&server, temp.path()),
        ReqwestFetcher::new(listing, FetchSettings::documents()),
        publisher.clone(),
    );
    let sink = RecordingSink::default();

    let err = harvester.run(&sink).await.unwrap_err();
    match err {
        HarvestError::Listing(fetch) => assert_eq!(fetch.kind, FailureKind::Timeout),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(publisher.keys().is_empty());
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    assert!(matches!(sink.events().last(), Some(RunEvent::Aborted { .. })));
}

#[tokio::test]
async fn listing_without_documents_is_an_error() {
    init_logging();
    let server = MockServer::start().await;
    serve_listing(&server, r#"<p>Forms are temporarily unavailable.</p>"#).await;

    let temp = TempDir::new().unwrap();
    let publisher = FakePublisher::new(Failing::Never);
    let harvester = Harvester::new(
        config(&server, temp.path()),
        ReqwestFetcher::default(),
        publisher.clone(),
    );

    let err = harvester.run(&RecordingSink::default()).await.unwrap_err();
    assert!(matches!(err, HarvestError::NoDocuments(ref url) if url.ends_with("/forms/")));
    assert!(publisher.keys().is_empty());
    assert!(!temp.path().join("manifest.json").exists());
}

#[tokio::test]
async fn rerun_produces_the_same_manifest() {
    init_logging();
    let server = MockServer::start().await;
    serve_listing(&server, TWO_FORMS).await;
    serve_document(&server, "/docs/fence.pdf", b"fence".to_vec()).await;
    serve_document(&server, "/docs/deck.pdf", b"deck".to_vec()).await;

    let temp = TempDir::new().unwrap();
    let publisher = FakePublisher::new(Failing::Never);
    let harvester = Harvester::new(
        config(&server, temp.path()),
        ReqwestFetcher::default(),
        publisher.clone(),
    );

    let first = harvester.run(&RecordingSink::default()).await.unwrap();
    let second = harvester.run(&RecordingSink::default()).await.unwrap();

    assert_eq!(first.manifest, second.manifest);
    assert_eq!(first.manifest_locators, second.manifest_locators);
    let keys = publisher.keys();
    assert_eq!(keys.len(), 6);
    assert_eq!(keys[..3], keys[3..]);
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 3);
}

#[tokio::test]
async fn manifest_upload_failure_is_not_fatal() {
    init_logging();
    let server = MockServer::start().await;
    serve_listing(&server, TWO_FORMS).await;
    serve_document(&server, "/docs/fence.pdf", b"fence".to_vec()).await;
    serve_document(&server, "/docs/deck.pdf", b"deck".to_vec()).await;

    let temp = TempDir::new().unwrap();
    let harvester = Harvester::new(
        config(&server, temp.path()),
        ReqwestFetcher::default(),
        FakePublisher::new(Failing::ManifestOnly),
    );
    let sink = RecordingSink::default();

    let report = harvester.run(&sink).await.expect("run ok");
    assert_eq!(report.summary.uploaded, 2);
    assert_eq!(report.manifest.len(), 2);
    assert!(report.manifest_path.is_some());
    assert!(report.manifest_locators.is_none());
    assert!(report
        .manifest_error
        .as_deref()
        .is_some_and(|e| e.contains("missing storage credentials")));
    assert_eq!(sink.events().last(), Some(&RunEvent::Finished));
}

#[tokio::test]
async fn unusable_download_dir_is_fatal() {
    init_logging();
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("permits");
    fs::write(&blocker, "not a directory").unwrap();

    let harvester = Harvester::new(
        config(&server, &blocker),
        ReqwestFetcher::default(),
        FakePublisher::new(Failing::Never),
    );

    let err = harvester.run(&RecordingSink::default()).await.unwrap_err();
    assert!(matches!(err, HarvestError::OutputDir(_)));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
