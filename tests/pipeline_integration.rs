//! End-to-end pipeline tests: album page, photo list, photos on disk.

mod support;

use std::sync::Arc;
use std::time::Duration;

use album_downloader::download::{DownloaderPhase, HttpClient};
use album_downloader::pipeline::{AlbumPipeline, PipelineError};
use album_downloader::surface::{NullPromptSink, PromptChoice, PromptSink};
use album_downloader::ParseError;
use support::sinks::{RecordingStatus, ScriptedPrompt};
use support::socket_guard::start_mock_server_or_skip;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pipeline(prompt: Arc<dyn PromptSink>) -> AlbumPipeline {
    let client = HttpClient::with_timeouts(5, 30).unwrap();
    AlbumPipeline::new(client, RecordingStatus::new(), prompt)
}

fn album_page(server: &MockServer, files: &[&str]) -> String {
    let records: Vec<String> = files
        .iter()
        .map(|file| format!("{{ photoID: \"x\", fileName: \"{file}\" }}"))
        .collect();
    format!(
        "<html><script>\nvar storage = \"{}/photos\";\nvar photos = [{}];\n</script></html>",
        server.uri(),
        records.join(",\n")
    )
}

async fn mount_page(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/album/1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8"))
        .mount(server)
        .await;
}

async fn mount_photo(server: &MockServer, name: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/photos/{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_pipeline_downloads_every_photo_of_the_album() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_page(&server, album_page(&server, &["IMG_0001.jpg", "IMG_0002.jpg"])).await;
    mount_photo(&server, "IMG_0001.jpg", b"one").await;
    mount_photo(&server, "IMG_0002.jpg", b"two").await;
    let dir = TempDir::new().unwrap();

    let pipeline = pipeline(Arc::new(NullPromptSink));
    let url = format!("{}/album/1", server.uri());
    let report = pipeline.run(&url, dir.path()).await.unwrap();

    assert_eq!(report.page_url, url);
    assert_eq!(report.assets_found, 2);
    assert_eq!(report.download.completed.len(), 2);
    assert!(!report.aborted);
    assert_eq!(std::fs::read(dir.path().join("IMG_0001.jpg")).unwrap(), b"one");
    assert_eq!(std::fs::read(dir.path().join("IMG_0002.jpg")).unwrap(), b"two");
}

#[tokio::test]
async fn test_pipeline_empty_album_is_success() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_page(&server, album_page(&server, &[])).await;
    let dir = TempDir::new().unwrap();

    let pipeline = pipeline(Arc::new(NullPromptSink));
    let report = pipeline
        .run(&format!("{}/album/1", server.uri()), dir.path())
        .await
        .unwrap();

    assert_eq!(report.assets_found, 0);
    assert!(report.download.completed.is_empty());
    assert!(!report.aborted);
}

#[tokio::test]
async fn test_pipeline_tolerates_parse_error_by_default() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_page(&server, "<html>private album</html>".to_string()).await;
    let dir = TempDir::new().unwrap();

    let prompt = ScriptedPrompt::new(Vec::<PromptChoice>::new());
    let pipeline = pipeline(prompt.clone());
    let report = pipeline
        .run(&format!("{}/album/1", server.uri()), dir.path())
        .await
        .unwrap();

    assert_eq!(report.assets_found, 0);
    let messages = prompt.messages();
    assert_eq!(messages.len(), 1, "parse error is reported once");
    assert!(messages[0].contains("storage"), "{}", messages[0]);
}

#[tokio::test]
async fn test_pipeline_strict_mode_fails_on_parse_error() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let page = format!("<html>var storage = \"{}/photos\";</html>", server.uri());
    mount_page(&server, page).await;
    let dir = TempDir::new().unwrap();

    let pipeline = pipeline(Arc::new(NullPromptSink)).tolerate_parse_errors(false);
    let result = pipeline
        .run(&format!("{}/album/1", server.uri()), dir.path())
        .await;

    assert!(matches!(
        result,
        Err(PipelineError::Parse(ParseError::AssetListNotFound))
    ));
}

#[tokio::test]
async fn test_extract_only_lists_photos_without_downloading() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_page(&server, album_page(&server, &["a.jpg", "b.jpg"])).await;
    Mock::given(method("GET"))
        .and(path("/photos/a.jpg"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = pipeline(Arc::new(NullPromptSink));
    let assets = pipeline
        .extract_only(&format!("{}/album/1", server.uri()))
        .await
        .unwrap()
        .unwrap();

    let urls: Vec<_> = assets.iter().map(|a| a.source_url().to_string()).collect();
    assert_eq!(
        urls,
        [
            format!("{}/photos/a.jpg", server.uri()),
            format!("{}/photos/b.jpg", server.uri()),
        ]
    );
}

#[tokio::test]
async fn test_pipeline_abort_during_download_reports_aborted() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_page(&server, album_page(&server, &["a.jpg", "b.jpg"])).await;
    Mock::given(method("GET"))
        .and(path("/photos/a.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"slow".to_vec())
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();

    let pipeline = Arc::new(pipeline(Arc::new(NullPromptSink)));
    let mut snapshots = pipeline.downloader().subscribe();
    let url = format!("{}/album/1", server.uri());
    let run = {
        let pipeline = Arc::clone(&pipeline);
        let dir = dir.path().to_path_buf();
        tokio::spawn(async move { pipeline.run(&url, &dir).await })
    };

    snapshots
        .wait_for(|s| s.phase == DownloaderPhase::RequestSent)
        .await
        .unwrap();
    pipeline.abort();

    let report = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("pipeline should stop promptly")
        .unwrap()
        .unwrap();
    assert!(report.aborted);
    assert_eq!(report.assets_found, 2);
    assert!(report.download.completed.is_empty());
}

#[tokio::test]
async fn test_pipeline_second_run_while_busy_is_refused() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/album/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();

    let pipeline = Arc::new(pipeline(Arc::new(NullPromptSink)));
    let mut phases = pipeline.fetcher().subscribe();
    let url = format!("{}/album/1", server.uri());
    let first = {
        let pipeline = Arc::clone(&pipeline);
        let url = url.clone();
        let dir = dir.path().to_path_buf();
        tokio::spawn(async move { pipeline.run(&url, &dir).await })
    };

    phases
        .wait_for(|phase| *phase != album_downloader::FetchPhase::Idle)
        .await
        .unwrap();
    let second = pipeline.run(&url, dir.path()).await;
    assert!(matches!(second, Err(PipelineError::Busy(_))));

    pipeline.abort();
    let report = first.await.unwrap().unwrap();
    assert!(report.aborted);
    assert_eq!(report.assets_found, 0);
}
