use compactor_engine::{CodecRuntime, CodecSettings, FfmpegLoader};
use sha2::{Digest, Sha256};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BUNDLE: &[u8] = b"exit 3\n";

fn settings_for(server: &MockServer, cache: &tempfile::TempDir) -> CodecSettings {
    CodecSettings {
        cache_dir: cache.path().to_path_buf(),
        bundle_url: Some(format!("{}/ffmpeg", server.uri())),
        search_path: false,
        ..CodecSettings::default()
    }
}

#[tokio::test]
async fn bundle_is_fetched_once_for_concurrent_users() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ffmpeg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BUNDLE))
        .expect(1)
        .mount(&server)
        .await;
    let cache = tempfile::tempdir().unwrap();
    let mut settings = settings_for(&server, &cache);
    settings.bundle_sha256 = Some(hex(&Sha256::digest(BUNDLE)));
    let runtime = CodecRuntime::new(Box::new(FfmpegLoader::new(settings)));

    let (first, second) = tokio::join!(runtime.transcoder(), runtime.transcoder());

    // The payload is not a real ffmpeg, so the probe rejects it after download.
    assert!(first.is_err());
    assert!(second.is_err());
    assert!(runtime.transcoder().await.is_err());
    let cached = std::fs::read_dir(cache.path()).unwrap().count();
    assert_eq!(cached, 1);
}

#[tokio::test]
async fn checksum_mismatch_makes_codec_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ffmpeg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BUNDLE))
        .mount(&server)
        .await;
    let cache = tempfile::tempdir().unwrap();
    let mut settings = settings_for(&server, &cache);
    settings.bundle_sha256 = Some("00".repeat(32));
    let runtime = CodecRuntime::new(Box::new(FfmpegLoader::new(settings)));

    let err = match runtime.transcoder().await {
        Ok(_) => panic!("checksum mismatch must not yield a codec"),
        Err(err) => err,
    };

    assert!(err.reason.contains("checksum mismatch"), "{}", err.reason);
    assert_eq!(std::fs::read_dir(cache.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn oversized_bundle_is_refused() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ffmpeg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
        .mount(&server)
        .await;
    let cache = tempfile::tempdir().unwrap();
    let mut settings = settings_for(&server, &cache);
    settings.max_bundle_bytes = 16;
    let runtime = CodecRuntime::new(Box::new(FfmpegLoader::new(settings)));

    let err = match runtime.transcoder().await {
        Ok(_) => panic!("oversized bundle must not yield a codec"),
        Err(err) => err,
    };

    assert!(err.reason.contains("too large"), "{}", err.reason);
}

#[tokio::test]
async fn http_error_makes_codec_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let cache = tempfile::tempdir().unwrap();
    let runtime = CodecRuntime::new(Box::new(FfmpegLoader::new(settings_for(&server, &cache))));

    let err = match runtime.transcoder().await {
        Ok(_) => panic!("404 must not yield a codec"),
        Err(err) => err,
    };

    assert!(err.reason.contains("404"), "{}", err.reason);
}

#[tokio::test]
async fn nothing_configured_is_unavailable_without_network() {
    let cache = tempfile::tempdir().unwrap();
    let settings = CodecSettings {
        cache_dir: cache.path().to_path_buf(),
        search_path: false,
        ..CodecSettings::default()
    };
    let runtime = CodecRuntime::new(Box::new(FfmpegLoader::new(settings)));

    assert!(runtime.transcoder().await.is_err());
    assert!(runtime.is_settled());
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
