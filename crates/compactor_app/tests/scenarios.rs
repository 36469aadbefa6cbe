use std::sync::Arc;
use std::time::Duration;

use compactor_app::JobController;
use compactor_core::{Family, FailureReason, JobStatus, RawFile};
use compactor_engine::{
    CodecLoader, CodecRuntime, CodecUnavailable, EngineHandle, EngineSettings, ProgressReporter,
    ReduceError, Reducer, ReducerRegistry, SimulationSettings, SourceFile, Transcoder,
};
use pretty_assertions::assert_eq;

const SETTLE: Duration = Duration::from_secs(30);

struct NoCodec;

#[async_trait::async_trait]
impl CodecLoader for NoCodec {
    async fn load(&self) -> Result<Arc<dyn Transcoder>, CodecUnavailable> {
        Err(CodecUnavailable::new("disabled in tests"))
    }
}

/// Sleeps before halving the input, long enough to clear the job set meanwhile.
struct SlowHalving;

#[async_trait::async_trait]
impl Reducer for SlowHalving {
    async fn reduce(
        &self,
        file: &SourceFile,
        progress: &ProgressReporter<'_>,
    ) -> Result<Vec<u8>, ReduceError> {
        progress.report(10);
        tokio::time::sleep(Duration::from_millis(300)).await;
        progress.report(100);
        Ok(file.bytes[..file.bytes.len() / 2].to_vec())
    }
}

fn registry() -> ReducerRegistry {
    let settings = EngineSettings {
        simulation: SimulationSettings {
            steps: 4,
            step_delay: Duration::from_millis(2),
        },
        ..EngineSettings::default()
    };
    ReducerRegistry::with_codec_runtime(&settings, Arc::new(CodecRuntime::new(Box::new(NoCodec))))
}

fn controller_with(registry: ReducerRegistry) -> JobController {
    JobController::with_engine(EngineHandle::with_registry(registry).unwrap()).unwrap()
}

fn noise(len: usize) -> Vec<u8> {
    let mut state: u32 = 0x2545_F491;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect()
}

fn padded_json() -> Vec<u8> {
    let mut text = String::from("{\"a\": 1,  \"b\": 2}");
    text.push_str(&" ".repeat(10_000 - text.len()));
    text.into_bytes()
}

#[test]
fn padded_json_is_compacted() {
    let controller = controller_with(registry());
    let ids = controller.submit(vec![RawFile::new("data.json", "application/json", padded_json())]);

    assert!(controller.wait_until_settled(SETTLE));
    let view = controller.snapshot();
    let row = &view.jobs[0];
    assert_eq!(row.job_id, ids[0]);
    assert_eq!(row.family, Family::Code);
    assert_eq!(row.status, JobStatus::Succeeded);
    assert_eq!(row.progress, 100);
    assert_eq!(row.source_size, 10_000);
    assert_eq!(row.result_size, Some(13));

    let download = controller.download(ids[0]).unwrap();
    assert_eq!(download.file_name, "min_data.json");
    assert_eq!(download.bytes, b"{\"a\":1,\"b\":2}".to_vec());
    assert!(controller.take_notices().is_empty());
}

#[test]
fn compressed_archive_is_not_improved() {
    let controller = controller_with(registry());
    let ids = controller.submit(vec![RawFile::new("bundle.zip", "application/zip", noise(1_000))]);

    assert!(controller.wait_until_settled(SETTLE));
    let view = controller.snapshot();
    assert_eq!(view.jobs[0].family, Family::Archive);
    assert_eq!(view.jobs[0].status, JobStatus::Failed);
    assert_eq!(view.jobs[0].failure, Some(FailureReason::NoImprovement));
    assert_eq!(view.jobs[0].result_size, None);
    assert_eq!(controller.download(ids[0]), None);

    let notices = controller.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].job_id, ids[0]);
    assert_eq!(
        notices[0].message,
        "Could not compress \"bundle.zip\" effectively (result was not smaller)."
    );
    assert!(controller.take_notices().is_empty());
}

#[test]
fn truncated_pdf_is_a_fault() {
    let controller = controller_with(registry());
    let broken = RawFile::new("broken.pdf", "application/pdf", b"%PDF-1.".to_vec());
    let ids = controller.submit(vec![broken]);

    assert!(controller.wait_until_settled(SETTLE));
    let view = controller.snapshot();
    assert_eq!(view.jobs[0].status, JobStatus::Failed);
    assert_eq!(view.jobs[0].failure, Some(FailureReason::ReducerFault));
    assert_eq!(view.jobs[0].result_size, None);
    assert_eq!(controller.download(ids[0]), None);
    let notices = controller.take_notices();
    assert_eq!(notices[0].message, "Error processing \"broken.pdf\".");
}

fn large_jpeg() -> Vec<u8> {
    let img = image::RgbImage::from_fn(2200, 1400, |x, y| {
        image::Rgb([(x % 200) as u8, (y % 180) as u8, ((x + y) % 160) as u8])
    });
    let mut bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, 100)
        .encode_image(&img)
        .unwrap();
    bytes
}

#[test]
fn mixed_batch_settles_independently() {
    let controller = controller_with(registry());
    let css = "body {\n  color: red;\n  margin: 0;\n}\n".repeat(50).into_bytes();
    let files = vec![
        RawFile::new("photo.jpg", "image/jpeg", large_jpeg()),
        RawFile::new("site.css", "text/css", css.clone()),
        RawFile::new("doc.pdf", "application/pdf", b"%PDF-1.4 garbage".to_vec()),
        RawFile::new("blob.bin", "application/octet-stream", noise(2_000)),
        RawFile::new("song.mp3", "audio/mpeg", noise(3_000)),
    ];

    let ids = controller.submit(files);
    assert_eq!(ids.len(), 5);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    assert!(controller.wait_until_settled(SETTLE));
    let view = controller.snapshot();
    assert_eq!(view.job_count, 5);
    let names: Vec<&str> = view.jobs.iter().map(|row| row.name.as_str()).collect();
    assert_eq!(names, vec!["photo.jpg", "site.css", "doc.pdf", "blob.bin", "song.mp3"]);

    let by_name = |name: &str| view.jobs.iter().find(|row| row.name == name).unwrap();
    assert_eq!(by_name("photo.jpg").family, Family::Image);
    assert_eq!(by_name("photo.jpg").status, JobStatus::Succeeded);
    assert_eq!(by_name("site.css").status, JobStatus::Succeeded);
    assert_eq!(by_name("doc.pdf").failure, Some(FailureReason::ReducerFault));
    assert_eq!(by_name("blob.bin").failure, Some(FailureReason::NoImprovement));
    assert_eq!(by_name("song.mp3").family, Family::Audio);
    assert_eq!(by_name("song.mp3").failure, Some(FailureReason::NoImprovement));
    assert_eq!(by_name("song.mp3").progress, 100);

    for row in &view.jobs {
        if let Some(result_size) = row.result_size {
            assert!(result_size < row.source_size, "{}", row.name);
        }
    }
    let css_download = controller.download(by_name("site.css").job_id).unwrap();
    assert_eq!(css_download.bytes, b"body{color:red;margin:0}".repeat(50));

    assert_eq!(view.stats.files_count, 5);
    assert_eq!(view.stats.succeeded, 2);
    assert_eq!(view.stats.failed, 3);
    assert_eq!(view.stats.running, 0);
    assert_eq!(controller.take_notices().len(), 3);
}

#[test]
fn clearing_running_jobs_drops_their_late_results() {
    let slow = registry().with_reducer(Family::Archive, Arc::new(SlowHalving));
    let controller = controller_with(slow);

    let first = controller.submit(vec![
        RawFile::new("a.bin", "", vec![1; 400]),
        RawFile::new("b.bin", "", vec![2; 400]),
    ]);
    assert_eq!(controller.snapshot().stats.running, 2);
    controller.clear_all();
    assert_eq!(controller.snapshot().job_count, 0);

    std::thread::sleep(Duration::from_millis(600));
    let view = controller.snapshot();
    assert_eq!(view.job_count, 0);
    assert_eq!(view.stats.files_count, 0);
    assert!(controller.take_notices().is_empty());

    let later = controller.submit(vec![RawFile::new("c.bin", "", vec![3; 400])]);
    assert!(later[0] > first[1]);
    assert!(controller.wait_until_settled(SETTLE));
    let view = controller.snapshot();
    assert_eq!(view.job_count, 1);
    assert_eq!(view.jobs[0].status, JobStatus::Succeeded);
    assert_eq!(view.jobs[0].result_size, Some(200));
}

#[test]
fn snapshot_dirty_flag_tracks_changes() {
    let controller = controller_with(registry());
    assert!(!controller.snapshot().dirty);

    controller.submit(vec![RawFile::new("data.json", "application/json", padded_json())]);
    assert!(controller.snapshot().dirty);
    assert!(controller.wait_until_settled(SETTLE));
    controller.snapshot();
    assert!(!controller.snapshot().dirty);
}
