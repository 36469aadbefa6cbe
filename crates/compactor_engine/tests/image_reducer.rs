use std::io::Cursor;
use std::sync::Mutex;

use compactor_engine::reducers::ImageReducer;
use compactor_engine::{
    EngineEvent, ImageSettings, ProgressReporter, ProgressSink, ReduceError, Reducer, SourceFile,
};
use image::codecs::jpeg::JpegEncoder;
use image::{GenericImageView, ImageFormat, RgbImage};

#[derive(Default)]
struct Recorder(Mutex<Vec<u8>>);

impl ProgressSink for Recorder {
    fn emit(&self, event: EngineEvent) {
        if let EngineEvent::Progress(progress) = event {
            self.0.lock().unwrap().push(progress.percent);
        }
    }
}

fn large_jpeg() -> Vec<u8> {
    let img = RgbImage::from_fn(2400, 1600, |x, y| {
        image::Rgb([(x % 251) as u8, (y % 241) as u8, ((x * y) % 239) as u8])
    });
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 100)
        .encode_image(&img)
        .unwrap();
    bytes
}

#[tokio::test]
async fn oversized_jpeg_is_resized_and_recompressed() {
    let original = large_jpeg();
    let file = SourceFile::new("photo.jpg", "image/jpeg", original.clone());
    let sink = Recorder::default();
    let reporter = ProgressReporter::new(1, &sink);

    let output = ImageReducer::new(ImageSettings::default())
        .reduce(&file, &reporter)
        .await
        .unwrap();

    assert!(output.len() < original.len());
    assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Jpeg);
    let decoded = image::load_from_memory(&output).unwrap();
    let (width, height) = decoded.dimensions();
    assert!(width <= 1920 && height <= 1920);
    assert_eq!(width, 1920);

    let progress = sink.0.lock().unwrap().clone();
    assert!(progress.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(progress.last(), Some(&100));
}

#[tokio::test]
async fn small_png_keeps_its_format() {
    let img = RgbImage::from_pixel(64, 64, image::Rgb([10, 200, 30]));
    let mut original = Vec::new();
    img.write_to(&mut Cursor::new(&mut original), ImageFormat::Png)
        .unwrap();
    let file = SourceFile::new("flat.png", "image/png", original);
    let sink = Recorder::default();
    let reporter = ProgressReporter::new(1, &sink);

    let output = ImageReducer::new(ImageSettings::default())
        .reduce(&file, &reporter)
        .await
        .unwrap();

    assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Png);
    assert_eq!(image::load_from_memory(&output).unwrap().dimensions(), (64, 64));
}

#[tokio::test]
async fn undecodable_bytes_are_a_fault() {
    let file = SourceFile::new("photo.jpg", "image/jpeg", b"definitely not an image".to_vec());
    let sink = Recorder::default();
    let reporter = ProgressReporter::new(1, &sink);

    let result = ImageReducer::new(ImageSettings::default())
        .reduce(&file, &reporter)
        .await;

    assert!(matches!(result, Err(ReduceError::Decode(_))));
}
