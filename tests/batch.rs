//! End-to-end batch runs against real PNG/JPEG fixtures

use std::collections::BTreeMap;
use std::path::Path;

use batchresize::processing::ScaleFactor;
use batchresize::{BatchResizer, CancellationToken, Cleaner, Finder, ResizeConfig, ResizeError};
use tempfile::TempDir;

fn write_image(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    image::RgbImage::from_pixel(width, height, image::Rgb([30, 120, 200]))
        .save(path)
        .unwrap();
}

/// Output file name -> pixel dimensions
fn output_set(dir: &Path) -> BTreeMap<String, (u32, u32)> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.is_file())
        .map(|path| {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            (name, image::image_dimensions(&path).unwrap())
        })
        .collect()
}

fn mixed_source() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_image(&dir.path().join("wide.png"), 120, 40);
    write_image(&dir.path().join("odd.jpg"), 101, 57);
    write_image(&dir.path().join("nested/deeper/tall.jpeg"), 33, 90);
    std::fs::write(dir.path().join("nested/readme.txt"), b"not an image").unwrap();
    dir
}

fn scale(value: f64) -> ScaleFactor {
    ScaleFactor::new(value).unwrap()
}

#[tokio::test]
async fn concurrent_batch_writes_truncated_dimensions() {
    let source = mixed_source();
    let dest = TempDir::new().unwrap();
    let resizer = BatchResizer::new(ResizeConfig::new());

    let report = resizer
        .resize_all_concurrently(source.path(), dest.path(), scale(0.5), &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.is_success());
    let outputs = output_set(dest.path());
    assert_eq!(outputs.len(), 3);
    assert_eq!(outputs["wide.jpg"], (60, 20));
    assert_eq!(outputs["odd.jpg"], (50, 28));
    assert_eq!(outputs["tall.jpg"], (16, 45));
}

#[tokio::test]
async fn report_has_one_outcome_per_discovered_image() {
    let source = mixed_source();
    let dest = TempDir::new().unwrap();
    let discovered = Finder::find(source.path()).unwrap();

    let report = BatchResizer::new(ResizeConfig::new())
        .resize_all_concurrently(source.path(), dest.path(), scale(0.3), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.len(), discovered.len());
    for (outcome, path) in report.outcomes.iter().zip(&discovered) {
        assert_eq!(&outcome.source, path);
    }
}

#[tokio::test]
async fn corrupt_file_fails_alone() {
    let source = TempDir::new().unwrap();
    for i in 0..4 {
        write_image(&source.path().join(format!("ok{}.png", i)), 20, 20);
    }
    std::fs::write(source.path().join("corrupt.png"), b"\x89PNG garbage").unwrap();
    let dest = TempDir::new().unwrap();

    let report = BatchResizer::new(ResizeConfig::new())
        .resize_all_concurrently(source.path(), dest.path(), scale(0.5), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.len(), 5);
    assert_eq!(report.completed(), 4);
    assert_eq!(report.failed(), 1);
    let failed = report.unsuccessful().next().unwrap();
    assert!(failed.source.ends_with("corrupt.png"));
    assert!(failed.status_line().contains("corrupt.png"));
    assert_eq!(output_set(dest.path()).len(), 4);
    assert!(!dest.path().join("corrupt.jpg").exists());
}

#[tokio::test]
async fn dotted_names_keep_their_full_stem() {
    let source = TempDir::new().unwrap();
    write_image(&source.path().join("shot.v1.png"), 40, 20);
    write_image(&source.path().join("shot.v2.png"), 80, 40);
    write_image(&source.path().join("holiday.photo.jpeg"), 10, 10);
    let dest = TempDir::new().unwrap();

    let report = BatchResizer::new(ResizeConfig::new())
        .resize_all_concurrently(source.path(), dest.path(), scale(0.5), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.completed(), 3);
    let outputs = output_set(dest.path());
    assert_eq!(outputs.len(), 3);
    assert_eq!(outputs["shot.v1.jpg"], (20, 10));
    assert_eq!(outputs["shot.v2.jpg"], (40, 20));
    assert_eq!(outputs["holiday.photo.jpg"], (5, 5));
}

#[tokio::test]
async fn colliding_outputs_leave_one_whole_image() {
    let source = TempDir::new().unwrap();
    write_image(&source.path().join("a/frame.png"), 200, 100);
    write_image(&source.path().join("b/frame.jpg"), 60, 180);
    let dest = TempDir::new().unwrap();

    let report = BatchResizer::new(ResizeConfig::new().max_concurrent(Some(2)))
        .resize_all_concurrently(source.path(), dest.path(), scale(0.5), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.completed(), 2);
    // one of the two encodes, intact, and no staging files left behind
    let outputs = output_set(dest.path());
    assert_eq!(outputs.len(), 1);
    let dims = outputs["frame.jpg"];
    assert!(dims == (100, 50) || dims == (30, 90), "unexpected dimensions {:?}", dims);
    assert!(image::open(dest.path().join("frame.jpg")).is_ok());
}

#[tokio::test]
async fn cancellation_before_dispatch_writes_nothing() {
    let source = TempDir::new().unwrap();
    for i in 0..10 {
        write_image(&source.path().join(format!("img{}.png", i)), 16, 16);
    }
    let dest = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = BatchResizer::new(ResizeConfig::new())
        .resize_all_concurrently(source.path(), dest.path(), scale(0.5), &cancel)
        .await
        .unwrap();

    assert_eq!(report.len(), 10);
    assert_eq!(report.cancelled(), 10);
    assert!(output_set(dest.path()).is_empty());
}

#[test]
fn sequential_batch_aborts_on_corrupt_file() {
    let source = TempDir::new().unwrap();
    for i in 0..4 {
        write_image(&source.path().join(format!("ok{}.png", i)), 20, 20);
    }
    std::fs::write(source.path().join("broken.jpg"), b"not a jpeg").unwrap();
    let dest = TempDir::new().unwrap();

    let resizer = BatchResizer::new(ResizeConfig::new().concurrent(false));
    let err = resizer.resize_all(source.path(), dest.path(), scale(0.5)).unwrap_err();

    assert!(matches!(err, ResizeError::Decode { .. }));
    assert!(output_set(dest.path()).len() < 5);
    assert!(!dest.path().join("broken.jpg").exists());
}

#[test]
fn sequential_batch_matches_concurrent_output() {
    let source = mixed_source();
    let sync_dest = TempDir::new().unwrap();
    let resizer = BatchResizer::new(ResizeConfig::new().concurrent(false));

    let outputs = resizer.resize_all(source.path(), sync_dest.path(), scale(0.5)).unwrap();
    assert_eq!(outputs.len(), 3);

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let async_dest = TempDir::new().unwrap();
    runtime
        .block_on(resizer.resize_all_concurrently(
            source.path(),
            async_dest.path(),
            scale(0.5),
            &CancellationToken::new(),
        ))
        .unwrap();

    assert_eq!(output_set(sync_dest.path()), output_set(async_dest.path()));
}

#[tokio::test]
async fn rerun_after_clean_is_idempotent() {
    let source = mixed_source();
    let dest_dir = TempDir::new().unwrap();
    let dest = dest_dir.path().join("out");
    let resizer = BatchResizer::new(ResizeConfig::new().scale(0.4));
    let cancel = CancellationToken::new();

    resizer.run(source.path(), &dest, &cancel).await.unwrap();
    let first = output_set(&dest);

    assert_eq!(Cleaner::clean(&dest).unwrap(), 3);
    assert!(output_set(&dest).is_empty());

    resizer.run(source.path(), &dest, &cancel).await.unwrap();
    assert_eq!(output_set(&dest), first);
}

#[tokio::test]
async fn missing_source_is_not_found() {
    let dir = TempDir::new().unwrap();
    let result = BatchResizer::new(ResizeConfig::new())
        .resize_all_concurrently(
            &dir.path().join("absent"),
            &dir.path().join("out"),
            scale(0.5),
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(ResizeError::NotFound { .. })));
}

#[tokio::test]
async fn destination_is_created() {
    let source = mixed_source();
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("a/b/c");

    BatchResizer::new(ResizeConfig::new())
        .resize_all_concurrently(source.path(), &dest, scale(0.5), &CancellationToken::new())
        .await
        .unwrap();

    assert!(dest.is_dir());
}

#[tokio::test]
async fn empty_source_yields_empty_report() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();

    let report = BatchResizer::new(ResizeConfig::new())
        .resize_all_concurrently(source.path(), dest.path(), scale(0.5), &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.is_empty());
    assert!(report.is_success());
}
