//! Files in, JPEGs out.

mod common;

use common::{rank_one_rgb, textured_rgb, write_png};
use svd_image_compress::config::CompressConfig;
use svd_image_compress::compress_images;

#[tokio::test]
async fn writes_one_jpeg_per_rank() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_png(dir.path(), "silksong", &textured_rgb(64, 48));
    let output = dir.path().join("result");

    let mut config = CompressConfig::new(vec![input]);
    config.output_dir = output.clone();
    config.variant = "human".to_string();

    let summary = compress_images(&config).await.unwrap();
    assert!(summary.is_success());

    for rank in [5, 20, 50] {
        let path = output.join(format!("silksong_human_{}.jpg", rank));
        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (64, 48));
    }
}

#[tokio::test]
async fn float_reload_and_report_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_png(dir.path(), "outer", &rank_one_rgb(8));
    let report = dir.path().join("reports").join("run.jsonl");

    let mut config = CompressConfig::new(vec![input]);
    config.output_dir = dir.path().join("out");
    config.ranks = vec![1];
    config.reload_as_float = true;
    config.parallel = false;
    config.report_path = Some(report.clone());

    let summary = compress_images(&config).await.unwrap();
    assert!(summary.is_success());
    assert!(dir.path().join("out").join("outer_svd_1.jpg").exists());

    let text = std::fs::read_to_string(&report).unwrap();
    let events: Vec<serde_json::Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let quality = events
        .iter()
        .find(|e| e["event"] == "quality")
        .expect("quality event");
    assert_eq!(quality["max_abs_error"], 0);
}

#[tokio::test]
async fn unreadable_input_is_reported_per_image() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_png(dir.path(), "good", &textured_rgb(16, 16));
    let bad = dir.path().join("bad.png");
    std::fs::write(&bad, b"not an image").unwrap();

    let mut config = CompressConfig::new(vec![bad, good]);
    config.output_dir = dir.path().join("out");
    config.ranks = vec![3];

    let summary = compress_images(&config).await.unwrap();
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.images[0].errors()[0].category(), "load");
    assert!(dir.path().join("out").join("good_svd_3.jpg").exists());
    assert!(!dir.path().join("out").join("bad_svd_3.jpg").exists());
}

#[tokio::test]
async fn invalid_config_is_an_error() {
    let mut config = CompressConfig::new(vec!["x.png".into()]);
    config.ranks = vec![0];
    assert!(compress_images(&config).await.is_err());
}
