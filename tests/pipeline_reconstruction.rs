//! Reconstruction properties of the compression pipeline.

mod common;

use common::{rank_one_rgb, textured_rgb};
use svd_image_compress::core::SourceImage;
use svd_image_compress::processing::{CompressionPipeline, PipelineOptions};
use svd_image_compress::svd_rank::storage_ratio_percent;

fn pipeline(ranks: &[usize]) -> CompressionPipeline {
    CompressionPipeline::new(PipelineOptions {
        ranks: ranks.to_vec(),
        ..PipelineOptions::default()
    })
}

#[tokio::test]
async fn rank_one_image_is_exact_at_rank_one() {
    let rgb = rank_one_rgb(8);
    let out = pipeline(&[1])
        .run(SourceImage::from_rgb8("outer", rgb.clone()))
        .await
        .unwrap();

    assert_eq!(out.reconstructions[0].image.pixels(), &rgb);
    for channel in &out.energy {
        assert!((channel.reports[0].energy_ratio - 1.0).abs() < 1e-9);
    }
}

#[tokio::test]
async fn default_ranks_on_small_image_are_clamped() {
    let rgb = textured_rgb(40, 30);
    let out = pipeline(&[5, 20, 50])
        .run(SourceImage::from_rgb8("small", rgb.clone()))
        .await
        .unwrap();

    let effective: Vec<_> = out
        .reconstructions
        .iter()
        .map(|r| (r.image.rank, r.image.effective_rank))
        .collect();
    assert_eq!(effective, vec![(5, 5), (20, 20), (50, 30)]);

    for r in &out.reconstructions {
        assert_eq!(r.image.pixels().dimensions(), (40, 30));
    }
    // Clamped to full rank: the source comes back.
    assert_eq!(out.rank(50).unwrap().image.pixels(), &rgb);
}

#[tokio::test]
async fn error_shrinks_as_rank_grows() {
    let out = pipeline(&[1, 4, 12])
        .run(SourceImage::from_rgb8("texture", textured_rgb(24, 16)))
        .await
        .unwrap();

    let mse: Vec<f64> = out
        .reconstructions
        .iter()
        .map(|r| r.quality.unwrap().mse)
        .collect();
    assert!(mse[0] >= mse[1] && mse[1] >= mse[2], "{:?}", mse);

    for channel in &out.energy {
        let ratios: Vec<f64> = channel.reports.iter().map(|r| r.energy_ratio).collect();
        assert!(ratios.windows(2).all(|w| w[0] <= w[1] + 1e-12));
        assert!(ratios.iter().all(|&e| (0.0..=1.0 + 1e-12).contains(&e)));
    }
}

#[tokio::test]
async fn storage_ratio_uses_effective_rank() {
    let out = pipeline(&[5, 100])
        .run(SourceImage::from_rgb8("ratio", textured_rgb(20, 10)))
        .await
        .unwrap();

    let r5 = out.rank(5).unwrap().storage_ratio_percent;
    assert!((r5 - storage_ratio_percent(10, 20, 5)).abs() < 1e-12);
    assert!((r5 - 77.5).abs() < 1e-9);
    let clamped = out.rank(100).unwrap().storage_ratio_percent;
    assert!((clamped - storage_ratio_percent(10, 20, 10)).abs() < 1e-12);
}

#[tokio::test]
async fn constant_image_survives_every_rank() {
    let rgb = image::RgbImage::from_pixel(9, 9, image::Rgb([17, 200, 255]));
    let out = pipeline(&[1, 3])
        .run(SourceImage::from_rgb8("flat", rgb.clone()))
        .await
        .unwrap();
    for r in &out.reconstructions {
        assert_eq!(r.image.pixels(), &rgb);
    }
}

#[tokio::test]
async fn black_image_has_full_energy_and_zero_error() {
    let rgb = image::RgbImage::new(5, 7);
    let out = pipeline(&[2])
        .run(SourceImage::from_rgb8("black", rgb.clone()))
        .await
        .unwrap();
    assert_eq!(out.reconstructions[0].image.pixels(), &rgb);
    for channel in &out.energy {
        assert_eq!(channel.reports[0].energy_ratio, 1.0);
    }
}
