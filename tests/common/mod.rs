#![allow(dead_code)]

use std::path::{Path, PathBuf};

use image::{GrayImage, Luma, Rgb, RgbImage};

/// Label of pixel column `x` in an image `width` wide: three vertical bands
/// with classes 0, 1 and 2.
pub fn band_label(x: u32, width: u32) -> u8 {
    (x * 3 / width) as u8
}

/// Writes an RGB image and its label image.
///
/// The image encodes the column in R (`x * 5`), the row in G and a constant
/// 100 in B, so tests can tell where a pixel came from after flips. The label
/// holds `band_label(x)`.
pub fn write_pair(dir: &Path, stem: &str, width: u32, height: u32) -> (PathBuf, PathBuf) {
    write_pair_with(dir, stem, width, height, |x, _| band_label(x, width))
}

pub fn write_pair_with<F>(dir: &Path, stem: &str, width: u32, height: u32, label: F) -> (PathBuf, PathBuf)
where
    F: Fn(u32, u32) -> u8,
{
    let image_path = dir.join(format!("{}.png", stem));
    let label_path = dir.join(format!("{}_label.png", stem));
    RgbImage::from_fn(width, height, |x, y| Rgb([(x * 5) as u8, y as u8, 100]))
        .save(&image_path)
        .unwrap();
    GrayImage::from_fn(width, height, |x, y| Luma([label(x, y)]))
        .save(&label_path)
        .unwrap();
    (image_path, label_path)
}

/// Writes a manifest listing `pairs` in order, all on one line.
pub fn write_manifest(dir: &Path, name: &str, pairs: &[(PathBuf, PathBuf)]) -> PathBuf {
    let path = dir.join(name);
    let text: String = pairs
        .iter()
        .map(|(image, label)| format!("{} {} ", image.display(), label.display()))
        .collect();
    std::fs::write(&path, text).unwrap();
    path
}

/// Mean of `band_label` over one image of the given width.
pub fn band_label_mean(width: u32) -> f64 {
    (0..width).map(|x| band_label(x, width) as f64).sum::<f64>() / width as f64
}
