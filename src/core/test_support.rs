//! Image fixtures shared by the unit tests.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage, Luma};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

const PATTERN_SIZE: u32 = 256;
const PATTERN_CELLS: u32 = 8;

/// 256x256 grayscale image made of an 8x8 grid of flat cells whose levels
/// come from a seeded LCG. Different seeds give unrelated images.
pub fn block_pattern(seed: u32) -> GrayImage {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    let mut levels = [0u8; (PATTERN_CELLS * PATTERN_CELLS) as usize];
    for level in levels.iter_mut() {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        *level = (state >> 24) as u8;
    }

    let cell = PATTERN_SIZE / PATTERN_CELLS;
    GrayImage::from_fn(PATTERN_SIZE, PATTERN_SIZE, |x, y| {
        Luma([levels[((y / cell) * PATTERN_CELLS + x / cell) as usize]])
    })
}

pub fn save_png(img: &GrayImage, path: &Path) {
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

pub fn save_jpeg(img: &GrayImage, path: &Path, quality: u8) {
    let mut writer = BufWriter::new(File::create(path).unwrap());
    DynamicImage::ImageLuma8(img.clone())
        .write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))
        .unwrap();
}
