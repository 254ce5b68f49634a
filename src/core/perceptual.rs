use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use image_hasher::{HashAlg, HasherConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Side of the grayscale square the DCT runs over.
const DCT_INPUT_SIZE: usize = 32;
/// Side of the low-frequency block kept from the DCT output.
const DCT_BLOCK_SIZE: usize = 8;
const HASH_BITS: usize = DCT_BLOCK_SIZE * DCT_BLOCK_SIZE;

#[derive(Debug, Error)]
pub enum PerceptualError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Unexpected hash width: {bits} bits")]
    HashWidth { bits: usize },
}

/// 64-bit perceptual signature. Visually similar images differ in few bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PerceptualDigest(pub u64);

impl PerceptualDigest {
    /// Number of differing bits
    pub fn distance(&self, other: &PerceptualDigest) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Near-duplicate test; the bound is exclusive
    pub fn is_similar(&self, other: &PerceptualDigest, threshold: u32) -> bool {
        self.distance(other) < threshold
    }
}

impl fmt::Display for PerceptualDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Serialize for PerceptualDigest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// 32x32 grayscale, 2-D DCT-II, top-left 8x8 block against its median
    #[default]
    Dct,
    /// 8x8 average hash
    Mean,
    /// 8x8 difference hash
    Gradient,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HashAlgorithm::Dct => "dct",
            HashAlgorithm::Mean => "mean",
            HashAlgorithm::Gradient => "gradient",
        };
        f.write_str(name)
    }
}

/// Computes perceptual digests for image files
pub struct PerceptualService {
    algorithm: HashAlgorithm,
}

impl PerceptualService {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Decode `image_path` and hash it. The format is sniffed from the file
    /// content, falling back to the extension.
    pub fn compute_perceptual_hash(
        &self,
        image_path: &Path,
    ) -> Result<PerceptualDigest, PerceptualError> {
        let img = ImageReader::open(image_path)?
            .with_guessed_format()?
            .decode()?;
        self.hash_image(&img)
    }

    pub fn hash_image(&self, img: &DynamicImage) -> Result<PerceptualDigest, PerceptualError> {
        match self.algorithm {
            HashAlgorithm::Dct => Ok(dct_hash(img)),
            HashAlgorithm::Mean => hasher_digest(img, HashAlg::Mean),
            HashAlgorithm::Gradient => hasher_digest(img, HashAlg::Gradient),
        }
    }
}

impl Default for PerceptualService {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

fn hasher_digest(img: &DynamicImage, alg: HashAlg) -> Result<PerceptualDigest, PerceptualError> {
    let hasher = HasherConfig::new()
        .hash_size(DCT_BLOCK_SIZE as u32, DCT_BLOCK_SIZE as u32)
        .hash_alg(alg)
        .to_hasher();
    let hash = hasher.hash_image(img);
    let bytes: [u8; 8] = hash
        .as_bytes()
        .try_into()
        .map_err(|_| PerceptualError::HashWidth {
            bits: hash.as_bytes().len() * 8,
        })?;
    Ok(PerceptualDigest(u64::from_be_bytes(bytes)))
}

/// pHash: bit `i` (row-major over the 8x8 block, most significant first) is
/// set when coefficient `i` is strictly above the block median.
fn dct_hash(img: &DynamicImage) -> PerceptualDigest {
    let small = img
        .grayscale()
        .resize_exact(
            DCT_INPUT_SIZE as u32,
            DCT_INPUT_SIZE as u32,
            FilterType::Lanczos3,
        )
        .to_luma8();

    let mut pixels = [[0.0f64; DCT_INPUT_SIZE]; DCT_INPUT_SIZE];
    for (x, y, pixel) in small.enumerate_pixels() {
        pixels[y as usize][x as usize] = f64::from(pixel[0]);
    }

    let coefficients = low_frequency_dct(&pixels);

    let mut sorted = coefficients;
    sorted.sort_by(|a, b| a.total_cmp(b));
    let median = (sorted[HASH_BITS / 2 - 1] + sorted[HASH_BITS / 2]) / 2.0;

    let bits = coefficients
        .iter()
        .fold(0u64, |acc, &c| (acc << 1) | u64::from(c > median));
    PerceptualDigest(bits)
}

/// Separable 2-D DCT-II, evaluated only for the top-left block.
/// Output is row-major: index `v * 8 + u` for vertical frequency `v`.
fn low_frequency_dct(pixels: &[[f64; DCT_INPUT_SIZE]; DCT_INPUT_SIZE]) -> [f64; HASH_BITS] {
    let n = DCT_INPUT_SIZE as f64;
    let mut cosines = [[0.0f64; DCT_INPUT_SIZE]; DCT_BLOCK_SIZE];
    for (k, row) in cosines.iter_mut().enumerate() {
        for (x, value) in row.iter_mut().enumerate() {
            *value = (std::f64::consts::PI * (2.0 * x as f64 + 1.0) * k as f64 / (2.0 * n)).cos();
        }
    }

    // Horizontal pass
    let mut rows = [[0.0f64; DCT_BLOCK_SIZE]; DCT_INPUT_SIZE];
    for (y, pixel_row) in pixels.iter().enumerate() {
        for u in 0..DCT_BLOCK_SIZE {
            rows[y][u] = pixel_row
                .iter()
                .zip(cosines[u].iter())
                .map(|(p, c)| p * c)
                .sum();
        }
    }

    // Vertical pass
    let mut coefficients = [0.0f64; HASH_BITS];
    for v in 0..DCT_BLOCK_SIZE {
        for u in 0..DCT_BLOCK_SIZE {
            coefficients[v * DCT_BLOCK_SIZE + u] = rows
                .iter()
                .zip(cosines[v].iter())
                .map(|(row, c)| row[u] * c)
                .sum();
        }
    }
    coefficients
}
