use crate::core::duplicate::ExactIndex;
use crate::core::hash::{ExactDigest, HashError, HashService};
use crate::core::perceptual::{HashAlgorithm, PerceptualDigest, PerceptualError, PerceptualService};
use rayon::ThreadPool;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Source of the two digests the scanner classifies on.
///
/// Implementations must be free of shared mutable state: the scanner calls
/// them from several worker threads at once, each on a different file.
pub trait FingerprintProvider: Send + Sync {
    fn exact_digest_of(&self, path: &Path) -> Result<ExactDigest, HashError>;

    fn perceptual_digest_of(&self, path: &Path) -> Result<PerceptualDigest, PerceptualError>;
}

/// Default provider backed by BLAKE3 and the configured perceptual hash
pub struct ImageFingerprinter {
    hash_service: HashService,
    perceptual_service: PerceptualService,
}

impl ImageFingerprinter {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            hash_service: HashService::new(),
            perceptual_service: PerceptualService::new(algorithm),
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.perceptual_service.algorithm()
    }
}

impl Default for ImageFingerprinter {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

impl FingerprintProvider for ImageFingerprinter {
    fn exact_digest_of(&self, path: &Path) -> Result<ExactDigest, HashError> {
        self.hash_service.compute_content_hash(path)
    }

    fn perceptual_digest_of(&self, path: &Path) -> Result<PerceptualDigest, PerceptualError> {
        self.perceptual_service.compute_perceptual_hash(path)
    }
}

/// Digests gathered for one file before classification
#[derive(Debug)]
pub struct Fingerprints {
    pub exact: Result<ExactDigest, HashError>,
    /// `None` when it was not computed: the exact digest failed, is already
    /// indexed, or repeats an earlier file of the same batch
    pub perceptual: Option<Result<PerceptualDigest, PerceptualError>>,
}

/// Fingerprint `paths` on `pool`, returning results in input order.
///
/// Exact digests come first; images are only decoded for files whose content
/// is neither in `known` nor a repeat of an earlier file in the batch.
pub fn fingerprint_batch<P: FingerprintProvider + ?Sized>(
    pool: &ThreadPool,
    provider: &P,
    paths: &[PathBuf],
    known: &ExactIndex,
) -> Vec<Fingerprints> {
    let exact: Vec<Result<ExactDigest, HashError>> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| provider.exact_digest_of(path))
            .collect()
    });

    let mut seen = HashSet::new();
    let wanted: Vec<bool> = exact
        .iter()
        .map(|digest| match digest {
            Ok(digest) => known.get(digest).is_none() && seen.insert(*digest),
            Err(_) => false,
        })
        .collect();

    let perceptual: Vec<Option<Result<PerceptualDigest, PerceptualError>>> = pool.install(|| {
        paths
            .par_iter()
            .zip(wanted.par_iter())
            .map(|(path, &wanted)| wanted.then(|| provider.perceptual_digest_of(path)))
            .collect()
    });

    exact
        .into_iter()
        .zip(perceptual)
        .map(|(exact, perceptual)| Fingerprints { exact, perceptual })
        .collect()
}
