// Duplicate classification against the running fingerprint indices.
// Exact duplicates share a content digest; similar images sit within the
// Hamming threshold of an earlier perceptual digest. The first file seen in
// traversal order is always the retained original.

use crate::core::hash::ExactDigest;
use crate::core::perceptual::PerceptualDigest;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateType {
    Exact,   // Identical files (same content digest)
    Similar, // Visually similar (perceptual digest within threshold)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// First of its kind; both digests are now indexed
    Unique,
    /// Byte-identical to `original`
    Exact { original: PathBuf },
    /// Perceptually within the threshold of `original`
    Similar { original: PathBuf, distance: u32 },
    /// No perceptual digest was available; indexed by content digest only
    ExactOnly,
}

impl Classification {
    pub fn duplicate_type(&self) -> Option<DuplicateType> {
        match self {
            Classification::Exact { .. } => Some(DuplicateType::Exact),
            Classification::Similar { .. } => Some(DuplicateType::Similar),
            Classification::Unique | Classification::ExactOnly => None,
        }
    }
}

/// Content digest -> first-seen path
#[derive(Debug, Default)]
pub struct ExactIndex {
    entries: HashMap<ExactDigest, PathBuf>,
}

impl ExactIndex {
    pub fn get(&self, digest: &ExactDigest) -> Option<&Path> {
        self.entries.get(digest).map(PathBuf::as_path)
    }

    /// Keeps the existing path if the digest is already present
    pub fn insert(&mut self, digest: ExactDigest, path: &Path) {
        self.entries
            .entry(digest)
            .or_insert_with(|| path.to_path_buf());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Perceptual digest -> first-seen path, in insertion order.
///
/// Lookups are a linear scan, so matching costs O(n) per file. Fine for
/// personal photo libraries; a prefix-bucketed index could replace it as
/// long as `find` still returns the earliest inserted match.
#[derive(Debug, Default)]
pub struct PerceptualIndex {
    entries: Vec<(PerceptualDigest, PathBuf)>,
}

impl PerceptualIndex {
    /// Earliest inserted entry strictly closer than `threshold`
    pub fn find(&self, digest: &PerceptualDigest, threshold: u32) -> Option<(&Path, u32)> {
        self.entries.iter().find_map(|(indexed, path)| {
            let distance = indexed.distance(digest);
            (distance < threshold).then_some((path.as_path(), distance))
        })
    }

    pub fn insert(&mut self, digest: PerceptualDigest, path: &Path) {
        if !self.entries.iter().any(|(indexed, _)| *indexed == digest) {
            self.entries.push((digest, path.to_path_buf()));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct DuplicateDetector {
    pub threshold: u32,
    exact_index: ExactIndex,
    perceptual_index: PerceptualIndex,
}

impl DuplicateDetector {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            exact_index: ExactIndex::default(),
            perceptual_index: PerceptualIndex::default(),
        }
    }

    /// Classify `path` and update the indices. Must be called in traversal
    /// order. Duplicates are never indexed, so a chain of near-duplicates
    /// only ever matches against retained originals.
    pub fn classify(
        &mut self,
        path: &Path,
        exact: ExactDigest,
        perceptual: Option<PerceptualDigest>,
    ) -> Classification {
        if let Some(original) = self.exact_index.get(&exact) {
            return Classification::Exact {
                original: original.to_path_buf(),
            };
        }

        let Some(perceptual) = perceptual else {
            self.exact_index.insert(exact, path);
            return Classification::ExactOnly;
        };

        if let Some((original, distance)) = self.perceptual_index.find(&perceptual, self.threshold)
        {
            return Classification::Similar {
                original: original.to_path_buf(),
                distance,
            };
        }

        self.exact_index.insert(exact, path);
        self.perceptual_index.insert(perceptual, path);
        Classification::Unique
    }

    pub fn exact_index(&self) -> &ExactIndex {
        &self.exact_index
    }

    pub fn perceptual_index(&self) -> &PerceptualIndex {
        &self.perceptual_index
    }
}
