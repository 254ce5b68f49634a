use crate::core::config::{ConfigError, ScanConfig};
use crate::core::duplicate::{Classification, DuplicateDetector, DuplicateType};
use crate::core::events::{EventSender, FileErrorKind, ScanEvent};
use crate::core::fingerprint::{
    FingerprintProvider, Fingerprints, ImageFingerprinter, fingerprint_batch,
};
use crate::core::summary::{ScanResult, ScanStatus, ScanTally};
use glob::Pattern;
use std::collections::HashSet;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Path not found: {path}")]
    PathNotFound { path: String },

    #[error("Not a directory: {path}")]
    NotADirectory { path: String },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Walks a directory tree and classifies every eligible image as unique,
/// exact duplicate or similar image.
///
/// Fingerprints are computed on a bounded worker pool a batch at a time;
/// classification, index updates and deletions happen on the calling thread
/// in traversal order, so the retained original never depends on thread
/// scheduling.
pub struct DuplicateScanner<P: FingerprintProvider = ImageFingerprinter> {
    config: ScanConfig,
    provider: P,
    event_sender: Option<EventSender>,
    cancellation_token: Arc<AtomicBool>,
}

impl DuplicateScanner<ImageFingerprinter> {
    pub fn new(config: ScanConfig) -> Self {
        let provider = ImageFingerprinter::new(config.algorithm);
        Self::with_provider(config, provider)
    }
}

impl<P: FingerprintProvider> DuplicateScanner<P> {
    pub fn with_provider(config: ScanConfig, provider: P) -> Self {
        Self {
            config,
            provider,
            event_sender: None,
            cancellation_token: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    pub fn get_cancellation_token(&self) -> Arc<AtomicBool> {
        self.cancellation_token.clone()
    }

    pub fn cancel_scan(&self) {
        self.cancellation_token.store(true, Ordering::Relaxed);
    }

    /// Scan `root` and, when `delete_duplicates` is set, remove every file
    /// classified as a duplicate.
    ///
    /// Only an unusable root or configuration is an error. Per-file failures
    /// are reported as events and the scan carries on. Exactly one
    /// [`ScanEvent::Finished`] is sent, whatever the outcome.
    pub fn scan(&self, root: &Path, delete_duplicates: bool) -> Result<ScanResult, ScanError> {
        match self.run(root, delete_duplicates) {
            Ok(result) => {
                log::info!("{}", result.summary_message());
                self.send_event(result.finished_event());
                Ok(result)
            }
            Err(e) => {
                log::error!("Scan of {} failed: {}", root.display(), e);
                self.send_event(ScanEvent::Finished {
                    success: false,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn run(&self, root: &Path, delete_duplicates: bool) -> Result<ScanResult, ScanError> {
        if !root.exists() {
            return Err(ScanError::PathNotFound {
                path: root.to_string_lossy().to_string(),
            });
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory {
                path: root.to_string_lossy().to_string(),
            });
        }

        self.config.validate()?;
        let exclude_patterns = self.config.compiled_excludes()?;
        let extensions: HashSet<String> =
            self.config.normalized_extensions().into_iter().collect();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()?;

        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        log::info!(
            "Scanning {} (threshold {}, {} workers, delete duplicates: {})",
            root.display(),
            self.config.threshold,
            self.config.workers,
            delete_duplicates
        );
        self.send_event(ScanEvent::Started {
            root: root.clone(),
            delete_duplicates,
        });

        let mut tally = ScanTally::default();
        let files = self.discover_files(&root, &extensions, &exclude_patterns, &mut tally);
        let total_files = files.len();
        self.send_event(ScanEvent::Discovered { total: total_files });

        let mut detector = DuplicateDetector::new(self.config.threshold);
        let mut status = if self.is_cancelled() {
            ScanStatus::Cancelled
        } else {
            ScanStatus::Completed
        };
        let mut position = 0;

        'batches: for batch in files.chunks(self.config.batch_size) {
            if status == ScanStatus::Cancelled || self.is_cancelled() {
                status = ScanStatus::Cancelled;
                break;
            }

            let fingerprints =
                fingerprint_batch(&pool, &self.provider, batch, detector.exact_index());

            for (path, fingerprints) in batch.iter().zip(fingerprints) {
                if self.is_cancelled() {
                    status = ScanStatus::Cancelled;
                    break 'batches;
                }

                position += 1;
                self.send_event(ScanEvent::Processing {
                    index: position,
                    total: total_files,
                    path: path.clone(),
                });
                self.process_file(
                    path,
                    fingerprints,
                    &mut detector,
                    &mut tally,
                    delete_duplicates,
                );
            }
        }

        if status == ScanStatus::Cancelled {
            log::warn!(
                "Scan cancelled after {} of {} files",
                position,
                total_files
            );
        }

        Ok(tally.finish(delete_duplicates, status))
    }

    fn discover_files(
        &self,
        root: &Path,
        extensions: &HashSet<String>,
        exclude_patterns: &[Pattern],
        tally: &mut ScanTally,
    ) -> Vec<PathBuf> {
        let mut discovered_files = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(self.config.follow_links)
            .sort_by_file_name()
        {
            if self.is_cancelled() {
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    // Ineligible files stay silent even when they fail to load
                    if path.is_dir() || is_eligible(&path, extensions, exclude_patterns) {
                        self.report_error(&path, FileErrorKind::Walk, &e, tally);
                    }
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if !is_eligible(entry.path(), extensions, exclude_patterns) {
                continue;
            }

            discovered_files.push(entry.into_path());
        }

        log::info!("Discovered {} candidate images", discovered_files.len());
        discovered_files
    }

    fn process_file(
        &self,
        path: &Path,
        fingerprints: Fingerprints,
        detector: &mut DuplicateDetector,
        tally: &mut ScanTally,
        delete_duplicates: bool,
    ) {
        tally.record_examined();

        let exact = match fingerprints.exact {
            Ok(digest) => digest,
            Err(e) => {
                self.report_error(path, FileErrorKind::Read, &e, tally);
                return;
            }
        };

        // Skipped in the batch pass as a repeat, but the earlier copy turned
        // out not to be indexed (it was a similar image)
        let perceptual = match fingerprints.perceptual {
            None if detector.exact_index().get(&exact).is_none() => {
                Some(self.provider.perceptual_digest_of(path))
            }
            perceptual => perceptual,
        };

        let (perceptual, decode_error) = match perceptual {
            Some(Ok(digest)) => (Some(digest), None),
            Some(Err(e)) => (None, Some(e)),
            None => (None, None),
        };

        match detector.classify(path, exact, perceptual) {
            Classification::Unique => {
                log::debug!("Unique: {}", path.display());
            }
            Classification::ExactOnly => {
                if let Some(e) = decode_error {
                    self.report_error(path, FileErrorKind::Decode, &e, tally);
                }
            }
            Classification::Exact { original } => {
                log::debug!("{} is identical to {}", path.display(), original.display());
                self.send_event(ScanEvent::ExactDuplicate {
                    path: path.to_path_buf(),
                    original,
                });
                self.handle_duplicate(path, DuplicateType::Exact, tally, delete_duplicates);
            }
            Classification::Similar { original, distance } => {
                log::debug!(
                    "{} is similar to {} (distance {})",
                    path.display(),
                    original.display(),
                    distance
                );
                self.send_event(ScanEvent::SimilarImage {
                    path: path.to_path_buf(),
                    original,
                    distance,
                });
                self.handle_duplicate(path, DuplicateType::Similar, tally, delete_duplicates);
            }
        }
    }

    fn handle_duplicate(
        &self,
        path: &Path,
        kind: DuplicateType,
        tally: &mut ScanTally,
        delete_duplicates: bool,
    ) {
        if delete_duplicates {
            match fs::remove_file(path) {
                Ok(()) => {
                    log::info!("Deleted {}", path.display());
                    tally.record_deleted();
                    self.send_event(ScanEvent::Deleted {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) => self.report_error(path, FileErrorKind::Delete, &e, tally),
            }
        }
        tally.record_duplicate(kind);
    }

    fn report_error(
        &self,
        path: &Path,
        kind: FileErrorKind,
        error: &dyn Display,
        tally: &mut ScanTally,
    ) {
        log::warn!("{:?} error on {}: {}", kind, path.display(), error);
        tally.record_error();
        self.send_event(ScanEvent::Error {
            path: path.to_path_buf(),
            kind,
            message: error.to_string(),
        });
    }

    fn send_event(&self, event: ScanEvent) {
        if let Some(sender) = &self.event_sender {
            let _ = sender.send(event);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation_token.load(Ordering::Relaxed)
    }
}

fn has_extension(path: &Path, extensions: &HashSet<String>) -> bool {
    path.extension()
        .map(|ext| extensions.contains(&ext.to_string_lossy().to_lowercase()))
        .unwrap_or(false)
}

fn is_eligible(path: &Path, extensions: &HashSet<String>, exclude_patterns: &[Pattern]) -> bool {
    if !has_extension(path, extensions) {
        return false;
    }
    let path_str = path.to_string_lossy();
    !exclude_patterns
        .iter()
        .any(|pattern| pattern.matches(&path_str))
}
