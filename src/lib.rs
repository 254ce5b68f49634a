//! Duplicate-image detection: a two-tier scan that finds byte-identical
//! images by content digest and visually near-identical ones by perceptual
//! digest, optionally deleting the redundant copies.

pub mod core;

pub use crate::core::config::{ConfigError, ScanConfig};
pub use crate::core::events::{EventSender, FileErrorKind, ScanEvent};
pub use crate::core::fingerprint::{FingerprintProvider, ImageFingerprinter};
pub use crate::core::hash::{ExactDigest, HashError};
pub use crate::core::perceptual::{HashAlgorithm, PerceptualDigest, PerceptualError};
pub use crate::core::scanner::{DuplicateScanner, ScanError};
pub use crate::core::summary::{ScanResult, ScanStatus};
