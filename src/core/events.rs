use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tokio::sync::mpsc;

pub type EventSender = mpsc::UnboundedSender<ScanEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileErrorKind {
    /// Directory entry could not be read during traversal
    Walk,
    /// File could not be opened or read for the content digest
    Read,
    /// File is not a decodable image
    Decode,
    /// Duplicate could not be removed
    Delete,
}

/// Progress and result stream of one scan. Every variant renders as a single
/// human-readable log line through `Display`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    Started {
        root: PathBuf,
        delete_duplicates: bool,
    },
    Discovered {
        total: usize,
    },
    Processing {
        index: usize,
        total: usize,
        path: PathBuf,
    },
    ExactDuplicate {
        path: PathBuf,
        original: PathBuf,
    },
    SimilarImage {
        path: PathBuf,
        original: PathBuf,
        distance: u32,
    },
    Deleted {
        path: PathBuf,
    },
    Error {
        path: PathBuf,
        kind: FileErrorKind,
        message: String,
    },
    /// Terminal `(success, message)` pair; sent exactly once per scan
    Finished {
        success: bool,
        message: String,
    },
}

impl ScanEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanEvent::Finished { .. })
    }
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanEvent::Started {
                root,
                delete_duplicates,
            } => {
                write!(f, "Scanning {}", root.display())?;
                if *delete_duplicates {
                    write!(f, " (duplicates will be deleted)")?;
                }
                Ok(())
            }
            ScanEvent::Discovered { total } => write!(f, "Found {} candidate images", total),
            ScanEvent::Processing { index, total, path } => {
                write!(f, "[{}/{}] Processing {}", index, total, path.display())
            }
            ScanEvent::ExactDuplicate { path, original } => write!(
                f,
                "Complete duplicate: {} is identical to {}",
                path.display(),
                original.display()
            ),
            ScanEvent::SimilarImage {
                path,
                original,
                distance,
            } => write!(
                f,
                "Similar image: {} looks like {} (distance {})",
                path.display(),
                original.display(),
                distance
            ),
            ScanEvent::Deleted { path } => write!(f, "Deleted {}", path.display()),
            ScanEvent::Error {
                path,
                kind,
                message,
            } => {
                let action = match kind {
                    FileErrorKind::Walk => "reading directory entry",
                    FileErrorKind::Read => "reading",
                    FileErrorKind::Decode => "decoding",
                    FileErrorKind::Delete => "deleting",
                };
                write!(f, "Error {} {}: {}", action, path.display(), message)
            }
            ScanEvent::Finished { success, message } => {
                let label = if *success { "Done" } else { "Failed" };
                write!(f, "{}: {}", label, message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_lines_name_both_paths() {
        let event = ScanEvent::ExactDuplicate {
            path: PathBuf::from("/photos/b.png"),
            original: PathBuf::from("/photos/a.png"),
        };
        let line = event.to_string();
        assert!(line.contains("/photos/b.png"));
        assert!(line.contains("/photos/a.png"));
        assert!(!event.is_terminal());
    }

    #[test]
    fn test_json_is_tagged() {
        let event = ScanEvent::Error {
            path: PathBuf::from("x.jpg"),
            kind: FileErrorKind::Decode,
            message: "bad header".to_string(),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "error");
        assert_eq!(json["kind"], "decode");
        assert_eq!(json["path"], "x.jpg");
    }

    #[test]
    fn test_finished_is_terminal() {
        let event = ScanEvent::Finished {
            success: false,
            message: "Path not found: /nope".to_string(),
        };
        assert!(event.is_terminal());
        assert_eq!(event.to_string(), "Failed: Path not found: /nope");
    }
}
