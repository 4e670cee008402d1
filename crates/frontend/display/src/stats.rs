/// Presentation counters kept by each backend.
///
/// Everything runs on the UI thread, so plain integers are enough.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PresentStats {
    pub refreshes_accepted: u64,
    pub refreshes_rejected: u64,
    pub repaints_requested: u64,
    pub presents: u64,
    pub blank_presents: u64,
    pub full_uploads: u64,
    pub partial_uploads: u64,
    pub bytes_uploaded: u64,
}

impl PresentStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PresentStats {
        *self
    }

    pub(crate) fn record_upload(&mut self, full: bool, bytes: usize) {
        if full {
            self.full_uploads += 1;
        } else {
            self.partial_uploads += 1;
        }
        self.bytes_uploaded += bytes as u64;
    }

    /// One-line summary for status displays.
    pub fn summary(&self) -> String {
        format!(
            "presents={} (blank {}), refreshes={} (rejected {}), uploads full={} partial={} bytes={}",
            self.presents,
            self.blank_presents,
            self.refreshes_accepted,
            self.refreshes_rejected,
            self.full_uploads,
            self.partial_uploads,
            self.bytes_uploaded
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_upload() {
        let mut stats = PresentStats::new();
        stats.record_upload(true, 1024);
        stats.record_upload(false, 64);
        let snap = stats.snapshot();
        assert_eq!(snap.full_uploads, 1);
        assert_eq!(snap.partial_uploads, 1);
        assert_eq!(snap.bytes_uploaded, 1088);
        assert!(stats.summary().contains("bytes=1088"));
    }
}
