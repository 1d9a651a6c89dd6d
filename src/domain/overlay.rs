//! User-added comparison overlays.
//!
//! Owned by the UI session only; never persisted. Validation happens at add
//! time so a bad ticker is rejected before any fetch is scheduled for it.

/// Derive the provider series key from a contract ticker.
///
/// Contract tickers are formed `SERIES-EVENT-STRIKE` (e.g.
/// `KXSENATE-26-R`); the series key is the leading segment. Returns `None`
/// when the leading segment is empty or not plain alphanumeric.
pub fn derive_series_key(ticker: &str) -> Option<String> {
    let head = ticker.trim().split('-').next()?;
    if head.is_empty() || !head.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(head.to_ascii_uppercase())
}

#[derive(Debug, Clone)]
pub struct CompareOverlay {
    pub id: u32,
    pub ticker: String,
    pub series_key: String,
    pub label: String,
    pub color_top: String,
    pub color_bottom: String,
    pub enabled: bool,
}

/// The session's set of custom overlays, with add-time validation.
#[derive(Debug, Default)]
pub struct OverlaySet {
    overlays: Vec<CompareOverlay>,
    next_id: u32,
}

impl OverlaySet {
    pub fn iter(&self) -> impl Iterator<Item = &CompareOverlay> {
        self.overlays.iter()
    }

    pub fn get(&self, id: u32) -> Option<&CompareOverlay> {
        self.overlays.iter().find(|o| o.id == id)
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    /// Validate and add an overlay; returns its id.
    ///
    /// Rejects empty tickers, duplicates (case-insensitive), and tickers
    /// with no derivable series key.
    pub fn add(
        &mut self,
        ticker: &str,
        label: &str,
        color_top: &str,
        color_bottom: &str,
    ) -> Result<u32, String> {
        let ticker = ticker.trim().to_ascii_uppercase();
        if ticker.is_empty() {
            return Err("Ticker must not be empty".to_string());
        }
        if self.overlays.iter().any(|o| o.ticker == ticker) {
            return Err(format!("{} is already on the chart", ticker));
        }
        let series_key = derive_series_key(&ticker)
            .ok_or_else(|| format!("Cannot derive a series key from '{}'", ticker))?;

        let id = self.next_id;
        self.next_id += 1;
        let label = if label.trim().is_empty() {
            ticker.clone()
        } else {
            label.trim().to_string()
        };
        self.overlays.push(CompareOverlay {
            id,
            ticker,
            series_key,
            label,
            color_top: color_top.to_string(),
            color_bottom: color_bottom.to_string(),
            enabled: true,
        });
        Ok(id)
    }

    /// Remove by id; returns whether anything was removed.
    pub fn remove(&mut self, id: u32) -> bool {
        let before = self.overlays.len();
        self.overlays.retain(|o| o.id != id);
        self.overlays.len() != before
    }

    pub fn set_enabled(&mut self, id: u32, enabled: bool) {
        if let Some(overlay) = self.overlays.iter_mut().find(|o| o.id == id) {
            overlay.enabled = enabled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_key_is_leading_ticker_segment() {
        assert_eq!(derive_series_key("KXSENATE-26-R").as_deref(), Some("KXSENATE"));
        assert_eq!(derive_series_key("kxhouse-26"), Some("KXHOUSE".to_string()));
        assert_eq!(derive_series_key("-26-R"), None);
        assert_eq!(derive_series_key("  "), None);
        assert_eq!(derive_series_key("BAD KEY-26"), None);
    }

    #[test]
    fn add_rejects_empty_and_duplicate_tickers() {
        let mut set = OverlaySet::default();
        assert!(set.add("", "", "#fff", "#000").is_err());
        set.add("KXSENATE-26-R", "Senate", "#fff", "#000").unwrap();
        // Duplicate check is case-insensitive
        assert!(set.add("kxsenate-26-r", "Again", "#fff", "#000").is_err());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_destroys_by_id() {
        let mut set = OverlaySet::default();
        let id = set.add("KXHOUSE-26", "House", "#fff", "#000").unwrap();
        assert!(set.remove(id));
        assert!(!set.remove(id));
        assert!(set.is_empty());
    }

    #[test]
    fn empty_label_falls_back_to_ticker() {
        let mut set = OverlaySet::default();
        let id = set.add("KXHOUSE-26", "  ", "#fff", "#000").unwrap();
        assert_eq!(set.get(id).unwrap().label, "KXHOUSE-26");
    }
}
