/// Tunables of the suggestion engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Zero-width character standing in for a tracked block boundary.
    pub boundary_marker: char,
    /// How far left and right of a deletion to look for boundary markers.
    pub marker_scan_window: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            boundary_marker: '\u{200B}',
            marker_scan_window: 4,
        }
    }
}
