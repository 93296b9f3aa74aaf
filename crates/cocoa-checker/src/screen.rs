//! Text rendering for the single screen.

use cocoa_core::SessionSummary;

/// Shown while waiting for the start action.
pub const START_PROMPT: &str = "Press Enter to count nearby COCOA devices (Ctrl-D to quit)";

/// Shown when the busy indicator appears.
pub const SCANNING: &str = "Scanning";

/// Render a signal strength reading.
#[must_use]
pub fn format_strength(rssi: i16) -> String {
    format!("{rssi} dBm")
}

/// Render the result of a completed scan.
///
/// ```text
/// COCOA installs nearby
/// about 2 devices
/// --- signal strength ---
/// -60 dBm
/// -70 dBm
/// ```
#[must_use]
pub fn render_summary(summary: &SessionSummary) -> String {
    let mut lines = vec![
        "COCOA installs nearby".to_string(),
        format!("about {} devices", summary.device_count()),
        "--- signal strength ---".to_string(),
    ];
    lines.extend(summary.signal_strengths().iter().copied().map(format_strength));
    lines.join("\n")
}
