//! Text output formatting with channel tables and colors.

use chrono::Local;
use gatewatch_core::{ChannelRecord, PollResult, PollStatus};
use gatewatch_profiles::{DeviceProfile, DiscoveryOutcome};
use std::time::Duration;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    // ========================================================================
    // Poll Results
    // ========================================================================

    /// Formats one device's poll result.
    pub fn format_result(&self, device: &str, result: &PollResult) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "{} ({}) {}",
            self.bold(device),
            result.profile_id,
            self.status(result.status)
        ));

        if let Some(error) = &result.error {
            lines.push(format!("  {}", self.dim(error)));
        }

        let info = &result.system_info;
        if let Some(firmware) = &info.firmware_version {
            lines.push(format!("Firmware: {firmware}"));
        }
        if let Some(hardware) = &info.hardware_version {
            lines.push(format!("Hardware: {hardware}"));
        }
        if let Some(uptime) = info.uptime {
            lines.push(format!("Uptime:   {}", format_uptime(uptime)));
        }

        if !result.channels.is_empty() {
            lines.push(String::new());
            lines.push(self.format_downstream(result));
            if result.upstream_count() > 0 {
                lines.push(String::new());
                lines.push(self.format_upstream(result));
            }
        }

        if result.decode_error_count > 0 {
            lines.push(self.yellow(&format!("{} record(s) could not be decoded", result.decode_error_count)));
        }
        if result.reauthenticated {
            lines.push(self.dim("Session expired mid-cycle; logged in again"));
        }
        if let Some(raw) = &result.raw_capture {
            lines.push(format!("Raw capture: {} bytes", raw.len()));
        }

        lines.join("\n")
    }

    fn format_downstream(&self, result: &PollResult) -> String {
        let mut lines = vec![self.bold(&format!(
            "Downstream ({} channels, {} uncorrectable)",
            result.downstream_count(),
            result.total_uncorrected()
        ))];
        lines.push(self.dim(&format!(
            "{:>5} {:<10} {:<8} {:>10} {:>8} {:>7} {:>12} {:>12}",
            "ID", "Lock", "Type", "Freq MHz", "dBmV", "SNR", "Corrected", "Uncorr"
        )));
        for ch in result.downstream() {
            lines.push(format!(
                "{:>5} {} {:<8} {:>10} {:>8} {:>7} {:>12} {:>12}",
                ch.channel_id,
                self.lock(ch),
                ch.technology.label(),
                format_frequency(ch.frequency_hz),
                format_decimal(ch.power_dbmv),
                format_decimal(ch.snr_db),
                format_count(ch.corrected),
                format_count(ch.uncorrected),
            ));
        }
        lines.join("\n")
    }

    fn format_upstream(&self, result: &PollResult) -> String {
        let mut lines = vec![self.bold(&format!("Upstream ({} channels)", result.upstream_count()))];
        lines.push(self.dim(&format!(
            "{:>5} {:<10} {:<8} {:>10} {:>8}",
            "ID", "Lock", "Type", "Freq MHz", "dBmV"
        )));
        for ch in result.upstream() {
            lines.push(format!(
                "{:>5} {} {:<8} {:>10} {:>8}",
                ch.channel_id,
                self.lock(ch),
                ch.technology.label(),
                format_frequency(ch.frequency_hz),
                format_decimal(ch.power_dbmv),
            ));
        }
        lines.join("\n")
    }

    /// Header line for watch mode.
    pub fn format_watch_header(&self, interval: Duration) -> String {
        format!(
            "{} - {} (refresh: {}s)\n{}",
            self.bold("Gatewatch"),
            Local::now().format("%H:%M:%S"),
            interval.as_secs(),
            "─".repeat(60)
        )
    }

    // ========================================================================
    // Profiles
    // ========================================================================

    /// Formats the profile list header.
    pub fn format_profiles_header(&self) -> String {
        self.bold(&format!(
            "{:<22} {:<26} {:<16} {:<12} {}",
            "ID", "Device", "Auth", "Format", "Source"
        ))
    }

    /// Formats one profile line.
    pub fn format_profile_line(&self, profile: &DeviceProfile, user: bool) -> String {
        let source = if user { self.cyan("user") } else { self.dim("built-in") };
        format!(
            "{:<22} {:<26} {:<16} {:<12} {}",
            profile.id,
            profile.display_name(),
            profile.auth.kind().display_name(),
            profile.parser.name(),
            source
        )
    }

    // ========================================================================
    // Discovery
    // ========================================================================

    /// Formats a discovery outcome with the ranked candidates.
    pub fn format_discovery(&self, outcome: &DiscoveryOutcome) -> String {
        let mut lines = Vec::new();
        let selected = &outcome.selected.profile;

        if outcome.is_fallback() {
            lines.push(format!(
                "{} {}",
                self.yellow("No profile matched;"),
                "falling back to raw capture"
            ));
        } else {
            lines.push(format!(
                "Selected: {} ({})",
                self.green(&selected.display_name()),
                selected.id
            ));
        }
        lines.push(self.dim(&format!(
            "{} probe(s) in {} ms",
            outcome.probes.len(),
            outcome.duration.as_millis()
        )));

        lines.push(String::new());
        lines.push(self.bold("Probes"));
        for probe in &outcome.probes {
            let status = match (probe.status(), &probe.error) {
                (Some(code), _) => code.to_string(),
                (None, Some(error)) => self.red(error),
                (None, None) => "-".to_string(),
            };
            lines.push(format!("  {:<32} {} {}", probe.path, status, self.dim(&format!("{} ms", probe.response_time_ms))));
        }

        let matching: Vec<_> = outcome.candidates.iter().filter(|c| c.hints.is_match()).collect();
        if !matching.is_empty() {
            lines.push(String::new());
            lines.push(self.bold(&format!(
                "{:<4} {:<22} {:>8} {:>8} {:>6}",
                "Rank", "Profile", "Priority", "Matched", "Score"
            )));
            for (rank, candidate) in matching.iter().enumerate() {
                lines.push(format!(
                    "{:<4} {:<22} {:>8} {:>8} {:>6}",
                    rank + 1,
                    candidate.profile_id,
                    candidate.priority,
                    candidate.hints.matched,
                    candidate.hints.score
                ));
            }
        }

        lines.join("\n")
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn status(&self, status: PollStatus) -> String {
        let label = status.label();
        match status {
            PollStatus::Ok => self.green(label),
            PollStatus::Degraded => self.yellow(label),
            PollStatus::StaleSession | PollStatus::Failed => self.red(label),
        }
    }

    fn lock(&self, ch: &ChannelRecord) -> String {
        let label = format!("{:<10}", if ch.lock.is_locked() { "Locked" } else { "Not Locked" });
        if ch.lock.is_locked() { label } else { self.red(&label) }
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.colorize(text, BOLD)
    }

    fn dim(&self, text: &str) -> String {
        self.colorize(text, DIM)
    }

    fn green(&self, text: &str) -> String {
        self.colorize(text, GREEN)
    }

    fn yellow(&self, text: &str) -> String {
        self.colorize(text, YELLOW)
    }

    fn red(&self, text: &str) -> String {
        self.colorize(text, RED)
    }

    fn cyan(&self, text: &str) -> String {
        self.colorize(text, CYAN)
    }
}

// ============================================================================
// Value Formatting
// ============================================================================

/// Formats a frequency in MHz with one decimal.
#[allow(clippy::cast_precision_loss)]
pub fn format_frequency(hz: Option<u64>) -> String {
    hz.map_or_else(|| "-".to_string(), |hz| format!("{:.1}", hz as f64 / 1_000_000.0))
}

fn format_decimal(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"))
}

fn format_count(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Formats an uptime as `3d 04h 10m 33s`.
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let (days, rem) = (secs / 86_400, secs % 86_400);
    let (hours, rem) = (rem / 3_600, rem % 3_600);
    let (minutes, seconds) = (rem / 60, rem % 60);
    if days > 0 {
        format!("{days}d {hours:02}h {minutes:02}m {seconds:02}s")
    } else {
        format!("{hours:02}h {minutes:02}m {seconds:02}s")
    }
}
