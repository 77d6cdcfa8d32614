//! Display utilities for the productivity CLI.
//!
//! Rendering is split from printing so the text can be tested.

use std::io::Write;

use crate::types::{IpcResponse, TimerPhase, TimerStatus, WatchFrame};

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the message of a successful response and the timer it carries.
    pub fn show_action(response: &IpcResponse) {
        println!("* {}", response.message);

        if let Some(status) = response.data.as_ref().and_then(|d| d.timer.as_ref()) {
            println!("  {}", Self::render_summary(status));
        }
    }

    /// Shows the timer list.
    pub fn show_list(response: &IpcResponse) {
        let timers = response
            .data
            .as_ref()
            .and_then(|d| d.timers.as_deref())
            .unwrap_or_default();
        print!("{}", Self::render_list(timers));
    }

    /// Shows one timer in detail.
    pub fn show_timer(response: &IpcResponse) {
        match response.data.as_ref().and_then(|d| d.timer.as_ref()) {
            Some(status) => print!("{}", Self::render_timer(status)),
            None => println!("タイマー情報がありません"),
        }
    }

    /// Rewrites the current line with a watch frame.
    pub fn show_frame(frame: &WatchFrame) {
        print!("\r{}   ", Self::render_frame(frame));
        let _ = std::io::stdout().flush();
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("エラー: {}", message);
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    fn render_list(timers: &[TimerStatus]) -> String {
        if timers.is_empty() {
            return "タイマーはまだありません\n".to_string();
        }

        let mut out = String::new();
        for status in timers {
            out.push_str(&Self::render_summary(status));
            out.push('\n');
        }
        out
    }

    fn render_summary(status: &TimerStatus) -> String {
        let id = status
            .config
            .id
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        format!(
            "[{}] {} ({}) {}",
            id,
            status.config.name,
            Self::phase_label(status),
            Self::remaining(status.remaining_seconds)
        )
    }

    fn render_timer(status: &TimerStatus) -> String {
        let config = &status.config;
        let mut out = String::new();

        out.push_str(&format!("{}\n", config.name));
        out.push_str("─────────────────────────────\n");
        if !config.description.is_empty() {
            out.push_str(&format!("説明: {}\n", config.description));
        }
        out.push_str(&format!("作業時間: {}\n", Self::format_time(config.timer_length)));
        out.push_str(&format!("休憩時間: {}\n", Self::format_time(config.break_length)));
        out.push_str(&format!("状態: {}\n", Self::phase_label(status)));
        out.push_str(&format!(
            "残り時間: {}\n",
            Self::remaining(status.remaining_seconds)
        ));
        out
    }

    fn render_frame(frame: &WatchFrame) -> String {
        format!(
            "{} {}",
            Self::phase_name(frame.phase),
            Self::format_time(frame.remaining_seconds)
        )
    }

    fn phase_label(status: &TimerStatus) -> String {
        if status.is_paused() {
            format!("一時停止中・{}", Self::phase_name(status.pending_phase))
        } else {
            Self::phase_name(status.phase).to_string()
        }
    }

    fn phase_name(phase: TimerPhase) -> &'static str {
        match phase {
            TimerPhase::Idle => "待機中",
            TimerPhase::Working => "作業中",
            TimerPhase::OnBreak => "休憩中",
        }
    }

    fn remaining(seconds: Option<u32>) -> String {
        seconds.map_or_else(|| "--:--".to_string(), Self::format_time)
    }

    /// Formats seconds as `m:ss`.
    fn format_time(total_seconds: u32) -> String {
        format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimerConfig;

    fn status(phase: TimerPhase, pending: TimerPhase, remaining: Option<u32>) -> TimerStatus {
        TimerStatus {
            config: TimerConfig::new("Focus", "Write the report", 1500, 300).with_id(2),
            phase,
            pending_phase: pending,
            remaining_seconds: remaining,
        }
    }

    // ------------------------------------------------------------------------
    // Format Time Tests
    // ------------------------------------------------------------------------

    mod format_time_tests {
        use super::*;

        #[test]
        fn test_format_time_zero() {
            assert_eq!(Display::format_time(0), "0:00");
        }

        #[test]
        fn test_format_time_seconds_only() {
            assert_eq!(Display::format_time(45), "0:45");
        }

        #[test]
        fn test_format_time_25_minutes() {
            assert_eq!(Display::format_time(25 * 60), "25:00");
        }

        #[test]
        fn test_format_time_large() {
            assert_eq!(Display::format_time(120 * 60 + 59), "120:59");
        }
    }

    // ------------------------------------------------------------------------
    // Rendering Tests
    // ------------------------------------------------------------------------

    mod render_tests {
        use super::*;

        #[test]
        fn test_summary_idle() {
            let s = status(TimerPhase::Idle, TimerPhase::Idle, Some(1500));
            assert_eq!(Display::render_summary(&s), "[2] Focus (待機中) 25:00");
        }

        #[test]
        fn test_summary_paused_shows_pending_phase() {
            let s = status(TimerPhase::Idle, TimerPhase::OnBreak, Some(42));
            assert_eq!(
                Display::render_summary(&s),
                "[2] Focus (一時停止中・休憩中) 0:42"
            );
        }

        #[test]
        fn test_summary_without_emission() {
            let s = status(TimerPhase::Working, TimerPhase::Idle, None);
            assert!(Display::render_summary(&s).ends_with("(作業中) --:--"));
        }

        #[test]
        fn test_render_timer_details() {
            let s = status(TimerPhase::Working, TimerPhase::Idle, Some(1499));
            let text = Display::render_timer(&s);

            assert!(text.starts_with("Focus\n"));
            assert!(text.contains("説明: Write the report"));
            assert!(text.contains("作業時間: 25:00"));
            assert!(text.contains("休憩時間: 5:00"));
            assert!(text.contains("状態: 作業中"));
            assert!(text.contains("残り時間: 24:59"));
        }

        #[test]
        fn test_render_timer_omits_empty_description() {
            let mut s = status(TimerPhase::Idle, TimerPhase::Idle, Some(1500));
            s.config.description.clear();
            assert!(!Display::render_timer(&s).contains("説明"));
        }

        #[test]
        fn test_render_empty_list() {
            assert_eq!(Display::render_list(&[]), "タイマーはまだありません\n");
        }

        #[test]
        fn test_render_list_one_line_per_timer() {
            let timers = vec![
                status(TimerPhase::Idle, TimerPhase::Idle, Some(1500)),
                status(TimerPhase::OnBreak, TimerPhase::Idle, Some(10)),
            ];
            assert_eq!(Display::render_list(&timers).lines().count(), 2);
        }

        #[test]
        fn test_render_frame() {
            let frame = WatchFrame {
                remaining_seconds: 61,
                phase: TimerPhase::OnBreak,
            };
            assert_eq!(Display::render_frame(&frame), "休憩中 1:01");
        }
    }
}
