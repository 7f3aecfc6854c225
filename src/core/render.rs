//! User-facing message rendering and chunking
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.0.0: Event/notice blocks, reminder text, countdown formatting

use chrono::{Duration, NaiveDateTime};

use crate::core::models::{Event, Notice};
use crate::core::validate::{DATE_FORMAT, TIME_FORMAT};

/// Chat message content limit (Telegram-style 4096 characters).
pub const MESSAGE_LIMIT: usize = 4096;

/// Split text into pieces that fit the outbound message limit.
///
/// Splits at line boundaries where possible and falls back to character
/// boundaries for single lines longer than the limit, so chunks are always
/// valid UTF-8.
pub fn chunk_text(text: &str, max_size: usize) -> Vec<String> {
    if text.len() <= max_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if !current.is_empty() && current.len() + line.len() + 1 > max_size {
            chunks.push(current.trim_end().to_string());
            current.clear();
        }
        if line.len() >= max_size {
            // A single oversized line gets split on char boundaries.
            let mut piece = String::new();
            for ch in line.chars() {
                if piece.len() + ch.len_utf8() > max_size {
                    chunks.push(piece.clone());
                    piece.clear();
                }
                piece.push(ch);
            }
            if !piece.is_empty() {
                current = piece;
                current.push('\n');
            }
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    if !current.trim_end().is_empty() {
        chunks.push(current.trim_end().to_string());
    }
    chunks
}

/// Chunk text for outbound chat messages.
pub fn chunk_for_message(text: &str) -> Vec<String> {
    chunk_text(text, MESSAGE_LIMIT)
}

/// One event as a numbered list entry.
pub fn event_list_item(position: usize, event: &Event) -> String {
    format!(
        "#{} {}\n   Date: {}\n   Time: {}\n   Description: {}\n   Notice slots left: {}",
        position,
        event.name,
        event.date.format(DATE_FORMAT),
        event.time.format(TIME_FORMAT),
        event.description,
        event.notice_quota
    )
}

/// All of a user's events as one numbered listing.
pub fn event_list(events: &[Event]) -> String {
    let items: Vec<String> = events
        .iter()
        .enumerate()
        .map(|(i, event)| event_list_item(i + 1, event))
        .collect();
    items.join("\n\n")
}

/// Detail block for the currently selected event.
pub fn event_block(event: &Event) -> String {
    format!(
        "📌 {}\nDate: {}\nTime: {}\nDescription: {}\nNotice slots left: {}",
        event.name,
        event.date.format(DATE_FORMAT),
        event.time.format(TIME_FORMAT),
        event.description,
        event.notice_quota
    )
}

/// Numbered notice listing for one event.
pub fn notice_list(event: &Event, notices: &[Notice]) -> String {
    let mut out = format!("🔔 Notices for \"{}\":", event.name);
    for (i, notice) in notices.iter().enumerate() {
        out.push_str(&format!(
            "\n#{} {} at {}",
            i + 1,
            notice.date.format(DATE_FORMAT),
            notice.time.format(TIME_FORMAT)
        ));
    }
    out
}

/// Human-readable countdown at minute granularity.
pub fn countdown(duration: Duration) -> String {
    let total_minutes = duration.num_minutes();
    if total_minutes < 1 {
        return "less than a minute".to_string();
    }

    let days = total_minutes / 1440;
    let hours = (total_minutes % 1440) / 60;
    let minutes = total_minutes % 60;

    if days > 0 {
        if hours > 0 {
            format!(
                "{} day{} {} hour{}",
                days,
                if days == 1 { "" } else { "s" },
                hours,
                if hours == 1 { "" } else { "s" }
            )
        } else {
            format!("{} day{}", days, if days == 1 { "" } else { "s" })
        }
    } else if hours > 0 {
        if minutes > 0 {
            format!(
                "{} hour{} {} minute{}",
                hours,
                if hours == 1 { "" } else { "s" },
                minutes,
                if minutes == 1 { "" } else { "s" }
            )
        } else {
            format!("{} hour{}", hours, if hours == 1 { "" } else { "s" })
        }
    } else {
        format!("{} minute{}", minutes, if minutes == 1 { "" } else { "s" })
    }
}

/// The message delivered when a reminder fires.
pub fn reminder_message(event: &Event, notice_at: NaiveDateTime) -> String {
    let until = event.starts_at() - notice_at;
    format!(
        "🔔 Reminder: {}\nStarts {} at {} (in {}).\nDescription: {}",
        event.name,
        event.date.format(DATE_FORMAT),
        event.time.format(TIME_FORMAT),
        countdown(until),
        event.description
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::UserId;
    use chrono::{NaiveDate, NaiveTime};

    fn sample_event() -> Event {
        Event {
            id: 1,
            owner: UserId::from_raw("7"),
            date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            name: "Standup review".to_string(),
            description: "weekly sync".to_string(),
            notice_quota: 7,
        }
    }

    #[test]
    fn test_short_text_no_chunk() {
        assert_eq!(chunk_text("hello", 100), vec!["hello"]);
    }

    #[test]
    fn test_chunk_respects_lines() {
        let text = "line1\nline2\nline3";
        let result = chunk_text(text, 12);
        assert!(result.len() >= 2);
        for chunk in &result {
            assert!(!chunk.ends_with('\n'));
            assert!(chunk.len() <= 12);
        }
    }

    #[test]
    fn test_chunk_handles_long_lines() {
        let long_line = "a".repeat(100);
        let result = chunk_text(&long_line, 30);
        assert!(result.len() >= 3);
        for chunk in &result {
            assert!(chunk.len() <= 30);
        }
    }

    #[test]
    fn test_chunk_utf8_safety() {
        let text = "задача 世界 ".repeat(600);
        for chunk in chunk_for_message(&text) {
            assert!(chunk.len() <= MESSAGE_LIMIT);
            assert!(chunk.chars().count() > 0);
        }
    }

    #[test]
    fn test_event_list_is_numbered_from_one() {
        let listing = event_list(&[sample_event(), sample_event()]);
        assert!(listing.contains("#1 Standup review"));
        assert!(listing.contains("#2 Standup review"));
        assert!(listing.contains("Notice slots left: 7"));
    }

    #[test]
    fn test_notice_list_shows_dates_and_times() {
        let event = sample_event();
        let notice = Notice {
            id: 3,
            event_id: 1,
            date: NaiveDate::from_ymd_opt(2026, 8, 30).unwrap(),
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        };
        let listing = notice_list(&event, &[notice]);
        assert!(listing.contains("Standup review"));
        assert!(listing.contains("#1 2026-08-30 at 09:00"));
    }

    #[test]
    fn test_countdown() {
        assert_eq!(countdown(Duration::seconds(30)), "less than a minute");
        assert_eq!(countdown(Duration::minutes(1)), "1 minute");
        assert_eq!(countdown(Duration::minutes(45)), "45 minutes");
        assert_eq!(countdown(Duration::minutes(60)), "1 hour");
        assert_eq!(countdown(Duration::minutes(61)), "1 hour 1 minute");
        assert_eq!(countdown(Duration::hours(26)), "1 day 2 hours");
        assert_eq!(countdown(Duration::days(3)), "3 days");
    }

    #[test]
    fn test_reminder_message_includes_countdown() {
        let event = sample_event();
        let notice_at = NaiveDate::from_ymd_opt(2026, 8, 30)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(10, 30, 0).unwrap());
        let text = reminder_message(&event, notice_at);
        assert!(text.contains("Standup review"));
        assert!(text.contains("2026-09-01 at 10:30"));
        assert!(text.contains("in 2 days"));
    }
}
