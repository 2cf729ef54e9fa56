//! User-facing wording for lockouts and session countdowns.
//!
//! The portal serves Thai and English speakers; the UI picks a [`Locale`] and
//! renders whatever these helpers return.

use chrono::Duration;

/// Language of user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    English,
    Thai,
}

/// Formats a session countdown as minutes and seconds.
///
/// ```rust
/// use chrono::Duration;
/// use coopguard::messages::format_session_time;
/// use coopguard::Locale;
///
/// assert_eq!(format_session_time(Duration::seconds(270), Locale::English), "4 min 30 sec");
/// assert_eq!(format_session_time(Duration::seconds(45), Locale::Thai), "45 วินาที");
/// ```
pub fn format_session_time(time: Duration, locale: Locale) -> String {
    let total_secs = time.num_seconds().max(0);
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;

    match (locale, minutes > 0) {
        (Locale::English, true) => format!("{minutes} min {seconds} sec"),
        (Locale::English, false) => format!("{seconds} sec"),
        (Locale::Thai, true) => format!("{minutes} นาที {seconds} วินาที"),
        (Locale::Thai, false) => format!("{seconds} วินาที"),
    }
}

/// Message shown while an identifier is locked out.
///
/// Rounds up (to whole seconds, then to whole minutes from a minute on)
/// so the countdown never promises less than the real block.
pub fn wait_time_message(wait: Duration, locale: Locale) -> String {
    let secs = wait.num_milliseconds().max(1).saturating_add(999) / 1000;
    if secs < 60 {
        return match locale {
            Locale::English => {
                format!("Too many attempts. Please try again in {secs} second(s).")
            }
            Locale::Thai => {
                format!("พยายามเข้าสู่ระบบมากเกินไป กรุณาลองใหม่ในอีก {secs} วินาที")
            }
        };
    }

    let minutes = (secs + 59) / 60;
    match locale {
        Locale::English => format!("Too many attempts. Please try again in {minutes} minute(s)."),
        Locale::Thai => format!("พยายามเข้าสู่ระบบมากเกินไป กรุณาลองใหม่ในอีก {minutes} นาที"),
    }
}

/// Attempts left in the current window, e.g. "2 attempt(s) remaining".
pub fn remaining_attempts_message(remaining: u32, locale: Locale) -> String {
    match locale {
        Locale::English => format!("{remaining} attempt(s) remaining"),
        Locale::Thai => format!("เหลือความพยายามในการเข้าสู่ระบบ {remaining} ครั้ง"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_session_time() {
        assert_eq!(
            format_session_time(Duration::minutes(5), Locale::English),
            "5 min 0 sec"
        );
        assert_eq!(
            format_session_time(Duration::seconds(59), Locale::English),
            "59 sec"
        );
        assert_eq!(
            format_session_time(Duration::seconds(61), Locale::Thai),
            "1 นาที 1 วินาที"
        );
    }

    #[test]
    fn test_format_session_time_negative_is_zero() {
        assert_eq!(
            format_session_time(Duration::seconds(-10), Locale::English),
            "0 sec"
        );
    }

    #[test]
    fn test_wait_time_rounds_up_to_minutes() {
        assert_eq!(
            wait_time_message(Duration::seconds(61), Locale::English),
            "Too many attempts. Please try again in 2 minute(s)."
        );
        assert_eq!(
            wait_time_message(Duration::minutes(1), Locale::English),
            "Too many attempts. Please try again in 1 minute(s)."
        );
    }

    #[test]
    fn test_wait_time_under_a_minute() {
        assert_eq!(
            wait_time_message(Duration::seconds(12), Locale::Thai),
            "พยายามเข้าสู่ระบบมากเกินไป กรุณาลองใหม่ในอีก 12 วินาที"
        );
    }

    #[test]
    fn test_remaining_attempts_message() {
        assert_eq!(
            remaining_attempts_message(3, Locale::English),
            "3 attempt(s) remaining"
        );
        assert_eq!(
            remaining_attempts_message(3, Locale::Thai),
            "เหลือความพยายามในการเข้าสู่ระบบ 3 ครั้ง"
        );
    }

    #[test]
    fn test_wait_time_rounds_up_partial_seconds() {
        assert_eq!(
            wait_time_message(Duration::milliseconds(59_900), Locale::English),
            "Too many attempts. Please try again in 1 minute(s)."
        );
        assert_eq!(
            wait_time_message(Duration::milliseconds(30_001), Locale::English),
            "Too many attempts. Please try again in 31 second(s)."
        );
        assert_eq!(
            wait_time_message(Duration::milliseconds(60_001), Locale::Thai),
            "พยายามเข้าสู่ระบบมากเกินไป กรุณาลองใหม่ในอีก 2 นาที"
        );
    }
}
