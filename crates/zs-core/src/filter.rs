//! # Feed Filters
//!
//! Query-side types shared by every `PostRepo` implementation: the location
//! substring and the `today` / `weekend` time windows.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};

/// Named lower bounds on `created_at` offered by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    #[default]
    All,
    Today,
    Weekend,
}

impl TimeWindow {
    /// Lenient parse of the `time` query parameter. Anything unrecognised
    /// means no bound.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("today") => Self::Today,
            Some("weekend") => Self::Weekend,
            _ => Self::All,
        }
    }

    /// Start of the window, evaluated in `now`'s time zone.
    ///
    /// `Weekend` starts at midnight of the most recent Friday, which is today
    /// when `now` falls on a Friday.
    pub fn since<Tz: TimeZone>(self, now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
        let today = now.date_naive();
        let start = match self {
            Self::All => return None,
            Self::Today => today,
            Self::Weekend => {
                let days_back = (now.weekday().num_days_from_sunday() + 2) % 7;
                today - TimeDelta::days(days_back.into())
            }
        };
        Some(local_midnight(&now.timezone(), start))
    }
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        // midnight skipped by a DST transition
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Criteria for `PostRepo::list_posts`. The default matches every post.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFilter {
    /// Case-insensitive substring of `location`.
    pub location: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub created_after: Option<DateTime<Utc>>,
}

impl PostFilter {
    pub fn new<Tz: TimeZone>(location: Option<String>, window: TimeWindow, now: &DateTime<Tz>) -> Self {
        Self {
            location: location.filter(|l| !l.is_empty()),
            created_after: window.since(now),
        }
    }

    /// `LIKE` pattern for the location filter, to be used with `ESCAPE '\'`.
    pub fn location_pattern(&self) -> Option<String> {
        self.location
            .as_deref()
            .map(|l| format!("%{}%", escape_like(l)))
    }
}

/// Escapes `LIKE` metacharacters so user text matches literally.
pub fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    fn utc(rfc3339: &str) -> DateTime<Utc> {
        at(rfc3339).with_timezone(&Utc)
    }

    #[test]
    fn parse_is_lenient() {
        assert_eq!(TimeWindow::parse(Some("today")), TimeWindow::Today);
        assert_eq!(TimeWindow::parse(Some("weekend")), TimeWindow::Weekend);
        assert_eq!(TimeWindow::parse(Some("all")), TimeWindow::All);
        assert_eq!(TimeWindow::parse(Some("TODAY")), TimeWindow::All);
        assert_eq!(TimeWindow::parse(None), TimeWindow::All);
    }

    #[test]
    fn all_has_no_bound() {
        assert_eq!(TimeWindow::All.since(&at("2026-10-19T15:30:00+02:00")), None);
    }

    #[test]
    fn today_starts_at_local_midnight() {
        let since = TimeWindow::Today.since(&at("2026-10-19T15:30:00+02:00"));
        assert_eq!(since, Some(utc("2026-10-19T00:00:00+02:00")));
        assert_eq!(since, Some(utc("2026-10-18T22:00:00Z")));
    }

    #[test]
    fn weekend_reaches_back_to_friday() {
        // 2026-10-16 is a Friday.
        let friday = Some(utc("2026-10-16T00:00:00-05:00"));
        for now in [
            "2026-10-16T09:00:00-05:00", // Friday
            "2026-10-17T23:59:59-05:00", // Saturday
            "2026-10-18T12:00:00-05:00", // Sunday
            "2026-10-19T08:00:00-05:00", // Monday
            "2026-10-22T20:00:00-05:00", // Thursday
        ] {
            assert_eq!(TimeWindow::Weekend.since(&at(now)), friday, "now = {now}");
        }

        // The following Friday starts a new window.
        assert_eq!(
            TimeWindow::Weekend.since(&at("2026-10-23T00:00:01-05:00")),
            Some(utc("2026-10-23T00:00:00-05:00"))
        );
    }

    #[test]
    fn filter_drops_empty_location() {
        let now = at("2026-10-19T10:00:00Z");
        let filter = PostFilter::new(Some(String::new()), TimeWindow::All, &now);
        assert_eq!(filter, PostFilter::default());
        assert_eq!(filter.location_pattern(), None);
    }

    #[test]
    fn location_pattern_escapes_wildcards() {
        let now = at("2026-10-19T10:00:00Z");
        let filter = PostFilter::new(Some("100%_pow\\der".into()), TimeWindow::Today, &now);
        assert_eq!(filter.location_pattern().as_deref(), Some("%100\\%\\_pow\\\\der%"));
        assert_eq!(filter.created_after, Some(utc("2026-10-19T00:00:00Z")));
    }
}
