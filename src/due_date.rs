use crate::error::{LensError, Result};
use chrono::{FixedOffset, Local, NaiveDate, TimeZone};

const DISPLAY_FORMAT: &str = "%a %d %b %Y %I:%M%p";

/// Renders service timestamps (`YYYY-MM-DDTHH:MM:SSZ`) in a fixed local offset.
#[derive(Clone, Copy, Debug)]
pub struct DueDateFormatter {
    offset: FixedOffset,
}

impl DueDateFormatter {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Captures the current local offset, DST included. It is not re-read later.
    pub fn local() -> Self {
        Self::new(*Local::now().offset())
    }

    #[cfg(test)]
    pub fn utc() -> Self {
        use chrono::{Offset, Utc};
        Self::new(Utc.fix())
    }

    pub fn format(&self, timestamp: &str) -> Result<String> {
        if timestamp.is_empty() {
            return Ok(String::new());
        }
        let invalid = || LensError::InvalidDate(timestamp.to_string());

        let bytes = timestamp.as_bytes();
        if bytes.len() != 20
            || !timestamp.is_ascii()
            || bytes[4] != b'-'
            || bytes[7] != b'-'
            || bytes[10] != b'T'
            || bytes[13] != b':'
            || bytes[16] != b':'
            || bytes[19] != b'Z'
        {
            return Err(invalid());
        }

        let field = |range: std::ops::Range<usize>| -> Result<u32> {
            timestamp[range].parse::<u32>().map_err(|_| invalid())
        };
        let year = field(0..4)? as i32;
        let month = field(5..7)?;
        let day = field(8..10)?;
        let hour = field(11..13)?;
        let minute = field(14..16)?;
        let second = field(17..19)?;

        let naive = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .ok_or_else(invalid)?;
        Ok(self
            .offset
            .from_utc_datetime(&naive)
            .format(DISPLAY_FORMAT)
            .to_string())
    }

    /// `format`, falling back to the raw value when it cannot be parsed.
    pub fn format_or_raw(&self, timestamp: &str) -> String {
        match self.format(timestamp) {
            Ok(pretty) => pretty,
            Err(err) => {
                log::warn!("{err}");
                timestamp.to_string()
            }
        }
    }
}
