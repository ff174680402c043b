//! `DD/MM/YY` display dates.
//!
//! Two-digit years always map to 2000 + YY. Anything that does not parse
//! sorts as the Unix epoch rather than failing.

use chrono::{Local, NaiveDate};

/// Display format written into every new post.
pub const DISPLAY_FORMAT: &str = "%d/%m/%y";

/// Today's local date as `DD/MM/YY`.
pub fn today() -> String {
    format_display_date(Local::now().date_naive())
}

pub fn format_display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

/// Parse a `DD/MM/YY` string. Returns `None` for anything else.
pub fn parse_display_date(value: &str) -> Option<NaiveDate> {
    let mut parts = value.trim().split('/');
    let (Some(dd), Some(mm), Some(yy), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    let day: u32 = dd.trim().parse().ok()?;
    let month: u32 = mm.trim().parse().ok()?;
    let yy = yy.trim();
    if yy.len() > 2 || !yy.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year: i32 = yy.parse().ok()?;
    NaiveDate::from_ymd_opt(2000i32.checked_add(year)?, month, day)
}

/// Sort key for a display date; unparseable values sort first.
pub fn sort_key(value: &str) -> NaiveDate {
    parse_display_date(value).unwrap_or_else(epoch)
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}
