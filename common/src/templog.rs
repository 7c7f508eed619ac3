//! Append-only temperature log: one tab-separated line per unit report,
//! `YYYY\tMM\tDD\tHH\tMM\t<temp>`.

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use serde::Serialize;

/// First line of a fresh log file.
pub const LOG_HEADER: &str = "year\tmonth\tdate\thour\tminute\ttemp\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TemperatureSample {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub temp: i32,
}

pub fn format_line<Tz: TimeZone>(now: &DateTime<Tz>, temp: i32) -> String {
    format!(
        "{:04}\t{:02}\t{:02}\t{:02}\t{:02}\t{}\n",
        now.year(),
        now.month(),
        now.day(),
        now.hour(),
        now.minute(),
        temp
    )
}

pub fn parse_line(line: &str) -> Option<TemperatureSample> {
    let mut parts = line.trim_end_matches(['\r', '\n']).split('\t');
    let sample = TemperatureSample {
        year: parts.next()?.trim().parse().ok()?,
        month: parts.next()?.trim().parse().ok()?,
        day: parts.next()?.trim().parse().ok()?,
        hour: parts.next()?.trim().parse().ok()?,
        minute: parts.next()?.trim().parse().ok()?,
        temp: parts.next()?.trim().parse().ok()?,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(sample)
}

/// Parses every well-formed line, skipping the header and anything damaged.
pub fn parse_log(contents: &str) -> Vec<TemperatureSample> {
    contents.lines().filter_map(parse_line).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use pretty_assertions::assert_eq;

    #[test]
    fn formats_zero_padded_line() {
        let now = FixedOffset::east_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 2, 7, 6, 5, 0)
            .unwrap();
        assert_eq!(format_line(&now, 28), "2026\t02\t07\t06\t05\t28\n");
    }

    #[test]
    fn parses_log_and_skips_noise() {
        let contents = format!(
            "{LOG_HEADER}2026\t02\t07\t06\t05\t28\n2026\t02\t07\t06\n\n2026\t02\t07\t06\t20\t-2\r\n"
        );

        let samples = parse_log(&contents);

        assert_eq!(
            samples,
            vec![
                TemperatureSample {
                    year: 2026,
                    month: 2,
                    day: 7,
                    hour: 6,
                    minute: 5,
                    temp: 28,
                },
                TemperatureSample {
                    year: 2026,
                    month: 2,
                    day: 7,
                    hour: 6,
                    minute: 20,
                    temp: -2,
                },
            ]
        );
    }

    #[test]
    fn rejects_extra_columns() {
        assert_eq!(parse_line("2026\t02\t07\t06\t05\t28\t1"), None);
    }
}
