//! Display of numeric cell values under their number format.
//!
//! Only the formats that change how a number reads are honoured: fixed
//! decimals, thousands separators, percentages and dates. Everything else
//! falls back to the general format.

use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Built-in format codes by `numFmtId`.
pub fn builtin_format_code(id: u32) -> Option<&'static str> {
    Some(match id {
        0 => "General",
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        14 => "yyyy-mm-dd",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "yyyy-mm-dd h:mm",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        49 => "@",
        _ => return None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFormat {
    General,
    Fixed { decimals: usize, thousands: bool },
    Percent { decimals: usize },
    Date,
    DateTime,
    Time,
    Text,
}

impl NumberFormat {
    /// Classify a format code such as `#,##0.00` or `dd/mm/yyyy hh:mm`.
    pub fn from_code(code: &str) -> Self {
        // Only the first section (positive numbers) matters here.
        let section = code.split(';').next().unwrap_or_default();
        let bare = strip_literals(section);
        let lower = bare.to_ascii_lowercase();

        if lower.is_empty() || lower == "general" {
            return Self::General;
        }
        if lower == "@" {
            return Self::Text;
        }

        let has_date = lower.contains('y') || lower.contains('d');
        let has_time = lower.contains('h') || lower.contains('s');
        if has_date || has_time || (lower.contains('m') && !lower.contains('0')) {
            return match (has_date || !has_time, has_time) {
                (true, true) => Self::DateTime,
                (true, false) => Self::Date,
                _ => Self::Time,
            };
        }

        let decimals = lower
            .split_once('.')
            .map(|(_, frac)| frac.chars().take_while(|c| matches!(c, '0' | '#')).count())
            .unwrap_or(0);
        if lower.contains('%') {
            return Self::Percent { decimals };
        }
        if lower.contains('0') || lower.contains('#') {
            return Self::Fixed {
                decimals,
                thousands: lower.contains(','),
            };
        }
        Self::General
    }

    /// Render a numeric cell. `date1904` selects the workbook's date epoch.
    pub fn format(self, value: f64, date1904: bool) -> String {
        match self {
            Self::General | Self::Text => format_general(value),
            Self::Fixed { decimals, thousands } => format_fixed(value, decimals, thousands),
            Self::Percent { decimals } => format!("{:.*}%", decimals, value * 100.0),
            Self::Date | Self::DateTime | Self::Time => match serial_to_datetime(value, date1904) {
                Some(dt) => match self {
                    Self::Date if dt.time() == chrono::NaiveTime::MIN => dt.format("%Y-%m-%d").to_string(),
                    Self::Time => dt.format("%H:%M:%S").to_string(),
                    _ => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
                },
                None => format_general(value),
            },
        }
    }
}

/// Drop quoted literals, escapes and bracketed sections (colours, locales).
fn strip_literals(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut chars = code.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                for q in chars.by_ref() {
                    if q == '"' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            '[' => {
                let inner: String = chars.by_ref().take_while(|&b| b != ']').collect();
                // Elapsed-time markers such as [h] still mean "time".
                if matches!(inner.to_ascii_lowercase().as_str(), "h" | "hh" | "m" | "mm" | "s" | "ss") {
                    out.push_str(&inner);
                }
            }
            other => out.push(other),
        }
    }
    out.trim().to_string()
}

/// Integers without a fraction; other values in shortest round-trip form.
pub fn format_general(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn format_fixed(value: f64, decimals: usize, thousands: bool) -> String {
    let rendered = format!("{:.*}", decimals, value);
    if !thousands {
        return rendered;
    }
    let (sign, digits) = match rendered.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rendered.as_str()),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

/// Convert a spreadsheet serial date.
///
/// The 1900 system counts the non-existent 1900-02-29, so serials before 60
/// are shifted by a day.
pub fn serial_to_datetime(serial: f64, date1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = if date1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else if serial < 60.0 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let days = serial.trunc() as i64;
    let seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    epoch
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_formats() {
        let cases = [
            (0, 1234.5, "1234.5"),
            (1, 1234.4, "1234"),
            (2, 3.14159, "3.14"),
            (3, 1234567.0, "1,234,567"),
            (4, -1234.5, "-1,234.50"),
            (9, 0.256, "26%"),
            (10, 0.256, "25.60%"),
        ];
        for (id, value, expected) in cases {
            let code = builtin_format_code(id).unwrap();
            assert_eq!(NumberFormat::from_code(code).format(value, false), expected, "numFmtId {}", id);
        }
    }

    #[test]
    fn test_general_integers_have_no_fraction() {
        assert_eq!(format_general(42.0), "42");
        assert_eq!(format_general(0.1), "0.1");
    }

    #[test]
    fn test_dates_are_iso() {
        let date = NumberFormat::from_code("yyyy-mm-dd");
        assert_eq!(date, NumberFormat::Date);
        assert_eq!(date.format(45292.0, false), "2024-01-01");
        assert_eq!(
            NumberFormat::from_code("dd/mm/yyyy hh:mm").format(45292.5, false),
            "2024-01-01 12:00:00"
        );
        assert_eq!(NumberFormat::from_code("h:mm:ss").format(0.75, false), "18:00:00");
        assert_eq!(NumberFormat::Date.format(0.0, true), "1904-01-01");
    }

    #[test]
    fn test_literals_and_colours_ignored() {
        assert_eq!(
            NumberFormat::from_code("[Red]#,##0.00\" USD\";-#,##0.00"),
            NumberFormat::Fixed {
                decimals: 2,
                thousands: true
            }
        );
        assert_eq!(NumberFormat::from_code("[h]:mm:ss"), NumberFormat::Time);
        assert_eq!(NumberFormat::from_code("@"), NumberFormat::Text);
    }

    #[test]
    fn test_early_serials_skip_phantom_leap_day() {
        let dt = serial_to_datetime(1.0, false).unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "1900-01-01");
        let dt = serial_to_datetime(61.0, false).unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "1900-03-01");
    }
}
