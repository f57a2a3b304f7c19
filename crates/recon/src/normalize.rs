//! Cell-level normalization: dates and monetary amounts as they appear in
//! delivery partner exports (day-first dates, Brazilian number formatting).

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::table::Cell;

/// Excel serial dates count days from 1899-12-30 (1900 leap-year bug included).
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
/// Largest serial Excel accepts (9999-12-31).
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 || serial > EXCEL_MAX_SERIAL {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc() as i64;
    let secs = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::days(days) + Duration::seconds(secs))
}

/// Calendar date of a cell. Time-of-day is discarded.
///
/// Text is read day-first (`dd/mm/yyyy`, `dd-mm-yy`, `dd.mm.yyyy`) unless the
/// first component has four digits, in which case it is `yyyy-mm-dd`.
/// Anything after the date (a time, separated by whitespace or `T`) is ignored.
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(dt) => Some(dt.date()),
        Cell::Number(n) => excel_serial_to_datetime(*n).map(|dt| dt.date()),
        Cell::Text(s) => parse_date_str(s),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

pub fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let date_part = s
        .split(|c: char| c.is_whitespace() || c == 'T')
        .next()
        .unwrap_or(s);

    // Serial number exported as text
    if date_part.chars().all(|c| c.is_ascii_digit() || c == '.') && !date_part.contains('/') {
        if let Ok(serial) = date_part.parse::<f64>() {
            if date_part.matches('.').count() <= 1 {
                return excel_serial_to_datetime(serial).map(|dt| dt.date());
            }
        }
    }

    let parts: Vec<&str> = date_part.split(['/', '-', '.']).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }

    let (year, month, day) = if parts[0].len() == 4 {
        (parts[0], parts[1], parts[2])
    } else {
        (parts[2], parts[1], parts[0])
    };

    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    let year: i32 = match year.len() {
        2 => {
            let yy: i32 = year.parse().ok()?;
            if yy < 70 { 2000 + yy } else { 1900 + yy }
        }
        4 => year.parse().ok()?,
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Amount of a cell in integer centavos, rounded half away from zero.
pub fn parse_amount(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Number(n) => to_cents(*n),
        Cell::Text(s) => parse_amount_str(s),
        Cell::Empty | Cell::Date(_) | Cell::Bool(_) => None,
    }
}

/// Parse a formatted amount: `R$ 1.234,56`, `1,234.56`, `(45,00)`, `-12.5`.
///
/// When both `,` and `.` are present the rightmost one is the decimal
/// separator. A lone separator occurring once is decimal; repeated, it groups
/// thousands. Parentheses mean negative.
pub fn parse_amount_str(s: &str) -> Option<i64> {
    let mut t: String = s
        .trim()
        .replace("R$", "")
        .replace('$', "")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();

    if t.is_empty() {
        return None;
    }

    let mut negative = false;
    if t.starts_with('(') && t.ends_with(')') {
        negative = true;
        t = t[1..t.len() - 1].to_string();
    }
    if let Some(rest) = t.strip_prefix('-') {
        negative = !negative;
        t = rest.to_string();
    } else if let Some(rest) = t.strip_prefix('+') {
        t = rest.to_string();
    }

    let commas = t.matches(',').count();
    let dots = t.matches('.').count();
    let canonical = match (commas, dots) {
        (0, 0) => t,
        (_, 0) if commas == 1 => t.replace(',', "."),
        (_, 0) => t.replace(',', ""),
        (0, 1) => t,
        (0, _) => t.replace('.', ""),
        _ => {
            let last_comma = t.rfind(',').unwrap_or(0);
            let last_dot = t.rfind('.').unwrap_or(0);
            if last_comma > last_dot {
                t.replace('.', "").replace(',', ".")
            } else {
                t.replace(',', "")
            }
        }
    };

    if canonical.is_empty() || !canonical.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let value: f64 = canonical.parse().ok()?;
    to_cents(if negative { -value } else { value })
}

fn to_cents(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let cents = (value * 100.0).round();
    if cents.abs() > i64::MAX as f64 {
        return None;
    }
    Some(cents as i64)
}

/// Format centavos as Brazilian currency: `R$ 1.234,56`.
pub fn format_brl(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let units = (abs / 100).to_string();
    let frac = abs % 100;

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, ch) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    format!("{sign}R$ {grouped},{frac:02}")
}

/// Format centavos as a plain decimal: `1234.56`.
pub fn format_decimal(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
