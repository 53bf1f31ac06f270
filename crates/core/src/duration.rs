//! Human-readable period strings ("10min", "1D", "2h30m") and tick conversion.

use chrono::Duration;

use crate::error::{CoreError, Result};

/// Parse a human-readable duration string into a [`Duration`].
///
/// Supports components `Xw`, `Xd`/`XD`, `Xh`/`XH`, `Xmin`/`Xm`/`XT`,
/// `Xs`/`XS` and `Xms`. Components can be combined: "2h30m", "1d12h".
/// A bare number is read as seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidDuration(s.to_string()));
    }

    let mut total_ms: i64 = 0;
    let mut num_buf = String::new();
    let mut unit_buf = String::new();
    let mut found_unit = false;

    let invalid = || CoreError::InvalidDuration(s.to_string());

    for ch in trimmed.chars() {
        if ch.is_ascii_digit() {
            if !unit_buf.is_empty() {
                let ms = component_ms(&num_buf, &unit_buf).ok_or_else(invalid)?;
                total_ms = total_ms.checked_add(ms).ok_or_else(invalid)?;
                num_buf.clear();
                unit_buf.clear();
            }
            num_buf.push(ch);
        } else if ch.is_ascii_alphabetic() {
            if num_buf.is_empty() {
                return Err(invalid());
            }
            unit_buf.push(ch);
            found_unit = true;
        } else if !ch.is_whitespace() {
            return Err(invalid());
        }
    }

    if !unit_buf.is_empty() {
        let ms = component_ms(&num_buf, &unit_buf).ok_or_else(invalid)?;
        total_ms = total_ms.checked_add(ms).ok_or_else(invalid)?;
    } else if !num_buf.is_empty() {
        if found_unit {
            // "30m15" is ambiguous
            return Err(invalid());
        }
        let n: i64 = num_buf.parse().map_err(|_| invalid())?;
        total_ms = n.checked_mul(1_000).ok_or_else(invalid)?;
    }

    Ok(Duration::milliseconds(total_ms))
}

fn component_ms(num: &str, unit: &str) -> Option<i64> {
    let n: i64 = num.parse().ok()?;
    let factor = match unit {
        "w" | "W" => 7 * 86_400_000,
        "d" | "D" => 86_400_000,
        "h" | "H" => 3_600_000,
        "min" | "m" | "T" => 60_000,
        "s" | "S" => 1_000,
        "ms" | "L" => 1,
        _ => return None,
    };
    n.checked_mul(factor)
}

/// Number of samples needed to cover `period` at the given sampling period,
/// rounded up.
pub fn period_to_ticks(period: Duration, sampling: Duration) -> Result<usize> {
    let step = sampling.num_milliseconds();
    if step <= 0 {
        return Err(CoreError::MissingFrequency);
    }
    let span = period.num_milliseconds().max(0);
    let ticks = span / step + i64::from(span % step != 0);
    Ok(usize::try_from(ticks).unwrap_or(usize::MAX))
}
