use chrono::Duration;

/// A time token that could not be decoded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot decode time value '{token}': {reason}")]
pub struct TimeParseError {
    pub token: String,
    pub reason: &'static str,
}

impl TimeParseError {
    fn new(token: &str, reason: &'static str) -> Self {
        TimeParseError {
            token: token.to_string(),
            reason,
        }
    }
}

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Convert an elapsed-time token to hours.
///
/// Accepted forms are `H:MM`, `H:MM:SS[.fff]`, `D:HH:MM:SS[.fff]` and a bare
/// decimal number of hours. Hours are not limited to 24.
pub fn parse_elapsed_hours(token: &str) -> Result<f64, TimeParseError> {
    let cleaned = token.trim().trim_matches('"').trim();
    if cleaned.is_empty() {
        return Err(TimeParseError::new(token, "empty"));
    }

    if !cleaned.contains(':') {
        let hours: f64 = cleaned
            .parse()
            .map_err(|_| TimeParseError::new(token, "not a number"))?;
        if !hours.is_finite() {
            return Err(TimeParseError::new(token, "not finite"));
        }
        return Ok(hours);
    }

    let parts: Vec<&str> = cleaned.split(':').collect();
    let (days, hours, minutes, seconds) = match parts.as_slice() {
        [h, m] => ("0", *h, *m, "0"),
        [h, m, s] => ("0", *h, *m, *s),
        [d, h, m, s] => (*d, *h, *m, *s),
        _ => return Err(TimeParseError::new(token, "unexpected number of fields")),
    };

    let days = whole(token, days)?;
    let hours = whole(token, hours)?;
    let minutes = whole(token, minutes)?;
    let seconds: f64 = seconds
        .trim()
        .parse()
        .map_err(|_| TimeParseError::new(token, "invalid seconds"))?;
    if minutes >= 60 {
        return Err(TimeParseError::new(token, "minutes out of range"));
    }
    if !(0.0..60.0).contains(&seconds) {
        return Err(TimeParseError::new(token, "seconds out of range"));
    }

    let elapsed = Duration::try_days(days)
        .zip(Duration::try_hours(hours))
        .zip(Duration::try_minutes(minutes))
        .zip(Duration::try_milliseconds((seconds * 1000.0).round() as i64))
        .and_then(|(((d, h), m), s)| d.checked_add(&h)?.checked_add(&m)?.checked_add(&s))
        .ok_or_else(|| TimeParseError::new(token, "out of range"))?;

    Ok(elapsed.num_milliseconds() as f64 / MILLIS_PER_HOUR)
}

fn whole(token: &str, field: &str) -> Result<i64, TimeParseError> {
    field
        .trim()
        .parse::<u32>()
        .map(i64::from)
        .map_err(|_| TimeParseError::new(token, "invalid integer field"))
}
