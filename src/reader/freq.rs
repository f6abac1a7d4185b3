// file: src/reader/freq.rs
// description: sampling frequency inference tolerant of gaps and jitter
// reference: https://docs.rs/chrono

use crate::error::{DatastoreError, Result};
use crate::models::Frequency;
use crate::models::series::infer_constant_spacing;
use chrono::NaiveDateTime;

const WINDOW: usize = 7;

/// Infers the sampling interval of `times`.
///
/// Stamps are rounded to the minute first. Short records are judged as a
/// whole and may yield `None`. Longer records are probed in windows near
/// the end, three quarters in, half way and at the start; failing those,
/// the first `preferred` frequency whose grid holds more than 98% of the
/// stamps within a fifth of a period is chosen.
pub fn infer_freq_robust(
    times: &[NaiveDateTime],
    preferred: &[Frequency],
) -> Result<Option<Frequency>> {
    let minute = Frequency::minutes(1);
    let times: Vec<NaiveDateTime> = times.iter().map(|t| minute.round(*t)).collect();
    let n = times.len();

    if n < WINDOW + 1 {
        return Ok(infer_constant_spacing(&times));
    }

    let window = |start: usize, end: usize| infer_constant_spacing(&times[start..end.min(n)]);

    let found = window(n - WINDOW, n - 1)
        .or_else(|| window(3 * n / 4, 3 * n / 4 + WINDOW))
        .or_else(|| window(n / 2, n / 2 + WINDOW))
        .or_else(|| window(0, WINDOW));

    if found.is_some() {
        return Ok(found);
    }

    for freq in preferred {
        let tolerance = freq.seconds() as f64 / 5.0;
        let close = times
            .iter()
            .filter(|t| (freq.offset_from_grid(**t).num_seconds() as f64) < tolerance)
            .count();
        if close as f64 / n as f64 > 0.98 {
            return Ok(Some(*freq));
        }
    }

    Err(DatastoreError::Validation(
        "Set to infer frequency, but multiple attempts failed; give the frequency explicitly"
            .to_string(),
    ))
}
