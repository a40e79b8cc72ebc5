/// Coins earned for a session: `floor(rate_per_hour * duration_hours)`.
///
/// Absent, negative or non-finite inputs count as zero, so a misconfigured
/// game or booking yields no reward instead of an error.
pub fn compute_reward(rate_per_hour: Option<f64>, duration_hours: Option<f64>) -> u64 {
    let rate = sanitize(rate_per_hour);
    let duration = sanitize(duration_hours);

    // `as` saturates, so an overflowing product becomes u64::MAX.
    (rate * duration).floor() as u64
}

fn sanitize(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}
