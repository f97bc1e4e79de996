/// Percentile of sorted values with linear interpolation between order statistics.
///
/// `fraction` is clamped to `[0, 1]`. Returns [`None`] for an empty slice.
#[expect(clippy::cast_precision_loss)]
#[expect(clippy::cast_possible_truncation)]
#[expect(clippy::cast_sign_loss)]
#[must_use]
pub fn percentile(sorted: &[f64], fraction: f64) -> Option<f64> {
    let last_index = sorted.len().checked_sub(1)?;
    let position = fraction.clamp(0.0, 1.0) * last_index as f64;
    let lower = position.floor();
    let lower_value = sorted[lower as usize];
    let upper_value = sorted[position.ceil() as usize];
    Some((upper_value - lower_value).mul_add(position - lower, lower_value))
}

#[must_use]
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}
