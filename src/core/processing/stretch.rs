use ndarray::Array2;

/// Lower/upper percentiles of the browse-image contrast stretch
pub const STRETCH_LOW_PCT: f64 = 5.0;
pub const STRETCH_HIGH_PCT: f64 = 95.0;

#[inline]
fn is_valid(v: f64, no_data: Option<f64>) -> bool {
    v.is_finite() && no_data.is_none_or(|nd| v != nd)
}

/// Percentile of an ascending slice with linear interpolation between the two
/// closest ranks. `sorted` must be non-empty.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Sorted values of `band` with no-data and non-finite samples removed
pub fn sorted_valid_values(band: &Array2<f64>, no_data: Option<f64>) -> Vec<f64> {
    let mut values: Vec<f64> = band
        .iter()
        .copied()
        .filter(|&v| is_valid(v, no_data))
        .collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

/// Percentile clip-and-rescale of one channel to 8 bits.
///
/// No-data is masked first; the [low, high] percentiles are taken over the
/// remaining pixels only, values are clipped to that range and mapped linearly
/// onto [0, 255]. Masked pixels become 0.
pub fn stretch_to_u8(band: &Array2<f64>, no_data: Option<f64>, low_pct: f64, high_pct: f64) -> Vec<u8> {
    let valid = sorted_valid_values(band, no_data);
    if valid.is_empty() {
        return vec![0u8; band.len()];
    }
    let lo = percentile(&valid, low_pct);
    let hi = percentile(&valid, high_pct);
    let span = hi - lo;

    band.iter()
        .map(|&v| {
            if !is_valid(v, no_data) || span <= 0.0 {
                return 0u8;
            }
            let t = (v.clamp(lo, hi) - lo) / span;
            // Truncating cast, values are within [0, 255]
            (t * 255.0) as u8
        })
        .collect()
}
