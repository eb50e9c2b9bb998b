pub mod momentum;
pub mod ranking;
pub mod sentiment;

/// Rounds to two decimals, halves to even, folding `-0.0` into `0.0`.
pub(crate) fn round2(x: f64) -> f64 {
    let r = (x * 100.0).round_ties_even() / 100.0;
    if r == 0.0 {
        0.0
    } else {
        r
    }
}
