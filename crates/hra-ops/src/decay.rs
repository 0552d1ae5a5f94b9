//! Distance decay of a stressor's influence inside its buffer.

use hra_core::{DecayEquation, EXPONENTIAL_DECAY_CUTOFF};

/// Decayed numerator `n` at distance `d` from a stressor with buffer `b`.
///
/// At `d <= 0` the numerator applies in full. Callers only ask for
/// `d <= b`; beyond the buffer Linear decay is clamped at 0.
///
/// - `None`: `n`.
/// - `Linear`: `n * (1 - d/b)`.
/// - `Exponential`: `n * exp(k*d)` with `k = ln(ε/n)/b`, so the value is
///   exactly [`EXPONENTIAL_DECAY_CUTOFF`] at `d = b` whatever `n` is.
///   `n <= 0` has no curve through ε and is returned unchanged.
pub fn decay(n: f64, d: f64, b: f64, equation: DecayEquation) -> f64 {
    if d <= 0.0 || b <= 0.0 {
        return n;
    }
    match equation {
        DecayEquation::None => n,
        DecayEquation::Linear => n * (1.0 - d / b).max(0.0),
        DecayEquation::Exponential => {
            if n <= 0.0 {
                return n;
            }
            let k = (EXPONENTIAL_DECAY_CUTOFF / n).ln() / b;
            n * (k * d).exp()
        }
    }
}
