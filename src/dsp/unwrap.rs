use std::f64::consts::PI;


/// Unwrap phase by removing 2π jumps between consecutive samples.
///
/// A step is folded into [-π, π). A step of exactly π is left alone and a
/// positive step of an odd multiple of π folds to +π.
pub fn unwrap_phase(phases: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(phases.len());
    let Some(&first) = phases.first() else {
        return out;
    };
    out.push(first);
    let mut offset = 0.0;
    for pair in phases.windows(2) {
        let d = pair[1] - pair[0];
        if d.abs() >= PI {
            let mut folded = (d + PI).rem_euclid(2.0 * PI) - PI;
            if folded == -PI && d > 0.0 {
                folded = PI;
            }
            offset += folded - d;
        }
        out.push(pair[1] + offset);
    }
    out
}
