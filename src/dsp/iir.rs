//! Butterworth lowpass realised as cascaded second order sections.
//!
//! Design goes through the analog prototype and the bilinear transform with
//! frequency pre-warping. Each section runs in Direct Form II Transposed.
//! Filtering starts from zero state on every call, which gives the same output
//! as a single high-order difference equation with zero initial conditions.

use std::f64::consts::PI;


/// One biquad: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
}

impl Biquad {
    pub fn new(b: [f64; 3], a: [f64; 2]) -> Self {
        Self { b, a }
    }

    /// Poles inside the unit circle
    pub fn is_stable(&self) -> bool {
        self.a[1].abs() < 1.0 && self.a[0].abs() < 1.0 + self.a[1]
    }

    fn filter(&self, input: &[f64]) -> Vec<f64> {
        let mut state = [0.0; 2];
        input.iter()
            .map(|&x| {
                let y = self.b[0] * x + state[0];
                state[0] = self.b[1] * x - self.a[0] * y + state[1];
                state[1] = self.b[2] * x - self.a[1] * y;
                y
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ButterworthLowpass {
    sections: Vec<Biquad>,
}

impl ButterworthLowpass {
    /// `order` must be even, `cutoff` is normalized to the Nyquist frequency (0..1).
    pub fn new(order: usize, cutoff: f64) -> Self {
        assert!(order >= 2 && order % 2 == 0, "Only even orders are supported");
        assert!(cutoff > 0.0 && cutoff < 1.0, "Cutoff must be in (0, 1)");

        // Analog cutoff for s = 2(z-1)/(z+1), sample period of 1
        let wc = 2.0 * (PI * cutoff / 2.0).tan();
        let c = 2.0;
        let wc2 = wc * wc;
        let sections = (0..order / 2)
            .map(|k| {
                let theta = PI * (2 * k + 1) as f64 / (2 * order) as f64;
                // Pole pair damping: s^2 + 2 sin(theta) wc s + wc^2
                let damping = 2.0 * theta.sin() * wc * c;
                let a0 = c * c + damping + wc2;
                let a1 = 2.0 * wc2 - 2.0 * c * c;
                let a2 = c * c - damping + wc2;
                Biquad::new(
                    [wc2 / a0, 2.0 * wc2 / a0, wc2 / a0],
                    [a1 / a0, a2 / a0],
                )
            })
            .collect();

        Self { sections }
    }

    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    pub fn filter(&self, input: &[f64]) -> Vec<f64> {
        self.sections.iter()
            .fold(input.to_vec(), |signal, section| section.filter(&signal))
    }
}
