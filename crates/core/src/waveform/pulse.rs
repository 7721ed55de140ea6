/// Bell-shaped deflection: `peak * exp(-0.5 * ((x - center) / width)^2)`.
pub fn gaussian(x: f64, peak: f64, center: f64, width: f64) -> f64 {
    if width <= 0.0 {
        return 0.0;
    }
    let z = (x - center) / width;
    peak * (-0.5 * z * z).exp()
}

/// One parametric component of a beat, positioned in cycle-progress units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pulse {
    pub peak: f64,
    pub center: f64,
    pub width: f64,
}

impl Pulse {
    pub const fn new(peak: f64, center: f64, width: f64) -> Self {
        Self {
            peak,
            center,
            width,
        }
    }

    pub fn value(&self, x: f64) -> f64 {
        gaussian(x, self.peak, self.center, self.width)
    }
}

/// Sum of all pulses at `x`.
pub fn superpose(pulses: &[Pulse], x: f64) -> f64 {
    pulses.iter().map(|pulse| pulse.value(x)).sum()
}
