use serde::{Deserialize, Serialize};

/// Inclusive monoisotopic-mass interval around a precursor mass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassWindow {
    pub lower: f64,
    pub upper: f64,
}

impl MassWindow {
    /// `mass * (1 ± ppm * 1e-6)`.
    pub fn around(mass: f64, ppm: f64) -> Self {
        let delta = ppm * 1e-6;
        Self {
            lower: mass * (1.0 - delta),
            upper: mass * (1.0 + delta),
        }
    }

    pub fn contains(&self, mass: f64) -> bool {
        self.lower <= mass && mass <= self.upper
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousand_ppm_around_500() {
        let window = MassWindow::around(500.0, 1000.0);
        assert!((window.lower - 499.5).abs() < 1e-9);
        assert!((window.upper - 500.5).abs() < 1e-9);
        assert!(!window.contains(499.4));
        assert!(window.contains(499.6));
        assert!(window.contains(500.5 - 1e-9));
        assert!(!window.contains(500.6));
    }

    #[test]
    fn bounds_are_inclusive() {
        let window = MassWindow {
            lower: 10.0,
            upper: 20.0,
        };
        assert!(window.contains(10.0));
        assert!(window.contains(20.0));
    }
}
