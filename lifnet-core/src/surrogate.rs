//! Spike nonlinearity: exact step for the forward pass, smooth derivative
//! for the backward pass. The two never share a code path.

/// Default steepness k of the surrogate derivative.
pub const DEFAULT_SLOPE: f64 = 25.0;

/// Forward spike function: 1 when `mem >= threshold`.
#[inline]
pub fn heaviside(mem: f64, threshold: f64) -> f64 {
    if mem >= threshold { 1.0 } else { 0.0 }
}

/// Fast sigmoid `½(1 + z/(1+|z|))` with `z = slope·(mem − threshold)`.
/// Never used in simulation; gradient checks run a smooth forward pass with it.
#[inline]
pub fn fast_sigmoid(mem: f64, threshold: f64, slope: f64) -> f64 {
    let z = slope * (mem - threshold);
    0.5 * (1.0 + z / (1.0 + z.abs()))
}

/// d/dmem of [`fast_sigmoid`]: `(slope/2) / (1 + slope·|mem − threshold|)²`.
///
/// Strictly positive for finite input, peaks at the threshold with value
/// `slope/2` and integrates to one, so it narrows to the Dirac impulse of the
/// true step derivative as the slope grows.
#[inline]
pub fn fast_sigmoid_grad(mem: f64, threshold: f64, slope: f64) -> f64 {
    let d = 1.0 + slope * (mem - threshold).abs();
    0.5 * slope / (d * d)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integrate(slope: f64, lo: f64, hi: f64) -> f64 {
        let n = 200_000;
        let h = (hi - lo) / n as f64;
        (0..n)
            .map(|i| fast_sigmoid_grad(lo + (i as f64 + 0.5) * h, 0.0, slope) * h)
            .sum()
    }

    #[test]
    fn step_is_exact() {
        assert_eq!(heaviside(1.0, 1.0), 1.0);
        assert_eq!(heaviside(0.999_999, 1.0), 0.0);
        assert_eq!(heaviside(7.0, 1.0), 1.0);
    }

    #[test]
    fn grad_strictly_positive() {
        for mem in [-1e6, -10.0, 0.0, 1.0, 2.0, 1e6] {
            assert!(fast_sigmoid_grad(mem, 1.0, DEFAULT_SLOPE) > 0.0, "mem {mem}");
        }
        assert_eq!(fast_sigmoid_grad(1.0, 1.0, DEFAULT_SLOPE), DEFAULT_SLOPE / 2.0);
    }

    #[test]
    fn grad_matches_finite_difference() {
        let h = 1e-6;
        for mem in [-0.5, 0.3, 0.9, 1.2, 3.0] {
            let fd = (fast_sigmoid(mem + h, 1.0, 25.0) - fast_sigmoid(mem - h, 1.0, 25.0)) / (2.0 * h);
            let g = fast_sigmoid_grad(mem, 1.0, 25.0);
            assert!((fd - g).abs() < 1e-4 * g.max(1.0), "mem {mem}: fd {fd} vs {g}");
        }
    }

    #[test]
    fn unit_mass_concentrates_with_slope() {
        let total = integrate(DEFAULT_SLOPE, -50.0, 50.0);
        assert!((total - 1.0).abs() < 1e-2, "mass {total}");

        let narrow = integrate(10.0, -0.05, 0.05);
        let steep = integrate(1000.0, -0.05, 0.05);
        assert!(steep > narrow);
        assert!(steep > 0.95);
    }
}
