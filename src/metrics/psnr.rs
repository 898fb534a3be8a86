//! PSNR kernel.
//!
//! `PSNR = 10 * log10(MAX^2 / MSE)` over every component of two equally sized
//! buffers. Identical buffers have no finite PSNR; they yield `0.0`, which the
//! rest of the crate treats as the "no detectable error" sentinel.

use crate::error::{MetricsError, Result};
use crate::video::types::Frame;

/// Peak component value for 8-bit channels
pub const MAX_8BIT: f64 = 255.0;

/// Summed squared errors at or below this are treated as identical frames
pub const NEGLIGIBLE_SSE: f64 = 1e-10;

/// Sum of squared per-component differences
///
/// Accumulates in integers, so the result is exact for any 8-bit input.
pub fn sum_squared_error(reference: &[u8], compressed: &[u8]) -> Result<f64> {
    if reference.len() != compressed.len() {
        return Err(MetricsError::ShapeMismatch {
            reference: reference.len(),
            compressed: compressed.len(),
        }
        .into());
    }

    let sse: u64 = reference
        .iter()
        .zip(compressed)
        .map(|(&a, &b)| {
            let d = u64::from(a.abs_diff(b));
            d * d
        })
        .sum();

    Ok(sse as f64)
}

/// PSNR of two component buffers with an explicit peak value
///
/// Returns exactly `0.0` when the summed squared error is at or below
/// [`NEGLIGIBLE_SSE`]. The value is not rounded.
pub fn psnr_with_peak(reference: &[u8], compressed: &[u8], peak: f64) -> Result<f64> {
    let sse = sum_squared_error(reference, compressed)?;
    if sse <= NEGLIGIBLE_SSE {
        return Ok(0.0);
    }

    let mse = sse / reference.len() as f64;
    Ok(10.0 * ((peak * peak) / mse).log10())
}

/// PSNR between two 8-bit frames of identical shape, in dB
pub fn psnr(reference: &Frame, compressed: &Frame) -> Result<f64> {
    psnr_with_peak(reference.as_bytes(), compressed.as_bytes(), MAX_8BIT)
}

/// Round to 3 decimal digits, the precision PSNR values are recorded at
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn random_frame(rng: &mut SmallRng, width: u32, height: u32) -> Frame {
        let data = (0..width * height * 3).map(|_| rng.gen::<u8>()).collect();
        Frame::from_rgb_bytes(width, height, data).unwrap()
    }

    #[test]
    fn test_identical_frames_are_zero() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..5 {
            let frame = random_frame(&mut rng, 16, 9);
            assert_eq!(psnr(&frame, &frame).unwrap(), 0.0);
        }
        let black = Frame::new_black(8, 8);
        assert_eq!(psnr(&black, &black.clone()).unwrap(), 0.0);
    }

    #[test]
    fn test_psnr_is_symmetric() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..10 {
            let a = random_frame(&mut rng, 12, 7);
            let b = random_frame(&mut rng, 12, 7);
            assert_eq!(psnr(&a, &b).unwrap(), psnr(&b, &a).unwrap());
        }
    }

    #[test]
    fn test_differing_frames_are_finite_and_non_negative() {
        let mut rng = SmallRng::seed_from_u64(1234);
        for _ in 0..10 {
            let a = random_frame(&mut rng, 10, 10);
            let mut b = a.clone();
            let x = rng.gen_range(0..10);
            let y = rng.gen_range(0..10);
            let [r, g, bl] = b.get_pixel(x, y);
            b.set_pixel(x, y, [r.wrapping_add(1), g, bl]);

            let value = psnr(&a, &b).unwrap();
            assert!(value.is_finite());
            assert!(value > 0.0);
        }
    }

    #[test]
    fn test_worst_case_is_zero_db() {
        // Every component off by 255: MSE == MAX^2
        let black = Frame::new_black(4, 4);
        let white = Frame::new_filled(4, 4, [255, 255, 255]);
        assert!(psnr(&black, &white).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_known_value() {
        // One component of 12 off by 10: MSE = 100 / 12
        let a = Frame::new_black(2, 2);
        let mut b = a.clone();
        b.set_pixel(0, 0, [10, 0, 0]);

        let expected = 10.0 * (255.0f64 * 255.0 / (100.0 / 12.0)).log10();
        assert!((psnr(&a, &b).unwrap() - expected).abs() < 1e-9);
        assert_eq!(round3(psnr(&a, &b).unwrap()), 38.923);
    }

    #[test]
    fn test_custom_peak() {
        let a = [0u8, 0, 0, 0];
        let b = [1u8, 1, 1, 1];
        // MSE = 1, so PSNR = 20 * log10(peak)
        assert!((psnr_with_peak(&a, &b, 1.0).unwrap()).abs() < 1e-12);
        assert!((psnr_with_peak(&a, &b, 100.0).unwrap() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_shape_mismatch() {
        assert!(sum_squared_error(&[0, 1, 2], &[0, 1]).is_err());
        let a = Frame::new_black(2, 2);
        let b = Frame::new_black(3, 2);
        assert!(psnr(&a, &b).is_err());
    }

    #[test]
    fn test_round3() {
        assert_eq!(round3(38.12345), 38.123);
        assert_eq!(round3(38.1236), 38.124);
        assert_eq!(round3(0.0), 0.0);
    }
}
