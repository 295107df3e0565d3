//! Separable Gaussian blur over single-channel coverage buffers.
//!
//! Weights are Q16 fixed point so the result is deterministic across hosts.

/// Kernel radius covering three standard deviations.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn radius_for_sigma(sigma: f32) -> u32 {
    if !sigma.is_finite() || sigma <= 0.0 {
        return 0;
    }
    (sigma * 3.0).ceil() as u32
}

/// Blur an 8-bit coverage buffer of `width` × `height`.
///
/// Edge pixels are clamped. A non-positive sigma returns the input unchanged.
#[must_use]
pub fn blur_alpha(src: &[u8], width: u32, height: u32, sigma: f32) -> Vec<u8> {
    let radius = radius_for_sigma(sigma);
    if radius == 0 || width == 0 || height == 0 || src.len() != (width * height) as usize {
        return src.to_vec();
    }
    let kernel = gaussian_kernel_q16(radius, sigma);
    let mut tmp = vec![0u8; src.len()];
    let mut out = vec![0u8; src.len()];
    horizontal_pass(src, &mut tmp, width, height, &kernel);
    vertical_pass(&tmp, &mut out, width, height, &kernel);
    out
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
fn gaussian_kernel_q16(radius: u32, sigma: f32) -> Vec<u32> {
    let r = radius as i32;
    let denom = 2.0 * f64::from(sigma) * f64::from(sigma);
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights_f.iter().sum();

    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|wf| ((wf / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();
    let acc: i64 = weights.iter().map(|w| i64::from(*w)).sum();
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }
    weights
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = 0u64;
            for (ki, &kw) in k.iter().enumerate() {
                let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                acc += u64::from(kw) * u64::from(src[(y * w + sx) as usize]);
            }
            dst[(y * w + x) as usize] = q16_to_u8(acc);
        }
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0u64;
            for (ki, &kw) in k.iter().enumerate() {
                let sy = (y + ki as i32 - radius).clamp(0, h - 1);
                acc += u64::from(kw) * u64::from(src[(sy * w + x) as usize]);
            }
            dst[(y * w + x) as usize] = q16_to_u8(acc);
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_sigma_is_identity() {
        let src = vec![1u8, 2, 3, 4];
        assert_eq!(blur_alpha(&src, 2, 2, 0.0), src);
    }

    #[test]
    fn test_constant_buffer_is_identity() {
        let src = vec![200u8; 6 * 5];
        assert_eq!(blur_alpha(&src, 6, 5, 1.25), src);
    }

    #[test]
    fn test_spreads_single_pixel() {
        let (w, h) = (7u32, 7u32);
        let mut src = vec![0u8; (w * h) as usize];
        src[(3 * w + 3) as usize] = 255;
        let out = blur_alpha(&src, w, h, 1.5);
        assert!(out[(3 * w + 3) as usize] < 255);
        assert!(out[(3 * w + 4) as usize] > 0);
        assert!(out[(4 * w + 3) as usize] > 0);
    }

    #[test]
    fn test_kernel_sums_to_one() {
        let k = gaussian_kernel_q16(4, 1.25);
        assert_eq!(k.iter().sum::<u32>(), 65536);
        assert_eq!(k.len(), 9);
    }
}
