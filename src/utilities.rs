//! Internal utility functions.
//!
//! Path expansion and frame-rate arithmetic shared by the decimator, the
//! source probe, and the CLI.

use std::path::{Path, PathBuf};

use ffmpeg_next::Rational;

use crate::error::SpeedupError;

/// Expand a leading `~` to the current user's home directory.
///
/// Only `~` on its own and `~/...` are expanded; `~user/...` and paths that
/// merely contain a tilde are returned unchanged, as is everything when the
/// home directory cannot be determined.
pub fn expand_home<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };

    match dirs::home_dir() {
        Some(home) if rest.as_os_str().is_empty() => home,
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// Convert a rational frame rate to frames per second.
///
/// Returns `0.0` for a zero denominator.
pub fn rational_to_f64(rate: Rational) -> f64 {
    if rate.denominator() == 0 {
        0.0
    } else {
        rate.numerator() as f64 / rate.denominator() as f64
    }
}

/// Largest numerator or denominator an MPEG-4 Part 2 time base accepts.
pub const MAX_TIME_BASE_TERM: i32 = 65535;

/// Multiply a frame rate by an integer factor.
///
/// The result is exact when its reduced fraction has both terms within
/// [`MAX_TIME_BASE_TERM`] (`30000/1001 * 2 = 60000/1001`). Otherwise it
/// is the closest fraction within that bound (`30000/1001 * 3` becomes
/// roughly `89.91` fps instead of `90000/1001`), since the intermediate
/// encoder rejects larger time bases.
///
/// # Errors
///
/// Returns [`SpeedupError::UnsupportedFrameRate`] if `rate` is not
/// positive or the product exceeds [`MAX_TIME_BASE_TERM`] frames per
/// second.
pub fn scale_frame_rate(rate: Rational, factor: u32) -> Result<Rational, SpeedupError> {
    let unsupported = || SpeedupError::UnsupportedFrameRate {
        frame_rate: rate,
        speed_factor: factor,
    };

    let numerator = i64::from(rate.numerator())
        .checked_mul(i64::from(factor))
        .ok_or_else(unsupported)?;
    let denominator = i64::from(rate.denominator());
    let max = i64::from(MAX_TIME_BASE_TERM);
    if numerator <= 0 || denominator <= 0 || numerator / denominator >= max {
        return Err(unsupported());
    }

    let (mut reduced_num, mut reduced_den): (i32, i32) = (0, 0);
    let exact = unsafe {
        ffmpeg_sys_next::av_reduce(&mut reduced_num, &mut reduced_den, numerator, denominator, max)
    } != 0;
    if reduced_num <= 0 || reduced_den <= 0 {
        return Err(unsupported());
    }

    let scaled = Rational::new(reduced_num, reduced_den);
    if !exact {
        log::debug!("Approximating {numerator}/{denominator} fps as {scaled}");
    }
    Ok(scaled)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use ffmpeg_next::Rational;

    use super::*;

    #[test]
    fn expands_tilde_prefix() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(expand_home("~"), home);
        assert_eq!(expand_home("~/videos/in.mov"), home.join("videos/in.mov"));
    }

    #[test]
    fn leaves_other_paths_alone() {
        assert_eq!(expand_home("/tmp/in.mov"), PathBuf::from("/tmp/in.mov"));
        assert_eq!(expand_home("clips/~draft.mov"), Path::new("clips/~draft.mov"));
        assert_eq!(expand_home("~other/in.mov"), Path::new("~other/in.mov"));
    }

    fn terms(rate: Rational) -> (i32, i32) {
        (rate.numerator(), rate.denominator())
    }

    fn assert_fits_time_base(rate: Rational) {
        assert!(rate.numerator() > 0 && rate.numerator() <= MAX_TIME_BASE_TERM, "{rate}");
        assert!(rate.denominator() > 0 && rate.denominator() <= MAX_TIME_BASE_TERM, "{rate}");
    }

    #[test]
    fn scales_exactly_when_terms_fit() {
        assert_eq!(terms(scale_frame_rate(Rational::new(30, 1), 2).unwrap()), (60, 1));
        assert_eq!(terms(scale_frame_rate(Rational::new(25, 2), 2).unwrap()), (25, 1));
        assert_eq!(
            terms(scale_frame_rate(Rational::new(30000, 1001), 2).unwrap()),
            (60000, 1001)
        );
    }

    #[test]
    fn approximates_ntsc_rates_at_high_factors() {
        for factor in [3, 4, 8] {
            let scaled = scale_frame_rate(Rational::new(30000, 1001), factor).unwrap();
            assert_fits_time_base(scaled);
            let expected = 30000.0 / 1001.0 * factor as f64;
            assert!((rational_to_f64(scaled) - expected).abs() < 1e-3, "x{factor}: {scaled}");
        }
    }

    #[test]
    fn approximates_variable_rate_phone_footage() {
        let scaled = scale_frame_rate(Rational::new(1_800_000, 60_073), 2).unwrap();
        assert_fits_time_base(scaled);
        let expected = 3_600_000.0 / 60_073.0;
        assert!((rational_to_f64(scaled) - expected).abs() < 1e-3, "{scaled}");
    }

    #[test]
    fn rejects_rates_beyond_time_base_range() {
        let error = scale_frame_rate(Rational::new(30, 1), 143_165_577).unwrap_err();
        assert!(matches!(
            error,
            SpeedupError::UnsupportedFrameRate { speed_factor: 143_165_577, .. }
        ));
        assert!(scale_frame_rate(Rational::new(i32::MAX, 1), u32::MAX).is_err());
        assert!(scale_frame_rate(Rational::new(0, 1), 2).is_err());
        assert!(scale_frame_rate(Rational::new(30, 0), 2).is_err());
    }

    #[test]
    fn converts_rates_to_fps() {
        assert_eq!(rational_to_f64(Rational::new(60, 1)), 60.0);
        assert_eq!(rational_to_f64(Rational::new(1, 0)), 0.0);
        assert!((rational_to_f64(Rational::new(30000, 1001)) - 29.97).abs() < 0.01);
    }
}
