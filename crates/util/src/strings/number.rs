/// Format a number the way ECMAScript `Number.prototype.toString()` does.
///
/// - `NaN`, `Infinity` and `-Infinity` are spelled out.
/// - Both zeros print as `"0"`.
/// - Magnitudes in `[1e-6, 1e21)` use plain decimal notation.
/// - Anything else uses exponent notation with an explicit sign (`1e+21`).
///
/// # Examples
///
/// ```
/// use json_draft_util::strings::number_to_string;
///
/// assert_eq!(number_to_string(10.0), "10");
/// assert_eq!(number_to_string(0.5), "0.5");
/// assert_eq!(number_to_string(-0.0), "0");
/// assert_eq!(number_to_string(1e21), "1e+21");
/// assert_eq!(number_to_string(f64::NAN), "NaN");
/// ```
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        return format!("{}", n);
    }
    let formatted = format!("{:e}", n);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => formatted,
    }
}
