/// Renders a number the way formulas write them.
///
/// Whole values print without a fractional part (`6`, not `6.0`), everything
/// else falls back to the shortest `f64` representation. This keeps
/// artificial tokens indistinguishable from lexed ones when a tree is turned
/// back into text.
///
/// # Example
/// ```
/// use formulary::util::num::format_number;
///
/// assert_eq!(format_number(6.0), "6");
/// assert_eq!(format_number(2.5), "2.5");
/// ```
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
