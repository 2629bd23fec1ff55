//! Linear scaling between value domains, e.g. BG readings to chart rows.

/// Lowest BG a chart is expected to show (mg/dL)
pub const MIN_DISPLAY_BG: f64 = 40.0;
/// Highest BG a chart is expected to show (mg/dL)
pub const MAX_DISPLAY_BG: f64 = 400.0;

/// Map `d` from the input interval onto the output interval
///
/// Either interval may be reversed; `d` outside the input interval is
/// extrapolated. `scale_linear(5.0, (0.0, 10.0), (0.0, 300.0)) == 150.0`.
pub fn scale_linear(d: f64, (in_min, in_max): (f64, f64), (out_min, out_max): (f64, f64)) -> f64 {
    let scaled_in = (d - in_min) / (in_max - in_min);
    scaled_in * (out_max - out_min) + out_min
}

/// Map a BG reading onto `(top, bottom)` of a display, clamping to the display range
pub fn scale_bg(bg: f64, output: (f64, f64)) -> f64 {
    let clamped = bg.clamp(MIN_DISPLAY_BG, MAX_DISPLAY_BG);
    scale_linear(clamped, (MIN_DISPLAY_BG, MAX_DISPLAY_BG), output)
}
