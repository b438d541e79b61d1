//! Piecewise-linear mapping from progress to a value.

/// Maps `input` through the breakpoints `stops → outputs`, clamping outside
/// the first and last stop. `stops` must be sorted and the two slices must
/// have equal, non-zero length.
pub fn interpolate(input: f32, stops: &[f32], outputs: &[f32]) -> f32 {
    debug_assert_eq!(stops.len(), outputs.len());
    let n = stops.len().min(outputs.len());
    if n == 0 {
        return 0.0;
    }
    let idx = stops[..n].partition_point(|s| *s <= input);
    if idx == 0 {
        return outputs[0];
    }
    if idx >= n {
        return outputs[n - 1];
    }
    let (a, b) = (stops[idx - 1], stops[idx]);
    let span = b - a;
    if span <= 0.0 {
        return outputs[idx];
    }
    let t = (input - a) / span;
    outputs[idx - 1] + (outputs[idx] - outputs[idx - 1]) * t
}
