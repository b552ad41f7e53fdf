use serde_json::{Map, Number, Value};

use crate::core::ChartOption;

/// Progress after which values that cannot be interpolated snap to the target.
pub const SNAP_THRESHOLD: f64 = 0.5;

/// Cubic ease-in-out over `t` in `[0, 1]`.
#[must_use]
pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Blends two configurations at eased `progress`.
///
/// Numbers are interpolated linearly, equal-length arrays element-wise and
/// objects key by key. Anything else keeps `from` until `progress` passes
/// [`SNAP_THRESHOLD`], then takes `to`.
#[must_use]
pub fn interpolate_option(from: &ChartOption, to: &ChartOption, progress: f64) -> ChartOption {
    let value = interpolate_value(from.as_value(), to.as_value(), progress);
    ChartOption::from_value(value).unwrap_or_else(|_| to.clone())
}

#[must_use]
pub fn interpolate_value(from: &Value, to: &Value, progress: f64) -> Value {
    match (from, to) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => lerp_number(a, b, progress).unwrap_or_else(|| to.clone()),
            _ => snap(from, to, progress),
        },
        (Value::Array(a), Value::Array(b)) if a.len() == b.len() => Value::Array(
            a.iter()
                .zip(b)
                .map(|(a, b)| interpolate_value(a, b, progress))
                .collect(),
        ),
        (Value::Object(a), Value::Object(b)) => Value::Object(interpolate_map(a, b, progress)),
        _ => snap(from, to, progress),
    }
}

fn interpolate_map(
    from: &Map<String, Value>,
    to: &Map<String, Value>,
    progress: f64,
) -> Map<String, Value> {
    let mut out = Map::new();
    let past_snap = progress > SNAP_THRESHOLD;
    for (key, target) in to {
        match from.get(key) {
            Some(source) => {
                out.insert(key.clone(), interpolate_value(source, target, progress));
            }
            None if past_snap => {
                out.insert(key.clone(), target.clone());
            }
            None => {}
        }
    }
    if !past_snap {
        for (key, source) in from {
            if !to.contains_key(key) {
                out.insert(key.clone(), source.clone());
            }
        }
    }
    out
}

fn lerp_number(a: f64, b: f64, progress: f64) -> Option<Value> {
    Number::from_f64(a + (b - a) * progress).map(Value::Number)
}

fn snap(from: &Value, to: &Value, progress: f64) -> Value {
    if progress > SNAP_THRESHOLD {
        to.clone()
    } else {
        from.clone()
    }
}
