//! Pre-write metadata filtering.
//!
//! The file layer only accepts values of the right shape: no NaN labels
//! unless explicitly exported, no booleans, and type-checked labels (fill,
//! min, max) must match the variable's element type.

use insitu_core::{LabelMap, Value, ValueKind};
use tracing::warn;

/// Filter one variable's label map down to what the file layer accepts.
///
/// - Float NaN values are dropped unless their label is in `export_nan`.
/// - Booleans are coerced to integers before any type check.
/// - Labels listed in `check_labels` whose value kind differs from `kind`
///   are dropped when `remove` is set; otherwise a cast is attempted, and on
///   failure the label is dropped with a warning. Never errors.
pub fn filter_labels(
    labels: &LabelMap,
    kind: ValueKind,
    remove: bool,
    check_labels: &[String],
    export_nan: &[String],
    varname: &str,
) -> LabelMap {
    let mut out = LabelMap::new();
    for (key, value) in labels {
        if value.is_nan() && !export_nan.iter().any(|l| l == key) {
            continue;
        }

        let mut value = value.clone();
        if let Value::Bool(b) = value {
            value = Value::Int(i64::from(b));
        }

        if check_labels.iter().any(|l| l == key) && value.kind() != kind {
            if remove {
                continue;
            }
            match value.cast_to(kind) {
                Some(cast) => value = cast,
                None => {
                    warn!(
                        variable = %varname,
                        label = %key,
                        value = %value,
                        "unable to cast metadata value to the variable type, removing"
                    );
                    continue;
                }
            }
        }

        out.insert(key.clone(), value);
    }
    out
}
