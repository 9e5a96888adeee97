//! Conversion between the internal [`Value`] type and netCDF attributes,
//! plus the dtype format codes advertised in variable metadata.

use insitu_core::{DType, Value};
use netcdf::AttributeValue;

/// Convert an internal value to a netCDF attribute value.
///
/// Booleans are coerced to integers; heterogeneous arrays (mixing text and
/// numbers) have no attribute representation and return `None`.
pub fn value_to_attr(value: &Value) -> Option<AttributeValue> {
    match value {
        Value::Int(i) => Some(AttributeValue::Longlong(*i)),
        Value::Float(f) => Some(AttributeValue::Double(*f)),
        Value::Str(s) => Some(AttributeValue::Str(s.clone())),
        Value::Bool(b) => Some(AttributeValue::Longlong(i64::from(*b))),
        Value::Array(items) => {
            if items.iter().all(|v| v.as_f64().is_some()) {
                let nums = items.iter().filter_map(Value::as_f64).collect();
                Some(AttributeValue::Doubles(nums))
            } else if items.iter().all(|v| v.as_str().is_some()) {
                let strs = items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                Some(AttributeValue::Strs(strs))
            } else {
                None
            }
        }
    }
}

/// Convert a netCDF attribute value to an internal value.
pub fn attr_to_value(attr: &AttributeValue) -> Value {
    match attr {
        AttributeValue::Uchar(v) => Value::Int(i64::from(*v)),
        AttributeValue::Schar(v) => Value::Int(i64::from(*v)),
        AttributeValue::Ushort(v) => Value::Int(i64::from(*v)),
        AttributeValue::Short(v) => Value::Int(i64::from(*v)),
        AttributeValue::Uint(v) => Value::Int(i64::from(*v)),
        AttributeValue::Int(v) => Value::Int(i64::from(*v)),
        AttributeValue::Ulonglong(v) => Value::Int(*v as i64),
        AttributeValue::Longlong(v) => Value::Int(*v),
        AttributeValue::Float(v) => Value::Float(f64::from(*v)),
        AttributeValue::Double(v) => Value::Float(*v),
        AttributeValue::Str(s) => Value::Str(s.clone()),
        AttributeValue::Uchars(v) => int_array(v.iter().map(|&x| i64::from(x))),
        AttributeValue::Schars(v) => int_array(v.iter().map(|&x| i64::from(x))),
        AttributeValue::Ushorts(v) => int_array(v.iter().map(|&x| i64::from(x))),
        AttributeValue::Shorts(v) => int_array(v.iter().map(|&x| i64::from(x))),
        AttributeValue::Uints(v) => int_array(v.iter().map(|&x| i64::from(x))),
        AttributeValue::Ints(v) => int_array(v.iter().map(|&x| i64::from(x))),
        AttributeValue::Ulonglongs(v) => int_array(v.iter().map(|&x| x as i64)),
        AttributeValue::Longlongs(v) => int_array(v.iter().copied()),
        AttributeValue::Floats(v) => {
            Value::Array(v.iter().map(|&x| Value::Float(f64::from(x))).collect())
        }
        AttributeValue::Doubles(v) => Value::Array(v.iter().map(|&x| Value::Float(x)).collect()),
        AttributeValue::Strs(v) => {
            Value::Array(v.iter().map(|s| Value::Str(s.clone())).collect())
        }
    }
}

fn int_array(values: impl Iterator<Item = i64>) -> Value {
    Value::Array(values.map(Value::Int).collect())
}

/// SPDF-style format code for a variable's element type.
///
/// `text_max` is the longest string in a text variable; ignored otherwise.
pub fn format_code(dtype: DType, text_max: usize) -> String {
    match dtype {
        DType::Int64 | DType::Time => "i8".to_string(),
        DType::Float64 => "f8".to_string(),
        DType::Text => format!("S{}", text_max.max(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_attr_roundtrip() {
        let cases = vec![
            Value::Int(-3),
            Value::Float(2.5),
            Value::Str("hours".to_string()),
            Value::Array(vec![Value::Float(1.0), Value::Float(2.0)]),
        ];
        for value in cases {
            let attr = value_to_attr(&value).expect("representable");
            assert_eq!(attr_to_value(&attr), value);
        }
    }

    #[test]
    fn test_bool_becomes_int() {
        let attr = value_to_attr(&Value::Bool(true)).expect("representable");
        assert_eq!(attr_to_value(&attr), Value::Int(1));
    }

    #[test]
    fn test_mixed_array_unrepresentable() {
        let mixed = Value::Array(vec![Value::Float(1.0), Value::Str("x".to_string())]);
        assert!(value_to_attr(&mixed).is_none());
    }

    #[test]
    fn test_format_codes() {
        assert_eq!(format_code(DType::Int64, 0), "i8");
        assert_eq!(format_code(DType::Time, 0), "i8");
        assert_eq!(format_code(DType::Float64, 0), "f8");
        assert_eq!(format_code(DType::Text, 12), "S12");
        assert_eq!(format_code(DType::Text, 0), "S1");
    }
}
