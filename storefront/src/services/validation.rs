// storefront/src/services/validation.rs

//! Shared pieces of payload validation. Field rules live on the payload types
//! as `validator` attributes; this module parses bodies, runs those rules and
//! adds the checks `validator` cannot express (money columns, PUT vs PATCH).
//! Messages follow the wording API clients already display verbatim.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::errors::{AppError, FieldErrors, Result};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const INVALID_INTEGER: &str = "A valid integer is required.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub fn double_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
  T: Deserialize<'de>,
  D: Deserializer<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}

/// Whether a payload must carry every required field (create / PUT) or only
/// the ones being changed (PATCH).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Full,
  Partial,
}

impl Mode {
  pub fn is_full(self) -> bool {
    self == Mode::Full
  }
}

/// Deserializes a JSON object body into a payload whose fields are all
/// optional. A field holding a value of the wrong type is reported under its
/// own name instead of failing the whole body.
pub fn parse_payload<T: DeserializeOwned>(body: Value) -> Result<T> {
  let Value::Object(fields) = body else {
    return Err(AppError::Validation("Invalid data. Expected a JSON object.".to_string()));
  };
  let whole = match serde_json::from_value::<T>(Value::Object(fields.clone())) {
    Ok(payload) => return Ok(payload),
    Err(e) => e,
  };

  let mut errors = FieldErrors::new();
  for (name, value) in &fields {
    let mut single = Map::new();
    single.insert(name.clone(), value.clone());
    if let Err(e) = serde_json::from_value::<T>(Value::Object(single)) {
      errors.add(name.clone(), format!("Invalid value: {}.", e));
    }
  }
  if errors.is_empty() {
    errors.add("non_field_errors", whole.to_string());
  }
  Err(AppError::Fields(errors))
}

/// Runs the payload's `validator` rules and collects any failures by field.
pub fn check<T: Validate>(payload: &T) -> FieldErrors {
  match payload.validate() {
    Ok(()) => FieldErrors::new(),
    Err(e) => FieldErrors::from(e),
  }
}

impl From<ValidationErrors> for FieldErrors {
  fn from(errors: ValidationErrors) -> Self {
    let mut fields = FieldErrors::new();
    flatten(&mut fields, "", &errors);
    fields
  }
}

// Nested structs become `outer.inner`, list entries `outer[i].inner`.
fn flatten(fields: &mut FieldErrors, prefix: &str, errors: &ValidationErrors) {
  for (name, kind) in errors.errors() {
    let key = format!("{}{}", prefix, name);
    match kind {
      ValidationErrorsKind::Field(failures) => {
        for failure in failures {
          fields.add(key.clone(), describe(failure));
        }
      }
      ValidationErrorsKind::Struct(inner) => flatten(fields, &format!("{}.", key), inner),
      ValidationErrorsKind::List(entries) => {
        for (index, inner) in entries {
          flatten(fields, &format!("{}[{}].", key, index), inner);
        }
      }
    }
  }
}

/// An explicit `message` wins; otherwise the wording is derived from the rule.
fn describe(failure: &ValidationError) -> String {
  if let Some(message) = &failure.message {
    return message.to_string();
  }
  let param = |name: &str| failure.params.get(name).and_then(Value::as_f64);
  match failure.code.as_ref() {
    "required" => REQUIRED.to_string(),
    "email" => INVALID_EMAIL.to_string(),
    "length" => {
      let len = failure.params.get("value").and_then(|v| match v {
        Value::String(s) => Some(s.chars().count() as f64),
        Value::Array(items) => Some(items.len() as f64),
        _ => None,
      });
      match (len, param("min"), param("max")) {
        (Some(len), Some(min), _) if len < min && min <= 1.0 => BLANK.to_string(),
        (Some(len), Some(min), _) if len < min => format!("Ensure this field has at least {} characters.", min),
        (_, _, Some(max)) => format!("Ensure this field has no more than {} characters.", max),
        _ => BLANK.to_string(),
      }
    }
    "range" => match (param("value"), param("min"), param("max")) {
      (Some(value), Some(min), _) if value < min => format!("Ensure this value is greater than or equal to {}.", min),
      (_, _, Some(max)) => format!("Ensure this value is less than or equal to {}.", max),
      (_, Some(min), None) => format!("Ensure this value is greater than or equal to {}.", min),
      _ => "Value is out of range.".to_string(),
    },
    code => format!("Invalid value ({}).", code),
  }
}

/// Records `REQUIRED` for each absent field, but only for full payloads.
pub fn require(errors: &mut FieldErrors, mode: Mode, fields: &[(&str, bool)]) {
  if !mode.is_full() {
    return;
  }
  for (field, present) in fields {
    if !present {
      errors.add(*field, REQUIRED);
    }
  }
}

/// Text is trimmed before the `length(min = 1)` blank check runs.
pub fn trimmed(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_string())
}

/// Trims nullable text; an empty string clears the value.
pub fn trimmed_nullable(value: Option<Option<String>>) -> Option<Option<String>> {
  value.map(|inner| inner.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
}

/// Money column check: NUMERIC(10, 2).
pub fn money(errors: &mut FieldErrors, field: &str, value: Decimal) -> Option<Decimal> {
  let value = value.normalize();
  if value.scale() > 2 {
    errors.add(field, "Ensure that there are no more than 2 decimal places.");
    return None;
  }
  // 10 digits in total with 2 reserved for the fraction
  if value.abs() >= Decimal::new(100_000_000, 0) {
    errors.add(field, "Ensure that there are no more than 10 digits in total.");
    return None;
  }
  let mut value = value;
  value.rescale(2);
  Some(value)
}

/// Lenient integer read from raw JSON: numbers and numeric strings are accepted.
pub fn integer_value(value: &Value) -> Option<i32> {
  match value {
    Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
    Value::String(s) => s.trim().parse::<i32>().ok(),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[derive(Debug, Default, Deserialize, Validate)]
  struct Catch {
    #[validate(length(min = 1, max = 5))]
    name: Option<String>,
    weight: Option<Decimal>,
    #[validate(range(min = 1))]
    count: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    note: Option<Option<String>>,
  }

  #[test]
  fn check_collects_rule_failures_by_field() {
    let errors = check(&Catch { name: Some(String::new()), count: Some(0), ..Default::default() });
    assert_eq!(errors.get("name"), Some(&[BLANK.to_string()][..]));
    assert_eq!(
      errors.get("count"),
      Some(&["Ensure this value is greater than or equal to 1.".to_string()][..])
    );

    let errors = check(&Catch { name: Some("swordfish".into()), ..Default::default() });
    assert_eq!(
      errors.get("name"),
      Some(&["Ensure this field has no more than 5 characters.".to_string()][..])
    );
    assert!(check(&Catch::default()).is_empty());
  }

  #[derive(Debug, Validate)]
  struct Haul {
    #[validate(nested)]
    catches: Vec<Catch>,
  }

  #[test]
  fn list_failures_are_keyed_by_index() {
    let haul = Haul {
      catches: vec![
        Catch::default(),
        Catch { count: Some(-3), ..Default::default() },
      ],
    };
    let errors = check(&haul);
    assert!(errors.get("catches[0].count").is_none());
    assert!(errors.get("catches[1].count").is_some());
  }

  #[test]
  fn require_only_applies_to_full_payloads() {
    let mut errors = FieldErrors::new();
    require(&mut errors, Mode::Partial, &[("name", false)]);
    assert!(errors.is_empty());
    require(&mut errors, Mode::Full, &[("name", false), ("count", true)]);
    assert_eq!(errors.get("name"), Some(&[REQUIRED.to_string()][..]));
    assert!(errors.get("count").is_none());
  }

  #[test]
  fn parse_payload_reports_type_errors_per_field() {
    let err = parse_payload::<Catch>(json!({"name": "cod", "weight": "heavy", "count": "x"})).unwrap_err();
    match err {
      AppError::Fields(fields) => {
        assert!(fields.get("weight").is_some());
        assert!(fields.get("count").is_some());
        assert!(fields.get("name").is_none());
      }
      other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(parse_payload::<Catch>(json!([1, 2])), Err(AppError::Validation(_))));

    let ok: Catch = parse_payload(json!({"weight": "2.50", "unknown": true})).unwrap();
    assert_eq!(ok.weight, Some(Decimal::new(250, 2)));
  }

  #[test]
  fn money_checks_scale_and_digits() {
    let mut errors = FieldErrors::new();
    assert_eq!(money(&mut errors, "price", Decimal::new(1250, 2)), Some(Decimal::new(1250, 2)));
    // trailing zeros do not count as decimal places
    assert_eq!(money(&mut errors, "price", Decimal::new(12500, 3)), Some(Decimal::new(1250, 2)));
    assert!(errors.is_empty());

    assert_eq!(money(&mut errors, "price", Decimal::new(12505, 3)), None);
    assert_eq!(money(&mut errors, "total", Decimal::new(100_000_000, 0)), None);
    assert!(errors.get("price").is_some());
    assert!(errors.get("total").is_some());
  }

  #[test]
  fn integer_value_accepts_numbers_and_numeric_strings() {
    assert_eq!(integer_value(&json!(-4)), Some(-4));
    assert_eq!(integer_value(&json!("12")), Some(12));
    assert_eq!(integer_value(&json!("twelve")), None);
    assert_eq!(integer_value(&json!(1.5)), None);
    assert_eq!(integer_value(&json!(null)), None);
  }

  #[test]
  fn trimming_clears_empty_nullable_text() {
    assert_eq!(trimmed(Some("  tuna ".into())), Some("tuna".into()));
    assert_eq!(trimmed_nullable(Some(Some("  ".into()))), Some(None));
    assert_eq!(trimmed_nullable(Some(None)), Some(None));
    assert_eq!(trimmed_nullable(None), None);
  }

  #[test]
  fn double_option_separates_absent_from_null() {
    let absent: Catch = serde_json::from_value(json!({})).unwrap();
    let null: Catch = serde_json::from_value(json!({"note": null})).unwrap();
    let set: Catch = serde_json::from_value(json!({"note": "fresh"})).unwrap();
    assert_eq!(absent.note, None);
    assert_eq!(null.note, Some(None));
    assert_eq!(set.note, Some(Some("fresh".into())));
  }
}
