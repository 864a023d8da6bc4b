//! Status and payload assertions
//!
//! Every check returns `HarnessError::Assertion` on mismatch, naming the step
//! so a failure report points at the request that broke the contract.

use reqwest::StatusCode;
use serde_json::Value;

use crate::{
  client::ApiResponse,
  error::{HarnessError, Result},
};

/// Statuses accepted for calls that may create or just acknowledge
pub const SUCCESS: [StatusCode; 2] = [StatusCode::OK, StatusCode::CREATED];

pub fn expect_status(step: &str, response: &ApiResponse, expected: &[StatusCode]) -> Result<()> {
  if expected.contains(&response.status) {
    return Ok(());
  }

  let expected = expected
    .iter()
    .map(|status| status.as_u16().to_string())
    .collect::<Vec<_>>()
    .join(" or ");
  Err(HarnessError::assertion(format!(
    "{}: expected status {}, got {} from {} {} (body: {})",
    step,
    expected,
    response.status.as_u16(),
    response.method,
    response.url,
    truncate(&response.text)
  )))
}

/// Check the status, then parse the body
pub fn expect_json(step: &str, response: &ApiResponse, expected: &[StatusCode]) -> Result<Value> {
  expect_status(step, response, expected)?;
  response.json()
}

pub fn expect_field<'a>(step: &str, body: &'a Value, field: &str) -> Result<&'a Value> {
  body
    .get(field)
    .ok_or_else(|| HarnessError::assertion(format!("{}: `{}` missing from {}", step, field, body)))
}

pub fn expect_fields(step: &str, body: &Value, fields: &[&str]) -> Result<()> {
  for field in fields {
    expect_field(step, body, field)?;
  }
  Ok(())
}

/// At least one of `fields` is present
pub fn expect_any_field(step: &str, body: &Value, fields: &[&str]) -> Result<()> {
  if fields.iter().any(|field| body.get(field).is_some()) {
    return Ok(());
  }
  Err(HarnessError::assertion(format!(
    "{}: expected one of {} in {}",
    step,
    fields.join(", "),
    body
  )))
}

pub fn expect_value(step: &str, body: &Value, field: &str, expected: &Value) -> Result<()> {
  let actual = expect_field(step, body, field)?;
  if actual == expected {
    return Ok(());
  }
  Err(HarnessError::assertion(format!(
    "{}: expected `{}` to be {}, got {}",
    step, field, expected, actual
  )))
}

pub fn expect_bool(step: &str, body: &Value, field: &str, expected: bool) -> Result<()> {
  expect_value(step, body, field, &Value::Bool(expected))
}

pub fn expect_non_empty_str<'a>(step: &str, body: &'a Value, field: &str) -> Result<&'a str> {
  match expect_field(step, body, field)? {
    Value::String(s) if !s.is_empty() => Ok(s.as_str()),
    other => Err(HarnessError::assertion(format!(
      "{}: expected `{}` to be a non-empty string, got {}",
      step, field, other
    ))),
  }
}

pub fn expect_number(step: &str, body: &Value, field: &str) -> Result<f64> {
  let value = expect_field(step, body, field)?;
  value.as_f64().ok_or_else(|| {
    HarnessError::assertion(format!(
      "{}: expected `{}` to be a number, got {}",
      step, field, value
    ))
  })
}

fn truncate(text: &str) -> String {
  const LIMIT: usize = 200;
  match text.char_indices().nth(LIMIT) {
    Some((idx, _)) => format!("{}...", &text[..idx]),
    None => text.to_string(),
  }
}
