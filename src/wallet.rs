use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HarnessError, Result};

/// Currency codes the wallet service accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
  Ngn,
  Usd,
  Eur,
}

impl Currency {
  pub const ALL: [Currency; 3] = [Currency::Ngn, Currency::Usd, Currency::Eur];

  pub fn code(&self) -> &'static str {
    match self {
      Currency::Ngn => "NGN",
      Currency::Usd => "USD",
      Currency::Eur => "EUR",
    }
  }
}

impl fmt::Display for Currency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.code())
  }
}

impl FromStr for Currency {
  type Err = HarnessError;

  fn from_str(s: &str) -> Result<Self> {
    Currency::ALL
      .into_iter()
      .find(|currency| currency.code().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| {
        HarnessError::Config(format!(
          "unsupported currency `{}`, expected one of NGN, USD, EUR",
          s
        ))
      })
  }
}

/// A wallet created during setup and handed to every case that needs it.
///
/// `record` is the creation response as returned by the service.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletHandle {
  pub id: String,
  pub record: Value,
}

impl WalletHandle {
  pub fn from_record(record: Value) -> Result<Self> {
    let id = match record.get("id") {
      Some(Value::String(id)) if !id.is_empty() => id.clone(),
      other => {
        return Err(HarnessError::assertion(format!(
          "created wallet has no usable `id` (got {})",
          other.map(Value::to_string).unwrap_or_else(|| "nothing".into())
        )))
      }
    };

    Ok(WalletHandle { id, record })
  }
}
