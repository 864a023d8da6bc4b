//! Request payloads sent to the wallet service

use serde::{Deserialize, Serialize};

use crate::wallet::Currency;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletCreationRequest {
  pub currency: Currency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUpRequest {
  pub amount: u64,
  pub currency: Currency,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
}

/// Destination bank account for cashouts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
  pub bank_account_number: String,
  pub bank_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashoutRequest {
  pub amount: u64,
  pub currency: Currency,
  #[serde(flatten)]
  pub destination: BankAccount,
}
