use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::wallet::Currency;

/// Fields a transfer record must carry
pub const TRANSFER_RECORD_FIELDS: [&str; 3] = ["amount", "fromWalletId", "toWalletId"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
  pub destination_username: String,
  pub amount: u64,
  pub currency: Currency,
  pub idempotency_key: String,
}

impl TransferRequest {
  /// Build a transfer with a fresh idempotency key
  pub fn new(destination_username: impl Into<String>, amount: u64, currency: Currency) -> Self {
    TransferRequest {
      destination_username: destination_username.into(),
      amount,
      currency,
      idempotency_key: new_idempotency_key(),
    }
  }
}

pub fn new_idempotency_key() -> String {
  Uuid::new_v4().to_string()
}
