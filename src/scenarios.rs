//! The fixed scenario cases run against the wallet service

use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
  checks::{
    expect_any_field, expect_bool, expect_fields, expect_json, expect_non_empty_str,
    expect_number, expect_status, expect_value, SUCCESS,
  },
  client::WalletApiClient,
  config::HarnessConfig,
  error::{HarnessError, Result},
  settle::{read_balance, wait_for_balance},
  transactions::{TransferRequest, TRANSFER_RECORD_FIELDS},
  wallet::WalletHandle,
};

/// Every case, in the order it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Case {
  WalletCreation,
  WalletActivation,
  WalletFetch,
  WalletBalance,
  TopUpAndBalanceUpdate,
  Cashout,
  BalanceChangesAfterTransactions,
  WalletToWalletTransfer,
  WalletDeactivation,
}

impl Case {
  pub const ALL: [Case; 9] = [
    Case::WalletCreation,
    Case::WalletActivation,
    Case::WalletFetch,
    Case::WalletBalance,
    Case::TopUpAndBalanceUpdate,
    Case::Cashout,
    Case::BalanceChangesAfterTransactions,
    Case::WalletToWalletTransfer,
    Case::WalletDeactivation,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      Case::WalletCreation => "wallet_creation",
      Case::WalletActivation => "wallet_activation",
      Case::WalletFetch => "wallet_fetch",
      Case::WalletBalance => "wallet_balance",
      Case::TopUpAndBalanceUpdate => "topup_and_balance_update",
      Case::Cashout => "cashout",
      Case::BalanceChangesAfterTransactions => "balance_changes_after_transactions",
      Case::WalletToWalletTransfer => "wallet_to_wallet_transfer",
      Case::WalletDeactivation => "wallet_deactivation",
    }
  }

  pub fn from_name(name: &str) -> Option<Case> {
    Case::ALL.into_iter().find(|case| case.name() == name)
  }

  /// Whether the case runs against the primary wallet
  pub fn needs_primary_wallet(&self) -> bool {
    !matches!(self, Case::WalletDeactivation)
  }

  /// Whether the case needs a second, activated wallet
  pub fn needs_secondary_wallet(&self) -> bool {
    matches!(
      self,
      Case::WalletToWalletTransfer | Case::WalletDeactivation
    )
  }
}

impl fmt::Display for Case {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Client and configuration shared by every case
#[derive(Debug, Clone)]
pub struct Harness {
  pub client: WalletApiClient,
  pub config: HarnessConfig,
}

impl Harness {
  pub fn new(config: HarnessConfig) -> Result<Self> {
    config.validate()?;
    let client = WalletApiClient::from_config(&config)?;
    if config.auth_token.is_none() {
      warn!("no auth token configured, authenticated calls will be sent without one");
    }
    Ok(Harness { client, config })
  }

  /// Create the wallet the cases share
  pub async fn create_wallet(&self) -> Result<WalletHandle> {
    let response = self.client.create_wallet(self.config.currency).await?;
    let record = expect_json("create wallet", &response, &[StatusCode::CREATED])?;
    let wallet = WalletHandle::from_record(record)?;
    info!(wallet_id = %wallet.id, currency = %self.config.currency, "created wallet");
    Ok(wallet)
  }

  /// Create and activate a second wallet
  pub async fn create_activated_wallet(&self) -> Result<WalletHandle> {
    let wallet = self.create_wallet().await?;
    let response = self.client.activate_wallet(&wallet.id).await?;
    expect_status("activate wallet", &response, &[StatusCode::OK])?;
    info!(wallet_id = %wallet.id, "activated wallet");
    Ok(wallet)
  }

  pub async fn wallet_creation(&self, wallet: &WalletHandle) -> Result<()> {
    let step = "wallet creation";
    let record = &wallet.record;
    expect_value(
      step,
      record,
      "currency",
      &Value::from(self.config.currency.code()),
    )?;
    expect_bool(step, record, "isActive", false)?;
    expect_non_empty_str(step, record, "id")?;
    Ok(())
  }

  pub async fn wallet_activation(&self, wallet: &WalletHandle) -> Result<()> {
    let step = "wallet activation";
    let response = self.client.activate_wallet(&wallet.id).await?;
    let body = expect_json(step, &response, &[StatusCode::OK])?;
    expect_bool(step, &body, "isActive", true)
  }

  pub async fn wallet_fetch(&self, wallet: &WalletHandle) -> Result<()> {
    let step = "wallet fetch";
    let response = self.client.get_wallet(&wallet.id).await?;
    let body = expect_json(step, &response, &[StatusCode::OK])?;
    expect_value(step, &body, "id", &Value::from(wallet.id.as_str()))
  }

  pub async fn wallet_balance(&self, wallet: &WalletHandle) -> Result<()> {
    let step = "wallet balance";
    let response = self.client.get_balance(&wallet.id).await?;
    let body = expect_json(step, &response, &[StatusCode::OK])?;
    let balance = expect_number(step, &body, "availableBalance")?;
    if balance != 0.0 {
      return Err(HarnessError::assertion(format!(
        "{}: expected a fresh wallet to hold 0, got {}",
        step, balance
      )));
    }
    Ok(())
  }

  pub async fn topup_and_balance_update(&self, wallet: &WalletHandle) -> Result<()> {
    let step = "top-up";
    let before = read_balance(&self.client.get_balance(&wallet.id).await?);

    let response = self
      .client
      .top_up(
        self.config.topup_amount,
        self.config.currency,
        self.config.topup_email.clone(),
      )
      .await?;
    let body = expect_json(step, &response, &SUCCESS)?;
    // Synchronous credits echo the amount, gateway-backed ones return a link
    expect_any_field(step, &body, &["paymentLink", "amount"])?;

    let observation =
      wait_for_balance(&self.client, &wallet.id, &self.config.settle, |balance| {
        before.map(|before| balance != before).unwrap_or(true)
      })
      .await?;
    if !observation.settled {
      warn!(
        wallet_id = %wallet.id,
        attempts = observation.attempts,
        "balance unchanged after top-up"
      );
    }
    expect_status(
      "balance after top-up",
      &observation.response,
      &[StatusCode::OK],
    )
  }

  pub async fn cashout(&self, _wallet: &WalletHandle) -> Result<()> {
    let step = "cashout";
    let response = self
      .client
      .cash_out(
        self.config.cashout_amount,
        self.config.currency,
        &self.config.bank_account,
      )
      .await?;
    let body = expect_json(step, &response, &SUCCESS)?;
    expect_any_field(step, &body, &["status", "id"])
  }

  pub async fn balance_changes_after_transactions(&self, wallet: &WalletHandle) -> Result<()> {
    let step = "balance change";
    let response = self.client.get_balance(&wallet.id).await?;
    let body = expect_json("initial balance", &response, &[StatusCode::OK])?;
    let initial = expect_number("initial balance", &body, "availableBalance")?;

    for _ in 0..2 {
      let response = self
        .client
        .top_up(
          self.config.topup_amount,
          self.config.currency,
          self.config.topup_email.clone(),
        )
        .await?;
      if !response.status.is_success() {
        warn!(status = %response.status, "top-up during balance check was not accepted");
      }
    }
    let response = self
      .client
      .cash_out(
        self.config.change_cashout_amount,
        self.config.currency,
        &self.config.bank_account,
      )
      .await?;
    if !response.status.is_success() {
      warn!(status = %response.status, "cashout during balance check was not accepted");
    }

    let observation = wait_for_balance(&self.client, &wallet.id, &self.config.settle, |balance| {
      balance != initial
    })
    .await?;
    let body = expect_json(step, &observation.response, &[StatusCode::OK])?;
    let current = expect_number(step, &body, "availableBalance")?;
    if current == initial {
      return Err(HarnessError::assertion(format!(
        "{}: balance stayed at {} after two top-ups and a cashout ({} polls)",
        step, current, observation.attempts
      )));
    }
    Ok(())
  }

  pub async fn wallet_to_wallet_transfer(
    &self,
    _source: &WalletHandle,
    _destination: &WalletHandle,
  ) -> Result<()> {
    let step = "transfer";
    let request = TransferRequest::new(
      self.config.destination_username.clone(),
      self.config.transfer_amount,
      self.config.currency,
    );
    info!(idempotency_key = %request.idempotency_key, "sending transfer");

    let response = self.client.transfer(&request).await?;
    let body = expect_json(step, &response, &SUCCESS)?;
    // Presence only, the service resolves wallets from the token and username
    expect_fields(step, &body, &TRANSFER_RECORD_FIELDS)
  }

  pub async fn wallet_deactivation(&self, wallet: &WalletHandle) -> Result<()> {
    let step = "wallet deactivation";
    let response = self.client.deactivate_wallet(&wallet.id).await?;
    let body = expect_json(step, &response, &[StatusCode::OK])?;
    expect_bool(step, &body, "isActive", false)
  }
}
