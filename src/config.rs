//! Harness configuration
//!
//! Values come from the command line, the environment, or a TOML config file,
//! in that order of precedence.

use std::{
  fs,
  path::{Path, PathBuf},
  time::Duration,
};

use clap::Parser;
use reqwest::Url;
use serde::Deserialize;

use crate::{
  error::{HarnessError, Result},
  net::BankAccount,
  scenarios::Case,
  settle::SettlePolicy,
  wallet::Currency,
};

pub const DEFAULT_TOPUP_AMOUNT: u64 = 1000;
pub const DEFAULT_CASHOUT_AMOUNT: u64 = 500;
pub const DEFAULT_CHANGE_CASHOUT_AMOUNT: u64 = 1000;
pub const DEFAULT_TRANSFER_AMOUNT: u64 = 200;
pub const DEFAULT_DESTINATION_USERNAME: &str = "destination_user";
pub const DEFAULT_BANK_ACCOUNT_NUMBER: &str = "1234567890";
pub const DEFAULT_BANK_CODE: &str = "044";

#[derive(Parser, Debug, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
  /// Base URL of the wallet service, e.g. https://staging.example.com/
  #[clap(long, env = "WALLET_E2E_BASE_URL")]
  pub base_url: Option<String>,

  /// Bearer token attached to authenticated calls
  #[clap(long, env = "WALLET_E2E_AUTH_TOKEN", hide_env_values = true)]
  pub auth_token: Option<String>,

  /// Currency used for every wallet and payment
  #[clap(long, env = "WALLET_E2E_CURRENCY")]
  pub currency: Option<String>,

  #[clap(long)]
  pub topup_amount: Option<u64>,

  /// Email sent with top-up requests
  #[clap(long, env = "WALLET_E2E_TOPUP_EMAIL")]
  pub topup_email: Option<String>,

  #[clap(long)]
  pub cashout_amount: Option<u64>,

  /// Cashout amount used by the balance-change check
  #[clap(long)]
  pub change_cashout_amount: Option<u64>,

  #[clap(long)]
  pub transfer_amount: Option<u64>,

  #[clap(long)]
  pub destination_username: Option<String>,

  #[clap(long)]
  pub bank_account_number: Option<String>,

  #[clap(long)]
  pub bank_code: Option<String>,

  /// Per-request timeout, unset means the HTTP client default
  #[clap(long)]
  pub request_timeout_secs: Option<u64>,

  /// Total time to wait for a balance change to settle
  #[clap(long)]
  pub settle_timeout_ms: Option<u64>,

  #[clap(long)]
  pub settle_initial_delay_ms: Option<u64>,

  #[clap(long)]
  pub settle_max_delay_ms: Option<u64>,

  /// TOML file with any of the options above, keys in kebab-case
  #[clap(long, env = "WALLET_E2E_CONFIG")]
  pub config_file: Option<PathBuf>,

  /// Run only the named case (repeatable)
  #[clap(long = "only", value_name = "CASE")]
  pub only: Vec<String>,

  /// Print the case names and exit
  #[clap(long)]
  pub list: bool,

  /// Print the report as JSON
  #[clap(long)]
  pub json: bool,

  /// Increase log verbosity (-v debug, -vv trace)
  #[clap(short, long, parse(from_occurrences))]
  pub verbose: u64,
}

/// Options that may be set in the config file
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
  pub base_url: Option<String>,
  pub auth_token: Option<String>,
  pub currency: Option<String>,
  pub topup_amount: Option<u64>,
  pub topup_email: Option<String>,
  pub cashout_amount: Option<u64>,
  pub change_cashout_amount: Option<u64>,
  pub transfer_amount: Option<u64>,
  pub destination_username: Option<String>,
  pub bank_account_number: Option<String>,
  pub bank_code: Option<String>,
  pub request_timeout_secs: Option<u64>,
  pub settle_timeout_ms: Option<u64>,
  pub settle_initial_delay_ms: Option<u64>,
  pub settle_max_delay_ms: Option<u64>,
}

impl FileConfig {
  pub fn from_toml(path: &str, contents: &str) -> Result<Self> {
    toml::from_str(contents).map_err(|source| HarnessError::ConfigFile {
      path: path.to_string(),
      source,
    })
  }

  pub fn load(path: &Path) -> Result<Self> {
    let display = path.display().to_string();
    let contents = fs::read_to_string(path).map_err(|source| HarnessError::ConfigIo {
      path: display.clone(),
      source,
    })?;
    Self::from_toml(&display, &contents)
  }
}

/// Fully resolved configuration for one run
#[derive(Debug, Clone)]
pub struct HarnessConfig {
  pub base_url: String,
  pub auth_token: Option<String>,
  pub currency: Currency,
  pub topup_amount: u64,
  pub topup_email: Option<String>,
  pub cashout_amount: u64,
  pub change_cashout_amount: u64,
  pub transfer_amount: u64,
  pub destination_username: String,
  pub bank_account: BankAccount,
  pub request_timeout: Option<Duration>,
  pub settle: SettlePolicy,
}

impl HarnessConfig {
  /// Defaults for everything but the base URL
  pub fn new(base_url: impl Into<String>) -> Self {
    HarnessConfig {
      base_url: base_url.into(),
      auth_token: None,
      currency: Currency::Ngn,
      topup_amount: DEFAULT_TOPUP_AMOUNT,
      topup_email: None,
      cashout_amount: DEFAULT_CASHOUT_AMOUNT,
      change_cashout_amount: DEFAULT_CHANGE_CASHOUT_AMOUNT,
      transfer_amount: DEFAULT_TRANSFER_AMOUNT,
      destination_username: DEFAULT_DESTINATION_USERNAME.to_string(),
      bank_account: BankAccount {
        bank_account_number: DEFAULT_BANK_ACCOUNT_NUMBER.to_string(),
        bank_code: DEFAULT_BANK_CODE.to_string(),
      },
      request_timeout: None,
      settle: SettlePolicy::default(),
    }
  }

  pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
    self.auth_token = Some(token.into());
    self
  }

  pub fn with_settle_policy(mut self, settle: SettlePolicy) -> Self {
    self.settle = settle;
    self
  }

  pub fn validate(&self) -> Result<()> {
    let url = Url::parse(&self.base_url).map_err(|err| HarnessError::InvalidBaseUrl {
      url: self.base_url.clone(),
      reason: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
      return Err(HarnessError::InvalidBaseUrl {
        url: self.base_url.clone(),
        reason: format!("unsupported scheme `{}`", url.scheme()),
      });
    }

    for (name, amount) in [
      ("topup-amount", self.topup_amount),
      ("cashout-amount", self.cashout_amount),
      ("change-cashout-amount", self.change_cashout_amount),
      ("transfer-amount", self.transfer_amount),
    ] {
      if amount == 0 {
        return Err(HarnessError::Config(format!("{} must be positive", name)));
      }
    }

    if self.destination_username.trim().is_empty() {
      return Err(HarnessError::Config(
        "destination-username must not be empty".into(),
      ));
    }

    self.settle.validate()
  }
}

impl Args {
  /// Merge CLI/env values over the config file and defaults
  pub fn resolve(&self) -> Result<HarnessConfig> {
    let file = match &self.config_file {
      Some(path) => FileConfig::load(path)?,
      None => FileConfig::default(),
    };
    self.resolve_with(file)
  }

  pub fn resolve_with(&self, file: FileConfig) -> Result<HarnessConfig> {
    let base_url = self.base_url.clone().or(file.base_url).ok_or_else(|| {
      HarnessError::Config("no base url, set --base-url or WALLET_E2E_BASE_URL".into())
    })?;

    let mut config = HarnessConfig::new(base_url);
    config.auth_token = self.auth_token.clone().or(file.auth_token);
    if let Some(currency) = self.currency.as_ref().or(file.currency.as_ref()) {
      config.currency = currency.parse()?;
    }
    config.topup_amount = self
      .topup_amount
      .or(file.topup_amount)
      .unwrap_or(config.topup_amount);
    config.topup_email = self.topup_email.clone().or(file.topup_email);
    config.cashout_amount = self
      .cashout_amount
      .or(file.cashout_amount)
      .unwrap_or(config.cashout_amount);
    config.change_cashout_amount = self
      .change_cashout_amount
      .or(file.change_cashout_amount)
      .unwrap_or(config.change_cashout_amount);
    config.transfer_amount = self
      .transfer_amount
      .or(file.transfer_amount)
      .unwrap_or(config.transfer_amount);
    if let Some(username) = self
      .destination_username
      .clone()
      .or(file.destination_username)
    {
      config.destination_username = username;
    }
    if let Some(number) = self
      .bank_account_number
      .clone()
      .or(file.bank_account_number)
    {
      config.bank_account.bank_account_number = number;
    }
    if let Some(code) = self.bank_code.clone().or(file.bank_code) {
      config.bank_account.bank_code = code;
    }
    config.request_timeout = self
      .request_timeout_secs
      .or(file.request_timeout_secs)
      .map(Duration::from_secs);

    let settle = &mut config.settle;
    if let Some(ms) = self.settle_timeout_ms.or(file.settle_timeout_ms) {
      settle.timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = self.settle_initial_delay_ms.or(file.settle_initial_delay_ms) {
      settle.initial_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = self.settle_max_delay_ms.or(file.settle_max_delay_ms) {
      settle.max_delay = Duration::from_millis(ms);
    }

    config.validate()?;
    Ok(config)
  }

  /// Cases selected with `--only`, or every case in order
  pub fn selected_cases(&self) -> Result<Vec<Case>> {
    if self.only.is_empty() {
      return Ok(Case::ALL.to_vec());
    }

    let mut wanted = Vec::with_capacity(self.only.len());
    for name in &self.only {
      let case = Case::from_name(name)
        .ok_or_else(|| HarnessError::Config(format!("unknown case `{}`", name)))?;
      wanted.push(case);
    }

    // Keep the fixed order regardless of flag order
    Ok(
      Case::ALL
        .into_iter()
        .filter(|case| wanted.contains(case))
        .collect(),
    )
  }
}
