//! HTTP client for the wallet service, one method per endpoint

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::{
  config::HarnessConfig,
  error::{HarnessError, Result},
  net::{BankAccount, CashoutRequest, TopUpRequest, WalletCreationRequest},
  transactions::TransferRequest,
  wallet::Currency,
};

/// A response as seen by the harness: status plus raw body text
#[derive(Debug, Clone)]
pub struct ApiResponse {
  pub method: Method,
  pub url: String,
  pub status: StatusCode,
  pub text: String,
}

impl ApiResponse {
  /// Parse the body as JSON, an empty body reads as `null`
  pub fn json(&self) -> Result<Value> {
    if self.text.trim().is_empty() {
      return Ok(Value::Null);
    }
    serde_json::from_str(&self.text).map_err(|source| HarnessError::Decode {
      url: self.url.clone(),
      status: self.status,
      source,
    })
  }
}

#[derive(Debug, Clone)]
pub struct WalletApiClient {
  base_url: Url,
  auth_token: Option<String>,
  client: Client,
}

impl WalletApiClient {
  pub fn new(
    base_url: &str,
    auth_token: Option<String>,
    request_timeout: Option<Duration>,
  ) -> Result<Self> {
    let invalid = |reason: String| HarnessError::InvalidBaseUrl {
      url: base_url.to_string(),
      reason,
    };

    let base_url = Url::parse(base_url).map_err(|err| invalid(err.to_string()))?;
    if base_url.cannot_be_a_base() {
      return Err(invalid("url cannot be a base".into()));
    }

    let mut builder = Client::builder();
    if let Some(timeout) = request_timeout {
      builder = builder.timeout(timeout);
    }
    let client = builder
      .build()
      .map_err(|err| HarnessError::Config(format!("cannot build http client: {}", err)))?;

    Ok(WalletApiClient {
      base_url,
      auth_token,
      client,
    })
  }

  pub fn from_config(config: &HarnessConfig) -> Result<Self> {
    Self::new(
      &config.base_url,
      config.auth_token.clone(),
      config.request_timeout,
    )
  }

  /// Append path segments to the base URL, keeping any path prefix it has
  pub fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  pub async fn create_wallet(&self, currency: Currency) -> Result<ApiResponse> {
    self
      .send(
        Method::POST,
        &["wallets"],
        Some(&WalletCreationRequest { currency }),
        false,
      )
      .await
  }

  pub async fn get_wallet(&self, wallet_id: &str) -> Result<ApiResponse> {
    self
      .send::<()>(Method::GET, &["wallets", wallet_id], None, false)
      .await
  }

  pub async fn activate_wallet(&self, wallet_id: &str) -> Result<ApiResponse> {
    self
      .send::<()>(Method::PUT, &["wallets", wallet_id, "activate"], None, false)
      .await
  }

  pub async fn deactivate_wallet(&self, wallet_id: &str) -> Result<ApiResponse> {
    self
      .send::<()>(
        Method::PUT,
        &["wallets", wallet_id, "deactivate"],
        None,
        false,
      )
      .await
  }

  pub async fn get_balance(&self, wallet_id: &str) -> Result<ApiResponse> {
    self
      .send::<()>(Method::GET, &["wallets", wallet_id, "balance"], None, true)
      .await
  }

  pub async fn top_up(
    &self,
    amount: u64,
    currency: Currency,
    email: Option<String>,
  ) -> Result<ApiResponse> {
    let request = TopUpRequest {
      amount,
      currency,
      email,
    };
    self
      .send(Method::POST, &["wallets", "topup"], Some(&request), true)
      .await
  }

  pub async fn cash_out(
    &self,
    amount: u64,
    currency: Currency,
    destination: &BankAccount,
  ) -> Result<ApiResponse> {
    let request = CashoutRequest {
      amount,
      currency,
      destination: destination.clone(),
    };
    self
      .send(Method::POST, &["wallets", "cashout"], Some(&request), true)
      .await
  }

  pub async fn transfer(&self, request: &TransferRequest) -> Result<ApiResponse> {
    self
      .send(Method::POST, &["transfers"], Some(request), true)
      .await
  }

  async fn send<T: Serialize>(
    &self,
    method: Method,
    segments: &[&str],
    body: Option<&T>,
    authenticated: bool,
  ) -> Result<ApiResponse> {
    let url = self.endpoint(segments);
    let mut request: RequestBuilder = self.client.request(method.clone(), url.clone());
    if let Some(body) = body {
      request = request.json(body);
    }
    if authenticated {
      if let Some(token) = &self.auth_token {
        request = request.bearer_auth(token);
      }
    }

    let transport = |source| HarnessError::Transport {
      url: url.to_string(),
      source,
    };
    let response = request.send().await.map_err(transport)?;
    let status = response.status();
    let text = response.text().await.map_err(transport)?;

    debug!(%method, %url, %status, body = %text, "wallet api response");

    Ok(ApiResponse {
      method,
      url: url.to_string(),
      status,
      text,
    })
  }
}
