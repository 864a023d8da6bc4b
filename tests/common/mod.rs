//! In-process mock of the wallet service used by the integration tests

#![allow(dead_code)]

use std::{
  collections::HashMap,
  net::SocketAddr,
  sync::Arc,
  time::Duration,
};

use serde_json::{json, Value};
use tokio::sync::Mutex;
use uuid::Uuid;
use wallet_e2e::{settle::SettlePolicy, HarnessConfig};
use warp::{http::StatusCode, reply::Response, Filter, Reply};

pub const TOKEN: &str = "test-token";

#[derive(Debug, Clone, Default)]
pub struct MockOptions {
  /// Delay before top-up and cashout balance changes are applied
  pub settle_delay: Option<Duration>,
  /// Answer top-ups with a payment link instead of the credited amount
  pub payment_link_topups: bool,
  /// Leave wallets inactive on activation
  pub ignore_activation: bool,
  /// Answer wallet creation with 500
  pub fail_wallet_creation: bool,
  /// Drop contract fields from balance, top-up, cashout and transfer bodies
  pub malformed_bodies: bool,
  /// Balance new wallets start with
  pub opening_balance: i64,
}

#[derive(Debug, Clone)]
pub struct MockWallet {
  pub id: String,
  pub currency: String,
  pub is_active: bool,
  pub balance: i64,
}

impl MockWallet {
  fn record(&self) -> Value {
    json!({
      "id": self.id,
      "currency": self.currency,
      "isActive": self.is_active,
    })
  }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
  pub method: &'static str,
  pub path: String,
  pub authorized: bool,
  pub body: Value,
}

#[derive(Debug, Default)]
struct State {
  wallets: HashMap<String, MockWallet>,
  /// Creation order, the first wallet is the caller's own
  order: Vec<String>,
  /// Transfer records by idempotency key
  transfers: HashMap<String, Value>,
  requests: Vec<RecordedRequest>,
}

#[derive(Clone)]
pub struct MockWalletService {
  pub addr: SocketAddr,
  options: MockOptions,
  state: Arc<Mutex<State>>,
}

impl MockWalletService {
  pub async fn start(options: MockOptions) -> Self {
    let mut service = MockWalletService {
      addr: ([127, 0, 0, 1], 0).into(),
      options,
      state: Arc::new(Mutex::new(State::default())),
    };

    let node = service.clone();
    let create_route = warp::post()
      .and(warp::path("wallets"))
      .and(warp::path::end())
      .and(warp::body::json())
      .and_then(move |body: Value| {
        let node = node.clone();
        async move { Ok::<_, warp::Rejection>(node.create_wallet(body).await) }
      });

    let node = service.clone();
    let activate_route = warp::put()
      .and(warp::path!("wallets" / String / "activate"))
      .and_then(move |id: String| {
        let node = node.clone();
        async move { Ok::<_, warp::Rejection>(node.set_active(id, true).await) }
      });

    let node = service.clone();
    let deactivate_route = warp::put()
      .and(warp::path!("wallets" / String / "deactivate"))
      .and_then(move |id: String| {
        let node = node.clone();
        async move { Ok::<_, warp::Rejection>(node.set_active(id, false).await) }
      });

    let node = service.clone();
    let fetch_route = warp::get()
      .and(warp::path!("wallets" / String))
      .and_then(move |id: String| {
        let node = node.clone();
        async move { Ok::<_, warp::Rejection>(node.fetch_wallet(id).await) }
      });

    let node = service.clone();
    let balance_route = warp::get()
      .and(warp::path!("wallets" / String / "balance"))
      .and(warp::header::optional::<String>("authorization"))
      .and_then(move |id: String, auth: Option<String>| {
        let node = node.clone();
        async move { Ok::<_, warp::Rejection>(node.balance(id, auth).await) }
      });

    let node = service.clone();
    let topup_route = warp::post()
      .and(warp::path!("wallets" / "topup"))
      .and(warp::header::optional::<String>("authorization"))
      .and(warp::body::json())
      .and_then(move |auth: Option<String>, body: Value| {
        let node = node.clone();
        async move { Ok::<_, warp::Rejection>(node.top_up(auth, body).await) }
      });

    let node = service.clone();
    let cashout_route = warp::post()
      .and(warp::path!("wallets" / "cashout"))
      .and(warp::header::optional::<String>("authorization"))
      .and(warp::body::json())
      .and_then(move |auth: Option<String>, body: Value| {
        let node = node.clone();
        async move { Ok::<_, warp::Rejection>(node.cash_out(auth, body).await) }
      });

    let node = service.clone();
    let transfer_route = warp::post()
      .and(warp::path("transfers"))
      .and(warp::path::end())
      .and(warp::header::optional::<String>("authorization"))
      .and(warp::body::json())
      .and_then(move |auth: Option<String>, body: Value| {
        let node = node.clone();
        async move { Ok::<_, warp::Rejection>(node.transfer(auth, body).await) }
      });

    let routes = create_route
      .or(topup_route)
      .or(cashout_route)
      .or(activate_route)
      .or(deactivate_route)
      .or(balance_route)
      .or(fetch_route)
      .or(transfer_route);

    let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    service.addr = addr;
    service
  }

  pub fn base_url(&self) -> String {
    format!("http://{}/", self.addr)
  }

  /// Harness config pointed at this service with fast settlement polling
  pub fn harness_config(&self) -> HarnessConfig {
    HarnessConfig::new(self.base_url())
      .with_auth_token(TOKEN)
      .with_settle_policy(fast_settle())
  }

  pub async fn wallets(&self) -> Vec<MockWallet> {
    let state = self.state.lock().await;
    state
      .order
      .iter()
      .filter_map(|id| state.wallets.get(id).cloned())
      .collect()
  }

  pub async fn requests(&self) -> Vec<RecordedRequest> {
    self.state.lock().await.requests.clone()
  }

  pub async fn requests_to(&self, path_suffix: &str) -> Vec<RecordedRequest> {
    self
      .requests()
      .await
      .into_iter()
      .filter(|request| request.path.ends_with(path_suffix))
      .collect()
  }

  async fn record(&self, method: &'static str, path: String, auth: &Option<String>, body: &Value) {
    self.state.lock().await.requests.push(RecordedRequest {
      method,
      path,
      authorized: authorized(auth),
      body: body.clone(),
    });
  }

  async fn create_wallet(&self, body: Value) -> Response {
    self.record("POST", "/wallets".into(), &None, &body).await;
    if self.options.fail_wallet_creation {
      return reply(StatusCode::INTERNAL_SERVER_ERROR, json!({"message": "database unavailable"}));
    }

    let currency = match body.get("currency").and_then(Value::as_str) {
      Some(code @ ("NGN" | "USD" | "EUR")) => code.to_string(),
      _ => {
        return reply(
          StatusCode::BAD_REQUEST,
          json!({"message": ["currency not supported by wallet-service"]}),
        )
      }
    };

    let wallet = MockWallet {
      id: Uuid::new_v4().to_string(),
      currency,
      is_active: false,
      balance: self.options.opening_balance,
    };
    let record = wallet.record();

    let mut state = self.state.lock().await;
    state.order.push(wallet.id.clone());
    state.wallets.insert(wallet.id.clone(), wallet);
    reply(StatusCode::CREATED, record)
  }

  async fn set_active(&self, id: String, active: bool) -> Response {
    let action = if active { "activate" } else { "deactivate" };
    self
      .record("PUT", format!("/wallets/{}/{}", id, action), &None, &Value::Null)
      .await;

    let mut state = self.state.lock().await;
    match state.wallets.get_mut(&id) {
      Some(wallet) => {
        if !(active && self.options.ignore_activation) {
          wallet.is_active = active;
        }
        reply(StatusCode::OK, wallet.record())
      }
      None => not_found(&id),
    }
  }

  async fn fetch_wallet(&self, id: String) -> Response {
    self
      .record("GET", format!("/wallets/{}", id), &None, &Value::Null)
      .await;

    let state = self.state.lock().await;
    match state.wallets.get(&id) {
      Some(wallet) => reply(StatusCode::OK, wallet.record()),
      None => not_found(&id),
    }
  }

  async fn balance(&self, id: String, auth: Option<String>) -> Response {
    self
      .record("GET", format!("/wallets/{}/balance", id), &auth, &Value::Null)
      .await;

    let state = self.state.lock().await;
    match state.wallets.get(&id) {
      Some(wallet) if self.options.malformed_bodies => reply(
        StatusCode::OK,
        json!({
          "walletId": wallet.id,
          "availableBalance": wallet.balance.to_string(),
          "currency": wallet.currency,
        }),
      ),
      Some(wallet) => reply(
        StatusCode::OK,
        json!({
          "walletId": wallet.id,
          "availableBalance": wallet.balance,
          "currency": wallet.currency,
        }),
      ),
      None => not_found(&id),
    }
  }

  async fn top_up(&self, auth: Option<String>, body: Value) -> Response {
    self.record("POST", "/wallets/topup".into(), &auth, &body).await;
    if !authorized(&auth) {
      return unauthorized();
    }
    let amount = match body.get("amount").and_then(Value::as_i64) {
      Some(amount) if amount > 0 => amount,
      _ => return reply(StatusCode::BAD_REQUEST, json!({"message": "amount must be positive"})),
    };

    let Some(wallet_id) = self.own_wallet().await else {
      return reply(StatusCode::NOT_FOUND, json!({"message": "user has no wallet"}));
    };
    self.apply(wallet_id, amount).await;

    if self.options.malformed_bodies {
      reply(
        StatusCode::CREATED,
        json!({"reference": Uuid::new_v4().to_string(), "currency": body["currency"]}),
      )
    } else if self.options.payment_link_topups {
      let reference = Uuid::new_v4().to_string();
      reply(
        StatusCode::CREATED,
        json!({
          "paymentLink": format!("https://checkout.test/pay/{}", reference),
          "reference": reference,
        }),
      )
    } else {
      reply(
        StatusCode::CREATED,
        json!({"amount": amount, "currency": body["currency"]}),
      )
    }
  }

  async fn cash_out(&self, auth: Option<String>, body: Value) -> Response {
    self.record("POST", "/wallets/cashout".into(), &auth, &body).await;
    if !authorized(&auth) {
      return unauthorized();
    }
    let amount = body.get("amount").and_then(Value::as_i64).unwrap_or(0);
    let has_destination = body.get("bankAccountNumber").and_then(Value::as_str).is_some()
      && body.get("bankCode").and_then(Value::as_str).is_some();
    if amount <= 0 || !has_destination {
      return reply(StatusCode::BAD_REQUEST, json!({"message": "invalid cashout"}));
    }

    let Some(wallet_id) = self.own_wallet().await else {
      return reply(StatusCode::NOT_FOUND, json!({"message": "user has no wallet"}));
    };
    self.apply(wallet_id, -amount).await;

    if self.options.malformed_bodies {
      return reply(StatusCode::CREATED, json!({"amount": amount}));
    }
    reply(
      StatusCode::CREATED,
      json!({"id": Uuid::new_v4().to_string(), "status": "PENDING", "amount": amount}),
    )
  }

  async fn transfer(&self, auth: Option<String>, body: Value) -> Response {
    self.record("POST", "/transfers".into(), &auth, &body).await;
    if !authorized(&auth) {
      return unauthorized();
    }
    let (Some(key), Some(amount)) = (
      body.get("idempotencyKey").and_then(Value::as_str),
      body.get("amount").and_then(Value::as_i64),
    ) else {
      return reply(StatusCode::BAD_REQUEST, json!({"message": "invalid transfer"}));
    };

    let mut state = self.state.lock().await;
    if let Some(existing) = state.transfers.get(key) {
      return reply(StatusCode::OK, existing.clone());
    }
    let (Some(from), Some(to)) = (state.order.first().cloned(), state.order.get(1).cloned())
    else {
      return reply(StatusCode::NOT_FOUND, json!({"message": "destination user not found"}));
    };

    if let Some(wallet) = state.wallets.get_mut(&from) {
      wallet.balance -= amount;
    }
    if let Some(wallet) = state.wallets.get_mut(&to) {
      wallet.balance += amount;
    }
    let mut record = json!({
      "id": Uuid::new_v4().to_string(),
      "amount": amount,
      "fromWalletId": from,
      "toWalletId": to,
      "currencyCode": body["currency"],
      "idempotencyKey": key,
    });
    if self.options.malformed_bodies {
      if let Some(fields) = record.as_object_mut() {
        fields.remove("toWalletId");
      }
    }
    state.transfers.insert(key.to_string(), record.clone());
    reply(StatusCode::CREATED, record)
  }

  async fn own_wallet(&self) -> Option<String> {
    self.state.lock().await.order.first().cloned()
  }

  /// Change a balance now, or after the configured settle delay
  async fn apply(&self, wallet_id: String, delta: i64) {
    match self.options.settle_delay {
      Some(delay) => {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
          tokio::time::sleep(delay).await;
          if let Some(wallet) = state.lock().await.wallets.get_mut(&wallet_id) {
            wallet.balance += delta;
          }
        });
      }
      None => {
        if let Some(wallet) = self.state.lock().await.wallets.get_mut(&wallet_id) {
          wallet.balance += delta;
        }
      }
    }
  }
}

fn authorized(auth: &Option<String>) -> bool {
  auth.as_deref() == Some(format!("Bearer {}", TOKEN).as_str())
}

fn reply(status: StatusCode, body: Value) -> Response {
  warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

fn not_found(id: &str) -> Response {
  reply(
    StatusCode::NOT_FOUND,
    json!({"message": format!("wallet {} not found", id)}),
  )
}

fn unauthorized() -> Response {
  reply(StatusCode::UNAUTHORIZED, json!({"message": "Unauthorized"}))
}

pub fn fast_settle() -> SettlePolicy {
  SettlePolicy {
    initial_delay: Duration::from_millis(20),
    max_delay: Duration::from_millis(100),
    timeout: Duration::from_secs(3),
    jitter: Duration::from_millis(5),
  }
}
