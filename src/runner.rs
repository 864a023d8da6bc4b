//! Runs the selected cases in order and collects a report

use std::{fmt::Write as _, time::Instant};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
  error::{HarnessError, Result},
  scenarios::{Case, Harness},
  wallet::WalletHandle,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum CaseOutcome {
  Passed,
  /// An assertion did not hold
  Failed(String),
  /// The case could not complete: transport, decoding or setup errors
  Errored(String),
}

impl CaseOutcome {
  fn from_result(result: Result<()>) -> Self {
    match result {
      Ok(()) => CaseOutcome::Passed,
      Err(err) if err.is_assertion() => CaseOutcome::Failed(err.to_string()),
      Err(err) => CaseOutcome::Errored(err.to_string()),
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      CaseOutcome::Passed => "PASS",
      CaseOutcome::Failed(_) => "FAIL",
      CaseOutcome::Errored(_) => "ERROR",
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
  pub name: &'static str,
  #[serde(flatten)]
  pub outcome: CaseOutcome,
  pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
  pub cases: Vec<CaseReport>,
}

impl RunReport {
  pub fn passed(&self) -> usize {
    self.count(|outcome| matches!(outcome, CaseOutcome::Passed))
  }

  pub fn failed(&self) -> usize {
    self.count(|outcome| matches!(outcome, CaseOutcome::Failed(_)))
  }

  pub fn errored(&self) -> usize {
    self.count(|outcome| matches!(outcome, CaseOutcome::Errored(_)))
  }

  pub fn all_passed(&self) -> bool {
    self.passed() == self.cases.len()
  }

  pub fn outcome_of(&self, case: Case) -> Option<&CaseOutcome> {
    self
      .cases
      .iter()
      .find(|report| report.name == case.name())
      .map(|report| &report.outcome)
  }

  /// Exit code for the binary: 0 when every case passed
  pub fn exit_code(&self) -> i32 {
    if self.all_passed() {
      0
    } else {
      1
    }
  }

  pub fn render_text(&self) -> String {
    let mut out = String::new();
    for case in &self.cases {
      let _ = write!(
        out,
        "{:<5} {} ({} ms)",
        case.outcome.label(),
        case.name,
        case.elapsed_ms
      );
      match &case.outcome {
        CaseOutcome::Passed => {}
        CaseOutcome::Failed(message) | CaseOutcome::Errored(message) => {
          let _ = write!(out, ": {}", message);
        }
      }
      out.push('\n');
    }
    let _ = writeln!(
      out,
      "{} cases: {} passed, {} failed, {} errored",
      self.cases.len(),
      self.passed(),
      self.failed(),
      self.errored()
    );
    out
  }

  fn count(&self, pred: impl Fn(&CaseOutcome) -> bool) -> usize {
    self.cases.iter().filter(|case| pred(&case.outcome)).count()
  }
}

/// A setup step's result, computed at most once per run
type Fixture = Option<std::result::Result<WalletHandle, String>>;

pub struct Runner {
  harness: Harness,
  cases: Vec<Case>,
}

impl Runner {
  pub fn new(harness: Harness, cases: Vec<Case>) -> Self {
    Runner { harness, cases }
  }

  pub fn harness(&self) -> &Harness {
    &self.harness
  }

  pub async fn run(&self) -> RunReport {
    let mut primary: Fixture = None;
    let mut secondary: Fixture = None;
    let mut report = RunReport::default();

    for case in &self.cases {
      let case = *case;
      let started = Instant::now();
      info!(case = case.name(), "running case");

      let result = self.run_case(case, &mut primary, &mut secondary).await;
      let outcome = CaseOutcome::from_result(result);
      match &outcome {
        CaseOutcome::Passed => info!(case = case.name(), "case passed"),
        CaseOutcome::Failed(message) => warn!(case = case.name(), %message, "case failed"),
        CaseOutcome::Errored(message) => error!(case = case.name(), %message, "case errored"),
      }

      report.cases.push(CaseReport {
        name: case.name(),
        outcome,
        elapsed_ms: started.elapsed().as_millis() as u64,
      });
    }

    report
  }

  async fn run_case(
    &self,
    case: Case,
    primary: &mut Fixture,
    secondary: &mut Fixture,
  ) -> Result<()> {
    let harness = &self.harness;

    let primary = if case.needs_primary_wallet() {
      if primary.is_none() {
        *primary = Some(setup("primary wallet", harness.create_wallet().await));
      }
      Some(fixture(primary)?)
    } else {
      None
    };
    let secondary = if case.needs_secondary_wallet() {
      if secondary.is_none() {
        *secondary = Some(setup(
          "second wallet",
          harness.create_activated_wallet().await,
        ));
      }
      Some(fixture(secondary)?)
    } else {
      None
    };

    match (case, primary, secondary) {
      (Case::WalletCreation, Some(wallet), _) => harness.wallet_creation(wallet).await,
      (Case::WalletActivation, Some(wallet), _) => harness.wallet_activation(wallet).await,
      (Case::WalletFetch, Some(wallet), _) => harness.wallet_fetch(wallet).await,
      (Case::WalletBalance, Some(wallet), _) => harness.wallet_balance(wallet).await,
      (Case::TopUpAndBalanceUpdate, Some(wallet), _) => {
        harness.topup_and_balance_update(wallet).await
      }
      (Case::Cashout, Some(wallet), _) => harness.cashout(wallet).await,
      (Case::BalanceChangesAfterTransactions, Some(wallet), _) => {
        harness.balance_changes_after_transactions(wallet).await
      }
      (Case::WalletToWalletTransfer, Some(source), Some(destination)) => {
        harness.wallet_to_wallet_transfer(source, destination).await
      }
      (Case::WalletDeactivation, _, Some(wallet)) => harness.wallet_deactivation(wallet).await,
      (case, _, _) => Err(HarnessError::Setup(format!(
        "case {} is missing a wallet fixture",
        case
      ))),
    }
  }
}

fn setup(
  what: &str,
  result: Result<WalletHandle>,
) -> std::result::Result<WalletHandle, String> {
  result.map_err(|err| {
    warn!(%err, "{} setup failed", what);
    format!("{} setup failed: {}", what, err)
  })
}

/// Borrow a computed fixture, turning a cached setup failure into an error
fn fixture(slot: &Fixture) -> Result<&WalletHandle> {
  match slot {
    Some(Ok(wallet)) => Ok(wallet),
    Some(Err(message)) => Err(HarnessError::Setup(message.clone())),
    None => Err(HarnessError::Setup("fixture was never set up".into())),
  }
}
