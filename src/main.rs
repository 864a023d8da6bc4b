use std::process;

use clap::Parser;
use tracing::error;
use wallet_e2e::{logging, Args, Case, Harness, HarnessError, RunReport, Runner};

/// Exit code for configuration errors, distinct from failed cases
const CONFIG_ERROR_EXIT: i32 = 2;

#[tokio::main]
async fn main() {
  let args = Args::parse();
  logging::setup_logger(logging::level_for_verbosity(args.verbose));

  if args.list {
    for case in Case::ALL {
      println!("{}", case);
    }
    return;
  }

  let code = match run(&args).await {
    Ok(report) => {
      if args.json {
        match serde_json::to_string_pretty(&report) {
          Ok(json) => println!("{}", json),
          Err(err) => error!(%err, "cannot serialize report"),
        }
      } else {
        print!("{}", report.render_text());
      }
      report.exit_code()
    }
    Err(err) => {
      error!(%err, "harness could not start");
      eprintln!("error: {}", err);
      if err.is_config() {
        CONFIG_ERROR_EXIT
      } else {
        1
      }
    }
  };

  process::exit(code);
}

async fn run(args: &Args) -> Result<RunReport, HarnessError> {
  let cases = args.selected_cases()?;
  let config = args.resolve()?;
  let harness = Harness::new(config)?;

  Ok(Runner::new(harness, cases).run().await)
}
