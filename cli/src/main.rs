use anyhow::{Context, Result};
use clap::Parser;
use thiserror::Error;
use zbus::{proxy, Connection};

const SERVICE_NAME: &str = "com.alexhulbert.mercury.Hud";

/// Control the HUD overlay daemon
///
/// Hide the HUD:          hudctl Hide
/// Show nine characters:  hudctl Show 0041 0000 27d0 f000 f001 0000 0000 0000 0000
#[derive(Parser)]
#[command(name = "hudctl")]
#[command(about = "Send Hide/Show calls to the HUD daemon")]
#[command(version = "0.1.0")]
struct Cli {
    /// Method to call (Hide or Show)
    method: String,

    /// Hex character codes for Show, row-major; "0000" blanks a cell
    codes: Vec<String>,
}

#[proxy(
    interface = "com.alexhulbert.mercury.Hud",
    default_service = "com.alexhulbert.mercury.Hud",
    default_path = "/com/alexhulbert/mercury/Hud",
    gen_blocking = false
)]
trait Hud {
    fn hide(&self) -> zbus::Result<()>;

    fn show(&self, codes: &[String]) -> zbus::Result<()>;
}

#[derive(Debug, PartialEq, Eq)]
enum Call {
    Hide,
    Show(Vec<String>),
}

impl Call {
    fn name(&self) -> &'static str {
        match self {
            Call::Hide => "Hide",
            Call::Show(_) => "Show",
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
enum UsageError {
    #[error("Unknown method '{0}' (expected Hide or Show)")]
    UnknownMethod(String),
    #[error("Hide takes no arguments, got {0}")]
    HideWithArgs(usize),
}

/// Map the command line onto one of the two daemon methods.
///
/// Show arguments are passed through untouched; the daemon validates them.
fn plan(method: &str, args: Vec<String>) -> std::result::Result<Call, UsageError> {
    if method.eq_ignore_ascii_case("hide") {
        if !args.is_empty() {
            return Err(UsageError::HideWithArgs(args.len()));
        }
        Ok(Call::Hide)
    } else if method.eq_ignore_ascii_case("show") {
        Ok(Call::Show(args))
    } else {
        Err(UsageError::UnknownMethod(method.to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let call = plan(&cli.method, cli.codes)?;

    let connection = Connection::session()
        .await
        .context("Could not connect to the D-Bus session bus")?;
    let hud = HudProxy::new(&connection).await?;

    let result = match &call {
        Call::Hide => hud.hide().await,
        Call::Show(codes) => hud.show(codes).await,
    };
    result.with_context(|| format!("{}.{} failed", SERVICE_NAME, call.name()))?;

    Ok(())
}
