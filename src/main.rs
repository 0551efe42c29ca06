use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use volatile_drive::{
    ActivationPolicy, ConnectRequest, DEFAULT_TIMEOUT_MINUTES, EditablePair, EnvVars,
    FileSettingsStore, Password, Report, SessionError, SessionManager, SettingsStore,
    SystemMountProvider, TokenSubstitutor, is_drive_letter, run_until_idle,
};

mod logging;
mod shutdown;

use shutdown::ShutdownSignals;

#[derive(Parser, Debug)]
#[command(name = "volatile-drive", version)]
#[command(about = "Map network shares to drive letters for a limited time")]
struct Cli {
    /// Settings file (defaults to the per-user configuration directory)
    #[arg(long, global = true, env = "VOLATILE_DRIVE_SETTINGS")]
    settings: Option<PathBuf>,

    /// Increase log output (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Map the drives and keep them until the timeout passes or the console goes away
    Connect(ConnectArgs),
    /// List the saved connection sets
    Show,
    /// Print a path with its <NAME> tokens resolved
    Resolve {
        path: String,
        /// Value for the <UserName> token
        #[arg(short, long)]
        user: String,
    },
}

#[derive(Args, Debug)]
struct ConnectArgs {
    /// User to connect as (defaults to the last user)
    #[arg(short, long)]
    user: Option<String>,

    #[arg(long, env = "VOLATILE_DRIVE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Proceed even though the password is empty
    #[arg(long)]
    allow_empty_password: bool,

    /// Mapping as DRIVE=PATH, e.g. Z:=\\server\home\<UserName>.
    /// Without any, the user's saved set is used.
    #[arg(long = "map", value_parser = parse_mapping)]
    maps: Vec<EditablePair>,

    /// Minutes until the drives are disconnected
    #[arg(short, long)]
    timeout: Option<u32>,

    /// Only start the session if at least one drive was mapped
    #[arg(long)]
    require_mount: bool,
}

fn parse_mapping(s: &str) -> Result<EditablePair, String> {
    let (drive, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected DRIVE=PATH, got '{s}'"))?;
    let drive = drive.trim().to_ascii_uppercase();
    if !is_drive_letter(&drive) {
        return Err(format!("'{drive}' is not a drive letter between A: and Z:"));
    }
    if path.is_empty() {
        return Err(format!("no path given for {drive}"));
    }
    Ok(EditablePair::new(drive, path))
}

fn open_store(path: Option<PathBuf>) -> Result<FileSettingsStore> {
    match path {
        Some(path) => Ok(FileSettingsStore::new(path)),
        None => FileSettingsStore::at_default_location().context("locating settings file"),
    }
}

fn print_reports(reports: &[Report]) {
    // newest first
    for report in reports.iter().rev() {
        eprintln!("{report}");
    }
}

fn format_countdown(left: Duration) -> String {
    let secs = left.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

async fn connect(store: FileSettingsStore, args: ConnectArgs) -> Result<()> {
    let policy = if args.require_mount {
        ActivationPolicy::RequireMount
    } else {
        ActivationPolicy::Lenient
    };
    let mut manager =
        SessionManager::new(SystemMountProvider::default(), store, EnvVars).with_policy(policy);
    for message in manager.messages().iter() {
        eprintln!("{message}");
    }

    let user_name = args
        .user
        .unwrap_or_else(|| manager.last_user_name().to_string());
    let saved = manager.working_set(&user_name);
    let pairs = if args.maps.is_empty() {
        saved.as_ref().map(|w| w.pairs.clone()).unwrap_or_default()
    } else {
        args.maps
    };
    let timeout_minutes = args
        .timeout
        .or(saved.map(|w| w.timeout_minutes))
        .unwrap_or(DEFAULT_TIMEOUT_MINUTES);
    if pairs.is_empty() && !user_name.is_empty() {
        bail!("nothing to map for '{user_name}': pass --map DRIVE=PATH");
    }

    // registered before any drive is mapped, so an early interrupt is queued
    let mut signals = ShutdownSignals::install().context("installing shutdown handlers")?;

    let password = Password::new(args.password.unwrap_or_default());
    let request = ConnectRequest {
        user_name: &user_name,
        password: &password,
        pairs: &pairs,
        timeout_minutes,
        allow_empty_password: args.allow_empty_password,
    };
    let reports = match manager.connect(&request, Local::now()) {
        Ok(reports) => reports,
        Err(SessionError::EmptyPassword) => {
            bail!("no password given; set VOLATILE_DRIVE_PASSWORD or pass --allow-empty-password")
        }
        Err(e) => return Err(e.into()),
    };
    print_reports(&reports);

    let Some(active) = manager.active() else {
        if manager.policy() == ActivationPolicy::RequireMount {
            println!("no drive mapped, session not started (--require-mount)");
        }
        return Ok(());
    };
    println!(
        "{} drive(s) mapped for {} until {}, press Ctrl-C or close the console to disconnect",
        active.connection_set.len(),
        active.user_name,
        active.expires_at.format("%H:%M:%S"),
    );

    let teardown = async {
        let event = signals.recv().await;
        tracing::info!(event, "shutting down");
    };
    let reports = run_until_idle(&mut manager, teardown, |left| {
        eprint!("\r{} remaining ", format_countdown(left));
        let _ = std::io::stderr().flush();
    })
    .await;
    eprintln!();
    print_reports(&reports);
    println!("drives disconnected");
    Ok(())
}

fn show(store: &FileSettingsStore) -> Result<()> {
    let Some(doc) = store.load()? else {
        println!("no saved settings at {}", store.path().display());
        return Ok(());
    };
    for (user, set) in &doc.users {
        let marker = if *user == doc.last_user_name { "*" } else { " " };
        println!("{marker} {user} ({} min)", set.timeout_minutes());
        for pair in set.connections() {
            println!("    {} {}", pair.drive_letter(), pair.path());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match cli.command {
        Command::Connect(args) => connect(open_store(cli.settings)?, args).await,
        Command::Show => show(&open_store(cli.settings)?),
        Command::Resolve { path, user } => {
            let out = TokenSubstitutor::new(EnvVars).resolve(&path, &user);
            if !out.is_ok() {
                bail!(out.error.unwrap_or_default());
            }
            println!("{}", out.result);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_is_parsed_and_normalized() {
        let pair = parse_mapping(r"z:=\\srv\home\<UserName>").unwrap();
        assert_eq!(pair, EditablePair::new("Z:", r"\\srv\home\<UserName>"));
    }

    #[test]
    fn bad_mappings_are_rejected() {
        assert!(parse_mapping(r"\\srv\share").is_err());
        assert!(parse_mapping(r"1:=\\srv\share").is_err());
        assert!(parse_mapping("Z:=").is_err());
    }

    #[test]
    fn settings_flag_overrides_location() {
        let cli =
            Cli::try_parse_from(["volatile-drive", "--settings", "custom.json", "show"]).unwrap();
        assert_eq!(cli.settings, Some(PathBuf::from("custom.json")));
        let store = open_store(cli.settings).unwrap();
        assert_eq!(store.path(), std::path::Path::new("custom.json"));
    }

    #[test]
    fn countdown_formats_as_clock() {
        assert_eq!(format_countdown(Duration::from_secs(3725)), "01:02:05");
        assert_eq!(format_countdown(Duration::from_secs(59)), "00:00:59");
    }

    #[test]
    fn cli_parses_connect() {
        let cli = Cli::try_parse_from([
            "volatile-drive",
            "connect",
            "--user",
            "bob",
            "--map",
            r"Z:=\\h\s",
            "--timeout",
            "5",
        ])
        .unwrap();
        let Command::Connect(args) = cli.command else {
            panic!("expected connect");
        };
        assert_eq!(args.user.as_deref(), Some("bob"));
        assert_eq!(args.maps.len(), 1);
        assert_eq!(args.timeout, Some(5));
    }
}
