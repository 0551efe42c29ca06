use std::collections::HashMap;
use std::error::Error;

use chrono::{Local, TimeDelta};
use volatile_drive::{
    ConnectRequest, EditablePair, MemorySettingsStore, MountError, MountProvider, Password,
    SessionManager, TickOutcome,
};

/// Prints what would be mapped instead of touching the system.
struct DryRun;

impl MountProvider for DryRun {
    fn connect(
        &mut self,
        local: &str,
        remote: &str,
        user_name: &str,
        _password: &Password,
    ) -> Result<(), MountError> {
        println!("map {local} -> {remote} as {user_name}");
        Ok(())
    }

    fn disconnect(&mut self, local: &str, force: bool) -> Result<(), MountError> {
        println!("unmap {local} (force: {force})");
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let vars = HashMap::from([("SITE".to_string(), "fs01".to_string())]);
    let mut session = SessionManager::new(DryRun, MemorySettingsStore::new(), vars);

    let pairs = [
        EditablePair::new("H:", r"\\<SITE>\home\<UserName>"),
        EditablePair::new("P:", r"\\<SITE>\projects"),
        EditablePair::new("Q:", r"\\<MISSING>\scratch"),
    ];
    let password = Password::new("secret");
    let start = Local::now();
    let reports = session.connect(
        &ConnectRequest {
            user_name: "alice",
            password: &password,
            pairs: &pairs,
            timeout_minutes: 1,
            allow_empty_password: false,
        },
        start,
    )?;
    for report in &reports {
        println!("{report}");
    }

    // simulated clock instead of waiting a minute
    for secs in [0, 30, 59, 60] {
        match session.tick(start + TimeDelta::seconds(secs)) {
            TickOutcome::Remaining(left) => println!("{}s left", left.as_secs()),
            TickOutcome::Expired(_) => println!("expired"),
            TickOutcome::Idle => println!("idle"),
        }
    }
    Ok(())
}
