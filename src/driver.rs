use std::future::Future;
use std::time::Duration;

use chrono::Local;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::messages::Report;
use crate::mount::MountProvider;
use crate::session::{SessionManager, TickOutcome};
use crate::settings::SettingsStore;
use crate::substitution::VariableSource;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Ticks `session` once a second until it ends.
///
/// The session ends when its timeout passes or when `teardown` completes,
/// whichever happens first. `teardown` stands for any outside request to drop
/// the mappings, such as Ctrl-C or the workstation being locked.
/// `on_countdown` receives the remaining time after every tick.
///
/// Returns the reports of the final disconnect.
pub async fn run_until_idle<P, S, V, F>(
    session: &mut SessionManager<P, S, V>,
    teardown: F,
    mut on_countdown: impl FnMut(Duration),
) -> Vec<Report>
where
    P: MountProvider,
    S: SettingsStore,
    V: VariableSource,
    F: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(teardown);

    loop {
        tokio::select! {
            biased;

            () = &mut teardown => {
                info!("teardown requested");
                return session.disconnect(Local::now());
            }
            _ = interval.tick() => match session.tick(Local::now()) {
                TickOutcome::Idle => return Vec::new(),
                TickOutcome::Expired(reports) => return reports,
                TickOutcome::Remaining(left) => on_countdown(left),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConnectRequest, EditablePair, MemorySettingsStore, MountError, Password};
    use std::collections::HashMap;

    #[derive(Default)]
    struct CountingProvider {
        connects: usize,
        disconnects: usize,
    }

    impl MountProvider for CountingProvider {
        fn connect(
            &mut self,
            _: &str,
            _: &str,
            _: &str,
            _: &Password,
        ) -> Result<(), MountError> {
            self.connects += 1;
            Ok(())
        }

        fn disconnect(&mut self, _: &str, _: bool) -> Result<(), MountError> {
            self.disconnects += 1;
            Ok(())
        }
    }

    type Manager = SessionManager<CountingProvider, MemorySettingsStore, HashMap<String, String>>;

    fn connected(timeout_minutes: u32) -> Manager {
        let mut m = SessionManager::new(
            CountingProvider::default(),
            MemorySettingsStore::new(),
            HashMap::new(),
        );
        let password = Password::new("pw");
        m.connect(
            &ConnectRequest {
                user_name: "bob",
                password: &password,
                pairs: &[EditablePair::new("Z:", r"\\h\s")],
                timeout_minutes,
                allow_empty_password: false,
            },
            Local::now(),
        )
        .unwrap();
        m
    }

    #[tokio::test]
    async fn expired_session_stops_the_loop() {
        let mut m = connected(0);
        let reports = run_until_idle(&mut m, std::future::pending(), |_| {}).await;
        assert!(reports.is_empty());
        assert!(!m.is_active());
        assert_eq!(m.provider().disconnects, 1);
    }

    #[tokio::test]
    async fn teardown_request_disconnects() {
        let mut m = connected(10);
        run_until_idle(&mut m, async {}, |_| {}).await;
        assert!(!m.is_active());
        assert_eq!(m.provider().disconnects, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_is_reported_each_tick() {
        let mut m = connected(10);
        let mut seen = Vec::new();
        run_until_idle(
            &mut m,
            tokio::time::sleep(Duration::from_millis(2500)),
            |left| seen.push(left),
        )
        .await;
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|d| *d <= Duration::from_secs(600)));
        assert_eq!(m.provider().disconnects, 1);
    }
}
