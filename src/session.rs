//! The single mapping session and its lifetime.
//!
//! A [`SessionManager`] is either idle or holds one active session. Connect
//! maps every pair of a [`ConnectionSet`], disconnect unmaps them again, and
//! [`SessionManager::tick`] ends the session once its timeout has passed.
//! Time is always passed in by the caller.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};
use tracing::{debug, error, info, warn};

use crate::connection::{ConnectionSet, EditablePair};
use crate::messages::{MessageLog, Report};
use crate::mount::{MountProvider, Password};
use crate::settings::{SettingsDocument, SettingsStore};
use crate::substitution::{EnvVars, TokenSubstitutor, VariableSource};
use crate::SessionError;

/// Decides whether a connect attempt becomes the active session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActivationPolicy {
    /// Activate after every attempt, even if no drive could be mapped.
    #[default]
    Lenient,
    /// Activate only if at least one drive was mapped.
    RequireMount,
}

impl ActivationPolicy {
    fn activates(self, mounted: usize) -> bool {
        match self {
            ActivationPolicy::Lenient => true,
            ActivationPolicy::RequireMount => mounted > 0,
        }
    }
}

/// Input for [`SessionManager::connect`].
#[derive(Debug, Clone, Copy)]
pub struct ConnectRequest<'a> {
    pub user_name: &'a str,
    pub password: &'a Password,
    pub pairs: &'a [EditablePair],
    pub timeout_minutes: u32,
    /// Set once the user confirmed connecting with an empty password.
    pub allow_empty_password: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub user_name: String,
    pub connection_set: ConnectionSet,
    pub expires_at: DateTime<Local>,
}

/// A saved set loaded back into editable form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingSet {
    pub timeout_minutes: u32,
    pub pairs: Vec<EditablePair>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    /// Time left, rounded to whole seconds.
    Remaining(Duration),
    /// The timeout passed and the session was disconnected.
    Expired(Vec<Report>),
}

pub struct SessionManager<P, S, V = EnvVars> {
    provider: P,
    store: S,
    substitutor: TokenSubstitutor<V>,
    policy: ActivationPolicy,
    registry: BTreeMap<String, ConnectionSet>,
    last_user_name: String,
    active: Option<ActiveSession>,
    messages: MessageLog,
}

impl<P, S, V> SessionManager<P, S, V>
where
    P: MountProvider,
    S: SettingsStore,
    V: VariableSource,
{
    /// Creates an idle manager and loads the saved settings from `store`.
    ///
    /// A store with nothing saved yields an empty registry. A store that
    /// fails to load also yields an empty registry, and the failure is put
    /// into the message log.
    pub fn new(provider: P, store: S, vars: V) -> Self {
        let mut manager = Self {
            provider,
            store,
            substitutor: TokenSubstitutor::new(vars),
            policy: ActivationPolicy::default(),
            registry: BTreeMap::new(),
            last_user_name: String::new(),
            active: None,
            messages: MessageLog::default(),
        };
        manager.load_settings(Local::now());
        manager
    }

    pub fn with_policy(mut self, policy: ActivationPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn load_settings(&mut self, now: DateTime<Local>) {
        match self.store.load() {
            Ok(Some(doc)) => {
                debug!(users = doc.users.len(), "settings loaded");
                self.registry = doc.users;
                self.last_user_name = doc.last_user_name;
            }
            Ok(None) => debug!("no saved settings"),
            Err(e) => {
                warn!(error = %e, "failed to load settings");
                self.messages
                    .push(Report::new(now, format!("Error loading settings: {e}")));
            }
        }
    }

    /// Maps every complete pair of `request` and starts the session.
    ///
    /// The set is stored for the user before any drive is mapped. A path
    /// whose tokens cannot be resolved, or a drive the provider fails to map,
    /// is reported and skipped; the remaining pairs are still tried. After
    /// the batch the session becomes active according to the
    /// [`ActivationPolicy`], and the settings are saved.
    ///
    /// # Errors
    ///
    /// Fails without any change if the user name is empty, a session is
    /// already active, or the password is empty and not confirmed.
    pub fn connect(
        &mut self,
        request: &ConnectRequest<'_>,
        now: DateTime<Local>,
    ) -> Result<Vec<Report>, SessionError> {
        let user_name = request.user_name;
        if user_name.is_empty() {
            return Err(SessionError::MissingUserName);
        }
        if let Some(active) = &self.active {
            return Err(SessionError::AlreadyActive {
                user_name: active.user_name.clone(),
            });
        }
        if request.password.is_empty() && !request.allow_empty_password {
            return Err(SessionError::EmptyPassword);
        }

        let set = ConnectionSet::new(request.pairs, request.timeout_minutes);
        self.registry.insert(user_name.to_string(), set.clone());

        let mut reports = Vec::new();
        let mut mounted = 0;
        for pair in set.connections() {
            let drive = pair.drive_letter();
            let remote = match self.substitutor.try_resolve(pair.path(), user_name) {
                Ok(remote) => remote,
                Err(e) => {
                    warn!(drive, error = %e, "path not resolved");
                    reports.push(Report::new(now, e.to_string()));
                    continue;
                }
            };
            match self
                .provider
                .connect(drive, &remote, user_name, request.password)
            {
                Ok(()) => {
                    info!(drive, remote = %remote, "drive mapped");
                    mounted += 1;
                }
                Err(e) => {
                    warn!(drive, remote = %remote, code = e.code, "failed to map drive");
                    reports.push(Report::new(
                        now,
                        format!(
                            "Error #{} connecting {drive} to {remote} ({})",
                            e.code, e.message
                        ),
                    ));
                }
            }
        }

        if self.policy.activates(mounted) {
            let expires_at = now + TimeDelta::minutes(i64::from(set.timeout_minutes()));
            info!(user = user_name, mounted, total = set.len(), %expires_at, "session active");
            self.active = Some(ActiveSession {
                user_name: user_name.to_string(),
                connection_set: set,
                expires_at,
            });
        } else {
            warn!(user = user_name, "no drive mapped, session not started");
            reports.push(Report::new(now, "No drive could be mapped, session not started"));
        }

        self.last_user_name = user_name.to_string();
        if let Err(e) = self.save_settings() {
            error!(error = %e, "failed to save settings");
            reports.push(Report::new(now, format!("Error saving settings: {e}")));
        }

        self.messages.push_batch(reports.iter().cloned());
        Ok(reports)
    }

    /// Unmaps every drive of the active session and returns to idle.
    ///
    /// Does nothing when idle. Failures are reported and do not stop the
    /// remaining drives from being unmapped.
    pub fn disconnect(&mut self, now: DateTime<Local>) -> Vec<Report> {
        let Some(active) = self.active.take() else {
            return Vec::new();
        };

        let mut reports = Vec::new();
        for pair in active.connection_set.connections() {
            let drive = pair.drive_letter();
            match self.provider.disconnect(drive, true) {
                Ok(()) => info!(drive, "drive unmapped"),
                Err(e) => {
                    warn!(drive, code = e.code, "failed to unmap drive");
                    reports.push(Report::new(
                        now,
                        format!(
                            "Error #{} disconnecting {drive} from {} ({})",
                            e.code,
                            pair.path(),
                            e.message
                        ),
                    ));
                }
            }
        }
        info!(user = %active.user_name, "session ended");

        self.messages.push_batch(reports.iter().cloned());
        reports
    }

    /// Advances the countdown. Call about once a second.
    pub fn tick(&mut self, now: DateTime<Local>) -> TickOutcome {
        let Some(active) = &self.active else {
            return TickOutcome::Idle;
        };
        if now >= active.expires_at {
            info!(user = %active.user_name, "session timed out");
            return TickOutcome::Expired(self.disconnect(now));
        }
        let millis = (active.expires_at - now).num_milliseconds();
        let remaining = Duration::from_secs(((millis + 500) / 1000) as u64);
        debug!(remaining_secs = remaining.as_secs(), "countdown");
        TickOutcome::Remaining(remaining)
    }

    fn save_settings(&mut self) -> Result<(), crate::PersistenceError> {
        let doc = SettingsDocument {
            users: self.registry.clone(),
            last_user_name: self.last_user_name.clone(),
        };
        self.store.save(&doc)
    }
}

impl<P, S, V> SessionManager<P, S, V> {
    /// The set last connected by `user_name`, ready for editing.
    pub fn working_set(&self, user_name: &str) -> Option<WorkingSet> {
        self.registry.get(user_name).map(|set| WorkingSet {
            timeout_minutes: set.timeout_minutes(),
            pairs: set.to_editable(),
        })
    }

    pub fn connection_set(&self, user_name: &str) -> Option<&ConnectionSet> {
        self.registry.get(user_name)
    }

    /// Users with a saved set, sorted.
    pub fn user_names(&self) -> impl Iterator<Item = &str> {
        self.registry.keys().map(String::as_str)
    }

    pub fn last_user_name(&self) -> &str {
        &self.last_user_name
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn policy(&self) -> ActivationPolicy {
        self.policy
    }

    pub fn messages(&self) -> &MessageLog {
        &self.messages
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
