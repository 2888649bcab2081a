//! Per-device polling.
//!
//! A [`DataOrchestrator`] owns one device's session and drives its polling
//! cycles:
//!
//! ```text
//! Unauthenticated -> Authenticating -> Authenticated -> Fetching
//!                                           ^               |
//!                                           |               v
//!                                           +---- SessionExpired (once per cycle)
//!
//! Failed: terminal after too many consecutive authentication failures
//! ```
//!
//! Cycles for one device are serialized: a poll that arrives while another
//! is running waits for it. Independent devices share nothing mutable.

use chrono::Utc;
use gatewatch_core::{Capability, PollResult, PollStatus, SystemInfo};
use gatewatch_fetch::{
    AuthError, ControlRequest, Credentials, FetchContext, FetchError, FetchedPage, Resource,
    Session,
};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::decode::DecodeOutput;
use crate::detect::LoginPageDetector;
use crate::discovery::ResolvedProfile;
use crate::error::{CapabilityError, ParseError, PollError, StaleCause};

/// Failed fetches a session may accumulate before it is replaced.
const MAX_SESSION_FAILURES: u32 = 3;

// ============================================================================
// States
// ============================================================================

/// Session state machine of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session yet.
    Unauthenticated,
    /// Login in progress.
    Authenticating,
    /// Session established and idle.
    Authenticated,
    /// Fetching resources.
    Fetching,
    /// The device stopped honouring the session.
    SessionExpired,
    /// Too many authentication failures; needs [`DataOrchestrator::reset`].
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
            Self::Fetching => "fetching",
            Self::SessionExpired => "session expired",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Availability as reported to the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceHealth {
    /// Polling works.
    Available,
    /// Polling works but data is incomplete.
    Degraded,
    /// Enough consecutive cycles failed.
    Unavailable,
}

impl fmt::Display for DeviceHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Available => "available",
            Self::Degraded => "degraded",
            Self::Unavailable => "unavailable",
        })
    }
}

#[derive(Debug)]
struct DeviceState {
    session: Option<Session>,
    state: SessionState,
    auth_failures: u32,
    failed_cycles: u32,
    locked_until: Option<chrono::DateTime<Utc>>,
    last_status: Option<PollStatus>,
}

impl DeviceState {
    fn new() -> Self {
        Self {
            session: None,
            state: SessionState::Unauthenticated,
            auth_failures: 0,
            failed_cycles: 0,
            locked_until: None,
            last_status: None,
        }
    }
}

/// What the resource loop produced.
enum CycleData {
    Decoded { page: FetchedPage, output: DecodeOutput },
    Raw(FetchedPage),
}

// ============================================================================
// Data Orchestrator
// ============================================================================

/// Drives polling cycles for one device.
pub struct DataOrchestrator {
    resolved: ResolvedProfile,
    base: Url,
    credentials: Credentials,
    ctx: Arc<FetchContext>,
    detector: LoginPageDetector,
    state: Mutex<DeviceState>,
}

impl DataOrchestrator {
    /// Creates an orchestrator for a resolved profile.
    pub fn new(resolved: ResolvedProfile, base: Url, credentials: Credentials, ctx: Arc<FetchContext>) -> Self {
        let detector = LoginPageDetector::for_profile(&resolved.profile);
        Self {
            resolved,
            base,
            credentials,
            ctx,
            detector,
            state: Mutex::new(DeviceState::new()),
        }
    }

    /// The resolved profile.
    pub fn profile(&self) -> &ResolvedProfile {
        &self.resolved
    }

    /// Device base URL.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Current session state.
    pub async fn state(&self) -> SessionState {
        self.state.lock().await.state
    }

    /// Returns true while a session is held.
    pub async fn has_session(&self) -> bool {
        self.state.lock().await.session.is_some()
    }

    /// Availability derived from recent cycles.
    pub async fn health(&self) -> DeviceHealth {
        let st = self.state.lock().await;
        if st.failed_cycles >= self.ctx.settings.unavailable_after {
            DeviceHealth::Unavailable
        } else if st.last_status == Some(PollStatus::Degraded) {
            DeviceHealth::Degraded
        } else {
            DeviceHealth::Available
        }
    }

    /// Drops the session and clears failure counters and lockouts.
    pub async fn reset(&self) {
        let mut st = self.state.lock().await;
        *st = DeviceState::new();
        info!(profile = %self.resolved.id(), "Device state reset");
    }

    /// Runs one cycle and folds any error into the result status.
    pub async fn poll(&self) -> PollResult {
        match self.try_poll().await {
            Ok(result) => result,
            Err(e) => {
                let status = if e.is_stale_session() {
                    PollStatus::StaleSession
                } else {
                    PollStatus::Failed
                };
                PollResult::failed(self.resolved.id(), status, e.to_string())
            }
        }
    }

    /// Runs one cycle.
    #[instrument(skip(self), fields(profile = %self.resolved.id(), host = %self.base))]
    pub async fn try_poll(&self) -> Result<PollResult, PollError> {
        let mut st = self.state.lock().await;
        let outcome = self.run_cycle(&mut st).await;

        match &outcome {
            Ok(result) => {
                st.failed_cycles = 0;
                st.last_status = Some(result.status);
                debug!(
                    channels = result.channels.len(),
                    errors = result.decode_error_count,
                    status = %result.status.label(),
                    "Cycle complete"
                );
            }
            Err(e) => {
                st.failed_cycles += 1;
                st.last_status = Some(if e.is_stale_session() {
                    PollStatus::StaleSession
                } else {
                    PollStatus::Failed
                });
                warn!(error = %e, failed_cycles = st.failed_cycles, "Cycle failed");
            }
        }

        outcome
    }

    /// Sends the profile's restart command once.
    ///
    /// Never retried: a lost response may still have rebooted the device.
    #[instrument(skip(self), fields(profile = %self.resolved.id(), host = %self.base))]
    pub async fn restart(&self) -> Result<(), PollError> {
        let profile = &self.resolved.profile;
        let request = match (&profile.restart, profile.supports(Capability::Restart)) {
            (Some(request), true) => request.clone(),
            _ => {
                return Err(CapabilityError::Unsupported {
                    profile: profile.id.clone(),
                    capability: Capability::Restart,
                }
                .into());
            }
        };

        let mut st = self.state.lock().await;
        self.check_gate(&mut st)?;
        let mut session = self.ensure_session(&mut st).await?;

        let outcome = self.send_restart(&mut session, &request).await;
        st.session = Some(session);
        st.state = SessionState::Authenticated;
        outcome
    }

    async fn send_restart(&self, session: &mut Session, request: &ControlRequest) -> Result<(), PollError> {
        let page = self
            .resolved
            .strategy
            .send_control(&self.ctx, &self.base, session, &self.credentials, request)
            .await?;

        if self.detector.is_login_page(&page) {
            warn!(status = page.status, "Restart answered with the login page");
            session.mark_expired();
            return Err(PollError::CommandRejected("device served its login page".to_string()));
        }
        if let ControlRequest::Hnap { action, .. } = request {
            match hnap_action_result(&page.body, action).as_deref() {
                Some(result) if result.eq_ignore_ascii_case("OK") => {}
                other => {
                    let reason = format!("{action} returned {}", other.unwrap_or("no result"));
                    warn!(%reason, "Restart refused");
                    return Err(PollError::CommandRejected(reason));
                }
            }
        }

        info!(status = page.status, "Restart command sent");
        Ok(())
    }

    // ========================================================================
    // Cycle
    // ========================================================================

    async fn run_cycle(&self, st: &mut DeviceState) -> Result<PollResult, PollError> {
        self.check_gate(st)?;
        let mut session = self.ensure_session(st).await?;
        let mut reauthenticated = false;

        let data = loop {
            st.state = SessionState::Fetching;
            match self.fetch_data(&mut session).await {
                Ok(data) => break data,
                Err(PollError::Parse(ParseError::StaleSession { cause })) if !reauthenticated => {
                    warn!(%cause, "Session went stale, re-authenticating once");
                    session.mark_expired();
                    st.state = SessionState::SessionExpired;
                    reauthenticated = true;
                    session = match self.authenticate(st).await {
                        Ok(fresh) => fresh,
                        Err(e) => {
                            warn!(error = %e, "Re-authentication failed");
                            return Err(ParseError::StaleSession { cause }.into());
                        }
                    };
                }
                Err(e @ PollError::Parse(ParseError::StaleSession { .. })) => {
                    st.state = SessionState::SessionExpired;
                    return Err(e);
                }
                Err(PollError::Auth(e)) => {
                    self.note_auth_failure(st, &e);
                    return Err(e.into());
                }
                Err(e) => {
                    st.session = Some(session);
                    st.state = SessionState::Authenticated;
                    return Err(e);
                }
            }
        };

        let result = self.assemble(&session, data, reauthenticated).await;
        st.session = Some(session);
        st.state = SessionState::Authenticated;
        Ok(result)
    }

    /// Fetches resources in declared order, then the fallback.
    ///
    /// The first page that decodes to channels wins.
    async fn fetch_data(&self, session: &mut Session) -> Result<CycleData, PollError> {
        let profile = &self.resolved.profile;
        let resources = profile.resources.iter().chain(profile.fallback_resource.iter());

        let mut last_error: Option<PollError> = None;
        let mut decoded_empty = false;

        for resource in resources {
            let page = match self.fetch_resource(session, resource).await {
                Ok(page) => page,
                Err(e) => {
                    let failures = session.record_failure();
                    debug!(resource = %resource.label(), error = %e, failures, "Resource fetch failed");
                    last_error = Some(e.into());
                    continue;
                }
            };
            session.absorb_cookies(&page);

            if self.detector.is_login_page(&page) {
                if self.resolved.strategy.is_stateless() && page.status == 401 {
                    return Err(AuthError::WrongCredentials("device rejected credentials".to_string()).into());
                }
                info!(resource = %resource.label(), "Device served its login page");
                return Err(ParseError::StaleSession {
                    cause: StaleCause::LoginPage,
                }
                .into());
            }

            if !page.is_success() {
                session.record_failure();
                last_error = Some(
                    FetchError::HttpStatus {
                        status: page.status,
                        url: page.url.to_string(),
                    }
                    .into(),
                );
                continue;
            }

            if profile.parser.is_raw_capture() {
                return Ok(CycleData::Raw(page));
            }

            match profile.parser.decode(&page.body) {
                Ok(output) if output.is_empty() => {
                    debug!(resource = %resource.label(), "Data page decoded to zero channels");
                    decoded_empty = true;
                }
                Ok(output) => {
                    session.mark_valid_use();
                    return Ok(CycleData::Decoded { page, output });
                }
                Err(e) => {
                    debug!(resource = %resource.label(), error = %e, "Decode failed");
                    last_error = Some(e.into());
                }
            }
        }

        if decoded_empty {
            return Err(ParseError::StaleSession {
                cause: StaleCause::EmptyDecode,
            }
            .into());
        }

        Err(last_error.unwrap_or_else(|| ParseError::NoMatch("profile declares no resources".to_string()).into()))
    }

    async fn fetch_resource(&self, session: &Session, resource: &Resource) -> Result<FetchedPage, FetchError> {
        let strategy = &self.resolved.strategy;
        let ctx = self.ctx.as_ref();
        let base = &self.base;
        let credentials = &self.credentials;

        ctx.settings
            .retry
            .run(move || strategy.fetch(ctx, base, session, credentials, resource))
            .await
    }

    /// Builds the poll result, fetching system information best effort.
    async fn assemble(&self, session: &Session, data: CycleData, reauthenticated: bool) -> PollResult {
        let profile = &self.resolved.profile;

        let (page, output) = match data {
            CycleData::Raw(page) => {
                let mut result = PollResult::failed(
                    profile.id.clone(),
                    PollStatus::Degraded,
                    "no decoder for this device; raw page captured",
                );
                result.raw_capture = Some(page.body);
                result.reauthenticated = reauthenticated;
                return result;
            }
            CycleData::Decoded { page, output } => (page, output),
        };

        let (system_info, info_ok) = self.system_info(session, &page).await;

        let degraded = output.errors > 0 || !info_ok;
        let status = if degraded {
            PollStatus::Degraded
        } else {
            PollStatus::Ok
        };

        let mut result = PollResult::new(profile.id.clone(), status);
        result.error = output
            .partial_error()
            .map(|e| e.to_string())
            .or_else(|| (!info_ok).then(|| "system information unavailable".to_string()));
        result.channels = output.channels;
        result.decode_error_count = output.errors;
        result.system_info = system_info;
        result.reauthenticated = reauthenticated;
        result
    }

    async fn system_info(&self, session: &Session, data_page: &FetchedPage) -> (SystemInfo, bool) {
        let profile = &self.resolved.profile;
        let Some(spec) = &profile.info else {
            return (SystemInfo::default(), true);
        };

        let decoded = match &profile.info_resource {
            Some(resource) => match self.fetch_resource(session, resource).await {
                Ok(page) if page.is_success() && !self.detector.is_login_page(&page) => spec.decode(&page.body),
                Ok(page) => Err(ParseError::NoMatch(format!("info page returned {}", page.status))),
                Err(e) => Err(ParseError::NoMatch(e.to_string())),
            },
            None => spec.decode(&data_page.body),
        };

        match decoded {
            Ok(info) => (info, true),
            Err(e) => {
                debug!(error = %e, "System information not decoded");
                (SystemInfo::default(), false)
            }
        }
    }

    // ========================================================================
    // Session
    // ========================================================================

    fn check_gate(&self, st: &mut DeviceState) -> Result<(), PollError> {
        if st.state == SessionState::Failed {
            return Err(PollError::AuthDisabled {
                failures: st.auth_failures,
            });
        }
        if let Some(until) = st.locked_until {
            if Utc::now() < until {
                return Err(PollError::LockedOut { until });
            }
            info!("Lockout cooldown elapsed");
            st.locked_until = None;
        }
        Ok(())
    }

    async fn ensure_session(&self, st: &mut DeviceState) -> Result<Session, PollError> {
        match st.session.take() {
            Some(session) if session.consecutive_failures() >= MAX_SESSION_FAILURES => {
                debug!(failures = session.consecutive_failures(), "Session keeps failing, logging in again");
                self.authenticate(st).await
            }
            Some(session) if session.is_fresh(self.ctx.settings.session_max_idle) => Ok(session),
            Some(_) => {
                debug!("Session idle too long, logging in again");
                self.authenticate(st).await
            }
            None => self.authenticate(st).await,
        }
    }

    /// Logs in with a fresh session.
    ///
    /// Nothing is kept on failure.
    async fn authenticate(&self, st: &mut DeviceState) -> Result<Session, PollError> {
        st.state = SessionState::Authenticating;
        st.session = None;

        let strategy = &self.resolved.strategy;
        let mut session = Session::new(strategy.kind());
        match strategy
            .authenticate(&self.ctx, &self.base, &mut session, &self.credentials)
            .await
        {
            Ok(()) => {
                debug!(strategy = strategy.id(), "Authenticated");
                session.mark_valid_use();
                st.auth_failures = 0;
                st.state = SessionState::Authenticated;
                Ok(session)
            }
            Err(e) => {
                self.note_auth_failure(st, &e);
                Err(e.into())
            }
        }
    }

    fn note_auth_failure(&self, st: &mut DeviceState, err: &AuthError) {
        st.session = None;
        match err {
            AuthError::Lockout { cooldown } => {
                let cooldown = chrono::Duration::from_std(*cooldown)
                    .unwrap_or_else(|_| chrono::Duration::seconds(300));
                let until = Utc::now() + cooldown;
                warn!(%until, "Device locked us out");
                st.locked_until = Some(until);
                st.auth_failures += 1;
            }
            AuthError::Timeout | AuthError::Transport(_) => {}
            _ => st.auth_failures += 1,
        }

        if st.auth_failures >= self.ctx.settings.max_auth_failures {
            error!(failures = st.auth_failures, "Authentication disabled until reset");
            st.state = SessionState::Failed;
        } else {
            st.state = SessionState::Unauthenticated;
        }
    }
}

/// `<Action>Result` of a single HNAP action response.
fn hnap_action_result(body: &str, action: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get(format!("{action}Response"))?
        .get(format!("{action}Result"))?
        .as_str()
        .map(str::to_string)
}

impl fmt::Debug for DataOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataOrchestrator")
            .field("profile", &self.resolved)
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::FieldMap;
    use crate::decode::table::TableLayout;
    use crate::profile::DeviceProfile;
    use crate::variant::ParserVariant;
    use gatewatch_core::CapabilitySet;
    use gatewatch_fetch::{AuthSpec, RetryStrategy};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const STATUS_PAGE: &str = r"
        <table>
          <tr><th>Downstream</th></tr>
          <tr><td>1</td><td>Locked</td><td>QAM256</td><td>591000000 Hz</td><td>2.1 dBmV</td><td>40.9 dB</td></tr>
          <tr><td>2</td><td>Locked</td><td>QAM256</td><td>597000000 Hz</td><td>2.0 dBmV</td><td>40.7 dB</td></tr>
        </table>
    ";

    fn profile(auth: AuthSpec, resources: Vec<Resource>) -> DeviceProfile {
        DeviceProfile {
            id: "test_modem".to_string(),
            vendor: "Test".to_string(),
            model: "TM1".to_string(),
            auth,
            resources,
            info_resource: None,
            fallback_resource: None,
            hints: vec![],
            capabilities: CapabilitySet::from([Capability::DownstreamChannels]),
            priority: 0,
            parser: ParserVariant::Table {
                downstream: TableLayout {
                    title: "Downstream".to_string(),
                    skip_rows: 0,
                    fields: FieldMap {
                        channel_id: 0,
                        lock: Some(1),
                        modulation: Some(2),
                        frequency: Some(3),
                        power: Some(4),
                        snr: Some(5),
                        corrected: None,
                        uncorrected: None,
                    },
                },
                upstream: None,
            },
            info: None,
            login_markers: vec![],
            restart: None,
        }
    }

    fn orchestrator(profile: DeviceProfile, server: &MockServer) -> DataOrchestrator {
        let ctx = FetchContext::builder()
            .timeout(Duration::from_secs(2))
            .retry(RetryStrategy::no_retry())
            .max_auth_failures(2)
            .unavailable_after(2)
            .build()
            .unwrap();
        DataOrchestrator::new(
            ResolvedProfile::from_profile(Arc::new(profile)),
            Url::parse(&server.uri()).unwrap(),
            Credentials::new("admin", "password"),
            Arc::new(ctx),
        )
    }

    #[tokio::test]
    async fn test_first_declared_resource_wins() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(STATUS_PAGE))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/generic"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .expect(0)
            .mount(&server)
            .await;

        let mut p = profile(AuthSpec::None, vec![Resource::page("/status.html")]);
        p.fallback_resource = Some(Resource::page("/generic"));
        let orch = orchestrator(p, &server);

        let result = orch.try_poll().await.unwrap();
        assert_eq!(result.status, PollStatus::Ok);
        assert_eq!(result.channels.len(), 2);
        assert_eq!(orch.state().await, SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_fallback_used_after_declared_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status.html"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/generic"))
            .respond_with(ResponseTemplate::new(200).set_body_string(STATUS_PAGE))
            .mount(&server)
            .await;

        let mut p = profile(AuthSpec::None, vec![Resource::page("/status.html")]);
        p.fallback_resource = Some(Resource::page("/generic"));
        let result = orchestrator(p, &server).try_poll().await.unwrap();
        assert_eq!(result.channels.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_decode_is_stale_not_empty_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<table><tr><th>Downstream</th></tr></table>"))
            .mount(&server)
            .await;

        let orch = orchestrator(profile(AuthSpec::None, vec![Resource::page("/status.html")]), &server);
        let result = orch.poll().await;
        assert_eq!(result.status, PollStatus::StaleSession);
        assert!(result.channels.is_empty());
    }

    #[tokio::test]
    async fn test_basic_401_counts_toward_terminal_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status.html"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let orch = orchestrator(profile(AuthSpec::Basic, vec![Resource::page("/status.html")]), &server);
        assert!(matches!(
            orch.try_poll().await,
            Err(PollError::Auth(AuthError::WrongCredentials(_)))
        ));
        assert!(orch.try_poll().await.is_err());
        assert_eq!(orch.state().await, SessionState::Failed);
        assert!(matches!(orch.try_poll().await, Err(PollError::AuthDisabled { .. })));
        assert_eq!(orch.health().await, DeviceHealth::Unavailable);

        orch.reset().await;
        assert_eq!(orch.state().await, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_restart_requires_capability() {
        let server = MockServer::start().await;
        let orch = orchestrator(profile(AuthSpec::None, vec![Resource::page("/")]), &server);
        assert!(matches!(
            orch.restart().await,
            Err(PollError::Capability(CapabilityError::Unsupported { .. }))
        ));
    }

    #[tokio::test]
    async fn test_restart_sent_once_even_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/reboot.cgi"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let mut p = profile(AuthSpec::None, vec![Resource::page("/")]);
        p.capabilities.insert(Capability::Restart);
        p.restart = Some(ControlRequest::Form {
            path: "/reboot.cgi".to_string(),
            fields: vec![("Rebooting".to_string(), "1".to_string())],
        });
        let orch = orchestrator(p, &server);
        assert!(matches!(orch.restart().await, Err(PollError::Fetch(_))));
    }

    #[tokio::test]
    async fn test_restart_answered_with_login_page_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/reboot.cgi"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<form action="/login.cgi"><input type="password" name="password"></form>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let mut p = profile(AuthSpec::None, vec![Resource::page("/")]);
        p.capabilities.insert(Capability::Restart);
        p.restart = Some(ControlRequest::Form {
            path: "/reboot.cgi".to_string(),
            fields: vec![("Rebooting".to_string(), "1".to_string())],
        });
        let orch = orchestrator(p, &server);
        assert!(matches!(orch.restart().await, Err(PollError::CommandRejected(_))));
    }

    #[test]
    fn test_hnap_action_result() {
        let body = r#"{"SetStatusSecuritySettingsResponse":{"SetStatusSecuritySettingsResult":"OK"}}"#;
        assert_eq!(
            hnap_action_result(body, "SetStatusSecuritySettings").as_deref(),
            Some("OK")
        );
        assert_eq!(hnap_action_result(body, "Reboot"), None);
        assert_eq!(hnap_action_result("not json", "SetStatusSecuritySettings"), None);
    }

    fn form_auth() -> AuthSpec {
        AuthSpec::Form {
            login_path: "/login.cgi".to_string(),
            username_field: "username".to_string(),
            password_field: "password".to_string(),
            extra_fields: vec![],
            success_marker: None,
            error_marker: None,
            session_cookie: None,
        }
    }

    #[tokio::test]
    async fn test_session_replaced_after_repeated_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login.cgi"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Welcome"))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/status.html"))
            .respond_with(ResponseTemplate::new(503))
            .expect(4)
            .mount(&server)
            .await;

        let orch = orchestrator(profile(form_auth(), vec![Resource::page("/status.html")]), &server);
        for _ in 0..4 {
            assert!(orch.try_poll().await.is_err());
        }
        assert!(orch.has_session().await);
    }

    #[tokio::test]
    async fn test_lockout_blocks_requests_until_cooldown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login.cgi"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "600"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/status.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(STATUS_PAGE))
            .expect(0)
            .mount(&server)
            .await;

        let orch = orchestrator(profile(form_auth(), vec![Resource::page("/status.html")]), &server);
        assert!(matches!(
            orch.try_poll().await,
            Err(PollError::Auth(AuthError::Lockout { .. }))
        ));

        let until = match orch.try_poll().await {
            Err(PollError::LockedOut { until }) => until,
            other => panic!("expected lockout, got {other:?}"),
        };
        assert!(until > Utc::now() + chrono::Duration::seconds(500));
        assert!(!orch.has_session().await);
        assert_ne!(orch.state().await, SessionState::Failed);
    }
}
