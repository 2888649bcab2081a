//! End-to-end poll cycles against mock devices.

use gatewatch_core::{ChannelDirection, PollStatus};
use gatewatch_fetch::{AuthError, AuthSpec, Credentials, FetchContext, RetryStrategy};
use gatewatch_profiles::{DataOrchestrator, DeviceProfile, PollError, ProfileRegistry, ResolvedProfile, SessionState};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SB8200_CONNECTION: &str = include_str!("fixtures/sb8200_connection.html");
const SB8200_SWINFO: &str = include_str!("fixtures/sb8200_swinfo.html");
const MB8600_CHANNELS: &str = include_str!("fixtures/mb8600_channels.json");
const MB8600_INFO: &str = include_str!("fixtures/mb8600_info.json");
const LOGIN_PAGE: &str = include_str!("fixtures/login_page.html");

fn builtin(id: &str) -> DeviceProfile {
    let profile = ProfileRegistry::get(id).unwrap_or_else(|| panic!("missing built-in profile {id}"));
    (*profile).clone()
}

fn orchestrator(profile: DeviceProfile, server: &MockServer, password: &str) -> DataOrchestrator {
    let ctx = FetchContext::builder()
        .timeout(Duration::from_secs(2))
        .retry(RetryStrategy::no_retry())
        .max_auth_failures(3)
        .build()
        .unwrap();
    DataOrchestrator::new(
        ResolvedProfile::from_profile(Arc::new(profile)),
        Url::parse(&server.uri()).unwrap(),
        Credentials::new("admin", password),
        Arc::new(ctx),
    )
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

// ============================================================================
// Open status page
// ============================================================================

#[tokio::test]
async fn test_unauthenticated_table_device() {
    let server = MockServer::start().await;
    mount_page(&server, "/cmconnectionstatus.html", SB8200_CONNECTION).await;
    mount_page(&server, "/cmswinfo.html", SB8200_SWINFO).await;

    let orch = orchestrator(builtin("arris_sb8200"), &server, "");
    let result = orch.try_poll().await.unwrap();

    assert_eq!(result.status, PollStatus::Ok);
    assert_eq!(result.downstream_count(), 8);
    assert_eq!(result.upstream_count(), 4);
    assert_eq!(result.decode_error_count, 0);
    assert!(!result.reauthenticated);

    let first = result.downstream().next().unwrap();
    assert_eq!(first.channel_id, 1);
    assert_eq!(first.frequency_hz, Some(579_000_000));
    assert!(first.lock.is_locked());

    let up = result.upstream().next().unwrap();
    assert_eq!(up.direction, ChannelDirection::Upstream);
    assert_eq!(up.frequency_hz, Some(16_400_000));
    assert_eq!(up.snr_db, None);

    assert_eq!(
        result.system_info.firmware_version.as_deref(),
        Some("AB01.02.053.05_051921_193.0A.NSH")
    );
    assert_eq!(
        result.system_info.uptime,
        Some(Duration::from_secs(7 * 86_400 + 34 * 60 + 12))
    );
}

// ============================================================================
// Form login with nonce
// ============================================================================

#[tokio::test]
async fn test_nonce_form_wrong_password() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/goform/GenieLogin"))
        .and(body_string_contains("webToken="))
        .respond_with(ResponseTemplate::new(200).set_body_string("Login failed"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/DocsisStatus.htm"))
        .respond_with(ResponseTemplate::new(200).set_body_string("never fetched"))
        .expect(0)
        .mount(&server)
        .await;

    let orch = orchestrator(builtin("netgear_c7000"), &server, "wrong");
    let err = orch.try_poll().await.unwrap_err();

    assert!(matches!(err, PollError::Auth(AuthError::WrongCredentials(_))));
    assert!(!orch.has_session().await);
    assert_eq!(orch.state().await, SessionState::Unauthenticated);
}

// ============================================================================
// HNAP
// ============================================================================

const SOAP_LOGIN: &str = "\"http://purenetworks.com/HNAP1/Login\"";
const SOAP_MULTIPLE: &str = "\"http://purenetworks.com/HNAP1/GetMultipleHNAPs\"";

async fn mount_hnap_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/HNAP1/"))
        .and(header("SOAPAction", SOAP_LOGIN))
        .and(body_string_contains("\"Action\":\"request\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "LoginResponse": {
                "Challenge": "BZcUxlk5ZIlR1nKYwhHM",
                "Cookie": "1234567",
                "PublicKey": "VbpfOWqqL7s3SVYfdS0z",
                "LoginResult": "OK"
            }
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/HNAP1/"))
        .and(header("SOAPAction", SOAP_LOGIN))
        .and(body_string_contains("6509597C8BC512772B27816641101A5C"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "LoginResponse": { "LoginResult": "OK" }
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_hnap_md5_device() {
    let server = MockServer::start().await;
    mount_hnap_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/HNAP1/"))
        .and(header("SOAPAction", SOAP_MULTIPLE))
        .and(header_exists("HNAP_AUTH"))
        .and(body_string_contains("GetMotoStatusDownstreamChannelInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MB8600_CHANNELS))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/HNAP1/"))
        .and(header("SOAPAction", SOAP_MULTIPLE))
        .and(body_string_contains("GetMotoStatusSoftware"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MB8600_INFO))
        .expect(1)
        .mount(&server)
        .await;

    let orch = orchestrator(builtin("motorola_mb8600"), &server, "motorola");
    let result = orch.try_poll().await.unwrap();

    assert_eq!(result.status, PollStatus::Ok);
    assert_eq!(result.downstream_count(), 33);
    assert_eq!(result.upstream_count(), 4);
    assert_eq!(result.system_info.firmware_version.as_deref(), Some("8600-19.3.18"));
    assert!(orch.has_session().await);

    let plc = result.downstream().find(|c| c.channel_id == 193).unwrap();
    assert_eq!(plc.frequency_hz, Some(957_000_000));
    assert_eq!(plc.corrected, Some(123_456));
}

const SOAP_SECURITY: &str = "\"http://purenetworks.com/HNAP1/SetStatusSecuritySettings\"";

async fn hnap_restart(reply: serde_json::Value) -> Result<(), PollError> {
    let server = MockServer::start().await;
    mount_hnap_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/HNAP1/"))
        .and(header("SOAPAction", SOAP_SECURITY))
        .and(body_string_contains("MotoStatusSecurityAction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply))
        .expect(1)
        .mount(&server)
        .await;

    orchestrator(builtin("motorola_mb8600"), &server, "motorola")
        .restart()
        .await
}

#[tokio::test]
async fn test_hnap_restart_accepted() {
    let reply = json!({
        "SetStatusSecuritySettingsResponse": { "SetStatusSecuritySettingsResult": "OK" }
    });
    assert!(hnap_restart(reply).await.is_ok());
}

#[tokio::test]
async fn test_hnap_restart_refused_when_unauthenticated() {
    let reply = json!({
        "SetStatusSecuritySettingsResponse": { "SetStatusSecuritySettingsResult": "UN-AUTH" }
    });
    assert!(matches!(hnap_restart(reply).await, Err(PollError::CommandRejected(_))));
}

#[tokio::test]
async fn test_hnap_restart_refused_on_error_result() {
    let reply = json!({
        "SetStatusSecuritySettingsResponse": { "SetStatusSecuritySettingsResult": "ERROR" }
    });
    let err = hnap_restart(reply).await.unwrap_err();
    assert!(matches!(err, PollError::CommandRejected(ref reason) if reason.contains("ERROR")));
}

// ============================================================================
// Decoding
// ============================================================================

#[test]
fn test_decoding_is_deterministic() {
    let sb8200 = builtin("arris_sb8200");
    let first = sb8200.parser.decode(SB8200_CONNECTION).unwrap();
    let second = sb8200.parser.decode(SB8200_CONNECTION).unwrap();
    assert_eq!(first, second);
    assert!(!first.is_empty());

    let mb8600 = builtin("motorola_mb8600");
    assert_eq!(
        mb8600.parser.decode(MB8600_CHANNELS).unwrap(),
        mb8600.parser.decode(MB8600_CHANNELS).unwrap()
    );
}

// ============================================================================
// Stale session
// ============================================================================

/// SB8200 layout behind a plain form login.
fn form_profile() -> DeviceProfile {
    let mut profile = builtin("arris_sb8200");
    profile.auth = AuthSpec::Form {
        login_path: "/login.cgi".to_string(),
        username_field: "username".to_string(),
        password_field: "password".to_string(),
        extra_fields: vec![],
        success_marker: None,
        error_marker: None,
        session_cookie: None,
    };
    profile
}

#[tokio::test]
async fn test_login_page_mid_cycle_reauthenticates_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Welcome"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cmconnectionstatus.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/cmconnectionstatus.html", SB8200_CONNECTION).await;
    mount_page(&server, "/cmswinfo.html", SB8200_SWINFO).await;

    let orch = orchestrator(form_profile(), &server, "password");
    let result = orch.try_poll().await.unwrap();

    assert!(result.reauthenticated);
    assert_eq!(result.status, PollStatus::Ok);
    assert_eq!(result.downstream_count(), 8);
    assert_eq!(orch.state().await, SessionState::Authenticated);
}

#[tokio::test]
async fn test_failed_reauthentication_reports_stale_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Welcome"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login.cgi"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    mount_page(&server, "/cmconnectionstatus.html", LOGIN_PAGE).await;

    let orch = orchestrator(form_profile(), &server, "password");
    let result = orch.poll().await;

    assert_eq!(result.status, PollStatus::StaleSession);
    assert!(result.channels.is_empty());
    assert!(!orch.has_session().await);
}

#[tokio::test]
async fn test_login_page_after_reauthentication_is_not_retried_again() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Welcome"))
        .expect(2)
        .mount(&server)
        .await;
    mount_page(&server, "/cmconnectionstatus.html", LOGIN_PAGE).await;

    let orch = orchestrator(form_profile(), &server, "password");
    let result = orch.poll().await;

    assert_eq!(result.status, PollStatus::StaleSession);
    assert!(result.channels.is_empty());
    assert_eq!(orch.state().await, SessionState::SessionExpired);
}

// ============================================================================
// Serialized cycles
// ============================================================================

#[tokio::test]
async fn test_concurrent_polls_share_one_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Welcome"))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/cmconnectionstatus.html", SB8200_CONNECTION).await;
    mount_page(&server, "/cmswinfo.html", SB8200_SWINFO).await;

    let orch = orchestrator(form_profile(), &server, "password");
    let (first, second) = tokio::join!(orch.try_poll(), orch.try_poll());

    assert_eq!(first.unwrap().downstream_count(), 8);
    assert_eq!(second.unwrap().downstream_count(), 8);
    assert_eq!(orch.state().await, SessionState::Authenticated);
}
