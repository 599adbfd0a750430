//! Network driver integration tests over the replay transport.

use std::time::Duration;

use promptwire::platform::{PlatformDefinition, PrivilegeLevel};
use promptwire::transport::ReplayTransport;
use promptwire::{DriverBuilder, Error};

const STEP: Duration = Duration::from_millis(25);

fn test_platform() -> PlatformDefinition {
    let exec = PrivilegeLevel::new("exec", r"(?m)^router>\s?$").unwrap();

    let privilege_exec = PrivilegeLevel::new("privilege_exec", r"(?m)^router#\s?$")
        .unwrap()
        .with_parent("exec")
        .with_escalate("enable")
        .with_deescalate("disable");

    let configuration = PrivilegeLevel::new("configuration", r"(?m)^router\(config\)#\s?$")
        .unwrap()
        .with_parent("privilege_exec")
        .with_escalate("configure terminal")
        .with_deescalate("end");

    PlatformDefinition::new("test_platform")
        .with_privilege(exec)
        .with_privilege(privilege_exec)
        .with_privilege(configuration)
        .with_default_privilege("privilege_exec")
        .with_config_privilege("configuration")
        .with_failure_pattern("% Invalid input detected")
}

fn driver_over(transport: ReplayTransport) -> promptwire::NetworkDriver {
    DriverBuilder::new("router1")
        .custom_transport(Box::new(transport))
        .custom_platform(test_platform())
        .timeout_ops(Duration::from_secs(2))
        .build()
        .unwrap()
}

#[tokio::test]
async fn open_resolves_privilege_and_commands_round_trip() {
    let transport = ReplayTransport::new()
        .feed(&b"\nrouter#"[..])
        .feed_after(STEP, &b"show version\nSoftware, Version 17.3.1\nrouter#"[..]);

    let mut driver = driver_over(transport);
    driver.open().await.unwrap();
    assert_eq!(driver.current_privilege(), Some("privilege_exec"));

    let response = driver.send_command("show version").await.unwrap();
    assert_eq!(response.result, "Software, Version 17.3.1");
    assert!(!response.is_failed());
    assert_eq!(response.host, "router1");
    assert!(response.elapsed > Duration::ZERO);

    driver.close().await.unwrap();
}

#[tokio::test]
async fn failure_substrings_classify_output() {
    let transport = ReplayTransport::new()
        .feed(&b"\nrouter#"[..])
        .feed_after(
            STEP,
            &b"show bogus\n% Invalid input detected at '^' marker.\nrouter#"[..],
        );

    let mut driver = driver_over(transport);
    driver.open().await.unwrap();

    let response = driver.send_command("show bogus").await.unwrap();
    assert!(response.is_failed());
    assert!(response.contains("% Invalid input detected"));

    driver.close().await.unwrap();
}

#[tokio::test]
async fn batch_keeps_partial_results_on_error() {
    // Only the first command gets a response; the second times out. The
    // batch hands back what it already has alongside the error.
    let transport = ReplayTransport::new()
        .feed(&b"\nrouter#"[..])
        .feed_after(STEP, &b"show version\nSoftware, Version 17.3.1\nrouter#"[..]);

    let mut driver = DriverBuilder::new("router1")
        .custom_transport(Box::new(transport))
        .custom_platform(test_platform())
        .timeout_ops(Duration::from_millis(200))
        .build()
        .unwrap();
    driver.open().await.unwrap();

    let (multi, err) = driver.send_commands(&["show version", "show clock"]).await;
    assert_eq!(multi.responses.len(), 1);
    assert_eq!(multi.responses[0].result, "Software, Version 17.3.1");
    assert!(matches!(err, Some(Error::Channel(_))));

    driver.close().await.unwrap();
}

#[tokio::test]
async fn send_configs_enters_and_leaves_configuration_mode() {
    let transport = ReplayTransport::new()
        .feed(&b"\nrouter#"[..])
        .feed_after(STEP, &b"\nrouter#"[..])
        .feed_after(STEP, &b"configure terminal\nrouter(config)#"[..])
        .feed_after(STEP, &b"\nrouter(config)#"[..])
        .feed_after(STEP, &b"hostname r1\nrouter(config)#"[..])
        .feed_after(STEP, &b"\nrouter(config)#"[..])
        .feed_after(STEP, &b"end\nrouter#"[..])
        .feed_after(STEP, &b"\nrouter#"[..]);
    let writes = transport.writes();

    let mut driver = driver_over(transport);
    driver.open().await.unwrap();

    let (multi, err) = driver.send_configs(&["hostname r1"]).await;
    assert!(err.is_none(), "unexpected error: {:?}", err);
    assert_eq!(multi.responses.len(), 1);
    assert!(!multi.is_failed());
    assert_eq!(driver.current_privilege(), Some("privilege_exec"));

    let sent: Vec<String> = writes
        .lock()
        .unwrap()
        .iter()
        .filter(|w| w.as_slice() != b"\n")
        .map(|w| String::from_utf8_lossy(w).to_string())
        .collect();
    assert_eq!(sent, vec!["configure terminal", "hostname r1", "end"]);

    driver.close().await.unwrap();
}

#[tokio::test]
async fn send_command_before_open_is_an_error() {
    let transport = ReplayTransport::new();
    let mut driver = driver_over(transport);

    let err = driver.send_command("show version").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Driver(promptwire::error::DriverError::NotConnected)
    ));
}
