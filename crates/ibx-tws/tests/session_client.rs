//! Session client behavior against a scripted transport.

mod common;

use common::{client_with, fast_config, Event, FakeTransport, Reply};
use ibx_core::TimestampConvention;
use ibx_tws::{ClientConfig, SessionClient, SessionState, TwsError};
use std::time::{Duration, Instant};

const T0: i64 = 1_700_000_000;

#[test]
fn test_connect_succeeds_within_one_poll_interval() {
    let config = ClientConfig {
        connect_poll_interval_ms: 100,
        ..fast_config()
    };
    let client = SessionClient::with_transport(config, FakeTransport::new(Reply::Silent));

    let start = Instant::now();
    assert!(client.connect());
    assert!(start.elapsed() < Duration::from_millis(100));

    assert!(client.is_connected());
    assert_eq!(client.state(), SessionState::Connected);
    assert_eq!(client.transport().probe.opens(), 1);
}

#[test]
fn test_connect_times_out_when_transport_never_connects() {
    let client = client_with(FakeTransport::never_connects());

    let start = Instant::now();
    assert!(!client.connect());
    let elapsed = start.elapsed();

    // 300ms connect timeout polled every 50ms.
    assert!(elapsed >= Duration::from_millis(300), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1_000), "took too long: {elapsed:?}");
    assert!(!client.is_connected());
    // The half-open session is torn down.
    assert_eq!(client.transport().probe.closes(), 1);
}

#[test]
fn test_connect_timeout_error_kind() {
    let client = client_with(FakeTransport::never_connects());
    assert!(matches!(
        client.try_connect(),
        Err(TwsError::ConnectionTimeout(t)) if t == Duration::from_millis(300)
    ));
}

#[test]
fn test_open_failure_is_reported_not_raised() {
    let transport = FakeTransport {
        refuse_open: true,
        ..FakeTransport::new(Reply::Silent)
    };
    let client = client_with(transport);

    assert!(!client.connect());
    assert!(matches!(client.try_connect(), Err(TwsError::TransportOpen(_))));
    assert!(!client.is_connected());
}

#[test]
fn test_connect_waits_for_next_valid_id_when_configured() {
    let config = ClientConfig {
        wait_for_next_valid_id: true,
        ..fast_config()
    };

    let ready = SessionClient::with_transport(config.clone(), FakeTransport::new(Reply::Silent));
    assert!(ready.connect());
    assert_eq!(ready.wrapper().next_valid_id(), Some(1));

    let silent = FakeTransport {
        announce_ready: false,
        ..FakeTransport::new(Reply::Silent)
    };
    let not_ready = SessionClient::with_transport(config, silent);
    assert!(!not_ready.connect());
}

#[test]
fn test_connect_when_already_connected_is_noop() {
    let client = client_with(FakeTransport::new(Reply::Silent));
    assert!(client.connect());
    assert!(client.connect());
    assert_eq!(client.transport().probe.opens(), 1);
}

#[test]
fn test_request_current_time_round_trip() {
    let client = client_with(FakeTransport::new(Reply::time(T0)));
    assert!(client.connect());

    let result = client
        .request_current_time(Duration::from_secs(2))
        .expect("time result");

    let expected = TimestampConvention::Utc.interpret(T0).unwrap();
    assert_eq!(result.current_time, expected);
    assert_eq!(result.unix_seconds(), T0);
    assert_eq!(result.server_version, Some(176));
    assert!(result.connection_time.is_some());
    assert_eq!(client.transport().probe.sends(), 1);
}

#[test]
fn test_current_time_uses_configured_timeout() {
    let config = ClientConfig {
        request_timeout_ms: 100,
        ..fast_config()
    };
    let client = SessionClient::with_transport(config, FakeTransport::new(Reply::Silent));
    assert!(client.connect());

    let start = Instant::now();
    assert!(client.current_time().is_none());
    assert!(start.elapsed() >= Duration::from_millis(100));
    assert!(start.elapsed() < Duration::from_millis(600));
}

#[test]
fn test_request_times_out_without_callback() {
    let client = client_with(FakeTransport::new(Reply::Silent));
    assert!(client.connect());

    let start = Instant::now();
    assert!(client.request_current_time(Duration::from_millis(100)).is_none());
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(100), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(600), "took too long: {elapsed:?}");
    assert_eq!(client.transport().probe.sends(), 1);
    // A timeout does not tear down the session.
    assert!(client.is_connected());
}

#[test]
fn test_request_when_not_connected_never_sends() {
    let client = client_with(FakeTransport::new(Reply::time(T0)));

    assert!(client.request_current_time(Duration::from_millis(100)).is_none());
    assert!(matches!(
        client.try_request_current_time(Duration::from_millis(100)),
        Err(TwsError::NotConnected)
    ));
    assert_eq!(client.transport().probe.sends(), 0);
}

#[test]
fn test_request_after_disconnect_never_sends() {
    let client = client_with(FakeTransport::new(Reply::time(T0)));
    assert!(client.connect());
    client.disconnect();

    assert!(client.request_current_time(Duration::from_millis(100)).is_none());
    assert_eq!(client.transport().probe.sends(), 0);
}

#[test]
fn test_error_recorded_before_time_fails_request() {
    let reply = Reply::Events(vec![
        Event::Error(-1, 10167, "Requested market data is not subscribed".to_string()),
        Event::Time(T0),
    ]);
    let client = client_with(FakeTransport::new(reply));
    assert!(client.connect());

    match client.try_request_current_time(Duration::from_secs(2)) {
        Err(TwsError::Protocol(message)) => assert!(message.contains("10167")),
        other => panic!("expected protocol error, got {other:?}"),
    }

    let status = client.connection_status();
    assert!(status.connected);
    assert!(status.error_message.unwrap().contains("10167"));
}

#[test]
fn test_informational_notice_does_not_fail_request() {
    let reply = Reply::Events(vec![
        Event::Error(-1, 2104, "Market data farm connection is OK:usfarm".to_string()),
        Event::Time(T0),
    ]);
    let client = client_with(FakeTransport::new(reply));
    assert!(client.connect());

    assert!(client.request_current_time(Duration::from_secs(2)).is_some());
    assert!(client.connection_status().error_message.is_none());
}

#[test]
fn test_connection_lost_code_unblocks_request_and_disconnects() {
    let reply = Reply::Events(vec![Event::Error(
        -1,
        1100,
        "Connectivity between IB and Trader Workstation has been lost.".to_string(),
    )]);
    let client = client_with(FakeTransport::new(reply));
    assert!(client.connect());

    let start = Instant::now();
    let result = client.try_request_current_time(Duration::from_secs(5));
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(matches!(result, Err(TwsError::Protocol(ref m)) if m.contains("1100")));

    assert!(!client.is_connected());
    let status = client.connection_status();
    assert!(!status.connected);
    assert!(status.error_message.is_some());
}

#[test]
fn test_unsolicited_connection_lost_marks_disconnected() {
    let client = client_with(FakeTransport::new(Reply::Silent));
    assert!(client.connect());

    client
        .transport()
        .inject(Event::Error(-1, 1100, "Connectivity lost".to_string()));

    let deadline = Instant::now() + Duration::from_secs(2);
    while client.is_connected() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(client.state(), SessionState::Disconnected);
}

#[test]
fn test_disconnect_twice_closes_once() {
    let client = client_with(FakeTransport::new(Reply::Silent));
    assert!(client.connect());

    client.disconnect();
    client.disconnect();

    assert_eq!(client.transport().probe.closes(), 1);
    assert!(!client.is_connected());
}

#[test]
fn test_disconnect_during_pending_request_unblocks_waiter() {
    let client = client_with(FakeTransport::new(Reply::Silent));
    assert!(client.connect());

    std::thread::scope(|scope| {
        scope.spawn(|| {
            std::thread::sleep(Duration::from_millis(100));
            client.disconnect();
        });

        let start = Instant::now();
        let result = client.try_request_current_time(Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(matches!(result, Err(TwsError::ConnectionLost)));
    });

    assert_eq!(client.transport().probe.closes(), 1);
}

#[test]
fn test_overlapping_requests_are_serialized() {
    let client = client_with(FakeTransport::new(Reply::time(T0)));
    assert!(client.connect());

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| client.request_current_time(Duration::from_secs(2))))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(results.iter().all(Option::is_some));
    assert_eq!(client.transport().probe.sends(), 4);
}

#[test]
fn test_status_survives_internal_panic() {
    let client = client_with(FakeTransport::new(Reply::Silent));
    assert!(client.connect());

    client.transport().set_explode_on_status(true);
    let status = client.connection_status();
    client.transport().set_explode_on_status(false);

    assert!(!status.connected);
    assert_eq!(status.host, "unknown");
    assert_eq!(status.port, 0);
    assert!(status
        .error_message
        .is_some_and(|m| m.contains("status probe exploded")));
}

#[test]
fn test_status_snapshot_fields() {
    let config = ClientConfig {
        host: "10.0.0.5".to_string(),
        port: 4002,
        client_id: 9,
        ..fast_config()
    };
    let client = SessionClient::with_transport(config, FakeTransport::new(Reply::time(T0)));
    assert!(client.connect());
    assert!(client.current_time().is_some());

    let status = client.connection_status();
    assert!(status.connected);
    assert_eq!(status.client_id, 9);
    assert_eq!(status.host, "10.0.0.5");
    assert_eq!(status.port, 4002);
    assert!(status.connection_time.is_some());
    assert!(status.error_message.is_none());
}

#[test]
fn test_reconnect_after_disconnect() {
    let client = client_with(FakeTransport::new(Reply::time(T0)));
    assert!(client.connect());
    client.disconnect();

    assert!(client.connect());
    assert!(client.request_current_time(Duration::from_secs(2)).is_some());
    assert_eq!(client.transport().probe.opens(), 2);
}

#[test]
fn test_drop_disconnects() {
    let transport = FakeTransport::new(Reply::Silent);
    let probe = transport.probe.clone();
    {
        let client = client_with(transport);
        assert!(client.connect());
    }
    assert_eq!(probe.closes(), 1);
    assert_eq!(
        probe
            .connection_closed_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
}

#[test]
fn test_queued_request_rejected_after_connection_lost() {
    let client = client_with(FakeTransport::new(Reply::Silent));
    assert!(client.connect());

    std::thread::scope(|scope| {
        let first = scope.spawn(|| client.try_request_current_time(Duration::from_secs(5)));
        std::thread::sleep(Duration::from_millis(50));

        let second = scope.spawn(|| {
            let result = client.try_request_current_time(Duration::from_secs(5));
            (result, Instant::now())
        });
        std::thread::sleep(Duration::from_millis(50));

        let lost_at = Instant::now();
        client
            .transport()
            .inject(Event::Error(-1, 1100, "Connectivity lost".to_string()));

        let first = first.join().unwrap();
        assert!(matches!(first, Err(TwsError::Protocol(ref m)) if m.contains("1100")));

        let (second, returned_at) = second.join().unwrap();
        assert!(matches!(second, Err(TwsError::NotConnected)), "got {second:?}");
        assert!(returned_at.duration_since(lost_at) < Duration::from_secs(1));
    });

    assert_eq!(client.transport().probe.sends(), 1);
    assert!(!client.is_connected());
}
