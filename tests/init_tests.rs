mod common;

use std::error::Error;
use std::time::Duration;

use serde_json::Value;
use tracing_log_shipper::init::init_tracing_with_config;
use tracing_log_shipper::{InitError, Level, ShipperConfig};

use common::spawn_collector;

// The global subscriber can only be installed once per process, so the
// whole lifecycle lives in one test.
#[test]
fn global_subscriber_ships_tracing_events() {
    let (addr, rx) = spawn_collector();
    let config = ShipperConfig {
        console: false,
        level: Level::Info,
        ..ShipperConfig::new("orders", "127.0.0.1", addr.port())
    };

    let dispatcher = init_tracing_with_config(&config).expect("first install succeeds");

    tracing::debug!("below threshold");
    tracing::info!(target: "orders.api", order_id = 42, "order placed");
    let err = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad amount");
    tracing::error!(target: "orders.api", error = &err as &(dyn Error + 'static), "payment failed");

    let first: Value =
        serde_json::from_str(&rx.recv_timeout(Duration::from_secs(5)).expect("info line")).unwrap();
    assert_eq!(first["app"], "orders");
    assert_eq!(first["logger"], "orders.api");
    assert_eq!(first["message"], "order placed");
    assert_eq!(first["order_id"], 42);

    let second: Value =
        serde_json::from_str(&rx.recv_timeout(Duration::from_secs(5)).expect("error line")).unwrap();
    assert_eq!(second["level"], "ERROR");
    assert_eq!(second["exception"]["type"], "io::Error");
    assert_eq!(second["exception"]["message"], "bad amount");

    let again = init_tracing_with_config(&config);
    assert!(matches!(again, Err(InitError::AlreadyInstalled(_))));

    // Only the two events above were shipped.
    dispatcher.close();
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}
