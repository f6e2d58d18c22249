use std::time::{Duration, Instant};

use tracing::{error, info};
use tracing_log_shipper::init::init_tracing;

struct Request {
    method: &'static str,
    path: &'static str,
}

fn handle(request: &Request) -> u16 {
    std::thread::sleep(Duration::from_millis(5));
    if request.path == "/" {
        info!(target: "fastapi-logger", "Root endpoint accessed");
        200
    } else {
        404
    }
}

/// Middleware shape: time the handler, then emit one record per request.
fn log_request(request: &Request) {
    let start = Instant::now();
    let status_code = handle(request);
    let process_time_ms = (start.elapsed().as_secs_f64() * 100_000.0).round() / 100.0;

    info!(
        target: "fastapi-logger",
        request_path = request.path,
        request_method = request.method,
        status_code,
        process_time_ms,
        "Request processed: {} {}",
        request.method,
        request.path
    );
}

fn main() {
    // Configure with LOG_SHIPPER_ENDPOINT=tcp://127.0.0.1:5000 and friends.
    let dispatcher = match init_tracing() {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            eprintln!("failed to initialize log shipping: {e}");
            return;
        }
    };

    for request in [
        Request { method: "GET", path: "/" },
        Request { method: "GET", path: "/missing" },
    ] {
        log_request(&request);
    }

    error!(target: "fastapi-logger", "shutting down");
    dispatcher.close();
}
