use std::time::Duration;
use std::time::Instant;

pub fn wait_until<F: Fn() -> bool>(condition: F, timeout: Duration) {
    let start = Instant::now();
    while !condition() {
        if start.elapsed() > timeout {
            panic!("condition not met within {:?}", timeout);
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

pub fn logger() -> slog::Logger {
    slog::Logger::root(slog::Discard, slog::o!())
}
