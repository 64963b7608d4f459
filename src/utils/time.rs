use std::thread;
use std::time::Duration;
use std::time::Instant;

/// Blocks the calling thread until `delay` has elapsed on the monotonic clock.
///
/// A zero delay returns immediately.
pub(crate) fn pause(delay: Duration) {
    if delay.is_zero() {
        return;
    }
    pause_until(Instant::now() + delay);
}

/// Sleeps until `deadline`, resuming the sleep after early wake-ups
pub(crate) fn pause_until(deadline: Instant) {
    loop {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep(deadline - now);
    }
}

/// Time left until `deadline`, zero once it has passed
pub(crate) fn remaining_until(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}
