//! Exact-mode transfer policy.
//!
//! The policy is independent of any transport: it drives a raw primitive given
//! as a closure, so it can be exercised against fakes directly.

use tracing::debug;
use tracing::trace;

use super::ChannelConfig;
use super::OutputConfig;
use crate::utils::time::pause;
use crate::Result;
use crate::TransportError;

/// Reads into `dst` following `config`.
///
/// Without exact mode the primitive runs exactly once and its count is
/// returned verbatim. In exact mode the primitive is called on the unfilled
/// remainder until `dst` is full or the attempt budget runs out; running out
/// of attempts returns the partial total, a primitive error is returned as-is.
pub fn exact_read<F>(
    config: &ChannelConfig,
    dst: &mut [u8],
    mut raw: F,
) -> Result<usize>
where
    F: FnMut(&mut [u8]) -> Result<usize>,
{
    if !config.exact_mode {
        let offered = dst.len();
        return checked(offered, raw(dst)?);
    }

    let capacity = dst.len();
    let mut total = 0;
    let mut attempts = config.exact_attempts;
    let mut first_run = true;

    while total < capacity && has_attempts(attempts) {
        if !first_run {
            pause(config.exact_delay);
        }
        first_run = false;
        consume_attempt(&mut attempts);

        let remainder = &mut dst[total..];
        let offered = remainder.len();
        total += checked(offered, raw(remainder)?)?;
        trace!("exact read: {}/{} bytes", total, capacity);
    }

    if total < capacity {
        debug!(
            "exact read gave up after exhausting attempts: {}/{} bytes",
            total, capacity
        );
    }
    Ok(total)
}

/// Writes `src` following `config`.
///
/// Same shape as [`exact_read`], with the stop condition on bytes written and
/// each attempt clamped to `chunk_size` bytes when chunking is enabled.
pub fn exact_write<F>(
    config: &OutputConfig,
    src: &[u8],
    mut raw: F,
) -> Result<usize>
where
    F: FnMut(&[u8]) -> Result<usize>,
{
    let policy = &config.channel;
    if !policy.exact_mode {
        return checked(src.len(), raw(src)?);
    }

    let requested = src.len();
    let chunk_limit = config.chunk_limit();
    let mut total = 0;
    let mut attempts = policy.exact_attempts;
    let mut first_run = true;

    while total < requested && has_attempts(attempts) {
        if !first_run {
            pause(policy.exact_delay);
        }
        first_run = false;
        consume_attempt(&mut attempts);

        let end = match chunk_limit {
            Some(limit) => requested.min(total + limit),
            None => requested,
        };
        let slice = &src[total..end];
        total += checked(slice.len(), raw(slice)?)?;
        trace!("exact write: {}/{} bytes", total, requested);
    }

    if total < requested {
        debug!(
            "exact write gave up after exhausting attempts: {}/{} bytes",
            total, requested
        );
    }
    Ok(total)
}

fn has_attempts(attempts: Option<u64>) -> bool {
    attempts.map_or(true, |left| left > 0)
}

fn consume_attempt(attempts: &mut Option<u64>) {
    if let Some(left) = attempts {
        *left -= 1;
    }
}

fn checked(
    offered: usize,
    reported: usize,
) -> Result<usize> {
    if reported > offered {
        return Err(TransportError::Overrun { offered, reported }.into());
    }
    Ok(reported)
}
