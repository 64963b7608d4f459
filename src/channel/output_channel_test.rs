use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::ChannelConfig;
use super::CompletionHandler;
use super::MockRawOutput;
use super::OutputChannel;
use super::OutputConfig;
use crate::test_utils::enable_logger;
use crate::test_utils::FakeTransport;
use crate::ChannelError;
use crate::Error;
use crate::TransportError;
use crate::TransportOutput;

const GRACE: Duration = Duration::from_millis(100);

fn chunked(
    chunk_size: Option<usize>,
    attempts: Option<u64>,
) -> OutputConfig {
    OutputConfig {
        channel: ChannelConfig {
            exact_mode: true,
            exact_attempts: attempts,
            exact_delay: Duration::ZERO,
        },
        chunk_size,
    }
}

fn channel(
    transport: &Arc<FakeTransport>,
    config: OutputConfig,
) -> OutputChannel<TransportOutput<FakeTransport>> {
    OutputChannel::new(TransportOutput::new(transport.clone()), config, GRACE)
}

#[test]
fn test_chunked_exact_write_splits_into_bounded_writes() {
    enable_logger();
    let transport = Arc::new(FakeTransport::new());
    let output = channel(&transport, chunked(Some(2), None));

    assert_eq!(output.write(b"hello").unwrap(), 5);

    let writes = transport.writes();
    assert!(writes.iter().all(|chunk| chunk.len() <= 2));
    assert_eq!(writes.iter().map(Vec::len).sum::<usize>(), 5);
    assert_eq!(transport.written(), b"hello");
}

#[test]
fn test_zero_chunk_size_writes_whole_remainder() {
    enable_logger();
    let transport = Arc::new(FakeTransport::new());
    let output = channel(&transport, chunked(Some(0), None));

    assert_eq!(output.write(b"hello").unwrap(), 5);
    assert_eq!(transport.writes(), vec![b"hello".to_vec()]);
}

#[test]
fn test_exact_write_returns_partial_total_when_attempts_run_out() {
    enable_logger();
    let transport = Arc::new(FakeTransport::new());
    transport.set_write_limit(Some(1));
    let output = channel(&transport, chunked(None, Some(2)));

    assert_eq!(output.write(b"abcd").unwrap(), 2);
    assert_eq!(transport.written(), b"ab");
}

#[test]
fn test_non_exact_write_invokes_primitive_once() {
    enable_logger();
    let mut raw = MockRawOutput::new();
    raw.expect_raw_write().times(1).returning(|src| Ok(src.len().min(3)));
    let output = OutputChannel::new(raw, OutputConfig::default(), GRACE);

    assert_eq!(output.write(b"abcdef").unwrap(), 3);
}

#[test]
fn test_write_failure_is_not_retried() {
    enable_logger();
    let mut raw = MockRawOutput::new();
    raw.expect_raw_write()
        .times(1)
        .returning(|_| Err(TransportError::Device("tx fault".into()).into()));
    let output = OutputChannel::new(raw, chunked(Some(1), None), GRACE);

    assert!(output.write(b"abc").unwrap_err().is_transport());
    assert!(!output.is_active());
}

#[test]
fn test_async_write_hands_back_buffer_and_notifies() {
    enable_logger();
    struct Counting(Arc<AtomicUsize>);
    impl CompletionHandler<u32> for Counting {
        fn completed(
            &self,
            transferred: usize,
            attachment: &u32,
        ) {
            assert_eq!(*attachment, 42);
            self.0.fetch_add(transferred, Ordering::SeqCst);
        }

        fn failed(
            &self,
            _error: &Error,
            _attachment: &u32,
        ) {
        }
    }

    let transport = Arc::new(FakeTransport::new());
    let output = channel(&transport, chunked(Some(3), None));
    let total = Arc::new(AtomicUsize::new(0));

    let outcome = output
        .write_async_with(b"payload".to_vec(), 42, Counting(total.clone()))
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(outcome.transferred, 7);
    assert_eq!(outcome.buffer, b"payload");
    assert_eq!(total.load(Ordering::SeqCst), 7);
    assert_eq!(transport.writes().len(), 3);
}

#[test]
fn test_chunk_size_setter_applies_to_next_write() {
    enable_logger();
    let transport = Arc::new(FakeTransport::new());
    let output = channel(&transport, OutputConfig::default());

    output.set_exact_mode(true);
    output.set_exact_attempts(Some(10));
    output.set_exact_delay(Duration::ZERO);
    output.set_chunk_size(Some(4));
    assert_eq!(output.config().chunk_size, Some(4));

    assert_eq!(output.write(b"0123456789").unwrap(), 10);
    assert_eq!(
        transport.writes(),
        vec![b"0123".to_vec(), b"4567".to_vec(), b"89".to_vec()]
    );
}

#[test]
fn test_close_runs_output_cleanup_once_and_rejects_writes() {
    enable_logger();
    let mut raw = MockRawOutput::new();
    raw.expect_raw_write().never();
    raw.expect_close_output().times(1).returning(|| Ok(()));
    let output = OutputChannel::new(raw, OutputConfig::default(), GRACE);

    output.close().unwrap();
    output.close().unwrap();

    assert!(matches!(
        output.write(b"late"),
        Err(Error::Channel(ChannelError::ChannelClosed { .. }))
    ));
    assert!(matches!(
        output.write_async(b"late".to_vec()),
        Err(Error::Channel(ChannelError::ChannelClosed { .. }))
    ));
}

#[tokio::test]
async fn test_write_handle_can_be_awaited() {
    enable_logger();
    let transport = Arc::new(FakeTransport::new());
    let output = channel(&transport, chunked(Some(2), None));

    let outcome = output.write_async(b"abc".to_vec()).unwrap().await.unwrap();
    assert_eq!(outcome.data(), b"abc");
    assert_eq!(transport.written(), b"abc");
}

#[test]
fn test_async_write_rejects_second_submission_while_in_flight() {
    enable_logger();
    let (release, released) = mpsc::channel::<()>();
    let released = Mutex::new(released);
    let mut raw = MockRawOutput::new();
    raw.expect_raw_write().times(1).returning(move |src| {
        let _ = released.lock().recv_timeout(Duration::from_secs(5));
        Ok(src.len())
    });
    let output = OutputChannel::new(raw, OutputConfig::default(), GRACE);

    let handle = output.write_async(b"abc".to_vec()).unwrap();
    assert!(output.is_active());
    assert!(matches!(
        output.write_async(b"def".to_vec()),
        Err(Error::Channel(ChannelError::ConcurrentAccess { .. }))
    ));
    assert!(matches!(
        output.write(b"ghi"),
        Err(Error::Channel(ChannelError::ConcurrentAccess { .. }))
    ));

    release.send(()).unwrap();
    let outcome = handle.wait().unwrap();
    assert_eq!(outcome.transferred, 3);
    assert_eq!(outcome.data(), b"abc");
    assert!(!output.is_active());
}
