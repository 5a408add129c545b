//! Session push-path benchmark suite.
//!
//! Measures the cost of pushing through a session:
//! - Attached: every send is written straight to the channel
//! - Detached: sends buffer, then one reattach flushes them all
//!
//! Run with: cargo bench --bench session_throughput
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sockjs_session::session::SessionEvent;
use sockjs_session::{
    Channel, Frame, Result, Session, SessionContext, SessionHandler, SessionId, TransportKind,
};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const MESSAGE_COUNTS: &[usize] = &[1, 64, 1024];

const PAYLOAD: &str = r#"{"messageType":"notification","updates":[{"channelID":"a1","version":42}]}"#;

// ============================================================================
// Fixtures
// ============================================================================

struct Silent;

impl SessionHandler for Silent {
    fn on_open(&self, _context: SessionContext) {}

    fn on_message(&self, _message: &str) -> Result<()> {
        Ok(())
    }

    fn on_close(&self) {}
}

fn open_session(transport: TransportKind) -> std::sync::Arc<Session> {
    let session = Session::new(SessionId::generate(), transport, Box::new(Silent));
    let (channel, rx) = Channel::new(transport);
    session
        .dispatch(SessionEvent::UnitArrived(channel.clone()))
        .expect("open");
    channel.mark_inactive();
    session
        .dispatch(SessionEvent::ChannelClosed(channel.id()))
        .expect("release");
    drop(rx);
    session
}

// ============================================================================
// Benchmark: Attached Sends
// ============================================================================

fn bench_attached_send(c: &mut Criterion) {
    let mut group = c.benchmark_group("attached_send");

    for transport in [TransportKind::Streaming, TransportKind::Duplex] {
        let session = open_session(transport);
        let (channel, mut rx) = Channel::new(transport);
        session
            .dispatch(SessionEvent::UnitArrived(channel))
            .expect("attach");

        group.throughput(Throughput::Elements(1));
        group.bench_function(BenchmarkId::new("send", transport), |b| {
            b.iter(|| {
                session.send(black_box(PAYLOAD).to_string());
                black_box(rx.try_recv().ok());
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Buffer Then Flush
// ============================================================================

fn bench_buffer_then_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_then_flush");

    for &count in MESSAGE_COUNTS {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("streaming", count), &count, |b, &count| {
            b.iter(|| {
                let session = open_session(TransportKind::Streaming);
                for _ in 0..count {
                    session.send(PAYLOAD.to_string());
                }

                let (channel, mut rx) = Channel::new(TransportKind::Streaming);
                session
                    .dispatch(SessionEvent::UnitArrived(channel))
                    .expect("attach");
                black_box(rx.try_recv().ok());
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Frame Encoding
// ============================================================================

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let frame = Frame::Message(vec![PAYLOAD.to_string(); 64]);

    for transport in [TransportKind::Polling, TransportKind::Duplex] {
        group.bench_function(BenchmarkId::new("message_x64", transport), |b| {
            b.iter(|| black_box(frame.encode(transport)).ok());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_attached_send, bench_buffer_then_flush, bench_encode);
criterion_main!(benches);
