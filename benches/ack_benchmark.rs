use std::time::Duration;

use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tokio::time::Instant;
use tokio_netquake::{
    protocol::constants::MAX_DATAGRAM,
    session::{AckOutcome, DataOutcome, Inbound, InboundSession, OutboundSession},
};

/// Sends one message through a sender/receiver pair, feeding every fragment
/// and every ACK across by hand.
fn transfer(message: &Bytes, max_fragment: usize) -> Bytes {
    let now = Instant::now();
    let mut outbound = OutboundSession::new(max_fragment, Duration::from_secs(1));
    let mut inbound = InboundSession::with_max_message(message.len());

    let mut datagram = outbound.queue_reliable(message.clone(), now).unwrap();
    loop {
        let Inbound::Data { ack, outcome } = inbound.handle_datagram(datagram, true).unwrap()
        else {
            unreachable!("reliable fragment");
        };
        let delivered = match outcome {
            DataOutcome::Complete(message) => Some(message),
            _ => None,
        };
        match outbound.on_ack(ack.header.sequence, now) {
            AckOutcome::Next(next) => datagram = next,
            AckOutcome::Complete => return delivered.unwrap(),
            AckOutcome::Ignored { .. } => unreachable!("in-order ACK"),
        }
    }
}

fn bench_reliable_transfer(c: &mut Criterion) {
    let mut group = c.benchmark_group("reliable_transfer");
    for (size, fragment) in [(1024, MAX_DATAGRAM), (64 * 1024, 1400), (256 * 1024, 8192)] {
        let message = Bytes::from(vec![7u8; size]);
        group.bench_with_input(
            BenchmarkId::new(format!("frag{fragment}"), size),
            &message,
            |b, message| b.iter(|| black_box(transfer(message, fragment))),
        );
    }
    group.finish();
}

fn bench_ack_handling(c: &mut Criterion) {
    c.bench_function("inbound_ack", |b| {
        let mut session = InboundSession::new();
        let raw = Bytes::from_static(&[0, 2, 0, 8, 0, 0, 0, 0]);
        b.iter(|| black_box(session.handle_bytes(raw.clone(), true).unwrap()));
    });
}

criterion_group!(benches, bench_reliable_transfer, bench_ack_handling);
criterion_main!(benches);
