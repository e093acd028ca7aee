//! # Session Benchmark
//!
//! Begin/End cost with and without nesting, and typed message round trips
//! over an in-process link.
//!
//! Run with: `cargo bench --package netmsg_networking`

// Benchmarks don't need docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use netmsg_networking::{ChannelTransport, EngineMessage, MessageSession};
use netmsg_shared::{PlayerId, SessionConfig};

fn bench_begin_end(c: &mut Criterion) {
    let mut session = MessageSession::new(&SessionConfig::default());
    c.bench_function("begin_end_16_fields", |b| {
        b.iter(|| {
            let writer = session.begin(5).unwrap();
            for i in 0..16 {
                writer.write_i32(black_box(i)).unwrap();
            }
            session.end().unwrap();
            black_box(session.buffer().length())
        });
    });
}

fn bench_nested_begin_end(c: &mut Criterion) {
    let mut session = MessageSession::new(&SessionConfig::default());
    c.bench_function("nested_begin_end", |b| {
        b.iter(|| {
            session.begin(1).unwrap().write_u32(1).unwrap();
            session.begin(2).unwrap().write_u32(2).unwrap();
            session.end().unwrap();
            session.writer().unwrap().write_u32(3).unwrap();
            session.end().unwrap();
            black_box(session.buffer().length())
        });
    });
}

fn bench_message_roundtrip(c: &mut Criterion) {
    let config = SessionConfig::default();
    let (a, b) = ChannelTransport::pair(PlayerId(1), PlayerId(2), 16);
    let mut sender = MessageSession::with_transport(&config, a);
    let mut receiver = MessageSession::with_transport(&config, b);
    let chat = EngineMessage::Chat {
        from: PlayerId(1),
        to_mask: u32::MAX,
        text: "the quick brown fox".to_owned(),
    };
    c.bench_function("chat_roundtrip_channel", |bench| {
        bench.iter(|| {
            sender.send_message(&chat).unwrap();
            receiver.receive().unwrap();
            let message: Option<EngineMessage> = receiver.read_message().unwrap();
            black_box(message)
        });
    });
}

criterion_group!(
    benches,
    bench_begin_end,
    bench_nested_begin_end,
    bench_message_roundtrip
);
criterion_main!(benches);
