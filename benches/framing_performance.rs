//! Criterion benchmarks for inbound frame dispatch.
//!
//! This benchmark suite covers:
//! - message-frame dispatch throughput for small and large bodies,
//! - payload-chunk dispatch throughput, and
//! - one-shot delivery against sliced delivery of the same byte stream.

use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, Throughput, black_box};
use syncwire::{OutputQueue, ProtocolHandler, ProtocolState, RawCoder};

#[derive(Default)]
struct Count {
    messages: usize,
    payloads: usize,
}

impl ProtocolHandler<RawCoder> for Count {
    fn handle_message(
        &mut self,
        _out: &mut OutputQueue<RawCoder>,
        _message: Vec<u8>,
        _signature: Option<Bytes>,
    ) {
        self.messages += 1;
    }

    fn handle_payload(&mut self, _out: &mut OutputQueue<RawCoder>, _data: Bytes) {
        self.payloads += 1;
    }

    fn handle_payload_end(&mut self, _out: &mut OutputQueue<RawCoder>) {}
}

fn fresh_state() -> ProtocolState<RawCoder, Count> {
    ProtocolState::new(RawCoder, Count::default())
}

fn message_wire(body_len: usize, frames: usize) -> Vec<u8> {
    let body = vec![b'x'; body_len];
    let mut wire = Vec::with_capacity(frames * (body_len + 16));
    for _ in 0..frames {
        wire.extend_from_slice(format!("m{body_len}\n").as_bytes());
        wire.extend_from_slice(&body);
        wire.push(b'\n');
    }
    wire
}

fn payload_wire(chunk_len: usize, chunks: usize) -> Vec<u8> {
    let data = vec![b'p'; chunk_len];
    let mut wire = Vec::with_capacity(chunks * (chunk_len + 16) + 16);
    wire.extend_from_slice(b"!4\nsync\n");
    for _ in 0..chunks {
        wire.extend_from_slice(format!("{chunk_len}\n").as_bytes());
        wire.extend_from_slice(&data);
    }
    wire.extend_from_slice(b"0\n");
    wire
}

fn benchmark_message_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("framing/messages");

    for (label, body_len) in [("small", 32_usize), ("large", 16 * 1024)] {
        let wire = message_wire(body_len, 64);
        group.throughput(Throughput::Bytes(wire.len() as u64));
        group.bench_function(BenchmarkId::from_parameter(label), |b| {
            b.iter(|| {
                let mut state = fresh_state();
                state.input(black_box(&wire));
                black_box(state.handler().messages)
            });
        });
    }

    group.finish();
}

fn benchmark_payload_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("framing/payload_chunks");

    for (label, chunk_len) in [("small", 64_usize), ("large", 16 * 1024)] {
        let wire = payload_wire(chunk_len, 64);
        group.throughput(Throughput::Bytes(wire.len() as u64));
        group.bench_function(BenchmarkId::from_parameter(label), |b| {
            b.iter(|| {
                let mut state = fresh_state();
                state.input(black_box(&wire));
                black_box(state.handler().payloads)
            });
        });
    }

    group.finish();
}

fn benchmark_sliced_delivery(c: &mut Criterion) {
    let mut group = c.benchmark_group("framing/slicing");
    let wire = message_wire(256, 64);
    group.throughput(Throughput::Bytes(wire.len() as u64));

    group.bench_function(BenchmarkId::from_parameter("one_shot"), |b| {
        b.iter(|| {
            let mut state = fresh_state();
            state.input(black_box(&wire));
            black_box(state.handler().messages)
        });
    });

    group.bench_function(BenchmarkId::from_parameter("by_512"), |b| {
        b.iter(|| {
            let mut state = fresh_state();
            for slice in wire.chunks(512) {
                state.input(black_box(slice));
            }
            black_box(state.handler().messages)
        });
    });

    group.finish();
}

/// Entrypoint for frame-dispatch throughput benchmarks.
fn main() {
    let mut criterion = Criterion::default().configure_from_args();
    benchmark_message_dispatch(&mut criterion);
    benchmark_payload_dispatch(&mut criterion);
    benchmark_sliced_delivery(&mut criterion);
    criterion.final_summary();
}
