//! Packet codec throughput: fragmenting and encoding a frame, decoding and
//! reassembling it again.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use psn_core::constants::MAX_PACKET_LEN;
use psn_core::decoder::Decoder;
use psn_core::fragment::{encode_data_frame, encode_info_frame, FrameMeta};
use psn_core::packet::decode_packet;
use psn_core::tracker::{Float3, Tracker};

fn make_trackers(n: u16) -> Vec<Tracker> {
    (0..n)
        .map(|i| {
            let f = i as f32;
            Tracker::new(i)
                .with_name(format!("Tracker {i}"))
                .with_pos([f, f * 0.5, 1.8])
                .with_speed(Float3::new(0.1, 0.0, 0.0))
                .with_ori(Float3::ZERO)
                .with_validity(1.0)
                .with_timestamp(u64::from(i))
        })
        .collect()
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_frame");
    for n in [1u16, 50, 500] {
        let trackers = make_trackers(n);
        group.throughput(Throughput::Elements(u64::from(n)));
        group.bench_with_input(BenchmarkId::new("data", n), &trackers, |b, t| {
            b.iter(|| encode_data_frame(black_box(t), &FrameMeta::new(1, 0), MAX_PACKET_LEN))
        });
        group.bench_with_input(BenchmarkId::new("info", n), &trackers, |b, t| {
            b.iter(|| encode_info_frame(black_box(t), "bench", &FrameMeta::new(1, 0), MAX_PACKET_LEN))
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_frame");
    for n in [1u16, 50, 500] {
        let wire = match encode_data_frame(&make_trackers(n), &FrameMeta::new(1, 0), MAX_PACKET_LEN) {
            Ok(w) => w,
            Err(e) => panic!("bench input: {e}"),
        };
        let bytes: usize = wire.iter().map(Vec::len).sum();
        group.throughput(Throughput::Bytes(bytes as u64));

        group.bench_with_input(BenchmarkId::new("packets", n), &wire, |b, wire| {
            b.iter(|| {
                for p in wire {
                    let _ = black_box(decode_packet(p));
                }
            })
        });
        group.bench_with_input(BenchmarkId::new("reassemble", n), &wire, |b, wire| {
            b.iter(|| {
                let mut dec = Decoder::new();
                for p in wire {
                    black_box(dec.on_received(p));
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
