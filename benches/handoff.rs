// Handoff throughput of the rendezvous channel, with and without select.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::thread;
use unbuffered_channels::{Channel, Select};

const MESSAGES: u64 = 1_000;

fn send_recv(messages: u64) -> u64 {
    let channel = Channel::new();
    thread::scope(|s| {
        s.spawn(|| {
            for i in 0..messages {
                channel.send(i).unwrap();
            }
            channel.close().unwrap();
        });
        channel.iter().sum()
    })
}

fn select_send(messages: u64) -> u64 {
    let channel = Channel::new();
    let idle: Channel<u64> = Channel::new();
    thread::scope(|s| {
        let consumer = s.spawn(|| channel.iter().sum::<u64>());
        for i in 0..messages {
            Select::new()
                .send(&channel, i, |res| res.unwrap())
                .recv(&idle, |_| ())
                .wait();
        }
        channel.close().unwrap();
        consumer.join().unwrap()
    })
}

fn handoff_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("handoff");
    group.throughput(Throughput::Elements(MESSAGES));

    group.bench_function("send_recv", |b| b.iter(|| send_recv(black_box(MESSAGES))));
    group.bench_function("select_send", |b| b.iter(|| select_send(black_box(MESSAGES))));

    group.finish();
}

criterion_group!(benches, handoff_benchmark);
criterion_main!(benches);
