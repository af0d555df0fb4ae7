use core_affinity::CoreId;
use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::{Arc, Barrier};

// x10000 everywhere to amortize per-iteration startup cost.

fn turnq_mpsc_x10000(c: &mut Criterion) {
    let tx_threads = 4;

    assert_eq!(10000 % tx_threads, 0);

    let q = Arc::new(turnq::Queue::<usize>::new(500));
    let barrier = Arc::new(Barrier::new(tx_threads + 1));

    for thread_id in 0..tx_threads {
        let q = q.clone();
        let barrier = barrier.clone();

        std::thread::spawn(move || {
            core_affinity::set_for_current(CoreId { id: thread_id + 1 });

            loop {
                barrier.wait();

                for _ in 0..10000 / tx_threads {
                    q.push(42);
                }
            }
        });
    }

    core_affinity::set_for_current(CoreId { id: 0 });

    c.bench_function("turnq mpsc x10000", |b| {
        b.iter(|| {
            barrier.wait();

            for _ in 0..10000 {
                assert_eq!(q.pop(), 42);
            }
        })
    });
}

fn flume_mpsc_x10000(c: &mut Criterion) {
    let tx_threads = 4;

    assert_eq!(10000 % tx_threads, 0);

    let (tx, rx) = flume::bounded::<usize>(500);
    let barrier = Arc::new(Barrier::new(tx_threads + 1));

    for thread_id in 0..tx_threads {
        let tx = tx.clone();
        let barrier = barrier.clone();

        std::thread::spawn(move || {
            core_affinity::set_for_current(CoreId { id: thread_id + 1 });

            loop {
                barrier.wait();

                for _ in 0..10000 / tx_threads {
                    tx.send(42).unwrap();
                }
            }
        });
    }

    core_affinity::set_for_current(CoreId { id: 0 });

    c.bench_function("flume mpsc x10000", |b| {
        b.iter(|| {
            barrier.wait();

            for _ in 0..10000 {
                assert_eq!(rx.recv().unwrap(), 42);
            }
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = turnq_mpsc_x10000, flume_mpsc_x10000
}
criterion_main!(benches);
