//! Test and benchmark driver for the concurrent containers.
//!
//! With no arguments it runs a quick correctness pass over every container;
//! `-bench` measures throughput across thread counts. Output is meant for
//! eyeballs, not for parsing.

use std::env;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::scope;
use std::time::{Duration, Instant};

use conq::adt::{ConcurrentQueue, ConcurrentStack};
use conq::sync::BoundedQueue;
use conq::{flat, locked, lockfree, Value};

const OPS_PER_THREAD: usize = 100_000;
const THREAD_COUNTS: [usize; 5] = [1, 2, 4, 8, 16];

fn main() -> ExitCode {
    let mode = env::args().nth(1);
    match mode.as_deref() {
        None => {
            unit_suite();
        }
        Some("-h") | Some("--help") => {
            print_help();
        }
        Some("-bench") => {
            println!("=== Stack benchmarks ===");
            for threads in THREAD_COUNTS {
                bench_stack::<locked::Stack>("SGL stack", threads);
                bench_stack::<lockfree::Stack>("Treiber stack", threads);
                bench_stack::<lockfree::ElimStack>("elimination stack", threads);
                bench_stack::<flat::Stack>("FC stack", threads);
            }
            println!();
            println!("=== Queue benchmarks ===");
            for threads in THREAD_COUNTS {
                bench_queue::<locked::Queue>("SGL queue", threads);
                bench_queue::<lockfree::Queue>("M&S queue", threads);
                bench_queue::<flat::Queue>("FC queue", threads);
            }
        }
        Some("-contention") => {
            contention();
        }
        Some("-bench-sgl-stack") => stack_series::<locked::Stack>("SGL stack"),
        Some("-bench-treiber") => stack_series::<lockfree::Stack>("Treiber stack"),
        Some("-bench-elimination") => stack_series::<lockfree::ElimStack>("elimination stack"),
        Some("-bench-fc-stack") => stack_series::<flat::Stack>("FC stack"),
        Some("-bench-sgl-queue") => queue_series::<locked::Queue>("SGL queue"),
        Some("-bench-msqueue") => queue_series::<lockfree::Queue>("M&S queue"),
        Some("-bench-fc-queue") => queue_series::<flat::Queue>("FC queue"),
        Some(other) => {
            eprintln!("unknown mode: {other}");
            print_help();
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

fn print_help() {
    println!("usage: bench [mode]");
    println!();
    println!("modes:");
    println!("  (no arguments)         run the unit suite");
    println!("  -bench                 run all benchmarks");
    println!("  -contention            synchronized-start contention test");
    println!("  -bench-sgl-stack       benchmark the SGL stack only");
    println!("  -bench-treiber         benchmark the Treiber stack only");
    println!("  -bench-elimination     benchmark the elimination stack only");
    println!("  -bench-fc-stack        benchmark the FC stack only");
    println!("  -bench-sgl-queue       benchmark the SGL queue only");
    println!("  -bench-msqueue         benchmark the M&S queue only");
    println!("  -bench-fc-queue        benchmark the FC queue only");
    println!("  -h, --help             show this help");
}

/// Quick single-threaded sanity pass over every container, plus a
/// producer/consumer smoke over the bounded queue.
fn unit_suite() {
    check_stack::<locked::Stack>("SGL stack");
    check_queue::<locked::Queue>("SGL queue");
    check_stack::<lockfree::Stack>("Treiber stack");
    check_queue::<lockfree::Queue>("M&S queue");
    check_stack::<lockfree::ElimStack>("elimination stack");
    check_stack::<flat::Stack>("FC stack");
    check_queue::<flat::Queue>("FC queue");
    check_bounded();
    println!("all checks passed");
}

fn check_stack<S: ConcurrentStack>(name: &str) {
    let stack = S::default();
    assert_eq!(stack.pop(), None);
    for v in 1..=3 {
        stack.push(v);
    }
    for v in (1..=3).rev() {
        assert_eq!(stack.pop(), Some(v));
    }
    assert_eq!(stack.pop(), None);
    println!("{name}: ok");
}

fn check_queue<Q: ConcurrentQueue>(name: &str) {
    let queue = Q::default();
    assert_eq!(queue.dequeue(), None);
    for v in 1..=3 {
        queue.enqueue(v);
    }
    for v in 1..=3 {
        assert_eq!(queue.dequeue(), Some(v));
    }
    assert_eq!(queue.dequeue(), None);
    println!("{name}: ok");
}

fn check_bounded() {
    const COUNT: usize = 50;

    let queue = BoundedQueue::new();
    let sum: Value = scope(|s| {
        s.spawn(|| {
            for i in 0..COUNT {
                queue.enqueue(i as Value);
            }
        });
        let consumer = s.spawn(|| (0..COUNT).map(|_| queue.dequeue()).sum());
        consumer.join().unwrap()
    });
    assert_eq!(sum, (COUNT * (COUNT - 1) / 2) as Value);
    println!("bounded queue: ok");
}

fn stack_series<S: ConcurrentStack>(name: &str) {
    for threads in THREAD_COUNTS {
        bench_stack::<S>(name, threads);
    }
}

fn queue_series<Q: ConcurrentQueue>(name: &str) {
    for threads in THREAD_COUNTS {
        bench_queue::<Q>(name, threads);
    }
}

/// Pre-fills the stack, then has every thread alternate push and pop.
fn bench_stack<S: ConcurrentStack>(name: &str, threads: usize) {
    let stack = S::default();
    for i in 0..(threads * OPS_PER_THREAD) as Value {
        stack.push(i);
    }

    let start = Instant::now();
    scope(|s| {
        for t in 0..threads {
            let stack = &stack;
            s.spawn(move || {
                for i in 0..OPS_PER_THREAD {
                    if i % 2 == 0 {
                        stack.push((t * OPS_PER_THREAD + i) as Value);
                    } else {
                        let _ = stack.pop();
                    }
                }
            });
        }
    });

    report(name, threads, threads * OPS_PER_THREAD, start.elapsed());
}

/// Splits the threads into producer and consumer halves, at least one of
/// each. Consumers simply discard empty results.
fn bench_queue<Q: ConcurrentQueue>(name: &str, threads: usize) {
    let queue = Q::default();
    let producers = (threads / 2).max(1);
    let consumers = (threads - threads / 2).max(1);

    let start = Instant::now();
    scope(|s| {
        for t in 0..producers {
            let queue = &queue;
            s.spawn(move || {
                for i in 0..OPS_PER_THREAD {
                    queue.enqueue((t * OPS_PER_THREAD + i) as Value);
                }
            });
        }
        for _ in 0..consumers {
            let queue = &queue;
            s.spawn(move || {
                for _ in 0..OPS_PER_THREAD {
                    let _ = queue.dequeue();
                }
            });
        }
    });

    report(
        name,
        threads,
        (producers + consumers) * OPS_PER_THREAD,
        start.elapsed(),
    );
}

/// All threads hammer one Treiber stack the instant the go flag flips.
fn contention() {
    const THREADS: usize = 8;
    const PAIRS: usize = 5_000;

    let stack = lockfree::Stack::new();
    let go = AtomicBool::new(false);
    let ready = AtomicUsize::new(0);

    let elapsed = scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let stack = &stack;
                let go = &go;
                let ready = &ready;
                s.spawn(move || {
                    ready.fetch_add(1, Ordering::Relaxed);
                    while !go.load(Ordering::Acquire) {
                        std::hint::spin_loop();
                    }
                    for i in 0..PAIRS {
                        stack.push(i as Value);
                        let _ = stack.pop();
                    }
                })
            })
            .collect();

        while ready.load(Ordering::Relaxed) < THREADS {
            std::hint::spin_loop();
        }

        let start = Instant::now();
        go.store(true, Ordering::Release);
        for handle in handles {
            handle.join().unwrap();
        }
        start.elapsed()
    });

    println!(
        "contention: {THREADS} threads x {PAIRS} push+pop pairs in {:.3} ms",
        elapsed.as_secs_f64() * 1e3
    );
}

fn report(name: &str, threads: usize, total_ops: usize, elapsed: Duration) {
    let throughput = total_ops as f64 / elapsed.as_secs_f64();
    println!(
        "  {name:<18} threads={threads:>2}  ops={total_ops:>8}  throughput={throughput:>12.0} ops/s"
    );
}
