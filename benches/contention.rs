use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use recycling_stack_aba::BoundedStack;
use std::sync::{Arc, Mutex};
use std::thread;

// Unbounded mutex-guarded stack, the reference point the recycling stack is
// measured against.
struct MutexVecStack {
    inner: Mutex<Vec<usize>>,
}

impl MutexVecStack {
    fn new() -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, value: usize) {
        self.inner.lock().unwrap().push(value);
    }

    fn pop(&self) -> Option<usize> {
        self.inner.lock().unwrap().pop()
    }
}

fn bench_single_threaded(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_threaded");

    group.bench_function("recycling_stack_push_pop", |b| {
        let stack = BoundedStack::with_capacity(1024);
        b.iter(|| {
            stack.push(1).unwrap();
            stack.pop()
        });
    });

    group.bench_function("mutex_vec_push_pop", |b| {
        let stack = MutexVecStack::new();
        b.iter(|| {
            stack.push(1);
            stack.pop()
        });
    });

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    const OPS_PER_THREAD: usize = 100;
    let mut group = c.benchmark_group("concurrent");

    for threads in [2, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::new("recycling_stack_mixed", threads),
            threads,
            |b, &threads| {
                let stack = Arc::new(BoundedStack::with_capacity(threads * OPS_PER_THREAD));
                b.iter(|| {
                    let handles: Vec<_> = (0..threads)
                        .map(|id| {
                            let stack = Arc::clone(&stack);
                            thread::spawn(move || {
                                for i in 0..OPS_PER_THREAD {
                                    if i % 2 == 0 {
                                        let _ = stack.push(id);
                                    } else {
                                        let _ = stack.pop();
                                    }
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("mutex_vec_mixed", threads),
            threads,
            |b, &threads| {
                let stack = Arc::new(MutexVecStack::new());
                b.iter(|| {
                    let handles: Vec<_> = (0..threads)
                        .map(|id| {
                            let stack = Arc::clone(&stack);
                            thread::spawn(move || {
                                for i in 0..OPS_PER_THREAD {
                                    if i % 2 == 0 {
                                        stack.push(id);
                                    } else {
                                        let _ = stack.pop();
                                    }
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_single_threaded, bench_concurrent);
criterion_main!(benches);
