use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use recycling_stack_aba::BoundedStack;
#[cfg(not(feature = "mutex"))]
use recycling_stack_aba::RaceGate;

const SYNC_MODE: &str = if cfg!(feature = "mutex") {
    "mutex"
} else if cfg!(feature = "software-cas") {
    "software CAS"
} else {
    "hardware CAS"
};

/// Command-line arguments for the recycling-stack demonstration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of worker threads for stress and measurement runs
    #[arg(short, long, default_value_t = 4)]
    threads: usize,

    /// Total number of operations, split across the worker threads
    #[arg(short, long, default_value_t = 100_000)]
    operations: usize,

    /// Stack capacity for stress and measurement runs
    #[arg(short, long, default_value_t = 4096)]
    capacity: usize,

    /// Run a randomized mixed push/pop stress test
    #[arg(long)]
    stress: bool,

    /// Run the three-thread interleaving that reproduces the ABA problem
    #[arg(long)]
    aba_demo: bool,

    /// Time a push-only or pop-only workload across the worker threads
    #[arg(long, value_enum)]
    measure: Option<Workload>,

    /// Enable verbose output with per-thread details
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Workload {
    Push,
    Pop,
}

fn main() {
    let args = Args::parse();

    println!("{}", "Recycling Stack Demonstration".green().bold());
    println!("Synchronization mode: {}\n", SYNC_MODE.cyan());

    if args.aba_demo {
        aba_demonstration();
    } else if args.stress {
        stress_test(&args);
    } else if let Some(workload) = args.measure {
        measure(workload, &args);
    } else {
        basic_demo();
    }

    println!("\n{}", "Demonstration complete!".green().bold());
}

/// A short walkthrough of the stack's surface: fill it, overflow it, drain
/// it, underflow it.
fn basic_demo() {
    println!("{}", "Running basic demonstration...".yellow().bold());

    let stack = BoundedStack::with_capacity(3);

    println!("Pushing values 1, 2, 3 onto a stack of capacity 3");
    for v in 1..=3 {
        stack.push(v).expect("push within capacity");
    }

    println!("One more push must report a full stack: {:?}", stack.push(4));

    println!("\nPopping everything back:");
    while let Some(value) = stack.pop() {
        println!("Popped: {value}");
    }
    println!("Pop on the empty stack: {:?}", stack.pop());

    println!(
        "\nAll {} nodes are back on the free list: {}",
        stack.capacity(),
        stack.free_len() == stack.capacity()
    );
    stack.check();
}

/// Steers three threads through the schedule in which a stalled
/// compare-and-swap succeeds against a recycled node.
#[cfg(not(feature = "mutex"))]
fn aba_demonstration() {
    println!(
        "{}",
        "Reproducing the ABA problem with node recycling..."
            .yellow()
            .bold()
    );

    let stack = Arc::new(BoundedStack::with_capacity(3));
    for v in [10, 20, 30] {
        stack.push(v).expect("push within capacity");
    }
    println!("Initial live list: [30] -> [20] -> [10], free list empty");

    let (gate_a, control_a) = RaceGate::pair();
    let (gate_b, control_b) = RaceGate::pair();

    let a = {
        let stack = Arc::clone(&stack);
        thread::spawn(move || stack.pop_expose_acquire(&gate_a))
    };
    control_a.wait_reached();
    println!(
        "{}",
        "Thread A: snapshotted head [30] and its successor [20], stalled before the CAS".blue()
    );

    let b = {
        let stack = Arc::clone(&stack);
        thread::spawn(move || {
            let popped = stack.pop_expose_publish(&gate_b);
            stack.push(40).expect("free list cannot be empty here");
            popped
        })
    };
    control_b.wait_reached();
    println!(
        "{}",
        "Thread B: detached [30], holding it in flight".magenta()
    );

    let c = {
        let stack = Arc::clone(&stack);
        thread::spawn(move || stack.pop())
    };
    let popped_c = c.join().expect("thread C panicked");
    println!(
        "{}",
        format!("Thread C: popped {popped_c:?}, recycling that node to the free list").cyan()
    );

    control_b.release();
    let popped_b = b.join().expect("thread B panicked");
    println!(
        "{}",
        format!(
            "Thread B: published its node and pushed 40, recycling the node A snapshotted \
             back to the live head (popped {popped_b:?})"
        )
        .magenta()
    );

    control_a.release();
    let popped_a = a.join().expect("thread A panicked");
    println!(
        "{}",
        format!(
            "Thread A: resumed; the CAS matched the recycled head and installed the stale \
             successor (popped {popped_a:?})"
        )
        .blue()
    );

    println!();
    if stack.aba_detected() {
        println!(
            "{}",
            "ABA reproduced: the live head is also reachable from the free list."
                .red()
                .bold()
        );
        println!("The pointer comparison succeeded, but pointer equality is not identity:");
        println!("the node had been popped, recycled, and pushed back in the meantime.");
    } else {
        println!(
            "{}",
            "The engineered schedule did not corrupt the lists this run.".yellow()
        );
    }
}

/// With a single lock around each whole operation there is no window to
/// exploit; the demonstration degenerates to stating that.
#[cfg(feature = "mutex")]
fn aba_demonstration() {
    println!(
        "{}",
        "Lock-based synchronization moves each node in one critical section;"
            .yellow()
            .bold()
    );
    println!("no thread can observe a half-finished pop, so the ABA problem cannot arise.");
}

/// Randomized mixed workload followed by a conservation audit.
fn stress_test(args: &Args) {
    use rand::Rng;

    println!(
        "{}",
        format!(
            "Running stress test: {} threads, {} operations, capacity {}...",
            args.threads, args.operations, args.capacity
        )
        .yellow()
        .bold()
    );

    let stack = Arc::new(BoundedStack::with_capacity(args.capacity));
    let per_thread = args.operations / args.threads.max(1);
    let verbose = args.verbose;

    let start = Instant::now();
    let workers: Vec<_> = (0..args.threads)
        .map(|id| {
            let stack = Arc::clone(&stack);
            thread::spawn(move || {
                let mut rng = rand::rng();
                let mut pushes = 0usize;
                let mut pops = 0usize;
                for _ in 0..per_thread {
                    if rng.random::<f32>() < 0.6 {
                        if stack.push(id).is_ok() {
                            pushes += 1;
                        }
                    } else if stack.pop().is_some() {
                        pops += 1;
                    }
                }
                if verbose {
                    println!("Thread {id} finished: {pushes} pushes, {pops} pops");
                }
                (pushes, pops)
            })
        })
        .collect();

    let mut total_pushes = 0;
    let mut total_pops = 0;
    for worker in workers {
        let (pushes, pops) = worker.join().expect("stress worker panicked");
        total_pushes += pushes;
        total_pops += pops;
    }
    let elapsed = start.elapsed();

    println!("Stress test completed in {:.2}s", elapsed.as_secs_f32());
    println!("Successful pushes: {total_pushes}, successful pops: {total_pops}");
    println!(
        "Live list length {} == pushes - pops {}",
        stack.live_len(),
        total_pushes - total_pops
    );
    println!(
        "Conservation: live {} + free {} == capacity {}",
        stack.live_len(),
        stack.free_len(),
        stack.capacity()
    );
    stack.check();

    assert_eq!(stack.live_len(), total_pushes - total_pops);
    assert_eq!(stack.live_len() + stack.free_len(), stack.capacity());
    println!("{}", "Stress test validation passed!".green().bold());
}

/// Times a push-only or pop-only run, the workload used to compare the three
/// synchronization modes against each other.
fn measure(workload: Workload, args: &Args) {
    let per_thread = args.operations / args.threads.max(1);
    let capacity = args.capacity.max(args.threads * per_thread);
    let stack = Arc::new(BoundedStack::with_capacity(capacity));

    if matches!(workload, Workload::Pop) {
        for v in 0..args.threads * per_thread {
            stack.push(v).expect("pre-fill within capacity");
        }
    }

    println!(
        "{}",
        format!(
            "Measuring {:?}: {} threads x {} operations, capacity {}...",
            workload, args.threads, per_thread, capacity
        )
        .yellow()
        .bold()
    );

    let wall = Instant::now();
    let workers: Vec<_> = (0..args.threads)
        .map(|id| {
            let stack = Arc::clone(&stack);
            thread::spawn(move || {
                let start = Instant::now();
                match workload {
                    Workload::Push => {
                        for _ in 0..per_thread {
                            let _ = stack.push(id);
                        }
                    }
                    Workload::Pop => {
                        for _ in 0..per_thread {
                            let _ = stack.pop();
                        }
                    }
                }
                start.elapsed()
            })
        })
        .collect();

    let per_thread_times: Vec<Duration> = workers
        .into_iter()
        .map(|worker| worker.join().expect("measurement worker panicked"))
        .collect();
    let elapsed = wall.elapsed();

    if args.verbose {
        for (id, time) in per_thread_times.iter().enumerate() {
            println!("Thread {id}: {:.3}ms", time.as_secs_f64() * 1e3);
        }
    }
    let slowest = per_thread_times.iter().max().copied().unwrap_or_default();
    let ops = args.threads * per_thread;
    println!(
        "Wall clock {:.3}ms, slowest thread {:.3}ms, {:.0} ops/ms",
        elapsed.as_secs_f64() * 1e3,
        slowest.as_secs_f64() * 1e3,
        ops as f64 / (elapsed.as_secs_f64() * 1e3)
    );
    stack.check();
}
