// crates/resilience/examples/resilience_demo.rs
//! Demonstration of resilience patterns

use rampart_resilience::{
    with_retry, AvailabilityTracker, CacheKey, ParallelExecutor, ParallelTask, RateLimiter,
    RetryPolicy, TaskError, TtlCache,
};
use std::time::Duration;

fn main() {
    println!("Resilience Patterns Demo");
    println!("========================\n");

    demo_cache();
    println!();
    demo_retry();
    println!();
    demo_availability();
    println!();
    demo_rate_limiter();
    println!();
    demo_parallel();
}

fn demo_cache() {
    println!("1. TTL Cache");
    println!("------------");

    let cache: TtlCache<String> = TtlCache::new(Duration::from_millis(100));
    let key = CacheKey::new("web_search").param("query", "green tea").param("count", 10);

    cache.set_default(key.build(), "3 results".to_string());
    println!("  {} -> {:?}", key, cache.get(&key.build()));

    std::thread::sleep(Duration::from_millis(120));
    println!("  after ttl -> {:?}", cache.get(&key.build()));
    println!("  stats: {:?}", cache.stats());
}

fn demo_retry() {
    println!("2. Retry Pattern");
    println!("----------------");

    let policy = RetryPolicy::new(3)
        .with_base_delay(Duration::from_millis(50))
        .with_backoff_factor(2.0);

    let mut attempt = 0;
    let result = with_retry(&policy, || {
        attempt += 1;
        println!("  Attempt {}", attempt);

        if attempt < 3 {
            Err("Simulated failure")
        } else {
            Ok(42)
        }
    });

    match result {
        Ok(value) => println!("✓ Success after retries: {}", value),
        Err(e) => println!("✗ Failed: {}", e),
    }
}

fn demo_availability() {
    println!("3. Service Availability");
    println!("-----------------------");

    let tracker = AvailabilityTracker::new(Duration::from_millis(100));
    println!("  search available: {}", tracker.is_available("search"));

    tracker.report_failure("search");
    println!("  after failure: {}", tracker.is_available("search"));
    if let Err(e) = tracker.check("search") {
        println!("  {}", e);
    }

    std::thread::sleep(Duration::from_millis(120));
    println!("  after cooldown: {}", tracker.is_available("search"));
}

fn demo_rate_limiter() {
    println!("4. Rate Limiter");
    println!("---------------");

    let limiter = RateLimiter::new(3, Duration::from_secs(1)).named("search");

    for i in 1..=5 {
        match limiter.try_acquire() {
            Ok(()) => println!("  Request {} ✓", i),
            Err(e) => println!("  Request {} ✗ {}", i, e),
        }
    }
}

fn demo_parallel() {
    println!("5. Bounded Parallel Queries");
    println!("---------------------------");

    let executor = match ParallelExecutor::new(3, Duration::from_millis(200)) {
        Ok(executor) => executor,
        Err(e) => {
            println!("✗ {}", e);
            return;
        }
    };

    let tasks = [("competitor", 50), ("slow", 2_000), ("sourcing", 80)]
        .into_iter()
        .map(|(id, millis)| {
            ParallelTask::new(id, move || {
                std::thread::sleep(Duration::from_millis(millis));
                Ok::<_, TaskError>(format!("{} results", id))
            })
        })
        .collect();

    match executor.run(tasks) {
        Ok(results) => {
            for (id, value) in results.completed() {
                println!("  {} ✓ {}", id, value);
            }
            for id in results.abandoned() {
                println!("  {} ✗ abandoned", id);
            }
        }
        Err(e) => println!("✗ {}", e),
    }
}
