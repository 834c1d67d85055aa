//! Property-based tests for concurrent enqueueing and backoff
#![allow(clippy::unwrap_used)]

mod support;

use std::time::Duration;

use futures_util::future::join_all;
use herald_dispatch::{
    DeliveryError, DispatchConfig, Dispatcher, LoopState, RetryPolicy, ShutdownMode,
    TemporaryError,
};
use proptest::prelude::*;
use support::{message, mock_transport::MockTransport};

#[derive(Debug, Clone)]
struct Schedule {
    producers: usize,
    per_producer: usize,
    batch_size: usize,
    concurrency_limit: usize,
    /// Every n-th message fails its first attempt, none when zero
    fail_every: usize,
    /// Producers yield to the runtime after this many sends
    yield_every: usize,
}

fn schedule() -> impl Strategy<Value = Schedule> {
    (1usize..6, 1usize..40, 1usize..8, 1usize..4, 0usize..5, 1usize..6).prop_map(
        |(producers, per_producer, batch_size, concurrency_limit, fail_every, yield_every)| {
            Schedule {
                producers,
                per_producer,
                batch_size,
                concurrency_limit,
                fail_every,
                yield_every,
            }
        },
    )
}

fn content(producer: usize, index: usize) -> String {
    format!("p{producer}-m{index}")
}

struct Run {
    outcomes_ok: usize,
    outcomes_total: usize,
    deliveries: Vec<usize>,
    total_sent: u64,
    total_failed: u64,
    outstanding: usize,
    loop_state: LoopState,
}

fn run(schedule: &Schedule) -> Run {
    let temporary: DeliveryError = TemporaryError::ConnectionFailed("reset".into()).into();

    let mut builder = MockTransport::builder().with_delay(Duration::from_micros(200));
    let mut all_contents = Vec::new();
    for producer in 0..schedule.producers {
        for index in 0..schedule.per_producer {
            let content = content(producer, index);
            if schedule.fail_every > 0 && all_contents.len() % schedule.fail_every == 0 {
                builder = builder.fail_first(&content, 1, temporary.clone());
            }
            all_contents.push(content);
        }
    }
    let transport = builder.build();

    let config = DispatchConfig {
        batch_size: schedule.batch_size,
        concurrency_limit: schedule.concurrency_limit,
        retry: RetryPolicy {
            base_delay_ms: 1,
            ..RetryPolicy::default()
        },
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        let dispatcher = Dispatcher::new(config, transport.clone()).unwrap();

        let producers: Vec<_> = (0..schedule.producers)
            .map(|producer| {
                let dispatcher = dispatcher.clone();
                let per_producer = schedule.per_producer;
                let yield_every = schedule.yield_every;
                tokio::spawn(async move {
                    let mut completions = Vec::with_capacity(per_producer);
                    for index in 0..per_producer {
                        completions.push(dispatcher.send(message(content(producer, index))));
                        if index % yield_every == 0 {
                            tokio::task::yield_now().await;
                        }
                    }
                    join_all(completions).await
                })
            })
            .collect();

        let mut outcomes = Vec::new();
        for producer in join_all(producers).await {
            outcomes.extend(producer.unwrap());
        }

        dispatcher.shutdown(ShutdownMode::Drain).await;
        let snapshot = dispatcher.snapshot();

        Run {
            outcomes_ok: outcomes.iter().filter(|outcome| outcome.is_ok()).count(),
            outcomes_total: outcomes.len(),
            deliveries: all_contents
                .iter()
                .map(|content| transport.deliveries_for(content))
                .collect(),
            total_sent: snapshot.totals.total_sent,
            total_failed: snapshot.totals.total_failed,
            outstanding: snapshot.outstanding() + snapshot.in_flight_batches,
            loop_state: dispatcher.loop_state(),
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn concurrent_enqueue_loses_and_duplicates_nothing(schedule in schedule()) {
        let expected = schedule.producers * schedule.per_producer;
        let run = run(&schedule);

        prop_assert_eq!(run.outcomes_total, expected);
        prop_assert_eq!(run.outcomes_ok, expected);
        prop_assert!(run.deliveries.iter().all(|&count| count == 1), "deliveries: {:?}", run.deliveries);
        prop_assert_eq!(run.total_sent, expected as u64);
        prop_assert_eq!(run.total_failed, 0);
        prop_assert_eq!(run.outstanding, 0);
        prop_assert_eq!(run.loop_state, LoopState::Completed);
    }

    #[test]
    fn backoff_doubles_per_attempt(base_delay_ms in 0u64..10_000, attempts in 1u32..20) {
        let policy = RetryPolicy {
            base_delay_ms,
            ..RetryPolicy::default()
        };

        let delay = policy.delay_for(attempts);
        prop_assert_eq!(delay, Duration::from_millis(base_delay_ms << (attempts - 1)));
        prop_assert!(policy.delay_for(attempts + 1) >= delay);
    }

    #[test]
    fn capped_backoff_never_exceeds_cap(max_delay_ms in 0u64..60_000, attempts in 1u32..200) {
        let policy = RetryPolicy {
            max_delay_ms: Some(max_delay_ms),
            ..RetryPolicy::default()
        };

        prop_assert!(policy.delay_for(attempts) <= Duration::from_millis(max_delay_ms));
    }
}
