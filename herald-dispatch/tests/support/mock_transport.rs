//! Mock transport for testing dispatch scenarios
//!
//! This module provides a configurable transport that can:
//! - Fail or panic a scripted number of times per message before succeeding
//! - Fail every attempt with a fixed error
//! - Delay, or hold until released, every delivery
//! - Track attempts, successes and peak concurrency for verification
//!
//! Messages are told apart by their content.
#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use herald_common::Message;
use herald_dispatch::{DeliveryError, Receipt, Transport};
use parking_lot::Mutex;
use tokio::{sync::Semaphore, time::Instant};

/// What a single delivery attempt does
#[derive(Debug, Clone)]
pub enum Step {
    Succeed,
    Fail(DeliveryError),
    Panic,
}

/// Delivery attempt observed by the transport
#[derive(Debug, Clone)]
pub struct Call {
    pub content: String,
    pub at: Instant,
}

#[derive(Debug)]
pub struct MockTransport {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    fallback: Step,
    delay: Duration,
    gate: Option<Arc<Semaphore>>,
    calls: Mutex<Vec<Call>>,
    delivered: Mutex<HashMap<String, usize>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

#[derive(Debug, Default)]
pub struct MockTransportBuilder {
    scripts: HashMap<String, VecDeque<Step>>,
    fallback: Option<Step>,
    delay: Duration,
    gate: Option<Arc<Semaphore>>,
}

impl MockTransportBuilder {
    /// Fail the first `times` attempts for `content` with `error`.
    pub fn fail_first(mut self, content: &str, times: usize, error: DeliveryError) -> Self {
        let script = self.scripts.entry(content.to_string()).or_default();
        script.extend(std::iter::repeat_n(Step::Fail(error), times));
        self
    }

    /// Panic on the first `times` attempts for `content`.
    pub fn panic_first(mut self, content: &str, times: usize) -> Self {
        let script = self.scripts.entry(content.to_string()).or_default();
        script.extend(std::iter::repeat_n(Step::Panic, times));
        self
    }

    /// What unscripted attempts do, success unless set.
    pub fn otherwise(mut self, step: Step) -> Self {
        self.fallback = Some(step);
        self
    }

    /// Every delivery sleeps this long before answering.
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every delivery waits for a permit from `gate`, which it consumes.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn build(self) -> Arc<MockTransport> {
        Arc::new(MockTransport {
            scripts: Mutex::new(self.scripts),
            fallback: self.fallback.unwrap_or(Step::Succeed),
            delay: self.delay,
            gate: self.gate,
            calls: Mutex::new(Vec::new()),
            delivered: Mutex::new(HashMap::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        })
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockTransport {
    pub fn builder() -> MockTransportBuilder {
        MockTransportBuilder::default()
    }

    /// A transport that succeeds on every attempt.
    pub fn succeeding() -> Arc<Self> {
        Self::builder().build()
    }

    /// A transport that fails every attempt with `error`.
    pub fn failing(error: DeliveryError) -> Arc<Self> {
        Self::builder().otherwise(Step::Fail(error)).build()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn attempts_for(&self, content: &str) -> usize {
        self.calls.lock().iter().filter(|call| call.content == content).count()
    }

    pub fn deliveries_for(&self, content: &str) -> usize {
        self.delivered.lock().get(content).copied().unwrap_or(0)
    }

    pub fn total_deliveries(&self) -> usize {
        self.delivered.lock().values().sum()
    }

    /// Most deliveries observed running at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn next_step(&self, content: &str) -> Step {
        self.scripts
            .lock()
            .get_mut(content)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn deliver(&self, message: &Message) -> Result<Receipt, DeliveryError> {
        self.calls.lock().push(Call {
            content: message.content.clone(),
            at: Instant::now(),
        });

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        let _active = ActiveGuard(&self.active);

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.next_step(&message.content) {
            Step::Succeed => {
                let mut delivered = self.delivered.lock();
                let count = delivered.entry(message.content.clone()).or_insert(0);
                *count += 1;
                Ok(Receipt::new(format!("wamid.{}", message.content)))
            }
            Step::Fail(error) => Err(error),
            Step::Panic => panic!("transport exploded delivering {}", message.content),
        }
    }
}
