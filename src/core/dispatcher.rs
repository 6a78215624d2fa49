//! Fixed-capacity task launcher with a completion barrier.
//!
//! `submit` waits for one of `capacity` permits and spawns the task holding
//! it, so at most `capacity` tasks ever execute at once. `wait_all` joins
//! every task launched since creation or the previous `wait_all`.

use crate::utils::error::{BroadcastError, Result};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Default)]
struct DispatchCounters {
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    completed: AtomicUsize,
}

impl DispatchCounters {
    fn start(&self) {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
    }

    fn finish(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

// 任務結束（包含 panic）時歸還計數
struct InFlightGuard(Arc<DispatchCounters>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.finish();
    }
}

pub struct BoundedDispatcher {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    tasks: JoinSet<()>,
    counters: Arc<DispatchCounters>,
    submitted: usize,
}

impl BoundedDispatcher {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(BroadcastError::InvalidConfigValueError {
                field: "dispatcher_capacity".to_string(),
                value: capacity.to_string(),
                reason: "Dispatcher needs at least one concurrency slot".to_string(),
            });
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            tasks: JoinSet::new(),
            counters: Arc::new(DispatchCounters::default()),
            submitted: 0,
        })
    }

    /// 取得一個名額後啟動任務；名額用盡時會等待，但不等待任務完成
    pub async fn submit<F>(&mut self, task: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| BroadcastError::Dispatcher {
                message: format!("dispatcher closed: {}", e),
            })?;

        // 回收已完成任務，避免 JoinSet 無限累積
        while let Some(result) = self.tasks.try_join_next() {
            Self::log_join_result(result);
        }

        let counters = self.counters.clone();
        counters.start();
        self.tasks.spawn(async move {
            let _permit = permit;
            let _guard = InFlightGuard(counters);
            task.await;
        });
        self.submitted += 1;
        Ok(())
    }

    /// 等待所有已啟動的任務結束
    pub async fn wait_all(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            Self::log_join_result(result);
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn submitted(&self) -> usize {
        self.submitted
    }

    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.counters.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.counters.completed.load(Ordering::SeqCst)
    }

    fn log_join_result(result: std::result::Result<(), tokio::task::JoinError>) {
        if let Err(e) = result {
            tracing::error!("❌ Dispatched task did not complete: {}", e);
        }
    }
}
