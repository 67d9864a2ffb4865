use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::services::order_status::OrderStatusService;

/// Outcome of the most recent successful timeout sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub finished_at: DateTime<Utc>,
    pub timed_out_orders: usize,
}

/// Shared handle to the last [`SweepReport`], read by the health endpoint.
#[derive(Debug, Clone, Default)]
pub struct LastSweep(Arc<RwLock<Option<SweepReport>>>);

impl LastSweep {
    pub async fn get(&self) -> Option<SweepReport> {
        *self.0.read().await
    }

    async fn record(&self, timed_out_orders: usize) {
        *self.0.write().await = Some(SweepReport {
            finished_at: Utc::now(),
            timed_out_orders,
        });
    }
}

/// Runs [`OrderStatusService::handle_timeout_orders`] on a cron schedule.
pub struct TimeoutService {
    orders: Arc<OrderStatusService>,
    scheduler: JobScheduler,
    schedule: String,
    last_sweep: LastSweep,
}

impl TimeoutService {
    pub async fn new(
        orders: Arc<OrderStatusService>,
        schedule: &str,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            orders,
            scheduler,
            schedule: schedule.to_string(),
            last_sweep: LastSweep::default(),
        })
    }

    pub async fn start(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let orders = self.orders.clone();
        let last_sweep = self.last_sweep.clone();

        let timeout_job = Job::new_async(self.schedule.as_str(), move |_uuid, _l| {
            let orders = orders.clone();
            let last_sweep = last_sweep.clone();
            Box::pin(async move {
                run_timeout_sweep(&orders, &last_sweep).await;
            })
        })?;

        self.scheduler.add(timeout_job).await?;
        self.scheduler.start().await?;

        tracing::info!("Timeout service started - schedule '{}'", self.schedule);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.scheduler.shutdown().await?;
        Ok(())
    }

    // Manual trigger, bypasses the schedule
    pub async fn sweep_now(&self) -> usize {
        run_timeout_sweep(&self.orders, &self.last_sweep).await
    }

    pub fn last_sweep(&self) -> LastSweep {
        self.last_sweep.clone()
    }
}

async fn run_timeout_sweep(orders: &OrderStatusService, last_sweep: &LastSweep) -> usize {
    match orders.handle_timeout_orders().await {
        Ok(count) => {
            if count == 0 {
                tracing::debug!("Timeout sweep found no timed-out orders");
            } else {
                tracing::info!("Timeout sweep evaluated {} timed-out orders", count);
            }
            last_sweep.record(count).await;
            count
        }
        Err(e) => {
            tracing::error!("Timeout sweep failed: {}", e);
            0
        }
    }
}
