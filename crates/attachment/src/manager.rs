use crate::error::AttachError;
use core_types::{Battery, DEVICE_BATTERY_CAPACITY};
use database::DbRepository;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How many times a lock-conflicted transaction is re-run before the
/// transient error is surfaced to the caller.
const LOCK_RETRY_ATTEMPTS: u32 = 3;
const LOCK_RETRY_BACKOFF: Duration = Duration::from_millis(25);

/// Enforces the attach/detach rules on top of the record store.
///
/// Each call opens its own write transaction whose first statement takes
/// the store's write lock on the device row. Every concurrent attacher
/// therefore observes the battery count and the battery's owner only after
/// the previous check-and-set has committed, which is what keeps the
/// capacity and exclusivity invariants intact under load.
#[derive(Debug, Clone)]
pub struct AttachmentManager {
    repo: DbRepository,
}

impl AttachmentManager {
    pub fn new(repo: DbRepository) -> Self {
        Self { repo }
    }

    /// Installs a battery into a device.
    ///
    /// Fails with `DeviceNotFound`/`BatteryNotFound` for missing records,
    /// `AlreadyAttached` when the battery is installed anywhere, and
    /// `DeviceFull` when the device already holds the maximum number of
    /// batteries. Lock conflicts are retried a bounded number of times with
    /// the full validation re-run, so a retried call still reports the
    /// correct business error.
    pub async fn attach(&self, device_id: i64, battery_id: i64) -> Result<Battery, AttachError> {
        self.with_lock_retry(|| self.try_attach(device_id, battery_id))
            .await
    }

    /// Removes a battery from the device it is installed in.
    ///
    /// Fails with `NotAttached` when the battery's owner is a different
    /// device (or none); the battery is left unchanged in that case.
    pub async fn detach(&self, device_id: i64, battery_id: i64) -> Result<Battery, AttachError> {
        self.with_lock_retry(|| self.try_detach(device_id, battery_id))
            .await
    }

    async fn try_attach(&self, device_id: i64, battery_id: i64) -> Result<Battery, AttachError> {
        let mut tx = self.repo.begin().await?;

        let device = self
            .repo
            .lock_device(&mut tx, device_id)
            .await?
            .ok_or(AttachError::DeviceNotFound(device_id))?;
        let battery = self
            .repo
            .battery_in_tx(&mut tx, battery_id)
            .await?
            .ok_or(AttachError::BatteryNotFound(battery_id))?;

        if let Some(owner) = battery.device_id {
            debug!(battery_id, owner, "attach rejected: battery already installed");
            return Err(AttachError::AlreadyAttached {
                battery_id,
                device_id: owner,
            });
        }

        let count = self.repo.attached_count_in_tx(&mut tx, device_id).await?;
        if count >= DEVICE_BATTERY_CAPACITY {
            debug!(device_id, count, "attach rejected: device full");
            return Err(AttachError::DeviceFull {
                device_id,
                capacity: DEVICE_BATTERY_CAPACITY,
            });
        }

        let updated = self
            .repo
            .set_battery_device_in_tx(&mut tx, battery_id, Some(device.id))
            .await?;
        tx.commit().await.map_err(database::DbError::from)?;

        info!(device_id, battery_id, "battery attached");
        Ok(updated)
    }

    async fn try_detach(&self, device_id: i64, battery_id: i64) -> Result<Battery, AttachError> {
        let mut tx = self.repo.begin().await?;

        let device = self
            .repo
            .lock_device(&mut tx, device_id)
            .await?
            .ok_or(AttachError::DeviceNotFound(device_id))?;
        let battery = self
            .repo
            .battery_in_tx(&mut tx, battery_id)
            .await?
            .ok_or(AttachError::BatteryNotFound(battery_id))?;

        if battery.device_id != Some(device.id) {
            debug!(device_id, battery_id, "detach rejected: not attached to this device");
            return Err(AttachError::NotAttached {
                battery_id,
                device_id,
            });
        }

        let updated = self
            .repo
            .set_battery_device_in_tx(&mut tx, battery_id, None)
            .await?;
        tx.commit().await.map_err(database::DbError::from)?;

        info!(device_id, battery_id, "battery detached");
        Ok(updated)
    }

    async fn with_lock_retry<F, Fut>(&self, mut op: F) -> Result<Battery, AttachError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Battery, AttachError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Err(AttachError::Db(db_err))
                    if db_err.is_transient() && attempt + 1 < LOCK_RETRY_ATTEMPTS =>
                {
                    attempt += 1;
                    warn!(attempt, error = %db_err, "lock conflict, retrying");
                    tokio::time::sleep(LOCK_RETRY_BACKOFF * attempt).await;
                }
                result => return result,
            }
        }
    }
}
