use crate::DbError;
use core_types::{
    Battery, BatteryUpdate, Device, DeviceUpdate, NewBattery, NewDevice, DEVICE_BATTERY_CAPACITY,
};
use sqlx::sqlite::SqlitePool;
use sqlx::Sqlite;

/// A write transaction against the record store. Dropping it without a
/// commit rolls every statement back.
pub type StoreTx = sqlx::Transaction<'static, Sqlite>;

/// The `DbRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries and data access logic
/// for devices and batteries.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: SqlitePool,
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==========================================================================
    // Devices
    // ==========================================================================

    pub async fn list_devices(&self) -> Result<Vec<Device>, DbError> {
        let devices = sqlx::query_as::<_, Device>(
            "SELECT id, name, firmware_version, is_on FROM devices ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(devices)
    }

    pub async fn get_device(&self, id: i64) -> Result<Option<Device>, DbError> {
        let device = sqlx::query_as::<_, Device>(
            "SELECT id, name, firmware_version, is_on FROM devices WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(device)
    }

    /// Inserts a new device. A duplicate `name` surfaces as
    /// `DbError::ConstraintViolation` via the UNIQUE index.
    pub async fn create_device(&self, new: &NewDevice) -> Result<Device, DbError> {
        let device = sqlx::query_as::<_, Device>(
            r#"
            INSERT INTO devices (name, firmware_version, is_on)
            VALUES (?1, ?2, ?3)
            RETURNING id, name, firmware_version, is_on
            "#,
        )
        .bind(&new.name)
        .bind(&new.firmware_version)
        .bind(new.is_on)
        .fetch_one(&self.pool)
        .await?;
        Ok(device)
    }

    /// Applies a partial update; `None` fields keep their current value.
    /// Returns `Ok(None)` when the device does not exist.
    pub async fn update_device(
        &self,
        id: i64,
        update: &DeviceUpdate,
    ) -> Result<Option<Device>, DbError> {
        let device = sqlx::query_as::<_, Device>(
            r#"
            UPDATE devices
            SET firmware_version = COALESCE(?1, firmware_version),
                is_on            = COALESCE(?2, is_on)
            WHERE id = ?3
            RETURNING id, name, firmware_version, is_on
            "#,
        )
        .bind(&update.firmware_version)
        .bind(update.is_on)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(device)
    }

    /// Deletes a device. The schema's `ON DELETE SET NULL` detaches any
    /// installed batteries atomically with the row delete, so no battery is
    /// ever left pointing at a missing device. Returns false when the id
    /// did not exist.
    pub async fn delete_device(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM devices WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The derived battery list for one device. There is no cached edge on
    /// the device row; this query is the only way to obtain the set.
    pub async fn batteries_for_device(&self, device_id: i64) -> Result<Vec<Battery>, DbError> {
        let batteries = sqlx::query_as::<_, Battery>(
            r#"
            SELECT id, name, nominal_voltage, remaining_capacity, service_life, device_id
            FROM batteries WHERE device_id = ?1 ORDER BY id ASC
            "#,
        )
        .bind(device_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(batteries)
    }

    pub async fn attached_count(&self, device_id: i64) -> Result<i64, DbError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM batteries WHERE device_id = ?1")
                .bind(device_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    // ==========================================================================
    // Batteries
    // ==========================================================================

    pub async fn list_batteries(&self) -> Result<Vec<Battery>, DbError> {
        let batteries = sqlx::query_as::<_, Battery>(
            r#"
            SELECT id, name, nominal_voltage, remaining_capacity, service_life, device_id
            FROM batteries ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(batteries)
    }

    pub async fn get_battery(&self, id: i64) -> Result<Option<Battery>, DbError> {
        let battery = sqlx::query_as::<_, Battery>(
            r#"
            SELECT id, name, nominal_voltage, remaining_capacity, service_life, device_id
            FROM batteries WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(battery)
    }

    /// Inserts a new battery. When `device_id` is set the insert runs inside
    /// a write transaction that verifies the device exists and still has
    /// room; either violation surfaces as `ConstraintViolation` and nothing
    /// is written.
    pub async fn create_battery(&self, new: &NewBattery) -> Result<Battery, DbError> {
        match new.device_id {
            None => {
                let battery = sqlx::query_as::<_, Battery>(
                    r#"
                    INSERT INTO batteries (name, nominal_voltage, remaining_capacity, service_life, device_id)
                    VALUES (?1, ?2, ?3, ?4, NULL)
                    RETURNING id, name, nominal_voltage, remaining_capacity, service_life, device_id
                    "#,
                )
                .bind(&new.name)
                .bind(new.nominal_voltage)
                .bind(new.remaining_capacity)
                .bind(new.service_life)
                .fetch_one(&self.pool)
                .await?;
                Ok(battery)
            }
            Some(device_id) => {
                let mut tx = self.begin().await?;
                self.check_device_has_room(&mut tx, device_id).await?;
                let battery = sqlx::query_as::<_, Battery>(
                    r#"
                    INSERT INTO batteries (name, nominal_voltage, remaining_capacity, service_life, device_id)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    RETURNING id, name, nominal_voltage, remaining_capacity, service_life, device_id
                    "#,
                )
                .bind(&new.name)
                .bind(new.nominal_voltage)
                .bind(new.remaining_capacity)
                .bind(new.service_life)
                .bind(device_id)
                .fetch_one(&mut *tx)
                .await?;
                tx.commit().await?;
                Ok(battery)
            }
        }
    }

    /// Applies a partial update. A `Some(device_id)` re-targets the battery
    /// and goes through the same existence and capacity discipline as
    /// `create_battery`; a `None` leaves the attachment untouched.
    pub async fn update_battery(
        &self,
        id: i64,
        update: &BatteryUpdate,
    ) -> Result<Option<Battery>, DbError> {
        match update.device_id {
            None => {
                let battery = sqlx::query_as::<_, Battery>(
                    r#"
                    UPDATE batteries
                    SET name               = COALESCE(?1, name),
                        nominal_voltage    = COALESCE(?2, nominal_voltage),
                        remaining_capacity = COALESCE(?3, remaining_capacity),
                        service_life       = COALESCE(?4, service_life)
                    WHERE id = ?5
                    RETURNING id, name, nominal_voltage, remaining_capacity, service_life, device_id
                    "#,
                )
                .bind(&update.name)
                .bind(update.nominal_voltage)
                .bind(update.remaining_capacity)
                .bind(update.service_life)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
                Ok(battery)
            }
            Some(device_id) => {
                let mut tx = self.begin().await?;
                let Some(current) = self.battery_in_tx(&mut tx, id).await? else {
                    return Ok(None);
                };
                // Re-asserting the current device must not trip the cap.
                if current.device_id != Some(device_id) {
                    self.check_device_has_room(&mut tx, device_id).await?;
                }
                let battery = sqlx::query_as::<_, Battery>(
                    r#"
                    UPDATE batteries
                    SET name               = COALESCE(?1, name),
                        nominal_voltage    = COALESCE(?2, nominal_voltage),
                        remaining_capacity = COALESCE(?3, remaining_capacity),
                        service_life       = COALESCE(?4, service_life),
                        device_id          = ?5
                    WHERE id = ?6
                    RETURNING id, name, nominal_voltage, remaining_capacity, service_life, device_id
                    "#,
                )
                .bind(&update.name)
                .bind(update.nominal_voltage)
                .bind(update.remaining_capacity)
                .bind(update.service_life)
                .bind(device_id)
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
                tx.commit().await?;
                Ok(Some(battery))
            }
        }
    }

    /// Deletes a battery outright; other batteries on the same device are
    /// unaffected. Returns false when the id did not exist.
    pub async fn delete_battery(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM batteries WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ==========================================================================
    // Transaction primitives for the attachment layer
    // ==========================================================================

    pub async fn begin(&self) -> Result<StoreTx, DbError> {
        Ok(self.pool.begin().await?)
    }

    /// Loads a device inside the transaction while taking SQLite's write
    /// lock on the database via a self-assignment UPDATE. Issued as the
    /// first statement of a check-then-set transaction it serializes the
    /// whole read-check-write against every concurrent writer, which is
    /// what makes the capacity and exclusivity checks race-free.
    pub async fn lock_device(
        &self,
        tx: &mut StoreTx,
        id: i64,
    ) -> Result<Option<Device>, DbError> {
        let device = sqlx::query_as::<_, Device>(
            r#"
            UPDATE devices SET id = id WHERE id = ?1
            RETURNING id, name, firmware_version, is_on
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(device)
    }

    pub async fn battery_in_tx(
        &self,
        tx: &mut StoreTx,
        id: i64,
    ) -> Result<Option<Battery>, DbError> {
        let battery = sqlx::query_as::<_, Battery>(
            r#"
            SELECT id, name, nominal_voltage, remaining_capacity, service_life, device_id
            FROM batteries WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(battery)
    }

    pub async fn attached_count_in_tx(
        &self,
        tx: &mut StoreTx,
        device_id: i64,
    ) -> Result<i64, DbError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM batteries WHERE device_id = ?1")
                .bind(device_id)
                .fetch_one(&mut **tx)
                .await?;
        Ok(count)
    }

    /// Points a battery at a device (or clears the reference with `None`).
    /// The battery row must exist; callers have already loaded it inside
    /// the same transaction.
    pub async fn set_battery_device_in_tx(
        &self,
        tx: &mut StoreTx,
        battery_id: i64,
        device_id: Option<i64>,
    ) -> Result<Battery, DbError> {
        let battery = sqlx::query_as::<_, Battery>(
            r#"
            UPDATE batteries SET device_id = ?1 WHERE id = ?2
            RETURNING id, name, nominal_voltage, remaining_capacity, service_life, device_id
            "#,
        )
        .bind(device_id)
        .bind(battery_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(battery)
    }

    // Shared guard for the direct-write paths that carry a device_id.
    async fn check_device_has_room(
        &self,
        tx: &mut StoreTx,
        device_id: i64,
    ) -> Result<(), DbError> {
        if self.lock_device(tx, device_id).await?.is_none() {
            return Err(DbError::ConstraintViolation(format!(
                "device {device_id} does not exist"
            )));
        }
        let count = self.attached_count_in_tx(tx, device_id).await?;
        if count >= DEVICE_BATTERY_CAPACITY {
            return Err(DbError::ConstraintViolation(format!(
                "device {device_id} already holds {DEVICE_BATTERY_CAPACITY} batteries"
            )));
        }
        Ok(())
    }
}
