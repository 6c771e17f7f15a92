use core_types::{BatteryUpdate, DeviceUpdate, NewBattery, NewDevice};
use database::{connect, run_migrations, DbError, DbRepository, PoolSettings};
use tempfile::TempDir;

async fn test_repo() -> (DbRepository, TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let settings = PoolSettings {
        path: dir.path().join("test.db"),
        ..PoolSettings::default()
    };
    let pool = connect(&settings).await.expect("connect");
    run_migrations(&pool).await.expect("migrations");
    (DbRepository::new(pool), dir)
}

fn device(name: &str) -> NewDevice {
    NewDevice {
        name: name.to_string(),
        firmware_version: "1.0".to_string(),
        is_on: true,
    }
}

fn battery(name: &str, device_id: Option<i64>) -> NewBattery {
    NewBattery {
        name: name.to_string(),
        nominal_voltage: 3.7,
        remaining_capacity: 100.0,
        service_life: 500,
        device_id,
    }
}

#[tokio::test]
async fn device_crud_round_trip() {
    let (repo, _dir) = test_repo().await;

    let created = repo.create_device(&device("dev1")).await.unwrap();
    assert_eq!(created.name, "dev1");
    assert!(created.is_on);

    let fetched = repo.get_device(created.id).await.unwrap().unwrap();
    assert_eq!(fetched, created);

    let updated = repo
        .update_device(
            created.id,
            &DeviceUpdate {
                firmware_version: Some("2.0".to_string()),
                is_on: None,
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.firmware_version, "2.0");
    // Untouched fields keep their values.
    assert_eq!(updated.name, "dev1");
    assert!(updated.is_on);

    assert!(repo.delete_device(created.id).await.unwrap());
    assert!(repo.get_device(created.id).await.unwrap().is_none());
    assert!(!repo.delete_device(created.id).await.unwrap());
}

#[tokio::test]
async fn duplicate_device_name_is_a_constraint_violation() {
    let (repo, _dir) = test_repo().await;

    repo.create_device(&device("dev1")).await.unwrap();
    let err = repo.create_device(&device("dev1")).await.unwrap_err();
    assert!(matches!(err, DbError::ConstraintViolation(_)));

    // The failed insert left nothing behind.
    assert_eq!(repo.list_devices().await.unwrap().len(), 1);
}

#[tokio::test]
async fn battery_crud_and_partial_update() {
    let (repo, _dir) = test_repo().await;

    let created = repo.create_battery(&battery("b1", None)).await.unwrap();
    assert_eq!(created.device_id, None);

    let updated = repo
        .update_battery(
            created.id,
            &BatteryUpdate {
                remaining_capacity: Some(42.5),
                ..BatteryUpdate::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.remaining_capacity, 42.5);
    assert_eq!(updated.name, "b1");
    assert_eq!(updated.nominal_voltage, 3.7);

    assert!(repo.delete_battery(created.id).await.unwrap());
    assert!(repo.get_battery(created.id).await.unwrap().is_none());
}

#[tokio::test]
async fn update_of_missing_record_returns_none() {
    let (repo, _dir) = test_repo().await;

    assert!(repo
        .update_device(999, &DeviceUpdate::default())
        .await
        .unwrap()
        .is_none());
    assert!(repo
        .update_battery(999, &BatteryUpdate::default())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn create_battery_with_unknown_device_is_rejected() {
    let (repo, _dir) = test_repo().await;

    let err = repo
        .create_battery(&battery("b1", Some(999)))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::ConstraintViolation(_)));
    assert!(repo.list_batteries().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_battery_with_device_respects_capacity() {
    let (repo, _dir) = test_repo().await;
    let dev = repo.create_device(&device("dev1")).await.unwrap();

    for i in 0..5 {
        repo.create_battery(&battery(&format!("b{i}"), Some(dev.id)))
            .await
            .unwrap();
    }
    assert_eq!(repo.attached_count(dev.id).await.unwrap(), 5);

    let err = repo
        .create_battery(&battery("b5", Some(dev.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::ConstraintViolation(_)));
    assert_eq!(repo.attached_count(dev.id).await.unwrap(), 5);
}

#[tokio::test]
async fn update_battery_can_move_it_between_devices() {
    let (repo, _dir) = test_repo().await;
    let dev1 = repo.create_device(&device("dev1")).await.unwrap();
    let dev2 = repo.create_device(&device("dev2")).await.unwrap();
    let bat = repo
        .create_battery(&battery("b1", Some(dev1.id)))
        .await
        .unwrap();

    let moved = repo
        .update_battery(
            bat.id,
            &BatteryUpdate {
                device_id: Some(dev2.id),
                ..BatteryUpdate::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(moved.device_id, Some(dev2.id));
    assert_eq!(repo.attached_count(dev1.id).await.unwrap(), 0);
    assert_eq!(repo.attached_count(dev2.id).await.unwrap(), 1);
}

#[tokio::test]
async fn update_battery_reasserting_current_device_passes_on_a_full_device() {
    let (repo, _dir) = test_repo().await;
    let dev = repo.create_device(&device("dev1")).await.unwrap();

    let mut first = None;
    for i in 0..5 {
        let bat = repo
            .create_battery(&battery(&format!("b{i}"), Some(dev.id)))
            .await
            .unwrap();
        first.get_or_insert(bat);
    }

    // The device is full, but this battery already occupies one of the slots.
    let bat = first.unwrap();
    let updated = repo
        .update_battery(
            bat.id,
            &BatteryUpdate {
                device_id: Some(dev.id),
                name: Some("renamed".to_string()),
                ..BatteryUpdate::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.device_id, Some(dev.id));
    assert_eq!(updated.name, "renamed");
}

#[tokio::test]
async fn deleting_a_device_detaches_its_batteries() {
    let (repo, _dir) = test_repo().await;
    let dev = repo.create_device(&device("dev1")).await.unwrap();

    let mut ids = Vec::new();
    for i in 0..3 {
        let bat = repo
            .create_battery(&battery(&format!("b{i}"), Some(dev.id)))
            .await
            .unwrap();
        ids.push(bat.id);
    }

    assert!(repo.delete_device(dev.id).await.unwrap());

    // All three batteries survive, unattached.
    for id in ids {
        let bat = repo.get_battery(id).await.unwrap().unwrap();
        assert_eq!(bat.device_id, None);
    }
}

#[tokio::test]
async fn deleting_a_battery_leaves_siblings_alone() {
    let (repo, _dir) = test_repo().await;
    let dev = repo.create_device(&device("dev1")).await.unwrap();
    let b1 = repo
        .create_battery(&battery("b1", Some(dev.id)))
        .await
        .unwrap();
    let b2 = repo
        .create_battery(&battery("b2", Some(dev.id)))
        .await
        .unwrap();

    assert!(repo.delete_battery(b1.id).await.unwrap());

    let remaining = repo.batteries_for_device(dev.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, b2.id);
}
