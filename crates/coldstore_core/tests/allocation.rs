use chrono::NaiveDate;
use coldstore_core::db::open_db_in_memory;
use coldstore_core::{
    AllocationConfig, CoolingService, ErrorKind, HorizonPolicy, Missing, Place, Placement,
    ServiceError, Tray,
};
use rusqlite::Connection;
use std::sync::{Arc, Barrier};
use std::thread;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn setup() -> Connection {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO samplekind (samplekindid, text, validnoofdays) VALUES (1, 'blood', 10);
         INSERT INTO samplekind (samplekindid, text, validnoofdays) VALUES (2, 'plasma', 40);",
    )
    .unwrap();
    conn
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn occupied(conn: &Connection) -> Vec<(i64, i64, i64)> {
    let mut stmt = conn
        .prepare(
            "SELECT trayid, placeno, sampleid
             FROM place
             WHERE sampleid IS NOT NULL
             ORDER BY trayid, placeno;",
        )
        .unwrap();
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap();
    rows.map(Result::unwrap).collect()
}

#[test]
fn creates_tray_with_grace_window_when_none_fits() {
    let mut conn = setup();
    let placement = {
        let mut service =
            CoolingService::try_new(&mut conn, AllocationConfig::default()).unwrap();
        service.create_sample_on(100, 1, date(2024, 1, 1)).unwrap();
        let placement = service.allocate_sample(100, 5).unwrap();

        let trays = service.list_trays().unwrap();
        assert_eq!(
            trays,
            vec![Tray {
                id: placement.tray_id,
                diameter: 5,
                horizon: Some(date(2024, 2, 10)),
            }]
        );
        assert_eq!(
            service.list_places(placement.tray_id).unwrap(),
            vec![Place {
                tray_id: placement.tray_id,
                place_no: 1,
                sample_id: Some(100),
            }]
        );
        placement
    };

    assert_eq!(placement.place_no, 1);
    assert_eq!(placement.sample_id, 100);
    assert_eq!(count(&conn, "tray"), 1);
    assert_eq!(count(&conn, "place"), 1);
}

#[test]
fn uses_lowest_free_place_of_existing_tray_and_touches_nothing_else() {
    let mut conn = setup();
    let mut service = CoolingService::try_new(&mut conn, AllocationConfig::default()).unwrap();
    service.create_sample_on(1, 1, date(2024, 1, 1)).unwrap();
    service.create_sample_on(2, 1, date(2024, 1, 1)).unwrap();
    let tray = service
        .provision_tray(5, Some(date(2024, 3, 1)), 4)
        .unwrap();

    let first = service.allocate_sample(1, 5).unwrap();
    assert_eq!(
        first,
        Placement {
            tray_id: tray.id,
            place_no: 1,
            sample_id: 1,
        }
    );

    let second = service.allocate_sample(2, 5).unwrap();
    assert_eq!(second.tray_id, tray.id);
    assert_eq!(second.place_no, 2);

    let places = service.list_places(tray.id).unwrap();
    let free: Vec<i64> = places
        .iter()
        .filter(|place| place.is_free())
        .map(|place| place.place_no)
        .collect();
    assert_eq!(free, vec![3, 4]);
    assert_eq!(service.list_trays().unwrap().len(), 1);
}

#[test]
fn fills_gap_left_in_middle_of_tray() {
    let mut conn = setup();
    conn.execute_batch(
        "INSERT INTO sample (sampleid, samplekindid, expirationdate) VALUES (50, 1, '2024-01-05');
         INSERT INTO sample (sampleid, samplekindid, expirationdate) VALUES (51, 1, '2024-01-05');
         INSERT INTO sample (sampleid, samplekindid, expirationdate) VALUES (52, 1, '2024-01-05');
         INSERT INTO tray (trayid, diameter, expirationdate) VALUES (7, 3, '2024-01-31');
         INSERT INTO place (trayid, placeno, sampleid) VALUES (7, 1, 50);
         INSERT INTO place (trayid, placeno, sampleid) VALUES (7, 2, NULL);
         INSERT INTO place (trayid, placeno, sampleid) VALUES (7, 3, 51);
         INSERT INTO place (trayid, placeno, sampleid) VALUES (7, 4, NULL);",
    )
    .unwrap();

    {
        let mut service =
            CoolingService::try_new(&mut conn, AllocationConfig::default()).unwrap();
        let placement = service.allocate_sample(52, 3).unwrap();
        assert_eq!((placement.tray_id, placement.place_no), (7, 2));
    }
    assert_eq!(
        occupied(&conn),
        vec![(7, 1, 50), (7, 2, 52), (7, 3, 51)]
    );
}

#[test]
fn prefers_tray_expiring_soonest_that_still_covers_sample() {
    let mut conn = setup();
    let mut service = CoolingService::try_new(&mut conn, AllocationConfig::default()).unwrap();
    service.create_sample_on(1, 1, date(2024, 1, 1)).unwrap();

    let _too_short = service.provision_tray(5, Some(date(2024, 1, 10)), 2).unwrap();
    let _later = service.provision_tray(5, Some(date(2024, 4, 1)), 2).unwrap();
    let _unbounded = service.provision_tray(5, None, 2).unwrap();
    let _other_size = service.provision_tray(6, Some(date(2024, 1, 20)), 2).unwrap();
    let closest = service.provision_tray(5, Some(date(2024, 1, 20)), 2).unwrap();

    let placement = service.allocate_sample(1, 5).unwrap();
    assert_eq!(placement.tray_id, closest.id);
}

#[test]
fn ties_on_horizon_break_by_lowest_tray_id() {
    let mut conn = setup();
    let mut service = CoolingService::try_new(&mut conn, AllocationConfig::default()).unwrap();
    service.create_sample_on(1, 1, date(2024, 1, 1)).unwrap();

    let first = service.provision_tray(5, Some(date(2024, 2, 1)), 1).unwrap();
    let _second = service.provision_tray(5, Some(date(2024, 2, 1)), 1).unwrap();

    assert_eq!(service.allocate_sample(1, 5).unwrap().tray_id, first.id);
}

#[test]
fn unbounded_tray_is_used_when_no_dated_tray_fits() {
    let mut conn = setup();
    let mut service = CoolingService::try_new(&mut conn, AllocationConfig::default()).unwrap();
    service.create_sample_on(1, 2, date(2024, 1, 1)).unwrap();

    let _short = service.provision_tray(5, Some(date(2024, 1, 15)), 1).unwrap();
    let unbounded = service.provision_tray(5, None, 1).unwrap();

    assert_eq!(service.allocate_sample(1, 5).unwrap().tray_id, unbounded.id);
}

#[test]
fn equal_horizon_qualifies_only_under_inclusive_policy() {
    let mut conn = setup();
    let mut inclusive =
        CoolingService::try_new(&mut conn, AllocationConfig::default()).unwrap();
    inclusive.create_sample_on(1, 1, date(2024, 1, 1)).unwrap();
    inclusive.create_sample_on(2, 1, date(2024, 1, 1)).unwrap();
    let exact = inclusive
        .provision_tray(5, Some(date(2024, 1, 11)), 1)
        .unwrap();
    assert_eq!(inclusive.allocate_sample(1, 5).unwrap().tray_id, exact.id);
    drop(inclusive);

    conn.execute("UPDATE place SET sampleid = NULL WHERE trayid = ?1;", [exact.id])
        .unwrap();

    let strict_config = AllocationConfig {
        horizon_policy: HorizonPolicy::Strict,
        ..AllocationConfig::default()
    };
    let mut strict = CoolingService::try_new(&mut conn, strict_config).unwrap();
    let placement = strict.allocate_sample(2, 5).unwrap();
    assert_ne!(placement.tray_id, exact.id);
    assert_eq!(strict.list_trays().unwrap().len(), 2);
}

#[test]
fn full_candidate_tray_fails_without_creating_another() {
    let mut conn = setup();
    let mut service = CoolingService::try_new(&mut conn, AllocationConfig::default()).unwrap();
    service.create_sample_on(1, 1, date(2024, 1, 1)).unwrap();
    service.create_sample_on(2, 1, date(2024, 1, 1)).unwrap();
    let tray = service.provision_tray(5, Some(date(2024, 2, 1)), 1).unwrap();

    service.allocate_sample(1, 5).unwrap();
    let err = service.allocate_sample(2, 5).unwrap_err();

    assert!(matches!(err, ServiceError::NoCapacity { tray_id } if tray_id == tray.id));
    assert_eq!(service.list_trays().unwrap().len(), 1);
    assert!(service.find_placement(2).unwrap().is_none());
}

#[test]
fn unknown_sample_fails_not_found_without_mutation() {
    let mut conn = setup();
    {
        let mut service =
            CoolingService::try_new(&mut conn, AllocationConfig::default()).unwrap();
        let err = service.allocate_sample(999, 5).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(Missing::Sample(999))));
    }
    assert_eq!(count(&conn, "tray"), 0);
    assert_eq!(count(&conn, "place"), 0);
}

#[test]
fn placed_sample_cannot_be_allocated_again() {
    let mut conn = setup();
    let mut service = CoolingService::try_new(&mut conn, AllocationConfig::default()).unwrap();
    service.create_sample_on(1, 1, date(2024, 1, 1)).unwrap();
    let first = service.allocate_sample(1, 5).unwrap();

    let err = service.allocate_sample(1, 8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(service.find_placement(1).unwrap(), Some(first));
    assert_eq!(service.list_trays().unwrap().len(), 1);
}

#[test]
fn cleared_tray_without_places_is_skipped() {
    let mut conn = setup();
    let mut service = CoolingService::try_new(&mut conn, AllocationConfig::default()).unwrap();
    service.create_sample_on(1, 1, date(2024, 1, 1)).unwrap();
    service.create_sample_on(2, 1, date(2024, 1, 1)).unwrap();

    let first = service.allocate_sample(1, 5).unwrap();
    service.clear_tray(first.tray_id).unwrap();
    assert!(service.list_places(first.tray_id).unwrap().is_empty());

    let second = service.allocate_sample(2, 5).unwrap();
    assert_ne!(second.tray_id, first.tray_id);
    assert_eq!(second.place_no, 1);
}

#[test]
fn grace_window_is_configurable() {
    let mut conn = setup();
    let config = AllocationConfig {
        grace_days: 0,
        ..AllocationConfig::default()
    };
    let mut service = CoolingService::try_new(&mut conn, config).unwrap();
    service.create_sample_on(1, 1, date(2024, 1, 1)).unwrap();

    let placement = service.allocate_sample(1, 2).unwrap();
    let trays = service.list_trays().unwrap();
    assert_eq!(trays[0].id, placement.tray_id);
    assert_eq!(trays[0].horizon, Some(date(2024, 1, 11)));
}

#[test]
fn non_positive_diameter_is_invalid_input() {
    let mut conn = setup();
    let mut service = CoolingService::try_new(&mut conn, AllocationConfig::default()).unwrap();
    service.create_sample_on(1, 1, date(2024, 1, 1)).unwrap();

    let err = service.allocate_sample(1, -3).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(service.list_trays().unwrap().is_empty());
}

#[test]
fn concurrent_allocations_for_the_last_place_admit_exactly_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");

    let tray_id = {
        let mut conn = coldstore_core::db::open_db(&path).unwrap();
        conn.execute_batch(
            "INSERT INTO samplekind (samplekindid, text, validnoofdays) VALUES (1, 'blood', 10);",
        )
        .unwrap();
        let mut service = CoolingService::try_new(&mut conn, AllocationConfig::default()).unwrap();
        service.create_sample_on(1, 1, date(2024, 1, 1)).unwrap();
        service.create_sample_on(2, 1, date(2024, 1, 1)).unwrap();
        service.provision_tray(5, Some(date(2024, 2, 1)), 1).unwrap().id
    };

    let start = Arc::new(Barrier::new(2));
    let workers: Vec<_> = [1_i64, 2]
        .into_iter()
        .map(|sample_id| {
            let mut conn = coldstore_core::db::open_db(&path).unwrap();
            let start = Arc::clone(&start);
            thread::spawn(move || {
                let mut service =
                    CoolingService::try_new(&mut conn, AllocationConfig::default()).unwrap();
                start.wait();
                service.allocate_sample(sample_id, 5)
            })
        })
        .collect();
    let results: Vec<_> = workers
        .into_iter()
        .map(|worker| worker.join().unwrap())
        .collect();

    let placed: Vec<Placement> = results
        .iter()
        .filter_map(|result| result.as_ref().ok().copied())
        .collect();
    assert_eq!(placed.len(), 1);
    assert_eq!((placed[0].tray_id, placed[0].place_no), (tray_id, 1));
    let losers: Vec<&ServiceError> = results
        .iter()
        .filter_map(|result| result.as_ref().err())
        .collect();
    assert_eq!(losers.len(), 1);
    assert!(matches!(losers[0], ServiceError::NoCapacity { tray_id: id } if *id == tray_id));

    let conn = coldstore_core::db::open_db(&path).unwrap();
    assert_eq!(occupied(&conn), vec![(tray_id, 1, placed[0].sample_id)]);
    assert_eq!(count(&conn, "tray"), 1);
}

#[test]
fn sample_expiring_at_end_of_calendar_gets_no_tray() {
    let mut conn = setup();
    conn.execute(
        "INSERT INTO sample (sampleid, samplekindid, expirationdate) VALUES (7, 1, '9999-12-20');",
        [],
    )
    .unwrap();
    {
        let mut service =
            CoolingService::try_new(&mut conn, AllocationConfig::default()).unwrap();
        let err = service.allocate_sample(7, 5).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }
    assert_eq!(count(&conn, "tray"), 0);
    assert_eq!(count(&conn, "place"), 0);
}
