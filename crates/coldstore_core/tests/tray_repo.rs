use chrono::NaiveDate;
use coldstore_core::db::open_db_in_memory;
use coldstore_core::{HorizonPolicy, SqliteTrayRepository, TrayRepository};
use rusqlite::Connection;

fn setup() -> Connection {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO samplekind (samplekindid, text, validnoofdays) VALUES (1, 'blood', 10);
         INSERT INTO sample (sampleid, samplekindid, expirationdate) VALUES (1, 1, '2024-01-11');
         INSERT INTO sample (sampleid, samplekindid, expirationdate) VALUES (2, 1, '2024-01-11');",
    )
    .unwrap();
    conn
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn occupant(conn: &Connection, tray_id: i64, place_no: i64) -> Option<i64> {
    conn.query_row(
        "SELECT sampleid FROM place WHERE trayid = ?1 AND placeno = ?2;",
        [tray_id, place_no],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn claim_on_occupied_place_reports_false_and_keeps_occupant() {
    let conn = setup();
    let repo = SqliteTrayRepository::new(&conn);
    let tray_id = repo.insert_tray(5, Some(date(2024, 2, 1))).unwrap();
    repo.insert_place(tray_id, 1).unwrap();

    assert!(repo.claim_place(tray_id, 1, 1).unwrap());
    assert!(!repo.claim_place(tray_id, 1, 2).unwrap());

    assert_eq!(occupant(&conn, tray_id, 1), Some(1));
    assert_eq!(repo.find_free_place(tray_id).unwrap(), None);
}

#[test]
fn claim_on_missing_place_reports_false() {
    let conn = setup();
    let repo = SqliteTrayRepository::new(&conn);
    let tray_id = repo.insert_tray(5, None).unwrap();

    assert!(!repo.claim_place(tray_id, 3, 1).unwrap());
    assert!(repo.find_placement(1).unwrap().is_none());
}

#[test]
fn candidate_search_honours_policy_on_equal_horizon() {
    let conn = setup();
    let repo = SqliteTrayRepository::new(&conn);
    let tray_id = repo.insert_tray(5, Some(date(2024, 1, 11))).unwrap();
    repo.insert_place(tray_id, 1).unwrap();

    let inclusive = repo
        .find_candidate_tray(5, date(2024, 1, 11), HorizonPolicy::Inclusive)
        .unwrap()
        .unwrap();
    assert!(inclusive.covers(date(2024, 1, 11), HorizonPolicy::Inclusive));
    assert!(repo
        .find_candidate_tray(5, date(2024, 1, 11), HorizonPolicy::Strict)
        .unwrap()
        .is_none());
    assert!(repo
        .find_candidate_tray(6, date(2024, 1, 1), HorizonPolicy::Inclusive)
        .unwrap()
        .is_none());
}
