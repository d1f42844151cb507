// End-to-end runs against temporary input folders and on-disk SQLite stores

use retail_etl::{
    count_transactions, get_all_transactions, get_transactions_by_id, EtlConfig, EtlError,
    FileOutcome, PipelineRunner,
};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const HEADER: &str = "id,description,category,quantity,amount_excl_tax,amount_inc_tax\n";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("input")).unwrap();
        Workspace { dir }
    }

    fn input(&self) -> PathBuf {
        self.dir.path().join("input")
    }

    fn db_path(&self) -> PathBuf {
        self.dir.path().join("retail.db")
    }

    fn write_extract(&self, name: &str, rows: &[&str]) {
        let mut content = HEADER.to_string();
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        fs::write(self.input().join(name), content).unwrap();
    }

    fn config(&self, abort_on_parse_error: bool) -> EtlConfig {
        EtlConfig {
            input_dir: self.input(),
            db_path: self.db_path(),
            log_dir: self.dir.path().join("logs"),
            abort_on_parse_error,
            ..EtlConfig::default()
        }
    }

    fn runner(&self) -> PipelineRunner {
        PipelineRunner::new(self.config(true))
    }

    fn store(&self) -> Connection {
        Connection::open(self.db_path()).unwrap()
    }
}

fn quantity_of(conn: &Connection, id: &str) -> Vec<i64> {
    get_transactions_by_id(conn, id)
        .unwrap()
        .into_iter()
        .map(|r| r.quantity)
        .collect()
}

#[test]
fn test_full_run_normalizes_and_loads() {
    let ws = Workspace::new();
    ws.write_extract(
        "retail_05_03_2024.csv",
        &[
            "A1,Milk,Food,2,1.50,1.80",
            "B2,,Food,1,2.00,2.40",
            "C3,Soap,Hygiene,4,3.00,3.60",
            "A1,Milk 1L,Food,3,1.50,1.80",
        ],
    );

    let summary = ws.runner().run().unwrap();
    assert_eq!(summary.loaded_count(), 1);
    assert_eq!(summary.rows_inserted(), 2);

    let conn = ws.store();
    let rows = get_all_transactions(&conn).unwrap();
    assert_eq!(rows.len(), 2);

    let a1 = &rows[0];
    assert_eq!(a1.id, "A1");
    assert_eq!(a1.name, "Milk 1L");
    assert_eq!(a1.quantity, 3);
    assert!(rows.iter().all(|r| r.transaction_date == "2024-03-05"));
    assert!(get_transactions_by_id(&conn, "B2").unwrap().is_empty());
}

#[test]
fn test_later_extract_supersedes_earlier_ids() {
    let ws = Workspace::new();
    ws.write_extract("retail_01_03_2024.csv", &["A1,Milk,Food,5,1.0,1.2", "Z9,Tea,Food,1,4.0,4.8"]);
    ws.write_extract("retail_02_03_2024.csv", &["A1,Milk,Food,9,1.0,1.2", "B2,Bread,Food,3,2.0,2.4"]);

    let summary = ws.runner().run().unwrap();
    assert_eq!(summary.loaded_count(), 2);

    let conn = ws.store();
    assert_eq!(quantity_of(&conn, "A1"), vec![9]);
    assert_eq!(quantity_of(&conn, "B2"), vec![3]);
    assert_eq!(quantity_of(&conn, "Z9"), vec![1]);
    assert_eq!(count_transactions(&conn).unwrap(), 3);

    // A1 now carries the date of the second extract
    let a1 = get_transactions_by_id(&conn, "A1").unwrap();
    assert_eq!(a1[0].transaction_date, "2024-03-02");

    match &summary.files[1].1 {
        FileOutcome::Loaded { report, .. } => {
            assert_eq!(report.rows_before, 2);
            assert_eq!(report.rows_deleted, 1);
            assert_eq!(report.rows_inserted, 2);
            assert_eq!(report.rows_after, 3);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn test_short_row_is_dropped_not_fatal() {
    let ws = Workspace::new();
    ws.write_extract(
        "retail_05_03_2024.csv",
        &["A1,Milk,Food,2,1.5,1.8", "B2,Bread,Food,1,2.0", "C3,Tea,Food,#N/A,4.0,4.8"],
    );

    let summary = ws.runner().run().unwrap();
    assert_eq!(summary.loaded_count(), 1);

    let rows = get_all_transactions(&ws.store()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "A1");
}

#[test]
fn test_long_row_aborts_run() {
    let ws = Workspace::new();
    ws.write_extract("retail_05_03_2024.csv", &["A1,Milk,Food,2,1.5,1.8,extra"]);

    let err = ws.runner().run().unwrap_err();
    assert!(matches!(err, EtlError::Read { .. }));
    assert!(!ws.db_path().exists());
}

#[test]
fn test_rerun_is_idempotent() {
    let ws = Workspace::new();
    ws.write_extract("retail_05_03_2024.csv", &["A1,Milk,Food,2,1.5,1.8", "B2,Bread,Food,1,2.0,2.4"]);

    ws.runner().run().unwrap();
    let first = get_all_transactions(&ws.store()).unwrap();

    ws.runner().run().unwrap();
    let second = get_all_transactions(&ws.store()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_bad_quantity_aborts_run_before_any_load() {
    let ws = Workspace::new();
    ws.write_extract("retail_01_03_2024.csv", &["A1,Milk,Food,2,1.5,1.8", "B2,Bread,Food,two,2.0,2.4"]);
    ws.write_extract("retail_02_03_2024.csv", &["C3,Eggs,Food,12,3.0,3.6"]);

    let err = ws.runner().run().unwrap_err();
    assert!(matches!(err, EtlError::Coercion { .. }));

    // nothing from either file reached the store
    assert!(!ws.db_path().exists());
}

#[test]
fn test_bad_quantity_skips_file_when_not_aborting() {
    let ws = Workspace::new();
    ws.write_extract("retail_01_03_2024.csv", &["A1,Milk,Food,2,1.5,1.8", "B2,Bread,Food,two,2.0,2.4"]);
    ws.write_extract("retail_02_03_2024.csv", &["C3,Eggs,Food,12,3.0,3.6"]);

    let summary = PipelineRunner::new(ws.config(false)).run().unwrap();
    assert_eq!(summary.rejected_count(), 1);
    assert_eq!(summary.loaded_count(), 1);

    let conn = ws.store();
    assert!(get_transactions_by_id(&conn, "A1").unwrap().is_empty());
    assert_eq!(quantity_of(&conn, "C3"), vec![12]);
}

#[test]
fn test_malformed_filename_aborts_run() {
    let ws = Workspace::new();
    ws.write_extract("retail_march_2024.csv", &["A1,Milk,Food,2,1.5,1.8"]);

    let err = ws.runner().run().unwrap_err();
    assert!(matches!(err, EtlError::MalformedFilename { .. }));
}

#[test]
fn test_load_failures_do_not_stop_the_run() {
    let ws = Workspace::new();
    ws.write_extract("retail_01_03_2024.csv", &["A1,Milk,Food,2,1.5,1.8"]);
    ws.write_extract("retail_02_03_2024.csv", &["B2,Bread,Food,1,2.0,2.4"]);

    // a directory in place of the database file makes every load fail
    fs::create_dir(ws.db_path()).unwrap();

    let summary = ws.runner().run().unwrap();
    assert_eq!(summary.files_discovered(), 2);
    assert_eq!(summary.failed_load_count(), 2);
}

#[test]
fn test_rollback_through_pipeline() {
    let ws = Workspace::new();
    ws.write_extract("retail_01_03_2024.csv", &["A1,Milk,Food,5,1.0,1.2"]);
    ws.runner().run().unwrap();

    ws.store()
        .execute_batch(
            "CREATE TRIGGER reject_boom BEFORE INSERT ON transactions
             WHEN NEW.id = 'BOOM'
             BEGIN SELECT RAISE(ABORT, 'insert rejected'); END;",
        )
        .unwrap();

    fs::remove_file(ws.input().join("retail_01_03_2024.csv")).unwrap();
    ws.write_extract("retail_02_03_2024.csv", &["A1,Milk,Food,9,1.0,1.2", "BOOM,Gum,Food,1,0.5,0.6"]);

    let summary = ws.runner().run().unwrap();
    assert_eq!(summary.failed_load_count(), 1);

    let conn = ws.store();
    let a1 = get_transactions_by_id(&conn, "A1").unwrap();
    assert_eq!(a1.len(), 1);
    assert_eq!(a1[0].quantity, 5);
    assert_eq!(a1[0].transaction_date, "2024-03-01");
    assert_eq!(count_transactions(&conn).unwrap(), 1);
}

#[test]
fn test_all_null_file_loads_nothing() {
    let ws = Workspace::new();
    ws.write_extract("retail_01_03_2024.csv", &["A1,,Food,2,1.5,1.8"]);

    let summary = ws.runner().run().unwrap();
    match &summary.files[0].1 {
        FileOutcome::Loaded { stats, report } => {
            assert_eq!(stats.rows_out, 0);
            assert_eq!(report.rows_inserted, 0);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(count_transactions(&ws.store()).unwrap(), 0);
}

#[test]
fn test_no_files_found() {
    let ws = Workspace::new();
    fs::write(ws.input().join("notes.txt"), "not an extract").unwrap();

    let summary = ws.runner().run().unwrap();
    assert!(summary.no_input());
    assert!(!Path::new(&ws.db_path()).exists());
}
