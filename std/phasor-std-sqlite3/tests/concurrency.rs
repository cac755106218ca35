//!
//! Native functions called from many VM threads at once. Each thread owns
//! its connections; the shared handle tables must keep handles unique and
//! lookups consistent.
//!

mod common;

use std::collections::HashSet;
use std::sync::Mutex;

use common::{Plugin, text};
use phasor_std_core::PhasorValue;

const THREADS: usize = 8;
const ROUNDS: usize = 25;

#[test]
fn test_parallel_connections_get_unique_handles() {
    let plugin = Plugin::load();
    let seen = Mutex::new(HashSet::new());

    std::thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..ROUNDS {
                    let db = plugin.open_memory();
                    assert!(seen.lock().unwrap().insert(db), "handle {} issued twice", db);
                    assert!(plugin.close(db));
                }
            });
        }
    });

    assert_eq!(seen.into_inner().unwrap().len(), THREADS * ROUNDS);
}

#[test]
fn test_parallel_queries_read_their_own_rows() {
    let plugin = Plugin::load();

    std::thread::scope(|s| {
        for t in 0..THREADS {
            let plugin = &plugin;
            s.spawn(move || {
                let db = plugin.open_memory();
                assert!(plugin.exec(db, &format!("CREATE TABLE t (v TEXT); INSERT INTO t VALUES ('thread-{}');", t)));
                for _ in 0..ROUNDS {
                    let stmt = plugin.prepare(db, "SELECT v FROM t").as_int().unwrap();
                    assert_eq!(plugin.step(stmt), PhasorValue::bool(true));
                    assert_eq!(text(plugin.column(stmt, 0)), format!("thread-{}", t));

                    let handle = plugin.call("sqlite_last_string", &[]).as_int().unwrap();
                    assert!(plugin.call("sqlite_free_string", &[PhasorValue::int(handle)]).is_null());
                    assert_eq!(plugin.step(stmt), PhasorValue::bool(false));
                    assert!(plugin.finalize(stmt));
                }
                assert!(plugin.close(db));
            });
        }
    });
}

#[test]
fn test_shared_statement_across_threads() {
    let plugin = Plugin::load();
    let db = plugin.open_memory();
    assert!(plugin.exec(
        db,
        "CREATE TABLE n (i INTEGER);
         WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 200)
         INSERT INTO n SELECT x FROM c;"
    ));
    let stmt = plugin.prepare(db, "SELECT i FROM n").as_int().unwrap();
    let rows = Mutex::new(0usize);

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                loop {
                    match plugin.step(stmt).as_bool() {
                        Some(true) => *rows.lock().unwrap() += 1,
                        Some(false) => break,
                        None => panic!("step failed: {:?}", plugin.last_error()),
                    }
                }
            });
        }
    });

    // a step after DONE restarts the scan, so threads that stop late may see extra rows
    assert!(*rows.lock().unwrap() >= 200);
    assert!(plugin.finalize(stmt));
    assert!(plugin.close(db));
}
