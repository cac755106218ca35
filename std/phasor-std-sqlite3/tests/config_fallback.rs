//!
//! Loading the plugin with a broken configuration file. Kept in its own test
//! binary: the configuration is installed once per process.
//!

mod common;

use common::Plugin;
use phasor_std_core::PhasorValue;
use phasor_std_sqlite3::config::{self, CONFIG_ENV, PluginConfig};

#[test]
fn test_broken_config_still_registers_everything() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plugin.toml");
    std::fs::write(&path, "[open]\nbusy_timeout = \"soon\"\n").unwrap();
    unsafe { std::env::set_var(CONFIG_ENV, &path) };

    let plugin = Plugin::load();
    assert_eq!(plugin.host().names().len(), phasor_std_sqlite3::FUNCTIONS.len());
    assert_eq!(config::current(), &PluginConfig::default());

    let db = plugin.open_memory();
    assert!(plugin.exec(db, "CREATE TABLE t (x); INSERT INTO t VALUES (1);"));
    let stmt = plugin.prepare(db, "SELECT x FROM t").as_int().unwrap();
    assert_eq!(plugin.step(stmt), PhasorValue::bool(true));
    assert_eq!(plugin.column(stmt, 0), PhasorValue::int(1));
    assert!(plugin.finalize(stmt));
    assert!(plugin.close(db));
}
