use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use checkin::checkin::CheckInContext;
use checkin::storage::SledStore;
use checkin::timer::ManualClock;

/// 2024-06-01T19:30:00Z in epoch milliseconds
#[allow(dead_code)]
pub const T0_MS: i64 = 1_717_270_200_000;

#[allow(dead_code)]
pub fn create_temp_store() -> (SledStore, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let store = SledStore::open(tmp.path().join("checkin.db")).expect("failed to open sled store");
    (store, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

#[allow(dead_code)]
pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(T0_MS))
}

/// A loaded context for `user_id` in couple `c-1`
#[allow(dead_code)]
pub async fn device<R>(repository: Arc<R>, user_id: &str, clock: Arc<ManualClock>) -> CheckInContext
where
    R: checkin::storage::CheckInRepository + 'static,
{
    let mut ctx = CheckInContext::new(repository, "c-1", user_id, clock);
    ctx.load().await;
    ctx
}
