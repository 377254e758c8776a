use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

pub mod error;
pub mod helpers;
mod migrations;
pub mod models;
mod repositories;

use migrations::run_migrations;

pub use error::{ScanError, ScanResult};
pub use models::{NewScan, ScanPatch, ScanRecord};

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

/// Handle to the scan database.
///
/// The connection lives on a dedicated worker thread; every operation is
/// shipped to it as a closure and the result comes back over a oneshot
/// channel. Clones share the same worker. The schema is ensured before
/// `new` returns, so no caller has to initialize anything.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

/// Opens the scan store and brings its schema up to date. Runs on the
/// worker thread, which owns the connection from here on.
fn open_scan_store(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open scan database at {}", path.display()))?;

    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        error!("Failed to enable WAL mode: {err}");
    }

    run_migrations(&mut conn).context("failed to prepare the scans table")?;
    Ok(conn)
}

fn serve_commands(mut conn: Connection, commands: mpsc::Receiver<DbCommand>) {
    while let Ok(command) = commands.recv() {
        match command {
            DbCommand::Execute(task) => task(&mut conn),
            DbCommand::Shutdown => break,
        }
    }
    info!("Scan database thread shutting down");
}

impl Database {
    /// Opens (or creates) the scan database at `db_path`. The `scans`
    /// table is guaranteed to exist once this returns.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("qrscan-db".into())
            .spawn(move || match open_scan_store(&path_for_thread) {
                Ok(conn) => {
                    if ready_tx.send(Ok(())).is_ok() {
                        serve_commands(conn, command_rx);
                    }
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .context("failed to spawn scan database thread")?;

        ready_rx
            .recv()
            .context("scan database thread exited before the store was ready")??;

        info!("Scan database ready at {}", db_path.display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
        })
    }

    /// Re-checks the `scans` schema. [`Database::new`] already did this, so
    /// a second call finds nothing to apply.
    pub async fn init(&self) -> Result<()> {
        let applied = self.execute(|conn| run_migrations(conn)).await?;
        if applied > 0 {
            info!("Applied {applied} pending scan schema step(s)");
        }
        Ok(())
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("scan database thread is gone: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("scan database thread dropped the request"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("scans.sqlite3")).unwrap();

        db.init().await.unwrap();
        db.init().await.unwrap();

        let tables: i64 = db
            .execute(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'scans'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .await
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[tokio::test]
    async fn reopening_keeps_existing_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("scans.sqlite3");

        {
            let db = Database::new(path.clone()).unwrap();
            db.execute(|conn| {
                conn.execute(
                    "INSERT INTO scans (qr_data, timestamp) VALUES ('hello', 1)",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();
        }

        let db = Database::new(path).unwrap();
        let count: i64 = db
            .execute(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM scans", [], |row| row.get(0))?))
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn new_refuses_a_store_from_a_newer_build() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scans.sqlite3");
        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", 99).unwrap();
        }

        let err = Database::new(path).err().unwrap();
        assert!(format!("{err:#}").contains("failed to prepare the scans table"));
    }
}
