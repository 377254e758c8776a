use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    error::{ScanError, ScanResult},
    helpers::parse_datetime,
    models::{NewScan, ScanPatch, ScanRecord},
    Database,
};

const SELECT_COLUMNS: &str =
    "SELECT id, qr_data, latitude, longitude, altitude, accuracy, timestamp, created_at FROM scans";

fn row_to_scan(row: &Row) -> Result<ScanRecord> {
    let created_at: String = row.get("created_at")?;

    Ok(ScanRecord {
        id: row.get("id")?,
        qr_data: row.get("qr_data")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        altitude: row.get("altitude")?,
        accuracy: row.get("accuracy")?,
        timestamp: row.get("timestamp")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

fn fetch_scan(conn: &Connection, scan_id: i64) -> Result<Option<ScanRecord>> {
    let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
    let mut rows = stmt.query(params![scan_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_scan(row)?)),
        None => Ok(None),
    }
}

impl Database {
    /// Insert a scan and return the stored row, including the assigned id
    /// and `created_at`.
    pub async fn create_scan(&self, scan: NewScan) -> ScanResult<ScanRecord> {
        scan.validate()?;

        let record = self
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO scans (qr_data, latitude, longitude, altitude, accuracy, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        scan.qr_data,
                        scan.latitude,
                        scan.longitude,
                        scan.altitude,
                        scan.accuracy,
                        scan.timestamp,
                    ],
                )?;

                let scan_id = conn.last_insert_rowid();
                fetch_scan(conn, scan_id)?.ok_or_else(|| anyhow!("Scan not found after insert"))
            })
            .await?;

        Ok(record)
    }

    /// All scans, most recent capture first.
    pub async fn list_scans(&self) -> ScanResult<Vec<ScanRecord>> {
        let scans = self
            .execute(|conn| {
                let mut stmt =
                    conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY timestamp DESC, id DESC"))?;

                let mut rows = stmt.query([])?;
                let mut scans = Vec::new();
                while let Some(row) = rows.next()? {
                    scans.push(row_to_scan(row)?);
                }

                Ok(scans)
            })
            .await?;

        Ok(scans)
    }

    pub async fn get_scan(&self, scan_id: i64) -> ScanResult<Option<ScanRecord>> {
        let scan = self.execute(move |conn| fetch_scan(conn, scan_id)).await?;
        Ok(scan)
    }

    /// Returns the number of rows removed; zero when the id does not exist.
    pub async fn delete_scan(&self, scan_id: i64) -> ScanResult<usize> {
        let changes = self
            .execute(move |conn| {
                Ok(conn.execute("DELETE FROM scans WHERE id = ?1", params![scan_id])?)
            })
            .await?;

        Ok(changes)
    }

    /// Overwrite the provided fields of an existing scan. Read, merge and
    /// write happen in one transaction so the pairing check sees the row
    /// as it is written. A missing id wins over an empty patch.
    pub async fn update_scan(
        &self,
        scan_id: i64,
        patch: ScanPatch,
    ) -> ScanResult<(ScanRecord, usize)> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let existing = tx
                .query_row(
                    &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                    params![scan_id],
                    |row| Ok(row_to_scan(row)),
                )
                .optional()?
                .transpose()?;

            let Some(existing) = existing else {
                return Ok(Err(ScanError::NotFound(scan_id)));
            };

            if patch.is_empty() {
                return Ok(Err(ScanError::invalid("No fields to update")));
            }

            let merged = match existing.merged(&patch) {
                Ok(merged) => merged,
                Err(err) => return Ok(Err(err)),
            };

            let changes = tx.execute(
                "UPDATE scans
                 SET qr_data = ?1,
                     latitude = ?2,
                     longitude = ?3,
                     altitude = ?4,
                     accuracy = ?5,
                     timestamp = ?6
                 WHERE id = ?7",
                params![
                    merged.qr_data,
                    merged.latitude,
                    merged.longitude,
                    merged.altitude,
                    merged.accuracy,
                    merged.timestamp,
                    scan_id,
                ],
            )?;

            tx.commit()?;
            Ok(Ok((merged, changes)))
        })
        .await?
    }
}
