/*!
 * The SQLite store for clusters.
 *
 * One self contained database file holds every cluster found by ingestion plus the fires and
 * associations tables that the temporal connection pass fills in later. The schema is created on
 * first connect and every statement that matters for the ingestion hot path is prepared once per
 * connection.
 *
 * Every insert is idempotent thanks to a uniqueness index over the granule signature and cluster
 * centroid, so re-running ingestion over an archive that is already in the store adds nothing.
 */

use crate::{
    cluster::ClusterList,
    geo::{BoundingBox, Coord, Geo},
    pixel::PixelList,
    satellite::{Satellite, Sector},
    GoesFireResult,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, OpenFlags, ToSql};
use std::path::Path;

/// A connection to the database where all the cluster information is stored.
pub struct ClusterDatabase {
    conn: Connection,
}

impl ClusterDatabase {
    /// Initialize a database.
    ///
    /// Initialize a database to make sure it exists and is set up properly. This should be run in
    /// the main thread before any other threads open a connection to the database to ensure
    /// consistency.
    pub fn initialize<P: AsRef<Path>>(path: P) -> GoesFireResult<()> {
        let path = path.as_ref();

        let _conn = Self::open_database_to_write(path)?;
        Ok(())
    }

    /// Open a connection to the database.
    pub fn connect<P: AsRef<Path>>(path: P) -> GoesFireResult<Self> {
        let path = path.as_ref();

        let conn = Self::open_database_to_write(path)?;
        Ok(ClusterDatabase { conn })
    }

    fn open_database_to_write(path: &Path) -> GoesFireResult<Connection> {
        let conn = rusqlite::Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        // A 5-second busy time out is WAY too much. If we hit this something has gone terribly wrong.
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        const QUERY: &str = include_str!("database/create_cluster_db.sql");
        conn.execute_batch(QUERY)?;

        Ok(conn)
    }

    /// Find the latest scan midpoint in the database for this satellite and sector.
    ///
    /// Returns the epoch if the store holds nothing for the pair, so a comparison against it can
    /// always be made.
    pub fn newest_scan_start(
        &self,
        satellite: Satellite,
        sector: Sector,
    ) -> GoesFireResult<DateTime<Utc>> {
        const QUERY: &str = include_str!("database/query_newest_cluster.sql");
        let mut stmt = self.conn.prepare(QUERY)?;

        let res: DateTime<Utc> = stmt.query_row([satellite.name(), sector.name()], |row| {
            let timestamp: i64 = row.get(0)?;
            let naive = NaiveDateTime::from_timestamp(timestamp, 0);
            Ok(DateTime::<Utc>::from_utc(naive, Utc))
        })?;

        Ok(res)
    }

    /// Record that an ingestion run finished. The value is a unix timestamp.
    pub fn record_ingest_completed(&self, completed: DateTime<Utc>) -> GoesFireResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (item_name, item_value) VALUES ('last_ingest_completed', ?)",
            [completed.timestamp()],
        )?;

        Ok(())
    }

    /// Prepare to add cluster lists to the database.
    pub fn prepare_to_add_clusters(&self) -> GoesFireResult<AddClusters> {
        const QUERY: &str = include_str!("database/add_cluster.sql");

        let add_stmt = self.conn.prepare(QUERY)?;

        Ok(AddClusters {
            add_stmt,
            conn: &self.conn,
        })
    }

    /// Prepare to query whether a granule's clusters are already in the database.
    pub fn prepare_to_query_present(&self) -> GoesFireResult<QueryPresent> {
        const QUERY: &str = include_str!("database/query_num_clusters_present.sql");

        let stmt = self.conn.prepare(QUERY)?;

        Ok(QueryPresent { stmt })
    }

    /// Query clusters from the database.
    ///
    /// This is the streaming read used by the temporal connection pass. Passing `None` for the
    /// satellite or sector matches all of them.
    pub fn query_clusters(
        &self,
        sat: Option<Satellite>,
        sector: Option<Sector>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        area: BoundingBox,
    ) -> GoesFireResult<QueryClusters<'_>> {
        let sat_select = if let Some(sat) = sat {
            format!("AND satellite = '{}'", sat.name())
        } else {
            String::new()
        };

        let sector_select = if let Some(sector) = sector {
            format!("AND sector = '{}'", sector.name())
        } else {
            String::new()
        };

        let query = &format!(
            r#"SELECT
                 rowid,
                 satellite,
                 sector,
                 mid_point_time,
                 lat,
                 lon,
                 power,
                 cell_count,
                 perimeter
               FROM clusters
               WHERE
                 mid_point_time >= {} AND
                 mid_point_time <= {} AND
                 lat >= {} AND lat <= {} AND
                 lon >= {} AND lon <= {} {} {}
               ORDER BY mid_point_time ASC"#,
            start.timestamp(),
            end.timestamp(),
            area.ll.lat,
            area.ur.lat,
            area.ll.lon,
            area.ur.lon,
            sat_select,
            sector_select
        );

        let stmt = self.conn.prepare(query)?;

        Ok(QueryClusters { stmt })
    }
}

/// A prepared statement handle for adding clusters. Owned by the single writer thread.
pub struct AddClusters<'a> {
    add_stmt: rusqlite::Statement<'a>,
    conn: &'a Connection,
}

impl<'a> AddClusters<'a> {
    /// Add an entire ClusterList to the database in one transaction.
    ///
    /// Returns the number of rows actually inserted. Clusters already present are silently
    /// skipped by the uniqueness index, so replaying a granule returns zero.
    pub fn add(&mut self, clist: ClusterList) -> GoesFireResult<usize> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;

        match self.add_all_clusters(clist) {
            Ok(num_inserted) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(num_inserted)
            }
            Err(err) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(err)
            }
        }
    }

    fn add_all_clusters(&mut self, clist: ClusterList) -> GoesFireResult<usize> {
        let satellite = clist.satellite();
        let sector = clist.sector();
        let mid_point = clist.mid_point().timestamp();

        let mut num_inserted = 0;
        for cluster in clist.take_clusters().into_iter() {
            let Coord { lat, lon } = cluster.centroid();
            let power = cluster.total_power();
            let cell_count = cluster.pixel_count() as i64;
            let perimeter = cluster.pixels().binary_serialize();

            num_inserted += self.add_stmt.execute([
                &satellite.name() as &dyn ToSql,
                &sector.name(),
                &mid_point,
                &lat,
                &lon,
                &power,
                &cell_count,
                &perimeter,
            ])?;
        }

        Ok(num_inserted)
    }
}

/// A prepared statement handle for the "have we already processed this granule" check.
pub struct QueryPresent<'a> {
    stmt: rusqlite::Statement<'a>,
}

impl<'a> QueryPresent<'a> {
    /// Count the rows already stored for this granule signature. More than zero means skip it.
    pub fn count_present(
        &mut self,
        satellite: Satellite,
        sector: Sector,
        scan_start: DateTime<Utc>,
        scan_end: DateTime<Utc>,
    ) -> GoesFireResult<i64> {
        let mid_point = (scan_start + (scan_end - scan_start) / 2).timestamp();

        let num_rows: i64 = self.stmt.query_row(
            [
                &satellite.name() as &dyn ToSql,
                &sector.name(),
                &mid_point,
            ],
            |row| row.get(0),
        )?;

        Ok(num_rows)
    }
}

/// A prepared query for streaming cluster rows back out of the database.
pub struct QueryClusters<'a> {
    stmt: rusqlite::Statement<'a>,
}

impl<'a> QueryClusters<'a> {
    /// Get an iterator over the matching rows.
    pub fn rows(&mut self) -> GoesFireResult<impl Iterator<Item = GoesFireResult<ClusterRow>> + '_> {
        Ok(self.stmt.query_and_then([], query_row_to_cluster_row)?)
    }
}

/// All the data about a cluster retrieved from the database.
#[derive(Debug, Clone)]
pub struct ClusterRow {
    pub rowid: i64,
    pub satellite: Satellite,
    pub sector: Sector,
    pub mid_point: DateTime<Utc>,
    pub centroid: Coord,
    pub power: f64,
    pub cell_count: i64,
    pub perimeter: PixelList,
}

fn query_row_to_cluster_row(row: &rusqlite::Row) -> GoesFireResult<ClusterRow> {
    let rowid: i64 = row.get(0)?;

    let satellite = match row.get_ref(1)? {
        rusqlite::types::ValueRef::Text(txt) => {
            let txt = String::from_utf8_lossy(txt);
            Satellite::string_contains_satellite(&txt).ok_or("invalid satellite")
        }
        _ => Err("satellite not text"),
    }?;

    let sector = match row.get_ref(2)? {
        rusqlite::types::ValueRef::Text(txt) => {
            let txt = String::from_utf8_lossy(txt);
            Sector::string_contains_sector(&txt).ok_or("invalid sector")
        }
        _ => Err("sector not text"),
    }?;

    let mid_point: DateTime<Utc> =
        DateTime::from_utc(NaiveDateTime::from_timestamp(row.get(3)?, 0), Utc);

    let lat: f64 = row.get(4)?;
    let lon: f64 = row.get(5)?;
    let centroid = Coord { lat, lon };

    let power: f64 = row.get(6)?;
    let cell_count: i64 = row.get(7)?;

    let perimeter = match row.get_ref(8)? {
        rusqlite::types::ValueRef::Blob(bytes) => PixelList::binary_deserialize(bytes),
        _ => Err("invalid type in perimeter column".into()),
    }?;

    Ok(ClusterRow {
        rowid,
        satellite,
        sector,
        mid_point,
        centroid,
        power,
        cell_count,
        perimeter,
    })
}
