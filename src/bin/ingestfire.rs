//! Documentation for the binary is with the definition of `IngestOptionsInit` below.

use chrono::{DateTime, Datelike, Timelike, Utc};
use clap::Parser;
use goesfire::{
    Cluster, ClusterDatabase, ClusterList, Courier, CourierReceiver, CourierSender, Geo,
    GoesFireResult, GranuleHeader, KmlFile, QueryPresent, Satellite, Sector,
};
use log::{debug, error, info, warn, LevelFilter};
use rustc_hash::FxHashMap;
use simple_logger::SimpleLogger;
use std::{
    fmt::{self, Display},
    path::{Path, PathBuf},
    sync::Arc,
    thread::JoinHandle,
};
use strum::IntoEnumIterator;
use walkdir::DirEntry;

/// How many paths may sit between the walker, the filters, and the loaders.
const PATH_QUEUE_CAPACITY: usize = 128;
/// How many decoded granules may wait for the writer. These carry whole pixel lists, keep it low.
const CLUSTER_QUEUE_CAPACITY: usize = 32;
/// The fan out of the filter and loader stages, capped by the number of cores.
const NUM_WORKERS: usize = 4;

/*-------------------------------------------------------------------------------------------------
 *                               Parse Command Line Arguments
 *-----------------------------------------------------------------------------------------------*/
///
/// Find clusters of wildfire pixels and add them to a database.
///
/// This program walks a directory tree of NOAA Big Data GOES Fire Detection Characteristics
/// files, groups the fire pixels of each granule into clusters of connected pixels, and stores
/// the clusters in a database along with the source satellite, scan sector, and scan times. A
/// granule whose clusters are already in the database is skipped, so it is safe to run over the
/// same archive again and again as new data arrives.
///
#[derive(Debug, Parser)]
#[clap(bin_name = "ingestfire")]
#[clap(author, version, about)]
struct IngestOptionsInit {
    /// The path to the cluster database file.
    ///
    /// If this is not specified, then the program will check for it in the "CLUSTER_DB"
    /// environment variable.
    #[clap(short, long)]
    #[clap(env = "CLUSTER_DB")]
    store_file: PathBuf,

    /// The path to the root of the archive of GOES fire detection files.
    ///
    /// If this is not specified, then the program will check for it in the "SAT_ARCHIVE"
    /// environment variable.
    #[clap(short, long)]
    #[clap(env = "SAT_ARCHIVE")]
    archive_dir: PathBuf,

    /// Only try to find data newer than what's already in the database for each satellite and
    /// sector.
    #[clap(short, long)]
    new: bool,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
}

#[derive(Debug)]
struct IngestOptionsChecked {
    /// The path to the database file.
    store_file: PathBuf,

    /// The path to a KML file summarizing this run, next to the database file.
    kml_file: PathBuf,

    /// The path to the archive that will be walked to find new data.
    archive_dir: PathBuf,

    /// Only process data newer than the most recent in the database.
    only_new: bool,

    /// Verbose output
    verbose: bool,
}

impl Display for IngestOptionsChecked {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "\n")?; // yes, two blank lines.
        writeln!(f, "  Database: {}", self.store_file.display())?;
        writeln!(f, "Output KML: {}", self.kml_file.display())?;
        writeln!(f, "   Archive: {}", self.archive_dir.display())?;
        writeln!(f, "  Only New: {}", if self.only_new { "yes" } else { "no" })?;
        writeln!(f, "\n")?; // yes, two blank lines.

        Ok(())
    }
}

/// Get the command line arguments and check them.
///
/// If there is missing data, try to fill it in with environment variables.
fn parse_args() -> GoesFireResult<IngestOptionsChecked> {
    let IngestOptionsInit {
        store_file,
        archive_dir,
        new,
        verbose,
    } = IngestOptionsInit::parse();

    if !archive_dir.is_dir() {
        return Err(format!("archive root is not a directory: {}", archive_dir.display()).into());
    }

    // The sidecar lands right next to the store, e.g. clusters.sqlite.kml
    let mut kml_name = store_file.clone().into_os_string();
    kml_name.push(".kml");
    let kml_file = PathBuf::from(kml_name);

    Ok(IngestOptionsChecked {
        store_file,
        kml_file,
        archive_dir,
        only_new: new,
        verbose,
    })
}

/*-------------------------------------------------------------------------------------------------
 *                                            Main
 *-----------------------------------------------------------------------------------------------*/
fn main() -> GoesFireResult<()> {
    // All times in this program and in the archive layout are UTC.
    std::env::set_var("TZ", "UTC");

    let opts = parse_args()?;

    let level = if opts.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new().with_level(level).init()?;

    if opts.verbose {
        info!(target: "startup", "{}", opts);
    }

    ClusterDatabase::initialize(&opts.store_file)?;

    let config = Arc::new(opts);
    let num_workers = NUM_WORKERS.min(num_cpus::get().max(1));

    // Wire the stages together, registering every endpoint before any thread starts.
    let paths = Courier::new(PATH_QUEUE_CAPACITY);
    let granules = Courier::new(PATH_QUEUE_CAPACITY);
    let clusters = Courier::new(CLUSTER_QUEUE_CAPACITY);

    let walker_tx = paths.register_sender();
    let filter_links: Vec<_> = (0..num_workers)
        .map(|_| (paths.register_receiver(), granules.register_sender()))
        .collect();
    let loader_links: Vec<_> = (0..num_workers)
        .map(|_| (granules.register_receiver(), clusters.register_sender()))
        .collect();
    let writer_rx = clusters.register_receiver();

    drop(paths);
    drop(granules);
    drop(clusters);

    let walker = start_directory_walker(Arc::clone(&config), walker_tx)?;

    let mut filters = Vec::with_capacity(num_workers);
    for (from_walker, to_loader) in filter_links {
        filters.push(start_path_filter(
            Arc::clone(&config),
            from_walker,
            to_loader,
        )?);
    }

    let mut loaders = Vec::with_capacity(num_workers);
    for (from_filter, to_writer) in loader_links {
        loaders.push(start_loader(from_filter, to_writer)?);
    }

    let writer = start_database_writer(Arc::clone(&config), writer_rx)?;

    // Join everything and report a failure only after the pipeline has fully drained.
    let mut num_failed = 0;

    if let Err(err) = walker.join().expect("error joining walker thread") {
        error!(target: "ingest", "directory walker failed - {}", err);
        num_failed += 1;
    }

    for jh in filters {
        if let Err(err) = jh.join().expect("error joining filter thread") {
            error!(target: "ingest", "path filter failed - {}", err);
            num_failed += 1;
        }
    }

    for jh in loaders {
        if let Err(err) = jh.join().expect("error joining loader thread") {
            error!(target: "ingest", "loader failed - {}", err);
            num_failed += 1;
        }
    }

    if let Err(err) = writer.join().expect("error joining writer thread") {
        error!(target: "ingest", "database writer failed - {}", err);
        num_failed += 1;
    }

    if num_failed > 0 {
        Err(format!("{} pipeline stages failed", num_failed).into())
    } else {
        Ok(())
    }
}

/*-------------------------------------------------------------------------------------------------
 *                           Threads - Functions that start threads
 *-----------------------------------------------------------------------------------------------*/
fn start_directory_walker(
    config: Arc<IngestOptionsChecked>,
    to_filter: CourierSender<PathBuf>,
) -> GoesFireResult<JoinHandle<GoesFireResult<()>>> {
    let jh = std::thread::Builder::new()
        .name("ingest-walker".to_owned())
        .spawn(move || {
            // With --new, snapshot the newest scan midpoint per satellite and sector so whole
            // subtrees of the archive can be pruned without touching them.
            let most_recent = if config.only_new {
                let db = ClusterDatabase::connect(&config.store_file)?;

                let mut most_recent = FxHashMap::default();
                for sat in Satellite::iter() {
                    for sector in Sector::iter() {
                        let newest = db.newest_scan_start(sat, sector)?;
                        if config.verbose {
                            info!(target: "walker", "latest {} {} => {}", sat, sector, newest);
                        }
                        most_recent.insert((sat, sector), newest);
                    }
                }

                Some(most_recent)
            } else {
                None
            };

            let entries = walkdir::WalkDir::new(&config.archive_dir)
                .into_iter()
                .filter_entry(move |entry| keep_entry(entry, most_recent.as_ref()))
                // Skip errors silently
                .filter_map(|res| res.ok());

            for entry in entries {
                if !entry.file_type().is_file() {
                    continue;
                }

                debug!(target: "walker", "found: {}", entry.path().display());

                if !to_filter.send(entry.into_path()) {
                    // Every receiver has hung up, there is no one left to work for.
                    break;
                }
            }

            to_filter.done_sending();
            Ok(())
        })?;

    Ok(jh)
}

fn start_path_filter(
    config: Arc<IngestOptionsChecked>,
    from_walker: CourierReceiver<PathBuf>,
    to_loader: CourierSender<PathBuf>,
) -> GoesFireResult<JoinHandle<GoesFireResult<()>>> {
    let jh = std::thread::Builder::new()
        .name("ingest-filter".to_owned())
        .spawn(move || {
            let db = ClusterDatabase::connect(&config.store_file)?;
            let mut present_query = db.prepare_to_query_present()?;

            for path in &from_walker {
                let header = match ingestible_header(&path) {
                    Some(header) => header,
                    None => {
                        debug!(target: "filter", "not a granule: {}", path.display());
                        continue;
                    }
                };

                if already_present(&header, &mut present_query) {
                    debug!(target: "filter", "already in store: {}", path.display());
                    continue;
                }

                if config.verbose {
                    info!(target: "filter", "processing: {}", path.display());
                }

                if !to_loader.send(path) {
                    break;
                }
            }

            from_walker.done_receiving();
            to_loader.done_sending();
            Ok(())
        })?;

    Ok(jh)
}

fn start_loader(
    from_filter: CourierReceiver<PathBuf>,
    to_writer: CourierSender<ClusterList>,
) -> GoesFireResult<JoinHandle<GoesFireResult<()>>> {
    let jh = std::thread::Builder::new()
        .name("ingest-loader".to_owned())
        .spawn(move || {
            for path in &from_filter {
                match ClusterList::from_file(&path) {
                    Ok(clusters) => {
                        if let Some(err) = clusters.error() {
                            warn!(target: "loader", "error decoding {} - {}", path.display(), err);
                        }

                        // Only keep clusters with at least one pixel the fire characterization
                        // algorithms were reasonably sure about.
                        let clusters =
                            clusters.filter_clusters(|c| c.has_confident_fire_pixel());

                        if !to_writer.send(clusters) {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(target: "loader", "skipping {} - {}", path.display(), err);
                    }
                }
            }

            from_filter.done_receiving();
            to_writer.done_sending();
            Ok(())
        })?;

    Ok(jh)
}

fn start_database_writer(
    config: Arc<IngestOptionsChecked>,
    from_loader: CourierReceiver<ClusterList>,
) -> GoesFireResult<JoinHandle<GoesFireResult<()>>> {
    let jh = std::thread::Builder::new()
        .name("ingest-writer".to_owned())
        .spawn(move || {
            let db = ClusterDatabase::connect(&config.store_file)?;
            let mut add_stmt = db.prepare_to_add_clusters()?;

            let mut cluster_stats = ClusterStats::new();
            let mut granule_stats = GranuleStats::new();
            let mut num_inserted = 0_usize;

            for clusters in &from_loader {
                // Error marked lists identify granules that failed to decode. The loader already
                // logged them, they must not touch the store.
                if clusters.error().is_some() {
                    continue;
                }

                let tag = GranuleTag {
                    satellite: clusters.satellite(),
                    sector: clusters.sector(),
                    scan_start: clusters.scan_start(),
                    scan_end: clusters.scan_end(),
                };

                granule_stats = granule_stats.update(tag, &clusters);
                for cluster in clusters.clusters() {
                    cluster_stats = cluster_stats.update(tag, cluster);
                }

                match add_stmt.add(clusters) {
                    Ok(n) => num_inserted += n,
                    // The transaction was rolled back, following granules are unaffected.
                    Err(err) => {
                        error!(target: "writer", "error adding clusters to the store - {}", err)
                    }
                }
            }

            from_loader.done_receiving();

            db.record_ingest_completed(Utc::now())?;

            info!(target: "summary", "{} new clusters added to the store", num_inserted);
            println!("{}", cluster_stats);
            println!("{}", granule_stats);

            if let Err(err) = save_biggest_cluster_kml(&config.kml_file, &cluster_stats) {
                warn!(target: "summary", "unable to write KML summary - {}", err);
            }

            Ok(())
        })?;

    Ok(jh)
}

/*-------------------------------------------------------------------------------------------------
 *                         Filters for skipping files / directories
 *-----------------------------------------------------------------------------------------------*/
/// The walker's pruning predicate. Files always pass, they are judged by the path filter stage.
fn keep_entry(
    entry: &DirEntry,
    most_recent: Option<&FxHashMap<(Satellite, Sector), DateTime<Utc>>>,
) -> bool {
    if entry.file_type().is_dir() {
        match most_recent {
            Some(most_recent) => !dir_is_too_old(&entry.path().to_string_lossy(), most_recent),
            None => true,
        }
    } else {
        true
    }
}

/// Decide if a directory can only contain granules older than the newest already in the store.
///
/// This assumes the data is stored in a directory tree like
/// `SATELLITE/SECTOR/YEAR/DAY_OF_YEAR/HOUR/files`, e.g. `G16/ABI-L2-FDCF/2020/238/15/...`. While
/// any of the levels is still undetermined the answer is to keep recursing.
fn dir_is_too_old(path: &str, most_recent: &FxHashMap<(Satellite, Sector), DateTime<Utc>>) -> bool {
    let satellite = match Satellite::string_contains_satellite(path) {
        Some(satellite) => satellite,
        None => return false,
    };

    let sector = match Sector::string_contains_sector(path) {
        Some(sector) => sector,
        None => return false,
    };

    let newest = match most_recent.get(&(satellite, sector)) {
        Some(newest) => newest,
        None => return false,
    };

    let mr_year = newest.year();
    let mr_doy = newest.ordinal() as i32;
    let mr_hour = newest.hour() as i32;

    // Pick the year, the day of the year, and the hour out of the path components.
    let mut year = None;
    let mut doy = None;
    let mut hour = None;
    for component in path.split('/') {
        if let Ok(value) = component.parse::<i32>() {
            if year.is_none() {
                if value > 2000 {
                    year = Some(value);
                }
            } else if doy.is_none() {
                doy = Some(value);
            } else {
                hour = Some(value);
                break;
            }
        }
    }

    match (year, doy, hour) {
        (Some(year), _, _) if year < mr_year => true,
        (Some(year), Some(doy), _) if year == mr_year && doy < mr_doy => true,
        (Some(year), Some(doy), Some(hour))
            if year == mr_year && doy == mr_doy && hour < mr_hour =>
        {
            true
        }
        _ => false,
    }
}

/// The static part of the path filter.
///
/// Only plain NetCDF granules with a parseable name make it through, and the meso sectors are
/// dropped since they are never processed.
fn ingestible_header(path: &Path) -> Option<GranuleHeader> {
    let is_netcdf = path.extension().map(|ext| ext == "nc").unwrap_or(false);
    if !is_netcdf {
        return None;
    }

    let fname = path.file_name()?.to_string_lossy();
    let header = GranuleHeader::parse_from_file_name(&fname)?;

    if header.sector.is_meso() {
        return None;
    }

    Some(header)
}

/// Ask the store whether this granule was already processed.
///
/// A query error is logged and treated as "not present" so a broken check degrades to redundant
/// work instead of lost data; the uniqueness index makes the replay harmless.
fn already_present(header: &GranuleHeader, present_query: &mut QueryPresent) -> bool {
    match present_query.count_present(
        header.satellite,
        header.sector,
        header.scan_start,
        header.scan_end,
    ) {
        Ok(num_rows) => num_rows > 0,
        Err(err) => {
            warn!(target: "filter", "error querying the store - {}, processing anyway", err);
            false
        }
    }
}

/*-------------------------------------------------------------------------------------------------
 *                               Cluster and Granule Statistics
 *-----------------------------------------------------------------------------------------------*/
/// The granule a statistic came from.
#[derive(Debug, Clone, Copy)]
struct GranuleTag {
    satellite: Satellite,
    sector: Sector,
    scan_start: DateTime<Utc>,
    scan_end: DateTime<Utc>,
}

impl Display for GranuleTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "      satellite: {}", self.satellite)?;
        writeln!(f, "         sector: {}", self.sector)?;
        writeln!(f, "          start: {}", self.scan_start)?;
        writeln!(f, "            end: {}", self.scan_end)
    }
}

/// Statistics about the individual clusters processed during a run.
struct ClusterStats {
    /// The most powerful single cluster seen, with the granule it came from.
    most_powerful: Option<(GranuleTag, Cluster)>,
    num_clusters: u64,
    num_power_lt_1mw: u64,
    num_power_lt_10mw: u64,
}

impl ClusterStats {
    fn new() -> Self {
        ClusterStats {
            most_powerful: None,
            num_clusters: 0,
            num_power_lt_1mw: 0,
            num_power_lt_10mw: 0,
        }
    }

    /// Fold one cluster into the statistics.
    fn update(mut self, tag: GranuleTag, cluster: &Cluster) -> Self {
        let power = cluster.total_power();

        let new_biggest = match &self.most_powerful {
            Some((_, biggest)) => power > biggest.total_power(),
            None => true,
        };
        if new_biggest {
            self.most_powerful = Some((tag, cluster.clone()));
        }

        if power < 1.0 {
            self.num_power_lt_1mw += 1;
        }
        if power < 10.0 {
            self.num_power_lt_10mw += 1;
        }
        self.num_clusters += 1;

        self
    }
}

impl Display for ClusterStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        let (tag, biggest) = match &self.most_powerful {
            Some((tag, biggest)) => (tag, biggest),
            None => return writeln!(f, "\nNo new clusters added to the database."),
        };

        let centroid = biggest.centroid();

        writeln!(f, "\nIndividual Cluster Stats\n")?;
        writeln!(f, " Most Powerful:")?;
        write!(f, "{}", tag)?;
        writeln!(f, "            Lat: {:10.6}", centroid.lat)?;
        writeln!(f, "            Lon: {:11.6}", centroid.lon)?;
        writeln!(f, "          Count: {:2}", biggest.pixel_count())?;
        writeln!(f, "          Power: {:5.0} MW", biggest.total_power())?;
        writeln!(f, "\n        Counts:")?;
        writeln!(f, "         Total: {:10}", self.num_clusters)?;
        writeln!(f, "Power <  1 MW: {:10}", self.num_power_lt_1mw)?;
        writeln!(f, "Power < 10 MW: {:10}", self.num_power_lt_10mw)?;
        writeln!(
            f,
            "  Pct <  1 MW: {:9}%",
            self.num_power_lt_1mw * 100 / self.num_clusters
        )?;
        writeln!(
            f,
            "  Pct < 10 MW: {:9}%",
            self.num_power_lt_10mw * 100 / self.num_clusters
        )
    }
}

/// Statistics about whole granules processed during a run.
struct GranuleStats {
    max_total_power: Option<(GranuleTag, f64)>,
    min_total_power: Option<(GranuleTag, f64)>,
    max_num_clusters: Option<(GranuleTag, usize)>,
    min_num_clusters: Option<(GranuleTag, usize)>,
}

impl GranuleStats {
    fn new() -> Self {
        GranuleStats {
            max_total_power: None,
            min_total_power: None,
            max_num_clusters: None,
            min_num_clusters: None,
        }
    }

    /// Fold one granule's cluster list into the statistics.
    fn update(mut self, tag: GranuleTag, clusters: &ClusterList) -> Self {
        let total_power = clusters.total_power();
        let num_clusters = clusters.len();

        if self
            .max_total_power
            .map(|(_, power)| total_power > power)
            .unwrap_or(true)
        {
            self.max_total_power = Some((tag, total_power));
        }

        if self
            .min_total_power
            .map(|(_, power)| total_power < power)
            .unwrap_or(true)
        {
            self.min_total_power = Some((tag, total_power));
        }

        if self
            .max_num_clusters
            .map(|(_, num)| num_clusters > num)
            .unwrap_or(true)
        {
            self.max_num_clusters = Some((tag, num_clusters));
        }

        if self
            .min_num_clusters
            .map(|(_, num)| num_clusters < num)
            .unwrap_or(true)
        {
            self.min_num_clusters = Some((tag, num_clusters));
        }

        self
    }
}

impl Display for GranuleStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        if let Some((tag, power)) = &self.max_total_power {
            writeln!(f, "\nMax Granule Power Stats:")?;
            write!(f, "{}", tag)?;
            writeln!(f, "Max Total Power: {:.0} MW", power)?;
        }

        if let Some((tag, power)) = &self.min_total_power {
            writeln!(f, "\nMin Granule Power Stats:")?;
            write!(f, "{}", tag)?;
            writeln!(f, "Min Total Power: {:.0} MW", power)?;
        }

        if let Some((tag, num)) = &self.max_num_clusters {
            writeln!(f, "\nMax Granule Number of Clusters:")?;
            write!(f, "{}", tag)?;
            writeln!(f, " Total Clusters: {}", num)?;
        }

        if let Some((tag, num)) = &self.min_num_clusters {
            writeln!(f, "\nMin Granule Number of Clusters:")?;
            write!(f, "{}", tag)?;
            writeln!(f, " Total Clusters: {}", num)?;
        }

        Ok(())
    }
}

/*-------------------------------------------------------------------------------------------------
 *                             Save the biggest cluster as KML
 *-----------------------------------------------------------------------------------------------*/
fn save_biggest_cluster_kml(kml_file: &Path, stats: &ClusterStats) -> GoesFireResult<()> {
    // Nothing processed, nothing to show.
    let (tag, cluster) = match &stats.most_powerful {
        Some((tag, cluster)) => (tag, cluster),
        None => return Ok(()),
    };

    let mut kml = KmlFile::create(kml_file)?;

    kml.polygon_style(
        "fire",
        "880000FF",
        Some("http://maps.google.com/mapfiles/kml/shapes/firedept.png"),
        1.3,
    )?;

    kml.open_folder("Most Powerful Fire", true)?;
    kml.time_span(tag.scan_start, tag.scan_end)?;

    let description = format!(
        concat!(
            "Satellite: {}<br/>",
            "Sector: {}<br/>",
            "Power: {:.0} MW<br/>",
            "Area: {:.2} km^2<br/>",
            "Max Temperature: {:.0} &deg;K"
        ),
        tag.satellite,
        tag.sector,
        cluster.total_power(),
        cluster.total_area(),
        cluster.max_temperature()
    );

    kml.open_placemark(Some("Most Powerful Fire"), Some(&description), Some("#fire"))?;
    kml.point(cluster.centroid())?;
    kml.close_placemark()?;

    cluster.pixels().kml_write(&mut kml)?;

    kml.close_folder()?;

    Ok(())
}

/*-------------------------------------------------------------------------------------------------
 *                                           Tests
 *-----------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod test {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn most_recent_map() -> FxHashMap<(Satellite, Sector), DateTime<Utc>> {
        // Newest stored data for G16 CONUS is 2020, day of year 238, hour 15.
        let date = NaiveDate::from_yo_opt(2020, 238)
            .and_then(|d| d.and_hms_opt(15, 4, 30))
            .unwrap();

        let mut most_recent = FxHashMap::default();
        most_recent.insert(
            (Satellite::G16, Sector::Conus),
            Utc.from_utc_datetime(&date),
        );
        most_recent
    }

    #[test]
    fn directories_older_than_the_store_are_pruned() {
        let most_recent = most_recent_map();

        // Earlier years, days, and hours are all pruned.
        assert!(dir_is_too_old("G16/ABI-L2-FDCC/2019", &most_recent));
        assert!(dir_is_too_old("G16/ABI-L2-FDCC/2019/300", &most_recent));
        assert!(dir_is_too_old("G16/ABI-L2-FDCC/2020/237", &most_recent));
        assert!(dir_is_too_old("G16/ABI-L2-FDCC/2020/237/23", &most_recent));
        assert!(dir_is_too_old("G16/ABI-L2-FDCC/2020/238/14", &most_recent));

        // The newest hour and anything after it survives.
        assert!(!dir_is_too_old("G16/ABI-L2-FDCC/2020/238/15", &most_recent));
        assert!(!dir_is_too_old("G16/ABI-L2-FDCC/2020/238/16", &most_recent));
        assert!(!dir_is_too_old("G16/ABI-L2-FDCC/2020/239/00", &most_recent));
        assert!(!dir_is_too_old("G16/ABI-L2-FDCC/2021/001/00", &most_recent));
    }

    #[test]
    fn undetermined_depth_always_recurses() {
        let most_recent = most_recent_map();

        assert!(!dir_is_too_old("G16", &most_recent));
        assert!(!dir_is_too_old("G16/ABI-L2-FDCC", &most_recent));
        assert!(!dir_is_too_old("G16/ABI-L2-FDCC/2020", &most_recent));
        assert!(!dir_is_too_old("G16/ABI-L2-FDCC/2020/238", &most_recent));
    }

    #[test]
    fn other_satellites_and_sectors_are_not_pruned() {
        let most_recent = most_recent_map();

        // No entry for these pairs in the snapshot, so nothing can be skipped.
        assert!(!dir_is_too_old("G17/ABI-L2-FDCC/2019/001", &most_recent));
        assert!(!dir_is_too_old("G16/ABI-L2-FDCF/2019/001", &most_recent));
    }

    #[test]
    fn only_nc_granules_from_disk_sectors_are_ingestible() {
        assert!(ingestible_header(Path::new(
            "G16/ABI-L2-FDCC/2020/238/15/OR_ABI-L2-FDCC-M6_G16_s20202381501123_e20202381503496_c20202381504051.nc"
        ))
        .is_some());

        // Wrong extension.
        assert!(ingestible_header(Path::new(
            "OR_ABI-L2-FDCC-M6_G16_s20202381501123_e20202381503496_c20202381504051.nc.txt"
        ))
        .is_none());

        // Meso sectors are skipped.
        assert!(ingestible_header(Path::new(
            "OR_ABI-L2-FDCM1-M6_G16_s20202381501123_e20202381503496_c20202381504051.nc"
        ))
        .is_none());

        // Not parseable at all.
        assert!(ingestible_header(Path::new("README.md")).is_none());
    }
}
