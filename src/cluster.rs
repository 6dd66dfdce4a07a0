/*!
 * Types and functions for working with clusters.
 *
 * A cluster is a maximal group of fire pixels from a single satellite scan that are connected by
 * overlap or shared edges. The cluster engine here is the heart of the ingestion pipeline.
 */

use crate::{
    geo::{BoundingBox, Coord, Geo},
    pixel::{Pixel, PixelList},
    raster::{GoesRaster, GranuleReader},
    satellite::{GranuleHeader, MaskCode, Satellite, Sector},
    GoesFireResult,
};
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use std::path::Path;

/// The distance in degrees used when comparing pixel corner coordinates during clustering.
///
/// Pixels from one granule live on a common grid, so matching corners only differ by projection
/// round-off. This is roughly a meter on the ground, four orders of magnitude under a cell width.
pub const ADJACENCY_EPS: f64 = 1.0e-5;

/**
 * The aggregate properties of a connected group of fire pixels.
 */
#[derive(Debug, Clone)]
pub struct Cluster {
    /// The pixels that make up this cluster, which serve as its perimeter in the database.
    pixels: PixelList,
    /// Total (sum) of the fire power of the pixels in megawatts.
    power: f64,
    /// Power weighted centroid of the member pixel centroids.
    centroid: Coord,
    /// The smallest box containing every member pixel.
    bbox: BoundingBox,
}

impl Cluster {
    /// Build a cluster from its member pixels, computing the cached aggregates.
    pub fn from_pixels(pixels: PixelList) -> Self {
        debug_assert!(!pixels.is_empty());

        let power = pixels.total_power();
        let centroid = pixels.centroid();
        let bbox = pixels.bounding_box();

        Cluster {
            pixels,
            power,
            centroid,
            bbox,
        }
    }

    /**
     * Group fire pixels into clusters.
     *
     * Pixels that overlap or share an edge are grouped into clusters where each pixel is
     * transitively connected to every other pixel in its cluster. The grouping is a union-find
     * over all pairs; the pair test rejects on bounding boxes before doing any real geometry, so
     * the quadratic pass stays cheap for the sparse fire fields a granule actually contains.
     *
     * Pixels without positive fire power are discarded before grouping.
     */
    pub fn from_fire_pixels(pixels: Vec<Pixel>, eps: f64) -> Vec<Self> {
        let pixels: Vec<Pixel> = pixels.into_iter().filter(|p| p.power > 0.0).collect();

        // Union-find with path halving. Every pixel starts as its own set.
        let mut parent: Vec<usize> = (0..pixels.len()).collect();

        fn find_root(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        for i in 0..pixels.len() {
            for j in (i + 1)..pixels.len() {
                let root_i = find_root(&mut parent, i);
                let root_j = find_root(&mut parent, j);
                if root_i == root_j {
                    continue;
                }

                if pixels[i].is_adjacent_to_or_overlaps(&pixels[j], eps) {
                    parent[root_j] = root_i;
                }
            }
        }

        // Materialize the equivalence classes.
        let mut groups: FxHashMap<usize, PixelList> = FxHashMap::default();
        for (i, pixel) in pixels.iter().enumerate() {
            let root = find_root(&mut parent, i);
            groups
                .entry(root)
                .or_insert_with(PixelList::new)
                .push(*pixel);
        }

        groups.into_values().map(Cluster::from_pixels).collect()
    }

    /// Total fire power of the cluster, megawatts.
    pub fn total_power(&self) -> f64 {
        self.power
    }

    /// Total fire area of the cluster, square kilometers.
    pub fn total_area(&self) -> f64 {
        self.pixels.total_area()
    }

    /// The hottest fire temperature of any member pixel, Kelvin.
    pub fn max_temperature(&self) -> f64 {
        self.pixels.max_temperature()
    }

    /// The number of member pixels.
    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Get access to the member pixels.
    pub fn pixels(&self) -> &PixelList {
        &self.pixels
    }

    /// Does any member pixel carry one of the confident fire detection mask codes?
    pub fn has_confident_fire_pixel(&self) -> bool {
        self.pixels
            .iter()
            .any(|p| MaskCode(p.mask_flag).is_confident_fire())
    }
}

impl Geo for Cluster {
    fn centroid(&self) -> Coord {
        self.centroid
    }

    fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }
}

/**
 * The clusters from one granule, tagged with the granule's identifying metadata.
 *
 * If the granule could not be decoded the error member holds a message and there are no
 * clusters; downstream stages drop such a list without touching the store.
 */
#[derive(Debug)]
pub struct ClusterList {
    satellite: Satellite,
    sector: Sector,
    /// Start time of the scan.
    scan_start: DateTime<Utc>,
    /// End time of the scan.
    scan_end: DateTime<Utc>,
    clusters: Vec<Cluster>,
    error: Option<String>,
}

impl ClusterList {
    /// Analyze a granule file and return its clusters along with the file metadata.
    ///
    /// A file whose name cannot be parsed is a hard error. A file that parses but cannot be
    /// decoded produces an error-marked list so the failure can flow through the pipeline with
    /// its granule identification intact.
    pub fn from_file<P: AsRef<Path>>(path: P) -> GoesFireResult<Self> {
        let path = path.as_ref();

        let fname = path
            .file_name()
            .map(|f| f.to_string_lossy())
            .ok_or_else(|| format!("path has no file name: {}", path.display()))?;

        let header = GranuleHeader::parse_from_file_name(&fname)
            .ok_or_else(|| format!("unrecognized granule file name: {}", fname))?;

        match GoesRaster::open(path, header) {
            Ok(raster) => Ok(Self::from_granule(&raster)),
            Err(err) => Ok(Self::new_error(header, err.to_string())),
        }
    }

    /// Run the cluster engine over the fire pixels of an already opened granule.
    pub fn from_granule<R: GranuleReader>(reader: &R) -> Self {
        let header = reader.header();

        match reader.fire_pixels() {
            Ok(pixels) => ClusterList {
                satellite: header.satellite,
                sector: header.sector,
                scan_start: header.scan_start,
                scan_end: header.scan_end,
                clusters: Cluster::from_fire_pixels(pixels, ADJACENCY_EPS),
                error: None,
            },
            Err(err) => Self::new_error(header, err.to_string()),
        }
    }

    /// Create an empty, error-marked list for a granule that failed to decode.
    pub fn new_error(header: GranuleHeader, message: String) -> Self {
        ClusterList {
            satellite: header.satellite,
            sector: header.sector,
            scan_start: header.scan_start,
            scan_end: header.scan_end,
            clusters: Vec::new(),
            error: Some(message),
        }
    }

    pub fn satellite(&self) -> Satellite {
        self.satellite
    }

    pub fn sector(&self) -> Sector {
        self.sector
    }

    pub fn scan_start(&self) -> DateTime<Utc> {
        self.scan_start
    }

    pub fn scan_end(&self) -> DateTime<Utc> {
        self.scan_end
    }

    /// The scan midpoint, the time stamp clusters are stored under.
    pub fn mid_point(&self) -> DateTime<Utc> {
        self.scan_start + (self.scan_end - self.scan_start) / 2
    }

    /// The decode error, if this list is just a marker for a failed granule.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Consume the list, returning the clusters.
    pub fn take_clusters(self) -> Vec<Cluster> {
        self.clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Total power of all the clusters in the list, megawatts.
    pub fn total_power(&self) -> f64 {
        self.clusters.iter().map(Cluster::total_power).sum()
    }

    /// Keep only the clusters satisfying the predicate.
    pub fn filter_clusters<F: FnMut(&Cluster) -> bool>(mut self, predicate: F) -> Self {
        self.clusters.retain(predicate);
        self
    }
}
