/*!
 * Find clusters of wildfire pixels in GOES fire detection data.
 *
 * This library walks archives of NOAA Big Data Fire Detection Characteristics granules, groups
 * the fire pixels of each granule into spatially connected clusters, and stores the clusters in
 * a SQLite database. A separate program connects those clusters through time into fire records
 * using the same database.
 */

// Public API
pub use cluster::{Cluster, ClusterList, ADJACENCY_EPS};
pub use courier::{Courier, CourierReceiver, CourierSender};
pub use database::{AddClusters, ClusterDatabase, ClusterRow, QueryClusters, QueryPresent};
pub use geo::{great_circle_distance, BoundingBox, Coord, Geo};
pub use kml::KmlFile;
pub use pixel::{Pixel, PixelList};
pub use raster::{GoesRaster, GranuleReader};
pub use satellite::{GranuleHeader, MaskCode, Satellite, Sector};

/// A generic error type.
pub type GoesFireError = Box<dyn Error + Send + Sync>;

/// A generic result type.
pub type GoesFireResult<T> = Result<T, GoesFireError>;

// Private API
mod cluster;
mod courier;
mod database;
mod geo;
mod kml;
mod pixel;
mod raster;
mod satellite;

use std::error::Error;
