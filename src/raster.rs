/*!
 * Decode fire detection granules into geo-referenced pixels.
 *
 * The only format handled today is the NOAA Big Data NetCDF granule on the geostationary grid,
 * read through GDAL. The loader consumes the data through the [GranuleReader] capability so the
 * cluster engine never sees the raster plumbing and other formats can slot in later.
 */

use crate::{
    geo::Coord,
    pixel::Pixel,
    satellite::GranuleHeader,
    GoesFireResult,
};
use gdal::{
    raster::Buffer,
    spatial_ref::{CoordTransform, SpatialRef},
    Dataset,
};
use std::path::{Path, PathBuf};

/// What the cluster engine needs from an opened granule.
pub trait GranuleReader {
    /// The identifying metadata of the granule.
    fn header(&self) -> GranuleHeader;

    /// Every pixel with positive fire power, with its corner footprint reconstructed.
    fn fire_pixels(&self) -> GoesFireResult<Vec<Pixel>>;
}

/// A GOES fire detection granule opened through GDAL.
pub struct GoesRaster {
    power: Dataset,
    temperature: Dataset,
    area: Dataset,
    mask: Dataset,
    header: GranuleHeader,
}

impl GoesRaster {
    /// Open the granule at `path`.
    ///
    /// The file must carry the `.nc` extension and must not be a meso-sector granule. The scan
    /// times, satellite, and sector all come from the already parsed file name, never from the
    /// raster metadata.
    pub fn open<P: AsRef<Path>>(path: P, header: GranuleHeader) -> GoesFireResult<Self> {
        let path = path.as_ref();

        if header.sector.is_meso() {
            return Err(format!("meso sector granules are skipped: {}", path.display()).into());
        }

        let is_netcdf = path.extension().map(|ext| ext == "nc").unwrap_or(false);
        if !is_netcdf {
            return Err(format!("not a NetCDF granule: {}", path.display()).into());
        }

        if !path.is_file() {
            return Err(format!("path is not a file: {}", path.display()).into());
        }

        let power = Self::open_sub_dataset(path, "Power")?;
        let temperature = Self::open_sub_dataset(path, "Temp")?;
        let area = Self::open_sub_dataset(path, "Area")?;
        let mask = Self::open_sub_dataset(path, "Mask")?;

        Ok(GoesRaster {
            power,
            temperature,
            area,
            mask,
            header,
        })
    }

    fn open_sub_dataset(path: &Path, variable: &str) -> GoesFireResult<Dataset> {
        let open_path = PathBuf::from(format!("NETCDF:\"{}\":{}", path.display(), variable));
        Ok(Dataset::open(&open_path)?)
    }
}

impl GranuleReader for GoesRaster {
    fn header(&self) -> GranuleHeader {
        self.header
    }

    fn fire_pixels(&self) -> GoesFireResult<Vec<Pixel>> {
        let src_srs = self.power.spatial_ref()?;
        let dst_srs = SpatialRef::from_epsg(4326)?;
        let trans = CoordTransform::new(&src_srs, &dst_srs)?;
        let gtrans = self.power.geo_transform()?;

        let power_band = self.power.rasterband(1)?;
        let Buffer {
            data: power,
            size: (x_size, y_size),
        } = power_band.read_band_as::<f64>()?;

        let Buffer {
            data: temperature, ..
        } = self.temperature.rasterband(1)?.read_band_as::<f64>()?;
        let Buffer { data: area, .. } = self.area.rasterband(1)?.read_band_as::<f64>()?;
        let Buffer { data: mask, .. } = self.mask.rasterband(1)?.read_band_as::<i16>()?;

        if temperature.len() != power.len()
            || area.len() != power.len()
            || mask.len() != power.len()
        {
            return Err("granule bands have mismatched grid sizes".into());
        }

        let mut pixels = Vec::new();

        for j in 0..y_size {
            for i in 0..x_size {
                let index = j * x_size + i;
                let pixel_power = power[index];

                if pixel_power > 0.0 {
                    let ii = i as f64;
                    let jj = j as f64;

                    // Corner offsets in grid space, ul, ur, lr, ll order. Row numbers increase
                    // southward in these grids.
                    let mut xs = [ii - 0.5, ii + 0.5, ii + 0.5, ii - 0.5];
                    let mut ys = [jj - 0.5, jj - 0.5, jj + 0.5, jj + 0.5];
                    let mut zs = [0.0_f64; 4];

                    // Grid indexes to the projected scan coordinates.
                    for corner in 0..4 {
                        let x_grid = xs[corner];
                        let y_grid = ys[corner];
                        xs[corner] = gtrans[0] + gtrans[1] * x_grid + gtrans[2] * y_grid;
                        ys[corner] = gtrans[3] + gtrans[4] * x_grid + gtrans[5] * y_grid;
                    }

                    // Scan coordinates to lat-lon.
                    trans.transform_coords(&mut xs, &mut ys, &mut zs)?;

                    let corner = |c: usize| Coord {
                        lat: ys[c],
                        lon: xs[c],
                    };

                    pixels.push(Pixel {
                        ul: corner(0),
                        ur: corner(1),
                        lr: corner(2),
                        ll: corner(3),
                        power: pixel_power,
                        temperature: temperature[index],
                        area: area[index],
                        mask_flag: mask[index],
                    });
                }
            }
        }

        Ok(pixels)
    }
}
