/*!
 * Satellite pixels and lists of them.
 *
 * A pixel footprint on the Earth's surface is a convex quadrilateral, NOT a square or even a
 * rectangle, thanks to the geostationary projection. All the geometric predicates in this module
 * assume convexity and a consistent winding order of the corners; both are guaranteed by the way
 * the raster loader builds pixels from the grid.
 */

use crate::{
    geo::{lines_intersection, triangle_centroid, BoundingBox, Coord, Geo, Line},
    kml::KmlFile,
    satellite::MaskCode,
    GoesFireResult,
};
use static_assertions::const_assert_eq;

/// The footprint and fire characteristics of one raster cell viewed from a GOES satellite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pixel {
    /// The upper left (northwest) corner point of the pixel.
    pub ul: Coord,
    /// The upper right (northeast) corner point of the pixel.
    pub ur: Coord,
    /// The lower right (southeast) corner point of the pixel.
    pub lr: Coord,
    /// The lower left (southwest) corner point of the pixel.
    pub ll: Coord,
    /// The fire radiative power in this pixel, megawatts.
    pub power: f64,
    /// The estimated fire brightness temperature, Kelvin.
    pub temperature: f64,
    /// The estimated area covered by fire in this pixel, square kilometers.
    pub area: f64,
    /// Code describing the outcome of the fire characterization algorithms for this pixel.
    ///
    /// See [MaskCode](crate::satellite::MaskCode) for the meanings.
    pub mask_flag: i16,
}

impl Pixel {
    /// The corners in winding order.
    pub fn corners(&self) -> [Coord; 4] {
        [self.ul, self.ur, self.lr, self.ll]
    }

    fn edges(&self) -> [Line; 4] {
        [
            Line {
                start: self.ul,
                end: self.ur,
            },
            Line {
                start: self.ur,
                end: self.lr,
            },
            Line {
                start: self.lr,
                end: self.ll,
            },
            Line {
                start: self.ll,
                end: self.ul,
            },
        ]
    }

    /// Test if these pixels are basically the same pixel in a geographic sense (not including
    /// power), comparing all four corners with [Coord::is_close].
    pub fn approx_equal(&self, other: &Pixel, eps: f64) -> bool {
        self.ul.is_close(other.ul, eps)
            && self.ur.is_close(other.ur, eps)
            && self.lr.is_close(other.lr, eps)
            && self.ll.is_close(other.ll, eps)
    }

    /// Determine if a coordinate is interior to this pixel.
    ///
    /// Interior means NOT on the boundary. The `eps` parameter is used by the line intersection
    /// helper to detect if a crossing point is very close to an end point, so there is some
    /// fuzziness to this function. A coordinate outside the pixel but eps-close to an edge may be
    /// classified as inside.
    pub fn contains_coord(&self, coord: Coord, eps: f64) -> bool {
        // Check the bounding box first. This is cheap, and if the coord is outside it we
        // already know the answer.
        if !self.bounding_box().contains_coord(coord) {
            return false;
        }

        // Make a line from the point in question to each corner of the quadrilateral. If any of
        // those lines intersect an edge of the quadrilateral somewhere besides an endpoint of
        // both segments, the point is outside.
        let edges = self.edges();

        let coord_lines = [
            Line {
                start: coord,
                end: self.ul,
            },
            Line {
                start: coord,
                end: self.ur,
            },
            Line {
                start: coord,
                end: self.lr,
            },
            Line {
                start: coord,
                end: self.ll,
            },
        ];

        for edge in &edges {
            for coord_line in &coord_lines {
                let res = lines_intersection(*edge, *coord_line, eps);

                if res.does_intersect && !res.intersect_is_endpoints {
                    return false;
                }
            }
        }

        true
    }

    /// Determine if two pixels overlap.
    ///
    /// Overlapping is defined as the pixels being approximately equal, or one pixel having a
    /// corner interior to the other, or the pixels having edges that cross somewhere besides
    /// their endpoints. The corner containment check covers the (extremely unlikely) case of one
    /// pixel completely inside the other, where no edges cross at all.
    pub fn overlaps(&self, other: &Pixel, eps: f64) -> bool {
        if self.approx_equal(other, eps) {
            return true;
        }

        if !self.bounding_box().overlap(&other.bounding_box(), eps) {
            return false;
        }

        // Check for crossing edges.
        for my_edge in &self.edges() {
            for their_edge in &other.edges() {
                let res = lines_intersection(*my_edge, *their_edge, eps);

                if res.does_intersect && !res.intersect_is_endpoints {
                    return true;
                }
            }
        }

        // No crossing edges, so check whether one pixel is swallowed by the other.
        for corner in self.corners() {
            if other.contains_coord(corner, eps) {
                return true;
            }
        }

        for corner in other.corners() {
            if self.contains_coord(corner, eps) {
                return true;
            }
        }

        false
    }

    /// Determine if two pixels share an edge without overlapping interiors.
    ///
    /// Adjacent means exactly two corners of one pixel are eps-close to two corners of the other,
    /// those corners form a whole edge of each quadrilateral, and the shared edge runs in opposite
    /// directions in the two winding orders. Pixels that merely touch at a single corner are NOT
    /// adjacent, and neither is a pixel sharing an edge with a pixel that contains it.
    pub fn is_adjacent_to(&self, other: &Pixel, eps: f64) -> bool {
        if self.approx_equal(other, eps) {
            return false;
        }

        if !self.bounding_box().overlap(&other.bounding_box(), eps) {
            return false;
        }

        let mine = self.corners();
        let theirs = other.corners();

        // Find the corner correspondences. A shared edge means exactly two of them.
        let mut matches = [(0_usize, 0_usize); 2];
        let mut num_close = 0;
        for (i, my_corner) in mine.iter().enumerate() {
            for (j, their_corner) in theirs.iter().enumerate() {
                if my_corner.is_close(*their_corner, eps) {
                    if num_close < 2 {
                        matches[num_close] = (i, j);
                    }
                    num_close += 1;
                }
            }
        }

        if num_close != 2 {
            return false;
        }

        let (i0, j0) = matches[0];
        let (i1, j1) = matches[1];

        // The matched corners must be consecutive in both quadrilaterals so they make up a whole
        // edge of each.
        let forward_in_self = i1 == (i0 + 1) % 4;
        let backward_in_self = i0 == (i1 + 1) % 4;
        if !forward_in_self && !backward_in_self {
            return false;
        }

        // Both quadrilaterals wind the same way, so a genuinely shared edge is traversed in
        // opposite directions. A shared edge traversed in the same direction means one pixel
        // contains the other.
        if forward_in_self {
            if j0 != (j1 + 1) % 4 {
                return false;
            }
        } else if j1 != (j0 + 1) % 4 {
            return false;
        }

        // The interiors must be disjoint. Checking that the unmatched corners of each pixel and
        // the centroid of each pixel are outside the other catches the remaining overlap cases
        // that eps-fuzzy corner matching lets through.
        for (i, my_corner) in mine.iter().enumerate() {
            if i != i0 && i != i1 && other.contains_coord(*my_corner, eps) {
                return false;
            }
        }

        for (j, their_corner) in theirs.iter().enumerate() {
            if j != j0 && j != j1 && self.contains_coord(*their_corner, eps) {
                return false;
            }
        }

        if other.contains_coord(self.centroid(), eps) || self.contains_coord(other.centroid(), eps)
        {
            return false;
        }

        true
    }

    /// Determine if two pixels are adjacent or overlapping.
    ///
    /// This is the relation the cluster engine builds connected components over.
    pub fn is_adjacent_to_or_overlaps(&self, other: &Pixel, eps: f64) -> bool {
        // One shared bounding box rejection up front covers both predicates.
        if !self.bounding_box().overlap(&other.bounding_box(), eps) {
            return false;
        }

        self.overlaps(other, eps) || self.is_adjacent_to(other, eps)
    }
}

impl Geo for Pixel {
    /// Calculate the centroid of the quadrilateral.
    ///
    /// The centroid is found by splitting the quadrilateral into two triangles along one
    /// diagonal, connecting the triangle centroids with a line, repeating with the other
    /// diagonal, and intersecting the two lines. This is exact for any convex quadrilateral and
    /// remains stable when opposite edges are parallel. Degenerate, zero area quadrilaterals
    /// must not be passed in.
    fn centroid(&self) -> Coord {
        let t1_c = triangle_centroid(self.ul, self.ll, self.lr);
        let t2_c = triangle_centroid(self.ul, self.ur, self.lr);
        let diag1_centroids = Line {
            start: t1_c,
            end: t2_c,
        };

        let t3_c = triangle_centroid(self.ul, self.ll, self.ur);
        let t4_c = triangle_centroid(self.lr, self.ur, self.ll);
        let diag2_centroids = Line {
            start: t3_c,
            end: t4_c,
        };

        let res = lines_intersection(diag1_centroids, diag2_centroids, 1.0e-30);
        debug_assert!(res.does_intersect);

        res.intersection
    }

    fn bounding_box(&self) -> BoundingBox {
        let xmax = self.ur.lon.max(self.lr.lon);
        let xmin = self.ul.lon.min(self.ll.lon);
        let ymax = self.ur.lat.max(self.ul.lat);
        let ymin = self.lr.lat.min(self.ll.lat);

        BoundingBox {
            ll: Coord {
                lat: ymin,
                lon: xmin,
            },
            ur: Coord {
                lat: ymax,
                lon: xmax,
            },
        }
    }
}

/// An ordered list of [Pixel] objects, the perimeter description of a cluster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PixelList(Vec<Pixel>);

impl PixelList {
    /// Create a new, empty list.
    pub fn new() -> Self {
        PixelList(Vec::new())
    }

    /// Create a new, empty list with space reserved for `capacity` pixels.
    pub fn with_capacity(capacity: usize) -> Self {
        PixelList(Vec::with_capacity(capacity))
    }

    /// Add a copy of the pixel to the end of the list.
    pub fn push(&mut self, pixel: Pixel) {
        self.0.push(pixel)
    }

    /// Empty the list but keep the backing memory.
    pub fn clear(&mut self) {
        self.0.clear()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Pixel> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pixel> {
        self.0.iter()
    }

    /// Calculate the total fire power of the pixels in the list, megawatts.
    ///
    /// Saturated pixels report infinite power, those are left out of the sum.
    pub fn total_power(&self) -> f64 {
        self.0
            .iter()
            .map(|p| p.power)
            .filter(|p| p.is_finite())
            .sum()
    }

    /// Calculate the total fire area of the pixels in the list, square kilometers.
    pub fn total_area(&self) -> f64 {
        self.0
            .iter()
            .map(|p| p.area)
            .filter(|a| a.is_finite())
            .sum()
    }

    /// The hottest fire temperature of any pixel in the list, Kelvin.
    pub fn max_temperature(&self) -> f64 {
        self.0
            .iter()
            .map(|p| p.temperature)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

impl Geo for PixelList {
    /// The power weighted centroid of the member pixel centroids.
    ///
    /// Falls back to the unweighted mean when the total power is zero (or entirely made up of
    /// saturated, infinite power pixels).
    fn centroid(&self) -> Coord {
        debug_assert!(!self.0.is_empty());

        let mut lat = 0.0;
        let mut lon = 0.0;
        let mut total_weight = 0.0;

        for pixel in &self.0 {
            let center = pixel.centroid();
            let weight = if pixel.power.is_finite() {
                pixel.power
            } else {
                0.0
            };

            lat += center.lat * weight;
            lon += center.lon * weight;
            total_weight += weight;
        }

        if total_weight > 0.0 {
            Coord {
                lat: lat / total_weight,
                lon: lon / total_weight,
            }
        } else {
            let mut lat = 0.0;
            let mut lon = 0.0;
            for pixel in &self.0 {
                let center = pixel.centroid();
                lat += center.lat;
                lon += center.lon;
            }

            Coord {
                lat: lat / self.0.len() as f64,
                lon: lon / self.0.len() as f64,
            }
        }
    }

    fn bounding_box(&self) -> BoundingBox {
        let mut min_lat = f64::INFINITY;
        let mut min_lon = f64::INFINITY;
        let mut max_lat = f64::NEG_INFINITY;
        let mut max_lon = f64::NEG_INFINITY;

        for pixel in &self.0 {
            for corner in pixel.corners() {
                min_lat = min_lat.min(corner.lat);
                min_lon = min_lon.min(corner.lon);
                max_lat = max_lat.max(corner.lat);
                max_lon = max_lon.max(corner.lon);
            }
        }

        BoundingBox {
            ll: Coord {
                lat: min_lat,
                lon: min_lon,
            },
            ur: Coord {
                lat: max_lat,
                lon: max_lon,
            },
        }
    }
}

impl std::ops::Index<usize> for PixelList {
    type Output = Pixel;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/*-------------------------------------------------------------------------------------------------
 *                                       Binary Format
 *-----------------------------------------------------------------------------------------------*/
// The binary format is the perimeter BLOB stored with each cluster in the database. It is a
// little-endian u64 pixel count followed by one fixed width record per pixel: the four corners as
// lon,lat f64 pairs in ul, ur, lr, ll order, then power, temperature, and area as f64, the mask
// code as i16, and six reserved zero bytes.

const COUNT_HEADER_SIZE: usize = std::mem::size_of::<u64>();
const PIXEL_RECORD_SIZE: usize = 96;
const_assert_eq!(PIXEL_RECORD_SIZE, 8 * 8 + 3 * 8 + 2 + 6);

fn read_f64(bytes: &[u8]) -> f64 {
    let mut raw = [0_u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    f64::from_le_bytes(raw)
}

impl PixelList {
    /// The exact buffer size required by [PixelList::binary_serialize].
    pub fn binary_serialized_size(&self) -> usize {
        COUNT_HEADER_SIZE + PIXEL_RECORD_SIZE * self.0.len()
    }

    /// Encode the list into the binary format used for database storage.
    pub fn binary_serialize(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.binary_serialized_size());

        buffer.extend_from_slice(&(self.0.len() as u64).to_le_bytes());

        for pixel in &self.0 {
            for corner in pixel.corners() {
                buffer.extend_from_slice(&corner.lon.to_le_bytes());
                buffer.extend_from_slice(&corner.lat.to_le_bytes());
            }

            buffer.extend_from_slice(&pixel.power.to_le_bytes());
            buffer.extend_from_slice(&pixel.temperature.to_le_bytes());
            buffer.extend_from_slice(&pixel.area.to_le_bytes());
            buffer.extend_from_slice(&pixel.mask_flag.to_le_bytes());
            buffer.extend_from_slice(&[0_u8; 6]);
        }

        debug_assert_eq!(buffer.len(), self.binary_serialized_size());
        buffer
    }

    /// Decode a buffer produced by [PixelList::binary_serialize].
    ///
    /// The buffer must contain exactly the encoded count of records, an undersized buffer or one
    /// with trailing garbage is an error.
    pub fn binary_deserialize(buffer: &[u8]) -> GoesFireResult<Self> {
        if buffer.len() < COUNT_HEADER_SIZE {
            return Err("pixel list buffer too small for the count header".into());
        }

        let mut count_bytes = [0_u8; COUNT_HEADER_SIZE];
        count_bytes.copy_from_slice(&buffer[..COUNT_HEADER_SIZE]);
        let count = u64::from_le_bytes(count_bytes) as usize;

        let expected_size = COUNT_HEADER_SIZE + PIXEL_RECORD_SIZE * count;
        if buffer.len() != expected_size {
            return Err(format!(
                "pixel list buffer is {} bytes but the encoded count {} requires {}",
                buffer.len(),
                count,
                expected_size
            )
            .into());
        }

        let mut pixels = Vec::with_capacity(count);
        for record in buffer[COUNT_HEADER_SIZE..].chunks_exact(PIXEL_RECORD_SIZE) {
            let ul = Coord {
                lon: read_f64(&record[0..]),
                lat: read_f64(&record[8..]),
            };
            let ur = Coord {
                lon: read_f64(&record[16..]),
                lat: read_f64(&record[24..]),
            };
            let lr = Coord {
                lon: read_f64(&record[32..]),
                lat: read_f64(&record[40..]),
            };
            let ll = Coord {
                lon: read_f64(&record[48..]),
                lat: read_f64(&record[56..]),
            };

            let power = read_f64(&record[64..]);
            let temperature = read_f64(&record[72..]);
            let area = read_f64(&record[80..]);
            let mask_flag = i16::from_le_bytes([record[88], record[89]]);

            pixels.push(Pixel {
                ul,
                ur,
                lr,
                ll,
                power,
                temperature,
                area,
                mask_flag,
            });
        }

        Ok(PixelList(pixels))
    }
}

/*-------------------------------------------------------------------------------------------------
 *                                        KML Export
 *-----------------------------------------------------------------------------------------------*/
impl PixelList {
    /// Write the pixels out as KML polygons.
    ///
    /// Each pixel becomes a placemark with a power scaled fill color and a closed ring of its
    /// four corners clamped to the ground. This is meant to be composed inside a folder or
    /// document written by the caller.
    pub fn kml_write(&self, kml: &mut KmlFile) -> GoesFireResult<()> {
        let mut description = String::with_capacity(256);

        for pixel in &self.0 {
            use std::fmt::Write;

            description.clear();
            let _ = write!(
                &mut description,
                concat!(
                    "Power: {:.0} MW<br/>",
                    "Temperature: {:.0} &deg;K<br/>",
                    "Area: {:.2} km^2<br/>",
                    "Mask Flag: {}<br/>"
                ),
                pixel.power,
                pixel.temperature,
                pixel.area,
                MaskCode(pixel.mask_flag).as_str()
            );

            kml.open_placemark(None, Some(&description), None)?;
            kml.ground_quad(pixel.corners(), &power_to_kml_color(pixel.power))?;
            kml.close_placemark()?;
        }

        Ok(())
    }
}

/// Map fire power to an aabbggrr KML color on a yellow-orange-red ramp.
fn power_to_kml_color(power: f64) -> String {
    const MAX_POWER: f64 = 3000.0;
    const MAX_GREEN_FOR_ORANGE: f64 = 0.647;
    const FULL_RED_POWER: f64 = MAX_POWER / 2.0;

    let power = if power.is_infinite() {
        MAX_POWER
    } else {
        power.min(MAX_POWER)
    };

    let rd = 1.0;
    let ad = 0.6;

    let (gd, bd) = if power <= FULL_RED_POWER {
        let gd = (FULL_RED_POWER - power) / FULL_RED_POWER * MAX_GREEN_FOR_ORANGE;
        (gd, 0.0)
    } else {
        let gd = (power - FULL_RED_POWER) / (MAX_POWER - FULL_RED_POWER);
        (gd, gd)
    };

    format!(
        "{:02x}{:02x}{:02x}{:02x}",
        (ad * 255.0) as u8,
        (bd * 255.0) as u8,
        (gd * 255.0) as u8,
        (rd * 255.0) as u8
    )
}

#[cfg(test)]
mod test {
    use super::*;

    fn square(lat: f64, lon: f64, width: f64) -> Pixel {
        Pixel {
            ul: Coord {
                lat: lat + width,
                lon,
            },
            ur: Coord {
                lat: lat + width,
                lon: lon + width,
            },
            lr: Coord {
                lat,
                lon: lon + width,
            },
            ll: Coord { lat, lon },
            power: 1.0,
            temperature: 400.0,
            area: 0.5,
            mask_flag: 10,
        }
    }

    #[test]
    fn centroid_of_a_square() {
        let pxl = square(44.0, -120.0, 1.0);
        let centroid = pxl.centroid();

        assert!(centroid.is_close(
            Coord {
                lat: 44.5,
                lon: -119.5
            },
            1.0e-12
        ));
    }

    #[test]
    fn centroid_of_a_skewed_quadrilateral_is_inside() {
        let pxl = Pixel {
            ul: Coord { lat: 3.0, lon: 2.0 },
            ll: Coord { lat: 0.0, lon: 0.0 },
            lr: Coord { lat: 2.0, lon: 2.0 },
            ur: Coord { lat: 5.0, lon: 4.0 },
            power: 1.0,
            temperature: 400.0,
            area: 0.5,
            mask_flag: 10,
        };

        let centroid = pxl.centroid();
        assert!(pxl.contains_coord(centroid, 1.0e-6));
    }

    #[test]
    fn pixels_approx_equal() {
        let pxl1 = square(44.0, -120.0, 1.0);

        let mut pxl2 = pxl1;
        pxl2.ul.lat += 2.0e-7;
        pxl2.lr.lon -= 2.0e-7;

        assert!(pxl1.approx_equal(&pxl1, 1.0e-6));
        assert!(pxl1.approx_equal(&pxl2, 1.0e-6));
        assert!(!pxl1.approx_equal(&pxl2, 1.0e-8));

        // A pixel equals itself even with no tolerance at all.
        assert!(pxl1.approx_equal(&pxl1, 0.0));
    }

    #[test]
    fn contains_coord_excludes_boundary() {
        let pxl = square(44.0, -120.0, 1.0);

        assert!(pxl.contains_coord(
            Coord {
                lat: 44.5,
                lon: -119.5
            },
            1.0e-6
        ));

        let outside = [
            Coord {
                lat: 45.5,
                lon: -119.5,
            },
            Coord {
                lat: 44.5,
                lon: -120.5,
            },
            Coord {
                lat: 43.5,
                lon: -119.5,
            },
            Coord {
                lat: 44.5,
                lon: -118.5,
            },
            Coord {
                lat: 43.5,
                lon: -118.5,
            },
            Coord {
                lat: 45.5,
                lon: -120.5,
            },
        ];
        for coord in outside {
            assert!(!pxl.contains_coord(coord, 1.0e-6));
        }

        // Points on the boundary are NOT contained.
        let boundary = [
            Coord {
                lat: 45.0,
                lon: -119.5,
            },
            Coord {
                lat: 44.0,
                lon: -119.5,
            },
            Coord {
                lat: 44.5,
                lon: -119.0,
            },
            Coord {
                lat: 44.5,
                lon: -120.0,
            },
        ];
        for coord in boundary {
            assert!(!pxl.contains_coord(coord, 1.0e-6));
        }
    }

    #[test]
    fn contains_coord_in_a_skewed_quadrilateral() {
        let pxl = Pixel {
            ul: Coord { lat: 3.0, lon: 2.0 },
            ll: Coord { lat: 0.0, lon: 0.0 },
            lr: Coord { lat: 2.0, lon: 2.0 },
            ur: Coord { lat: 5.0, lon: 4.0 },
            power: 1.0,
            temperature: 400.0,
            area: 0.5,
            mask_flag: 10,
        };

        assert!(pxl.contains_coord(Coord { lat: 2.5, lon: 2.0 }, 1.0e-6));

        assert!(!pxl.contains_coord(Coord { lat: 2.0, lon: 1.0 }, 1.0e-6));
        assert!(!pxl.contains_coord(Coord { lat: 1.0, lon: 2.0 }, 1.0e-6));
        assert!(!pxl.contains_coord(
            Coord {
                lat: -1.5,
                lon: -119.5
            },
            1.0e-6
        ));

        // On the boundary.
        assert!(!pxl.contains_coord(Coord { lat: 1.0, lon: 1.0 }, 1.0e-6));
        assert!(!pxl.contains_coord(Coord { lat: 4.0, lon: 3.0 }, 1.0e-6));
    }

    #[test]
    fn overlapping_pixels() {
        // Two unit squares, the second shifted east by half a cell.
        let pxl1 = square(0.0, 0.0, 1.0);
        let pxl2 = square(0.0, 0.5, 1.0);

        // A pixel always overlaps itself.
        assert!(pxl1.overlaps(&pxl1, 1.0e-6));
        assert!(pxl2.overlaps(&pxl2, 1.0e-6));

        assert!(pxl1.overlaps(&pxl2, 1.0e-6));
        assert!(pxl2.overlaps(&pxl1, 1.0e-6));

        assert!(!pxl1.is_adjacent_to(&pxl2, 1.0e-6));

        // A diamond whose corners lie on the midpoints of pxl1's edges overlaps it even though
        // none of its corners are interior.
        let diamond = Pixel {
            ul: Coord { lat: 1.0, lon: 0.5 },
            ur: Coord { lat: 0.5, lon: 1.0 },
            lr: Coord { lat: 0.0, lon: 0.5 },
            ll: Coord { lat: 0.5, lon: 0.0 },
            power: 1.0,
            temperature: 400.0,
            area: 0.5,
            mask_flag: 10,
        };

        assert!(pxl1.overlaps(&diamond, 1.0e-6));
        assert!(diamond.overlaps(&pxl1, 1.0e-6));

        // Fully disjoint bounding boxes never overlap.
        let far_away = square(30.0, 30.0, 1.0);
        assert!(!pxl1.overlaps(&far_away, 1.0e-6));
        assert!(!far_away.overlaps(&pxl1, 1.0e-6));
    }

    #[test]
    fn adjacent_pixels_share_an_edge() {
        let center = square(44.0, -120.0, 1.0);
        let east = square(44.0, -119.0, 1.0);
        let north = square(45.0, -120.0, 1.0);
        let northeast = square(45.0, -119.0, 1.0);

        // Side neighbors share an edge.
        assert!(center.is_adjacent_to(&east, 1.0e-6));
        assert!(east.is_adjacent_to(&center, 1.0e-6));
        assert!(center.is_adjacent_to(&north, 1.0e-6));
        assert!(north.is_adjacent_to(&center, 1.0e-6));

        assert!(!center.overlaps(&east, 1.0e-6));
        assert!(!center.overlaps(&north, 1.0e-6));

        assert!(center.is_adjacent_to_or_overlaps(&east, 1.0e-6));
        assert!(center.is_adjacent_to_or_overlaps(&north, 1.0e-6));

        // A pixel is not adjacent to itself.
        assert!(!center.is_adjacent_to(&center, 1.0e-6));

        // A diagonal neighbor only touches at a corner, that is not a shared edge.
        assert!(!center.is_adjacent_to(&northeast, 1.0e-6));
        assert!(!northeast.is_adjacent_to(&center, 1.0e-6));

        // Two cells apart is nothing at all.
        let far_east = square(44.0, -118.0, 1.0);
        assert!(!center.is_adjacent_to(&far_east, 1.0e-6));
        assert!(!center.is_adjacent_to_or_overlaps(&far_east, 1.0e-6));
    }

    #[test]
    fn adjacency_tolerates_grid_jitter() {
        let center = square(44.0, -120.0, 1.0);

        // An east neighbor with a couple tenths of a microdegree of noise on the shared corners.
        let mut east = square(44.0, -119.0, 1.0);
        east.ul.lat += 2.0e-7;
        east.ul.lon -= 2.0e-7;
        east.ll.lat -= 2.0e-7;
        east.ll.lon += 2.0e-7;

        assert!(center.is_adjacent_to(&east, 1.0e-6));

        // With a much tighter eps the corners no longer match.
        assert!(!center.is_adjacent_to(&east, 1.0e-9));
    }

    #[test]
    fn shared_edge_with_containment_is_not_adjacency() {
        let pxl = square(44.0, -120.0, 1.0);

        // The east half of pxl. It shares the full east edge but overlaps the interior.
        let east_half = Pixel {
            ul: Coord {
                lat: 45.0,
                lon: -119.5,
            },
            ur: Coord {
                lat: 45.0,
                lon: -119.0,
            },
            lr: Coord {
                lat: 44.0,
                lon: -119.0,
            },
            ll: Coord {
                lat: 44.0,
                lon: -119.5,
            },
            power: 1.0,
            temperature: 400.0,
            area: 0.5,
            mask_flag: 10,
        };

        assert!(!pxl.is_adjacent_to(&east_half, 1.0e-6));
        assert!(!east_half.is_adjacent_to(&pxl, 1.0e-6));

        // They do overlap though.
        assert!(pxl.overlaps(&east_half, 1.0e-6));

        // A quarter of pxl sharing only its lower right corner region edges.
        let quarter = Pixel {
            ul: Coord {
                lat: 44.5,
                lon: -119.5,
            },
            ur: Coord {
                lat: 44.5,
                lon: -119.0,
            },
            lr: Coord {
                lat: 44.0,
                lon: -119.0,
            },
            ll: Coord {
                lat: 44.0,
                lon: -119.5,
            },
            power: 1.0,
            temperature: 400.0,
            area: 0.5,
            mask_flag: 10,
        };

        assert!(!pxl.is_adjacent_to(&quarter, 1.0e-6));
        assert!(!quarter.is_adjacent_to(&pxl, 1.0e-6));
    }

    #[test]
    fn pixel_list_centroid_is_power_weighted() {
        let mut list = PixelList::new();

        let mut west = square(0.0, 0.0, 1.0);
        west.power = 3.0;
        let mut east = square(0.0, 1.0, 1.0);
        east.power = 1.0;

        list.push(west);
        list.push(east);

        // Weighted 3:1 towards the west pixel centroid at lon 0.5.
        let centroid = list.centroid();
        assert!((centroid.lon - 0.75).abs() < 1.0e-9);
        assert!((centroid.lat - 0.5).abs() < 1.0e-9);

        // With no power at all it falls back to the geometric mean.
        let mut no_power = PixelList::new();
        west.power = 0.0;
        east.power = 0.0;
        no_power.push(west);
        no_power.push(east);

        let centroid = no_power.centroid();
        assert!((centroid.lon - 1.0).abs() < 1.0e-9);
    }

    #[test]
    fn binary_round_trip() {
        let mut list = PixelList::new();

        let mut pxl = square(43.0, -121.0, 1.0);
        pxl.power = 150.0;
        pxl.temperature = 451.0;
        pxl.area = 1.25;
        pxl.mask_flag = 13;
        list.push(pxl);

        let mut other = square(43.0, -120.0, 1.0);
        other.power = 2.5;
        other.temperature = 390.0;
        other.area = 0.75;
        other.mask_flag = 33;
        list.push(other);

        let buffer = list.binary_serialize();
        assert_eq!(buffer.len(), 8 + 2 * 96);
        assert_eq!(buffer.len(), list.binary_serialized_size());

        let decoded = PixelList::binary_deserialize(&buffer).unwrap();
        assert_eq!(list, decoded);
    }

    #[test]
    fn binary_round_trip_empty_list() {
        let list = PixelList::new();

        let buffer = list.binary_serialize();
        assert_eq!(buffer.len(), 8);

        let decoded = PixelList::binary_deserialize(&buffer).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn binary_deserialize_rejects_bad_buffers() {
        let mut list = PixelList::new();
        list.push(square(43.0, -121.0, 1.0));

        let buffer = list.binary_serialize();

        // Undersized.
        assert!(PixelList::binary_deserialize(&buffer[..buffer.len() - 1]).is_err());
        assert!(PixelList::binary_deserialize(&buffer[..4]).is_err());

        // Trailing garbage.
        let mut padded = buffer;
        padded.push(0xFF);
        assert!(PixelList::binary_deserialize(&padded).is_err());
    }
}
