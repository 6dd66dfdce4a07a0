/*!
 * Geographic types and calculations.
 *
 * Everything works in degrees of latitude and longitude on WGS-84. These are simple, approximate
 * planar calculations that are good enough at the scale of a satellite pixel; the only spherical
 * calculation is the great circle distance.
 */

/// A geographic position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lon: f64,
}

impl Coord {
    /// Test if these coordinates are within `eps` of each other.
    ///
    /// The comparison is the squared Euclidean distance in degree space against `eps * eps`, so
    /// `eps` scales like a distance in degrees.
    pub fn is_close(&self, other: Coord, eps: f64) -> bool {
        let lat_diff = self.lat - other.lat;
        let lon_diff = self.lon - other.lon;
        let distance_squared = lat_diff * lat_diff + lon_diff * lon_diff;

        distance_squared <= eps * eps
    }
}

/// A simple latitude-longitude aligned rectangle.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    /// The lower left (southwest) corner.
    pub ll: Coord,
    /// The upper right (northeast) corner.
    pub ur: Coord,
}

impl BoundingBox {
    /// Test if a coordinate is strictly inside this box.
    ///
    /// Points on the boundary are NOT inside.
    pub fn contains_coord(&self, coord: Coord) -> bool {
        coord.lat > self.ll.lat
            && coord.lat < self.ur.lat
            && coord.lon > self.ll.lon
            && coord.lon < self.ur.lon
    }

    /// Test if two boxes overlap, with `eps` degrees of slack at the edges.
    pub fn overlap(&self, other: &BoundingBox, eps: f64) -> bool {
        self.ll.lon <= other.ur.lon + eps
            && self.ur.lon >= other.ll.lon - eps
            && self.ll.lat <= other.ur.lat + eps
            && self.ur.lat >= other.ll.lat - eps
    }
}

/// Types with a geographic location and extent.
pub trait Geo {
    /// The center point.
    fn centroid(&self) -> Coord;
    /// The smallest latitude-longitude aligned rectangle containing the object.
    fn bounding_box(&self) -> BoundingBox;
}

/// A line segment between two coordinates.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Line {
    pub start: Coord,
    pub end: Coord,
}

/// The result of trying to intersect two line segments.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IntersectResult {
    /// The segments cross somewhere within both of them.
    pub does_intersect: bool,
    /// Where the underlying lines cross. Not meaningful unless `does_intersect` is true.
    pub intersection: Coord,
    /// The crossing point coincides with an endpoint of each segment.
    pub intersect_is_endpoints: bool,
}

/// Find the intersection of two line segments, if any.
///
/// Parallel segments, including colinear ones, do not intersect. Treating colinear overlap as a
/// non-intersection is fine for the quadrilateral predicates built on top of this function because
/// they also check for vertex containment.
///
/// The `eps` parameter is only used to decide whether the crossing point lands on an endpoint of
/// each segment.
pub(crate) fn lines_intersection(l1: Line, l2: Line, eps: f64) -> IntersectResult {
    let mut result = IntersectResult {
        does_intersect: false,
        intersection: Coord {
            lat: f64::NAN,
            lon: f64::NAN,
        },
        intersect_is_endpoints: false,
    };

    let m1 = (l1.end.lat - l1.start.lat) / (l1.end.lon - l1.start.lon);
    let m2 = (l2.end.lat - l2.start.lat) / (l2.end.lon - l2.start.lon);

    let x1 = l1.start.lon;
    let y1 = l1.start.lat;
    let x2 = l2.start.lon;
    let y2 = l2.start.lat;

    if (m1.is_infinite() && m2.is_infinite()) || m1 == m2 {
        // Parallel lines, possibly both vertical.
        return result;
    }

    let (x0, y0) = if m1.is_infinite() {
        // l1 is vertical.
        (x1, m2 * (x1 - x2) + y2)
    } else if m2.is_infinite() {
        // l2 is vertical.
        (x2, m1 * (x2 - x1) + y1)
    } else {
        let x0 = (m1 * x1 - m2 * x2 + y2 - y1) / (m1 - m2);
        (x0, m1 * (x0 - x1) + y1)
    };

    let intersection = Coord { lat: y0, lon: x0 };
    result.intersection = intersection;

    if coord_within_segment_range(intersection, l1) && coord_within_segment_range(intersection, l2)
    {
        result.does_intersect = true;

        let on_l1_endpoint =
            intersection.is_close(l1.start, eps) || intersection.is_close(l1.end, eps);
        let on_l2_endpoint =
            intersection.is_close(l2.start, eps) || intersection.is_close(l2.end, eps);

        result.intersect_is_endpoints = on_l1_endpoint && on_l2_endpoint;
    }

    result
}

/// Check a point on the line against the closed latitude and longitude ranges of the segment.
fn coord_within_segment_range(coord: Coord, line: Line) -> bool {
    let lon_min = line.start.lon.min(line.end.lon);
    let lon_max = line.start.lon.max(line.end.lon);
    let lat_min = line.start.lat.min(line.end.lat);
    let lat_max = line.start.lat.max(line.end.lat);

    coord.lon >= lon_min && coord.lon <= lon_max && coord.lat >= lat_min && coord.lat <= lat_max
}

/// The centroid of a triangle is just the mean of its corners.
pub(crate) fn triangle_centroid(v1: Coord, v2: Coord, v3: Coord) -> Coord {
    Coord {
        lat: (v1.lat + v2.lat + v3.lat) / 3.0,
        lon: (v1.lon + v2.lon + v3.lon) / 3.0,
    }
}

/// The great circle distance between two points, in kilometers.
///
/// Latitudes and longitudes are in degrees. This is the haversine formula on a spherical Earth,
/// which is plenty accurate for judging how far apart fire detections are.
pub fn great_circle_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0090;

    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let half_dlat = (lat2 - lat1) / 2.0;
    let half_dlon = (lon2 - lon1).to_radians() / 2.0;

    let chord = half_dlat.sin().powi(2) + half_dlon.sin().powi(2) * lat1.cos() * lat2.cos();
    let arc = 2.0 * chord.sqrt().asin();

    arc * EARTH_RADIUS_KM
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn coords_are_close() {
        let left = Coord {
            lat: 45.5,
            lon: -120.0,
        };
        let right = Coord {
            lat: 45.5000002,
            lon: -120.0000002,
        };

        assert!(left.is_close(left, 1.0e-6));
        assert!(right.is_close(right, 1.0e-6));
        assert!(left.is_close(right, 1.0e-6));

        assert!(!left.is_close(right, 1.0e-8));
    }

    #[test]
    fn bounding_box_is_open() {
        let bbox = BoundingBox {
            ll: Coord {
                lat: 44.0,
                lon: -120.0,
            },
            ur: Coord {
                lat: 45.0,
                lon: -119.0,
            },
        };

        assert!(bbox.contains_coord(Coord {
            lat: 44.5,
            lon: -119.5
        }));

        // Boundary points are outside.
        assert!(!bbox.contains_coord(Coord {
            lat: 45.0,
            lon: -119.5
        }));
        assert!(!bbox.contains_coord(Coord {
            lat: 44.5,
            lon: -120.0
        }));

        assert!(!bbox.contains_coord(Coord {
            lat: 43.5,
            lon: -119.5
        }));
    }

    #[test]
    fn crossing_segments_intersect() {
        let l1 = Line {
            start: Coord { lat: 0.0, lon: -1.0 },
            end: Coord { lat: 0.0, lon: 1.0 },
        };
        let l2 = Line {
            start: Coord { lat: -1.0, lon: 0.0 },
            end: Coord { lat: 1.0, lon: 0.0 },
        };

        let res = lines_intersection(l1, l2, 1.0e-6);
        assert!(res.does_intersect);
        assert!(!res.intersect_is_endpoints);
        assert!(res
            .intersection
            .is_close(Coord { lat: 0.0, lon: 0.0 }, 1.0e-12));
    }

    #[test]
    fn parallel_segments_do_not_intersect() {
        let l1 = Line {
            start: Coord { lat: 0.0, lon: 0.0 },
            end: Coord { lat: 1.0, lon: 1.0 },
        };
        let l2 = Line {
            start: Coord { lat: 1.0, lon: 0.0 },
            end: Coord { lat: 2.0, lon: 1.0 },
        };

        assert!(!lines_intersection(l1, l2, 1.0e-6).does_intersect);

        // Vertical pair.
        let v1 = Line {
            start: Coord { lat: 0.0, lon: 0.0 },
            end: Coord { lat: 1.0, lon: 0.0 },
        };
        let v2 = Line {
            start: Coord { lat: 0.0, lon: 1.0 },
            end: Coord { lat: 1.0, lon: 1.0 },
        };

        assert!(!lines_intersection(v1, v2, 1.0e-6).does_intersect);
    }

    #[test]
    fn shared_endpoint_is_flagged() {
        let l1 = Line {
            start: Coord { lat: 0.0, lon: 0.0 },
            end: Coord { lat: 1.0, lon: 1.0 },
        };
        let l2 = Line {
            start: Coord { lat: 1.0, lon: 1.0 },
            end: Coord { lat: 0.0, lon: 2.0 },
        };

        let res = lines_intersection(l1, l2, 1.0e-6);
        assert!(res.does_intersect);
        assert!(res.intersect_is_endpoints);
    }

    #[test]
    fn great_circle_distance_zero_for_same_point() {
        assert!(great_circle_distance(45.0, -120.0, 45.0, -120.0).abs() < 1.0e-9);
    }

    #[test]
    fn great_circle_distance_quarter_circumference() {
        // From the equator/prime meridian a quarter of the way around the world.
        let d = great_circle_distance(0.0, 0.0, 0.0, 90.0);
        assert!((d - 10_007.543).abs() < 1.0);

        // And half way around.
        let half = great_circle_distance(0.0, 0.0, 0.0, 180.0);
        assert!((half - std::f64::consts::PI * 6371.0090).abs() < 1.0);
    }
}
