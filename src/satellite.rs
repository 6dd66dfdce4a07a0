/*! Satellites, scan sectors, and the NOAA Big Data file naming convention. */

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;
use std::fmt::{self, Display};
use strum::EnumIter;

/** The GOES satellites this library works with. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Satellite {
    /// GOES-16 (formerly GOES-R), or commonly known as GOES East
    G16,
    /// GOES-17 (formerly GOES-S), or commonly known as GOES West
    G17,
}

impl Satellite {
    /// Get a string representing the name of the satellite.
    pub fn name(&self) -> &'static str {
        use Satellite::*;

        match self {
            G16 => "G16",
            G17 => "G17",
        }
    }

    /// Scan the string for the occurence of a satellite name.
    pub fn string_contains_satellite(string: &str) -> Option<Satellite> {
        use Satellite::*;

        let all_sats = [G16, G17];
        for sat in &all_sats {
            if string.contains(sat.name()) {
                return Some(*sat);
            }
        }

        None
    }
}

impl Display for Satellite {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}", self.name())
    }
}

/** The satellite scan sectors this library recognizes. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Sector {
    /// This is the full disk sector that includes the full viewable disk of the Earth.
    FullDisk,
    /// The Continental U.S. sector, which actually includes much of the U.S on both satellites.
    Conus,
    /// Meso-sector 1, a floating sector with 1 minute imagery updates.
    Meso1,
    /// Meso-sector 2, a floating sector with 1 minute imagery updates.
    Meso2,
}

impl Sector {
    /// Get a string representing the name of the sector.
    ///
    /// This is also the abbreviation used for the sector in the NOAA Big Data file naming scheme
    /// for GOES data.
    pub fn name(&self) -> &'static str {
        use Sector::*;

        match self {
            FullDisk => "FDCF",
            Conus => "FDCC",
            Meso1 => "FDCM1",
            Meso2 => "FDCM2",
        }
    }

    /// Scan the string for the occurrence of a sector name and return the first one found.
    ///
    /// Note that in some cases either of the meso-sectors can be represented by "FDCM", such as in
    /// the directory structure where both meso-sector files are stored in the same directory. So
    /// "FDCM" is the last string the function will try to match and it will just return
    /// `Sector::Meso1` in that case.
    pub fn string_contains_sector(string: &str) -> Option<Sector> {
        use Sector::*;

        let all_sectors = [Meso1, Meso2, FullDisk, Conus];
        for sector in all_sectors {
            if string.contains(sector.name()) {
                return Some(sector);
            }
        }

        if string.contains("FDCM") {
            Some(Meso1)
        } else {
            None
        }
    }

    /// Is this one of the floating meso-sectors?
    pub fn is_meso(&self) -> bool {
        matches!(self, Sector::Meso1 | Sector::Meso2)
    }
}

impl Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}", self.name())
    }
}

/// The identifying information for one granule, parsed from its file name.
///
/// The archive file naming convention is authoritative for all of these fields, nothing is read
/// from inside the file itself.
#[derive(Debug, Clone, Copy)]
pub struct GranuleHeader {
    pub satellite: Satellite,
    pub sector: Sector,
    pub scan_start: DateTime<Utc>,
    pub scan_end: DateTime<Utc>,
}

impl GranuleHeader {
    /// Parse a file name such as
    /// `OR_ABI-L2-FDCC-M6_G16_s20202381501123_e20202381503496_c20202381504051.nc`.
    pub fn parse_from_file_name(fname: &str) -> Option<Self> {
        let satellite = Satellite::string_contains_satellite(fname)?;
        let sector = Sector::string_contains_sector(fname)?;
        let scan_start = scan_time_from_file_name(fname, "_s")?;
        let scan_end = scan_time_from_file_name(fname, "_e")?;

        Some(GranuleHeader {
            satellite,
            sector,
            scan_start,
            scan_end,
        })
    }

    /// The midpoint of the scan, which is the time stamp stored with clusters.
    pub fn mid_point(&self) -> DateTime<Utc> {
        self.scan_start + (self.scan_end - self.scan_start) / 2
    }
}

/// Parse the UTC time following the given marker (`"_s"` or `"_e"`) in a file name.
///
/// The time token looks like `s20212130100319`, year + day of year + hour + minute + second plus
/// a trailing tenth of a second that is ignored here.
fn scan_time_from_file_name(fname: &str, marker: &str) -> Option<DateTime<Utc>> {
    let start_idx = fname.find(marker)? + marker.len();
    let slice = fname.get(start_idx..)?;
    let slice = if slice.len() > 13 {
        &slice[..13]
    } else {
        return None;
    };

    NaiveDateTime::parse_from_str(slice, "%Y%j%H%M%S")
        .ok()
        .map(|naive| DateTime::<Utc>::from_utc(naive, Utc))
}

/// Represents a code from the Mask field of the NetCDF files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskCode(pub i16);

impl MaskCode {
    /// Translate a mask code to a string.
    ///
    /// Mask codes are a form of metadata that describe each pixel's quality control characteristics.
    /// These codes were taken from table 5.19.6.1-1 of the
    /// [GOES-R SERIES PRODUCT DEFINITION AND USERS’ GUIDE][doc_url] retrieved December 10th, 2021.
    ///
    /// [doc_url]: https://www.goes-r.gov/products/docs/PUG-L2+-vol5.pdf
    pub fn as_str(self) -> &'static str {
        match self.0 {
            -99 => "missing",
            0 => "unprocessed_pixel",
            10 => "good_fire_pixel",
            11 => "saturated_fire_pixel",
            12 => "cloud_contaminated_fire_pixel",
            13 => "high_probability_fire_pixel",
            14 => "medium_probability_fire_pixel",
            15 => "low_probability_fire_pixel",
            30 => "temporally_filtered_good_fire_pixel",
            31 => "temporally_filtered_saturated_fire_pixel",
            32 => "temporally_filtered_cloud_contaminated_fire_pixel",
            33 => "temporally_filtered_high_probability_fire_pixel",
            34 => "temporally_filtered_medium_probability_fire_pixel",
            35 => "temporally_filtered_low_probability_fire_pixel",
            40 => "off_earth_pixel",
            50 => "LZA_block_out_zone",
            60 => "SZA_or_glint_angle_block_out_zone",
            100 => "processed_no_fire_pixel",
            120 => "missing_input_3.89um_pixel",
            121 => "missing_input_11.19um_pixel",
            123 => "saturated_input_3.89um_pixel",
            124 => "saturated_input_11.19um_pixel",
            125 => "invalid_input_radiance_value",
            126 => "below_threshold_input_3.89um_pixel",
            127 => "below_threshold_input_11.19um_pixel",
            150 => "invalid_ecosystem_UMD_land_cover_type_sea_water_or_MODIS_land_mask_types_or_framework_desert_mask_type_bright_desert",
            151 => "invalid_ecosystem_USGS_type_sea_water",
            152 => "invalid_ecosystem_USGS_types_coastline_fringe_or_compound_coastlines",
            153 => "invalid_ecosystem_USGS_types_inland_water_or_water_and_island_fringe_or_land_and_water_shore_or_land_and_water_rivers",
            170 => "no_background_value_could_be_computed",
            180 => "conversion_error_between_BT_and_radiance",
            182 => "conversion_error_radiance_to_adjusted_BT",
            185 => "modified_Dozier_technique_bisection_method_invalid_computed_BT",
            186 => "modifed_Dozier_technique_Newton_method_invalid_computed_radiance",
            187 => "modifed_Dozier_technique_Newton_method_invalid_computed_fire_brighness_temp",
            188 => "modifed_Dozier_technique_Newton_method_invalid_computed_fire_area",
            200 => "cloud_pixel_detected_by_11.19um_threshold_test",
            201 => "cloud_pixel_detected_by_3.89um_minus_11.19um_threshold_and_freezing_test",
            205 => "cloud_pixel_detected_by_negative_difference_3.89um_minus_11.19um_threshold_test",
            210 => "cloud_pixel_detected_by_positive_difference_3.89um_minus_11.19um_threshold_test",
            215 => "cloud_pixel_detected_by_albedo_threshold_test",
            220 => "cloud_pixel_detected_by_12.27um_threshold_test",
            225 => "cloud_pixel_detected_by_negative_difference_11.19um_minus_12.27um_threshold_test",
            230 => "cloud_pixel_detected_by_positive_difference_11.19um_minus_12.27um_threshold_test",
            240 => "cloud_edge_pixel_detected_by_along_scan_reflectivity_and_3.89um_threshold_test",
            245 => "cloud_edge_pixel_detected_by_along_scan_reflectivity_and_albedo_threshold_test",
            _ => "unknown code",
        }
    }

    /// Is this code one of the processed or temporally filtered fire pixel codes?
    ///
    /// Low probability detections are left out, they produce far too many false positives over
    /// sun glint and hot bare ground.
    pub fn is_confident_fire(self) -> bool {
        static CONFIDENT_FIRE_CODES: Lazy<FxHashSet<i16>> = Lazy::new(|| {
            [10, 11, 12, 13, 14, 30, 31, 32, 33, 34]
                .into_iter()
                .collect()
        });

        CONFIDENT_FIRE_CODES.contains(&self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    const CASE1: &str = "OR_ABI-L2-FDCF-M6_G17_s20212130100319_e20212130109386_c20212130109511.nc";

    #[test]
    fn parse_scan_times_from_file_name() {
        let header = GranuleHeader::parse_from_file_name(CASE1).unwrap();

        assert_eq!(
            header.scan_start,
            DateTime::<Utc>::from_utc(
                NaiveDate::from_yo_opt(2021, 213)
                    .and_then(|d| d.and_hms_opt(1, 0, 31))
                    .unwrap(),
                Utc
            )
        );

        assert_eq!(
            header.scan_end,
            DateTime::<Utc>::from_utc(
                NaiveDate::from_yo_opt(2021, 213)
                    .and_then(|d| d.and_hms_opt(1, 9, 38))
                    .unwrap(),
                Utc
            )
        );
    }

    #[test]
    fn parse_satellite_and_sector() {
        let header = GranuleHeader::parse_from_file_name(CASE1).unwrap();
        assert_eq!(header.satellite, Satellite::G17);
        assert_eq!(header.sector, Sector::FullDisk);

        assert_eq!(
            Sector::string_contains_sector("OR_ABI-L2-FDCM1-M6_G16_s20212130100319.nc"),
            Some(Sector::Meso1)
        );
        assert_eq!(
            Sector::string_contains_sector("OR_ABI-L2-FDCM2-M6_G16_s20212130100319.nc"),
            Some(Sector::Meso2)
        );
        assert_eq!(
            Sector::string_contains_sector("G17/ABI-L2-FDCM/2021/213/01"),
            Some(Sector::Meso1)
        );
        assert_eq!(Sector::string_contains_sector("no sector here"), None);
    }

    #[test]
    fn mid_point_splits_the_scan() {
        let header = GranuleHeader::parse_from_file_name(CASE1).unwrap();
        let mid = header.mid_point();

        assert!(header.scan_start < mid && mid < header.scan_end);
        assert_eq!(
            mid - header.scan_start,
            (header.scan_end - header.scan_start) / 2
        );
    }

    #[test]
    fn garbled_file_names_do_not_parse() {
        assert!(GranuleHeader::parse_from_file_name("G16_FDCC_no_times.nc").is_none());
        assert!(GranuleHeader::parse_from_file_name("OR_ABI-L2-FDCC-M6_s2021213.nc").is_none());
        assert!(GranuleHeader::parse_from_file_name("").is_none());
    }
}
