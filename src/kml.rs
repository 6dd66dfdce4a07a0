/*!
 * A small streaming KML writer for the run summary sidecar.
 *
 * This covers exactly the elements the sidecar needs: a document with shared styles, folders,
 * placemarks with a time span, ground clamped quadrilaterals for pixel footprints, and points for
 * cluster centroids. Elements stream straight to the file, so a sidecar describing a very large
 * cluster never builds the document in memory. Whoever opens a folder or placemark closes it; the
 * document footer goes out automatically when the writer is dropped.
 */

use crate::{geo::Coord, GoesFireResult};
use chrono::{DateTime, Utc};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

pub struct KmlFile {
    out: BufWriter<File>,
}

impl Drop for KmlFile {
    fn drop(&mut self) {
        let _ = self.out.write_all(b"</Document>\n</kml>\n");
    }
}

impl KmlFile {
    /// Create the file and write the document prologue.
    pub fn create<P: AsRef<Path>>(path: P) -> GoesFireResult<Self> {
        let mut out = BufWriter::new(File::create(path.as_ref())?);

        out.write_all(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n")?;
        out.write_all(b"<kml xmlns=\"http://www.opengis.net/kml/2.2\">\n")?;
        out.write_all(b"<Document>\n")?;

        Ok(KmlFile { out })
    }

    /// Define a shared style for filled polygons, with an optional placemark icon.
    ///
    /// `color` is KML's aabbggrr hex ordering. Refer to the style from a placemark as `#id`.
    pub fn polygon_style(
        &mut self,
        id: &str,
        color: &str,
        icon_url: Option<&str>,
        icon_scale: f64,
    ) -> GoesFireResult<()> {
        writeln!(self.out, "<Style id=\"{}\">", id)?;
        self.poly_style(color)?;

        if let Some(url) = icon_url {
            writeln!(self.out, "<IconStyle>")?;
            writeln!(self.out, "<scale>{}</scale>", icon_scale)?;
            writeln!(self.out, "<Icon><href>{}</href></Icon>", url)?;
            writeln!(self.out, "</IconStyle>")?;
        }

        writeln!(self.out, "</Style>")?;
        Ok(())
    }

    fn poly_style(&mut self, color: &str) -> GoesFireResult<()> {
        writeln!(self.out, "<PolyStyle>")?;
        writeln!(self.out, "<color>{}</color>", color)?;
        writeln!(self.out, "<colorMode>normal</colorMode>")?;
        writeln!(self.out, "<fill>1</fill>")?;
        writeln!(self.out, "<outline>0</outline>")?;
        writeln!(self.out, "</PolyStyle>")?;
        Ok(())
    }

    pub fn open_folder(&mut self, name: &str, expanded: bool) -> GoesFireResult<()> {
        writeln!(self.out, "<Folder>")?;
        writeln!(self.out, "<name>{}</name>", name)?;
        if expanded {
            writeln!(self.out, "<open>1</open>")?;
        }
        Ok(())
    }

    pub fn close_folder(&mut self) -> GoesFireResult<()> {
        writeln!(self.out, "</Folder>")?;
        Ok(())
    }

    /// Open a placemark. The description may contain HTML, it is wrapped in CDATA.
    pub fn open_placemark(
        &mut self,
        name: Option<&str>,
        description: Option<&str>,
        style_url: Option<&str>,
    ) -> GoesFireResult<()> {
        writeln!(self.out, "<Placemark>")?;

        if let Some(name) = name {
            writeln!(self.out, "<name>{}</name>", name)?;
        }

        if let Some(description) = description {
            writeln!(
                self.out,
                "<description><![CDATA[{}]]></description>",
                description
            )?;
        }

        if let Some(style_url) = style_url {
            writeln!(self.out, "<styleUrl>{}</styleUrl>", style_url)?;
        }

        Ok(())
    }

    pub fn close_placemark(&mut self) -> GoesFireResult<()> {
        writeln!(self.out, "</Placemark>")?;
        Ok(())
    }

    /// Tag the enclosing element with the scan interval it covers.
    pub fn time_span(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> GoesFireResult<()> {
        const FMT: &str = "%Y-%m-%dT%H:%M:%SZ";

        writeln!(self.out, "<TimeSpan>")?;
        writeln!(self.out, "<begin>{}</begin>", start.format(FMT))?;
        writeln!(self.out, "<end>{}</end>", end.format(FMT))?;
        writeln!(self.out, "</TimeSpan>")?;
        Ok(())
    }

    /// Write a pixel footprint as a filled quadrilateral clamped to the ground.
    ///
    /// The corners must be in winding order; the ring is closed automatically. The fill color is
    /// written as an inline style so every footprint can carry its own power shading.
    pub fn ground_quad(&mut self, corners: [Coord; 4], color: &str) -> GoesFireResult<()> {
        writeln!(self.out, "<Style>")?;
        self.poly_style(color)?;
        writeln!(self.out, "</Style>")?;

        writeln!(self.out, "<Polygon>")?;
        writeln!(self.out, "<altitudeMode>clampToGround</altitudeMode>")?;
        writeln!(self.out, "<outerBoundaryIs>")?;
        writeln!(self.out, "<LinearRing>")?;
        writeln!(self.out, "<coordinates>")?;

        for corner in corners.iter().chain(std::iter::once(&corners[0])) {
            writeln!(self.out, "{},{},0", corner.lon, corner.lat)?;
        }

        writeln!(self.out, "</coordinates>")?;
        writeln!(self.out, "</LinearRing>")?;
        writeln!(self.out, "</outerBoundaryIs>")?;
        writeln!(self.out, "</Polygon>")?;
        Ok(())
    }

    /// Write a point at the given location on the ground.
    pub fn point(&mut self, location: Coord) -> GoesFireResult<()> {
        writeln!(
            self.out,
            "<Point>\n<coordinates>{},{},0</coordinates>\n</Point>",
            location.lon, location.lat
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn document_structure_is_complete() {
        let path = std::env::temp_dir().join(format!("goesfire-kml-test-{}.kml", std::process::id()));

        {
            let mut kml = KmlFile::create(&path).unwrap();
            kml.polygon_style("fire", "880000FF", None, 1.0).unwrap();
            kml.open_folder("Test", true).unwrap();
            kml.open_placemark(Some("quad"), Some("Power: 12 MW"), Some("#fire"))
                .unwrap();

            let corners = [
                Coord { lat: 1.0, lon: 0.0 },
                Coord { lat: 1.0, lon: 1.0 },
                Coord { lat: 0.0, lon: 1.0 },
                Coord { lat: 0.0, lon: 0.0 },
            ];
            kml.ground_quad(corners, "a00047ff").unwrap();
            kml.point(Coord { lat: 0.5, lon: 0.5 }).unwrap();

            kml.close_placemark().unwrap();
            kml.close_folder().unwrap();
            // Dropping the writer closes the document.
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(contents.starts_with("<?xml"));
        assert!(contents.trim_end().ends_with("</kml>"));
        assert!(contents.contains("<Style id=\"fire\">"));
        assert!(contents.contains("<![CDATA[Power: 12 MW]]>"));

        // The ring is closed, the first corner appears twice.
        assert_eq!(contents.matches("0,1,0").count(), 2);

        // Every opened element was closed.
        for element in ["Folder", "Placemark", "Polygon", "LinearRing", "Document"] {
            assert_eq!(
                contents.matches(&format!("<{}>", element)).count(),
                contents.matches(&format!("</{}>", element)).count(),
                "unbalanced {}",
                element
            );
        }
    }
}
