//! Coordinate reference systems and transformations between them.
//!
//! Every transformation goes through geographic WGS84 (longitude/latitude
//! in degrees). Supported EPSG codes:
//!
//! - `EPSG:4326` WGS84 geographic
//! - `EPSG:3857` spherical web mercator
//! - `EPSG:32601`..`EPSG:32660` / `EPSG:32701`..`EPSG:32760` WGS84 UTM
//! - `EPSG:25828`..`EPSG:25838` ETRS89 UTM (ETRS89 is treated as WGS84)
//! - `EPSG:31466`..`EPSG:31469` DHDN Gauss-Krüger zones 2 to 5
//!
//! Gauss-Krüger coordinates live on the Bessel 1841 ellipsoid and are
//! shifted to WGS84 with the 7-parameter Helmert transformation for the
//! Potsdam datum.

use std::f64::consts::{FRAC_PI_4, PI};
use std::str::FromStr;

use geo::Coord;

use crate::SpatialError;

const WGS84: Ellipsoid = Ellipsoid {
    a: 6_378_137.0,
    f: 1.0 / 298.257_223_563,
};

const BESSEL_1841: Ellipsoid = Ellipsoid {
    a: 6_377_397.155,
    f: 1.0 / 299.152_812_8,
};

/// DHDN to WGS84, position vector convention.
const DHDN_TO_WGS84: Helmert = Helmert {
    tx: 598.1,
    ty: 73.7,
    tz: 418.2,
    rx_arcsec: 0.202,
    ry_arcsec: 0.045,
    rz_arcsec: -2.455,
    scale_ppm: 6.7,
};

#[derive(Debug, Clone, Copy)]
struct Ellipsoid {
    a: f64,
    f: f64,
}

impl Ellipsoid {
    const fn e2(self) -> f64 {
        self.f * (2.0 - self.f)
    }
}

#[derive(Debug, Clone, Copy)]
struct Helmert {
    tx: f64,
    ty: f64,
    tz: f64,
    rx_arcsec: f64,
    ry_arcsec: f64,
    rz_arcsec: f64,
    scale_ppm: f64,
}

impl Helmert {
    const fn inverse(self) -> Self {
        Self {
            tx: -self.tx,
            ty: -self.ty,
            tz: -self.tz,
            rx_arcsec: -self.rx_arcsec,
            ry_arcsec: -self.ry_arcsec,
            rz_arcsec: -self.rz_arcsec,
            scale_ppm: -self.scale_ppm,
        }
    }

    fn apply(self, [x, y, z]: [f64; 3]) -> [f64; 3] {
        let arcsec = PI / (180.0 * 3600.0);
        let rx = self.rx_arcsec * arcsec;
        let ry = self.ry_arcsec * arcsec;
        let rz = self.rz_arcsec * arcsec;
        let s = 1.0 + self.scale_ppm * 1e-6;

        [
            s.mul_add(rz.mul_add(-y, x) + ry * z, self.tx),
            s.mul_add(rz.mul_add(x, y) - rx * z, self.ty),
            s.mul_add((-ry).mul_add(x, rx * y) + z, self.tz),
        ]
    }
}

/// Transverse mercator parameters for one projected zone.
#[derive(Debug, Clone, Copy)]
struct TransverseMercator {
    ellipsoid: Ellipsoid,
    central_meridian_deg: f64,
    scale: f64,
    false_easting: f64,
    false_northing: f64,
}

impl TransverseMercator {
    fn meridian_arc(&self, lat: f64) -> f64 {
        let e2 = self.ellipsoid.e2();
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        self.ellipsoid.a
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
    }

    /// Geographic (degrees, on this zone's ellipsoid) to projected meters.
    fn forward(&self, lon_deg: f64, lat_deg: f64) -> Coord<f64> {
        let e2 = self.ellipsoid.e2();
        let ep2 = e2 / (1.0 - e2);
        let lat = lat_deg.to_radians();
        let dlon = (lon_deg - self.central_meridian_deg).to_radians();

        let n = self.ellipsoid.a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
        let t = lat.tan().powi(2);
        let c = ep2 * lat.cos().powi(2);
        let a = dlon * lat.cos();
        let m = self.meridian_arc(lat);

        let x = self.scale
            * n
            * (a + (1.0 - t + c) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0);
        let y = self.scale
            * (m + n
                * lat.tan()
                * (a * a / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));

        Coord {
            x: x + self.false_easting,
            y: y + self.false_northing,
        }
    }

    /// Projected meters to geographic degrees on this zone's ellipsoid.
    fn inverse(&self, coord: Coord<f64>) -> (f64, f64) {
        let e2 = self.ellipsoid.e2();
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = e2 / (1.0 - e2);
        let a_ax = self.ellipsoid.a;

        let m = (coord.y - self.false_northing) / self.scale;
        let mu = m / (a_ax * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
        let sqrt_1_e2 = (1.0 - e2).sqrt();
        let e1 = (1.0 - sqrt_1_e2) / (1.0 + sqrt_1_e2);

        let lat1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let sin1 = lat1.sin();
        let n1 = a_ax / (1.0 - e2 * sin1 * sin1).sqrt();
        let t1 = lat1.tan().powi(2);
        let c1 = ep2 * lat1.cos().powi(2);
        let r1 = a_ax * (1.0 - e2) / (1.0 - e2 * sin1 * sin1).powf(1.5);
        let d = (coord.x - self.false_easting) / (n1 * self.scale);

        let lat = lat1
            - (n1 * lat1.tan() / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);
        let lon = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                * d.powi(5)
                / 120.0)
            / lat1.cos();

        (
            self.central_meridian_deg + lon.to_degrees(),
            lat.to_degrees(),
        )
    }
}

fn geodetic_to_ecef(ellipsoid: Ellipsoid, lon_deg: f64, lat_deg: f64) -> [f64; 3] {
    let e2 = ellipsoid.e2();
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let n = ellipsoid.a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
    [
        n * lat.cos() * lon.cos(),
        n * lat.cos() * lon.sin(),
        n * (1.0 - e2) * lat.sin(),
    ]
}

fn ecef_to_geodetic(ellipsoid: Ellipsoid, [x, y, z]: [f64; 3]) -> (f64, f64) {
    let e2 = ellipsoid.e2();
    let lon = y.atan2(x);
    let p = x.hypot(y);

    let mut lat = z.atan2(p * (1.0 - e2));
    for _ in 0..10 {
        let n = ellipsoid.a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
        let h = p / lat.cos() - n;
        lat = z.atan2(p * (1.0 - e2 * n / (n + h)));
    }

    (lon.to_degrees(), lat.to_degrees())
}

/// A supported coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// `EPSG:4326`, x = longitude, y = latitude (degrees).
    Wgs84,
    /// `EPSG:3857` spherical web mercator.
    WebMercator,
    /// WGS84 / ETRS89 UTM zone.
    Utm {
        /// Zone number (1-60).
        zone: u8,
        /// Northern hemisphere.
        north: bool,
        /// Original EPSG code, kept for display.
        epsg: u32,
    },
    /// DHDN Gauss-Krüger zone (2-5).
    GaussKrueger {
        /// Zone number.
        zone: u8,
    },
}

impl Crs {
    /// The EPSG code of this system.
    #[must_use]
    pub fn epsg(&self) -> u32 {
        match self {
            Self::Wgs84 => 4326,
            Self::WebMercator => 3857,
            Self::Utm { epsg, .. } => *epsg,
            Self::GaussKrueger { zone } => 31_464 + u32::from(*zone),
        }
    }

    fn utm(zone: u8, north: bool) -> TransverseMercator {
        TransverseMercator {
            ellipsoid: WGS84,
            central_meridian_deg: f64::from(zone) * 6.0 - 183.0,
            scale: 0.9996,
            false_easting: 500_000.0,
            false_northing: if north { 0.0 } else { 10_000_000.0 },
        }
    }

    fn gauss_krueger(zone: u8) -> TransverseMercator {
        TransverseMercator {
            ellipsoid: BESSEL_1841,
            central_meridian_deg: f64::from(zone) * 3.0,
            scale: 1.0,
            false_easting: f64::from(zone).mul_add(1_000_000.0, 500_000.0),
            false_northing: 0.0,
        }
    }

    /// Converts a coordinate in this system to WGS84 longitude/latitude.
    #[must_use]
    pub fn to_wgs84(&self, coord: Coord<f64>) -> Coord<f64> {
        match self {
            Self::Wgs84 => coord,
            Self::WebMercator => Coord {
                x: (coord.x / WGS84.a).to_degrees(),
                y: (2.0 * (coord.y / WGS84.a).exp().atan() - PI / 2.0).to_degrees(),
            },
            Self::Utm { zone, north, .. } => {
                let (lon, lat) = Self::utm(*zone, *north).inverse(coord);
                Coord { x: lon, y: lat }
            }
            Self::GaussKrueger { zone } => {
                let (lon, lat) = Self::gauss_krueger(*zone).inverse(coord);
                let ecef = DHDN_TO_WGS84.apply(geodetic_to_ecef(BESSEL_1841, lon, lat));
                let (lon, lat) = ecef_to_geodetic(WGS84, ecef);
                Coord { x: lon, y: lat }
            }
        }
    }

    /// Converts a WGS84 longitude/latitude into this system.
    #[must_use]
    pub fn from_wgs84(&self, coord: Coord<f64>) -> Coord<f64> {
        match self {
            Self::Wgs84 => coord,
            Self::WebMercator => Coord {
                x: WGS84.a * coord.x.to_radians(),
                y: WGS84.a * (FRAC_PI_4 + coord.y.to_radians() / 2.0).tan().ln(),
            },
            Self::Utm { zone, north, .. } => Self::utm(*zone, *north).forward(coord.x, coord.y),
            Self::GaussKrueger { zone } => {
                let ecef = DHDN_TO_WGS84
                    .inverse()
                    .apply(geodetic_to_ecef(WGS84, coord.x, coord.y));
                let (lon, lat) = ecef_to_geodetic(BESSEL_1841, ecef);
                Self::gauss_krueger(*zone).forward(lon, lat)
            }
        }
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl FromStr for Crs {
    type Err = SpatialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unsupported = || SpatialError::UnsupportedCrs(s.to_string());

        let trimmed = s.trim();
        let code = trimmed
            .get(..5)
            .filter(|prefix| prefix.eq_ignore_ascii_case("EPSG:"))
            .map_or(trimmed, |_| &trimmed[5..]);
        let code: u32 = code.parse().map_err(|_| unsupported())?;

        let crs = match code {
            4326 => Self::Wgs84,
            3857 => Self::WebMercator,
            32_601..=32_660 => Self::Utm {
                zone: u8::try_from(code - 32_600).map_err(|_| unsupported())?,
                north: true,
                epsg: code,
            },
            32_701..=32_760 => Self::Utm {
                zone: u8::try_from(code - 32_700).map_err(|_| unsupported())?,
                north: false,
                epsg: code,
            },
            25_828..=25_838 => Self::Utm {
                zone: u8::try_from(code - 25_800).map_err(|_| unsupported())?,
                north: true,
                epsg: code,
            },
            31_466..=31_469 => Self::GaussKrueger {
                zone: u8::try_from(code - 31_464).map_err(|_| unsupported())?,
            },
            _ => return Err(unsupported()),
        };

        Ok(crs)
    }
}

/// A transformation from one [`Crs`] to another.
///
/// Transforming between identical systems returns the input unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateTransformation {
    from: Crs,
    to: Crs,
}

impl CoordinateTransformation {
    #[must_use]
    pub const fn new(from: Crs, to: Crs) -> Self {
        Self { from, to }
    }

    /// Builds a transformation from two EPSG identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::UnsupportedCrs`] if either identifier is not
    /// a supported system.
    pub fn from_codes(from: &str, to: &str) -> Result<Self, SpatialError> {
        Ok(Self::new(from.parse()?, to.parse()?))
    }

    #[must_use]
    pub const fn source(&self) -> Crs {
        self.from
    }

    #[must_use]
    pub const fn target(&self) -> Crs {
        self.to
    }

    /// The transformation in the opposite direction.
    #[must_use]
    pub const fn inverse(&self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }

    #[must_use]
    pub fn transform(&self, coord: Coord<f64>) -> Coord<f64> {
        if self.is_identity() {
            return coord;
        }
        self.to.from_wgs84(self.from.to_wgs84(coord))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Coord<f64>, b: Coord<f64>, tolerance: f64) -> bool {
        (a.x - b.x).abs() < tolerance && (a.y - b.y).abs() < tolerance
    }

    #[test]
    fn parses_supported_codes() {
        assert_eq!("EPSG:4326".parse::<Crs>().unwrap(), Crs::Wgs84);
        assert_eq!("epsg:3857".parse::<Crs>().unwrap(), Crs::WebMercator);
        assert_eq!(
            "EPSG:31468".parse::<Crs>().unwrap(),
            Crs::GaussKrueger { zone: 4 }
        );
        assert_eq!(
            "EPSG:25833".parse::<Crs>().unwrap(),
            Crs::Utm {
                zone: 33,
                north: true,
                epsg: 25833
            }
        );
        assert_eq!("32733".parse::<Crs>().unwrap().epsg(), 32733);
    }

    #[test]
    fn rejects_unknown_codes() {
        assert!("EPSG:2154".parse::<Crs>().is_err());
        assert!("not a crs".parse::<Crs>().is_err());
    }

    #[test]
    fn identical_systems_are_identity() {
        let ct = CoordinateTransformation::from_codes("EPSG:31468", "EPSG:31468").unwrap();
        let c = Coord {
            x: 4_595_000.123,
            y: 5_821_000.456,
        };
        assert!(ct.is_identity());
        assert_eq!(ct.transform(c), c);
    }

    #[test]
    fn utm_central_meridian_on_equator_maps_to_false_easting() {
        let ct = CoordinateTransformation::from_codes("EPSG:4326", "EPSG:32633").unwrap();
        let projected = ct.transform(Coord { x: 15.0, y: 0.0 });
        assert!(close(projected, Coord { x: 500_000.0, y: 0.0 }, 1e-6));
    }

    #[test]
    fn web_mercator_antimeridian() {
        let ct = CoordinateTransformation::from_codes("EPSG:4326", "EPSG:3857").unwrap();
        let projected = ct.transform(Coord { x: 180.0, y: 0.0 });
        assert!((projected.x - 20_037_508.342_789_244).abs() < 1e-3);
        assert!(projected.y.abs() < 1e-6);
    }

    #[test]
    fn utm_round_trip() {
        let ct = CoordinateTransformation::from_codes("EPSG:4326", "EPSG:25833").unwrap();
        let berlin = Coord { x: 13.405, y: 52.52 };
        let back = ct.inverse().transform(ct.transform(berlin));
        assert!(close(back, berlin, 1e-7));
    }

    #[test]
    fn gauss_krueger_round_trip() {
        let ct = CoordinateTransformation::from_codes("EPSG:4326", "EPSG:31468").unwrap();
        let berlin = Coord { x: 13.405, y: 52.52 };
        let back = ct.inverse().transform(ct.transform(berlin));
        assert!(close(back, berlin, 1e-6));
    }

    #[test]
    fn gauss_krueger_zone_four_matches_reference_coordinates() {
        let ct = CoordinateTransformation::from_codes("EPSG:4326", "EPSG:31468").unwrap();
        let berlin = ct.transform(Coord { x: 13.405, y: 52.52 });
        assert!(close(
            berlin,
            Coord {
                x: 4_595_471.69,
                y: 5_821_692.37
            },
            1.0
        ));

        let on_central_meridian = ct.transform(Coord { x: 12.0, y: 52.0 });
        assert!(close(
            on_central_meridian,
            Coord {
                x: 4_500_104.11,
                y: 5_762_901.92
            },
            1.0
        ));
    }

    #[test]
    fn gauss_krueger_zone_four_to_wgs84_matches_reference_coordinates() {
        let ct = CoordinateTransformation::from_codes("EPSG:31468", "EPSG:4326").unwrap();
        let berlin = ct.transform(Coord {
            x: 4_595_471.69,
            y: 5_821_692.37,
        });
        assert!(close(berlin, Coord { x: 13.405, y: 52.52 }, 1e-5));
    }

    #[test]
    fn utm_zone_33_matches_reference_coordinates() {
        let ct = CoordinateTransformation::from_codes("EPSG:4326", "EPSG:25833").unwrap();
        let berlin = ct.transform(Coord { x: 13.405, y: 52.52 });
        assert!(close(
            berlin,
            Coord {
                x: 391_779.26,
                y: 5_820_072.16
            },
            1.0
        ));

        let munich = ct.transform(Coord { x: 11.5, y: 48.1 });
        assert!(close(
            munich,
            Coord {
                x: 239_438.08,
                y: 5_333_341.95
            },
            1.0
        ));
    }

    #[test]
    fn ring_offsets_survive_round_trip_through_planar_system() {
        let to_planar = CoordinateTransformation::from_codes("EPSG:4326", "EPSG:31468").unwrap();
        let origin = Coord { x: 13.4, y: 52.5 };
        let planar = to_planar.transform(origin);
        let shifted = Coord {
            x: planar.x + 100.0,
            y: planar.y,
        };
        let back = to_planar.transform(to_planar.inverse().transform(shifted));
        assert!(close(back, shifted, 1e-3));
    }
}
