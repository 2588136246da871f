//! Coordinate reference systems read from `.prj` sidecars.
//!
//! BOM publishes its shapefiles in geographic coordinates, usually GDA94. Other
//! providers use projected grids, so the inverse projections needed to bring
//! those back to WGS 84 longitude/latitude are implemented here:
//!
//! - Web Mercator (EPSG:3857 and ESRI's auxiliary sphere)
//! - Mercator (1SP and 2SP)
//! - Transverse Mercator (UTM, MGA zones)
//! - Lambert Conformal Conic (1SP and 2SP)
//!
//! Geographic references on other datums are treated as WGS 84; the datum
//! shifts involved are well below what a web map can show.

use std::{f64::consts::FRAC_PI_2, f64::consts::FRAC_PI_4, fs, path::Path};

use geo::{Coord, MapCoords, MultiPolygon};

use crate::error::SpatialError;

// -- WKT ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum WktValue {
    Node(WktNode),
    Text(String),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WktNode {
    pub keyword: String,
    pub values: Vec<WktValue>,
}

impl WktNode {
    /// First child node with `keyword`, case-insensitive.
    pub fn child(&self, keyword: &str) -> Option<&WktNode> {
        self.values.iter().find_map(|v| match v {
            WktValue::Node(n) if n.keyword.eq_ignore_ascii_case(keyword) => Some(n),
            _ => None,
        })
    }

    pub fn children<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a WktNode> {
        self.values.iter().filter_map(move |v| match v {
            WktValue::Node(n) if n.keyword.eq_ignore_ascii_case(keyword) => Some(n),
            _ => None,
        })
    }

    /// The quoted name, i.e. the first text value.
    pub fn name(&self) -> Option<&str> {
        self.values.iter().find_map(|v| match v {
            WktValue::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn number(&self, index: usize) -> Option<f64> {
        self.values
            .iter()
            .filter_map(|v| match v {
                WktValue::Number(n) => Some(*n),
                _ => None,
            })
            .nth(index)
    }

    /// The value of `PARAMETER["name", value]`.
    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.children("PARAMETER")
            .find(|p| p.name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
            .and_then(|p| p.number(0))
    }
}

struct WktParser<'a> {
    input: &'a [u8],
    pos: usize,
}

pub fn parse_wkt(text: &str) -> Result<WktNode, String> {
    let mut parser = WktParser {
        input: text.trim().as_bytes(),
        pos: 0,
    };
    let node = parser.node()?;
    parser.skip_whitespace();
    if parser.pos != parser.input.len() {
        return Err(format!("trailing input at offset {}", parser.pos));
    }
    Ok(node)
}

impl WktParser<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn keyword(&mut self) -> Result<String, String> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(format!("expected keyword at offset {}", start));
        }
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    fn node(&mut self) -> Result<WktNode, String> {
        let keyword = self.keyword()?;
        self.skip_whitespace();
        let close = match self.peek() {
            Some(b'[') => b']',
            Some(b'(') => b')',
            _ => return Err(format!("expected '[' after {}", keyword)),
        };
        self.pos += 1;

        let mut values = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(c) if c == close => {
                    self.pos += 1;
                    break;
                }
                Some(b',') if !values.is_empty() => self.pos += 1,
                Some(_) => values.push(self.value()?),
                None => return Err(format!("unterminated {}", keyword)),
            }
        }

        Ok(WktNode { keyword, values })
    }

    fn value(&mut self) -> Result<WktValue, String> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'"') => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|c| c != b'"') {
                    self.pos += 1;
                }
                if self.peek().is_none() {
                    return Err("unterminated string".to_string());
                }
                let text = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
                self.pos += 1;
                Ok(WktValue::Text(text))
            }
            Some(c) if c == b'-' || c == b'+' || c == b'.' || c.is_ascii_digit() => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| c.is_ascii_digit() || matches!(c, b'-' | b'+' | b'.' | b'e' | b'E'))
                {
                    self.pos += 1;
                }
                let raw = String::from_utf8_lossy(&self.input[start..self.pos]);
                raw.parse()
                    .map(WktValue::Number)
                    .map_err(|_| format!("bad number '{}'", raw))
            }
            Some(_) => {
                let checkpoint = self.pos;
                let keyword = self.keyword()?;
                self.skip_whitespace();
                if matches!(self.peek(), Some(b'[') | Some(b'(')) {
                    self.pos = checkpoint;
                    Ok(WktValue::Node(self.node()?))
                } else {
                    // Bare enumerations such as AXIS["Lat",NORTH].
                    Ok(WktValue::Text(keyword))
                }
            }
            None => Err("unexpected end of input".to_string()),
        }
    }
}

// -- Reference systems -------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis in metres.
    pub a: f64,
    /// First eccentricity squared.
    pub e2: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        a: 6_378_137.0,
        e2: 0.006_694_379_990_14,
    };

    pub fn from_inverse_flattening(a: f64, inverse_flattening: f64) -> Self {
        if inverse_flattening == 0.0 {
            return Ellipsoid { a, e2: 0.0 };
        }
        let f = 1.0 / inverse_flattening;
        Ellipsoid { a, e2: 2.0 * f - f * f }
    }

    fn e(&self) -> f64 {
        self.e2.sqrt()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Method {
    WebMercator,
    Mercator { k0: f64 },
    TransverseMercator { k0: f64, lat0: f64 },
    LambertConformalConic { lat0: f64, lat1: f64, lat2: f64, k0: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub method: Method,
    pub ellipsoid: Ellipsoid,
    /// Central meridian in radians.
    pub lon0: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    /// Metres per projected unit.
    pub unit: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateReference {
    Wgs84,
    Geographic { datum: String },
    Projected(Projection),
}

impl CoordinateReference {
    /// Reads the `.prj` sidecar next to `shp_path`. `None` when there is none.
    pub fn from_sidecar(shp_path: &Path) -> Result<Option<Self>, SpatialError> {
        let prj_path = shp_path.with_extension("prj");
        if !prj_path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&prj_path)?;
        let root = parse_wkt(&text).map_err(|e| SpatialError::CrsParse(prj_path.clone(), e))?;
        Self::from_wkt(&root).map(Some)
    }

    pub fn from_wkt(root: &WktNode) -> Result<Self, SpatialError> {
        match root.keyword.to_ascii_uppercase().as_str() {
            "GEOGCS" | "GEOGCRS" => Ok(geographic(root)),
            "PROJCS" | "PROJCRS" => projected(root).map(CoordinateReference::Projected),
            other => Err(SpatialError::UnsupportedProjection(other.to_string())),
        }
    }

    pub fn is_wgs84(&self) -> bool {
        matches!(self, CoordinateReference::Wgs84)
    }

    /// Longitude/latitude in degrees for one coordinate of this reference.
    pub fn to_wgs84(&self, coord: Coord<f64>) -> Coord<f64> {
        match self {
            CoordinateReference::Wgs84 | CoordinateReference::Geographic { .. } => coord,
            CoordinateReference::Projected(projection) => projection.inverse(coord),
        }
    }

    pub fn reproject(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        geometry.map_coords(|coord| self.to_wgs84(coord))
    }
}

fn geographic(node: &WktNode) -> CoordinateReference {
    let datum = node
        .child("DATUM")
        .and_then(WktNode::name)
        .unwrap_or_default()
        .to_string();
    let normalized = datum.to_ascii_uppercase().replace([' ', '-'], "_");

    if normalized.contains("WGS_1984") || normalized.contains("WGS84") || normalized.contains("WORLD_GEODETIC_SYSTEM_1984") {
        CoordinateReference::Wgs84
    } else {
        CoordinateReference::Geographic { datum }
    }
}

fn projected(root: &WktNode) -> Result<Projection, SpatialError> {
    let method_name = root
        .child("PROJECTION")
        .or_else(|| root.child("METHOD"))
        .and_then(WktNode::name)
        .unwrap_or_default()
        .to_string();

    let ellipsoid = root
        .child("GEOGCS")
        .and_then(|g| g.child("DATUM"))
        .and_then(|d| d.child("SPHEROID").or_else(|| d.child("ELLIPSOID")))
        .and_then(|s| Some(Ellipsoid::from_inverse_flattening(s.number(0)?, s.number(1)?)))
        .unwrap_or(Ellipsoid::WGS84);

    let param = |name: &str, default: f64| root.parameter(name).unwrap_or(default);
    let lat0 = param("latitude_of_origin", 0.0).to_radians();
    let k0 = param("scale_factor", 1.0);

    let normalized = method_name.to_ascii_lowercase().replace(' ', "_");
    let method = if normalized.contains("auxiliary_sphere") || normalized.contains("pseudo_mercator") || normalized.contains("popular_visualisation") {
        Method::WebMercator
    } else if normalized.starts_with("mercator") {
        let k0 = match root.parameter("standard_parallel_1") {
            Some(lat1) => {
                let phi = lat1.to_radians();
                phi.cos() / (1.0 - ellipsoid.e2 * phi.sin().powi(2)).sqrt()
            }
            None => k0,
        };
        Method::Mercator { k0 }
    } else if normalized.starts_with("transverse_mercator") {
        Method::TransverseMercator { k0, lat0 }
    } else if normalized.starts_with("lambert_conformal_conic") {
        let lat1 = root.parameter("standard_parallel_1").map_or(lat0, f64::to_radians);
        let lat2 = root.parameter("standard_parallel_2").map_or(lat1, f64::to_radians);
        Method::LambertConformalConic { lat0, lat1, lat2, k0 }
    } else {
        return Err(SpatialError::UnsupportedProjection(method_name));
    };

    let unit = root
        .children("UNIT")
        .last()
        .and_then(|u| u.number(0))
        .unwrap_or(1.0);

    Ok(Projection {
        method,
        ellipsoid,
        lon0: param("central_meridian", 0.0).to_radians(),
        false_easting: param("false_easting", 0.0),
        false_northing: param("false_northing", 0.0),
        unit,
    })
}

// -- Inverse projections -----------------------------------------------------

impl Projection {
    pub fn inverse(&self, coord: Coord<f64>) -> Coord<f64> {
        let x = (coord.x - self.false_easting) * self.unit;
        let y = (coord.y - self.false_northing) * self.unit;

        let (lon, lat) = match &self.method {
            Method::WebMercator => {
                let a = self.ellipsoid.a;
                (self.lon0 + x / a, FRAC_PI_2 - 2.0 * (-y / a).exp().atan())
            }
            Method::Mercator { k0 } => {
                let ak = self.ellipsoid.a * k0;
                let t = (-y / ak).exp();
                (self.lon0 + x / ak, latitude_from_t(t, self.ellipsoid.e()))
            }
            Method::TransverseMercator { k0, lat0 } => self.inverse_tm(x, y, *k0, *lat0),
            Method::LambertConformalConic { lat0, lat1, lat2, k0 } => {
                self.inverse_lcc(x, y, *lat0, *lat1, *lat2, *k0)
            }
        };

        Coord {
            x: normalize_longitude(lon.to_degrees()),
            y: lat.to_degrees(),
        }
    }

    fn inverse_tm(&self, x: f64, y: f64, k0: f64, lat0: f64) -> (f64, f64) {
        let Ellipsoid { a, e2 } = self.ellipsoid;
        let ep2 = e2 / (1.0 - e2);

        let m = meridian_arc(lat0, a, e2) + y / k0;
        let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0));
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let (sin1, cos1, tan1) = (phi1.sin(), phi1.cos(), phi1.tan());
        let c1 = ep2 * cos1.powi(2);
        let t1 = tan1.powi(2);
        let n1 = a / (1.0 - e2 * sin1.powi(2)).sqrt();
        let r1 = a * (1.0 - e2) / (1.0 - e2 * sin1.powi(2)).powf(1.5);
        let d = x / (n1 * k0);

        let lat = phi1
            - (n1 * tan1 / r1)
                * (d.powi(2) / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1.powi(2) - 9.0 * ep2) * d.powi(4) / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1.powi(2) - 252.0 * ep2 - 3.0 * c1.powi(2))
                        * d.powi(6)
                        / 720.0);
        let lon = self.lon0
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1.powi(2) + 8.0 * ep2 + 24.0 * t1.powi(2))
                    * d.powi(5)
                    / 120.0)
                / cos1;

        (lon, lat)
    }

    fn inverse_lcc(&self, x: f64, y: f64, lat0: f64, lat1: f64, lat2: f64, k0: f64) -> (f64, f64) {
        let a = self.ellipsoid.a;
        let e = self.ellipsoid.e();

        let m1 = conformal_m(lat1, self.ellipsoid.e2);
        let m2 = conformal_m(lat2, self.ellipsoid.e2);
        let t0 = conformal_t(lat0, e);
        let t1 = conformal_t(lat1, e);
        let t2 = conformal_t(lat2, e);

        let n = if (lat1 - lat2).abs() < 1e-12 {
            lat1.sin()
        } else {
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        };
        let f = m1 / (n * t1.powf(n));
        let rho0 = a * f * k0 * t0.powf(n);

        let dy = rho0 - y;
        let rho = n.signum() * (x * x + dy * dy).sqrt();
        let theta = if n >= 0.0 { x.atan2(dy) } else { (-x).atan2(-dy) };
        let t = (rho / (a * f * k0)).powf(1.0 / n);

        (theta / n + self.lon0, latitude_from_t(t, e))
    }
}

fn meridian_arc(phi: f64, a: f64, e2: f64) -> f64 {
    a * ((1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0) * phi
        - (3.0 * e2 / 8.0 + 3.0 * e2.powi(2) / 32.0 + 45.0 * e2.powi(3) / 1024.0) * (2.0 * phi).sin()
        + (15.0 * e2.powi(2) / 256.0 + 45.0 * e2.powi(3) / 1024.0) * (4.0 * phi).sin()
        - (35.0 * e2.powi(3) / 3072.0) * (6.0 * phi).sin())
}

fn conformal_m(phi: f64, e2: f64) -> f64 {
    phi.cos() / (1.0 - e2 * phi.sin().powi(2)).sqrt()
}

fn conformal_t(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

/// Solves the isometric latitude relation for phi by fixed-point iteration.
fn latitude_from_t(t: f64, e: f64) -> f64 {
    let mut phi = FRAC_PI_2 - 2.0 * t.atan();
    for _ in 0..15 {
        let es = e * phi.sin();
        let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - es) / (1.0 + es)).powf(e / 2.0)).atan();
        if (next - phi).abs() < 1e-12 {
            return next;
        }
        phi = next;
    }
    phi
}

fn normalize_longitude(lon: f64) -> f64 {
    if lon.abs() <= 180.0 + 1e-9 {
        lon.clamp(-180.0, 180.0)
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

// -- Tests -------------------------------------------------------------------
