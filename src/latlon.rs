//! Coordinate literal detection.
//!
//! Recognizes a raw query that *is* a coordinate pair (decimal degrees with
//! optional hemisphere markers, or degree/minute/second notation) and decodes
//! it. Anything else is a silent non-match; the textual pipeline always runs
//! regardless.

use once_cell::sync::Lazy;
use regex::Regex;

/// Decimal-degree pair: optional sign or hemisphere letter on each side,
/// optional degree symbol, comma/semicolon/whitespace separator.
static DECIMAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^\s*([ns])?\s*([+-]?\d{1,3}(?:\.\d+)?)\s*°?\s*([ns])?(?:\s*[,;]\s*|\s+)([ew])?\s*([+-]?\d{1,3}(?:\.\d+)?)\s*°?\s*([ew])?\s*$"#,
    )
    .unwrap()
});

/// Degree/minute/second pair. Hemisphere letters are mandatory here; without
/// them the notation is ambiguous.
static DMS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^\s*(\d{1,3})\s*[°d]\s*(\d{1,2})\s*['′m]\s*(?:(\d{1,2}(?:\.\d+)?)\s*(?:″|"|''|s))?\s*([ns])(?:\s*[,;]\s*|\s*)(\d{1,3})\s*[°d]\s*(\d{1,2})\s*['′m]\s*(?:(\d{1,2}(?:\.\d+)?)\s*(?:″|"|''|s))?\s*([ew])\s*$"#,
    )
    .unwrap()
});

/// A decoded coordinate literal. Precision is half the last supplied digit's
/// place value, per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
    pub lat_prec: f64,
    pub lon_prec: f64,
}

/// Half of the last decimal place supplied in `number`.
fn decimal_precision(number: &str) -> f64 {
    let frac_digits = number.split('.').nth(1).map_or(0, str::len);
    0.5 * 10f64.powi(-(frac_digits as i32))
}

/// Apply an optional hemisphere letter to a magnitude. `negative` holds the
/// letters that flip the sign ("s" for latitude, "w" for longitude).
fn signed(value: f64, hemisphere: Option<&str>, negative: char) -> f64 {
    match hemisphere {
        Some(h) if h.eq_ignore_ascii_case(&negative.to_string()) => -value.abs(),
        Some(_) => value.abs(),
        None => value,
    }
}

fn wrap_longitude(lon: f64) -> f64 {
    let mut lon = lon;
    while lon > 180.0 {
        lon -= 360.0;
    }
    while lon < -180.0 {
        lon += 360.0;
    }
    lon
}

fn match_decimal(query: &str) -> Option<LatLon> {
    let caps = DECIMAL_RE.captures(query)?;

    // Hemisphere letter may come before or after the number, not both.
    let lat_hem = match (caps.get(1), caps.get(3)) {
        (Some(_), Some(_)) => return None,
        (a, b) => a.or(b).map(|m| m.as_str()),
    };
    let lon_hem = match (caps.get(4), caps.get(6)) {
        (Some(_), Some(_)) => return None,
        (a, b) => a.or(b).map(|m| m.as_str()),
    };

    let lat_str = caps.get(2).unwrap().as_str();
    let lon_str = caps.get(5).unwrap().as_str();
    let lat = signed(lat_str.parse::<f64>().ok()?, lat_hem, 's');
    let lon = signed(lon_str.parse::<f64>().ok()?, lon_hem, 'w');

    if lat.abs() > 90.0 {
        return None;
    }

    Some(LatLon {
        lat,
        lon: wrap_longitude(lon),
        lat_prec: decimal_precision(lat_str),
        lon_prec: decimal_precision(lon_str),
    })
}

fn dms_value(deg: &str, min: &str, sec: Option<&str>) -> Option<(f64, f64)> {
    let deg: f64 = deg.parse().ok()?;
    let min: f64 = min.parse().ok()?;
    if min >= 60.0 {
        return None;
    }
    let (sec, prec) = match sec {
        Some(s) => {
            let v: f64 = s.parse().ok()?;
            if v >= 60.0 {
                return None;
            }
            (v, decimal_precision(s) / 3600.0)
        }
        None => (0.0, 0.5 / 60.0),
    };
    Some((deg + min / 60.0 + sec / 3600.0, prec))
}

fn match_dms(query: &str) -> Option<LatLon> {
    let caps = DMS_RE.captures(query)?;

    let (lat_mag, lat_prec) = dms_value(
        caps.get(1).unwrap().as_str(),
        caps.get(2).unwrap().as_str(),
        caps.get(3).map(|m| m.as_str()),
    )?;
    let (lon_mag, lon_prec) = dms_value(
        caps.get(5).unwrap().as_str(),
        caps.get(6).unwrap().as_str(),
        caps.get(7).map(|m| m.as_str()),
    )?;

    let lat = signed(lat_mag, caps.get(4).map(|m| m.as_str()), 's');
    let lon = signed(lon_mag, caps.get(8).map(|m| m.as_str()), 'w');

    if lat.abs() > 90.0 {
        return None;
    }

    Some(LatLon { lat, lon: wrap_longitude(lon), lat_prec, lon_prec })
}

/// Try to decode the whole query as a coordinate literal.
pub fn match_lat_lon(query: &str) -> Option<LatLon> {
    match_decimal(query).or_else(|| match_dms(query))
}
