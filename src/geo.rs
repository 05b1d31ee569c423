//! Geospatial filter builders and coordinate validation.
//!
//! Everything here runs before a request is built; failures are
//! [`TrafficError::Validation`] and never reach the network.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TrafficError};

/// Largest radius accepted for circle filters.
pub const MAX_RADIUS_METERS: u32 = 100_000;

/// How the API should describe road locations in its response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LocationReference {
    #[default]
    Shape,
    Tmc,
    Olr,
}

impl LocationReference {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationReference::Shape => "shape",
            LocationReference::Tmc => "tmc",
            LocationReference::Olr => "olr",
        }
    }
}

impl fmt::Display for LocationReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationReference {
    type Err = TrafficError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shape" => Ok(LocationReference::Shape),
            "tmc" => Ok(LocationReference::Tmc),
            "olr" => Ok(LocationReference::Olr),
            other => Err(TrafficError::Validation(format!(
                "Unknown location referencing {:?}, expected shape, tmc or olr",
                other
            ))),
        }
    }
}

/// Builders for the v7 `in=` parameter.
pub struct GeospatialFilter;

impl GeospatialFilter {
    /// `circle:LAT,LON;r=RADIUS`
    pub fn circle(latitude: f64, longitude: f64, radius_meters: u32) -> Result<String> {
        let latitude = validate_latitude(latitude)?;
        let longitude = validate_longitude(longitude)?;
        let radius = validate_radius_meters(radius_meters)?;
        Ok(format!("circle:{},{};r={}", latitude, longitude, radius))
    }

    /// `bbox:LAT1,LON1;LAT2,LON2`
    pub fn bbox(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<String> {
        Ok(format!("bbox:{}", bbox_pair(lat1, lon1, lat2, lon2)?))
    }

    /// `corridor:POLYLINE`
    pub fn corridor(encoded_polyline: &str) -> Result<String> {
        Ok(format!(
            "corridor:{}",
            validate_encoded_polyline(encoded_polyline)?
        ))
    }
}

pub fn validate_latitude(lat: f64) -> Result<f64> {
    if !lat.is_finite() {
        return Err(TrafficError::Validation(format!(
            "Latitude must be a number, got {}",
            lat
        )));
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(TrafficError::Validation(format!(
            "Latitude must be between -90 and 90, got {}",
            lat
        )));
    }
    Ok(lat)
}

pub fn validate_longitude(lon: f64) -> Result<f64> {
    if !lon.is_finite() {
        return Err(TrafficError::Validation(format!(
            "Longitude must be a number, got {}",
            lon
        )));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(TrafficError::Validation(format!(
            "Longitude must be between -180 and 180, got {}",
            lon
        )));
    }
    Ok(lon)
}

pub fn validate_radius_meters(radius_meters: u32) -> Result<u32> {
    if radius_meters > MAX_RADIUS_METERS {
        return Err(TrafficError::Validation(format!(
            "Radius too large (max {}m), got {}",
            MAX_RADIUS_METERS, radius_meters
        )));
    }
    Ok(radius_meters)
}

/// Rejects filter-grammar delimiters and control characters anywhere in the
/// input, including surrounding whitespace. Returns the trimmed polyline.
pub fn validate_encoded_polyline(encoded_polyline: &str) -> Result<&str> {
    if encoded_polyline
        .chars()
        .any(|c| matches!(c, ';' | '\n' | '\r' | '\t'))
    {
        return Err(TrafficError::Validation(
            "Encoded polyline contains invalid characters".to_string(),
        ));
    }
    let value = encoded_polyline.trim();
    if value.is_empty() {
        return Err(TrafficError::Validation(
            "Encoded polyline must be non-empty".to_string(),
        ));
    }
    Ok(value)
}

/// Light sanity check of a caller-built `in=` value; does not parse the
/// filter grammar.
pub fn validate_geospatial_filter(filter: &str) -> Result<&str> {
    if filter.chars().any(char::is_control) {
        return Err(TrafficError::Validation(
            "geospatial filter contains invalid characters".to_string(),
        ));
    }
    let value = filter.trim();
    if value.is_empty() {
        return Err(TrafficError::Validation(
            "geospatial filter must be non-empty".to_string(),
        ));
    }
    Ok(value)
}

/// Parses `LAT1,LON1;LAT2,LON2` (whitespace tolerant), range-checks each
/// coordinate and returns the normalised string.
pub fn validate_bbox_string(bbox: &str) -> Result<String> {
    let format_error =
        || TrafficError::Validation("bbox must be in format \"LAT1,LON1;LAT2,LON2\"".to_string());

    let (first, second) = bbox.split_once(';').ok_or_else(format_error)?;
    let (lat1, lon1) = parse_coordinate_pair(first).ok_or_else(format_error)?;
    let (lat2, lon2) = parse_coordinate_pair(second).ok_or_else(format_error)?;
    bbox_pair(lat1, lon1, lat2, lon2)
}

fn bbox_pair(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<String> {
    Ok(format!(
        "{},{};{},{}",
        validate_latitude(lat1)?,
        validate_longitude(lon1)?,
        validate_latitude(lat2)?,
        validate_longitude(lon2)?
    ))
}

fn parse_coordinate_pair(raw: &str) -> Option<(f64, f64)> {
    let (a, b) = raw.split_once(',')?;
    Some((parse_decimal(a)?, parse_decimal(b)?))
}

/// Accepts only `-?DIGITS(.DIGITS)?`, so exponents, `inf` and `NaN` are rejected.
fn parse_decimal(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };
    let all_digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !frac_part.is_none_or(all_digits) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_circle_filter() {
        assert_eq!(
            GeospatialFilter::circle(51.50643, -0.12719, 1000).unwrap(),
            "circle:51.50643,-0.12719;r=1000"
        );
    }

    #[test]
    fn test_bbox_filter() {
        assert_eq!(
            GeospatialFilter::bbox(51.5, -0.13, 51.51, -0.12).unwrap(),
            "bbox:51.5,-0.13;51.51,-0.12"
        );
    }

    #[test]
    fn test_corridor_filter_is_trimmed() {
        assert_eq!(
            GeospatialFilter::corridor("  BFoz5xJ67i1B1B7PzIhaxL7Y  ").unwrap(),
            "corridor:BFoz5xJ67i1B1B7PzIhaxL7Y"
        );
    }

    #[test]
    fn test_circle_rejects_out_of_range() {
        for (lat, lon, r) in [
            (90.1, 0.0, 10),
            (-91.0, 0.0, 10),
            (0.0, 180.5, 10),
            (f64::NAN, 0.0, 10),
            (0.0, f64::INFINITY, 10),
            (0.0, 0.0, 100_001),
        ] {
            let err = GeospatialFilter::circle(lat, lon, r).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        assert!(GeospatialFilter::circle(90.0, -180.0, 100_000).is_ok());
        assert!(GeospatialFilter::circle(-90.0, 180.0, 0).is_ok());
    }

    #[test]
    fn test_polyline_rejects_injection() {
        for bad in ["abc;r=5", "abc\n", "\tabc", "a\rb", "   ", ""] {
            assert!(validate_encoded_polyline(bad).is_err(), "{:?}", bad);
        }
    }

    #[test]
    fn test_geospatial_filter_validation() {
        assert_eq!(
            validate_geospatial_filter("  circle:1,2;r=3 ").unwrap(),
            "circle:1,2;r=3"
        );
        assert!(validate_geospatial_filter("circle:1,2\n").is_err());
        assert!(validate_geospatial_filter("\u{0}").is_err());
        assert!(validate_geospatial_filter("  ").is_err());
    }

    #[test]
    fn test_bbox_string_normalised() {
        assert_eq!(
            validate_bbox_string(" 51.5 , -0.13 ; 51.51,-0.12 ").unwrap(),
            "51.5,-0.13;51.51,-0.12"
        );
    }

    #[test]
    fn test_bbox_string_rejects_bad_input() {
        for bad in [
            "51.5,-0.13",
            "51.5,-0.13;51.51",
            "a,b;c,d",
            "1e2,0;0,0",
            "NaN,0;0,0",
            "+1,0;0,0",
            "1.,0;0,0",
            "91,0;0,0",
            "0,0;0,181",
            "1,2;3,4;5,6",
        ] {
            let err = validate_bbox_string(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{:?}", bad);
        }
    }

    #[test]
    fn test_location_reference_round_trip() {
        assert_eq!(LocationReference::default().as_str(), "shape");
        assert_eq!("TMC".parse::<LocationReference>().unwrap(), LocationReference::Tmc);
        assert!("gps".parse::<LocationReference>().is_err());
    }
}
