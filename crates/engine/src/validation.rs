//! Request field validators.
//!
//! Rules enforced:
//! 1. Namespace-style IDs (database, pipeline, workflow) follow
//!    `^[a-z][-_a-z0-9]{3,63}$`; `GLOBAL` is accepted as a database ID.
//! 2. Asset IDs are 1–256 characters of `[A-Za-z0-9_.-]` and do not start
//!    with `.` or `-`.
//! 3. Free text (descriptions, tags, aliases) is at most 256 characters.
//! 4. Metadata values parse according to their declared type; an empty value
//!    is accepted for every type.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use db::models::MetadataValueType;
use db::GLOBAL_DATABASE_ID;

use crate::EngineError;

pub const MAX_TEXT_LEN: usize = 256;

const GEOJSON_TYPES: [&str; 9] = [
    "Point",
    "MultiPoint",
    "LineString",
    "MultiLineString",
    "Polygon",
    "MultiPolygon",
    "GeometryCollection",
    "Feature",
    "FeatureCollection",
];

/// Validate a namespace-style identifier.
pub fn validate_id(field: &str, value: &str) -> Result<(), EngineError> {
    let mut chars = value.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_lowercase());
    let rest_ok =
        chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');

    if !first_ok || !rest_ok || !(4..=64).contains(&value.len()) {
        return Err(EngineError::invalid(
            field,
            "must follow the regexp ^[a-z]([-_a-z0-9]){3,63}$",
        ));
    }
    Ok(())
}

/// Like [`validate_id`], but also accepts the reserved `GLOBAL` namespace.
pub fn validate_database_id(field: &str, value: &str) -> Result<(), EngineError> {
    if value == GLOBAL_DATABASE_ID {
        return Ok(());
    }
    validate_id(field, value)
}

/// Validate an asset identifier.
pub fn validate_asset_id(field: &str, value: &str) -> Result<(), EngineError> {
    if value.is_empty() || value.len() > MAX_TEXT_LEN {
        return Err(EngineError::invalid(field, "must be between 1 and 256 characters"));
    }
    if value.starts_with('.') || value.starts_with('-') {
        return Err(EngineError::invalid(field, "must not start with '.' or '-'"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(EngineError::invalid(
            field,
            "may only contain letters, digits, '-', '_' and '.'",
        ));
    }
    Ok(())
}

/// Reject text longer than [`MAX_TEXT_LEN`] characters.
pub fn validate_string_256(field: &str, value: &str) -> Result<(), EngineError> {
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(EngineError::invalid(field, "must be lower than 256 characters"));
    }
    Ok(())
}

/// File extensions such as `.glb`: a dot followed by 1–7 lowercase
/// alphanumerics.
pub fn validate_file_extension(field: &str, value: &str) -> Result<(), EngineError> {
    let ok = value
        .strip_prefix('.')
        .is_some_and(|ext| {
            (1..=7).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        });
    if !ok {
        return Err(EngineError::invalid(field, "must follow the regexp ^[\\.]([a-z0-9]){1,7}$"));
    }
    Ok(())
}

/// Check `value` against the rules of `value_type`.
pub fn validate_metadata_value(
    value: &str,
    value_type: MetadataValueType,
) -> Result<(), EngineError> {
    if value.is_empty() {
        return Ok(());
    }

    let fail = |message: &str| EngineError::InvalidMetadataValue {
        value_type,
        message: message.to_owned(),
    };

    match value_type {
        MetadataValueType::String
        | MetadataValueType::MultilineString
        | MetadataValueType::InlineControlledList => Ok(()),

        MetadataValueType::Number => value
            .trim()
            .parse::<f64>()
            .map(|_| ())
            .map_err(|_| fail("must be a valid number")),

        MetadataValueType::Boolean => match value.to_ascii_lowercase().as_str() {
            "true" | "false" => Ok(()),
            _ => Err(fail("must be 'true' or 'false'")),
        },

        MetadataValueType::Date => {
            if is_iso_date(value) {
                Ok(())
            } else {
                Err(fail("must be a valid ISO date format"))
            }
        }

        MetadataValueType::Json => serde_json::from_str::<Value>(value)
            .map(|_| ())
            .map_err(|_| fail("must be valid JSON")),

        MetadataValueType::Xyz => {
            check_numeric_object(value, &["x", "y", "z"]).map_err(|m| fail(&m))
        }

        MetadataValueType::Wxyz => {
            check_numeric_object(value, &["w", "x", "y", "z"]).map_err(|m| fail(&m))
        }

        MetadataValueType::Matrix4x4 => check_matrix4x4(value).map_err(|m| fail(&m)),

        MetadataValueType::Geopoint => check_geopoint(value).map_err(|m| fail(&m)),

        MetadataValueType::Geojson => {
            let json = parse_json(value).map_err(|m| fail(&m))?;
            match json.get("type").and_then(Value::as_str) {
                Some(t) if GEOJSON_TYPES.contains(&t) => Ok(()),
                _ => Err(fail("must be a GeoJSON object with a known 'type'")),
            }
        }

        MetadataValueType::Lla => check_lla(value).map_err(|m| fail(&m)),
    }
}

fn is_iso_date(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f").is_ok()
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

fn parse_json(value: &str) -> Result<Value, String> {
    serde_json::from_str(value).map_err(|_| "must be valid JSON".to_owned())
}

fn check_numeric_object(value: &str, keys: &[&str]) -> Result<(), String> {
    let json = parse_json(value)?;
    let obj = json.as_object().ok_or("must be a JSON object")?;
    for key in keys {
        match obj.get(*key) {
            Some(v) if v.is_number() => {}
            Some(_) => return Err(format!("coordinate '{key}' must be a number")),
            None => return Err(format!("must contain the keys {}", keys.join(", "))),
        }
    }
    Ok(())
}

fn check_matrix4x4(value: &str) -> Result<(), String> {
    let json = parse_json(value)?;
    let rows = json.as_array().ok_or("must be a JSON array")?;
    if rows.len() != 4 {
        return Err("must be a 4x4 matrix (4 rows)".to_owned());
    }
    for (i, row) in rows.iter().enumerate() {
        let row = row.as_array().ok_or(format!("row {i} must be an array"))?;
        if row.len() != 4 {
            return Err(format!("row {i} must contain exactly 4 elements"));
        }
        if let Some(j) = row.iter().position(|e| !e.is_number()) {
            return Err(format!("element at [{i}][{j}] must be a number"));
        }
    }
    Ok(())
}

fn check_geopoint(value: &str) -> Result<(), String> {
    let json = parse_json(value)?;
    if json.get("type").and_then(Value::as_str) != Some("Point") {
        return Err("type must be 'Point'".to_owned());
    }
    let coords = json
        .get("coordinates")
        .and_then(Value::as_array)
        .ok_or("must have a 'coordinates' array")?;
    if !(2..=3).contains(&coords.len()) || !coords.iter().all(Value::is_number) {
        return Err("coordinates must be 2 or 3 numbers".to_owned());
    }
    Ok(())
}

fn check_lla(value: &str) -> Result<(), String> {
    let json = parse_json(value)?;
    let obj = json.as_object().ok_or("must be a JSON object")?;
    let number = |key: &str| -> Result<f64, String> {
        obj.get(key)
            .ok_or("must contain 'lat', 'long', and 'alt' keys".to_owned())?
            .as_f64()
            .ok_or(format!("'{key}' must be a number"))
    };

    let lat = number("lat")?;
    let long = number("long")?;
    number("alt")?;

    if !(-90.0..=90.0).contains(&lat) {
        return Err("latitude must be between -90 and 90".to_owned());
    }
    if !(-180.0..=180.0).contains(&long) {
        return Err("longitude must be between -180 and 180".to_owned());
    }
    Ok(())
}
