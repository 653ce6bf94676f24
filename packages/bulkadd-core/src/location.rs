use crate::client::{CreateLocationRequest, LibrenmsApi, LocationsResponse};
use tracing::{error, info, warn};

/// Coordinates used when a location is created without any in the row.
pub const DEFAULT_LAT: f64 = -32.0000;
pub const DEFAULT_LNG: f64 = 115.0000;

/// Return an existing location's id by name, or create it and return the
/// new id. All failures are logged here and collapse to `None`; nothing
/// propagates to the caller.
///
/// Lookup and creation are two separate network calls, so concurrent runs
/// could race and create duplicate names. Sequential use avoids this.
pub async fn resolve_or_create<A: LibrenmsApi>(
    api: &A,
    name: &str,
    lat: Option<f64>,
    lng: Option<f64>,
) -> Option<u64> {
    // 1. Check if it already exists. A failed listing is not fatal; we
    //    fall through and attempt creation regardless.
    match api.list_locations().await {
        Ok(listing) => {
            if let Some(id) = find_by_name(&listing, name) {
                info!("Location '{}' exists (ID {})", name, id);
                return Some(id);
            }
        }
        Err(e) => warn!("Can't list locations: {:#}", e),
    }

    // 2. Create with the given or default coordinates.
    let request = CreateLocationRequest {
        location: name.to_string(),
        lat: format_coordinate(lat.unwrap_or(DEFAULT_LAT)),
        lng: format_coordinate(lng.unwrap_or(DEFAULT_LNG)),
        fixed_coordinates: 1,
    };

    match api.create_location(&request).await {
        Ok(created) => {
            let id = created
                .id
                .or(created.location_id)
                .or_else(|| created.message.as_deref().and_then(extract_id_from_message));
            match id {
                Some(id) => {
                    info!("Created location '{}' (ID {})", name, id);
                    Some(id)
                }
                None => {
                    error!("Could not create location '{}': response carried no id", name);
                    None
                }
            }
        }
        Err(e) => {
            error!("Could not create location '{}': {:#}", name, e);
            None
        }
    }
}

fn find_by_name(listing: &LocationsResponse, name: &str) -> Option<u64> {
    listing
        .locations
        .iter()
        .find(|entry| entry.location == name)
        .map(|entry| entry.id)
}

/// The API expects coordinates as strings in the creation payload.
fn format_coordinate(value: f64) -> String {
    format!("{}", value)
}

/// Best-effort extraction of a location id from a free-text message like
/// "Location added with id #123". The format is undocumented upstream;
/// the '#' may or may not be present.
fn extract_id_from_message(message: &str) -> Option<u64> {
    let mut rest = message;
    while let Some(pos) = rest.find("id") {
        let tail = &rest[pos + 2..];
        let trimmed = tail.trim_start();
        // Require whitespace between "id" and the number so we don't
        // match the tail of an unrelated word.
        if trimmed.len() < tail.len() {
            let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            if end > 0 {
                if let Ok(id) = digits[..end].parse() {
                    return Some(id);
                }
            }
        }
        rest = tail;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LocationEntry;
    use serde_json::json;

    fn listing(entries: &[(u64, &str)]) -> LocationsResponse {
        LocationsResponse {
            locations: entries
                .iter()
                .map(|(id, location)| LocationEntry {
                    id: *id,
                    location: location.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_find_by_name_exact_match() {
        let listing = listing(&[(3, "HQ"), (7, "Depot")]);
        assert_eq!(find_by_name(&listing, "Depot"), Some(7));
        assert_eq!(find_by_name(&listing, "Warehouse"), None);
    }

    #[test]
    fn test_find_by_name_is_case_sensitive() {
        let listing = listing(&[(3, "HQ")]);
        assert_eq!(find_by_name(&listing, "hq"), None);
        assert_eq!(find_by_name(&listing, "HQ"), Some(3));
    }

    #[test]
    fn test_extract_id_with_hash() {
        assert_eq!(
            extract_id_from_message("Location added with id #123"),
            Some(123)
        );
    }

    #[test]
    fn test_extract_id_without_hash() {
        assert_eq!(extract_id_from_message("created with id 45."), Some(45));
    }

    #[test]
    fn test_extract_id_requires_whitespace() {
        // "valid" contains "id" but carries no number after it
        assert_eq!(extract_id_from_message("payload was valid"), None);
        assert_eq!(
            extract_id_from_message("request valid, assigned id #9"),
            Some(9)
        );
    }

    #[test]
    fn test_extract_id_no_match() {
        assert_eq!(extract_id_from_message("Location added"), None);
        assert_eq!(extract_id_from_message("id #"), None);
        assert_eq!(extract_id_from_message(""), None);
    }

    #[test]
    fn test_create_request_serialization() {
        let request = CreateLocationRequest {
            location: "HQ".to_string(),
            lat: format_coordinate(-31.9),
            lng: format_coordinate(115.8),
            fixed_coordinates: 1,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "location": "HQ",
                "lat": "-31.9",
                "lng": "115.8",
                "fixed_coordinates": 1
            })
        );
    }

    #[test]
    fn test_default_coordinates() {
        assert_eq!(format_coordinate(DEFAULT_LAT), "-32");
        assert_eq!(format_coordinate(DEFAULT_LNG), "115");
    }
}
