use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// The device table could not be read or parsed. This is the one fatal
/// error in the program: the run aborts before any device is touched.
#[derive(Debug, Error)]
#[error("cannot load device table {path}: {source}")]
pub struct TableError {
    path: String,
    #[source]
    source: csv::Error,
}

/// Raw CSV row as deserialized by the reader. Optional columns that are
/// absent from the header, and empty cells in present columns, both come
/// through as `None`.
#[derive(Debug, Deserialize)]
struct RawRow {
    hostname: String,
    #[serde(default)]
    community: Option<String>,
    #[serde(default)]
    syslocation: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lng: Option<f64>,
    #[serde(default)]
    snmp_force: Option<String>,
    #[serde(default)]
    snmp_version: Option<String>,
    #[serde(default)]
    sysname: Option<String>,
    #[serde(default)]
    hardware: Option<String>,
}

/// One device to provision, with all defaults already applied.
/// Presence of `community` selects SNMP mode; its absence, ping-only mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceRecord {
    pub hostname: String,
    pub community: Option<String>,
    pub syslocation: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub snmp_force: bool,
    pub snmp_version: String,
    pub sysname: String,
    pub hardware: String,
}

impl DeviceRecord {
    pub fn is_snmp(&self) -> bool {
        self.community.is_some()
    }
}

/// Trim a cell and drop it entirely when it is empty.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Apply trimming and defaults. Returns `None` when the hostname is empty
/// after trimming; such rows are skipped with a warning by the loader.
fn record_from_row(row: RawRow) -> Option<DeviceRecord> {
    let hostname = row.hostname.trim().to_string();
    if hostname.is_empty() {
        return None;
    }

    let snmp_force = non_empty(row.snmp_force)
        .map(|v| v.to_ascii_lowercase() == "true")
        .unwrap_or(false);

    Some(DeviceRecord {
        hostname,
        community: non_empty(row.community),
        syslocation: non_empty(row.syslocation),
        lat: row.lat,
        lng: row.lng,
        snmp_force,
        snmp_version: non_empty(row.snmp_version).unwrap_or_else(|| "v2c".to_string()),
        sysname: non_empty(row.sysname).unwrap_or_default(),
        hardware: non_empty(row.hardware).unwrap_or_default(),
    })
}

/// Load the device table from a CSV file with a header row.
///
/// Any failure to read or parse the file is returned as a `TableError`;
/// rows without a usable hostname are skipped, not fatal.
pub fn load_records(path: &Path) -> Result<Vec<DeviceRecord>, TableError> {
    let display = path.display().to_string();
    let wrap = |source: csv::Error| TableError {
        path: display.clone(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(wrap)?;

    let mut records = Vec::new();
    for row in reader.deserialize::<RawRow>() {
        let row = row.map_err(wrap)?;
        match record_from_row(row) {
            Some(record) => records.push(record),
            None => tracing::warn!("Skipping row with empty hostname"),
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn load_csv(content: &str) -> Result<Vec<DeviceRecord>, TableError> {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        load_records(file.path())
    }

    #[test]
    fn test_full_row() {
        let records = load_csv(
            "hostname,community,syslocation,lat,lng,snmp_force,snmp_version,sysname,hardware\n\
             sw1,public,HQ,-31.9,115.8,true,v2c,core-sw1,C9300\n",
        )
        .unwrap();
        assert_eq!(
            records,
            vec![DeviceRecord {
                hostname: "sw1".to_string(),
                community: Some("public".to_string()),
                syslocation: Some("HQ".to_string()),
                lat: Some(-31.9),
                lng: Some(115.8),
                snmp_force: true,
                snmp_version: "v2c".to_string(),
                sysname: "core-sw1".to_string(),
                hardware: "C9300".to_string(),
            }]
        );
    }

    #[test]
    fn test_missing_columns_use_defaults() {
        let records = load_csv("hostname\nsw1\n").unwrap();
        let record = &records[0];
        assert_eq!(record.hostname, "sw1");
        assert_eq!(record.community, None);
        assert_eq!(record.syslocation, None);
        assert!(!record.snmp_force);
        assert_eq!(record.snmp_version, "v2c");
        assert_eq!(record.sysname, "");
        assert_eq!(record.hardware, "");
        assert!(!record.is_snmp());
    }

    #[test]
    fn test_empty_cells_match_missing_columns() {
        let records = load_csv(
            "hostname,community,syslocation,lat,lng,snmp_force,snmp_version,sysname,hardware\n\
             sw1,,,,,,,,\n",
        )
        .unwrap();
        let record = &records[0];
        assert_eq!(record.community, None);
        assert_eq!(record.lat, None);
        assert_eq!(record.lng, None);
        assert!(!record.snmp_force);
        assert_eq!(record.snmp_version, "v2c");
        assert_eq!(record.sysname, "");
    }

    #[test]
    fn test_hostname_trimmed() {
        let records = load_csv("hostname\n  sw1  \n").unwrap();
        assert_eq!(records[0].hostname, "sw1");
    }

    #[test]
    fn test_blank_hostname_row_skipped() {
        let records = load_csv("hostname,community\n   ,public\nsw2,public\n").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hostname, "sw2");
    }

    #[test]
    fn test_snmp_force_parsing() {
        let records = load_csv(
            "hostname,snmp_force\n\
             a,true\n\
             b,TRUE\n\
             c,false\n\
             d,yes\n\
             e,\n",
        )
        .unwrap();
        let flags: Vec<bool> = records.iter().map(|r| r.snmp_force).collect();
        assert_eq!(flags, vec![true, true, false, false, false]);
    }

    #[test]
    fn test_missing_hostname_column_is_fatal() {
        assert!(load_csv("community\npublic\n").is_err());
    }

    #[test]
    fn test_unparsable_coordinate_is_fatal() {
        assert!(load_csv("hostname,lat\nsw1,north\n").is_err());
    }

    #[test]
    fn test_missing_file_is_fatal() {
        assert!(load_records(Path::new("data/does-not-exist.csv")).is_err());
    }
}
