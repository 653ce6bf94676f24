use crate::client::{AddDeviceRequest, LibrenmsApi};
use crate::location;
use crate::table::DeviceRecord;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

/// Per-run outcome counts, so callers and tests can assert on results
/// without scraping log output.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Devices newly added this run
    pub created: usize,
    /// Rows skipped because the device already exists
    pub skipped: usize,
    /// Rows where device creation failed
    pub failed: usize,
}

/// Build the creation payload for one row.
///
/// No community selects ping-only mode, which is always force-added so the
/// server skips its SNMP pre-checks; the row's `snmp_force` flag only
/// applies to SNMP devices.
pub fn build_add_request(record: &DeviceRecord) -> AddDeviceRequest {
    match &record.community {
        None => AddDeviceRequest::PingOnly {
            hostname: record.hostname.clone(),
            sys_name: record.sysname.clone(),
            hardware: record.hardware.clone(),
            snmp_disable: "true".to_string(),
            force_add: "true".to_string(),
        },
        Some(community) => AddDeviceRequest::Snmp {
            hostname: record.hostname.clone(),
            community: community.clone(),
            version: record.snmp_version.clone(),
            force_add: record.snmp_force.then(|| "true".to_string()),
        },
    }
}

/// True only when the query succeeds and returns a non-empty device
/// collection. Any other outcome is treated as "does not exist".
pub async fn device_exists<A: LibrenmsApi>(api: &A, hostname: &str) -> bool {
    match api.get_devices(hostname).await {
        Ok(listing) => !listing.devices.is_empty(),
        Err(e) => {
            debug!("Existence check for {} failed: {:#}", hostname, e);
            false
        }
    }
}

/// Submit a creation request; on failure log the hostname, the likely
/// cause, and the raw server response, and return `None`.
pub async fn register_device<A: LibrenmsApi>(api: &A, request: &AddDeviceRequest) -> Option<u64> {
    match api.add_device(request).await {
        Ok(device_id) => Some(device_id),
        Err(e) => {
            error!(
                "Failed to add {} (likely SNMP check failed - wrong community, \
                 version [ensure lower case], or unreachable device)",
                request.hostname()
            );
            error!("  {:#}", e);
            None
        }
    }
}

/// Process every record in table order, one row fully completing before
/// the next begins. No failure crosses a row boundary; the only condition
/// that stops a run is the table failing to load, which happens before
/// this function is called.
pub async fn provision_all<A: LibrenmsApi>(api: &A, records: &[DeviceRecord]) -> RunReport {
    let mut report = RunReport::default();

    for record in records {
        if device_exists(api, &record.hostname).await {
            info!("Skipping {}: already exists", record.hostname);
            report.skipped += 1;
            continue;
        }

        let request = build_add_request(record);
        let Some(device_id) = register_device(api, &request).await else {
            report.failed += 1;
            continue;
        };
        info!("Added {} (device ID {})", record.hostname, device_id);
        report.created += 1;

        // The sysName field does not stick through creation; set the
        // display name explicitly afterwards.
        if !record.sysname.is_empty() {
            apply_update(api, device_id, &["display"], vec![json!(record.sysname)]).await;
        }

        // Location assignment is only attempted for freshly created
        // devices, never for rows skipped above.
        if let Some(name) = &record.syslocation {
            if let Some(location_id) =
                location::resolve_or_create(api, name, record.lat, record.lng).await
            {
                apply_update(
                    api,
                    device_id,
                    &["location_id", "sysLocation", "override_sysLocation"],
                    vec![json!(location_id), json!(name), json!(1)],
                )
                .await;
            }
        }
    }

    report
}

/// Partial-field update; the outcome status is logged and never affects
/// the rest of the run.
async fn apply_update<A: LibrenmsApi>(
    api: &A,
    device_id: u64,
    fields: &[&str],
    values: Vec<serde_json::Value>,
) {
    match api.update_device(device_id, fields, values).await {
        Ok(status) => info!("Updated device {}: {}", device_id, status),
        Err(e) => warn!("Update for device {} failed: {:#}", device_id, e),
    }
}
