use crate::config::ServerConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONNECTION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// The API operations the provisioning loop and location resolver drive.
/// `LibrenmsClient` is the HTTP implementation.
#[async_trait]
pub trait LibrenmsApi {
    /// Fetch the full remote location list.
    async fn list_locations(&self) -> Result<LocationsResponse>;

    /// Create a new location with fixed coordinates.
    async fn create_location(
        &self,
        request: &CreateLocationRequest,
    ) -> Result<CreateLocationResponse>;

    /// Query devices matching a hostname. An empty `devices` array means
    /// the device is not registered.
    async fn get_devices(&self, hostname: &str) -> Result<DevicesResponse>;

    /// Submit a device creation request and return the new device id.
    async fn add_device(&self, request: &AddDeviceRequest) -> Result<u64>;

    /// Submit a partial device update: `fields[i]` pairs with `values[i]`.
    /// Success is determined by status alone; the status is returned so
    /// callers can log it.
    async fn update_device(
        &self,
        device_id: u64,
        fields: &[&str],
        values: Vec<serde_json::Value>,
    ) -> Result<StatusCode>;
}

/// HTTP client for the LibreNMS management API.
///
/// Holds a single `reqwest::Client` carrying the fixed header set every
/// request needs (JSON content negotiation, `X-Auth-Token`, keep-alive),
/// so individual calls only supply the path and payload.
#[derive(Debug, Clone)]
pub struct LibrenmsClient {
    http: reqwest::Client,
    base_url: String,
}

impl LibrenmsClient {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(
            "X-Auth-Token",
            HeaderValue::from_str(&config.api_token)
                .context("API token contains invalid header characters")?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl LibrenmsApi for LibrenmsClient {
    async fn list_locations(&self) -> Result<LocationsResponse> {
        let url = format!("{}/resources/locations", self.base_url);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to query locations")?;

        if !resp.status().is_success() {
            return Err(anyhow::anyhow!("Server returned error: {}", resp.status()));
        }

        resp.json::<LocationsResponse>()
            .await
            .context("Failed to parse location listing")
    }

    async fn create_location(
        &self,
        request: &CreateLocationRequest,
    ) -> Result<CreateLocationResponse> {
        let url = format!("{}/locations", self.base_url);

        let resp = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .context("Failed to submit location creation")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Server returned error: {} - {}",
                status,
                body
            ));
        }

        resp.json::<CreateLocationResponse>()
            .await
            .context("Failed to parse location creation response")
    }

    async fn get_devices(&self, hostname: &str) -> Result<DevicesResponse> {
        let url = format!("{}/devices/{}", self.base_url, hostname);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to query device")?;

        if !resp.status().is_success() {
            return Err(anyhow::anyhow!("Server returned error: {}", resp.status()));
        }

        resp.json::<DevicesResponse>()
            .await
            .context("Failed to parse device listing")
    }

    /// Any non-success status, empty device collection, or unparsable body
    /// is an error carrying the raw status and body for diagnostics.
    async fn add_device(&self, request: &AddDeviceRequest) -> Result<u64> {
        let url = format!("{}/devices", self.base_url);

        let resp = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .context("Failed to submit device creation")?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .context("Failed to read device creation response")?;

        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "Server returned error: {} - {}",
                status,
                body
            ));
        }

        let parsed: DevicesResponse = serde_json::from_str(&body).with_context(|| {
            format!("Failed to parse device creation response: {} - {}", status, body)
        })?;

        parsed
            .devices
            .first()
            .and_then(|d| d.device_id)
            .ok_or_else(|| {
                anyhow::anyhow!("Response contained no device id: {} - {}", status, body)
            })
    }

    async fn update_device(
        &self,
        device_id: u64,
        fields: &[&str],
        values: Vec<serde_json::Value>,
    ) -> Result<StatusCode> {
        let url = format!("{}/devices/{}", self.base_url, device_id);

        let request = UpdateDeviceRequest {
            field: fields.iter().map(|f| f.to_string()).collect(),
            data: values,
        };

        let resp = self
            .http
            .patch(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to submit device update")?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("Server returned error: {}", status));
        }

        Ok(status)
    }
}

/// Device creation payload. The two variants carry different field sets,
/// matching the two registration modes the API accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AddDeviceRequest {
    /// Reachability-only monitoring, SNMP polling disabled. Always
    /// force-added so the server skips its SNMP pre-checks.
    PingOnly {
        hostname: String,
        #[serde(rename = "sysName")]
        sys_name: String,
        hardware: String,
        snmp_disable: String,
        force_add: String,
    },
    /// SNMP-polled device; force_add only on request.
    Snmp {
        hostname: String,
        community: String,
        version: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        force_add: Option<String>,
    },
}

impl AddDeviceRequest {
    pub fn hostname(&self) -> &str {
        match self {
            AddDeviceRequest::PingOnly { hostname, .. } => hostname,
            AddDeviceRequest::Snmp { hostname, .. } => hostname,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateLocationRequest {
    pub location: String,
    pub lat: String,
    pub lng: String,
    pub fixed_coordinates: u8,
}

#[derive(Debug, Serialize)]
struct UpdateDeviceRequest {
    field: Vec<String>,
    data: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct LocationsResponse {
    #[serde(default)]
    pub locations: Vec<LocationEntry>,
}

#[derive(Debug, Deserialize)]
pub struct LocationEntry {
    pub id: u64,
    pub location: String,
}

/// Location creation response. Depending on the server version the new id
/// arrives as `id`, `location_id`, or only embedded in a free-text message.
#[derive(Debug, Deserialize)]
pub struct CreateLocationResponse {
    pub id: Option<u64>,
    pub location_id: Option<u64>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DevicesResponse {
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

#[derive(Debug, Deserialize)]
pub struct DeviceEntry {
    #[serde(default)]
    pub device_id: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_locations_response_parse() {
        let resp: LocationsResponse = serde_json::from_value(json!({
            "locations": [
                {"id": 3, "location": "HQ", "lat": -31.9, "lng": 115.8},
                {"id": 7, "location": "Depot"}
            ]
        }))
        .unwrap();
        assert_eq!(resp.locations.len(), 2);
        assert_eq!(resp.locations[0].id, 3);
        assert_eq!(resp.locations[1].location, "Depot");
    }

    #[test]
    fn test_locations_response_missing_array() {
        let resp: LocationsResponse = serde_json::from_value(json!({"status": "ok"})).unwrap();
        assert!(resp.locations.is_empty());
    }

    #[test]
    fn test_create_location_response_variants() {
        let with_id: CreateLocationResponse =
            serde_json::from_value(json!({"id": 12})).unwrap();
        assert_eq!(with_id.id, Some(12));

        let with_message: CreateLocationResponse = serde_json::from_value(json!({
            "status": "ok",
            "message": "Location added with id #12"
        }))
        .unwrap();
        assert_eq!(with_message.id, None);
        assert_eq!(
            with_message.message.as_deref(),
            Some("Location added with id #12")
        );
    }

    #[test]
    fn test_devices_response_parse() {
        let resp: DevicesResponse = serde_json::from_value(json!({
            "status": "ok",
            "devices": [{"device_id": 42, "hostname": "sw1"}]
        }))
        .unwrap();
        assert_eq!(resp.devices[0].device_id, Some(42));

        let empty: DevicesResponse = serde_json::from_value(json!({"devices": []})).unwrap();
        assert!(empty.devices.is_empty());
    }

    #[test]
    fn test_update_request_shape() {
        let request = UpdateDeviceRequest {
            field: vec![
                "location_id".to_string(),
                "sysLocation".to_string(),
                "override_sysLocation".to_string(),
            ],
            data: vec![json!(12), json!("HQ"), json!(1)],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "field": ["location_id", "sysLocation", "override_sysLocation"],
                "data": [12, "HQ", 1]
            })
        );
    }
}
