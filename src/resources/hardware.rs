//! `tinkerbell_hardware`: hardware records described by a JSON document.
//!
//! The record id lives inside the document, so the Terraform `id` always
//! mirrors the payload's `id` field. A different payload id means a different
//! record, which is planned as a replacement.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{Resource, ResourceData, ID_ATTRIBUTE};
use crate::client::TinkClient;
use crate::error::{ProviderError, ResultExt};
use crate::schema::{Attribute, Schema};
use crate::tink::hardware::hardware::{dhcp, netboot, network, Dhcp, Netboot, Network};
use crate::tink::hardware::Hardware;
use crate::validation::{suppress_equivalent_json, validate_hardware_data};

/// Host-visible type name.
pub const TYPE_NAME: &str = "tinkerbell_hardware";

fn is_zero(value: &i64) -> bool {
    *value == 0
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// JSON form of a hardware record as users write it.
///
/// `metadata` is free-form JSON here and a JSON string on the wire. Unknown
/// keys are ignored and zero values are left out when serializing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareDocument {
    /// Record id, required.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Arbitrary metadata.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
    /// Network interfaces.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkDocument>,
    /// Record version maintained by the service.
    #[serde(skip_serializing_if = "is_zero")]
    pub version: i64,
}

/// Network section of a [`HardwareDocument`].
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkDocument {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<InterfaceDocument>,
}

/// One network interface.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp: Option<DhcpDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub netboot: Option<NetbootDocument>,
}

/// DHCP settings of an interface.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DhcpDocument {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mac: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub lease_time: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub name_servers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub time_servers: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub arch: String,
    #[serde(skip_serializing_if = "is_false")]
    pub uefi: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub iface_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<IpDocument>,
}

/// Static address handed out over DHCP.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IpDocument {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub address: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub netmask: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub gateway: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub family: String,
}

/// Netboot settings of an interface.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetbootDocument {
    #[serde(skip_serializing_if = "is_false")]
    pub allow_pxe: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub allow_workflow: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipxe: Option<IpxeDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub osie: Option<OsieDocument>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IpxeDocument {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub contents: String,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OsieDocument {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub base_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kernel: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub initrd: String,
}

fn decode_error(e: impl std::fmt::Display) -> ProviderError {
    ProviderError::Validation(format!("failed decoding 'data' as JSON: {}", e))
}

impl HardwareDocument {
    /// Decode a `data` attribute value. The document must carry an id.
    pub fn parse(data: &str) -> Result<Self, ProviderError> {
        let value: Value = serde_json::from_str(data).map_err(decode_error)?;
        if !value.is_object() {
            return Err(decode_error("expected a JSON object"));
        }
        let document: Self = serde_json::from_value(value).map_err(decode_error)?;

        if document.id.is_empty() {
            return Err(ProviderError::Validation(
                "ID is required in JSON data".to_string(),
            ));
        }
        Ok(document)
    }

    /// Serialize back to a `data` attribute value.
    pub fn to_json(&self) -> Result<String, ProviderError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wire form of the record.
    pub fn to_hardware(&self) -> Hardware {
        let metadata = match &self.metadata {
            Value::Null => String::new(),
            other => other.to_string(),
        };

        Hardware {
            network: self.network.clone().map(Into::into),
            id: self.id.clone(),
            version: self.version,
            metadata,
        }
    }
}

impl TryFrom<Hardware> for HardwareDocument {
    type Error = serde_json::Error;

    fn try_from(record: Hardware) -> Result<Self, Self::Error> {
        let metadata = if record.metadata.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&record.metadata)?
        };

        Ok(Self {
            id: record.id,
            metadata,
            network: record.network.map(Into::into),
            version: record.version,
        })
    }
}

impl From<Network> for NetworkDocument {
    fn from(network: Network) -> Self {
        Self {
            interfaces: network.interfaces.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<NetworkDocument> for Network {
    fn from(network: NetworkDocument) -> Self {
        Self {
            interfaces: network.interfaces.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<network::Interface> for InterfaceDocument {
    fn from(interface: network::Interface) -> Self {
        Self {
            dhcp: interface.dhcp.map(Into::into),
            netboot: interface.netboot.map(Into::into),
        }
    }
}

impl From<InterfaceDocument> for network::Interface {
    fn from(interface: InterfaceDocument) -> Self {
        Self {
            dhcp: interface.dhcp.map(Into::into),
            netboot: interface.netboot.map(Into::into),
        }
    }
}

impl From<Dhcp> for DhcpDocument {
    fn from(dhcp: Dhcp) -> Self {
        Self {
            mac: dhcp.mac,
            hostname: dhcp.hostname,
            lease_time: dhcp.lease_time,
            name_servers: dhcp.name_servers,
            time_servers: dhcp.time_servers,
            arch: dhcp.arch,
            uefi: dhcp.uefi,
            iface_name: dhcp.iface_name,
            ip: dhcp.ip.map(|ip| IpDocument {
                address: ip.address,
                netmask: ip.netmask,
                gateway: ip.gateway,
                family: ip.family,
            }),
        }
    }
}

impl From<DhcpDocument> for Dhcp {
    fn from(dhcp: DhcpDocument) -> Self {
        Self {
            mac: dhcp.mac,
            hostname: dhcp.hostname,
            lease_time: dhcp.lease_time,
            name_servers: dhcp.name_servers,
            time_servers: dhcp.time_servers,
            arch: dhcp.arch,
            uefi: dhcp.uefi,
            iface_name: dhcp.iface_name,
            ip: dhcp.ip.map(|ip| dhcp::Ip {
                address: ip.address,
                netmask: ip.netmask,
                gateway: ip.gateway,
                family: ip.family,
            }),
        }
    }
}

impl From<Netboot> for NetbootDocument {
    fn from(netboot: Netboot) -> Self {
        Self {
            allow_pxe: netboot.allow_pxe,
            allow_workflow: netboot.allow_workflow,
            ipxe: netboot.ipxe.map(|ipxe| IpxeDocument {
                url: ipxe.url,
                contents: ipxe.contents,
            }),
            osie: netboot.osie.map(|osie| OsieDocument {
                base_url: osie.base_url,
                kernel: osie.kernel,
                initrd: osie.initrd,
            }),
        }
    }
}

impl From<NetbootDocument> for Netboot {
    fn from(netboot: NetbootDocument) -> Self {
        Self {
            allow_pxe: netboot.allow_pxe,
            allow_workflow: netboot.allow_workflow,
            ipxe: netboot.ipxe.map(|ipxe| netboot::Ipxe {
                url: ipxe.url,
                contents: ipxe.contents,
            }),
            osie: netboot.osie.map(|osie| netboot::Osie {
                base_url: osie.base_url,
                kernel: osie.kernel,
                initrd: osie.initrd,
            }),
        }
    }
}

/// Manages hardware records.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardwareResource;

#[async_trait]
impl Resource for HardwareResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A hardware record known to Tinkerbell.")
            .with_attribute(
                ID_ATTRIBUTE,
                Attribute::computed_string()
                    .with_description("Hardware ID, taken from the `id` field of `data`."),
            )
            .with_attribute(
                "data",
                Attribute::required_string()
                    .with_description("Hardware record as a JSON document.")
                    .with_validator(validate_hardware_data)
                    .with_diff_suppress(suppress_equivalent_json),
            )
    }

    fn requires_replacement(&self, prior: &ResourceData, planned: &ResourceData) -> bool {
        let id_of = |data: &ResourceData| {
            data.get_str("data")
                .ok()
                .and_then(|data| HardwareDocument::parse(data).ok())
                .map(|document| document.id)
        };

        match (id_of(prior), id_of(planned)) {
            (Some(prior), Some(planned)) => prior != planned,
            _ => false,
        }
    }

    #[instrument(skip_all, name = "hardware.create")]
    async fn create(&self, client: &TinkClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let document = HardwareDocument::parse(data.get_str("data")?)?;
        let id = document.id.clone();

        if client
            .hardware
            .find_hardware(&id)
            .await
            .with_context(|| format!("checking if hardware ID {:?} already exists", id))?
            .is_some()
        {
            return Err(ProviderError::AlreadyExists(format!(
                "hardware ID {:?} already exists",
                id
            )));
        }

        client
            .hardware
            .push_hardware(document.to_hardware())
            .await
            .context("pushing hardware data")?;

        info!(id = %id, "hardware pushed");
        data.set_id(id);
        Ok(())
    }

    #[instrument(skip_all, name = "hardware.read", fields(id = data.id()))]
    async fn read(&self, client: &TinkClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = data.require_id()?.to_string();

        let record = match client
            .hardware
            .find_hardware(&id)
            .await
            .with_context(|| format!("checking if hardware {:?} exists", id))?
        {
            Some(record) => record,
            None => {
                warn!(id = %id, "hardware no longer exists");
                data.clear_id();
                return Ok(());
            },
        };

        let document = HardwareDocument::try_from(record)
            .context("serializing received hardware entry failed")?;
        data.set("data", document.to_json()?);
        debug!(id = %id, "hardware refreshed");
        Ok(())
    }

    #[instrument(skip_all, name = "hardware.update", fields(id = data.id()))]
    async fn update(&self, client: &TinkClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let document = HardwareDocument::parse(data.get_str("data")?)?;
        let id = document.id.clone();

        if client
            .hardware
            .find_hardware(&id)
            .await
            .with_context(|| format!("checking if hardware {:?} exists", id))?
            .is_none()
        {
            return Err(ProviderError::NotFound(format!(
                "hardware ID {:?} does not exist",
                id
            )));
        }

        client
            .hardware
            .push_hardware(document.to_hardware())
            .await
            .context("pushing hardware data")?;

        info!(id = %id, "hardware updated");
        data.set_id(id);
        Ok(())
    }

    #[instrument(skip_all, name = "hardware.delete", fields(id = data.id()))]
    async fn delete(&self, client: &TinkClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = data.require_id()?.to_string();

        client
            .hardware
            .delete_hardware(&id)
            .await
            .context("removing hardware failed")?;

        info!(id = %id, "hardware removed");
        data.clear_id();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTinkerbell;
    use serde_json::json;
    use tonic::Status;

    fn payload(id: &str, mac: &str) -> String {
        json!({
            "id": id,
            "metadata": {"facility": {"plan_slug": "c2.medium.x86"}},
            "network": {
                "interfaces": [{
                    "dhcp": {
                        "mac": mac,
                        "arch": "x86_64",
                        "ip": {"address": "192.168.1.5", "netmask": "255.255.255.248"}
                    },
                    "netboot": {"allow_pxe": true, "allow_workflow": true}
                }]
            }
        })
        .to_string()
    }

    fn data(state: serde_json::Value) -> ResourceData {
        ResourceData::from_state(state).unwrap()
    }

    #[test]
    fn test_parse_requires_id() {
        let err = HardwareDocument::parse(r#"{"metadata": {}}"#).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: ID is required in JSON data");

        let err = HardwareDocument::parse("{not json").unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Validation error: failed decoding 'data' as JSON: "));
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        for data in [r#"["u"]"#, r#""u""#, "null"] {
            let err = HardwareDocument::parse(data).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Validation error: failed decoding 'data' as JSON: expected a JSON object"
            );
        }
        assert!(validate_hardware_data(r#"["u"]"#).is_err());
    }

    #[test]
    fn test_parse_ignores_unknown_keys() {
        let document = HardwareDocument::parse(r#"{"id": "u", "owner": "ops"}"#).unwrap();
        assert_eq!(document.id, "u");
        assert_eq!(document.metadata, Value::Null);
    }

    #[test]
    fn test_wire_conversion_keeps_fields() {
        let document = HardwareDocument::parse(&payload("u", "00:00:00:00:00:01")).unwrap();
        let record = document.to_hardware();

        assert_eq!(record.id, "u");
        let metadata: Value = serde_json::from_str(&record.metadata).unwrap();
        assert_eq!(metadata, json!({"facility": {"plan_slug": "c2.medium.x86"}}));

        let interface = &record.network.as_ref().unwrap().interfaces[0];
        let dhcp = interface.dhcp.as_ref().unwrap();
        assert_eq!(dhcp.mac, "00:00:00:00:00:01");
        assert_eq!(dhcp.ip.as_ref().unwrap().netmask, "255.255.255.248");
        assert!(interface.netboot.as_ref().unwrap().allow_workflow);

        assert_eq!(HardwareDocument::try_from(record).unwrap(), document);
    }

    #[test]
    fn test_to_json_omits_zero_values() {
        let record = Hardware {
            id: "u".to_string(),
            ..Default::default()
        };
        let document = HardwareDocument::try_from(record).unwrap();
        assert_eq!(document.to_json().unwrap(), r#"{"id":"u"}"#);
    }

    #[test]
    fn test_requires_replacement_on_id_change() {
        let prior = data(json!({"id": "u", "data": payload("u", "m")}));
        let same = data(json!({"data": payload("u", "m2")}));
        let renamed = data(json!({"data": payload("v", "m")}));

        assert!(!HardwareResource.requires_replacement(&prior, &same));
        assert!(HardwareResource.requires_replacement(&prior, &renamed));
    }

    #[tokio::test]
    async fn test_create_pushes_record() {
        let fake = FakeTinkerbell::new();
        let mut data = data(json!({"data": payload("u", "00:00:00:00:00:01")}));

        HardwareResource.create(&fake.client(), &mut data).await.unwrap();

        assert_eq!(data.id(), Some("u"));
        assert_eq!(fake.calls("push_hardware"), 1);
        assert_eq!(fake.hardware()[0].id, "u");
    }

    #[tokio::test]
    async fn test_create_existing_id_conflicts() {
        let fake = FakeTinkerbell::new();
        fake.add_hardware(Hardware {
            id: "u".to_string(),
            ..Default::default()
        });
        let mut data = data(json!({"data": payload("u", "00:00:00:00:00:01")}));

        let err = HardwareResource.create(&fake.client(), &mut data).await.unwrap_err();

        assert!(matches!(err, ProviderError::AlreadyExists(_)));
        assert!(err.to_string().contains("hardware ID \"u\" already exists"));
        assert_eq!(fake.calls("push_hardware"), 0);
        assert_eq!(data.id(), None);
    }

    #[tokio::test]
    async fn test_read_serializes_record() {
        let fake = FakeTinkerbell::new();
        let document = HardwareDocument::parse(&payload("u", "m")).unwrap();
        fake.add_hardware(document.to_hardware());
        let mut data = data(json!({"id": "u", "data": "{}"}));

        HardwareResource.read(&fake.client(), &mut data).await.unwrap();

        let refreshed = HardwareDocument::parse(data.get_str("data").unwrap()).unwrap();
        assert_eq!(refreshed, document);
    }

    #[tokio::test]
    async fn test_read_missing_clears_id() {
        let fake = FakeTinkerbell::new();
        let mut data = data(json!({"id": "u", "data": payload("u", "m")}));

        HardwareResource.read(&fake.client(), &mut data).await.unwrap();

        assert_eq!(data.id(), None);
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let fake = FakeTinkerbell::new();
        let mut data = data(json!({"id": "u", "data": payload("u", "m")}));

        let err = HardwareResource.update(&fake.client(), &mut data).await.unwrap_err();

        assert!(err.to_string().contains("hardware ID \"u\" does not exist"));
        assert_eq!(fake.calls("push_hardware"), 0);
    }

    #[tokio::test]
    async fn test_delete_surfaces_rpc_error() {
        let fake = FakeTinkerbell::new();
        let mut data = data(json!({"id": "u", "data": payload("u", "m")}));

        let err = HardwareResource.delete(&fake.client(), &mut data).await.unwrap_err();

        assert!(err.to_string().starts_with("removing hardware failed: "));
        assert_eq!(fake.calls("delete_hardware"), 1);
        assert_eq!(data.id(), Some("u"));
    }

    #[tokio::test]
    async fn test_delete_existing() {
        let fake = FakeTinkerbell::new();
        fake.add_hardware(Hardware {
            id: "u".to_string(),
            ..Default::default()
        });
        fake.fail_next("list_hardware", Status::unavailable("unused"));
        let mut data = data(json!({"id": "u", "data": payload("u", "m")}));

        HardwareResource.delete(&fake.client(), &mut data).await.unwrap();

        assert!(fake.hardware().is_empty());
        assert_eq!(data.id(), None);
        assert_eq!(fake.calls("list_hardware"), 0);
    }
}
