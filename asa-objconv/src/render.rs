//! `generic_import_export` document rendering.

use serde::Serialize;
use thiserror::Error;
use xml_doc_core::{write_string, WriteError, WriteOptions, XmlNode};

use crate::classify::{ClassifiedObject, ObjectKind};
use crate::config::ConvertConfig;
use crate::registry::DbKey;

pub const ROOT_TAG: &str = "generic_import_export";

/// A classified object together with its registry key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyedObject {
    #[serde(flatten)]
    pub object: ClassifiedObject,
    pub db_key: DbKey,
}

/// Writing the element tree failed. Every [`KeyedObject`] maps to a complete
/// element, so this only surfaces writer faults.
#[derive(Debug, Error)]
#[error("failed to serialize export document: {0}")]
pub struct SerializationError(#[from] WriteError);

/// Render the full document for `batch`, one child per object in order.
pub fn render(batch: &[KeyedObject], config: &ConvertConfig) -> Result<String, SerializationError> {
    let mut root = envelope(config);
    root.children.extend(
        batch
            .iter()
            .map(|keyed| object_element(keyed, config.default_broadcast)),
    );

    let opts = WriteOptions {
        indent: config.indent,
        declaration: config.xml_declaration,
    };
    Ok(write_string(&root, opts)?)
}

/// Root element carrying the configured build stamps.
pub fn envelope(config: &ConvertConfig) -> XmlNode {
    XmlNode::new(ROOT_TAG)
        .with_attr("build", config.build.to_string())
        .with_attr(
            "update_package_version",
            config.update_package_version.to_string(),
        )
}

/// Element for one object. Attribute order is part of the import format.
pub fn object_element(keyed: &KeyedObject, default_broadcast: bool) -> XmlNode {
    let name = keyed.object.name.as_str();
    let db_key = keyed.db_key.to_string();

    match &keyed.object.kind {
        ObjectKind::Fqdn { .. } => XmlNode::new("domain_name")
            .with_attr("name", name)
            .with_attr("db_key", db_key),
        ObjectKind::Host { address } => XmlNode::new("host")
            .with_attr("name", name)
            .with_attr("db_key", db_key)
            .with_child(XmlNode::new("mvia_address").with_attr("address", address.to_string()))
            .with_child(
                XmlNode::new("third_party_monitoring")
                    .with_attr("netflow", "false")
                    .with_attr("snmp_trap", "false"),
            ),
        ObjectKind::Subnet { address, prefix } => XmlNode::new("network")
            .with_attr("name", name)
            .with_attr("broadcast", default_broadcast.to_string())
            .with_attr("db_key", db_key)
            .with_attr("ipv4_network", format!("{address}/{prefix}")),
        ObjectKind::AddressRange { start, end } => XmlNode::new("address_range")
            .with_attr("name", name)
            .with_attr("db_key", db_key)
            .with_attr("ip_range", format!("{start}-{end}")),
        ObjectKind::Service {
            protocol,
            destination_port,
        } => XmlNode::new("service")
            .with_attr("name", name)
            .with_attr("db_key", db_key)
            .with_child(XmlNode::new("protocol").with_text(protocol.as_str()))
            .with_child(XmlNode::new("destination_port").with_text(destination_port.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use pretty_assertions::assert_eq;

    use super::{object_element, render, KeyedObject};
    use crate::block::Category;
    use crate::classify::{ClassifiedObject, ObjectKind, Protocol};
    use crate::config::ConvertConfig;

    fn keyed(name: &str, category: Category, kind: ObjectKind, db_key: u64) -> KeyedObject {
        KeyedObject {
            object: ClassifiedObject {
                name: name.to_string(),
                category,
                line: 1,
                kind,
            },
            db_key,
        }
    }

    #[test]
    fn renders_every_kind_in_input_order() {
        let batch = vec![
            keyed(
                "Kaspersky10",
                Category::Network,
                ObjectKind::Fqdn {
                    domain: "dnl-10.geo.kaspersky.com".to_string(),
                },
                1201,
            ),
            keyed(
                "212.118.7.19",
                Category::Network,
                ObjectKind::Host {
                    address: Ipv4Addr::new(212, 118, 7, 19),
                },
                1204,
            ),
            keyed(
                "T3",
                Category::Network,
                ObjectKind::AddressRange {
                    start: Ipv4Addr::new(185, 188, 32, 0),
                    end: Ipv4Addr::new(185, 188, 35, 255),
                },
                1203,
            ),
            keyed(
                "Madaba2",
                Category::Network,
                ObjectKind::Subnet {
                    address: Ipv4Addr::new(192, 168, 5, 0),
                    prefix: 24,
                },
                1199,
            ),
            keyed(
                "EMP",
                Category::Service,
                ObjectKind::Service {
                    protocol: Protocol::Tcp,
                    destination_port: 9198,
                },
                1205,
            ),
        ];

        let xml = render(&batch, &ConvertConfig::default()).expect("render");
        let expected = include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../fixtures/export_sample.xml"
        ));
        assert_eq!(xml, expected.trim_end());
    }

    #[test]
    fn empty_batch_is_an_empty_root() {
        let xml = render(&[], &ConvertConfig::default()).expect("render");
        assert_eq!(
            xml,
            r#"<generic_import_export build="11575" update_package_version="1773"/>"#
        );
    }

    #[test]
    fn broadcast_follows_policy() {
        let subnet = keyed(
            "N",
            Category::Network,
            ObjectKind::Subnet {
                address: Ipv4Addr::new(10, 0, 0, 0),
                prefix: 8,
            },
            1,
        );
        assert_eq!(object_element(&subnet, false).attr("broadcast"), Some("false"));
        assert_eq!(object_element(&subnet, true).attr("broadcast"), Some("true"));
    }

    #[test]
    fn names_are_escaped() {
        let host = keyed(
            "R&D <lab>",
            Category::Network,
            ObjectKind::Host {
                address: Ipv4Addr::new(10, 0, 0, 1),
            },
            9,
        );
        let xml = render(&[host], &ConvertConfig::default()).expect("render");
        assert!(xml.contains(r#"name="R&amp;D &lt;lab&gt;""#));
    }

    #[test]
    fn honours_build_stamps_and_declaration() {
        let config = ConvertConfig {
            build: 1,
            update_package_version: 2,
            xml_declaration: true,
            ..ConvertConfig::default()
        };
        let xml = render(&[], &config).expect("render");
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<generic_import_export build=\"1\" update_package_version=\"2\"/>"
        );
    }
}
