// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connector registry stand-in (`SPEC_FULL.md` §6a).
//!
//! `spec.md` §6 treats the connector registry's actual `GetReader`/
//! `GetWriter` implementation as an external collaborator consumed only by
//! *emitted* code. The compiler itself only needs, for each connector name
//! referenced by an `open` statement, the capability set to render into the
//! connectors manifest (`spec.md` §4.7). A fixed name-keyed table built with
//! `once_cell::sync::Lazy`, grounded in the teacher's own static-regex-table
//! pattern (`sql_compiler/preprocessor.rs`'s `WINDOW_REGEX`) and its
//! `core/extension` name-keyed factory registries.

use std::collections::HashMap;

use once_cell::sync::Lazy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Analyzer,
    Reader,
    Writer,
    Configurator,
    Queryable,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Analyzer => "Analyzer",
            Capability::Reader => "Reader",
            Capability::Writer => "Writer",
            Capability::Configurator => "Configurator",
            Capability::Queryable => "Queryable",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectorInfo {
    pub name: String,
    pub assembly: &'static str,
    pub capabilities: &'static [Capability],
}

const GENERIC_CAPABILITIES: &[Capability] = &[Capability::Reader, Capability::Writer];

struct RegistryEntry {
    name: &'static str,
    assembly: &'static str,
    capabilities: &'static [Capability],
}

static REGISTRY: Lazy<HashMap<&'static str, RegistryEntry>> = Lazy::new(|| {
    use Capability::*;
    let entries = [
        RegistryEntry {
            name: "MSSQL",
            assembly: "PanSql.Connectors.MsSql",
            capabilities: &[Analyzer, Reader, Writer, Configurator, Queryable],
        },
        RegistryEntry {
            name: "Postgres",
            assembly: "PanSql.Connectors.Postgres",
            capabilities: &[Analyzer, Reader, Writer, Configurator, Queryable],
        },
        RegistryEntry {
            name: "Network",
            assembly: "PanSql.Connectors.Network",
            capabilities: &[Reader, Writer],
        },
    ];
    entries.into_iter().map(|c| (c.name, c)).collect()
});

/// Looks up a connector's declared capability set by name
/// (case-insensitive, matching the rest of the compiler's bound-identifier
/// convention). Unknown connector names fall back to a generic
/// reader/writer capability set so compilation never fails on a bare
/// connector name the registry doesn't know about — only the manifest's
/// capabilities/assembly are degraded; the caller-supplied name itself is
/// always preserved so the manifest stays traceable to what the script
/// actually opened.
pub fn lookup(name: &str) -> ConnectorInfo {
    REGISTRY
        .values()
        .find(|c| c.name.eq_ignore_ascii_case(name))
        .map(|c| ConnectorInfo {
            name: c.name.to_string(),
            assembly: c.assembly,
            capabilities: c.capabilities,
        })
        .unwrap_or_else(|| {
            log::warn!("connector '{name}' is not in the known registry; emitting a generic capability set");
            ConnectorInfo {
                name: name.to_string(),
                assembly: "PanSql.Connectors.Generic",
                capabilities: GENERIC_CAPABILITIES,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_connector_capabilities() {
        let info = lookup("mssql");
        assert_eq!(info.name, "MSSQL");
        assert!(info.capabilities.contains(&Capability::Queryable));
    }

    #[test]
    fn unknown_connector_falls_back_to_generic_capabilities_but_keeps_its_name() {
        let info = lookup("SomeUnknownThing");
        assert_eq!(info.name, "SomeUnknownThing");
        assert_eq!(info.assembly, "PanSql.Connectors.Generic");
        assert_eq!(info.capabilities, GENERIC_CAPABILITIES);
    }
}
