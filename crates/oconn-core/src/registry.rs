// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API descriptor registry.
//!
//! Descriptors are loaded from `api_config.json` (by `oconn-config`) and
//! joined against trigger nodes by data-field name. The registry is
//! immutable after load.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::osp::OspAddress;
use crate::types::PlaneValue;

// =============================================================================
// DataKind
// =============================================================================

/// The declared data type of a descriptor, as spelled in the configuration.
///
/// The ten spellings collapse to four conversion behaviours; the enum keeps
/// the spellings so a round-tripped configuration compares equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    /// 64-bit float (written as Double).
    Float,
    /// 64-bit float (written as Double).
    Double,
    /// Decimal, carried as a 64-bit float.
    Decimal,
    /// 32-bit integer.
    Int,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    Long,
    /// Boolean.
    Bool,
    /// Boolean.
    Boolean,
    /// Text, written as-is.
    String,
    /// Text, written as-is.
    Text,
}

impl DataKind {
    /// Parses a configuration spelling, case-insensitive. Unknown spellings
    /// fall back to `String`: unrecognized types are carried as text rather
    /// than dropped.
    pub fn parse(s: &str) -> DataKind {
        match s.trim().to_lowercase().as_str() {
            "float" => DataKind::Float,
            "double" => DataKind::Double,
            "decimal" => DataKind::Decimal,
            "int" => DataKind::Int,
            "integer" => DataKind::Integer,
            "long" => DataKind::Long,
            "bool" => DataKind::Bool,
            "boolean" => DataKind::Boolean,
            "text" => DataKind::Text,
            _ => DataKind::String,
        }
    }

    /// Returns the spelling as written in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Float => "float",
            DataKind::Double => "double",
            DataKind::Decimal => "decimal",
            DataKind::Int => "int",
            DataKind::Integer => "integer",
            DataKind::Long => "long",
            DataKind::Bool => "bool",
            DataKind::Boolean => "boolean",
            DataKind::String => "string",
            DataKind::Text => "text",
        }
    }

    /// Converts a raw controller string to the declared type.
    ///
    /// Conversion never fails; unparseable input collapses to the type's
    /// zero value.
    pub fn convert(&self, raw: &str) -> PlaneValue {
        let t = raw.trim();
        match self {
            DataKind::Float | DataKind::Double | DataKind::Decimal => {
                PlaneValue::Double(t.parse::<f64>().unwrap_or(0.0))
            }
            DataKind::Int | DataKind::Integer => {
                PlaneValue::Int32(t.parse::<i32>().unwrap_or(0))
            }
            DataKind::Long => PlaneValue::Int64(t.parse::<i64>().unwrap_or(0)),
            DataKind::Bool | DataKind::Boolean => PlaneValue::Bool(parse_bool(t)),
            DataKind::String | DataKind::Text => PlaneValue::String(t.to_string()),
        }
    }

    /// The declared type's zero value.
    pub fn zero(&self) -> PlaneValue {
        match self {
            DataKind::Float | DataKind::Double | DataKind::Decimal => PlaneValue::Double(0.0),
            DataKind::Int | DataKind::Integer => PlaneValue::Int32(0),
            DataKind::Long => PlaneValue::Int64(0),
            DataKind::Bool | DataKind::Boolean => PlaneValue::Bool(false),
            DataKind::String | DataKind::Text => PlaneValue::String(String::new()),
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Boolean parse: literal first, then numeric where 0 is false and non-zero
/// is true, then false.
fn parse_bool(t: &str) -> bool {
    match t.to_lowercase().as_str() {
        "true" => return true,
        "false" => return false,
        _ => {}
    }
    match t.parse::<f64>() {
        Ok(n) => n != 0.0,
        Err(_) => false,
    }
}

// =============================================================================
// Descriptor
// =============================================================================

/// Which list of the configuration a descriptor came from. General lists
/// are searched before Custom lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorOrigin {
    /// The series' `General` list.
    General,
    /// The series' `Custom` list.
    Custom,
}

/// An immutable API descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    /// The API name as configured.
    pub api_name: String,
    /// The data-field name; empty when the configuration omitted it.
    pub data_field_name: String,
    /// Controller address.
    pub address: OspAddress,
    /// Declared data type.
    pub kind: DataKind,
    /// Whether the descriptor participates in collection.
    pub enabled: bool,
    /// Configured collection interval in milliseconds.
    pub collection_interval_ms: u64,
    /// Which list the descriptor came from.
    pub origin: DescriptorOrigin,
}

impl Descriptor {
    /// The join key against trigger nodes: `DataFieldName`, falling back to
    /// `ApiName` when no field name is configured.
    pub fn field_name(&self) -> &str {
        if self.data_field_name.trim().is_empty() {
            &self.api_name
        } else {
            &self.data_field_name
        }
    }

    /// Returns `true` if `field` matches this descriptor by either name.
    pub fn matches(&self, field: &str) -> bool {
        self.data_field_name.eq_ignore_ascii_case(field)
            || self.api_name.eq_ignore_ascii_case(field)
    }
}

// =============================================================================
// DescriptorRegistry
// =============================================================================

/// The loaded descriptor set, ordered for resolution: all General lists
/// (across machine kinds and series) first, then all Custom lists.
#[derive(Debug, Clone)]
pub struct DescriptorRegistry {
    items: Vec<Descriptor>,
}

impl DescriptorRegistry {
    /// Creates a registry from pre-ordered descriptors.
    pub fn new(mut items: Vec<Descriptor>) -> Self {
        // Resolution order is General before Custom regardless of how the
        // caller interleaved them. The sort is stable, so configuration
        // order within each list is preserved.
        items.sort_by_key(|d| match d.origin {
            DescriptorOrigin::General => 0,
            DescriptorOrigin::Custom => 1,
        });
        Self { items }
    }

    /// The substitute registry used when the configuration file is absent
    /// or invalid: a single enabled work-counter descriptor.
    pub fn fallback() -> Self {
        Self {
            items: vec![Descriptor {
                api_name: "WorkCounterA_Counted".to_string(),
                data_field_name: "WorkCounterA_Counted".to_string(),
                address: OspAddress::new(0, 3066, 0, 0, 8),
                kind: DataKind::Float,
                enabled: true,
                collection_interval_ms: 5000,
                origin: DescriptorOrigin::General,
            }],
        }
    }

    /// Resolves a trigger field name to its descriptor: first hit across
    /// the General lists, then the Custom lists.
    pub fn resolve(&self, field: &str) -> Option<&Descriptor> {
        self.items.iter().find(|d| d.matches(field))
    }

    /// Returns all descriptors in resolution order.
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.items
    }

    /// Returns the number of descriptors.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns descriptor keys in resolution order, for the idempotence
    /// checks in the configuration tests.
    pub fn keys(&self) -> Vec<&str> {
        self.items.iter().map(|d| d.field_name()).collect()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, origin: DescriptorOrigin) -> Descriptor {
        Descriptor {
            api_name: name.to_string(),
            data_field_name: String::new(),
            address: OspAddress::new(0, 3066, 0, 0, 8),
            kind: DataKind::Float,
            enabled: true,
            collection_interval_ms: 1000,
            origin,
        }
    }

    #[test]
    fn test_data_kind_parse() {
        assert_eq!(DataKind::parse("Float"), DataKind::Float);
        assert_eq!(DataKind::parse("LONG"), DataKind::Long);
        assert_eq!(DataKind::parse("boolean"), DataKind::Boolean);
        assert_eq!(DataKind::parse("whatever"), DataKind::String);
    }

    #[test]
    fn test_convert_float() {
        assert_eq!(DataKind::Float.convert("  42.50  "), PlaneValue::Double(42.5));
        assert_eq!(DataKind::Decimal.convert("garbage"), PlaneValue::Double(0.0));
    }

    #[test]
    fn test_convert_int() {
        assert_eq!(DataKind::Int.convert("17"), PlaneValue::Int32(17));
        assert_eq!(DataKind::Integer.convert("x"), PlaneValue::Int32(0));
        assert_eq!(DataKind::Long.convert("9000000000"), PlaneValue::Int64(9000000000));
    }

    #[test]
    fn test_convert_bool() {
        assert_eq!(DataKind::Bool.convert("true"), PlaneValue::Bool(true));
        assert_eq!(DataKind::Bool.convert("FALSE"), PlaneValue::Bool(false));
        assert_eq!(DataKind::Boolean.convert("1"), PlaneValue::Bool(true));
        assert_eq!(DataKind::Boolean.convert("0"), PlaneValue::Bool(false));
        assert_eq!(DataKind::Boolean.convert("2.5"), PlaneValue::Bool(true));
        assert_eq!(DataKind::Bool.convert("maybe"), PlaneValue::Bool(false));
    }

    #[test]
    fn test_convert_text() {
        assert_eq!(
            DataKind::Text.convert("  O0001  "),
            PlaneValue::String("O0001".into())
        );
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(DataKind::Double.zero(), PlaneValue::Double(0.0));
        assert_eq!(DataKind::Long.zero(), PlaneValue::Int64(0));
        assert_eq!(DataKind::Bool.zero(), PlaneValue::Bool(false));
    }

    #[test]
    fn test_field_name_fallback() {
        let mut d = descriptor("SpindleLoad", DescriptorOrigin::General);
        assert_eq!(d.field_name(), "SpindleLoad");
        d.data_field_name = "Load_S1".to_string();
        assert_eq!(d.field_name(), "Load_S1");
    }

    #[test]
    fn test_general_resolves_before_custom() {
        let mut custom = descriptor("SpindleLoad", DescriptorOrigin::Custom);
        custom.address = OspAddress::new(0, 9999, 0, 0, 8);
        let general = descriptor("SpindleLoad", DescriptorOrigin::General);

        // Insertion order deliberately Custom-first.
        let registry = DescriptorRegistry::new(vec![custom, general]);
        let hit = registry.resolve("SpindleLoad").unwrap();
        assert_eq!(hit.origin, DescriptorOrigin::General);
        assert_eq!(hit.address.major, 3066);
    }

    #[test]
    fn test_resolve_by_either_name() {
        let mut d = descriptor("WorkCounterA", DescriptorOrigin::General);
        d.data_field_name = "WorkCounterA_Counted".to_string();
        let registry = DescriptorRegistry::new(vec![d]);

        assert!(registry.resolve("WorkCounterA_Counted").is_some());
        assert!(registry.resolve("workcountera").is_some());
        assert!(registry.resolve("SomethingElse").is_none());
    }

    #[test]
    fn test_fallback_registry() {
        let registry = DescriptorRegistry::fallback();
        assert_eq!(registry.len(), 1);
        let d = registry.resolve("WorkCounterA_Counted").unwrap();
        assert_eq!(d.address.style, 8);
        assert_eq!(d.kind, DataKind::Float);
        assert_eq!(d.collection_interval_ms, 5000);
        assert!(d.enabled);
    }
}
