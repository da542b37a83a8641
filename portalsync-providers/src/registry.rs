//! Vendor registry.
//!
//! Static access to all vendor descriptors.

use portalsync_core::VendorKind;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::bmw::bmw_descriptor;
use crate::descriptor::VendorDescriptor;
use crate::mercedes::mercedes_descriptor;

// ============================================================================
// Static Registry
// ============================================================================

static DESCRIPTORS: OnceLock<Vec<VendorDescriptor>> = OnceLock::new();

static CLI_NAME_MAP: OnceLock<HashMap<String, VendorKind>> = OnceLock::new();

fn init_descriptors() -> Vec<VendorDescriptor> {
    vec![bmw_descriptor(), mercedes_descriptor()]
}

fn build_cli_name_map(descriptors: &[VendorDescriptor]) -> HashMap<String, VendorKind> {
    let mut map = HashMap::new();
    for desc in descriptors {
        map.insert(desc.cli_name().to_string(), desc.kind);
        for alias in desc.aliases {
            map.insert((*alias).to_string(), desc.kind);
        }
    }
    map
}

// ============================================================================
// Vendor Registry
// ============================================================================

/// Global registry of all vendor descriptors.
pub struct VendorRegistry;

impl VendorRegistry {
    /// Returns all vendor descriptors.
    pub fn all() -> &'static [VendorDescriptor] {
        DESCRIPTORS.get_or_init(init_descriptors)
    }

    /// Gets a vendor descriptor by kind.
    pub fn get(kind: VendorKind) -> Option<&'static VendorDescriptor> {
        Self::all().iter().find(|d| d.kind == kind)
    }

    /// Returns the CLI name to vendor kind mapping, aliases included.
    pub fn cli_name_map() -> &'static HashMap<String, VendorKind> {
        CLI_NAME_MAP.get_or_init(|| build_cli_name_map(Self::all()))
    }

    /// Looks up a vendor by CLI name or alias, ignoring case.
    pub fn get_by_cli_name(name: &str) -> Option<&'static VendorDescriptor> {
        let kind = Self::cli_name_map().get(&name.to_lowercase())?;
        Self::get(*kind)
    }

    /// Returns the number of registered vendors.
    pub fn count() -> usize {
        Self::all().len()
    }

    /// Returns all vendor kinds.
    pub fn kinds() -> Vec<VendorKind> {
        Self::all().iter().map(|d| d.kind).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
