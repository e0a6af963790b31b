// Tue Feb 03 2026 - Alex

use crate::memory::{Address, ImageMemory};
use crate::symbol::{NamespaceId, NamespaceTable, SymbolInfo, SymbolKind};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Conventional name under which a class's vtable symbol is registered.
pub const VTABLE_SYMBOL_NAME: &str = "vtable";
/// Conventional name under which a class's type_info symbol is registered.
pub const TYPEINFO_SYMBOL_NAME: &str = "typeinfo";

/// Trap functions the ABI installs in unimplemented pure-virtual slots.
pub static PURE_VIRTUAL_FUNCTION_NAMES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["__cxa_pure_virtual", "__cxa_deleted_virtual"]));

/// Exact-name symbol lookup scoped to a namespace.
///
/// Lookup results preserve discovery (insertion) order; the vtable
/// resolution algorithm depends on trying candidates in that order.
pub struct SymbolDirectory {
    symbols: Vec<SymbolInfo>,
    by_scope: HashMap<(String, NamespaceId), Vec<usize>>,
    by_address: HashMap<u64, usize>,
}

impl SymbolDirectory {
    pub fn new() -> Self {
        Self {
            symbols: Vec::new(),
            by_scope: HashMap::new(),
            by_address: HashMap::new(),
        }
    }

    pub fn add(&mut self, symbol: SymbolInfo) {
        let index = self.symbols.len();
        self.by_scope
            .entry((symbol.name().to_string(), symbol.namespace()))
            .or_default()
            .push(index);
        self.by_address.entry(symbol.address().as_u64()).or_insert(index);
        self.symbols.push(symbol);
    }

    /// All symbols with exactly this name in this namespace, discovery order.
    pub fn symbols_named(&self, name: &str, namespace: NamespaceId) -> Vec<&SymbolInfo> {
        self.by_scope
            .get(&(name.to_string(), namespace))
            .map(|idxs| idxs.iter().map(|&i| &self.symbols[i]).collect())
            .unwrap_or_default()
    }

    /// Every registered symbol of this kind, discovery order.
    pub fn symbols_of_kind(&self, kind: SymbolKind) -> Vec<&SymbolInfo> {
        self.symbols.iter().filter(|s| s.kind() == kind).collect()
    }

    pub fn symbol_at(&self, address: Address) -> Option<&SymbolInfo> {
        self.by_address.get(&address.as_u64()).map(|&i| &self.symbols[i])
    }

    /// True when the address points at a known pure-virtual trap function.
    pub fn is_pure_virtual_trap(&self, address: Address) -> bool {
        self.symbol_at(address)
            .map(|s| PURE_VIRTUAL_FUNCTION_NAMES.contains(s.name()))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Register the RTTI-relevant symbols from an ELF image.
    ///
    /// `_ZTV<name>` and `_ZTI<name>` are data symbols whose suffix is the
    /// mangled type name; they become `vtable` / `typeinfo` entries scoped
    /// to the class namespace derived from that suffix. Trap functions are
    /// registered globally.
    pub fn load_from_image(&mut self, image: &ImageMemory, namespaces: &mut NamespaceTable) {
        let mut loaded = 0usize;
        for raw in image.symbols() {
            if let Some(mangled) = raw.name.strip_prefix("_ZTV") {
                match namespaces.namespace_from_type_name(mangled) {
                    Ok(ns) => {
                        self.add(SymbolInfo::new(
                            VTABLE_SYMBOL_NAME.to_string(),
                            raw.address,
                            ns,
                            SymbolKind::Vtable,
                        ));
                        loaded += 1;
                    }
                    Err(e) => log::debug!("skipping vtable symbol {:?}: {}", raw.name, e),
                }
            } else if let Some(mangled) = raw.name.strip_prefix("_ZTI") {
                match namespaces.namespace_from_type_name(mangled) {
                    Ok(ns) => {
                        self.add(SymbolInfo::new(
                            TYPEINFO_SYMBOL_NAME.to_string(),
                            raw.address,
                            ns,
                            SymbolKind::TypeInfo,
                        ));
                        loaded += 1;
                    }
                    Err(e) => log::debug!("skipping typeinfo symbol {:?}: {}", raw.name, e),
                }
            } else if PURE_VIRTUAL_FUNCTION_NAMES.contains(raw.name.as_str()) {
                self.add(SymbolInfo::new(
                    raw.name.clone(),
                    raw.address,
                    NamespaceId::GLOBAL,
                    SymbolKind::Function,
                ));
                loaded += 1;
            }
        }
        log::info!("registered {} RTTI symbols from {}", loaded, image.path().display());
    }
}

impl Default for SymbolDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_lookup_preserves_order() {
        let mut namespaces = NamespaceTable::new();
        let ns = namespaces.get_or_create(&["Widget".into()]);
        let mut dir = SymbolDirectory::new();
        dir.add(SymbolInfo::new(
            VTABLE_SYMBOL_NAME.into(),
            Address::new(0x100),
            ns,
            SymbolKind::Vtable,
        ));
        dir.add(SymbolInfo::new(
            VTABLE_SYMBOL_NAME.into(),
            Address::new(0x200),
            ns,
            SymbolKind::Vtable,
        ));

        let found = dir.symbols_named(VTABLE_SYMBOL_NAME, ns);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].address(), Address::new(0x100));
        assert_eq!(found[1].address(), Address::new(0x200));
        assert!(dir.symbols_named(VTABLE_SYMBOL_NAME, NamespaceId::GLOBAL).is_empty());
    }

    #[test]
    fn test_pure_virtual_trap_lookup() {
        let mut dir = SymbolDirectory::new();
        dir.add(SymbolInfo::new(
            "__cxa_pure_virtual".into(),
            Address::new(0xdead),
            NamespaceId::GLOBAL,
            SymbolKind::Function,
        ));
        assert!(dir.is_pure_virtual_trap(Address::new(0xdead)));
        assert!(!dir.is_pure_virtual_trap(Address::new(0xbeef)));
    }
}
