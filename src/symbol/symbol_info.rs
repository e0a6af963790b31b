// Tue Feb 03 2026 - Alex

use crate::memory::Address;
use crate::symbol::NamespaceId;
use std::fmt;

#[derive(Debug, Clone)]
pub struct SymbolInfo {
    name: String,
    address: Address,
    namespace: NamespaceId,
    kind: SymbolKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Function,
    Data,
    Vtable,
    TypeInfo,
}

impl SymbolInfo {
    pub fn new(name: String, address: Address, namespace: NamespaceId, kind: SymbolKind) -> Self {
        Self {
            name,
            address,
            namespace,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn namespace(&self) -> NamespaceId {
        self.namespace
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, SymbolKind::Function)
    }
}

impl fmt::Display for SymbolInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.name, self.address)
    }
}
