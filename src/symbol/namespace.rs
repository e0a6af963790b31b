// Tue Feb 03 2026 - Alex

use crate::symbol::SymbolError;
use std::collections::HashMap;
use std::fmt;

/// Index into a `NamespaceTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamespaceId(pub(crate) usize);

impl NamespaceId {
    pub const GLOBAL: NamespaceId = NamespaceId(0);

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceKind {
    Plain,
    Class,
}

#[derive(Debug, Clone)]
struct Namespace {
    path: Vec<String>,
    kind: NamespaceKind,
    valid: bool,
}

/// Arena of namespaces, deduplicated by fully-qualified path.
///
/// Namespaces start out `Plain`; the RTTI layer promotes the ones that turn
/// out to be classes. Validity is a flag rather than removal so ids held by
/// callers stay stable across upstream structural changes.
pub struct NamespaceTable {
    namespaces: Vec<Namespace>,
    by_path: HashMap<Vec<String>, NamespaceId>,
}

impl NamespaceTable {
    pub fn new() -> Self {
        let global = Namespace {
            path: Vec::new(),
            kind: NamespaceKind::Plain,
            valid: true,
        };
        let mut by_path = HashMap::new();
        by_path.insert(Vec::new(), NamespaceId::GLOBAL);
        Self {
            namespaces: vec![global],
            by_path,
        }
    }

    pub fn get_or_create(&mut self, path: &[String]) -> NamespaceId {
        if let Some(&id) = self.by_path.get(path) {
            return id;
        }
        // Materialize intermediate namespaces so parent lookups work.
        for depth in 1..path.len() {
            let prefix = path[..depth].to_vec();
            if !self.by_path.contains_key(&prefix) {
                let id = NamespaceId(self.namespaces.len());
                self.namespaces.push(Namespace {
                    path: prefix.clone(),
                    kind: NamespaceKind::Plain,
                    valid: true,
                });
                self.by_path.insert(prefix, id);
            }
        }
        let id = NamespaceId(self.namespaces.len());
        self.namespaces.push(Namespace {
            path: path.to_vec(),
            kind: NamespaceKind::Plain,
            valid: true,
        });
        self.by_path.insert(path.to_vec(), id);
        id
    }

    pub fn lookup(&self, path: &[String]) -> Option<NamespaceId> {
        self.by_path.get(path).copied()
    }

    pub fn kind(&self, id: NamespaceId) -> NamespaceKind {
        self.namespaces[id.0].kind
    }

    pub fn is_valid(&self, id: NamespaceId) -> bool {
        self.namespaces.get(id.0).map(|n| n.valid).unwrap_or(false)
    }

    pub fn invalidate(&mut self, id: NamespaceId) {
        if let Some(ns) = self.namespaces.get_mut(id.0) {
            ns.valid = false;
        }
    }

    pub fn path(&self, id: NamespaceId) -> &[String] {
        &self.namespaces[id.0].path
    }

    pub fn qualified_name(&self, id: NamespaceId) -> String {
        self.namespaces[id.0].path.join("::")
    }

    /// Promote a plain namespace to class kind in place.
    pub fn convert_to_class(&mut self, id: NamespaceId) -> Result<NamespaceId, SymbolError> {
        let ns = self
            .namespaces
            .get_mut(id.0)
            .ok_or(SymbolError::InvalidNamespace(id.0))?;
        ns.kind = NamespaceKind::Class;
        Ok(id)
    }

    /// Re-derive a namespace from a mangled Itanium type name, e.g.
    /// `"7MyClass"` or `"N3foo3BarE"`.
    pub fn namespace_from_type_name(&mut self, mangled: &str) -> Result<NamespaceId, SymbolError> {
        let path = parse_type_name_path(mangled)?;
        Ok(self.get_or_create(&path))
    }
}

impl Default for NamespaceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NamespaceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceTable")
            .field("count", &self.namespaces.len())
            .finish()
    }
}

/// Split a mangled type name into its namespace path.
///
/// Handles the two forms `__cxa_demangle`-free tooling actually meets in
/// `typeinfo name` strings: a bare `<len><ident>` and a nested
/// `N[<len><ident>...]E`, with the `St` abbreviation for `std`.
pub fn parse_type_name_path(mangled: &str) -> Result<Vec<String>, SymbolError> {
    let bytes = mangled.as_bytes();
    if bytes.is_empty() {
        return Err(SymbolError::InvalidTypeName(mangled.to_string()));
    }

    let mut path = Vec::new();
    let mut pos = 0usize;
    let nested = bytes[0] == b'N';
    if nested {
        pos += 1;
    }
    if bytes.get(pos) == Some(&b'S') && bytes.get(pos + 1) == Some(&b't') {
        path.push("std".to_string());
        pos += 2;
    }

    loop {
        if nested && bytes.get(pos) == Some(&b'E') {
            pos += 1;
            break;
        }
        let start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == start {
            return Err(SymbolError::InvalidTypeName(mangled.to_string()));
        }
        let len: usize = mangled[start..pos]
            .parse()
            .map_err(|_| SymbolError::InvalidTypeName(mangled.to_string()))?;
        if pos + len > bytes.len() {
            return Err(SymbolError::InvalidTypeName(mangled.to_string()));
        }
        path.push(mangled[pos..pos + len].to_string());
        pos += len;
        if !nested {
            break;
        }
    }

    if path.is_empty() || (nested && path.len() < 2 && path != ["std"]) {
        return Err(SymbolError::InvalidTypeName(mangled.to_string()));
    }
    if pos != bytes.len() {
        return Err(SymbolError::InvalidTypeName(mangled.to_string()));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_name() {
        assert_eq!(parse_type_name_path("7MyClass").unwrap(), vec!["MyClass"]);
    }

    #[test]
    fn test_parse_nested_name() {
        assert_eq!(
            parse_type_name_path("N3foo3barE").unwrap(),
            vec!["foo", "bar"]
        );
        assert_eq!(
            parse_type_name_path("NSt9exceptionE").unwrap(),
            vec!["std", "exception"]
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_type_name_path("").is_err());
        assert!(parse_type_name_path("N3fooE3bar").is_err());
        assert!(parse_type_name_path("99X").is_err());
        assert!(parse_type_name_path("abc").is_err());
    }

    #[test]
    fn test_convert_to_class() {
        let mut table = NamespaceTable::new();
        let id = table.get_or_create(&["game".into(), "Actor".into()]);
        assert_eq!(table.kind(id), NamespaceKind::Plain);
        table.convert_to_class(id).unwrap();
        assert_eq!(table.kind(id), NamespaceKind::Class);
        // Parent namespace got materialized too.
        assert!(table.lookup(&["game".into()]).is_some());
    }

    #[test]
    fn test_dedup_by_path() {
        let mut table = NamespaceTable::new();
        let a = table.get_or_create(&["x".into()]);
        let b = table.namespace_from_type_name("1x").unwrap();
        assert_eq!(a, b);
    }
}
