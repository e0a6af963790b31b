// Sat Feb 07 2026 - Alex

use crate::catalog::{CategoryPath, Layout, LayoutKey, TypeCatalog, TypeRef};
use crate::config::Config;
use crate::memory::{Address, ImageMemory, MemoryReader};
use crate::rtti::edit::{self, SUPER_PREFIX};
use crate::rtti::scan::{CancelToken, VtableScanner};
use crate::rtti::type_info::{AbiVtables, TypeInfoKind, TypeInfoParser, TypeInfoRecord};
use crate::rtti::vtable::{VtableModel, VtableRef};
use crate::rtti::RttiError;
use crate::symbol::{
    NamespaceId, NamespaceKind, NamespaceTable, SymbolDirectory, SymbolInfo, SymbolKind,
    VTABLE_SYMBOL_NAME,
};
use crate::utils::logging::ScopedTimer;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Index of a class model inside its session's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(usize);

/// One reconstructed class: its RTTI record, inheritance edges into the
/// session arena, and the lazily cached vtable and full layout.
#[derive(Debug)]
pub struct ClassTypeInfoModel {
    record: TypeInfoRecord,
    parents: Vec<ClassId>,
    virtual_parents: Vec<ClassId>,
    vtable: VtableRef,
    full_layout: Option<Arc<Layout>>,
}

impl ClassTypeInfoModel {
    fn new(record: TypeInfoRecord) -> Self {
        Self {
            record,
            parents: Vec::new(),
            virtual_parents: Vec::new(),
            vtable: VtableRef::Unresolved,
            full_layout: None,
        }
    }

    pub fn record(&self) -> &TypeInfoRecord {
        &self.record
    }

    /// Direct parents in declaration order.
    pub fn parents(&self) -> &[ClassId] {
        &self.parents
    }

    pub fn virtual_parents(&self) -> &[ClassId] {
        &self.virtual_parents
    }

    pub fn vtable_ref(&self) -> &VtableRef {
        &self.vtable
    }
}

/// A batch reconstruction over one binary.
///
/// The session owns the arena of class models and the symbol/namespace
/// state; the catalog is an explicit shared handle so that sessions over
/// different binaries cannot cross-contaminate. All structural mutation is
/// single-writer by contract.
pub struct ReconstructionSession {
    reader: Arc<dyn MemoryReader>,
    catalog: Arc<TypeCatalog>,
    config: Config,
    namespaces: NamespaceTable,
    directory: SymbolDirectory,
    abi: AbiVtables,
    models: Vec<ClassTypeInfoModel>,
    by_address: HashMap<u64, ClassId>,
    building: HashSet<usize>,
}

impl ReconstructionSession {
    pub fn new(reader: Arc<dyn MemoryReader>, catalog: Arc<TypeCatalog>, config: Config) -> Self {
        Self {
            reader,
            catalog,
            config,
            namespaces: NamespaceTable::new(),
            directory: SymbolDirectory::new(),
            abi: AbiVtables::default(),
            models: Vec::new(),
            by_address: HashMap::new(),
            building: HashSet::new(),
        }
    }

    /// Pull RTTI symbols out of an ELF image and resolve the `__cxxabiv1`
    /// vtable addresses used for exact record classification.
    pub fn load_image_symbols(&mut self, image: &ImageMemory) {
        self.directory.load_from_image(image, &mut self.namespaces);
        self.abi = AbiVtables::resolve(&self.directory, &mut self.namespaces, self.reader.pointer_size());
    }

    pub fn add_symbol(&mut self, symbol: SymbolInfo) {
        self.directory.add(symbol);
    }

    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    pub fn namespaces_mut(&mut self) -> &mut NamespaceTable {
        &mut self.namespaces
    }

    pub fn catalog(&self) -> &Arc<TypeCatalog> {
        &self.catalog
    }

    pub fn model(&self, id: ClassId) -> &ClassTypeInfoModel {
        &self.models[id.0]
    }

    pub fn record(&self, id: ClassId) -> &TypeInfoRecord {
        &self.models[id.0].record
    }

    /// Parse the type_info record at `address` into the arena, recursively
    /// materializing parent models. Addresses are deduplicated, so shared
    /// ancestors resolve to the same `ClassId`.
    pub fn model_at(&mut self, address: Address) -> Result<ClassId, RttiError> {
        if let Some(&id) = self.by_address.get(&address.as_u64()) {
            return Ok(id);
        }

        let parser = TypeInfoParser::new(&*self.reader, self.abi, self.config.max_bases);
        let record = parser.parse(address, &mut self.namespaces)?;
        log::debug!("typeinfo {} -> class {}", address, record.type_name);
        let kind = record.kind.clone();

        let id = ClassId(self.models.len());
        self.by_address.insert(address.as_u64(), id);
        self.models.push(ClassTypeInfoModel::new(record));

        match kind {
            TypeInfoKind::Class => {}
            TypeInfoKind::SingleInheritance { base } => {
                let parent = self.model_at(base)?;
                self.models[id.0].parents.push(parent);
            }
            TypeInfoKind::VirtualMultiple { bases, .. } => {
                for descriptor in bases {
                    let parent = self.model_at(descriptor.type_info)?;
                    self.models[id.0].parents.push(parent);
                    if descriptor.is_virtual() && !self.models[id.0].virtual_parents.contains(&parent) {
                        self.models[id.0].virtual_parents.push(parent);
                    }
                }
            }
        }
        Ok(id)
    }

    /// Disambiguation key: the class's own type name concatenated with each
    /// direct parent's unique name, in declared order. Recomputed on every
    /// call, never persisted. Malformed RTTI can close the parent graph into
    /// a cycle; a class already on the recursion path contributes its bare
    /// name once and the walk stops there.
    pub fn unique_type_name(&self, id: ClassId) -> String {
        let mut visiting = HashSet::new();
        self.unique_type_name_guarded(id, &mut visiting)
    }

    fn unique_type_name_guarded(&self, id: ClassId, visiting: &mut HashSet<usize>) -> String {
        let model = &self.models[id.0];
        let mut name = model.record.type_name.clone();
        if !visiting.insert(id.0) {
            return name;
        }
        for &parent in &model.parents {
            name.push_str(&self.unique_type_name_guarded(parent, visiting));
        }
        visiting.remove(&id.0);
        name
    }

    /// Resolve the class-kind namespace backing this model.
    ///
    /// Already class-kind: use it. Still valid but plain: convert in place.
    /// Invalidated upstream: re-derive from the mangled type name and
    /// convert that. Malformed input logs and yields `None`.
    pub fn class_namespace(&mut self, id: ClassId) -> Option<NamespaceId> {
        let ns = self.models[id.0].record.namespace;
        if self.namespaces.kind(ns) == NamespaceKind::Class {
            return Some(ns);
        }
        if self.namespaces.is_valid(ns) {
            return match self.namespaces.convert_to_class(ns) {
                Ok(converted) => Some(converted),
                Err(e) => {
                    log::error!("namespace conversion failed for {}: {}", self.models[id.0].record.type_name, e);
                    None
                }
            };
        }
        let mangled = self.models[id.0].record.mangled_name.clone();
        match self
            .namespaces
            .namespace_from_type_name(&mangled)
            .and_then(|derived| self.namespaces.convert_to_class(derived))
        {
            Ok(derived) => {
                self.models[id.0].record.namespace = derived;
                Some(derived)
            }
            Err(e) => {
                log::error!("cannot derive class namespace from {:?}: {}", mangled, e);
                None
            }
        }
    }

    /// Resolve this class's vtable, caching the outcome permanently.
    ///
    /// Symbol candidates are tried in discovery order; the first that
    /// parses and validates wins. Only when the symbol search is exhausted
    /// does the heuristic scan run, and a cancelled or failed scan caches
    /// `None` just like a clean miss.
    pub fn get_vtable(&mut self, id: ClassId, token: &CancelToken) -> VtableRef {
        if !self.models[id.0].vtable.is_unresolved() {
            return self.models[id.0].vtable.clone();
        }

        let type_info = self.models[id.0].record.address;
        let namespace = self
            .class_namespace(id)
            .unwrap_or(self.models[id.0].record.namespace);
        let candidates: Vec<Address> = self
            .directory
            .symbols_named(VTABLE_SYMBOL_NAME, namespace)
            .iter()
            .map(|s| s.address())
            .collect();

        for candidate in candidates {
            match VtableModel::parse(
                &*self.reader,
                &self.directory,
                type_info,
                candidate,
                self.config.max_vtable_words,
                self.config.max_prefix_words,
            ) {
                Ok(model) => {
                    if let Err(e) = model.validate() {
                        log::debug!("vtable symbol at {} rejected: {}", candidate, e);
                        continue;
                    }
                    log::debug!("resolved vtable for {} at {}", self.models[id.0].record.type_name, candidate);
                    let resolved = VtableRef::Resolved(Arc::new(model));
                    self.models[id.0].vtable = resolved.clone();
                    return resolved;
                }
                Err(e) => {
                    log::debug!("vtable symbol at {} unparsable: {}", candidate, e);
                }
            }
        }

        let outcome = if self.config.enable_heuristic_scan {
            let scanner = VtableScanner::new(&*self.reader, &self.directory, &self.config);
            match scanner.find_vtable(type_info, token) {
                Ok(Some(model)) => VtableRef::Resolved(Arc::new(model)),
                Ok(None) => VtableRef::None,
                Err(RttiError::Cancelled) => {
                    // Conflates "cancelled" with "absent" for this session;
                    // a fresh session re-attempts the search.
                    log::warn!(
                        "vtable scan for {} cancelled; caching as absent",
                        self.models[id.0].record.type_name
                    );
                    VtableRef::None
                }
                Err(e) => {
                    log::error!("vtable scan for {} failed: {}", self.models[id.0].record.type_name, e);
                    VtableRef::None
                }
            }
        } else {
            VtableRef::None
        };
        self.models[id.0].vtable = outcome.clone();
        outcome
    }

    /// Fails closed: an invalid record or an unresolvable vtable is simply
    /// "not abstract".
    pub fn is_abstract(&mut self, id: ClassId, token: &CancelToken) -> bool {
        if self.models[id.0].record.validate(&*self.reader).is_err() {
            return false;
        }
        match self.get_vtable(id, token) {
            VtableRef::Resolved(model) => model.has_abstract_slot(),
            _ => false,
        }
    }

    fn layout_key(&self, id: ClassId) -> LayoutKey {
        let record = &self.models[id.0].record;
        let category = CategoryPath::from_segments(self.namespaces.path(record.namespace));
        LayoutKey::new(category, record.type_name.clone())
    }

    fn vptr_type(&self, id: ClassId) -> TypeRef {
        let record = &self.models[id.0].record;
        TypeRef::Pointer {
            target: format!("{}::vtable", self.namespaces.qualified_name(record.namespace)),
        }
    }

    /// The class's full in-memory shape: vptr slot, non-virtual base
    /// sub-objects from offset 0 in declared order, then virtual base
    /// sub-objects at the offsets the vtable's base-offset table gives.
    /// Committed to the catalog; the committed instance is cached.
    pub fn class_layout(&mut self, id: ClassId, token: &CancelToken) -> Result<Arc<Layout>, RttiError> {
        if let Some(full) = &self.models[id.0].full_layout {
            return Ok(Arc::clone(full));
        }
        if !self.building.insert(id.0) {
            return Err(RttiError::InvalidDataType(
                self.models[id.0].record.address.as_u64(),
                "inheritance cycle".to_string(),
            ));
        }
        let result = self.build_class_layout(id, token);
        self.building.remove(&id.0);
        let committed = result?;
        self.models[id.0].full_layout = Some(Arc::clone(&committed));
        Ok(committed)
    }

    fn build_class_layout(&mut self, id: ClassId, token: &CancelToken) -> Result<Arc<Layout>, RttiError> {
        let pointer_size = self.reader.pointer_size();
        let parents = self.models[id.0].parents.clone();
        let virtual_parents = self.models[id.0].virtual_parents.clone();

        let mut layout = Layout::new(self.layout_key(id));

        let mut cursor = 0usize;
        for parent in parents.iter().filter(|p| !virtual_parents.contains(p)) {
            let parent_super = self.super_class_layout(*parent, token)?;
            if parent_super.length() == 0 {
                continue;
            }
            let field = format!("{}{}", SUPER_PREFIX, self.models[parent.0].record.type_name);
            edit::replace_component(
                &mut layout,
                TypeRef::Struct(parent_super.key().clone()),
                parent_super.length(),
                &field,
                cursor,
            );
            cursor += parent_super.length();
        }

        let vtable = self.get_vtable(id, token);
        if let Some(model) = vtable.model() {
            if model.validate().is_ok() {
                edit::add_vptr(&mut layout, self.vptr_type(id), pointer_size);
            }
        }

        if let Some(model) = vtable.model() {
            let base_offsets: Vec<i64> = model.base_offsets()[1..].to_vec();
            for (parent, offset) in virtual_parents.iter().zip(base_offsets) {
                if offset <= 0 {
                    continue;
                }
                let parent_super = self.super_class_layout(*parent, token)?;
                if parent_super.length() == 0 {
                    continue;
                }
                let field = format!("{}{}", SUPER_PREFIX, self.models[parent.0].record.type_name);
                edit::replace_component(
                    &mut layout,
                    TypeRef::Struct(parent_super.key().clone()),
                    parent_super.length(),
                    &field,
                    offset as usize,
                );
            }
        }

        if layout.is_empty() {
            // An empty C++ class still occupies one addressable byte.
            layout.grow_to(1);
        }

        edit::resolve_struct(&self.catalog, layout).map_err(|e| {
            log::error!("failed to commit layout for {}: {}", self.models[id.0].record.type_name, e);
            RttiError::from(e)
        })
    }

    /// The layout this class contributes when embedded as a base: the full
    /// layout minus virtual-base sub-objects.
    ///
    /// With a single base-offset entry there is nothing to strip and the
    /// identical full-layout instance comes back, no copy, no catalog
    /// write. Any failure while stripping falls back to the unmodified
    /// full layout.
    pub fn super_class_layout(&mut self, id: ClassId, token: &CancelToken) -> Result<Arc<Layout>, RttiError> {
        let full = self.class_layout(id, token)?;
        let vtable = self.get_vtable(id, token);
        let has_virtual_bases = vtable
            .model()
            .map(|m| m.base_offsets().len() > 1)
            .unwrap_or(false);
        if !has_virtual_bases {
            return Ok(full);
        }

        let mut layout = (*full).clone();
        layout.set_name(format!("{}{}", SUPER_PREFIX, full.name()));

        let virtual_parents = self.models[id.0].virtual_parents.clone();
        let mut parent_keys = HashSet::new();
        for parent in virtual_parents {
            let keys = self
                .super_class_layout(parent, token)
                .and_then(|sup| Ok((sup, self.class_layout(parent, token)?)));
            match keys {
                Ok((sup, parent_full)) => {
                    parent_keys.insert(sup.key().clone());
                    parent_keys.insert(parent_full.key().clone());
                }
                Err(e) => {
                    log::error!(
                        "virtual parent layout unavailable for {}: {}; keeping full layout",
                        self.models[id.0].record.type_name,
                        e
                    );
                    return Ok(full);
                }
            }
        }

        edit::delete_virtual_components(&mut layout, &parent_keys);
        edit::trim_structure(&mut layout);
        match edit::resolve_struct(&self.catalog, layout) {
            Ok(committed) => Ok(committed),
            Err(e) => {
                log::error!("failed to commit super layout for {}: {}", full.name(), e);
                Ok(full)
            }
        }
    }

    /// Reconstruct every class the directory holds a `typeinfo` symbol
    /// for: model, vtable, full layout. Individual failures are logged
    /// and skipped; the returned ids are the classes that made it.
    pub fn reconstruct_all(&mut self, token: &CancelToken) -> Vec<ClassId> {
        let _timer = ScopedTimer::new("reconstruction");
        let addresses: Vec<Address> = self
            .directory
            .symbols_of_kind(SymbolKind::TypeInfo)
            .iter()
            .map(|s| s.address())
            .collect();
        let mut ids = Vec::with_capacity(addresses.len());
        for address in addresses {
            let id = match self.model_at(address) {
                Ok(id) => id,
                Err(e) => {
                    log::warn!("skipping typeinfo at {}: {}", address, e);
                    continue;
                }
            };
            if let Err(e) = self.class_layout(id, token) {
                log::warn!(
                    "no layout for {}: {}",
                    self.models[id.0].record.type_name,
                    e
                );
                continue;
            }
            ids.push(id);
        }
        log::info!("reconstructed {} classes", ids.len());
        ids
    }

    /// All committed layouts, for export.
    pub fn export_layouts(&self) -> serde_json::Value {
        self.catalog.export_json()
    }
}
