//! Module dispatcher: exports, imports, visibility, and candidate sets.
//!
//! Modules publish implementations under `(module, simple_name)` and bind
//! other modules' exports into their own scope. The dispatcher aggregates
//! the candidate set visible at a call site and detects cross-module
//! conflicts after loading.
//!
//! Conflicts are reported, not fatal: a call site that can see conflicting
//! implementations usually resolves to `Ambiguous`, which carries the
//! conflict to the user with full context.


use std::fmt;

use jade_ir::{ModuleId, Name};
use rustc_hash::FxHashMap;

use crate::ImplId;

/// Module version, recorded on modules and exports.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl Version {
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Visibility of an export.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum Visibility {
    /// Importable by any module.
    #[default]
    Public,
    /// Visible only within the defining module.
    ModuleInternal,
}

/// How an imported name binds in the importing scope.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ImportMode {
    /// Bound under the exported simple name.
    Unqualified,
    /// Bound under the qualified spelling the parser interned (passed as
    /// the alias argument).
    Qualified,
    /// Bound under a caller-chosen alias.
    Aliased,
}

/// What to do when an import collides with an existing binding.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ConflictPolicy {
    /// Refuse the import.
    FailOnConflict,
    /// Replace the existing binding.
    Shadow,
    /// Keep both; resolution sees the union.
    Merge,
}

/// A registered module.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModuleInfo {
    pub id: ModuleId,
    pub name: Name,
    /// Filesystem-ish path, interned by the parser layer.
    pub path: Name,
    pub version: Version,
    pub dependencies: Vec<ModuleId>,
}

/// Errors from module registration, export, and import.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ModuleError {
    ModuleNotFound(ModuleId),
    DuplicateModule(Name),
    DuplicateExport { module: ModuleId, name: Name },
    SignatureNotExported { module: ModuleId, name: Name },
    VisibilityViolation { module: ModuleId, name: Name },
    ConflictUnderPolicy { module: ModuleId, name: Name },
    /// Aliased/qualified import without a binding name.
    MissingAlias { name: Name },
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleError::ModuleNotFound(id) => write!(f, "module {id:?} is not registered"),
            ModuleError::DuplicateModule(name) => {
                write!(f, "module named {name:?} is already registered")
            }
            ModuleError::DuplicateExport { module, name } => {
                write!(f, "module {module:?} already exports {name:?}")
            }
            ModuleError::SignatureNotExported { module, name } => {
                write!(f, "module {module:?} does not export {name:?}")
            }
            ModuleError::VisibilityViolation { module, name } => {
                write!(f, "{name:?} in module {module:?} is module-internal")
            }
            ModuleError::ConflictUnderPolicy { module, name } => {
                write!(f, "import of {name:?} conflicts with an existing binding in {module:?}")
            }
            ModuleError::MissingAlias { name } => {
                write!(f, "import of {name:?} requires a binding name")
            }
        }
    }
}

impl std::error::Error for ModuleError {}

/// A cross-module conflict found after loading.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CrossModuleConflict {
    /// The scope that can see the conflict.
    pub scope: ModuleId,
    /// The name bound from multiple origins.
    pub name: Name,
    /// The conflicting origin modules, sorted.
    pub origins: Vec<ModuleId>,
}

/// One binding of a name in a module's scope.
#[derive(Clone, Debug, Eq, PartialEq)]
struct Binding {
    impls: Vec<ImplId>,
    /// Where the implementations come from (the scope itself for locals).
    origin: ModuleId,
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct ExportEntry {
    impls: Vec<ImplId>,
    visibility: Visibility,
    since: Version,
}

/// Registry of modules, exports, imports, and scope bindings.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: Vec<ModuleInfo>,
    by_name: FxHashMap<Name, ModuleId>,
    exports: FxHashMap<(ModuleId, Name), ExportEntry>,
    /// Per-module scope: name → bindings, in binding order.
    scopes: FxHashMap<ModuleId, FxHashMap<Name, Vec<Binding>>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module.
    pub fn register_module(
        &mut self,
        name: Name,
        path: Name,
        version: Version,
        dependencies: Vec<ModuleId>,
    ) -> Result<ModuleId, ModuleError> {
        if self.by_name.contains_key(&name) {
            return Err(ModuleError::DuplicateModule(name));
        }
        let id = ModuleId::from_raw(u32::try_from(self.modules.len()).unwrap_or(u32::MAX));
        tracing::debug!(?name, %version, "registering module");
        self.modules.push(ModuleInfo {
            id,
            name,
            path,
            version,
            dependencies,
        });
        self.by_name.insert(name, id);
        self.scopes.insert(id, FxHashMap::default());
        Ok(id)
    }

    /// Get a module's info record.
    pub fn module(&self, id: ModuleId) -> Option<&ModuleInfo> {
        self.modules.get(id.raw() as usize)
    }

    /// Number of registered modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Look up a module by name.
    pub fn lookup(&self, name: Name) -> Option<ModuleId> {
        self.by_name.get(&name).copied()
    }

    /// Declare a locally defined implementation in a module's scope.
    ///
    /// Local declarations are visible without any import and participate in
    /// every candidate set for the scope.
    pub fn declare_local(
        &mut self,
        module: ModuleId,
        name: Name,
        impl_id: ImplId,
    ) -> Result<(), ModuleError> {
        let scope = self
            .scopes
            .get_mut(&module)
            .ok_or(ModuleError::ModuleNotFound(module))?;
        let bindings = scope.entry(name).or_default();
        if let Some(local) = bindings.iter_mut().find(|b| b.origin == module) {
            local.impls.push(impl_id);
        } else {
            bindings.push(Binding {
                impls: vec![impl_id],
                origin: module,
            });
        }
        Ok(())
    }

    /// Publish implementations under `(module, name)`.
    pub fn export_signature(
        &mut self,
        module: ModuleId,
        name: Name,
        impls: Vec<ImplId>,
        visibility: Visibility,
        since: Version,
    ) -> Result<(), ModuleError> {
        if self.module(module).is_none() {
            return Err(ModuleError::ModuleNotFound(module));
        }
        if self.exports.contains_key(&(module, name)) {
            return Err(ModuleError::DuplicateExport { module, name });
        }
        self.exports.insert(
            (module, name),
            ExportEntry {
                impls,
                visibility,
                since,
            },
        );
        Ok(())
    }

    /// Bind an export of `from` into the scope of `to`.
    pub fn import_signature(
        &mut self,
        from: ModuleId,
        to: ModuleId,
        name: Name,
        alias: Option<Name>,
        mode: ImportMode,
        conflict_policy: ConflictPolicy,
    ) -> Result<(), ModuleError> {
        if self.module(from).is_none() {
            return Err(ModuleError::ModuleNotFound(from));
        }
        if self.module(to).is_none() {
            return Err(ModuleError::ModuleNotFound(to));
        }

        let entry = self
            .exports
            .get(&(from, name))
            .ok_or(ModuleError::SignatureNotExported { module: from, name })?;
        if entry.visibility == Visibility::ModuleInternal && from != to {
            return Err(ModuleError::VisibilityViolation { module: from, name });
        }

        let key = match mode {
            ImportMode::Unqualified => name,
            ImportMode::Qualified | ImportMode::Aliased => {
                alias.ok_or(ModuleError::MissingAlias { name })?
            }
        };

        let impls = entry.impls.clone();
        let scope = self
            .scopes
            .get_mut(&to)
            .ok_or(ModuleError::ModuleNotFound(to))?;
        let bindings = scope.entry(key).or_default();

        if !bindings.is_empty() {
            match conflict_policy {
                ConflictPolicy::FailOnConflict => {
                    return Err(ModuleError::ConflictUnderPolicy { module: to, name: key });
                }
                ConflictPolicy::Shadow => bindings.clear(),
                ConflictPolicy::Merge => {}
            }
        }

        bindings.push(Binding {
            impls,
            origin: from,
        });
        Ok(())
    }

    /// The candidate set visible for `name` in `scope_module`.
    ///
    /// The union of locally declared and imported implementations, in
    /// binding order with locals first, deduplicated.
    pub fn candidates_for(&self, scope_module: ModuleId, name: Name) -> Vec<ImplId> {
        let Some(scope) = self.scopes.get(&scope_module) else {
            return Vec::new();
        };
        let Some(bindings) = scope.get(&name) else {
            return Vec::new();
        };

        let mut out: Vec<ImplId> = Vec::new();
        let local_first = bindings
            .iter()
            .filter(|b| b.origin == scope_module)
            .chain(bindings.iter().filter(|b| b.origin != scope_module));
        for binding in local_first {
            for &impl_id in &binding.impls {
                if !out.contains(&impl_id) {
                    out.push(impl_id);
                }
            }
        }
        out
    }

    /// The lowest-id module exporting `name` publicly, if any.
    ///
    /// Used by diagnostics to suggest a missing import.
    pub fn exporter_of(&self, name: Name) -> Option<ModuleId> {
        self.exports
            .iter()
            .filter(|((_, exported), entry)| {
                *exported == name && entry.visibility == Visibility::Public
            })
            .map(|((module, _), _)| *module)
            .min()
    }

    /// Detect cross-module conflicts after all modules are loaded.
    ///
    /// A conflict is a scope name bound from two or more origins. Conflicts
    /// never halt compilation; call sites that touch them resolve to
    /// `Ambiguous` with the same candidate set.
    pub fn detect_conflicts(&self) -> Vec<CrossModuleConflict> {
        let mut conflicts = Vec::new();
        for info in &self.modules {
            let Some(scope) = self.scopes.get(&info.id) else {
                continue;
            };
            for (&name, bindings) in scope {
                let mut origins: Vec<ModuleId> = bindings.iter().map(|b| b.origin).collect();
                origins.sort_unstable();
                origins.dedup();
                if origins.len() > 1 {
                    conflicts.push(CrossModuleConflict {
                        scope: info.id,
                        name,
                        origins,
                    });
                }
            }
        }
        // Scope ids then names, for deterministic reporting.
        conflicts.sort_by_key(|c| (c.scope, c.name));
        conflicts
    }
}
