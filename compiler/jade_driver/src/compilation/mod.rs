//! The per-compilation context object.
//!
//! Registration (types, modules, implementations, exports, imports) runs
//! single-threaded in the build phase, in the external interface's order:
//! types, then modules, then exports, then imports. After registration the
//! registry and pool are read-only, so resolution and table generation can
//! fan out across signature families with rayon; each worker owns its
//! family's table end to end and surrenders an immutable reference.
//!
//! Registration failures are fatal for the registering statement only:
//! they become diagnostics and the compilation continues. Resolution
//! failures never abort anything; the call site is left unresolved and
//! reported.

#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use jade_diagnostic::{Diagnostic, DiagnosticQueue, FixLearningStore};
use jade_dispatch::{
    signature_hash, DispatchEngine, DispatchTable, GeneratorConfig, Profiler, TableGenerator,
};
use jade_ir::{EffectSet, Interner, ModuleId, Name, Span};
use jade_resolve::{
    ArgTuple, CallSite, ConflictPolicy, DiagnosticEngine, FunctionDecl, ImplId, ImplPool,
    ImportMode, ModuleRegistry, ResolutionResult, Resolver, Version, Visibility,
};
use jade_types::{RegistryError, ShapeField, TypeId, TypeKind, TypeRegistry};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

/// Where a compilation currently is.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Phase {
    /// Registration is open; the registry and pool are still growing.
    Registering,
    /// Registration is closed; resolution and generation may run.
    Analyzing,
}

/// Counters reported at the end of a compilation.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CompilationStats {
    pub types: usize,
    pub modules: usize,
    pub implementations: usize,
    pub call_sites: usize,
    pub tables: usize,
    pub errors: usize,
    pub warnings: usize,
}

/// Process-wide state for one compilation.
pub struct Compilation {
    interner: Interner,
    registry: TypeRegistry,
    modules: ModuleRegistry,
    pool: ImplPool,
    learning: FixLearningStore,
    diagnostics: DiagnosticQueue,
    /// Observed argument tuples per family name, for table generation.
    observed: FxHashMap<Name, Vec<ArgTuple>>,
    tables: FxHashMap<u64, Arc<DispatchTable>>,
    profiler: Profiler,
    generator_config: GeneratorConfig,
    phase: Phase,
    call_site_count: usize,
    cancelled: AtomicBool,
}

impl Default for Compilation {
    fn default() -> Self {
        Self::new()
    }
}

impl Compilation {
    pub fn new() -> Self {
        Compilation {
            interner: Interner::new(),
            registry: TypeRegistry::new(),
            modules: ModuleRegistry::new(),
            pool: ImplPool::new(),
            learning: FixLearningStore::new(),
            diagnostics: DiagnosticQueue::new(),
            observed: FxHashMap::default(),
            tables: FxHashMap::default(),
            profiler: Profiler::new(),
            generator_config: GeneratorConfig::default(),
            phase: Phase::Registering,
            call_site_count: 0,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Use a pre-loaded fix-learning store.
    #[must_use]
    pub fn with_learning_store(mut self, learning: FixLearningStore) -> Self {
        self.learning = learning;
        self
    }

    #[must_use]
    pub fn with_generator_config(mut self, config: GeneratorConfig) -> Self {
        self.generator_config = config;
        self
    }

    /// Intern a string.
    pub fn intern(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn pool(&self) -> &ImplPool {
        &self.pool
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Request cancellation; honored at the next batch boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    // === Registration phase ===

    /// Register a nominal type.
    pub fn register_type(
        &mut self,
        name: &str,
        kind: TypeKind,
        supertypes: &[TypeId],
    ) -> Option<TypeId> {
        let interned = self.interner.intern(name);
        match self.registry.register_type(interned, kind, supertypes) {
            Ok(id) => Some(id),
            Err(error) => {
                self.report_registry_error(&error);
                None
            }
        }
    }

    /// Register a shape type with fields.
    pub fn register_shape(
        &mut self,
        name: &str,
        kind: TypeKind,
        supertypes: &[TypeId],
        fields: Vec<ShapeField>,
    ) -> Option<TypeId> {
        let interned = self.interner.intern(name);
        match self
            .registry
            .register_shape(interned, kind, supertypes, fields)
        {
            Ok(id) => Some(id),
            Err(error) => {
                self.report_registry_error(&error);
                None
            }
        }
    }

    /// Register a module.
    pub fn register_module(
        &mut self,
        name: &str,
        path: &str,
        version: Version,
        dependencies: Vec<ModuleId>,
    ) -> Option<ModuleId> {
        let interned = self.interner.intern(name);
        let path = self.interner.intern(path);
        match self
            .modules
            .register_module(interned, path, version, dependencies)
        {
            Ok(id) => Some(id),
            Err(error) => {
                self.report_module_error(&error, Span::DUMMY);
                None
            }
        }
    }

    /// Register an implementation and bind it in its module's scope.
    #[allow(clippy::too_many_arguments)]
    pub fn register_implementation(
        &mut self,
        name: &str,
        module: ModuleId,
        param_types: Vec<TypeId>,
        return_type: TypeId,
        effects: EffectSet,
        span: Span,
    ) -> Option<ImplId> {
        let simple_name = self.interner.intern(name);
        let decl = FunctionDecl {
            simple_name,
            module,
            param_types,
            return_type,
            effects,
            span,
        };
        let impl_id = match self.pool.register(&self.registry, decl) {
            Ok(id) => id,
            Err(error) => {
                let diagnostic = self
                    .diagnostic_engine()
                    .explain_signature_error(&error, span);
                self.diagnostics.add(diagnostic);
                return None;
            }
        };
        if let Err(error) = self.modules.declare_local(module, simple_name, impl_id) {
            self.report_module_error(&error, span);
            return None;
        }
        Some(impl_id)
    }

    /// Publish implementations from a module.
    pub fn export_signature(
        &mut self,
        module: ModuleId,
        name: &str,
        impls: Vec<ImplId>,
        visibility: Visibility,
        since: Version,
    ) -> bool {
        let interned = self.interner.intern(name);
        match self
            .modules
            .export_signature(module, interned, impls, visibility, since)
        {
            Ok(()) => true,
            Err(error) => {
                self.report_module_error(&error, Span::DUMMY);
                false
            }
        }
    }

    /// Bind an export into another module's scope.
    pub fn import_signature(
        &mut self,
        from: ModuleId,
        to: ModuleId,
        name: &str,
        alias: Option<&str>,
        mode: ImportMode,
        conflict_policy: ConflictPolicy,
    ) -> bool {
        let interned = self.interner.intern(name);
        let alias = alias.map(|a| self.interner.intern(a));
        match self
            .modules
            .import_signature(from, to, interned, alias, mode, conflict_policy)
        {
            Ok(()) => true,
            Err(error) => {
                self.report_module_error(&error, Span::DUMMY);
                false
            }
        }
    }

    /// Close the registration phase.
    ///
    /// Cross-module conflicts are detected here and reported as warnings;
    /// affected call sites still resolve (usually to `Ambiguous`).
    #[tracing::instrument(level = "debug", skip_all, fields(types = self.registry.len(), impls = self.pool.len()))]
    pub fn finish_registration(&mut self) {
        for conflict in self.modules.detect_conflicts() {
            let name = self.interner.lookup(conflict.name);
            let diagnostic =
                Diagnostic::warning(jade_diagnostic::ErrorCode::S1106).with_message(format!(
                    "`{name}` is bound from {} modules in one scope",
                    conflict.origins.len()
                ));
            self.diagnostics.add(diagnostic);
        }
        self.phase = Phase::Analyzing;
    }

    // === Analysis phase ===

    /// Resolve a call site, recording it for table generation and
    /// reporting failures as diagnostics.
    pub fn resolve(&mut self, call_site: &CallSite) -> ResolutionResult {
        self.call_site_count += 1;
        self.observed
            .entry(call_site.function_name)
            .or_default()
            .push(call_site.argument_types.clone());

        let resolver = Resolver::new(&self.registry, &self.pool, &self.modules);
        let result = resolver.resolve(call_site);

        let diagnostic = self.diagnostic_engine().explain(&result);
        if let Some(diagnostic) = diagnostic {
            self.diagnostics.add(diagnostic);
        }
        result
    }

    /// Generate dispatch tables for every family over the thresholds.
    ///
    /// Families are processed in sorted name order and generated in
    /// parallel; each worker owns its table end to end. Cancellation is
    /// honored at the batch boundary before workers launch.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn generate_tables(&mut self) -> usize {
        if self.is_cancelled() {
            return 0;
        }

        let generator = TableGenerator::new(&self.registry, &self.pool, self.generator_config);

        // Family names with any pooled implementation or observed call.
        let mut names: Vec<Name> = self
            .pool
            .iter()
            .map(|imp| imp.function.simple_name)
            .chain(self.observed.keys().copied())
            .collect();
        names.sort_unstable();
        names.dedup();

        let empty: Vec<ArgTuple> = Vec::new();
        let generated: Vec<Arc<DispatchTable>> = names
            .par_iter()
            .filter_map(|&name| {
                let impls: Vec<_> = self.pool.family(name).collect();
                let observed = self.observed.get(&name).unwrap_or(&empty);
                if !generator.should_generate(&impls, observed) {
                    return None;
                }
                let rendered = self.interner.lookup(name);
                Some(Arc::new(generator.generate(&rendered, &impls, observed)))
            })
            .collect();

        let count = generated.len();
        for table in generated {
            self.tables.insert(table.signature_hash, table);
        }
        count
    }

    /// The materialized table for a signature name, if generated.
    pub fn dispatch_table(&self, signature_name: &str) -> Option<&Arc<DispatchTable>> {
        self.tables.get(&signature_hash(signature_name))
    }

    /// A runtime engine over this compilation's tables.
    pub fn new_engine(&self) -> DispatchEngine<'_> {
        let mut engine = DispatchEngine::new(&self.registry, &self.pool);
        for table in self.tables.values() {
            engine.install_table(Arc::clone(table));
        }
        engine
    }

    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    pub fn profiler_mut(&mut self) -> &mut Profiler {
        &mut self.profiler
    }

    /// Drain collected diagnostics, sorted by position.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.flush()
    }

    /// End-of-compilation counters.
    pub fn stats(&self) -> CompilationStats {
        CompilationStats {
            types: self.registry.len(),
            modules: self.modules.len(),
            implementations: self.pool.len(),
            call_sites: self.call_site_count,
            tables: self.tables.len(),
            errors: self.diagnostics.error_count(),
            warnings: self.diagnostics.warning_count(),
        }
    }

    fn diagnostic_engine(&self) -> DiagnosticEngine<'_> {
        DiagnosticEngine::new(
            &self.interner,
            &self.registry,
            &self.pool,
            &self.modules,
            &self.learning,
        )
    }

    fn report_registry_error(&mut self, error: &RegistryError) {
        let code = match error {
            RegistryError::CyclicSupertypes { .. } => jade_diagnostic::ErrorCode::S1201,
            _ => jade_diagnostic::ErrorCode::S1901,
        };
        let diagnostic = Diagnostic::error(code).with_message(error.to_string());
        self.diagnostics.add(diagnostic);
    }

    fn report_module_error(&mut self, error: &jade_resolve::ModuleError, span: Span) {
        let diagnostic = self.diagnostic_engine().explain_module_error(error, span);
        self.diagnostics.add(diagnostic);
    }
}
