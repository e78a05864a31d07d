//! Diagnostic construction for resolution failures.
//!
//! Turns non-success [`ResolutionResult`]s and registration errors into
//! layered diagnostics: human message, machine payload with per-argument
//! conversion costs, ranked hypotheses, and fix suggestions whose
//! confidences are adjusted by the fix-learning store.


use jade_diagnostic::{
    rank_hypotheses, Applicability, CandidateInfo, Diagnostic, ErrorCode, FixLearningStore,
    FixSuggestion, Hypothesis, HypothesisKind, MachineData, TextEdit,
};
use jade_ir::{Interner, Span};
use jade_types::{TypeId, TypeRegistry};

use crate::{
    CallSite, ImplId, ImplPool, Implementation, ModuleError, ModuleRegistry, Rejection,
    ResolutionResult, SignatureError,
};

/// Builds diagnostics from resolution and registration failures.
pub struct DiagnosticEngine<'a> {
    interner: &'a Interner,
    registry: &'a TypeRegistry,
    pool: &'a ImplPool,
    modules: &'a ModuleRegistry,
    learning: &'a FixLearningStore,
}

impl<'a> DiagnosticEngine<'a> {
    pub fn new(
        interner: &'a Interner,
        registry: &'a TypeRegistry,
        pool: &'a ImplPool,
        modules: &'a ModuleRegistry,
        learning: &'a FixLearningStore,
    ) -> Self {
        DiagnosticEngine {
            interner,
            registry,
            pool,
            modules,
            learning,
        }
    }

    /// Explain a resolution result. Success yields no diagnostic.
    pub fn explain(&self, result: &ResolutionResult) -> Option<Diagnostic> {
        match result {
            ResolutionResult::Success(_) => None,
            ResolutionResult::Ambiguous {
                candidates,
                argument_types,
                call_site,
            } => Some(self.explain_ambiguous(candidates, argument_types, call_site)),
            ResolutionResult::NoMatch {
                rejected,
                argument_types,
                call_site,
            } => Some(self.explain_no_match(rejected, argument_types, call_site)),
            ResolutionResult::InternalError { message, call_site } => Some(
                Diagnostic::error(ErrorCode::S1901)
                    .with_file(call_site.file)
                    .with_message(format!("internal resolver error: {message}"))
                    .with_label(call_site.span, "while resolving this call"),
            ),
        }
    }

    fn explain_ambiguous(
        &self,
        candidates: &[ImplId],
        argument_types: &[TypeId],
        call_site: &CallSite,
    ) -> Diagnostic {
        let name = self.interner.lookup(call_site.function_name);
        let impls: Vec<&Implementation> = candidates
            .iter()
            .filter_map(|id| self.pool.get(*id))
            .collect();

        let mut modules_seen: Vec<String> = impls
            .iter()
            .map(|imp| self.render_module(imp))
            .collect();
        modules_seen.sort();
        modules_seen.dedup();

        let hypotheses = rank_hypotheses(vec![
            Hypothesis::new(
                HypothesisKind::WrongImport,
                if modules_seen.len() > 1 { 3.0 } else { 1.0 },
                format!(
                    "`{name}` is visible from {} modules with equally specific signatures",
                    modules_seen.len()
                ),
            ),
            Hypothesis::new(
                HypothesisKind::TypeMismatch,
                1.0,
                "more specific argument types would select a unique implementation".to_string(),
            ),
        ]);

        let mut diagnostic = Diagnostic::error(ErrorCode::S1101)
            .with_file(call_site.file)
            .with_message(format!(
                "ambiguous call to `{name}`: {} equally specific implementations",
                impls.len()
            ))
            .with_explanation(
                "the specificity order cannot choose between these candidates; \
                 the call must be disambiguated at the source"
                    .to_string(),
            )
            .with_educational_note(
                "dispatch never breaks ties: reporting ambiguity instead of guessing \
                 keeps call behavior predictable as overloads are added",
            )
            .with_label(call_site.span, format!("ambiguous call to `{name}`"))
            .with_hypotheses(hypotheses)
            .with_machine_data(self.machine_data(
                ErrorCode::S1101,
                &impls,
                argument_types,
                call_site,
            ));

        for imp in &impls {
            diagnostic = diagnostic.with_label(imp.span, "candidate declared here");
        }

        // Use-qualified-name fixes, one variant per candidate module.
        let rendered_args = self.render_args(argument_types);
        for imp in &impls {
            let module = self.render_module(imp);
            let confidence = self.learned_confidence(ErrorCode::S1101, "qualify-call", 0.7);
            diagnostic = diagnostic.with_fix(
                FixSuggestion::new(
                    "qualify-call",
                    format!("use the qualified name `{module}::{name}({rendered_args})`"),
                    confidence,
                )
                .with_edit(TextEdit::insert(call_site.span.start, format!("{module}::")))
                .with_applicability(Applicability::MaybeIncorrect),
            );
        }

        diagnostic
    }

    fn explain_no_match(
        &self,
        rejected: &[(ImplId, Rejection)],
        argument_types: &[TypeId],
        call_site: &CallSite,
    ) -> Diagnostic {
        if rejected.is_empty() {
            return self.explain_unknown_name(argument_types, call_site);
        }

        let name = self.interner.lookup(call_site.function_name);
        let impls: Vec<&Implementation> = rejected
            .iter()
            .filter_map(|(id, _)| self.pool.get(*id))
            .collect();

        let all_arity = rejected
            .iter()
            .all(|(_, rejection)| matches!(rejection, Rejection::WrongArity { .. }));

        let code = if all_arity {
            ErrorCode::S1104
        } else {
            ErrorCode::S1102
        };

        let mut hypotheses = vec![Hypothesis::new(
            HypothesisKind::TypeMismatch,
            1.0,
            "no candidate accepts these argument types".to_string(),
        )];

        // Near miss: a candidate failing on exactly one argument suggests a
        // missing conversion at that position.
        let near_miss = impls.iter().find(|imp| {
            imp.arity() == argument_types.len()
                && mismatch_count(self.registry, imp, argument_types) == 1
        });
        if let Some(imp) = near_miss {
            hypotheses.push(Hypothesis::new(
                HypothesisKind::MissingConversion,
                2.0,
                format!(
                    "`{}` would match if one argument were converted",
                    self.render_impl(imp)
                ),
            ));
        }

        // Argument order: some permutation of the arguments admits a
        // candidate that the given order does not.
        let reorder_target = impls.iter().find(|imp| {
            imp.arity() == argument_types.len()
                && !admits(self.registry, imp, argument_types)
                && permutation_admits(self.registry, imp, argument_types)
        });
        if let Some(imp) = reorder_target {
            hypotheses.push(Hypothesis::new(
                HypothesisKind::WrongArgumentOrder,
                2.5,
                format!(
                    "the arguments match `{}` in a different order",
                    self.render_impl(imp)
                ),
            ));
        }

        let mut diagnostic = Diagnostic::error(code)
            .with_file(call_site.file)
            .with_message(match code {
                ErrorCode::S1104 => format!(
                    "no implementation of `{name}` takes {} argument(s)",
                    argument_types.len()
                ),
                _ => format!(
                    "no implementation of `{name}` matches `({})`",
                    self.render_args(argument_types)
                ),
            })
            .with_explanation(self.render_rejections(rejected))
            .with_label(call_site.span, "no matching implementation for this call")
            .with_hypotheses(rank_hypotheses(hypotheses))
            .with_machine_data(self.machine_data(code, &impls, argument_types, call_site));

        for imp in &impls {
            diagnostic = diagnostic.with_label(imp.span, "candidate declared here");
        }

        if let Some(imp) = near_miss {
            let confidence = self.learned_confidence(code, "insert-cast", 0.5);
            diagnostic = diagnostic.with_fix(
                FixSuggestion::new(
                    "insert-cast",
                    format!("convert the mismatched argument to match `{}`", self.render_impl(imp)),
                    confidence,
                )
                .with_applicability(Applicability::HasPlaceholders),
            );
        }
        if reorder_target.is_some() {
            let confidence = self.learned_confidence(code, "reorder-arguments", 0.6);
            diagnostic = diagnostic.with_fix(
                FixSuggestion::new("reorder-arguments", "swap the arguments", confidence)
                    .with_applicability(Applicability::MaybeIncorrect),
            );
        }

        diagnostic
    }

    fn explain_unknown_name(
        &self,
        argument_types: &[TypeId],
        call_site: &CallSite,
    ) -> Diagnostic {
        let name = self.interner.lookup(call_site.function_name);

        // Every simple name with at least one pooled implementation is a
        // rename candidate.
        let mut visible: Vec<String> = self
            .pool
            .iter()
            .map(|imp| self.interner.lookup(imp.function.simple_name))
            .collect();
        visible.sort();
        visible.dedup();

        let closest =
            jade_diagnostic::closest_match(&name, visible.iter().map(String::as_str))
                .map(|(candidate, distance)| (candidate.to_string(), distance));

        let mut hypotheses = vec![Hypothesis::new(
            HypothesisKind::ScopeError,
            1.0,
            format!("`{name}` is not bound in this scope"),
        )];
        if let Some((candidate, distance)) = &closest {
            hypotheses.push(Hypothesis::new(
                HypothesisKind::Typo,
                3.0 / (*distance as f64).max(1.0),
                format!("`{candidate}` is visible and differs by {distance} edit(s)"),
            ));
        }
        // An export under this exact name in another module points at a
        // missing import rather than a typo.
        let exporter = self.modules.exporter_of(call_site.function_name);
        if let Some(module_name) = exporter.map(|id| self.render_module_id(id)) {
            hypotheses.push(Hypothesis::new(
                HypothesisKind::WrongImport,
                2.0,
                format!("module `{module_name}` exports `{name}`"),
            ));
        }

        let mut diagnostic = Diagnostic::error(ErrorCode::S1105)
            .with_file(call_site.file)
            .with_message(format!("unknown function `{name}`"))
            .with_explanation(
                "the name is neither declared in this module nor imported into it".to_string(),
            )
            .with_label(call_site.span, "not found in this scope")
            .with_hypotheses(rank_hypotheses(hypotheses))
            .with_machine_data(self.machine_data(
                ErrorCode::S1105,
                &[],
                argument_types,
                call_site,
            ));

        if let Some((candidate, _)) = &closest {
            let confidence = self.learned_confidence(ErrorCode::S1105, "rename-call", 0.7);
            let name_len = u32::try_from(name.len()).unwrap_or(0);
            let name_span = Span::new(call_site.span.start, call_site.span.start + name_len);
            diagnostic = diagnostic.with_fix(
                FixSuggestion::new("rename-call", format!("did you mean `{candidate}`?"), confidence)
                    .with_edit(TextEdit::replace(name_span, candidate.clone()))
                    .with_applicability(Applicability::MaybeIncorrect),
            );
        }
        if let Some(module_id) = exporter {
            let module_name = self.render_module_id(module_id);
            let confidence = self.learned_confidence(ErrorCode::S1105, "insert-import", 0.6);
            diagnostic = diagnostic.with_fix(
                FixSuggestion::new(
                    "insert-import",
                    format!("import `{name}` from `{module_name}`"),
                    confidence,
                )
                .with_edit(TextEdit::insert(0, format!("import {module_name}::{name}\n")))
                .with_applicability(Applicability::MaybeIncorrect),
            );
        }

        diagnostic
    }

    /// Diagnostic for a duplicate-implementation registration error.
    pub fn explain_signature_error(&self, error: &SignatureError, span: Span) -> Diagnostic {
        match error {
            SignatureError::DuplicateImplementation { function, .. } => {
                let name = self.interner.lookup(function.simple_name);
                Diagnostic::error(ErrorCode::S1205)
                    .with_message(format!(
                        "`{name}` is already implemented for this parameter tuple"
                    ))
                    .with_label(span, "duplicate implementation")
            }
            SignatureError::UnknownType { decl_name, ty } => {
                let name = self.interner.lookup(*decl_name);
                Diagnostic::error(ErrorCode::S1901)
                    .with_message(format!("declaration `{name}` references unknown type {ty}"))
                    .with_label(span, "in this declaration")
            }
        }
    }

    /// Diagnostic for an export/import registration error.
    pub fn explain_module_error(&self, error: &ModuleError, span: Span) -> Diagnostic {
        match error {
            ModuleError::DuplicateExport { module, name } => {
                let name = self.interner.lookup(*name);
                let module = self.render_module_id(*module);
                Diagnostic::error(ErrorCode::S1202)
                    .with_message(format!("`{module}` already exports `{name}`"))
                    .with_label(span, "second export here")
            }
            ModuleError::SignatureNotExported { module, name } => {
                let name = self.interner.lookup(*name);
                let module = self.render_module_id(*module);
                Diagnostic::error(ErrorCode::S1203)
                    .with_message(format!("`{module}` does not export `{name}`"))
                    .with_label(span, "imported here")
            }
            ModuleError::VisibilityViolation { module, name } => {
                let name = self.interner.lookup(*name);
                let module = self.render_module_id(*module);
                Diagnostic::error(ErrorCode::S1204)
                    .with_message(format!("`{name}` in `{module}` is module-internal"))
                    .with_label(span, "cannot be imported here")
            }
            other => Diagnostic::error(ErrorCode::S1901)
                .with_message(other.to_string())
                .with_label(span, "while processing this statement"),
        }
    }

    fn machine_data(
        &self,
        code: ErrorCode,
        impls: &[&Implementation],
        argument_types: &[TypeId],
        call_site: &CallSite,
    ) -> MachineData {
        let candidates = impls
            .iter()
            .map(|imp| CandidateInfo {
                rendered: self.render_impl(imp),
                module: self.render_module(imp),
                conversion_costs: argument_types
                    .iter()
                    .zip(&imp.param_types)
                    .map(|(&arg, &param)| self.registry.specificity_distance(arg, param))
                    .collect(),
            })
            .collect();

        let mut affected_symbols = vec![self.interner.lookup(call_site.function_name)];
        for imp in impls {
            affected_symbols.push(self.render_module(imp));
        }
        affected_symbols.sort();
        affected_symbols.dedup();

        MachineData {
            error_category: code.category().to_string(),
            affected_symbols,
            scope_context: Some(self.render_module_id(call_site.scope_module)),
            argument_types: argument_types
                .iter()
                .map(|&ty| self.render_type(ty))
                .collect(),
            candidates,
        }
    }

    fn learned_confidence(&self, code: ErrorCode, fix_id: &str, base: f64) -> f64 {
        match self.learning.acceptance_rate(code.as_str(), fix_id) {
            Some(rate) => (base * 0.5 + rate * 0.5).clamp(0.0, 1.0),
            None => base,
        }
    }

    fn render_type(&self, ty: TypeId) -> String {
        match self.registry.type_info(ty) {
            Some(info) => {
                let rendered = self.interner.lookup(info.name);
                if rendered.is_empty() {
                    ty.to_string()
                } else {
                    rendered
                }
            }
            None => ty.to_string(),
        }
    }

    fn render_args(&self, argument_types: &[TypeId]) -> String {
        argument_types
            .iter()
            .map(|&ty| self.render_type(ty))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn render_impl(&self, imp: &Implementation) -> String {
        let name = self.interner.lookup(imp.function.simple_name);
        let params = self.render_args(&imp.param_types);
        let ret = self.render_type(imp.return_type);
        format!("{name}({params}) -> {ret}")
    }

    fn render_module(&self, imp: &Implementation) -> String {
        self.render_module_id(imp.function.module)
    }

    fn render_module_id(&self, id: jade_ir::ModuleId) -> String {
        self.modules
            .module(id)
            .map(|info| self.interner.lookup(info.name))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("{id:?}"))
    }

    fn render_rejections(&self, rejected: &[(ImplId, Rejection)]) -> String {
        let mut lines = Vec::with_capacity(rejected.len());
        for (id, rejection) in rejected {
            let Some(imp) = self.pool.get(*id) else {
                continue;
            };
            let rendered = self.render_impl(imp);
            let reason = match rejection {
                Rejection::WrongArity { expected, actual } => {
                    format!("takes {expected} argument(s), {actual} given")
                }
                Rejection::TypeMismatchAt {
                    index,
                    expected,
                    actual,
                } => format!(
                    "argument {index} is `{}`, expected `{}`",
                    self.render_type(*actual),
                    self.render_type(*expected)
                ),
            };
            lines.push(format!("candidate `{rendered}` rejected: {reason}"));
        }
        lines.join("\n")
    }
}

fn admits(registry: &TypeRegistry, imp: &Implementation, args: &[TypeId]) -> bool {
    imp.arity() == args.len()
        && args
            .iter()
            .zip(&imp.param_types)
            .all(|(&arg, &param)| registry.is_subtype(arg, param))
}

fn mismatch_count(registry: &TypeRegistry, imp: &Implementation, args: &[TypeId]) -> usize {
    args.iter()
        .zip(&imp.param_types)
        .filter(|(&arg, &param)| !registry.is_subtype(arg, param))
        .count()
}

/// Whether any permutation of `args` admits `imp`.
///
/// Exhaustive backtracking over argument assignments. Greedy matching is
/// not enough here: with `Int ≤ Number` and parameters `(Number, Int)`,
/// arguments `(Int, Number)` admit only if `Number` is held back for the
/// first parameter. Arity is small, so the search is cheap and exact.
fn permutation_admits(registry: &TypeRegistry, imp: &Implementation, args: &[TypeId]) -> bool {
    if imp.arity() != args.len() {
        return false;
    }
    let mut used = vec![false; args.len()];
    assign_arguments(registry, &imp.param_types, args, &mut used, 0)
}

/// Try every unused argument for the parameter at `index`, backtracking
/// on failure.
fn assign_arguments(
    registry: &TypeRegistry,
    params: &[TypeId],
    args: &[TypeId],
    used: &mut [bool],
    index: usize,
) -> bool {
    let Some(&param) = params.get(index) else {
        return true;
    };
    for (slot, &arg) in args.iter().enumerate() {
        if used[slot] || !registry.is_subtype(arg, param) {
            continue;
        }
        used[slot] = true;
        if assign_arguments(registry, params, args, used, index + 1) {
            return true;
        }
        used[slot] = false;
    }
    false
}
