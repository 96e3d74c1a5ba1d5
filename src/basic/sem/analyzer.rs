//! # Semantic analyzer
//!
//! Walks a parsed [`Program`] and annotates/validates it against the rule
//! table of spec.md §4.3: variable resolution with suffix-driven default
//! typing, expression and assignment typing, control-flow checks, and the
//! SELECT CASE overlap-detection algorithm. Diagnostics accumulate in the
//! shared [`DiagnosticEmitter`]; analysis never stops early on a single
//! procedure's errors; a later procedure still gets analyzed with a fresh
//! scope.

use std::collections::HashMap;

use crate::basic::ast::*;
use crate::basic::sem::scope::{AnalysisState, ErrorHandlerState, ScopeTracker};
use crate::basic::sem::types::{common_numeric_type, SemType};
use crate::basic::token::Builtin;
use crate::diag::DiagnosticEmitter;
use crate::source::{SourceLoc, SourceSpan};

pub struct SemanticAnalyzer<'d> {
    diags: &'d mut DiagnosticEmitter,
    scopes: ScopeTracker,
    state: AnalysisState,
    loop_depth: usize,
    for_depth: usize,
    /// Names of the active FOR-loop iterator variables, innermost last;
    /// mutating the top one inside its own body emits B1010.
    for_vars: Vec<String>,
    /// Name -> (is_function, param types, return type), gathered in a first
    /// pass so forward calls resolve regardless of declaration order.
    procs: HashMap<String, ProcSignature>,
    current_proc_is_function: bool,
    current_proc_returns: bool,
    /// Expression location -> type lowering should cast it to (spec.md §3
    /// "Implicit conversion map"). Populated at every Int/Float promotion
    /// site spec.md §4.3 names: Sub/Mul operand promotion and Int-LHS /
    /// Float-RHS assignment narrowing. There is no expression-node identity
    /// in this tree cheaper than its source location, so the location (which
    /// is unique per syntactic occurrence) stands in for "expression address".
    implicit_conversions: HashMap<SourceLoc, SemType>,
}

#[derive(Debug, Clone)]
struct ProcSignature {
    is_function: bool,
    params: Vec<Param>,
    return_type: SemType,
}

impl<'d> SemanticAnalyzer<'d> {
    pub fn new(diags: &'d mut DiagnosticEmitter) -> Self {
        Self {
            diags,
            scopes: ScopeTracker::new(),
            state: AnalysisState::new(),
            loop_depth: 0,
            for_depth: 0,
            for_vars: Vec::new(),
            procs: HashMap::new(),
            current_proc_is_function: false,
            current_proc_returns: false,
            implicit_conversions: HashMap::new(),
        }
    }

    /// The implicit-conversion side table accumulated so far: expression
    /// location -> the type lowering should cast that expression to
    /// (spec.md §3, §4.3, §9).
    pub fn implicit_conversions(&self) -> &HashMap<SourceLoc, SemType> {
        &self.implicit_conversions
    }

    /// Runs the full phase-ordered analysis: register procedure signatures,
    /// analyze each procedure body under its own scope, then analyze the
    /// main sequence (spec.md §4.3 "Analysis order").
    pub fn analyze(&mut self, program: &Program) {
        for proc in &program.procs {
            let return_type = if proc.is_function {
                self.resolve_type_name(&proc.return_type).unwrap_or_else(|| SemType::from_suffix(&proc.name))
            } else {
                SemType::Unknown
            };
            self.procs.insert(
                proc.name.clone(),
                ProcSignature { is_function: proc.is_function, params: proc.params.clone(), return_type },
            );
        }

        for proc in &program.procs {
            self.analyze_proc(proc);
        }

        self.register_labels(&program.main);
        for labeled in &program.main {
            self.analyze_stmt(&labeled.stmt);
        }
    }

    fn resolve_type_name(&self, name: &str) -> Option<SemType> {
        match name.to_ascii_uppercase().as_str() {
            "INTEGER" | "LONG" => Some(SemType::Int),
            "SINGLE" | "DOUBLE" => Some(SemType::Float),
            "STRING" => Some(SemType::String),
            "BOOLEAN" => Some(SemType::Bool),
            "" => None,
            _ => None,
        }
    }

    fn register_labels(&mut self, stmts: &[LabeledStmt]) {
        for labeled in stmts {
            if let Some(n) = labeled.numeric_label {
                self.state.labels.insert(n.to_string());
            }
            if let Some(name) = &labeled.named_label {
                self.state.labels.insert(name.clone());
            }
        }
    }

    fn analyze_proc(&mut self, proc: &ProcDecl) {
        let snapshot = self.state.snapshot(self.loop_depth, self.for_depth);
        let saved_for_vars = std::mem::take(&mut self.for_vars);
        self.scopes.push();
        self.current_proc_is_function = proc.is_function;
        self.current_proc_returns = false;

        for param in &proc.params {
            let ty = param
                .ty
                .as_deref()
                .and_then(|t| self.resolve_type_name(t))
                .unwrap_or_else(|| SemType::from_suffix(&param.name));
            self.scopes.bind(&param.name, &param.name);
            self.state.symbols.insert(param.name.clone());
            self.state.var_types.insert(param.name.clone(), if param.is_array { SemType::ArrayInt } else { ty });
            if param.is_array {
                self.state.arrays.insert(param.name.clone(), -1);
            }
        }

        for stmt in &proc.body {
            self.analyze_stmt(stmt);
        }

        if proc.is_function && !self.current_proc_returns {
            self.diags.warning(
                "B1007",
                format!("FUNCTION '{}' has a path with no RETURN", proc.name),
                SourceSpan::point(proc.loc),
            );
        }

        self.scopes.pop();
        let (loop_depth, for_depth) = snapshot.restore(&mut self.state);
        self.loop_depth = loop_depth;
        self.for_depth = for_depth;
        self.for_vars = saved_for_vars;
    }

    // ---- statements ----------------------------------------------------

    fn analyze_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Let { target, expr, loc } => self.analyze_assignment(target, expr, *loc),
            Stmt::Dim { name, size, ty, loc } => {
                if let Some(size_expr) = size {
                    self.analyze_expr(size_expr);
                    if let Some(n) = Self::literal_int(size_expr) {
                        if n < 0 {
                            self.diags.error("B2003", format!("array '{name}' has negative size {n}"), SourceSpan::point(*loc));
                        }
                    }
                    self.state.arrays.insert(name.clone(), Self::literal_int(size_expr).unwrap_or(-1));
                    self.state.var_types.insert(name.clone(), SemType::ArrayInt);
                } else {
                    let declared = ty.as_deref().and_then(|t| self.resolve_type_name(t));
                    self.state.var_types.insert(name.clone(), declared.unwrap_or_else(|| SemType::from_suffix(name)));
                }
                self.scopes.bind(name, name);
                self.state.symbols.insert(name.clone());
            }
            Stmt::Redim { name, size, loc } => {
                self.analyze_expr(size);
                if !self.state.arrays.contains_key(name) {
                    self.diags.error("B1001", format!("REDIM of undeclared array '{name}'"), SourceSpan::point(*loc));
                }
                if let Some(n) = Self::literal_int(size) {
                    if n < 0 {
                        self.diags.error("B2003", format!("array '{name}' has negative size {n}"), SourceSpan::point(*loc));
                    }
                }
                self.state.arrays.insert(name.clone(), Self::literal_int(size).unwrap_or(-1));
            }
            Stmt::Const { name, expr, .. } => {
                let ty = self.analyze_expr(expr);
                self.scopes.bind(name, name);
                self.state.symbols.insert(name.clone());
                self.state.var_types.insert(name.clone(), ty);
            }
            Stmt::StaticDecl { name, .. } | Stmt::SharedDecl { name, .. } => {
                self.scopes.bind(name, name);
                self.state.symbols.insert(name.clone());
            }

            Stmt::Print { items, channel, .. } => {
                if let Some(c) = channel {
                    self.analyze_expr(c);
                }
                for item in items {
                    self.analyze_expr(&item.expr);
                }
            }
            Stmt::WriteChannel { channel, items, .. } => {
                self.analyze_expr(channel);
                for item in items {
                    self.analyze_expr(&item.expr);
                }
            }
            Stmt::Open { path, channel, loc, .. } => {
                self.analyze_expr(path);
                self.analyze_expr(channel);
                if let Some(n) = Self::literal_int(channel) {
                    if self.state.open_channels.contains(&n) {
                        self.diags.warning("B3002", format!("channel #{n} is already open"), SourceSpan::point(*loc));
                    }
                    self.state.open_channels.insert(n);
                }
            }
            Stmt::Close { channel, .. } => {
                if let Some(c) = channel {
                    self.analyze_expr(c);
                    if let Some(n) = Self::literal_int(c) {
                        self.state.open_channels.remove(&n);
                    }
                } else {
                    self.state.open_channels.clear();
                }
            }
            Stmt::Seek { channel, position, .. } => {
                self.analyze_expr(channel);
                self.analyze_expr(position);
            }
            Stmt::Input { targets, channel, .. } => {
                if let Some(c) = channel {
                    self.analyze_expr(c);
                }
                for t in targets {
                    self.analyze_expr(t);
                }
            }
            Stmt::LineInputChannel { channel, target, .. } => {
                self.analyze_expr(channel);
                self.analyze_expr(target);
            }

            Stmt::If { cond, then_branch, else_ifs, else_branch, .. } => {
                self.analyze_condition(cond);
                for s in then_branch {
                    self.analyze_stmt(s);
                }
                for (c, body) in else_ifs {
                    self.analyze_condition(c);
                    for s in body {
                        self.analyze_stmt(s);
                    }
                }
                if let Some(body) = else_branch {
                    for s in body {
                        self.analyze_stmt(s);
                    }
                }
            }
            Stmt::SelectCase { selector, arms, else_body, loc } => {
                self.analyze_select_case(selector, arms, else_body.as_deref(), *loc);
            }

            Stmt::While { cond, body, .. } => {
                self.analyze_condition(cond);
                self.loop_depth += 1;
                for s in body {
                    self.analyze_stmt(s);
                }
                self.loop_depth -= 1;
            }
            Stmt::Do { pre_cond, body, post_cond, .. } => {
                if let Some(c) = pre_cond {
                    self.analyze_condition(c);
                }
                self.loop_depth += 1;
                for s in body {
                    self.analyze_stmt(s);
                }
                self.loop_depth -= 1;
                if let Some(c) = post_cond {
                    self.analyze_condition(c);
                }
            }
            Stmt::For { var, start, end, step, body, next_var, loc } => {
                self.analyze_expr(start);
                self.analyze_expr(end);
                if let Some(s) = step {
                    self.analyze_expr(s);
                }
                if !self.state.symbols.contains(var) {
                    self.state.symbols.insert(var.clone());
                    self.state.var_types.insert(var.clone(), SemType::from_suffix(var));
                }
                if let Some(next_name) = next_var {
                    if next_name != var {
                        self.diags.error(
                            "B1002",
                            format!("NEXT {next_name} does not match FOR {var}"),
                            SourceSpan::point(*loc),
                        );
                    }
                }
                self.loop_depth += 1;
                self.for_depth += 1;
                self.for_vars.push(var.clone());
                for s in body {
                    self.analyze_stmt(s);
                }
                self.for_vars.pop();
                self.for_depth -= 1;
                self.loop_depth -= 1;
            }
            Stmt::Next { loc } => {
                if self.for_depth == 0 {
                    self.diags.error("B1002", "NEXT without matching FOR", SourceSpan::point(*loc));
                }
            }
            Stmt::Exit { kind, loc } => {
                let ok = match kind {
                    LoopKind::For => self.for_depth > 0,
                    LoopKind::While | LoopKind::Do => self.loop_depth > 0,
                };
                if !ok {
                    self.diags.error("B1011", "EXIT used outside of the matching loop", SourceSpan::point(*loc));
                }
            }

            Stmt::Goto { target, loc } => self.check_label_ref(target, *loc),
            Stmt::Gosub { target, loc } => self.check_label_ref(target, *loc),
            Stmt::Return { expr, loc, .. } => {
                if let Some(e) = expr {
                    self.analyze_expr(e);
                    if !self.current_proc_is_function {
                        self.diags.error("B1008", "RETURN with a value outside of a FUNCTION", SourceSpan::point(*loc));
                    }
                }
                if self.current_proc_is_function {
                    self.current_proc_returns = true;
                }
            }

            Stmt::OnErrorGoto { target, loc } => {
                match target {
                    Some(t) => {
                        self.check_label_ref(t, *loc);
                        self.state.error_handler = ErrorHandlerState { active: true, target: Some(t.clone()) };
                    }
                    None => self.state.error_handler = ErrorHandlerState::default(),
                }
            }
            Stmt::Resume { mode, label, loc } => {
                if !self.state.error_handler.active {
                    self.diags.error("B1012", "RESUME with no active error handler", SourceSpan::point(*loc));
                }
                if *mode == ResumeMode::Label {
                    if let Some(l) = label {
                        self.check_label_ref(l, *loc);
                    }
                }
            }

            Stmt::End { .. } | Stmt::Cls { .. } => {}
            Stmt::Randomize { seed, .. } => {
                if let Some(s) = seed {
                    self.analyze_expr(s);
                }
            }
            Stmt::Color { fg, bg, .. } => {
                self.analyze_expr(fg);
                if let Some(b) = bg {
                    self.analyze_expr(b);
                }
            }
            Stmt::Locate { row, col, .. } => {
                self.analyze_expr(row);
                self.analyze_expr(col);
            }
            Stmt::Cursor { visible, .. } => {
                self.analyze_expr(visible);
            }
            Stmt::AltScreen { enabled, .. } => {
                self.analyze_expr(enabled);
            }
            Stmt::Sleep { millis, .. } => {
                self.analyze_expr(millis);
            }

            Stmt::Call { callee, args, loc } => self.analyze_call(callee, args, *loc),
            Stmt::ExprStmt { expr, .. } => {
                self.analyze_expr(expr);
            }

            Stmt::Try { body, catch_body, .. } => {
                for s in body {
                    self.analyze_stmt(s);
                }
                for s in catch_body {
                    self.analyze_stmt(s);
                }
            }

            Stmt::ClassDecl { members, .. } => {
                for m in members {
                    self.analyze_stmt(m);
                }
            }
            // `analyzeInterfaceDecl`-equivalent: recorded at parse time, no
            // structural validation beyond that (spec.md §9).
            Stmt::InterfaceDecl { .. } => {}
            Stmt::NamespaceDecl { body, .. } => {
                for s in body {
                    self.analyze_stmt(s);
                }
            }
            Stmt::UsingDecl { .. } => {}

            Stmt::ProcDecl(_) => {}
            Stmt::List { stmts, .. } => {
                for s in stmts {
                    self.analyze_stmt(s);
                }
            }
        }
    }

    fn check_label_ref(&mut self, target: &str, loc: crate::source::SourceLoc) {
        self.state.label_refs.insert(target.to_string());
        if !self.state.labels.contains(target) {
            self.diags.error("B1003", format!("undefined label '{target}'"), SourceSpan::point(loc));
        }
    }

    fn analyze_condition(&mut self, expr: &Expr) -> SemType {
        let ty = self.analyze_expr(expr);
        if ty != SemType::Unknown && ty != SemType::Bool && !ty.is_numeric() {
            self.diags.warning(
                "B2201",
                format!("condition has non-boolean type {ty}"),
                SourceSpan::point(expr.loc()),
            );
        }
        ty
    }

    fn analyze_assignment(&mut self, target: &Expr, expr: &Expr, loc: crate::source::SourceLoc) {
        let rhs_ty = self.analyze_expr(expr);
        match target {
            Expr::Var(name, _) => {
                if self.for_vars.iter().any(|v| v == name) {
                    self.diags.error("B1010", format!("'{name}' is the active FOR loop variable and cannot be assigned to inside the loop"), SourceSpan::point(loc));
                }
                let declared = self.state.var_types.get(name).copied();
                self.state.symbols.insert(name.clone());
                match declared {
                    Some(lhs_ty) if lhs_ty != SemType::Unknown && rhs_ty != SemType::Unknown && lhs_ty != rhs_ty => {
                        if lhs_ty.is_numeric() && rhs_ty.is_numeric() {
                            if lhs_ty == SemType::Int && rhs_ty == SemType::Float {
                                self.implicit_conversions.insert(expr.loc(), SemType::Int);
                                self.diags.warning(
                                    "B2002",
                                    format!("narrowing conversion assigning Float to Int variable '{name}'"),
                                    SourceSpan::point(loc),
                                );
                            }
                        } else {
                            self.diags.error(
                                "B2001",
                                format!("cannot assign {rhs_ty} to '{name}' of type {lhs_ty}"),
                                SourceSpan::point(loc),
                            );
                        }
                    }
                    None => {
                        self.scopes.bind(name, name);
                        self.state.var_types.insert(name.clone(), if rhs_ty == SemType::Unknown { SemType::from_suffix(name) } else { rhs_ty });
                    }
                    _ => {}
                }
            }
            Expr::ArrayElem { name, index, loc: aloc } => {
                if !self.state.arrays.contains_key(name) {
                    self.diags.error("B1001", format!("'{name}' is not a declared array"), SourceSpan::point(*aloc));
                }
                self.analyze_expr(index);
                if let (Some(bound), Some(idx)) = (self.state.arrays.get(name).copied(), Self::literal_int(index)) {
                    if bound >= 0 && (idx < 0 || idx > bound) {
                        self.diags.warning(
                            "B3001",
                            format!("index {idx} out of declared bounds [0, {bound}] for array '{name}'"),
                            SourceSpan::point(*aloc),
                        );
                    }
                }
            }
            Expr::Member { .. } => {
                self.analyze_expr(target);
            }
            other => {
                self.diags.error("B2007", "left-hand side of assignment is not assignable", SourceSpan::point(other.loc()));
            }
        }
    }

    fn analyze_select_case(&mut self, selector: &Expr, arms: &[CaseArm], else_body: Option<&[Stmt]>, loc: crate::source::SourceLoc) {
        let selector_ty = self.analyze_expr(selector);

        if selector_ty == SemType::Unknown {
            // best-effort: the selector expression already carries an error.
        } else if selector_ty != SemType::Int && selector_ty != SemType::String {
            self.diags.error(
                "ERR_SelectCase_NonIntegerSelector",
                "SELECT CASE selector must be an integer or string expression",
                SourceSpan::point(loc),
            );
            return;
        }

        let mut seen_ranges: Vec<(i64, i64)> = Vec::new();
        let mut seen_labels: Vec<i64> = Vec::new();
        let mut seen_relational: Vec<Interval> = Vec::new();
        let mut seen_string_labels: Vec<String> = Vec::new();
        let mut reported_mixed = false;

        for arm in arms {
            let arm_has_numeric = !arm.labels.is_empty() || !arm.ranges.is_empty() || !arm.relational.is_empty();
            let arm_has_string = !arm.string_labels.is_empty();

            if arm_has_numeric && arm_has_string && !reported_mixed {
                self.diags.error(
                    "ERR_SelectCase_MixedLabelTypes",
                    "CASE arm mixes numeric and string labels",
                    SourceSpan::point(arm.loc),
                );
                reported_mixed = true;
            } else if arm_has_numeric && !seen_string_labels.is_empty() && !reported_mixed {
                self.diags.error(
                    "ERR_SelectCase_MixedLabelTypes",
                    "SELECT CASE mixes numeric and string CASE labels across arms",
                    SourceSpan::point(arm.loc),
                );
                reported_mixed = true;
            } else if arm_has_string && (!seen_labels.is_empty() || !seen_ranges.is_empty() || !seen_relational.is_empty()) && !reported_mixed {
                self.diags.error(
                    "ERR_SelectCase_MixedLabelTypes",
                    "SELECT CASE mixes numeric and string CASE labels across arms",
                    SourceSpan::point(arm.loc),
                );
                reported_mixed = true;
            }

            if arm_has_numeric && selector_ty == SemType::String {
                self.diags.error(
                    "ERR_SelectCase_StringSelectorLabels",
                    "string SELECT CASE selector compared against numeric CASE labels",
                    SourceSpan::point(arm.loc),
                );
            }
            if arm_has_string && selector_ty == SemType::Int {
                self.diags.error(
                    "ERR_SelectCase_StringLabelSelector",
                    "integer SELECT CASE selector compared against string CASE labels",
                    SourceSpan::point(arm.loc),
                );
            }

            for &(lo, hi) in &arm.ranges {
                if lo > hi {
                    self.diags.error("ERR_SelectCase_InvalidRange", format!("CASE {lo} TO {hi} has lo > hi"), SourceSpan::point(arm.loc));
                    continue;
                }
                if !Self::in_label_range(lo) || !Self::in_label_range(hi) {
                    self.diags.error("ERR_SelectCase_LabelOutOfRange", format!("CASE {lo} TO {hi} exceeds the 32-bit label range"), SourceSpan::point(arm.loc));
                    continue;
                }
                let iv = Interval { has_lo: true, lo, has_hi: true, hi };
                if Self::collides(&iv, &seen_ranges, &seen_labels, &seen_relational) {
                    self.diags.error("ERR_SelectCase_OverlappingRange", format!("CASE {lo} TO {hi} overlaps a previous label"), SourceSpan::point(arm.loc));
                } else {
                    seen_ranges.push((lo, hi));
                }
            }

            for &label in &arm.labels {
                if !Self::in_label_range(label) {
                    self.diags.error("ERR_SelectCase_LabelOutOfRange", format!("CASE label {label} exceeds the 32-bit label range"), SourceSpan::point(arm.loc));
                    continue;
                }
                if seen_labels.contains(&label) {
                    self.diags.error("ERR_SelectCase_DuplicateLabel", format!("duplicate CASE label: {label}"), SourceSpan::point(arm.loc));
                    continue;
                }
                let iv = Interval { has_lo: true, lo: label, has_hi: true, hi: label };
                if Self::collides(&iv, &seen_ranges, &seen_labels, &seen_relational) {
                    self.diags.error("ERR_SelectCase_OverlappingRange", format!("duplicate CASE label: {label}"), SourceSpan::point(arm.loc));
                } else {
                    seen_labels.push(label);
                }
            }

            for &(op, rhs) in &arm.relational {
                let iv = Self::relational_interval(op, rhs);
                if op == BinOp::Eq {
                    if seen_labels.contains(&rhs) {
                        self.diags.error("ERR_SelectCase_DuplicateLabel", format!("duplicate CASE label: {rhs}"), SourceSpan::point(arm.loc));
                        continue;
                    }
                    if Self::collides(&iv, &seen_ranges, &seen_labels, &seen_relational) {
                        self.diags.error("ERR_SelectCase_OverlappingRange", "CASE IS = overlaps a previous label", SourceSpan::point(arm.loc));
                    } else {
                        seen_labels.push(rhs);
                    }
                    continue;
                }
                if Self::collides(&iv, &seen_ranges, &seen_labels, &seen_relational) {
                    self.diags.error("ERR_SelectCase_OverlappingRange", "CASE IS overlaps a previous label", SourceSpan::point(arm.loc));
                } else {
                    seen_relational.push(iv);
                }
            }

            for label in &arm.string_labels {
                if seen_string_labels.contains(label) {
                    self.diags.error("ERR_SelectCase_DuplicateLabel", format!("duplicate CASE label: \"{label}\""), SourceSpan::point(arm.loc));
                } else {
                    seen_string_labels.push(label.clone());
                }
            }

            for s in &arm.body {
                self.analyze_stmt(s);
            }
        }

        if let Some(body) = else_body {
            for s in body {
                self.analyze_stmt(s);
            }
        }
    }

    fn in_label_range(v: i64) -> bool {
        v >= i32::MIN as i64 && v <= i32::MAX as i64
    }

    fn relational_interval(op: BinOp, rhs: i64) -> Interval {
        match op {
            BinOp::Lt => Interval { has_lo: false, lo: 0, has_hi: true, hi: rhs - 1 },
            BinOp::Le => Interval { has_lo: false, lo: 0, has_hi: true, hi: rhs },
            BinOp::Eq => Interval { has_lo: true, lo: rhs, has_hi: true, hi: rhs },
            BinOp::Ge => Interval { has_lo: true, lo: rhs, has_hi: false, hi: 0 },
            BinOp::Gt => Interval { has_lo: true, lo: rhs + 1, has_hi: false, hi: 0 },
            _ => Interval { has_lo: true, lo: rhs, has_hi: true, hi: rhs },
        }
    }

    fn collides(iv: &Interval, ranges: &[(i64, i64)], labels: &[i64], relational: &[Interval]) -> bool {
        for &(lo, hi) in ranges {
            if Self::overlaps(iv, &Interval { has_lo: true, lo, has_hi: true, hi }) {
                return true;
            }
        }
        for &label in labels {
            if iv.contains(label) {
                return true;
            }
        }
        for other in relational {
            if Self::overlaps(iv, other) {
                return true;
            }
        }
        false
    }

    fn overlaps(a: &Interval, b: &Interval) -> bool {
        let lo = a.lo_or(i64::MIN).max(b.lo_or(i64::MIN));
        let hi = a.hi_or(i64::MAX).min(b.hi_or(i64::MAX));
        lo <= hi
    }

    // ---- expressions -----------------------------------------------------

    fn analyze_expr(&mut self, expr: &Expr) -> SemType {
        match expr {
            Expr::IntLit(..) => SemType::Int,
            Expr::FloatLit(..) => SemType::Float,
            Expr::BoolLit(..) => SemType::Bool,
            Expr::StringLit(..) => SemType::String,
            Expr::Var(name, loc) => self.resolve_var(name, *loc),
            Expr::ArrayElem { name, index, loc } => {
                self.analyze_expr(index);
                if !self.state.arrays.contains_key(name) {
                    self.diags.error("B1001", format!("'{name}' is not a declared array"), SourceSpan::point(*loc));
                    SemType::Unknown
                } else {
                    SemType::Int
                }
            }
            Expr::Unary { op, operand, loc } => {
                let ty = self.analyze_expr(operand);
                match op {
                    UnOp::Not => {
                        if ty != SemType::Unknown && ty != SemType::Bool {
                            self.diags.error(
                                "E1002",
                                format!("NOT requires a boolean operand, found {ty}"),
                                SourceSpan::point(*loc),
                            );
                        }
                        SemType::Bool
                    }
                    UnOp::Neg | UnOp::Pos => {
                        if ty != SemType::Unknown && !ty.is_numeric() {
                            self.diags.error("B2001", format!("unary operator requires a numeric operand, found {ty}"), SourceSpan::point(*loc));
                        }
                        ty
                    }
                }
            }
            Expr::Binary { op, lhs, rhs, loc } => self.analyze_binary(*op, lhs, rhs, *loc),
            Expr::BuiltinCall { tag, args, loc } => self.analyze_builtin_call(*tag, args, *loc),
            Expr::UserCall { callee, args, loc } => self.analyze_call_expr(callee, args, *loc),
            Expr::LBound { name, loc } | Expr::UBound { name, loc } => {
                if !self.state.arrays.contains_key(name) {
                    self.diags.error("B1001", format!("'{name}' is not a declared array"), SourceSpan::point(*loc));
                }
                SemType::Int
            }
            Expr::New { args, .. } => {
                for a in args {
                    self.analyze_expr(a);
                }
                SemType::Unknown
            }
            Expr::Me(_) => SemType::Unknown,
            Expr::Member { target, .. } => {
                self.analyze_expr(target);
                SemType::Unknown
            }
            Expr::MethodCall { target, args, .. } => {
                self.analyze_expr(target);
                for a in args {
                    self.analyze_expr(a);
                }
                SemType::Unknown
            }
        }
    }

    fn resolve_var(&mut self, name: &str, loc: crate::source::SourceLoc) -> SemType {
        let canonical = self.scopes.resolve(name);
        if let Some(ty) = self.state.var_types.get(&canonical).copied() {
            return ty;
        }
        if self.state.symbols.contains(&canonical) {
            return SemType::from_suffix(name);
        }
        let suggestion = self.suggest_name(name);
        let mut msg = format!("unknown variable '{name}'");
        if let Some(s) = suggestion {
            msg.push_str(&format!("; did you mean '{s}'?"));
        }
        self.diags.error("B1001", msg, SourceSpan::point(loc));
        SemType::Unknown
    }

    /// Levenshtein-nearest known symbol, strictly improving so the first
    /// encountered minimal-distance candidate wins ties.
    fn suggest_name(&self, name: &str) -> Option<String> {
        let mut best: Option<(usize, &str)> = None;
        for known in &self.state.symbols {
            let dist = levenshtein(name, known);
            if dist <= 2 {
                match best {
                    Some((best_dist, _)) if dist < best_dist => best = Some((dist, known)),
                    None => best = Some((dist, known)),
                    _ => {}
                }
            }
        }
        best.map(|(_, name)| name.to_string())
    }

    fn analyze_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr, loc: crate::source::SourceLoc) -> SemType {
        let lhs_ty = self.analyze_expr(lhs);
        let rhs_ty = self.analyze_expr(rhs);
        if lhs_ty == SemType::Unknown || rhs_ty == SemType::Unknown {
            return SemType::Unknown;
        }
        match op {
            BinOp::Add if lhs_ty == SemType::String && rhs_ty == SemType::String => SemType::String,
            BinOp::Add => {
                if lhs_ty.is_numeric() && rhs_ty.is_numeric() {
                    common_numeric_type(lhs_ty, rhs_ty)
                } else {
                    self.diags.error("B2001", format!("arithmetic operator requires numeric operands, found {lhs_ty} and {rhs_ty}"), SourceSpan::point(loc));
                    SemType::Unknown
                }
            }
            BinOp::Sub | BinOp::Mul => {
                if lhs_ty.is_numeric() && rhs_ty.is_numeric() {
                    if lhs_ty != rhs_ty {
                        // one side is Int, the other Float: the Int operand
                        // is promoted, and lowering needs to know which one.
                        if lhs_ty == SemType::Int {
                            self.implicit_conversions.insert(lhs.loc(), SemType::Float);
                        } else {
                            self.implicit_conversions.insert(rhs.loc(), SemType::Float);
                        }
                    }
                    common_numeric_type(lhs_ty, rhs_ty)
                } else {
                    self.diags.error("B2001", format!("arithmetic operator requires numeric operands, found {lhs_ty} and {rhs_ty}"), SourceSpan::point(loc));
                    SemType::Unknown
                }
            }
            BinOp::Div => {
                if lhs_ty.is_numeric() && rhs_ty.is_numeric() {
                    if Self::is_literal_zero(rhs) {
                        self.diags.error("B2002", "division by zero", SourceSpan::point(loc));
                    }
                    SemType::Float
                } else {
                    self.diags.error("B2001", format!("arithmetic operator requires numeric operands, found {lhs_ty} and {rhs_ty}"), SourceSpan::point(loc));
                    SemType::Unknown
                }
            }
            BinOp::IDiv | BinOp::Mod => {
                if lhs_ty.is_numeric() && rhs_ty.is_numeric() {
                    if Self::is_literal_zero(rhs) {
                        self.diags.error("B2002", "division by zero", SourceSpan::point(loc));
                    }
                    SemType::Int
                } else {
                    self.diags.error("B2001", format!("'{}' requires numeric operands, found {lhs_ty} and {rhs_ty}", if op == BinOp::IDiv { "\\" } else { "MOD" }), SourceSpan::point(loc));
                    SemType::Unknown
                }
            }
            BinOp::Pow => {
                if lhs_ty.is_numeric() && rhs_ty.is_numeric() {
                    SemType::Float
                } else {
                    self.diags.error("B2001", "'^' requires numeric operands", SourceSpan::point(loc));
                    SemType::Unknown
                }
            }
            BinOp::Eq | BinOp::Ne => {
                let both_numeric = lhs_ty.is_numeric() && rhs_ty.is_numeric();
                let both_string = lhs_ty == SemType::String && rhs_ty == SemType::String;
                if !both_numeric && !both_string {
                    self.diags.error("B2001", format!("'=' cannot compare {lhs_ty} and {rhs_ty}"), SourceSpan::point(loc));
                }
                SemType::Bool
            }
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let both_numeric = lhs_ty.is_numeric() && rhs_ty.is_numeric();
                let both_string = lhs_ty == SemType::String && rhs_ty == SemType::String;
                if !both_numeric && !both_string {
                    self.diags.error("B2001", format!("relational operator cannot compare {lhs_ty} and {rhs_ty}"), SourceSpan::point(loc));
                }
                SemType::Bool
            }
            BinOp::And | BinOp::Or | BinOp::AndAlso | BinOp::OrElse => {
                if lhs_ty != SemType::Bool || rhs_ty != SemType::Bool {
                    self.diags.error(
                        "E1002",
                        format!("logical operator requires boolean operands, found {lhs_ty} and {rhs_ty}"),
                        SourceSpan::point(loc),
                    );
                }
                SemType::Bool
            }
        }
    }

    fn analyze_builtin_call(&mut self, tag: Builtin, args: &[Expr], loc: crate::source::SourceLoc) -> SemType {
        for a in args {
            self.analyze_expr(a);
        }
        match tag {
            Builtin::Abs | Builtin::Sgn | Builtin::Int | Builtin::Fix | Builtin::Asc | Builtin::InStr | Builtin::Len => SemType::Int,
            Builtin::Sqr | Builtin::Rnd | Builtin::Sin | Builtin::Cos | Builtin::Tan | Builtin::Atn | Builtin::Log | Builtin::Exp => SemType::Float,
            Builtin::Mid | Builtin::Left | Builtin::Right | Builtin::Chr | Builtin::Str | Builtin::UCase | Builtin::LCase | Builtin::Trim | Builtin::Space => SemType::String,
            Builtin::Val => {
                let _ = loc;
                SemType::Float
            }
        }
    }

    fn analyze_call_expr(&mut self, callee: &str, args: &[Expr], loc: crate::source::SourceLoc) -> SemType {
        self.check_call_args(callee, args, loc);
        match self.procs.get(callee) {
            Some(sig) if sig.is_function => sig.return_type,
            Some(_) => {
                self.diags.error("B2005", format!("'{callee}' is a SUB and cannot be used in an expression"), SourceSpan::point(loc));
                SemType::Unknown
            }
            None => {
                self.diags.error("B1006", format!("call to undefined procedure '{callee}'"), SourceSpan::point(loc));
                SemType::Unknown
            }
        }
    }

    fn analyze_call(&mut self, callee: &str, args: &[Expr], loc: crate::source::SourceLoc) {
        self.check_call_args(callee, args, loc);
        if let Some(sig) = self.procs.get(callee) {
            if sig.is_function {
                self.diags.warning("B2015", format!("result of FUNCTION '{callee}' is discarded"), SourceSpan::point(loc));
            }
        } else {
            self.diags.error("B1006", format!("call to undefined procedure '{callee}'"), SourceSpan::point(loc));
        }
    }

    fn check_call_args(&mut self, callee: &str, args: &[Expr], loc: crate::source::SourceLoc) {
        let arg_types: Vec<SemType> = args.iter().map(|a| self.analyze_expr(a)).collect();
        let Some(sig) = self.procs.get(callee).cloned() else { return };
        if sig.params.len() != args.len() {
            self.diags.error(
                "B2008",
                format!("'{callee}' expects {} argument(s), found {}", sig.params.len(), args.len()),
                SourceSpan::point(loc),
            );
            return;
        }
        for (i, (param, arg_ty)) in sig.params.iter().zip(arg_types.iter()).enumerate() {
            if param.is_array && !matches!(args[i], Expr::Var(..)) {
                self.diags.error("B2006", format!("argument {} to '{callee}' must be an array variable", i + 1), SourceSpan::point(args[i].loc()));
                continue;
            }
            let expected = param.ty.as_deref().and_then(|t| self.resolve_type_name(t));
            if let Some(expected) = expected {
                if *arg_ty != SemType::Unknown && expected != SemType::Unknown && *arg_ty != expected && !(expected.is_numeric() && arg_ty.is_numeric()) {
                    self.diags.error(
                        "B2001",
                        format!("argument {} to '{callee}' has type {arg_ty}, expected {expected}", i + 1),
                        SourceSpan::point(args[i].loc()),
                    );
                }
            }
        }
    }

    fn literal_int(expr: &Expr) -> Option<i64> {
        match expr {
            Expr::IntLit(n, _) => Some(*n),
            Expr::Unary { op: UnOp::Neg, operand, .. } => Self::literal_int(operand).map(|n| -n),
            _ => None,
        }
    }

    /// `true` for a literal `0` (integer or float, through unary +/-), the
    /// case spec.md §4.3 names for the Div/IDiv/Mod "literal-zero RHS"
    /// divide-by-zero check. Non-literal zero-valued expressions (e.g. a
    /// variable that happens to hold 0) are a runtime concern, not a static
    /// diagnostic (spec.md §1 Non-goals: "no optimization passes" implies no
    /// constant-folding through variables here).
    fn is_literal_zero(expr: &Expr) -> bool {
        match expr {
            Expr::IntLit(0, _) => true,
            Expr::FloatLit(f, _) => *f == 0.0,
            Expr::Unary { op: UnOp::Neg | UnOp::Pos, operand, .. } => Self::is_literal_zero(operand),
            _ => false,
        }
    }
}

/// Half-open/closed integer interval used by the SELECT CASE overlap check.
/// `has_lo`/`has_hi` false means unbounded on that side.
#[derive(Debug, Clone, Copy)]
struct Interval {
    has_lo: bool,
    lo: i64,
    has_hi: bool,
    hi: i64,
}

impl Interval {
    fn lo_or(&self, default: i64) -> i64 {
        if self.has_lo { self.lo } else { default }
    }
    fn hi_or(&self, default: i64) -> i64 {
        if self.has_hi { self.hi } else { default }
    }
    fn contains(&self, v: i64) -> bool {
        self.lo_or(i64::MIN) <= v && v <= self.hi_or(i64::MAX)
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_ascii_uppercase().chars().collect();
    let b: Vec<char> = b.to_ascii_uppercase().chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];
    for i in 1..=a.len() {
        cur[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            cur[j] = (prev[j] + 1).min(cur[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::lexer::Lexer;
    use crate::basic::parser::parse_program;
    use crate::source::FileId;

    fn analyze(src: &str) -> DiagnosticEmitter {
        let mut diags = DiagnosticEmitter::new();
        let tokens = Lexer::new(src, FileId(0)).scan(&mut diags);
        let program = parse_program(tokens, &mut diags);
        SemanticAnalyzer::new(&mut diags).analyze(&program);
        diags
    }

    #[test]
    fn unknown_variable_suggests_nearest_symbol() {
        let diags = analyze("LET COUNTER = 0\nPRINT CUONTER\n");
        let msg = &diags.diagnostics().iter().find(|d| d.code == "B1001").unwrap().message;
        assert!(msg.contains("did you mean 'COUNTER'?"), "message was: {msg}");
    }

    #[test]
    fn division_by_zero_literal_is_diagnosed() {
        let diags = analyze("PRINT 1 / 0\n");
        assert_eq!(diags.diagnostics().len(), 1);
        assert_eq!(diags.diagnostics()[0].code, "B2002");
    }

    #[test]
    fn division_by_non_literal_zero_is_not_flagged_statically() {
        let diags = analyze("LET A = 0\nPRINT 4 / A\n");
        assert!(diags.is_clean());
    }

    #[test]
    fn select_case_overlapping_ranges_is_diagnosed() {
        let diags = analyze("SELECT CASE X\nCASE 1 TO 5\nPRINT 1\nCASE 3 TO 8\nPRINT 2\nEND SELECT\n");
        assert_eq!(diags.diagnostics()[0].code, "ERR_SelectCase_OverlappingRange");
    }

    #[test]
    fn select_case_non_overlapping_ranges_is_clean() {
        let diags = analyze("SELECT CASE X\nCASE 1 TO 5\nPRINT 1\nCASE 6 TO 8\nPRINT 2\nEND SELECT\n");
        assert!(diags.is_clean());
    }

    #[test]
    fn select_case_duplicate_label_is_diagnosed() {
        let diags = analyze("SELECT CASE X\nCASE 1\nPRINT 1\nCASE 1\nPRINT 2\nEND SELECT\n");
        assert_eq!(diags.diagnostics()[0].code, "ERR_SelectCase_DuplicateLabel");
    }

    #[test]
    fn select_case_mixed_label_types_across_arms_is_diagnosed() {
        let diags = analyze("SELECT CASE X\nCASE 1\nPRINT 1\nCASE \"a\"\nPRINT 2\nEND SELECT\n");
        assert!(diags.diagnostics().iter().any(|d| d.code == "ERR_SelectCase_MixedLabelTypes"));
    }

    #[test]
    fn select_case_relational_overlap_is_diagnosed() {
        let diags = analyze("SELECT CASE X\nCASE IS > 10\nPRINT 1\nCASE IS > 20\nPRINT 2\nEND SELECT\n");
        assert_eq!(diags.diagnostics()[0].code, "ERR_SelectCase_OverlappingRange");
    }

    #[test]
    fn array_index_out_of_declared_bounds_is_a_warning() {
        let diags = analyze("DIM A(3)\nLET A(9) = 1\n");
        assert_eq!(diags.diagnostics()[0].code, "B3001");
        assert!(diags.is_clean());
    }

    #[test]
    fn function_without_return_is_warned() {
        let diags = analyze("FUNCTION ADD(A AS INTEGER) AS INTEGER\nPRINT A\nEND FUNCTION\n");
        assert!(diags.diagnostics().iter().any(|d| d.code == "B1007"));
    }

    #[test]
    fn call_argument_count_mismatch_is_diagnosed() {
        let diags = analyze("SUB GREET(NAME AS STRING)\nPRINT NAME\nEND SUB\nGREET \"a\", \"b\"\n");
        assert!(diags.diagnostics().iter().any(|d| d.code == "B2008"));
    }

    #[test]
    fn goto_undefined_label_is_diagnosed() {
        let diags = analyze("GOTO 999\n");
        assert_eq!(diags.diagnostics()[0].code, "B1003");
    }

    #[test]
    fn assigning_to_for_loop_variable_is_diagnosed() {
        let diags = analyze("FOR I = 1 TO 10\nLET I = 5\nNEXT I\n");
        assert!(diags.diagnostics().iter().any(|d| d.code == "B1010"));
    }

    #[test]
    fn mismatched_next_variable_is_diagnosed() {
        let diags = analyze("FOR I = 1 TO 10\nPRINT I\nNEXT J\n");
        assert!(diags.diagnostics().iter().any(|d| d.code == "B1002"));
    }

    #[test]
    fn return_with_value_outside_function_is_diagnosed() {
        let diags = analyze("SUB DOIT()\nRETURN 5\nEND SUB\n");
        assert!(diags.diagnostics().iter().any(|d| d.code == "B1008"));
    }

    #[test]
    fn negative_array_size_is_diagnosed() {
        let diags = analyze("DIM A(-1)\n");
        assert!(diags.diagnostics().iter().any(|d| d.code == "B2003"));
    }

    #[test]
    fn reopening_an_open_channel_is_a_warning() {
        let diags = analyze("OPEN \"a.txt\" FOR INPUT AS #1\nOPEN \"b.txt\" FOR INPUT AS #1\n");
        assert!(diags.diagnostics().iter().any(|d| d.code == "B3002"));
        assert!(diags.is_clean());
    }

    #[test]
    fn resume_without_handler_is_diagnosed() {
        let diags = analyze("RESUME NEXT\n");
        assert!(diags.diagnostics().iter().any(|d| d.code == "B1012"));
    }

    #[test]
    fn and_with_non_boolean_operand_is_diagnosed() {
        let diags = analyze("PRINT 1 AND 2\n");
        assert!(diags.diagnostics().iter().any(|d| d.code == "E1002"));
    }

    #[test]
    fn not_with_non_boolean_operand_is_diagnosed() {
        let diags = analyze("PRINT NOT 1\n");
        assert!(diags.diagnostics().iter().any(|d| d.code == "E1002"));
    }

    #[test]
    fn comparing_string_to_number_is_diagnosed() {
        let diags = analyze("PRINT \"a\" = 1\n");
        assert!(diags.diagnostics().iter().any(|d| d.code == "B2001"));
    }

    #[test]
    fn and_with_boolean_operands_is_clean() {
        let diags = analyze("PRINT (1 = 1) AND (2 = 2)\n");
        assert!(diags.is_clean());
    }
}
