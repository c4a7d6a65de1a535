//! The context/mutability legality pass
//!
//! A single traversal over a type-annotated tree that validates every call
//! expression against its resolved callee kind, plus the structural rules
//! for `activate`. Violations are accumulated so one run surfaces them all.

use crate::{CheckState, Context, InternalError, Violation};
use weft_ast::{
    ActionDecl, BehaviorDecl, Block, CalleeKind, ComponentDecl, Expr, ExprKind, FunctionKind,
    Loc, MemberKind, MethodKind, Program, Stmt, StmtKind,
};

/// The legality checker
///
/// Holds only the violation accumulator; traversal state lives in the
/// [`CheckState`] values threaded through the recursion.
#[derive(Debug, Default)]
pub struct LegalityChecker {
    violations: Vec<Violation>,
}

impl LegalityChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk a whole program and return every violation found
    pub fn run(mut self, program: &Program) -> Result<Vec<Violation>, InternalError> {
        for function in &program.functions {
            // Plain function bodies do not reset the context; at top level
            // that leaves them in ordinary context.
            self.check_behavior(function, CheckState::top_level())?;
        }
        for component in &program.components {
            self.check_component(component)?;
        }
        Ok(self.violations)
    }

    fn check_component(&mut self, component: &ComponentDecl) -> Result<(), InternalError> {
        for member in &component.members {
            match &member.kind {
                MemberKind::Initializer(b) => {
                    self.check_behavior(b, CheckState::enter(Context::Initializer))?;
                }
                MemberKind::Getter(b) => {
                    self.check_behavior(b, CheckState::enter(Context::Getter))?;
                }
                MemberKind::Method(b) => {
                    self.check_behavior(b, CheckState::top_level())?;
                }
                MemberKind::Action(a) => {
                    self.check_action(a)?;
                }
                MemberKind::Reaction(r) => {
                    if let Some(iota) = &r.iota {
                        self.check_expr(&iota.extent, CheckState::top_level())?;
                    }
                    self.check_block(&r.body, CheckState::enter(Context::Reaction))?;
                }
                MemberKind::Const(c) => {
                    self.check_expr(&c.value, CheckState::top_level())?;
                }
                // No body to check
                MemberKind::Field(_)
                | MemberKind::PushPort(_)
                | MemberKind::PullPort(_)
                | MemberKind::Bind(_)
                | MemberKind::Instance(_) => {}
            }
        }
        Ok(())
    }

    fn check_behavior(
        &mut self,
        behavior: &BehaviorDecl,
        state: CheckState,
    ) -> Result<(), InternalError> {
        self.check_block(&behavior.body, state)
    }

    fn check_action(&mut self, action: &ActionDecl) -> Result<(), InternalError> {
        if let Some(iota) = &action.iota {
            // Dimension extents evaluate at instantiation time, outside any
            // behavior context.
            self.check_expr(&iota.extent, CheckState::top_level())?;
        }
        let state = CheckState::enter(Context::Action);
        self.check_expr(&action.precondition, state)?;
        self.check_block(&action.body, state)
    }

    fn check_block(&mut self, block: &Block, state: CheckState) -> Result<(), InternalError> {
        for stmt in &block.statements {
            self.check_stmt(stmt, state)?;
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &Stmt, state: CheckState) -> Result<(), InternalError> {
        match &stmt.kind {
            StmtKind::Let { value, .. } => self.check_expr(value, state),
            StmtKind::Assign { target, value } => {
                self.check_expr(target, state)?;
                self.check_expr(value, state)
            }
            StmtKind::Expr(expr) => self.check_expr(expr, state),
            StmtKind::Return(expr) => {
                if let Some(e) = expr {
                    self.check_expr(e, state)?;
                }
                Ok(())
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.check_expr(condition, state)?;
                self.check_block(then_branch, state)?;
                if let Some(else_branch) = else_branch {
                    self.check_block(else_branch, state)?;
                }
                Ok(())
            }
            StmtKind::While { condition, body } => {
                self.check_expr(condition, state)?;
                self.check_block(body, state)
            }
            StmtKind::Activate { values, body } => {
                // The value list evaluates before the window opens, so it is
                // checked with the current mutable-phase flag.
                for value in values {
                    self.check_expr(value, state)?;
                }
                if !matches!(state.context, Context::Action | Context::Reaction) {
                    self.violations.push(Violation::ActivateContext {
                        context: state.context,
                        loc: stmt.loc.clone(),
                    });
                }
                if state.in_mutable_phase {
                    self.violations.push(Violation::NestedActivate {
                        loc: stmt.loc.clone(),
                    });
                }
                // Keep walking the body even when the statement itself is
                // illegal, so its own violations still surface.
                self.check_block(body, state.with_mutable_phase())
            }
        }
    }

    fn check_expr(&mut self, expr: &Expr, state: CheckState) -> Result<(), InternalError> {
        match &expr.kind {
            ExprKind::Literal(_) | ExprKind::Ident(_) => Ok(()),
            ExprKind::Field { object, .. } => self.check_expr(object, state),
            ExprKind::Index { object, index } => {
                self.check_expr(object, state)?;
                self.check_expr(index, state)
            }
            ExprKind::Unary { operand, .. } => self.check_expr(operand, state),
            ExprKind::Binary { left, right, .. } => {
                self.check_expr(left, state)?;
                self.check_expr(right, state)
            }
            ExprKind::Call {
                callee,
                args,
                resolved,
            } => {
                for arg in args {
                    self.check_expr(arg, state)?;
                }
                let kind = (*resolved).ok_or_else(|| InternalError::UnresolvedCallee {
                    name: callee.clone(),
                    loc: expr.loc.clone(),
                })?;
                self.check_call(callee, kind, &expr.loc, state);
                Ok(())
            }
        }
    }

    /// The per-call-site rule table
    fn check_call(&mut self, name: &str, kind: CalleeKind, loc: &Loc, state: CheckState) {
        match kind {
            // No restriction; grants no privileges either
            CalleeKind::Function(FunctionKind::Function) | CalleeKind::Method(MethodKind::Method) => {}

            CalleeKind::Function(FunctionKind::PushPort) => {
                self.violations.push(Violation::PushPortCall {
                    name: name.to_string(),
                    loc: loc.clone(),
                });
            }

            CalleeKind::Function(FunctionKind::PullPort) => {
                if !matches!(
                    state.context,
                    Context::Getter | Context::Action | Context::Reaction
                ) {
                    self.violations.push(Violation::PullPortContext {
                        name: name.to_string(),
                        context: state.context,
                        loc: loc.clone(),
                    });
                } else if state.in_mutable_phase {
                    self.violations.push(Violation::PullPortInMutableSection {
                        name: name.to_string(),
                        loc: loc.clone(),
                    });
                }
            }

            CalleeKind::Method(MethodKind::Initializer) => {
                if state.context != Context::Initializer {
                    self.violations.push(Violation::InitializerOutsideInitializer {
                        name: name.to_string(),
                        context: state.context,
                        loc: loc.clone(),
                    });
                }
            }

            CalleeKind::Method(MethodKind::Getter) => {
                if !matches!(
                    state.context,
                    Context::Getter | Context::Action | Context::Reaction | Context::Initializer
                ) {
                    self.violations.push(Violation::GetterContext {
                        name: name.to_string(),
                        context: state.context,
                        loc: loc.clone(),
                    });
                } else if state.in_mutable_phase {
                    self.violations.push(Violation::GetterInMutableSection {
                        name: name.to_string(),
                        loc: loc.clone(),
                    });
                }
            }

            // Reactions are reachable only through bound push ports; a
            // resolved direct call is always a program error.
            CalleeKind::Method(MethodKind::Reaction) => {
                self.violations.push(Violation::ReactionCall {
                    name: name.to_string(),
                    loc: loc.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ast::{MemberDecl, ReactionDecl};

    fn loc(line: u32) -> Loc {
        Loc::new("test.weft", line)
    }

    fn component_with(members: Vec<MemberKind>) -> Program {
        let members = members
            .into_iter()
            .enumerate()
            .map(|(i, kind)| MemberDecl::new(kind, loc(i as u32 + 1)))
            .collect();
        Program::new(
            vec![ComponentDecl {
                name: "Cell".into(),
                members,
                loc: loc(1),
            }],
            Vec::new(),
        )
    }

    fn run(program: &Program) -> Vec<Violation> {
        LegalityChecker::new().run(program).expect("internal error")
    }

    #[test]
    fn ordinary_function_call_is_legal_everywhere() {
        let call = Expr::call(
            "helper",
            CalleeKind::Function(FunctionKind::Function),
            loc(2),
        );
        let program = component_with(vec![MemberKind::Getter(BehaviorDecl::new(
            "level",
            Block::of_expr(call),
            loc(1),
        ))]);
        assert!(run(&program).is_empty());
    }

    #[test]
    fn getter_call_from_ordinary_method_is_rejected() {
        let call = Expr::call("level", CalleeKind::Method(MethodKind::Getter), loc(2));
        let program = component_with(vec![MemberKind::Method(BehaviorDecl::new(
            "poke",
            Block::of_expr(call),
            loc(1),
        ))]);
        let violations = run(&program);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code(), "E-CTX-005");
    }

    #[test]
    fn reaction_kind_call_is_rejected() {
        let call = Expr::call("on_tick", CalleeKind::Method(MethodKind::Reaction), loc(2));
        let program = component_with(vec![MemberKind::Reaction(ReactionDecl {
            name: "on_poke".into(),
            params: Vec::new(),
            iota: None,
            body: Block::of_expr(call),
            loc: loc(1),
        })]);
        let violations = run(&program);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code(), "E-CTX-009");
    }

    #[test]
    fn unresolved_callee_is_an_internal_error() {
        let call = Expr::new(
            ExprKind::Call {
                callee: "mystery".into(),
                args: Vec::new(),
                resolved: None,
            },
            loc(2),
        );
        let program = component_with(vec![MemberKind::Getter(BehaviorDecl::new(
            "level",
            Block::of_expr(call),
            loc(1),
        ))]);
        let err = LegalityChecker::new().run(&program).unwrap_err();
        assert!(matches!(err, InternalError::UnresolvedCallee { .. }));
    }

    #[test]
    fn activate_in_getter_is_rejected_but_body_still_checked() {
        // The body contains its own violation; both must surface.
        let inner = Expr::call("level", CalleeKind::Method(MethodKind::Getter), loc(3));
        let activate = Stmt::new(
            StmtKind::Activate {
                values: Vec::new(),
                body: Block::of_expr(inner),
            },
            loc(2),
        );
        let program = component_with(vec![MemberKind::Getter(BehaviorDecl::new(
            "level",
            Block::new(vec![activate]),
            loc(1),
        ))]);
        let codes: Vec<&str> = run(&program).iter().map(|v| v.code()).collect();
        assert_eq!(codes, vec!["E-CTX-007", "E-CTX-006"]);
    }
}
