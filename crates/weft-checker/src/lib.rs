//! Weft Legality Checker
//!
//! Verifies that every call site in a type-annotated program is legal for
//! the lexical context it appears in and for whether it executes inside an
//! exclusive mutation window. This is a pure validation pass: no output
//! besides pass/fail plus accumulated diagnostics.

mod context;
mod diagnostics;
mod legality;

pub use context::*;
pub use diagnostics::*;
pub use legality::LegalityChecker;

use thiserror::Error;
use weft_ast::Program;

/// Why a checking pass failed
#[derive(Debug, Error)]
pub enum CheckFailure {
    /// The program broke one or more legality rules
    #[error("legality check failed with {} violation(s)", .0.len())]
    Violations(Vec<Violation>),

    /// The checker itself hit an invariant break; a bug, not a user error
    #[error(transparent)]
    Internal(#[from] InternalError),
}

/// Check a program's context and mutability discipline
///
/// Visits the whole tree before failing, so a single run surfaces every
/// violation. Checking the same tree twice yields the same diagnostics.
pub fn check(program: &Program) -> Result<(), CheckFailure> {
    let violations = LegalityChecker::new().run(program)?;
    if violations.is_empty() {
        Ok(())
    } else {
        Err(CheckFailure::Violations(violations))
    }
}
