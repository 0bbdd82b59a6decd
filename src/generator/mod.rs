//! Tree -> target source text (spec.md §4.3). Python 3 is the only
//! implemented backend; `Backend` exists as the extension seam a second
//! target would slot into.

pub mod escape;
pub mod python;

use crate::parser::ast::Program;
use python::PythonGenerator;

/// A code generation target. `PythonGenerator` is the only implementor;
/// the trait exists so `compile_program` doesn't hard-code a backend.
pub trait Backend {
    fn generate(&mut self, program: &Program) -> crate::error::Result<String>;
}

impl Backend for PythonGenerator {
    fn generate(&mut self, program: &Program) -> crate::error::Result<String> {
        PythonGenerator::generate(self, program)
    }
}

/// Lowers `program` to Python 3 source (spec.md's default target).
pub fn generate_python(program: &Program) -> crate::error::Result<String> {
    PythonGenerator::new().generate(program)
}
