//! Python 3 lowering (spec.md §4.3.1, §4.3.2): a growable string buffer, a
//! single indentation counter, and one lowering rule per tree node.

use crate::generator::escape::escape_string;
use crate::parser::ast::{BinaryOperator, Expression, Function, Literal, Program, Statement, UnaryOperator};

pub struct PythonGenerator {
    buf: String,
    indent: usize,
    branch_counter: usize,
}

impl PythonGenerator {
    pub fn new() -> Self {
        Self { buf: String::new(), indent: 0, branch_counter: 0 }
    }

    fn write_line(&mut self, line: &str) {
        if line.is_empty() {
            self.buf.push('\n');
            return;
        }
        for _ in 0..self.indent {
            self.buf.push_str("    ");
        }
        self.buf.push_str(line);
        self.buf.push('\n');
    }

    /// Generates the complete program text (spec.md §4.3.3): `has_outer_circle
    /// == false` fails; globals then function definitions then the
    /// `if __name__ == "__main__":` block, in tree order.
    pub fn generate(&mut self, program: &Program) -> crate::error::Result<String> {
        if !program.has_outer_circle {
            return Err(crate::error::GrimoireError::CompilationError {
                reason: "outer circle required".to_string(),
            });
        }

        self.buf.clear();
        self.indent = 0;
        self.branch_counter = 0;

        self.write_line("#!/usr/bin/env python3");
        self.write_line("");

        if uses_parallel(program) {
            self.write_line("import threading");
            self.write_line("");
        }

        for stmt in &program.globals {
            self.lower_statement(stmt);
        }
        if !program.globals.is_empty() {
            self.write_line("");
        }

        for function in &program.functions {
            self.lower_function(function);
            self.write_line("");
        }

        self.write_line("if __name__ == \"__main__\":");
        self.indent += 1;
        if program.main_entry.body.is_empty() {
            self.write_line("pass");
        } else {
            for stmt in &program.main_entry.body {
                self.lower_statement(stmt);
            }
        }
        self.indent -= 1;

        Ok(std::mem::take(&mut self.buf))
    }

    fn lower_function(&mut self, function: &Function) {
        self.write_line(&format!("def {}({}):", function.name, function.params.join(", ")));
        self.indent += 1;
        if function.body.is_empty() {
            self.write_line("pass");
        } else {
            for stmt in &function.body {
                self.lower_statement(stmt);
            }
        }
        self.indent -= 1;
    }

    fn lower_body(&mut self, body: &[Statement]) {
        self.indent += 1;
        if body.is_empty() {
            self.write_line("pass");
        } else {
            for stmt in body {
                self.lower_statement(stmt);
            }
        }
        self.indent -= 1;
    }

    fn lower_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Assignment { target, value, .. } => {
                self.write_line(&format!("{} = {}", target, lower_expr(value)));
            }
            Statement::OutputStatement { value } => {
                self.write_line(&format!("print({})", lower_expr(value)));
            }
            Statement::IfStatement { condition, then_branch, else_branch } => {
                self.write_line(&format!("if {}:", lower_expr(condition)));
                self.lower_body(then_branch);
                if !else_branch.is_empty() {
                    self.write_line("else:");
                    self.lower_body(else_branch);
                }
            }
            Statement::ForLoop { counter, start, end, step, body } => {
                self.write_line(&format!(
                    "for {} in range({}, {}, {}):",
                    counter,
                    lower_expr(start),
                    lower_expr(end),
                    lower_expr(step)
                ));
                self.lower_body(body);
            }
            Statement::WhileLoop { condition, body } => {
                self.write_line(&format!("while {}:", lower_expr(condition)));
                self.lower_body(body);
            }
            Statement::ParallelBlock { branches } => self.lower_parallel_block(branches),
            Statement::ExpressionStatement { expr } => {
                self.write_line(&lower_expr(expr));
            }
            Statement::Return { value } => match value {
                Some(v) => self.write_line(&format!("return {}", lower_expr(v))),
                None => self.write_line("return"),
            },
        }
    }

    /// Spec.md §4.3.2's `ParallelBlock` row: one `def _branch_k(): ...` per
    /// branch, a `threads = [...]` list, then a start-all/join-all pair of
    /// loops.
    fn lower_parallel_block(&mut self, branches: &[Vec<Statement>]) {
        let mut names = Vec::with_capacity(branches.len());
        for branch in branches {
            let name = format!("_branch_{}", self.branch_counter);
            self.branch_counter += 1;
            self.write_line(&format!("def {}():", name));
            self.lower_body(branch);
            names.push(name);
        }

        let thread_exprs: Vec<String> =
            names.iter().map(|n| format!("threading.Thread(target={})", n)).collect();
        self.write_line(&format!("threads = [{}]", thread_exprs.join(", ")));
        self.write_line("for t in threads:");
        self.indent += 1;
        self.write_line("t.start()");
        self.indent -= 1;
        self.write_line("for t in threads:");
        self.indent += 1;
        self.write_line("t.join()");
        self.indent -= 1;
    }
}

impl Default for PythonGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn binary_op_symbol(op: BinaryOperator) -> &'static str {
    match op {
        BinaryOperator::Add => "+",
        BinaryOperator::Subtract => "-",
        BinaryOperator::Multiply => "*",
        BinaryOperator::Divide => "/",
    }
}

/// Lowers an expression to Python source (spec.md §4.3.2). `Any`-typed
/// nodes are emitted exactly like any other node — types are erased in
/// the target language and only guided how the tree was shaped (spec.md
/// §4.3.3).
fn lower_expr(expr: &Expression) -> String {
    match expr {
        Expression::Literal { value, .. } => match value {
            Literal::Int(n) => n.to_string(),
            Literal::Float(f) => format!("{f:?}"),
            Literal::Str(s) => format!("\"{}\"", escape_string(s)),
            Literal::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        },
        Expression::Identifier { name, .. } => name.clone(),
        Expression::BinaryOp { op, left, right, .. } => {
            format!("({} {} {})", lower_expr(left), binary_op_symbol(*op), lower_expr(right))
        }
        Expression::UnaryOp { op, operand, .. } => match op {
            UnaryOperator::Negate => format!("(-{})", lower_expr(operand)),
        },
        Expression::FunctionCall { name, args, .. } => {
            let rendered: Vec<String> = args.iter().map(lower_expr).collect();
            format!("{}({})", name, rendered.join(", "))
        }
        Expression::ArrayLiteral { elements, .. } => {
            let rendered: Vec<String> = elements.iter().map(lower_expr).collect();
            format!("[{}]", rendered.join(", "))
        }
    }
}

fn statements_use_parallel(statements: &[Statement]) -> bool {
    statements.iter().any(|stmt| match stmt {
        Statement::ParallelBlock { .. } => true,
        Statement::IfStatement { then_branch, else_branch, .. } => {
            statements_use_parallel(then_branch) || statements_use_parallel(else_branch)
        }
        Statement::ForLoop { body, .. } | Statement::WhileLoop { body, .. } => statements_use_parallel(body),
        _ => false,
    })
}

fn uses_parallel(program: &Program) -> bool {
    statements_use_parallel(&program.globals)
        || statements_use_parallel(&program.main_entry.body)
        || program.functions.iter().any(|f| statements_use_parallel(&f.body))
}
