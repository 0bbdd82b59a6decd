//! Type unification pass (spec.md §4.2.6): propagates types through
//! `BinaryOp`/`UnaryOp` and resolves identifier references against the
//! declared type of their assignment target.

use crate::parser::ast::{BinaryOperator, DataType, Expression, Function, Program, Statement};
use std::collections::HashMap;

/// Numeric/string promotion rules for a binary operator given its
/// operands' types (spec.md §4.2.6). Incompatible combinations log a
/// warning and type as `Any` rather than failing the whole parse.
fn promote(op: BinaryOperator, left: DataType, right: DataType) -> DataType {
    use DataType::*;
    match (left, right) {
        (Integer, Integer) => Integer,
        (Float, Float) | (Integer, Float) | (Float, Integer) => Float,
        (String, _) | (_, String) if op == BinaryOperator::Add => String,
        (a, b) if a == b => a,
        (a, b) => {
            log::warn!("incompatible operand types {a:?}/{b:?} in binary op {op:?}; typing as Any");
            Any
        }
    }
}

fn infer_expression(expr: &mut Expression, types: &HashMap<String, DataType>) -> DataType {
    match expr {
        Expression::Literal { ty, .. } => *ty,
        Expression::Identifier { name, ty } => {
            if let Some(resolved) = types.get(name) {
                *ty = *resolved;
            }
            *ty
        }
        Expression::BinaryOp { op, left, right, ty } => {
            let lt = infer_expression(left, types);
            let rt = infer_expression(right, types);
            *ty = promote(*op, lt, rt);
            *ty
        }
        Expression::UnaryOp { operand, ty, .. } => {
            *ty = infer_expression(operand, types);
            *ty
        }
        Expression::FunctionCall { args, ty, .. } => {
            for arg in args.iter_mut() {
                infer_expression(arg, types);
            }
            *ty
        }
        Expression::ArrayLiteral { elements, ty } => {
            for element in elements.iter_mut() {
                infer_expression(element, types);
            }
            *ty
        }
    }
}

fn infer_statements(statements: &mut [Statement], types: &HashMap<String, DataType>) {
    for statement in statements.iter_mut() {
        match statement {
            Statement::Assignment { value, ty, .. } => {
                infer_expression(value, types);
                if *ty == DataType::Any {
                    *ty = value.ty();
                }
            }
            Statement::OutputStatement { value } => {
                infer_expression(value, types);
            }
            Statement::IfStatement { condition, then_branch, else_branch } => {
                infer_expression(condition, types);
                infer_statements(then_branch, types);
                infer_statements(else_branch, types);
            }
            Statement::ForLoop { start, end, step, body, .. } => {
                infer_expression(start, types);
                infer_expression(end, types);
                infer_expression(step, types);
                infer_statements(body, types);
            }
            Statement::WhileLoop { condition, body } => {
                infer_expression(condition, types);
                infer_statements(body, types);
            }
            Statement::ParallelBlock { branches } => {
                for branch in branches.iter_mut() {
                    infer_statements(branch, types);
                }
            }
            Statement::ExpressionStatement { expr } => {
                infer_expression(expr, types);
            }
            Statement::Return { value } => {
                if let Some(value) = value {
                    infer_expression(value, types);
                }
            }
        }
    }
}

/// Collects every assignment target's declared type across `statements`,
/// recursing into nested bodies so a variable assigned inside a branch is
/// still visible to later identifier references at any scope (this pass
/// treats the whole function as one flat scope, matching the informal
/// single-pass nature of the rest of the pipeline).
fn collect_declared_types(statements: &[Statement], types: &mut HashMap<String, DataType>) {
    for statement in statements {
        match statement {
            Statement::Assignment { target, ty, .. } => {
                types.insert(target.clone(), *ty);
            }
            Statement::IfStatement { then_branch, else_branch, .. } => {
                collect_declared_types(then_branch, types);
                collect_declared_types(else_branch, types);
            }
            Statement::ForLoop { counter, body, .. } => {
                types.insert(counter.clone(), DataType::Integer);
                collect_declared_types(body, types);
            }
            Statement::WhileLoop { body, .. } => collect_declared_types(body, types),
            Statement::ParallelBlock { branches } => {
                for branch in branches {
                    collect_declared_types(branch, types);
                }
            }
            Statement::OutputStatement { .. } | Statement::ExpressionStatement { .. } | Statement::Return { .. } => {}
        }
    }
}

fn infer_function(function: &mut Function, types: &mut HashMap<String, DataType>) {
    collect_declared_types(&function.body, types);
    infer_statements(&mut function.body, types);
}

/// Runs the unification pass over every statement list in `program`: the
/// globals, `main_entry`, and every other function, sharing one type map
/// so a global assigned before a function body is visible inside it.
pub fn infer_program(program: &mut Program) {
    let mut types = HashMap::new();
    collect_declared_types(&program.globals, &mut types);
    collect_declared_types(&program.main_entry.body, &mut types);
    for function in &program.functions {
        collect_declared_types(&function.body, &mut types);
    }

    infer_statements(&mut program.globals, &types);
    infer_function(&mut program.main_entry, &mut types.clone());
    for function in program.functions.iter_mut() {
        infer_function(function, &mut types.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::Literal;

    #[test]
    fn integer_plus_float_promotes_to_float() {
        assert_eq!(promote(BinaryOperator::Add, DataType::Integer, DataType::Float), DataType::Float);
    }

    #[test]
    fn string_add_promotes_to_string() {
        assert_eq!(promote(BinaryOperator::Add, DataType::String, DataType::Integer), DataType::String);
    }

    #[test]
    fn incompatible_types_become_any() {
        assert_eq!(promote(BinaryOperator::Multiply, DataType::String, DataType::Boolean), DataType::Any);
    }

    #[test]
    fn identifier_resolves_against_declared_type() {
        let mut types = HashMap::new();
        types.insert("v0".to_string(), DataType::Float);
        let mut expr = Expression::Identifier { name: "v0".to_string(), ty: DataType::Any };
        let ty = infer_expression(&mut expr, &types);
        assert_eq!(ty, DataType::Float);
    }

    #[test]
    fn assignment_with_any_type_adopts_value_type() {
        let mut statements = vec![Statement::Assignment {
            target: "v1".to_string(),
            value: Expression::Literal { value: Literal::Int(3), ty: DataType::Integer },
            ty: DataType::Any,
        }];
        infer_statements(&mut statements, &HashMap::new());
        match &statements[0] {
            Statement::Assignment { ty, .. } => assert_eq!(*ty, DataType::Integer),
            _ => unreachable!(),
        }
    }
}
