//! Peephole constant folding over a parsed tree, run only by the CLI's
//! `optimize` subcommand (SPEC_FULL.md §6.2). Never runs as part of
//! `compile_bytes` itself — folding is informational polish, not a
//! correctness requirement of the core pipeline.

use crate::parser::ast::{BinaryOperator, Expression, Function, Literal, Program, Statement};

fn fold_expr(expr: Expression) -> Expression {
    match expr {
        Expression::BinaryOp { op, left, right, ty } => {
            let left = fold_expr(*left);
            let right = fold_expr(*right);
            if let Some(folded) = fold_literal_pair(op, &left, &right) {
                return folded;
            }
            Expression::BinaryOp { op, left: Box::new(left), right: Box::new(right), ty }
        }
        Expression::UnaryOp { op, operand, ty } => {
            Expression::UnaryOp { op, operand: Box::new(fold_expr(*operand)), ty }
        }
        Expression::FunctionCall { name, args, ty } => {
            Expression::FunctionCall { name, args: args.into_iter().map(fold_expr).collect(), ty }
        }
        Expression::ArrayLiteral { elements, ty } => {
            Expression::ArrayLiteral { elements: elements.into_iter().map(fold_expr).collect(), ty }
        }
        other => other,
    }
}

fn fold_literal_pair(op: BinaryOperator, left: &Expression, right: &Expression) -> Option<Expression> {
    let (Expression::Literal { value: l, ty }, Expression::Literal { value: r, .. }) = (left, right) else {
        return None;
    };
    match (l, r) {
        (Literal::Int(a), Literal::Int(b)) => {
            let result = match op {
                BinaryOperator::Add => a.checked_add(*b)?,
                BinaryOperator::Subtract => a.checked_sub(*b)?,
                BinaryOperator::Multiply => a.checked_mul(*b)?,
                BinaryOperator::Divide => {
                    if *b == 0 {
                        return None;
                    }
                    a.checked_div(*b)?
                }
            };
            Some(Expression::Literal { value: Literal::Int(result), ty: *ty })
        }
        (Literal::Float(a), Literal::Float(b)) => {
            let result = match op {
                BinaryOperator::Add => a + b,
                BinaryOperator::Subtract => a - b,
                BinaryOperator::Multiply => a * b,
                BinaryOperator::Divide => {
                    if *b == 0.0 {
                        return None;
                    }
                    a / b
                }
            };
            Some(Expression::Literal { value: Literal::Float(result), ty: *ty })
        }
        _ => None,
    }
}

fn fold_statements(statements: Vec<Statement>) -> Vec<Statement> {
    statements.into_iter().map(fold_statement).collect()
}

fn fold_statement(stmt: Statement) -> Statement {
    match stmt {
        Statement::Assignment { target, value, ty } => Statement::Assignment { target, value: fold_expr(value), ty },
        Statement::OutputStatement { value } => Statement::OutputStatement { value: fold_expr(value) },
        Statement::IfStatement { condition, then_branch, else_branch } => Statement::IfStatement {
            condition: fold_expr(condition),
            then_branch: fold_statements(then_branch),
            else_branch: fold_statements(else_branch),
        },
        Statement::ForLoop { counter, start, end, step, body } => Statement::ForLoop {
            counter,
            start: fold_expr(start),
            end: fold_expr(end),
            step: fold_expr(step),
            body: fold_statements(body),
        },
        Statement::WhileLoop { condition, body } => {
            Statement::WhileLoop { condition: fold_expr(condition), body: fold_statements(body) }
        }
        Statement::ParallelBlock { branches } => {
            Statement::ParallelBlock { branches: branches.into_iter().map(fold_statements).collect() }
        }
        Statement::ExpressionStatement { expr } => Statement::ExpressionStatement { expr: fold_expr(expr) },
        Statement::Return { value } => Statement::Return { value: value.map(fold_expr) },
    }
}

fn fold_function(function: Function) -> Function {
    Function { name: function.name, params: function.params, body: fold_statements(function.body) }
}

/// Folds every constant binary operation over two literals of the same
/// numeric type into a single literal, in place. Division by zero and
/// overflowing operations are left unfolded so `optimize` never turns a
/// would-be-runtime error into a silently different result.
pub fn fold_constants(program: &mut Program) {
    program.globals = fold_statements(std::mem::take(&mut program.globals));
    program.functions = std::mem::take(&mut program.functions).into_iter().map(fold_function).collect();
    let placeholder = Function { name: String::new(), params: Vec::new(), body: Vec::new() };
    let main_entry = std::mem::replace(&mut program.main_entry, placeholder);
    program.main_entry = fold_function(main_entry);
}
