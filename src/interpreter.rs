//! Tree-walking evaluation.
//!
//! Statements and expressions evaluate directly against a `Closure` scope
//! and a `Context`; there is no intermediate representation. An explicit
//! `return` travels upward as `ExecResult::Return` until the enclosing
//! `MethodBody` turns it into the call's result.

use std::rc::Rc;
use std::slice;

use crate::ast::{ComparisonOp, Expression, Program, Statement};
use crate::runtime::class::ClassInstance;
use crate::runtime::compare;
use crate::runtime::context::{BufferContext, Context, write_output};
use crate::runtime::error::RuntimeError;
use crate::runtime::object::{Closure, Object, ObjectHolder};

const ADD_METHOD: &str = "__add__";
const INIT_METHOD: &str = "__init__";

/// Control-flow marker for statement execution: either the statement's
/// value, or an explicit `return` still looking for its method body.
pub enum ExecResult {
    Completed(ObjectHolder),
    Return(ObjectHolder),
}

/// Runs a parsed program in a fresh global scope.
pub fn run_program(program: &Program, context: &mut dyn Context) -> Result<(), RuntimeError> {
    let mut globals = Closure::new();
    for statement in &program.statements {
        if let ExecResult::Return(_) = statement.execute(&mut globals, context)? {
            return Err(RuntimeError::ReturnOutsideMethod);
        }
    }
    Ok(())
}

impl Statement {
    pub fn execute(
        &self,
        closure: &mut Closure,
        context: &mut dyn Context,
    ) -> Result<ExecResult, RuntimeError> {
        match self {
            Statement::Assignment { var, rv } => {
                let value = rv.evaluate(closure, context)?;
                closure.insert(var.clone(), value.clone());
                Ok(ExecResult::Completed(value))
            }
            Statement::FieldAssignment {
                object,
                field_name,
                rv,
            } => {
                let target = resolve_dotted(object, closure)?;
                let target_object =
                    target
                        .get()
                        .ok_or_else(|| RuntimeError::AttributeOnNonInstance {
                            name: field_name.clone(),
                        })?;
                let Object::Instance(instance) = target_object.as_ref() else {
                    return Err(RuntimeError::AttributeOnNonInstance {
                        name: field_name.clone(),
                    });
                };
                let value = rv.evaluate(closure, context)?;
                instance.fields_mut().insert(field_name.clone(), value.clone());
                Ok(ExecResult::Completed(value))
            }
            Statement::Print { args } => {
                for (index, argument) in args.iter().enumerate() {
                    if index > 0 {
                        write_output(context, " ")?;
                    }
                    let value = argument.evaluate(closure, context)?;
                    value.print(context)?;
                }
                write_output(context, "\n")?;
                Ok(ExecResult::Completed(ObjectHolder::none()))
            }
            Statement::Compound(statements) => {
                for statement in statements {
                    if let ExecResult::Return(value) = statement.execute(closure, context)? {
                        return Ok(ExecResult::Return(value));
                    }
                }
                Ok(ExecResult::Completed(ObjectHolder::none()))
            }
            Statement::IfElse {
                condition,
                if_body,
                else_body,
            } => {
                let condition_value = condition.evaluate(closure, context)?;
                let flag = condition_value
                    .as_bool()
                    .ok_or(RuntimeError::ConditionNotBool)?;
                if flag {
                    if_body.execute(closure, context)
                } else if let Some(else_body) = else_body {
                    else_body.execute(closure, context)
                } else {
                    Ok(ExecResult::Completed(ObjectHolder::none()))
                }
            }
            Statement::Return(expression) => {
                Ok(ExecResult::Return(expression.evaluate(closure, context)?))
            }
            Statement::ClassDefinition(class) => {
                closure.insert(
                    class.name().to_string(),
                    ObjectHolder::own(Object::Class(Rc::clone(class))),
                );
                Ok(ExecResult::Completed(ObjectHolder::none()))
            }
            Statement::MethodBody(body) => match body.execute(closure, context)? {
                ExecResult::Return(value) => Ok(ExecResult::Completed(value)),
                ExecResult::Completed(_) => Ok(ExecResult::Completed(ObjectHolder::none())),
            },
            Statement::Expr(expression) => {
                Ok(ExecResult::Completed(expression.evaluate(closure, context)?))
            }
        }
    }
}

impl Expression {
    pub fn evaluate(
        &self,
        closure: &mut Closure,
        context: &mut dyn Context,
    ) -> Result<ObjectHolder, RuntimeError> {
        match self {
            Expression::Number(value) => Ok(ObjectHolder::own(Object::Number(*value))),
            Expression::String(value) => Ok(ObjectHolder::own(Object::String(value.clone()))),
            Expression::Bool(value) => Ok(ObjectHolder::own(Object::Bool(*value))),
            Expression::None => Ok(ObjectHolder::none()),
            Expression::Variable { dotted_ids } => resolve_dotted(dotted_ids, closure),
            Expression::Add { lhs, rhs } => {
                let (lhs_value, rhs_value) = evaluate_operands(lhs, rhs, closure, context)?;
                let (lhs_object, rhs_object) = require_operands("add", &lhs_value, &rhs_value)?;
                match (lhs_object.as_ref(), rhs_object.as_ref()) {
                    (Object::Number(l), Object::Number(r)) => {
                        Ok(ObjectHolder::own(Object::Number(l.wrapping_add(*r))))
                    }
                    (Object::String(l), Object::String(r)) => {
                        Ok(ObjectHolder::own(Object::String(format!("{l}{r}"))))
                    }
                    (Object::Instance(instance), _) if instance.has_method(ADD_METHOD, 1) => {
                        ClassInstance::call(
                            &lhs_object,
                            ADD_METHOD,
                            slice::from_ref(&rhs_value),
                            context,
                        )
                    }
                    _ => Err(RuntimeError::InvalidOperands { operation: "add" }),
                }
            }
            Expression::Sub { lhs, rhs } => {
                numeric_binary("sub", lhs, rhs, closure, context, |l, r| {
                    Ok(l.wrapping_sub(r))
                })
            }
            Expression::Mult { lhs, rhs } => {
                numeric_binary("mult", lhs, rhs, closure, context, |l, r| {
                    Ok(l.wrapping_mul(r))
                })
            }
            Expression::Div { lhs, rhs } => {
                numeric_binary("div", lhs, rhs, closure, context, |l, r| {
                    if r == 0 {
                        Err(RuntimeError::DivisionByZero)
                    } else {
                        Ok(l.wrapping_div(r))
                    }
                })
            }
            Expression::And { lhs, rhs } => {
                logical_binary("and", lhs, rhs, closure, context, |l, r| l && r)
            }
            Expression::Or { lhs, rhs } => {
                logical_binary("or", lhs, rhs, closure, context, |l, r| l || r)
            }
            Expression::Not(operand) => {
                let value = operand.evaluate(closure, context)?;
                if value.is_empty() {
                    return Err(RuntimeError::NullOperand { operation: "not" });
                }
                let flag = value
                    .as_bool()
                    .ok_or(RuntimeError::InvalidOperands { operation: "not" })?;
                Ok(ObjectHolder::own(Object::Bool(!flag)))
            }
            Expression::Comparison { op, lhs, rhs } => {
                let (lhs_value, rhs_value) = evaluate_operands(lhs, rhs, closure, context)?;
                let result = match op {
                    ComparisonOp::Eq => compare::equal(&lhs_value, &rhs_value, context)?,
                    ComparisonOp::NotEq => compare::not_equal(&lhs_value, &rhs_value, context)?,
                    ComparisonOp::Less => compare::less(&lhs_value, &rhs_value, context)?,
                    ComparisonOp::LessOrEq => {
                        compare::less_or_equal(&lhs_value, &rhs_value, context)?
                    }
                    ComparisonOp::Greater => compare::greater(&lhs_value, &rhs_value, context)?,
                    ComparisonOp::GreaterOrEq => {
                        compare::greater_or_equal(&lhs_value, &rhs_value, context)?
                    }
                };
                Ok(ObjectHolder::own(Object::Bool(result)))
            }
            Expression::NewInstance { class, args } => {
                let actual_args = evaluate_arguments(args, closure, context)?;
                let instance = Rc::new(Object::Instance(ClassInstance::new(Rc::clone(class))));
                if class.has_method(INIT_METHOD, actual_args.len()) {
                    ClassInstance::call(&instance, INIT_METHOD, &actual_args, context)?;
                }
                Ok(ObjectHolder::Own(instance))
            }
            Expression::MethodCall {
                object,
                method,
                args,
            } => {
                let receiver = object.evaluate(closure, context)?;
                let actual_args = evaluate_arguments(args, closure, context)?;
                let receiver_object =
                    receiver
                        .get()
                        .ok_or_else(|| RuntimeError::MethodCallOnNonInstance {
                            method: method.clone(),
                        })?;
                ClassInstance::call(&receiver_object, method, &actual_args, context)
            }
            Expression::Stringify(inner) => {
                let value = inner.evaluate(closure, context)?;
                if value.is_empty() {
                    return Ok(ObjectHolder::own(Object::String("None".to_string())));
                }
                let mut scratch = BufferContext::new();
                value.print(&mut scratch)?;
                Ok(ObjectHolder::own(Object::String(scratch.into_string())))
            }
        }
    }
}

fn evaluate_operands(
    lhs: &Expression,
    rhs: &Expression,
    closure: &mut Closure,
    context: &mut dyn Context,
) -> Result<(ObjectHolder, ObjectHolder), RuntimeError> {
    let lhs_value = lhs.evaluate(closure, context)?;
    let rhs_value = rhs.evaluate(closure, context)?;
    Ok((lhs_value, rhs_value))
}

fn evaluate_arguments(
    args: &[Expression],
    closure: &mut Closure,
    context: &mut dyn Context,
) -> Result<Vec<ObjectHolder>, RuntimeError> {
    let mut values = Vec::with_capacity(args.len());
    for argument in args {
        values.push(argument.evaluate(closure, context)?);
    }
    Ok(values)
}

// Both operands of a binary operator must hold live values before their
// variants are inspected.
fn require_operands(
    operation: &'static str,
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
) -> Result<(Rc<Object>, Rc<Object>), RuntimeError> {
    match (lhs.get(), rhs.get()) {
        (Some(lhs_object), Some(rhs_object)) => Ok((lhs_object, rhs_object)),
        _ => Err(RuntimeError::NullOperand { operation }),
    }
}

fn numeric_binary(
    operation: &'static str,
    lhs: &Expression,
    rhs: &Expression,
    closure: &mut Closure,
    context: &mut dyn Context,
    apply: impl Fn(i32, i32) -> Result<i32, RuntimeError>,
) -> Result<ObjectHolder, RuntimeError> {
    let (lhs_value, rhs_value) = evaluate_operands(lhs, rhs, closure, context)?;
    let (lhs_object, rhs_object) = require_operands(operation, &lhs_value, &rhs_value)?;
    match (lhs_object.as_ref(), rhs_object.as_ref()) {
        (Object::Number(l), Object::Number(r)) => {
            Ok(ObjectHolder::own(Object::Number(apply(*l, *r)?)))
        }
        _ => Err(RuntimeError::InvalidOperands { operation }),
    }
}

// Both sides are always evaluated; there is no short-circuit.
fn logical_binary(
    operation: &'static str,
    lhs: &Expression,
    rhs: &Expression,
    closure: &mut Closure,
    context: &mut dyn Context,
    apply: impl Fn(bool, bool) -> bool,
) -> Result<ObjectHolder, RuntimeError> {
    let (lhs_value, rhs_value) = evaluate_operands(lhs, rhs, closure, context)?;
    let (lhs_object, rhs_object) = require_operands(operation, &lhs_value, &rhs_value)?;
    match (lhs_object.as_ref(), rhs_object.as_ref()) {
        (Object::Bool(l), Object::Bool(r)) => Ok(ObjectHolder::own(Object::Bool(apply(*l, *r)))),
        _ => Err(RuntimeError::InvalidOperands { operation }),
    }
}

fn resolve_dotted(dotted_ids: &[String], closure: &Closure) -> Result<ObjectHolder, RuntimeError> {
    let Some(first) = dotted_ids.first() else {
        return Ok(ObjectHolder::none());
    };
    let mut value = closure
        .get(first)
        .cloned()
        .ok_or_else(|| RuntimeError::UndefinedVariable {
            name: first.clone(),
        })?;
    for name in &dotted_ids[1..] {
        let object = value
            .get()
            .ok_or_else(|| RuntimeError::AttributeOnNonInstance { name: name.clone() })?;
        let Object::Instance(instance) = object.as_ref() else {
            return Err(RuntimeError::AttributeOnNonInstance { name: name.clone() });
        };
        let field = instance.fields().get(name).cloned();
        value = field.ok_or_else(|| RuntimeError::UndefinedVariable { name: name.clone() })?;
    }
    Ok(value)
}
