//! Comparator functions behind the comparison operators.
//!
//! `equal` and `less` carry the real logic: built-in variants compare by
//! value, a class instance on the left falls back to its `__eq__`/`__lt__`.
//! The other four operators are derived, which admits asymmetric total
//! orders when only `__lt__` is defined.

use std::slice;

use crate::runtime::class::{ClassInstance, EQ_METHOD, LT_METHOD};
use crate::runtime::context::Context;
use crate::runtime::error::RuntimeError;
use crate::runtime::object::{Object, ObjectHolder};

pub fn equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    if lhs.is_empty() && rhs.is_empty() {
        return Ok(true);
    }
    if let (Some(lhs_object), Some(rhs_object)) = (lhs.get(), rhs.get()) {
        match (lhs_object.as_ref(), rhs_object.as_ref()) {
            (Object::Number(l), Object::Number(r)) => return Ok(l == r),
            (Object::Bool(l), Object::Bool(r)) => return Ok(l == r),
            (Object::String(l), Object::String(r)) => return Ok(l == r),
            _ => {}
        }
    }
    if let Some(result) = dispatch_dunder(lhs, rhs, EQ_METHOD, context)? {
        return Ok(result);
    }
    Err(RuntimeError::UnsupportedComparison {
        operation: "equality",
    })
}

pub fn less(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    if let (Some(lhs_object), Some(rhs_object)) = (lhs.get(), rhs.get()) {
        match (lhs_object.as_ref(), rhs_object.as_ref()) {
            (Object::Number(l), Object::Number(r)) => return Ok(l < r),
            (Object::Bool(l), Object::Bool(r)) => return Ok(l < r),
            (Object::String(l), Object::String(r)) => return Ok(l < r),
            _ => {}
        }
    }
    if let Some(result) = dispatch_dunder(lhs, rhs, LT_METHOD, context)? {
        return Ok(result);
    }
    Err(RuntimeError::UnsupportedComparison {
        operation: "ordering",
    })
}

pub fn not_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    Ok(!equal(lhs, rhs, context)?)
}

pub fn greater(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    Ok(!less(lhs, rhs, context)? && !equal(lhs, rhs, context)?)
}

pub fn less_or_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    Ok(less(lhs, rhs, context)? || equal(lhs, rhs, context)?)
}

pub fn greater_or_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    Ok(!less(lhs, rhs, context)?)
}

fn dispatch_dunder(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    method: &'static str,
    context: &mut dyn Context,
) -> Result<Option<bool>, RuntimeError> {
    let Some(lhs_object) = lhs.get() else {
        return Ok(None);
    };
    let Object::Instance(instance) = lhs_object.as_ref() else {
        return Ok(None);
    };
    if !instance.has_method(method, 1) {
        return Ok(None);
    }
    let result = ClassInstance::call(&lhs_object, method, slice::from_ref(rhs), context)?;
    match result.as_bool() {
        Some(value) => Ok(Some(value)),
        None => Err(RuntimeError::NonBoolComparisonResult { method }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::context::BufferContext;

    fn number(value: i32) -> ObjectHolder {
        ObjectHolder::own(Object::Number(value))
    }

    fn text(value: &str) -> ObjectHolder {
        ObjectHolder::own(Object::String(value.to_string()))
    }

    fn flag(value: bool) -> ObjectHolder {
        ObjectHolder::own(Object::Bool(value))
    }

    #[test]
    fn numbers_compare_by_value() {
        let mut context = BufferContext::new();
        assert!(equal(&number(3), &number(3), &mut context).unwrap());
        assert!(!equal(&number(3), &number(4), &mut context).unwrap());
        assert!(less(&number(3), &number(4), &mut context).unwrap());
        assert!(!less(&number(4), &number(3), &mut context).unwrap());
    }

    #[test]
    fn strings_compare_lexicographically() {
        let mut context = BufferContext::new();
        assert!(less(&text("abc"), &text("abd"), &mut context).unwrap());
        assert!(less(&text("ab"), &text("abc"), &mut context).unwrap());
        assert!(equal(&text("same"), &text("same"), &mut context).unwrap());
    }

    #[test]
    fn bools_compare_numerically() {
        let mut context = BufferContext::new();
        assert!(less(&flag(false), &flag(true), &mut context).unwrap());
        assert!(!less(&flag(true), &flag(false), &mut context).unwrap());
        assert!(equal(&flag(true), &flag(true), &mut context).unwrap());
    }

    #[test]
    fn empty_handles_are_equal_to_each_other() {
        let mut context = BufferContext::new();
        assert!(equal(&ObjectHolder::none(), &ObjectHolder::none(), &mut context).unwrap());
        let err = equal(&ObjectHolder::none(), &number(1), &mut context)
            .expect_err("one-sided None must fail");
        assert_eq!(
            err,
            RuntimeError::UnsupportedComparison {
                operation: "equality"
            }
        );
    }

    #[test]
    fn mixed_builtin_variants_do_not_compare() {
        let mut context = BufferContext::new();
        assert!(equal(&number(1), &text("1"), &mut context).is_err());
        assert!(less(&flag(true), &number(2), &mut context).is_err());
    }

    #[test]
    fn derived_operators_follow_equal_and_less() {
        let mut context = BufferContext::new();
        let (a, b) = (number(2), number(5));
        assert!(not_equal(&a, &b, &mut context).unwrap());
        assert!(!not_equal(&a, &number(2), &mut context).unwrap());
        assert!(greater(&b, &a, &mut context).unwrap());
        assert!(!greater(&a, &a, &mut context).unwrap());
        assert!(less_or_equal(&a, &a, &mut context).unwrap());
        assert!(less_or_equal(&a, &b, &mut context).unwrap());
        assert!(greater_or_equal(&b, &a, &mut context).unwrap());
        assert!(greater_or_equal(&a, &a, &mut context).unwrap());
        assert!(!greater_or_equal(&a, &b, &mut context).unwrap());
    }

    #[test]
    fn ordering_of_equal_values_is_antisymmetric() {
        let mut context = BufferContext::new();
        let (a, b) = (number(3), number(3));
        assert!(equal(&a, &b, &mut context).unwrap());
        assert!(!less(&a, &b, &mut context).unwrap());
        assert!(!less(&b, &a, &mut context).unwrap());
    }
}
