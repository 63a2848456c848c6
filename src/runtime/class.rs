use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::Statement;
use crate::interpreter::ExecResult;
use crate::runtime::context::Context;
use crate::runtime::error::RuntimeError;
use crate::runtime::object::{Closure, Object, ObjectHolder};

pub(crate) const SELF_NAME: &str = "self";
pub(crate) const STR_METHOD: &str = "__str__";
pub(crate) const EQ_METHOD: &str = "__eq__";
pub(crate) const LT_METHOD: &str = "__lt__";

/// A named method: formal parameters (`self` excluded) and an AST body.
#[derive(Debug)]
pub struct Method {
    pub name: String,
    pub formal_params: Vec<String>,
    pub body: Statement,
}

/// Immutable class descriptor.
///
/// The lookup table is precomputed at construction by copying the parent's
/// table and overriding by name, so method resolution never walks the
/// inheritance chain. Methods are stored behind `Rc` to keep that copy
/// cheap.
#[derive(Debug)]
pub struct Class {
    name: String,
    parent: Option<Rc<Class>>,
    method_table: HashMap<String, Rc<Method>>,
}

impl Class {
    pub fn new(name: String, methods: Vec<Method>, parent: Option<Rc<Class>>) -> Self {
        let mut method_table = match &parent {
            Some(parent) => parent.method_table.clone(),
            None => HashMap::new(),
        };
        for method in methods {
            method_table.insert(method.name.clone(), Rc::new(method));
        }
        Self {
            name,
            parent,
            method_table,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Rc<Class>> {
        self.parent.as_ref()
    }

    pub fn method(&self, name: &str) -> Option<&Rc<Method>> {
        self.method_table.get(name)
    }

    pub fn has_method(&self, name: &str, argument_count: usize) -> bool {
        self.method(name)
            .is_some_and(|method| method.formal_params.len() == argument_count)
    }
}

/// A class instance: the class reference plus a mutable attribute scope,
/// shared between the binding that owns the instance and the `self` of any
/// method executing on it.
#[derive(Debug)]
pub struct ClassInstance {
    class: Rc<Class>,
    fields: RefCell<Closure>,
}

impl ClassInstance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: RefCell::new(Closure::new()),
        }
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    pub fn fields(&self) -> Ref<'_, Closure> {
        self.fields.borrow()
    }

    pub fn fields_mut(&self) -> RefMut<'_, Closure> {
        self.fields.borrow_mut()
    }

    pub fn has_method(&self, name: &str, argument_count: usize) -> bool {
        self.class.has_method(name, argument_count)
    }

    /// Invokes `method_name` on the instance held by `receiver`.
    ///
    /// A fresh call frame binds `self` as a share of the receiver and each
    /// formal parameter to its actual argument; the body then executes
    /// against that frame. The share lives only as long as the frame, so
    /// the call never extends the instance's lifetime.
    pub fn call(
        receiver: &Rc<Object>,
        method_name: &str,
        actual_args: &[ObjectHolder],
        context: &mut dyn Context,
    ) -> Result<ObjectHolder, RuntimeError> {
        let Object::Instance(instance) = receiver.as_ref() else {
            return Err(RuntimeError::MethodCallOnNonInstance {
                method: method_name.to_string(),
            });
        };
        let method = instance
            .class
            .method(method_name)
            .filter(|method| method.formal_params.len() == actual_args.len())
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownMethod {
                class: instance.class.name().to_string(),
                method: method_name.to_string(),
                argument_count: actual_args.len(),
            })?;

        let mut frame = Closure::new();
        frame.insert(SELF_NAME.to_string(), ObjectHolder::share(receiver));
        for (param, arg) in method.formal_params.iter().zip(actual_args) {
            frame.insert(param.clone(), arg.clone());
        }
        match method.body.execute(&mut frame, context)? {
            ExecResult::Completed(value) | ExecResult::Return(value) => Ok(value),
        }
    }
}
