use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::runtime::class::{Class, ClassInstance, STR_METHOD};
use crate::runtime::context::{Context, write_output};
use crate::runtime::error::RuntimeError;

/// Flat name-to-value mapping, used both as a call frame and as an
/// instance's attribute scope. Assignment is insert-or-overwrite; there is
/// no declaration distinct from assignment and no lexical chaining.
pub type Closure = HashMap<String, ObjectHolder>;

/// The runtime value universe.
#[derive(Debug)]
pub enum Object {
    Number(i32),
    String(String),
    Bool(bool),
    Class(Rc<Class>),
    Instance(ClassInstance),
}

impl Object {
    /// Writes the printed form of a value. An instance with a 0-ary
    /// `__str__` prints through it; any other instance prints its identity.
    pub fn print(object: &Rc<Object>, context: &mut dyn Context) -> Result<(), RuntimeError> {
        match object.as_ref() {
            Object::Number(value) => write_output(context, &value.to_string()),
            Object::String(value) => write_output(context, value),
            Object::Bool(true) => write_output(context, "True"),
            Object::Bool(false) => write_output(context, "False"),
            Object::Class(class) => {
                write_output(context, "Class ")?;
                write_output(context, class.name())
            }
            Object::Instance(instance) => {
                if instance.has_method(STR_METHOD, 0) {
                    let rendered = ClassInstance::call(object, STR_METHOD, &[], context)?;
                    rendered.print(context)
                } else {
                    write_output(context, &format!("{:p}", Rc::as_ptr(object)))
                }
            }
        }
    }
}

/// Uniform reference through which values move between statements.
///
/// `Own` keeps its value alive; `Share` borrows a value owned elsewhere and
/// is only ever created to bind `self`, so an instance's attribute scope
/// can never transitively own the instance itself. The empty handle is the
/// runtime representation of `None`.
#[derive(Debug, Clone, Default)]
pub enum ObjectHolder {
    #[default]
    None,
    Own(Rc<Object>),
    Share(Weak<Object>),
}

impl ObjectHolder {
    pub fn own(object: Object) -> Self {
        ObjectHolder::Own(Rc::new(object))
    }

    /// A non-owning handle over a live value. The share must not outlive
    /// the owning holder; a dangling share behaves as the empty handle.
    pub fn share(object: &Rc<Object>) -> Self {
        ObjectHolder::Share(Rc::downgrade(object))
    }

    pub fn none() -> Self {
        ObjectHolder::None
    }

    pub fn get(&self) -> Option<Rc<Object>> {
        match self {
            ObjectHolder::None => None,
            ObjectHolder::Own(object) => Some(Rc::clone(object)),
            ObjectHolder::Share(object) => object.upgrade(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.get().is_none()
    }

    pub fn as_number(&self) -> Option<i32> {
        match self.get().as_deref() {
            Some(Object::Number(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.get().as_deref() {
            Some(Object::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match self.get().as_deref() {
            Some(Object::String(value)) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn print(&self, context: &mut dyn Context) -> Result<(), RuntimeError> {
        match self.get() {
            Some(object) => Object::print(&object, context),
            None => write_output(context, "None"),
        }
    }
}

/// Truthiness: a true `Bool`, a non-zero `Number` or a non-empty `String`.
/// Everything else, the empty handle included, is false.
pub fn is_true(holder: &ObjectHolder) -> bool {
    match holder.get().as_deref() {
        Some(Object::Bool(value)) => *value,
        Some(Object::Number(value)) => *value != 0,
        Some(Object::String(value)) => !value.is_empty(),
        _ => false,
    }
}
