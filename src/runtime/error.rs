use thiserror::Error;

/// Typed errors raised during evaluation. All of them are fatal for the
/// current run; nothing is recovered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Variable '{name}' is not found")]
    UndefinedVariable { name: String },
    #[error("Cannot access attribute '{name}' on a value that is not a class instance")]
    AttributeOnNonInstance { name: String },
    #[error("Method '{method}' called on a value that is not a class instance")]
    MethodCallOnNonInstance { method: String },
    #[error("Class '{class}' has no method '{method}' taking {argument_count} arguments")]
    UnknownMethod {
        class: String,
        method: String,
        argument_count: usize,
    },
    #[error("Null in {operation} operation")]
    NullOperand { operation: &'static str },
    #[error("Invalid {operation} operands")]
    InvalidOperands { operation: &'static str },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Cannot compare objects for {operation}")]
    UnsupportedComparison { operation: &'static str },
    #[error("Method '{method}' must return a Bool")]
    NonBoolComparisonResult { method: &'static str },
    #[error("If condition must evaluate to a Bool")]
    ConditionNotBool,
    #[error("Return outside of a method body")]
    ReturnOutsideMethod,
    #[error("Failed to write program output: {message}")]
    Output { message: String },
}
