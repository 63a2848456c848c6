use std::io::{self, Write};

use crate::runtime::error::RuntimeError;

/// The single point through which evaluation touches the outside world.
pub trait Context {
    fn output(&mut self) -> &mut dyn Write;
}

/// Production context: program output goes to stdout.
pub struct StandardContext {
    output: io::Stdout,
}

impl StandardContext {
    pub fn new() -> Self {
        Self {
            output: io::stdout(),
        }
    }
}

impl Default for StandardContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Context for StandardContext {
    fn output(&mut self) -> &mut dyn Write {
        &mut self.output
    }
}

/// In-memory context: the scratch target of `str(...)` and the capture
/// target of tests.
#[derive(Default)]
pub struct BufferContext {
    output: Vec<u8>,
}

impl BufferContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_string(self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Context for BufferContext {
    fn output(&mut self) -> &mut dyn Write {
        &mut self.output
    }
}

pub(crate) fn write_output(context: &mut dyn Context, text: &str) -> Result<(), RuntimeError> {
    context
        .output()
        .write_all(text.as_bytes())
        .map_err(|error| RuntimeError::Output {
            message: error.to_string(),
        })
}
