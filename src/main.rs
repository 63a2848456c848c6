use std::fs;
use std::io::{self, Read};

use anyhow::{Context as _, Result, bail};
use minipy::interpreter;
use minipy::parser;
use minipy::runtime::context::StandardContext;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let input_path = args.next();
    if args.next().is_some() {
        bail!("Only one input file is supported");
    }

    let source = match &input_path {
        Some(path) => fs::read_to_string(path).with_context(|| format!("Reading {path}"))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Reading stdin")?;
            buffer
        }
    };

    let program = parser::parse(&source)?;
    let mut context = StandardContext::new();
    interpreter::run_program(&program, &mut context)?;
    Ok(())
}
