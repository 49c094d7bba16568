use std::{io, io::Read, ops::Range, path::PathBuf, sync::Arc};

use float_pretty_print::PrettyPrintFloat;
use miette::{IntoDiagnostic, LabeledSpan, NamedSource, miette};
use sumprod::{
    command::Command,
    hook::TracingHook,
    interpreter::Interpreter,
    tensor::Tensor,
    text::{HasParser, ToDoc},
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use winnow::{LocatingSlice, Parser};

/// Evaluator for sum-product contraction terms
#[derive(clap::Parser)]
struct Args {
    /// File name to run, read from stdin if absent
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,
    /// Keep balanced contractions symbolic until the result is materialised
    #[arg(long)]
    lazy: bool,
    /// Log every contraction rewrite to stderr
    #[arg(long)]
    trace: bool,
    /// Line width used when printing terms
    #[arg(long, default_value_t = 80)]
    width: usize,
}

fn run(args: &Args, src: &str) -> miette::Result<()> {
    let parsed = Command::<Range<usize>>::parser
        .parse(LocatingSlice::new(src))
        .map_err(|e| {
            miette!(
                labels = vec![LabeledSpan::at_offset(e.offset(), "here")],
                "could not parse program: {}",
                e.inner()
            )
        })?;
    tracing::debug!(bindings = parsed.bindings.len(), "parsed program");

    let mut interp = if args.lazy {
        Interpreter::lazy()
    } else {
        Interpreter::eager()
    };
    if args.trace {
        interp = interp.with_hook(Arc::new(TracingHook));
    }

    let (_env, term) = parsed.check(&interp).map_err(|e| {
        miette!(
            labels = vec![LabeledSpan::at(e.span().clone(), "in this term")],
            "{e}"
        )
    })?;
    println!("{}", term.to_doc().pretty(args.width));

    let tensor = interp.materialize(&term).into_diagnostic()?;
    print_entries(&tensor);
    Ok(())
}

fn print_entries(tensor: &Tensor) {
    let names: Vec<_> = tensor.inputs().keys().collect();
    for (index, value) in tensor.entries() {
        if names.is_empty() {
            println!("{}", PrettyPrintFloat(value));
            continue;
        }
        let position = names
            .iter()
            .zip(&index)
            .map(|(name, i)| format!("{name}={i}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("[{position}] {}", PrettyPrintFloat(value));
    }
}

fn main() -> miette::Result<()> {
    let args: Args = clap::Parser::parse();

    if args.trace {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr))
            .with(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
            .init();
    }

    let (name, src) = if let Some(path) = &args.file {
        (
            path.display().to_string(),
            std::fs::read_to_string(path).into_diagnostic()?,
        )
    } else {
        let mut s = String::new();
        io::stdin().read_to_string(&mut s).into_diagnostic()?;
        ("<stdin>".to_owned(), s)
    };

    run(&args, &src).map_err(|report| report.with_source_code(NamedSource::new(name, src.clone())))
}
