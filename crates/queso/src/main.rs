use std::fs;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(test)]
use std::time::{SystemTime, UNIX_EPOCH};

use queso::{Artifacts, CompilationSession, check_pipeline, emit_pipeline};
use queso_ast::ItemKind;
use queso_diag::Diagnostic;

#[cfg(test)]
static TEMP_NONCE: AtomicU64 = AtomicU64::new(0);

fn main() {
    if let Err(message) = run() {
        eprintln!("{message}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = std::env::args().collect::<Vec<_>>();
    let command = parse_cli(&args)?;

    match command {
        Command::Check { input, trace } => check_file(&input, trace),
        Command::Emit { input, output } => emit_file(&input, output.as_deref()),
    }
}

fn check_file(input: &Path, trace: bool) -> Result<(), String> {
    let mut session = CompilationSession::new();
    session.tracing = trace;
    let mut artifacts = Artifacts::for_path(input.to_path_buf());

    check_pipeline()
        .run(&mut session, &mut artifacts)
        .map_err(|err| format_diagnostics("check failed", err.diagnostics()))?;

    for line in rendered_definitions(&artifacts)? {
        println!("{line}");
    }

    if trace && !session.trace.is_empty() {
        println!();
        for step in &session.trace {
            // Step numbering restarts at 1 for each definition.
            println!(
                "{:>4}  {:<12} {} ~ {}  ({})",
                step.step,
                step.action.label(),
                step.left,
                step.right,
                step.detail
            );
        }
    }

    Ok(())
}

fn emit_file(input: &Path, output: Option<&Path>) -> Result<(), String> {
    let mut session = CompilationSession::new();
    let mut artifacts = Artifacts::for_path(input.to_path_buf());

    emit_pipeline()
        .run(&mut session, &mut artifacts)
        .map_err(|err| format_diagnostics("emit failed", err.diagnostics()))?;

    let cps = artifacts.cps().map_err(|err| err.to_string())?;
    match output {
        Some(path) => {
            fs::write(path, format!("{cps}\n"))
                .map_err(|err| format!("failed to write `{}`: {err}", path.display()))?;
            println!("wrote `{}`", path.display());
        }
        None => println!("{cps}"),
    }

    Ok(())
}

/// One `name : scheme` line per definition, in source order.
fn rendered_definitions(artifacts: &Artifacts) -> Result<Vec<String>, String> {
    let module = artifacts.ast().map_err(|err| err.to_string())?;
    let valenv = artifacts.valenv().map_err(|err| err.to_string())?;

    Ok(module
        .items
        .iter()
        .map(|item| {
            let ItemKind::Define { name, .. } = &item.node;
            let rendered = valenv
                .lookup(&name.node)
                .map(|ty| ty.to_string())
                .unwrap_or_else(|| "?".to_string());
            format!("{} : {rendered}", name.node)
        })
        .collect())
}

fn format_diagnostics(prefix: &str, diagnostics: &[Diagnostic]) -> String {
    if diagnostics.is_empty() {
        return prefix.to_string();
    }

    let rendered = diagnostics
        .iter()
        .map(|d| format!("  - {d}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{prefix}:\n{rendered}")
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Check { input: PathBuf, trace: bool },
    Emit { input: PathBuf, output: Option<PathBuf> },
}

fn parse_cli(args: &[String]) -> Result<Command, String> {
    if args.len() < 3 {
        return Err(usage());
    }

    match args[1].as_str() {
        "check" => {
            let input = PathBuf::from(&args[2]);
            let mut trace = false;

            for arg in &args[3..] {
                match arg.as_str() {
                    "--trace" => trace = true,
                    unknown => {
                        return Err(format!("unknown argument `{unknown}`\n{}", usage()));
                    }
                }
            }

            Ok(Command::Check { input, trace })
        }
        "emit" => {
            let input = PathBuf::from(&args[2]);
            let mut output = None;

            let mut idx = 3;
            while idx < args.len() {
                match args[idx].as_str() {
                    "-o" | "--output" => {
                        if idx + 1 >= args.len() {
                            return Err("missing value for --output".to_string());
                        }
                        output = Some(PathBuf::from(&args[idx + 1]));
                        idx += 2;
                    }
                    unknown => {
                        return Err(format!("unknown argument `{unknown}`\n{}", usage()));
                    }
                }
            }

            Ok(Command::Emit { input, output })
        }
        _ => Err(usage()),
    }
}

fn usage() -> String {
    "usage:\n  queso check <file.queso> [--trace]\n  queso emit <file.queso> [-o output]".to_string()
}
