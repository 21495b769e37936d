mod compiler;

pub use compiler::{
    Artifacts, CompilationSession, Compiler, CompilerBuilder, Pass, check_pipeline, emit_pipeline,
    fold_cps, lower_cps, parse_source, read_source, typecheck,
};
