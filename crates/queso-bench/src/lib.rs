//! Program builders shared by the queso benchmarks.
//!
//! Each builder returns source text sized by its argument, so benchmarks can
//! sweep small/medium/large inputs without checked-in fixture files.

/// A chain of definitions where each one calls its predecessor:
/// `f0` adds one, `f{i}` applies `f{i-1}` to `(+ x i)`.
pub fn call_chain_source(definitions: usize) -> String {
    let mut source = String::from("(define f0 (λ (x) (+ x 1)))\n");
    for idx in 1..definitions.max(1) {
        source.push_str(&format!(
            "(define f{idx} (λ (x) (f{} (+ x {idx}))))\n",
            idx - 1
        ));
    }
    source
}

/// A single operator chain with `operands` literal operands after `x`.
pub fn wide_addition_source(operands: usize) -> String {
    let mut source = String::from("(define wide (λ (x) (+ x");
    for idx in 0..operands.max(1) {
        source.push_str(&format!(" {}", idx + 1));
    }
    source.push_str(")))\n");
    source
}

/// A balanced addition tree over literals with `2^depth` leaves. Folding
/// collapses the whole body to one number.
pub fn nested_addition_source(depth: usize) -> String {
    fn tree(depth: usize, next: &mut u32) -> String {
        if depth == 0 {
            *next += 1;
            return next.to_string();
        }
        let left = tree(depth - 1, next);
        let right = tree(depth - 1, next);
        format!("(+ {left} {right})")
    }

    let mut next = 0;
    format!("(define total (λ () {}))\n", tree(depth, &mut next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use queso_ast::FileId;

    #[test]
    fn generated_sources_parse() {
        for source in [
            call_chain_source(3),
            wide_addition_source(4),
            nested_addition_source(3),
        ] {
            queso_syntax::parse_module_source(&source, FileId(0))
                .expect("builder output should parse");
        }
    }

    #[test]
    fn nested_addition_counts_leaves() {
        let source = nested_addition_source(2);
        assert_eq!(source, "(define total (λ () (+ (+ 1 2) (+ 3 4))))\n");
    }
}
