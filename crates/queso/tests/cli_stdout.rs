use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static TEMP_NONCE: AtomicU64 = AtomicU64::new(0);

fn queso_bin() -> PathBuf {
    if let Some(path) = option_env!("CARGO_BIN_EXE_queso") {
        return PathBuf::from(path);
    }

    let mut exe = std::env::current_exe().expect("test executable path should be known");
    exe.pop();
    if exe.file_name().and_then(|name| name.to_str()) == Some("deps") {
        exe.pop();
    }
    exe.join("queso")
}

fn temp_source_path(prefix: &str) -> PathBuf {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should move forward")
        .as_nanos();
    let counter = TEMP_NONCE.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("{prefix}-{timestamp}-{counter}.queso"))
}

#[test]
fn queso_check_prints_definition_schemes() {
    let source = "(define id (λ (x) x))\n(define call (λ (f x) (f x)))\n";
    let path = temp_source_path("queso-cli-schemes");
    std::fs::write(&path, source).expect("temp source write should succeed");

    let output = Command::new(queso_bin())
        .arg("check")
        .arg(&path)
        .output()
        .expect("queso check should execute");

    let _ = std::fs::remove_file(path);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("id : ∀ a. a -> a"),
        "expected the identity scheme in stdout, got: {stdout}"
    );
    assert!(
        stdout.contains("call : ∀ a b. (a -> b, a) -> b"),
        "expected the apply scheme in stdout, got: {stdout}"
    );
}

#[test]
fn queso_check_trace_prints_unification_steps() {
    let source = "(define inc (λ (x) (+ x 1)))\n";
    let path = temp_source_path("queso-cli-trace");
    std::fs::write(&path, source).expect("temp source write should succeed");

    let output = Command::new(queso_bin())
        .arg("check")
        .arg(&path)
        .arg("--trace")
        .output()
        .expect("queso check should execute");

    let _ = std::fs::remove_file(path);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("bind"),
        "expected bind steps in the trace, got: {stdout}"
    );
}

#[test]
fn queso_emit_prints_the_folded_cps() {
    let source = "(define ten (λ () (+ (+ 1 2) (+ 3 4))))\n";
    let path = temp_source_path("queso-cli-emit");
    std::fs::write(&path, source).expect("temp source write should succeed");

    let output = Command::new(queso_bin())
        .arg("emit")
        .arg(&path)
        .output()
        .expect("queso emit should execute");

    let _ = std::fs::remove_file(path);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("(fix ((ten (@@k-0) (app @@k-0 (10)))) (app main ()))"),
        "expected the folded program in stdout, got: {stdout}"
    );
}

#[test]
fn queso_check_reports_errors_on_stderr() {
    let source = "(define broken (λ (x) (+ x #t)))\n";
    let path = temp_source_path("queso-cli-error");
    std::fs::write(&path, source).expect("temp source write should succeed");

    let output = Command::new(queso_bin())
        .arg("check")
        .arg(&path)
        .output()
        .expect("queso check should execute");

    let _ = std::fs::remove_file(path);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Expected number, found boolean"),
        "expected the mismatch diagnostic on stderr, got: {stderr}"
    );
}
