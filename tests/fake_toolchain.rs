//! End-to-end runs against a scripted stand-in for `go`.
//!
//! The toolchain is `sh`, so `sh build -gcflags=... ./pkg` runs the `build`
//! script placed in the working directory with the real arguments.

#![cfg(unix)]

use gcassert::{AssertionFailure, Config, DirectiveKind, GcAssertError, OutputFormat};
use std::fs;
use std::path::Path;
use std::process::Command;

const SUM_GO: &str = "package pkg

func add(a, b int) int {
	return a + b
}

func Sum(a []int) int {
	x := a[5] //gcassert:bce
	//gcassert:inline
	return add(x, a[4])
}
";

fn workspace(script: &str) -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("pkg")).unwrap();
    fs::write(tmp.path().join("pkg/sum.go"), SUM_GO).unwrap();
    fs::write(tmp.path().join("build"), script).unwrap();
    tmp
}

fn config(dir: &Path) -> Config {
    Config {
        go: "sh".to_string(),
        work_dir: Some(dir.to_path_buf()),
        ..Config::default()
    }
}

async fn run(dir: &Path) -> (gcassert::Result<gcassert::VerifySummary>, Vec<AssertionFailure>) {
    let mut sink: Vec<AssertionFailure> = Vec::new();
    let result = gcassert::verify(&config(dir), "pkg", &mut sink).await;
    (result, sink)
}

#[tokio::test]
async fn test_bounds_check_fails_and_inlined_call_passes() {
    let tmp = workspace(
        "printf '%s\\n' \"$@\" > args.txt
echo '# example.com/m/pkg' >&2
echo './pkg/sum.go:3:6: can inline add with cost 4' >&2
echo './pkg/sum.go:8:8: Found IsInBounds' >&2
echo './pkg/sum.go:10:12: inlining call to add' >&2
",
    );
    let (result, sink) = run(tmp.path()).await;
    let summary = result.unwrap();
    assert_eq!(summary.files, 1);
    assert_eq!(summary.directives, 2);
    assert_eq!(summary.failures, 1);
    assert_eq!(sink.len(), 1);
    assert_eq!(sink[0].directive, DirectiveKind::BoundsCheckElimination);
    assert_eq!(sink[0].to_string(), "pkg/sum.go:8:\tx := a[5]: Found IsInBounds");

    let args = fs::read_to_string(tmp.path().join("args.txt")).unwrap();
    let args: Vec<&str> = args.lines().collect();
    assert_eq!(
        args,
        vec!["-gcflags=all=-m -m -d=ssa/check_bce/debug=1", "./pkg"]
    );
}

#[tokio::test]
async fn test_missing_inline_evidence_is_reported_after_build() {
    let tmp = workspace("echo './pkg/sum.go:3:6: can inline add with cost 4'\n");
    let (result, sink) = run(tmp.path()).await;
    assert_eq!(result.unwrap().failures, 1);
    assert_eq!(
        sink[0].to_string(),
        "pkg/sum.go:10:\treturn add(x, a[4]): call was not inlined"
    );
}

#[tokio::test]
async fn test_clean_build_reports_nothing() {
    let tmp = workspace("echo './pkg/sum.go:10:12: inlining call to add' >&2\n");
    let (result, sink) = run(tmp.path()).await;
    assert!(result.unwrap().passed());
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_failed_build_is_an_error_and_skips_sweep() {
    let tmp = workspace(
        "echo './pkg/sum.go:8:8: Found IsInBounds' >&2
echo './pkg/sum.go:12:1: syntax error' >&2
exit 1
",
    );
    let (result, sink) = run(tmp.path()).await;
    assert!(matches!(result, Err(GcAssertError::BuildFailed { .. })));
    // The eager bounds-check report stays; no inline report follows.
    assert_eq!(sink.len(), 1);
    assert_eq!(sink[0].directive, DirectiveKind::BoundsCheckElimination);
}

#[tokio::test]
async fn test_missing_toolchain_is_a_spawn_error() {
    let tmp = workspace("");
    let config = Config {
        go: "gcassert-missing-go".to_string(),
        ..config(tmp.path())
    };
    let mut sink: Vec<AssertionFailure> = Vec::new();
    let result = gcassert::verify(&config, "pkg", &mut sink).await;
    assert!(matches!(result, Err(GcAssertError::Spawn { .. })));
}

#[test]
fn test_blocking_entry_point_writes_json() {
    let tmp = workspace("echo './pkg/sum.go:8:8: Found IsInBounds' >&2\n");
    let config = Config {
        format: OutputFormat::Json,
        ..config(tmp.path())
    };
    let mut out = Vec::new();
    let summary = gcassert::gcassert(&config, "pkg", &mut out).unwrap();
    assert_eq!(summary.failures, 2);

    let lines: Vec<serde_json::Value> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["directive"], "bounds_check_elimination");
    assert_eq!(lines[1]["message"], "call was not inlined");
}

#[test]
fn test_cli_exit_codes() {
    let tmp = workspace("echo './pkg/sum.go:8:8: Found IsInBounds' >&2\n");
    let output = Command::new(env!("CARGO_BIN_EXE_gcassert"))
        .args(["verify", "--go", "sh", "--work-dir"])
        .arg(tmp.path())
        .arg("pkg")
        .env_remove("GCASSERT_GO")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("pkg/sum.go:8:\tx := a[5]: Found IsInBounds\n"));

    let output = Command::new(env!("CARGO_BIN_EXE_gcassert"))
        .args(["verify", "--go", "gcassert-missing-go", "--work-dir"])
        .arg(tmp.path())
        .arg("pkg")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_list() {
    let tmp = workspace("");
    let output = Command::new(env!("CARGO_BIN_EXE_gcassert"))
        .args(["list", "--work-dir"])
        .arg(tmp.path())
        .arg("pkg")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "pkg/sum.go:8:\tx := a[5]: bce\npkg/sum.go:10:\treturn add(x, a[4]): inline\n"
    );
}

#[tokio::test]
async fn test_large_output_on_both_pipes_with_single_slot_channel() {
    // Each pipe carries well over a 64 KiB pipe buffer.
    let tmp = workspace(
        "pad=$(printf '%0512d' 0)
i=0
while [ $i -lt 2000 ]; do
  echo './pkg/sum.go:8:8: Found IsInBounds'
  echo \"progress $pad\"
  echo './pkg/sum.go:8:9: Found IsInBounds' >&2
  i=$((i+1))
done
echo './pkg/sum.go:10:12: inlining call to add' >&2
",
    );
    let config = Config {
        channel_capacity: 1,
        ..config(tmp.path())
    };
    let mut sink: Vec<AssertionFailure> = Vec::new();
    let summary = gcassert::verify(&config, "pkg", &mut sink).await.unwrap();
    assert_eq!(summary.failures, 4000);
    assert_eq!(sink.len(), 4000);
    assert!(sink
        .iter()
        .all(|f| f.directive == DirectiveKind::BoundsCheckElimination && f.line == 8));
}

#[test]
fn test_repeated_runs_write_identical_output() {
    let tmp = workspace(
        "echo './pkg/sum.go:8:8: Found IsInBounds' >&2
echo './pkg/sum.go:8:12: Found SliceIsInBounds' >&2
",
    );
    let run_once = || {
        let mut out = Vec::new();
        let summary = gcassert::gcassert(&config(tmp.path()), "pkg", &mut out).unwrap();
        assert_eq!(summary.failures, 3);
        out
    };
    let first = run_once();
    let second = run_once();
    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_eq!(
        String::from_utf8(first).unwrap(),
        "pkg/sum.go:8:\tx := a[5]: Found IsInBounds\n\
         pkg/sum.go:8:\tx := a[5]: Found SliceIsInBounds\n\
         pkg/sum.go:10:\treturn add(x, a[4]): call was not inlined\n"
    );
}
