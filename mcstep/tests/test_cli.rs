use std::process::Command;

fn mcstep() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mcstep"))
}

const TRACE: &str = r#"{"kind":"session","pid":99,"version":"0.1.0","started_unix_ms":1,"field_samples":false,"max_samples":1000}
{"kind":"event","event":0,"steps":40,"field_calls":12,"max_field_magnitude":0.2,"elapsed_us":2000}
{"kind":"event","event":1,"steps":60,"field_calls":8,"max_field_magnitude":0.4,"elapsed_us":5000}
"#;

#[test]
fn test_sites_lists_every_symbol() {
    let output = mcstep().arg("sites").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for site in mcstep_intercept::CALL_SITES {
        assert!(stdout.contains(site.symbol), "missing {}", site.symbol);
    }
}

#[test]
fn test_report_prints_totals() {
    let dir = tempfile::tempdir().unwrap();
    let trace = dir.path().join("steps.jsonl");
    std::fs::write(&trace, TRACE).unwrap();

    let output = mcstep().arg("report").arg(&trace).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Events:        2"));
    assert!(stdout.contains("Steps:         100 (mean 50.0 per event)"));
    assert!(stdout.contains("Busiest event: event#1 with 60 steps"));
    assert!(stdout.contains("Field calls:   20"));
}

#[test]
fn test_export_writes_chrome_trace() {
    let dir = tempfile::tempdir().unwrap();
    let trace = dir.path().join("steps.jsonl");
    let chrome = dir.path().join("trace.json");
    std::fs::write(&trace, TRACE).unwrap();

    let status = mcstep().arg("export").arg(&trace).arg("--chrome").arg(&chrome).status().unwrap();
    assert!(status.success());

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&chrome).unwrap()).unwrap();
    let spans = json["traceEvents"].as_array().unwrap().iter().filter(|e| e["ph"] == "X").count();
    assert_eq!(spans, 2);
}

#[test]
fn test_report_missing_trace_fails() {
    let output = mcstep().args(["report", "/nonexistent/steps.jsonl"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn test_check_without_hooks_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let lib = dir.path().join("libnothing.so");
    std::fs::write(&lib, b"not an object file").unwrap();

    let output = mcstep().arg("check").arg(&lib).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_run_with_missing_preload_fails_before_launch() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("launched");

    let output = mcstep()
        .args(["run", "--preload", "/nonexistent/libmcstep_intercept.so", "--", "touch"])
        .arg(&marker)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Preload library not found"));
    assert!(!marker.exists());
}

#[test]
fn test_usage_error_exits_two() {
    let output = mcstep().arg("frobnicate").output().unwrap();
    assert_eq!(output.status.code(), Some(2));

    let output = mcstep().args(["run", "--max-samples", "5", "--", "true"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[cfg(target_os = "linux")]
#[test]
fn test_attached_reports_absent_library() {
    // The test runner itself never has the preload library mapped
    let pid = std::process::id().to_string();
    let output = mcstep().args(["attached", "--pid", &pid]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("is not loaded"));
}
