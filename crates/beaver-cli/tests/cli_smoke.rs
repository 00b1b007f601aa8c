use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

const RECORD_RULEBOOK: &str = r#"
[[class]]
name = "Base"
fallback = { constant = 10 }

[[class]]
name = "Record"
parent = "Base"
fields = { x = 42 }
operations = { describe = { constant = "a record" } }

[[class.rule]]
label = "reader"
match = { regex = "^get_(?P<attr>[a-z_]+)$" }
produce = { field = "{attr}", default = 0 }

[[class.rule]]
label = "writer"
match = { prefix = "set_" }
produce = { set_field = "{rest}" }

[[class.rule]]
label = "thrower"
match = { regex = "^frob" }
produce = { fail = "{operation} is not supported" }
"#;

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "beaver-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path.join(name);
        fs::write(&path, contents).expect("fixture should be written");
        path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn run_beaver<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_beaver");
    Command::new(bin)
        .args(args)
        .env_remove("BEAVER_LOG")
        .output()
        .expect("beaver command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout should be valid JSON ({e})\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        )
    })
}

fn record_rulebook(tmp: &TempDirGuard) -> String {
    tmp.write("record.toml", RECORD_RULEBOOK)
        .display()
        .to_string()
}

#[test]
fn call_json_reports_installs_and_fallbacks() {
    let tmp = TempDirGuard::new("call-json");
    let rulebook = record_rulebook(&tmp);

    let output = run_beaver([
        "call",
        rulebook.as_str(),
        "Record",
        "get_x",
        "set_x:[7]",
        "get_x",
        "describe",
        "GetX",
        "--json",
    ]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);

    assert_eq!(payload["class"], "Record");
    assert_eq!(payload["failed"], 0);
    let calls = payload["calls"].as_array().expect("calls array");
    assert_eq!(calls.len(), 5);

    assert_eq!(calls[0]["operation"], "get_x");
    assert_eq!(calls[0]["status"], "ok");
    assert_eq!(calls[0]["result"], 42);
    assert_eq!(calls[0]["installed"], true);
    assert_eq!(calls[0]["origin"], "synthesized");

    assert_eq!(calls[1]["args"], serde_json::json!([7]));
    assert_eq!(calls[1]["result"], 7);

    assert_eq!(calls[2]["result"], 7);
    assert_eq!(calls[2]["installed"], false);

    assert_eq!(calls[3]["result"], "a record");
    assert_eq!(calls[3]["origin"], "native");

    assert_eq!(calls[4]["result"], 10);
    assert_eq!(calls[4]["installed"], false);
    assert_eq!(calls[4]["origin"], Value::Null);
}

#[test]
fn failing_calls_exit_two_and_keep_going() {
    let tmp = TempDirGuard::new("call-fail");
    let rulebook = tmp.write(
        "strict.toml",
        r#"
        [[class]]
        name = "Strict"

        [[class.rule]]
        match = { exact = "known" }
        produce = { constant = "yes" }

        [[class.rule]]
        match = { regex = "^frob" }
        produce = { fail = "{operation} is not supported" }
        "#,
    );

    let output = run_beaver([
        OsStr::new("call"),
        rulebook.as_os_str(),
        OsStr::new("Strict"),
        OsStr::new("unknown"),
        OsStr::new("frobnicate"),
        OsStr::new("known"),
        OsStr::new("--json"),
    ]);
    assert_eq!(output.status.code(), Some(2));
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["failed"], 2);
    let calls = payload["calls"].as_array().expect("calls array");
    assert_eq!(calls[0]["status"], "error");
    assert_eq!(calls[0]["kind"], "unresolved");
    assert_eq!(calls[0]["error"], "undefined operation `unknown` for Strict");
    assert_eq!(calls[1]["kind"], "raised");
    assert_eq!(calls[1]["error"], "frobnicate: frobnicate is not supported");
    assert_eq!(calls[2]["status"], "ok");
    assert_eq!(calls[2]["result"], "yes");
}

#[test]
fn delegation_loops_are_reported_inline() {
    let tmp = TempDirGuard::new("call-loop");
    let rulebook = tmp.write(
        "loop.toml",
        r#"
        [[class]]
        name = "Loop"

        [[class.rule]]
        match = { exact = "ping" }
        produce = { delegate = "pong" }

        [[class.rule]]
        match = { exact = "pong" }
        produce = { delegate = "ping" }

        [[class.rule]]
        match = { prefix = "chain_" }
        produce = { delegate = "{operation}_x" }

        [[class.rule]]
        match = { exact = "steady" }
        produce = { constant = "ok" }
        "#,
    );

    let output = run_beaver([
        OsStr::new("call"),
        rulebook.as_os_str(),
        OsStr::new("Loop"),
        OsStr::new("ping"),
        OsStr::new("chain_a"),
        OsStr::new("steady"),
        OsStr::new("--json"),
    ]);
    assert_eq!(output.status.code(), Some(2));
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["failed"], 2);
    let calls = payload["calls"].as_array().expect("calls array");
    assert_eq!(calls[0]["kind"], "recursion_limit");
    assert_eq!(calls[1]["kind"], "recursion_limit");
    assert_eq!(calls[2]["status"], "ok");
    assert_eq!(calls[2]["result"], "ok");
}

#[test]
fn call_human_output() {
    let tmp = TempDirGuard::new("call-human");
    let rulebook = record_rulebook(&tmp);

    let output = run_beaver(["call", rulebook.as_str(), "Record", "get_x", "get_x", "GetX"]);
    assert_success(&output);
    let text = stdout_text(&output);
    assert!(text.contains("get_x => 42 [installed, synthesized]"), "{text}");
    assert!(text.contains("GetX => 10 [fallback]"), "{text}");
}

#[test]
fn probe_does_not_install() {
    let tmp = TempDirGuard::new("probe");
    let rulebook = record_rulebook(&tmp);

    let output = run_beaver([
        "probe", rulebook.as_str(), "Record", "describe", "get_width", "GetX", "--json",
    ]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    let probes = payload["probes"].as_array().expect("probes array");
    assert_eq!(probes[0]["defined"], true);
    assert_eq!(probes[1]["defined"], false);
    assert_eq!(probes[1]["responds"], true);
    assert_eq!(probes[2]["responds"], false);
}

#[test]
fn inspect_lists_classes_in_declaration_order() {
    let tmp = TempDirGuard::new("inspect");
    let rulebook = record_rulebook(&tmp);

    let output = run_beaver(["inspect", rulebook.as_str(), "--json"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["class_count"], 2);
    let classes = payload["classes"].as_array().expect("classes array");
    assert_eq!(classes[0]["name"], "Base");
    assert_eq!(classes[0]["fallback"], true);
    assert_eq!(classes[1]["name"], "Record");
    assert_eq!(classes[1]["parent"], "Base");
    assert_eq!(
        classes[1]["rules"],
        serde_json::json!(["reader", "writer", "thrower"])
    );
    assert_eq!(
        classes[1]["operations"],
        serde_json::json!([{ "name": "describe", "origin": "native" }])
    );
}

#[test]
fn bad_rulebook_exits_one() {
    let tmp = TempDirGuard::new("bad");
    let rulebook = tmp.write(
        "bad.toml",
        r#"
        [[class]]
        name = "Broken"

        [[class.rule]]
        produce = { constant = 1 }
        "#,
    );

    let output = run_beaver([OsStr::new("inspect"), rulebook.as_os_str()]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("matcher must be given"), "{stderr}");
    assert!(tmp.path().exists());
}

#[test]
fn malformed_arguments_exit_one() {
    let tmp = TempDirGuard::new("args");
    let rulebook = record_rulebook(&tmp);

    let output = run_beaver(["call", rulebook.as_str(), "Record", "set_x:7"]);
    assert_eq!(output.status.code(), Some(1));
}
