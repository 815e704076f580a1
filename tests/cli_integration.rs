// CLI integration tests for the hcl2json binary.
#![cfg(not(target_arch = "wasm32"))]
use std::io::Write;
use std::process::{Command, Stdio};

use serde_json::{Value, json};

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_hcl2json");
    Command::new(exe)
}

fn parse_json(value: &[u8]) -> Value {
    serde_json::from_slice(value).expect("valid json")
}

fn stderr_error(output: &std::process::Output) -> Value {
    let text = String::from_utf8_lossy(&output.stderr);
    let line = text
        .lines()
        .find(|line| line.starts_with("{\"error\""))
        .expect("json error line");
    serde_json::from_str::<Value>(line).expect("json")["error"].clone()
}

fn write_file(dir: &std::path::Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write");
    path.to_str().expect("utf8 path").to_string()
}

#[test]
fn convert_single_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let main = write_file(
        temp.path(),
        "main.tf",
        "resource \"aws_s3_bucket\" \"logs\" {\n  bucket = \"logs\"\n}\n",
    );

    let output = cmd().args(["convert", &main]).output().expect("convert");
    assert!(output.status.success());
    assert_eq!(
        parse_json(&output.stdout),
        json!({"resource": {"aws_s3_bucket": {"logs": [{"bucket": "logs"}]}}})
    );
}

#[test]
fn convert_merges_multiple_files() {
    let temp = tempfile::tempdir().expect("tempdir");
    let a = write_file(
        temp.path(),
        "a.tf",
        "variable \"region\" {\n  default = \"eu-west-1\"\n}\n",
    );
    let b = write_file(
        temp.path(),
        "b.tf",
        "variable \"zone\" {\n  default = \"a\"\n}\nlocals {\n  x = 1\n}\n",
    );

    let output = cmd()
        .args(["convert", &a, &b, "--pretty"])
        .output()
        .expect("convert");
    assert!(output.status.success());
    let value = parse_json(&output.stdout);
    assert_eq!(value["variable"]["region"][0]["default"], "eu-west-1");
    assert_eq!(value["variable"]["zone"][0]["default"], "a");
    assert_eq!(value["locals"], json!([{"x": 1}]));
    assert!(String::from_utf8_lossy(&output.stdout).contains("\n  "));
}

#[test]
fn convert_reads_stdin() {
    let mut child = cmd()
        .args(["convert", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"name = \"web\"\n")
        .expect("write");
    let output = child.wait_with_output().expect("wait");
    assert!(output.status.success());
    assert_eq!(parse_json(&output.stdout), json!({"name": "web"}));
}

#[test]
fn convert_duplicate_attribute_flag() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dup = write_file(temp.path(), "dup.tf", "a = 1\na = 2\n");

    let strict = cmd().args(["convert", &dup]).output().expect("convert");
    assert_eq!(strict.status.code(), Some(4));
    let error = stderr_error(&strict);
    assert_eq!(error["kind"], "Conversion");
    assert!(error["message"].as_str().expect("message").contains("Attribute redefined"));

    let lenient = cmd()
        .args(["convert", "--no-key-validation", &dup])
        .output()
        .expect("convert");
    assert!(lenient.status.success());
    assert_eq!(parse_json(&lenient.stdout), json!({"a": 2}));
}

#[test]
fn convert_missing_file_is_io_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let missing = temp.path().join("missing.tf");
    let output = cmd()
        .args(["convert", missing.to_str().expect("path")])
        .output()
        .expect("convert");
    assert_eq!(output.status.code(), Some(8));
    let error = stderr_error(&output);
    assert_eq!(error["kind"], "Io");
    assert!(error.get("hint").is_some());
}

#[test]
fn convert_directory_merges_tf_and_tf_json() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_file(
        temp.path(),
        "main.tf",
        "variable \"region\" {\n  default = \"eu-west-1\"\n}\n",
    );
    write_file(
        temp.path(),
        "extra.tf.json",
        r#"{"variable": {"zone": [{"default": "a"}]}}"#,
    );
    write_file(temp.path(), "package.json", r#"{"name": "ignored"}"#);
    std::fs::create_dir(temp.path().join("modules")).expect("mkdir");
    write_file(&temp.path().join("modules"), "child.tf", "nested = true\n");

    let output = cmd()
        .args(["convert", temp.path().to_str().expect("path")])
        .output()
        .expect("convert");
    assert!(output.status.success());
    assert_eq!(
        parse_json(&output.stdout),
        json!({
            "variable": {
                "region": [{"default": "eu-west-1"}],
                "zone": [{"default": "a"}]
            }
        })
    );
}

#[test]
fn convert_directory_without_module_files_is_empty() {
    let standard_only = tempfile::tempdir().expect("tempdir");
    write_file(standard_only.path(), "settings.json", r#"{"a": 1}"#);
    let empty = tempfile::tempdir().expect("tempdir");

    for dir in [standard_only.path(), empty.path()] {
        let output = cmd()
            .args(["convert", dir.to_str().expect("path")])
            .output()
            .expect("convert");
        assert!(output.status.success());
        assert_eq!(parse_json(&output.stdout), json!({}));
    }
}

#[test]
fn convert_invalid_tf_json_is_conversion_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_file(temp.path(), "broken.tf.json", "{");
    let output = cmd()
        .args(["convert", temp.path().to_str().expect("path")])
        .output()
        .expect("convert");
    assert_eq!(output.status.code(), Some(4));
    assert_eq!(stderr_error(&output)["kind"], "Conversion");
}

#[test]
fn convert_missing_path_reports_os_error() {
    let output = cmd()
        .args(["convert", "/some/not/existing/path"])
        .output()
        .expect("convert");
    assert_eq!(output.status.code(), Some(8));
    let error = stderr_error(&output);
    assert_eq!(error["kind"], "Io");
    assert!(
        error["message"]
            .as_str()
            .expect("message")
            .to_lowercase()
            .contains("no such file or directory")
    );
}

#[test]
fn expr_prints_syntax_tree() {
    let output = cmd().args(["expr", "hello"]).output().expect("expr");
    assert!(output.status.success());
    let tree = parse_json(&output.stdout);
    assert_eq!(tree["Type"], "TemplateExpr");
    assert_eq!(tree["Parts"][0]["Val"], "hello");
}

#[test]
fn expr_parse_failure_exit_code() {
    let output = cmd().args(["expr", "${"]).output().expect("expr");
    assert_eq!(output.status.code(), Some(5));
    assert_eq!(stderr_error(&output)["kind"], "ExpressionParse");
}

#[test]
fn unknown_subcommand_is_usage_error() {
    let output = cmd().arg("frobnicate").output().expect("run");
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stderr_error(&output)["kind"], "Usage");
}

#[test]
fn serve_answers_requests_until_eof() {
    let mut child = cmd()
        .arg("serve")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");
    {
        let mut stdin = child.stdin.take().expect("stdin");
        writeln!(stdin, r#"{{"id":1,"op":"parse","args":["main.tf","key = \"value\""]}}"#)
            .expect("write");
        writeln!(stdin).expect("blank line");
        writeln!(stdin, "garbage").expect("write");
        writeln!(stdin, r#"{{"id":2,"op":"parseExpression","args":["","hello"]}}"#)
            .expect("write");
    }
    let output = child.wait_with_output().expect("wait");
    assert!(output.status.success());

    let text = String::from_utf8(output.stdout).expect("utf8");
    let responses: Vec<Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(responses.len(), 3);

    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[0]["error"], Value::Null);
    assert_eq!(responses[0]["result"], "{\"key\":\"value\"}");

    assert_eq!(responses[1]["id"], Value::Null);
    assert!(responses[1]["error"].is_string());

    assert_eq!(responses[2]["id"], 2);
    let tree: Value =
        serde_json::from_str(responses[2]["result"].as_str().expect("result")).expect("tree");
    assert_eq!(tree["Type"], "TemplateExpr");
}
