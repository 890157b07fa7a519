//! Drives the `fieldlens` binary against schema files on disk.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{json, Value};

fn fieldlens(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fieldlens"))
        .args(args)
        .env_remove("FIELDLENS_BASE_URL")
        .env_remove("FIELDLENS_API_TOKEN")
        .output()
        .unwrap()
}

fn write(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    path
}

fn fields() -> Value {
    json!({
        "properties": {
            "title": {"type": "SINGLE_LINE_TEXT", "code": "title", "label": "Title", "required": true},
            "status": {
                "type": "DROP_DOWN",
                "code": "status",
                "label": "Status",
                "defaultValue": "Open",
                "options": {
                    "Open": {"label": "Open", "index": "0"},
                    "Closed": {"label": "Closed", "index": "1"}
                }
            },
            "amount": {"type": "NUMBER", "code": "amount", "label": "Amount"}
        }
    })
}

fn text(output: &Output) -> String {
    assert!(
        output.status.success(),
        "fieldlens failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn snapshot_then_query() {
    let dir = tempfile::tempdir().unwrap();
    let fields = write(dir.path(), "fields.json", &fields());
    let fields_arg = fields.to_str().unwrap();

    let document = text(&fieldlens(&[
        "snapshot",
        "--fields",
        fields_arg,
        "--select",
        "title,status",
        "--max-tokens",
        "2",
        "--join",
        "or",
    ]));
    let saved: Value = serde_json::from_str(&document).unwrap();
    assert_eq!(saved["maxTokens"], "2");
    assert_eq!(saved["joinMode"], "or");
    let config = write(dir.path(), "config.json", &saved);

    let query = text(&fieldlens(&[
        "query",
        "--fields",
        fields_arg,
        "--config",
        config.to_str().unwrap(),
        "Closed",
        "late",
        "ignored",
    ]));
    assert_eq!(
        query.trim_end(),
        r#"((status in ("Closed")) or (title like "Closed")) or (title like "late")"#
    );
}

#[test]
fn snapshot_rejects_unsearchable_selection() {
    let dir = tempfile::tempdir().unwrap();
    let fields = write(dir.path(), "fields.json", &fields());

    let output = fieldlens(&[
        "snapshot",
        "--fields",
        fields.to_str().unwrap(),
        "--select",
        "amount",
    ]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn usage_report_lists_layout_fields() {
    let dir = tempfile::tempdir().unwrap();
    let fields = write(dir.path(), "fields.json", &fields());
    let layout = write(
        dir.path(),
        "layout.json",
        &json!({
            "layout": [
                {"type": "ROW", "fields": [{"code": "status"}, {"code": "title"}]},
                {"type": "ROW", "fields": [{"code": "amount"}]}
            ]
        }),
    );
    let bundle = write(
        dir.path(),
        "bundle.json",
        &json!({"views": {"views": {"All": {"fields": ["title"]}}}}),
    );
    let config = write(dir.path(), "notes.json", &json!({"notes": "{\"amount\":\"net\"}"}));

    let report = text(&fieldlens(&[
        "usage",
        "--fields",
        fields.to_str().unwrap(),
        "--layout",
        layout.to_str().unwrap(),
        "--bundle",
        bundle.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]));
    let rows: Vec<Value> = serde_json::from_str(&report).unwrap();

    let codes: Vec<_> = rows.iter().map(|r| r["code"].as_str().unwrap()).collect();
    assert_eq!(codes, vec!["status", "title", "amount"]);
    assert_eq!(rows[0]["defaultValue"], "Open");
    assert_eq!(rows[1]["usage"], "List view");
    assert_eq!(rows[1]["required"], true);
    assert_eq!(rows[2]["usage"], "―");
    assert_eq!(rows[2]["note"], "net");
}

#[test]
fn missing_schema_file_is_reported() {
    let output = fieldlens(&[
        "usage",
        "--fields",
        "/nonexistent/fields.json",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot read"));
}
