//! CLI integration tests for the oasf-sdk binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("oasf-sdk"));
    cmd.env_remove("OASF_SDK_SCHEMA_URL")
        .env_remove("OASF_SDK_SCHEMA_DIR")
        .env_remove("RUST_LOG");
    cmd
}

// Helper to create a temp input file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const MCP_RECORD: &str = r#"{
    "schema_version": "0.8.0",
    "name": "github-agent",
    "modules": [{
        "name": "integration/mcp",
        "data": {
            "servers": [{
                "name": "github-mcp-server",
                "command": "docker",
                "args": ["run", "-i", "--rm", "-e", "GITHUB_PERSONAL_ACCESS_TOKEN", "ghcr.io/github/github-mcp-server"]
            }]
        }
    }]
}"#;

mod decode_command {
    use super::*;

    #[test]
    fn prints_tagged_variant() {
        let dir = TempDir::new().unwrap();
        let record = write_temp_file(&dir, "record.json", MCP_RECORD);

        cmd()
            .args(["decode", record.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::starts_with(r#"{"v1alpha2":"#))
            .stdout(predicate::str::contains(r#""name":"github-agent""#));
    }

    #[test]
    fn reads_stdin() {
        cmd()
            .args(["decode", "-"])
            .write_stdin(r#"{"schema_version": "1.0.0-rc.1", "name": "x"}"#)
            .assert()
            .success()
            .stdout(predicate::str::starts_with(r#"{"v1":"#));
    }

    #[test]
    fn unsupported_version_exits_2() {
        let dir = TempDir::new().unwrap();
        let record = write_temp_file(&dir, "record.json", r#"{"schema_version": "v99.99.99"}"#);

        cmd()
            .args(["decode", record.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("unsupported OASF version: v99.99.99"));
    }

    #[test]
    fn missing_version_exits_2() {
        let dir = TempDir::new().unwrap();
        let record = write_temp_file(&dir, "record.json", r#"{"name": "x"}"#);

        cmd()
            .args(["decode", record.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("schema_version field is missing"));
    }
}

mod translate_command {
    use super::*;

    #[test]
    fn to_ghcopilot() {
        let dir = TempDir::new().unwrap();
        let record = write_temp_file(&dir, "record.json", MCP_RECORD);

        cmd()
            .args(["translate", "to-ghcopilot", record.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""github":{"command":"docker""#))
            .stdout(predicate::str::contains(
                r#""GITHUB_PERSONAL_ACCESS_TOKEN":"${input:GITHUB_PERSONAL_ACCESS_TOKEN}""#,
            ))
            .stdout(predicate::str::contains(r#""type":"promptString""#));
    }

    #[test]
    fn from_mcp_accepts_bare_server() {
        let dir = TempDir::new().unwrap();
        let server = write_temp_file(
            &dir,
            "server.json",
            r#"{"name": "io.github.acme/weather", "packages": [{"registryType": "pypi", "identifier": "weather_mcp"}]}"#,
        );

        cmd()
            .args(["translate", "from-mcp", server.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#"{"type":"stdio","command":"python","args":["-m","weather_mcp"]}"#,
            ));
    }

    #[test]
    fn from_a2a_then_to_a2a() {
        let dir = TempDir::new().unwrap();
        let card = r#"{"name":"card-agent","url":"https://a.example","skills":[{"id":"s"}]}"#;
        let card_path = write_temp_file(&dir, "card.json", card);

        let output = cmd()
            .args(["translate", "from-a2a", card_path.to_str().unwrap()])
            .output()
            .unwrap();
        assert!(output.status.success());

        let record_path = dir.path().join("record.json");
        fs::write(&record_path, &output.stdout).unwrap();

        cmd()
            .args(["translate", "to-a2a", record_path.to_str().unwrap()])
            .assert()
            .success()
            .stdout(format!("{}\n", card));
    }

    #[test]
    fn pretty_output() {
        let dir = TempDir::new().unwrap();
        let record = write_temp_file(&dir, "record.json", MCP_RECORD);

        cmd()
            .args(["translate", "to-ghcopilot", record.to_str().unwrap(), "--pretty"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\n  \"servers\": {"));
    }

    #[test]
    fn missing_module_exits_2() {
        let dir = TempDir::new().unwrap();
        let record = write_temp_file(&dir, "record.json", r#"{"modules": []}"#);

        cmd()
            .args(["translate", "to-a2a", record.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains(
                "no module named integration/a2a or runtime/a2a found in record",
            ));
    }
}

mod validate_command {
    use super::*;

    const VALIDATE_PATH: &str = "/api/0.8.0/validate/object/record";

    #[test]
    fn valid_record() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", VALIDATE_PATH)
            .with_status(200)
            .with_body(r#"{"errors": [], "warnings": []}"#)
            .create();

        let dir = TempDir::new().unwrap();
        let record = write_temp_file(&dir, "record.json", MCP_RECORD);

        cmd()
            .args([
                "validate",
                record.to_str().unwrap(),
                "--schema-url",
                server.url().as_str(),
            ])
            .assert()
            .success()
            .stdout("Valid\n");
    }

    #[test]
    fn warnings_fail_only_in_strict_mode() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", VALIDATE_PATH)
            .with_status(200)
            .with_body(r#"{"errors": [], "warnings": [{"error": "deprecated", "message": "old field"}]}"#)
            .expect(2)
            .create();

        let dir = TempDir::new().unwrap();
        let record = write_temp_file(&dir, "record.json", MCP_RECORD);

        cmd()
            .args([
                "validate",
                record.to_str().unwrap(),
                "--schema-url",
                server.url().as_str(),
                "--json",
            ])
            .assert()
            .code(1)
            .stdout(predicate::str::contains(r#""valid":false"#))
            .stdout(predicate::str::contains("Validation Warning: old field"));

        cmd()
            .args([
                "validate",
                record.to_str().unwrap(),
                "--schema-url",
                server.url().as_str(),
                "--strict",
                "false",
            ])
            .assert()
            .success()
            .stderr(predicate::str::contains("Validation Warning: old field"));
    }

    #[test]
    fn upstream_error_exits_3() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", VALIDATE_PATH)
            .with_status(500)
            .with_body("internal")
            .create();

        let dir = TempDir::new().unwrap();
        let record = write_temp_file(&dir, "record.json", MCP_RECORD);

        cmd()
            .args(["validate", record.to_str().unwrap(), "--schema-url", server.url().as_str()])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("returned 500"));
    }

    #[test]
    fn offline_schema_dir() {
        let dir = TempDir::new().unwrap();
        let schemas = dir.path().join("schemas");
        fs::create_dir(&schemas).unwrap();
        fs::write(
            schemas.join("0.8.0.json"),
            r#"{"type": "object", "required": ["name", "description"]}"#,
        )
        .unwrap();
        let record = write_temp_file(&dir, "record.json", MCP_RECORD);

        cmd()
            .args([
                "validate",
                record.to_str().unwrap(),
                "--schema-dir",
                schemas.to_str().unwrap(),
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Validation Error"))
            .stderr(predicate::str::contains("description"));
    }

    #[test]
    fn invalid_json_exits_2() {
        let dir = TempDir::new().unwrap();
        let record = write_temp_file(&dir, "record.json", "{ not json");

        cmd()
            .args(["validate", record.to_str().unwrap(), "--schema-url", "http://127.0.0.1:9"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid JSON"));
    }

    #[test]
    fn missing_file_exits_3() {
        cmd()
            .args(["validate", "/nonexistent/record.json"])
            .assert()
            .code(3);
    }
}

mod schema_command {
    use super::*;

    #[test]
    fn versions() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/api/versions")
            .with_status(200)
            .with_body(r#"{"default": {"version": "0.8.0", "url": ""}, "versions": []}"#)
            .create();

        cmd()
            .args(["schema", "--schema-url", server.url().as_str(), "versions"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""version": "0.8.0""#));
    }

    #[test]
    fn defs_not_found_exits_2() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/schema/0.7.0/objects/record")
            .with_status(200)
            .with_body(r#"{"$defs": {}}"#)
            .create();

        cmd()
            .args([
                "schema",
                "--schema-url",
                server.url().as_str(),
                "defs",
                "skills",
                "--schema-version",
                "0.7.0",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("skills not found in schema 0.7.0"));
    }
}

mod help_and_version {
    use super::*;

    #[test]
    fn help_lists_subcommands() {
        cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("decode"))
            .stdout(predicate::str::contains("validate"))
            .stdout(predicate::str::contains("translate"))
            .stdout(predicate::str::contains("server"));
    }

    #[test]
    fn version() {
        cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("oasf-sdk"));
    }

    #[test]
    fn unknown_direction_rejected() {
        cmd()
            .args(["translate", "to-nowhere", "x.json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid value"));
    }
}
