use clap::Parser;
use pfx_export::cli::{Cli, Commands};
use pfx_export::models::{OutputConflictPolicy, StoreScope};
use std::path::{Path, PathBuf};
use std::process::Command;

fn pfx_export_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pfx-export"))
}

/// Config file pointing the store and history into `dir`
fn write_config(dir: &Path) -> PathBuf {
    let store = dir.join("store");
    std::fs::create_dir_all(store.join("user")).expect("Failed to create directory");
    let config = dir.join("config.toml");
    std::fs::write(
        &config,
        format!(
            "[store]\nuser_root = {:?}\nmachine_root = {:?}\n\n[history]\npath = {:?}\n",
            store.join("user").display().to_string(),
            store.join("machine").display().to_string(),
            dir.join("history.jsonl").display().to_string(),
        ),
    )
    .expect("Failed to write fixture");
    config
}

fn add_bundle(dir: &Path, name: &str, with_key: bool) -> String {
    let key = rcgen::KeyPair::generate().expect("Failed to generate key");
    let cert = rcgen::CertificateParams::new(vec![format!("{}.example.com", name)])
        .expect("Invalid certificate parameters")
        .self_signed(&key)
        .expect("Failed to self-sign certificate");
    let mut bundle = cert.pem();
    if with_key {
        bundle.push_str(&key.serialize_pem());
    }
    std::fs::write(
        dir.join("store").join("user").join(format!("{}.pem", name)),
        bundle,
    )
    .expect("Failed to write fixture");
    pfx_export::store::chain::thumbprint(cert.der())
}

#[test]
fn test_parse_export_defaults() {
    let cli = Cli::try_parse_from(["pfx-export", "export", "ABCDEF"])
        .expect("Arguments should parse");
    match cli.command {
        Commands::Export(args) => {
            assert_eq!(args.thumbprint.as_deref(), Some("ABCDEF"));
            assert_eq!(args.scope, StoreScope::UserPersonal);
            assert_eq!(args.pfx, PathBuf::from("out.pfx"));
            assert_eq!(args.output.out_dir, PathBuf::from("pem"));
            assert_eq!(args.output.on_conflict, None);
            assert!(!args.output.json);
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_parse_convert_options() {
    let cli = Cli::try_parse_from([
        "pfx-export",
        "--verbose",
        "convert",
        "site.pfx",
        "--out-dir",
        "/etc/ssl/site",
        "--on-conflict",
        "rename",
        "--openssl",
        "/opt/openssl/bin/openssl",
        "--password-env",
        "PFX_PASSWORD",
    ])
    .expect("Arguments should parse");
    assert!(cli.verbose);
    match cli.command {
        Commands::Convert(args) => {
            assert_eq!(args.pfx, PathBuf::from("site.pfx"));
            assert_eq!(args.output.out_dir, PathBuf::from("/etc/ssl/site"));
            assert_eq!(
                args.output.on_conflict,
                Some(OutputConflictPolicy::RenameWithTimestamp)
            );
            assert_eq!(
                args.output.openssl,
                Some(PathBuf::from("/opt/openssl/bin/openssl"))
            );
            assert_eq!(args.output.password_env.as_deref(), Some("PFX_PASSWORD"));
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_parse_list_machine_scope() {
    let cli = Cli::try_parse_from(["pfx-export", "list", "--scope", "machine", "--json"])
        .expect("Arguments should parse");
    match cli.command {
        Commands::List(args) => {
            assert_eq!(args.scope, StoreScope::MachinePersonal);
            assert!(args.json);
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_parse_history_limit() {
    let cli = Cli::try_parse_from(["pfx-export", "history", "-n", "5", "--json"])
        .expect("Arguments should parse");
    match cli.command {
        Commands::History(args) => {
            assert_eq!(args.limit, 5);
            assert!(args.json);
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_convert_requires_archive() {
    assert!(Cli::try_parse_from(["pfx-export", "convert"]).is_err());
    assert!(Cli::try_parse_from(["pfx-export", "export", "--on-conflict", "merge"]).is_err());
}

#[test]
fn test_list_json() {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let config = write_config(tmp.path());
    let thumbprint = add_bundle(tmp.path(), "web", true);
    add_bundle(tmp.path(), "public", false);

    let output = Command::new(pfx_export_bin())
        .args(["--config", config.to_str().unwrap(), "list", "--json"])
        .output()
        .expect("Failed to execute");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "list failed: {}", stdout);
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout).expect("Output should be valid JSON");
    let certs = parsed.as_array().expect("Output should be a JSON array");
    assert_eq!(certs.len(), 2);
    let web = certs.iter().find(|c| c["friendly_name"] == "web")
        .expect("Certificate should be listed");
    assert_eq!(web["thumbprint"], thumbprint.as_str());
    assert_eq!(web["has_private_key"], true);
}

#[test]
fn test_export_without_key_exits_nonzero() {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let config = write_config(tmp.path());
    let thumbprint = add_bundle(tmp.path(), "public", false);

    let output = Command::new(pfx_export_bin())
        .current_dir(tmp.path())
        .env("PFX_EXPORT_CLI_PASSWORD", "Test123!")
        .args([
            "--config",
            config.to_str().unwrap(),
            "export",
            &thumbprint,
            "--password-env",
            "PFX_EXPORT_CLI_PASSWORD",
            "--json",
        ])
        .output()
        .expect("Failed to execute");

    assert_eq!(output.status.code(), Some(1));
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)
        .expect("Output should be valid JSON");
    assert_eq!(parsed["state"], "Aborted");
    assert_eq!(parsed["error"]["stage"], "Validating");
    assert!(!tmp.path().join("out.pfx").exists());
    assert!(!tmp.path().join("pem").exists());

    let history = std::fs::read_to_string(tmp.path().join("history.jsonl"))
        .expect("Failed to read output");
    assert_eq!(history.lines().count(), 1);
    assert!(history.contains("Aborted"));
    assert!(!history.contains("Test123!"));
}

#[test]
fn test_export_unknown_thumbprint() {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let config = write_config(tmp.path());

    let output = Command::new(pfx_export_bin())
        .current_dir(tmp.path())
        .env("PFX_EXPORT_CLI_PASSWORD", "Test123!")
        .args([
            "--config",
            config.to_str().unwrap(),
            "export",
            "0000",
            "--password-env",
            "PFX_EXPORT_CLI_PASSWORD",
        ])
        .output()
        .expect("Failed to execute");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No certificate with thumbprint 0000"), "{}", stderr);
}

#[test]
fn test_export_with_missing_toolchain_keeps_pfx() {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let config = write_config(tmp.path());
    let thumbprint = add_bundle(tmp.path(), "web", true);

    let output = Command::new(pfx_export_bin())
        .current_dir(tmp.path())
        .env("PFX_EXPORT_CLI_PASSWORD", "Test123!")
        .args([
            "--config",
            config.to_str().unwrap(),
            "export",
            &thumbprint,
            "--openssl",
            tmp.path().join("missing-openssl").to_str().unwrap(),
            "--password-env",
            "PFX_EXPORT_CLI_PASSWORD",
            "--json",
        ])
        .output()
        .expect("Failed to execute");

    assert_eq!(output.status.code(), Some(1));
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)
        .expect("Output should be valid JSON");
    assert_eq!(parsed["state"], "Failed");
    assert_eq!(parsed["error"]["stage"], "Decomposing");
    assert!(tmp.path().join("out.pfx").is_file());
}

#[test]
fn test_history_lists_recorded_runs() {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let config = write_config(tmp.path());
    let thumbprint = add_bundle(tmp.path(), "public", false);

    let run = |args: &[&str]| {
        Command::new(pfx_export_bin())
            .current_dir(tmp.path())
            .env("PFX_EXPORT_CLI_PASSWORD", "Test123!")
            .args(["--config", config.to_str().unwrap()])
            .args(args)
            .output()
            .expect("Failed to execute")
    };

    let empty = run(&["history"]);
    assert!(empty.status.success());
    assert!(String::from_utf8_lossy(&empty.stdout).contains("No runs recorded"));

    for _ in 0..2 {
        run(&[
            "export",
            thumbprint.as_str(),
            "--password-env",
            "PFX_EXPORT_CLI_PASSWORD",
            "--json",
        ]);
    }

    let output = run(&["history", "--limit", "1", "--json"]);
    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
    let records = parsed.as_array().expect("Output should be a JSON array");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["command"], "export");
    assert_eq!(records[0]["state"], "Aborted");
    assert_eq!(records[0]["thumbprint"], thumbprint.as_str());
}
