//! Integration tests for fodcache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn fodcache() -> Command {
        let mut cmd = cargo_bin_cmd!("fodcache");
        cmd.env_remove("FODCACHE_CONFIG");
        cmd
    }

    const EXAMPLE_SHA512: &str = "3bb12eda3c298db5de25597f54d924f2e17e78a26ad8953ed8218ee682f0bbbe9021e2f3009d152c911bf1f25ec683a902714166767afbd8e5bd0fb0124ecb8a";

    #[test]
    fn help_displays() {
        fodcache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("content-addressed fetch cache"));
    }

    #[test]
    fn version_displays() {
        fodcache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("fodcache"));
    }

    #[test]
    fn path_golden_vector() {
        let config = TempDir::new().unwrap();
        fodcache()
            .args(["--config"])
            .arg(config.path().join("missing.toml"))
            .args(["path", "example-1.0.0.zip", EXAMPLE_SHA512])
            .assert()
            .success()
            .stdout("/nix/store/y5v6ky87j7vpdmhdwr7rjz562ipvhnpf-example-1.0.0.zip\n");
    }

    #[test]
    fn path_respects_store_root() {
        let config = TempDir::new().unwrap();
        fodcache()
            .args(["--config"])
            .arg(config.path().join("missing.toml"))
            .args([
                "path",
                "example-1.0.0.zip",
                &format!("nix.1/{}", EXAMPLE_SHA512),
                "--store-root",
                "/tmp/store",
            ])
            .assert()
            .success()
            .stdout("/tmp/store/sqq2l15qp2x4fjdn075ffjj2acc0vg63-example-1.0.0.zip\n");
    }

    #[test]
    fn sanitize_prints_name() {
        fodcache()
            .args(["sanitize", ".././weird name!!.zip"])
            .assert()
            .success()
            .stdout("-.-weird-name-.zip\n");
    }

    #[test]
    fn config_path_and_init() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        fodcache()
            .arg("--config")
            .arg(&path)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));

        fodcache()
            .arg("--config")
            .arg(&path)
            .args(["config", "init"])
            .assert()
            .success();
        assert!(path.exists());

        fodcache()
            .arg("--config")
            .arg(&path)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[store]"));
    }

    #[test]
    fn invalid_config_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[store]\nhash_algorithm = \"md5\"\n").unwrap();

        fodcache()
            .arg("--config")
            .arg(&path)
            .args(["sanitize", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn fetch_rejects_bad_locator() {
        let dir = TempDir::new().unwrap();
        fodcache()
            .arg("--config")
            .arg(dir.path().join("missing.toml"))
            .args(["fetch", "no-reference"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid locator"));
    }
}
