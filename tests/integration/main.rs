//! Integration tests for Press

use std::path::Path;
use tempfile::TempDir;

/// Project with two scripts, one stylesheet and a local press.toml
fn project(extra_config: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    let js = temp.path().join("public/javascripts");
    let css = temp.path().join("public/stylesheets");
    std::fs::create_dir_all(&js).unwrap();
    std::fs::create_dir_all(&css).unwrap();
    std::fs::write(js.join("a.js"), "// first\nvar a = 1;\n").unwrap();
    std::fs::write(js.join("b.js"), "var b = 2; /* tail */\n").unwrap();
    std::fs::write(css.join("site.css"), "body {\n  margin: 0;\n}\n").unwrap();

    let config = format!(
        "[general]\nroot = \".\"\n\n[compression]\ncaching = \"always\"\n\n{}",
        extra_config
    );
    write(temp.path(), "press.toml", &config);
    temp
}

fn write(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).unwrap();
}

mod cli_tests {
    use super::*;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn press() -> Command {
        let mut cmd = cargo_bin_cmd!("press");
        cmd.env_remove("PRESS_CONFIG");
        cmd
    }

    const DISK: &str = "[storage]\nbackend = \"disk\"\ndir = \"artifacts\"\n";

    #[test]
    fn help_displays() {
        press()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("aggregation"));
    }

    #[test]
    fn version_displays() {
        press()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("press"));
    }

    #[test]
    fn config_path_follows_flag() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        press()
            .args(["--config", path.to_str().unwrap(), "config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn config_show_uses_local_file() {
        let temp = project("");
        press()
            .current_dir(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[compression]"))
            .stdout(predicate::str::contains("caching = \"always\""));
    }

    #[test]
    fn missing_explicit_config_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.toml");
        press()
            .args(["--config", path.to_str().unwrap(), "config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration file not found"));
    }

    #[test]
    fn config_init_writes_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.toml");
        press()
            .args(["--config", path.to_str().unwrap(), "config", "init"])
            .assert()
            .success();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[storage]"));
    }

    #[test]
    fn key_is_stable_and_order_sensitive() {
        let temp = project("");
        let key = |sources: &[&str]| {
            let output = press()
                .current_dir(temp.path())
                .args(["key", "--kind", "js"])
                .args(sources)
                .output()
                .unwrap();
            assert!(output.status.success());
            String::from_utf8(output.stdout).unwrap().trim().to_string()
        };

        let forward = key(&["a.js", "b.js"]);
        assert_eq!(forward, key(&["a.js", "b.js"]));
        assert_ne!(forward, key(&["b.js", "a.js"]));
        assert!(forward.ends_with(".js"));
    }

    #[test]
    fn key_for_missing_source_fails() {
        let temp = project("");
        press()
            .current_dir(temp.path())
            .args(["key", "--kind", "js", "nope.js"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("file not found"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn bundle_prints_key_and_tag() {
        let temp = project(DISK);
        press()
            .current_dir(temp.path())
            .args(["bundle", "--kind", "js", "a.js", "b.js"])
            .assert()
            .success()
            .stdout(predicate::str::contains("<script src=\"/compressed/js?key="));
    }

    #[test]
    fn bundle_print_outputs_artifact() {
        let temp = project(DISK);
        press()
            .current_dir(temp.path())
            .args(["bundle", "--kind", "js", "--print", "a.js", "b.js"])
            .assert()
            .success()
            .stdout(predicate::eq("var a = 1;\nvar b = 2;"));
    }

    #[test]
    fn bundle_then_clear_disk_store() {
        let temp = project(DISK);
        press()
            .current_dir(temp.path())
            .args(["bundle", "--kind", "css", "site.css"])
            .assert()
            .success();

        press()
            .current_dir(temp.path())
            .arg("clear")
            .assert()
            .success()
            .stderr(predicate::str::contains("Cleared 1 artifacts from cache"));
    }

    #[test]
    fn bundle_from_subdirectory_uses_project_artifact_dir() {
        let temp = project(DISK);
        let sub = temp.path().join("sub");
        std::fs::create_dir_all(&sub).unwrap();

        press()
            .current_dir(&sub)
            .args(["bundle", "--kind", "js", "a.js"])
            .assert()
            .success();

        assert!(temp.path().join("artifacts").is_dir());
        assert!(!sub.join("artifacts").exists());
    }

    #[test]
    fn bundle_with_broken_source_falls_back() {
        let temp = project(DISK);
        write(
            &temp.path().join("public/javascripts"),
            "broken.js",
            "var s = 'oops;\n",
        );
        press()
            .current_dir(temp.path())
            .args(["bundle", "--kind", "js", "a.js", "broken.js"])
            .assert()
            .success()
            .stdout(predicate::str::contains("/public/javascripts/broken.js"))
            .stderr(predicate::str::contains("not aggregated"));
    }
}

mod library_tests {
    use super::*;
    use press::config::ConfigManager;
    use press::session;
    use press::{AddOptions, Press, PressError};
    use std::sync::Arc;

    async fn load(temp: &TempDir) -> Press {
        let config = ConfigManager::new()
            .load_with_local(Some(&temp.path().join("press.toml")))
            .await
            .unwrap();
        Press::from_config(Arc::new(config))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_share_one_artifact() {
        let temp = project("");
        let press = Arc::new(load(&temp).await);

        let request = |press: Arc<Press>| async move {
            session::scope(async {
                press.add_js("a.js", AddOptions::default()).await.unwrap();
                press.add_js("b.js", AddOptions::default()).await.unwrap();
                press.compressed_js_tag().await.unwrap()
            })
            .await
        };

        let first = tokio::spawn(request(Arc::clone(&press)));
        let second = tokio::spawn(request(Arc::clone(&press)));
        let first = first.await.unwrap();
        let second = second.await.unwrap();

        assert_eq!(first, second);
        assert_eq!(press.store().len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicates_are_scoped_to_one_request() {
        let temp = project("");
        let press = load(&temp).await;

        session::scope(async {
            press.add_css("site.css", AddOptions::default()).await.unwrap();
            let err = press
                .add_css("site.css", AddOptions::default())
                .await
                .unwrap_err();
            assert!(matches!(err, PressError::DuplicateSource { .. }));
        })
        .await;

        session::scope(async {
            press.add_css("site.css", AddOptions::default()).await.unwrap();
        })
        .await;
    }

    #[tokio::test]
    async fn local_root_resolves_against_config_file() {
        let temp = project("");
        let press = load(&temp).await;
        assert_eq!(press.config().general.root, temp.path().join("."));

        let tag = session::scope(async {
            press.add_single_js("a.js", false).await.unwrap()
        })
        .await;
        assert!(tag.contains("/compressed/js/single?key="));
    }
}
