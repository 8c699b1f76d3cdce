use std::{fs, path::PathBuf, process::Command};

#[test]
fn basic_workflow() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("basic_workflow");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let config_path = test_dir.join("config.toml");
    let config_contents = String::new()
        + "[run]\n"
        + "population_size = 64\n"
        + "duration_hours = 12.0\n"
        + "time_step_hours = 1.0\n"
        + "capacity = 256\n"
        + "seed = 7\n"
        + "\n"
        + "[cell]\n"
        + "proliferation_rate = 60.0\n"
        + "apoptosis_rate = 40.0\n"
        + "\n"
        + "[[events]]\n"
        + "time = 4.0\n"
        + "type = \"mutation\"\n"
        + "gene = \"TP53\"\n"
        + "kind = \"knockout\"\n"
        + "target = \"all\"\n"
        + "\n"
        + "[[events]]\n"
        + "time = 6.0\n"
        + "type = \"expression\"\n"
        + "gene = \"BCL2\"\n"
        + "action = \"activate\"\n"
        + "fold_change = 2.5\n"
        + "target = \"mutants\"\n"
        + "\n"
        + "[[events]]\n"
        + "time = 8.0\n"
        + "type = \"environment\"\n"
        + "perturbation = \"hypoxia\"\n"
        + "duration_hours = 4.0\n"
        + "\n"
        + "[user]\n"
        + "id = \"u-042\"\n"
        + "name = \"D. Ferguson\"\n";

    fs::write(&config_path, config_contents).expect("failed to write config file");

    fn run_bin(args: &[&str]) {
        let bin = PathBuf::from(env!("CARGO_BIN_EXE_mitosim"));

        let output = Command::new(bin)
            .args(args)
            .output()
            .expect("failed to execute command");

        let stdout_str =
            std::str::from_utf8(&output.stdout).expect("failed to convert stdout to string");
        let stderr_str =
            std::str::from_utf8(&output.stderr).expect("failed to convert stderr to string");

        assert!(
            output.status.success(),
            "failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
        );
    }

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    run_bin(&["--sim-dir", test_dir_str, "run"]);
    run_bin(&["--sim-dir", test_dir_str, "run"]);

    for run_dir in ["run-0000", "run-0001"] {
        assert!(test_dir.join(run_dir).join("trajectory-0000.msgpack").is_file());
        assert!(test_dir.join(run_dir).join("checkpoint.msgpack").is_file());
        assert!(test_dir.join(run_dir).join("export.json").is_file());
    }

    run_bin(&["--sim-dir", test_dir_str, "classify", "--run-idx", "0"]);
    assert!(test_dir.join("run-0000").join("pathology.json").is_file());

    let report: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(test_dir.join("run-0000").join("pathology.json"))
            .expect("failed to read pathology report"),
    )
    .expect("failed to parse pathology report");
    assert!(report["has_mutations"].as_bool().expect("missing mutation flag"));

    run_bin(&["--sim-dir", test_dir_str, "analyze"]);
    assert!(test_dir.join("run-0000").join("results.json").is_file());
    assert!(test_dir.join("run-0001").join("results.json").is_file());

    run_bin(&["--sim-dir", test_dir_str, "clean"]);
    assert!(!test_dir.join("run-0000").exists());
    assert!(config_path.is_file());

    fs::remove_dir_all(&test_dir).ok();
}
