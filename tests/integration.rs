use std::{env, fs, path::PathBuf, process::Command};

fn run_bin(args: &[&str]) -> std::process::Output {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_ragequit"));

    Command::new(bin)
        .args(args)
        .output()
        .expect("failed to execute command")
}

fn assert_success(args: &[&str]) {
    let output = run_bin(args);

    let stdout_str =
        std::str::from_utf8(&output.stdout).expect("failed to convert stdout to string");
    let stderr_str =
        std::str::from_utf8(&output.stderr).expect("failed to convert stderr to string");

    assert!(
        output.status.success(),
        "failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
    );
}

#[test]
fn basic_workflow() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("basic_workflow");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let config_path = test_dir.join("config.toml");
    let config_contents = String::new()
        + "[day]\n"
        + "length_minutes = 1440\n"
        + "check_interval = 10\n"
        + "\n"
        + "[server]\n"
        + "capacity = 100.0\n"
        + "num_servers = 3\n"
        + "\n"
        + "[behavior.weights]\n"
        + "idler = 0.3\n"
        + "casual = 0.5\n"
        + "pro = 0.2\n"
        + "\n"
        + "[batch]\n"
        + "n_days = 4\n"
        + "seed = 17\n"
        + "capacity_range = [ 100.0, 300.0,]\n"
        + "n_threads = 2\n";

    fs::write(&config_path, config_contents).expect("failed to write config file");

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    assert_success(&["--sim-dir", test_dir_str, "simulate"]);
    assert_success(&["--sim-dir", test_dir_str, "simulate", "--n-days", "2"]);

    for day_idx in 0..6 {
        assert!(test_dir.join(format!("day-{day_idx:04}.msgpack")).is_file());
    }

    assert_success(&["--sim-dir", test_dir_str, "analyze"]);

    let analysis =
        fs::read_to_string(test_dir.join("analysis.toml")).expect("failed to read analysis");
    assert!(analysis.contains("n_days = 6"));

    assert_success(&["--sim-dir", test_dir_str, "clean"]);

    assert!(!test_dir.join("day-0000.msgpack").exists());
    assert!(!test_dir.join("analysis.toml").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn invalid_config_is_rejected() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("invalid_config");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let config_contents = "[day]\nlength_minutes = 0\n";
    fs::write(test_dir.join("config.toml"), config_contents).expect("failed to write config file");

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    let output = run_bin(&["--sim-dir", test_dir_str, "simulate"]);
    assert!(!output.status.success());
    assert!(!test_dir.join("day-0000.msgpack").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn unknown_player_kind_is_rejected() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("unknown_kind");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let config_contents = "[behavior.weights]\nidler = 0.3\ncasual = 0.5\npro = 0.2\nwhale = 0.1\n";
    fs::write(test_dir.join("config.toml"), config_contents).expect("failed to write config file");

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    let output = run_bin(&["--sim-dir", test_dir_str, "simulate"]);
    assert!(!output.status.success());

    fs::remove_dir_all(&test_dir).ok();
}
