use assert_cmd::Command;
use predicates::prelude::*;

fn plan() -> Command {
    let mut cmd = Command::cargo_bin("conv3d-plan").unwrap();
    cmd.env_remove("RUST_LOG");
    for key in conv3d_common::PlatformDescriptor::ENV_OVERRIDES {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn help_works() {
    plan().arg("--help").assert().success();
}

#[test]
fn version_works() {
    plan().arg("--version").assert().success();
}

#[test]
fn help_mentions_subcommands() {
    let out = plan().arg("--help").assert().success().get_output().stdout.clone();
    let s = String::from_utf8(out).unwrap();
    for needle in ["decide", "platform", "--log-level"] {
        assert!(s.contains(needle), "help missing `{needle}`");
    }
}

#[test]
fn decide_regression_shape_selects_m_split() {
    plan()
        .args([
            "decide", "--cin", "4", "--din", "120", "--hin", "16", "--win", "16",
            "--cout", "1152", "--kh", "2", "--kw", "2", "--stride", "1,2,2",
            "--dtype", "float32", "--fmap-format", "NCDHW", "--weight-format", "NCDHW",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("mode: m-split"));
}

#[test]
fn decide_json_is_parseable() {
    let out = plan()
        .args([
            "decide", "--cin", "4096", "--hin", "8", "--win", "16", "--cout", "16",
            "--dilation", "2100000,1,1", "--fmap-format", "NCDHW", "--weight-format", "NCDHW",
            "--json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["mode"], "hw-split");
    assert_eq!(value["saturated"], true);
    assert_eq!(value["result"]["partition"]["spatial"]["ho"], 8);
}

#[test]
fn infeasible_shape_exits_with_code_2() {
    plan()
        .args([
            "decide", "--cin", "16", "--hin", "1", "--win", "70000", "--cout", "65536",
            "--fmap-format", "NDHWC", "--weight-format", "DHWCN",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no feasible partitioning"));
}

#[test]
fn failure_is_reported_once() {
    let out = plan()
        .args(["decide", "--cin", "3", "--hin", "4", "--win", "4", "--cout", "4", "--groups", "2"])
        .assert()
        .code(1)
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(out).unwrap();
    assert_eq!(stderr.matches("not divisible").count(), 1, "{stderr}");
}

#[test]
fn invalid_shape_exits_with_code_1() {
    plan()
        .args(["decide", "--cin", "3", "--hin", "4", "--win", "4", "--cout", "4", "--groups", "2"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not divisible"));
}

#[test]
fn platform_preset_prints_toml() {
    plan()
        .args(["platform", "--preset", "ascend310p"])
        .assert()
        .success()
        .stdout(predicate::str::contains("core_count = 8"));
}

#[test]
fn platform_file_and_env_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("platform.toml");
    let preset = conv3d_common::PlatformPreset::Ascend310P.descriptor();
    std::fs::write(&path, preset.to_toml()).unwrap();

    plan()
        .args(["platform", "--platform"])
        .arg(&path)
        .env("CONV3D_PLATFORM_CORE_COUNT", "4")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("core_count = 4")
                .and(predicate::str::contains("l1_size = 1048576")),
        );
}

#[test]
fn unknown_dtype_is_rejected() {
    plan()
        .args(["decide", "--cin", "16", "--hin", "8", "--win", "8", "--cout", "16"])
        .args(["--dtype", "float8"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown data type"));
}
