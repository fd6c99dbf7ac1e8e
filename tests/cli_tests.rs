use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn maskforge(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_maskforge"))
        .args(args)
        .output()
        .expect("failed to launch maskforge")
}

fn lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_generate_with_limit() {
    let out = maskforge(&["generate", "-m", "?d?d", "--limit", "5"]);
    assert!(out.status.success());
    let lines = lines(&out);
    assert_eq!(lines, vec!["11", "01", "21", "31", "91"]);
    let re = Regex::new(r"^\d{2}$").unwrap();
    assert!(lines.iter().all(|l| re.is_match(l)));
}

#[test]
fn test_generate_session_resumes_and_cleans_up() {
    let dir = TempDir::new().unwrap();
    let session = dir.path().join("digits.session");
    let session_arg = session.to_str().unwrap();

    let first = maskforge(&["generate", "-m", "?d?d", "--limit", "30", "--session", session_arg]);
    assert!(first.status.success());
    assert_eq!(lines(&first).len(), 30);
    assert!(session.exists());
    let saved = fs::read_to_string(&session).unwrap();
    assert!(Regex::new(r#""remaining":\s*70"#).unwrap().is_match(&saved));

    let second = maskforge(&["generate", "-m", "?d?d", "--session", session_arg, "--save-every", "7"]);
    assert!(second.status.success());
    let rest = lines(&second);
    assert_eq!(rest.len(), 70);
    assert!(!session.exists());

    let all: HashSet<String> = lines(&first).into_iter().chain(rest).collect();
    assert_eq!(all.len(), 100);
}

#[test]
fn test_session_for_other_mask_is_rejected() {
    let dir = TempDir::new().unwrap();
    let session = dir.path().join("run.session");
    let session_arg = session.to_str().unwrap();

    maskforge(&["generate", "-m", "?d?d", "--limit", "3", "--session", session_arg]);
    let out = maskforge(&["generate", "-m", "?l?d", "--session", session_arg]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("pattern changed"));
    assert!(out.stdout.is_empty());
}

#[test]
fn test_node_outputs_are_disjoint() {
    let a = lines(&maskforge(&["generate", "-m", "[a-e]?d", "--node", "1/2"]));
    let b = lines(&maskforge(&["generate", "-m", "[a-e]?d", "--node", "2/2"]));
    assert_eq!(a.len(), 25);
    assert_eq!(b.len(), 25);
    let all: HashSet<_> = a.iter().chain(&b).collect();
    assert_eq!(all.len(), 50);
}

#[test]
fn test_invalid_mask_exits_nonzero() {
    let out = maskforge(&["generate", "-m", "[ab"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("unbalanced brackets"));
}

#[test]
fn test_config_file_with_override() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("mask.json");
    fs::write(&config, r#"{"pattern": "[xy]", "custom_1": "01"}"#).unwrap();
    let config_arg = config.to_str().unwrap();

    let out = maskforge(&["--config", config_arg, "generate"]);
    assert_eq!(lines(&out), vec!["x", "y"]);

    let out = maskforge(&["--config", config_arg, "generate", "-m", "?1z"]);
    assert_eq!(lines(&out), vec!["0z", "1z"]);
}

#[test]
fn test_inspect_reports_totals() {
    let out = maskforge(&["inspect", "-m", "?l?d", "--nodes", "3"]);
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(Regex::new(r"Candidates\s*\|\s*260").unwrap().is_match(&text));
    assert!(text.contains("odometer"));
    assert!(text.contains("3/3"));
}

#[test]
fn test_encodings_listing() {
    let out = maskforge(&["encodings"]);
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    for name in ["ascii", "iso-8859-1", "cp1252", "koi8-r"] {
        assert!(text.contains(name), "missing {}", name);
    }
}

#[test]
fn test_crack_finds_targets() {
    let dir = TempDir::new().unwrap();
    let targets = dir.path().join("targets.csv");
    let digest = |s: &str| hex::encode(Sha256::digest(s.as_bytes()));
    fs::write(
        &targets,
        format!("alice,{}\nbob,{}\n", digest("ab1"), digest("zz7")),
    )
    .unwrap();

    let out = maskforge(&[
        "crack",
        "-m",
        "?l?l?d",
        "-t",
        targets.to_str().unwrap(),
        "-j",
        "3",
    ]);
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(Regex::new(r"alice\s*\|\s*ab1").unwrap().is_match(&text));
    assert!(Regex::new(r"bob\s*\|\s*zz7").unwrap().is_match(&text));
}

#[test]
fn test_crack_threads_cover_node_boundaries() {
    let dir = TempDir::new().unwrap();
    let targets = dir.path().join("targets.csv");
    let digest = |s: &str| hex::encode(Sha256::digest(s.as_bytes()));
    // 23 candidates: node 1/2 owns a..k, node 2/2 owns l..w.
    fs::write(
        &targets,
        format!("edge,{}\nnext,{}\n", digest("k"), digest("l")),
    )
    .unwrap();
    let targets_arg = targets.to_str().unwrap();

    let first = maskforge(&["crack", "-m", "[a-w]", "-t", targets_arg, "--node", "1/2", "-j", "3"]);
    assert!(first.status.success());
    let text = String::from_utf8_lossy(&first.stdout);
    assert!(Regex::new(r"edge\s*\|\s*k\s*\|\s*1/2").unwrap().is_match(&text));
    assert!(!text.contains("next"));

    let second = maskforge(&["crack", "-m", "[a-w]", "-t", targets_arg, "--node", "2/2", "-j", "3"]);
    assert!(second.status.success());
    let text = String::from_utf8_lossy(&second.stdout);
    assert!(Regex::new(r"next\s*\|\s*l\s*\|\s*2/2").unwrap().is_match(&text));
    assert!(!text.contains("edge"));
}
