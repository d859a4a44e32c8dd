use std::process::Command;

fn main() {
    // Short commit of the build tree, reported by `--version` and the startup log.
    let sha = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".into());

    println!("cargo:rustc-env=IBEXPORTER_GIT_SHA={sha}");
    println!("cargo:rerun-if-changed=../../.git/HEAD");
}
