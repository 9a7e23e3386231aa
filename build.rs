use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=NSGA3FS_GIT_SHA");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs");

    if let Ok(sha) = env::var("NSGA3FS_GIT_SHA") {
        if !sha.trim().is_empty() {
            println!("cargo:rustc-env=NSGA3FS_GIT_SHA={}", sha.trim());
        }
        return;
    }

    let sha = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string());

    if let Some(sha) = sha.filter(|s| !s.is_empty()) {
        println!("cargo:rustc-env=NSGA3FS_GIT_SHA={}", sha);
    }
}
