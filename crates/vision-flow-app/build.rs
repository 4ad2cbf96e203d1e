use std::fs;
use std::path::PathBuf;

// Exposes the workspace-root VERSION as VISION_FLOW_VERSION.
fn main() {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("manifest dir"));
    let version_path = manifest_dir
        .ancestors()
        .nth(2)
        .expect("workspace root above crates/")
        .join("VERSION");
    println!("cargo:rerun-if-changed={}", version_path.display());

    let version = fs::read_to_string(&version_path)
        .expect("read VERSION file")
        .trim()
        .to_string();
    assert!(
        version.split('.').count() == 3 && version.split('.').all(|part| !part.is_empty()),
        "VERSION must be MAJOR.MINOR.PATCH, got {version:?}"
    );

    println!("cargo:rustc-env=VISION_FLOW_VERSION={version}");
}
