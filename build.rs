//! Build script: embed the git hash and check GPU toolkits.
//!
//! whisper-rs-sys compiles whisper.cpp against the selected GPU backend; a
//! missing toolkit otherwise surfaces as a wall of cmake errors.

use std::process::Command;

fn main() {
    // Embed git short hash for version string
    if let Ok(output) = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        && output.status.success()
    {
        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=GIT_HASH={}", hash);
    }
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");

    if cfg!(feature = "cuda") {
        require_tool("nvcc", &["--version"], "CUDA toolkit", "https://developer.nvidia.com/cuda-downloads");
    }
    if cfg!(feature = "vulkan") {
        require_tool("vulkaninfo", &["--summary"], "Vulkan SDK", "https://vulkan.lunarg.com/");
    }
    if cfg!(feature = "hipblas") {
        require_tool("rocminfo", &[], "ROCm", "https://rocm.docs.amd.com/");
    }
    if cfg!(feature = "openblas") {
        require_tool(
            "pkg-config",
            &["--exists", "openblas"],
            "OpenBLAS",
            "sudo apt install libopenblas-dev",
        );
    }
}

/// Abort the build with install instructions when `tool` can't be run.
fn require_tool(tool: &str, args: &[&str], toolkit: &str, install: &str) {
    let ok = Command::new(tool)
        .args(args)
        .status()
        .is_ok_and(|status| status.success());
    if !ok {
        panic!(
            "\n\n  {toolkit} not found (`{tool}` failed).\n  Install: {install}\n  Or build without the GPU feature: cargo build --release\n"
        );
    }
    println!("cargo::warning={toolkit} detected");
}
