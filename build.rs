//! Build script reporting whether the native libraries the crate links against
//! can be found.
//!
//! `OpenCV` must be installed system-wide. ONNX Runtime is fetched by `ort`
//! unless `ORT_LIB_LOCATION` points at a local build.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=PKG_CONFIG_PATH");
    println!("cargo:rerun-if-env-changed=OPENCV_LINK_PATHS");
    println!("cargo:rerun-if-env-changed=OPENCV_INCLUDE_PATHS");
    println!("cargo:rerun-if-env-changed=ORT_LIB_LOCATION");

    if !pkg_config_available() {
        println!("cargo:warning=pkg-config not found; OpenCV detection skipped.");
        println!("cargo:warning=On Ubuntu: sudo apt-get install pkg-config");
        println!("cargo:warning=On macOS: brew install pkg-config");
        return;
    }

    match opencv_version() {
        Some((package, version)) => {
            println!("cargo:warning=Found {package} version: {version}");
        }
        None => {
            println!("cargo:warning=OpenCV not found via pkg-config. Make sure OpenCV is installed.");
            println!("cargo:warning=On Ubuntu: sudo apt-get install libopencv-dev");
            println!("cargo:warning=On macOS: brew install opencv");
        }
    }

    if let Ok(location) = env::var("ORT_LIB_LOCATION") {
        println!("cargo:warning=Using ONNX Runtime from {location}");
    }
}

fn pkg_config_available() -> bool {
    Command::new("pkg-config")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

fn opencv_version() -> Option<(&'static str, String)> {
    ["opencv4", "opencv"].into_iter().find_map(|package| {
        let output = Command::new("pkg-config")
            .args(["--modversion", package])
            .output()
            .ok()?;
        output
            .status
            .success()
            .then(|| (package, String::from_utf8_lossy(&output.stdout).trim().to_string()))
    })
}
