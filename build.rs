//! Build script for kgmirror
//!
//! Embeds version and target information used in the HTTP user agent and
//! `--version` output.

use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Set version for embedding
    let version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());
    println!("cargo:rustc-env=KGMIRROR_VERSION={}", version);

    // Emit target info
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=KGMIRROR_TARGET={}", target);
}
