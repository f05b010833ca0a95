/// Build script for the firmware image.
///
/// Puts the crate directory on the linker search path and hands `link.x` to
/// the linker for the binary target only, so host builds of the library
/// crates are unaffected.
use std::env;
use std::path::PathBuf;

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());

    println!("cargo:rustc-link-search={}", manifest_dir.display());
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rerun-if-changed=link.x");
    println!("cargo:rerun-if-changed=src/entry.S");
}
