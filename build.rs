use rustc_version::{version_meta, Channel};

// `#[bench]` in the descent tests only builds on nightly
fn main() {
    println!("cargo:rustc-check-cfg=cfg(rustc_nightly)");
    println!("cargo:rerun-if-changed=build.rs");

    let nightly = version_meta()
        .map(|meta| meta.channel == Channel::Nightly)
        .unwrap_or(false);
    if nightly {
        println!("cargo:rustc-cfg=rustc_nightly");
    }
}
