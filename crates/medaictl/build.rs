// Build script for medaictl - embeds version at compile time

fn main() {
    let version =
        std::env::var("MEDAI_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=MEDAI_VERSION={}", version);
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=MEDAI_VERSION");
}
