//! Build script for proto compilation.
//!
//! This is used during development to regenerate the proto types.
//! The generated code is committed to the repository, so this only needs
//! to run when a proto file changes.
//!
//! To regenerate: `cargo build --features regenerate-proto`
//!
//! The host protocol lands in `src/generated.rs` (server side only) and the
//! Tinkerbell services land in `src/tink/{template,workflow,hardware}.rs`
//! (client side only).

const TINK_PROTOS: [&str; 3] = [
    "proto/tink/template.proto",
    "proto/tink/workflow.proto",
    "proto/tink/hardware.proto",
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only regenerate if the feature is enabled
    #[cfg(feature = "regenerate-proto")]
    {
        let out_dir = std::path::PathBuf::from("src");
        tonic_prost_build::configure()
            .build_client(false)
            .out_dir(&out_dir)
            .compile_protos(&["proto/provider.proto"], &["proto"])?;

        let generated = out_dir.join("plugin.v1.rs");
        if generated.exists() {
            std::fs::rename(generated, out_dir.join("generated.rs"))?;
        }

        let tink_dir = out_dir.join("tink");
        tonic_prost_build::configure()
            .build_server(false)
            .out_dir(&tink_dir)
            .compile_protos(&TINK_PROTOS, &["proto"])?;

        for service in ["template", "workflow", "hardware"] {
            let generated = tink_dir.join(format!(
                "github.com.tinkerbell.tink.protos.{}.rs",
                service
            ));
            if generated.exists() {
                std::fs::rename(generated, tink_dir.join(format!("{}.rs", service)))?;
            }
        }
    }

    // Always rerun if a proto changes
    println!("cargo:rerun-if-changed=proto/provider.proto");
    for proto in TINK_PROTOS {
        println!("cargo:rerun-if-changed={}", proto);
    }

    Ok(())
}
