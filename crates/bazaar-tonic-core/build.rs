/// Builds the gRPC client and server code for the `bazaar.proto` definition
/// using `tonic-prost-build`.
///
/// Code generation processes the Protocol Buffer definitions located in the
/// `proto` directory and emits Rust modules with gRPC bindings into the
/// crate's `OUT_DIR`. A file descriptor set is emitted alongside so the
/// server can register gRPC reflection.
///
/// Generated code is accessible in Rust via:
///
/// ```rust
/// pub mod bazaar {
///     tonic::include_proto!("bazaar");
/// }
/// ```
use std::env;
use std::path::PathBuf;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("bazaar_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/bazaar.proto"], &["proto"])
        .unwrap();
}
