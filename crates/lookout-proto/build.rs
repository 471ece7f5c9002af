fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use protoc-bin-vendored to avoid needing protoc installed
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);

    tonic_build::configure()
        .build_client(true)
        // Server stubs are exercised by the integration tests
        .build_server(true)
        .compile_protos(&["proto/detection.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/detection.proto");
    Ok(())
}
