use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let protoc_path = protoc_bin_vendored::protoc_bin_path()?;
    std::env::set_var("PROTOC", protoc_path);

    println!("cargo:rerun-if-changed=proto/ext_authz.proto");
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile(&["proto/ext_authz.proto"], &["proto"])?;

    Ok(())
}
