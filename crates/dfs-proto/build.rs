use std::env;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let protoc = protoc_bin_vendored::protoc_bin_path().expect("protoc not found");
    let protoc_include =
        protoc_bin_vendored::include_path().expect("protoc include path not found");

    env::set_var("PROTOC", protoc);
    env::set_var("PROTOC_INCLUDE", protoc_include);

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile(
            &[
                "proto/name_service.proto",
                "proto/chunk_transport.proto",
                "proto/job.proto",
            ],
            &["proto"],
        )?;

    Ok(())
}
