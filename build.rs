fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }
    tonic_build::configure()
        .build_server(false)
        .build_client(false)
        .type_attribute(
            "meridian.ComponentDescriptor",
            "#[derive(serde::Serialize, serde::Deserialize)]",
        )
        .type_attribute(
            "meridian.DomainInputs",
            "#[derive(serde::Serialize, serde::Deserialize)]",
        )
        .type_attribute(
            "meridian.DomainInput",
            "#[derive(serde::Serialize, serde::Deserialize)]",
        )
        .compile_protos(
            &[
                "proto/types.proto",
                "proto/aggregate.proto",
                "proto/saga.proto",
                "proto/process_manager.proto",
                "proto/projector.proto",
                "proto/upcaster.proto",
            ],
            &["proto"],
        )?;
    Ok(())
}
