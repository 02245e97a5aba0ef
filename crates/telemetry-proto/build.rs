// Build script to compile Protocol Buffer definitions

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure().out_dir("src/generated").compile_protos(
        &[
            "../../proto/registry.proto",
            "../../proto/scorer.proto",
            "../../proto/gateway.proto",
        ],
        &["../../proto/"],
    )?;

    println!("cargo:rerun-if-changed=../../proto/registry.proto");
    println!("cargo:rerun-if-changed=../../proto/scorer.proto");
    println!("cargo:rerun-if-changed=../../proto/gateway.proto");

    Ok(())
}
