//! ---
//! fl_section: "01-core-functionality"
//! fl_subsection: "build"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Build metadata emission for version reporting."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    EmitBuilder::builder().all_build().all_cargo().emit()?;

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
