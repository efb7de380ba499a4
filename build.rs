use std::error::Error;
use vergen_gitcl::{Emitter, GitclBuilder};

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo::rustc-check-cfg=cfg(has_git_describe)");

    // Only tags of the form v* are considered, anything else falls back to the short hash
    let mut git = GitclBuilder::default();
    git.describe(true, true, Some("v*"));

    let emitted = Emitter::default()
        .fail_on_error()
        .quiet()
        .add_instructions(&git.build()?)
        .and_then(|e| e.emit())
        .is_ok();

    if emitted {
        println!("cargo:rustc-cfg=has_git_describe");
    }

    for path in ["build.rs", ".git/HEAD", ".git/refs/heads", ".git/refs/tags"] {
        println!("cargo:rerun-if-changed={path}");
    }

    Ok(())
}
