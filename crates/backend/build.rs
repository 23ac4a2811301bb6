use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// target/<profile>, where the backend binary lands.
fn target_profile_dir() -> PathBuf {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    let profile = env::var("PROFILE").expect("PROFILE is set by cargo");

    // OUT_DIR is target/<profile>/build/pharma-backend-xxx/out
    Path::new(&out_dir)
        .ancestors()
        .find(|p| p.ends_with(&profile))
        .expect("Could not find target profile directory")
        .to_path_buf()
}

fn main() {
    println!("cargo:rerun-if-changed=../../config.toml");
    println!("cargo:rerun-if-changed=../../migrations");

    let workspace_root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("Could not find workspace root");
    let target_dir = target_profile_dir();

    // config.toml next to the binary, if the workspace has one
    let source_config = workspace_root.join("config.toml");
    if source_config.exists() {
        let dest_config = target_dir.join("config.toml");
        fs::copy(&source_config, &dest_config)
            .unwrap_or_else(|e| panic!("Failed to copy config.toml: {}", e));
        println!("cargo:warning=Copied config.toml to {:?}", dest_config);
    }

    // Fact store schema, picked up by the migration runner from <exe dir>/migrations
    let source_migrations = workspace_root.join("migrations");
    let dest_migrations = target_dir.join("migrations");
    fs::create_dir_all(&dest_migrations)
        .unwrap_or_else(|e| panic!("Failed to create {:?}: {}", dest_migrations, e));
    for entry in fs::read_dir(&source_migrations)
        .unwrap_or_else(|e| panic!("Failed to read {:?}: {}", source_migrations, e))
        .flatten()
    {
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == "sql") {
            if let Some(name) = path.file_name() {
                fs::copy(&path, dest_migrations.join(name))
                    .unwrap_or_else(|e| panic!("Failed to copy {:?}: {}", path, e));
            }
        }
    }
}
