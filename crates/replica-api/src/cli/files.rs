//! `replica files [path]`: inspect the output directory.

use anyhow::Result;
use console::style;

use replica_core::artifact::ArtifactStore;
use replica_infra::artifact::LocalArtifactStore;

/// List every file, or print one file's content.
pub async fn show_files(store: &LocalArtifactStore, path: Option<&str>, json: bool) -> Result<()> {
    match path {
        None => list(store, json).await,
        Some(path) => print_file(store, path, json).await,
    }
}

async fn list(store: &LocalArtifactStore, json: bool) -> Result<()> {
    let tree = store.list_files().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "tree": tree }))?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {}",
        style("Output:").bold(),
        style(store.root().display()).cyan()
    );
    println!();
    if tree.is_empty() {
        println!("  {}", style("No files yet. Run `replica clone <url>`.").dim());
    }
    for file in &tree {
        println!("  {file}");
    }
    println!();
    Ok(())
}

async fn print_file(store: &LocalArtifactStore, path: &str, json: bool) -> Result<()> {
    let content = store.read_file(path).await?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "content": content }))?
        );
    } else {
        print!("{content}");
    }
    Ok(())
}
