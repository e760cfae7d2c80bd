use anyhow::{Context, Result};
use lectern::{config::Config, store::open_store, util::preview};

/// Print stored passages in storage order
pub fn inspect_store(config: &Config, limit: usize, offset: usize, full: bool) -> Result<()> {
    let store = open_store(&config.store).context("Failed to open vector store")?;
    let passages = store.peek(limit, offset)?;

    if passages.is_empty() {
        println!("No passages stored (offset {}).", offset);
        return Ok(());
    }

    for (i, passage) in passages.iter().enumerate() {
        let text = if full {
            passage.document.clone()
        } else {
            preview(&passage.document, 160)
        };
        println!("[{}] {}", offset + i, text);
        println!("    meta: {}", serde_json::Value::Object(passage.metadata.clone()));
        println!("    id: {}", passage.id);
    }
    Ok(())
}
