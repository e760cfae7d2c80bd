use super::parse_where;
use anyhow::{Context, Result};
use lectern::{config::Config, util::preview, RankedResult, Retriever};
use tracing::info;

pub fn search_index(
    config: &Config,
    query_text: &str,
    top_k: Option<usize>,
    where_json: Option<&str>,
    format: &str,
) -> Result<()> {
    let k = top_k.unwrap_or(config.retrieval.default_k);
    let filter = parse_where(where_json)?;
    info!("Searching for: {} (k={})", query_text, k);

    let retriever = Retriever::from_config(config)?;
    let result = retriever
        .similar(query_text, k, filter)
        .with_context(|| format!("Search failed for '{}'", query_text))?;

    output_search_results(&result, format, query_text)
}

fn output_search_results(result: &RankedResult, format: &str, query: &str) -> Result<()> {
    match format {
        "json" | "json-pretty" => {
            let response = serde_json::json!({
                "query": query,
                "total": result.len(),
                "results": result,
            });
            let json = if format == "json" {
                serde_json::to_string(&response)?
            } else {
                serde_json::to_string_pretty(&response)?
            };
            println!("{}", json);
        }
        _ => {
            println!("\nSearch Results ({} passages):\n", result.len());
            for (i, passage) in result.passages().enumerate() {
                println!(
                    "[{}] [Distance: {:.4}] {}",
                    i + 1,
                    passage.distance,
                    passage.meta_str("title").unwrap_or("(untitled)"),
                );
                println!("   ID: {}", passage.id);
                println!("   {}", preview(passage.text, 200));
                println!();
            }
        }
    }
    Ok(())
}
