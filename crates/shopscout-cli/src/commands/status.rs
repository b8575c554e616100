//! Catalog status command

use crate::app::OutputFormat;
use anyhow::Result;
use shopscout_core::InMemoryCatalog;

pub fn run(catalog: &InMemoryCatalog, format: OutputFormat) -> Result<()> {
    let products = catalog.len();
    let embedded = catalog.embedded_count();

    match format {
        OutputFormat::Json => {
            let status = serde_json::json!({
                "products": products,
                "products_with_embeddings": embedded,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        OutputFormat::Cli => {
            println!("products: {}", products);
            println!("with embeddings: {}", embedded);
            if embedded == 0 && products > 0 {
                println!("note: no embeddings loaded, vector search is inactive");
            }
        }
    }
    Ok(())
}
