//! One-shot recommendation command

use crate::app::{OutputFormat, QueryArgs};
use anyhow::Result;
use shopscout_core::{
    CategoryResolver, Config, InMemoryCatalog, LlmClient, Recommendation, RecommendationEngine,
};
use std::sync::Arc;
use std::time::Duration;

pub async fn run(
    args: QueryArgs,
    catalog: Arc<InMemoryCatalog>,
    resolver: Arc<CategoryResolver>,
    llm: Arc<dyn LlmClient>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let engine = RecommendationEngine::new(
        catalog,
        resolver,
        llm,
        Duration::from_secs(config.llm_service.timeout_secs),
    );

    let query = args.query_string();
    let result = engine.recommend(&query).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Cli => print_recommendation(&result),
    }
    Ok(())
}

fn print_recommendation(result: &Recommendation) {
    println!("{}", result.analysis_message);
    println!();

    if result.recommended_products.is_empty() {
        return;
    }

    for (i, item) in result.recommended_products.iter().enumerate() {
        println!("{}. [{}] {}", i + 1, item.brand, item.name);
        println!("   가격: {}원", item.price);
        if let Some(rating) = item.review_rating {
            println!("   리뷰: {}개 | 평점: {:.1}", item.review_count, rating);
        } else {
            println!("   리뷰: {}개", item.review_count);
        }
        let specs = item.specs.summary_line();
        if !specs.is_empty() {
            println!("   스펙: {}", specs);
        }
        println!("   추천 이유: {}", item.recommendation_reason);
        if let Some(ref url) = item.product_detail_url {
            println!("   {}", url);
        }
        println!();
    }
}
