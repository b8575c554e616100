//! Two-phase shopping research commands

use crate::app::{OutputFormat, QueryArgs, SurveyArgs};
use anyhow::{Context, Result};
use shopscout_core::{
    CategoryResolver, Config, InMemoryCatalog, InMemorySessionCache, LlmClient,
    ResearchRecommendation, SessionCache, ShoppingResearchService, SurveyResponse,
};
use std::sync::Arc;
use std::time::Duration;

fn build_service(
    catalog: Arc<InMemoryCatalog>,
    resolver: Arc<CategoryResolver>,
    llm: Arc<dyn LlmClient>,
    config: &Config,
) -> ShoppingResearchService {
    // Each CLI invocation is its own process, so sessions only live as long
    // as the command; the search id remains advisory either way
    let sessions: Arc<dyn SessionCache> = Arc::new(InMemorySessionCache::new());
    ShoppingResearchService::new(
        catalog,
        resolver,
        llm,
        sessions,
        Duration::from_secs(config.llm_service.timeout_secs),
    )
}

pub async fn run_questions(
    args: QueryArgs,
    catalog: Arc<InMemoryCatalog>,
    resolver: Arc<CategoryResolver>,
    llm: Arc<dyn LlmClient>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let service = build_service(catalog, resolver, llm, config);
    let set = service.generate_questions(&args.query_string()).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&set)?),
        OutputFormat::Cli => {
            println!("search_id: {}", set.search_id);
            println!();
            for question in &set.questions {
                println!("{}. {}", question.question_id, question.question);
                for option in &question.options {
                    println!("   - {}", option);
                }
            }
        }
    }
    Ok(())
}

pub async fn run_survey(
    args: SurveyArgs,
    catalog: Arc<InMemoryCatalog>,
    resolver: Arc<CategoryResolver>,
    llm: Arc<dyn LlmClient>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let survey = load_answers(&args)?;
    let service = build_service(catalog, resolver, llm, config);

    let result = service
        .recommend_from_survey(&args.query_string(), args.search_id.as_deref(), &survey)
        .await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Cli => print_research(&result),
    }
    Ok(())
}

fn load_answers(args: &SurveyArgs) -> Result<Vec<SurveyResponse>> {
    let raw = match (&args.answers, &args.answers_file) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => return Ok(vec![]),
    };

    serde_json::from_str(&raw).context("survey answers must be a JSON array of {question_id, question, answer}")
}

fn print_research(result: &ResearchRecommendation) {
    if result.products.is_empty() {
        println!("'{}'에 맞는 상품을 찾지 못했어요.", result.user_query);
        return;
    }

    for item in &result.products {
        let badge = if item.is_lowest_price { " [최저가]" } else { "" };
        println!(
            "{}. [{}] {}{}",
            item.match_rank, item.product.brand, item.product.name, badge
        );
        println!("   가격: {}원", item.product.price);
        println!(
            "   유사도: {:.2} | 종합 점수: {:.2}",
            item.similarity_score, item.performance_score
        );
        println!("   추천 이유: {}", item.product.recommendation_reason);
        println!("   리뷰 요약: {}", item.ai_review_summary);
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(answers: Option<&str>) -> SurveyArgs {
        SurveyArgs {
            query: vec!["노트북".to_string()],
            search_id: None,
            answers: answers.map(|s| s.to_string()),
            answers_file: None,
        }
    }

    #[test]
    fn test_load_answers_inline() {
        let survey = load_answers(&args(Some(
            r#"[{"question_id": 1, "question": "예산은?", "answer": "200만원"}]"#,
        )))
        .unwrap();
        assert_eq!(survey.len(), 1);
        assert_eq!(survey[0].answer, "200만원");
    }

    #[test]
    fn test_load_answers_missing_is_empty() {
        assert!(load_answers(&args(None)).unwrap().is_empty());
    }

    #[test]
    fn test_load_answers_rejects_garbage() {
        assert!(load_answers(&args(Some("not json"))).is_err());
    }

    #[test]
    fn test_load_answers_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answers.json");
        std::fs::write(
            &path,
            r#"[{"question_id": 2, "question": "용도는?", "answer": "게임"}]"#,
        )
        .unwrap();

        let mut args = args(None);
        args.answers_file = Some(path);

        let survey = load_answers(&args).unwrap();
        assert_eq!(survey.len(), 1);
        assert_eq!(survey[0].question_id, 2);
    }
}
