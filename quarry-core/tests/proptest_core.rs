//! Property-based tests for the pipeline invariants using proptest.

use proptest::prelude::*;

use quarry_core::research::evidence::relevance_score;
use quarry_core::research::plan::{Plan, parse_plan};
use quarry_core::research::query::basic_cleanup;
use quarry_core::research::relevancy::parse_relevancy_response;
use quarry_core::research::synthesis::insert_visuals;
use quarry_core::search::{SearchResult, dedup_by_url};
use std::collections::HashSet;

// --- Relevancy gate ---

proptest! {
    #[test]
    fn low_score_is_never_relevant(
        score in 0.0f64..0.6,
        body in "[a-zA-Z .:-]{0,120}",
    ) {
        let response = format!(
            "Relevancy Score: {score}\nIs Relevant: Yes\nReasoning: relevant and aligned. {body}"
        );
        let verdict = parse_relevancy_response(&response);
        prop_assert!(!verdict.is_relevant);
    }

    #[test]
    fn verdict_score_in_unit_range(response in ".{0,300}") {
        let verdict = parse_relevancy_response(&response);
        prop_assert!((0.0..=1.0).contains(&verdict.score));
        prop_assert!(verdict.reasoning.chars().count() <= 500);
        if verdict.score < 0.6 {
            prop_assert!(!verdict.is_relevant);
        }
    }
}

// --- Evidence relevance ---

proptest! {
    #[test]
    fn relevance_in_unit_range(
        text in ".{0,200}",
        areas in prop::collection::vec("[a-z]{1,10}", 0..8),
    ) {
        let score = relevance_score(&text, &areas);
        prop_assert!((0.0..=1.0).contains(&score));
        if areas.is_empty() {
            prop_assert_eq!(score, 0.5);
        } else {
            prop_assert!(score >= 0.3);
        }
    }
}

// --- Deduplication ---

fn result_strategy() -> impl Strategy<Value = SearchResult> {
    (0usize..6, "[a-z]{0,8}").prop_map(|(n, title)| {
        SearchResult::new(title, "snippet", format!("https://site{n}.example"), "prop")
    })
}

proptest! {
    #[test]
    fn dedup_keeps_first_of_each_url(results in prop::collection::vec(result_strategy(), 0..20)) {
        let deduped = dedup_by_url(results.clone());

        let urls: HashSet<_> = deduped.iter().map(|r| r.url.clone()).collect();
        prop_assert_eq!(urls.len(), deduped.len());

        for kept in &deduped {
            let first = results.iter().find(|r| r.url == kept.url).unwrap();
            prop_assert_eq!(&first.title, &kept.title);
        }

        let distinct: HashSet<_> = results.iter().map(|r| r.url.clone()).collect();
        prop_assert_eq!(distinct.len(), deduped.len());
    }
}

// --- Planning ---

proptest! {
    #[test]
    fn default_plan_is_complete(query in "\\PC{1,80}") {
        let plan = Plan::default_for(&query);
        prop_assert!(plan.is_complete());
        prop_assert_eq!(plan.search_queries[0].as_str(), query.as_str());
        prop_assert!(plan.focus_areas.len() <= 5);
    }

    #[test]
    fn parsed_plan_never_empty_without_bullets(response in "[a-zA-Z ,.]{0,200}") {
        // No braces and no bullets, so the default plan applies
        let (plan, _) = parse_plan(&response, "grid storage");
        prop_assert_eq!(plan, Plan::default_for("grid storage"));
    }
}

// --- Query cleanup and report assembly ---

proptest! {
    #[test]
    fn cleanup_ends_with_punctuation(query in "[a-z ]{1,60}") {
        let cleaned = basic_cleanup(&query);
        prop_assert!(cleaned.ends_with(['?', '.', '!']));
        prop_assert!(cleaned.split_whitespace().count() >= 5 || cleaned.starts_with("What are"));
    }

    #[test]
    fn visuals_inserted_exactly_once(
        body in "[a-zA-Z \n#]{0,200}",
    ) {
        let visuals = "VISUAL_BLOCK";
        let out = insert_visuals(&body, visuals);
        prop_assert_eq!(out.matches(visuals).count(), 1);
        prop_assert!(out.len() > body.len());
    }

    #[test]
    fn empty_visuals_leave_report_unchanged(body in "[a-zA-Z \n#]{0,200}") {
        prop_assert_eq!(insert_visuals(&body, ""), body);
    }
}
