//! End-to-end facet phase behaviour over multi-segment in-RAM indexes.

mod common;

use common::{bundle, catalogue, context, product, query, searcher};
use prism_facets::config::{FacetConfig, SearchConfig};
use prism_facets::facet::{
    Bucket, CollectorExecutor, CountFacetExecutor, Facet, FacetEntry, FacetExecutor, FacetMode,
    FacetPhase, FacetPost, FacetRegistry, FacetRequest, FacetScope, FacetValue, PostExecutor,
    SearchContextFacets, StatsResult, TermsResult,
};
use prism_facets::index::{Filter, LeafContext, LeafDocSet};
use prism_facets::response::FacetResponse;
use prism_facets::search::{Collector, ContextId, FacetPhaseState, QueryPhase, SearchContext};
use prism_facets::{Error, Result};
use tantivy::{DocId, Score};

fn build(searcher: &tantivy::Searcher, requests: Vec<FacetRequest>) -> SearchContextFacets {
    FacetRegistry::new(searcher.schema().clone())
        .build(requests)
        .unwrap()
}

fn run(phase: &QueryPhase, ctx: &mut SearchContext) -> Result<()> {
    phase.pre_process(ctx)?;
    phase.execute(ctx)
}

fn count_of(ctx: &SearchContext, name: &str) -> u64 {
    match ctx.query_result().facets().unwrap().get(name).unwrap().value() {
        FacetValue::Count { count } => *count,
        other => panic!("facet [{}] is not a count: {:?}", name, other),
    }
}

struct BrokenExecutor;

struct BrokenPost;

impl FacetPost for BrokenPost {
    fn execute_post(&mut self, _doc_sets: &[LeafDocSet<'_>]) -> Result<()> {
        Err(Error::Facet("segment unreadable".to_string()))
    }
}

impl PostExecutor for BrokenExecutor {
    fn post(&self) -> Box<dyn FacetPost> {
        Box::new(BrokenPost)
    }

    fn build_facet(&self, name: &str) -> Result<Facet> {
        Ok(Facet::new(name, FacetValue::Count { count: 0 }))
    }
}

struct RejectingExecutor;

struct RejectingCollector;

impl Collector for RejectingCollector {
    fn set_leaf(&mut self, _leaf: &LeafContext<'_>) -> Result<()> {
        Ok(())
    }

    fn collect(&mut self, _doc: DocId, _score: Score) -> Result<()> {
        Err(Error::Facet("column unreadable".to_string()))
    }
}

impl CollectorExecutor for RejectingExecutor {
    fn collector(&self) -> Box<dyn Collector> {
        Box::new(RejectingCollector)
    }

    fn build_facet(&self, name: &str) -> Result<Facet> {
        Ok(Facet::new(name, FacetValue::Count { count: 0 }))
    }
}

fn local_count(name: &str) -> FacetEntry {
    FacetEntry::new(
        name,
        FacetScope::Local,
        None,
        FacetExecutor::with_mode(CountFacetExecutor::new(), FacetMode::Collector),
    )
}

#[test]
fn test_local_collector_sees_only_query_matches() {
    let searcher = catalogue();
    let facets = build(
        &searcher,
        vec![
            FacetRequest::count("matched"),
            FacetRequest::terms("colors", "color", 10),
        ],
    );
    let red = query(&searcher, Filter::term("color", "red"));
    let mut ctx = context(searcher, facets).with_query(red);

    run(&QueryPhase::default(), &mut ctx).unwrap();

    assert_eq!(count_of(&ctx, "matched"), 3);
    let colors = ctx.query_result().facets().unwrap().get("colors").unwrap();
    assert_eq!(
        colors.value(),
        &FacetValue::Terms(TermsResult {
            missing: 0,
            other: 0,
            total: 3,
            buckets: vec![Bucket {
                key: "red".to_string(),
                count: 3,
            }],
        })
    );
    assert_eq!(ctx.query_result().facet_state(), FacetPhaseState::Executed);
    assert_eq!(ctx.searcher().stats().main_scans, 1);
    assert_eq!(ctx.searcher().stats().auxiliary_scans, 0);
}

#[test]
fn test_global_post_sees_every_live_document() {
    let searcher = searcher(
        &[
            &[
                product(1, "red", 10),
                product(2, "blue", 20),
                product(3, "red", 30),
            ],
            &[
                product(4, "red", 40),
                product(5, "blue", 50),
                product(6, "green", 60),
            ],
        ],
        &[6],
    );
    let facets = build(
        &searcher,
        vec![FacetRequest::count("matched"), FacetRequest::count("everything").global()],
    );
    let blue = query(&searcher, Filter::term("color", "blue"));
    let mut ctx = context(searcher, facets).with_query(blue);

    run(&QueryPhase::default(), &mut ctx).unwrap();

    assert_eq!(count_of(&ctx, "matched"), 2);
    assert_eq!(count_of(&ctx, "everything"), 5);
    // Global post facets never scan.
    assert_eq!(ctx.searcher().stats().auxiliary_scans, 0);
}

#[test]
fn test_global_post_is_independent_of_query() {
    let run_with = |filter: Filter| {
        let searcher = catalogue();
        let facets = build(
            &searcher,
            vec![
                FacetRequest::terms("colors", "color", 5)
                    .global()
                    .mode(FacetMode::Post),
                FacetRequest::stats("prices", "price")
                    .global()
                    .mode(FacetMode::Post),
            ],
        );
        let main = query(&searcher, filter);
        let mut ctx = context(searcher, facets).with_query(main);
        run(&QueryPhase::default(), &mut ctx).unwrap();
        ctx.query_result().facets().cloned().unwrap()
    };

    let broad = run_with(Filter::MatchAll);
    let narrow = run_with(Filter::term("price", 50u64));

    assert_eq!(broad, narrow);
    match broad.get("colors").unwrap().value() {
        FacetValue::Terms(terms) => assert_eq!(terms.total, 5),
        other => panic!("unexpected value {:?}", other),
    }
}

#[test]
fn test_global_collectors_with_one_filter_share_a_scan() {
    let searcher = catalogue();
    let red = Filter::term("color", "red");
    let facets = build(
        &searcher,
        vec![
            FacetRequest::stats("red_prices", "price")
                .global()
                .filter(red.clone()),
            FacetRequest::terms("red_colors", "color", 5)
                .global()
                .filter(Filter::and(vec![red, Filter::MatchAll])),
            FacetRequest::count("matched"),
        ],
    );
    let blue = query(&searcher, Filter::term("color", "blue"));
    let mut ctx = context(searcher, facets).with_query(blue);

    run(&QueryPhase::default(), &mut ctx).unwrap();

    let stats = ctx.searcher().stats();
    assert_eq!(stats.main_scans, 1);
    assert_eq!(stats.auxiliary_scans, 1);

    let facets = ctx.query_result().facets().unwrap();
    assert_eq!(
        facets.get("red_prices").unwrap().value(),
        &FacetValue::Stats(StatsResult {
            count: 3,
            min: Some(10.0),
            max: Some(40.0),
            sum: Some(80.0),
            avg: Some(80.0 / 3.0),
        })
    );
    match facets.get("red_colors").unwrap().value() {
        FacetValue::Terms(terms) => assert_eq!(terms.total, 3),
        other => panic!("unexpected value {:?}", other),
    }
    assert_eq!(count_of(&ctx, "matched"), 2);
}

#[test]
fn test_failing_post_reports_facet_and_stores_nothing() {
    let searcher = catalogue();
    let mut entries = vec![local_count("matched")];
    entries.push(FacetEntry::new(
        "broken",
        FacetScope::Global,
        None,
        FacetExecutor::Post(Box::new(BrokenExecutor)),
    ));
    let mut ctx = context(searcher, SearchContextFacets::new(entries));

    let err = run(&QueryPhase::default(), &mut ctx).unwrap_err();

    match &err {
        Error::FacetExecution {
            context,
            facet,
            source,
        } => {
            assert_eq!(facet, "broken");
            assert_eq!(context, &ContextId::new("catalogue", 0, 1));
            assert!(matches!(**source, Error::Facet(_)));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(ctx.query_result().facets().is_none());
    assert_ne!(ctx.query_result().facet_state(), FacetPhaseState::Executed);

    let response = FacetResponse::failure(&err);
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["error"]["facet"], "broken");
}

#[test]
fn test_failing_local_post_reports_facet_and_stores_nothing() {
    let searcher = catalogue();
    let entries = vec![
        local_count("matched"),
        FacetEntry::new(
            "local_broken",
            FacetScope::Local,
            None,
            FacetExecutor::Post(Box::new(BrokenExecutor)),
        ),
    ];
    let mut ctx = context(searcher, SearchContextFacets::new(entries));

    let err = run(&QueryPhase::default(), &mut ctx).unwrap_err();

    assert!(matches!(err, Error::FacetExecution { .. }));
    assert_eq!(err.facet_name(), Some("local_broken"));
    assert_eq!(err.context(), Some(&ContextId::new("catalogue", 0, 1)));
    assert!(err.to_string().contains("segment unreadable"));
    assert!(ctx.query_result().facets().is_none());
    assert_eq!(ctx.query_result().facet_state(), FacetPhaseState::PreProcessed);
}

#[test]
fn test_failing_global_collector_reports_group_filter() {
    let searcher = catalogue();
    let entries = vec![
        local_count("matched"),
        FacetEntry::new(
            "rejecting",
            FacetScope::Global,
            None,
            FacetExecutor::Collector(Box::new(RejectingExecutor)),
        ),
    ];
    let mut ctx = context(searcher, SearchContextFacets::new(entries));

    let err = run(&QueryPhase::default(), &mut ctx).unwrap_err();

    match &err {
        Error::GlobalFacetExecution {
            context,
            filter,
            source,
        } => {
            assert_eq!(context, &ContextId::new("catalogue", 0, 1));
            assert_eq!(filter, "*");
            assert!(matches!(**source, Error::Facet(_)));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(err.kind(), "global_facet_execution");
    assert!(err.facet_name().is_none());
    assert!(ctx.query_result().facets().is_none());
    assert_ne!(ctx.query_result().facet_state(), FacetPhaseState::Executed);
    assert_eq!(ctx.searcher().stats().auxiliary_scans, 1);

    let json = serde_json::to_value(FacetResponse::failure(&err)).unwrap();
    assert_eq!(json["error"]["type"], "global_facet_execution");
    assert!(json["error"].get("facet").is_none());
}

#[test]
fn test_filtered_local_facets() {
    let searcher = catalogue();
    let facets = build(
        &searcher,
        vec![
            FacetRequest::count("blue_matches").filter(Filter::term("color", "blue")),
            FacetRequest::count("cheap_red")
                .mode(FacetMode::Post)
                .filter(Filter::and(vec![
                    Filter::term("color", "red"),
                    Filter::not(Filter::term("price", 40u64)),
                ])),
            FacetRequest::count("all_matches"),
        ],
    );
    let mut ctx = context(searcher, facets);

    run(&QueryPhase::default(), &mut ctx).unwrap();

    assert_eq!(count_of(&ctx, "blue_matches"), 2);
    assert_eq!(count_of(&ctx, "cheap_red"), 2);
    assert_eq!(count_of(&ctx, "all_matches"), 5);
}

#[test]
fn test_second_execute_changes_nothing() {
    let searcher = catalogue();
    let facets = build(
        &searcher,
        vec![
            FacetRequest::count("matched"),
            FacetRequest::terms("colors", "color", 1).global(),
            FacetRequest::count("everything").global(),
        ],
    );
    let mut ctx = context(searcher, facets);
    let phase = FacetPhase::default();

    phase.pre_process(&mut ctx).unwrap();
    let main = ctx.main_query().unwrap();
    let hits = ctx.searcher_mut().execute_main_query(main.as_ref(), 10).unwrap();
    ctx.query_result_mut().set_top_hits(hits);
    phase.execute(&mut ctx).unwrap();

    let stats = ctx.searcher().stats();
    let first = ctx.query_result().facets().cloned().unwrap();

    phase.execute(&mut ctx).unwrap();

    assert_eq!(ctx.searcher().stats(), stats);
    assert_eq!(ctx.query_result().facets(), Some(&first));
    assert_eq!(
        first.get("colors").unwrap().value(),
        &FacetValue::Terms(TermsResult {
            missing: 0,
            other: 2,
            total: 5,
            buckets: vec![Bucket {
                key: "red".to_string(),
                count: 3,
            }],
        })
    );
}

#[test]
fn test_type_filter_scopes_global_collector_scans() {
    let searcher = searcher(
        &[
            &[product(1, "red", 10), bundle(2, "red", 25)],
            &[product(3, "blue", 30), bundle(4, "red", 45)],
        ],
        &[],
    );
    let facets = build(
        &searcher,
        vec![
            FacetRequest::count("matched"),
            FacetRequest::count("scanned").global().mode(FacetMode::Collector),
            FacetRequest::count("index").global(),
        ],
    );
    let mut ctx =
        SearchContext::new(ContextId::new("shop", 1, 4), searcher, &SearchConfig::default())
            .with_types(vec!["product".to_string()])
            .with_facets(facets);

    run(&QueryPhase::default(), &mut ctx).unwrap();

    assert_eq!(count_of(&ctx, "matched"), 2);
    assert_eq!(count_of(&ctx, "scanned"), 2);
    // Global post facets are not scoped to the requested types.
    assert_eq!(count_of(&ctx, "index"), 4);
}

#[test]
fn test_unbatched_global_collectors_scan_once_each() {
    let searcher = catalogue();
    let requests = || {
        vec![
            FacetRequest::count("a").global().mode(FacetMode::Collector),
            FacetRequest::stats("b", "price").global(),
            FacetRequest::terms("c", "color", 3).global(),
        ]
    };

    let facets = build(&searcher, requests());
    let mut batched = context(searcher.clone(), facets);
    run(&QueryPhase::default(), &mut batched).unwrap();
    assert_eq!(batched.searcher().stats().auxiliary_scans, 1);

    let facets = build(&searcher, requests());
    let mut unbatched = context(searcher, facets);
    let phase = QueryPhase::new(&FacetConfig {
        batch_global_collectors: false,
    });
    run(&phase, &mut unbatched).unwrap();
    assert_eq!(unbatched.searcher().stats().auxiliary_scans, 3);

    assert_eq!(
        batched.query_result().facets(),
        unbatched.query_result().facets()
    );
}

#[test]
fn test_response_lists_facets_in_request_order() {
    let searcher = catalogue();
    let facets = build(
        &searcher,
        vec![
            FacetRequest::count("zeta"),
            FacetRequest::count("alpha").global(),
            FacetRequest::stats("mid", "price"),
        ],
    );
    let mut ctx = context(searcher, facets);
    run(&QueryPhase::default(), &mut ctx).unwrap();

    let response = FacetResponse::from_result(Ok(ctx.query_result().facets()));
    let json = response.to_json().unwrap();

    assert!(json.starts_with(r#"{"ok":true,"facets":{"zeta""#));
    assert!(json.find("\"alpha\"").unwrap() < json.find("\"mid\"").unwrap());
}
