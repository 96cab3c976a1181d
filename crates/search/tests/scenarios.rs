use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::Arc;
use tcode_catalog::{Catalog, CsvSource, TransactionRecord};
use tcode_search::{MatchTier, Query, Resolution, SearchProfile, TransactionFinder};
use tcode_vector_store::{Embedder, EmbeddingModel};

/// Looks vectors up by normalized text; anything unknown points along the
/// last axis, orthogonal to every seeded vector.
struct FixedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl FixedEmbedder {
    fn new(entries: &[(&str, [f32; 3])]) -> Self {
        Self {
            vectors: entries
                .iter()
                .map(|(text, v)| ((*text).to_string(), v.to_vec()))
                .collect(),
        }
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    fn model_id(&self) -> &str {
        "fixed-3"
    }

    fn dimension(&self) -> usize {
        3
    }

    async fn embed_batch(&self, texts: Vec<&str>) -> tcode_vector_store::Result<Vec<Vec<f32>>> {
        Ok(texts
            .into_iter()
            .map(|t| {
                self.vectors
                    .get(t)
                    .cloned()
                    .unwrap_or_else(|| vec![0.0, 0.0, 1.0])
            })
            .collect())
    }
}

fn purchasing_catalog() -> Catalog {
    Catalog::from_records(vec![
        TransactionRecord::new("ME23N", "display purchase order, view PO").module("MM"),
        TransactionRecord::new("ME51N", "create PR").module("MM").target_system("S4"),
    ])
}

fn open_profile() -> SearchProfile {
    SearchProfile::from_bytes(
        "open",
        br#"{ "thresholds": { "short": 0.0, "medium": 0.0, "long": 0.0, "confident": 1.0 } }"#,
        Some("general"),
    )
    .unwrap()
}

#[tokio::test]
async fn view_po_resolves_exactly_to_me23n() {
    let finder = TransactionFinder::new(
        &SearchProfile::default(),
        Arc::new(EmbeddingModel::stub(32)),
    );
    finder.load(&purchasing_catalog()).await.unwrap();

    let outcome = finder.search(&Query::new("view po")).await.unwrap();
    assert_eq!(
        outcome.mode,
        Resolution::ExactResolved {
            tier: MatchTier::Exact
        }
    );
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].code, "ME23N");
    assert_eq!(outcome.results[0].description, "display purchase order, view PO");
}

#[tokio::test]
async fn medium_query_resolves_semantically_above_threshold() {
    let embedder = FixedEmbedder::new(&[
        ("create pr", [1.0, 0.0, 0.0]),
        ("create purchase requisition", [0.52, 0.854_166, 0.0]),
    ]);
    let finder = TransactionFinder::new(&SearchProfile::default(), Arc::new(embedder));
    finder.load(&purchasing_catalog()).await.unwrap();

    let outcome = finder
        .search(&Query::new("Create purchase requisition"))
        .await
        .unwrap();
    assert_eq!(outcome.mode, Resolution::SemanticResolved { confident: false });
    assert_eq!(outcome.results.len(), 1);

    let row = &outcome.results[0];
    assert_eq!(row.code, "ME51N");
    assert_eq!(row.tier, MatchTier::Semantic);
    assert_eq!(row.target_system.as_deref(), Some("S4"));
    assert_eq!(row.highlighted, "**create** PR");
    // Cosine plus the shared "create" stem.
    assert!(row.score > 0.52 && row.score < 0.6, "{}", row.score);
}

#[tokio::test]
async fn exact_tier_wins_over_stronger_semantic_neighbours() {
    let embedder = FixedEmbedder::new(&[
        ("view po", [1.0, 0.0, 0.0]),
        ("create pr", [1.0, 0.0, 0.0]),
    ]);
    let finder = TransactionFinder::new(&open_profile(), Arc::new(embedder));
    finder.load(&purchasing_catalog()).await.unwrap();

    let outcome = finder.search(&Query::new("view PO")).await.unwrap();
    assert!(matches!(outcome.mode, Resolution::ExactResolved { .. }));
    let codes: Vec<&str> = outcome.results.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, vec!["ME23N"]);
}

#[tokio::test]
async fn empty_table_is_no_match_not_error() {
    let finder = TransactionFinder::new(
        &SearchProfile::default(),
        Arc::new(EmbeddingModel::stub(8)),
    );
    finder.load(&Catalog::from_records(Vec::new())).await.unwrap();

    let outcome = finder.search(&Query::new("anything at all")).await.unwrap();
    assert_eq!(outcome.mode, Resolution::NoMatch);
    assert!(outcome.results.is_empty());
}

#[tokio::test]
async fn unloaded_finder_reports_no_data() {
    let finder = TransactionFinder::new(
        &SearchProfile::default(),
        Arc::new(EmbeddingModel::stub(8)),
    );
    let outcome = finder.search(&Query::new("view po")).await.unwrap();
    assert_eq!(outcome.mode, Resolution::NoData);
}

#[tokio::test]
async fn semantic_results_never_repeat_a_code() {
    let catalog = Catalog::from_records(vec![
        TransactionRecord::new("ME21N", "create purchase order, new po, raise po")
            .alternate("emitir pedido; novo pedido de compra"),
        TransactionRecord::new("ME22N", "change purchase order, edit po"),
        TransactionRecord::new("ME23N", "display purchase order, view po"),
        TransactionRecord::new("ME21N", "purchase order creation"),
    ]);
    let finder = TransactionFinder::new(&open_profile(), Arc::new(EmbeddingModel::stub(24)));
    finder.load(&catalog).await.unwrap();

    for text in ["po", "order for purchasing", "novo pedido", "something unrelated"] {
        let outcome = finder.search(&Query::new(text)).await.unwrap();
        let codes: Vec<&str> = outcome.results.iter().map(|r| r.code.as_str()).collect();
        let unique: HashSet<&str> = codes.iter().copied().collect();
        assert_eq!(codes.len(), unique.len(), "duplicates for {text:?}: {codes:?}");
    }
}

#[tokio::test]
async fn csv_table_with_profile_aliases_loads_and_filters() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "Descrição;T-Code;Módulo;Grupo").unwrap();
    writeln!(file, "Exibir pedido de compra, ver pedido;me23n;MM;purchasing").unwrap();
    writeln!(file, "Exibir documento contábil;FB03;FI;finance|audit").unwrap();
    writeln!(file, "nan;ZZ99;;").unwrap();
    file.flush().unwrap();

    let profile = SearchProfile::from_bytes(
        "pt",
        br#"{ "stemmer": "portuguese", "columns": { "code": ["t-code"] } }"#,
        Some("general"),
    )
    .unwrap();
    let finder = TransactionFinder::new(&profile, Arc::new(EmbeddingModel::stub(16)));

    let source = CsvSource::new(file.path()).with_delimiter(b';');
    let report = finder.load_source(&source).await.unwrap();
    assert_eq!(report.rows_kept, 2);
    assert_eq!(report.rows_dropped, 1);

    let outcome = finder.search(&Query::new("ver pedido")).await.unwrap();
    assert_eq!(outcome.results[0].code, "ME23N");
    assert_eq!(outcome.results[0].module.as_deref(), Some("MM"));

    let outcome = finder
        .search(&Query::new("exibir documento contabil").with_category("Audit"))
        .await
        .unwrap();
    assert_eq!(
        outcome.mode,
        Resolution::ExactResolved {
            tier: MatchTier::Exact
        }
    );
    assert_eq!(outcome.results[0].code, "FB03");
    assert_eq!(outcome.results[0].group.as_deref(), Some("finance|audit"));
}

#[tokio::test]
async fn filler_prefix_resolves_through_prefix_tier() {
    let finder = TransactionFinder::new(
        &SearchProfile::default(),
        Arc::new(EmbeddingModel::stub(8)),
    );
    finder.load(&purchasing_catalog()).await.unwrap();

    let outcome = finder
        .search(&Query::new("Transaction for: create PR"))
        .await
        .unwrap();
    assert_eq!(
        outcome.mode,
        Resolution::ExactResolved {
            tier: MatchTier::PrefixExpanded
        }
    );
    assert_eq!(outcome.results[0].code, "ME51N");
}

#[tokio::test]
async fn full_multi_part_description_is_an_exact_hit() {
    let catalog = Catalog::from_records(vec![
        TransactionRecord::new("ME23N", "display purchase order, view PO"),
        TransactionRecord::new("ZME23", "display purchase order view pos"),
    ]);
    let finder = TransactionFinder::new(
        &SearchProfile::default(),
        Arc::new(EmbeddingModel::stub(16)),
    );
    finder.load(&catalog).await.unwrap();

    let outcome = finder
        .search(&Query::new("Display purchase order, view PO"))
        .await
        .unwrap();
    assert_eq!(
        outcome.mode,
        Resolution::ExactResolved {
            tier: MatchTier::Exact
        }
    );
    let codes: Vec<&str> = outcome.results.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, vec!["ME23N"]);
}

#[tokio::test]
async fn literal_fragment_survives_below_threshold() {
    let embedder = FixedEmbedder::new(&[
        ("display purchase order", [1.0, 0.0, 0.0]),
        ("view po", [1.0, 0.0, 0.0]),
        ("create pr", [0.0, 1.0, 0.0]),
    ]);
    let finder = TransactionFinder::new(&SearchProfile::default(), Arc::new(embedder));
    finder.load(&purchasing_catalog()).await.unwrap();

    let outcome = finder.search(&Query::new("purch")).await.unwrap();
    assert_eq!(outcome.mode, Resolution::SemanticResolved { confident: false });
    let codes: Vec<&str> = outcome.results.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, vec!["ME23N"]);
    assert!(outcome.results[0].score < 0.55, "{}", outcome.results[0].score);
}
