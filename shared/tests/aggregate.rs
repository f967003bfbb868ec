mod common;

use tangela::{Aggregator, Error, Registry, Source, SourceSelection};

use common::FakeSource;

fn registry(sources: Vec<FakeSource>) -> Registry {
    Registry::new(
        sources
            .into_iter()
            .map(|s| Box::new(s) as Box<dyn Source>)
            .collect(),
    )
}

#[test]
fn groups_follow_registry_order_and_are_stamped() {
    let registry = registry(vec![
        FakeSource::new("mangalib", &["naruto", "boruto"]),
        FakeSource::new("senkuro", &["naruto-shippuden"]),
    ]);

    let groups = Aggregator::new(&registry)
        .search("ruto", 10, &SourceSelection::All)
        .unwrap();

    let keys = groups.iter().map(|g| g.source.as_str()).collect::<Vec<_>>();
    assert_eq!(keys, vec!["mangalib", "senkuro"]);
    assert_eq!(groups[0].items.len(), 2);
    assert!(groups[0].items.iter().all(|i| i.source == "mangalib"));
    assert!(groups[1].items.iter().all(|i| i.source == "senkuro"));
    assert!(groups.iter().all(|g| g.error.is_none()));
}

#[test]
fn failing_source_does_not_affect_the_others() {
    let registry = registry(vec![
        FakeSource::new("mangalib", &["naruto"]).failing(),
        FakeSource::new("senkuro", &["naruto"]),
    ]);

    let groups = Aggregator::new(&registry)
        .search("naruto", 10, &SourceSelection::All)
        .unwrap();

    assert_eq!(groups.len(), 2);
    assert!(groups[0].items.is_empty());
    assert!(groups[0].error.is_some());
    assert_eq!(groups[1].items.len(), 1);
    assert!(groups[1].error.is_none());
}

#[test]
fn panicking_source_is_isolated() {
    let registry = registry(vec![
        FakeSource::new("mangalib", &["naruto"]).panicking(),
        FakeSource::new("senkuro", &["naruto"]),
    ]);

    let groups = Aggregator::new(&registry)
        .search("naruto", 10, &SourceSelection::All)
        .unwrap();

    assert_eq!(groups[0].source, "mangalib");
    assert!(groups[0].error.is_some());
    assert_eq!(groups[1].items.len(), 1);
}

#[test]
fn only_one_source() {
    let registry = registry(vec![
        FakeSource::new("mangalib", &["naruto"]),
        FakeSource::new("senkuro", &["naruto"]),
    ]);

    let selection = "Senkuro".parse::<SourceSelection>().unwrap();
    let groups = Aggregator::new(&registry)
        .search("naruto", 10, &selection)
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].source, "senkuro");
}

#[test]
fn results_are_capped_per_source() {
    let registry = registry(vec![FakeSource::new("mangalib", &["a1", "a2", "a3"])]);

    let groups = Aggregator::new(&registry)
        .search("a", 2, &SourceSelection::All)
        .unwrap();

    assert_eq!(groups[0].items.len(), 2);
}

#[test]
fn unknown_source_is_unsupported() {
    let registry = registry(vec![FakeSource::new("mangalib", &[])]);

    let res = Aggregator::new(&registry).search(
        "naruto",
        10,
        &SourceSelection::Only("mangahub".to_string()),
    );

    assert!(matches!(res, Err(Error::UnsupportedSource(key)) if key == "mangahub"));
}

#[test]
fn selection_parsing() {
    assert_eq!("all".parse::<SourceSelection>().unwrap(), SourceSelection::All);
    assert_eq!("".parse::<SourceSelection>().unwrap(), SourceSelection::All);
    assert_eq!(
        " MangaLib ".parse::<SourceSelection>().unwrap(),
        SourceSelection::Only("mangalib".to_string())
    );
}
