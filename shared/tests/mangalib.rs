mod common;

use serde_json::json;
use tangela::config::MangaLibConfig;
use tangela::sources::MangaLib;
use tangela::{CancelToken, ContentType, Error, MangaStatus, PageRequest, Source};

use common::StubTransport;

const API: &str = "https://api.cdnlibs.org/api/manga";

fn mangalib(transport: &StubTransport) -> MangaLib {
    MangaLib::new(MangaLibConfig::default(), Box::new(transport.clone()))
}

fn search_hit(i: usize) -> serde_json::Value {
    json!({
        "rus_name": format!("Ван Пис {}", i),
        "name": format!("One Piece {}", i),
        "slug_url": format!("{}--one-piece-{}", i, i),
        "cover": { "default": format!("https://cover.imglib.info/{}.jpg", i) },
        "type": { "label": "Манга" },
        "releaseDate": "1997",
        "rate_avg": "9.1",
    })
}

#[test]
fn search_is_capped_and_tagged() {
    let hits = (0..8).map(search_hit).collect::<Vec<_>>();
    let transport = StubTransport::new().reply(&format!("{}?q=", API), json!({ "data": hits }));
    let source = mangalib(&transport);

    let items = source.search("one piece", 5).unwrap();

    assert_eq!(items.len(), 5);
    assert!(items.iter().all(|i| i.source == "mangalib"));
    assert_eq!(items[0].title, "Ван Пис 0");
    assert_eq!(items[0].slug, "0--one-piece-0");
    assert_eq!(items[0].web_url, "https://mangalib.org/0--one-piece-0");
    assert_eq!(items[0].year, Some(1997));
    assert_eq!(items[0].rating, Some(9.1));
    assert_eq!(items[0].content_type, ContentType::Manga);

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contains("q=one%20piece"));
    assert!(calls[0].contains("site_id[]=1"));
    assert!(calls[0].contains("fields[]=rate_avg"));
}

#[test]
fn search_without_data_is_empty() {
    let transport = StubTransport::new().reply(&format!("{}?q=", API), json!({}));
    let source = mangalib(&transport);

    assert!(source.search("nothing", 5).unwrap().is_empty());
}

#[test]
fn search_failure_is_an_error() {
    let transport = StubTransport::new()
        .route(&format!("{}?q=", API), |_, _| Err(Error::RequestFailed(503)));
    let source = mangalib(&transport);

    assert!(matches!(
        source.search("one piece", 5),
        Err(Error::RequestFailed(503))
    ));
}

#[test]
fn details_are_normalized() {
    let transport = StubTransport::new().reply(
        &format!("{}/solo-leveling?", API),
        json!({ "data": {
            "rus_name": "Поднятие уровня в одиночку",
            "name": "Na Honjaman Level Up",
            "slug_url": "solo-leveling",
            "summary": "  ",
            "description": "Hunters and gates.",
            "type": { "label": "Манхва" },
            "status": { "label": "Завершён" },
            "rate_avg": 8.5,
            "rating": { "average": "9.3" },
            "authors": [{ "name": "Chugong" }],
            "artists": [{ "name": "DUBU" }, { "name": "Gi So-Ryeong" }],
            "genres": [{ "name": "Action" }, { "name": "Action" }, { "name": " Fantasy " }],
            "views": { "total": 123456 },
            "items_count": { "uploaded": "201" }
        }}),
    );
    let source = mangalib(&transport);

    let details = source.get_manga_details("solo-leveling").unwrap().unwrap();

    assert_eq!(details.item.title, "Поднятие уровня в одиночку");
    assert_eq!(details.item.description, "Hunters and gates.");
    assert_eq!(details.item.content_type, ContentType::Manhwa);
    assert_eq!(details.item.rating, Some(9.3));
    assert_eq!(details.status, Some(MangaStatus::Completed));
    assert_eq!(details.author, "Chugong");
    assert_eq!(details.artist, "DUBU, Gi So-Ryeong");
    assert_eq!(details.genres, vec!["Action", "Fantasy"]);
    assert_eq!(details.views, 123456);
    assert_eq!(details.total_chapters, 201);
}

#[test]
fn missing_manga_is_absent() {
    let transport = StubTransport::new();
    let source = mangalib(&transport);

    assert!(source.get_manga_details("does-not-exist").unwrap().is_none());

    let transport = StubTransport::new().reply(&format!("{}/empty?", API), json!({}));
    let source = mangalib(&transport);

    assert!(source.get_manga_details("empty").unwrap().is_none());
}

#[test]
fn chapters_are_sorted_and_referenced() {
    let transport = StubTransport::new().reply(
        &format!("{}/one-piece/chapters", API),
        json!({ "data": [
            { "number": "2", "volume": "1", "name": "Second" },
            { "number": "1.5", "volume": "1", "name": null },
            { "number": "1", "volume": null, "name": "First" },
            { "number": null, "volume": "1", "name": "Broken" }
        ]}),
    );
    let source = mangalib(&transport);

    let list = source.get_chapters("one-piece", &CancelToken::new()).unwrap();

    assert!(list.complete);
    let numbers = list.chapters.iter().map(|c| c.number).collect::<Vec<_>>();
    assert_eq!(numbers, vec![1.0, 1.5, 2.0]);
    assert_eq!(list.chapters[0].volume, 1);
    assert_eq!(list.chapters[0].title, "First");
    assert_eq!(list.chapters[1].title, "");
    assert_eq!(list.chapters[0].reference, "https://mangalib.org/one-piece/v1/c1");
    assert_eq!(list.chapters[1].reference, "https://mangalib.org/one-piece/v1/c1.5");
}

#[test]
fn chapters_of_cancelled_call() {
    let transport = StubTransport::new();
    let source = mangalib(&transport);

    let cancel = CancelToken::new();
    cancel.cancel();

    assert!(matches!(
        source.get_chapters("one-piece", &cancel),
        Err(Error::Cancelled)
    ));
    assert!(transport.calls().is_empty());
}

#[test]
fn pages_round_trip_through_reference() {
    let transport = StubTransport::new()
        .reply(
            &format!("{}/one-piece/chapters", API),
            json!({ "data": [{ "number": 3, "volume": 2, "name": "Three" }] }),
        )
        .route(&format!("{}/one-piece/chapter?", API), |url, _| {
            if url.ends_with("number=3&volume=2") {
                Ok(json!({ "data": { "pages": [
                    { "url": "/manga/one-piece/chapters/3/01.png" },
                    { "url": "/manga/one-piece/chapters/3/02.png" }
                ]}}))
            } else {
                Err(Error::RequestFailed(404))
            }
        });
    let source = mangalib(&transport);

    let list = source.get_chapters("one-piece", &CancelToken::new()).unwrap();
    let chapter = &list.chapters[0];

    let pages = source
        .get_pages(&PageRequest::from_reference(chapter.reference.clone()))
        .unwrap();
    assert_eq!(
        pages,
        vec![
            "https://img2.imglib.info/manga/one-piece/chapters/3/01.png",
            "https://img2.imglib.info/manga/one-piece/chapters/3/02.png",
        ]
    );

    let same = source
        .get_pages(&PageRequest::for_chapter("one-piece", chapter))
        .unwrap();
    assert_eq!(same, pages);

    let missing = source
        .get_pages(&PageRequest::from_reference(
            "https://mangalib.org/one-piece/v2/c99",
        ))
        .unwrap();
    assert!(missing.is_empty());
}

#[test]
fn unresolvable_reference_makes_no_request() {
    let transport = StubTransport::new();
    let source = mangalib(&transport);

    let pages = source
        .get_pages(&PageRequest::from_reference("not a reference"))
        .unwrap();

    assert!(pages.is_empty());
    assert!(transport.calls().is_empty());
}

#[test]
fn owns_its_web_urls() {
    let source = mangalib(&StubTransport::new());

    assert!(source.owns_url("https://mangalib.org/one-piece"));
    assert!(!source.owns_url("https://senkuro.me/manga/one-piece"));
}
