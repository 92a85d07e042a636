//! Search E2E tests: query modes, prefix fallback and cursor pagination.

use std::collections::HashSet;

use pretty_assertions::assert_eq;

use e2e_tests::{numbered_posts, TestHarness};
use grow_search::{QueryPlan, SearchRequest};
use grow_types::PostRecord;

#[test]
fn test_prefix_fallback_on_first_token() {
    let harness = TestHarness::new();
    harness.write(&PostRecord::new("a", "Purple Haze outdoor", 10));
    harness.write(&PostRecord::new("b", "purple leaves late flower", 20));
    harness.write(&PostRecord::new("c", "Lemon Haze", 30));

    let search = harness.search();
    assert_eq!(search.resolver().resolve("purple haz"), QueryPlan::Free);

    // No post has the keyword "purple haz"; the prefix pass on "purple" hits
    let page = search.search("purple haz", &SearchRequest::new()).unwrap();
    let ids: Vec<&str> = page.items.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);

    // Only the first token drives the prefix pass
    let page = search.search("zzz haze", &SearchRequest::new()).unwrap();
    assert!(page.items.is_empty());
}

#[test]
fn test_exact_keyword_pass_wins_over_prefix() {
    let harness = TestHarness::new();
    harness.write(&PostRecord::new("a", "purple", 10));
    harness.write(&PostRecord::new("b", "purplest sky", 20));

    let page = harness
        .search()
        .search("purple", &SearchRequest::new())
        .unwrap();
    let ids: Vec<&str> = page.items.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["a"]);
}

#[test]
fn test_cursor_pages_are_stable_and_complete() {
    let harness = TestHarness::new();
    for post in numbered_posts("p", 23, "White Widow indoor") {
        harness.write(&post);
    }
    let search = harness.search();

    let mut seen = Vec::new();
    let mut request = SearchRequest::new().with_limit(10);
    let mut pages = 0;
    loop {
        let page = search.search("white widow", &request).unwrap();
        pages += 1;
        seen.extend(page.items.iter().map(|p| p.id.clone()));

        // A write between pages must not shift the next page
        harness.write(&PostRecord::new("p-000", "White Widow indoor edited", 1_717_200_000_000));

        match page.next_cursor {
            Some(cursor) => request = SearchRequest::new().with_limit(10).with_cursor(cursor),
            None => break,
        }
    }

    assert_eq!(pages, 3);
    assert_eq!(seen.len(), 23);
    assert_eq!(seen.iter().collect::<HashSet<_>>().len(), 23);
    assert_eq!(seen.first().map(String::as_str), Some("p-022"));
    assert_eq!(seen.last().map(String::as_str), Some("p-000"));
}

#[test]
fn test_forced_tag_filters_strain_results() {
    let harness = TestHarness::new();
    harness.write(&PostRecord::new("in", "OG Kush", 1).with_tags(["indoor"]));
    harness.write(&PostRecord::new("out", "OG Kush", 2).with_tags(["outdoor"]));

    let search = harness.search();
    let all = search.search("og kush", &SearchRequest::new()).unwrap();
    assert_eq!(all.items.len(), 2);

    let outdoor = search
        .search("og kush", &SearchRequest::new().with_forced_tag(" Outdoor "))
        .unwrap();
    let ids: Vec<&str> = outdoor.items.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["out"]);
}

#[test]
fn test_limit_is_clamped() {
    let harness = TestHarness::new();
    for post in numbered_posts("p", 60, "Runtz") {
        harness.write(&post);
    }

    let page = harness
        .search()
        .search("runtz", &SearchRequest::new().with_limit(500))
        .unwrap();
    assert_eq!(page.items.len(), 50);
    assert!(page.next_cursor.is_some());

    let blank = harness.search().search("   ", &SearchRequest::new()).unwrap();
    assert!(blank.items.is_empty());
}
