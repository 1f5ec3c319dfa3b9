//! Wishlist persistence across page loads.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use serde_json::json;
use theme_widgets::shopify::StorefrontClient;
use theme_widgets::wishlist::{Wishlist, WishlistLabels, WishlistToggle};
use theme_widgets::{Dataset, FileStore, KeyValueStore, SharedSink, Target, WidgetsConfig};
use theme_widgets_core::{MoneyFormat, ProductHandle};
use theme_widgets_integration_tests::{client, page_with, scratch_dir};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn product_json(handle: &str, title: &str) -> serde_json::Value {
    json!({
        "id": 21,
        "title": title,
        "handle": handle,
        "url": format!("/products/{handle}"),
        "price": 3200,
        "price_varies": true,
        "available": true,
        "featured_image": format!("//cdn.shopify.com/files/{handle}.jpg"),
        "images": [format!("//cdn.shopify.com/files/{handle}.jpg")],
        "media": [],
        "variants": []
    })
}

fn wishlist_targets(handles: &[&str]) -> Vec<Target> {
    let mut targets = vec![
        Target::WISHLIST_BADGE,
        Target::WISHLIST_DIALOG,
        Target::WISHLIST_EMPTY,
        Target::WISHLIST_LIST,
    ];
    targets.extend(handles.iter().map(|handle| Target::wishlist_button(handle)));
    targets
}

fn labels() -> WishlistLabels {
    WishlistLabels::from_dataset(
        &Dataset::new()
            .with("text-add", "Add to wishlist")
            .with("text-remove", "Remove from wishlist")
            .with("text-moments", "moments")
            .with("text-ago", "ago"),
    )
}

/// One page load: a fresh page and wishlist over the same store.
fn load(server: &MockServer, store: Arc<FileStore>, sink: SharedSink) -> Wishlist {
    Wishlist::new(store, client(server), sink, labels(), MoneyFormat::default())
        .with_buttons(["wool-scarf", "felt-hat"])
}

#[tokio::test]
async fn test_wishlist_survives_reload() {
    let server = MockServer::start().await;
    for (handle, title) in [("wool-scarf", "Wool Scarf"), ("felt-hat", "Felt Hat")] {
        Mock::given(method("GET"))
            .and(path(format!("/products/{handle}.js")))
            .respond_with(ResponseTemplate::new(200).set_body_json(product_json(handle, title)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let dir = scratch_dir("wishlist");
    let scarf = ProductHandle::parse("wool-scarf").unwrap();
    let hat = ProductHandle::parse("felt-hat").unwrap();

    {
        let store = Arc::new(FileStore::open(&dir).unwrap());
        let page = page_with(wishlist_targets(&["wool-scarf", "felt-hat"]));
        let wishlist = load(&server, store, page.clone());

        assert!(matches!(
            wishlist.toggle(&scarf).await.unwrap(),
            WishlistToggle::Added(_)
        ));
        assert!(matches!(
            wishlist.toggle(&hat).await.unwrap(),
            WishlistToggle::Added(_)
        ));

        let page = page.lock().unwrap();
        assert_eq!(page.node(&Target::WISHLIST_BADGE).unwrap().text, "2");
    }

    // Second page load reads what the first one saved
    let store = Arc::new(FileStore::open(&dir).unwrap());
    let page = page_with(wishlist_targets(&["wool-scarf", "felt-hat"]));
    let wishlist = load(&server, store.clone(), page.clone());

    let handles: Vec<_> = wishlist
        .items()
        .unwrap()
        .into_iter()
        .map(|item| item.handle)
        .collect();
    assert_eq!(handles, ["felt-hat", "wool-scarf"]);

    wishlist.refresh().unwrap();
    {
        let page = page.lock().unwrap();
        let dialog = page.node(&Target::WISHLIST_DIALOG).unwrap();
        assert_eq!(dialog.attribute("data-wishlist-count"), Some("2"));
        let list = page.node(&Target::WISHLIST_LIST).unwrap();
        assert!(!list.is_hidden());
        assert!(list.html.contains("Felt Hat"));
        assert!(list.html.contains("Wool Scarf"));
        let button = page.node(&Target::wishlist_button("felt-hat")).unwrap();
        assert!(button.has_class("active"));
        assert_eq!(button.attribute("aria-pressed"), Some("true"));
    }

    // Removing needs no product fetch
    assert!(matches!(
        wishlist.toggle(&scarf).await.unwrap(),
        WishlistToggle::Removed
    ));
    assert!(!wishlist.contains(&scarf).unwrap());

    wishlist.clear().unwrap();
    assert_eq!(store.get("ks-wishlist").unwrap(), None);
    let page = page.lock().unwrap();
    assert!(!page.node(&Target::WISHLIST_EMPTY).unwrap().is_hidden());
    assert!(
        !page
            .node(&Target::wishlist_button("felt-hat"))
            .unwrap()
            .has_class("active")
    );

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_corrupt_wishlist_file_reads_empty() {
    let dir = scratch_dir("wishlist-corrupt");
    let store = Arc::new(FileStore::open(&dir).unwrap());
    store.set("ks-wishlist", "{\"not\": \"a list\"}").unwrap();

    let config = WidgetsConfig::for_storefront(Url::parse("http://127.0.0.1:9").unwrap());
    let client = StorefrontClient::new(&config).unwrap();
    let page = page_with(wishlist_targets(&[]));
    let wishlist = Wishlist::new(store, client, page, labels(), MoneyFormat::default());

    assert!(wishlist.items().unwrap().is_empty());
    std::fs::remove_dir_all(&dir).unwrap();
}
