//! Option picker fanning out to the widgets that follow the variant.

#![allow(clippy::unwrap_used)]

use theme_widgets::events::drain;
use theme_widgets::variant::{
    InventoryBar, MediaGallery, ProductOption, ProductOptions, ProductSettings, QtySwitcher,
    StickyAtc,
};
use theme_widgets::{Dataset, EventBus, EventListener, RenderSink, Target};
use theme_widgets_core::MoneyFormat;
use theme_widgets_integration_tests::{client, dispatch, names, page_with};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VARIANTS_JSON: &str = r#"[
    {"id": 1, "title": "Red / S", "options": ["Red", "S"], "price": 2000, "available": true,
     "featured_media": {"id": 501, "position": 1}},
    {"id": 2, "title": "Red / M", "options": ["Red", "M"], "price": 1800,
     "compare_at_price": 2400, "available": true,
     "featured_media": {"id": 502, "position": 2}},
    {"id": 3, "title": "Blue / S", "options": ["Blue", "S"], "price": 2200, "available": true},
    {"id": 4, "title": "Blue / M", "options": ["Blue", "M"], "price": 2200, "available": false}
]"#;

const VARIANT_PAGE: &str = r#"<main>
<div id="inventory-bar-b1" class="inventory-bar">Only 2 left</div>
<product-qty-switcher id="product-qty-switcher-b1">
  <input type="number" value="1" min="1" max="2">
</product-qty-switcher>
</main>"#;

fn options() -> Vec<ProductOption> {
    vec![
        ProductOption {
            position: 1,
            values: vec!["Red".to_string(), "Blue".to_string()],
        },
        ProductOption {
            position: 2,
            values: vec!["S".to_string(), "M".to_string()],
        },
    ]
}

fn settings() -> ProductSettings {
    ProductSettings::from_dataset(
        &Dataset::new()
            .with("product-url", "/products/tee")
            .with("page-type", "product")
            .with("text-add", "Add to cart")
            .with("text-sold-out", "Sold out")
            .with("text-unavailable", "Unavailable"),
    )
    .unwrap()
}

fn product_page_targets() -> Vec<Target> {
    let mut targets = vec![
        Target::ADD_BUTTON,
        Target::VARIANT_ID_INPUT,
        Target::PRICE,
        Target::PRICE_AMOUNT,
        Target::PRICE_COMPARE,
        Target::MEDIA_GALLERY_TRACK,
        Target::MEDIA_GALLERY_PAGINATION,
        Target::STICKY_ATC_SELECT,
        Target::QTY_INPUT,
        Target::QTY_DECREASE,
        Target::QTY_INCREASE,
        Target::inventory_bar("b1"),
        Target::qty_switcher("b1"),
    ];
    for option in options() {
        for value in &option.values {
            targets.push(Target::option_value(option.position, value));
        }
    }
    targets
}

#[tokio::test]
async fn test_variant_change_reaches_followers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/tee"))
        .and(query_param("variant", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(VARIANT_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let page = page_with(product_page_targets());
    let bus = EventBus::new();
    let mut rx = bus.subscribe();
    let mut picker = ProductOptions::new(
        ProductOptions::parse_variants(VARIANTS_JSON).unwrap(),
        options(),
        vec![Some("Red".to_string()), Some("S".to_string())],
        settings(),
        client(&server),
        bus,
        page.clone(),
        MoneyFormat::default(),
    );
    picker.initialize().unwrap();

    let selected = picker.select(2, "M").await.unwrap().unwrap();
    assert_eq!(selected.title, "Red / M");

    let events = drain(&mut rx);
    assert_eq!(names(&events), ["variant:change", "variant:newDoc"]);

    let mut gallery = MediaGallery::new(3, 0);
    let mut inventory = InventoryBar::new("b1");
    let mut sticky = StickyAtc;
    let mut qty = QtySwitcher::new("b1", 1, Some(1), None);
    let followers: [&mut dyn EventListener; 4] =
        [&mut gallery, &mut inventory, &mut sticky, &mut qty];
    for listener in followers {
        dispatch(&page, listener, &events);
    }
    assert_eq!(gallery.current(), 1);

    // The new page caps the quantity at 2
    page.lock().unwrap().apply_all(&qty.increase()).unwrap();
    assert_eq!(qty.value(), 2);

    let page = page.lock().unwrap();
    assert_eq!(page.node(&Target::VARIANT_ID_INPUT).unwrap().value, "2");
    assert_eq!(page.url_param("variant"), Some("2"));
    assert_eq!(page.node(&Target::PRICE_AMOUNT).unwrap().text, "$18.00");
    assert_eq!(page.node(&Target::PRICE_COMPARE).unwrap().text, "$24.00");
    assert_eq!(
        page.node(&Target::PRICE).unwrap().attribute("data-has-price-compare"),
        Some("true")
    );
    assert_eq!(page.node(&Target::ADD_BUTTON).unwrap().text, "Add to cart");
    assert!(
        page.node(&Target::option_value(1, "Blue"))
            .unwrap()
            .has_class("disabled")
    );

    assert_eq!(page.node(&Target::MEDIA_GALLERY_PAGINATION).unwrap().text, "2/3");
    assert_eq!(
        page.node(&Target::MEDIA_GALLERY_TRACK)
            .unwrap()
            .styles
            .get("transform")
            .map(String::as_str),
        Some("translateX(-100%)")
    );
    assert_eq!(page.node(&Target::STICKY_ATC_SELECT).unwrap().value, "2");

    let bar = page.node(&Target::inventory_bar("b1")).unwrap();
    assert_eq!(bar.replacements, 1);
    assert!(bar.html.contains("Only 2 left"));
    assert!(page.node(&Target::QTY_INCREASE).unwrap().is_disabled());
    assert_eq!(page.node(&Target::QTY_INPUT).unwrap().value, "2");
}

#[tokio::test]
async fn test_failed_variant_page_still_changes_variant() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/tee"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let page = page_with(product_page_targets());
    let bus = EventBus::new();
    let mut rx = bus.subscribe();
    let mut picker = ProductOptions::new(
        ProductOptions::parse_variants(VARIANTS_JSON).unwrap(),
        options(),
        vec![Some("Red".to_string()), Some("S".to_string())],
        settings(),
        client(&server),
        bus,
        page.clone(),
        MoneyFormat::default(),
    );

    let selected = picker.select(1, "Blue").await.unwrap().unwrap();
    assert_eq!(selected.title, "Blue / S");

    let events = drain(&mut rx);
    assert_eq!(names(&events), ["variant:change"]);

    let mut inventory = InventoryBar::new("b1");
    dispatch(&page, &mut inventory, &events);

    let page = page.lock().unwrap();
    let bar = page.node(&Target::inventory_bar("b1")).unwrap();
    assert_eq!(bar.styles.get("opacity").map(String::as_str), Some(".25"));
    assert_eq!(bar.replacements, 0);
    // Blue / M is sold out
    assert!(
        page.node(&Target::option_value(2, "M"))
            .unwrap()
            .has_class("disabled")
    );
}
