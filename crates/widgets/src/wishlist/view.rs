//! Wishlist rendering.

use askama::Template;
use theme_widgets_core::{Money, MoneyFormat};

use super::WishlistItem;
use crate::config::Dataset;
use crate::render::{Patch, Target};
use crate::shopify::{ImageRatio, resize_image};

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Translated strings and card settings of the wishlist component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WishlistLabels {
    pub moments: String,
    pub minute: String,
    pub minutes: String,
    pub hour: String,
    pub hours: String,
    pub day: String,
    pub days: String,
    pub ago: String,
    pub add: String,
    pub remove: String,
    pub price_regular: String,
    pub price_sale: String,
    pub price_from: String,
    pub img_ratio: ImageRatio,
}

impl WishlistLabels {
    #[must_use]
    pub fn from_dataset(dataset: &Dataset) -> Self {
        Self {
            moments: dataset.text("text-moments"),
            minute: dataset.text("text-minute"),
            minutes: dataset.text("text-minutes"),
            hour: dataset.text("text-hour"),
            hours: dataset.text("text-hours"),
            day: dataset.text("text-day"),
            days: dataset.text("text-days"),
            ago: dataset.text("text-ago"),
            add: dataset.text("text-add"),
            remove: dataset.text("text-remove"),
            price_regular: dataset.text("text-price-regular"),
            price_sale: dataset.text("text-price-sale"),
            price_from: dataset.text("text-price-from"),
            img_ratio: ImageRatio::parse(dataset.get("img-ratio").unwrap_or_default()),
        }
    }
}

/// Human label for an item saved `elapsed_ms` ago, e.g. "3 hours ago".
///
/// Counts are rounded to the nearest unit; a negative elapsed time (clock
/// skew) reads as "moments".
#[must_use]
pub fn time_ago(elapsed_ms: i64, labels: &WishlistLabels) -> String {
    if elapsed_ms < MINUTE_MS {
        return format!("{} {}", labels.moments, labels.ago);
    }
    let (count, one, many) = if elapsed_ms < HOUR_MS {
        (rounded(elapsed_ms, MINUTE_MS), &labels.minute, &labels.minutes)
    } else if elapsed_ms < DAY_MS {
        (rounded(elapsed_ms, HOUR_MS), &labels.hour, &labels.hours)
    } else {
        (rounded(elapsed_ms, DAY_MS), &labels.day, &labels.days)
    };
    let unit = if count == 1 { one } else { many };
    format!("{count} {unit} {}", labels.ago)
}

const fn rounded(value: i64, unit: i64) -> i64 {
    (value + unit / 2) / unit
}

struct Card<'a> {
    handle: &'a str,
    url: &'a str,
    title: &'a str,
    images: Vec<String>,
    image_alt: &'a str,
    on_sale: bool,
    price_varies: bool,
    price: String,
    compare_at_price: String,
    added: String,
}

#[derive(Template)]
#[template(path = "wishlist/list.html")]
struct ListTemplate<'a> {
    cards: Vec<Card<'a>>,
    labels: &'a WishlistLabels,
    image_width: u32,
    image_height: String,
}

/// Patches showing `items` (stored order, oldest first).
///
/// `buttons` are the handles of the wishlist toggles on the page; `now_ms`
/// is the current epoch time in milliseconds.
///
/// # Errors
///
/// Returns `askama::Error` if the list template fails to render.
pub fn wishlist_patches(
    items: &[WishlistItem],
    buttons: &[String],
    labels: &WishlistLabels,
    money_format: &MoneyFormat,
    now_ms: i64,
) -> Result<Vec<Patch>, askama::Error> {
    let count = items.len().to_string();
    let mut patches = vec![
        Patch::text(Target::WISHLIST_BADGE, count.clone()),
        Patch::attr(Target::WISHLIST_BADGE, "data-count", count.clone()),
        Patch::attr(Target::WISHLIST_DIALOG, "data-wishlist-count", count),
    ];

    for handle in buttons {
        let saved = items.iter().any(|item| &item.handle == handle);
        let target = Target::wishlist_button(handle);
        let label = if saved { &labels.remove } else { &labels.add };
        patches.push(Patch::class(target.clone(), "active", saved));
        patches.push(Patch::attr(target.clone(), "aria-label", label.as_str()));
        patches.push(Patch::attr(target, "aria-pressed", saved.to_string()));
    }

    if items.is_empty() {
        patches.extend([
            Patch::hidden(Target::WISHLIST_EMPTY, false),
            Patch::inner_html(Target::WISHLIST_LIST, ""),
            Patch::hidden(Target::WISHLIST_LIST, true),
        ]);
        return Ok(patches);
    }

    let html = list_html(items, labels, money_format, now_ms)?;
    patches.extend([
        Patch::hidden(Target::WISHLIST_EMPTY, true),
        Patch::inner_html(Target::WISHLIST_LIST, html),
        Patch::hidden(Target::WISHLIST_LIST, false),
    ]);
    Ok(patches)
}

fn list_html(
    items: &[WishlistItem],
    labels: &WishlistLabels,
    money_format: &MoneyFormat,
    now_ms: i64,
) -> Result<String, askama::Error> {
    let size = labels.img_ratio.size();
    let cards = items
        .iter()
        .rev()
        .map(|item| Card {
            handle: &item.handle,
            url: &item.url,
            title: &item.title,
            images: [&item.image, &item.secondary_image]
                .into_iter()
                .flatten()
                .map(|src| resize_image(src, &size, "center"))
                .collect(),
            image_alt: item.image_alt.as_deref().unwrap_or_default(),
            on_sale: item.on_sale(),
            price_varies: item.price_varies,
            price: money_format.format(item.price),
            compare_at_price: money_format.format(item.compare_at_price.unwrap_or(Money::ZERO)),
            added: time_ago(now_ms - item.added_at, labels),
        })
        .collect();

    ListTemplate {
        cards,
        labels,
        image_width: labels.img_ratio.width(),
        image_height: labels.img_ratio.height_attr(),
    }
    .render()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use theme_widgets_core::ProductId;

    use super::*;
    use crate::render::Document;

    fn labels() -> WishlistLabels {
        WishlistLabels::from_dataset(
            &Dataset::new()
                .with("text-moments", "moments")
                .with("text-minute", "minute")
                .with("text-minutes", "minutes")
                .with("text-hour", "hour")
                .with("text-hours", "hours")
                .with("text-day", "day")
                .with("text-days", "days")
                .with("text-ago", "ago")
                .with("text-add", "Add to wishlist")
                .with("text-remove", "Remove")
                .with("img-ratio", "square"),
        )
    }

    fn item(handle: &str, added_at: i64) -> WishlistItem {
        WishlistItem {
            handle: handle.to_string(),
            url: format!("/products/{handle}"),
            product_id: ProductId::new(1),
            title: handle.to_uppercase(),
            image: Some(format!("//cdn.shopify.com/files/{handle}.jpg")),
            secondary_image: None,
            image_alt: None,
            price: Money::from_cents(1999),
            compare_at_price: None,
            price_varies: false,
            added_at,
        }
    }

    #[test]
    fn test_time_ago() {
        let labels = labels();
        assert_eq!(time_ago(59_999, &labels), "moments ago");
        assert_eq!(time_ago(-5_000, &labels), "moments ago");
        assert_eq!(time_ago(60_000, &labels), "1 minute ago");
        assert_eq!(time_ago(150_000, &labels), "3 minutes ago");
        assert_eq!(time_ago(HOUR_MS, &labels), "1 hour ago");
        assert_eq!(time_ago(5 * HOUR_MS + 20 * MINUTE_MS, &labels), "5 hours ago");
        assert_eq!(time_ago(DAY_MS + HOUR_MS, &labels), "1 day ago");
        assert_eq!(time_ago(10 * DAY_MS, &labels), "10 days ago");
    }

    #[test]
    fn test_patches_list_newest_first() {
        let items = vec![item("older", 0), item("newer", 90 * MINUTE_MS)];
        let patches = wishlist_patches(
            &items,
            &["older".to_string(), "absent".to_string()],
            &labels(),
            &MoneyFormat::default(),
            2 * HOUR_MS,
        )
        .unwrap();

        assert!(patches.contains(&Patch::attr(Target::WISHLIST_DIALOG, "data-wishlist-count", "2")));
        assert!(patches.contains(&Patch::class(Target::wishlist_button("older"), "active", true)));
        assert!(patches.contains(&Patch::attr(
            Target::wishlist_button("absent"),
            "aria-pressed",
            "false"
        )));

        let html = patches
            .iter()
            .find_map(|patch| match patch {
                Patch::SetInnerHtml { html, .. } => Some(html.clone()),
                _ => None,
            })
            .unwrap();
        assert!(html.find("NEWER").unwrap() < html.find("OLDER").unwrap());
        assert!(html.contains("30 minutes ago"));
        assert!(html.contains("2 hours ago"));
        assert!(html.contains("older_480x480_crop_center.jpg"));
        assert!(html.contains("height=\"480\""));
        assert!(html.contains("$19.99"));
        assert!(html.contains("data-has-price-compare=\"false\""));
    }

    #[test]
    fn test_empty_state_on_document() {
        let mut document = Document::new().with_all([
            Target::WISHLIST_BADGE,
            Target::WISHLIST_DIALOG,
            Target::WISHLIST_EMPTY,
            Target::WISHLIST_LIST,
        ]);
        let patches =
            wishlist_patches(&[], &[], &labels(), &MoneyFormat::default(), 0).unwrap();
        crate::render::RenderSink::apply_all(&mut document, &patches).unwrap();

        let badge = document.node(&Target::WISHLIST_BADGE).unwrap();
        assert_eq!(badge.text, "0");
        assert_eq!(badge.attribute("data-count"), Some("0"));
        assert!(!document.node(&Target::WISHLIST_EMPTY).unwrap().is_hidden());
        assert!(document.node(&Target::WISHLIST_LIST).unwrap().is_hidden());
    }
}
