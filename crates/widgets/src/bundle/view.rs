//! Bundle builder rendering.
//!
//! Everything here is a pure function of the staged items and the builder
//! settings; [`bundle_patches`] is re-run after every mutation.

use askama::Template;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use theme_widgets_core::{Money, MoneyFormat, VariantId};

use super::{BundleItem, BundleMode, BundleSettings};
use crate::render::{Patch, Target};
use crate::shopify::resize_image;

/// Derived figures of a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleTotals {
    /// Units staged across all entries, saturating at `u32::MAX`.
    pub quantity: u32,
    /// Undiscounted total.
    pub total: Money,
    /// Progress towards the tiers: units, or major currency units in amount mode.
    pub progress: Decimal,
    /// Discount percent earned.
    pub discount: Decimal,
}

impl BundleTotals {
    #[must_use]
    pub fn of(items: &[BundleItem], settings: &BundleSettings) -> Self {
        let quantity = items
            .iter()
            .fold(0_u32, |sum, item| sum.saturating_add(item.quantity));
        let total = items.iter().map(BundleItem::line_price).sum::<Money>();
        let progress = match settings.mode {
            BundleMode::Quantity => Decimal::from(quantity),
            BundleMode::Amount => total.to_major(),
        };

        Self {
            quantity,
            total,
            progress,
            discount: settings.tiers.discount_for(progress),
        }
    }

    #[must_use]
    pub fn discounted_total(&self) -> Money {
        self.total.discounted(self.discount)
    }

    #[must_use]
    pub fn savings(&self) -> Money {
        self.total - self.discounted_total()
    }
}

struct ContentRow<'a> {
    url: String,
    image: String,
    title: &'a str,
    variant_title: &'a str,
    show_variant_title: bool,
    line_price: String,
    variant_id: VariantId,
    quantity: u32,
}

#[derive(Template)]
#[template(path = "bundle/contents.html")]
struct ContentsTemplate<'a> {
    rows: Vec<ContentRow<'a>>,
    image_width: u32,
    image_height: String,
    at_max: bool,
    text_remove: &'a str,
}

/// Patches bringing the builder in line with `items`.
///
/// # Errors
///
/// Returns `askama::Error` if the contents template fails to render.
pub fn bundle_patches(
    items: &[BundleItem],
    settings: &BundleSettings,
    money_format: &MoneyFormat,
) -> Result<Vec<Patch>, askama::Error> {
    let totals = BundleTotals::of(items, settings);
    let goal = settings.goal();
    let percent = progress_percent(totals.progress, goal);
    let at_max = settings.max_items > 0 && totals.quantity >= settings.max_items;
    let below_min = items.is_empty() || totals.quantity < settings.min_items;

    let mut patches = vec![Patch::style(
        Target::BUNDLE_PROGRESS_BAR,
        "width",
        format!("{percent}%"),
    )];

    for (index, tier) in settings.tiers.tiers().iter().enumerate() {
        let left = if goal.is_zero() {
            Decimal::ZERO
        } else {
            tier.threshold / goal * Decimal::ONE_HUNDRED
        };
        patches.push(Patch::class(
            Target::bundle_marker(index),
            "active",
            left <= Decimal::from(percent),
        ));
    }

    patches.extend(promo_patches(&totals, settings, money_format));

    let subtotal = if totals.discount > Decimal::ZERO {
        format!(
            "<s>{}</s> <span>{}</span>",
            money_format.format(totals.total),
            money_format.format(totals.discounted_total())
        )
    } else {
        format!("<span>{}</span>", money_format.format(totals.total))
    };
    patches.push(Patch::inner_html(Target::BUNDLE_SUBTOTAL, subtotal));
    patches.push(Patch::inner_html(
        Target::BUNDLE_SAVINGS,
        format!(
            "<span>{}</span> <span>({}%)</span>",
            money_format.format(totals.savings()),
            totals.discount.normalize()
        ),
    ));
    patches.push(Patch::text(
        Target::BUNDLE_ITEM_COUNT,
        totals.quantity.to_string(),
    ));

    patches.push(Patch::disabled(Target::BUNDLE_ACTIONS, below_min));
    patches.push(Patch::disabled(Target::BUNDLE_SELECTION, at_max));
    patches.push(Patch::disabled(Target::BUNDLE_SELECTION_BUTTON, at_max));

    if items.is_empty() {
        patches.push(Patch::hidden(Target::BUNDLE_CONTENTS_EMPTY, false));
        patches.push(Patch::hidden(Target::BUNDLE_CONTENTS_LIST, true));
        patches.push(Patch::inner_html(Target::BUNDLE_CONTENTS_LIST, ""));
    } else {
        patches.push(Patch::hidden(Target::BUNDLE_CONTENTS_EMPTY, true));
        patches.push(Patch::hidden(Target::BUNDLE_CONTENTS_LIST, false));
        patches.push(Patch::inner_html(
            Target::BUNDLE_CONTENTS_LIST,
            contents_html(items, settings, money_format, at_max)?,
        ));
    }

    Ok(patches)
}

/// Width of the progress bar in whole percent.
fn progress_percent(progress: Decimal, goal: Decimal) -> u32 {
    if goal <= Decimal::ZERO {
        return 0;
    }
    let percent = (progress / goal * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .min(Decimal::ONE_HUNDRED);
    percent.to_u32().unwrap_or(0)
}

fn promo_patches(
    totals: &BundleTotals,
    settings: &BundleSettings,
    money_format: &MoneyFormat,
) -> Vec<Patch> {
    let Some(next) = settings.tiers.next_tier(totals.progress) else {
        return vec![
            Patch::inner_html(Target::BUNDLE_PROMO, settings.text_promo_final.clone()),
            Patch::class(Target::BUNDLE_PROMO, "text-success", true),
        ];
    };

    let discount = format!("{}%", next.discount_percent.normalize());
    let text = match settings.mode {
        BundleMode::Amount => {
            let remaining = Money::from_major(next.threshold) - totals.total;
            interpolate(
                &settings.text_promo_amount,
                "amount",
                &money_format.format(remaining),
            )
        }
        BundleMode::Quantity => {
            let remaining = next.threshold - totals.progress;
            interpolate(
                &settings.text_promo_quantity,
                "count",
                &remaining.normalize().to_string(),
            )
        }
    };

    vec![
        Patch::inner_html(Target::BUNDLE_PROMO, interpolate(&text, "discount", &discount)),
        Patch::class(Target::BUNDLE_PROMO, "text-success", false),
    ]
}

/// Substitute `{{ name }}` (with or without inner spaces).
fn interpolate(text: &str, name: &str, value: &str) -> String {
    text.replace(&format!("{{{{ {name} }}}}"), value)
        .replace(&format!("{{{{{name}}}}}"), value)
}

fn contents_html(
    items: &[BundleItem],
    settings: &BundleSettings,
    money_format: &MoneyFormat,
    at_max: bool,
) -> Result<String, askama::Error> {
    let size = settings.img_ratio.size();
    let crop = if settings.img_ratio.height().is_some() {
        "center"
    } else {
        ""
    };

    let rows = items
        .iter()
        .rev()
        .map(|item| ContentRow {
            url: format!("{}?variant={}", item.product_url, item.variant_id),
            image: if item.variant_image.is_empty() {
                String::new()
            } else {
                resize_image(&item.variant_image, &size, crop)
            },
            title: &item.product_title,
            variant_title: &item.variant_title,
            show_variant_title: !item.variant_title.is_empty()
                && !item.variant_title.contains("Default"),
            line_price: money_format.format(item.line_price()),
            variant_id: item.variant_id,
            quantity: item.quantity,
        })
        .collect();

    ContentsTemplate {
        rows,
        image_width: settings.img_ratio.width(),
        image_height: settings.img_ratio.height_attr(),
        at_max,
        text_remove: &settings.text_remove,
    }
    .render()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use theme_widgets_core::ProductId;

    use super::*;
    use crate::bundle::TierTable;
    use crate::render::{Document, RenderSink};

    fn item(variant: u64, cents: i64, quantity: u32) -> BundleItem {
        BundleItem {
            product_id: ProductId::new(1),
            product_handle: "tee".to_string(),
            product_title: "Tee".to_string(),
            product_url: "/products/tee".to_string(),
            variant_id: VariantId::new(variant),
            variant_image: "//cdn.shopify.com/files/tee.jpg".to_string(),
            variant_price: Money::from_cents(cents),
            variant_title: "Red / M".to_string(),
            quantity,
        }
    }

    fn amount_settings() -> BundleSettings {
        BundleSettings {
            mode: BundleMode::Amount,
            tiers: TierTable::parse("10:5;20:10;30:15").unwrap(),
            max_tier_value: Decimal::from(30),
            text_promo_amount: "Add {{ amount }} more to save {{ discount }}".to_string(),
            text_promo_final: "Maximum discount unlocked".to_string(),
            ..BundleSettings::default()
        }
    }

    fn page(tiers: usize) -> Document {
        let mut doc = Document::new().with_all([
            Target::BUNDLE_PROGRESS_BAR,
            Target::BUNDLE_PROMO,
            Target::BUNDLE_SUBTOTAL,
            Target::BUNDLE_SAVINGS,
            Target::BUNDLE_ITEM_COUNT,
            Target::BUNDLE_ACTIONS,
            Target::BUNDLE_SELECTION,
            Target::BUNDLE_SELECTION_BUTTON,
            Target::BUNDLE_CONTENTS_EMPTY,
            Target::BUNDLE_CONTENTS_LIST,
        ]);
        for index in 0..tiers {
            doc = doc.with(Target::bundle_marker(index));
        }
        doc
    }

    #[test]
    fn test_amount_mode_totals() {
        let settings = amount_settings();
        let totals = BundleTotals::of(&[item(1, 1250, 2)], &settings);
        assert_eq!(totals.quantity, 2);
        assert_eq!(totals.total, Money::from_cents(2500));
        assert_eq!(totals.discount, Decimal::from(10));
        assert_eq!(totals.discounted_total(), Money::from_cents(2250));
        assert_eq!(totals.savings(), Money::from_cents(250));
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(Decimal::from(25), Decimal::from(30)), 83);
        assert_eq!(progress_percent(Decimal::from(45), Decimal::from(30)), 100);
        assert_eq!(progress_percent(Decimal::from(5), Decimal::ZERO), 0);
    }

    #[test]
    fn test_render_partial_bundle() {
        let settings = amount_settings();
        let mut doc = page(3);
        let patches =
            bundle_patches(&[item(1, 1250, 2)], &settings, &MoneyFormat::default()).unwrap();
        doc.apply_all(&patches).unwrap();

        let bar = doc.node(&Target::BUNDLE_PROGRESS_BAR).unwrap();
        assert_eq!(bar.styles.get("width").map(String::as_str), Some("83%"));
        assert!(doc.node(&Target::bundle_marker(0)).unwrap().has_class("active"));
        assert!(doc.node(&Target::bundle_marker(1)).unwrap().has_class("active"));
        assert!(!doc.node(&Target::bundle_marker(2)).unwrap().has_class("active"));

        let promo = doc.node(&Target::BUNDLE_PROMO).unwrap();
        assert_eq!(promo.html, "Add $5.00 more to save 15%");
        assert!(!promo.has_class("text-success"));

        assert_eq!(
            doc.node(&Target::BUNDLE_SUBTOTAL).unwrap().html,
            "<s>$25.00</s> <span>$22.50</span>"
        );
        assert_eq!(
            doc.node(&Target::BUNDLE_SAVINGS).unwrap().html,
            "<span>$2.50</span> <span>(10%)</span>"
        );
        assert_eq!(doc.node(&Target::BUNDLE_ITEM_COUNT).unwrap().text, "2");
        assert!(!doc.node(&Target::BUNDLE_ACTIONS).unwrap().is_disabled());
        assert!(doc.node(&Target::BUNDLE_CONTENTS_EMPTY).unwrap().is_hidden());

        let list = doc.node(&Target::BUNDLE_CONTENTS_LIST).unwrap();
        assert!(!list.is_hidden());
        assert!(list.html.contains("?variant=1"));
        assert!(list.html.contains("tee_480x.jpg"));
        assert!(list.html.contains("Red"));
        assert!(list.html.contains("$25.00"));
    }

    #[test]
    fn test_render_empty_bundle() {
        let settings = amount_settings();
        let mut doc = page(3);
        doc.apply_all(&bundle_patches(&[], &settings, &MoneyFormat::default()).unwrap())
            .unwrap();

        assert_eq!(
            doc.node(&Target::BUNDLE_SUBTOTAL).unwrap().html,
            "<span>$0.00</span>"
        );
        assert!(doc.node(&Target::BUNDLE_ACTIONS).unwrap().is_disabled());
        assert!(!doc.node(&Target::BUNDLE_CONTENTS_EMPTY).unwrap().is_hidden());
        assert!(doc.node(&Target::BUNDLE_CONTENTS_LIST).unwrap().is_hidden());
        assert_eq!(
            doc.node(&Target::BUNDLE_PROMO).unwrap().html,
            "Add $10.00 more to save 5%"
        );
    }

    #[test]
    fn test_final_tier_and_max_items() {
        let settings = BundleSettings {
            mode: BundleMode::Quantity,
            tiers: TierTable::parse("2:5;4:10").unwrap(),
            max_tier_value: Decimal::from(4),
            max_items: 4,
            text_promo_final: "Best price unlocked".to_string(),
            ..BundleSettings::default()
        };
        let items = [item(1, 1000, 3), item(2, 1000, 1)];
        let mut doc = page(2);
        doc.apply_all(&bundle_patches(&items, &settings, &MoneyFormat::default()).unwrap())
            .unwrap();

        let promo = doc.node(&Target::BUNDLE_PROMO).unwrap();
        assert_eq!(promo.html, "Best price unlocked");
        assert!(promo.has_class("text-success"));
        assert!(doc.node(&Target::BUNDLE_SELECTION).unwrap().is_disabled());
        assert!(doc.node(&Target::BUNDLE_SELECTION_BUTTON).unwrap().is_disabled());

        let list = &doc.node(&Target::BUNDLE_CONTENTS_LIST).unwrap().html;
        assert!(list.contains(" disabled"));
        // Newest first
        let newest = list.find("data-variant-id=\"2\"").unwrap();
        let oldest = list.find("data-variant-id=\"1\"").unwrap();
        assert!(newest < oldest);
    }

    #[test]
    fn test_quantity_promo_and_minimum() {
        let settings = BundleSettings {
            mode: BundleMode::Quantity,
            tiers: TierTable::parse("3:10").unwrap(),
            max_tier_value: Decimal::from(3),
            min_items: 2,
            text_promo_quantity: "Add {{count}} more for {{ discount }} off".to_string(),
            ..BundleSettings::default()
        };
        let patches =
            bundle_patches(&[item(1, 500, 1)], &settings, &MoneyFormat::default()).unwrap();

        assert!(patches.contains(&Patch::inner_html(
            Target::BUNDLE_PROMO,
            "Add 2 more for 10% off"
        )));
        assert!(patches.contains(&Patch::disabled(Target::BUNDLE_ACTIONS, true)));
    }

    #[test]
    fn test_default_variant_title_hidden() {
        let mut single = item(1, 500, 1);
        single.variant_title = "Default Title".to_string();
        let html = contents_html(
            &[single],
            &amount_settings(),
            &MoneyFormat::default(),
            false,
        )
        .unwrap();
        assert!(!html.contains("Default Title"));
        assert!(!html.contains(" disabled"));
    }
}
