//! Widgets that follow the selected variant.

use crate::events::{EventListener, ThemeEvent};
use crate::render::{Patch, Target, fragment};

/// Product media slider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaGallery {
    slides: usize,
    current: usize,
}

impl MediaGallery {
    #[must_use]
    pub const fn new(slides: usize, initial_index: usize) -> Self {
        Self {
            slides,
            current: initial_index,
        }
    }

    #[must_use]
    pub const fn current(&self) -> usize {
        self.current
    }

    pub fn go(&mut self, index: usize) -> Vec<Patch> {
        if self.slides == 0 {
            return Vec::new();
        }
        self.current = index % self.slides;
        self.update()
    }

    pub fn prev(&mut self) -> Vec<Patch> {
        self.go(self.current + self.slides.saturating_sub(1))
    }

    pub fn next(&mut self) -> Vec<Patch> {
        self.go(self.current + 1)
    }

    fn update(&self) -> Vec<Patch> {
        let offset = self.current * 100;
        let transform = if offset == 0 {
            "translateX(0%)".to_string()
        } else {
            format!("translateX(-{offset}%)")
        };
        vec![
            Patch::style(Target::MEDIA_GALLERY_TRACK, "transform", transform),
            Patch::text(
                Target::MEDIA_GALLERY_PAGINATION,
                format!("{}/{}", self.current + 1, self.slides),
            ),
        ]
    }
}

impl EventListener for MediaGallery {
    fn on_event(&mut self, event: &ThemeEvent) -> Vec<Patch> {
        let ThemeEvent::VariantChange(variant) = event else {
            return Vec::new();
        };
        match variant.featured_media {
            Some(media) if media.position > 0 => self.go(media.position - 1),
            _ => Vec::new(),
        }
    }
}

/// Stock level bar of a product block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryBar {
    target: Target,
}

impl InventoryBar {
    #[must_use]
    pub fn new(block_id: &str) -> Self {
        Self {
            target: Target::inventory_bar(block_id),
        }
    }
}

impl EventListener for InventoryBar {
    fn on_event(&mut self, event: &ThemeEvent) -> Vec<Patch> {
        match event {
            ThemeEvent::VariantChange(_) => vec![Patch::style(self.target.clone(), "opacity", ".25")],
            ThemeEvent::VariantNewDoc(html) => {
                match fragment::outer_html(html, self.target.selector()) {
                    Some(html) => vec![Patch::Replace {
                        target: self.target.clone(),
                        html,
                    }],
                    None => {
                        tracing::debug!(selector = %self.target, "variant page has no inventory bar");
                        Vec::new()
                    }
                }
            }
            _ => Vec::new(),
        }
    }
}

/// Sticky add-to-cart bar.
#[derive(Debug, Default)]
pub struct StickyAtc;

impl EventListener for StickyAtc {
    fn on_event(&mut self, event: &ThemeEvent) -> Vec<Patch> {
        match event {
            ThemeEvent::VariantChange(variant) => {
                vec![Patch::value(Target::STICKY_ATC_SELECT, variant.id.to_string())]
            }
            _ => Vec::new(),
        }
    }
}

/// Quantity input with decrease/increase buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QtySwitcher {
    block_id: String,
    value: u32,
    min: Option<u32>,
    max: Option<u32>,
}

impl QtySwitcher {
    #[must_use]
    pub fn new(block_id: &str, value: u32, min: Option<u32>, max: Option<u32>) -> Self {
        Self {
            block_id: block_id.to_string(),
            value,
            min,
            max,
        }
    }

    #[must_use]
    pub const fn value(&self) -> u32 {
        self.value
    }

    pub fn decrease(&mut self) -> Vec<Patch> {
        self.set(self.value.saturating_sub(1))
    }

    pub fn increase(&mut self) -> Vec<Patch> {
        self.set(self.value.saturating_add(1))
    }

    /// Set the value, clamped to `min`/`max`; the button at a bound is disabled.
    pub fn set(&mut self, value: u32) -> Vec<Patch> {
        self.value = value;

        let at_min = self.min.is_some_and(|min| self.value <= min);
        if let Some(min) = self.min.filter(|_| at_min) {
            self.value = min;
        }
        let at_max = self.max.is_some_and(|max| self.value >= max);
        if let Some(max) = self.max.filter(|_| at_max) {
            self.value = max;
        }

        vec![
            Patch::value(Target::QTY_INPUT, self.value.to_string()),
            Patch::disabled(Target::QTY_DECREASE, at_min),
            Patch::disabled(Target::QTY_INCREASE, at_max),
        ]
    }
}

impl EventListener for QtySwitcher {
    fn on_event(&mut self, event: &ThemeEvent) -> Vec<Patch> {
        let ThemeEvent::VariantNewDoc(html) = event else {
            return Vec::new();
        };
        let target = Target::qty_switcher(&self.block_id);
        let Some(replacement) = fragment::outer_html(html, target.selector()) else {
            return Vec::new();
        };

        // The new variant may carry different stock limits
        let bound = |name: &str| {
            fragment::attribute(&replacement, "input", name).and_then(|v| v.parse::<u32>().ok())
        };
        self.min = bound("min");
        self.max = bound("max");
        if let Some(value) = bound("value") {
            self.value = value;
        }

        vec![Patch::Replace {
            target,
            html: replacement,
        }]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use theme_widgets_core::MediaId;

    use super::*;
    use crate::variant::FeaturedMedia;
    use crate::variant::fixtures::variant;

    fn change_with_media(position: usize) -> ThemeEvent {
        let mut v = variant(1, &["Red"], 1000, true);
        v.featured_media = Some(FeaturedMedia {
            id: MediaId::new(5),
            position,
        });
        ThemeEvent::VariantChange(Arc::new(v))
    }

    #[test]
    fn test_gallery_follows_featured_media() {
        let mut gallery = MediaGallery::new(4, 0);
        let patches = gallery.on_event(&change_with_media(3));
        assert_eq!(gallery.current(), 2);
        assert_eq!(
            patches,
            vec![
                Patch::style(Target::MEDIA_GALLERY_TRACK, "transform", "translateX(-200%)"),
                Patch::text(Target::MEDIA_GALLERY_PAGINATION, "3/4"),
            ]
        );

        let plain = ThemeEvent::VariantChange(Arc::new(variant(2, &["Blue"], 1000, true)));
        assert!(gallery.on_event(&plain).is_empty());
        assert_eq!(gallery.current(), 2);
    }

    #[test]
    fn test_gallery_wraps() {
        let mut gallery = MediaGallery::new(3, 0);
        gallery.prev();
        assert_eq!(gallery.current(), 2);
        gallery.next();
        assert_eq!(gallery.current(), 0);
        let patches = gallery.go(0);
        assert_eq!(
            patches[0],
            Patch::style(Target::MEDIA_GALLERY_TRACK, "transform", "translateX(0%)")
        );
    }

    #[test]
    fn test_inventory_bar() {
        let mut bar = InventoryBar::new("b7");
        let dim = bar.on_event(&change_with_media(1));
        assert_eq!(
            dim,
            vec![Patch::style(Target::inventory_bar("b7"), "opacity", ".25")]
        );

        let html: Arc<str> =
            "<main><inventory-bar id=\"inventory-bar-b7\"><span>3 left</span></inventory-bar></main>"
                .into();
        let patches = bar.on_event(&ThemeEvent::VariantNewDoc(html));
        assert!(matches!(
            &patches[0],
            Patch::Replace { html, .. } if html.starts_with("<inventory-bar") && html.contains("3 left")
        ));

        assert!(bar.on_event(&ThemeEvent::VariantNewDoc("<main></main>".into())).is_empty());
    }

    #[test]
    fn test_sticky_atc_mirrors_variant() {
        let patches = StickyAtc.on_event(&change_with_media(1));
        assert_eq!(patches, vec![Patch::value(Target::STICKY_ATC_SELECT, "1")]);
    }

    #[test]
    fn test_qty_switcher_clamps() {
        let mut qty = QtySwitcher::new("b1", 1, Some(1), Some(3));
        assert_eq!(
            qty.decrease(),
            vec![
                Patch::value(Target::QTY_INPUT, "1"),
                Patch::disabled(Target::QTY_DECREASE, true),
                Patch::disabled(Target::QTY_INCREASE, false),
            ]
        );
        qty.increase();
        let patches = qty.increase();
        assert_eq!(qty.value(), 3);
        assert!(patches.contains(&Patch::disabled(Target::QTY_INCREASE, true)));
        qty.increase();
        assert_eq!(qty.value(), 3);
        assert_eq!(qty.set(10)[0], Patch::value(Target::QTY_INPUT, "3"));
    }

    #[test]
    fn test_qty_switcher_without_bounds() {
        let mut qty = QtySwitcher::new("b1", 0, None, None);
        let patches = qty.decrease();
        assert_eq!(qty.value(), 0);
        assert!(patches.contains(&Patch::disabled(Target::QTY_DECREASE, false)));
    }

    #[test]
    fn test_qty_switcher_takes_new_limits() {
        let mut qty = QtySwitcher::new("b1", 2, Some(1), Some(10));
        let html: Arc<str> = r#"<product-qty-switcher id="product-qty-switcher-b1"><input type="number" value="1" min="1" max="2"></product-qty-switcher>"#.into();
        let patches = qty.on_event(&ThemeEvent::VariantNewDoc(html));
        assert_eq!(patches.len(), 1);
        assert_eq!(qty.value(), 1);

        qty.increase();
        let patches = qty.increase();
        assert_eq!(qty.value(), 2);
        assert!(patches.contains(&Patch::disabled(Target::QTY_INCREASE, true)));
    }
}
