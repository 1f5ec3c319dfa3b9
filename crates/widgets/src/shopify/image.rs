//! CDN image URL resizing.

use std::sync::LazyLock;

use regex::Regex;

/// Legacy named size suffixes (`_grande.`, `_1024x1024.` ...).
static NAMED_SIZE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_(pico|icon|thumb|small|compact|medium|large|grande|original|1024x1024|2048x2048|master)+\.")
        .expect("Invalid regex")
});

static EXTENSION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.jpg|\.png|\.gif|\.jpeg").expect("Invalid regex"));

/// Rewrite a Shopify CDN image URL to request `size` (e.g. `480x640`),
/// optionally cropped (`center`, `top` ...).
#[must_use]
pub fn resize_image(src: &str, size: &str, crop: &str) -> String {
    let stripped = NAMED_SIZE_REGEX.replace_all(src, ".");
    let crop = if crop.is_empty() {
        String::new()
    } else {
        format!("_crop_{crop}")
    };
    EXTENSION_REGEX
        .replace_all(&stripped, |caps: &regex::Captures<'_>| {
            format!("_{size}{crop}{}", &caps[0])
        })
        .into_owned()
}

/// Aspect ratio setting of product-card images (`data-img-ratio`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageRatio {
    /// Natural height.
    #[default]
    Adapt,
    Square,
    /// 3:4
    Portrait,
}

impl ImageRatio {
    const WIDTH: u32 = 480;

    /// Parse the markup value; unknown values fall back to `Adapt`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "square" => Self::Square,
            "portrait" => Self::Portrait,
            _ => Self::Adapt,
        }
    }

    #[must_use]
    pub const fn width(self) -> u32 {
        Self::WIDTH
    }

    /// Height in pixels, `None` when the image keeps its natural ratio.
    #[must_use]
    pub const fn height(self) -> Option<u32> {
        match self {
            Self::Adapt => None,
            Self::Square => Some(Self::WIDTH),
            Self::Portrait => Some(Self::WIDTH * 4 / 3),
        }
    }

    /// Size token for [`resize_image`].
    #[must_use]
    pub fn size(self) -> String {
        match self.height() {
            Some(h) => format!("{}x{h}", Self::WIDTH),
            None => format!("{}x", Self::WIDTH),
        }
    }

    /// The `height` attribute value (empty when natural).
    #[must_use]
    pub fn height_attr(self) -> String {
        self.height().map(|h| h.to_string()).unwrap_or_default()
    }
}
