//! Typed documents for the travel-agency collections.
//!
//! Bindings stay untyped; these models are what the site decodes their
//! output into, plus the small amount of shaping pages do on top (sorting,
//! filtering, fallbacks).

use crate::error::{BindError, Result, ValidationErrors};
use crate::store::RemoteStore;
use crate::types::{CollectionQuery, FieldFilter};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use url::Url;

pub const HOLIDAY_PACKAGES: &str = "holidayPackages";
pub const TESTIMONIALS: &str = "testimonials";
pub const BLOG: &str = "blog";
pub const VIDEOS: &str = "videos";
pub const GALLERY_IMAGES: &str = "galleryImages";
pub const SITE_CONFIG: &str = "siteConfig";

/// Id of the site configuration document in [`SITE_CONFIG`].
pub const NOTIFICATIONS_DOC: &str = "notifications";

/// Marquee text used when the config document carries no list.
pub const DEFAULT_NOTIFICATIONS: [&str; 3] = [
    "Special discounts on summer packages! Call us now for a custom quote.",
    "Book your dream vacation with packages starting from ₹9,999!",
    "New destinations added: Explore Europe and Southeast Asia.",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageCategory {
    HillStations,
    Pilgrimages,
    Historical,
    Honeymoon,
}

impl PackageCategory {
    pub const ALL: [PackageCategory; 4] = [
        PackageCategory::HillStations,
        PackageCategory::Pilgrimages,
        PackageCategory::Historical,
        PackageCategory::Honeymoon,
    ];

    /// Stored value, also used in `?category=` links.
    pub fn slug(&self) -> &'static str {
        match self {
            PackageCategory::HillStations => "hill-stations",
            PackageCategory::Pilgrimages => "pilgrimages",
            PackageCategory::Historical => "historical",
            PackageCategory::Honeymoon => "honeymoon",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PackageCategory::HillStations => "Hill Stations",
            PackageCategory::Pilgrimages => "Pilgrimages",
            PackageCategory::Historical => "Historical",
            PackageCategory::Honeymoon => "Honeymoon",
        }
    }
}

/// Category value meaning "no filter".
pub const ALL_CATEGORIES: &str = "all";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItineraryItem {
    pub day: u32,
    pub title: String,
    pub description: String,
}

/// A bookable holiday package.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayPackage {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    pub slug: String,
    pub category: PackageCategory,
    pub duration: String,
    pub description: String,
    pub rating: f32,
    /// URL, data URL, or placeholder id.
    pub image: String,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub itinerary: Vec<ItineraryItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_tour_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub user_name: String,
    pub content: String,
    pub rating: u8,
    #[serde(default)]
    pub approved: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// ISO-8601 date (`2024-05-01` or a full timestamp).
    pub published_date: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub title: String,
    /// YouTube video id.
    pub video_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub image_url: String,
    pub description: String,
    #[serde(default)]
    pub image_hint: String,
}

/// `siteConfig/notifications`: marquee text and the home page video.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_page_video_id: Option<String>,
}

/// Filter for testimonials shown on the public site.
pub fn approved_testimonials() -> FieldFilter {
    FieldFilter::eq("approved", true)
}

/// Newest first. ISO dates compare correctly as strings.
pub fn sort_posts_newest_first(posts: &mut [BlogPost]) {
    posts.sort_by(|a, b| b.published_date.cmp(&a.published_date));
}

/// Pending testimonials first, for moderation. Stable otherwise.
pub fn sort_pending_first(testimonials: &mut [Testimonial]) {
    testimonials.sort_by(|a, b| match (a.approved, b.approved) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        _ => Ordering::Equal,
    });
}

/// Marquee lines for the header bar.
///
/// No config: nothing to show. A config without a list falls back to the
/// defaults; a list is shown minus its empty entries (whitespace-only
/// entries are kept).
pub fn marquee_lines(config: Option<&SiteConfig>) -> Vec<String> {
    match config {
        None => Vec::new(),
        Some(SiteConfig {
            notifications: None,
            ..
        }) => DEFAULT_NOTIFICATIONS.iter().map(|s| s.to_string()).collect(),
        Some(SiteConfig {
            notifications: Some(lines),
            ..
        }) => lines
            .iter()
            .filter(|line| !line.is_empty())
            .cloned()
            .collect(),
    }
}

/// `(label, value)` pairs for the category tabs, "All" first.
pub fn category_tabs() -> Vec<(&'static str, &'static str)> {
    std::iter::once(("All", ALL_CATEGORIES))
        .chain(PackageCategory::ALL.iter().map(|c| (c.label(), c.slug())))
        .collect()
}

/// Packages in the active category. A missing or `"all"` category keeps
/// everything; an unknown one matches nothing.
pub fn filter_by_category<'a>(
    packages: &'a [HolidayPackage],
    active: Option<&str>,
) -> Vec<&'a HolidayPackage> {
    match active.unwrap_or(ALL_CATEGORIES) {
        ALL_CATEGORIES => packages.iter().collect(),
        category => packages
            .iter()
            .filter(|p| p.category.slug() == category)
            .collect(),
    }
}

/// Whether a gallery entry can be shown: an embedded image or a
/// well-formed `https://` link.
pub fn is_displayable_image(url: &str) -> bool {
    url.starts_with("data:image/") || (url.starts_with("https://") && Url::parse(url).is_ok())
}

/// Gallery entries worth keeping, in order.
pub fn clean_gallery(urls: &[String]) -> Vec<String> {
    urls.iter()
        .filter(|url| is_displayable_image(url))
        .cloned()
        .collect()
}

/// Tidy a package before it is written: drop unusable gallery entries
/// and require at least one to remain.
pub fn prepare_package(mut package: HolidayPackage) -> Result<HolidayPackage> {
    package.gallery = clean_gallery(&package.gallery);
    if package.gallery.is_empty() {
        let mut errors = ValidationErrors::default();
        errors.push("gallery", "Please upload at least one gallery image.");
        return Err(BindError::Validation(errors));
    }
    Ok(package)
}

/// Look up a package by slug (first match).
pub fn find_package_by_slug(store: &dyn RemoteStore, slug: &str) -> Result<Option<HolidayPackage>> {
    let query = CollectionQuery::new(HOLIDAY_PACKAGES)?
        .with_filter(FieldFilter::eq("slug", slug))
        .with_limit(1);

    store
        .get_documents(&query)?
        .first()
        .map(|doc| doc.decode::<HolidayPackage>())
        .transpose()
}
