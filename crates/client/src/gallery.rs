//! Gallery and catalog list transforms.
//!
//! Places carry nested image collections; the gallery shows one tile per
//! image. Search is a case-insensitive substring match and a blank query
//! matches everything.

use gb_green_guide_core::{ImageId, PlaceId};

use crate::models::{Place, Product};

/// One gallery tile: an image tagged with its source place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryImage {
    pub image_id: Option<ImageId>,
    pub url: String,
    pub caption: Option<String>,
    pub place_id: PlaceId,
    pub place_name: String,
    pub city: Option<String>,
    pub location: Option<String>,
    /// Position of this image within its place (0-based).
    pub index: usize,
    /// Number of images the place has.
    pub total: usize,
}

/// Flatten places into one entry per image, in place then image order.
#[must_use]
pub fn flatten_gallery(places: &[Place]) -> Vec<GalleryImage> {
    places
        .iter()
        .flat_map(|place| {
            let total = place.images.len();
            place
                .images
                .iter()
                .enumerate()
                .map(move |(index, image)| GalleryImage {
                    image_id: image.id,
                    url: image.image.clone(),
                    caption: image.caption.clone(),
                    place_id: place.id,
                    place_name: place.name.clone(),
                    city: place.city_label().map(str::to_string),
                    location: place.location.clone(),
                    index,
                    total,
                })
        })
        .collect()
}

/// Images whose place name, city or location contains `query`.
#[must_use]
pub fn filter_gallery<'a>(images: &'a [GalleryImage], query: &str) -> Vec<&'a GalleryImage> {
    let Some(needle) = normalize_query(query) else {
        return images.iter().collect();
    };

    images
        .iter()
        .filter(|image| {
            contains(&image.place_name, &needle)
                || image.city.as_deref().is_some_and(|c| contains(c, &needle))
                || image
                    .location
                    .as_deref()
                    .is_some_and(|l| contains(l, &needle))
        })
        .collect()
}

/// Products whose name or category contains `query`.
#[must_use]
pub fn filter_products<'a>(products: &'a [Product], query: &str) -> Vec<&'a Product> {
    let Some(needle) = normalize_query(query) else {
        return products.iter().collect();
    };

    products
        .iter()
        .filter(|product| {
            contains(&product.name, &needle)
                || product
                    .category_name()
                    .is_some_and(|c| contains(c, &needle))
        })
        .collect()
}

fn normalize_query(query: &str) -> Option<String> {
    let query = query.trim();
    (!query.is_empty()).then(|| query.to_lowercase())
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn places() -> Vec<Place> {
        serde_json::from_value(serde_json::json!([
            {
                "id": 1,
                "name": "Attabad Lake",
                "city": {"id": 1, "name": "Hunza"},
                "location": "Gojal",
                "images": [
                    {"id": 11, "image": "https://cdn.example.com/a1.jpg"},
                    {"id": 12, "image": "https://cdn.example.com/a2.jpg", "caption": "Boats"}
                ]
            },
            {
                "id": 2,
                "name": "Deosai Plains",
                "city_name": "Skardu",
                "images": [
                    {"id": 21, "image": "https://cdn.example.com/d1.jpg"}
                ]
            },
            {"id": 3, "name": "Empty Place", "images": []}
        ]))
        .unwrap()
    }

    #[test]
    fn test_flatten_tags_each_image() {
        let images = flatten_gallery(&places());
        assert_eq!(images.len(), 3);

        let second = images.get(1).unwrap();
        assert_eq!(second.place_name, "Attabad Lake");
        assert_eq!(second.city.as_deref(), Some("Hunza"));
        assert_eq!((second.index, second.total), (1, 2));
        assert_eq!(second.caption.as_deref(), Some("Boats"));

        let third = images.get(2).unwrap();
        assert_eq!(third.place_id, PlaceId::new(2));
        assert_eq!(third.city.as_deref(), Some("Skardu"));
        assert_eq!((third.index, third.total), (0, 1));
    }

    #[test]
    fn test_filter_gallery_matches_name_city_location() {
        let images = flatten_gallery(&places());
        assert_eq!(filter_gallery(&images, "  ").len(), 3);
        assert_eq!(filter_gallery(&images, "HUNZA").len(), 2);
        assert_eq!(filter_gallery(&images, "gojal").len(), 2);
        assert_eq!(filter_gallery(&images, "deosai").len(), 1);
        assert!(filter_gallery(&images, "karachi").is_empty());
    }

    #[test]
    fn test_filter_products_by_name_and_category() {
        let products: Vec<Product> = serde_json::from_value(serde_json::json!([
            {"id": 1, "name": "Dried Apricots", "price": "450.00", "category": {"name": "Dry Fruits"}},
            {"id": 2, "name": "Pashmina Shawl", "price": "9000.00", "category": "Handicrafts"},
            {"id": 3, "name": "Walnut Oil", "price": "1200.00"}
        ]))
        .unwrap();

        assert_eq!(filter_products(&products, "").len(), 3);
        assert_eq!(filter_products(&products, "apricot").len(), 1);
        assert_eq!(filter_products(&products, "fruits").len(), 1);
        assert_eq!(filter_products(&products, "handi").len(), 1);
    }
}
