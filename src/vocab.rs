//! Enumerated values offered by the catalog's input forms.
//!
//! The store keeps whatever strings it is given; these lists are for the
//! presentation layer to validate against and to render labels.

/// A garment category: stored value and display label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub value: &'static str,
    pub label: &'static str,
}

pub const CATEGORIES: &[Category] = &[
    Category { value: "shirts", label: "셔츠" },
    Category { value: "jackets", label: "자켓" },
    Category { value: "knits", label: "니트" },
    Category { value: "pants", label: "바지" },
    Category { value: "skirts", label: "치마" },
    Category { value: "dresses", label: "원피스" },
    Category { value: "shoes", label: "신발" },
    Category { value: "accessories", label: "액세서리" },
    Category { value: "outerwear", label: "아우터" },
    Category { value: "underwear", label: "속옷" },
];

pub const SIZES: &[&str] = &["XS", "S", "M", "L", "XL", "XXL"];

pub const COLORS: &[&str] = &[
    "화이트", "블랙", "그레이", "네이비", "브라운", "베이지", "레드", "블루", "그린", "옐로우",
    "핑크", "퍼플",
];

pub const MATERIALS: &[&str] = &[
    "면", "울", "폴리에스터", "레이온", "데님", "가죽", "실크", "린넨", "니트",
];

pub const WASHING_METHODS: &[&str] = &["드라이클리닝", "손세탁", "기계세탁", "물세탁 금지"];

/// Display label for a category value, if it is a known category
pub fn category_label(value: &str) -> Option<&'static str> {
    CATEGORIES.iter().find(|c| c.value == value).map(|c| c.label)
}
