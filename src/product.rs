use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProductType {
    TShirt,
    Hoodie,
    Mug,
    ToteBag,
    Cap,
    Notebook,
}

/// Display metadata for one product.
#[derive(Debug, Clone, Copy)]
pub struct ProductInfo {
    pub product: ProductType,
    pub label: &'static str,
    pub icon: &'static str,
    pub slug: &'static str,
}

pub static PRODUCTS: [ProductInfo; 6] = [
    ProductInfo { product: ProductType::TShirt, label: "T-Shirt", icon: "👕", slug: "tshirt" },
    ProductInfo { product: ProductType::Hoodie, label: "Hoodie", icon: "🧥", slug: "hoodie" },
    ProductInfo { product: ProductType::Mug, label: "Coffee Mug", icon: "☕", slug: "mug" },
    ProductInfo { product: ProductType::ToteBag, label: "Tote Bag", icon: "👜", slug: "tote" },
    ProductInfo { product: ProductType::Cap, label: "Baseball Cap", icon: "🧢", slug: "cap" },
    ProductInfo { product: ProductType::Notebook, label: "Notebook", icon: "📓", slug: "notebook" },
];

impl ProductType {
    pub const ALL: [ProductType; 6] = [
        ProductType::TShirt,
        ProductType::Hoodie,
        ProductType::Mug,
        ProductType::ToteBag,
        ProductType::Cap,
        ProductType::Notebook,
    ];

    pub fn info(self) -> &'static ProductInfo {
        // table rows are in declaration order
        &PRODUCTS[self as usize]
    }

    pub fn label(self) -> &'static str {
        self.info().label
    }

    pub fn icon(self) -> &'static str {
        self.info().icon
    }

    pub fn slug(self) -> &'static str {
        self.info().slug
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProductType {
    type Err = String;

    /// Accepts a slug, a display label or the variant name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        PRODUCTS
            .iter()
            .find(|p| {
                p.slug.eq_ignore_ascii_case(needle)
                    || p.label.eq_ignore_ascii_case(needle)
                    || format!("{:?}", p.product).eq_ignore_ascii_case(needle)
            })
            .map(|p| p.product)
            .ok_or_else(|| {
                let known: Vec<&str> = PRODUCTS.iter().map(|p| p.slug).collect();
                format!("unknown product '{needle}' (expected one of: {})", known.join(", "))
            })
    }
}

/// Products picked for the next batch. Toggling twice removes a product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    items: BTreeSet<ProductType>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the product is selected after the toggle.
    pub fn toggle(&mut self, product: ProductType) -> bool {
        if self.items.remove(&product) {
            false
        } else {
            self.items.insert(product);
            true
        }
    }

    pub fn contains(&self, product: ProductType) -> bool {
        self.items.contains(&product)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ProductType> + '_ {
        self.items.iter().copied()
    }
}

impl FromIterator<ProductType> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = ProductType>>(iter: I) -> Self {
        Self { items: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_table_matches_declaration_order() {
        for (idx, product) in ProductType::ALL.iter().enumerate() {
            assert_eq!(PRODUCTS[idx].product, *product);
        }
        assert_eq!(ProductType::Mug.label(), "Coffee Mug");
        assert_eq!(ProductType::Cap.icon(), "🧢");
    }

    #[test]
    fn parses_slugs_labels_and_variants() {
        assert_eq!("mug".parse::<ProductType>().unwrap(), ProductType::Mug);
        assert_eq!("Tote Bag".parse::<ProductType>().unwrap(), ProductType::ToteBag);
        assert_eq!("TShirt".parse::<ProductType>().unwrap(), ProductType::TShirt);
        assert_eq!(" t-shirt ".parse::<ProductType>().unwrap(), ProductType::TShirt);
        assert!("sock".parse::<ProductType>().is_err());
    }

    #[test]
    fn toggle_has_set_semantics() {
        let mut sel = SelectionSet::new();
        assert!(sel.toggle(ProductType::Mug));
        assert!(sel.toggle(ProductType::TShirt));
        assert_eq!(sel.len(), 2);
        assert!(!sel.toggle(ProductType::Mug));
        assert!(!sel.contains(ProductType::Mug));
        assert_eq!(sel.iter().collect::<Vec<_>>(), vec![ProductType::TShirt]);
        sel.clear();
        assert!(sel.is_empty());
    }

    #[test]
    fn iteration_follows_declaration_order() {
        let sel: SelectionSet = [ProductType::Notebook, ProductType::TShirt, ProductType::Mug]
            .into_iter()
            .collect();
        assert_eq!(
            sel.iter().collect::<Vec<_>>(),
            vec![ProductType::TShirt, ProductType::Mug, ProductType::Notebook]
        );
    }
}
