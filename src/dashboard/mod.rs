//! # Catalog Dashboard
//!
//! Client-side view of the catalog: a typed HTTP client plus the state behind
//! the product list and detail pages. The `dashboard` CLI subcommand renders
//! the list view as text.

pub mod client;
pub mod state;

use std::fmt::Write;

pub use client::{CatalogApi, CatalogClient, ClientError};
pub use state::{
    CatalogStats, DeleteOutcome, NewProductForm, ProductDetailState, ProductEdit, ProductFilter,
    ProductListState, Selection,
};

/// Renders the filtered product list and the summary counts as plain text.
pub fn render_list<C: CatalogApi>(state: &ProductListState<C>) -> String {
    let stats = state.stats();
    let filtered = state.filtered();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Total: {}  Active: {}  Low stock: {}  Out of stock: {}",
        stats.total, stats.active, stats.low_stock, stats.out_of_stock
    );
    let _ = writeln!(
        out,
        "Categories: {}",
        if state.categories.is_empty() {
            "-".to_string()
        } else {
            state.categories.join(", ")
        }
    );
    let _ = writeln!(
        out,
        "Showing {} of {} products",
        filtered.len(),
        state.products.len()
    );

    if filtered.is_empty() {
        let _ = writeln!(out, "No products found");
        return out;
    }

    for product in filtered {
        let _ = writeln!(
            out,
            "{}  {:<32} {:<16} {:>10.2} {:>6} {}",
            product.id,
            product.name,
            product.category.as_deref().unwrap_or("-"),
            product.price,
            product.stock,
            product.status
        );
    }

    out
}
