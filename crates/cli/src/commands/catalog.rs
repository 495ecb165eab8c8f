//! Catalog browsing and review commands.

use gb_green_guide_client::ClientError;
use gb_green_guide_client::state::AppContext;
use gb_green_guide_core::ProductId;

/// List products, filtered by name or category when `query` is non-blank.
pub async fn products(ctx: &AppContext, query: &str) -> Result<(), ClientError> {
    let products = ctx.catalog().search_products(query).await?;
    if products.is_empty() {
        println!("No products found.");
        return Ok(());
    }

    for product in &products {
        let stock = if product.in_stock() {
            format!("{} in stock", product.stock)
        } else {
            "out of stock".to_string()
        };
        println!(
            "{:>6}  {:<32} {:>14}  {:<18} {}",
            product.id,
            product.name,
            product.unit_price(),
            product.category_name().unwrap_or("-"),
            stock,
        );
    }
    Ok(())
}

pub async fn gallery(ctx: &AppContext, query: &str) -> Result<(), ClientError> {
    let images = ctx.catalog().gallery(query).await?;
    if images.is_empty() {
        println!("No images match your search.");
        return Ok(());
    }

    for image in &images {
        let place = image
            .city
            .as_deref()
            .map_or_else(|| image.place_name.clone(), |city| {
                format!("{}, {city}", image.place_name)
            });
        println!("[{}/{}] {place}", image.index + 1, image.total);
        if let Some(caption) = &image.caption {
            println!("        {caption}");
        }
        println!("        {}", image.url);
    }
    println!("{} image(s)", images.len());
    Ok(())
}

pub async fn reviews(ctx: &AppContext, product_id: ProductId) -> Result<(), ClientError> {
    let reviews = ctx.catalog().reviews(product_id).await?;
    if reviews.is_empty() {
        println!("No reviews yet.");
        return Ok(());
    }

    for review in &reviews {
        let stars = "*".repeat(usize::from(review.rating.stars()));
        println!(
            "{stars:<5}  {}  {}",
            review.user_name.as_deref().unwrap_or("Anonymous"),
            review.created_at.as_deref().unwrap_or_default(),
        );
        println!("       {}", review.comment);
    }
    Ok(())
}

pub async fn review(
    ctx: &AppContext,
    product_id: ProductId,
    rating: u8,
    comment: &str,
) -> Result<(), ClientError> {
    let review = ctx.catalog().post_review(product_id, rating, comment).await?;
    println!("Thanks! Review {} posted.", review.id);
    Ok(())
}
