//! Cart commands.
//!
//! Every command loads the server cart first, so the printed state is what
//! the server holds after the change.

use gb_green_guide_client::ClientError;
use gb_green_guide_client::models::Cart;
use gb_green_guide_client::state::AppContext;
use gb_green_guide_core::ProductId;

pub async fn show(ctx: &AppContext) -> Result<(), ClientError> {
    let cart = ctx.cart().fetch_cart().await?;
    print_cart(&cart);
    Ok(())
}

pub async fn add(ctx: &AppContext, product_id: ProductId, quantity: u32) -> Result<(), ClientError> {
    ctx.cart().fetch_cart().await?;
    let cart = ctx.cart().add_to_cart(product_id, quantity).await?;
    print_cart(&cart);
    Ok(())
}

pub async fn remove(ctx: &AppContext, product_id: ProductId) -> Result<(), ClientError> {
    ctx.cart().fetch_cart().await?;
    if !ctx.cart().is_in_cart(product_id) {
        return Err(ClientError::InvalidInput(format!(
            "Product {product_id} is not in your cart"
        )));
    }
    let cart = ctx.cart().remove_from_cart(product_id).await?;
    print_cart(&cart);
    Ok(())
}

/// Set a line's quantity; zero removes it.
pub async fn set(ctx: &AppContext, product_id: ProductId, quantity: u32) -> Result<(), ClientError> {
    ctx.cart().fetch_cart().await?;
    let cart = ctx
        .cart()
        .update_cart_item_quantity(product_id, quantity)
        .await?;
    print_cart(&cart);
    Ok(())
}

pub async fn clear(ctx: &AppContext) -> Result<(), ClientError> {
    ctx.cart().clear_cart().await?;
    println!("Cart cleared.");
    Ok(())
}

pub(crate) fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }

    for line in &cart.items {
        let mut note = String::new();
        if let Some(problem) = line.availability_problem() {
            note = format!("  ! {problem}");
        }
        println!(
            "{:>6}  {:<32} {:>3} x {:>14} = {:>14}{note}",
            line.product.id,
            line.product.name,
            line.quantity,
            line.product.unit_price(),
            line.line_total(),
        );
    }
    println!("{} item(s), subtotal {}", cart.item_count(), cart.subtotal());
}
