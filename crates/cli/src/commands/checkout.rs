//! Checkout command: fill the form from flags and place the order.

use clap::Args;
use tracing::warn;

use gb_green_guide_client::ClientError;
use gb_green_guide_client::checkout::{CheckoutError, CheckoutField, SubmitOutcome};
use gb_green_guide_client::models::OrderRecord;
use gb_green_guide_client::state::AppContext;

/// Delivery details. Name, email and phone default to the account's.
#[derive(Debug, Args)]
pub struct CheckoutArgs {
    #[arg(long)]
    full_name: Option<String>,

    #[arg(long)]
    phone: Option<String>,

    #[arg(long)]
    email: Option<String>,

    #[arg(long)]
    city: Option<String>,

    /// Street address
    #[arg(long)]
    address: Option<String>,

    /// Apartment, suite or landmark
    #[arg(long)]
    address2: Option<String>,

    /// Defaults to the configured country
    #[arg(long)]
    country: Option<String>,

    /// Notes for the courier
    #[arg(long, default_value = "")]
    notes: String,
}

impl CheckoutArgs {
    fn fields(self) -> impl Iterator<Item = (CheckoutField, String)> {
        [
            (CheckoutField::FullName, self.full_name),
            (CheckoutField::Phone, self.phone),
            (CheckoutField::Email, self.email),
            (CheckoutField::City, self.city),
            (CheckoutField::AddressLine1, self.address),
            (CheckoutField::AddressLine2, self.address2),
            (CheckoutField::Country, self.country),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, v)))
    }
}

/// Place a cash-on-delivery order for the server cart.
pub async fn place_order(ctx: &AppContext, args: CheckoutArgs) -> Result<(), ClientError> {
    ctx.session().require_active()?;
    ctx.cart().fetch_cart().await?;

    let checkout = ctx.checkout();
    let notes = args.notes.clone();
    for (field, value) in args.fields() {
        checkout.set_field(field, value);
        checkout.blur(field);
    }

    let summary = checkout.summary();
    println!(
        "{} item(s): subtotal {}, shipping {}, total {}",
        summary.item_count, summary.subtotal, summary.shipping, summary.total
    );

    match checkout.submit(&notes).await {
        Ok(SubmitOutcome::Placed(order)) => {
            print_order(&order);
            Ok(())
        }
        Ok(outcome) => {
            warn!(?outcome, "Order not submitted");
            Ok(())
        }
        Err(CheckoutError::Validation(errors)) => {
            for (field, message) in errors.iter() {
                println!("  {field}: {message}");
            }
            Err(CheckoutError::Validation(errors).into())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_order(order: &OrderRecord) {
    println!("Order {} placed. Pay cash on delivery.", order.reference());
    if let Some(status) = &order.status {
        println!("  status: {status}");
    }
    if let Some(total) = order.total {
        println!("  total: {total}");
    }
}
