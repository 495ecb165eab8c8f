//! Login, registration and session commands.

use gb_green_guide_client::ClientError;
use gb_green_guide_client::auth::Registration;
use gb_green_guide_client::models::Session;
use gb_green_guide_client::state::AppContext;

/// Log in and report the loaded cart.
pub async fn login(ctx: &AppContext, email: &str, password: &str) -> Result<(), ClientError> {
    let session = ctx.auth().login(email, password).await?;
    print_welcome(ctx, &session);
    Ok(())
}

/// Create an account and log in.
pub async fn register(ctx: &AppContext, registration: Registration) -> Result<(), ClientError> {
    let session = ctx.auth().register(registration).await?;
    print_welcome(ctx, &session);
    Ok(())
}

pub async fn logout(ctx: &AppContext) {
    if ctx.session().is_authenticated() {
        ctx.auth().logout().await;
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
}

/// Print the current user, or fail if nobody is logged in.
pub fn whoami(ctx: &AppContext) -> Result<(), ClientError> {
    let session = ctx.session().require_active()?;
    let user = &session.user;

    println!("{}", user.label());
    if let Some(email) = &user.email {
        println!("  email: {email}");
    }
    if let Some(phone) = &user.phone {
        println!("  phone: {phone}");
    }
    if let Some(expires_at) = session
        .token
        .expires_at()
        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
    {
        println!("  session expires: {}", expires_at.format("%Y-%m-%d %H:%M UTC"));
    }
    Ok(())
}

fn print_welcome(ctx: &AppContext, session: &Session) {
    println!("Logged in as {}.", session.user.label());
    let count = ctx.cart().item_count();
    if count > 0 {
        println!("Your cart has {count} item(s).");
    }
}
