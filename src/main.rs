use dotenvy::dotenv;
use std::env;
use storefront_ledger::{
    config::{database, settings},
    core::{catalog, checkout, history},
    errors::{Error, Result},
    storefront::format,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: storefront-ledger [init | checkout <user_id> | orders <user_id>]";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load config.toml (checkout settings and catalog seed)
    let app_config = settings::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {e}"))?;

    // 4. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database schema ready"))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    // 5. Seed the catalog
    catalog::seed_catalog(&db, &app_config.products).await?;

    // 6. Run the requested operation
    let args: Vec<String> = env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] | ["init"] => info!("Storefront ledger initialized"),
        ["checkout", user_id] => {
            let user_id = parse_user_id(user_id)?;
            let order_id = checkout::finalize_checkout(&db, user_id, &app_config.checkout)
                .await
                .inspect_err(|e| error!("{}", e.user_message()))?;
            info!("Placed order #{order_id} for user {user_id}");
        }
        ["orders", user_id] => {
            let user_id = parse_user_id(user_id)?;
            let orders = history::order_history_for_user(&db, user_id).await?;
            info!("User {user_id} has {} order(s)", orders.len());
            for order in &orders {
                info!("{}", format::format_order_summary(order));
                for line in &order.lines {
                    info!(
                        "  {} x{} @ {}: {}",
                        line.product_name,
                        line.quantity,
                        format::format_money(line.sale_price_cents),
                        line.keys.join(", ")
                    );
                }
            }
        }
        _ => {
            return Err(Error::Config {
                message: USAGE.to_string(),
            });
        }
    }

    Ok(())
}

fn parse_user_id(raw: &str) -> Result<i64> {
    raw.parse().map_err(|_| Error::Config {
        message: format!("Invalid user id '{raw}'. {USAGE}"),
    })
}
