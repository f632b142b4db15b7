//! Command-line probe for the Rackspace extension clients.
//!
//! # Usage
//!
//! ```bash
//! # Print an identity token for the [user] section
//! rax-probe token
//!
//! # List payment methods of another account over XML
//! rax-probe methods --system payment --ran 020-123 --format xml
//!
//! # Validate the first billing method with the default request
//! RUST_LOG=debug rax-probe --config fuzz.toml validate
//! ```
//!
//! # Environment Variables
//!
//! - `RAX_CONFIG`: path to the TOML configuration file (default: `rax.toml`)
//! - `RUST_LOG`: log level filter (default: `info`)
//!
//! A `.env` file in the working directory is loaded first.

mod cli;

use std::io::{BufWriter, Write};
use std::sync::Arc;

use clap::Parser;
use rax_billing::BillingClient;
use rax_client::{
    ExtensionConfig, HttpTransport, IdentityClient, ReqwestTransport, SessionCache, TokenSource,
};
use rax_models::{Listable, Listing, Model, ValidationRequest};
use rax_payment::{CallOptions, PaymentClient};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, Command, System, Target};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Args::parse()).await {
        tracing::error!("Probe failed: {e}");
        std::process::exit(1);
    }
}

/// Clients sharing one transport, identity client and session cache.
struct Session {
    identity: Arc<IdentityClient>,
    billing: Result<BillingClient, rax_client::ClientError>,
    payment: Result<PaymentClient, rax_client::ClientError>,
}

impl Session {
    fn new(config: &Arc<ExtensionConfig>, section: &str) -> Self {
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new().with_timeout(config.timeout()));
        let identity = Arc::new(IdentityClient::new(
            Arc::clone(config),
            Arc::clone(&transport),
        ));
        let cache = Arc::new(SessionCache::new());
        let tokens: Arc<dyn TokenSource> = Arc::<IdentityClient>::clone(&identity);

        // Each system only needs its own account, so a missing one is
        // reported when that system is called.
        let billing =
            BillingClient::from_config(config, Arc::clone(&transport), Arc::clone(&tokens))
                .map(|client| {
                    client
                        .with_user_section(section)
                        .with_cache(Arc::clone(&cache))
                });
        let payment = PaymentClient::from_config(config, transport, tokens)
            .map(|client| client.with_user_section(section).with_cache(cache));
        Self {
            identity,
            billing,
            payment,
        }
    }

    fn billing(&self) -> Result<&BillingClient, Box<dyn std::error::Error>> {
        self.billing.as_ref().map_err(|e| e.to_string().into())
    }

    fn payment(&self) -> Result<&PaymentClient, Box<dyn std::error::Error>> {
        self.payment.as_ref().map_err(|e| e.to_string().into())
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(ExtensionConfig::load_from(&args.config)?);
    tracing::info!(
        config = %args.config.display(),
        section = %args.section,
        "Loaded configuration"
    );
    let session = Session::new(&config, &args.section);

    let output = match args.command {
        Command::Token => Value::String(session.identity.get_token(&args.section).await?),
        Command::Methods(target) => match target.system {
            System::Billing => listing(&*session.billing()?.list_payment_methods().await?),
            System::Payment => listing(
                &*session
                    .payment()?
                    .list_payment_methods(options(&target))
                    .await?,
            ),
        },
        Command::Payments(target) => match target.system {
            System::Billing => listing(&*session.billing()?.list_payments().await?),
            System::Payment => {
                listing(&*session.payment()?.list_payments(options(&target)).await?)
            }
        },
        Command::Voids { target, payment_id } => match target.system {
            System::Billing => listing(&*session.billing()?.list_voids().await?),
            System::Payment => {
                let payment = session.payment()?;
                let payment_id = match payment_id {
                    Some(id) => id,
                    None => payment.get_one_payment_id(options(&target)).await?,
                };
                listing(&*payment.list_voids(&payment_id, options(&target)).await?)
            }
        },
        Command::Refunds(target) => match target.system {
            System::Billing => listing(&*session.billing()?.list_refunds().await?),
            System::Payment => {
                listing(&*session.payment()?.list_refunds(options(&target)).await?)
            }
        },
        Command::Validate(target) => {
            let validation = match target.system {
                System::Billing => {
                    session
                        .billing()?
                        .create_method_validation(ValidationRequest::new())
                        .await?
                }
                System::Payment => {
                    session
                        .payment()?
                        .create_method_validation(ValidationRequest::new(), options(&target))
                        .await?
                }
            };
            Value::Object(validation.to_dict())
        }
    };

    let mut writer = BufWriter::new(std::io::stdout().lock());
    serde_json::to_writer_pretty(&mut writer, &output)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn options(target: &Target) -> CallOptions<'_> {
    let format = target.format.into();
    let options = CallOptions::new().with_formats(format, format);
    match target.ran.as_deref() {
        Some(ran) => options.for_account(ran),
        None => options,
    }
}

/// Listing entries as `{id: dict}`.
fn listing<T: Listable>(listing: &Listing<T>) -> Value {
    let entries: Map<String, Value> = listing
        .iter()
        .map(|(id, item)| (id.to_owned(), Value::Object(item.to_dict())))
        .collect();
    tracing::debug!(entries = entries.len(), kind = T::ITEM, "Listed");
    Value::Object(entries)
}
