use std::path::PathBuf;

use rax_models::Format;

/// Exercise the billing, payment and identity extension clients against a
/// live endpoint and print what they return as JSON.
#[derive(clap::Parser, Debug)]
#[command(arg_required_else_help = true)]
pub(crate) struct Args {
    /// TOML configuration file.
    #[arg(short, long, env = "RAX_CONFIG", value_name = "FILE", default_value = "rax.toml")]
    pub(crate) config: PathBuf,

    /// User section whose credentials authenticate the calls.
    #[arg(short, long, default_value = rax_client::config::DEFAULT_USER_SECTION)]
    pub(crate) section: String,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Command {
    /// Authenticate and print the identity token.
    Token,
    /// List payment methods.
    Methods(Target),
    /// List payments.
    Payments(Target),
    /// List voids of a payment, or of the first listed payment.
    Voids {
        #[command(flatten)]
        target: Target,
        /// Payment whose voids are listed.
        #[arg(long)]
        payment_id: Option<String>,
    },
    /// List refunds.
    Refunds(Target),
    /// Validate a payment method with the default validation request.
    Validate(Target),
}

/// Which system to call and how.
#[derive(clap::Args, Debug, Clone)]
pub(crate) struct Target {
    /// Extension system to call.
    #[arg(value_enum, long, default_value = "billing")]
    pub(crate) system: System,

    /// Account number; defaults to the configured one. Payment system only.
    #[arg(long)]
    pub(crate) ran: Option<String>,

    /// Request and response body format. Payment system only.
    #[arg(value_enum, short = 'f', long, default_value = "json")]
    pub(crate) format: BodyFormat,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum System {
    /// Billing system, JSON only.
    Billing,
    /// Payment system, JSON or XML.
    Payment,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BodyFormat {
    /// `application/json`
    Json,
    /// `application/xml`
    Xml,
}

impl From<BodyFormat> for Format {
    fn from(format: BodyFormat) -> Self {
        match format {
            BodyFormat::Json => Self::Json,
            BodyFormat::Xml => Self::Xml,
        }
    }
}
