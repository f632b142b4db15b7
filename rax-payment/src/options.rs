//! Per-call account and body format selection.

use rax_client::CallSignature;
use rax_models::Format;

/// Account and body formats for one payment system call.
///
/// The default targets the configured account with JSON in both
/// directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions<'a> {
    /// Account number; `None` uses the client's configured account.
    pub ran: Option<&'a str>,
    /// Request body format.
    pub request: Format,
    /// Response body format.
    pub response: Format,
}

impl<'a> CallOptions<'a> {
    /// JSON in both directions against the configured account.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// XML in both directions against the configured account.
    #[must_use]
    pub fn xml() -> Self {
        Self::new().with_formats(Format::Xml, Format::Xml)
    }

    /// Targets another account.
    #[must_use]
    pub const fn for_account(mut self, ran: &'a str) -> Self {
        self.ran = Some(ran);
        self
    }

    /// Sets both body formats.
    #[must_use]
    pub const fn with_formats(mut self, request: Format, response: Format) -> Self {
        self.request = request;
        self.response = response;
        self
    }

    pub(crate) fn account<'b>(&self, configured: &'b str) -> &'b str
    where
        'a: 'b,
    {
        self.ran.unwrap_or(configured)
    }

    pub(crate) fn signature(&self, path: impl Into<String>) -> CallSignature {
        CallSignature::new(path, self.request, self.response)
    }
}
