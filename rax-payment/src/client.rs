//! [`PaymentClient`]: the payment system's methods, validations, payments,
//! voids and refunds, in JSON or XML, for any account.

use std::sync::Arc;

use rax_client::{
    CallSignature, ClientError, ExtensionConfig, HttpTransport, ListingCache, ResourceClient,
    SessionCache, TokenSource, first_entry,
};
use rax_models::{
    Format, Listing, MethodInstrument, MethodValidation, ModelError, Payment, PaymentMethod,
    Refund, ValidationRequest, Void,
};

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::options::CallOptions;

const FORMATS: [Format; 2] = [Format::Json, Format::Xml];

/// Client for the payment system.
///
/// Every operation takes [`CallOptions`]. Listings are memoized per path
/// and format pair; creating or deleting a resource drops the memoized
/// listings of its collection.
#[derive(Debug, Clone)]
pub struct PaymentClient {
    resources: ResourceClient,
    ran: String,
    cache: Arc<SessionCache>,
}

impl PaymentClient {
    /// Creates a client whose default account is `ran`.
    #[must_use]
    pub fn new(resources: ResourceClient, ran: impl Into<String>) -> Self {
        Self {
            resources,
            ran: ran.into(),
            cache: Arc::new(SessionCache::new()),
        }
    }

    /// Builds a client from the `endpoint` and `[payment] ran` settings.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if either setting is missing, or
    /// [`ClientError::UrlParse`] for an invalid endpoint.
    pub fn from_config(
        config: &ExtensionConfig,
        transport: Arc<dyn HttpTransport>,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, ClientError> {
        let resources = ResourceClient::try_new(config.api_endpoint()?, transport, tokens)?;
        Ok(Self::new(resources, config.payment_ran()?))
    }

    /// Authenticates as another user section.
    #[must_use]
    pub fn with_user_section(mut self, section: impl Into<String>) -> Self {
        self.resources = self.resources.with_user_section(section);
        self
    }

    /// Shares an existing session cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<SessionCache>) -> Self {
        self.cache = cache;
        self
    }

    /// The default account number.
    #[must_use]
    pub fn ran(&self) -> &str {
        &self.ran
    }

    /// Returns the session cache.
    #[must_use]
    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    fn account_path(&self, options: &CallOptions<'_>, collection: &str) -> String {
        format!("/v1/accounts/{}/{collection}", options.account(&self.ran))
    }

    /// Lists an account's payment methods, keyed by method id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or the body is not a
    /// method listing.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "rax.payment.list_payment_methods", skip(self), err)
    )]
    pub async fn list_payment_methods(
        &self,
        options: CallOptions<'_>,
    ) -> Result<Arc<Listing<PaymentMethod>>, ClientError> {
        let path = self.account_path(&options, "methods");
        let fetch = self
            .resources
            .list(&path, "GET /v1/accounts/{ran}/methods", options.response);
        self.cache
            .methods
            .get_or_try_insert(options.signature(path.clone()), fetch)
            .await
    }

    /// Id of the first listed payment method.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EmptyListing`] if the account has none.
    pub async fn get_one_method_id(&self, options: CallOptions<'_>) -> Result<String, ClientError> {
        Ok(first_entry(&*self.list_payment_methods(options).await?)?.0)
    }

    /// The first listed payment method.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EmptyListing`] if the account has none.
    pub async fn get_one_method(
        &self,
        options: CallOptions<'_>,
    ) -> Result<PaymentMethod, ClientError> {
        Ok(first_entry(&*self.list_payment_methods(options).await?)?.1)
    }

    /// Fetches one payment method.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or the body is not a
    /// payment method.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "rax.payment.get_payment_method", skip(self), err)
    )]
    pub async fn get_payment_method(
        &self,
        method_id: &str,
        options: CallOptions<'_>,
    ) -> Result<PaymentMethod, ClientError> {
        let path = format!("{}/{method_id}", self.account_path(&options, "methods"));
        self.resources
            .get(&path, "GET /v1/accounts/{ran}/methods/{id}", options.response)
            .await
    }

    /// Stores a new payment method on the account.
    ///
    /// The request body is the instrument under `papi:method`. A response
    /// carrying the instrument fields inline is read as an instrument of the
    /// requested kind.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or the response does not
    /// describe a payment method.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "rax.payment.create_payment_method", skip_all, err)
    )]
    pub async fn create_payment_method(
        &self,
        instrument: &MethodInstrument,
        options: CallOptions<'_>,
    ) -> Result<PaymentMethod, ClientError> {
        let path = self.account_path(&options, "methods");
        let body = instrument.encode(options.request)?;
        let reply = self
            .resources
            .post(
                &path,
                "POST /v1/accounts/{ran}/methods",
                body,
                options.request,
                options.response,
            )
            .await?;
        invalidate_path(&self.cache.methods, &path).await;
        Ok(PaymentMethod::from_created_body(&reply, instrument.kind())?)
    }

    /// Removes a payment method from the account.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpStatus`] for non-2xx statuses.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "rax.payment.delete_payment_method", skip(self), err)
    )]
    pub async fn delete_payment_method(
        &self,
        method_id: &str,
        options: CallOptions<'_>,
    ) -> Result<(), ClientError> {
        let collection = self.account_path(&options, "methods");
        self.resources
            .delete(
                &format!("{collection}/{method_id}"),
                "DELETE /v1/accounts/{ran}/methods/{id}",
            )
            .await?;
        invalidate_path(&self.cache.methods, &collection).await;
        Ok(())
    }

    /// Creates a method validation and records it in the session cache.
    ///
    /// A request without a method validates the account's first listed one.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if no method is available, the request fails,
    /// or the response carries no validation id.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "rax.payment.create_method_validation", skip_all, err)
    )]
    pub async fn create_method_validation(
        &self,
        mut request: ValidationRequest,
        options: CallOptions<'_>,
    ) -> Result<MethodValidation, ClientError> {
        let method = match request.method.take() {
            Some(method) => method,
            None => self.get_one_method(options).await?,
        };
        let validation: MethodValidation = self
            .resources
            .create(
                "/v1/methodValidations",
                "POST /v1/methodValidations",
                &request.build(method),
                options.request,
                options.response,
            )
            .await?;
        let id = validation
            .method_validation_id
            .clone()
            .ok_or(ModelError::MissingIdentifier("methodValidation"))?;
        self.cache.validations.record(id, validation.clone()).await;
        Ok(validation)
    }

    async fn first_validation(
        &self,
        options: CallOptions<'_>,
    ) -> Result<(String, MethodValidation), ClientError> {
        if let Some(entry) = self.cache.validations.first().await {
            return Ok(entry);
        }
        let validation = self
            .create_method_validation(ValidationRequest::new(), options)
            .await?;
        let id = validation.method_validation_id.clone().unwrap_or_default();
        Ok((id, validation))
    }

    /// Id of the first recorded validation, creating one with the defaults
    /// when none exists.
    ///
    /// # Errors
    ///
    /// See [`PaymentClient::create_method_validation`].
    pub async fn get_one_method_validation_id(
        &self,
        options: CallOptions<'_>,
    ) -> Result<String, ClientError> {
        Ok(self.first_validation(options).await?.0)
    }

    /// The first recorded validation, creating one with the defaults when
    /// none exists.
    ///
    /// # Errors
    ///
    /// See [`PaymentClient::create_method_validation`].
    pub async fn get_one_method_validation(
        &self,
        options: CallOptions<'_>,
    ) -> Result<MethodValidation, ClientError> {
        Ok(self.first_validation(options).await?.1)
    }

    /// Lists an account's payments, keyed by payment id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or the body is not a
    /// payment listing.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "rax.payment.list_payments", skip(self), err)
    )]
    pub async fn list_payments(
        &self,
        options: CallOptions<'_>,
    ) -> Result<Arc<Listing<Payment>>, ClientError> {
        let path = self.account_path(&options, "payments");
        let fetch = self
            .resources
            .list(&path, "GET /v1/accounts/{ran}/payments", options.response);
        self.cache
            .payments
            .get_or_try_insert(options.signature(path.clone()), fetch)
            .await
    }

    /// Submits a payment against the account.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or the response does not
    /// describe a payment.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "rax.payment.create_payment", skip_all, err)
    )]
    pub async fn create_payment(
        &self,
        payment: &Payment,
        options: CallOptions<'_>,
    ) -> Result<Payment, ClientError> {
        let path = self.account_path(&options, "payments");
        let created = self
            .resources
            .create(
                &path,
                "POST /v1/accounts/{ran}/payments",
                payment,
                options.request,
                options.response,
            )
            .await?;
        invalidate_path(&self.cache.payments, &path).await;
        Ok(created)
    }

    /// Id of the first listed payment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EmptyListing`] if the account has none.
    pub async fn get_one_payment_id(
        &self,
        options: CallOptions<'_>,
    ) -> Result<String, ClientError> {
        Ok(first_entry(&*self.list_payments(options).await?)?.0)
    }

    /// The first listed payment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EmptyListing`] if the account has none.
    pub async fn get_one_payment(&self, options: CallOptions<'_>) -> Result<Payment, ClientError> {
        Ok(first_entry(&*self.list_payments(options).await?)?.1)
    }

    /// Lists the voids of one payment, keyed by void id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or the body is not a
    /// void listing.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "rax.payment.list_voids", skip(self), err)
    )]
    pub async fn list_voids(
        &self,
        payment_id: &str,
        options: CallOptions<'_>,
    ) -> Result<Arc<Listing<Void>>, ClientError> {
        let path = format!("/v1/payments/{payment_id}/voids");
        let fetch = self
            .resources
            .list(&path, "GET /v1/payments/{id}/voids", options.response);
        self.cache
            .voids
            .get_or_try_insert(options.signature(path.clone()), fetch)
            .await
    }

    /// Voids (part of) a payment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or the response does not
    /// describe a void.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "rax.payment.create_void", skip(self, void), err)
    )]
    pub async fn create_void(
        &self,
        payment_id: &str,
        void: &Void,
        options: CallOptions<'_>,
    ) -> Result<Void, ClientError> {
        let path = format!("/v1/payments/{payment_id}/voids");
        let created = self
            .resources
            .create(
                &path,
                "POST /v1/payments/{id}/voids",
                void,
                options.request,
                options.response,
            )
            .await?;
        invalidate_path(&self.cache.voids, &path).await;
        Ok(created)
    }

    /// Id of the first void of the account's first payment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EmptyListing`] if there is no payment or no
    /// void.
    pub async fn get_one_void_id(&self, options: CallOptions<'_>) -> Result<String, ClientError> {
        let payment_id = self.get_one_payment_id(options).await?;
        Ok(first_entry(&*self.list_voids(&payment_id, options).await?)?.0)
    }

    /// The first void of the account's first payment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EmptyListing`] if there is no payment or no
    /// void.
    pub async fn get_one_void(&self, options: CallOptions<'_>) -> Result<Void, ClientError> {
        let payment_id = self.get_one_payment_id(options).await?;
        Ok(first_entry(&*self.list_voids(&payment_id, options).await?)?.1)
    }

    /// Lists an account's refunds, keyed by refund id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or the body is not a
    /// refund listing.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "rax.payment.list_refunds", skip(self), err)
    )]
    pub async fn list_refunds(
        &self,
        options: CallOptions<'_>,
    ) -> Result<Arc<Listing<Refund>>, ClientError> {
        let path = self.account_path(&options, "refunds");
        let fetch = self
            .resources
            .list(&path, "GET /v1/accounts/{ran}/refunds", options.response);
        self.cache
            .refunds
            .get_or_try_insert(options.signature(path.clone()), fetch)
            .await
    }

    /// Refunds (part of) a payment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or the response does not
    /// describe a refund.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "rax.payment.create_refund", skip_all, err)
    )]
    pub async fn create_refund(
        &self,
        refund: &Refund,
        options: CallOptions<'_>,
    ) -> Result<Refund, ClientError> {
        let path = self.account_path(&options, "refunds");
        let created = self
            .resources
            .create(
                &path,
                "POST /v1/accounts/{ran}/refunds",
                refund,
                options.request,
                options.response,
            )
            .await?;
        invalidate_path(&self.cache.refunds, &path).await;
        Ok(created)
    }

    /// Id of the first listed refund.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EmptyListing`] if the account has none.
    pub async fn get_one_refund_id(&self, options: CallOptions<'_>) -> Result<String, ClientError> {
        Ok(first_entry(&*self.list_refunds(options).await?)?.0)
    }

    /// The first listed refund.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EmptyListing`] if the account has none.
    pub async fn get_one_refund(&self, options: CallOptions<'_>) -> Result<Refund, ClientError> {
        Ok(first_entry(&*self.list_refunds(options).await?)?.1)
    }
}

/// Drops every memoized listing of `path`, whatever its formats.
async fn invalidate_path<T>(cache: &ListingCache<T>, path: &str) {
    for request in FORMATS {
        for response in FORMATS {
            cache
                .invalidate(&CallSignature::new(path, request, response))
                .await;
        }
    }
}
