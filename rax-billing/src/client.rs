//! [`BillingClient`]: JSON-only access to the billing system's payment
//! methods, method validations, payments, voids and refunds.

use std::sync::Arc;

use rax_client::{
    CallSignature, ClientError, ExtensionConfig, HttpTransport, ResourceClient, SessionCache,
    TokenSource, first_entry,
};
use rax_models::{
    Format, Listing, MethodValidation, ModelError, Payment, PaymentMethod, Refund,
    ValidationRequest, Void,
};

#[cfg(feature = "telemetry")]
use tracing::instrument;

/// Client for one billing account.
///
/// Listings are memoized in the injected [`SessionCache`] until invalidated;
/// validations created through the client are recorded there too.
#[derive(Debug, Clone)]
pub struct BillingClient {
    resources: ResourceClient,
    ran: String,
    cache: Arc<SessionCache>,
}

impl BillingClient {
    /// Creates a client for account `ran` with a fresh session cache.
    #[must_use]
    pub fn new(resources: ResourceClient, ran: impl Into<String>) -> Self {
        Self {
            resources,
            ran: ran.into(),
            cache: Arc::new(SessionCache::new()),
        }
    }

    /// Builds a client from the `endpoint` and `[billing] ran` settings.
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
        Ok(Self::new(resources, config.billing_ran()?))
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

    /// Returns the account number.
    #[must_use]
    pub fn ran(&self) -> &str {
        &self.ran
    }

    /// Returns the session cache.
    #[must_use]
    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    fn methods_path(&self) -> String {
        format!("/v1/accounts/{}/methods", self.ran)
    }

    /// Lists the account's payment methods, keyed by method id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or the body is not a
    /// method listing.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "rax.billing.list_payment_methods", skip(self), fields(ran = %self.ran), err)
    )]
    pub async fn list_payment_methods(&self) -> Result<Arc<Listing<PaymentMethod>>, ClientError> {
        let path = self.methods_path();
        let fetch = self
            .resources
            .list(&path, "GET /v1/accounts/{ran}/methods", Format::Json);
        self.cache
            .methods
            .get_or_try_insert(CallSignature::json(path.clone()), fetch)
            .await
    }

    /// Id of the first listed payment method.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EmptyListing`] if the account has none.
    pub async fn get_one_method_id(&self) -> Result<String, ClientError> {
        Ok(first_entry(&*self.list_payment_methods().await?)?.0)
    }

    /// The first listed payment method.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EmptyListing`] if the account has none.
    pub async fn get_one_method(&self) -> Result<PaymentMethod, ClientError> {
        Ok(first_entry(&*self.list_payment_methods().await?)?.1)
    }

    /// Fetches one payment method.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or the body is not a
    /// payment method.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "rax.billing.get_payment_method", skip(self), err)
    )]
    pub async fn get_payment_method(&self, method_id: &str) -> Result<PaymentMethod, ClientError> {
        let path = format!("{}/{method_id}", self.methods_path());
        self.resources
            .get(&path, "GET /v1/accounts/{ran}/methods/{id}", Format::Json)
            .await
    }

    /// Creates a method validation and records it in the session cache.
    ///
    /// A request without a method validates the first listed one.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if no method is available, the request fails,
    /// or the response carries no validation id.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "rax.billing.create_method_validation", skip_all, err)
    )]
    pub async fn create_method_validation(
        &self,
        mut request: ValidationRequest,
    ) -> Result<MethodValidation, ClientError> {
        let method = match request.method.take() {
            Some(method) => method,
            None => self.get_one_method().await?,
        };
        let body = request.build(method);
        let validation: MethodValidation = self
            .resources
            .create(
                "/v1/methodValidations",
                "POST /v1/methodValidations",
                &body,
                Format::Json,
                Format::Json,
            )
            .await?;
        let id = validation
            .method_validation_id
            .clone()
            .ok_or(ModelError::MissingIdentifier("methodValidation"))?;
        self.cache.validations.record(id, validation.clone()).await;
        Ok(validation)
    }

    async fn first_validation(&self) -> Result<(String, MethodValidation), ClientError> {
        if let Some(entry) = self.cache.validations.first().await {
            return Ok(entry);
        }
        let validation = self
            .create_method_validation(ValidationRequest::new())
            .await?;
        let id = validation.method_validation_id.clone().unwrap_or_default();
        Ok((id, validation))
    }

    /// Id of the first recorded validation, creating one with the defaults
    /// when none exists.
    ///
    /// # Errors
    ///
    /// See [`BillingClient::create_method_validation`].
    pub async fn get_one_method_validation_id(&self) -> Result<String, ClientError> {
        Ok(self.first_validation().await?.0)
    }

    /// The first recorded validation, creating one with the defaults when
    /// none exists.
    ///
    /// # Errors
    ///
    /// See [`BillingClient::create_method_validation`].
    pub async fn get_one_method_validation(&self) -> Result<MethodValidation, ClientError> {
        Ok(self.first_validation().await?.1)
    }

    /// Lists the account's payments, keyed by payment id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or the body is not a
    /// payment listing.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "rax.billing.list_payments", skip(self), fields(ran = %self.ran), err)
    )]
    pub async fn list_payments(&self) -> Result<Arc<Listing<Payment>>, ClientError> {
        let path = format!("/v1/accounts/{}/payments", self.ran);
        let fetch = self
            .resources
            .list(&path, "GET /v1/accounts/{ran}/payments", Format::Json);
        self.cache
            .payments
            .get_or_try_insert(CallSignature::json(path.clone()), fetch)
            .await
    }

    /// Id of the first listed payment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EmptyListing`] if the account has none.
    pub async fn get_one_payment_id(&self) -> Result<String, ClientError> {
        Ok(first_entry(&*self.list_payments().await?)?.0)
    }

    /// The first listed payment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EmptyListing`] if the account has none.
    pub async fn get_one_payment(&self) -> Result<Payment, ClientError> {
        Ok(first_entry(&*self.list_payments().await?)?.1)
    }

    /// Lists the voids of the account's first payment, keyed by void id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EmptyListing`] if the account has no payments,
    /// or any request / body error.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "rax.billing.list_voids", skip(self), err)
    )]
    pub async fn list_voids(&self) -> Result<Arc<Listing<Void>>, ClientError> {
        let payment_id = self.get_one_payment_id().await?;
        let path = format!("/v1/payments/{payment_id}/voids");
        let fetch = self
            .resources
            .list(&path, "GET /v1/payments/{id}/voids", Format::Json);
        self.cache
            .voids
            .get_or_try_insert(CallSignature::json(path.clone()), fetch)
            .await
    }

    /// Id of the first listed void.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EmptyListing`] if there is none.
    pub async fn get_one_void_id(&self) -> Result<String, ClientError> {
        Ok(first_entry(&*self.list_voids().await?)?.0)
    }

    /// The first listed void.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EmptyListing`] if there is none.
    pub async fn get_one_void(&self) -> Result<Void, ClientError> {
        Ok(first_entry(&*self.list_voids().await?)?.1)
    }

    /// Lists the account's refunds, keyed by refund id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or the body is not a
    /// refund listing.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "rax.billing.list_refunds", skip(self), fields(ran = %self.ran), err)
    )]
    pub async fn list_refunds(&self) -> Result<Arc<Listing<Refund>>, ClientError> {
        let path = format!("/v1/accounts/{}/refunds", self.ran);
        let fetch = self
            .resources
            .list(&path, "GET /v1/accounts/{ran}/refunds", Format::Json);
        self.cache
            .refunds
            .get_or_try_insert(CallSignature::json(path.clone()), fetch)
            .await
    }

    /// Id of the first listed refund.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EmptyListing`] if the account has none.
    pub async fn get_one_refund_id(&self) -> Result<String, ClientError> {
        Ok(first_entry(&*self.list_refunds().await?)?.0)
    }

    /// The first listed refund.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EmptyListing`] if the account has none.
    pub async fn get_one_refund(&self) -> Result<Refund, ClientError> {
        Ok(first_entry(&*self.list_refunds().await?)?.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rax_client::{ReqwestTransport, StaticToken};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> BillingClient {
        let resources = ResourceClient::try_new(
            &server.uri(),
            Arc::new(ReqwestTransport::new()),
            Arc::new(StaticToken::new("tok")),
        )
        .unwrap();
        BillingClient::new(resources, "020-7")
    }

    async fn mount_methods(server: &MockServer, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/v1/accounts/020-7/methods"))
            .and(header("accept", "application/json"))
            .and(header("x-auth-token", "tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "methods": {"method": [
                    {"id": "urn:uuid:m-1", "isDefault": true, "paymentCard": {"cardNumber": "4111"}},
                    {"id": "urn:uuid:m-2", "sepa": {"iban": "DE89"}}
                ]}
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    async fn mount_payments(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/v1/accounts/020-7/payments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "payments": {"payment": [{"id": "p-1", "amount": "12.00"}]}
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_list_payment_methods_is_memoized() {
        let server = MockServer::start().await;
        mount_methods(&server, 2).await;
        let client = client(&server);

        let methods = client.list_payment_methods().await.unwrap();
        assert_eq!(methods.ids().collect::<Vec<_>>(), vec!["m-1", "m-2"]);
        assert_eq!(client.get_one_method_id().await.unwrap(), "m-1");
        assert_eq!(client.get_one_method().await.unwrap().is_default, Some(true));

        let signature = CallSignature::json("/v1/accounts/020-7/methods");
        client.cache().methods.invalidate(&signature).await;
        client.list_payment_methods().await.unwrap();
    }

    #[tokio::test]
    async fn test_get_payment_method() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/accounts/020-7/methods/m-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "method": {"id": "m-9", "electronicCheck": {"routingNumber": "111000025"}}
            })))
            .mount(&server)
            .await;

        let method = client(&server).get_payment_method("m-9").await.unwrap();
        assert_eq!(method.method_id.as_deref(), Some("m-9"));
        assert_eq!(method.kind(), rax_models::MethodKind::ElectronicCheck);
    }

    #[tokio::test]
    async fn test_create_method_validation_uses_defaults_and_records() {
        let server = MockServer::start().await;
        mount_methods(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v1/methodValidations"))
            .and(header("content-type", "application/json"))
            .and(wiremock::matchers::body_partial_json(json!({
                "papi:methodValidation": {
                    "lineOfBusiness": "US_CLOUD",
                    "contractEntity": "CONTRACT_US",
                    "currencyCode": "USD",
                    "method": {
                        "id": "m-1",
                        "addressVerificationInformation": {"postalCode": "78218"}
                    }
                }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "papi:methodValidation": {"id": "urn:uuid:v-1", "approvalStatus": "APPROVED"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        assert_eq!(client.get_one_method_validation_id().await.unwrap(), "v-1");
        let validation = client.get_one_method_validation().await.unwrap();
        assert_eq!(validation.approval_status.as_deref(), Some("APPROVED"));
        assert_eq!(client.cache().validations.len().await, 1);
    }

    #[tokio::test]
    async fn test_validation_without_id_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"papi:methodValidation": {"approvalStatus": "DECLINED"}})),
            )
            .mount(&server)
            .await;

        let request = ValidationRequest::new()
            .with_method(PaymentMethod::new(rax_models::PaymentCardMethod::default()));
        let err = client(&server)
            .create_method_validation(request)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Model(ModelError::MissingIdentifier("methodValidation"))
        ));
    }

    #[tokio::test]
    async fn test_voids_follow_first_payment() {
        let server = MockServer::start().await;
        mount_payments(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/payments/p-1/voids"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "voids": {"void": {"id": "v-1", "voidAmount": "12.00"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        assert_eq!(client.get_one_payment_id().await.unwrap(), "p-1");
        assert_eq!(client.get_one_void_id().await.unwrap(), "v-1");
        let void = client.get_one_void().await.unwrap();
        assert_eq!(void.void_amount.unwrap().to_string(), "12.00");
    }

    #[tokio::test]
    async fn test_empty_refund_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/accounts/020-7/refunds"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"refunds": {}})))
            .mount(&server)
            .await;

        let client = client(&server);
        assert!(client.list_refunds().await.unwrap().is_empty());
        assert!(matches!(
            client.get_one_refund().await,
            Err(ClientError::EmptyListing("refund"))
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/accounts/020-7/payments"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(2)
            .mount(&server)
            .await;

        let client = client(&server);
        for _ in 0..2 {
            assert!(matches!(
                client.list_payments().await,
                Err(ClientError::HttpStatus { .. })
            ));
        }
    }

    #[test]
    fn test_from_config_requires_account() {
        let config = ExtensionConfig::from_toml("endpoint = \"https://billing.example\"").unwrap();
        let err = BillingClient::from_config(
            &config,
            Arc::new(ReqwestTransport::new()),
            Arc::new(StaticToken::new("tok")),
        )
        .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }
}
