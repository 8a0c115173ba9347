//! Santander bank-slip management (collection_bill_management v2)
//!
//! REST + JSON behind mutual TLS: every request, including the OAuth
//! client-credentials exchange, presents the client certificate. Requests
//! are scoped to a workspace id.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::certificate::Certificate;
use crate::config::SantanderConfig;
use crate::entity::{Beneficiary, Discount, Interest, Payer, Penalty};
use crate::resolver::{checksum_code, ErrorTable};
use crate::service::{build_client_with_identity, Bank, BoletoService};
use crate::token_cache::{token_key, TokenCache};
use crate::{helper, Error, Result};

/// PIX dictionary key types the bank accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixKeyKind {
    /// Beneficiary CPF
    Cpf,
    /// Beneficiary CNPJ
    Cnpj,
    /// E-mail address
    Email,
    /// Mobile phone
    Mobile,
    /// Random 36-character key
    Evp,
}

impl PixKeyKind {
    fn as_str(&self) -> &'static str {
        match self {
            PixKeyKind::Cpf => "CPF",
            PixKeyKind::Cnpj => "CNPJ",
            PixKeyKind::Email => "EMAIL",
            PixKeyKind::Mobile => "CELULAR",
            PixKeyKind::Evp => "EVP",
        }
    }
}

/// Classify a PIX dictionary key the way the bank expects it declared.
///
/// Document-shaped keys must match the beneficiary document exactly; a
/// 36-character value is a random (EVP) key; anything else must look like
/// an e-mail or a Brazilian mobile number.
pub fn detect_pix_key(key: &str, beneficiary_document: &str) -> Result<PixKeyKind> {
    if key.len() == 11 && key == beneficiary_document {
        return Ok(PixKeyKind::Cpf);
    }
    if key.len() == 14 && key == beneficiary_document {
        return Ok(PixKeyKind::Cnpj);
    }
    let email =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_err(|e| Error::Encoding(e.to_string()))?;
    if email.is_match(key) {
        return Ok(PixKeyKind::Email);
    }
    let mobile = Regex::new(r"^\(?\d{2}\)?\s?\d{4,5}-?\d{4}$")
        .map_err(|e| Error::Encoding(e.to_string()))?;
    if mobile.is_match(key) {
        return Ok(PixKeyKind::Mobile);
    }
    if key.chars().count() == 36 {
        return Ok(PixKeyKind::Evp);
    }
    Err(Error::InvalidField {
        field: "pix_key",
        reason: "not a CPF/CNPJ/e-mail/mobile/EVP key".to_string(),
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PayerPayload {
    name: String,
    document_type: String,
    document_number: String,
    address: String,
    neighborhood: String,
    city: String,
    state: String,
    zip_code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct BeneficiaryPayload {
    name: String,
    document_type: String,
    document_number: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyPayload {
    #[serde(rename = "type")]
    kind: String,
    dict_key: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiscountTier {
    value: String,
    limit_date: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiscountPayload {
    #[serde(rename = "type")]
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    discount_one: Option<DiscountTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    discount_two: Option<DiscountTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    discount_three: Option<DiscountTier>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    environment: String,
    nsu_code: String,
    nsu_date: String,
    covenant_code: String,
    client_number: String,
    due_date: String,
    issue_date: String,
    nominal_value: String,
    bank_number: String,
    payment_type: String,
    write_off_quantity_days: i64,
    payer: PayerPayload,
    beneficiary: BeneficiaryPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<KeyPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    discount: Option<DiscountPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fine_percentage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fine_quantity_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interest_percentage: Option<String>,
    document_kind: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteOffRequest {
    covenant_code: String,
    bank_number: String,
    operation: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterResponse {
    digitable_line: String,
    bar_code: String,
    #[serde(default)]
    qr_code_pix: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    bank_slip_data: QueryBankSlip,
    #[serde(default)]
    qr_code_data: Option<QueryQrCode>,
    payer_data: QueryPayer,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryBankSlip {
    bar_code: String,
    digitable_line: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryQrCode {
    qr_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryPayer {
    payer_name: String,
    payer_document_number: String,
    #[serde(default)]
    payer_address: String,
    #[serde(default)]
    payer_neighborhood: String,
    #[serde(default)]
    payer_county: String,
    #[serde(default)]
    payer_state_abbreviation: String,
    #[serde(default)]
    payer_zip_code: String,
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    #[serde(rename = "_code")]
    code: String,
    #[serde(rename = "_message")]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(rename = "_errors", default)]
    errors: Vec<ErrorItem>,
    #[serde(rename = "statusHttp", default)]
    status_http: Option<u16>,
    #[serde(rename = "errorMessage", default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Santander bank-slip service
pub struct SantanderService {
    due_date: Option<NaiveDate>,
    issue_date: Option<NaiveDate>,
    amount: Option<Decimal>,
    nosso_numero: Option<String>,
    agency: Option<String>,
    covenant: Option<String>,
    workspace_id: Option<String>,
    pix_key: Option<String>,
    payer: Option<Payer>,
    beneficiary: Option<Beneficiary>,
    certificate: Option<Certificate>,
    interest: Option<Interest>,
    penalty: Option<Penalty>,
    discounts: Vec<Discount>,
    write_off_days: i64,
    pix: bool,
    sandbox: bool,
    client_id: Option<String>,
    client_secret: Option<String>,
    cache: Arc<dyn TokenCache>,
    config: SantanderConfig,
    table: ErrorTable,
    digitable_line: Option<String>,
    barcode: Option<String>,
    pix_qr_code: Option<String>,
    payer_snapshot: Option<Payer>,
}

impl SantanderService {
    /// New service using the given token cache
    pub fn new(cache: Arc<dyn TokenCache>) -> Self {
        SantanderService {
            due_date: None,
            issue_date: None,
            amount: None,
            nosso_numero: None,
            agency: None,
            covenant: None,
            workspace_id: None,
            pix_key: None,
            payer: None,
            beneficiary: None,
            certificate: None,
            interest: None,
            penalty: None,
            discounts: Vec::new(),
            write_off_days: 0,
            pix: false,
            sandbox: false,
            client_id: None,
            client_secret: None,
            cache,
            config: SantanderConfig::default(),
            table: ErrorTable::new(super::bradesco::ERROR_TABLE),
            digitable_line: None,
            barcode: None,
            pix_qr_code: None,
            payer_snapshot: None,
        }
    }

    /// Override endpoints/timeouts (homologation, tests)
    pub fn set_config(&mut self, config: SantanderConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// Due date
    pub fn set_due_date(&mut self, date: NaiveDate) -> &mut Self {
        self.due_date = Some(date);
        self
    }

    /// Issue date
    pub fn set_issue_date(&mut self, date: NaiveDate) -> &mut Self {
        self.issue_date = Some(date);
        self
    }

    /// Face amount
    pub fn set_amount(&mut self, amount: Decimal) -> &mut Self {
        self.amount = Some(amount);
        self
    }

    /// Beneficiary-chosen title identifier
    pub fn set_nosso_numero(&mut self, nosso_numero: impl Into<String>) -> &mut Self {
        self.nosso_numero = Some(nosso_numero.into());
        self
    }

    /// Agency number (token-cache scope)
    pub fn set_agency(&mut self, agency: impl Into<String>) -> &mut Self {
        self.agency = Some(agency.into());
        self
    }

    /// Covenant (convênio) code
    pub fn set_covenant(&mut self, covenant: impl Into<String>) -> &mut Self {
        self.covenant = Some(covenant.into());
        self
    }

    /// Workspace id the slips are managed under
    pub fn set_workspace_id(&mut self, workspace_id: impl Into<String>) -> &mut Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }

    /// PIX dictionary key for hybrid slips
    pub fn set_pix_key(&mut self, pix_key: impl Into<String>) -> &mut Self {
        self.pix_key = Some(pix_key.into());
        self
    }

    /// Payer (sacado)
    pub fn set_payer(&mut self, payer: Payer) -> &mut Self {
        self.payer = Some(payer);
        self
    }

    /// Beneficiary (cedente)
    pub fn set_beneficiary(&mut self, beneficiary: Beneficiary) -> &mut Self {
        self.beneficiary = Some(beneficiary);
        self
    }

    /// Mutual-TLS certificate
    pub fn set_certificate(&mut self, certificate: Certificate) -> &mut Self {
        self.certificate = Some(certificate);
        self
    }

    /// Late-payment interest (exempt or monthly percentage only)
    pub fn set_interest(&mut self, interest: Interest) -> &mut Self {
        self.interest = Some(interest);
        self
    }

    /// Late-payment penalty
    pub fn set_penalty(&mut self, penalty: Penalty) -> &mut Self {
        self.penalty = Some(penalty);
        self
    }

    /// Append a discount tier (fixed-amount only for this bank)
    pub fn add_discount(&mut self, discount: Discount) -> &mut Self {
        self.discounts.push(discount);
        self
    }

    /// Days after due date the title stays payable
    pub fn set_write_off_days(&mut self, days: i64) -> &mut Self {
        self.write_off_days = days;
        self
    }

    /// Request the hybrid (PIX) QR payload
    pub fn set_pix(&mut self, pix: bool) -> &mut Self {
        self.pix = pix;
        self
    }

    /// Point at the homologation environment
    pub fn set_sandbox(&mut self, sandbox: bool) -> &mut Self {
        self.sandbox = sandbox;
        self
    }

    /// OAuth client id (also sent as `X-Application-Key`)
    pub fn set_client_id(&mut self, client_id: impl Into<String>) -> &mut Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// OAuth client secret
    pub fn set_client_secret(&mut self, client_secret: impl Into<String>) -> &mut Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Digitable line populated by registration or query
    pub fn digitable_line(&self) -> Option<&str> {
        self.digitable_line.as_deref()
    }

    /// Barcode populated by registration or query
    pub fn barcode(&self) -> Option<&str> {
        self.barcode.as_deref()
    }

    /// PIX EMV payload, when the slip is hybrid
    pub fn pix_qr_code(&self) -> Option<&str> {
        self.pix_qr_code.as_deref()
    }

    /// Payer snapshot repopulated by `query`
    pub fn payer_snapshot(&self) -> Option<&Payer> {
        self.payer_snapshot.as_ref()
    }

    fn due_date(&self) -> Result<NaiveDate> {
        self.due_date.ok_or(Error::MissingField("due_date"))
    }

    fn issue_date(&self) -> Result<NaiveDate> {
        self.issue_date.ok_or(Error::MissingField("issue_date"))
    }

    fn amount(&self) -> Result<Decimal> {
        self.amount.ok_or(Error::MissingField("amount"))
    }

    fn nosso_numero(&self) -> Result<&str> {
        self.nosso_numero
            .as_deref()
            .ok_or(Error::MissingField("nosso_numero"))
    }

    fn covenant(&self) -> Result<&str> {
        self.covenant
            .as_deref()
            .ok_or(Error::MissingField("covenant"))
    }

    fn workspace_id(&self) -> Result<&str> {
        self.workspace_id
            .as_deref()
            .ok_or(Error::MissingField("workspace_id"))
    }

    fn payer(&self) -> Result<&Payer> {
        self.payer.as_ref().ok_or(Error::MissingField("payer"))
    }

    fn beneficiary(&self) -> Result<&Beneficiary> {
        self.beneficiary
            .as_ref()
            .ok_or(Error::MissingField("beneficiary"))
    }

    fn certificate(&self) -> Result<&Certificate> {
        self.certificate
            .as_ref()
            .ok_or(Error::MissingField("certificate"))
    }

    fn client_id(&self) -> Result<&str> {
        self.client_id
            .as_deref()
            .ok_or(Error::MissingField("client_id"))
    }

    fn client_secret(&self) -> Result<&str> {
        self.client_secret
            .as_deref()
            .ok_or(Error::MissingField("client_secret"))
    }

    fn client(&self) -> Result<reqwest::Client> {
        build_client_with_identity(&self.config.http, self.certificate()?.identity()?)
    }

    fn build_register_request(&self) -> Result<RegisterRequest> {
        let due = self.due_date()?;
        let payer = self.payer()?;
        let beneficiary = self.beneficiary()?;

        // deposit-style slips (payer == beneficiary) follow another product
        if payer.document() == beneficiary.document() {
            return Err(Error::business_rule(
                490,
                "Cnpj raiz do pagador nao pode ser igual ao do beneficiario final - usar bda",
                400,
            ));
        }

        let street = payer.street();
        let address = if payer.number().is_empty() {
            street.to_string()
        } else {
            format!("{street}, {}", payer.number())
        };

        let mut req = RegisterRequest {
            environment: "PRODUCAO".to_string(),
            nsu_code: self.nosso_numero()?.to_string(),
            nsu_date: Local::now().format("%Y-%m-%d").to_string(),
            covenant_code: self.covenant()?.to_string(),
            client_number: self.nosso_numero()?.to_string(),
            due_date: due.format("%Y-%m-%d").to_string(),
            issue_date: self.issue_date()?.format("%Y-%m-%d").to_string(),
            nominal_value: helper::amount_fixed(self.amount()?),
            bank_number: self.nosso_numero()?.to_string(),
            payment_type: "REGISTRO".to_string(),
            write_off_quantity_days: self.write_off_days,
            payer: PayerPayload {
                name: helper::truncate(&helper::alphanumeric(payer.name()), 40),
                document_type: payer.document_kind().to_string(),
                document_number: payer.document(),
                address: helper::truncate(&helper::alphanumeric(&address), 40),
                neighborhood: helper::alphanumeric(payer.neighborhood()),
                city: helper::truncate(&helper::alphanumeric(payer.city()), 20),
                state: helper::alphanumeric(payer.state()),
                zip_code: helper::mask(payer.postal_code(), "#####-###"),
            },
            beneficiary: BeneficiaryPayload {
                name: helper::truncate(&helper::alphanumeric(beneficiary.name()), 40),
                document_type: beneficiary.document_kind().to_string(),
                document_number: beneficiary.document(),
            },
            key: None,
            discount: None,
            fine_percentage: None,
            fine_quantity_days: None,
            interest_percentage: None,
            document_kind: "DUPLICATA_MERCANTIL".to_string(),
        };

        if self.pix {
            let key = self
                .pix_key
                .as_deref()
                .ok_or(Error::MissingField("pix_key"))?;
            let kind = detect_pix_key(key, &beneficiary.document())?;
            req.key = Some(KeyPayload {
                kind: kind.as_str().to_string(),
                dict_key: key.to_string(),
            });
        }

        if !self.discounts.is_empty() {
            if self.discounts.len() > crate::MAX_DISCOUNT_TIERS {
                return Err(Error::InvalidField {
                    field: "discounts",
                    reason: format!(
                        "{} tiers informed, bank accepts at most 3",
                        self.discounts.len()
                    ),
                });
            }
            let mut payload = DiscountPayload {
                kind: "VALOR_DATA_FIXA".to_string(),
                discount_one: None,
                discount_two: None,
                discount_three: None,
            };
            for (tier, discount) in self.discounts.iter().enumerate() {
                let Discount::FixedAmount { value, until } = discount else {
                    return Err(Error::Encoding(
                        "Santander accepts fixed-amount discounts only".to_string(),
                    ));
                };
                let entry = DiscountTier {
                    value: helper::amount_fixed(*value),
                    limit_date: until.format("%Y-%m-%d").to_string(),
                };
                match tier {
                    0 => payload.discount_one = Some(entry),
                    1 => payload.discount_two = Some(entry),
                    _ => payload.discount_three = Some(entry),
                }
            }
            req.discount = Some(payload);
        }

        if let Some(penalty) = self.penalty {
            req.fine_percentage = Some(helper::amount_fixed(penalty.rate));
            req.fine_quantity_days = Some(helper::days_since(due, penalty.from, 0));
        }

        match self.interest {
            None | Some(Interest::Exempt) => {}
            Some(Interest::Monthly { rate, .. }) => {
                req.interest_percentage = Some(helper::amount_fixed(rate));
            }
            Some(Interest::Daily { .. }) => {
                return Err(Error::Encoding(
                    "Santander accepts exempt or monthly-percentage interest only".to_string(),
                ));
            }
        }

        Ok(req)
    }

    async fn token(&self) -> Result<String> {
        let scope = self.agency.as_deref().unwrap_or_else(|| {
            self.covenant.as_deref().unwrap_or_default()
        });
        let key = token_key("santander", scope, &self.beneficiary()?.document());
        if let Some(token) = self.cache.get(&key).await {
            return Ok(token);
        }

        let client = self.client()?;
        let response = client
            .post(format!(
                "{}{}",
                self.config.base_url(self.sandbox),
                self.config.auth_path
            ))
            .form(&[
                ("client_id", self.client_id()?),
                ("client_secret", self.client_secret()?),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| Error::Auth(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!("Token request returned {status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("Token response malformed: {e}")))?;
        self.cache
            .put(&key, token.access_token.clone(), Duration::from_secs(token.expires_in))
            .await;
        Ok(token.access_token)
    }

    fn map_error(&self, status: u16, body: &str) -> Error {
        if let Ok(err) = serde_json::from_str::<ErrorResponse>(body) {
            if let Some(first) = err.errors.into_iter().next() {
                return Error::BusinessRule {
                    code: first.code,
                    message: first.message,
                    http_status: status,
                };
            }
            if err.status_http.is_some() {
                if let Some(message) = err.error_message {
                    let code = self
                        .table
                        .resolve(&message)
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| checksum_code(&message).to_string());
                    return Error::BusinessRule {
                        code,
                        message,
                        http_status: status,
                    };
                }
            }
        }
        Error::BankApi {
            status_code: status,
            message: body.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl BoletoService for SantanderService {
    fn bank(&self) -> Bank {
        Bank::Santander
    }

    #[instrument(skip(self), fields(bank = "santander"))]
    async fn register(&mut self) -> Result<()> {
        let request = self.build_register_request()?;
        let token = self.token().await?;

        info!(nosso_numero = self.nosso_numero()?, "registering bank slip");

        let client = self.client()?;
        let response = client
            .post(format!(
                "{}/collection_bill_management/v2/workspaces/{}/bank_slips",
                self.config.base_url(self.sandbox),
                self.workspace_id()?
            ))
            .header("Authorization", format!("Bearer {token}"))
            .header("X-Application-Key", self.client_id()?)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let parsed: RegisterResponse = response.json().await?;
            self.digitable_line = Some(parsed.digitable_line);
            self.barcode = Some(parsed.bar_code);
            self.pix_qr_code = parsed.qr_code_pix;
            return Ok(());
        }

        let code = status.as_u16();
        let text = response.text().await.unwrap_or_default();
        warn!(status = code, "registration rejected");
        Err(self.map_error(code, &text))
    }

    #[instrument(skip(self), fields(bank = "santander"))]
    async fn settle(&mut self) -> Result<()> {
        let token = self.token().await?;
        let request = WriteOffRequest {
            covenant_code: self.covenant()?.to_string(),
            bank_number: self.nosso_numero()?.to_string(),
            operation: "BAIXAR".to_string(),
        };

        let client = self.client()?;
        let response = client
            .patch(format!(
                "{}/collection_bill_management/v2/workspaces/{}/bank_slips",
                self.config.base_url(self.sandbox),
                self.workspace_id()?
            ))
            .header("Authorization", format!("Bearer {token}"))
            .header("X-Application-Key", self.client_id()?)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let code = status.as_u16();
        let text = response.text().await.unwrap_or_default();
        Err(self.map_error(code, &text))
    }

    #[instrument(skip(self), fields(bank = "santander"))]
    async fn query(&mut self) -> Result<()> {
        let token = self.token().await?;

        let client = self.client()?;
        let response = client
            .get(format!(
                "{}/collection_bill_management/v2/bills/{}.{}?tipoConsulta=bankslip",
                self.config.base_url(self.sandbox),
                self.covenant()?,
                self.nosso_numero()?
            ))
            .header("Authorization", format!("Bearer {token}"))
            .header("X-Application-Key", self.client_id()?)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let parsed: QueryResponse = response.json().await?;
            self.barcode = Some(parsed.bank_slip_data.bar_code);
            self.digitable_line = Some(parsed.bank_slip_data.digitable_line);
            self.pix_qr_code = parsed.qr_code_data.map(|qr| qr.qr_code);
            self.payer_snapshot = Some(
                Payer::new(parsed.payer_data.payer_name, parsed.payer_data.payer_document_number)
                    .with_address(
                        parsed.payer_data.payer_address,
                        "",
                        "",
                        parsed.payer_data.payer_neighborhood,
                        parsed.payer_data.payer_county,
                        parsed.payer_data.payer_state_abbreviation,
                        parsed.payer_data.payer_zip_code,
                    ),
            );
            return Ok(());
        }

        let code = status.as_u16();
        let text = response.text().await.unwrap_or_default();
        Err(self.map_error(code, &text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_cache::InMemoryTokenCache;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service() -> SantanderService {
        let mut svc = SantanderService::new(Arc::new(InMemoryTokenCache::new()));
        svc.set_due_date(date(2024, 11, 30))
            .set_issue_date(date(2024, 11, 1))
            .set_amount(dec!(100))
            .set_nosso_numero("123456")
            .set_covenant("445566")
            .set_workspace_id("ws-1")
            .set_payer(
                Payer::new("Fulano da Silva", "62344900187").with_address(
                    "Rua Antenor Guirlanda",
                    "15",
                    "",
                    "Casa Verde",
                    "São Paulo",
                    "SP",
                    "02514010",
                ),
            )
            .set_beneficiary(Beneficiary::new("Empresa Ltda", "68542653101838"));
        svc
    }

    #[test]
    fn test_pix_key_detection() {
        let doc_cpf = "62344900187";
        let doc_cnpj = "68542653101838";
        assert_eq!(detect_pix_key(doc_cpf, doc_cpf).unwrap(), PixKeyKind::Cpf);
        assert_eq!(detect_pix_key(doc_cnpj, doc_cnpj).unwrap(), PixKeyKind::Cnpj);
        assert_eq!(
            detect_pix_key("financeiro@empresa.com.br", doc_cnpj).unwrap(),
            PixKeyKind::Email
        );
        assert_eq!(
            detect_pix_key("(11) 98765-4321", doc_cnpj).unwrap(),
            PixKeyKind::Mobile
        );
        assert_eq!(
            detect_pix_key("123e4567-e89b-12d3-a456-426614174000", doc_cnpj).unwrap(),
            PixKeyKind::Evp
        );
        // an 11-digit key that is not the beneficiary document is invalid
        assert!(detect_pix_key("99999999999", doc_cnpj).is_err());
        assert!(detect_pix_key("not a key", doc_cnpj).is_err());
    }

    #[test]
    fn test_register_request_shape() {
        let req = service().build_register_request().unwrap();
        assert_eq!(req.nominal_value, "100.00");
        assert_eq!(req.due_date, "2024-11-30");
        assert_eq!(req.payer.zip_code, "02514-010");
        assert_eq!(req.payer.address, "Rua Antenor Guirlanda 15");
        assert_eq!(req.payer.document_type, "CPF");
        assert_eq!(req.beneficiary.document_type, "CNPJ");
        assert_eq!(req.document_kind, "DUPLICATA_MERCANTIL");
        assert!(req.key.is_none());
    }

    #[test]
    fn test_discount_tiers_fixed_amount_only() {
        let mut svc = service();
        svc.add_discount(Discount::FixedAmount {
            value: dec!(3),
            until: date(2024, 11, 27),
        })
        .add_discount(Discount::FixedAmount {
            value: dec!(2),
            until: date(2024, 11, 28),
        });
        let req = svc.build_register_request().unwrap();
        let discount = req.discount.unwrap();
        assert_eq!(discount.kind, "VALOR_DATA_FIXA");
        assert_eq!(discount.discount_one.unwrap().value, "3.00");
        assert_eq!(discount.discount_two.unwrap().limit_date, "2024-11-28");
        assert!(discount.discount_three.is_none());

        let mut svc = service();
        svc.add_discount(Discount::Percentage {
            rate: dec!(1),
            until: date(2024, 11, 27),
        });
        assert!(matches!(
            svc.build_register_request(),
            Err(Error::Encoding(_))
        ));
    }

    #[test]
    fn test_penalty_days_floor_is_zero() {
        let mut svc = service();
        svc.set_penalty(Penalty::new(dec!(2), date(2024, 11, 30)));
        let req = svc.build_register_request().unwrap();
        assert_eq!(req.fine_percentage.as_deref(), Some("2.00"));
        assert_eq!(req.fine_quantity_days, Some(0));
    }

    #[test]
    fn test_daily_interest_is_an_encoding_error() {
        let mut svc = service();
        svc.set_interest(Interest::Daily {
            value: dec!(1),
            from: date(2024, 11, 30),
        });
        assert!(matches!(
            svc.build_register_request(),
            Err(Error::Encoding(_))
        ));

        let mut svc = service();
        svc.set_interest(Interest::Monthly {
            rate: dec!(2),
            from: date(2024, 11, 30),
        });
        let req = svc.build_register_request().unwrap();
        assert_eq!(req.interest_percentage.as_deref(), Some("2.00"));
    }

    #[test]
    fn test_payer_equal_beneficiary_rejected() {
        let mut svc = service();
        svc.set_beneficiary(Beneficiary::new("Fulano da Silva", "62344900187"));
        match svc.build_register_request() {
            Err(Error::BusinessRule { code, http_status, .. }) => {
                assert_eq!(code, "490");
                assert_eq!(http_status, 400);
            }
            other => panic!("expected business-rule error, got {other:?}"),
        }
    }

    #[test]
    fn test_pix_requires_key() {
        let mut svc = service();
        svc.set_pix(true);
        assert!(matches!(
            svc.build_register_request(),
            Err(Error::MissingField("pix_key"))
        ));

        let mut svc = service();
        svc.set_pix(true).set_pix_key("68542653101838");
        let req = svc.build_register_request().unwrap();
        let key = req.key.unwrap();
        assert_eq!(key.kind, "CNPJ");
        assert_eq!(key.dict_key, "68542653101838");
    }

    #[test]
    fn test_error_item_list_takes_priority() {
        let svc = service();
        let err = svc.map_error(
            422,
            r#"{"_errors":[{"_code":"005","_message":"covenant invalid"}]}"#,
        );
        match err {
            Error::BusinessRule { code, message, http_status } => {
                assert_eq!(code, "005");
                assert_eq!(message, "covenant invalid");
                assert_eq!(http_status, 422);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
