//! Banco do Brasil cobrança API (cobrancas v2)
//!
//! REST + JSON with an OAuth client-credentials grant over HTTP basic
//! auth. Two client modes survive from the legacy split: the `API` mode
//! (full scope, write-off available) and the older `WEBSERVICE`
//! registration-only scope.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::BancoBrasilConfig;
use crate::entity::{Beneficiary, Discount, DocumentKind, Interest, Payer, Penalty};
use crate::service::{build_client, Bank, BoletoService};
use crate::token_cache::{token_key, TokenCache};
use crate::{helper, Error, Result};

/// Which of the two historical integration modes the credentials belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMode {
    /// Current API credentials: full scope, write-off available
    Api,
    /// Legacy webservice credentials: registration scope only
    Webservice,
}

impl ClientMode {
    fn scope(&self) -> &'static str {
        match self {
            ClientMode::Api => "cobrancas.boletos-requisicao cobrancas.boletos-info",
            ClientMode::Webservice => "cobranca.registro-boletos",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[allow(non_snake_case)]
struct DiscountPayload {
    tipo: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    valor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    porcentagem: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dataExpiracao: Option<String>,
}

impl DiscountPayload {
    fn none() -> Self {
        DiscountPayload {
            tipo: 0,
            valor: None,
            porcentagem: None,
            dataExpiracao: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[allow(non_snake_case)]
struct InterestPayload {
    tipo: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    porcentagem: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[allow(non_snake_case)]
struct PenaltyPayload {
    tipo: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    porcentagem: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[allow(non_snake_case)]
struct PayerPayload {
    tipoInscricao: u8,
    numeroInscricao: u64,
    nome: String,
    endereco: String,
    cep: String,
    cidade: String,
    bairro: String,
    uf: String,
    telefone: String,
}

#[derive(Debug, Clone, Serialize)]
#[allow(non_snake_case)]
struct FinalBeneficiaryPayload {
    tipoInscricao: u8,
    numeroInscricao: u64,
    nome: String,
}

#[derive(Debug, Clone, Serialize)]
#[allow(non_snake_case)]
struct RegisterRequest {
    numeroConvenio: String,
    numeroCarteira: String,
    numeroVariacaoCarteira: String,
    codigoModalidade: u8,
    dataEmissao: String,
    dataVencimento: String,
    valorOriginal: f64,
    valorAbatimento: u8,
    quantidadeDiasProtesto: u8,
    quantidadeDiasNegativacao: u8,
    orgaoNegativador: u8,
    indicadorAceiteTituloVencido: String,
    numeroDiasLimiteRecebimento: i64,
    codigoAceite: String,
    codigoTipoTitulo: u8,
    descricaoTipoTitulo: String,
    indicadorPermissaoRecebimentoParcial: String,
    numeroTituloBeneficiario: String,
    campoUtilizacaoBeneficiario: String,
    numeroTituloCliente: String,
    mensagemBloquetoOcorrencia: String,
    desconto: DiscountPayload,
    segundoDesconto: DiscountPayload,
    terceiroDesconto: DiscountPayload,
    jurosMora: InterestPayload,
    multa: PenaltyPayload,
    pagador: PayerPayload,
    beneficiarioFinal: FinalBeneficiaryPayload,
    indicadorPix: String,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RegisterResponse {
    codigoBarraNumerico: String,
    linhaDigitavel: String,
    #[serde(default)]
    qrCode: Option<QrCodePayload>,
}

#[derive(Debug, Deserialize)]
struct QrCodePayload {
    #[serde(default)]
    emv: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorPt {
    codigo: serde_json::Value,
    mensagem: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEn {
    code: serde_json::Value,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    erros: Vec<ApiErrorPt>,
    #[serde(default)]
    errors: Vec<ApiErrorEn>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

fn value_to_code(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Banco do Brasil boleto service
pub struct BancoBrasilService {
    due_date: Option<NaiveDate>,
    issue_date: Option<NaiveDate>,
    amount: Option<Decimal>,
    covenant: Option<String>,
    carteira: Option<String>,
    carteira_variation: Option<String>,
    nosso_numero: Option<String>,
    payer: Option<Payer>,
    beneficiary: Option<Beneficiary>,
    interest: Option<Interest>,
    penalty: Option<Penalty>,
    discounts: Vec<Discount>,
    write_off_days: i64,
    pix: bool,
    sandbox: bool,
    mode: ClientMode,
    client_id: Option<String>,
    client_secret: Option<String>,
    app_key: Option<String>,
    cache: Arc<dyn TokenCache>,
    config: BancoBrasilConfig,
    digitable_line: Option<String>,
    barcode: Option<String>,
    pix_qr_code: Option<String>,
}

impl BancoBrasilService {
    /// New service using the given token cache
    pub fn new(cache: Arc<dyn TokenCache>) -> Self {
        BancoBrasilService {
            due_date: None,
            issue_date: None,
            amount: None,
            covenant: None,
            carteira: None,
            carteira_variation: None,
            nosso_numero: None,
            payer: None,
            beneficiary: None,
            interest: None,
            penalty: None,
            discounts: Vec::new(),
            write_off_days: 0,
            pix: true,
            sandbox: false,
            mode: ClientMode::Webservice,
            client_id: None,
            client_secret: None,
            app_key: None,
            cache,
            config: BancoBrasilConfig::default(),
            digitable_line: None,
            barcode: None,
            pix_qr_code: None,
        }
    }

    /// Override endpoints/timeouts (homologation, tests)
    pub fn set_config(&mut self, config: BancoBrasilConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// Due date
    pub fn set_due_date(&mut self, date: NaiveDate) -> &mut Self {
        self.due_date = Some(date);
        self
    }

    /// Issue date (defaults to today)
    pub fn set_issue_date(&mut self, date: NaiveDate) -> &mut Self {
        self.issue_date = Some(date);
        self
    }

    /// Face amount
    pub fn set_amount(&mut self, amount: Decimal) -> &mut Self {
        self.amount = Some(amount);
        self
    }

    /// Covenant (convênio) number
    pub fn set_covenant(&mut self, covenant: impl Into<String>) -> &mut Self {
        self.covenant = Some(covenant.into());
        self
    }

    /// Carteira (portfolio) number
    pub fn set_carteira(&mut self, carteira: impl Into<String>) -> &mut Self {
        self.carteira = Some(carteira.into());
        self
    }

    /// Carteira variation number
    pub fn set_carteira_variation(&mut self, variation: impl Into<String>) -> &mut Self {
        self.carteira_variation = Some(variation.into());
        self
    }

    /// Beneficiary-chosen title identifier
    pub fn set_nosso_numero(&mut self, nosso_numero: impl Into<String>) -> &mut Self {
        self.nosso_numero = Some(nosso_numero.into());
        self
    }

    /// Payer (sacado)
    pub fn set_payer(&mut self, payer: Payer) -> &mut Self {
        self.payer = Some(payer);
        self
    }

    /// Final beneficiary
    pub fn set_beneficiary(&mut self, beneficiary: Beneficiary) -> &mut Self {
        self.beneficiary = Some(beneficiary);
        self
    }

    /// Late-payment interest
    pub fn set_interest(&mut self, interest: Interest) -> &mut Self {
        self.interest = Some(interest);
        self
    }

    /// Late-payment penalty
    pub fn set_penalty(&mut self, penalty: Penalty) -> &mut Self {
        self.penalty = Some(penalty);
        self
    }

    /// Append a discount tier (position selects the payload slot)
    pub fn add_discount(&mut self, discount: Discount) -> &mut Self {
        self.discounts.push(discount);
        self
    }

    /// Days after due date the title is still accepted
    pub fn set_write_off_days(&mut self, days: i64) -> &mut Self {
        self.write_off_days = days;
        self
    }

    /// Request the PIX QR payload alongside the barcode
    pub fn set_pix(&mut self, pix: bool) -> &mut Self {
        self.pix = pix;
        self
    }

    /// Point at the homologation environment
    pub fn set_sandbox(&mut self, sandbox: bool) -> &mut Self {
        self.sandbox = sandbox;
        self
    }

    /// Select API or legacy webservice credentials
    pub fn set_mode(&mut self, mode: ClientMode) -> &mut Self {
        self.mode = mode;
        self
    }

    /// OAuth client id
    pub fn set_client_id(&mut self, client_id: impl Into<String>) -> &mut Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// OAuth client secret
    pub fn set_client_secret(&mut self, client_secret: impl Into<String>) -> &mut Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Developer application key (`gw-dev-app-key`)
    pub fn set_app_key(&mut self, app_key: impl Into<String>) -> &mut Self {
        self.app_key = Some(app_key.into());
        self
    }

    /// Digitable line populated by a successful registration
    pub fn digitable_line(&self) -> Option<&str> {
        self.digitable_line.as_deref()
    }

    /// Numeric barcode populated by a successful registration
    pub fn barcode(&self) -> Option<&str> {
        self.barcode.as_deref()
    }

    /// PIX EMV payload populated by a successful registration
    pub fn pix_qr_code(&self) -> Option<&str> {
        self.pix_qr_code.as_deref()
    }

    fn due_date(&self) -> Result<NaiveDate> {
        self.due_date.ok_or(Error::MissingField("due_date"))
    }

    fn issue_date(&self) -> NaiveDate {
        self.issue_date.unwrap_or_else(|| Local::now().date_naive())
    }

    fn amount(&self) -> Result<Decimal> {
        self.amount.ok_or(Error::MissingField("amount"))
    }

    fn covenant(&self) -> Result<&str> {
        self.covenant
            .as_deref()
            .ok_or(Error::MissingField("covenant"))
    }

    fn carteira(&self) -> Result<&str> {
        self.carteira
            .as_deref()
            .ok_or(Error::MissingField("carteira"))
    }

    fn carteira_variation(&self) -> Result<&str> {
        self.carteira_variation
            .as_deref()
            .ok_or(Error::MissingField("carteira_variation"))
    }

    fn nosso_numero(&self) -> Result<&str> {
        self.nosso_numero
            .as_deref()
            .ok_or(Error::MissingField("nosso_numero"))
    }

    fn payer(&self) -> Result<&Payer> {
        self.payer.as_ref().ok_or(Error::MissingField("payer"))
    }

    fn beneficiary(&self) -> Result<&Beneficiary> {
        self.beneficiary
            .as_ref()
            .ok_or(Error::MissingField("beneficiary"))
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

    fn app_key(&self) -> Result<&str> {
        self.app_key
            .as_deref()
            .ok_or(Error::MissingField("app_key"))
    }

    /// `000` + covenant zero-padded to 7 + title number zero-padded to 10
    fn client_title_number(&self) -> Result<String> {
        Ok(format!(
            "000{}{}",
            helper::pad_left(self.covenant()?, 7),
            helper::pad_left(self.nosso_numero()?, 10)
        ))
    }

    fn decimal_wire(value: Decimal, field: &'static str) -> Result<f64> {
        value.to_f64().ok_or(Error::InvalidField {
            field,
            reason: "not representable on the wire".to_string(),
        })
    }

    fn build_register_request(&self) -> Result<RegisterRequest> {
        if self.discounts.len() > crate::MAX_DISCOUNT_TIERS {
            return Err(Error::InvalidField {
                field: "discounts",
                reason: format!(
                    "{} tiers informed, bank accepts at most 3",
                    self.discounts.len()
                ),
            });
        }

        let payer = self.payer()?;
        let beneficiary = self.beneficiary()?;

        let mut tiers = [
            DiscountPayload::none(),
            DiscountPayload::none(),
            DiscountPayload::none(),
        ];
        for (slot, discount) in self.discounts.iter().enumerate() {
            tiers[slot] = match discount {
                Discount::FixedAmount { value, until } => DiscountPayload {
                    tipo: 1,
                    valor: Some(Self::decimal_wire(*value, "discount")?),
                    porcentagem: None,
                    dataExpiracao: Some(until.format("%d.%m.%Y").to_string()),
                },
                Discount::Percentage { rate, until } => DiscountPayload {
                    tipo: 2,
                    valor: None,
                    porcentagem: Some(Self::decimal_wire(*rate, "discount")?),
                    dataExpiracao: Some(until.format("%d.%m.%Y").to_string()),
                },
            };
        }
        let [first, second, third] = tiers;

        let interest = match self.interest {
            None | Some(Interest::Exempt) => InterestPayload {
                tipo: 0,
                data: None,
                valor: None,
                porcentagem: None,
            },
            Some(Interest::Daily { value, from }) => InterestPayload {
                tipo: 1,
                data: Some(from.format("%d.%m.%Y").to_string()),
                valor: Some(Self::decimal_wire(value, "interest")?),
                porcentagem: None,
            },
            Some(Interest::Monthly { rate, from }) => InterestPayload {
                tipo: 2,
                data: Some(from.format("%d.%m.%Y").to_string()),
                valor: None,
                porcentagem: Some(Self::decimal_wire(rate, "interest")?),
            },
        };

        let penalty = match self.penalty {
            None => PenaltyPayload {
                tipo: 0,
                porcentagem: None,
                data: None,
            },
            Some(p) => PenaltyPayload {
                tipo: 2,
                porcentagem: Some(Self::decimal_wire(p.rate, "penalty")?),
                data: Some(p.from.format("%d.%m.%Y").to_string()),
            },
        };

        let (payer_payload, beneficiary_payload) = if self.sandbox {
            // homologation only accepts the bank's fixture parties
            (
                PayerPayload {
                    tipoInscricao: 2,
                    numeroInscricao: 74910037000193,
                    nome: "TECIDOS FARIA DUARTE".to_string(),
                    endereco: format!("{} {}", payer.street(), payer.number()),
                    cep: helper::digits(payer.postal_code()),
                    cidade: payer.city().to_string(),
                    bairro: payer.neighborhood().to_string(),
                    uf: payer.state().to_string(),
                    telefone: payer.phone().to_string(),
                },
                FinalBeneficiaryPayload {
                    tipoInscricao: 1,
                    numeroInscricao: 66779051870,
                    nome: "Dirceu Borboleta".to_string(),
                },
            )
        } else {
            (
                PayerPayload {
                    tipoInscricao: match payer.document_kind() {
                        DocumentKind::Cpf => 1,
                        DocumentKind::Cnpj => 2,
                    },
                    numeroInscricao: payer.document().parse().unwrap_or(0),
                    nome: payer.name().to_string(),
                    endereco: format!("{} {}", payer.street(), payer.number()),
                    cep: helper::digits(payer.postal_code()),
                    cidade: payer.city().to_string(),
                    bairro: payer.neighborhood().to_string(),
                    uf: payer.state().to_string(),
                    telefone: payer.phone().to_string(),
                },
                FinalBeneficiaryPayload {
                    tipoInscricao: match beneficiary.document_kind() {
                        DocumentKind::Cpf => 1,
                        DocumentKind::Cnpj => 2,
                    },
                    numeroInscricao: beneficiary.document().parse().unwrap_or(0),
                    nome: beneficiary.name().to_string(),
                },
            )
        };

        Ok(RegisterRequest {
            numeroConvenio: self.covenant()?.to_string(),
            numeroCarteira: self.carteira()?.to_string(),
            numeroVariacaoCarteira: self.carteira_variation()?.to_string(),
            codigoModalidade: 0,
            dataEmissao: self.issue_date().format("%d.%m.%Y").to_string(),
            dataVencimento: self.due_date()?.format("%d.%m.%Y").to_string(),
            valorOriginal: Self::decimal_wire(self.amount()?, "amount")?,
            valorAbatimento: 0,
            quantidadeDiasProtesto: 0,
            quantidadeDiasNegativacao: 0,
            orgaoNegativador: 0,
            indicadorAceiteTituloVencido: if self.write_off_days > 0 { "S" } else { "N" }
                .to_string(),
            numeroDiasLimiteRecebimento: self.write_off_days,
            codigoAceite: "N".to_string(),
            codigoTipoTitulo: 0,
            descricaoTipoTitulo: String::new(),
            indicadorPermissaoRecebimentoParcial: "N".to_string(),
            numeroTituloBeneficiario: self.nosso_numero()?.to_string(),
            campoUtilizacaoBeneficiario: String::new(),
            numeroTituloCliente: self.client_title_number()?,
            mensagemBloquetoOcorrencia: String::new(),
            desconto: first,
            segundoDesconto: second,
            terceiroDesconto: third,
            jurosMora: interest,
            multa: penalty,
            pagador: payer_payload,
            beneficiarioFinal: beneficiary_payload,
            indicadorPix: if self.pix { "S" } else { "N" }.to_string(),
        })
    }

    async fn token(&self) -> Result<String> {
        let key = token_key("banco-do-brasil", self.covenant()?, "");
        if let Some(token) = self.cache.get(&key).await {
            return Ok(token);
        }

        let client = build_client(&self.config.http)?;
        let response = client
            .post(self.config.auth_url(self.sandbox))
            .basic_auth(self.client_id()?, Some(self.client_secret()?))
            .header("Cache-Control", "no-cache")
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", self.mode.scope()),
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

    fn map_error(status: u16, body: &str) -> Error {
        if let Ok(err) = serde_json::from_str::<ErrorResponse>(body) {
            if let Some(first) = err.erros.into_iter().next() {
                return Error::BusinessRule {
                    code: value_to_code(first.codigo),
                    message: first.mensagem,
                    http_status: status,
                };
            }
            if let Some(first) = err.errors.into_iter().next() {
                return Error::BusinessRule {
                    code: value_to_code(first.code),
                    message: first.message,
                    http_status: status,
                };
            }
        }
        Error::BankApi {
            status_code: status,
            message: body.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl BoletoService for BancoBrasilService {
    fn bank(&self) -> Bank {
        Bank::BancoBrasil
    }

    #[instrument(skip(self), fields(bank = "banco-do-brasil"))]
    async fn register(&mut self) -> Result<()> {
        let request = self.build_register_request()?;
        let token = self.token().await?;

        info!(nosso_numero = self.nosso_numero()?, "registering boleto");

        let client = build_client(&self.config.http)?;
        let response = client
            .post(format!(
                "{}/cobrancas/v2/boletos?gw-dev-app-key={}",
                self.config.base_url(self.sandbox),
                self.app_key()?
            ))
            .header("Authorization", format!("Bearer {token}"))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let parsed: RegisterResponse = response.json().await?;
            self.barcode = Some(parsed.codigoBarraNumerico);
            self.digitable_line = Some(parsed.linhaDigitavel);
            self.pix_qr_code = parsed.qrCode.and_then(|qr| qr.emv);
            return Ok(());
        }

        let code = status.as_u16();
        let text = response.text().await.unwrap_or_default();
        warn!(status = code, "registration rejected");
        Err(Self::map_error(code, &text))
    }

    #[instrument(skip(self), fields(bank = "banco-do-brasil"))]
    async fn settle(&mut self) -> Result<()> {
        if self.mode != ClientMode::Api {
            return Err(Error::Unsupported(
                "write-off is only available with API-mode credentials",
            ));
        }

        let token = self.token().await?;
        let id = format!("000{}{}", self.covenant()?, self.nosso_numero()?);

        let client = build_client(&self.config.http)?;
        let response = client
            .post(format!(
                "{}/cobrancas/v2/boletos/{}/baixar?gw-dev-app-key={}",
                self.config.base_url(self.sandbox),
                id,
                self.app_key()?
            ))
            .header("Authorization", format!("Bearer {token}"))
            .json(&serde_json::json!({ "numeroConvenio": self.covenant()? }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let code = status.as_u16();
        let text = response.text().await.unwrap_or_default();
        Err(Self::map_error(code, &text))
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

    fn service() -> BancoBrasilService {
        let mut svc = BancoBrasilService::new(Arc::new(InMemoryTokenCache::new()));
        svc.set_due_date(date(2024, 11, 30))
            .set_issue_date(date(2024, 11, 1))
            .set_amount(dec!(100))
            .set_nosso_numero("1234567890")
            .set_covenant("3128557")
            .set_carteira("17")
            .set_carteira_variation("35")
            .set_payer(
                Payer::new("Fulano da Silva", "62344900187").with_address(
                    "Rua Antenor Guirlanda",
                    "15",
                    "",
                    "Casa Verde",
                    "São Paulo",
                    "SP",
                    "02514-010",
                ),
            )
            .set_beneficiary(Beneficiary::new("Empresa Ltda", "68542653101838"));
        svc
    }

    #[test]
    fn test_client_title_number_widths() {
        let svc = service();
        assert_eq!(svc.client_title_number().unwrap(), "00031285571234567890");

        let mut svc = service();
        svc.set_covenant("12345").set_nosso_numero("7");
        assert_eq!(svc.client_title_number().unwrap(), "00000123450000000007");
    }

    #[test]
    fn test_register_request_core_fields() {
        let req = service().build_register_request().unwrap();
        assert_eq!(req.dataVencimento, "30.11.2024");
        assert_eq!(req.dataEmissao, "01.11.2024");
        assert_eq!(req.valorOriginal, 100.0);
        assert_eq!(req.indicadorPix, "S");
        assert_eq!(req.indicadorAceiteTituloVencido, "N");
        assert_eq!(req.pagador.tipoInscricao, 1);
        assert_eq!(req.pagador.numeroInscricao, 62344900187);
        assert_eq!(req.beneficiarioFinal.tipoInscricao, 2);
        // empty tiers still serialize with tipo 0
        assert_eq!(req.desconto.tipo, 0);
        assert_eq!(req.segundoDesconto.tipo, 0);
        assert_eq!(req.terceiroDesconto.tipo, 0);
        assert_eq!(req.jurosMora.tipo, 0);
        assert_eq!(req.multa.tipo, 0);
    }

    #[test]
    fn test_discount_interest_penalty_enum_codes() {
        let mut svc = service();
        svc.set_interest(Interest::Monthly {
            rate: dec!(2),
            from: date(2024, 11, 30),
        })
        .set_penalty(Penalty::new(dec!(2), date(2024, 11, 30)))
        .add_discount(Discount::FixedAmount {
            value: dec!(3),
            until: date(2024, 11, 27),
        })
        .add_discount(Discount::Percentage {
            rate: dec!(1.5),
            until: date(2024, 11, 28),
        })
        .add_discount(Discount::FixedAmount {
            value: dec!(1),
            until: date(2024, 11, 29),
        });

        let req = svc.build_register_request().unwrap();
        assert_eq!(req.desconto.tipo, 1);
        assert_eq!(req.desconto.valor, Some(3.0));
        assert_eq!(req.desconto.dataExpiracao.as_deref(), Some("27.11.2024"));
        assert_eq!(req.segundoDesconto.tipo, 2);
        assert_eq!(req.segundoDesconto.porcentagem, Some(1.5));
        assert_eq!(req.terceiroDesconto.tipo, 1);
        assert_eq!(req.terceiroDesconto.dataExpiracao.as_deref(), Some("29.11.2024"));
        assert_eq!(req.jurosMora.tipo, 2);
        assert_eq!(req.jurosMora.porcentagem, Some(2.0));
        assert_eq!(req.multa.tipo, 2);
        assert_eq!(req.multa.data.as_deref(), Some("30.11.2024"));
    }

    #[test]
    fn test_more_than_three_discounts_fail_before_io() {
        let mut svc = service();
        for day in 25..29 {
            svc.add_discount(Discount::FixedAmount {
                value: dec!(1),
                until: date(2024, 11, day),
            });
        }
        assert!(matches!(
            svc.build_register_request(),
            Err(Error::InvalidField { field: "discounts", .. })
        ));
    }

    #[test]
    fn test_sandbox_substitutes_fixture_parties() {
        let mut svc = service();
        svc.set_sandbox(true);
        let req = svc.build_register_request().unwrap();
        assert_eq!(req.pagador.nome, "TECIDOS FARIA DUARTE");
        assert_eq!(req.pagador.numeroInscricao, 74910037000193);
        assert_eq!(req.beneficiarioFinal.nome, "Dirceu Borboleta");
    }

    #[test]
    fn test_mode_selects_scope_and_gates_write_off() {
        assert_eq!(
            ClientMode::Api.scope(),
            "cobrancas.boletos-requisicao cobrancas.boletos-info"
        );
        assert_eq!(ClientMode::Webservice.scope(), "cobranca.registro-boletos");

        let mut svc = service();
        svc.set_mode(ClientMode::Webservice);
        let err = tokio_test_block_on(svc.settle());
        assert!(matches!(err, Err(Error::Unsupported(_))));
    }

    fn tokio_test_block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime")
            .block_on(fut)
    }

    #[test]
    fn test_map_error_variants() {
        let err = BancoBrasilService::map_error(
            400,
            r#"{"erros":[{"codigo":"4874915","mensagem":"Nosso número já incluído anteriormente."}]}"#,
        );
        match err {
            Error::BusinessRule { code, .. } => assert_eq!(code, "4874915"),
            other => panic!("unexpected {other:?}"),
        }

        let err = BancoBrasilService::map_error(
            401,
            r#"{"errors":[{"code":53,"message":"invalid credentials"}]}"#,
        );
        match err {
            Error::BusinessRule { code, http_status, .. } => {
                assert_eq!(code, "53");
                assert_eq!(http_status, 401);
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(matches!(
            BancoBrasilService::map_error(502, "<html>bad gateway</html>"),
            Error::BankApi { status_code: 502, .. }
        ));
    }
}
