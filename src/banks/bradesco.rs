//! Bradesco hybrid boleto registration (Open API)
//!
//! REST + JSON with a JWT-bearer grant and per-request signing: every call
//! carries a detached RSA SHA-256 signature over a canonical string
//! (method, path, body, token, nonce, timestamp, algorithm) in the
//! `X-Brad-*` header family.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::certificate::Certificate;
use crate::config::BradescoConfig;
use crate::entity::{Beneficiary, Discount, DocumentKind, Interest, Payer, Penalty};
use crate::resolver::{checksum_code, ErrorTable};
use crate::service::{build_client, Bank, BoletoService};
use crate::token_cache::{token_key, TokenCache};
use crate::{boleto, helper, Error, Result};

/// Business-error strings Bradesco returns as free text, in canonical
/// order. Order is part of the resolver contract (first entry wins ties).
pub static ERROR_TABLE: &[(i32, &str)] = &[
    (-99, "Serviço indisponível no momento. Tente novamente mais tarde."),
    (-4, "Tamanho do campo inválido"),
    (-3, "Tipo do campo inválido"),
    (-2, "Contrato não encontrado"),
    (-1, "Contrato não aprovado"),
    (0, "Solicitação atendida"),
    (1, "Solicitação não encontrada"),
    (2, "Erro Genérico - sistema indisponível"),
    (5, "Inclusão efetuada"),
    (6, "Dados inconsistentes"),
    (10, "Erro Acesso Sub-rotina"),
    (12, "Cliente/Negociação Bloqueado"),
    (13, "Usuário não Autorizado"),
    (14, "Espécie Título Inválida"),
    (15, "Tipo/Número Inscrição Inválido"),
    (16, "Informe todos os campos para decurso de Prazo"),
    (17, "Nome do Pagador Especial não Informado"),
    (18, "Endereço Inválido"),
    (19, "CEP Inválido"),
    (20, "Agência Depositária Inválida"),
    (21, "Informe todos os campos para Instrução de Protesto"),
    (22, "Banco Inválido"),
    (23, "Seu Número Inválido"),
    (24, "Informe todos os campos para Abatimento"),
    (25, "Valor dos Juros maior que o Valor do Título"),
    (26, "Data de Emissão maior que a Data de Vencimento"),
    (27, "Documento do Sacador Avalista Inválido"),
    (28, "Informe todos os campos para Desconto"),
    (29, "Informe todos os campos para Sacador Avalista"),
    (30, "Data Vencimento menor ou igual Data Emissão"),
    (31, "Data Desconto menor ou igual Data Emissão"),
    (32, "Data Desconto maior que Data Vencimento"),
    (33, "Valor Desconto/Bonificação maior ou igual Valor Título"),
    (34, "Tipo informado deve ser 1, 2 ou 3"),
    (35, "Valor Abatimento maior que o Valor do Título"),
    (36, "CEP Inválido"),
    (37, "Data Emissão Inválida"),
    (38, "Data Vencimento Inválida"),
    (39, "Percentual informado maior ou igual 100,00"),
    (40, "Número CGC/CPF inválido"),
    (41, "Protesto Automático x Decurso de Prazo Incompatível"),
    (42, "Banco/Agência Depositária Inválido"),
    (43, "Espécie de Documento inválido"),
    (44, "Informe 1-Contra-apresentação ou 2-À vista"),
    (45, "Código da instrução de protesto inválido"),
    (46, "Dias para instrução de protesto inválido"),
    (47, "Código para desconto inválido"),
    (48, "Código para multa inválido"),
    (49, "Código para comissão permanência dia inválido"),
    (50, "Espécie Documento exige CGC para Sacador Avalista"),
    (51, "CEP e/ou Banco/Agência Depositária Inválido"),
    (52, "Data Emissão maior ou igual Data Vencimento"),
    (53, "Data Desconto Inválida"),
    (54, "Data emissão maior Data Registro"),
    (55, "Percentual multa informado maior que o permitido"),
    (56, "Percentual comissão permanência informado maior que o permitido"),
    (57, "Percentual Bonificação informado maior que o permitido"),
    (58, "Prazo para Protesto inválido 59 Informe a data ou tipo do vencimento"),
    (60, "Valor do IOF não permitido para produtos 05,15,43 ou 44"),
    (61, "Abatimento já cadastrado para o título"),
    (62, "Abatimento não"),
    (65, "Negociação inexistente"),
    (66, "Cliente inexistente"),
    (67, "CNPJ/CPF inválido"),
    (68, "N. Número não pode ser informado quando status 4"),
    (69, "Título já cadastrado"),
    (70, "Data e tipo de vencimento incompatíveis"),
    (71, "Data de vencimento não pode ser posterior a 10 anos"),
    (72, "Dias para instrução inferior ao padrão"),
    (73, "Dias para instrução antecipa data de protesto"),
    (74, "Valor IOF obrigatório"),
    (75, "Valor IOF incompatível com Id produto"),
    (76, "Tipo de abatimento inválido"),
    (77, "Status Inválido"),
    (78, "Registro on-line não permite Banco diferente de 237"),
    (79, "Carta para protesto não recebida"),
    (80, "Tipo de vencimento inválido"),
    (81, "Valor acumulado desconto/bonificação maior ou igual valor título"),
    (82, "Datas desconto/bonificação fora de sequência"),
    (83, "Informe todos os campos para multa"),
    (84, "Código comissão permanência inválido"),
    (85, "Informe todos os campos para comissão permanência"),
    (86, "Registro duplicado na tabela de ocorrências"),
    (87, "Solicitação de protesto já existente"),
    (88, "Registro duplicado na base de atualização sequencial"),
    (89, "Sacador avalista já cadastrado"),
    (90, "Indicador CIP inexistente"),
    (91, "Moeda negociada inexistente"),
    (92, "Banco/Agência operadora inexistente"),
    (93, "Acessório escritural negociado inexistente"),
    (94, "Polo de serviço inexistente para Banco/Agência"),
    (95, "Banco/Agência centralizadora não cadastrada para Banco/Agência depositária"),
    (96, "Título não encontrado pelo módulo CBON8230"),
    (97, "Valor IOF maior ou igual valor título"),
    (98, "Data Inválida"),
    (99, "Id Prod/Cta não cadastrados"),
];

/// Hybrid registration payload, field names exactly as the bank schema
#[derive(Debug, Clone, Serialize)]
#[allow(non_snake_case)]
struct RegisterRequest {
    ctitloCobrCdent: String,
    ctitloCliCdent: String,
    nroCpfCnpjBenef: String,
    filCpfCnpjBenef: String,
    digCpfCnpjBenef: String,
    demisTitloCobr: String,
    dvctoTitloCobr: String,
    cnegocCobr: String,
    vnmnalTitloCobr: String,
    validadeAposVencimento: i64,
    dataLimitePgt10: String,
    dataPerm10: String,
    registrarTitulo: u8,
    codUsuario: String,
    tipoAcesso: u8,
    cidtfdProdCobr: u8,
    codigoBanco: u16,
    tipoRegistro: u8,
    cidtfdTpoVcto: u8,
    cespceTitloCobr: u8,
    cindcdAceitSacdo: String,
    fase: u8,
    cindcdCobrMisto: String,
    cformaEmisPplta: u8,
    cindcdPgtoParcial: String,
    qtdePgtoParcial: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    vdiaJuroMora: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ptxJuroVcto: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    qdiaInicJuro: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pmultaAplicVcto: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    qdiaInicMulta: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dlimDescBonif1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vdescBonifPgto01: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pdescBonifPgto01: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dlimDescBonif2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vdescBonifPgto02: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pdescBonifPgto02: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dlimDescBonif3: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vdescBonifPgto03: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pdescBonifPgto03: Option<String>,
    isacdoTitloCobr: String,
    elogdrSacdoTitlo: String,
    enroLogdrSacdo: i64,
    ecomplLogdrSacdo: String,
    ccepSacdoTitlo: String,
    ccomplCepSacdo: String,
    ebairoLogdrSacdo: String,
    imunSacdoTitlo: String,
    csglUfSacdo: String,
    indCpfCnpjSacdo: u8,
    nroCpfCnpjSacdo: String,
    renderEletrSacdo: String,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RegisterResponse {
    linhaDig10: String,
    #[serde(default)]
    wqrcdPdraoMercd: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct ErrorResponse {
    #[serde(default)]
    statusHttp: Option<u16>,
    #[serde(default)]
    errorMessage: Option<String>,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    aud: String,
    sub: &'a str,
    iat: i64,
    exp: i64,
    jti: String,
    ver: &'static str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Bradesco hybrid boleto service
pub struct BradescoService {
    due_date: Option<NaiveDate>,
    issue_date: Option<NaiveDate>,
    amount: Option<Decimal>,
    nosso_numero: Option<String>,
    agency: Option<String>,
    account: Option<String>,
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
    cache: Arc<dyn TokenCache>,
    config: BradescoConfig,
    table: ErrorTable,
    digitable_line: Option<String>,
    barcode: Option<String>,
    pix_qr_code: Option<String>,
}

impl BradescoService {
    /// New service using the given token cache
    pub fn new(cache: Arc<dyn TokenCache>) -> Self {
        BradescoService {
            due_date: None,
            issue_date: None,
            amount: None,
            nosso_numero: None,
            agency: None,
            account: None,
            payer: None,
            beneficiary: None,
            certificate: None,
            interest: None,
            penalty: None,
            discounts: Vec::new(),
            write_off_days: 0,
            pix: true,
            sandbox: false,
            client_id: None,
            cache,
            config: BradescoConfig::default(),
            table: ErrorTable::new(ERROR_TABLE),
            digitable_line: None,
            barcode: None,
            pix_qr_code: None,
        }
    }

    /// Override endpoints/timeouts (homologation, tests)
    pub fn set_config(&mut self, config: BradescoConfig) -> &mut Self {
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

    /// Agency number (4 digits on the wire)
    pub fn set_agency(&mut self, agency: impl Into<String>) -> &mut Self {
        self.agency = Some(agency.into());
        self
    }

    /// Account number (14 digits on the wire)
    pub fn set_account(&mut self, account: impl Into<String>) -> &mut Self {
        self.account = Some(account.into());
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

    /// Signing/auth certificate
    pub fn set_certificate(&mut self, certificate: Certificate) -> &mut Self {
        self.certificate = Some(certificate);
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

    /// Days after due date the title stays payable via PIX
    pub fn set_write_off_days(&mut self, days: i64) -> &mut Self {
        self.write_off_days = days;
        self
    }

    /// Request the hybrid (PIX) QR payload
    pub fn set_pix(&mut self, pix: bool) -> &mut Self {
        self.pix = pix;
        self
    }

    /// Point at the homologation proxy
    pub fn set_sandbox(&mut self, sandbox: bool) -> &mut Self {
        self.sandbox = sandbox;
        self
    }

    /// API client id
    pub fn set_client_id(&mut self, client_id: impl Into<String>) -> &mut Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Digitable line populated by a successful registration
    pub fn digitable_line(&self) -> Option<&str> {
        self.digitable_line.as_deref()
    }

    /// Barcode populated by a successful registration
    pub fn barcode(&self) -> Option<&str> {
        self.barcode.as_deref()
    }

    /// PIX EMV payload populated by a successful hybrid registration
    pub fn pix_qr_code(&self) -> Option<&str> {
        self.pix_qr_code.as_deref()
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

    fn agency(&self) -> Result<&str> {
        self.agency.as_deref().ok_or(Error::MissingField("agency"))
    }

    fn account(&self) -> Result<&str> {
        self.account
            .as_deref()
            .ok_or(Error::MissingField("account"))
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

    /// Contract number: agency zero-padded to 4 + account zero-padded to 14
    fn negotiation_number(&self) -> Result<String> {
        Ok(format!(
            "{}{}",
            helper::pad_left(self.agency()?, 4),
            helper::pad_left(self.account()?, 14)
        ))
    }

    fn build_register_request(&self) -> Result<RegisterRequest> {
        let nosso_numero = self.nosso_numero()?;
        if helper::digits(nosso_numero) == "0" {
            return Err(Error::business_rule(99999, "Nosso Numero Invalido", 400));
        }
        if self.discounts.len() > crate::MAX_DISCOUNT_TIERS {
            return Err(Error::InvalidField {
                field: "discounts",
                reason: format!("{} tiers informed, bank accepts at most 3", self.discounts.len()),
            });
        }

        let due = self.due_date()?;
        let payer = self.payer()?;
        let beneficiary = self.beneficiary()?;
        let payment_deadline = due + chrono::Duration::days(self.write_off_days);

        let mut req = RegisterRequest {
            ctitloCobrCdent: nosso_numero.to_string(),
            ctitloCliCdent: nosso_numero.to_string(),
            nroCpfCnpjBenef: beneficiary.document_root(),
            filCpfCnpjBenef: beneficiary.document_branch(),
            digCpfCnpjBenef: beneficiary.document_check_digits(),
            demisTitloCobr: self.issue_date()?.format("%d.%m.%Y").to_string(),
            dvctoTitloCobr: due.format("%d.%m.%Y").to_string(),
            cnegocCobr: self.negotiation_number()?,
            vnmnalTitloCobr: helper::amount_cents(self.amount()?),
            validadeAposVencimento: self.write_off_days,
            dataLimitePgt10: payment_deadline.format("%d.%m.%Y").to_string(),
            dataPerm10: payment_deadline.format("%d.%m.%Y").to_string(),
            registrarTitulo: 1,
            codUsuario: "APISERVIC".to_string(),
            tipoAcesso: 2,
            cidtfdProdCobr: 9,
            codigoBanco: 237,
            tipoRegistro: 1,
            cidtfdTpoVcto: 0,
            cespceTitloCobr: 99,
            cindcdAceitSacdo: "N".to_string(),
            fase: 1,
            cindcdCobrMisto: if self.pix { "S" } else { "N" }.to_string(),
            cformaEmisPplta: 2,
            cindcdPgtoParcial: "N".to_string(),
            qtdePgtoParcial: 0,
            vdiaJuroMora: None,
            ptxJuroVcto: None,
            qdiaInicJuro: None,
            pmultaAplicVcto: None,
            qdiaInicMulta: None,
            dlimDescBonif1: None,
            vdescBonifPgto01: None,
            pdescBonifPgto01: None,
            dlimDescBonif2: None,
            vdescBonifPgto02: None,
            pdescBonifPgto02: None,
            dlimDescBonif3: None,
            vdescBonifPgto03: None,
            pdescBonifPgto03: None,
            isacdoTitloCobr: helper::truncate(&helper::ascii(payer.name()), 70),
            elogdrSacdoTitlo: helper::truncate(&helper::ascii(payer.street()), 40),
            enroLogdrSacdo: helper::digits(payer.number()).parse().unwrap_or(0),
            ecomplLogdrSacdo: helper::truncate(&helper::ascii(payer.complement()), 15),
            ccepSacdoTitlo: payer.postal_code_prefix(),
            ccomplCepSacdo: payer.postal_code_suffix(),
            ebairoLogdrSacdo: helper::truncate(&helper::ascii(payer.neighborhood()), 40),
            imunSacdoTitlo: helper::truncate(&helper::ascii(payer.city()), 30),
            csglUfSacdo: helper::truncate(&helper::ascii(payer.state()), 2),
            indCpfCnpjSacdo: match payer.document_kind() {
                DocumentKind::Cpf => 1,
                DocumentKind::Cnpj => 2,
            },
            nroCpfCnpjSacdo: payer.document(),
            renderEletrSacdo: helper::truncate(&helper::ascii(payer.email()), 70),
        };

        match self.interest {
            None | Some(Interest::Exempt) => {}
            Some(Interest::Daily { value, from }) => {
                req.vdiaJuroMora = Some(helper::amount_cents(value));
                req.qdiaInicJuro = Some(helper::days_since(due, from, 1));
            }
            Some(Interest::Monthly { rate, from }) => {
                req.ptxJuroVcto = Some(helper::rate_fixed5(rate));
                req.qdiaInicJuro = Some(helper::days_since(due, from, 1));
            }
        }

        if let Some(penalty) = self.penalty {
            req.pmultaAplicVcto = Some(helper::rate_fixed5_padded(penalty.rate));
            req.qdiaInicMulta = Some(helper::days_since(due, penalty.from, 1));
        }

        for (tier, discount) in self.discounts.iter().enumerate() {
            let limit = discount.until().format("%d.%m.%Y").to_string();
            let (value, rate) = match discount {
                Discount::FixedAmount { value, .. } => (Some(helper::amount_cents(*value)), None),
                Discount::Percentage { rate, .. } => (None, Some(helper::rate_plain5_padded(*rate))),
            };
            match tier {
                0 => {
                    req.dlimDescBonif1 = Some(limit);
                    req.vdescBonifPgto01 = value;
                    req.pdescBonifPgto01 = rate;
                }
                1 => {
                    req.dlimDescBonif2 = Some(limit);
                    req.vdescBonifPgto02 = value;
                    req.pdescBonifPgto02 = rate;
                }
                _ => {
                    req.dlimDescBonif3 = Some(limit);
                    req.vdescBonifPgto03 = value;
                    req.pdescBonifPgto03 = rate;
                }
            }
        }

        Ok(req)
    }

    /// Canonical string signed into `X-Brad-Signature`
    fn signing_payload(path: &str, body: &str, token: &str, nonce: &str, timestamp: &str) -> String {
        format!("POST\n{path}\n\n{body}\n{token}\n{nonce}\n{timestamp}\nSHA256")
    }

    async fn token(&self) -> Result<String> {
        let key = token_key("bradesco", self.agency()?, &self.beneficiary()?.document());
        if let Some(token) = self.cache.get(&key).await {
            return Ok(token);
        }

        let base = self.config.base_url(self.sandbox);
        let auth_path = self.config.auth_path(self.sandbox);
        let now = Local::now();
        let claims = AssertionClaims {
            aud: format!("{base}{auth_path}"),
            sub: self.client_id()?,
            iat: now.timestamp(),
            exp: now.timestamp() + 3600,
            jti: format!("{}000", now.timestamp()),
            ver: "1.1",
        };

        let assertion = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256),
            &claims,
            &self.certificate()?.encoding_key()?,
        )
        .map_err(|e| Error::Auth(format!("Assertion signing failed: {e}")))?;

        let client = build_client(&self.config.http)?;
        let response = client
            .post(format!("{base}{auth_path}"))
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
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
        if status == 401 {
            return Error::Auth("Token inválido".to_string());
        }
        if let Ok(err) = serde_json::from_str::<ErrorResponse>(body) {
            if err.statusHttp.is_some() {
                if let Some(message) = err.errorMessage {
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
impl BoletoService for BradescoService {
    fn bank(&self) -> Bank {
        Bank::Bradesco
    }

    #[instrument(skip(self), fields(bank = "bradesco"))]
    async fn register(&mut self) -> Result<()> {
        let request = self.build_register_request()?;
        let body = serde_json::to_string(&request)?;

        let token = self.token().await?;
        if token.is_empty() {
            return Err(Error::Auth("Token inválido".to_string()));
        }

        let now = Local::now();
        let nonce = format!("{}000", now.timestamp());
        let timestamp = now.format("%Y-%m-%dT%H:%M:%S%:z").to_string();
        let path = self.config.register_path.clone();

        let payload = Self::signing_payload(&path, &body, &token, &nonce, &timestamp);
        let signature = self.certificate()?.sign_sha256(payload.as_bytes())?;

        info!(nosso_numero = self.nosso_numero()?, "registering boleto");

        let client = build_client(&self.config.http)?;
        let response = client
            .post(format!("{}{}", self.config.base_url(self.sandbox), path))
            .header("Authorization", format!("Bearer {token}"))
            .header("X-Brad-Signature", signature)
            .header("X-Brad-Nonce", nonce)
            .header("X-Brad-Timestamp", timestamp)
            .header("X-Brad-Algorithm", "SHA256")
            .header("cpf-cnpj", self.beneficiary()?.document())
            .header("access-token", self.client_id()?)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let parsed: RegisterResponse = response.json().await?;
            self.barcode = Some(boleto::digitable_to_barcode(&parsed.linhaDig10)?);
            self.digitable_line = Some(parsed.linhaDig10);
            self.pix_qr_code = parsed.wqrcdPdraoMercd;
            return Ok(());
        }

        let code = status.as_u16();
        let text = response.text().await.unwrap_or_default();
        warn!(status = code, "registration rejected");
        Err(self.map_error(code, &text))
    }

    async fn settle(&mut self) -> Result<()> {
        Err(Error::Unsupported("settle"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_cache::InMemoryTokenCache;
    use rust_decimal_macros::dec;

    fn service() -> BradescoService {
        let mut svc = BradescoService::new(Arc::new(InMemoryTokenCache::new()));
        svc.set_due_date(NaiveDate::from_ymd_opt(2024, 11, 30).unwrap())
            .set_issue_date(NaiveDate::from_ymd_opt(2024, 11, 1).unwrap())
            .set_amount(dec!(100))
            .set_nosso_numero("80000000023")
            .set_agency("3861")
            .set_account("41000")
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
            .set_beneficiary(Beneficiary::new("Fulano da Silva", "68542653101838"));
        svc
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_negotiation_number_fixed_widths() {
        let svc = service();
        assert_eq!(svc.negotiation_number().unwrap(), "386100000000041000");

        let mut svc = service();
        svc.set_agency("61");
        assert_eq!(&svc.negotiation_number().unwrap()[..4], "0061");
    }

    #[test]
    fn test_register_request_core_fields() {
        let req = service().build_register_request().unwrap();
        assert_eq!(req.ctitloCobrCdent, "80000000023");
        assert_eq!(req.dvctoTitloCobr, "30.11.2024");
        assert_eq!(req.vnmnalTitloCobr, "10000");
        assert_eq!(req.codigoBanco, 237);
        assert_eq!(req.cindcdCobrMisto, "S");
        assert_eq!(req.nroCpfCnpjBenef, "68542653");
        assert_eq!(req.filCpfCnpjBenef, "1018");
        assert_eq!(req.digCpfCnpjBenef, "38");
        assert_eq!(req.imunSacdoTitlo, "Sao Paulo");
        assert_eq!(req.ccepSacdoTitlo, "02514");
        assert_eq!(req.ccomplCepSacdo, "010");
        assert_eq!(req.indCpfCnpjSacdo, 1);
    }

    #[test]
    fn test_discount_tiers_land_in_positional_fields() {
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
        .add_discount(Discount::FixedAmount {
            value: dec!(2),
            until: date(2024, 11, 28),
        })
        .add_discount(Discount::Percentage {
            rate: dec!(1),
            until: date(2024, 11, 29),
        });

        let req = svc.build_register_request().unwrap();
        assert_eq!(req.dlimDescBonif1.as_deref(), Some("27.11.2024"));
        assert_eq!(req.vdescBonifPgto01.as_deref(), Some("300"));
        assert_eq!(req.dlimDescBonif2.as_deref(), Some("28.11.2024"));
        assert_eq!(req.vdescBonifPgto02.as_deref(), Some("200"));
        assert_eq!(req.dlimDescBonif3.as_deref(), Some("29.11.2024"));
        assert_eq!(req.pdescBonifPgto03.as_deref(), Some("00100000"));
        assert_eq!(req.vdescBonifPgto03, None);

        // reference date equals due date: window still floors at one day
        assert_eq!(req.qdiaInicJuro, Some(1));
        assert_eq!(req.qdiaInicMulta, Some(1));
        assert_eq!(req.ptxJuroVcto.as_deref(), Some("2.00000"));
        assert_eq!(req.pmultaAplicVcto.as_deref(), Some("02.00000"));
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
    fn test_zero_nosso_numero_rejected() {
        let mut svc = service();
        svc.set_nosso_numero("0");
        match svc.build_register_request() {
            Err(Error::BusinessRule { code, .. }) => assert_eq!(code, "99999"),
            other => panic!("expected business-rule error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_due_date_fails_fast() {
        let mut svc = BradescoService::new(Arc::new(InMemoryTokenCache::new()));
        svc.set_nosso_numero("80000000023");
        assert!(matches!(
            svc.build_register_request(),
            Err(Error::MissingField("due_date"))
        ));
    }

    #[test]
    fn test_signing_payload_layout() {
        let payload = BradescoService::signing_payload(
            "/v1/boleto-hibrido/registrar-boleto",
            "{}",
            "tok",
            "1700000000000",
            "2024-11-01T10:00:00-03:00",
        );
        let lines: Vec<&str> = payload.split('\n').collect();
        assert_eq!(lines[0], "POST");
        assert_eq!(lines[1], "/v1/boleto-hibrido/registrar-boleto");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "{}");
        assert_eq!(lines[4], "tok");
        assert_eq!(lines[5], "1700000000000");
        assert_eq!(lines[6], "2024-11-01T10:00:00-03:00");
        assert_eq!(lines[7], "SHA256");
    }

    #[test]
    fn test_error_table_resolution() {
        let table = ErrorTable::new(ERROR_TABLE);
        // exact, case-insensitive, duplicate entry 36 never shadows 19
        assert_eq!(table.resolve("CEP Inválido"), Some(19));
        assert_eq!(table.resolve("cep invalido"), Some(19));
        // fuzzy above threshold
        assert_eq!(table.resolve("Titulo ja cadastrado no banco"), Some(69));
        // nothing close: caller falls back to the checksum
        assert_eq!(table.resolve("mensagem completamente nova xpto"), None);
    }

    #[test]
    fn test_map_error_uses_resolver_then_checksum() {
        let svc = service();
        let err = svc.map_error(400, r#"{"statusHttp":400,"errorMessage":"CEP Inválido"}"#);
        match err {
            Error::BusinessRule { code, http_status, .. } => {
                assert_eq!(code, "19");
                assert_eq!(http_status, 400);
            }
            other => panic!("unexpected {other:?}"),
        }

        let err = svc.map_error(400, r#"{"statusHttp":400,"errorMessage":"zzz qqq www"}"#);
        match err {
            Error::BusinessRule { code, .. } => {
                assert_eq!(code, checksum_code("zzz qqq www").to_string());
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(matches!(svc.map_error(401, ""), Error::Auth(_)));
        assert!(matches!(
            svc.map_error(502, "bad gateway"),
            Error::BankApi { status_code: 502, .. }
        ));
    }
}
