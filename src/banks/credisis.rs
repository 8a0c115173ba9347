//! CrediSIS cooperative boleto webservice
//!
//! Document-style SOAP with static credentials: the token and covenant
//! travel in a `Chave` SOAP header instead of a bearer token, so there is
//! no auth round-trip and nothing to cache.
//!
//! The nosso número is self-verifying for this cooperative: a `097` bank
//! prefix, a mod-11 digit of the beneficiary document, the agency, the
//! covenant and a 6-digit sequential.

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::boleto::mod11_digit;
use crate::config::CredisisConfig;
use crate::entity::{Beneficiary, Discount, Interest, Payer, Penalty};
use crate::service::{build_client, Bank, BoletoService};
use crate::soap::{self, XmlBuilder};
use crate::{helper, Error, Result};

const SERVICE_NS: &str = "urn:CredisisBoletoInterface";

/// CrediSIS boleto service
pub struct CredisisService {
    due_date: Option<NaiveDate>,
    issue_date: Option<NaiveDate>,
    amount: Option<Decimal>,
    covenant: Option<String>,
    agency: Option<String>,
    nosso_numero: Option<String>,
    document_number: Option<String>,
    payer: Option<Payer>,
    beneficiary: Option<Beneficiary>,
    interest: Option<Interest>,
    penalty: Option<Penalty>,
    discounts: Vec<Discount>,
    write_off_days: i64,
    token: Option<String>,
    config: CredisisConfig,
    digitable_line: Option<String>,
    barcode: Option<String>,
}

impl CredisisService {
    /// New service; the issue date defaults to today
    pub fn new() -> Self {
        CredisisService {
            due_date: None,
            issue_date: None,
            amount: None,
            covenant: None,
            agency: None,
            nosso_numero: None,
            document_number: None,
            payer: None,
            beneficiary: None,
            interest: None,
            penalty: None,
            discounts: Vec::new(),
            write_off_days: 0,
            token: None,
            config: CredisisConfig::default(),
            digitable_line: None,
            barcode: None,
        }
    }

    /// Override endpoint/timeouts (tests)
    pub fn set_config(&mut self, config: CredisisConfig) -> &mut Self {
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

    /// Covenant number with the cooperative
    pub fn set_covenant(&mut self, covenant: impl Into<String>) -> &mut Self {
        self.covenant = Some(covenant.into());
        self
    }

    /// Agency number
    pub fn set_agency(&mut self, agency: impl Into<String>) -> &mut Self {
        self.agency = Some(agency.into());
        self
    }

    /// Sequential (6 digits) or the full pre-computed identifier
    pub fn set_nosso_numero(&mut self, nosso_numero: impl Into<String>) -> &mut Self {
        self.nosso_numero = Some(nosso_numero.into());
        self
    }

    /// Document number shown on the slip (defaults to the nosso número)
    pub fn set_document_number(&mut self, document_number: impl Into<String>) -> &mut Self {
        self.document_number = Some(document_number.into());
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

    /// Append a discount tier
    pub fn add_discount(&mut self, discount: Discount) -> &mut Self {
        self.discounts.push(discount);
        self
    }

    /// Days after due date the title stays payable
    pub fn set_write_off_days(&mut self, days: i64) -> &mut Self {
        self.write_off_days = days;
        self
    }

    /// Static integration token (sent in the SOAP header)
    pub fn set_token(&mut self, token: impl Into<String>) -> &mut Self {
        self.token = Some(token.into());
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

    fn agency(&self) -> Result<&str> {
        self.agency.as_deref().ok_or(Error::MissingField("agency"))
    }

    fn payer(&self) -> Result<&Payer> {
        self.payer.as_ref().ok_or(Error::MissingField("payer"))
    }

    fn beneficiary(&self) -> Result<&Beneficiary> {
        self.beneficiary
            .as_ref()
            .ok_or(Error::MissingField("beneficiary"))
    }

    fn token(&self) -> Result<&str> {
        self.token.as_deref().ok_or(Error::MissingField("token"))
    }

    /// Full identifier: `097` + mod-11 digit of the beneficiary document +
    /// agency(4) + covenant(6) + sequential(6)
    fn computed_nosso_numero(&self) -> Result<String> {
        let raw = self
            .nosso_numero
            .as_deref()
            .ok_or(Error::MissingField("nosso_numero"))?;
        let digit = mod11_digit(&self.beneficiary()?.document());
        let sequential = {
            let digits = helper::digits(raw);
            let start = digits.len().saturating_sub(6);
            helper::pad_left(&digits[start..], 6)
        };
        Ok(format!(
            "097{digit}{}{}{sequential}",
            helper::pad_left(self.agency()?, 4),
            helper::pad_left(self.covenant()?, 6),
        ))
    }

    /// Short inputs are expanded; full-length inputs must round-trip
    fn nosso_numero(&self) -> Result<String> {
        let raw = self
            .nosso_numero
            .as_deref()
            .ok_or(Error::MissingField("nosso_numero"))?;
        let computed = self.computed_nosso_numero()?;
        if raw.len() <= 6 {
            return Ok(computed);
        }
        if raw != computed {
            return Err(Error::InvalidField {
                field: "nosso_numero",
                reason: "does not match the agency/covenant-derived identifier".to_string(),
            });
        }
        Ok(raw.to_string())
    }

    fn build_register_document(&self) -> Result<String> {
        if self.discounts.len() > crate::MAX_DISCOUNT_TIERS {
            return Err(Error::InvalidField {
                field: "discounts",
                reason: format!(
                    "{} tiers informed, bank accepts at most 3",
                    self.discounts.len()
                ),
            });
        }

        let due = self.due_date()?;
        let nosso_numero = self.nosso_numero()?;
        let payer = self.payer()?;

        let mut x = XmlBuilder::new();
        x.open("boleto")?;

        x.open("pagador")?;
        x.leaf("nome", payer.name())?;
        x.leaf("nomeFantasia", "")?;
        x.leaf("cpfCnpj", &payer.document())?;
        x.open("endereco")?;
        x.leaf("endereco", payer.street())?;
        x.leaf("numero", payer.number())?;
        x.leaf("complemento", payer.complement())?;
        x.leaf("bairro", payer.neighborhood())?;
        x.leaf("cep", payer.postal_code())?;
        x.leaf("cidade", payer.city())?;
        x.leaf("uf", payer.state())?;
        x.close("endereco")?;
        x.open("contatos")?;
        if !payer.phone().is_empty() {
            x.open("item")?;
            x.leaf("contato", payer.phone())?;
            x.leaf("tipoContato", "1")?;
            x.close("item")?;
        }
        if !payer.email().is_empty() {
            x.open("item")?;
            x.leaf("contato", payer.email())?;
            x.leaf("tipoContato", "4")?;
            x.close("item")?;
        }
        x.close("contatos")?;
        x.close("pagador")?;

        x.leaf(
            "documento",
            self.document_number.as_deref().unwrap_or(&nosso_numero),
        )?;
        x.leaf("nossonumero", &nosso_numero)?;
        x.leaf("dataEmissao", &self.issue_date().format("%Y-%m-%d").to_string())?;
        x.leaf("dataVencimento", &due.format("%Y-%m-%d").to_string())?;

        let payment_deadline = due + chrono::Duration::days(self.write_off_days);
        x.leaf(
            "dataLimitePagamento",
            &payment_deadline.format("%Y-%m-%d").to_string(),
        )?;

        x.leaf("valor", &helper::amount_fixed(self.amount()?))?;
        x.leaf("quantidadeParcelas", "1")?;
        x.leaf("intervaloParcela", "0")?;
        x.leaf("codigoEspecie", "03")?;
        x.open("protesto")?;
        x.leaf("dias", "0")?;
        x.leaf("tipo", "3")?;
        x.close("protesto")?;

        for (tier, discount) in self.discounts.iter().enumerate() {
            let tag = format!("desconto{}", tier + 1);
            x.open(&tag)?;
            match discount {
                Discount::FixedAmount { value, until } => {
                    x.leaf("tipo", "1")?;
                    x.leaf("data", &until.format("%Y-%m-%d").to_string())?;
                    x.leaf("valor", &helper::amount_fixed(*value))?;
                }
                Discount::Percentage { rate, until } => {
                    x.leaf("tipo", "2")?;
                    x.leaf("data", &until.format("%Y-%m-%d").to_string())?;
                    x.leaf("valor", &helper::amount_fixed(*rate))?;
                }
            }
            x.close(&tag)?;
        }

        if let Some(penalty) = self.penalty {
            x.open("multa")?;
            x.leaf("tipo", "2")?;
            x.leaf("valor", &helper::amount_fixed(penalty.rate))?;
            x.open("carencia")?;
            x.leaf("tipo", "2")?;
            x.leaf("dias", &helper::days_since(due, penalty.from, 0).to_string())?;
            x.close("carencia")?;
            x.close("multa")?;
        }

        match self.interest {
            None => {}
            Some(Interest::Exempt) => {
                x.open("juros")?;
                x.leaf("valor", "0")?;
                x.leaf("tipo", "3")?;
                x.close("juros")?;
            }
            Some(Interest::Daily { value, from }) => {
                x.open("juros")?;
                x.leaf("valor", &helper::amount_fixed(value))?;
                x.leaf("tipo", "1")?;
                x.open("carencia")?;
                x.leaf("tipo", "2")?;
                x.leaf("dias", &helper::days_since(due, from, 0).to_string())?;
                x.close("carencia")?;
                x.close("juros")?;
            }
            Some(Interest::Monthly { rate, from }) => {
                x.open("juros")?;
                x.leaf("valor", &helper::amount_fixed(rate))?;
                x.leaf("tipo", "2")?;
                x.open("carencia")?;
                x.leaf("tipo", "2")?;
                x.leaf("dias", &helper::days_since(due, from, 0).to_string())?;
                x.close("carencia")?;
                x.close("juros")?;
            }
        }

        x.close("boleto")?;
        x.finish()
    }

    fn header_xml(&self) -> Result<String> {
        let mut x = XmlBuilder::new();
        x.open_ns("Chave", SERVICE_NS)?;
        x.leaf("token", self.token()?)?;
        x.leaf("convenio", self.covenant()?)?;
        x.close("Chave")?;
        x.finish()
    }

    async fn call(&self, operation: &str, body: String) -> Result<String> {
        let envelope = soap::envelope_with_header(&self.header_xml()?, &body);

        let client = build_client(&self.config.http)?;
        let response = client
            .post(&self.config.url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", format!("{SERVICE_NS}#{operation}"))
            .body(envelope)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;

        if let Some(fault) = soap::first_text(&text, "faultstring") {
            return Err(Error::BankApi {
                status_code: status,
                message: fault,
            });
        }
        if !(200..300).contains(&status) {
            return Err(Error::BankApi {
                status_code: status,
                message: text,
            });
        }

        Self::check_errors(&text)?;
        Ok(text)
    }

    /// `erros/item` carries `code` + `message` pairs; the first one wins
    fn check_errors(xml: &str) -> Result<()> {
        let Some(errors) = soap::inner(xml, "erros") else {
            return Ok(());
        };
        let items = soap::inner_all(&errors, "item");
        if let Some(item) = items.first() {
            let code = soap::first_text(item, "code").unwrap_or_default();
            let message = soap::first_text(item, "message").unwrap_or_default();
            warn!(%code, "webservice rejected the operation");
            return Err(Error::BusinessRule {
                code: code.trim().to_string(),
                message: message.trim().to_string(),
                http_status: 200,
            });
        }
        Ok(())
    }

    fn operation_body(operation: &str, inner: &str) -> String {
        format!("<{operation} xmlns=\"{SERVICE_NS}\">{inner}</{operation}>")
    }
}

impl Default for CredisisService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BoletoService for CredisisService {
    fn bank(&self) -> Bank {
        Bank::Credisis
    }

    #[instrument(skip(self), fields(bank = "credisis"))]
    async fn register(&mut self) -> Result<()> {
        let document = self.build_register_document()?;
        let body = Self::operation_body(
            "gerarBoletos",
            &format!("<layout>default</layout><boletos>{document}</boletos>"),
        );

        info!(nosso_numero = %self.nosso_numero()?, "registering boleto");

        let response = self.call("gerarBoletos", body).await?;
        let title = soap::inner(&response, "titulos")
            .and_then(|titles| soap::inner(&titles, "item"))
            .ok_or_else(|| Error::Xml("Response missing titulos/item".to_string()))?;
        self.barcode = soap::first_text(&title, "codigoBarras");
        self.digitable_line = soap::first_text(&title, "linhaDigitavel");
        Ok(())
    }

    #[instrument(skip(self), fields(bank = "credisis"))]
    async fn settle(&mut self) -> Result<()> {
        // look the title up first: cancellation needs the webservice id
        let mut x = XmlBuilder::new();
        x.open("boleto")?;
        x.leaf("nossonumero", &self.nosso_numero()?)?;
        x.close("boleto")?;
        let body = Self::operation_body("buscarBoleto", &x.finish()?);

        let response = self.call("buscarBoleto", body).await?;
        let title = soap::inner(&response, "titulos")
            .and_then(|titles| soap::inner(&titles, "item"))
            .ok_or_else(|| Error::Xml("Response missing titulos/item".to_string()))?;
        let id_web = soap::first_text(&title, "idWeb")
            .ok_or_else(|| Error::Xml("Response missing idWeb".to_string()))?;
        let value = soap::first_text(&title, "valor").unwrap_or_default();

        let mut x = XmlBuilder::new();
        x.open("boleto")?;
        x.leaf("idWeb", &id_web)?;
        x.leaf("valor", &value)?;
        x.leaf("operacao", "CANCELAMENTO")?;
        x.close("boleto")?;
        let body = Self::operation_body("baixarBoleto", &x.finish()?);

        self.call("baixarBoleto", body).await?;
        Ok(())
    }
}
