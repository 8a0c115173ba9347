//! Caixa Econômica Federal SIBAR barramento (SIGCB cobrança)
//!
//! Document-style SOAP. Authentication is not a token: each operation
//! carries a SHA-256 hash over fixed-width-padded business fields in the
//! `AUTENTICACAO` header element.

use base64::Engine;
use chrono::{Local, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use crate::config::CaixaConfig;
use crate::entity::{Beneficiary, Discount, DocumentKind, Interest, Payer, Penalty};
use crate::resolver::checksum_code;
use crate::service::{build_client, Bank, BoletoService};
use crate::soap::{self, XmlBuilder};
use crate::{helper, Error, Result};

const OP_REGISTER: &str = "INCLUI_BOLETO";
const OP_ALTER: &str = "ALTERA_BOLETO";
const OP_WRITE_OFF: &str = "BAIXA_BOLETO";

/// Caixa boleto service
pub struct CaixaService {
    due_date: Option<NaiveDate>,
    issue_date: Option<NaiveDate>,
    amount: Option<Decimal>,
    covenant: Option<String>,
    nosso_numero: Option<String>,
    payer: Option<Payer>,
    beneficiary: Option<Beneficiary>,
    interest: Option<Interest>,
    penalty: Option<Penalty>,
    discounts: Vec<Discount>,
    write_off_days: i64,
    pix: bool,
    config: CaixaConfig,
    digitable_line: Option<String>,
    barcode: Option<String>,
    pix_qr_code: Option<String>,
}

impl CaixaService {
    /// New service; the issue date defaults to today
    pub fn new() -> Self {
        CaixaService {
            due_date: None,
            issue_date: None,
            amount: None,
            covenant: None,
            nosso_numero: None,
            payer: None,
            beneficiary: None,
            interest: None,
            penalty: None,
            discounts: Vec::new(),
            write_off_days: 29,
            pix: false,
            config: CaixaConfig::default(),
            digitable_line: None,
            barcode: None,
            pix_qr_code: None,
        }
    }

    /// Override endpoint/timeouts (tests)
    pub fn set_config(&mut self, config: CaixaConfig) -> &mut Self {
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

    /// Beneficiary code (convênio)
    pub fn set_covenant(&mut self, covenant: impl Into<String>) -> &mut Self {
        self.covenant = Some(covenant.into());
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

    /// Days after due date before the title is returned
    pub fn set_write_off_days(&mut self, days: i64) -> &mut Self {
        self.write_off_days = days;
        self
    }

    /// Register as a hybrid (PIX) title
    pub fn set_pix(&mut self, pix: bool) -> &mut Self {
        self.pix = pix;
        self
    }

    /// Digitable line populated by registration/alteration
    pub fn digitable_line(&self) -> Option<&str> {
        self.digitable_line.as_deref()
    }

    /// Barcode populated by registration/alteration
    pub fn barcode(&self) -> Option<&str> {
        self.barcode.as_deref()
    }

    /// PIX EMV payload, when the title is hybrid
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

    /// `14` + the title identifier zero-padded to 15 digits
    fn full_nosso_numero(&self) -> Result<String> {
        Ok(format!("14{}", helper::pad_left(self.nosso_numero()?, 15)))
    }

    /// Last 11 digits of the title identifier
    fn document_number(&self) -> Result<String> {
        let n = self.nosso_numero()?;
        Ok(if n.len() > 11 {
            n[n.len() - 11..].to_string()
        } else {
            n.to_string()
        })
    }

    /// SHA-256 of covenant(7) + nosso número(2+15) + due date(8) +
    /// amount(15) + beneficiary document(14), base64-encoded. The write-off
    /// operation hashes zeroed due date and amount.
    fn auth_hash(&self, operation: &str) -> Result<String> {
        let (due, amount) = if operation == OP_WRITE_OFF {
            ("0".to_string(), "0".to_string())
        } else {
            (
                self.due_date()?.format("%d%m%Y").to_string(),
                helper::amount_cents(self.amount()?),
            )
        };

        let input = format!(
            "{}{}{}{}{}",
            helper::pad_left(self.covenant()?, 7),
            self.full_nosso_numero()?,
            helper::pad_left(&due, 8),
            helper::pad_left(&amount, 15),
            helper::pad_left(&self.beneficiary()?.document(), 14),
        );

        let digest = Sha256::digest(input.as_bytes());
        Ok(base64::engine::general_purpose::STANDARD.encode(digest))
    }

    fn header(&self, builder: &mut XmlBuilder, operation: &str) -> Result<()> {
        builder.open("HEADER")?;
        builder.leaf("VERSAO", "3.2")?;
        builder.leaf("AUTENTICACAO", &self.auth_hash(operation)?)?;
        builder.leaf("USUARIO_SERVICO", "SGCBS02P")?;
        builder.leaf("OPERACAO", operation)?;
        builder.leaf("SISTEMA_ORIGEM", "SIGCB")?;
        builder.leaf("DATA_HORA", &Local::now().format("%Y%m%d%H%M%S").to_string())?;
        builder.close("HEADER")
    }

    fn payer_section(&self, builder: &mut XmlBuilder) -> Result<()> {
        let payer = self.payer()?;
        // SIBAR rejects ampersands even escaped, so they are stripped
        let clean = |s: &str| helper::ascii(s).replace('&', "");

        builder.open("PAGADOR")?;
        match payer.document_kind() {
            DocumentKind::Cpf => {
                builder.leaf("CPF", &payer.document())?;
                builder.leaf("NOME", &helper::truncate(&clean(payer.name()), 40))?;
            }
            DocumentKind::Cnpj => {
                builder.leaf("CNPJ", &payer.document())?;
                builder.leaf("RAZAO_SOCIAL", &helper::truncate(&clean(payer.name()), 40))?;
            }
        }

        builder.open("ENDERECO")?;
        if payer.street().is_empty() {
            return Err(Error::business_rule(
                "X997",
                "(X997) LOGRADOURO DO PAGADOR INVALIDO",
                400,
            ));
        }
        let street = format!("{} {}", clean(payer.street()), payer.number());
        builder.leaf("LOGRADOURO", &helper::truncate(street.trim(), 40))?;

        if payer.neighborhood().is_empty() {
            return Err(Error::business_rule(
                "X999",
                "(X999) BAIRRO DO PAGADOR INVALIDO",
                400,
            ));
        }
        builder.leaf("BAIRRO", &helper::truncate(&clean(payer.neighborhood()), 15))?;

        if payer.city().is_empty() {
            return Err(Error::business_rule(
                "X998",
                "(X998) CIDADE DO PAGADOR INVALIDO",
                400,
            ));
        }
        builder.leaf("CIDADE", &helper::truncate(&clean(payer.city()), 15))?;

        if payer.state().is_empty() {
            return Err(Error::business_rule(
                "X996",
                "(X996) UF DO PAGADOR INVALIDO",
                400,
            ));
        }
        builder.leaf("UF", &helper::ascii(payer.state()))?;

        let postal_code = helper::digits(payer.postal_code());
        if postal_code.is_empty() {
            return Err(Error::business_rule(
                "X995",
                "(X995) CEP DO PAGADOR INVALIDO",
                400,
            ));
        }
        builder.leaf("CEP", &postal_code)?;
        builder.close("ENDERECO")?;
        builder.close("PAGADOR")
    }

    fn build_register_document(&self, operation: &str) -> Result<String> {
        if self.discounts.len() > crate::MAX_DISCOUNT_TIERS {
            return Err(Error::InvalidField {
                field: "discounts",
                reason: format!(
                    "{} tiers informed, bank accepts at most 3",
                    self.discounts.len()
                ),
            });
        }

        let mut x = XmlBuilder::new();
        x.open("SERVICO_ENTRADA")?;
        self.header(&mut x, operation)?;
        x.open("DADOS")?;
        x.open(operation)?;
        x.leaf("CODIGO_BENEFICIARIO", self.covenant()?)?;

        x.open("TITULO")?;
        if self.pix {
            x.leaf("TIPO", "HIBRIDO")?;
        }
        x.leaf("NOSSO_NUMERO", &self.full_nosso_numero()?)?;
        x.leaf("NUMERO_DOCUMENTO", &self.document_number()?)?;
        x.leaf("DATA_VENCIMENTO", &self.due_date()?.format("%Y-%m-%d").to_string())?;
        x.leaf("VALOR", &helper::amount_fixed(self.amount()?))?;
        x.leaf("TIPO_ESPECIE", "99")?;
        x.leaf("FLAG_ACEITE", "N")?;
        x.leaf("DATA_EMISSAO", &self.issue_date().format("%Y-%m-%d").to_string())?;

        if let Some(penalty) = self.penalty {
            x.open("MULTA")?;
            x.leaf("DATA", &penalty.from.format("%Y-%m-%d").to_string())?;
            x.leaf("PERCENTUAL", &helper::amount_fixed(penalty.rate))?;
            x.close("MULTA")?;
        }

        for discount in &self.discounts {
            x.open("DESCONTOS")?;
            match discount {
                Discount::FixedAmount { value, until } => {
                    x.leaf("DATA", &until.format("%Y-%m-%d").to_string())?;
                    x.leaf("VALOR", &helper::amount_fixed(*value))?;
                }
                Discount::Percentage { rate, until } => {
                    x.leaf("DATA", &until.format("%Y-%m-%d").to_string())?;
                    x.leaf("PERCENTUAL", &helper::amount_fixed(*rate))?;
                }
            }
            x.close("DESCONTOS")?;
        }

        x.open("JUROS_MORA")?;
        match self.interest {
            Some(Interest::Daily { value, from }) => {
                x.leaf("TIPO", "VALOR_POR_DIA")?;
                x.leaf("DATA", &from.format("%Y-%m-%d").to_string())?;
                x.leaf("VALOR", &helper::amount_fixed(value))?;
            }
            Some(Interest::Monthly { rate, from }) => {
                x.leaf("TIPO", "TAXA_MENSAL")?;
                x.leaf("DATA", &from.format("%Y-%m-%d").to_string())?;
                x.leaf("PERCENTUAL", &helper::amount_fixed(rate))?;
            }
            Some(Interest::Exempt) | None => {
                x.leaf("TIPO", "ISENTO")?;
                x.leaf("VALOR", "0")?;
                x.leaf("PERCENTUAL", "0")?;
            }
        }
        x.close("JUROS_MORA")?;

        x.leaf("VALOR_ABATIMENTO", "0")?;

        x.open("POS_VENCIMENTO")?;
        x.leaf("ACAO", "DEVOLVER")?;
        x.leaf("NUMERO_DIAS", &self.write_off_days.to_string())?;
        x.close("POS_VENCIMENTO")?;

        x.leaf("CODIGO_MOEDA", "09")?;

        self.payer_section(&mut x)?;

        x.close("TITULO")?;
        x.close(operation)?;
        x.close("DADOS")?;
        x.close("SERVICO_ENTRADA")?;
        x.finish()
    }

    fn build_write_off_document(&self) -> Result<String> {
        let mut x = XmlBuilder::new();
        x.open("SERVICO_ENTRADA")?;
        self.header(&mut x, OP_WRITE_OFF)?;
        x.open("DADOS")?;
        x.open(OP_WRITE_OFF)?;
        x.leaf("CODIGO_BENEFICIARIO", self.covenant()?)?;
        x.leaf("NOSSO_NUMERO", &self.full_nosso_numero()?)?;
        x.close(OP_WRITE_OFF)?;
        x.close("DADOS")?;
        x.close("SERVICO_ENTRADA")?;
        x.finish()
    }

    async fn call(&self, operation: &str, document: String) -> Result<String> {
        let client = build_client(&self.config.http)?;
        let response = client
            .post(&self.config.url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", operation)
            .body(soap::envelope(&document))
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
        Ok(text)
    }

    /// Check CONTROLE_NEGOCIAL; on rejection, the code inside parentheses
    /// in the message wins, otherwise a checksum of the message
    fn check_business_control(&self, xml: &str) -> Result<()> {
        let Some(control) = soap::inner(xml, "CONTROLE_NEGOCIAL") else {
            let code = soap::first_text(xml, "COD_RETORNO").unwrap_or_default();
            let message = soap::first_text(xml, "RETORNO").unwrap_or_default();
            return Err(Error::BusinessRule {
                code: code.trim().to_string(),
                message: message.trim().to_string(),
                http_status: 200,
            });
        };

        let code = soap::first_text(&control, "COD_RETORNO").unwrap_or_default();
        if code.trim() == "0" {
            return Ok(());
        }

        let message = soap::first_text(&control, "RETORNO").unwrap_or_default();
        let message = message.trim().to_string();
        let paren =
            Regex::new(r"\((.*?)\)").map_err(|e| Error::Encoding(e.to_string()))?;
        let code = paren
            .captures(&message)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| checksum_code(&message).to_string());

        warn!(%code, "barramento rejected the operation");
        Err(Error::BusinessRule {
            code,
            message,
            http_status: 200,
        })
    }

    fn read_outputs(&mut self, xml: &str, operation: &str) -> Result<()> {
        let section = soap::inner(xml, operation)
            .ok_or_else(|| Error::Xml(format!("Response missing {operation} section")))?;
        self.barcode = soap::first_text(&section, "CODIGO_BARRAS");
        self.digitable_line = soap::first_text(&section, "LINHA_DIGITAVEL");
        self.pix_qr_code = soap::first_text(&section, "QRCODE");
        Ok(())
    }

    /// Amend due date and amount of a registered title
    pub async fn alter(&mut self) -> Result<()> {
        let mut x = XmlBuilder::new();
        x.open("SERVICO_ENTRADA")?;
        self.header(&mut x, OP_ALTER)?;
        x.open("DADOS")?;
        x.open(OP_ALTER)?;
        x.leaf("CODIGO_BENEFICIARIO", self.covenant()?)?;
        x.open("TITULO")?;
        x.leaf("NOSSO_NUMERO", &self.full_nosso_numero()?)?;
        x.leaf("NUMERO_DOCUMENTO", &self.document_number()?)?;
        x.leaf("DATA_VENCIMENTO", &self.due_date()?.format("%Y-%m-%d").to_string())?;
        x.leaf("VALOR", &helper::amount_fixed(self.amount()?))?;
        x.close("TITULO")?;
        x.close(OP_ALTER)?;
        x.close("DADOS")?;
        x.close("SERVICO_ENTRADA")?;
        let document = x.finish()?;

        let response = self.call(OP_ALTER, document).await?;
        self.check_business_control(&response)?;
        self.read_outputs(&response, OP_ALTER)
    }
}

impl Default for CaixaService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BoletoService for CaixaService {
    fn bank(&self) -> Bank {
        Bank::Caixa
    }

    #[instrument(skip(self), fields(bank = "caixa"))]
    async fn register(&mut self) -> Result<()> {
        let document = self.build_register_document(OP_REGISTER)?;
        info!(nosso_numero = self.nosso_numero()?, "registering boleto");

        let response = self.call(OP_REGISTER, document).await?;
        self.check_business_control(&response)?;
        self.read_outputs(&response, OP_REGISTER)
    }

    #[instrument(skip(self), fields(bank = "caixa"))]
    async fn settle(&mut self) -> Result<()> {
        let document = self.build_write_off_document()?;
        let response = self.call(OP_WRITE_OFF, document).await?;
        self.check_business_control(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service() -> CaixaService {
        let mut svc = CaixaService::new();
        svc.set_due_date(date(2024, 11, 30))
            .set_issue_date(date(2024, 11, 1))
            .set_amount(dec!(100))
            .set_nosso_numero("80000000023")
            .set_covenant("123456")
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
    fn test_full_nosso_numero_width() {
        let svc = service();
        assert_eq!(svc.full_nosso_numero().unwrap(), "14000080000000023");
        assert_eq!(svc.document_number().unwrap(), "80000000023");
    }

    #[test]
    fn test_auth_hash_is_the_documented_concatenation() {
        let svc = service();
        let expected_input = concat!(
            "0123456",            // covenant padded to 7
            "14000080000000023",  // 14 + nosso número padded to 15
            "30112024",           // due date ddmmyyyy
            "000000000010000",    // amount digits padded to 15
            "68542653101838",     // beneficiary document padded to 14
        );
        let digest = Sha256::digest(expected_input.as_bytes());
        let expected = base64::engine::general_purpose::STANDARD.encode(digest);
        assert_eq!(svc.auth_hash(OP_REGISTER).unwrap(), expected);
    }

    #[test]
    fn test_write_off_hash_zeroes_due_date_and_amount() {
        let svc = service();
        let expected_input = concat!(
            "0123456",
            "14000080000000023",
            "00000000",
            "000000000000000",
            "68542653101838",
        );
        let digest = Sha256::digest(expected_input.as_bytes());
        let expected = base64::engine::general_purpose::STANDARD.encode(digest);
        assert_eq!(svc.auth_hash(OP_WRITE_OFF).unwrap(), expected);
    }

    #[test]
    fn test_register_document_shape() {
        let mut svc = service();
        svc.set_pix(true)
            .set_interest(Interest::Monthly {
                rate: dec!(2),
                from: date(2024, 11, 30),
            })
            .set_penalty(Penalty::new(dec!(2), date(2024, 11, 30)))
            .add_discount(Discount::FixedAmount {
                value: dec!(3),
                until: date(2024, 11, 27),
            });
        let doc = svc.build_register_document(OP_REGISTER).unwrap();
        assert!(doc.contains("<OPERACAO>INCLUI_BOLETO</OPERACAO>"));
        assert!(doc.contains("<TIPO>HIBRIDO</TIPO>"));
        assert!(doc.contains("<NOSSO_NUMERO>14000080000000023</NOSSO_NUMERO>"));
        assert!(doc.contains("<DATA_VENCIMENTO>2024-11-30</DATA_VENCIMENTO>"));
        assert!(doc.contains("<TIPO>TAXA_MENSAL</TIPO>"));
        assert!(doc.contains("<PERCENTUAL>2.00</PERCENTUAL>"));
        assert!(doc.contains("<DESCONTOS><DATA>2024-11-27</DATA><VALOR>3.00</VALOR></DESCONTOS>"));
        assert!(doc.contains("<CPF>62344900187</CPF>"));
        assert!(doc.contains("<CIDADE>Sao Paulo</CIDADE>"));
        assert!(doc.contains("<CEP>02514010</CEP>"));
    }

    #[test]
    fn test_interest_defaults_to_exempt() {
        let doc = service().build_register_document(OP_REGISTER).unwrap();
        assert!(doc.contains("<TIPO>ISENTO</TIPO>"));
    }

    #[test]
    fn test_missing_address_fields_fail_fast() {
        let mut svc = service();
        svc.set_payer(Payer::new("Fulano da Silva", "62344900187"));
        match svc.build_register_document(OP_REGISTER) {
            Err(Error::BusinessRule { code, .. }) => assert_eq!(code, "X997"),
            other => panic!("expected X997, got {other:?}"),
        }

        let mut svc = service();
        svc.set_payer(
            Payer::new("Fulano da Silva", "62344900187").with_address(
                "Rua A", "1", "", "", "Cidade", "SP", "02514010",
            ),
        );
        match svc.build_register_document(OP_REGISTER) {
            Err(Error::BusinessRule { code, .. }) => assert_eq!(code, "X999"),
            other => panic!("expected X999, got {other:?}"),
        }
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
            svc.build_register_document(OP_REGISTER),
            Err(Error::InvalidField { field: "discounts", .. })
        ));
    }

    #[test]
    fn test_business_control_extracts_paren_code() {
        let svc = service();
        let xml = "<DADOS><CONTROLE_NEGOCIAL><COD_RETORNO>1</COD_RETORNO>\
                   <MENSAGENS><RETORNO>(X005) TITULO JA EXISTE</RETORNO></MENSAGENS>\
                   </CONTROLE_NEGOCIAL></DADOS>";
        match svc.check_business_control(xml) {
            Err(Error::BusinessRule { code, message, .. }) => {
                assert_eq!(code, "X005");
                assert_eq!(message, "(X005) TITULO JA EXISTE");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_business_control_checksum_fallback() {
        let svc = service();
        let xml = "<DADOS><CONTROLE_NEGOCIAL><COD_RETORNO>1</COD_RETORNO>\
                   <MENSAGENS><RETORNO>ERRO NAO CATALOGADO</RETORNO></MENSAGENS>\
                   </CONTROLE_NEGOCIAL></DADOS>";
        match svc.check_business_control(xml) {
            Err(Error::BusinessRule { code, .. }) => {
                assert_eq!(code, checksum_code("ERRO NAO CATALOGADO").to_string());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_business_control_success() {
        let svc = service();
        let xml = "<DADOS><CONTROLE_NEGOCIAL><COD_RETORNO>0</COD_RETORNO></CONTROLE_NEGOCIAL>\
                   <INCLUI_BOLETO><CODIGO_BARRAS>104</CODIGO_BARRAS></INCLUI_BOLETO></DADOS>";
        assert!(svc.check_business_control(xml).is_ok());
    }

    #[test]
    fn test_top_level_error_without_control_block() {
        let svc = service();
        let xml = "<RESPOSTA><COD_RETORNO>88</COD_RETORNO><RETORNO> USUARIO INVALIDO </RETORNO></RESPOSTA>";
        match svc.check_business_control(xml) {
            Err(Error::BusinessRule { code, message, .. }) => {
                assert_eq!(code, "88");
                assert_eq!(message, "USUARIO INVALIDO");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
