//! End-to-end registration flow against a mocked SIBAR barramento

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use boleto_adapters::banks::CaixaService;
use boleto_adapters::config::CaixaConfig;
use boleto_adapters::entity::{Beneficiary, Payer};
use boleto_adapters::{BoletoService, Error};

fn service(server_url: &str) -> CaixaService {
    let mut config = CaixaConfig::default();
    config.url = format!("{server_url}/sibar/Boleto/Externo");

    let mut svc = CaixaService::new();
    svc.set_config(config)
        .set_due_date(NaiveDate::from_ymd_opt(2024, 11, 30).unwrap())
        .set_issue_date(NaiveDate::from_ymd_opt(2024, 11, 1).unwrap())
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

fn success_envelope() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Body>
    <SERVICO_SAIDA>
      <DADOS>
        <CONTROLE_NEGOCIAL>
          <ORIGEM_RETORNO>SIGCB</ORIGEM_RETORNO>
          <COD_RETORNO>0</COD_RETORNO>
        </CONTROLE_NEGOCIAL>
        <INCLUI_BOLETO>
          <CODIGO_BARRAS>10491848800000100001234560000800000000230101</CODIGO_BARRAS>
          <LINHA_DIGITAVEL>10491234580000800000300023010107184880000010000</LINHA_DIGITAVEL>
          <QRCODE>00020101021226830014br.gov.bcb.pix</QRCODE>
        </INCLUI_BOLETO>
      </DADOS>
    </SERVICO_SAIDA>
  </soapenv:Body>
</soapenv:Envelope>"#
        .to_string()
}

fn rejection_envelope() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Body>
    <SERVICO_SAIDA>
      <DADOS>
        <CONTROLE_NEGOCIAL>
          <COD_RETORNO>1</COD_RETORNO>
          <MENSAGENS>
            <RETORNO>(X005) TITULO JA CADASTRADO PARA O BENEFICIARIO</RETORNO>
          </MENSAGENS>
        </CONTROLE_NEGOCIAL>
      </DADOS>
    </SERVICO_SAIDA>
  </soapenv:Body>
</soapenv:Envelope>"#
        .to_string()
}

#[tokio::test]
async fn register_parses_success_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sibar/Boleto/Externo"))
        .and(body_string_contains("<OPERACAO>INCLUI_BOLETO</OPERACAO>"))
        .and(body_string_contains("<NOSSO_NUMERO>14000080000000023</NOSSO_NUMERO>"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/xml; charset=utf-8")
                .set_body_string(success_envelope()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut svc = service(&server.uri());
    svc.register().await.expect("registration");
    assert_eq!(
        svc.barcode(),
        Some("10491848800000100001234560000800000000230101")
    );
    assert_eq!(
        svc.digitable_line(),
        Some("10491234580000800000300023010107184880000010000")
    );
    assert_eq!(svc.pix_qr_code(), Some("00020101021226830014br.gov.bcb.pix"));
}

#[tokio::test]
async fn rejection_extracts_the_parenthesized_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/xml; charset=utf-8")
                .set_body_string(rejection_envelope()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut svc = service(&server.uri());
    match svc.register().await {
        Err(Error::BusinessRule { code, message, .. }) => {
            assert_eq!(code, "X005");
            assert_eq!(message, "(X005) TITULO JA CADASTRADO PARA O BENEFICIARIO");
        }
        other => panic!("expected business-rule rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn soap_fault_surfaces_as_transport_error() {
    let server = MockServer::start().await;

    let fault = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Body>
    <soapenv:Fault>
      <faultcode>soapenv:Server</faultcode>
      <faultstring>Barramento indisponivel</faultstring>
    </soapenv:Fault>
  </soapenv:Body>
</soapenv:Envelope>"#;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(500)
                .insert_header("Content-Type", "text/xml; charset=utf-8")
                .set_body_string(fault),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut svc = service(&server.uri());
    match svc.register().await {
        Err(Error::BankApi {
            status_code,
            message,
        }) => {
            assert_eq!(status_code, 500);
            assert_eq!(message, "Barramento indisponivel");
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_payer_address_never_reaches_the_wire() {
    let server = MockServer::start().await;

    let mut svc = service(&server.uri());
    svc.set_payer(Payer::new("Fulano da Silva", "62344900187"));
    match svc.register().await {
        Err(Error::BusinessRule { code, .. }) => assert_eq!(code, "X997"),
        other => panic!("expected X997, got {other:?}"),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 0);
}
