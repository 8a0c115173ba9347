//! Domain entities shared by every bank encoder
//!
//! Plain value holders. Nothing is validated at construction time; each
//! bank encoder reads the fields it needs and fails fast on what is
//! missing for that institution.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::helper;

/// CPF (individual) or CNPJ (corporate) taxpayer document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// 11-digit individual taxpayer id
    Cpf,
    /// 14-digit corporate taxpayer id
    Cnpj,
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Cpf => write!(f, "CPF"),
            DocumentKind::Cnpj => write!(f, "CNPJ"),
        }
    }
}

/// The party that pays the boleto (sacado)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payer {
    name: String,
    document: String,
    street: String,
    number: String,
    complement: String,
    neighborhood: String,
    city: String,
    state: String,
    postal_code: String,
    phone: String,
    email: String,
}

impl Payer {
    /// New payer with the two fields every bank requires
    pub fn new(name: impl Into<String>, document: impl Into<String>) -> Self {
        Payer {
            name: name.into(),
            document: document.into(),
            ..Default::default()
        }
    }

    /// Full address in one call
    #[allow(clippy::too_many_arguments)]
    pub fn with_address(
        mut self,
        street: impl Into<String>,
        number: impl Into<String>,
        complement: impl Into<String>,
        neighborhood: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        self.street = street.into();
        self.number = number.into();
        self.complement = complement.into();
        self.neighborhood = neighborhood.into();
        self.city = city.into();
        self.state = state.into();
        self.postal_code = postal_code.into();
        self
    }

    /// Contact phone
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    /// Contact e-mail
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Payer name as provided
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Digits of the CPF/CNPJ
    pub fn document(&self) -> String {
        helper::digits(&self.document)
    }

    /// CPF/CNPJ inferred from digit count
    pub fn document_kind(&self) -> DocumentKind {
        if self.document().len() <= 11 {
            DocumentKind::Cpf
        } else {
            DocumentKind::Cnpj
        }
    }

    /// Street name
    pub fn street(&self) -> &str {
        &self.street
    }

    /// Street number
    pub fn number(&self) -> &str {
        &self.number
    }

    /// Address complement
    pub fn complement(&self) -> &str {
        &self.complement
    }

    /// Neighborhood
    pub fn neighborhood(&self) -> &str {
        &self.neighborhood
    }

    /// City
    pub fn city(&self) -> &str {
        &self.city
    }

    /// Two-letter state abbreviation
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Postal code as provided (may carry the dash)
    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    /// First five digits of the postal code
    pub fn postal_code_prefix(&self) -> String {
        let n = helper::digits(&self.postal_code);
        helper::truncate(&n, 5)
    }

    /// Last three digits of the postal code
    pub fn postal_code_suffix(&self) -> String {
        let n = helper::digits(&self.postal_code);
        if n.len() > 5 {
            n[5..].to_string()
        } else {
            String::new()
        }
    }

    /// Contact phone
    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// Contact e-mail
    pub fn email(&self) -> &str {
        &self.email
    }
}

/// The party the boleto pays into (beneficiário / cedente)
///
/// Same shape as [`Payer`] plus the split document representation some
/// banks require for branch-suffixed CNPJs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Beneficiary {
    inner: Payer,
}

impl Beneficiary {
    /// New beneficiary with name and document
    pub fn new(name: impl Into<String>, document: impl Into<String>) -> Self {
        Beneficiary {
            inner: Payer::new(name, document),
        }
    }

    /// Full address in one call
    #[allow(clippy::too_many_arguments)]
    pub fn with_address(
        mut self,
        street: impl Into<String>,
        number: impl Into<String>,
        complement: impl Into<String>,
        neighborhood: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        self.inner = self.inner.with_address(
            street,
            number,
            complement,
            neighborhood,
            city,
            state,
            postal_code,
        );
        self
    }

    /// Beneficiary name
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Digits of the CPF/CNPJ
    pub fn document(&self) -> String {
        self.inner.document()
    }

    /// CPF/CNPJ inferred from digit count
    pub fn document_kind(&self) -> DocumentKind {
        self.inner.document_kind()
    }

    /// Root of the document: first 8 digits of a CNPJ, first 9 of a CPF
    pub fn document_root(&self) -> String {
        let n = self.document();
        match self.document_kind() {
            DocumentKind::Cnpj => helper::truncate(&n, 8),
            DocumentKind::Cpf => helper::truncate(&n, 9),
        }
    }

    /// Branch (filial) digits of a CNPJ; `"0"` for a CPF
    pub fn document_branch(&self) -> String {
        let n = self.document();
        match self.document_kind() {
            DocumentKind::Cnpj if n.len() >= 12 => n[8..n.len() - 2].to_string(),
            _ => "0".to_string(),
        }
    }

    /// Check digits (last two) of the document
    pub fn document_check_digits(&self) -> String {
        let n = self.document();
        if n.len() >= 2 {
            n[n.len() - 2..].to_string()
        } else {
            n
        }
    }

    /// Address and contact accessors mirror [`Payer`]
    pub fn as_payer(&self) -> &Payer {
        &self.inner
    }
}

/// Late-payment interest (juros de mora)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    /// No interest charged
    Exempt,
    /// Fixed amount charged per day late
    Daily {
        /// Daily amount
        value: Decimal,
        /// First day interest applies
        from: NaiveDate,
    },
    /// Monthly percentage over the face value
    Monthly {
        /// Monthly rate (percent)
        rate: Decimal,
        /// First day interest applies
        from: NaiveDate,
    },
}

/// Late-payment penalty (multa); absence means no penalty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Penalty {
    /// Penalty rate (percent)
    pub rate: Decimal,
    /// First day the penalty applies
    pub from: NaiveDate,
}

impl Penalty {
    /// New percentage penalty applying from `from`
    pub fn new(rate: Decimal, from: NaiveDate) -> Self {
        Penalty { rate, from }
    }
}

/// Early-payment discount tier; position in the sequence selects the
/// first/second/third slot in bank payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discount {
    /// Fixed amount off, valid until the given date
    FixedAmount {
        /// Amount off
        value: Decimal,
        /// Last day the tier applies
        until: NaiveDate,
    },
    /// Percentage off, valid until the given date
    Percentage {
        /// Rate off (percent)
        rate: Decimal,
        /// Last day the tier applies
        until: NaiveDate,
    },
}

impl Discount {
    /// Expiration date of the tier
    pub fn until(&self) -> NaiveDate {
        match self {
            Discount::FixedAmount { until, .. } | Discount::Percentage { until, .. } => *until,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_kind_from_length() {
        assert_eq!(
            Payer::new("Fulano", "623.449.001-87").document_kind(),
            DocumentKind::Cpf
        );
        assert_eq!(
            Payer::new("Empresa", "68.542.653/1018-38").document_kind(),
            DocumentKind::Cnpj
        );
    }

    #[test]
    fn test_document_strips_mask() {
        let p = Payer::new("Fulano", "623.449.001-87");
        assert_eq!(p.document(), "62344900187");
    }

    #[test]
    fn test_beneficiary_cnpj_split() {
        let b = Beneficiary::new("Empresa", "68542653101838");
        assert_eq!(b.document_root(), "68542653");
        assert_eq!(b.document_branch(), "1018");
        assert_eq!(b.document_check_digits(), "38");
    }

    #[test]
    fn test_beneficiary_cpf_split() {
        let b = Beneficiary::new("Fulano", "62344900187");
        assert_eq!(b.document_root(), "623449001");
        assert_eq!(b.document_branch(), "0");
        assert_eq!(b.document_check_digits(), "87");
    }

    #[test]
    fn test_postal_code_split() {
        let p = Payer::new("Fulano", "62344900187").with_address(
            "Rua Antenor Guirlanda",
            "15",
            "",
            "Casa Verde",
            "São Paulo",
            "SP",
            "02514-010",
        );
        assert_eq!(p.postal_code_prefix(), "02514");
        assert_eq!(p.postal_code_suffix(), "010");
    }
}
