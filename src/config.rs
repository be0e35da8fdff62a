//! Library configuration file.
//!
//! The TOML layout mirrors the domain but keeps amounts in dollars, as they
//! appear on the fee notice. `LibraryConfigToml::into_config` validates the file
//! and converts it into cents-based domain types.
//!
//! ```toml
//! [fees.overdue]
//! per_day = "0.25"
//! grace_period_days = 2
//! max_days = 30
//! max_amount = "10.00"
//!
//! [fees.lost]
//! basis = "percentage"
//! rate = "100"
//! minimum = "5.00"
//!
//! [fees.damaged]
//! basis = "fixed"
//! amount = "7.50"
//!
//! [[membership_types]]
//! id = 1
//! name = "Standard"
//! max_books = 3
//! loan_period_days = 14
//! renewal_limit = 2
//! ```

use crate::domain::catalog::{Book, Borrower, MembershipType};
use crate::domain::fees::{FeeSchedule, FineBasis, OverduePolicy, ReplacementPolicy};
use crate::domain::invoice::InvoiceTerms;
use crate::domain::money::Money;
use crate::error::{LibraryError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Limits applied when a borrower asks for new books.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CirculationPolicy {
    /// Borrowing is refused while unpaid fines exceed this amount.
    pub max_outstanding_balance: Option<Money>,
}

/// Validated configuration, ready to seed the stores.
#[derive(Debug, Clone, Default)]
pub struct LibraryConfig {
    pub fees: FeeSchedule,
    pub invoicing: InvoiceTerms,
    pub circulation: CirculationPolicy,
    pub membership_types: Vec<MembershipType>,
    pub books: Vec<Book>,
    pub borrowers: Vec<Borrower>,
}

impl LibraryConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
            .map_err(|e| LibraryError::ConfigError(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let file: LibraryConfigToml =
            toml::from_str(raw).map_err(|e| LibraryError::ConfigError(e.to_string()))?;
        file.into_config()
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LibraryConfigToml {
    #[serde(default)]
    pub fees: FeesToml,
    #[serde(default)]
    pub invoicing: InvoicingToml,
    #[serde(default)]
    pub circulation: CirculationToml,
    #[serde(default)]
    pub membership_types: Vec<MembershipTypeToml>,
    #[serde(default)]
    pub books: Vec<BookToml>,
    #[serde(default)]
    pub borrowers: Vec<BorrowerToml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeesToml {
    #[serde(default)]
    pub overdue: OverdueToml,
    #[serde(default = "ReplacementToml::full_price")]
    pub lost: ReplacementToml,
    #[serde(default = "ReplacementToml::half_price")]
    pub damaged: ReplacementToml,
}

impl Default for FeesToml {
    fn default() -> Self {
        Self {
            overdue: OverdueToml::default(),
            lost: ReplacementToml::full_price(),
            damaged: ReplacementToml::half_price(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverdueToml {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Dollars per chargeable day.
    #[serde(default = "default_per_day")]
    pub per_day: Decimal,
    #[serde(default)]
    pub grace_period_days: u32,
    #[serde(default)]
    pub max_days: Option<u32>,
    #[serde(default)]
    pub max_amount: Option<Decimal>,
}

impl Default for OverdueToml {
    fn default() -> Self {
        Self {
            enabled: true,
            per_day: default_per_day(),
            grace_period_days: 0,
            max_days: None,
            max_amount: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_per_day() -> Decimal {
    Decimal::new(25, 2)
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum BasisToml {
    Fixed,
    Percentage,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplacementToml {
    pub basis: BasisToml,
    /// Dollars, required for `fixed`.
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Percent of the book price, required for `percentage`.
    #[serde(default)]
    pub rate: Option<Decimal>,
    #[serde(default)]
    pub minimum: Option<Decimal>,
    #[serde(default)]
    pub maximum: Option<Decimal>,
}

impl ReplacementToml {
    fn full_price() -> Self {
        Self::percentage(Decimal::ONE_HUNDRED)
    }

    fn half_price() -> Self {
        Self::percentage(Decimal::from(50))
    }

    fn percentage(rate: Decimal) -> Self {
        Self {
            basis: BasisToml::Percentage,
            amount: None,
            rate: Some(rate),
            minimum: None,
            maximum: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvoicingToml {
    #[serde(default = "default_prefix")]
    pub number_prefix: String,
    #[serde(default = "default_terms")]
    pub payment_terms_days: u32,
}

impl Default for InvoicingToml {
    fn default() -> Self {
        Self {
            number_prefix: default_prefix(),
            payment_terms_days: default_terms(),
        }
    }
}

/// Upper bound on invoice payment terms, in days.
const MAX_PAYMENT_TERMS_DAYS: u32 = 3650;

fn default_prefix() -> String {
    "INV".to_string()
}

fn default_terms() -> u32 {
    14
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CirculationToml {
    #[serde(default)]
    pub max_outstanding_balance: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MembershipTypeToml {
    pub id: u32,
    pub name: String,
    pub max_books: u32,
    pub loan_period_days: u32,
    #[serde(default)]
    pub renewal_limit: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookToml {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub isbn: Option<String>,
    pub price: Decimal,
    #[serde(default = "default_copies")]
    pub copies: u32,
}

fn default_copies() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BorrowerToml {
    pub id: u32,
    pub name: String,
    pub membership_type: u32,
    #[serde(default)]
    pub membership_expires: Option<NaiveDate>,
}

impl LibraryConfigToml {
    pub fn into_config(self) -> Result<LibraryConfig> {
        let fees = self.fees.into_schedule()?;
        if self.invoicing.number_prefix.trim().is_empty() {
            return Err(LibraryError::ConfigError(
                "invoicing.number_prefix must not be empty".to_string(),
            ));
        }
        if self.invoicing.payment_terms_days > MAX_PAYMENT_TERMS_DAYS {
            return Err(LibraryError::ConfigError(format!(
                "invoicing.payment_terms_days must be at most {MAX_PAYMENT_TERMS_DAYS}"
            )));
        }

        let membership_types: Vec<MembershipType> = self
            .membership_types
            .into_iter()
            .map(|m| MembershipType {
                id: m.id,
                name: m.name,
                max_books: m.max_books,
                loan_period_days: m.loan_period_days,
                renewal_limit: m.renewal_limit,
            })
            .collect();
        ensure_unique("membership type", membership_types.iter().map(|m| m.id))?;
        let known_types: HashSet<u32> = membership_types.iter().map(|m| m.id).collect();

        let books = self
            .books
            .into_iter()
            .map(|b| {
                Ok(Book {
                    id: b.id,
                    title: b.title,
                    isbn: b.isbn,
                    price: non_negative(&format!("books[{}].price", b.id), b.price)?,
                    copies_available: b.copies,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        ensure_unique("book", books.iter().map(|b| b.id))?;

        let borrowers = self
            .borrowers
            .into_iter()
            .map(|b| {
                if !known_types.contains(&b.membership_type) {
                    return Err(LibraryError::ConfigError(format!(
                        "borrower {} references unknown membership type {}",
                        b.id, b.membership_type
                    )));
                }
                Ok(Borrower {
                    id: b.id,
                    name: b.name,
                    membership_type: b.membership_type,
                    membership_expires: b.membership_expires,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        ensure_unique("borrower", borrowers.iter().map(|b| b.id))?;

        Ok(LibraryConfig {
            fees,
            invoicing: InvoiceTerms {
                number_prefix: self.invoicing.number_prefix,
                payment_terms_days: self.invoicing.payment_terms_days,
            },
            circulation: CirculationPolicy {
                max_outstanding_balance: optional_amount(
                    "circulation.max_outstanding_balance",
                    self.circulation.max_outstanding_balance,
                )?,
            },
            membership_types,
            books,
            borrowers,
        })
    }
}

impl FeesToml {
    fn into_schedule(self) -> Result<FeeSchedule> {
        let overdue = OverduePolicy {
            enabled: self.overdue.enabled,
            per_day: non_negative("fees.overdue.per_day", self.overdue.per_day)?,
            grace_period_days: self.overdue.grace_period_days,
            max_days: self.overdue.max_days,
            max_amount: optional_amount("fees.overdue.max_amount", self.overdue.max_amount)?,
        };
        Ok(FeeSchedule {
            overdue,
            lost: self.lost.into_policy("fees.lost")?,
            damaged: self.damaged.into_policy("fees.damaged")?,
        })
    }
}

impl ReplacementToml {
    fn into_policy(self, section: &str) -> Result<ReplacementPolicy> {
        let basis = match self.basis {
            BasisToml::Fixed => {
                let amount = self.amount.ok_or_else(|| {
                    LibraryError::ConfigError(format!(
                        "{section}.amount is required for a fixed fine"
                    ))
                })?;
                FineBasis::Fixed(non_negative(&format!("{section}.amount"), amount)?)
            }
            BasisToml::Percentage => {
                let rate = self.rate.ok_or_else(|| {
                    LibraryError::ConfigError(format!(
                        "{section}.rate is required for a percentage fine"
                    ))
                })?;
                if rate.is_sign_negative() {
                    return Err(LibraryError::ConfigError(format!(
                        "{section}.rate must not be negative"
                    )));
                }
                FineBasis::Percentage(rate)
            }
        };
        Ok(ReplacementPolicy {
            basis,
            minimum: optional_amount(&format!("{section}.minimum"), self.minimum)?,
            maximum: optional_amount(&format!("{section}.maximum"), self.maximum)?,
        })
    }
}

fn non_negative(field: &str, dollars: Decimal) -> Result<Money> {
    let money = Money::from_dollars(dollars)
        .map_err(|e| LibraryError::ConfigError(format!("{field}: {e}")))?;
    if money < Money::ZERO {
        return Err(LibraryError::ConfigError(format!(
            "{field} must not be negative"
        )));
    }
    Ok(money)
}

fn optional_amount(field: &str, dollars: Option<Decimal>) -> Result<Option<Money>> {
    dollars.map(|d| non_negative(field, d)).transpose()
}

fn ensure_unique(entity: &'static str, ids: impl Iterator<Item = u32>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(LibraryError::Duplicate { entity, id });
        }
    }
    Ok(())
}
