//! Static PIX payment code (BR Code) rendering

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{crc, tlv};
use crate::domain::DomainError;

const PAYLOAD_FORMAT_INDICATOR: u8 = 0;
const MERCHANT_ACCOUNT_INFORMATION: u8 = 26;
const MERCHANT_CATEGORY_CODE: u8 = 52;
const TRANSACTION_CURRENCY: u8 = 53;
const TRANSACTION_AMOUNT: u8 = 54;
const COUNTRY_CODE: u8 = 58;
const MERCHANT_NAME: u8 = 59;
const MERCHANT_CITY: u8 = 60;
const ADDITIONAL_DATA: u8 = 62;

const GUI_TAG: u8 = 0;
const PAYEE_KEY_TAG: u8 = 1;
const REFERENCE_LABEL_TAG: u8 = 5;

const PIX_GUI: &str = "BR.GOV.BCB.PIX";
/// ISO 4217 numeric code for BRL
const CURRENCY_BRL: &str = "986";
const REFERENCE_LABEL: &str = "***";
const CHECKSUM_HEADER: &str = "6304";

/// Longest amount the transaction amount field accepts
const MAX_AMOUNT_LENGTH: usize = 13;

/// Validate a currency amount: positive, at most two fractional digits
pub fn validate_amount(amount: Decimal) -> Result<(), DomainError> {
    if amount <= Decimal::ZERO {
        return Err(DomainError::invalid_amount(format!(
            "Amount must be positive, got {}",
            amount
        )));
    }

    if amount.normalize().scale() > 2 {
        return Err(DomainError::invalid_amount(format!(
            "Amount must have at most two decimal places, got {}",
            amount
        )));
    }

    Ok(())
}

/// Amount with exactly two fractional digits, e.g. `20.00`
pub fn format_amount(amount: Decimal) -> String {
    let mut amount = amount;
    amount.rescale(2);
    amount.to_string()
}

/// Renders amounts into static PIX payloads for one payee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixCodeEncoder {
    payee_key: String,
    merchant_name: String,
    merchant_city: String,
}

impl PixCodeEncoder {
    /// Encoder with placeholder merchant name and city
    pub fn new(payee_key: impl Into<String>) -> Self {
        Self {
            payee_key: payee_key.into(),
            merchant_name: "N".to_string(),
            merchant_city: "C".to_string(),
        }
    }

    pub fn with_merchant_name(mut self, name: impl Into<String>) -> Self {
        self.merchant_name = name.into();
        self
    }

    pub fn with_merchant_city(mut self, city: impl Into<String>) -> Self {
        self.merchant_city = city.into();
        self
    }

    pub fn payee_key(&self) -> &str {
        &self.payee_key
    }

    /// Check that every configured field fits its TLV slot
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.payee_key.trim().is_empty() {
            return Err(DomainError::configuration("PIX payee key is not configured"));
        }

        for (name, value) in [
            ("merchant name", &self.merchant_name),
            ("merchant city", &self.merchant_city),
        ] {
            if value.is_empty() || !value.is_ascii() {
                return Err(DomainError::configuration(format!(
                    "PIX {} must be non-empty ASCII",
                    name
                )));
            }
        }

        self.merchant_account_information()
            .map(|_| ())
            .map_err(|e| DomainError::configuration(e.to_string()))
    }

    /// Render the payload for `amount`, checksum included
    pub fn encode(&self, amount: Decimal) -> Result<String, DomainError> {
        validate_amount(amount)?;

        let amount = format_amount(amount);
        if amount.len() > MAX_AMOUNT_LENGTH {
            return Err(DomainError::invalid_amount(format!(
                "Amount {} exceeds {} characters",
                amount, MAX_AMOUNT_LENGTH
            )));
        }

        let mut payload = String::new();
        payload.push_str(&tlv::field(PAYLOAD_FORMAT_INDICATOR, "01")?);
        payload.push_str(&self.merchant_account_information()?);
        payload.push_str(&tlv::field(MERCHANT_CATEGORY_CODE, "0000")?);
        payload.push_str(&tlv::field(TRANSACTION_CURRENCY, CURRENCY_BRL)?);
        payload.push_str(&tlv::field(TRANSACTION_AMOUNT, &amount)?);
        payload.push_str(&tlv::field(COUNTRY_CODE, "BR")?);
        payload.push_str(&tlv::field(MERCHANT_NAME, &self.merchant_name)?);
        payload.push_str(&tlv::field(MERCHANT_CITY, &self.merchant_city)?);
        payload.push_str(&tlv::nested(
            ADDITIONAL_DATA,
            &[(REFERENCE_LABEL_TAG, REFERENCE_LABEL)],
        )?);
        payload.push_str(CHECKSUM_HEADER);

        let checksum = crc::checksum_hex(&payload);
        payload.push_str(&checksum);

        Ok(payload)
    }

    fn merchant_account_information(&self) -> Result<String, DomainError> {
        tlv::nested(
            MERCHANT_ACCOUNT_INFORMATION,
            &[(GUI_TAG, PIX_GUI), (PAYEE_KEY_TAG, &self.payee_key)],
        )
    }
}
