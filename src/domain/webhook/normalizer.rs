//! Maps provider wire payloads into [`PaymentEvent`].
//!
//! Each provider has a fixed status table. Unrecognized statuses map to
//! `Pending` so an unknown value can never push an order into a terminal
//! state. Events that are not about a transaction normalize to `None` and
//! are acknowledged without further work.

use chrono::{FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use super::errors::WebhookError;
use super::verifier::text_field;
use crate::domain::billing::{PaymentEvent, PaymentStatus, Provider};
use crate::domain::foundation::Timestamp;

/// Wompi event type that carries a transaction.
pub const WOMPI_TRANSACTION_EVENT: &str = "transaction.updated";

const DEFAULT_CURRENCY: &str = "COP";

/// Colombia has no daylight saving; ePayco dates are local time.
const BOGOTA_OFFSET_SECS: i32 = -5 * 3600;

const WOMPI_STATUSES: &[(&str, PaymentStatus)] = &[
    ("APPROVED", PaymentStatus::Approved),
    ("DECLINED", PaymentStatus::Declined),
    ("VOIDED", PaymentStatus::Voided),
    ("ERROR", PaymentStatus::Error),
    ("PENDING", PaymentStatus::Pending),
];

const EPAYCO_RESPONSE_CODES: &[(i64, PaymentStatus)] = &[
    (1, PaymentStatus::Approved),
    (2, PaymentStatus::Declined),
    (3, PaymentStatus::Pending),
    (4, PaymentStatus::Error),
    (6, PaymentStatus::Voided),
    (7, PaymentStatus::Pending),
    (8, PaymentStatus::Pending),
    (9, PaymentStatus::Declined),
    (10, PaymentStatus::Declined),
    (11, PaymentStatus::Voided),
    (12, PaymentStatus::Declined),
];

/// Looks up a Wompi status string. Unknown or missing maps to `Pending`.
pub fn wompi_status(status: Option<&str>) -> PaymentStatus {
    status
        .and_then(|s| {
            WOMPI_STATUSES
                .iter()
                .find(|(wire, _)| wire.eq_ignore_ascii_case(s.trim()))
                .map(|(_, status)| *status)
        })
        .unwrap_or(PaymentStatus::Pending)
}

/// Looks up an ePayco `x_cod_response` code. Unknown or missing maps to `Pending`.
pub fn epayco_status(code: Option<i64>) -> PaymentStatus {
    code.and_then(|code| {
        EPAYCO_RESPONSE_CODES
            .iter()
            .find(|(wire, _)| *wire == code)
            .map(|(_, status)| *status)
    })
    .unwrap_or(PaymentStatus::Pending)
}

/// Converts decimal text such as `"50000.00"` into minor units.
///
/// Integer arithmetic only. More than two fractional digits are accepted
/// only when the extra digits are zero.
pub fn parse_minor_units(text: &str) -> Result<i64, WebhookError> {
    let malformed = || WebhookError::MalformedPayload(format!("invalid amount: {text}"));
    let text = text.trim();

    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (text, ""),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() || !all_digits(whole) || !all_digits(fraction) {
        return Err(malformed());
    }
    if fraction.len() > 2 && fraction[2..].bytes().any(|b| b != b'0') {
        return Err(malformed());
    }

    let cents: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().map_err(|_| malformed())? * 10,
        _ => fraction[..2].parse().map_err(|_| malformed())?,
    };

    whole
        .parse::<i64>()
        .ok()
        .and_then(|units| units.checked_mul(100))
        .and_then(|minor| minor.checked_add(cents))
        .ok_or_else(malformed)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn currency_code(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_CURRENCY)
        .to_ascii_uppercase()
}

// ════════════════════════════════════════════════════════════════════════════
// Wompi
// ════════════════════════════════════════════════════════════════════════════

fn wompi_occurred_at(payload: &Value, transaction: &Value) -> Timestamp {
    let from_text = |v: Option<&Value>| v.and_then(Value::as_str).and_then(Timestamp::parse_rfc3339);

    from_text(transaction.get("finalized_at"))
        .or_else(|| from_text(payload.get("sent_at")))
        .or_else(|| {
            payload
                .get("timestamp")
                .and_then(Value::as_i64)
                .and_then(Timestamp::from_unix_secs)
        })
        .unwrap_or_else(Timestamp::now)
}

/// Normalizes a Wompi event envelope.
pub fn normalize_wompi(payload: &Value) -> Result<Option<PaymentEvent>, WebhookError> {
    let event = payload.get("event").and_then(Value::as_str);
    if event != Some(WOMPI_TRANSACTION_EVENT) {
        return Ok(None);
    }

    let transaction = payload
        .get("data")
        .and_then(|data| data.get("transaction"))
        .ok_or(WebhookError::MissingField("data.transaction"))?;

    let provider_transaction_id = non_blank(text_field(transaction, "id"))
        .ok_or(WebhookError::MissingField("transaction.id"))?;
    let provider_reference = non_blank(text_field(transaction, "reference"))
        .ok_or(WebhookError::MissingField("transaction.reference"))?;

    let amount_minor_units = match transaction.get("amount_in_cents") {
        None | Some(Value::Null) => 0,
        Some(value) => value.as_i64().ok_or_else(|| {
            WebhookError::MalformedPayload("amount_in_cents is not an integer".to_string())
        })?,
    };

    Ok(Some(PaymentEvent {
        provider: Provider::Wompi,
        provider_transaction_id,
        provider_reference,
        status: wompi_status(transaction.get("status").and_then(Value::as_str)),
        amount_minor_units,
        currency: currency_code(transaction.get("currency").and_then(Value::as_str)),
        raw_payload: payload.clone(),
        occurred_at: wompi_occurred_at(payload, transaction),
    }))
}

// ════════════════════════════════════════════════════════════════════════════
// ePayco
// ════════════════════════════════════════════════════════════════════════════

fn epayco_occurred_at(payload: &Value) -> Timestamp {
    let Some(text) = text_field(payload, "x_transaction_date") else {
        return Timestamp::now();
    };
    let Some(offset) = FixedOffset::east_opt(BOGOTA_OFFSET_SECS) else {
        return Timestamp::now();
    };

    NaiveDateTime::parse_from_str(text.trim(), "%Y-%m-%d %H:%M:%S")
        .ok()
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .map(|dt| Timestamp::from_datetime(dt.with_timezone(&Utc)))
        .unwrap_or_else(Timestamp::now)
}

/// Normalizes an ePayco confirmation body.
pub fn normalize_epayco(payload: &Value) -> Result<Option<PaymentEvent>, WebhookError> {
    if !payload.is_object() {
        return Err(WebhookError::MalformedPayload(
            "confirmation body is not an object".to_string(),
        ));
    }

    let provider_transaction_id = non_blank(text_field(payload, "x_ref_payco"))
        .ok_or(WebhookError::MissingField("x_ref_payco"))?;
    let provider_reference = non_blank(text_field(payload, "x_id_invoice"))
        .or_else(|| non_blank(text_field(payload, "x_extra1")))
        .ok_or(WebhookError::MissingField("x_id_invoice"))?;
    let amount = text_field(payload, "x_amount").ok_or(WebhookError::MissingField("x_amount"))?;

    let code = text_field(payload, "x_cod_response")
        .or_else(|| text_field(payload, "x_cod_transaction_state"))
        .and_then(|code| code.trim().parse::<i64>().ok());

    Ok(Some(PaymentEvent {
        provider: Provider::Epayco,
        provider_transaction_id,
        provider_reference,
        status: epayco_status(code),
        amount_minor_units: parse_minor_units(&amount)?,
        currency: currency_code(text_field(payload, "x_currency_code").as_deref()),
        raw_payload: payload.clone(),
        occurred_at: epayco_occurred_at(payload),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wompi_envelope(status: &str) -> Value {
        json!({
            "event": "transaction.updated",
            "data": {
                "transaction": {
                    "id": "tx_1",
                    "reference": "SUB-12345678-1700000000-ab12",
                    "status": status,
                    "amount_in_cents": 5000000,
                    "currency": "COP"
                }
            },
            "sent_at": "2024-01-15T15:00:00.000Z",
            "timestamp": 1705330800
        })
    }

    // ══════════════════════════════════════════════════════════════
    // Status Table Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn wompi_status_table() {
        assert_eq!(wompi_status(Some("APPROVED")), PaymentStatus::Approved);
        assert_eq!(wompi_status(Some("DECLINED")), PaymentStatus::Declined);
        assert_eq!(wompi_status(Some("VOIDED")), PaymentStatus::Voided);
        assert_eq!(wompi_status(Some("ERROR")), PaymentStatus::Error);
        assert_eq!(wompi_status(Some("PENDING")), PaymentStatus::Pending);
    }

    #[test]
    fn wompi_unknown_status_is_pending() {
        assert_eq!(wompi_status(Some("SOMETHING_NEW")), PaymentStatus::Pending);
        assert_eq!(wompi_status(None), PaymentStatus::Pending);
    }

    #[test]
    fn epayco_response_code_table() {
        assert_eq!(epayco_status(Some(1)), PaymentStatus::Approved);
        assert_eq!(epayco_status(Some(2)), PaymentStatus::Declined);
        assert_eq!(epayco_status(Some(3)), PaymentStatus::Pending);
        assert_eq!(epayco_status(Some(4)), PaymentStatus::Error);
        assert_eq!(epayco_status(Some(6)), PaymentStatus::Voided);
        assert_eq!(epayco_status(Some(11)), PaymentStatus::Voided);
        assert_eq!(epayco_status(Some(12)), PaymentStatus::Declined);
    }

    #[test]
    fn epayco_unknown_code_is_pending() {
        assert_eq!(epayco_status(Some(99)), PaymentStatus::Pending);
        assert_eq!(epayco_status(None), PaymentStatus::Pending);
    }

    // ══════════════════════════════════════════════════════════════
    // Amount Parsing Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parses_decimal_amounts() {
        assert_eq!(parse_minor_units("50000.00").unwrap(), 5_000_000);
        assert_eq!(parse_minor_units("50000").unwrap(), 5_000_000);
        assert_eq!(parse_minor_units("1.5").unwrap(), 150);
        assert_eq!(parse_minor_units("0.07").unwrap(), 7);
        assert_eq!(parse_minor_units("12.3400").unwrap(), 1234);
    }

    #[test]
    fn rejects_bad_amounts() {
        assert!(parse_minor_units("").is_err());
        assert!(parse_minor_units("-5").is_err());
        assert!(parse_minor_units("1,000.00").is_err());
        assert!(parse_minor_units("1.005").is_err());
        assert!(parse_minor_units(".50").is_err());
        assert!(parse_minor_units("99999999999999999999").is_err());
    }

    // ══════════════════════════════════════════════════════════════
    // Wompi Normalization Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn wompi_transaction_normalizes() {
        let payload = wompi_envelope("APPROVED");
        let event = normalize_wompi(&payload).unwrap().unwrap();

        assert_eq!(event.provider, Provider::Wompi);
        assert_eq!(event.provider_transaction_id, "tx_1");
        assert_eq!(event.provider_reference, "SUB-12345678-1700000000-ab12");
        assert_eq!(event.status, PaymentStatus::Approved);
        assert_eq!(event.amount_minor_units, 5_000_000);
        assert_eq!(event.currency, "COP");
        assert_eq!(event.raw_payload, payload);
        assert_eq!(event.occurred_at, Timestamp::parse_rfc3339("2024-01-15T15:00:00Z").unwrap());
    }

    #[test]
    fn wompi_non_transaction_event_is_none() {
        let payload = json!({"event": "nequi_token.updated", "data": {"nequi_token": {}}});
        assert!(normalize_wompi(&payload).unwrap().is_none());
    }

    #[test]
    fn wompi_missing_transaction_id_is_error() {
        let mut payload = wompi_envelope("APPROVED");
        payload["data"]["transaction"].as_object_mut().unwrap().remove("id");

        let err = normalize_wompi(&payload).unwrap_err();
        assert!(matches!(err, WebhookError::MissingField("transaction.id")));
    }

    #[test]
    fn wompi_unknown_status_does_not_fail() {
        let payload = wompi_envelope("IN_REVIEW");
        let event = normalize_wompi(&payload).unwrap().unwrap();
        assert_eq!(event.status, PaymentStatus::Pending);
    }

    // ══════════════════════════════════════════════════════════════
    // ePayco Normalization Tests
    // ══════════════════════════════════════════════════════════════

    fn epayco_body() -> Value {
        json!({
            "x_ref_payco": "98765",
            "x_transaction_id": "TX-1",
            "x_amount": "50000.00",
            "x_currency_code": "cop",
            "x_cod_response": "1",
            "x_id_invoice": "ORD-abc",
            "x_transaction_date": "2024-01-15 10:00:00"
        })
    }

    #[test]
    fn epayco_confirmation_normalizes() {
        let event = normalize_epayco(&epayco_body()).unwrap().unwrap();

        assert_eq!(event.provider, Provider::Epayco);
        assert_eq!(event.provider_transaction_id, "98765");
        assert_eq!(event.provider_reference, "ORD-abc");
        assert_eq!(event.status, PaymentStatus::Approved);
        assert_eq!(event.amount_minor_units, 5_000_000);
        assert_eq!(event.currency, "COP");
        assert_eq!(event.occurred_at, Timestamp::parse_rfc3339("2024-01-15T15:00:00Z").unwrap());
    }

    #[test]
    fn epayco_reference_falls_back_to_extra1() {
        let mut body = epayco_body();
        body["x_id_invoice"] = json!("");
        body["x_extra1"] = json!("SUB-12345678-1-ab12");

        let event = normalize_epayco(&body).unwrap().unwrap();
        assert_eq!(event.provider_reference, "SUB-12345678-1-ab12");
    }

    #[test]
    fn epayco_numeric_code_is_read() {
        let mut body = epayco_body();
        body["x_cod_response"] = json!(2);

        let event = normalize_epayco(&body).unwrap().unwrap();
        assert_eq!(event.status, PaymentStatus::Declined);
    }

    #[test]
    fn epayco_missing_ref_payco_is_error() {
        let mut body = epayco_body();
        body.as_object_mut().unwrap().remove("x_ref_payco");

        let err = normalize_epayco(&body).unwrap_err();
        assert!(matches!(err, WebhookError::MissingField("x_ref_payco")));
    }

    #[test]
    fn epayco_non_object_is_malformed() {
        let err = normalize_epayco(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, WebhookError::MalformedPayload(_)));
    }
}
