//! Webhook signature verification.
//!
//! Three schemes are supported:
//!
//! - **Wompi**: the signature travels inside the JSON body. The listed
//!   `signature.properties` are read from `data`, concatenated, followed by
//!   the top-level `timestamp` and the events secret, then SHA-256'd.
//! - **ePayco**: SHA-256 over `cust_id^p_key^ref_payco^transaction_id^amount^currency`,
//!   compared to `x_signature`.
//! - **HMAC header**: `sha256=<hex>` of HMAC-SHA256(secret, raw body). Used by
//!   the messaging webhook (`x-webhook-signature`) and Meta Cloud
//!   (`x-hub-signature-256`).
//!
//! Every function here is pure and answers `false` on any decode problem.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Header carrying the messaging webhook signature.
pub const MESSAGING_SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Header carrying the Meta Cloud API signature.
pub const META_SIGNATURE_HEADER: &str = "x-hub-signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Performs constant-time comparison of two byte slices.
///
/// Slices of different length compare unequal immediately; the length of a
/// hex digest is not secret.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Lowercase hex SHA-256 of `input`.
pub fn sha256_hex(input: &[u8]) -> String {
    hex::encode(Sha256::digest(input))
}

fn hmac_sha256(secret: &[u8], body: &[u8]) -> Option<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).ok()?;
    mac.update(body);
    Some(mac.finalize().into_bytes().to_vec())
}

// ════════════════════════════════════════════════════════════════════════════
// HMAC header scheme
// ════════════════════════════════════════════════════════════════════════════

/// Produces the `sha256=<hex>` header value for `body`.
///
/// Used by callers that sign outbound test deliveries, and by the tests.
pub fn sign_hmac_header(secret: &str, body: &[u8]) -> String {
    let digest = hmac_sha256(secret.as_bytes(), body).unwrap_or_default();
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(digest))
}

/// Verifies a `sha256=<hex>` signature header against the raw body.
pub fn verify_hmac_header(raw_body: &[u8], header: &str, secret: &str) -> bool {
    let Some(provided) = header.trim().strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Some(expected) = hmac_sha256(secret.as_bytes(), raw_body) else {
        return false;
    };
    let expected_hex = hex::encode(expected);

    constant_time_eq(
        expected_hex.as_bytes(),
        provided.to_ascii_lowercase().as_bytes(),
    )
}

/// Opt-in verification for the messaging webhook.
///
/// With no secret configured every request is accepted. With a secret, the
/// header must be present and must match.
pub fn verify_optional_hmac_header(
    raw_body: &[u8],
    header: Option<&str>,
    secret: Option<&str>,
) -> bool {
    match (secret, header) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(secret), Some(header)) => verify_hmac_header(raw_body, header, secret),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Wompi checksum
// ════════════════════════════════════════════════════════════════════════════

/// Walks a dotted path such as `transaction.amount_in_cents` into `root`.
fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(root, |node, segment| node.as_object()?.get(segment))
}

/// Renders a JSON value the way it is concatenated into the checksum input.
fn checksum_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Computes the Wompi checksum for `data`.
///
/// Properties absent from `data` are skipped rather than rejected; Wompi
/// may list properties it omits from some event shapes.
pub fn wompi_checksum(data: &Value, properties: &[&str], timestamp: &str, secret: &str) -> String {
    let mut input = String::new();
    for property in properties {
        if let Some(value) = lookup_path(data, property) {
            input.push_str(&checksum_text(value));
        }
    }
    input.push_str(timestamp);
    input.push_str(secret);

    sha256_hex(input.as_bytes())
}

/// Verifies the checksum embedded in a Wompi event body.
pub fn verify_wompi_checksum(raw_body: &[u8], secret: &str) -> bool {
    let Ok(payload) = serde_json::from_slice::<Value>(raw_body) else {
        return false;
    };

    let Some(data) = payload.get("data") else {
        return false;
    };
    let Some(signature) = payload.get("signature") else {
        return false;
    };
    let Some(checksum) = signature.get("checksum").and_then(Value::as_str) else {
        return false;
    };
    let Some(properties) = signature.get("properties").and_then(Value::as_array) else {
        return false;
    };
    let timestamp = match payload.get("timestamp") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => return false,
    };

    let properties: Vec<&str> = properties.iter().filter_map(Value::as_str).collect();
    let expected = wompi_checksum(data, &properties, &timestamp, secret);

    constant_time_eq(
        expected.as_bytes(),
        checksum.to_ascii_lowercase().as_bytes(),
    )
}

// ════════════════════════════════════════════════════════════════════════════
// ePayco signature
// ════════════════════════════════════════════════════════════════════════════

/// Reads a field that ePayco may send as either a string or a number.
pub(crate) fn text_field(payload: &Value, name: &str) -> Option<String> {
    match payload.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Computes the ePayco confirmation signature.
pub fn epayco_signature(
    customer_id: &str,
    p_key: &str,
    ref_payco: &str,
    transaction_id: &str,
    amount: &str,
    currency: &str,
) -> String {
    let input = [customer_id, p_key, ref_payco, transaction_id, amount, currency].join("^");
    sha256_hex(input.as_bytes())
}

/// Verifies `x_signature` on an ePayco confirmation body.
pub fn verify_epayco_signature(payload: &Value, customer_id: &str, p_key: &str) -> bool {
    let fields = [
        "x_ref_payco",
        "x_transaction_id",
        "x_amount",
        "x_currency_code",
        "x_signature",
    ];
    let Some(values) = fields
        .iter()
        .map(|name| text_field(payload, name))
        .collect::<Option<Vec<String>>>()
    else {
        return false;
    };

    let expected = epayco_signature(
        customer_id,
        p_key,
        &values[0],
        &values[1],
        &values[2],
        &values[3],
    );

    constant_time_eq(
        expected.as_bytes(),
        values[4].to_ascii_lowercase().as_bytes(),
    )
}
