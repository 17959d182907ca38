use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Oldest signed timestamp accepted, in seconds.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("webhook secret not configured")]
    MissingSecret,

    #[error("malformed signature header")]
    MalformedHeader,

    #[error("no v1 signature in header")]
    NoSignatures,

    #[error("signature timestamp outside tolerance")]
    TimestampOutOfTolerance,

    #[error("no signature matches the payload")]
    Mismatch,
}

/// Parsed `Stripe-Signature` header: `t=<unix>,v1=<hex>[,v1=<hex>...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part.trim().split_once('=').ok_or(SignatureError::MalformedHeader)?;
            match key {
                "t" => {
                    timestamp = Some(value.parse::<i64>().map_err(|_| SignatureError::MalformedHeader)?);
                }
                // Undecodable entries are ignored like any other scheme.
                "v1" => {
                    if let Ok(bytes) = hex::decode(value) {
                        signatures.push(bytes);
                    }
                }
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
        if signatures.is_empty() {
            return Err(SignatureError::NoSignatures);
        }

        Ok(Self { timestamp, signatures })
    }
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, SignatureError> {
    let mac = signed_mac(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a webhook delivery. `now` is unix seconds.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::MissingSecret);
    }

    let parsed = SignatureHeader::parse(header)?;

    if tolerance_secs > 0 {
        let skew = now.checked_sub(parsed.timestamp).map(i64::unsigned_abs);
        if skew.map_or(true, |skew| skew > tolerance_secs.unsigned_abs()) {
            return Err(SignatureError::TimestampOutOfTolerance);
        }
    }

    let matched = parsed.signatures.iter().any(|candidate| {
        signed_mac(secret, parsed.timestamp, payload)
            .map(|mac| mac.verify_slice(candidate).is_ok())
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

fn signed_mac(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::MissingSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}
