//! Certificate decoding into the columns the certificate model stores.
//!
//! The X.509 parsing itself is done by `x509-parser`; this module only
//! extracts and normalizes the fields we keep.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

use crate::error::ParseError;
use crate::parse::san::general_name_values;
use crate::parse::x509_name::DnAttributes;
use crate::types::PublicKeyAlgorithm;

const OID_DH_PUBLIC_NUMBER: &str = "1.2.840.10046.2.1";
const PEM_LABEL: &str = "CERTIFICATE";
const PEM_LINE_WIDTH: usize = 64;

/// Everything the certificate model records about one certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertInfo {
    /// Lowercase hex without separators.
    pub serial: String,
    pub version: u32,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub subject: DnAttributes,
    pub issuer: DnAttributes,
    pub self_signed: bool,
    pub public_key_algorithm: PublicKeyAlgorithm,
    pub public_key_size: u32,
    pub signing_algorithm: String,
    pub subject_alt_names: Vec<String>,
    pub sha1_fingerprint: String,
    pub sha256_fingerprint: String,
    pub der: Vec<u8>,
}

impl CertInfo {
    pub fn from_der(der: &[u8]) -> Result<Self, ParseError> {
        let (_, cert) = parse_x509_certificate(der)
            .map_err(|e| ParseError::InvalidCertificate(e.to_string()))?;
        Self::from_x509(&cert, der)
    }

    pub fn from_pem(pem: &str) -> Result<Self, ParseError> {
        let der = pem_to_der(pem)?;
        Self::from_der(&der)
    }

    /// Decode a certificate given as PEM text or raw DER bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        Self::from_der(&der_from_bytes(bytes)?)
    }

    /// Extract the stored fields from an already parsed certificate whose
    /// encoding is `der`.
    pub fn from_x509(cert: &X509Certificate<'_>, der: &[u8]) -> Result<Self, ParseError> {
        let (public_key_algorithm, public_key_size) = public_key_info(cert)?;

        let subject_alt_names = cert
            .subject_alternative_name()
            .map_err(|e| ParseError::InvalidCertificate(e.to_string()))?
            .map(|ext| general_name_values(&ext.value.general_names))
            .unwrap_or_default();

        Ok(Self {
            serial: cert.raw_serial_as_string().replace(':', "").to_lowercase(),
            version: cert.version().0 + 1,
            not_before: asn1_time_to_utc(&cert.validity().not_before),
            not_after: asn1_time_to_utc(&cert.validity().not_after),
            subject: DnAttributes::from_x509_name(cert.subject())?,
            issuer: DnAttributes::from_x509_name(cert.issuer())?,
            self_signed: cert.subject().as_raw() == cert.issuer().as_raw(),
            public_key_algorithm,
            public_key_size,
            signing_algorithm: signature_algorithm_name(
                &cert.signature_algorithm.algorithm.to_id_string(),
            ),
            subject_alt_names,
            sha1_fingerprint: hex::encode(Sha1::digest(der)),
            sha256_fingerprint: sha256_fingerprint(der),
            der: der.to_vec(),
        })
    }

    pub fn to_pem(&self) -> String {
        der_to_pem(&self.der)
    }
}

fn asn1_time_to_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}

fn public_key_info(cert: &X509Certificate<'_>) -> Result<(PublicKeyAlgorithm, u32), ParseError> {
    let spki = cert.public_key();
    let oid = spki.algorithm.algorithm.to_id_string();
    if oid == OID_DH_PUBLIC_NUMBER {
        let bits = spki.subject_public_key.data.len() * 8;
        return Ok((PublicKeyAlgorithm::Dh, bits as u32));
    }

    match spki.parsed() {
        Ok(PublicKey::RSA(rsa)) => Ok((PublicKeyAlgorithm::Rsa, rsa.key_size() as u32)),
        Ok(PublicKey::EC(point)) => Ok((PublicKeyAlgorithm::Ec, point.key_size() as u32)),
        Ok(PublicKey::DSA(y)) => Ok((PublicKeyAlgorithm::Dsa, (y.len() * 8) as u32)),
        Ok(_) | Err(_) => Err(ParseError::UnsupportedPublicKey(oid)),
    }
}

/// OpenSSL-style long name of a signature algorithm OID, or the dotted
/// OID itself when it is not one we know.
pub fn signature_algorithm_name(oid: &str) -> String {
    let name = match oid {
        "1.2.840.113549.1.1.4" => "md5WithRSAEncryption",
        "1.2.840.113549.1.1.5" => "sha1WithRSAEncryption",
        "1.2.840.113549.1.1.10" => "rsassaPss",
        "1.2.840.113549.1.1.11" => "sha256WithRSAEncryption",
        "1.2.840.113549.1.1.12" => "sha384WithRSAEncryption",
        "1.2.840.113549.1.1.13" => "sha512WithRSAEncryption",
        "1.2.840.113549.1.1.14" => "sha224WithRSAEncryption",
        "1.2.840.10045.4.1" => "ecdsa-with-SHA1",
        "1.2.840.10045.4.3.2" => "ecdsa-with-SHA256",
        "1.2.840.10045.4.3.3" => "ecdsa-with-SHA384",
        "1.2.840.10045.4.3.4" => "ecdsa-with-SHA512",
        "1.2.840.10040.4.3" => "dsaWithSHA1",
        "2.16.840.1.101.3.4.3.2" => "dsa_with_SHA256",
        "1.3.101.112" => "ED25519",
        "1.3.101.113" => "ED448",
        other => return other.to_string(),
    };
    name.to_string()
}

/// Wrap DER bytes in a `CERTIFICATE` PEM block.
pub fn der_to_pem(der: &[u8]) -> String {
    let encoded = STANDARD.encode(der);
    let mut pem = format!("-----BEGIN {PEM_LABEL}-----\n");
    for chunk in encoded.as_bytes().chunks(PEM_LINE_WIDTH) {
        // base64 output is ASCII
        pem.push_str(&String::from_utf8_lossy(chunk));
        pem.push('\n');
    }
    pem.push_str(&format!("-----END {PEM_LABEL}-----\n"));
    pem
}

/// The DER encoding of a certificate given as PEM text or raw DER bytes.
pub fn der_from_bytes(bytes: &[u8]) -> Result<Vec<u8>, ParseError> {
    match std::str::from_utf8(bytes) {
        Ok(text) if text.trim_start().starts_with("-----BEGIN") => pem_to_der(text),
        _ => Ok(bytes.to_vec()),
    }
}

/// Lowercase hex SHA-256 of a DER encoding.
pub fn sha256_fingerprint(der: &[u8]) -> String {
    hex::encode(Sha256::digest(der))
}

/// Contents of the first PEM block in `pem`.
pub fn pem_to_der(pem: &str) -> Result<Vec<u8>, ParseError> {
    let (_, block) = x509_parser::pem::parse_x509_pem(pem.as_bytes())
        .map_err(|e| ParseError::InvalidCertificate(e.to_string()))?;
    Ok(block.contents)
}
