//! Request fingerprint generation.
//!
//! Builds a complete header set correlated with one client identity so a
//! request doesn't stand out as an obvious automation client with a bare
//! User-Agent. Values come from small fixed candidate pools of real
//! browser header values; optional headers are added as coherent groups,
//! never partially.

use std::collections::HashMap;

use rand::Rng;

pub const ACCEPT_VALUES: &[&str] = &[
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
];

pub const ACCEPT_LANGUAGE_VALUES: &[&str] = &[
    "zh-TW,zh;q=0.9,en-US;q=0.8,en;q=0.7",
    "zh-TW,zh;q=0.9,en;q=0.8",
    "en-US,en;q=0.9,zh-TW;q=0.8,zh;q=0.7",
    "en-US,en;q=0.9",
];

pub const ACCEPT_ENCODING_VALUES: &[&str] = &["gzip, deflate, br", "gzip, deflate"];

pub const SEC_FETCH_SITE_VALUES: &[&str] = &["none", "same-origin", "same-site"];

/// Generates per-request header sets.
#[derive(Debug, Default, Clone, Copy)]
pub struct FingerprintGenerator;

impl FingerprintGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a fresh header map for the given identity.
    pub fn generate(&self, identity: &str) -> HashMap<String, String> {
        let mut rng = rand::rng();
        let mut headers = HashMap::new();

        headers.insert("User-Agent".to_string(), identity.to_string());
        headers.insert(
            "Accept".to_string(),
            pick(&mut rng, ACCEPT_VALUES).to_string(),
        );
        headers.insert(
            "Accept-Language".to_string(),
            pick(&mut rng, ACCEPT_LANGUAGE_VALUES).to_string(),
        );
        headers.insert(
            "Accept-Encoding".to_string(),
            pick(&mut rng, ACCEPT_ENCODING_VALUES).to_string(),
        );
        headers.insert("Connection".to_string(), "keep-alive".to_string());
        headers.insert("Upgrade-Insecure-Requests".to_string(), "1".to_string());

        if rng.random_bool(0.5) {
            headers.insert("Cache-Control".to_string(), "max-age=0".to_string());
        }

        // Sec-Fetch hints travel together; a partial set is a fingerprinting tell.
        if rng.random_bool(0.5) {
            headers.insert("Sec-Fetch-Dest".to_string(), "document".to_string());
            headers.insert("Sec-Fetch-Mode".to_string(), "navigate".to_string());
            headers.insert(
                "Sec-Fetch-Site".to_string(),
                pick(&mut rng, SEC_FETCH_SITE_VALUES).to_string(),
            );
            headers.insert("Sec-Fetch-User".to_string(), "?1".to_string());
        }

        headers
    }
}

fn pick<'a, R: Rng>(rng: &mut R, candidates: &'a [&'a str]) -> &'a str {
    candidates[rng.random_range(0..candidates.len())]
}
