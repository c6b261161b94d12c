//! Recipient resolution.
//!
//! Identifiers that look like hex key IDs are looked up in the public keyring
//! and replaced by the email of the key's first uid. Anything else, and any
//! lookup that fails or finds nothing, is passed through unchanged.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use super::{GpgClient, KeyId};

/// Matches the email of a uid line in gpg listings.
///
/// gpg2 puts a validity tag before the name (`uid  [ultimate] Alice <a@x>`),
/// gpg1 does not (`uid  Alice <a@x>`). The name may be missing altogether.
fn uid_email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"uid\s+(?:\[[^\]\n]*\]\s+)?(?:[^<\n]*\s)?<(?P<email>[^>\n]+)>").unwrap()
    })
}

/// First uid email in a `gpg -k` listing.
pub fn extract_email(details: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(details);
    uid_email_pattern()
        .captures(&text)
        .and_then(|caps| caps.name("email"))
        .map(|m| m.as_str().to_string())
}

pub(super) async fn resolve(client: &GpgClient, identifiers: &[String]) -> Vec<String> {
    let mut resolved = Vec::with_capacity(identifiers.len());
    for identifier in identifiers {
        resolved.push(resolve_one(client, identifier).await);
    }
    resolved
}

async fn resolve_one(client: &GpgClient, identifier: &str) -> String {
    let key_id: KeyId = match identifier.parse() {
        Ok(key_id) => key_id,
        Err(_) => return identifier.to_string(),
    };

    match client.get_key_details(key_id).await {
        Ok(lookup) if lookup.found => match extract_email(&lookup.output) {
            Some(email) => {
                debug!(key_id = %key_id, email = %email, "Resolved recipient");
                email
            }
            None => identifier.to_string(),
        },
        Ok(_) => {
            debug!(key_id = %key_id, "Recipient key not in keyring, passing through");
            identifier.to_string()
        }
        Err(e) => {
            warn!(key_id = %key_id, error = %e, "Recipient lookup failed, passing through");
            identifier.to_string()
        }
    }
}
