use url::Url;

use crate::fido2::error::{Fido2Error, Result};

/// Relying-party scope derived from an identity provider entity id: the URL
/// authority without userinfo, i.e. host plus port when one is given.
///
/// # Errors
/// Returns `Configuration` if the entity id is not a URL with a host.
pub fn derive_scope(entity_id: &str) -> Result<String> {
    let url = Url::parse(entity_id).map_err(|err| {
        Fido2Error::Configuration(format!(
            "cannot derive scope from entity id {entity_id}: {err}"
        ))
    })?;

    let host = url.host_str().ok_or_else(|| {
        Fido2Error::Configuration(format!(
            "cannot derive scope from entity id {entity_id}: no host"
        ))
    })?;

    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_of_saml_metadata_url() {
        assert_eq!(
            derive_scope("https://idp.example.org/simplesaml/saml2/idp/metadata.php").unwrap(),
            "idp.example.org"
        );
    }

    #[test]
    fn explicit_port_is_kept() {
        assert_eq!(
            derive_scope("https://idp.example.org:8443/idp").unwrap(),
            "idp.example.org:8443"
        );
        // default ports are normalized away by the URL parser
        assert_eq!(
            derive_scope("https://idp.example.org:443/idp").unwrap(),
            "idp.example.org"
        );
    }

    #[test]
    fn bare_origin_and_userinfo() {
        assert_eq!(derive_scope("https://login.example.com").unwrap(), "login.example.com");
        assert_eq!(
            derive_scope("https://admin@login.example.com/x").unwrap(),
            "login.example.com"
        );
    }

    #[test]
    fn non_url_entity_ids_are_rejected() {
        for entity_id in ["urn:mace:example.org:idp", "idp.example.org", ""] {
            assert!(
                matches!(derive_scope(entity_id), Err(Fido2Error::Configuration(_))),
                "{entity_id} should not yield a scope"
            );
        }
    }
}
