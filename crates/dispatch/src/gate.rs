//! Credential gate

use crate::descriptor::ProviderDescriptor;
use taskwire_config::Credentials;

/// Checks a descriptor's required credentials against a credential set.
///
/// Borrowing and side-effect free, so it can be used both for up-front
/// capability listing and for the just-in-time re-check before a call.
#[derive(Debug, Clone, Copy)]
pub struct CredentialGate<'a> {
    credentials: &'a Credentials,
}

impl<'a> CredentialGate<'a> {
    pub fn new(credentials: &'a Credentials) -> Self {
        Self { credentials }
    }

    /// True iff every required credential is present and non-empty
    pub fn available(&self, descriptor: &ProviderDescriptor) -> bool {
        descriptor
            .required_credentials
            .iter()
            .all(|name| self.credentials.is_present(name))
    }

    /// Required credentials that are absent, sorted
    pub fn missing(&self, descriptor: &ProviderDescriptor) -> Vec<String> {
        descriptor
            .required_credentials
            .iter()
            .filter(|name| !self.credentials.is_present(name))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn google() -> ProviderDescriptor {
        ProviderDescriptor::new("google_search", "Google Search")
            .requires("GOOGLE_CSE_ID")
            .requires("GOOGLE_API_KEY")
    }

    #[test]
    fn test_available_when_all_present() {
        let creds = Credentials::from_pairs([("GOOGLE_API_KEY", "k"), ("GOOGLE_CSE_ID", "c")]);
        let gate = CredentialGate::new(&creds);
        assert!(gate.available(&google()));
        assert!(gate.missing(&google()).is_empty());
    }

    #[test]
    fn test_unavailable_when_one_missing() {
        let creds = Credentials::from_pairs([("GOOGLE_API_KEY", "k")]);
        let gate = CredentialGate::new(&creds);
        assert!(!gate.available(&google()));
        assert_eq!(gate.missing(&google()), vec!["GOOGLE_CSE_ID".to_string()]);
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let creds = Credentials::from_pairs([("GOOGLE_API_KEY", "k"), ("GOOGLE_CSE_ID", "")]);
        assert!(!CredentialGate::new(&creds).available(&google()));
    }

    #[test]
    fn test_no_requirements_always_available() {
        let creds = Credentials::new();
        let wiki = ProviderDescriptor::new("wikipedia", "Wikipedia");
        assert!(CredentialGate::new(&creds).available(&wiki));
    }

    #[test]
    fn test_missing_is_sorted() {
        let creds = Credentials::new();
        assert_eq!(
            CredentialGate::new(&creds).missing(&google()),
            vec!["GOOGLE_API_KEY".to_string(), "GOOGLE_CSE_ID".to_string()]
        );
    }
}
