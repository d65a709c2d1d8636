use std::fmt;
use zeroize::Zeroizing;

/// Private posting key of a managed account.
///
/// Opaque to the voting logic; only the broadcaster ever reads it. The
/// backing buffer is wiped on drop and never printed.
#[derive(Clone)]
pub struct Credential(Zeroizing<String>);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let wif = Credential::new("5JsecretKey");
        assert_eq!(format!("{:?}", wif), "Credential(***)");
        assert_eq!(wif.expose(), "5JsecretKey");
    }
}
