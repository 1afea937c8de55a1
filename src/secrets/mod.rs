//! Secret generation — random tokens for the Synapse stack.
//!
//! Tokens come from the process CSPRNG and are assembled into a plaintext
//! vault YAML document, which is then handed to `ansible-vault encrypt`.
//! Plaintext values are held in `Zeroizing` strings so they are wiped
//! from memory on drop.

use rand::distr::Alphanumeric;
use rand::Rng;
use zeroize::Zeroizing;

/// One secret to generate: vault variable name + token length.
#[derive(Debug, Clone, Copy)]
pub struct SecretSpec {
    pub name: &'static str,
    pub length: usize,
}

/// The full set of random secrets a Synapse deployment needs.
pub const SECRET_SPECS: &[SecretSpec] = &[
    SecretSpec {
        name: "vault_postgres_password",
        length: 32,
    },
    SecretSpec {
        name: "vault_synapse_registration_shared_secret",
        length: 64,
    },
    SecretSpec {
        name: "vault_synapse_macaroon_secret_key",
        length: 64,
    },
    SecretSpec {
        name: "vault_synapse_form_secret",
        length: 64,
    },
    SecretSpec {
        name: "vault_turn_static_auth_secret",
        length: 64,
    },
    SecretSpec {
        name: "vault_admin_password",
        length: 16,
    },
];

/// Generate a random alphanumeric token of exactly `length` characters.
pub fn generate_token(length: usize) -> Zeroizing<String> {
    let token: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect();
    Zeroizing::new(token)
}

/// A freshly generated secret set, ready to be serialized and encrypted.
pub struct GeneratedSecrets {
    /// (vault variable name, plaintext token) in a stable order.
    values: Vec<(&'static str, Zeroizing<String>)>,

    /// Operator email stored alongside the random tokens (for Let's Encrypt).
    ssl_email: String,
}

impl GeneratedSecrets {
    /// Generate one token per entry in [`SECRET_SPECS`].
    pub fn generate(ssl_email: &str) -> Self {
        let values = SECRET_SPECS
            .iter()
            .map(|spec| (spec.name, generate_token(spec.length)))
            .collect();

        Self {
            values,
            ssl_email: ssl_email.to_string(),
        }
    }

    /// Render the plaintext vault YAML document.
    ///
    /// This is what `ansible-vault encrypt` consumes. Group vars reference
    /// these values as `{{ vault_* }}`.
    pub fn to_vault_yaml(&self, environment: &str) -> Zeroizing<String> {
        let mut doc = String::new();
        doc.push_str("---\n");
        doc.push_str(&format!(
            "# Secrets for the '{environment}' environment — keep encrypted at rest\n"
        ));

        for (name, value) in &self.values {
            doc.push_str(&format!("{name}: \"{}\"\n", value.as_str()));
        }
        doc.push_str(&format!("vault_ssl_email: \"{}\"\n", self.ssl_email));

        Zeroizing::new(doc)
    }

    /// Number of random tokens generated.
    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// Look up a generated value by vault variable name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_have_requested_length() {
        for len in [1, 16, 32, 64, 128] {
            let token = generate_token(len);
            assert_eq!(token.len(), len);
        }
    }

    #[test]
    fn tokens_are_alphanumeric() {
        let token = generate_token(256);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn tokens_are_not_repeated() {
        // Two independently generated 64-char tokens colliding would mean
        // the RNG is broken.
        assert_ne!(generate_token(64).as_str(), generate_token(64).as_str());
    }

    #[test]
    fn generated_set_covers_all_specs() {
        let secrets = GeneratedSecrets::generate("admin@example.com");
        assert_eq!(secrets.count(), SECRET_SPECS.len());

        for spec in SECRET_SPECS {
            let value = secrets.get(spec.name).expect("spec should be generated");
            assert_eq!(value.len(), spec.length);
            assert!(!value.is_empty());
        }
    }

    #[test]
    fn vault_yaml_contains_every_variable() {
        let secrets = GeneratedSecrets::generate("admin@example.com");
        let yaml = secrets.to_vault_yaml("production");

        assert!(yaml.starts_with("---\n"));
        for spec in SECRET_SPECS {
            assert!(yaml.contains(&format!("{}: \"", spec.name)));
        }
        assert!(yaml.contains("vault_ssl_email: \"admin@example.com\""));
    }

    #[test]
    fn admin_password_is_sixteen_chars() {
        let secrets = GeneratedSecrets::generate("admin@example.com");
        assert_eq!(secrets.get("vault_admin_password").unwrap().len(), 16);
    }
}
