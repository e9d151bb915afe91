use clap::Args;

use common::crypto::{
    derive_nullifier, derive_password_hash, derive_tag_commitment, derive_vault_id, Address,
    HexError, Password,
};

/// Print the values derived from a password, without touching any ledger
#[derive(Args, Debug, Clone)]
pub struct Derive {
    /// Vault password
    #[arg(long)]
    pub password: String,

    /// Vault owner address (hex)
    #[arg(long)]
    pub owner: String,

    /// Also derive the nullifier this account would spend (hex address)
    #[arg(long)]
    pub user: Option<String>,

    /// Also derive the leaf and commitment for this tag
    #[arg(long)]
    pub tag: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DeriveError {
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("invalid {field} address: {source}")]
    InvalidAddress {
        field: &'static str,
        #[source]
        source: HexError,
    },
}

fn parse_address(field: &'static str, hex: &str) -> Result<Address, DeriveError> {
    Address::from_hex(hex).map_err(|source| DeriveError::InvalidAddress { field, source })
}

#[async_trait::async_trait]
impl crate::op::Op for Derive {
    type Error = DeriveError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let password = Password::from(self.password.as_str());
        if password.is_empty() {
            return Err(DeriveError::EmptyPassword);
        }
        let owner = parse_address("owner", &self.owner)?;

        let password_hash = derive_password_hash(&password);
        let vault_id = derive_vault_id(&password_hash, &owner);
        let mut lines = vec![
            format!("password_hash: {}", password_hash),
            format!("vault_id: {}", vault_id),
        ];

        if let Some(tag) = &self.tag {
            let (leaf, commitment) = derive_tag_commitment(&vault_id, tag);
            lines.push(format!("leaf: {}", leaf));
            lines.push(format!("commitment: {}", commitment));
        }
        if let Some(user) = &self.user {
            let user = parse_address("user", user)?;
            lines.push(format!(
                "nullifier: {}",
                derive_nullifier(&password, &user, &vault_id)
            ));
        }

        Ok(lines.join("\n"))
    }
}
