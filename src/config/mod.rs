mod accounts;
mod credentials;
mod settings;

pub use accounts::{
    Account, AccountStore, ActiveAccount, ConfigLayout, CredentialContext, LegacyFields,
    StaticKeys,
};
pub use credentials::CredentialsFile;
pub use settings::{Settings, DEFAULT_RETRIES, DEFAULT_TIMEOUT_SECS};
